//! Capture anchor trees
//!
//! When a match rule or a begin/end anchor fires, its captures map may
//! assign scopes (and nested patterns) to individual capture groups. The
//! engine cannot apply those immediately: sub-scoping happens positionally,
//! as the parser advances through the matched region. So each successful
//! match is turned into a tree of *capture anchors* up front, and the tree
//! is consumed later, front to back, as the position reaches each anchor's
//! start.
//!
//! The root anchor spans the whole match (carrying the `"0"` attribute if
//! the captures map has one); children are the attributed capture groups,
//! nested by range containment. Zero-width captures carry nothing and get
//! no node, and an empty whole match builds no tree at all.

use std::ops::Range;

use crate::textmate::grammar::{CaptureAttribute, CapturesMap};
use crate::textmate::regex::MatchRegion;

/// Deferred sub-scoping for one region of a match
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureAnchor {
    /// Scope and patterns to apply over `range`, if any
    pub attribute: Option<CaptureAttribute>,
    /// Half-open byte range within the line
    pub range: Range<usize>,
    /// Nested anchors, ordered by start, pairwise non-overlapping
    pub children: Vec<CaptureAnchor>,
}

/// Build the anchor tree for a successful match.
///
/// Returns `None` for a zero-width match. The captures map may be empty;
/// the tree is still built (attribute-less root over the whole match)
/// because the engine uses the root anchor to carry the position across
/// the matched text.
pub fn build_anchor_tree(m: &MatchRegion, captures: &CapturesMap) -> Option<CaptureAnchor> {
    let whole = m.group(0)?;
    if whole.start == whole.end {
        return None;
    }

    let mut root = CaptureAnchor {
        attribute: captures.get(&0).cloned(),
        range: whole.clone(),
        children: Vec::new(),
    };

    let mut nodes: Vec<CaptureAnchor> = captures
        .iter()
        .filter(|(index, _)| **index >= 1)
        .filter_map(|(index, attribute)| {
            let range = m.group(*index as usize)?;
            if range.start == range.end {
                return None;
            }
            // Lookaround groups can capture text outside the overall
            // match; such a range cannot be reached while the match
            // frame is live, so it is skipped.
            if range.start < whole.start || range.end > whole.end {
                return None;
            }
            Some(CaptureAnchor {
                attribute: Some(attribute.clone()),
                range,
                children: Vec::new(),
            })
        })
        .collect();

    // Sorting wider-first makes containment insertion below a single
    // rightmost-descent: each node either nests in the most recently
    // placed anchor or becomes its sibling.
    nodes.sort_by(|a, b| {
        a.range
            .start
            .cmp(&b.range.start)
            .then(b.range.end.cmp(&a.range.end))
    });

    for node in nodes {
        insert(&mut root, node);
    }

    Some(root)
}

fn insert(parent: &mut CaptureAnchor, node: CaptureAnchor) {
    if let Some(last) = parent.children.last_mut() {
        if node.range.start >= last.range.start && node.range.end <= last.range.end {
            return insert(last, node);
        }
    }
    parent.children.push(node);
}
