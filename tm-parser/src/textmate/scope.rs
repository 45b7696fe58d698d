//! Scope names and scope paths
//!
//! A scope name is an opaque dotted identifier such as `keyword.control.if`
//! or `string.quoted.double`. The tokenizer never interprets the dots; it
//! only accumulates names into an ordered path (outermost first, deepest
//! last) and attaches the path to each emitted token. Theme application,
//! which does interpret the dots, lives outside this crate.
//!
//! Scope names are shared, not copied: cloning a [`Scope`] bumps a
//! reference count. Paths are cloned frame-to-frame on the state stack, so
//! cheap name clones keep that affordable.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// An opaque dotted scope name (e.g. `comment.block`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scope(Arc<str>);

impl Scope {
    pub fn new(name: &str) -> Self {
        Scope(Arc::from(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Scope {
    fn from(name: &str) -> Self {
        Scope::new(name)
    }
}

impl From<String> for Scope {
    fn from(name: String) -> Self {
        Scope(Arc::from(name.as_str()))
    }
}

impl Serialize for Scope {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Scope {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Scope::from(s))
    }
}

/// An ordered sequence of scope names, deepest last.
///
/// This is a plain vector by design: the engine clones the path into every
/// pushed frame and into every emitted token, and a vector of shared names
/// is the cheapest representation that keeps both owners independent.
pub type ScopePath = Vec<Scope>;
