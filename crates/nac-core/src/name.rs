//! Hierarchical names
//!
//! A `Name` is an ordered sequence of opaque byte components. Equality and
//! prefix matching are structural: two names match iff every component compares
//! equal in order. The URI form (`/a/b%20c`) is only a rendering; nothing in the
//! workspace compares names by their concatenated string.

use crate::errors::{NacError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single opaque name component
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Component(Vec<u8>);

impl Component {
    /// Create a component from raw bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw component bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume into raw bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Component as UTF-8 text, if it is valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// Number of bytes in the component
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the component has no bytes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render the component in URI form (without the leading slash)
    pub fn to_uri(&self) -> String {
        let mut out = String::with_capacity(self.0.len());
        if self.0.iter().all(|b| *b == b'.') {
            // Components made only of periods would collide with `.`/`..`
            out.push_str("...");
        }
        for byte in &self.0 {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
                out.push(char::from(*byte));
            } else {
                out.push_str(&format!("%{byte:02X}"));
            }
        }
        out
    }

    /// Parse a component from its URI form
    pub fn from_uri(text: &str) -> Result<Self> {
        let mut bytes = Vec::with_capacity(text.len());
        let raw = text.as_bytes();
        let mut i = 0;
        while i < raw.len() {
            if raw[i] == b'%' {
                let hex_digits = raw
                    .get(i + 1..i + 3)
                    .ok_or_else(|| NacError::invalid(format!("truncated escape in `{text}`")))?;
                let hex_text = std::str::from_utf8(hex_digits)
                    .map_err(|_| NacError::invalid(format!("bad escape in `{text}`")))?;
                let value = u8::from_str_radix(hex_text, 16)
                    .map_err(|_| NacError::invalid(format!("bad escape in `{text}`")))?;
                bytes.push(value);
                i += 3;
            } else {
                bytes.push(raw[i]);
                i += 1;
            }
        }

        if bytes.iter().all(|b| *b == b'.') {
            if bytes.len() < 3 {
                return Err(NacError::invalid(format!(
                    "component `{text}` is a relative path segment"
                )));
            }
            bytes.truncate(bytes.len() - 3);
        }
        Ok(Self(bytes))
    }
}

impl From<&str> for Component {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<String> for Component {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

impl From<Vec<u8>> for Component {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for Component {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri())
    }
}

/// An ordered sequence of components
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Name {
    components: Vec<Component>,
}

impl Name {
    /// The empty (root) name
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a name from components
    pub fn from_components(components: impl IntoIterator<Item = Component>) -> Self {
        Self {
            components: components.into_iter().collect(),
        }
    }

    /// Parse a URI such as `/producer/dataset1`
    pub fn from_uri(uri: &str) -> Result<Self> {
        let trimmed = uri.strip_prefix("ndn:").unwrap_or(uri);
        let components = trimmed
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(Component::from_uri)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { components })
    }

    /// Append a component, builder style
    pub fn append(mut self, component: impl Into<Component>) -> Self {
        self.components.push(component.into());
        self
    }

    /// Append every component of `suffix`, builder style
    pub fn append_name(mut self, suffix: &Name) -> Self {
        self.components.extend(suffix.components.iter().cloned());
        self
    }

    /// Append a component in place
    pub fn push(&mut self, component: impl Into<Component>) {
        self.components.push(component.into());
    }

    /// Component at `index`
    pub fn get(&self, index: usize) -> Option<&Component> {
        self.components.get(index)
    }

    /// All components in order
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether this is the root name
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// The first `count` components (clamped to the name length)
    pub fn prefix(&self, count: usize) -> Name {
        let end = count.min(self.components.len());
        Self {
            components: self.components[..end].to_vec(),
        }
    }

    /// Components in `[start, end)` as a new name
    pub fn slice(&self, start: usize, end: usize) -> Name {
        let end = end.min(self.components.len());
        let start = start.min(end);
        Self {
            components: self.components[start..end].to_vec(),
        }
    }

    /// Whether `self` is a (non-strict) structural prefix of `other`
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.components.len() <= other.components.len()
            && self
                .components
                .iter()
                .zip(other.components.iter())
                .all(|(a, b)| a == b)
    }

    /// Whether `prefix` is a structural prefix of `self`
    pub fn starts_with(&self, prefix: &Name) -> bool {
        prefix.is_prefix_of(self)
    }

    /// Render as a URI
    pub fn to_uri(&self) -> String {
        if self.components.is_empty() {
            return "/".to_string();
        }
        let mut out = String::new();
        for component in &self.components {
            out.push('/');
            out.push_str(&component.to_uri());
        }
        out
    }

    /// Unambiguous byte encoding of the components, used as signed input.
    ///
    /// Each component is written as a big-endian `u32` length followed by its
    /// bytes, so distinct component splits never encode identically.
    pub fn encode(&self) -> Vec<u8> {
        let total: usize = self.components.iter().map(|c| c.len() + 4).sum();
        let mut out = Vec::with_capacity(total);
        for component in &self.components {
            let len = u32::try_from(component.len()).unwrap_or(u32::MAX);
            out.extend_from_slice(&len.to_be_bytes());
            out.extend_from_slice(component.as_bytes());
        }
        out
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri())
    }
}

impl FromStr for Name {
    type Err = NacError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_uri(s)
    }
}

impl<'a> IntoIterator for &'a Name {
    type Item = &'a Component;
    type IntoIter = std::slice::Iter<'a, Component>;

    fn into_iter(self) -> Self::IntoIter {
        self.components.iter()
    }
}
