//! Attributes and attribute sets

use nac_core::{NacError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Words the policy grammar reserves; they can never name an attribute.
pub const RESERVED_WORDS: [&str; 4] = ["and", "or", "of", "not"];

/// An opaque capability token, e.g. `attr1`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Attribute(String);

impl Attribute {
    /// Validate and wrap an attribute token
    ///
    /// Tokens must be non-empty, contain no whitespace, parentheses or commas,
    /// and must not be one of the grammar's reserved words.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(NacError::policy_syntax("empty attribute"));
        }
        if let Some(bad) = token
            .chars()
            .find(|c| c.is_whitespace() || matches!(c, '(' | ')' | ','))
        {
            return Err(NacError::policy_syntax(format!(
                "attribute `{token}` contains forbidden character {bad:?}"
            )));
        }
        if RESERVED_WORDS
            .iter()
            .any(|word| word.eq_ignore_ascii_case(&token))
        {
            return Err(NacError::policy_syntax(format!(
                "`{token}` is a reserved word and cannot be an attribute"
            )));
        }
        Ok(Self(token))
    }

    /// The attribute token
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Attribute {
    type Error = NacError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Attribute {
    type Error = NacError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Attribute> for String {
    fn from(value: Attribute) -> Self {
        value.0
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unordered, deduplicated set of attributes held by a principal
pub type AttributeSet = BTreeSet<Attribute>;

/// Build an attribute set from tokens, validating each one
pub fn attribute_set<I, S>(tokens: I) -> Result<AttributeSet>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tokens
        .into_iter()
        .map(|token| Attribute::new(token.as_ref()))
        .collect()
}
