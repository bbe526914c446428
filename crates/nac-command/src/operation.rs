//! Command operations

use nac_core::{Component, NacError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation carried by a command name, right after the target prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Data Owner binds a policy to a data prefix on a Producer
    SetPolicy,
    /// Consumer fetches its sealed decryption key from the authority
    FetchKey,
    /// Anyone fetches the authority's public parameters
    FetchPublicParams,
    /// Consumer fetches encrypted content from a Producer
    FetchContent,
}

impl Operation {
    /// Every operation, in wire order
    pub const ALL: [Operation; 4] = [
        Operation::SetPolicy,
        Operation::FetchKey,
        Operation::FetchPublicParams,
        Operation::FetchContent,
    ];

    /// Component literal on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::SetPolicy => "SET_POLICY",
            Operation::FetchKey => "FETCH_KEY",
            Operation::FetchPublicParams => "FETCH_PUBLIC_PARAMS",
            Operation::FetchContent => "FETCH_CONTENT",
        }
    }

    /// Name component for this operation
    pub fn component(&self) -> Component {
        Component::from(self.as_str())
    }

    /// Recognize an operation component
    pub fn from_component(component: &Component) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str().as_bytes() == component.as_bytes())
            .ok_or_else(|| NacError::invalid(format!("unknown command operation `{component}`")))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_round_trip() {
        for op in Operation::ALL {
            assert_eq!(Operation::from_component(&op.component()).unwrap(), op);
        }
        assert!(Operation::from_component(&Component::from("set_policy")).is_err());
    }
}
