//! Command replay protection
//!
//! Each signer's commands must carry a timestamp inside the freshness window,
//! and timestamps from one signer must never go backwards. Commands sharing
//! the newest timestamp are told apart by nonce.

use crate::signature::SignatureInfo;
use nac_core::{NacError, Name, Result};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Default)]
struct LastSeen {
    timestamp_ms: u64,
    nonces: BTreeSet<u64>,
}

/// Per-signer timestamp tracker
#[derive(Debug)]
pub struct ReplayGuard {
    window_ms: u64,
    last_seen: HashMap<Name, LastSeen>,
}

impl ReplayGuard {
    /// Accept timestamps within `window_ms` of local time in either direction
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            last_seen: HashMap::new(),
        }
    }

    /// Admit a verified command, recording it on success
    pub fn check(&mut self, signature: &SignatureInfo, now_ms: u64) -> Result<()> {
        let timestamp = signature.timestamp_ms;
        if timestamp.abs_diff(now_ms) > self.window_ms {
            return Err(NacError::invalid(format!(
                "command timestamp {timestamp} outside freshness window at {now_ms}"
            )));
        }

        let entry = self
            .last_seen
            .entry(signature.key_locator.clone())
            .or_default();
        if timestamp < entry.timestamp_ms {
            return Err(NacError::invalid(format!(
                "command timestamp {timestamp} older than last accepted {}",
                entry.timestamp_ms
            )));
        }
        if timestamp > entry.timestamp_ms {
            entry.timestamp_ms = timestamp;
            entry.nonces.clear();
        }
        if !entry.nonces.insert(signature.nonce) {
            return Err(NacError::invalid("replayed command"));
        }
        Ok(())
    }

    /// Number of signers tracked
    pub fn tracked_signers(&self) -> usize {
        self.last_seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(signer: &str, timestamp_ms: u64, nonce: u64) -> SignatureInfo {
        SignatureInfo {
            key_locator: Name::from_uri(signer).unwrap(),
            timestamp_ms,
            nonce,
            value: Vec::new(),
        }
    }

    #[test]
    fn test_accepts_fresh_commands() {
        let mut guard = ReplayGuard::new(1_000);
        assert!(guard.check(&info("/a/KEY/1", 10_000, 1), 10_000).is_ok());
        assert!(guard.check(&info("/a/KEY/1", 10_000, 2), 10_100).is_ok());
        assert!(guard.check(&info("/a/KEY/1", 10_050, 1), 10_100).is_ok());
    }

    #[test]
    fn test_rejects_stale_and_future() {
        let mut guard = ReplayGuard::new(1_000);
        assert!(guard.check(&info("/a/KEY/1", 8_000, 1), 10_000).is_err());
        assert!(guard.check(&info("/a/KEY/1", 12_000, 1), 10_000).is_err());
    }

    #[test]
    fn test_rejects_replay_and_regression() {
        let mut guard = ReplayGuard::new(1_000);
        assert!(guard.check(&info("/a/KEY/1", 10_000, 1), 10_000).is_ok());
        assert!(guard.check(&info("/a/KEY/1", 10_000, 1), 10_000).is_err());
        assert!(guard.check(&info("/a/KEY/1", 10_500, 2), 10_500).is_ok());
        assert!(guard.check(&info("/a/KEY/1", 10_200, 3), 10_500).is_err());
    }

    #[test]
    fn test_signers_are_independent() {
        let mut guard = ReplayGuard::new(1_000);
        assert!(guard.check(&info("/a/KEY/1", 10_500, 1), 10_500).is_ok());
        assert!(guard.check(&info("/b/KEY/1", 10_000, 1), 10_500).is_ok());
        assert_eq!(guard.tracked_signers(), 2);
    }
}
