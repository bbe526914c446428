//! Inbound command authentication

use nac_command::{Certificate, CommandRequest, ReplayGuard, TrustStore};
use nac_core::{Clock, Result};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Verifies that a command comes from a trusted signer and is fresh
#[derive(Debug)]
pub struct Authenticator {
    trust: Arc<RwLock<TrustStore>>,
    replay: Mutex<ReplayGuard>,
    clock: Arc<dyn Clock>,
}

impl Authenticator {
    /// Authenticator over `trust` accepting timestamps within `freshness_window_ms`
    pub fn new(
        trust: Arc<RwLock<TrustStore>>,
        clock: Arc<dyn Clock>,
        freshness_window_ms: u64,
    ) -> Self {
        Self {
            trust,
            replay: Mutex::new(ReplayGuard::new(freshness_window_ms)),
            clock,
        }
    }

    /// Return the signer's certificate if `request` is signed by a trusted
    /// key, verifies, and is neither stale nor replayed
    ///
    /// The replay window only advances for commands whose signature checks
    /// out.
    pub fn authenticate(&self, request: &CommandRequest) -> Result<Certificate> {
        let certificate = self.trust.read().by_key_locator(request.key_locator())?.clone();
        request.verify(&certificate)?;
        self.replay.lock().check(request.signature(), self.clock.now_ms())?;
        tracing::trace!(
            signer = %certificate.identity(),
            operation = %request.operation(),
            "Command authenticated"
        );
        Ok(certificate)
    }
}
