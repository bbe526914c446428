//! Inbound request dispatch

use async_trait::async_trait;
use nac_command::{CommandRequest, ReplyContent};
use nac_core::{Name, Result};
use parking_lot::RwLock;
use std::sync::Arc;

/// Serves commands addressed to a registered prefix
///
/// An `Err` is turned into a signed failure reply carrying the error text.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Answer one parsed (not yet authenticated) command
    async fn handle(&self, request: CommandRequest) -> Result<ReplyContent>;
}

/// Prefix -> handler table, longest structural prefix wins
#[derive(Default)]
pub struct Router {
    routes: RwLock<Vec<(Name, Arc<dyn RequestHandler>)>>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefixes: Vec<String> = self.routes.read().iter().map(|(p, _)| p.to_uri()).collect();
        f.debug_struct("Router").field("prefixes", &prefixes).finish()
    }
}

impl Router {
    /// Empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// Route commands under `prefix` to `handler`, replacing any previous one
    pub fn register(&self, prefix: Name, handler: Arc<dyn RequestHandler>) {
        let mut routes = self.routes.write();
        routes.retain(|(existing, _)| existing != &prefix);
        routes.push((prefix, handler));
    }

    /// Handler for `name` and the prefix it was registered under
    pub fn route(&self, name: &Name) -> Option<(Name, Arc<dyn RequestHandler>)> {
        self.routes
            .read()
            .iter()
            .filter(|(prefix, _)| prefix.is_prefix_of(name))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(prefix, handler)| (prefix.clone(), handler.clone()))
    }
}
