//! # Inbound Port - BranchRouterApi

use shared_types::Event;
use std::sync::Arc;

use crate::domain::{BranchRouter, CategoryId, Route, RouterStats};

/// Driving port used by ingest workers after transformation.
pub trait BranchRouterApi<P>: Send + Sync {
    /// Route one event to at most one category.
    fn route(&self, event: &Event<P>) -> Route;

    /// Declared categories in evaluation order.
    fn categories(&self) -> &[CategoryId];

    /// Shared routing counters.
    fn stats(&self) -> Arc<RouterStats>;
}

impl<P> BranchRouterApi<P> for BranchRouter<P> {
    fn route(&self, event: &Event<P>) -> Route {
        BranchRouter::route(self, event)
    }

    fn categories(&self) -> &[CategoryId] {
        BranchRouter::categories(self)
    }

    fn stats(&self) -> Arc<RouterStats> {
        BranchRouter::stats(self)
    }
}
