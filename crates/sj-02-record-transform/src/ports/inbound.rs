//! # Inbound Port - RecordTransformApi

use shared_types::{Event, StageId};
use tracing::trace;

use crate::domain::TransformChain;

/// Driving port used by ingest workers after event time is assigned.
pub trait RecordTransformApi<P>: Send + Sync {
    /// Reshape one event. Total: every input yields exactly one output.
    fn transform(&self, event: Event<P>) -> Event<P>;
}

impl<P: Send + Sync> RecordTransformApi<P> for TransformChain<P> {
    fn transform(&self, event: Event<P>) -> Event<P> {
        let out = self.apply(event);
        trace!(stage = %StageId::RecordTransform, key = %out.key, sequence = out.sequence, "Transformed");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Purchase;

    #[test]
    fn test_chain_through_port() {
        let port: &dyn RecordTransformApi<Purchase> = &TransformChain::purchase_default();
        let event = Event::new(
            "",
            Purchase {
                customer_id: "c9".into(),
                ..Default::default()
            },
            0,
            0,
        );
        assert_eq!(port.transform(event).key, "c9");
    }
}
