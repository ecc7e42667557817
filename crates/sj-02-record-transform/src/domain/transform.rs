//! Record transforms and ordered chains.

use shared_types::{Event, Purchase};
use std::fmt;
use std::sync::Arc;

use super::mask::MaskSensitive;

/// A total, pure, one-in-one-out transformation of an event.
pub trait RecordTransform<P>: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Transform one event.
    fn apply(&self, event: Event<P>) -> Event<P>;
}

/// Redacts sensitive payload fields. Leaves the key untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaskSensitiveFields;

impl<P: MaskSensitive> RecordTransform<P> for MaskSensitiveFields {
    fn name(&self) -> &str {
        "mask-sensitive-fields"
    }

    fn apply(&self, event: Event<P>) -> Event<P> {
        event.map_payload(MaskSensitive::mask)
    }
}

/// Derives a new key from the payload.
pub struct Rekey<P> {
    name: String,
    key_fn: Arc<dyn Fn(&P) -> String + Send + Sync>,
}

impl<P> Rekey<P> {
    pub fn new(name: impl Into<String>, key_fn: impl Fn(&P) -> String + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            key_fn: Arc::new(key_fn),
        }
    }
}

impl Rekey<Purchase> {
    /// Key purchases by customer id.
    pub fn by_customer_id() -> Self {
        Self::new("rekey-customer-id", |p: &Purchase| p.customer_id.clone())
    }
}

impl<P> Clone for Rekey<P> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            key_fn: self.key_fn.clone(),
        }
    }
}

impl<P> fmt::Debug for Rekey<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rekey").field("name", &self.name).finish()
    }
}

impl<P: Send + Sync> RecordTransform<P> for Rekey<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, event: Event<P>) -> Event<P> {
        let key = (self.key_fn)(&event.payload);
        event.with_key(key)
    }
}

/// Transforms applied in declaration order.
///
/// An empty chain is the identity.
pub struct TransformChain<P> {
    transforms: Vec<Arc<dyn RecordTransform<P>>>,
}

impl<P> TransformChain<P> {
    pub fn new() -> Self {
        Self {
            transforms: Vec::new(),
        }
    }

    /// Append a transform to the end of the chain.
    #[must_use]
    pub fn then(mut self, transform: impl RecordTransform<P> + 'static) -> Self {
        self.transforms.push(Arc::new(transform));
        self
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Transform names in application order.
    pub fn names(&self) -> Vec<&str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    /// Run the event through every transform in order.
    pub fn apply(&self, event: Event<P>) -> Event<P> {
        self.transforms
            .iter()
            .fold(event, |event, transform| transform.apply(event))
    }
}

impl<P> Default for TransformChain<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Clone for TransformChain<P> {
    fn clone(&self) -> Self {
        Self {
            transforms: self.transforms.clone(),
        }
    }
}

impl<P> fmt::Debug for TransformChain<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl TransformChain<Purchase> {
    /// Mask the card number, then key by customer id.
    pub fn purchase_default() -> Self {
        Self::new()
            .then(MaskSensitiveFields)
            .then(Rekey::by_customer_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn purchase_event(key: &str) -> Event<Purchase> {
        Event::new(
            key,
            Purchase {
                customer_id: "c42".into(),
                credit_card_number: "1234-5678-9012-3456".into(),
                ..Default::default()
            },
            1_000,
            7,
        )
    }

    #[test]
    fn test_mask_keeps_key_and_time() {
        let out = MaskSensitiveFields.apply(purchase_event("original"));
        assert_eq!(out.key, "original");
        assert_eq!(out.event_time, 1_000);
        assert_eq!(out.sequence, 7);
        assert!(out.payload.is_card_masked());
    }

    #[test]
    fn test_rekey_by_customer_id() {
        let out = Rekey::by_customer_id().apply(purchase_event(""));
        assert_eq!(out.key, "c42");
        assert!(!out.payload.is_card_masked());
    }

    #[test]
    fn test_chain_applies_in_order() {
        let chain = TransformChain::new()
            .then(Rekey::new("first", |_: &Purchase| "a".to_string()))
            .then(Rekey::new("second", |_: &Purchase| "b".to_string()));

        assert_eq!(chain.names(), vec!["first", "second"]);
        assert_eq!(chain.apply(purchase_event("")).key, "b");
    }

    #[test]
    fn test_empty_chain_is_identity() {
        let chain = TransformChain::<Purchase>::default();
        assert!(chain.is_empty());
        assert_eq!(chain.apply(purchase_event("k")), purchase_event("k"));
    }

    #[test]
    fn test_no_rekey_unless_chained() {
        let chain = TransformChain::new().then(MaskSensitiveFields);
        assert_eq!(chain.apply(purchase_event("transport")).key, "transport");
    }

    #[test]
    fn test_purchase_default_chain() {
        let chain = TransformChain::purchase_default();
        let out = chain.apply(purchase_event(""));

        assert_eq!(chain.len(), 2);
        assert_eq!(out.key, "c42");
        assert_eq!(out.payload.credit_card_number, "xxxx-xxxx-xxxx-3456");
    }

    #[test]
    fn test_chain_is_idempotent_for_masking() {
        let chain = TransformChain::purchase_default();
        let once = chain.apply(purchase_event(""));
        let twice = chain.apply(once.clone());
        assert_eq!(once, twice);
    }
}
