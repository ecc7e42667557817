//! Sensitive-field masking.

use shared_types::Purchase;

/// Payloads with fields that must be redacted before leaving ingest.
///
/// `mask` must be idempotent: `mask(mask(x)) == mask(x)`.
pub trait MaskSensitive {
    /// Return the payload with every sensitive field redacted.
    #[must_use]
    fn mask(self) -> Self;

    /// Whether the sensitive fields are already redacted.
    fn is_masked(&self) -> bool;
}

/// Redact a card number down to its last group.
///
/// `1234-5678-9012-3456` becomes `xxxx-xxxx-xxxx-3456`. Anything that is
/// not four dash-separated groups ending in four digits becomes `xxxx`.
pub fn mask_card_number(number: &str) -> String {
    let groups: Vec<&str> = number.trim().split('-').collect();
    match groups.as_slice() {
        [_, _, _, last] if last.len() == 4 && last.bytes().all(|b| b.is_ascii_digit()) => {
            format!("{}{}", Purchase::MASKED_CARD_PREFIX, last)
        }
        _ => Purchase::FULLY_MASKED_CARD.to_string(),
    }
}

impl MaskSensitive for Purchase {
    fn mask(mut self) -> Self {
        self.credit_card_number = mask_card_number(&self.credit_card_number);
        self
    }

    fn is_masked(&self) -> bool {
        self.is_card_masked()
    }
}
