//! Domain layer: masking and transform composition.

pub mod mask;
pub mod transform;

pub use mask::{mask_card_number, MaskSensitive};
pub use transform::{MaskSensitiveFields, RecordTransform, Rekey, TransformChain};
