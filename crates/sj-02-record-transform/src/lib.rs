//! # SJ-02 Record Transform
//!
//! Reshapes each time-stamped event before routing: redacts sensitive
//! fields and derives the join key.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`)
//!   - `MaskSensitive`: payload-level redaction (idempotent, irreversible)
//!   - `RecordTransform`: `apply(event) -> event`, total and pure
//!   - `MaskSensitiveFields`, `Rekey`: the two built-in transforms
//!   - `TransformChain`: transforms applied in declaration order
//!
//! - **Ports Layer** (`ports/`)
//!   - `RecordTransformApi`: Driving port used by ingest workers
//!
//! ## Invariants
//!
//! - Masking never touches key-relevant fields.
//! - The key changes only when a `Rekey` is explicitly chained.
//! - Event time and sequence pass through unchanged.

pub mod domain;
pub mod ports;

pub use domain::{
    mask_card_number, MaskSensitive, MaskSensitiveFields, RecordTransform, Rekey, TransformChain,
};
pub use ports::RecordTransformApi;
