//! # Shared Types Crate
//!
//! Record shapes and error types shared by every pipeline stage.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every type that crosses a stage boundary is
//!   defined here.
//! - **Events are immutable values**: stages consume an `Event<P>` and produce
//!   a new one; nothing is mutated after it leaves a stage.
//! - **Keys may be absent at the edge**: `SourceRecord` models what the
//!   transport delivers, `Event` what the keyed stages operate on.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
