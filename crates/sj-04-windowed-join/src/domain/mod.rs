//! Domain layer: window buffers, the join evaluator and the joiner contract.

pub mod buffer;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod joiner;
pub mod window;

pub use buffer::{BufferStats, Inserted, WindowBuffer};
pub use config::{JoinConfig, OverflowPolicy, PerKeyBound};
pub use error::{BufferError, JoinError};
pub use evaluator::{JoinOutcome, JoinSide, JoinStats, WindowedJoin};
pub use joiner::{Joiner, PurchaseJoiner};
pub use window::JoinWindow;
