//! Domain layer: the two consumption models.

pub mod log;
pub mod view;

pub use log::{EventLog, ForwardLog, LogReader, Offset};
pub use view::MaterializedView;
