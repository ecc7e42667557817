//! Cross-stage integration tests.

pub mod e2e_pipeline;
pub mod flows;
