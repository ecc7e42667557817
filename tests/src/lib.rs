//! # StreamJoin Test Suite
//!
//! Cross-stage tests that no single crate can own.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/
//! │   ├── flows.rs         # stage chains driven directly, no runtime
//! │   └── e2e_pipeline.rs  # the full Pipeline over the in-memory bus
//! └── benches/
//!     └── window_buffer.rs # insert, probe and expiry throughput
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p sj-tests
//! cargo test -p sj-tests integration::flows::
//! cargo bench -p sj-tests
//! ```

pub mod integration;
