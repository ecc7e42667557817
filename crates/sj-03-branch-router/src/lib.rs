//! # SJ-03 Branch Router
//!
//! Splits one keyed stream into disjoint categories by predicate.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`)
//!   - `NamedPredicate`: a category name plus the test selecting it
//!   - `BranchRouter`: ordered predicates, first match wins
//!   - `BranchRouterBuilder`: validates the declaration at construction
//!   - `RouterStats`: routed-per-category and unrouted counters
//!
//! - **Ports Layer** (`ports/`)
//!   - `BranchRouterApi`: Driving port used by ingest workers
//!
//! ## Invariants
//!
//! - An event is routed to at most one category.
//! - Categories are evaluated in declaration order.
//! - Unrouted events are counted and leave the join path; they are not errors.
//!
//! ## Usage Example
//!
//! ```ignore
//! use sj_03_branch_router::{BranchRouter, department_is};
//!
//! let router = BranchRouter::builder()
//!     .branch("coffee", department_is("coffee"))
//!     .branch("electronics", department_is("electronics"))
//!     .build()?;
//!
//! match router.route(&event) {
//!     Route::Category(id) => { /* forward to the join side for `id` */ }
//!     Route::Unrouted => {}
//! }
//! ```

pub mod domain;
pub mod ports;

pub use domain::{
    department_is, BranchRouter, BranchRouterBuilder, CategoryId, NamedPredicate, Route,
    RouterError, RouterStats,
};
pub use ports::BranchRouterApi;
