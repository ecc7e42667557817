//! Domain layer: named predicates and the first-match router.

pub mod error;
pub mod predicate;
pub mod router;

pub use error::RouterError;
pub use predicate::{department_is, NamedPredicate};
pub use router::{BranchRouter, BranchRouterBuilder, CategoryId, Route, RouterStats};
