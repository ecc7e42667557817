//! # Purchase Topology
//!
//! The code-level half of the pipeline configuration: which transforms run,
//! how purchases are routed, and which two categories feed the join.
//!
//! ```text
//! SourceRecord ─► EventTimeAssigner ─► TransformChain ─► BranchRouter ─┬─ coffee ──────► left
//!                                       (mask, rekey)                   ├─ electronics ─► right
//!                                                                       └─ unrouted ────► counted, dropped
//! ```

use shared_types::Purchase;
use sj_02_record_transform::TransformChain;
use sj_03_branch_router::{department_is, BranchRouter, CategoryId, RouterError};
use sj_04_windowed_join::{JoinSide, PurchaseJoiner};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error(transparent)]
    Router(#[from] RouterError),

    #[error("Join input `{0}` is not a declared category")]
    UnknownCategory(String),

    #[error("Category `{0}` cannot feed both join inputs")]
    SameCategory(String),
}

/// Immutable stage wiring for the purchase stream.
#[derive(Debug)]
pub struct PurchaseTopology {
    pub transforms: TransformChain<Purchase>,
    pub router: BranchRouter<Purchase>,
    pub joiner: PurchaseJoiner,
    pub left: CategoryId,
    pub right: CategoryId,
}

impl PurchaseTopology {
    pub const COFFEE: &'static str = "coffee";
    pub const ELECTRONICS: &'static str = "electronics";

    /// Mask, rekey by customer, route coffee and electronics, join the two.
    ///
    /// # Errors
    ///
    /// Only if the built-in declaration is inconsistent.
    pub fn correlated_purchases() -> Result<Self, TopologyError> {
        let router = BranchRouter::builder()
            .branch(Self::COFFEE, department_is(Self::COFFEE))
            .branch(Self::ELECTRONICS, department_is(Self::ELECTRONICS))
            .build()?;

        Self::new(
            TransformChain::purchase_default(),
            router,
            Self::COFFEE,
            Self::ELECTRONICS,
        )
    }

    /// # Errors
    ///
    /// `TopologyError` if either join input is not a category of `router`,
    /// or both name the same category.
    pub fn new(
        transforms: TransformChain<Purchase>,
        router: BranchRouter<Purchase>,
        left: &str,
        right: &str,
    ) -> Result<Self, TopologyError> {
        if left == right {
            return Err(TopologyError::SameCategory(left.to_string()));
        }
        let lookup = |name: &str| {
            router
                .category(name)
                .cloned()
                .ok_or_else(|| TopologyError::UnknownCategory(name.to_string()))
        };
        let left = lookup(left)?;
        let right = lookup(right)?;

        Ok(Self {
            transforms,
            router,
            joiner: PurchaseJoiner,
            left,
            right,
        })
    }

    /// Join input fed by `category`, if any.
    pub fn side_of(&self, category: &CategoryId) -> Option<JoinSide> {
        if *category == self.left {
            Some(JoinSide::Left)
        } else if *category == self.right {
            Some(JoinSide::Right)
        } else {
            None
        }
    }
}
