//! First-match-wins branch router.

use shared_types::{Event, StageId};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

use super::error::RouterError;
use super::predicate::NamedPredicate;

/// A declared category: its position in declaration order and its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CategoryId {
    pub index: usize,
    pub name: Arc<str>,
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Outcome of routing one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// First category whose predicate matched.
    Category(CategoryId),
    /// No predicate matched; the event leaves the join path.
    Unrouted,
}

impl Route {
    pub fn category(&self) -> Option<&CategoryId> {
        match self {
            Self::Category(id) => Some(id),
            Self::Unrouted => None,
        }
    }
}

/// Live routing counters, shared by every worker using the router.
#[derive(Debug)]
pub struct RouterStats {
    routed: Vec<AtomicU64>,
    unrouted: AtomicU64,
}

impl RouterStats {
    fn new(categories: usize) -> Self {
        Self {
            routed: (0..categories).map(|_| AtomicU64::new(0)).collect(),
            unrouted: AtomicU64::new(0),
        }
    }

    pub fn routed(&self, category: &CategoryId) -> u64 {
        self.routed
            .get(category.index)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    pub fn unrouted(&self) -> u64 {
        self.unrouted.load(Ordering::Relaxed)
    }

    pub fn total_routed(&self) -> u64 {
        self.routed.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }
}

/// Routes each event to at most one category.
///
/// Predicates are evaluated in declaration order and the first that holds
/// wins, so overlapping predicates never duplicate an event.
pub struct BranchRouter<P> {
    branches: Vec<NamedPredicate<P>>,
    categories: Vec<CategoryId>,
    stats: Arc<RouterStats>,
}

impl<P> BranchRouter<P> {
    pub fn builder() -> BranchRouterBuilder<P> {
        BranchRouterBuilder::default()
    }

    /// Route one event and count the outcome.
    pub fn route(&self, event: &Event<P>) -> Route {
        let hit = self.branches.iter().position(|b| b.matches(event));

        match hit {
            Some(index) => {
                self.stats.routed[index].fetch_add(1, Ordering::Relaxed);
                let id = self.categories[index].clone();
                trace!(stage = %StageId::BranchRouter, key = %event.key, category = %id, "Routed");
                Route::Category(id)
            }
            None => {
                self.stats.unrouted.fetch_add(1, Ordering::Relaxed);
                trace!(stage = %StageId::BranchRouter, key = %event.key, "Unrouted");
                Route::Unrouted
            }
        }
    }

    /// Partition a batch into one vector per category, in declaration order.
    ///
    /// Unrouted events are dropped (and counted).
    pub fn split(&self, batch: impl IntoIterator<Item = Event<P>>) -> Vec<Vec<Event<P>>> {
        let mut out: Vec<Vec<Event<P>>> = self.categories.iter().map(|_| Vec::new()).collect();
        for event in batch {
            if let Route::Category(id) = self.route(&event) {
                out[id.index].push(event);
            }
        }
        out
    }

    /// Declared categories in order.
    pub fn categories(&self) -> &[CategoryId] {
        &self.categories
    }

    /// Look a category up by name.
    pub fn category(&self, name: &str) -> Option<&CategoryId> {
        self.categories.iter().find(|c| &*c.name == name)
    }

    pub fn stats(&self) -> Arc<RouterStats> {
        self.stats.clone()
    }
}

impl<P> fmt::Debug for BranchRouter<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BranchRouter")
            .field("categories", &self.categories)
            .finish()
    }
}

/// Collects branches and validates them on `build`.
pub struct BranchRouterBuilder<P> {
    branches: Vec<NamedPredicate<P>>,
}

impl<P> Default for BranchRouterBuilder<P> {
    fn default() -> Self {
        Self {
            branches: Vec::new(),
        }
    }
}

impl<P> BranchRouterBuilder<P> {
    /// Declare the next category.
    #[must_use]
    pub fn branch(
        mut self,
        name: impl Into<String>,
        test: impl Fn(&Event<P>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.branches.push(NamedPredicate::new(name, test));
        self
    }

    /// # Errors
    ///
    /// `RouterError` if there are no branches, a name is empty, or a name
    /// repeats.
    pub fn build(self) -> Result<BranchRouter<P>, RouterError> {
        if self.branches.is_empty() {
            return Err(RouterError::NoBranches);
        }

        let mut categories: Vec<CategoryId> = Vec::with_capacity(self.branches.len());
        for (index, branch) in self.branches.iter().enumerate() {
            let name = branch.name().trim();
            if name.is_empty() {
                return Err(RouterError::EmptyName { index });
            }
            if categories.iter().any(|c| &*c.name == name) {
                return Err(RouterError::DuplicateCategory {
                    name: name.to_string(),
                });
            }
            categories.push(CategoryId {
                index,
                name: Arc::from(name),
            });
        }

        Ok(BranchRouter {
            stats: Arc::new(RouterStats::new(categories.len())),
            branches: self.branches,
            categories,
        })
    }
}
