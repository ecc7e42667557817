//! Named routing predicates.

use shared_types::{Event, Purchase};
use std::fmt;
use std::sync::Arc;

type PredicateFn<P> = Arc<dyn Fn(&Event<P>) -> bool + Send + Sync>;

/// A category name paired with the test that selects it.
pub struct NamedPredicate<P> {
    name: String,
    test: PredicateFn<P>,
}

impl<P> NamedPredicate<P> {
    pub fn new(
        name: impl Into<String>,
        test: impl Fn(&Event<P>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            test: Arc::new(test),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, event: &Event<P>) -> bool {
        (self.test)(event)
    }
}

impl<P> Clone for NamedPredicate<P> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            test: self.test.clone(),
        }
    }
}

impl<P> fmt::Debug for NamedPredicate<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedPredicate")
            .field("name", &self.name)
            .finish()
    }
}

/// Purchases whose department equals `department`, ignoring ASCII case.
pub fn department_is(department: impl Into<String>) -> impl Fn(&Event<Purchase>) -> bool + Send + Sync {
    let department = department.into();
    move |event: &Event<Purchase>| event.payload.department.eq_ignore_ascii_case(&department)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_department(department: &str) -> Event<Purchase> {
        Event::new(
            "c1",
            Purchase {
                department: department.into(),
                ..Default::default()
            },
            0,
            0,
        )
    }

    #[test]
    fn test_department_is_case_insensitive() {
        let coffee = department_is("coffee");
        assert!(coffee(&in_department("Coffee")));
        assert!(coffee(&in_department("COFFEE")));
        assert!(!coffee(&in_department("coffee beans")));
    }

    #[test]
    fn test_named_predicate() {
        let p = NamedPredicate::new("electronics", department_is("electronics"));
        assert_eq!(p.name(), "electronics");
        assert!(p.matches(&in_department("Electronics")));
        assert!(!p.matches(&in_department("garden")));
    }
}
