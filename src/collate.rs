//! Deterministic string collation for namespace ordering
//!
//! Namespace children are kept sorted at every tree level so that lookups
//! can binary-search and so that list rendering order is stable across
//! sessions. The invariant the tree relies on: given the same set of
//! names, the resulting order is identical regardless of insertion order.
//!
//! The collator compares case-insensitively first (Unicode lowercase) and
//! breaks ties with a plain ordinal comparison, which keeps the ordering
//! total and locale-independent. A custom comparison can be supplied for
//! callers that want different rules.

use std::cmp::Ordering;
use std::sync::Arc;

/// Comparison function used to order sibling nodes.
pub type CompareFn = dyn Fn(&str, &str) -> Ordering + Send + Sync;

/// String collator with a stable, total ordering.
#[derive(Clone)]
pub struct Collator {
    compare: Arc<CompareFn>,
}

impl Default for Collator {
    fn default() -> Self {
        Self {
            compare: Arc::new(case_insensitive_compare),
        }
    }
}

impl std::fmt::Debug for Collator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collator").finish_non_exhaustive()
    }
}

impl Collator {
    /// Create a collator with a custom comparison function.
    ///
    /// The function must implement a total order, otherwise the sorted-children
    /// invariant of the namespace tree breaks.
    pub fn with_compare(compare: impl Fn(&str, &str) -> Ordering + Send + Sync + 'static) -> Self {
        Self {
            compare: Arc::new(compare),
        }
    }

    /// Compare two strings.
    #[inline]
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        (self.compare)(a, b)
    }
}

/// Case-insensitive comparison with an ordinal tie-break.
fn case_insensitive_compare(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    match folded {
        Ordering::Equal => a.cmp(b),
        other => other,
    }
}
