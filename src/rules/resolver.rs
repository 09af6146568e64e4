//! Pattern resolver: counter names in a store that match a pattern

use crate::counters::{CounterStore, CounterValue};
use regex::Regex;

/// One counter matched by a pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match<'a> {
    /// Counter name
    pub name: &'a str,
    /// Counter value
    pub value: &'a CounterValue,
}

/// All counters of `store` whose name matches `pattern`, in store order.
///
/// Zero matches is a valid result.
///
/// ```rust
/// use regex::Regex;
/// use simstats::counters::CounterStore;
/// use simstats::rules::resolve;
///
/// let store = CounterStore::from_iter([
///     ("system.cpu0.ipc", 1.2),
///     ("system.cpu1.ipc", 0.8),
///     ("system.l2.hits", 5.0),
/// ]);
/// let pattern = Regex::new(r"^system\.cpu\d+\.ipc$").unwrap();
/// let names: Vec<&str> = resolve(&store, &pattern).iter().map(|m| m.name).collect();
/// assert_eq!(names, ["system.cpu0.ipc", "system.cpu1.ipc"]);
/// ```
#[must_use]
pub fn resolve<'a>(store: &'a CounterStore, pattern: &Regex) -> Vec<Match<'a>> {
    store
        .iter()
        .filter(|(name, _)| pattern.is_match(name))
        .map(|(name, value)| Match { name, value })
        .collect()
}

/// Coerce matched values to floats.
///
/// Returns `None` if any match holds a raw, non-numeric token.
pub(crate) fn numeric_values(matches: &[Match<'_>]) -> Option<Vec<f64>> {
    matches.iter().map(|m| m.value.as_f64()).collect()
}
