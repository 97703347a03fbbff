/*!
 * Key Ranges
 */

use std::ops::Bound;

use super::key::Key;

/// Interval over keys with optional, optionally open bounds
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyRange {
    lower: Option<Key>,
    upper: Option<Key>,
    lower_open: bool,
    upper_open: bool,
}

impl KeyRange {
    /// Every key
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Exactly one key
    pub fn only(key: impl Into<Key>) -> Self {
        let key = key.into();
        Self {
            lower: Some(key.clone()),
            upper: Some(key),
            lower_open: false,
            upper_open: false,
        }
    }

    pub fn lower_bound(key: impl Into<Key>, open: bool) -> Self {
        Self {
            lower: Some(key.into()),
            lower_open: open,
            ..Self::default()
        }
    }

    pub fn upper_bound(key: impl Into<Key>, open: bool) -> Self {
        Self {
            upper: Some(key.into()),
            upper_open: open,
            ..Self::default()
        }
    }

    pub fn bound(
        lower: impl Into<Key>,
        upper: impl Into<Key>,
        lower_open: bool,
        upper_open: bool,
    ) -> Self {
        Self {
            lower: Some(lower.into()),
            upper: Some(upper.into()),
            lower_open,
            upper_open,
        }
    }

    /// Every string key starting with `prefix`
    ///
    /// The upper bound is `prefix` followed by the highest code point.
    pub fn prefix(prefix: &str) -> Self {
        Self::bound(
            prefix.to_string(),
            format!("{}{}", prefix, char::MAX),
            false,
            false,
        )
    }

    pub fn contains(&self, key: &Key) -> bool {
        let above = match &self.lower {
            Some(lower) if self.lower_open => key > lower,
            Some(lower) => key >= lower,
            None => true,
        };
        let below = match &self.upper {
            Some(upper) if self.upper_open => key < upper,
            Some(upper) => key <= upper,
            None => true,
        };
        above && below
    }

    /// True when no key can fall inside the range
    pub fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Some(lower), Some(upper)) => {
                lower > upper || (lower == upper && (self.lower_open || self.upper_open))
            }
            _ => false,
        }
    }

    /// Bounds suitable for `BTreeMap::range`
    ///
    /// Callers check `is_empty` first; `BTreeMap::range` rejects inverted
    /// bounds.
    pub fn as_bounds(&self) -> (Bound<&Key>, Bound<&Key>) {
        let lower = match &self.lower {
            Some(key) if self.lower_open => Bound::Excluded(key),
            Some(key) => Bound::Included(key),
            None => Bound::Unbounded,
        };
        let upper = match &self.upper {
            Some(key) if self.upper_open => Bound::Excluded(key),
            Some(key) => Bound::Included(key),
            None => Bound::Unbounded,
        };
        (lower, upper)
    }
}
