// Copyright (c) Contributors to the ccc project.
// SPDX-License-Identifier: Apache-2.0

//! Composable predicates.

use std::ops::Not;
use std::path::Path;

use glob::Pattern;

use crate::{Error, Result};

#[cfg(test)]
#[path = "./filter_test.rs"]
mod filter_test;

type Predicate<T> = Box<dyn Fn(&T) -> bool>;

/// A predicate that can be combined with others.
///
/// ```
/// use ccc::Filter;
///
/// let starts_with_o = Filter::<&str>::new(|s| s.starts_with('o'));
/// let ends_with_e = Filter::<&str>::new(|s| s.ends_with('e'));
/// let filter = starts_with_o.or(ends_with_e);
///
/// let items: Vec<_> = filter.apply(["one", "two", "three"]).collect();
/// assert_eq!(items, vec!["one", "three"]);
/// ```
pub struct Filter<T: ?Sized> {
    predicate: Predicate<T>,
}

impl<T: ?Sized + 'static> Filter<T> {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&T) -> bool + 'static,
    {
        Self {
            predicate: Box::new(predicate),
        }
    }

    /// Matches what both filters match.
    pub fn and(self, other: Filter<T>) -> Self {
        Self::new(move |item| self.matches(item) && other.matches(item))
    }

    /// Matches what either filter matches.
    pub fn or(self, other: Filter<T>) -> Self {
        Self::new(move |item| self.matches(item) || other.matches(item))
    }

    pub fn negate(self) -> Self {
        Self::new(move |item| !self.matches(item))
    }

    /// Matches when every filter matches. An empty set matches everything.
    pub fn all<I: IntoIterator<Item = Filter<T>>>(filters: I) -> Self {
        let filters: Vec<_> = filters.into_iter().collect();
        Self::new(move |item| filters.iter().all(|f| f.matches(item)))
    }

    /// Matches when any filter matches. An empty set matches nothing.
    pub fn any<I: IntoIterator<Item = Filter<T>>>(filters: I) -> Self {
        let filters: Vec<_> = filters.into_iter().collect();
        Self::new(move |item| filters.iter().any(|f| f.matches(item)))
    }

    pub fn matches(&self, item: &T) -> bool {
        (self.predicate)(item)
    }
}

impl<T: 'static> Filter<T> {
    /// Lazily keep the items this filter matches.
    pub fn apply<'a, I>(&'a self, items: I) -> impl Iterator<Item = T> + 'a
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: 'a,
    {
        items.into_iter().filter(move |item| self.matches(item))
    }
}

impl<T: ?Sized + 'static> Not for Filter<T> {
    type Output = Self;

    fn not(self) -> Self::Output {
        self.negate()
    }
}

/// Compile glob patterns, naming the first one that is invalid.
pub fn compile_patterns<I, S>(patterns: I) -> Result<Vec<Pattern>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    patterns
        .into_iter()
        .map(|pattern| {
            let pattern = pattern.as_ref();
            Pattern::new(pattern).map_err(|error| Error::InvalidPattern {
                pattern: pattern.to_string(),
                error,
            })
        })
        .collect()
}

/// True if the base name of `path` matches one of `patterns`.
pub fn name_matches_any(path: &Path, patterns: &[Pattern]) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    patterns.iter().any(|p| p.matches(name))
}

/// Paths whose base name matches any of the glob `patterns`.
pub fn filename_matches<I, S>(patterns: I) -> Result<Filter<Path>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let patterns = compile_patterns(patterns)?;
    Ok(Filter::new(move |path: &Path| name_matches_any(path, &patterns)))
}

pub fn is_file() -> Filter<Path> {
    Filter::new(Path::is_file)
}

pub fn is_executable() -> Filter<Path> {
    Filter::new(crate::binaries::is_executable)
}
