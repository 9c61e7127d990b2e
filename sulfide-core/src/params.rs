//! Request parameters: an ordered mapping keyed by position or by name.

use indexmap::IndexMap;
use std::fmt;

/// A parameter key: a position in the path, or a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamKey {
    /// A positional parameter.
    Index(usize),
    /// A named parameter.
    Name(String),
}

impl From<usize> for ParamKey {
    fn from(index: usize) -> Self {
        ParamKey::Index(index)
    }
}

impl From<&str> for ParamKey {
    fn from(name: &str) -> Self {
        ParamKey::Name(name.to_owned())
    }
}

impl From<String> for ParamKey {
    fn from(name: String) -> Self {
        ParamKey::Name(name)
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKey::Index(i) => write!(f, "{i}"),
            ParamKey::Name(n) => f.write_str(n),
        }
    }
}

/// An ordered-but-keyable parameter store.
///
/// A missing parameter is `None`; an empty string is a present value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    entries: IndexMap<ParamKey, String>,
}

impl Parameters {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from positional values, keyed `0..n`.
    pub fn positional<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: values
                .into_iter()
                .enumerate()
                .map(|(i, v)| (ParamKey::Index(i), v.into()))
                .collect(),
        }
    }

    /// Look up a parameter.
    pub fn get(&self, key: impl Into<ParamKey>) -> Option<&str> {
        self.entries.get(&key.into()).map(String::as_str)
    }

    /// Set a parameter, keeping its position if it already exists.
    pub fn set(&mut self, key: impl Into<ParamKey>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Remove a parameter, preserving the order of the rest.
    pub fn remove(&mut self, key: impl Into<ParamKey>) -> Option<String> {
        self.entries.shift_remove(&key.into())
    }

    /// Insert a positional value at the front.
    ///
    /// Every positional key shifts up by one; named keys are kept.
    pub fn prepend(&mut self, value: impl Into<String>) {
        let mut entries = IndexMap::with_capacity(self.entries.len() + 1);
        entries.insert(ParamKey::Index(0), value.into());
        for (key, v) in self.entries.drain(..) {
            let key = match key {
                ParamKey::Index(i) => ParamKey::Index(i + 1),
                named => named,
            };
            entries.insert(key, v);
        }
        self.entries = entries;
    }

    /// Positional values in insertion order.
    pub fn positional_values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|(k, v)| match k {
            ParamKey::Index(_) => Some(v.as_str()),
            ParamKey::Name(_) => None,
        })
    }

    /// All entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&ParamKey, &str)> {
        self.entries.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<ParamKey>, V: Into<String>> FromIterator<(K, V)> for Parameters {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_is_distinct_from_empty() {
        let mut params = Parameters::positional(["", "0"]);
        params.set("flag", "");

        assert_eq!(params.get(0), Some(""));
        assert_eq!(params.get(1), Some("0"));
        assert_eq!(params.get("flag"), Some(""));
        assert_eq!(params.get(2), None);
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn test_prepend_shifts_positions_and_keeps_names() {
        let mut params: Parameters = [
            (ParamKey::Index(0), "a"),
            (ParamKey::Name("mode".into()), "full"),
            (ParamKey::Index(1), "b"),
        ]
        .into_iter()
        .collect();

        params.prepend("foo");

        assert_eq!(params.get(0), Some("foo"));
        assert_eq!(params.get(1), Some("a"));
        assert_eq!(params.get(2), Some("b"));
        assert_eq!(params.get("mode"), Some("full"));
        assert_eq!(
            params.positional_values().collect::<Vec<_>>(),
            vec!["foo", "a", "b"]
        );
    }

    #[test]
    fn test_set_overwrites_in_place() {
        let mut params = Parameters::positional(["x", "y"]);
        params.set(0, "z");
        assert_eq!(params.positional_values().collect::<Vec<_>>(), vec!["z", "y"]);
        assert_eq!(params.remove(0), Some("z".to_string()));
        assert_eq!(params.len(), 1);
    }
}
