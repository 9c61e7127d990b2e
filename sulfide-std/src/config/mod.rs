//! Hierarchical, path-addressed settings.
//!
//! The tree is a `toml::Table`. Every internal node is a table; every other
//! value is a leaf. It is built once at boot from a fixed schema and is
//! append-only afterwards: [`ConfigTree::add`] never overwrites a non-empty
//! value, so loaded modules cannot silently replace defaults.

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::path::Path;
use sulfide_core::ConfigError;
use toml::{Table, Value};

const DEFAULTS: &str = include_str!("defaults.toml");

/// Joins a key path for error messages.
fn display_path<S: AsRef<str>>(path: &[S]) -> String {
    path.iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(".")
}

/// Whether `add` may replace this value.
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Table(t) => t.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::String(s) => s.is_empty(),
        Value::Integer(_) | Value::Float(_) | Value::Boolean(_) | Value::Datetime(_) => false,
    }
}

/// Walks `path` from `root`, returning the node it names.
fn walk<'a, S: AsRef<str>>(root: &'a Table, path: &[S]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = root.get(first.as_ref())?;
    for key in rest {
        current = current.as_table()?.get(key.as_ref())?;
    }
    Some(current)
}

/// The process-wide settings store.
///
/// Reads take a shared lock; writes only happen while modules load.
#[derive(Debug, Default)]
pub struct ConfigTree {
    root: RwLock<Table>,
}

impl ConfigTree {
    /// Create a tree from an existing table.
    pub fn new(root: Table) -> Self {
        Self {
            root: RwLock::new(root),
        }
    }

    /// Create a tree holding the bundled boot schema.
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::from_toml_str(DEFAULTS)
    }

    /// Parse a TOML document into a tree.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let root: Table = toml::from_str(source)?;
        Ok(Self::new(root))
    }

    /// Read and parse a TOML file into a tree.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Fetch the node at `path`.
    ///
    /// An empty path returns the whole tree.
    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> Result<Value, ConfigError> {
        let root = self.root.read();
        if path.is_empty() {
            return Ok(Value::Table(root.clone()));
        }
        walk(&root, path)
            .cloned()
            .ok_or_else(|| ConfigError::KeyNotFound {
                path: display_path(path),
            })
    }

    /// Whether `path` names a node. Never fails.
    pub fn exists<S: AsRef<str>>(&self, path: &[S]) -> bool {
        !path.is_empty() && walk(&self.root.read(), path).is_some()
    }

    /// Fetch a string leaf.
    pub fn get_str<S: AsRef<str>>(&self, path: &[S]) -> Result<String, ConfigError> {
        match self.get(path)? {
            Value::String(s) => Ok(s),
            _ => Err(ConfigError::TypeMismatch {
                path: display_path(path),
                expected: "a string",
            }),
        }
    }

    /// Fetch an integer leaf.
    pub fn get_integer<S: AsRef<str>>(&self, path: &[S]) -> Result<i64, ConfigError> {
        match self.get(path)? {
            Value::Integer(i) => Ok(i),
            _ => Err(ConfigError::TypeMismatch {
                path: display_path(path),
                expected: "an integer",
            }),
        }
    }

    /// Fetch a group.
    pub fn get_table<S: AsRef<str>>(&self, path: &[S]) -> Result<Table, ConfigError> {
        match self.get(path)? {
            Value::Table(t) => Ok(t),
            _ => Err(ConfigError::TypeMismatch {
                path: display_path(path),
                expected: "a group",
            }),
        }
    }

    /// Deserialize the node at `path` into a typed settings struct.
    pub fn get_as<T, S>(&self, path: &[S]) -> Result<T, ConfigError>
    where
        T: DeserializeOwned,
        S: AsRef<str>,
    {
        self.get(path)?
            .try_into::<T>()
            .map_err(|_| ConfigError::TypeMismatch {
                path: display_path(path),
                expected: "in the expected shape",
            })
    }

    /// Add `value` at `path`.
    ///
    /// Missing intermediate groups are created. Fails with
    /// [`ConfigError::InvalidPath`] if any segment is empty, and with
    /// [`ConfigError::KeyConflict`] if an intermediate segment is a leaf or the
    /// terminal node already holds a non-empty value. A failed call leaves the
    /// tree unchanged.
    pub fn add<S: AsRef<str>>(&self, value: impl Into<Value>, path: &[S]) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidPath {
            path: display_path(path),
        };
        if path.iter().any(|s| s.as_ref().is_empty()) {
            return Err(invalid());
        }
        let Some((last, parents)) = path.split_last() else {
            return Err(invalid());
        };

        let mut root = self.root.write();
        Self::check_insertable(&root, path)?;

        let mut current = &mut *root;
        for key in parents {
            let node = current
                .entry(key.as_ref())
                .or_insert_with(|| Value::Table(Table::new()));
            match node {
                Value::Table(t) => current = t,
                _ => {
                    return Err(ConfigError::KeyConflict {
                        path: display_path(path),
                        reason: "a segment of the path is not a group",
                    });
                }
            }
        }
        current.insert(last.as_ref().to_owned(), value.into());
        Ok(())
    }

    fn check_insertable<S: AsRef<str>>(root: &Table, path: &[S]) -> Result<(), ConfigError> {
        let (last, parents) = match path.split_last() {
            Some(split) => split,
            None => return Ok(()),
        };
        let mut current = root;
        for key in parents {
            match current.get(key.as_ref()) {
                None => return Ok(()),
                Some(Value::Table(t)) => current = t,
                Some(_) => {
                    return Err(ConfigError::KeyConflict {
                        path: display_path(path),
                        reason: "a segment of the path is not a group",
                    });
                }
            }
        }
        match current.get(last.as_ref()) {
            Some(existing) if !is_empty(existing) => Err(ConfigError::KeyConflict {
                path: display_path(path),
                reason: "the path already holds a value",
            }),
            _ => Ok(()),
        }
    }
}
