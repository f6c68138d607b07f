//! Environment variable sources.
//!
//! The manager consults an [`EnvironmentVariables`] source for options
//! declared with [`env`](crate::OptionBuilder::env) that were absent from the
//! input. The raw string goes through the option's resolver like any token.

use std::collections::HashMap;

/// Read-only lookup of environment variables.
pub trait EnvironmentVariables: Send + Sync {
    /// Returns the value of `name`, if set.
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Reads the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl EnvironmentVariables for ProcessEnvironment {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fixed set of variables, for tests and embedding.
///
/// # Examples
///
/// ```
/// use argtree_core::{EnvironmentVariables, MapEnvironment};
///
/// let env = MapEnvironment::new().with("APP_PORT", "9000");
/// assert_eq!(env.lookup("APP_PORT").as_deref(), Some("9000"));
/// assert_eq!(env.lookup("HOME"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapEnvironment {
    vars: HashMap<String, String>,
}

impl MapEnvironment {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces one variable.
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapEnvironment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl EnvironmentVariables for MapEnvironment {
    fn lookup(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_environment_from_pairs() {
        let env: MapEnvironment = [("A", "1"), ("B", "2")].into_iter().collect();
        assert_eq!(env.lookup("B").as_deref(), Some("2"));
        assert_eq!(env.with("B", "3").lookup("B").as_deref(), Some("3"));
    }

    #[test]
    fn test_process_environment_misses_unset_variable() {
        assert_eq!(
            ProcessEnvironment.lookup("ARGTREE_SURELY_UNSET_VARIABLE_1F2E"),
            None
        );
    }
}
