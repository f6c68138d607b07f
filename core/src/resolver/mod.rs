//! Type-directed token resolution.
//!
//! [`ResolverRegistry`] maps a target type to a [`TokenResolver`]. Dispatch is
//! most-specific first:
//!
//! 1. a resolver registered for the exact type,
//! 2. the collection shape of the type (`Vec`, `Box<[_]>`, sets), resolving
//!    each element through this same registry,
//! 3. the type's own [`OptionValue::from_token`] fallback.
//!
//! The table is filled once before parsing and only read afterwards.
//!
//! # Examples
//!
//! ```
//! use argtree_core::{ArgumentModel, ResolverRegistry};
//!
//! let registry = ResolverRegistry::with_defaults();
//! let port: u16 = registry
//!     .resolve("--port", &ArgumentModel::new("--port", Some("8080")))
//!     .unwrap();
//! assert_eq!(port, 8080);
//! ```

mod builtin;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub use builtin::{BoolResolver, DecimalResolver, FloatResolver, IntegerResolver, StringResolver};

use crate::error::ResolveError;
use crate::types::ArgumentModel;
use crate::value::{OptionValue, ParsedValue};

/// Converts tokens into a `T`.
///
/// `can_resolve` is always asked before `resolve`, so `resolve` may assume the
/// model was accepted.
pub trait TokenResolver<T>: Send + Sync {
    /// Returns `true` if `model` can be converted.
    fn can_resolve(&self, model: &ArgumentModel) -> bool;

    /// Converts `model` into a value.
    fn resolve(&self, model: &ArgumentModel) -> Result<T, String>;

    /// Whether the token following the option name is consumed as its value.
    fn takes_value(&self, _model: &ArgumentModel) -> bool {
        true
    }
}

/// How many tokens an option consumes after its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Presence alone is the value.
    Flag,
    /// Exactly one value token, when available.
    Single,
    /// Every following token up to the next known name.
    Greedy,
}

/// Registry of resolvers keyed by target type.
#[derive(Clone, Default)]
pub struct ResolverRegistry {
    resolvers: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ResolverRegistry {
    /// Creates a registry without any resolver; every type falls back to
    /// [`OptionValue::from_token`].
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in resolvers: `bool`, every integer
    /// type, `f32`, `f64`, [`rust_decimal::Decimal`] and `String`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register::<bool>(BoolResolver);
        registry.register::<i8>(IntegerResolver::<i8>::new());
        registry.register::<i16>(IntegerResolver::<i16>::new());
        registry.register::<i32>(IntegerResolver::<i32>::new());
        registry.register::<i64>(IntegerResolver::<i64>::new());
        registry.register::<i128>(IntegerResolver::<i128>::new());
        registry.register::<isize>(IntegerResolver::<isize>::new());
        registry.register::<u8>(IntegerResolver::<u8>::new());
        registry.register::<u16>(IntegerResolver::<u16>::new());
        registry.register::<u32>(IntegerResolver::<u32>::new());
        registry.register::<u64>(IntegerResolver::<u64>::new());
        registry.register::<u128>(IntegerResolver::<u128>::new());
        registry.register::<usize>(IntegerResolver::<usize>::new());
        registry.register::<f32>(FloatResolver::<f32>::new());
        registry.register::<f64>(FloatResolver::<f64>::new());
        registry.register::<rust_decimal::Decimal>(DecimalResolver);
        registry.register::<String>(StringResolver);
        registry
    }

    /// Adds or replaces the resolver for `T`.
    ///
    /// # Examples
    ///
    /// ```
    /// use argtree_core::{ArgumentModel, ResolverRegistry, TokenResolver};
    ///
    /// struct Percent;
    ///
    /// impl TokenResolver<u8> for Percent {
    ///     fn can_resolve(&self, model: &ArgumentModel) -> bool {
    ///         model.value.as_deref().is_some_and(|v| v.ends_with('%'))
    ///     }
    ///     fn resolve(&self, model: &ArgumentModel) -> Result<u8, String> {
    ///         let raw = model.value.as_deref().unwrap_or_default();
    ///         raw.trim_end_matches('%').parse().map_err(|e| format!("{e}"))
    ///     }
    /// }
    ///
    /// let mut registry = ResolverRegistry::with_defaults();
    /// registry.register::<u8>(Percent);
    ///
    /// let value: u8 = registry
    ///     .resolve("--ratio", &ArgumentModel::new("--ratio", Some("40%")))
    ///     .unwrap();
    /// assert_eq!(value, 40);
    /// assert!(registry
    ///     .resolve::<u8>("--ratio", &ArgumentModel::new("--ratio", Some("40")))
    ///     .is_err());
    /// ```
    pub fn register<T: OptionValue>(&mut self, resolver: impl TokenResolver<T> + 'static) {
        let resolver: Arc<dyn TokenResolver<T>> = Arc::new(resolver);
        self.resolvers.insert(TypeId::of::<T>(), Arc::new(resolver));
    }

    /// Returns the resolver registered for exactly `T`.
    pub fn resolver<T: OptionValue>(&self) -> Option<&Arc<dyn TokenResolver<T>>> {
        self.resolvers
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<Arc<dyn TokenResolver<T>>>())
    }

    /// Returns `true` if a resolver is registered for exactly `T`.
    pub fn contains<T: OptionValue>(&self) -> bool {
        self.resolvers.contains_key(&TypeId::of::<T>())
    }

    /// Number of registered resolvers.
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Resolves one token into a `T` using the exact resolver, or the
    /// fallback conversion when none is registered.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolveError`] naming the token, `option` and the expected
    /// type when the token cannot be converted.
    pub fn resolve<T: OptionValue>(
        &self,
        option: &str,
        model: &ArgumentModel,
    ) -> Result<T, ResolveError> {
        let failure = |reason: String| ResolveError {
            token: model.token().to_string(),
            option: option.to_string(),
            expected: std::any::type_name::<T>().to_string(),
            reason,
        };

        if let Some(resolver) = self.resolver::<T>() {
            if !resolver.can_resolve(model) {
                return Err(failure(match model.value {
                    Some(_) => "value not accepted".to_string(),
                    None => "missing value".to_string(),
                }));
            }
            return resolver.resolve(model).map_err(failure);
        }

        match model.value.as_deref() {
            Some(token) => T::from_token(token)
                .ok_or_else(|| failure("no resolver accepts the value".to_string())),
            None => Err(failure("missing value".to_string())),
        }
    }

    /// Decides how many tokens an option of type `T` consumes, given the
    /// candidate value in `model`.
    pub(crate) fn arity<T: OptionValue>(&self, model: &ArgumentModel) -> Arity {
        if let Some(resolver) = self.resolver::<T>() {
            if resolver.takes_value(model) {
                Arity::Single
            } else {
                Arity::Flag
            }
        } else if T::SHAPE.is_collection() {
            Arity::Greedy
        } else {
            Arity::Single
        }
    }

    /// Resolves every captured occurrence of an option.
    ///
    /// Scalars (and types with an exact resolver) resolve each occurrence and
    /// keep the last one; collection shapes treat every model as an element.
    pub(crate) fn resolve_occurrences<T: OptionValue>(
        &self,
        option: &str,
        models: &[ArgumentModel],
    ) -> Result<ParsedValue, Vec<ResolveError>> {
        if !self.contains::<T>() && T::SHAPE.is_collection() {
            return T::from_elements(self, option, models).map(ParsedValue::new);
        }

        let mut last = None;
        let mut errors = Vec::new();
        for model in models {
            match self.resolve::<T>(option, model) {
                Ok(value) => last = Some(value),
                Err(err) => errors.push(err),
            }
        }
        match last {
            Some(value) if errors.is_empty() => Ok(ParsedValue::new(value)),
            _ if !errors.is_empty() => Err(errors),
            _ => Err(vec![ResolveError {
                token: option.to_string(),
                option: option.to_string(),
                expected: std::any::type_name::<T>().to_string(),
                reason: "no value given".to_string(),
            }]),
        }
    }
}

impl fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("resolvers", &self.resolvers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashSet};

    use super::*;

    fn element(value: &str) -> ArgumentModel {
        ArgumentModel::new("--items", Some(value))
    }

    #[test]
    fn test_defaults_cover_builtin_scalars() {
        let registry = ResolverRegistry::with_defaults();
        assert!(registry.contains::<bool>());
        assert!(registry.contains::<i64>());
        assert!(registry.contains::<f64>());
        assert!(registry.contains::<rust_decimal::Decimal>());
        assert!(registry.contains::<String>());
        assert!(!registry.contains::<Vec<String>>());
    }

    #[test]
    fn test_resolve_reports_token_option_and_type() {
        let registry = ResolverRegistry::with_defaults();
        let err = registry
            .resolve::<i32>("--count", &ArgumentModel::new("--count", Some("abc")))
            .unwrap_err();
        assert_eq!(err.token, "abc");
        assert_eq!(err.option, "--count");
        assert_eq!(err.expected, "i32");
    }

    #[test]
    fn test_missing_value_names_the_option_token() {
        let registry = ResolverRegistry::with_defaults();
        let err = registry
            .resolve::<String>("--name", &ArgumentModel::new("--name", None))
            .unwrap_err();
        assert_eq!(err.token, "--name");
        assert_eq!(err.reason, "missing value");
    }

    #[test]
    fn test_fallback_used_without_registered_resolver() {
        let registry = ResolverRegistry::empty();
        let value: u32 = registry
            .resolve("--n", &ArgumentModel::new("--n", Some("7")))
            .unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_arity_by_type() {
        let registry = ResolverRegistry::with_defaults();
        let bare = ArgumentModel::new("--verbose", Some("build"));
        let literal = ArgumentModel::new("--verbose", Some("false"));
        assert_eq!(registry.arity::<bool>(&bare), Arity::Flag);
        assert_eq!(registry.arity::<bool>(&literal), Arity::Single);
        assert_eq!(registry.arity::<u32>(&bare), Arity::Single);
        assert_eq!(registry.arity::<Vec<u32>>(&bare), Arity::Greedy);
    }

    #[test]
    fn test_list_keeps_order_and_duplicates() {
        let registry = ResolverRegistry::with_defaults();
        let value = registry
            .resolve_occurrences::<Vec<String>>("--items", &[element("b"), element("a"), element("b")])
            .unwrap();
        assert_eq!(
            value.downcast_ref::<Vec<String>>(),
            Some(&vec!["b".to_string(), "a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_set_discards_duplicates_case_sensitively() {
        let registry = ResolverRegistry::with_defaults();
        let models = [element("a"), element("A"), element("a")];
        let value = registry
            .resolve_occurrences::<HashSet<String>>("--items", &models)
            .unwrap();
        assert_eq!(value.downcast_ref::<HashSet<String>>().unwrap().len(), 2);

        let value = registry
            .resolve_occurrences::<BTreeSet<i32>>("--items", &[element("3"), element("1"), element("3")])
            .unwrap();
        assert_eq!(
            value.downcast_ref::<BTreeSet<i32>>(),
            Some(&BTreeSet::from([1, 3]))
        );
    }

    #[test]
    fn test_sets_keep_first_of_equal_values() {
        use rust_decimal::Decimal;

        let registry = ResolverRegistry::with_defaults();
        let models = [element("1.0"), element("2"), element("1.00")];

        let value = registry
            .resolve_occurrences::<BTreeSet<Decimal>>("--items", &models)
            .unwrap();
        let rendered: Vec<String> = value
            .downcast_ref::<BTreeSet<Decimal>>()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(rendered, vec!["1.0", "2"]);

        let value = registry
            .resolve_occurrences::<HashSet<Decimal>>("--items", &models)
            .unwrap();
        let mut rendered: Vec<String> = value
            .downcast_ref::<HashSet<Decimal>>()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        rendered.sort();
        assert_eq!(rendered, vec!["1.0", "2"]);
    }

    #[test]
    fn test_collection_reports_every_bad_element() {
        let registry = ResolverRegistry::with_defaults();
        let errors = registry
            .resolve_occurrences::<Vec<u8>>("--items", &[element("1"), element("x"), element("300")])
            .unwrap_err();
        let tokens: Vec<_> = errors.iter().map(|e| e.token.as_str()).collect();
        assert_eq!(tokens, vec!["x", "300"]);
    }

    #[test]
    fn test_scalar_keeps_last_occurrence() {
        let registry = ResolverRegistry::with_defaults();
        let models = [
            ArgumentModel::new("--level", Some("1")),
            ArgumentModel::new("--level", Some("4")),
        ];
        let value = registry.resolve_occurrences::<i64>("--level", &models).unwrap();
        assert_eq!(value.downcast_ref::<i64>(), Some(&4));
    }

    #[test]
    fn test_registered_collection_resolver_overrides_shape() {
        struct Csv;
        impl TokenResolver<Vec<u32>> for Csv {
            fn can_resolve(&self, model: &ArgumentModel) -> bool {
                model.value.is_some()
            }
            fn resolve(&self, model: &ArgumentModel) -> Result<Vec<u32>, String> {
                model
                    .value
                    .as_deref()
                    .unwrap_or_default()
                    .split(',')
                    .map(|p| p.parse::<u32>().map_err(|e| e.to_string()))
                    .collect()
            }
        }

        let mut registry = ResolverRegistry::with_defaults();
        registry.register::<Vec<u32>>(Csv);
        let model = ArgumentModel::new("--ids", Some("1,2,3"));
        assert_eq!(registry.arity::<Vec<u32>>(&model), Arity::Single);
        let value = registry.resolve_occurrences::<Vec<u32>>("--ids", &[model]).unwrap();
        assert_eq!(value.downcast_ref::<Vec<u32>>(), Some(&vec![1, 2, 3]));
    }
}
