//! Typed option values and their type-erased storage.
//!
//! Every type an option can be declared with implements [`OptionValue`]. The
//! trait tells the resolver registry the value's [`ValueShape`], offers a
//! best-effort fallback conversion, and, for collection shapes, how to
//! assemble resolved elements. Bound values are stored as [`ParsedValue`], a
//! cheaply clonable, comparable, type-erased handle.

use std::any::{Any, TypeId};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::hash::Hash;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::error::ResolveError;
use crate::resolver::ResolverRegistry;
use crate::types::ArgumentModel;

/// Shape of an option's target type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueShape {
    /// A single value.
    Scalar,
    /// Fixed-size sequence (`Box<[T]>`).
    Array,
    /// Ordered, growable sequence (`Vec<T>`).
    List,
    /// Deduplicated collection (`BTreeSet<T>`, `HashSet<T>`).
    Set,
}

impl ValueShape {
    /// Returns `true` for the array, list and set shapes.
    pub fn is_collection(self) -> bool {
        !matches!(self, ValueShape::Scalar)
    }
}

/// Identifier of a declared value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    /// Runtime type identifier used for registry lookups.
    pub id: TypeId,
    /// Type name used in error messages.
    pub name: &'static str,
}

impl TypeKey {
    /// Returns the key for `T`.
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }
}

/// A type options can be declared with.
///
/// Built-in scalars and std collections implement it already. Custom types
/// either implement [`from_token`](OptionValue::from_token) or get a resolver
/// registered with [`ResolverRegistry::register`].
///
/// # Examples
///
/// ```
/// use argtree_core::{OptionValue, ValueShape};
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Level(u8);
///
/// impl OptionValue for Level {
///     fn from_token(token: &str) -> Option<Self> {
///         token.parse().ok().map(Level)
///     }
/// }
///
/// assert_eq!(Level::SHAPE, ValueShape::Scalar);
/// assert_eq!(Level::from_token("3"), Some(Level(3)));
/// ```
pub trait OptionValue: Any + Clone + PartialEq + fmt::Debug + Send + Sync {
    /// Shape of the type; anything other than `Scalar` consumes tokens greedily.
    const SHAPE: ValueShape = ValueShape::Scalar;

    /// Best-effort conversion used when no resolver is registered for the type.
    fn from_token(_token: &str) -> Option<Self> {
        None
    }

    /// Builds a collection from element tokens. Only called for collection
    /// shapes.
    fn from_elements(
        _registry: &ResolverRegistry,
        option: &str,
        _elements: &[ArgumentModel],
    ) -> Result<Self, Vec<ResolveError>> {
        Err(vec![ResolveError {
            token: option.to_string(),
            option: option.to_string(),
            expected: std::any::type_name::<Self>().to_string(),
            reason: "type is not a collection".to_string(),
        }])
    }
}

macro_rules! from_str_option_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl OptionValue for $ty {
                fn from_token(token: &str) -> Option<Self> {
                    <$ty as FromStr>::from_str(token.trim()).ok()
                }
            }
        )*
    };
}

from_str_option_value!(
    bool, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, char,
    String, PathBuf, IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, Decimal,
);

fn resolve_elements<E: OptionValue>(
    registry: &ResolverRegistry,
    option: &str,
    elements: &[ArgumentModel],
) -> Result<Vec<E>, Vec<ResolveError>> {
    let mut values = Vec::with_capacity(elements.len());
    let mut errors = Vec::new();
    for element in elements {
        match registry.resolve::<E>(option, element) {
            Ok(value) => values.push(value),
            Err(err) => errors.push(err),
        }
    }
    if errors.is_empty() {
        Ok(values)
    } else {
        Err(errors)
    }
}

impl<E: OptionValue> OptionValue for Vec<E> {
    const SHAPE: ValueShape = ValueShape::List;

    fn from_elements(
        registry: &ResolverRegistry,
        option: &str,
        elements: &[ArgumentModel],
    ) -> Result<Self, Vec<ResolveError>> {
        resolve_elements(registry, option, elements)
    }
}

impl<E: OptionValue> OptionValue for Box<[E]> {
    const SHAPE: ValueShape = ValueShape::Array;

    fn from_elements(
        registry: &ResolverRegistry,
        option: &str,
        elements: &[ArgumentModel],
    ) -> Result<Self, Vec<ResolveError>> {
        resolve_elements::<E>(registry, option, elements).map(Vec::into_boxed_slice)
    }
}

impl<E: OptionValue + Ord> OptionValue for BTreeSet<E> {
    const SHAPE: ValueShape = ValueShape::Set;

    fn from_elements(
        registry: &ResolverRegistry,
        option: &str,
        elements: &[ArgumentModel],
    ) -> Result<Self, Vec<ResolveError>> {
        // `collect` would keep the last of each equal run; `insert` leaves the
        // existing element in place, so the first occurrence wins.
        let values = resolve_elements::<E>(registry, option, elements)?;
        let mut set = BTreeSet::new();
        for value in values {
            set.insert(value);
        }
        Ok(set)
    }
}

impl<E: OptionValue + Eq + Hash> OptionValue for HashSet<E> {
    const SHAPE: ValueShape = ValueShape::Set;

    fn from_elements(
        registry: &ResolverRegistry,
        option: &str,
        elements: &[ArgumentModel],
    ) -> Result<Self, Vec<ResolveError>> {
        resolve_elements::<E>(registry, option, elements).map(|v| v.into_iter().collect())
    }
}

/// Object-safe view over any [`OptionValue`].
pub trait AnyValue: Any + fmt::Debug + Send + Sync {
    /// Upcasts to [`Any`] for downcasting.
    fn as_any(&self) -> &dyn Any;
    /// Structural equality across erased values of possibly different types.
    fn eq_value(&self, other: &dyn AnyValue) -> bool;
}

impl<T: OptionValue> AnyValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_value(&self, other: &dyn AnyValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }
}

/// A bound option value.
///
/// # Examples
///
/// ```
/// use argtree_core::ParsedValue;
///
/// let value = ParsedValue::new(42_i64);
/// assert_eq!(value.downcast_ref::<i64>(), Some(&42));
/// assert_eq!(value.downcast_ref::<u32>(), None);
/// assert_eq!(value, ParsedValue::new(42_i64));
/// ```
#[derive(Clone)]
pub struct ParsedValue(Arc<dyn AnyValue>);

impl ParsedValue {
    /// Wraps a typed value.
    pub fn new<T: OptionValue>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Returns the value if it is a `T`.
    pub fn downcast_ref<T: OptionValue>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    /// Returns `true` if the value is a `T`.
    pub fn is<T: OptionValue>(&self) -> bool {
        self.0.as_any().is::<T>()
    }
}

impl PartialEq for ParsedValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_value(other.0.as_ref())
    }
}

impl fmt::Debug for ParsedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
