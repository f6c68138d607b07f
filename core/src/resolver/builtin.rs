//! Built-in resolvers for the scalar types registered by
//! [`ResolverRegistry::with_defaults`](super::ResolverRegistry::with_defaults).
//!
//! Numbers are parsed culture-invariant: `.` is the decimal separator and no
//! digit grouping is accepted.

use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;

use rust_decimal::Decimal;

use super::TokenResolver;
use crate::types::ArgumentModel;

const TRUE_LITERALS: &[&str] = &["true", "yes", "on", "1"];
const FALSE_LITERALS: &[&str] = &["false", "no", "off", "0"];

fn parse_bool(token: &str) -> Option<bool> {
    let token = token.trim().to_ascii_lowercase();
    if TRUE_LITERALS.contains(&token.as_str()) {
        Some(true)
    } else if FALSE_LITERALS.contains(&token.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Flag-style boolean resolver.
///
/// A bare option name yields `true`; a following boolean literal
/// (`true/false`, `yes/no`, `on/off`, `1/0`) is consumed as the value.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolResolver;

impl TokenResolver<bool> for BoolResolver {
    fn can_resolve(&self, model: &ArgumentModel) -> bool {
        model.value.as_deref().is_none_or(|v| parse_bool(v).is_some())
    }

    fn resolve(&self, model: &ArgumentModel) -> Result<bool, String> {
        match model.value.as_deref() {
            None => Ok(true),
            Some(token) => parse_bool(token).ok_or_else(|| format!("`{token}` is not a boolean")),
        }
    }

    fn takes_value(&self, model: &ArgumentModel) -> bool {
        model.value.as_deref().and_then(parse_bool).is_some()
    }
}

fn parse_number<T>(model: &ArgumentModel) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    let token = model.value.as_deref().ok_or("missing value")?;
    token.trim().parse::<T>().map_err(|err| err.to_string())
}

/// Resolver for the primitive integer types.
#[derive(Debug, Clone, Copy)]
pub struct IntegerResolver<T>(PhantomData<fn() -> T>);

impl<T> IntegerResolver<T> {
    /// Creates the resolver.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for IntegerResolver<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TokenResolver<T> for IntegerResolver<T>
where
    T: FromStr + 'static,
    T::Err: Display,
{
    fn can_resolve(&self, model: &ArgumentModel) -> bool {
        parse_number::<T>(model).is_ok()
    }

    fn resolve(&self, model: &ArgumentModel) -> Result<T, String> {
        parse_number(model)
    }
}

/// Resolver for `f32` and `f64`.
///
/// Rejects `NaN` and infinities, which `FromStr` would otherwise accept.
#[derive(Debug, Clone, Copy)]
pub struct FloatResolver<T>(PhantomData<fn() -> T>);

impl<T> FloatResolver<T> {
    /// Creates the resolver.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for FloatResolver<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TokenResolver<T> for FloatResolver<T>
where
    T: FromStr + Into<f64> + Copy + 'static,
    T::Err: Display,
{
    fn can_resolve(&self, model: &ArgumentModel) -> bool {
        self.resolve(model).is_ok()
    }

    fn resolve(&self, model: &ArgumentModel) -> Result<T, String> {
        let value = parse_number::<T>(model)?;
        if value.into().is_finite() {
            Ok(value)
        } else {
            Err("value is not a finite number".to_string())
        }
    }
}

/// Resolver for [`rust_decimal::Decimal`]; also accepts scientific notation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalResolver;

impl TokenResolver<Decimal> for DecimalResolver {
    fn can_resolve(&self, model: &ArgumentModel) -> bool {
        self.resolve(model).is_ok()
    }

    fn resolve(&self, model: &ArgumentModel) -> Result<Decimal, String> {
        let token = model.value.as_deref().ok_or("missing value")?.trim();
        Decimal::from_str(token)
            .or_else(|_| Decimal::from_scientific(token))
            .map_err(|err| err.to_string())
    }
}

/// Resolver for `String`; takes the token verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringResolver;

impl TokenResolver<String> for StringResolver {
    fn can_resolve(&self, model: &ArgumentModel) -> bool {
        model.value.is_some()
    }

    fn resolve(&self, model: &ArgumentModel) -> Result<String, String> {
        model.value.clone().ok_or_else(|| "missing value".to_string())
    }
}
