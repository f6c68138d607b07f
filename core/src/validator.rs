//! Value validation.
//!
//! Validators are attached to an option while it is built
//! ([`OptionBuilder::validate`](crate::OptionBuilder::validate)) and run by
//! [`ValidatorPipeline`] after the value is resolved and transformed. Every
//! validator runs; failures do not stop the remaining validators or sibling
//! options.
//!
//! # Examples
//!
//! ```
//! use argtree_core::validators;
//! use argtree_core::Validator;
//!
//! let port = validators::range(1_u16, 1024);
//! assert!(port.validate(&80).is_ok());
//! assert!(port.validate(&8080).is_err());
//! ```

use std::fmt;
use std::sync::Arc;

use crate::types::OptionDescriptor;
use crate::value::{OptionValue, ParsedValue};

/// A pure check over a resolved value.
pub trait Validator<T>: Send + Sync {
    /// Returns `Err(message)` when `value` is rejected.
    fn validate(&self, value: &T) -> Result<(), String>;
}

impl<T, F> Validator<T> for F
where
    F: Fn(&T) -> Result<(), String> + Send + Sync,
{
    fn validate(&self, value: &T) -> Result<(), String> {
        self(value)
    }
}

type ErasedCheck = Arc<dyn Fn(&ParsedValue) -> Result<(), String> + Send + Sync>;

/// A validator attached to an option, with its type erased.
#[derive(Clone)]
pub struct NamedValidator {
    name: String,
    check: ErasedCheck,
}

impl NamedValidator {
    /// Wraps a typed validator. Values of another type are rejected.
    pub fn new<T: OptionValue>(name: &str, validator: impl Validator<T> + 'static) -> Self {
        let check: ErasedCheck = Arc::new(move |value: &ParsedValue| match value.downcast_ref::<T>() {
            Some(value) => validator.validate(value),
            None => Err(format!(
                "expected a value of type {}",
                std::any::type_name::<T>()
            )),
        });
        Self {
            name: name.to_string(),
            check,
        }
    }

    /// Validator name, reported with failures.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the check against a bound value.
    pub fn check(&self, value: &ParsedValue) -> Result<(), String> {
        (self.check)(value)
    }
}

impl fmt::Debug for NamedValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedValidator")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// One rejected value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    /// Name of the validator that failed.
    pub validator: String,
    /// Message returned by the validator.
    pub message: String,
}

/// Runs the validators of one option.
#[derive(Debug, Clone, Copy)]
pub struct ValidatorPipeline<'a> {
    validators: &'a [NamedValidator],
}

impl<'a> ValidatorPipeline<'a> {
    /// Pipeline over the validators attached to `option`.
    pub fn for_option(option: &'a OptionDescriptor) -> Self {
        Self {
            validators: &option.validators,
        }
    }

    /// Pipeline over an explicit validator list.
    pub fn new(validators: &'a [NamedValidator]) -> Self {
        Self { validators }
    }

    /// Runs every validator and returns all failures, in attachment order.
    pub fn run(&self, value: &ParsedValue) -> Vec<ValidationFailure> {
        self.validators
            .iter()
            .filter_map(|validator| {
                validator
                    .check(value)
                    .err()
                    .map(|message| ValidationFailure {
                        validator: validator.name().to_string(),
                        message,
                    })
            })
            .collect()
    }
}

/// Stock validators.
pub mod validators {
    use std::fmt::Display;

    use regex::Regex;

    use super::Validator;

    /// Inclusive numeric (or any ordered) range.
    pub fn range<T>(min: T, max: T) -> impl Validator<T>
    where
        T: PartialOrd + Display + Send + Sync + 'static,
    {
        move |value: &T| {
            if *value < min || *value > max {
                Err(format!("{value} is outside {min}..={max}"))
            } else {
                Ok(())
            }
        }
    }

    /// Value must be one of `allowed`.
    pub fn one_of<T>(allowed: Vec<T>) -> impl Validator<T>
    where
        T: PartialEq + Display + Send + Sync + 'static,
    {
        move |value: &T| {
            if allowed.contains(value) {
                Ok(())
            } else {
                let allowed: Vec<String> = allowed.iter().map(ToString::to_string).collect();
                Err(format!("{value} is not one of: {}", allowed.join(", ")))
            }
        }
    }

    /// String must not be empty or whitespace-only.
    pub fn non_empty() -> impl Validator<String> {
        |value: &String| {
            if value.trim().is_empty() {
                Err("value cannot be empty".to_string())
            } else {
                Ok(())
            }
        }
    }

    /// Every element of a list must satisfy `inner`.
    pub fn each<T, V>(inner: V) -> impl Validator<Vec<T>>
    where
        T: Send + Sync + 'static,
        V: Validator<T> + 'static,
    {
        move |values: &Vec<T>| values.iter().try_for_each(|value| inner.validate(value))
    }

    /// String must match `pattern`.
    ///
    /// # Errors
    ///
    /// Returns the regex compile error when `pattern` is invalid.
    pub fn pattern(pattern: &str) -> Result<impl Validator<String> + use<>, regex::Error> {
        let regex = Regex::new(pattern)?;
        Ok(move |value: &String| {
            if regex.is_match(value) {
                Ok(())
            } else {
                Err(format!("`{value}` does not match `{}`", regex.as_str()))
            }
        })
    }
}
