//! Comparison operations for filter expressions
//!
//! An [`Oper`] wraps the constraint placed on a single field: plain equality,
//! an ordering comparison, a range, or set membership. Filter construction is
//! backend-agnostic — every kind can always be built; a backend that cannot
//! express a kind rejects it at query time with
//! [`RepoError::Unsupported`](crate::core::error::RepoError).
//!
//! # Example
//!
//! ```rust,ignore
//! use repokit::oper::{between, greater_than, in_, not_equal};
//!
//! let adults = greater_than(17);
//! let working_age = between(18, 65);
//! let primary = in_(["red", "green", "blue"])?;
//! let not_jack = not_equal("Jack");
//! ```

use crate::core::error::{RepoError, RepoResult};
use serde_json::Value;
use std::cmp::Ordering;

/// A constraint on a single field of an item.
///
/// Immutable once constructed; backends inspect it structurally when
/// translating a filter into their native query form.
#[derive(Debug, Clone, PartialEq)]
pub enum Oper {
    /// Field equals the value (the implicit constraint for raw scalars)
    Equal(Value),
    /// Field differs from the value
    NotEqual(Value),
    /// Field is strictly greater than the value
    GreaterThan(Value),
    /// Field is greater than or equal to the value
    GreaterEqual(Value),
    /// Field is strictly less than the value
    LessThan(Value),
    /// Field is less than or equal to the value
    LessEqual(Value),
    /// Field lies between the two bounds. Bound ordering is not checked;
    /// inclusivity is decided by the backend (every shipped backend is
    /// inclusive on both ends).
    Between(Value, Value),
    /// Field equals one of the candidate values (never empty)
    In(Vec<Value>),
}

impl Oper {
    /// The constraint kind as a short name, used in `Unsupported` errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Oper::Equal(_) => "equal",
            Oper::NotEqual(_) => "not_equal",
            Oper::GreaterThan(_) => "greater_than",
            Oper::GreaterEqual(_) => "greater_equal",
            Oper::LessThan(_) => "less_than",
            Oper::LessEqual(_) => "less_equal",
            Oper::Between(_, _) => "between",
            Oper::In(_) => "in",
        }
    }

    /// Evaluate the constraint against a field value read from a record.
    ///
    /// This is the reference interpretation used by the naive backends
    /// (in-memory and flat-file stores). `actual` is `None` when the record
    /// lacks the field; a missing field satisfies no constraint, including
    /// `not_equal`.
    pub fn evaluate(&self, actual: Option<&Value>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        match self {
            Oper::Equal(expected) => values_equal(actual, expected),
            Oper::NotEqual(expected) => !values_equal(actual, expected),
            Oper::GreaterThan(bound) => {
                matches!(value_cmp(actual, bound), Some(Ordering::Greater))
            }
            Oper::GreaterEqual(bound) => matches!(
                value_cmp(actual, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Oper::LessThan(bound) => {
                matches!(value_cmp(actual, bound), Some(Ordering::Less))
            }
            Oper::LessEqual(bound) => matches!(
                value_cmp(actual, bound),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Oper::Between(low, high) => {
                matches!(
                    value_cmp(actual, low),
                    Some(Ordering::Greater | Ordering::Equal)
                ) && matches!(
                    value_cmp(actual, high),
                    Some(Ordering::Less | Ordering::Equal)
                )
            }
            Oper::In(candidates) => candidates.iter().any(|c| values_equal(actual, c)),
        }
    }
}

// Raw scalars used where an Oper is expected imply equality. Concrete impls
// only: a blanket over Into<Value> would collide with the reflexive From.
impl From<Value> for Oper {
    fn from(value: Value) -> Self {
        Oper::Equal(value)
    }
}

impl From<&str> for Oper {
    fn from(value: &str) -> Self {
        Oper::Equal(Value::from(value))
    }
}

impl From<String> for Oper {
    fn from(value: String) -> Self {
        Oper::Equal(Value::from(value))
    }
}

impl From<i64> for Oper {
    fn from(value: i64) -> Self {
        Oper::Equal(Value::from(value))
    }
}

impl From<f64> for Oper {
    fn from(value: f64) -> Self {
        Oper::Equal(Value::from(value))
    }
}

impl From<bool> for Oper {
    fn from(value: bool) -> Self {
        Oper::Equal(Value::from(value))
    }
}

// =============================================================================
// Constructors
// =============================================================================

/// Field equals `value`.
pub fn equal(value: impl Into<Value>) -> Oper {
    Oper::Equal(value.into())
}

/// Field differs from `value`.
pub fn not_equal(value: impl Into<Value>) -> Oper {
    Oper::NotEqual(value.into())
}

/// Field is strictly greater than `value`.
pub fn greater_than(value: impl Into<Value>) -> Oper {
    Oper::GreaterThan(value.into())
}

/// Field is greater than or equal to `value`.
pub fn greater_equal(value: impl Into<Value>) -> Oper {
    Oper::GreaterEqual(value.into())
}

/// Field is strictly less than `value`.
pub fn less_than(value: impl Into<Value>) -> Oper {
    Oper::LessThan(value.into())
}

/// Field is less than or equal to `value`.
pub fn less_equal(value: impl Into<Value>) -> Oper {
    Oper::LessEqual(value.into())
}

/// Field lies between `low` and `high`. Exactly two bounds by construction;
/// whether the bounds themselves match is up to the backend (all shipped
/// backends treat both as inclusive).
pub fn between(low: impl Into<Value>, high: impl Into<Value>) -> Oper {
    Oper::Between(low.into(), high.into())
}

/// Field equals one of `values`.
///
/// Fails with a `Validation` error when the candidate set is empty — an
/// empty membership constraint has no meaningful reading.
pub fn in_<I, V>(values: I) -> RepoResult<Oper>
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let candidates: Vec<Value> = values.into_iter().map(Into::into).collect();
    if candidates.is_empty() {
        return Err(RepoError::validation(
            "membership constraint requires at least one candidate value",
        ));
    }
    Ok(Oper::In(candidates))
}

// =============================================================================
// Value comparison helpers
// =============================================================================

/// Compare two JSON scalars.
///
/// Numbers compare numerically (integers and floats mix), strings
/// lexicographically, booleans with `false < true`, nulls as equal.
/// Cross-type pairs and non-scalar values are unordered (`None`), so they
/// never satisfy an ordering constraint.
pub fn value_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Equality that treats `31` and `31.0` as the same number, and otherwise
/// falls back to structural equality (arrays, objects).
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match value_cmp(a, b) {
        Some(ordering) => ordering == Ordering::Equal,
        None => a == b,
    }
}
