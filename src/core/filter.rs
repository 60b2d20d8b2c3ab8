//! Filter expressions: flat conjunctions of field constraints
//!
//! A [`Filter`] maps field names to [`Oper`] constraints and selects the
//! items for which every constraint holds. There is no OR and no nesting by
//! design — the expression language is a flat AND, which every backend can
//! translate or at least partially reject with a typed error.
//!
//! # Example
//!
//! ```rust,ignore
//! use repokit::prelude::*;
//!
//! // Builder form
//! let f = Filter::new()
//!     .field("name", "Jack")
//!     .field("age", greater_than(31));
//!
//! // Macro form (raw scalars imply equality)
//! let f = filter!(name: "Jack", age: greater_than(31));
//! ```

use crate::core::oper::Oper;
use indexmap::IndexMap;
use serde_json::Value;

/// An ordered mapping from field name to constraint.
///
/// Field names are unique within one expression: setting a field twice keeps
/// the last constraint. An empty filter matches every item. Once handed to a
/// cursor the filter is never mutated again.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    fields: IndexMap<String, Oper>,
}

impl Filter {
    /// Create an empty filter, which matches every item.
    pub fn new() -> Self {
        Self {
            fields: IndexMap::new(),
        }
    }

    /// Add a field constraint, consuming and returning the filter.
    ///
    /// Raw scalars convert to equality constraints; [`Oper`] values are
    /// stored as-is. Setting the same field again replaces the previous
    /// constraint (last write wins).
    pub fn field(mut self, name: impl Into<String>, oper: impl Into<Oper>) -> Self {
        self.set(name, oper);
        self
    }

    /// Add a field constraint in place.
    pub fn set(&mut self, name: impl Into<String>, oper: impl Into<Oper>) {
        self.fields.insert(name.into(), oper.into());
    }

    /// Look up the constraint on a field.
    pub fn get(&self, name: &str) -> Option<&Oper> {
        self.fields.get(name)
    }

    /// Whether the filter has no constraints (matches everything).
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of constrained fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Iterate constraints in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Oper)> {
        self.fields.iter().map(|(name, oper)| (name.as_str(), oper))
    }

    /// Evaluate the filter against a native record.
    ///
    /// This is the reference matcher used by backends without a native query
    /// engine: the record is expected to be a JSON object, and the filter
    /// matches when every constraint holds for the corresponding field. A
    /// non-object record only matches the empty filter.
    pub fn matches(&self, record: &Value) -> bool {
        self.fields
            .iter()
            .all(|(name, oper)| oper.evaluate(record.get(name)))
    }
}

impl<'a> IntoIterator for &'a Filter {
    type Item = (&'a String, &'a Oper);
    type IntoIter = indexmap::map::Iter<'a, String, Oper>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Build a [`Filter`] with keyword-style syntax.
///
/// Each value is either a raw scalar (implying equality) or an [`Oper`]
/// constructor call:
///
/// ```rust,ignore
/// let f = filter!(name: "Jack", age: between(30, 40));
/// ```
#[macro_export]
macro_rules! filter {
    () => {
        $crate::core::filter::Filter::new()
    };
    ($($field:ident : $value:expr),+ $(,)?) => {{
        let mut filter = $crate::core::filter::Filter::new();
        $(
            filter.set(stringify!($field), $crate::core::oper::Oper::from($value));
        )+
        filter
    }};
}

/// Build a `serde_json::Map<String, Value>` of update values with
/// keyword-style syntax:
///
/// ```rust,ignore
/// cursor.update(&values!(age: 31, color: "red")).await?;
/// ```
#[macro_export]
macro_rules! values {
    () => {
        ::serde_json::Map::new()
    };
    ($($field:ident : $value:expr),+ $(,)?) => {{
        let mut map = ::serde_json::Map::new();
        $(
            map.insert(
                stringify!($field).to_string(),
                ::serde_json::Value::from($value),
            );
        )+
        map
    }};
}
