//! Shared test harness for storage backend testing
//!
//! Provides `TestItem`, an item type whose fields cover the scalar kinds
//! every backend must handle (string, integer, float, boolean), plus factory
//! helpers and the `repo_contract_tests!` conformance macro.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//!
//! use storage_harness::*;
//!
//! repo_contract_tests!((MemoryRepo::<TestItem>::with_id_field("id"), ()));
//! ```

#![allow(dead_code)]

#[macro_use]
pub mod repo_contract_tests;

use serde::{Deserialize, Serialize};

/// A test item covering all scalar field kinds.
///
/// Ids are deliberately non-numeric strings ("p1", "p2", ...) so the CSV
/// backend's scalar inference cannot turn them into numbers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestItem {
    pub id: String,
    pub name: String,
    pub age: i64,
    pub score: f64,
    pub active: bool,
}

/// The column set used when a backend needs declared fields (CSV).
pub const TEST_FIELDS: [&str; 5] = ["id", "name", "age", "score", "active"];

/// Create a `TestItem` with explicit values.
pub fn item(id: &str, name: &str, age: i64, score: f64, active: bool) -> TestItem {
    TestItem {
        id: id.to_string(),
        name: name.to_string(),
        age,
        score,
        active,
    }
}

/// The three-person data set behind most conformance tests:
/// Jack (30), John (33), James (36).
pub fn people() -> Vec<TestItem> {
    vec![
        item("p1", "Jack", 30, 1.5, true),
        item("p2", "John", 33, 2.5, false),
        item("p3", "James", 36, 3.5, true),
    ]
}
