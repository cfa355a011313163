// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Search queries and prebuilt query templates.
//!
//! A [`QueryTemplate`] fixes the shape of a query once; callers render it
//! with the values for each request.

use serde_json::Value;

use crate::index::FIELD_ID;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Clause {
    Term { field: String, value: String },
    Terms { field: String, values: Vec<String> },
}

/// A rendered search query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    clause: Clause,
    size: Option<usize>,
}

impl Query {
    /// Exact match of `field` against one value.
    pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self { clause: Clause::Term { field: field.into(), value: value.into() }, size: None }
    }

    /// Match of `field` against any of `values`.
    pub fn terms<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            clause: Clause::Terms {
                field: field.into(),
                values: values.into_iter().map(Into::into).collect(),
            },
            size: None,
        }
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn size(&self) -> Option<usize> {
        self.size
    }

    /// Evaluate the query against one document.
    pub fn matches(&self, id: &str, source: &Value) -> bool {
        match &self.clause {
            Clause::Term { field, value } => field_matches(field, id, source, value),
            Clause::Terms { field, values } => {
                values.iter().any(|v| field_matches(field, id, source, v))
            }
        }
    }
}

fn field_matches(field: &str, id: &str, source: &Value, expected: &str) -> bool {
    if field == FIELD_ID {
        return id == expected;
    }
    let mut node = source;
    for part in field.split('.') {
        match node.get(part) {
            Some(next) => node = next,
            None => return false,
        }
    }
    match node {
        Value::String(s) => s == expected,
        Value::Number(n) => n.to_string() == expected,
        Value::Bool(b) => b.to_string() == expected,
        _ => false,
    }
}

/// Immutable `terms` query shape with one bound field, rendered per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
    field: String,
}

impl QueryTemplate {
    pub fn terms(field: impl Into<String>) -> Self {
        Self { field: field.into() }
    }

    /// Bind `values` to the template field.
    pub fn render<V: AsRef<str>>(&self, values: &[V]) -> Query {
        Query::terms(self.field.as_str(), values.iter().map(AsRef::as_ref))
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
