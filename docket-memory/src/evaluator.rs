//! Filter evaluation for in-memory documents.
//!
//! Filters are parsed into an [`Expr`] tree by `docket-core` and evaluated here against one
//! document at a time. Field paths may be dotted (`"address.city"`). A field holding an
//! array matches a condition when the array as a whole or any of its elements does.

use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};
use std::{cmp::Ordering, collections::HashMap};

use docket_core::{
    error::DocumentStoreError,
    query::{Expr, FieldOp, QueryVisitor},
};

/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to `f64`, so `Int32(1)`, `Int64(1)` and `Double(1.0)`
/// compare equal.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    ObjectId(ObjectId),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
    /// Any value without a meaningful comparison (binary data, regexes, ...).
    Opaque,
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            _ => Comparable::Opaque,
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Resolves a dotted path inside `document`.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get(segment)?,
            Bson::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Orders two optional field values for sorting. Missing and incomparable values sort
/// first, matching how a document store orders nulls.
pub(crate) fn compare_for_sort(left: Option<&Bson>, right: Option<&Bson>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(left), Some(right)) => Comparable::from(left)
            .partial_cmp(&Comparable::from(right))
            .unwrap_or(Ordering::Equal),
    }
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<bool, DocumentStoreError> {
        self.visit_expr(expr)
    }

    /// Returns whether `document` satisfies `expr`.
    pub fn matches(document: &Document, expr: &Expr) -> bool {
        DocumentEvaluator::new(document)
            .evaluate(expr)
            .unwrap_or(false)
    }
}

fn equals(field_value: Option<&Bson>, value: &Bson) -> bool {
    let expected = Comparable::from(value);

    match field_value {
        // A missing field only equals null.
        None => expected == Comparable::Null,
        Some(field_value) => {
            let actual = Comparable::from(field_value);
            if actual == expected {
                return true;
            }

            match actual {
                Comparable::Array(items) => items.iter().any(|item| item == &expected),
                _ => false,
            }
        }
    }
}

fn ordered(field_value: &Bson, value: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    let expected = Comparable::from(value);

    match Comparable::from(field_value) {
        Comparable::Array(items) => items
            .iter()
            .any(|item| item.partial_cmp(&expected).is_some_and(&accept)),
        actual => actual
            .partial_cmp(&expected)
            .is_some_and(accept),
    }
}

fn one_of(field_value: Option<&Bson>, candidates: &Bson) -> bool {
    match candidates {
        Bson::Array(candidates) => candidates
            .iter()
            .any(|candidate| equals(field_value, candidate)),
        _ => false,
    }
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(lookup(self.document, field).is_some() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let field_value = lookup(self.document, field);

        Ok(match op {
            FieldOp::Eq => equals(field_value, value),
            FieldOp::Ne => !equals(field_value, value),
            FieldOp::In => one_of(field_value, value),
            FieldOp::Nin => !one_of(field_value, value),
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => match field_value {
                Some(field_value) => ordered(field_value, value, |ordering| match op {
                    FieldOp::Gt => ordering == Ordering::Greater,
                    FieldOp::Gte => ordering != Ordering::Less,
                    FieldOp::Lt => ordering == Ordering::Less,
                    _ => ordering != Ordering::Greater,
                }),
                None => false,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn matches(document: &Document, filter: Document) -> bool {
        let expr = Expr::parse(&filter).unwrap();
        DocumentEvaluator::matches(document, &expr)
    }

    #[test]
    fn numbers_compare_across_widths() {
        let document = doc! { "n": 3_i64 };

        assert!(matches(&document, doc! { "n": 3 }));
        assert!(matches(&document, doc! { "n": { "$gte": 2.5 } }));
        assert!(!matches(&document, doc! { "n": { "$lt": 3 } }));
    }

    #[test]
    fn dotted_paths_reach_nested_fields() {
        let document = doc! { "address": { "city": "Oslo", "zip": "0150" } };

        assert!(matches(&document, doc! { "address.city": "Oslo" }));
        assert!(!matches(&document, doc! { "address.city": "Bergen" }));
        assert!(matches(&document, doc! { "address.zip": { "$exists": true } }));
        assert!(matches(&document, doc! { "address.street": { "$exists": false } }));
    }

    #[test]
    fn arrays_match_whole_or_by_element() {
        let document = doc! { "tags": ["red", "blue"] };

        assert!(matches(&document, doc! { "tags": "red" }));
        assert!(matches(&document, doc! { "tags": ["red", "blue"] }));
        assert!(!matches(&document, doc! { "tags": "green" }));
        assert!(matches(&document, doc! { "tags": { "$in": ["green", "blue"] } }));
        assert!(matches(&document, doc! { "tags": { "$nin": ["green"] } }));
    }

    #[test]
    fn missing_fields_only_equal_null() {
        let document = doc! { "a": 1 };

        assert!(matches(&document, doc! { "b": Bson::Null }));
        assert!(!matches(&document, doc! { "b": 1 }));
        assert!(matches(&document, doc! { "b": { "$ne": 1 } }));
        assert!(!matches(&document, doc! { "b": { "$gt": 0 } }));
    }

    #[test]
    fn combinators_evaluate_with_short_circuit_semantics() {
        let document = doc! { "status": "open", "priority": 2 };

        assert!(matches(&document, doc! { "$or": [{ "status": "closed" }, { "priority": 2 }] }));
        assert!(!matches(&document, doc! { "$and": [{ "status": "open" }, { "priority": 3 }] }));
        assert!(matches(&document, doc! { "$nor": [{ "status": "closed" }] }));
        assert!(matches(&document, doc! { "priority": { "$not": { "$gt": 5 } } }));
    }

    #[test]
    fn sort_order_puts_missing_values_first() {
        let low = Bson::Int32(1);
        let high = Bson::Int32(2);

        assert_eq!(compare_for_sort(Some(&low), Some(&high)), Ordering::Less);
        assert_eq!(compare_for_sort(None, Some(&low)), Ordering::Less);
        assert_eq!(compare_for_sort(Some(&high), None), Ordering::Greater);
    }
}
