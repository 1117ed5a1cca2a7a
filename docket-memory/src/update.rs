//! Update expressions for in-memory documents.
//!
//! Supports the operators `$set`, `$unset` and `$inc`. Field paths may be dotted; `$set`
//! and `$inc` create missing intermediate documents. The identity field cannot be changed.

use bson::{Bson, Document};

use docket_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    record::ID_FIELD,
};

/// A validated update expression.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Update {
    set: Document,
    unset: Vec<String>,
    inc: Document,
}

impl Update {
    /// Validates `update` so that applying it cannot fail half-way through a batch.
    ///
    /// An operator with no fields, such as `{ "$set": {} }`, is accepted and changes nothing.
    pub fn parse(update: &Document) -> DocumentStoreResult<Self> {
        let mut parsed = Update {
            set: Document::new(),
            unset: Vec::new(),
            inc: Document::new(),
        };

        if update.is_empty() {
            return Err(DocumentStoreError::InvalidUpdate(
                "update expression is empty".to_string(),
            ));
        }

        for (operator, fields) in update {
            let Bson::Document(fields) = fields else {
                return Err(DocumentStoreError::InvalidUpdate(format!(
                    "{operator} expects a document of fields"
                )));
            };

            if let Some(field) = fields
                .keys()
                .find(|field| is_identity(field))
            {
                return Err(DocumentStoreError::InvalidUpdate(format!(
                    "{operator} may not modify {field}"
                )));
            }

            match operator.as_str() {
                "$set" => parsed.set.extend(fields.clone()),
                "$unset" => parsed.unset.extend(fields.keys().cloned()),
                "$inc" => {
                    if let Some((field, _)) = fields
                        .iter()
                        .find(|(_, amount)| !is_number(amount))
                    {
                        return Err(DocumentStoreError::InvalidUpdate(format!(
                            "$inc on {field} expects a number"
                        )));
                    }
                    parsed.inc.extend(fields.clone());
                }
                other if other.starts_with('$') => {
                    return Err(DocumentStoreError::InvalidUpdate(format!(
                        "unsupported update operator {other}"
                    )));
                }
                other => {
                    return Err(DocumentStoreError::InvalidUpdate(format!(
                        "expected an update operator, found field {other}"
                    )));
                }
            }
        }

        Ok(parsed)
    }

    /// Applies the update to `document` in place.
    pub fn apply(&self, document: &mut Document) -> DocumentStoreResult<()> {
        for (path, value) in &self.set {
            set_path(document, path, value.clone())?;
        }

        for path in &self.unset {
            unset_path(document, path);
        }

        for (path, amount) in &self.inc {
            let current = crate::evaluator::lookup(document, path).cloned();
            let next = match current {
                None => amount.clone(),
                Some(current) => add(path, &current, amount)?,
            };
            set_path(document, path, next)?;
        }

        Ok(())
    }
}

fn is_identity(path: &str) -> bool {
    path == ID_FIELD || path.starts_with(&format!("{ID_FIELD}."))
}

fn is_number(value: &Bson) -> bool {
    matches!(value, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
}

/// Adds two numbers, widening to the larger representation.
///
/// Integer overflow past `i64` is an error rather than a wrap.
fn add(path: &str, current: &Bson, amount: &Bson) -> DocumentStoreResult<Bson> {
    let overflow =
        || DocumentStoreError::InvalidUpdate(format!("$inc on {path} overflows a 64-bit integer"));

    Ok(match (current, amount) {
        (Bson::Int32(a), Bson::Int32(b)) => match a.checked_add(*b) {
            Some(sum) => Bson::Int32(sum),
            None => Bson::Int64(*a as i64 + *b as i64),
        },
        (Bson::Int32(a), Bson::Int64(b)) => {
            Bson::Int64((*a as i64).checked_add(*b).ok_or_else(overflow)?)
        }
        (Bson::Int64(a), Bson::Int32(b)) => {
            Bson::Int64(a.checked_add(*b as i64).ok_or_else(overflow)?)
        }
        (Bson::Int64(a), Bson::Int64(b)) => Bson::Int64(a.checked_add(*b).ok_or_else(overflow)?),
        (Bson::Double(a), other) if is_number(other) => Bson::Double(a + as_f64(other)),
        (other, Bson::Double(b)) if is_number(other) => Bson::Double(as_f64(other) + b),
        _ => {
            return Err(DocumentStoreError::InvalidUpdate(format!(
                "cannot apply $inc to non-numeric field {path}"
            )));
        }
    })
}

fn as_f64(value: &Bson) -> f64 {
    match value {
        Bson::Int32(v) => *v as f64,
        Bson::Int64(v) => *v as f64,
        Bson::Double(v) => *v,
        _ => f64::NAN,
    }
}

fn set_path(document: &mut Document, path: &str, value: Bson) -> DocumentStoreResult<()> {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
            Ok(())
        }
        Some((head, rest)) => {
            if !document.contains_key(head) {
                document.insert(head, Document::new());
            }

            match document.get_mut(head) {
                Some(Bson::Document(inner)) => set_path(inner, rest, value),
                _ => Err(DocumentStoreError::InvalidUpdate(format!(
                    "cannot create field {rest} inside non-document field {head}"
                ))),
            }
        }
    }
}

fn unset_path(document: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            document.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Bson::Document(inner)) = document.get_mut(head) {
                unset_path(inner, rest);
            }
        }
    }
}
