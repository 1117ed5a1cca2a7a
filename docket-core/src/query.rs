//! Filters, find options and the filter expression tree.
//!
//! Filters stay untyped: a filter is a [`bson::Document`] in the MongoDB query shape
//! (`{ "status": "active", "age": { "$gte": 18 } }`), which is what hooks receive and
//! rewrite. Backends that cannot hand the document to an engine directly can parse it into
//! an [`Expr`] with [`Expr::parse`] and walk it with a [`QueryVisitor`].
//!
//! # Find options
//!
//! ```ignore
//! use docket::query::{FindOptions, SortDirection};
//!
//! let options = FindOptions::builder()
//!     .sort("created_at", SortDirection::Desc)
//!     .skip(20)
//!     .limit(10)
//!     .build();
//! ```

use bson::{Bson, Document, doc};

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    record::ID_FIELD,
};

/// Returns the filter matching the record with the given identity.
pub fn by_id(id: impl Into<String>) -> Document {
    let id: String = id.into();
    doc! { ID_FIELD: id }
}

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// Sort specification for query results.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    /// The field name to sort by. Dotted paths address nested fields.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// Options for [`Collection::find`](crate::collection::Collection::find).
///
/// Backends apply them after filtering, in the order sort, skip, limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Sort specification for results.
    pub sort: Option<Sort>,
    /// Number of matching documents to skip.
    pub skip: Option<usize>,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> FindOptionsBuilder {
        FindOptionsBuilder::new()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FindOptionsBuilder {
    options: FindOptions,
}

impl FindOptionsBuilder {
    pub fn new() -> Self {
        Self { options: FindOptions::default() }
    }

    /// Sets the sort specification for the results.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.options.sort = Some(Sort { field: field.into(), direction });
        self
    }

    /// Sets the number of documents to skip.
    pub fn skip(mut self, skip: usize) -> Self {
        self.options.skip = Some(skip);
        self
    }

    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.options.limit = Some(limit);
        self
    }

    pub fn build(self) -> FindOptions {
        self.options
    }
}

/// Field comparison operators understood by [`Expr::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    /// `$eq`, or a plain `{ field: value }` pair.
    Eq,
    /// `$ne`
    Ne,
    /// `$gt`
    Gt,
    /// `$gte`
    Gte,
    /// `$lt`
    Lt,
    /// `$lte`
    Lte,
    /// `$in`: the field equals one of the listed values.
    In,
    /// `$nin`: the field equals none of the listed values.
    Nin,
}

impl FieldOp {
    fn from_operator(operator: &str) -> Option<Self> {
        Some(match operator {
            "$eq" => FieldOp::Eq,
            "$ne" => FieldOp::Ne,
            "$gt" => FieldOp::Gt,
            "$gte" => FieldOp::Gte,
            "$lt" => FieldOp::Lt,
            "$lte" => FieldOp::Lte,
            "$in" => FieldOp::In,
            "$nin" => FieldOp::Nin,
            _ => return None,
        })
    }
}

/// A parsed filter expression.
///
/// `And(vec![])` matches every document, which is what an empty filter parses to.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Logical AND of multiple expressions (all must match).
    And(Vec<Expr>),
    /// Logical OR of multiple expressions (any must match).
    Or(Vec<Expr>),
    /// Logical NOT of an expression (inverts the result).
    Not(Box<Expr>),
    /// Checks if a field exists or doesn't exist.
    Exists(String, bool),
    /// Field comparison expression.
    Field {
        /// The field path to compare.
        field: String,
        /// The comparison operator.
        op: FieldOp,
        /// The value to compare against.
        value: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: impl Into<String>, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field: field.into(), op, value }
    }

    /// Parses a MongoDB-shaped filter document.
    ///
    /// Supports implicit equality, the field operators of [`FieldOp`], `$exists`, a
    /// per-field `$not`, and the top-level `$and`, `$or` and `$nor` combinators.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidFilter`] for unknown operators or malformed
    /// operands.
    pub fn parse(filter: &Document) -> DocumentStoreResult<Expr> {
        let mut exprs = Vec::with_capacity(filter.len());

        for (key, value) in filter {
            exprs.push(match key.as_str() {
                "$and" => Expr::And(parse_list(key, value)?),
                "$or" => Expr::Or(parse_list(key, value)?),
                "$nor" => Expr::Not(Box::new(Expr::Or(parse_list(key, value)?))),
                operator if operator.starts_with('$') => {
                    return Err(DocumentStoreError::InvalidFilter(format!(
                        "unsupported top-level operator {operator}"
                    )));
                }
                field => parse_field(field, value)?,
            });
        }

        Ok(collapse(exprs))
    }
}

fn collapse(mut exprs: Vec<Expr>) -> Expr {
    if exprs.len() == 1 {
        exprs.remove(0)
    } else {
        Expr::And(exprs)
    }
}

fn parse_list(operator: &str, value: &Bson) -> DocumentStoreResult<Vec<Expr>> {
    let Bson::Array(items) = value else {
        return Err(DocumentStoreError::InvalidFilter(format!("{operator} expects an array")));
    };

    items
        .iter()
        .map(|item| match item {
            Bson::Document(filter) => Expr::parse(filter),
            _ => Err(DocumentStoreError::InvalidFilter(format!(
                "{operator} expects an array of documents"
            ))),
        })
        .collect()
}

fn is_operator_document(document: &Document) -> bool {
    !document.is_empty()
        && document
            .keys()
            .all(|key| key.starts_with('$'))
}

fn parse_field(field: &str, value: &Bson) -> DocumentStoreResult<Expr> {
    let operators = match value {
        Bson::Document(operators) if is_operator_document(operators) => operators,
        _ => return Ok(Expr::field(field, FieldOp::Eq, value.clone())),
    };

    let mut exprs = Vec::with_capacity(operators.len());

    for (operator, operand) in operators {
        exprs.push(match operator.as_str() {
            "$exists" => Expr::Exists(field.to_string(), truthy(operand)),
            "$not" => match operand {
                Bson::Document(inner) if is_operator_document(inner) => {
                    Expr::Not(Box::new(parse_field(field, operand)?))
                }
                _ => {
                    return Err(DocumentStoreError::InvalidFilter(format!(
                        "$not on {field} expects an operator document"
                    )));
                }
            },
            other => match FieldOp::from_operator(other) {
                Some(FieldOp::In | FieldOp::Nin) if !matches!(operand, Bson::Array(_)) => {
                    return Err(DocumentStoreError::InvalidFilter(format!(
                        "{other} on {field} expects an array"
                    )));
                }
                Some(op) => Expr::field(field, op, operand.clone()),
                None => {
                    return Err(DocumentStoreError::InvalidFilter(format!(
                        "unsupported operator {other} on {field}"
                    )));
                }
            },
        });
    }

    Ok(collapse(exprs))
}

fn truthy(value: &Bson) -> bool {
    !matches!(
        value,
        Bson::Boolean(false) | Bson::Null | Bson::Int32(0) | Bson::Int64(0)
    )
}

/// Walks an [`Expr`] tree. Backends implement this to evaluate or translate filters.
pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}
