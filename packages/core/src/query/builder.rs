//! Document-level query builder
//!
//! Queries are written against document aliases and field names; the
//! [`QueryBuilderConverter`](super::QueryBuilderConverter) turns them into
//! a repository query object model. Fields are addressed as
//! `<source alias>.<field>`.
//!
//! ```rust
//! use docmapper_core::query::{Condition, QueryBuilder};
//! use docmapper_core::session::qom::Order;
//!
//! let builder = QueryBuilder::new()
//!     .locale("de")
//!     .from("article", "a")
//!     .filter(Condition::eq("a.title", "Hello"))
//!     .or_filter(Condition::like("a.title", "World%"))
//!     .order_by("a.title", Order::Descending)
//!     .max_results(10);
//!
//! assert_eq!(builder.primary_alias(), Some("a"));
//! ```

use crate::session::qom::{Operator, Order};
use serde_json::Value;

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    /// Bound at execution time from the query parameters
    Parameter(String),
}

impl Operand {
    pub fn parameter(name: impl Into<String>) -> Self {
        Self::Parameter(name.into())
    }
}

macro_rules! literal_operand {
    ($($source:ty),*) => {
        $(
            impl From<$source> for Operand {
                fn from(value: $source) -> Self {
                    Self::Literal(Value::from(value))
                }
            }
        )*
    };
}

literal_operand!(Value, &str, String, bool, i64, f64);

/// A filter over document fields
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Comparison {
        field: String,
        operator: Operator,
        operand: Operand,
    },
    /// The field has a value
    FieldExists(String),
    /// Full text search in one field (`a.body`) or in every property of a source (`a`)
    FullText { target: String, expression: String },
    SameNode { alias: String, path: String },
    ChildOf { alias: String, path: String },
    DescendantOf { alias: String, path: String },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn comparison(field: impl Into<String>, operator: Operator, operand: impl Into<Operand>) -> Self {
        Self::Comparison {
            field: field.into(),
            operator,
            operand: operand.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::comparison(field, Operator::EqualTo, Operand::Literal(value.into()))
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::comparison(field, Operator::NotEqualTo, Operand::Literal(value.into()))
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::comparison(field, Operator::LessThan, Operand::Literal(value.into()))
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::comparison(field, Operator::LessThanOrEqualTo, Operand::Literal(value.into()))
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::comparison(field, Operator::GreaterThan, Operand::Literal(value.into()))
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::comparison(field, Operator::GreaterThanOrEqualTo, Operand::Literal(value.into()))
    }

    /// SQL `LIKE` with `%` and `_` wildcards
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::comparison(field, Operator::Like, Operand::Literal(Value::String(pattern.into())))
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Self::FieldExists(field.into())
    }

    pub fn full_text(target: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::FullText {
            target: target.into(),
            expression: expression.into(),
        }
    }

    pub fn same_node(alias: impl Into<String>, path: impl Into<String>) -> Self {
        Self::SameNode {
            alias: alias.into(),
            path: path.into(),
        }
    }

    pub fn child_of(alias: impl Into<String>, path: impl Into<String>) -> Self {
        Self::ChildOf {
            alias: alias.into(),
            path: path.into(),
        }
    }

    pub fn descendant_of(alias: impl Into<String>, path: impl Into<String>) -> Self {
        Self::DescendantOf {
            alias: alias.into(),
            path: path.into(),
        }
    }

    pub fn and(self, other: Condition) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Condition) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }
}

/// A document source: alias or class, addressed as `alias` in fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub document: String,
    pub alias: String,
}

/// A selected field and the column name it is returned under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedField {
    pub field: String,
    pub column: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryBuilder {
    locale: Option<String>,
    sources: Vec<SourceDocument>,
    columns: Vec<SelectedField>,
    condition: Option<Condition>,
    orderings: Vec<(String, Order)>,
    first_result: Option<usize>,
    max_results: Option<usize>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locale used to encode localized fields and to hydrate results
    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Select documents by alias or class, addressed as `alias`
    pub fn from(mut self, document: impl Into<String>, alias: impl Into<String>) -> Self {
        self.sources.push(SourceDocument {
            document: document.into(),
            alias: alias.into(),
        });
        self
    }

    /// Return a field as a row column named after the field
    pub fn select(self, field: impl Into<String>) -> Self {
        let field = field.into();
        let column = field.clone();
        self.select_as(field, column)
    }

    pub fn select_as(mut self, field: impl Into<String>, column: impl Into<String>) -> Self {
        self.columns.push(SelectedField {
            field: field.into(),
            column: column.into(),
        });
        self
    }

    /// Replace the filter
    pub fn filter(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn and_filter(mut self, condition: Condition) -> Self {
        self.condition = Some(match self.condition.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn or_filter(mut self, condition: Condition) -> Self {
        self.condition = Some(match self.condition.take() {
            Some(existing) => existing.or(condition),
            None => condition,
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, order: Order) -> Self {
        self.orderings.push((field.into(), order));
        self
    }

    pub fn first_result(mut self, first_result: usize) -> Self {
        self.first_result = Some(first_result);
        self
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn set_locale(&mut self, locale: impl Into<String>) {
        self.locale = Some(locale.into());
    }

    pub fn get_locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn sources(&self) -> &[SourceDocument] {
        &self.sources
    }

    /// Alias of the first source; results are hydrated from it
    pub fn primary_alias(&self) -> Option<&str> {
        self.sources.first().map(|source| source.alias.as_str())
    }

    pub fn columns(&self) -> &[SelectedField] {
        &self.columns
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    pub fn orderings(&self) -> &[(String, Order)] {
        &self.orderings
    }

    pub fn get_first_result(&self) -> Option<usize> {
        self.first_result
    }

    pub fn get_max_results(&self) -> Option<usize> {
        self.max_results
    }
}
