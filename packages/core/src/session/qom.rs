//! Query Object Model
//!
//! A structured representation of repository queries: one selector, an
//! optional constraint tree, orderings and columns. Queries built by the
//! query builder converter and statements parsed by [`sql2`](super::sql2)
//! both end up here, and sessions execute this model directly.
//!
//! `Display` renders the model back as a JCR-SQL2 statement, which is handy
//! for logging.

use serde_json::Value;
use std::fmt;

/// A complete query over a single selector
#[derive(Debug, Clone, PartialEq)]
pub struct QueryObjectModel {
    pub source: Selector,
    pub constraint: Option<Constraint>,
    pub orderings: Vec<Ordering>,
    pub columns: Vec<Column>,
}

impl QueryObjectModel {
    pub fn new(source: Selector) -> Self {
        Self {
            source,
            constraint: None,
            orderings: Vec::new(),
            columns: Vec::new(),
        }
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    /// AND `constraint` onto whatever constraint is already present
    pub fn and_constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = Some(match self.constraint.take() {
            Some(existing) => Constraint::and(existing, constraint),
            None => constraint,
        });
        self
    }

    pub fn with_ordering(mut self, ordering: Ordering) -> Self {
        self.orderings.push(ordering);
        self
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn selector_name(&self) -> &str {
        &self.source.name
    }
}

/// A node type restricted source, addressed by `name` in the rest of the query
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    pub node_type: String,
    pub name: String,
}

impl Selector {
    pub fn new(node_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    And(Box<Constraint>, Box<Constraint>),
    Or(Box<Constraint>, Box<Constraint>),
    Not(Box<Constraint>),
    Comparison {
        operand1: DynamicOperand,
        operator: Operator,
        operand2: StaticOperand,
    },
    PropertyExistence {
        selector: String,
        property: String,
    },
    /// Case-insensitive substring search in one property, or all when `property` is `None`
    FullTextSearch {
        selector: String,
        property: Option<String>,
        expression: String,
    },
    SameNode {
        selector: String,
        path: String,
    },
    ChildNode {
        selector: String,
        path: String,
    },
    DescendantNode {
        selector: String,
        path: String,
    },
}

impl Constraint {
    pub fn and(left: Constraint, right: Constraint) -> Self {
        Self::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Constraint, right: Constraint) -> Self {
        Self::Or(Box::new(left), Box::new(right))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(constraint: Constraint) -> Self {
        Self::Not(Box::new(constraint))
    }

    pub fn comparison(operand1: DynamicOperand, operator: Operator, operand2: StaticOperand) -> Self {
        Self::Comparison {
            operand1,
            operator,
            operand2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DynamicOperand {
    PropertyValue { selector: String, property: String },
    NodeName { selector: String },
    NodeLocalName { selector: String },
    LowerCase(Box<DynamicOperand>),
    UpperCase(Box<DynamicOperand>),
}

impl DynamicOperand {
    pub fn property(selector: impl Into<String>, property: impl Into<String>) -> Self {
        Self::PropertyValue {
            selector: selector.into(),
            property: property.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StaticOperand {
    Literal(Value),
    BindVariable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    EqualTo,
    NotEqualTo,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    Like,
}

impl Operator {
    pub fn as_sql2(&self) -> &'static str {
        match self {
            Self::EqualTo => "=",
            Self::NotEqualTo => "<>",
            Self::LessThan => "<",
            Self::LessThanOrEqualTo => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqualTo => ">=",
            Self::Like => "LIKE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ordering {
    pub operand: DynamicOperand,
    pub order: Order,
}

impl Ordering {
    pub fn ascending(operand: DynamicOperand) -> Self {
        Self {
            operand,
            order: Order::Ascending,
        }
    }

    pub fn descending(operand: DynamicOperand) -> Self {
        Self {
            operand,
            order: Order::Descending,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub selector: String,
    pub property: String,
    /// Name of the column in result rows
    pub name: String,
}

impl Column {
    pub fn new(selector: impl Into<String>, property: impl Into<String>) -> Self {
        let property = property.into();
        Self {
            selector: selector.into(),
            name: property.clone(),
            property,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

// ============================================================================
// SQL2 rendering
// ============================================================================

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

impl fmt::Display for QueryObjectModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        if self.columns.is_empty() {
            write!(f, "*")?;
        } else {
            let columns: Vec<String> = self
                .columns
                .iter()
                .map(|column| {
                    if column.name == column.property {
                        format!("{}.[{}]", column.selector, column.property)
                    } else {
                        format!("{}.[{}] AS [{}]", column.selector, column.property, column.name)
                    }
                })
                .collect();
            write!(f, "{}", columns.join(", "))?;
        }
        write!(f, " FROM [{}] AS {}", self.source.node_type, self.source.name)?;
        if let Some(constraint) = &self.constraint {
            write!(f, " WHERE {}", constraint)?;
        }
        if !self.orderings.is_empty() {
            let orderings: Vec<String> = self
                .orderings
                .iter()
                .map(|ordering| match ordering.order {
                    Order::Ascending => format!("{} ASC", ordering.operand),
                    Order::Descending => format!("{} DESC", ordering.operand),
                })
                .collect();
            write!(f, " ORDER BY {}", orderings.join(", "))?;
        }
        Ok(())
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(left, right) => write!(f, "({} AND {})", left, right),
            Self::Or(left, right) => write!(f, "({} OR {})", left, right),
            Self::Not(inner) => write!(f, "NOT {}", inner),
            Self::Comparison {
                operand1,
                operator,
                operand2,
            } => write!(f, "{} {} {}", operand1, operator.as_sql2(), operand2),
            Self::PropertyExistence { selector, property } => {
                write!(f, "{}.[{}] IS NOT NULL", selector, property)
            }
            Self::FullTextSearch {
                selector,
                property,
                expression,
            } => match property {
                Some(property) => {
                    write!(f, "CONTAINS({}.[{}], {})", selector, property, quote(expression))
                }
                None => write!(f, "CONTAINS({}.*, {})", selector, quote(expression)),
            },
            Self::SameNode { selector, path } => write!(f, "ISSAMENODE({}, {})", selector, quote(path)),
            Self::ChildNode { selector, path } => write!(f, "ISCHILDNODE({}, {})", selector, quote(path)),
            Self::DescendantNode { selector, path } => {
                write!(f, "ISDESCENDANTNODE({}, {})", selector, quote(path))
            }
        }
    }
}

impl fmt::Display for DynamicOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PropertyValue { selector, property } => write!(f, "{}.[{}]", selector, property),
            Self::NodeName { selector } => write!(f, "NAME({})", selector),
            Self::NodeLocalName { selector } => write!(f, "LOCALNAME({})", selector),
            Self::LowerCase(inner) => write!(f, "LOWER({})", inner),
            Self::UpperCase(inner) => write!(f, "UPPER({})", inner),
        }
    }
}

impl fmt::Display for StaticOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BindVariable(name) => write!(f, "${}", name),
            Self::Literal(Value::String(value)) => write!(f, "{}", quote(value)),
            Self::Literal(Value::Null) => write!(f, "NULL"),
            Self::Literal(Value::Bool(true)) => write!(f, "TRUE"),
            Self::Literal(Value::Bool(false)) => write!(f, "FALSE"),
            Self::Literal(other) => write!(f, "{}", other),
        }
    }
}
