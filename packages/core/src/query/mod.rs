//! Queries over documents
//!
//! A [`Query`] wraps a repository query object model together with the
//! locale and options used to hydrate its results. It is created through
//! the document manager from a JCR-SQL2 statement, a ready-made object
//! model, or a [`QueryBuilder`].

mod builder;
mod converter;

pub use builder::{Condition, Operand, QueryBuilder, SelectedField, SourceDocument};
pub use converter::QueryBuilderConverter;

use crate::context::DocumentManagerContext;
use crate::error::{DocumentManagerError, Result};
use crate::events::{Options, QueryExecuteEvent};
use crate::proxy::QueryResultCollection;
use crate::session::{QueryObjectModel, Row};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// What [`Query::execute`] returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HydrationMode {
    /// Documents, hydrated lazily through the pipeline
    #[default]
    Document,
    /// Repository rows
    Raw,
}

#[derive(Debug, Clone)]
pub enum QueryResult {
    Documents(QueryResultCollection),
    Rows(Vec<Row>),
}

impl QueryResult {
    pub fn into_documents(self) -> Result<QueryResultCollection> {
        match self {
            Self::Documents(documents) => Ok(documents),
            Self::Rows(_) => Err(DocumentManagerError::runtime(
                "Query was executed in raw mode, it holds rows and not documents",
            )),
        }
    }

    pub fn into_rows(self) -> Result<Vec<Row>> {
        match self {
            Self::Rows(rows) => Ok(rows),
            Self::Documents(_) => Err(DocumentManagerError::runtime(
                "Query was executed in document mode, it holds documents and not rows",
            )),
        }
    }
}

/// Query source accepted by the document manager
#[derive(Debug, Clone)]
pub enum QueryInput {
    Sql2(String),
    ObjectModel(QueryObjectModel),
    Builder(QueryBuilder),
}

impl From<&str> for QueryInput {
    fn from(statement: &str) -> Self {
        Self::Sql2(statement.to_string())
    }
}

impl From<String> for QueryInput {
    fn from(statement: String) -> Self {
        Self::Sql2(statement)
    }
}

impl From<QueryObjectModel> for QueryInput {
    fn from(qom: QueryObjectModel) -> Self {
        Self::ObjectModel(qom)
    }
}

impl From<QueryBuilder> for QueryInput {
    fn from(builder: QueryBuilder) -> Self {
        Self::Builder(builder)
    }
}

#[derive(Clone)]
pub struct Query {
    qom: QueryObjectModel,
    context: Rc<DocumentManagerContext>,
    locale: Option<String>,
    options: Options,
    primary_selector: Option<String>,
    parameters: BTreeMap<String, Value>,
    first_result: Option<usize>,
    max_results: Option<usize>,
}

impl Query {
    pub fn new(
        qom: QueryObjectModel,
        context: Rc<DocumentManagerContext>,
        locale: Option<String>,
        options: Options,
        primary_selector: Option<String>,
    ) -> Self {
        Self {
            qom,
            context,
            locale,
            options,
            primary_selector,
            parameters: BTreeMap::new(),
            first_result: None,
            max_results: None,
        }
    }

    /// Run the query
    ///
    /// `parameters` are bound on top of the ones set with
    /// [`set_parameter`](Self::set_parameter). In document mode the
    /// QUERY_EXECUTE channel produces the result collection.
    pub fn execute(
        &self,
        parameters: BTreeMap<String, Value>,
        mode: HydrationMode,
    ) -> Result<QueryResult> {
        let mut query = self.clone();
        query.parameters.extend(parameters);

        match mode {
            HydrationMode::Raw => Ok(QueryResult::Rows(query.rows()?)),
            HydrationMode::Document => {
                let options = query.options.clone();
                let context = Rc::clone(&query.context);
                let mut event = QueryExecuteEvent::new(query, options);
                context.dispatch(&mut event)?;
                Ok(QueryResult::Documents(event.into_result()?))
            }
        }
    }

    /// Rows matched by the query, honoring first result and max results
    pub fn rows(&self) -> Result<Vec<Row>> {
        Ok(self.context.session().execute_query(
            &self.qom,
            &self.parameters,
            self.max_results,
            self.first_result.unwrap_or(0),
        )?)
    }

    pub fn qom(&self) -> &QueryObjectModel {
        &self.qom
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn set_locale(&mut self, locale: impl Into<String>) {
        self.locale = Some(locale.into());
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Selector whose nodes are hydrated; defaults to the query source
    pub fn primary_selector(&self) -> &str {
        self.primary_selector
            .as_deref()
            .unwrap_or_else(|| self.qom.selector_name())
    }

    pub fn set_primary_selector(&mut self, selector: impl Into<String>) {
        self.primary_selector = Some(selector.into());
    }

    pub fn set_parameter(&mut self, name: impl Into<String>, value: Value) {
        self.parameters.insert(name.into(), value);
    }

    pub fn parameters(&self) -> &BTreeMap<String, Value> {
        &self.parameters
    }

    pub fn first_result(&self) -> Option<usize> {
        self.first_result
    }

    pub fn set_first_result(&mut self, first_result: usize) {
        self.first_result = Some(first_result);
    }

    pub fn max_results(&self) -> Option<usize> {
        self.max_results
    }

    pub fn set_max_results(&mut self, max_results: usize) {
        self.max_results = Some(max_results);
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("statement", &self.qom.to_string())
            .field("locale", &self.locale)
            .field("primary_selector", &self.primary_selector)
            .field("first_result", &self.first_result)
            .field("max_results", &self.max_results)
            .finish()
    }
}
