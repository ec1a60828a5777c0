//! Query channel events

use super::options::Options;
use super::stage::Stage;
use super::{impl_event, EventBase};
use crate::error::{DocumentManagerError, Result};
use crate::proxy::QueryResultCollection;
use crate::query::{Query, QueryBuilder, QueryInput};

/// Turn a statement, object model or builder into a [`Query`]
#[derive(Debug)]
pub struct QueryCreateEvent {
    base: EventBase,
    input: QueryInput,
    locale: Option<String>,
    options: Options,
    query: Option<Query>,
}

impl QueryCreateEvent {
    pub fn new(input: QueryInput, locale: Option<String>, options: Options) -> Self {
        Self {
            base: EventBase::default(),
            input,
            locale,
            options,
            query: None,
        }
    }

    pub fn input(&self) -> &QueryInput {
        &self.input
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn query(&self) -> Result<&Query> {
        self.query.as_ref().ok_or_else(Self::no_query)
    }

    pub fn set_query(&mut self, query: Query) {
        self.query = Some(query);
    }

    pub fn into_query(self) -> Result<Query> {
        self.query.ok_or_else(Self::no_query)
    }

    fn no_query() -> DocumentManagerError {
        DocumentManagerError::runtime(
            "No query has been set in listener. A listener should have set the query",
        )
    }
}

impl_event!(QueryCreateEvent, Stage, "document_manager.query.create");

#[derive(Debug, Default)]
pub struct QueryCreateBuilderEvent {
    base: EventBase,
    builder: Option<QueryBuilder>,
}

impl QueryCreateBuilderEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_builder(&mut self, builder: QueryBuilder) {
        self.builder = Some(builder);
    }

    pub fn into_builder(self) -> Result<QueryBuilder> {
        self.builder.ok_or_else(|| {
            DocumentManagerError::runtime(
                "No query builder has been set in listener. A listener should have set the builder",
            )
        })
    }
}

impl_event!(QueryCreateBuilderEvent, Stage, "document_manager.query.create_builder");

/// Run a query and collect its documents
#[derive(Debug)]
pub struct QueryExecuteEvent {
    base: EventBase,
    query: Query,
    options: Options,
    result: Option<QueryResultCollection>,
}

impl QueryExecuteEvent {
    pub fn new(query: Query, options: Options) -> Self {
        Self {
            base: EventBase::default(),
            query,
            options,
            result: None,
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn set_result(&mut self, result: QueryResultCollection) {
        self.result = Some(result);
    }

    pub fn into_result(self) -> Result<QueryResultCollection> {
        self.result.ok_or_else(|| {
            DocumentManagerError::runtime(
                "No result has been set in listener. A listener should have set the result",
            )
        })
    }
}

impl_event!(QueryExecuteEvent, Stage, "document_manager.query.execute");
