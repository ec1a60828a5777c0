use crate::error::Result;
use crate::events::{
    Event, EventDispatcher, EventSubscriber, QueryCreateBuilderEvent, QueryCreateEvent,
    QueryExecuteEvent, Stage,
};
use crate::query::{Query, QueryBuilder, QueryBuilderConverter, QueryInput};
use std::rc::Rc;

/// Builds queries and turns their rows into document collections
#[derive(Debug, Default)]
pub struct QuerySubscriber;

impl QuerySubscriber {
    pub fn new() -> Self {
        Self
    }

    fn handle_create(event: &mut QueryCreateEvent) -> Result<()> {
        let context = event.context()?;
        let locale = match event.locale() {
            Some(locale) => locale.to_string(),
            None => context.registry().default_locale().to_string(),
        };

        let mut primary_selector = None;
        let mut first_result = None;
        let mut max_results = None;
        let qom = match event.input() {
            QueryInput::Sql2(statement) => context.session().create_query(statement)?,
            QueryInput::ObjectModel(qom) => qom.clone(),
            QueryInput::Builder(builder) => {
                let mut builder = builder.clone();
                if builder.get_locale().is_none() {
                    builder.set_locale(locale.clone());
                }
                primary_selector = builder.primary_alias().map(str::to_string);
                first_result = builder.get_first_result();
                max_results = builder.get_max_results();

                QueryBuilderConverter::new(
                    context.metadata_factory(),
                    context.encoder(),
                    context.strategy(),
                )
                .convert(&builder)?
            }
        };

        let mut query = Query::new(
            qom,
            Rc::clone(&context),
            Some(locale),
            event.options().clone(),
            primary_selector,
        );
        if let Some(first_result) = first_result {
            query.set_first_result(first_result);
        }
        if let Some(max_results) = max_results {
            query.set_max_results(max_results);
        }
        event.set_query(query);
        Ok(())
    }

    fn handle_create_builder(event: &mut QueryCreateBuilderEvent) -> Result<()> {
        let default_locale = event.context()?.registry().default_locale().to_string();
        event.set_builder(QueryBuilder::new().locale(default_locale));
        Ok(())
    }

    fn handle_execute(event: &mut QueryExecuteEvent) -> Result<()> {
        let context = event.context()?;
        let query = event.query();
        let rows = query.rows()?;
        let result = context.proxy_factory().create_query_result_collection(
            rows,
            query.locale().map(str::to_string),
            event.options().clone(),
        );
        event.set_result(result);
        Ok(())
    }
}

impl EventSubscriber for QuerySubscriber {
    fn subscribe(self: Rc<Self>, dispatcher: &EventDispatcher) {
        dispatcher.add_listener::<QueryCreateEvent>(Stage::Handle, "query.create", Self::handle_create);
        dispatcher.add_listener::<QueryCreateBuilderEvent>(
            Stage::Handle,
            "query.create_builder",
            Self::handle_create_builder,
        );
        dispatcher.add_listener::<QueryExecuteEvent>(
            Stage::Handle,
            "query.execute",
            Self::handle_execute,
        );
    }
}
