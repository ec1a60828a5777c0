//! Mapped field values
//!
//! Every mapped field of a document's metadata is stored in one property,
//! named by the property encoder from the field mapping's encoding and
//! property name in the event locale. Reference fields store the target
//! node's identifier as a strong reference and hydrate to proxies; date
//! fields must hold RFC 3339 strings.

use crate::context::DocumentManagerContext;
use crate::document::{DocumentRef, FieldValue};
use crate::error::{DocumentManagerError, Result};
use crate::events::{
    Event, EventDispatcher, EventSubscriber, HydrateEvent, HydrateStage, Options, PersistEvent,
    PersistStage,
};
use crate::metadata::{FieldMapping, FieldType, Metadata};
use crate::session::{NodeId, PropertyType};
use crate::subscribers::event_locale;
use chrono::DateTime;
use serde_json::Value;
use std::rc::Rc;
use tracing::trace;

#[derive(Debug, Default)]
pub struct FieldSubscriber;

impl FieldSubscriber {
    pub fn new() -> Self {
        Self
    }

    fn handle_hydrate(event: &mut HydrateEvent) -> Result<()> {
        let context = event.context()?;
        let document = event.document()?.clone();
        let metadata = context
            .metadata_factory()
            .metadata_for_class(document.type_name())?;
        let locale = event_locale(event)?;
        let node = event.node()?;

        for (field, mapping) in metadata.field_mappings() {
            if !mapping.mapped {
                continue;
            }
            let property = context
                .encoder()
                .encode(mapping.encoding, &mapping.property, Some(&locale))?;
            let value = if mapping.field_type == Some(FieldType::Reference) {
                Self::hydrate_reference(&context, &document, node, &property, event.options())?
            } else {
                Self::hydrate_value(&context, node, &property, mapping)?
            };
            trace!("Hydrating field {} from {}", field, property);
            metadata.set_field_value(&mut *document.raw_mut()?, field, value)?;
        }
        Ok(())
    }

    fn hydrate_value(
        context: &DocumentManagerContext,
        node: NodeId,
        property: &str,
        mapping: &FieldMapping,
    ) -> Result<FieldValue> {
        let value = match context.session().property(node, property)? {
            Some(value) => value,
            None if mapping.default.is_null() && mapping.multiple => Value::Array(Vec::new()),
            None => mapping.default.clone(),
        };
        Ok(FieldValue::Value(value))
    }

    fn hydrate_reference(
        context: &DocumentManagerContext,
        document: &DocumentRef,
        node: NodeId,
        property: &str,
        options: &Options,
    ) -> Result<FieldValue> {
        let session = context.session();
        let identifier = match session.property(node, property)? {
            Some(Value::String(identifier)) => identifier,
            _ => return Ok(FieldValue::Reference(None)),
        };
        let target = match session.node_by_identifier(&identifier) {
            Ok(target) => target,
            Err(e) if e.is_not_found() => return Ok(FieldValue::Reference(None)),
            Err(e) => return Err(e.into()),
        };
        let proxy = context
            .proxy_factory()
            .create_proxy_for_node(document, target, options)?;
        Ok(FieldValue::Reference(Some(proxy)))
    }

    fn handle_persist(event: &mut PersistEvent) -> Result<()> {
        let context = event.context()?;
        let document = event.document()?.clone();
        let metadata = context
            .metadata_factory()
            .metadata_for_class(document.type_name())?;
        let locale = event_locale(event)?;
        let node = event.node()?;

        for (field, mapping) in metadata.field_mappings() {
            if !mapping.mapped {
                continue;
            }
            let property = context
                .encoder()
                .encode(mapping.encoding, &mapping.property, Some(&locale))?;
            let value = metadata.get_field_value(&*document.raw()?, field)?;
            Self::persist_value(&context, &metadata, node, field, mapping, &property, value)?;
        }
        Ok(())
    }

    fn persist_value(
        context: &DocumentManagerContext,
        metadata: &Metadata,
        node: NodeId,
        field: &str,
        mapping: &FieldMapping,
        property: &str,
        value: FieldValue,
    ) -> Result<()> {
        let session = context.session();
        let is_reference = mapping.field_type == Some(FieldType::Reference);

        match value {
            FieldValue::Reference(None) if is_reference => {
                session.remove_property(node, property)?;
            }
            FieldValue::Reference(Some(target)) if is_reference => {
                let target_node = context.registry().node_for_document(&target)?;
                let identifier = session.identifier(target_node)?.ok_or_else(|| {
                    DocumentManagerError::invalid_argument(format!(
                        "Document \"{}\" referenced by field \"{}\" of \"{}\" is not referenceable",
                        target.type_name(),
                        field,
                        metadata.class()
                    ))
                })?;
                session.set_typed_property(
                    node,
                    property,
                    Value::String(identifier),
                    PropertyType::Reference,
                )?;
            }
            FieldValue::Value(Value::Null) if !is_reference => {
                session.remove_property(node, property)?;
            }
            FieldValue::Value(value) if !is_reference => {
                if mapping.field_type == Some(FieldType::Date) {
                    Self::validate_date(metadata, field, &value)?;
                }
                session.set_property(node, property, value)?;
            }
            _ => {
                return Err(DocumentManagerError::invalid_argument(format!(
                    "Field \"{}\" of \"{}\" holds a {} but is mapped as {}",
                    field,
                    metadata.class(),
                    if is_reference { "value" } else { "document reference" },
                    if is_reference { "a reference" } else { "a value" },
                )));
            }
        }
        Ok(())
    }

    fn validate_date(metadata: &Metadata, field: &str, value: &Value) -> Result<()> {
        let valid = match value {
            Value::String(date) => DateTime::parse_from_rfc3339(date).is_ok(),
            Value::Array(dates) => dates.iter().all(|date| {
                date.as_str()
                    .map_or(false, |date| DateTime::parse_from_rfc3339(date).is_ok())
            }),
            _ => false,
        };
        if valid {
            return Ok(());
        }
        Err(DocumentManagerError::invalid_argument(format!(
            "Date field \"{}\" of \"{}\" must hold RFC 3339 timestamps, got {}",
            field,
            metadata.class(),
            value
        )))
    }
}

impl EventSubscriber for FieldSubscriber {
    fn subscribe(self: Rc<Self>, dispatcher: &EventDispatcher) {
        dispatcher.add_listener::<HydrateEvent>(
            HydrateStage::Mapping,
            "fields.hydrate",
            Self::handle_hydrate,
        );
        dispatcher.add_listener::<PersistEvent>(
            PersistStage::Mapping,
            "fields.persist",
            Self::handle_persist,
        );
    }
}
