//! Builder to query object model translation

use super::builder::{Condition, Operand, QueryBuilder};
use crate::error::{DocumentManagerError, Result};
use crate::metadata::{Metadata, MetadataFactory};
use crate::property_encoder::PropertyEncoder;
use crate::session::qom::{
    Column, Constraint, DynamicOperand, Order, Ordering, QueryObjectModel, Selector, StaticOperand,
};
use crate::strategy::DocumentStrategy;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Translates a [`QueryBuilder`] into a [`QueryObjectModel`]
///
/// Document fields are encoded into property names for the builder's
/// locale, and the strategy's source constraint restricts the selector to
/// the requested document type.
pub struct QueryBuilderConverter<'a> {
    metadata_factory: &'a MetadataFactory,
    encoder: &'a PropertyEncoder,
    strategy: &'a dyn DocumentStrategy,
}

struct Conversion<'b> {
    locale: &'b str,
    metadata: BTreeMap<String, Arc<Metadata>>,
}

impl<'a> QueryBuilderConverter<'a> {
    pub fn new(
        metadata_factory: &'a MetadataFactory,
        encoder: &'a PropertyEncoder,
        strategy: &'a dyn DocumentStrategy,
    ) -> Self {
        Self {
            metadata_factory,
            encoder,
            strategy,
        }
    }

    /// # Errors
    ///
    /// `InvalidArgument` without a locale, without a source, with more than
    /// one source, or when a field refers to an unknown alias or unmapped field.
    pub fn convert(&self, builder: &QueryBuilder) -> Result<QueryObjectModel> {
        let locale = builder
            .get_locale()
            .ok_or_else(|| DocumentManagerError::invalid_argument("No locale specified"))?;

        let source = match builder.sources() {
            [] => {
                return Err(DocumentManagerError::invalid_argument(
                    "No From (source) node in query",
                ))
            }
            [source] => source,
            _ => {
                return Err(DocumentManagerError::invalid_argument(
                    "Selecting from multiple document sources is not supported",
                ))
            }
        };

        let metadata = self
            .metadata_factory
            .metadata_for_alias_or_class(&source.document)?;
        let mut conversion = Conversion {
            locale,
            metadata: BTreeMap::new(),
        };
        conversion
            .metadata
            .insert(source.alias.clone(), Arc::clone(&metadata));

        let mut qom = QueryObjectModel::new(Selector::new(
            self.strategy.primary_node_type(metadata.class()),
            source.alias.clone(),
        ));

        for selected in builder.columns() {
            let (alias, property) = self.property(&conversion, &selected.field)?;
            qom = qom.with_column(Column::new(alias, property).named(selected.column.clone()));
        }

        if let Some(condition) = builder.condition() {
            qom = qom.with_constraint(self.constraint(&conversion, condition)?);
        }

        for (field, order) in builder.orderings() {
            let (alias, property) = self.property(&conversion, field)?;
            let operand = DynamicOperand::property(alias, property);
            qom = qom.with_ordering(match order {
                Order::Ascending => Ordering::ascending(operand),
                Order::Descending => Ordering::descending(operand),
            });
        }

        let source_constraint = self
            .strategy
            .create_source_constraint(&source.alias, metadata.class())?;
        Ok(qom.and_constraint(source_constraint))
    }

    fn constraint(&self, conversion: &Conversion<'_>, condition: &Condition) -> Result<Constraint> {
        Ok(match condition {
            Condition::Comparison {
                field,
                operator,
                operand,
            } => {
                let (alias, property) = self.property(conversion, field)?;
                let operand2 = match operand {
                    Operand::Literal(value) => StaticOperand::Literal(value.clone()),
                    Operand::Parameter(name) => StaticOperand::BindVariable(name.clone()),
                };
                Constraint::comparison(DynamicOperand::property(alias, property), *operator, operand2)
            }
            Condition::FieldExists(field) => {
                let (selector, property) = self.property(conversion, field)?;
                Constraint::PropertyExistence { selector, property }
            }
            Condition::FullText { target, expression } => {
                let (selector, property) = if target.contains('.') {
                    let (selector, property) = self.property(conversion, target)?;
                    (selector, Some(property))
                } else {
                    (Self::known_alias(conversion, target)?, None)
                };
                Constraint::FullTextSearch {
                    selector,
                    property,
                    expression: expression.clone(),
                }
            }
            Condition::SameNode { alias, path } => Constraint::SameNode {
                selector: Self::known_alias(conversion, alias)?,
                path: path.clone(),
            },
            Condition::ChildOf { alias, path } => Constraint::ChildNode {
                selector: Self::known_alias(conversion, alias)?,
                path: path.clone(),
            },
            Condition::DescendantOf { alias, path } => Constraint::DescendantNode {
                selector: Self::known_alias(conversion, alias)?,
                path: path.clone(),
            },
            Condition::And(left, right) => Constraint::and(
                self.constraint(conversion, left)?,
                self.constraint(conversion, right)?,
            ),
            Condition::Or(left, right) => Constraint::or(
                self.constraint(conversion, left)?,
                self.constraint(conversion, right)?,
            ),
            Condition::Not(inner) => Constraint::not(self.constraint(conversion, inner)?),
        })
    }

    /// Selector and encoded property name of `<alias>.<field>`
    fn property(&self, conversion: &Conversion<'_>, field: &str) -> Result<(String, String)> {
        let (alias, field) = field.split_once('.').ok_or_else(|| {
            DocumentManagerError::invalid_argument(format!(
                "Field \"{}\" must be given as \"<alias>.<field>\"",
                field
            ))
        })?;

        let alias = Self::known_alias(conversion, alias)?;
        let mapping = conversion.metadata[&alias].field_mapping(field)?;
        let property = self
            .encoder
            .encode(mapping.encoding, &mapping.property, Some(conversion.locale))?;
        Ok((alias, property))
    }

    fn known_alias(conversion: &Conversion<'_>, alias: &str) -> Result<String> {
        if conversion.metadata.contains_key(alias) {
            return Ok(alias.to_string());
        }
        Err(DocumentManagerError::invalid_argument(format!(
            "Unknown document alias \"{}\". Known aliases: \"{}\"",
            alias,
            conversion
                .metadata
                .keys()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join("\", \"")
        )))
    }
}
