use super::Metadata;
use crate::error::{DocumentManagerError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of document metadata, looked up by alias, class or repository type
///
/// Built once and shared between managers.
#[derive(Debug, Default)]
pub struct MetadataFactory {
    metadata: Vec<Arc<Metadata>>,
    by_alias: HashMap<String, usize>,
    by_class: HashMap<String, usize>,
    by_repository_type: HashMap<String, usize>,
}

impl MetadataFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a factory from a list of metadata
    pub fn from_metadata(metadata: impl IntoIterator<Item = Metadata>) -> Result<Self> {
        let mut factory = Self::new();
        for entry in metadata {
            factory.register(entry)?;
        }
        Ok(factory)
    }

    /// # Errors
    ///
    /// `InvalidArgument` when the alias, class or repository type is already taken.
    pub fn register(&mut self, metadata: Metadata) -> Result<()> {
        for (kind, key, index) in [
            ("alias", metadata.alias(), &self.by_alias),
            ("class", metadata.class(), &self.by_class),
            ("type", metadata.repository_type(), &self.by_repository_type),
        ] {
            if index.contains_key(key) {
                return Err(DocumentManagerError::invalid_argument(format!(
                    "Metadata with {} \"{}\" is already registered",
                    kind, key
                )));
            }
        }

        let position = self.metadata.len();
        self.by_alias.insert(metadata.alias().to_string(), position);
        self.by_class.insert(metadata.class().to_string(), position);
        self.by_repository_type
            .insert(metadata.repository_type().to_string(), position);
        self.metadata.push(Arc::new(metadata));
        Ok(())
    }

    pub fn with(mut self, metadata: Metadata) -> Result<Self> {
        self.register(metadata)?;
        Ok(self)
    }

    pub fn metadata_for_alias(&self, alias: &str) -> Result<Arc<Metadata>> {
        self.lookup(&self.by_alias, alias).ok_or_else(|| {
            DocumentManagerError::metadata_not_found(format!(
                "Metadata not found for alias \"{}\". Known aliases: \"{}\"",
                alias,
                self.aliases().join("\", \"")
            ))
        })
    }

    pub fn metadata_for_class(&self, class: &str) -> Result<Arc<Metadata>> {
        self.lookup(&self.by_class, class).ok_or_else(|| {
            DocumentManagerError::metadata_not_found(format!(
                "Metadata not found for class \"{}\"",
                class
            ))
        })
    }

    pub fn metadata_for_repository_type(&self, repository_type: &str) -> Result<Arc<Metadata>> {
        self.lookup(&self.by_repository_type, repository_type).ok_or_else(|| {
            DocumentManagerError::metadata_not_found(format!(
                "Metadata not found for repository type \"{}\"",
                repository_type
            ))
        })
    }

    /// Resolve by alias first, then by class
    pub fn metadata_for_alias_or_class(&self, name: &str) -> Result<Arc<Metadata>> {
        if self.has_alias(name) {
            return self.metadata_for_alias(name);
        }
        self.metadata_for_class(name)
    }

    pub fn has_alias(&self, alias: &str) -> bool {
        self.by_alias.contains_key(alias)
    }

    pub fn has_metadata_for_class(&self, class: &str) -> bool {
        self.by_class.contains_key(class)
    }

    pub fn has_metadata_for_repository_type(&self, repository_type: &str) -> bool {
        self.by_repository_type.contains_key(repository_type)
    }

    /// Registered aliases, sorted
    pub fn aliases(&self) -> Vec<&str> {
        let mut aliases: Vec<&str> = self.by_alias.keys().map(String::as_str).collect();
        aliases.sort_unstable();
        aliases
    }

    pub fn all_metadata(&self) -> impl Iterator<Item = &Arc<Metadata>> {
        self.metadata.iter()
    }

    fn lookup(&self, index: &HashMap<String, usize>, key: &str) -> Option<Arc<Metadata>> {
        index
            .get(key)
            .and_then(|position| self.metadata.get(*position))
            .cloned()
    }
}
