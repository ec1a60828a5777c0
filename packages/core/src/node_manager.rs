//! Node level operations on the repository session
//!
//! Identifiers are either absolute paths or node UUIDs (the hyphenated
//! 36 character form). Everything that takes an identifier accepts both.

use crate::error::{DocumentManagerError, Result};
use crate::session::{join_path, NodeId, Session, JCR_UUID, MIX_REFERENCEABLE};
use serde_json::Value;
use std::rc::Rc;
use tracing::debug;
use uuid::Uuid;

/// Whether `identifier` is a hyphenated UUID
pub fn is_uuid(identifier: &str) -> bool {
    identifier.len() == 36 && Uuid::parse_str(identifier).is_ok()
}

pub struct NodeManager {
    session: Rc<dyn Session>,
}

impl NodeManager {
    pub fn new(session: Rc<dyn Session>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Rc<dyn Session> {
        &self.session
    }

    /// Resolve a path or UUID to a node
    ///
    /// # Errors
    ///
    /// `DocumentNotFound` wrapping the repository error.
    pub fn find(&self, identifier: &str) -> Result<NodeId> {
        let found = if is_uuid(identifier) {
            self.session.node_by_identifier(identifier)
        } else {
            self.session.node_by_path(identifier)
        };

        found.map_err(|source| DocumentManagerError::DocumentNotFound {
            message: format!("Could not find document with ID or path \"{}\"", identifier),
            source: Some(source),
        })
    }

    pub fn has(&self, identifier: &str) -> bool {
        self.find(identifier).is_ok()
    }

    pub fn remove(&self, identifier: &str) -> Result<()> {
        let node = self.session.node_by_path(&self.normalize_to_path(identifier)?)?;
        debug!("Removing node {}", identifier);
        self.session.remove(node)?;
        Ok(())
    }

    /// Move the node `src_id` to `<dest_id>/<name>`, returning the new path
    pub fn move_node(&self, src_id: &str, dest_id: &str, name: &str) -> Result<String> {
        let src_path = self.normalize_to_path(src_id)?;
        let dest_path = join_path(&self.normalize_to_path(dest_id)?, name);
        debug!("Moving {} to {}", src_path, dest_path);
        self.session.move_node(&src_path, &dest_path)?;
        Ok(dest_path)
    }

    /// Copy the node `src_id` to `<dest_id>/<name>`, returning the copy's path
    pub fn copy(&self, src_id: &str, dest_id: &str, name: &str) -> Result<String> {
        let src_path = self.normalize_to_path(src_id)?;
        let dest_path = join_path(&self.normalize_to_path(dest_id)?, name);
        debug!("Copying {} to {}", src_path, dest_path);
        self.session.copy(&src_path, &dest_path)?;
        Ok(dest_path)
    }

    pub fn save(&self) -> Result<()> {
        self.session.save()?;
        Ok(())
    }

    /// Discard every staged change
    pub fn clear(&self) -> Result<()> {
        self.session.refresh(false)?;
        Ok(())
    }

    /// Return the node at `path`, creating missing segments
    ///
    /// Created nodes are referenceable; the last one receives `uuid` when given.
    pub fn create_path(&self, path: &str, uuid: Option<&str>) -> Result<NodeId> {
        let mut current = self.session.root_node();
        let segments: Vec<&str> = path.split('/').filter(|segment| !segment.is_empty()).collect();

        for (index, segment) in segments.iter().enumerate() {
            match self.session.child(current, segment) {
                Ok(child) => current = child,
                Err(error) if error.is_not_found() => {
                    debug!("Creating path segment {} below {}", segment, self.session.path(current)?);
                    current = self.session.add_node(current, segment)?;
                    self.session.add_mixin(current, MIX_REFERENCEABLE)?;
                    let identifier = match uuid {
                        Some(uuid) if index + 1 == segments.len() => uuid.to_string(),
                        _ => Uuid::new_v4().to_string(),
                    };
                    self.session
                        .set_property(current, JCR_UUID, Value::String(identifier))?;
                }
                Err(error) => return Err(error.into()),
            }
        }
        Ok(current)
    }

    /// Remove every node below the root
    pub fn purge_workspace(&self) -> Result<()> {
        let root = self.session.root_node();
        for child in self.session.children(root)? {
            if self.session.name(child)?.starts_with("jcr:") {
                continue;
            }
            self.session.remove(child)?;
        }
        Ok(())
    }

    fn normalize_to_path(&self, identifier: &str) -> Result<String> {
        if is_uuid(identifier) {
            let node = self.session.node_by_identifier(identifier)?;
            return Ok(self.session.path(node)?);
        }
        Ok(identifier.to_string())
    }
}
