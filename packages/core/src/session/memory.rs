//! In-memory repository session
//!
//! A complete [`Session`] implementation backed by two node trees: the
//! *current* tree receives every write, the *persisted* tree is what
//! [`save`](Session::save) last promoted. Version history is kept per node
//! and survives refreshes, like a workspace-level version store would.

use super::error::{SessionError, SessionResult};
use super::evaluate;
use super::qom::QueryObjectModel;
use super::{
    join_path, parent_path, path_name, NodeId, PropertyReference, PropertyType, Row, Session,
    VersionInfo, JCR_MIXIN_TYPES, JCR_UUID, MIX_VERSIONABLE,
};
use crate::models::time::{SystemTimeProvider, TimeProvider};
use regex::Regex;
use serde_json::Value;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub(super) struct PropertyRecord {
    pub value: Value,
    pub kind: PropertyType,
}

#[derive(Debug, Clone)]
pub(super) struct NodeRecord {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub properties: BTreeMap<String, PropertyRecord>,
}

impl NodeRecord {
    fn new(name: &str, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.properties.get(name).map(|property| &property.value)
    }

    pub fn mixins(&self) -> Vec<&str> {
        match self.value(JCR_MIXIN_TYPES) {
            Some(Value::Array(values)) => values.iter().filter_map(Value::as_str).collect(),
            Some(Value::String(single)) => vec![single.as_str()],
            _ => Vec::new(),
        }
    }
}

/// One complete node tree
#[derive(Debug, Clone)]
pub(super) struct Tree {
    pub root: NodeId,
    pub nodes: HashMap<NodeId, NodeRecord>,
}

impl Tree {
    fn new() -> Self {
        let root = NodeId::new();
        let mut nodes = HashMap::new();
        nodes.insert(root, NodeRecord::new("", None));
        Self { root, nodes }
    }

    pub fn get(&self, id: NodeId) -> SessionResult<&NodeRecord> {
        self.nodes
            .get(&id)
            .ok_or_else(|| SessionError::NodeNotFound(id.to_string()))
    }

    fn get_mut(&mut self, id: NodeId) -> SessionResult<&mut NodeRecord> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| SessionError::NodeNotFound(id.to_string()))
    }

    pub fn child_by_name(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.nodes.get(&parent).and_then(|record| {
            record
                .children
                .iter()
                .copied()
                .find(|child| self.nodes.get(child).is_some_and(|c| c.name == name))
        })
    }

    pub fn resolve(&self, path: &str) -> SessionResult<NodeId> {
        if !path.starts_with('/') {
            return Err(SessionError::invalid_path(path, "path must be absolute"));
        }
        let mut current = self.root;
        for segment in path.split('/').filter(|segment| !segment.is_empty()) {
            current = self
                .child_by_name(current, segment)
                .ok_or_else(|| SessionError::item_not_found(path))?;
        }
        Ok(current)
    }

    pub fn path_of(&self, id: NodeId) -> SessionResult<String> {
        let mut segments = Vec::new();
        let mut current = self.get(id)?;
        while let Some(parent) = current.parent {
            segments.push(current.name.as_str());
            current = self.get(parent)?;
        }
        if segments.is_empty() {
            return Ok("/".to_string());
        }
        segments.reverse();
        Ok(format!("/{}", segments.join("/")))
    }

    fn find_by_identifier(&self, identifier: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, record)| record.value(JCR_UUID).and_then(Value::as_str) == Some(identifier))
            .map(|(id, _)| *id)
    }

    /// Every node below the root in document order
    pub fn walk(&self) -> Vec<NodeId> {
        let mut ordered = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if id != self.root {
                ordered.push(id);
            }
            if let Some(record) = self.nodes.get(&id) {
                stack.extend(record.children.iter().rev().copied());
            }
        }
        ordered
    }

    fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut collected = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            collected.push(current);
            if let Some(record) = self.nodes.get(&current) {
                stack.extend(record.children.iter().copied());
            }
        }
        collected
    }

    fn detach(&mut self, id: NodeId) -> SessionResult<()> {
        if let Some(parent) = self.get(id)?.parent {
            self.get_mut(parent)?.children.retain(|child| *child != id);
        }
        Ok(())
    }

    fn remove_subtree(&mut self, id: NodeId) -> SessionResult<()> {
        self.detach(id)?;
        for node in self.subtree(id) {
            self.nodes.remove(&node);
        }
        Ok(())
    }

    /// Deep-copy `source` under `parent`, assigning fresh identifiers
    fn copy_subtree(&mut self, source: NodeId, parent: NodeId, name: &str) -> SessionResult<NodeId> {
        let original = self.get(source)?.clone();
        let copy = NodeId::new();
        let mut record = NodeRecord::new(name, Some(parent));
        record.properties = original.properties;
        if record.properties.contains_key(JCR_UUID) {
            record.properties.insert(
                JCR_UUID.to_string(),
                PropertyRecord {
                    value: Value::String(Uuid::new_v4().to_string()),
                    kind: PropertyType::Generic,
                },
            );
        }
        self.nodes.insert(copy, record);
        self.get_mut(parent)?.children.push(copy);

        for child in original.children {
            let child_name = self.get(child)?.name.clone();
            self.copy_subtree(child, copy, &child_name)?;
        }
        Ok(copy)
    }
}

#[derive(Debug, Clone)]
struct VersionRecord {
    info: VersionInfo,
    frozen: BTreeMap<String, Value>,
}

#[derive(Debug)]
struct RepositoryState {
    current: Tree,
    persisted: Tree,
    history: HashMap<NodeId, Vec<VersionRecord>>,
    checked_in: HashSet<NodeId>,
}

/// In-memory content repository session
///
/// Checked-in nodes are tracked for the versioning API but writes to them
/// are not rejected.
pub struct InMemorySession {
    state: RefCell<RepositoryState>,
    time_provider: Box<dyn TimeProvider>,
}

impl InMemorySession {
    pub fn new() -> Self {
        Self::with_time_provider(Box::new(SystemTimeProvider))
    }

    pub fn with_time_provider(time_provider: Box<dyn TimeProvider>) -> Self {
        let tree = Tree::new();
        Self {
            state: RefCell::new(RepositoryState {
                persisted: tree.clone(),
                current: tree,
                history: HashMap::new(),
                checked_in: HashSet::new(),
            }),
            time_provider,
        }
    }

    /// Whether the current tree differs from the persisted one
    pub fn has_pending_changes(&self) -> bool {
        match self.state() {
            Ok(state) => {
                state.current.nodes.len() != state.persisted.nodes.len()
                    || state.current.nodes.iter().any(|(id, record)| {
                        state.persisted.nodes.get(id).map_or(true, |persisted| {
                            persisted.name != record.name
                                || persisted.parent != record.parent
                                || persisted.children != record.children
                                || persisted.properties != record.properties
                        })
                    })
            }
            Err(_) => false,
        }
    }

    fn state(&self) -> SessionResult<Ref<'_, RepositoryState>> {
        self.state
            .try_borrow()
            .map_err(|_| SessionError::InvalidState("session is being modified".to_string()))
    }

    fn state_mut(&self) -> SessionResult<RefMut<'_, RepositoryState>> {
        self.state
            .try_borrow_mut()
            .map_err(|_| SessionError::InvalidState("session is already borrowed".to_string()))
    }

    fn validate_name(name: &str) -> SessionResult<()> {
        if name.is_empty() || name.contains('/') || name == "." || name == ".." {
            return Err(SessionError::invalid_path(
                name,
                "node names must be non-empty and must not contain '/'",
            ));
        }
        Ok(())
    }

    fn versionable(state: &RepositoryState, path: &str) -> SessionResult<NodeId> {
        let id = state.current.resolve(path)?;
        if !state.current.get(id)?.mixins().contains(&MIX_VERSIONABLE) {
            return Err(SessionError::UnsupportedRepositoryOperation(format!(
                "Node at \"{}\" is not versionable",
                path
            )));
        }
        Ok(id)
    }

    fn record_version(&self, path: &str) -> SessionResult<(NodeId, VersionInfo)> {
        let mut state = self.state_mut()?;
        let id = Self::versionable(&state, path)?;
        let frozen = state
            .current
            .get(id)?
            .properties
            .iter()
            .map(|(name, property)| (name.clone(), property.value.clone()))
            .collect();
        let history = state.history.entry(id).or_default();
        let info = VersionInfo {
            name: format!("1.{}", history.len()),
            created: self.time_provider.now(),
        };
        history.push(VersionRecord {
            info: info.clone(),
            frozen,
        });
        Ok((id, info))
    }
}

impl Default for InMemorySession {
    fn default() -> Self {
        Self::new()
    }
}

/// Compile a `*`/`|` glob into an anchored regex
fn glob_to_regex(pattern: &str) -> SessionResult<Regex> {
    let alternatives: Vec<String> = pattern
        .split('|')
        .map(|alternative| {
            alternative
                .trim()
                .split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(".*")
        })
        .collect();
    Regex::new(&format!("^(?:{})$", alternatives.join("|")))
        .map_err(|e| SessionError::invalid_query(format!("Invalid property pattern: {}", e)))
}

fn value_mentions(value: &Value, identifier: &str) -> bool {
    match value {
        Value::String(s) => s == identifier,
        Value::Array(values) => values.iter().any(|v| v.as_str() == Some(identifier)),
        _ => false,
    }
}

impl Session for InMemorySession {
    fn root_node(&self) -> NodeId {
        match self.state() {
            Ok(state) => state.current.root,
            Err(_) => NodeId::from_uuid(Uuid::nil()),
        }
    }

    fn node_by_path(&self, path: &str) -> SessionResult<NodeId> {
        self.state()?.current.resolve(path)
    }

    fn node_by_identifier(&self, identifier: &str) -> SessionResult<NodeId> {
        self.state()?
            .current
            .find_by_identifier(identifier)
            .ok_or_else(|| SessionError::NodeNotFound(identifier.to_string()))
    }

    fn path(&self, node: NodeId) -> SessionResult<String> {
        self.state()?.current.path_of(node)
    }

    fn name(&self, node: NodeId) -> SessionResult<String> {
        Ok(self.state()?.current.get(node)?.name.clone())
    }

    fn parent(&self, node: NodeId) -> SessionResult<NodeId> {
        let state = self.state()?;
        state
            .current
            .get(node)?
            .parent
            .ok_or_else(|| SessionError::item_not_found("/.."))
    }

    fn depth(&self, node: NodeId) -> SessionResult<usize> {
        let state = self.state()?;
        let mut depth = 0;
        let mut current = state.current.get(node)?;
        while let Some(parent) = current.parent {
            depth += 1;
            current = state.current.get(parent)?;
        }
        Ok(depth)
    }

    fn children(&self, node: NodeId) -> SessionResult<Vec<NodeId>> {
        Ok(self.state()?.current.get(node)?.children.clone())
    }

    fn child(&self, node: NodeId, name: &str) -> SessionResult<NodeId> {
        let state = self.state()?;
        state.current.get(node)?;
        match state.current.child_by_name(node, name) {
            Some(child) => Ok(child),
            None => Err(SessionError::item_not_found(join_path(
                &state.current.path_of(node)?,
                name,
            ))),
        }
    }

    fn add_node(&self, parent: NodeId, name: &str) -> SessionResult<NodeId> {
        Self::validate_name(name)?;
        let mut state = self.state_mut()?;
        state.current.get(parent)?;
        if state.current.child_by_name(parent, name).is_some() {
            let path = join_path(&state.current.path_of(parent)?, name);
            return Err(SessionError::ItemExists(path));
        }
        let id = NodeId::new();
        state.current.nodes.insert(id, NodeRecord::new(name, Some(parent)));
        state.current.get_mut(parent)?.children.push(id);
        Ok(id)
    }

    fn remove(&self, node: NodeId) -> SessionResult<()> {
        let mut state = self.state_mut()?;
        if node == state.current.root {
            return Err(SessionError::ConstraintViolation(
                "The root node cannot be removed".to_string(),
            ));
        }
        state.current.remove_subtree(node)
    }

    fn move_node(&self, src_path: &str, dest_path: &str) -> SessionResult<()> {
        let name = path_name(dest_path).to_string();
        Self::validate_name(&name)?;
        let mut state = self.state_mut()?;
        let source = state.current.resolve(src_path)?;
        if source == state.current.root {
            return Err(SessionError::ConstraintViolation(
                "The root node cannot be moved".to_string(),
            ));
        }
        let dest_parent = state.current.resolve(parent_path(dest_path))?;
        if dest_path == src_path {
            return Ok(());
        }
        if dest_path.starts_with(&format!("{}/", src_path)) {
            return Err(SessionError::ConstraintViolation(format!(
                "Cannot move \"{}\" below itself",
                src_path
            )));
        }
        if state.current.child_by_name(dest_parent, &name).is_some() {
            return Err(SessionError::ItemExists(dest_path.to_string()));
        }

        state.current.detach(source)?;
        let record = state.current.get_mut(source)?;
        record.name = name;
        record.parent = Some(dest_parent);
        state.current.get_mut(dest_parent)?.children.push(source);
        Ok(())
    }

    fn copy(&self, src_path: &str, dest_path: &str) -> SessionResult<()> {
        let name = path_name(dest_path).to_string();
        Self::validate_name(&name)?;
        let mut state = self.state_mut()?;
        let source = state.current.resolve(src_path)?;
        let dest_parent = state.current.resolve(parent_path(dest_path))?;
        if state.current.child_by_name(dest_parent, &name).is_some() {
            return Err(SessionError::ItemExists(dest_path.to_string()));
        }
        state.current.copy_subtree(source, dest_parent, &name)?;
        Ok(())
    }

    fn rename(&self, node: NodeId, new_name: &str) -> SessionResult<()> {
        Self::validate_name(new_name)?;
        let mut state = self.state_mut()?;
        let parent = state
            .current
            .get(node)?
            .parent
            .ok_or_else(|| SessionError::ConstraintViolation("The root node cannot be renamed".into()))?;
        match state.current.child_by_name(parent, new_name) {
            Some(existing) if existing == node => return Ok(()),
            Some(_) => {
                let path = join_path(&state.current.path_of(parent)?, new_name);
                return Err(SessionError::ItemExists(path));
            }
            None => {}
        }
        state.current.get_mut(node)?.name = new_name.to_string();
        Ok(())
    }

    fn order_before(
        &self,
        parent: NodeId,
        src_name: &str,
        dest_name: Option<&str>,
    ) -> SessionResult<()> {
        let mut state = self.state_mut()?;
        let parent_path = state.current.path_of(parent)?;
        let source = state
            .current
            .child_by_name(parent, src_name)
            .ok_or_else(|| SessionError::item_not_found(join_path(&parent_path, src_name)))?;
        let destination = match dest_name {
            Some(dest_name) => Some(
                state
                    .current
                    .child_by_name(parent, dest_name)
                    .ok_or_else(|| SessionError::item_not_found(join_path(&parent_path, dest_name)))?,
            ),
            None => None,
        };

        let children = &mut state.current.get_mut(parent)?.children;
        children.retain(|child| *child != source);
        match destination.and_then(|dest| children.iter().position(|child| *child == dest)) {
            Some(index) => children.insert(index, source),
            None => children.push(source),
        }
        Ok(())
    }

    fn property(&self, node: NodeId, name: &str) -> SessionResult<Option<Value>> {
        Ok(self.state()?.current.get(node)?.value(name).cloned())
    }

    fn property_type(&self, node: NodeId, name: &str) -> SessionResult<Option<PropertyType>> {
        Ok(self
            .state()?
            .current
            .get(node)?
            .properties
            .get(name)
            .map(|property| property.kind))
    }

    fn set_typed_property(
        &self,
        node: NodeId,
        name: &str,
        value: Value,
        kind: PropertyType,
    ) -> SessionResult<()> {
        let mut state = self.state_mut()?;
        let record = state.current.get_mut(node)?;
        if value.is_null() {
            record.properties.remove(name);
        } else {
            record
                .properties
                .insert(name.to_string(), PropertyRecord { value, kind });
        }
        Ok(())
    }

    fn remove_property(&self, node: NodeId, name: &str) -> SessionResult<()> {
        self.state_mut()?.current.get_mut(node)?.properties.remove(name);
        Ok(())
    }

    fn properties(&self, node: NodeId, pattern: &str) -> SessionResult<BTreeMap<String, Value>> {
        let matcher = glob_to_regex(pattern)?;
        Ok(self
            .state()?
            .current
            .get(node)?
            .properties
            .iter()
            .filter(|(name, _)| matcher.is_match(name))
            .map(|(name, property)| (name.clone(), property.value.clone()))
            .collect())
    }

    fn references(&self, node: NodeId) -> SessionResult<Vec<PropertyReference>> {
        let state = self.state()?;
        let identifier = match state.current.get(node)?.value(JCR_UUID).and_then(Value::as_str) {
            Some(identifier) => identifier.to_string(),
            None => return Ok(Vec::new()),
        };

        let mut references = Vec::new();
        for id in state.current.walk() {
            let record = state.current.get(id)?;
            for (name, property) in &record.properties {
                if property.kind == PropertyType::Reference && value_mentions(&property.value, &identifier)
                {
                    references.push(PropertyReference {
                        node: id,
                        name: name.clone(),
                        path: join_path(&state.current.path_of(id)?, name),
                    });
                }
            }
        }
        Ok(references)
    }

    fn save(&self) -> SessionResult<()> {
        let mut state = self.state_mut()?;
        state.persisted = state.current.clone();
        Ok(())
    }

    fn refresh(&self, keep_changes: bool) -> SessionResult<()> {
        if !keep_changes {
            let mut state = self.state_mut()?;
            state.current = state.persisted.clone();
        }
        Ok(())
    }

    fn revert(&self, node: NodeId) -> SessionResult<()> {
        let mut state = self.state_mut()?;
        let state = &mut *state;
        if !state.persisted.nodes.contains_key(&node) {
            // never saved: nothing to return to
            return Ok(());
        }

        if state.current.nodes.contains_key(&node) {
            for id in state.current.subtree(node) {
                if id != node {
                    state.current.nodes.remove(&id);
                }
            }
        }

        for id in state.persisted.subtree(node) {
            let record = state.persisted.get(id)?.clone();
            state.current.nodes.insert(id, record);
        }

        // re-attach under the persisted parent at its persisted position
        if let Some(parent) = state.persisted.get(node)?.parent {
            if let Some(current_parent) = state.current.nodes.values_mut().find(|r| r.children.contains(&node)) {
                current_parent.children.retain(|child| *child != node);
            }
            let position = state
                .persisted
                .get(parent)?
                .children
                .iter()
                .position(|child| *child == node)
                .unwrap_or(0);
            if let Ok(parent_record) = state.current.get_mut(parent) {
                let index = position.min(parent_record.children.len());
                parent_record.children.insert(index, node);
            }
        }
        Ok(())
    }

    fn is_checked_out(&self, path: &str) -> SessionResult<bool> {
        let state = self.state()?;
        let id = Self::versionable(&state, path)?;
        Ok(!state.checked_in.contains(&id))
    }

    fn checkout(&self, path: &str) -> SessionResult<()> {
        let mut state = self.state_mut()?;
        let id = Self::versionable(&state, path)?;
        state.checked_in.remove(&id);
        Ok(())
    }

    fn checkin(&self, path: &str) -> SessionResult<VersionInfo> {
        let (id, info) = self.record_version(path)?;
        self.state_mut()?.checked_in.insert(id);
        Ok(info)
    }

    fn checkpoint(&self, path: &str) -> SessionResult<VersionInfo> {
        let (id, info) = self.record_version(path)?;
        self.state_mut()?.checked_in.remove(&id);
        Ok(info)
    }

    fn version_history(&self, path: &str) -> SessionResult<Vec<VersionInfo>> {
        let state = self.state()?;
        let id = Self::versionable(&state, path)?;
        Ok(state
            .history
            .get(&id)
            .map(|records| records.iter().map(|record| record.info.clone()).collect())
            .unwrap_or_default())
    }

    fn frozen_properties(
        &self,
        path: &str,
        version: &str,
    ) -> SessionResult<BTreeMap<String, Value>> {
        let state = self.state()?;
        let id = Self::versionable(&state, path)?;
        state
            .history
            .get(&id)
            .and_then(|records| records.iter().find(|record| record.info.name == version))
            .map(|record| record.frozen.clone())
            .ok_or_else(|| SessionError::VersionNotFound {
                path: path.to_string(),
                version: version.to_string(),
            })
    }

    fn execute_query(
        &self,
        query: &QueryObjectModel,
        bindings: &BTreeMap<String, Value>,
        limit: Option<usize>,
        offset: usize,
    ) -> SessionResult<Vec<Row>> {
        let state = self.state()?;
        evaluate::execute(&state.current, query, bindings, limit, offset)
    }
}
