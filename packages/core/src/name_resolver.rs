//! Collision-free node names

use crate::error::Result;
use crate::session::{NodeId, Session};

/// Resolves a free child name below a parent
///
/// `name` is returned when it is free, otherwise the first free one of
/// `name-1`, `name-2`, ... A child that is `for_node` itself does not count
/// as a collision, so renaming a node to its current name is stable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameResolver;

impl NameResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve_name(
        &self,
        session: &dyn Session,
        parent: NodeId,
        name: &str,
        for_node: Option<NodeId>,
    ) -> Result<String> {
        let mut candidate = name.to_string();
        let mut index = 0;

        loop {
            if index > 0 {
                candidate = format!("{}-{}", name, index);
            }
            if !session.has_child(parent, &candidate)? {
                return Ok(candidate);
            }
            if let Some(node) = for_node {
                if session.child(parent, &candidate)? == node {
                    return Ok(candidate);
                }
            }
            index += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::InMemorySession;

    fn session_with(names: &[&str]) -> (InMemorySession, NodeId) {
        let session = InMemorySession::new();
        let parent = session.add_node(session.root_node(), "parent").unwrap();
        for name in names {
            session.add_node(parent, name).unwrap();
        }
        (session, parent)
    }

    #[test]
    fn test_free_name_is_kept() {
        let (session, parent) = session_with(&[]);
        assert_eq!(
            NameResolver.resolve_name(&session, parent, "article", None).unwrap(),
            "article"
        );
    }

    #[test]
    fn test_collisions_are_suffixed() {
        let (session, parent) = session_with(&["article", "article-1"]);
        assert_eq!(
            NameResolver.resolve_name(&session, parent, "article", None).unwrap(),
            "article-2"
        );
    }

    #[test]
    fn test_node_does_not_collide_with_itself() {
        let (session, parent) = session_with(&["article"]);
        let node = session.child(parent, "article").unwrap();
        assert_eq!(
            NameResolver
                .resolve_name(&session, parent, "article", Some(node))
                .unwrap(),
            "article"
        );
    }
}
