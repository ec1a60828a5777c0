//! Tests for InMemorySession
//!
//! Covers tree navigation, structural changes, staging (save/refresh/revert),
//! references, versioning and query execution.

#[cfg(test)]
mod tests {
    use crate::session::qom::{
        Column, Constraint, DynamicOperand, Operator, Ordering, QueryObjectModel, Selector,
        StaticOperand,
    };
    use crate::session::{
        InMemorySession, PropertyType, Session, SessionError, JCR_UUID, MIX_VERSIONABLE,
    };
    use serde_json::{json, Value};
    use std::collections::BTreeMap;

    fn session_with(paths: &[&str]) -> InMemorySession {
        let session = InMemorySession::new();
        for path in paths {
            let mut current = session.root_node();
            for segment in path.split('/').filter(|s| !s.is_empty()) {
                current = match session.child(current, segment) {
                    Ok(child) => child,
                    Err(_) => session.add_node(current, segment).unwrap(),
                };
            }
        }
        session
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    #[test]
    fn test_paths_names_and_depth() {
        let session = session_with(&["/cmf/articles/foo"]);
        let foo = session.node_by_path("/cmf/articles/foo").unwrap();

        assert_eq!(session.path(foo).unwrap(), "/cmf/articles/foo");
        assert_eq!(session.name(foo).unwrap(), "foo");
        assert_eq!(session.depth(foo).unwrap(), 3);
        assert_eq!(session.depth(session.root_node()).unwrap(), 0);
        assert_eq!(session.path(session.root_node()).unwrap(), "/");

        let parent = session.parent(foo).unwrap();
        assert_eq!(session.path(parent).unwrap(), "/cmf/articles");
        assert!(session.parent(session.root_node()).is_err());
    }

    #[test]
    fn test_missing_path_is_item_not_found() {
        let session = InMemorySession::new();
        assert_eq!(
            session.node_by_path("/nope"),
            Err(SessionError::ItemNotFound("/nope".to_string()))
        );
        assert!(matches!(
            session.node_by_path("relative"),
            Err(SessionError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_node_by_identifier() {
        let session = session_with(&["/a"]);
        let a = session.node_by_path("/a").unwrap();
        session.set_property(a, JCR_UUID, json!("4b4b4b4b-0000-4000-8000-000000000001")).unwrap();

        assert_eq!(
            session.node_by_identifier("4b4b4b4b-0000-4000-8000-000000000001").unwrap(),
            a
        );
        assert!(session.node_by_identifier("missing").unwrap_err().is_not_found());
    }

    #[test]
    fn test_add_node_rejects_duplicates_and_bad_names() {
        let session = session_with(&["/a"]);
        let root = session.root_node();
        assert_eq!(
            session.add_node(root, "a"),
            Err(SessionError::ItemExists("/a".to_string()))
        );
        assert!(session.add_node(root, "x/y").is_err());
        assert!(session.add_node(root, "").is_err());
    }

    // ========================================================================
    // Structure
    // ========================================================================

    #[test]
    fn test_move_node() {
        let session = session_with(&["/a/child", "/b"]);
        let child = session.node_by_path("/a/child").unwrap();

        session.move_node("/a/child", "/b/renamed").unwrap();

        assert_eq!(session.path(child).unwrap(), "/b/renamed");
        assert!(!session.node_exists("/a/child"));
        assert!(session.move_node("/b", "/b/renamed/inner").is_err());
    }

    #[test]
    fn test_move_to_existing_path_fails() {
        let session = session_with(&["/a", "/b"]);
        assert_eq!(
            session.move_node("/a", "/b"),
            Err(SessionError::ItemExists("/b".to_string()))
        );
    }

    #[test]
    fn test_copy_assigns_fresh_identifiers() {
        let session = session_with(&["/a/child", "/b"]);
        let a = session.node_by_path("/a").unwrap();
        session.set_property(a, JCR_UUID, json!("original")).unwrap();
        session.set_property(a, "title", json!("Hello")).unwrap();

        session.copy("/a", "/b/a-copy").unwrap();

        let copy = session.node_by_path("/b/a-copy").unwrap();
        assert_ne!(copy, a);
        assert_eq!(session.property(copy, "title").unwrap(), Some(json!("Hello")));
        assert_ne!(session.property(copy, JCR_UUID).unwrap(), Some(json!("original")));
        assert!(session.node_exists("/b/a-copy/child"));
        assert!(session.node_exists("/a/child"));
    }

    #[test]
    fn test_rename_keeps_position() {
        let session = session_with(&["/p/one", "/p/two", "/p/three"]);
        let two = session.node_by_path("/p/two").unwrap();

        session.rename(two, "deux").unwrap();

        let parent = session.node_by_path("/p").unwrap();
        assert_eq!(session.child_names(parent).unwrap(), vec!["one", "deux", "three"]);
        assert!(session.rename(two, "one").is_err());
    }

    #[test]
    fn test_order_before() {
        let session = session_with(&["/p/one", "/p/two", "/p/three"]);
        let parent = session.node_by_path("/p").unwrap();

        session.order_before(parent, "three", Some("one")).unwrap();
        assert_eq!(session.child_names(parent).unwrap(), vec!["three", "one", "two"]);

        session.order_before(parent, "three", None).unwrap();
        assert_eq!(session.child_names(parent).unwrap(), vec!["one", "two", "three"]);

        assert!(session.order_before(parent, "missing", None).is_err());
    }

    #[test]
    fn test_remove_subtree_and_root_guard() {
        let session = session_with(&["/a/b/c"]);
        let a = session.node_by_path("/a").unwrap();
        session.remove(a).unwrap();
        assert!(!session.node_exists("/a/b/c"));
        assert!(session.remove(session.root_node()).is_err());
    }

    // ========================================================================
    // Properties
    // ========================================================================

    #[test]
    fn test_null_removes_property() {
        let session = session_with(&["/a"]);
        let a = session.node_by_path("/a").unwrap();
        session.set_property(a, "title", json!("x")).unwrap();
        session.set_property(a, "title", Value::Null).unwrap();
        assert!(!session.has_property(a, "title").unwrap());
    }

    #[test]
    fn test_properties_glob() {
        let session = session_with(&["/a"]);
        let a = session.node_by_path("/a").unwrap();
        session.set_property(a, "i18n:de-title", json!("Titel")).unwrap();
        session.set_property(a, "i18n:de-body", json!("Text")).unwrap();
        session.set_property(a, "i18n:en-title", json!("Title")).unwrap();
        session.set_property(a, "sulu:created", json!("x")).unwrap();

        let german = session.properties(a, "i18n:de-*").unwrap();
        assert_eq!(german.len(), 2);
        assert!(german.contains_key("i18n:de-title"));

        let mixed = session.properties(a, "i18n:en-*|sulu:*").unwrap();
        assert_eq!(mixed.len(), 2);
    }

    #[test]
    fn test_mixins() {
        let session = session_with(&["/a"]);
        let a = session.node_by_path("/a").unwrap();
        session.add_mixin(a, "mix:referenceable").unwrap();
        session.add_mixin(a, "sulu:article").unwrap();
        session.add_mixin(a, "sulu:article").unwrap();
        assert_eq!(
            session.mixins(a).unwrap(),
            vec!["mix:referenceable".to_string(), "sulu:article".to_string()]
        );
    }

    #[test]
    fn test_references_only_strong() {
        let session = session_with(&["/target", "/strong", "/weak"]);
        let target = session.node_by_path("/target").unwrap();
        session.set_property(target, JCR_UUID, json!("target-uuid")).unwrap();

        let strong = session.node_by_path("/strong").unwrap();
        session
            .set_typed_property(strong, "link", json!(["other", "target-uuid"]), PropertyType::Reference)
            .unwrap();
        let weak = session.node_by_path("/weak").unwrap();
        session
            .set_typed_property(weak, "link", json!("target-uuid"), PropertyType::WeakReference)
            .unwrap();

        let references = session.references(target).unwrap();
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].node, strong);
        assert_eq!(references[0].path, "/strong/link");
    }

    // ========================================================================
    // Staging
    // ========================================================================

    #[test]
    fn test_refresh_discards_unsaved_changes() {
        let session = session_with(&["/kept"]);
        session.save().unwrap();
        session.add_node(session.root_node(), "dropped").unwrap();
        assert!(session.has_pending_changes());

        session.refresh(true).unwrap();
        assert!(session.node_exists("/dropped"));

        session.refresh(false).unwrap();
        assert!(!session.node_exists("/dropped"));
        assert!(session.node_exists("/kept"));
        assert!(!session.has_pending_changes());
    }

    #[test]
    fn test_revert_single_node() {
        let session = session_with(&["/a", "/b"]);
        let a = session.node_by_path("/a").unwrap();
        let b = session.node_by_path("/b").unwrap();
        session.set_property(a, "title", json!("saved")).unwrap();
        session.save().unwrap();

        session.set_property(a, "title", json!("changed")).unwrap();
        session.add_node(a, "new-child").unwrap();
        session.set_property(b, "title", json!("also changed")).unwrap();

        session.revert(a).unwrap();

        assert_eq!(session.property(a, "title").unwrap(), Some(json!("saved")));
        assert!(!session.node_exists("/a/new-child"));
        assert_eq!(session.property(b, "title").unwrap(), Some(json!("also changed")));
        assert_eq!(session.child_names(session.root_node()).unwrap(), vec!["a", "b"]);
    }

    // ========================================================================
    // Versioning
    // ========================================================================

    #[test]
    fn test_versioning_requires_mixin() {
        let session = session_with(&["/a"]);
        assert!(matches!(
            session.checkpoint("/a"),
            Err(SessionError::UnsupportedRepositoryOperation(_))
        ));
    }

    #[test]
    fn test_checkin_checkout_and_frozen_state() {
        let session = session_with(&["/a"]);
        let a = session.node_by_path("/a").unwrap();
        session.add_mixin(a, MIX_VERSIONABLE).unwrap();
        session.set_property(a, "title", json!("first")).unwrap();

        assert!(session.is_checked_out("/a").unwrap());
        let first = session.checkin("/a").unwrap();
        assert_eq!(first.name, "1.0");
        assert!(!session.is_checked_out("/a").unwrap());

        session.checkout("/a").unwrap();
        session.set_property(a, "title", json!("second")).unwrap();
        let second = session.checkpoint("/a").unwrap();
        assert_eq!(second.name, "1.1");
        assert!(session.is_checked_out("/a").unwrap());

        let frozen = session.frozen_properties("/a", "1.0").unwrap();
        assert_eq!(frozen.get("title"), Some(&json!("first")));
        assert_eq!(session.version_history("/a").unwrap().len(), 2);

        assert_eq!(
            session.frozen_properties("/a", "9.9"),
            Err(SessionError::VersionNotFound {
                path: "/a".to_string(),
                version: "9.9".to_string()
            })
        );
    }

    // ========================================================================
    // Queries
    // ========================================================================

    fn article_session() -> InMemorySession {
        let session = session_with(&["/cmf/articles/b", "/cmf/articles/a", "/cmf/articles/c", "/other"]);
        for (name, title, rank) in [("a", "Alpha", 3), ("b", "Beta", 1), ("c", "Gamma", 2)] {
            let node = session.node_by_path(&format!("/cmf/articles/{}", name)).unwrap();
            session.add_mixin(node, "sulu:article").unwrap();
            session.set_property(node, "title", json!(title)).unwrap();
            session.set_property(node, "rank", json!(rank)).unwrap();
        }
        session
    }

    #[test]
    fn test_execute_query_filters_by_type_and_orders() {
        let session = article_session();
        let query = QueryObjectModel::new(Selector::new("sulu:article", "a"))
            .with_column(Column::new("a", "title"))
            .with_ordering(Ordering::ascending(DynamicOperand::property("a", "rank")));

        let rows = session.execute_query(&query, &BTreeMap::new(), None, 0).unwrap();
        let titles: Vec<&Value> = rows.iter().map(|row| row.value("title").unwrap()).collect();
        assert_eq!(titles, vec![&json!("Beta"), &json!("Gamma"), &json!("Alpha")]);
    }

    #[test]
    fn test_execute_query_with_bindings_limit_and_offset() {
        let session = article_session();
        let query = QueryObjectModel::new(Selector::new("nt:unstructured", "a"))
            .with_constraint(Constraint::comparison(
                DynamicOperand::property("a", "rank"),
                Operator::GreaterThanOrEqualTo,
                StaticOperand::BindVariable("min".into()),
            ))
            .with_ordering(Ordering::descending(DynamicOperand::property("a", "rank")));

        let mut bindings = BTreeMap::new();
        bindings.insert("min".to_string(), json!(1));
        let rows = session.execute_query(&query, &bindings, Some(1), 1).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].path, "/cmf/articles/c");

        let unbound = session.execute_query(&query, &BTreeMap::new(), None, 0);
        assert!(matches!(unbound, Err(SessionError::InvalidQuery(_))));
    }

    #[test]
    fn test_execute_sql2_statement() {
        let session = article_session();
        let query = session
            .create_query(
                "SELECT * FROM [nt:unstructured] AS n \
                 WHERE ISCHILDNODE(n, '/cmf/articles') AND LOWER(n.title) LIKE '%a' \
                 ORDER BY NAME(n)",
            )
            .unwrap();

        let rows = session.execute_query(&query, &BTreeMap::new(), None, 0).unwrap();
        let paths: Vec<&str> = rows.iter().map(|row| row.path.as_str()).collect();
        assert_eq!(paths, vec!["/cmf/articles/a", "/cmf/articles/b", "/cmf/articles/c"]);

        let descendants = session
            .create_query("SELECT * FROM [nt:unstructured] AS n WHERE ISDESCENDANTNODE(n, '/cmf')")
            .unwrap();
        assert_eq!(
            session.execute_query(&descendants, &BTreeMap::new(), None, 0).unwrap().len(),
            4
        );
    }

    #[test]
    fn test_full_text_search() {
        let session = article_session();
        let query = session
            .create_query("SELECT * FROM [sulu:article] AS n WHERE CONTAINS(n.*, 'GAM')")
            .unwrap();
        let rows = session.execute_query(&query, &BTreeMap::new(), None, 0).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].path, "/cmf/articles/c");
    }
}
