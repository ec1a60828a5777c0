//! Versioning Tests
//!
//! Publishing queues checkpoints that are only written on flush; restore
//! brings back the localized properties of a checkpoint.

mod common;

#[cfg(test)]
mod versioning_tests {
    use super::common::*;
    use anyhow::Result;
    use chrono::Duration;
    use docmapper_core::error::DocumentManagerError;
    use docmapper_core::events::{Options, RemoveDraftEvent, Stage, UnpublishEvent};
    use docmapper_core::session::{NodeId, Session, MIX_VERSIONABLE};
    use docmapper_core::subscribers::VERSIONS_PROPERTY;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    // ========================================================================
    // Publish and flush
    // ========================================================================

    #[test]
    fn test_persist_makes_nodes_versionable() -> Result<()> {
        let t = test_manager()?;
        persist_article(&t.manager, "Versionable")?;

        let node = t.session.node_by_path("/cmf/versionable")?;
        assert!(t.session.mixins(node)?.contains(&MIX_VERSIONABLE.to_string()));
        Ok(())
    }

    #[test]
    fn test_checkpoints_are_written_on_flush() -> Result<()> {
        let t = test_manager()?;
        let article = persist_article(&t.manager, "Versioned")?;
        t.manager.flush()?;

        t.manager
            .publish(&article, "en", options(&[("user", json!(3))]))?;
        t.manager
            .publish(&article, "en", options(&[("user", json!(4))]))?;
        assert!(t.session.version_history("/cmf/versioned")?.is_empty());

        t.clock.advance(Duration::minutes(5));
        t.manager.flush()?;

        let history = t.session.version_history("/cmf/versioned")?;
        let names: Vec<&str> = history.iter().map(|info| info.name.as_str()).collect();
        assert_eq!(names, vec!["1.0", "1.1"]);

        let found = t.manager.find(
            "/cmf/versioned",
            None,
            options(&[("rehydrate", json!(true))]),
        )?;
        found.read(|a: &Article| {
            assert_eq!(a.versions.len(), 2);
            assert_eq!(a.versions[0].id, "1.0");
            assert_eq!(a.versions[0].locale, "en");
            assert_eq!(a.versions[0].author, Some(3));
            assert_eq!(a.versions[1].id, "1.1");
            assert_eq!(a.versions[1].author, Some(4));
            let flushed_at = start_time() + Duration::minutes(5);
            assert!(a.versions.iter().all(|v| v.authored == Some(flushed_at)));
        })?;
        Ok(())
    }

    #[test]
    fn test_history_accumulates_across_flushes() -> Result<()> {
        let t = test_manager()?;
        let article = persist_article(&t.manager, "Growing")?;
        t.manager.flush()?;

        t.manager.publish(&article, "en", Options::new())?;
        t.manager.flush()?;
        t.manager.publish(&article, "de", Options::new())?;
        t.manager.flush()?;

        t.manager.clear()?;
        let found = t.manager.find("/cmf/growing", None, Options::new())?;
        let locales = found.read(|a: &Article| {
            a.versions
                .iter()
                .map(|v| v.locale.clone())
                .collect::<Vec<_>>()
        })?;
        assert_eq!(locales, vec!["en", "de"]);

        // a flush without pending work records nothing
        t.manager.flush()?;
        assert_eq!(t.session.version_history("/cmf/growing")?.len(), 2);
        Ok(())
    }

    #[test]
    fn test_locales_published_in_one_flush_each_get_an_entry() -> Result<()> {
        let t = test_manager()?;
        let article = persist_article(&t.manager, "Multilingual")?;
        t.manager.flush()?;

        t.manager.publish(&article, "en", options(&[("user", json!(1))]))?;
        t.manager.publish(&article, "fr", options(&[("user", json!(2))]))?;
        t.manager.flush()?;
        t.manager.publish(&article, "de", options(&[("user", json!(3))]))?;
        t.manager.flush()?;

        let node = t.session.node_by_path("/cmf/multilingual")?;
        let stored = t.session.property(node, VERSIONS_PROPERTY)?;
        assert_eq!(stored.and_then(|v| v.as_array().map(Vec::len)), Some(3));

        t.manager.clear()?;
        let found = t.manager.find("/cmf/multilingual", None, Options::new())?;
        let entries = found.read(|a: &Article| {
            a.versions
                .iter()
                .map(|v| (v.id.clone(), v.locale.clone(), v.author))
                .collect::<Vec<_>>()
        })?;
        assert_eq!(
            entries,
            vec![
                ("1.0".to_string(), "en".to_string(), Some(1)),
                ("1.1".to_string(), "fr".to_string(), Some(2)),
                ("1.2".to_string(), "de".to_string(), Some(3)),
            ]
        );
        Ok(())
    }

    // ========================================================================
    // Structural changes before flush
    // ========================================================================

    #[test]
    fn test_rename_before_flush() -> Result<()> {
        let t = test_manager()?;
        let article = persist_article(&t.manager, "Alpha")?;
        t.manager.publish(&article, "en", Options::new())?;

        article.write(|a: &mut Article| a.title = Some("Beta".to_string()))?;
        t.manager.persist(&article, None, Options::new())?;
        t.manager.flush()?;

        let history = t.session.version_history("/cmf/beta")?;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].name, "1.0");
        Ok(())
    }

    #[test]
    fn test_move_before_flush() -> Result<()> {
        let t = test_manager()?;
        persist_folder(&t.manager, "/other")?;
        let article = persist_article(&t.manager, "Mover")?;
        t.manager.publish(&article, "en", Options::new())?;

        t.manager.move_document(&article, "/other")?;
        t.manager.flush()?;

        assert_eq!(path_of(&article)?.as_deref(), Some("/other/mover"));
        assert_eq!(t.session.version_history("/other/mover")?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_remove_before_flush() -> Result<()> {
        let t = test_manager()?;
        let article = persist_article(&t.manager, "Gone")?;
        t.manager.publish(&article, "en", Options::new())?;

        t.manager.remove(&article)?;
        t.manager.flush()?;
        assert!(!t.session.node_exists("/cmf/gone"));

        // later flushes are unaffected
        let next = persist_article(&t.manager, "Next")?;
        t.manager.publish(&next, "en", Options::new())?;
        t.manager.flush()?;
        assert_eq!(t.session.version_history("/cmf/next")?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_clear_discards_queued_versions() -> Result<()> {
        let t = test_manager()?;
        let article = persist_article(&t.manager, "Discarded")?;
        t.manager.publish(&article, "en", Options::new())?;

        t.manager.clear()?;
        t.manager.flush()?;
        assert!(!t.session.node_exists("/cmf/discarded"));

        let fresh = persist_article(&t.manager, "Fresh")?;
        t.manager.publish(&fresh, "en", Options::new())?;
        t.manager.flush()?;
        let names: Vec<String> = t
            .session
            .version_history("/cmf/fresh")?
            .into_iter()
            .map(|info| info.name)
            .collect();
        assert_eq!(names, vec!["1.0"]);
        Ok(())
    }

    #[test]
    fn test_publish_requires_a_persisted_document() -> Result<()> {
        let t = test_manager()?;
        let article = t.manager.create("article")?;
        assert!(t.manager.publish(&article, "en", Options::new()).is_err());
        Ok(())
    }

    #[test]
    fn test_unpublish_and_remove_draft_resolve_the_node() -> Result<()> {
        let seen: Rc<RefCell<Vec<(&'static str, NodeId, String)>>> = Rc::default();
        let unpublished = Rc::clone(&seen);
        let removed = Rc::clone(&seen);
        let (builder, session, _clock) = builder("default")?;
        let manager = builder
            .with_subscribers(move |dispatcher| {
                dispatcher.add_listener::<UnpublishEvent>(Stage::Handle, "test.unpublish", move |event| {
                    let locale = event.locale().unwrap_or_default().to_string();
                    unpublished.borrow_mut().push(("unpublish", event.node()?, locale));
                    Ok(())
                });
                dispatcher.add_listener::<RemoveDraftEvent>(Stage::Handle, "test.remove_draft", move |event| {
                    let locale = event.locale().unwrap_or_default().to_string();
                    removed.borrow_mut().push(("remove_draft", event.node()?, locale));
                    Ok(())
                });
            })
            .build()?;

        let article = persist_article(&manager, "Draft")?;
        manager.unpublish(&article, "en")?;
        manager.remove_draft(&article, "de")?;

        let node = session.node_by_path("/cmf/draft")?;
        assert_eq!(
            *seen.borrow(),
            vec![
                ("unpublish", node, "en".to_string()),
                ("remove_draft", node, "de".to_string()),
            ]
        );

        // unregistered documents have no node to act on
        let detached = manager.create("article")?;
        assert!(manager.unpublish(&detached, "en").is_err());
        Ok(())
    }

    // ========================================================================
    // Restore
    // ========================================================================

    #[test]
    fn test_restore_brings_back_localized_properties() -> Result<()> {
        let t = test_manager()?;
        let article = persist_article(&t.manager, "First Title")?;
        article.write(|a: &mut Article| a.body = Some("First body".to_string()))?;
        t.manager.persist(&article, None, Options::new())?;
        t.manager.flush()?;
        t.manager.publish(&article, "en", Options::new())?;
        t.manager.flush()?;

        article.write(|a: &mut Article| {
            a.title = Some("Second Title".to_string());
            a.body = None;
        })?;
        t.manager.persist(&article, None, Options::new())?;
        t.manager.flush()?;
        assert_eq!(path_of(&article)?.as_deref(), Some("/cmf/second-title"));

        t.manager.restore(&article, "en", "1.0", Options::new())?;

        article.read(|a: &Article| {
            assert_eq!(a.title.as_deref(), Some("First Title"));
            assert_eq!(a.body.as_deref(), Some("First body"));
        })?;
        // the node keeps its current name
        assert_eq!(path_of(&article)?.as_deref(), Some("/cmf/second-title"));
        Ok(())
    }

    #[test]
    fn test_restore_unknown_version() -> Result<()> {
        let t = test_manager()?;
        let article = persist_article(&t.manager, "Unversioned")?;
        t.manager.flush()?;

        let error = t
            .manager
            .restore(&article, "en", "9.9", Options::new())
            .unwrap_err();
        assert!(matches!(
            error.unnamed(),
            DocumentManagerError::VersionNotFound { .. }
        ));
        assert!(error.to_string().contains("Version \"9.9\""));
        Ok(())
    }
}
