//! Document Manager Integration Tests
//!
//! Drives the default pipeline through the façade against an in-memory
//! session:
//! - identity map: one document per node, reused across finds and locales
//! - persist/find round trips, filing and auto naming
//! - option validation, error naming
//! - move, copy, reorder, refresh, clear, remove

mod common;

#[cfg(test)]
mod document_manager_tests {
    use super::common::*;
    use anyhow::Result;
    use chrono::Duration;
    use docmapper_core::error::DocumentManagerError;
    use docmapper_core::events::{
        FindEvent, FlushEvent, FlushStage, HydrateEvent, HydrateStage, Options, Stage,
    };
    use docmapper_core::session::Session;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    // ========================================================================
    // Identity
    // ========================================================================

    #[test]
    fn test_find_returns_the_persisted_instance() -> Result<()> {
        let t = test_manager()?;
        let article = persist_article(&t.manager, "Hello World")?;

        assert_eq!(path_of(&article)?.as_deref(), Some("/cmf/hello-world"));
        let uuid = article
            .read(|a: &Article| a.uuid.clone())?
            .expect("uuid is mapped on persist");

        let by_path = t.manager.find("/cmf/hello-world", None, Options::new())?;
        let by_uuid = t.manager.find(&uuid, None, Options::new())?;

        assert!(by_path.ptr_eq(&article));
        assert!(by_uuid.ptr_eq(&article));
        Ok(())
    }

    #[test]
    fn test_hydration_short_circuits_per_locale() -> Result<()> {
        let hydrations = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hydrations);
        let (builder, _session, _clock) = builder("default")?;
        let manager = builder
            .with_subscribers(move |dispatcher| {
                dispatcher.add_listener::<HydrateEvent>(
                    HydrateStage::Mapping,
                    "test.count",
                    move |_| {
                        counter.set(counter.get() + 1);
                        Ok(())
                    },
                );
            })
            .build()?;

        persist_article(&manager, "Counted")?;
        manager.flush()?;
        manager.clear()?;

        let first = manager.find("/cmf/counted", None, Options::new())?;
        assert_eq!(hydrations.get(), 1);

        let again = manager.find("/cmf/counted", None, Options::new())?;
        assert!(again.ptr_eq(&first));
        assert_eq!(hydrations.get(), 1);

        // same instance, remapped in the other locale
        let german = manager.find("/cmf/counted", Some("de"), Options::new())?;
        assert!(german.ptr_eq(&first));
        assert_eq!(hydrations.get(), 2);
        assert_eq!(title_of(&german)?, None);
        assert_eq!(
            german.read(|a: &Article| a.locale.clone())?.as_deref(),
            Some("de")
        );

        manager.find("/cmf/counted", Some("de"), Options::new())?;
        assert_eq!(hydrations.get(), 2);

        let forced = options(&[("rehydrate", json!(true))]);
        manager.find("/cmf/counted", Some("de"), forced)?;
        assert_eq!(hydrations.get(), 3);

        manager.find("/cmf/counted", None, Options::new())?;
        assert_eq!(hydrations.get(), 4);
        assert_eq!(title_of(&first)?.as_deref(), Some("Counted"));
        Ok(())
    }

    // ========================================================================
    // Persist and find
    // ========================================================================

    #[test]
    fn test_persisted_fields_round_trip() -> Result<()> {
        let t = test_manager()?;
        let article = t.manager.create("article")?;
        article.write(|a: &mut Article| {
            a.title = Some("Round Trip".to_string());
            a.body = Some("Body text".to_string());
            a.tags = vec!["rust".to_string(), "docs".to_string()];
            a.published = Some("2026-02-01T10:00:00Z".to_string());
        })?;
        t.manager
            .persist(&article, None, options(&[("user", json!(7))]))?;
        t.manager.flush()?;
        t.manager.clear()?;

        let found = t.manager.find("/cmf/round-trip", None, Options::new())?;
        assert!(!found.ptr_eq(&article));

        found.read(|a: &Article| {
            assert_eq!(a.title.as_deref(), Some("Round Trip"));
            assert_eq!(a.body.as_deref(), Some("Body text"));
            assert_eq!(a.tags, vec!["rust", "docs"]);
            assert_eq!(a.published.as_deref(), Some("2026-02-01T10:00:00Z"));
            assert!(a.related.is_none());
            assert_eq!(a.node_name.as_deref(), Some("round-trip"));
            assert_eq!(a.locale.as_deref(), Some("en"));
            assert_eq!(a.original_locale.as_deref(), Some("en"));
            assert_eq!(a.creator, Some(7));
            assert_eq!(a.changer, Some(7));
            assert_eq!(a.created, Some(start_time()));
            assert_eq!(a.changed, Some(start_time()));
            assert!(a.uuid.is_some());
            assert!(a.versions.is_empty());
        })?;
        Ok(())
    }

    #[test]
    fn test_localized_fields_are_stored_per_locale() -> Result<()> {
        let t = test_manager()?;
        let article = persist_article(&t.manager, "Hello")?;
        article.write(|a: &mut Article| a.title = Some("Hallo".to_string()))?;
        t.manager.persist(&article, Some("de"), Options::new())?;
        t.manager.flush()?;
        t.manager.clear()?;

        let english = t.manager.find("/cmf/hello", Some("en"), Options::new())?;
        assert_eq!(title_of(&english)?.as_deref(), Some("Hello"));

        let german = t.manager.find("/cmf/hello", Some("de"), Options::new())?;
        assert_eq!(title_of(&german)?.as_deref(), Some("Hallo"));
        Ok(())
    }

    #[test]
    fn test_changed_timestamp_follows_the_clock() -> Result<()> {
        let t = test_manager()?;
        let article = persist_article(&t.manager, "Clocked")?;

        t.clock.advance(Duration::hours(1));
        t.manager.persist(&article, None, Options::new())?;

        article.read(|a: &Article| {
            assert_eq!(a.created, Some(start_time()));
            assert_eq!(a.changed, Some(start_time() + Duration::hours(1)));
        })?;
        Ok(())
    }

    #[test]
    fn test_invalid_date_is_rejected() -> Result<()> {
        let t = test_manager()?;
        let article = t.manager.create("article")?;
        article.write(|a: &mut Article| {
            a.title = Some("Dated".to_string());
            a.published = Some("yesterday".to_string());
        })?;

        let error = t.manager.persist(&article, None, Options::new()).unwrap_err();
        assert!(matches!(
            error.unnamed(),
            DocumentManagerError::InvalidArgument(_)
        ));
        Ok(())
    }

    #[test]
    fn test_explicit_path_for_folders() -> Result<()> {
        let t = test_manager()?;
        let folder = persist_folder(&t.manager, "/site")?;
        assert_eq!(path_of(&folder)?.as_deref(), Some("/site"));

        // parents must exist unless auto_create is set
        let nested = t.manager.create("folder")?;
        let missing = options(&[("path", json!("/a/b/c"))]);
        let error = t.manager.persist(&nested, None, missing).unwrap_err();
        assert!(matches!(
            error.unnamed(),
            DocumentManagerError::DocumentNotFound { .. }
        ));

        let created = options(&[("path", json!("/a/b/c")), ("auto_create", json!(true))]);
        t.manager.persist(&nested, None, created)?;
        assert_eq!(path_of(&nested)?.as_deref(), Some("/a/b/c"));
        Ok(())
    }

    // ========================================================================
    // Auto naming
    // ========================================================================

    #[test]
    fn test_auto_name_resolves_collisions() -> Result<()> {
        let t = test_manager()?;
        let first = persist_article(&t.manager, "Same Title")?;
        let second = persist_article(&t.manager, "Same Title")?;

        assert_eq!(path_of(&first)?.as_deref(), Some("/cmf/same-title"));
        assert_eq!(path_of(&second)?.as_deref(), Some("/cmf/same-title-1"));

        // the node does not collide with itself
        t.manager.persist(&second, None, Options::new())?;
        assert_eq!(path_of(&second)?.as_deref(), Some("/cmf/same-title-1"));
        Ok(())
    }

    #[test]
    fn test_auto_name_renames_in_default_locale_only() -> Result<()> {
        let t = test_manager()?;
        let article = persist_article(&t.manager, "Old Title")?;

        article.write(|a: &mut Article| a.title = Some("New Title".to_string()))?;
        t.manager.persist(&article, None, Options::new())?;
        assert_eq!(path_of(&article)?.as_deref(), Some("/cmf/new-title"));

        article.write(|a: &mut Article| a.title = Some("Neuer Titel".to_string()))?;
        t.manager.persist(&article, Some("de"), Options::new())?;
        assert_eq!(path_of(&article)?.as_deref(), Some("/cmf/new-title"));

        article.write(|a: &mut Article| a.title = Some("Ignored".to_string()))?;
        t.manager
            .persist(&article, Some("en"), options(&[("auto_name", json!(false))]))?;
        assert_eq!(path_of(&article)?.as_deref(), Some("/cmf/new-title"));
        Ok(())
    }

    #[test]
    fn test_auto_name_requires_a_title() -> Result<()> {
        let t = test_manager()?;
        let untitled = t.manager.create("article")?;

        let error = t.manager.persist(&untitled, None, Options::new()).unwrap_err();
        assert!(matches!(error.unnamed(), DocumentManagerError::General { .. }));
        assert!(error
            .to_string()
            .contains("title is required for auto name behavior"));
        Ok(())
    }

    // ========================================================================
    // Options
    // ========================================================================

    #[test]
    fn test_invalid_options_are_rejected() -> Result<()> {
        let t = test_manager()?;
        let article = t.manager.create("article")?;

        let unknown = t
            .manager
            .persist(&article, None, options(&[("bogus", json!(1))]))
            .unwrap_err();
        assert!(matches!(
            unknown.unnamed(),
            DocumentManagerError::InvalidOptions(_)
        ));

        let mistyped = t
            .manager
            .persist(&article, None, options(&[("user", json!("seven"))]))
            .unwrap_err();
        assert!(matches!(
            mistyped.unnamed(),
            DocumentManagerError::InvalidOptions(_)
        ));

        // persist-only options are unknown to find
        let foreign = t
            .manager
            .find("/cmf", None, options(&[("auto_name", json!(false))]))
            .unwrap_err();
        assert!(matches!(
            foreign.unnamed(),
            DocumentManagerError::InvalidOptions(_)
        ));
        Ok(())
    }

    #[test]
    fn test_rejected_options_never_reach_find() -> Result<()> {
        let finds = Rc::new(Cell::new(0));
        let counter = Rc::clone(&finds);
        let (builder, _session, _clock) = builder("default")?;
        let manager = builder
            .with_subscribers(move |dispatcher| {
                dispatcher.add_listener::<FindEvent>(Stage::Prepare, "test.count", move |_| {
                    counter.set(counter.get() + 1);
                    Ok(())
                });
            })
            .build()?;

        assert!(manager
            .find("/cmf", None, options(&[("bogus", json!(true))]))
            .is_err());
        assert_eq!(finds.get(), 0);

        manager.find("/cmf", None, Options::new()).ok();
        assert_eq!(finds.get(), 1);
        Ok(())
    }

    #[test]
    fn test_find_type_option() -> Result<()> {
        let t = test_manager()?;
        persist_article(&t.manager, "Typed")?;

        let found = t
            .manager
            .find("/cmf/typed", None, options(&[("type", json!("article"))]))?;
        assert!(found.is::<Article>());

        let wrong = t
            .manager
            .find("/cmf/typed", None, options(&[("type", json!("folder"))]))
            .unwrap_err();
        assert!(matches!(
            wrong.unnamed(),
            DocumentManagerError::DocumentNotFound { .. }
        ));

        let unknown = t
            .manager
            .find("/cmf/typed", None, options(&[("type", json!("widget"))]))
            .unwrap_err();
        assert!(matches!(
            unknown.unnamed(),
            DocumentManagerError::InvalidArgument(_)
        ));
        Ok(())
    }

    #[test]
    fn test_locale_option_selects_the_locale() -> Result<()> {
        let t = test_manager()?;
        persist_article(&t.manager, "Localized")?;

        let document = t
            .manager
            .find("/cmf/localized", None, options(&[("locale", json!("fr"))]))?;
        assert_eq!(
            document.read(|a: &Article| a.locale.clone())?.as_deref(),
            Some("fr")
        );

        // the explicit locale wins over the option
        t.manager.find(
            "/cmf/localized",
            Some("de"),
            options(&[("locale", json!("fr"))]),
        )?;
        assert_eq!(
            document.read(|a: &Article| a.locale.clone())?.as_deref(),
            Some("de")
        );
        Ok(())
    }

    // ========================================================================
    // Error naming
    // ========================================================================

    #[test]
    fn test_missing_document_error_is_named() -> Result<()> {
        let t = test_manager()?;
        let error = t
            .manager
            .find("/cmf/missing", None, Options::new())
            .unwrap_err();

        assert_eq!(error.manager_name(), Some("default"));
        assert_eq!(
            error.to_string(),
            "[default] Could not find document with ID or path \"/cmf/missing\""
        );
        Ok(())
    }

    #[test]
    fn test_errors_from_another_manager_are_nested() -> Result<()> {
        let (preview_builder, _, _) = builder("preview")?;
        let preview = Rc::new(preview_builder.build()?);

        let inner = Rc::clone(&preview);
        let (live_builder, _, _) = builder("live")?;
        let live = live_builder
            .with_subscribers(move |dispatcher| {
                dispatcher.add_listener::<FlushEvent>(
                    FlushStage::Save,
                    "test.preview_lookup",
                    move |_| inner.find("/nowhere", None, Options::new()).map(|_| ()),
                );
            })
            .build()?;

        let error = live.flush().unwrap_err();
        assert_eq!(error.to_string(), "[live] Error flushing");

        match error.unnamed() {
            DocumentManagerError::General {
                source: Some(source),
                ..
            } => {
                assert_eq!(source.manager_name(), Some("preview"));
                assert_eq!(
                    source.to_string(),
                    "[preview] Could not find document with ID or path \"/nowhere\""
                );
            }
            other => panic!("expected a general error, got {:?}", other),
        }
        Ok(())
    }

    // ========================================================================
    // Move, copy, reorder
    // ========================================================================

    #[test]
    fn test_move_resolves_name_and_remaps() -> Result<()> {
        let t = test_manager()?;
        let site = persist_folder(&t.manager, "/site")?;
        persist_article_with(&t.manager, "Moved", options(&[("parent_path", json!("/site"))]))?;
        let article = persist_article(&t.manager, "Moved")?;
        t.manager.flush()?;

        t.manager.move_document(&article, "/site")?;

        assert_eq!(path_of(&article)?.as_deref(), Some("/site/moved-1"));
        article.read(|a: &Article| {
            assert_eq!(a.node_name.as_deref(), Some("moved-1"));
            assert!(a.parent.as_ref().expect("parent is mapped").ptr_eq(&site));
        })?;
        Ok(())
    }

    #[test]
    fn test_copy_creates_an_independent_document() -> Result<()> {
        let t = test_manager()?;
        persist_folder(&t.manager, "/site")?;
        let article = persist_article(&t.manager, "Original")?;
        t.manager.flush()?;

        let copied_path = t.manager.copy(&article, "/site")?;
        assert_eq!(copied_path, "/site/original");

        // copying next to the source suffixes the name
        assert_eq!(t.manager.copy(&article, "/cmf")?, "/cmf/original-1");

        let copy = t.manager.find(&copied_path, None, Options::new())?;
        assert!(!copy.ptr_eq(&article));
        assert_eq!(title_of(&copy)?.as_deref(), Some("Original"));
        assert_ne!(
            copy.read(|a: &Article| a.uuid.clone())?,
            article.read(|a: &Article| a.uuid.clone())?
        );
        assert_eq!(path_of(&article)?.as_deref(), Some("/cmf/original"));
        Ok(())
    }

    #[test]
    fn test_reorder_siblings() -> Result<()> {
        let t = test_manager()?;
        persist_folder(&t.manager, "/site")?;
        let below_site = || options(&[("parent_path", json!("/site"))]);
        let alpha = persist_article_with(&t.manager, "Alpha", below_site())?;
        persist_article_with(&t.manager, "Beta", below_site())?;
        let gamma = persist_article_with(&t.manager, "Gamma", below_site())?;
        let site_node = t.session.node_by_path("/site")?;

        t.manager.reorder(&gamma, Some("/site/alpha"), false)?;
        assert_eq!(t.session.child_names(site_node)?, vec!["gamma", "alpha", "beta"]);

        t.manager.reorder(&gamma, Some("/site/beta"), true)?;
        assert_eq!(t.session.child_names(site_node)?, vec!["alpha", "beta", "gamma"]);

        t.manager.reorder(&alpha, None, false)?;
        assert_eq!(t.session.child_names(site_node)?, vec!["beta", "gamma", "alpha"]);
        assert_eq!(path_of(&alpha)?.as_deref(), Some("/site/alpha"));

        let error = t.manager.reorder(&alpha, Some("/site"), false).unwrap_err();
        assert!(matches!(
            error.unnamed(),
            DocumentManagerError::InvalidArgument(_)
        ));
        Ok(())
    }

    // ========================================================================
    // Refresh, clear, remove
    // ========================================================================

    #[test]
    fn test_refresh_discards_unsaved_changes() -> Result<()> {
        let t = test_manager()?;
        let article = persist_article(&t.manager, "Saved")?;
        t.manager.flush()?;

        article.write(|a: &mut Article| a.title = Some("Unsaved".to_string()))?;
        t.manager
            .persist(&article, None, options(&[("auto_name", json!(false))]))?;
        t.manager.refresh(&article)?;

        assert_eq!(title_of(&article)?.as_deref(), Some("Saved"));
        Ok(())
    }

    #[test]
    fn test_clear_forgets_documents_and_unsaved_nodes() -> Result<()> {
        let t = test_manager()?;
        let saved = persist_article(&t.manager, "Saved")?;
        t.manager.flush()?;
        persist_article(&t.manager, "Unsaved")?;

        t.manager.clear()?;

        let found = t.manager.find("/cmf/saved", None, Options::new())?;
        assert!(!found.ptr_eq(&saved));
        assert!(t
            .manager
            .find("/cmf/unsaved", None, Options::new())
            .is_err());
        Ok(())
    }

    #[test]
    fn test_remove_deletes_the_node() -> Result<()> {
        let t = test_manager()?;
        let article = persist_article(&t.manager, "Doomed")?;
        t.manager.flush()?;

        t.manager.remove(&article)?;
        t.manager.flush()?;

        let error = t
            .manager
            .find("/cmf/doomed", None, Options::new())
            .unwrap_err();
        assert!(matches!(
            error.unnamed(),
            DocumentManagerError::DocumentNotFound { .. }
        ));
        assert!(t.manager.context().registry().is_empty());
        Ok(())
    }
}
