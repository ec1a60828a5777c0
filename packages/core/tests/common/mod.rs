//! Shared fixtures for document manager integration tests
//!
//! Two document types:
//!
//! - `Article` (`app:article`): filed below the base path, auto-named after
//!   its title, with every mapping behavior
//! - `Folder` (`app:folder`): placed with explicit paths, with identity,
//!   parent and children behaviors only
//! - `Note` (`app:note`): filed below a `notes` folder of its parent
//! - `Snippet` (`app:snippet`): always filed below the base path, whatever
//!   its parent

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use docmapper_core::config::DocumentManagerConfig;
use docmapper_core::document::{
    AutoNameBehavior, BlameBehavior, ChildrenBehavior, Document, DocumentRef, LocaleBehavior,
    NodeNameBehavior, ParentBehavior, PathBehavior, ReferrerBehavior, TimestampBehavior,
    UuidBehavior, VersionBehavior,
};
use docmapper_core::document_fields;
use docmapper_core::events::Options;
use docmapper_core::manager::{DocumentManager, DocumentManagerBuilder};
use docmapper_core::metadata::{FieldType, MappingOptions, Metadata, MetadataFactory};
use docmapper_core::models::time::MockTimeProvider;
use docmapper_core::models::Version;
use docmapper_core::property_encoder::Encoding;
use docmapper_core::proxy::{ChildrenCollection, ReferrerCollection};
use docmapper_core::session::InMemorySession;
use serde_json::Value;
use std::rc::Rc;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct Article {
    pub title: Option<String>,
    pub body: Option<String>,
    pub tags: Vec<String>,
    pub published: Option<String>,
    pub related: Option<DocumentRef>,

    pub uuid: Option<String>,
    pub node_name: Option<String>,
    pub path: Option<String>,
    pub parent: Option<DocumentRef>,
    pub children: Option<ChildrenCollection>,
    pub referrers: Option<ReferrerCollection>,
    pub locale: Option<String>,
    pub original_locale: Option<String>,
    pub creator: Option<i64>,
    pub changer: Option<i64>,
    pub created: Option<DateTime<Utc>>,
    pub changed: Option<DateTime<Utc>>,
    pub versions: Vec<Version>,
}

impl Document for Article {
    document_fields!(values: [title, body, tags, published], references: [related]);

    fn uuid_behavior(&mut self) -> Option<&mut dyn UuidBehavior> {
        Some(self)
    }

    fn node_name_behavior(&mut self) -> Option<&mut dyn NodeNameBehavior> {
        Some(self)
    }

    fn path_behavior(&mut self) -> Option<&mut dyn PathBehavior> {
        Some(self)
    }

    fn parent_behavior(&mut self) -> Option<&mut dyn ParentBehavior> {
        Some(self)
    }

    fn children_behavior(&mut self) -> Option<&mut dyn ChildrenBehavior> {
        Some(self)
    }

    fn referrer_behavior(&mut self) -> Option<&mut dyn ReferrerBehavior> {
        Some(self)
    }

    fn locale_behavior(&mut self) -> Option<&mut dyn LocaleBehavior> {
        Some(self)
    }

    fn auto_name_behavior(&mut self) -> Option<&mut dyn AutoNameBehavior> {
        Some(self)
    }

    fn blame_behavior(&mut self) -> Option<&mut dyn BlameBehavior> {
        Some(self)
    }

    fn timestamp_behavior(&mut self) -> Option<&mut dyn TimestampBehavior> {
        Some(self)
    }

    fn version_behavior(&mut self) -> Option<&mut dyn VersionBehavior> {
        Some(self)
    }

    fn uses_base_path(&self) -> bool {
        true
    }
}

impl UuidBehavior for Article {
    fn uuid(&self) -> Option<&str> {
        self.uuid.as_deref()
    }
    fn set_uuid(&mut self, uuid: String) {
        self.uuid = Some(uuid);
    }
}

impl NodeNameBehavior for Article {
    fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }
    fn set_node_name(&mut self, name: String) {
        self.node_name = Some(name);
    }
}

impl PathBehavior for Article {
    fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
    fn set_path(&mut self, path: String) {
        self.path = Some(path);
    }
}

impl ParentBehavior for Article {
    fn parent(&self) -> Option<&DocumentRef> {
        self.parent.as_ref()
    }
    fn set_parent(&mut self, parent: Option<DocumentRef>) {
        self.parent = parent;
    }
}

impl ChildrenBehavior for Article {
    fn children(&self) -> Option<&ChildrenCollection> {
        self.children.as_ref()
    }
    fn set_children(&mut self, children: ChildrenCollection) {
        self.children = Some(children);
    }
}

impl ReferrerBehavior for Article {
    fn referrers(&self) -> Option<&ReferrerCollection> {
        self.referrers.as_ref()
    }
    fn set_referrers(&mut self, referrers: ReferrerCollection) {
        self.referrers = Some(referrers);
    }
}

impl LocaleBehavior for Article {
    fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }
    fn set_locale(&mut self, locale: String) {
        self.locale = Some(locale);
    }
    fn original_locale(&self) -> Option<&str> {
        self.original_locale.as_deref()
    }
    fn set_original_locale(&mut self, locale: String) {
        self.original_locale = Some(locale);
    }
}

impl AutoNameBehavior for Article {
    fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }
}

impl BlameBehavior for Article {
    fn creator(&self) -> Option<i64> {
        self.creator
    }
    fn set_creator(&mut self, creator: Option<i64>) {
        self.creator = creator;
    }
    fn changer(&self) -> Option<i64> {
        self.changer
    }
    fn set_changer(&mut self, changer: Option<i64>) {
        self.changer = changer;
    }
}

impl TimestampBehavior for Article {
    fn created(&self) -> Option<DateTime<Utc>> {
        self.created
    }
    fn set_created(&mut self, created: Option<DateTime<Utc>>) {
        self.created = created;
    }
    fn changed(&self) -> Option<DateTime<Utc>> {
        self.changed
    }
    fn set_changed(&mut self, changed: Option<DateTime<Utc>>) {
        self.changed = changed;
    }
}

impl VersionBehavior for Article {
    fn versions(&self) -> &[Version] {
        &self.versions
    }
    fn set_versions(&mut self, versions: Vec<Version>) {
        self.versions = versions;
    }
}

#[derive(Debug, Default)]
pub struct Folder {
    pub title: Option<String>,
    pub uuid: Option<String>,
    pub path: Option<String>,
    pub parent: Option<DocumentRef>,
    pub children: Option<ChildrenCollection>,
}

impl Document for Folder {
    document_fields!(title);

    fn uuid_behavior(&mut self) -> Option<&mut dyn UuidBehavior> {
        Some(self)
    }

    fn path_behavior(&mut self) -> Option<&mut dyn PathBehavior> {
        Some(self)
    }

    fn parent_behavior(&mut self) -> Option<&mut dyn ParentBehavior> {
        Some(self)
    }

    fn children_behavior(&mut self) -> Option<&mut dyn ChildrenBehavior> {
        Some(self)
    }
}

impl UuidBehavior for Folder {
    fn uuid(&self) -> Option<&str> {
        self.uuid.as_deref()
    }
    fn set_uuid(&mut self, uuid: String) {
        self.uuid = Some(uuid);
    }
}

impl PathBehavior for Folder {
    fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
    fn set_path(&mut self, path: String) {
        self.path = Some(path);
    }
}

impl ParentBehavior for Folder {
    fn parent(&self) -> Option<&DocumentRef> {
        self.parent.as_ref()
    }
    fn set_parent(&mut self, parent: Option<DocumentRef>) {
        self.parent = parent;
    }
}

impl ChildrenBehavior for Folder {
    fn children(&self) -> Option<&ChildrenCollection> {
        self.children.as_ref()
    }
    fn set_children(&mut self, children: ChildrenCollection) {
        self.children = Some(children);
    }
}

/// Auto-named document with a parent, differing only in its filing marker
macro_rules! filed_document {
    ($name:ident, $marker:ident) => {
        #[derive(Debug, Default)]
        pub struct $name {
            pub title: Option<String>,
            pub path: Option<String>,
            pub parent: Option<DocumentRef>,
        }

        impl Document for $name {
            document_fields!(title);

            fn path_behavior(&mut self) -> Option<&mut dyn PathBehavior> {
                Some(self)
            }

            fn parent_behavior(&mut self) -> Option<&mut dyn ParentBehavior> {
                Some(self)
            }

            fn auto_name_behavior(&mut self) -> Option<&mut dyn AutoNameBehavior> {
                Some(self)
            }

            fn $marker(&self) -> bool {
                true
            }
        }

        impl PathBehavior for $name {
            fn path(&self) -> Option<&str> {
                self.path.as_deref()
            }
            fn set_path(&mut self, path: String) {
                self.path = Some(path);
            }
        }

        impl ParentBehavior for $name {
            fn parent(&self) -> Option<&DocumentRef> {
                self.parent.as_ref()
            }
            fn set_parent(&mut self, parent: Option<DocumentRef>) {
                self.parent = parent;
            }
        }

        impl AutoNameBehavior for $name {
            fn title(&self) -> Option<&str> {
                self.title.as_deref()
            }
        }
    };
}

filed_document!(Note, uses_alias_filing);
filed_document!(Snippet, uses_reset_filing_path);

pub fn metadata_factory() -> anyhow::Result<MetadataFactory> {
    let article = Metadata::for_document::<Article>("article", "app:article")
        .with_field("title", MappingOptions::new().encoding(Encoding::ContentLocalized))
        .with_field("body", MappingOptions::new().encoding(Encoding::ContentLocalized))
        .with_field("tags", MappingOptions::new().multiple(true))
        .with_field("published", MappingOptions::new().field_type(FieldType::Date))
        .with_field("related", MappingOptions::new().field_type(FieldType::Reference));
    let folder = Metadata::for_document::<Folder>("folder", "app:folder")
        .with_field("title", MappingOptions::new());
    let note = Metadata::for_document::<Note>("note", "app:note")
        .with_field("title", MappingOptions::new());
    let snippet = Metadata::for_document::<Snippet>("snippet", "app:snippet")
        .with_field("title", MappingOptions::new());

    Ok(MetadataFactory::from_metadata([article, folder, note, snippet])?)
}

/// Fixed start time of the mock clock
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap()
}

/// A manager with its session and clock
pub struct TestManager {
    pub manager: DocumentManager,
    pub session: Rc<InMemorySession>,
    pub clock: Arc<MockTimeProvider>,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Builder over a fresh session and the mock clock, for custom listeners
pub fn builder(name: &str) -> anyhow::Result<(DocumentManagerBuilder, Rc<InMemorySession>, Arc<MockTimeProvider>)> {
    init_tracing();
    let session = Rc::new(InMemorySession::new());
    let clock = Arc::new(MockTimeProvider::with_time(start_time()));
    let builder = DocumentManager::builder(
        DocumentManagerConfig::default().with_name(name),
        session.clone(),
        Arc::new(metadata_factory()?),
    )
    .time_provider(clock.clone());
    Ok((builder, session, clock))
}

pub fn test_manager() -> anyhow::Result<TestManager> {
    let (builder, session, clock) = builder("default")?;
    Ok(TestManager {
        manager: builder.build()?,
        session,
        clock,
    })
}

pub fn options(entries: &[(&str, Value)]) -> Options {
    entries
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

/// Create and persist an article in the default locale
pub fn persist_article(manager: &DocumentManager, title: &str) -> anyhow::Result<DocumentRef> {
    persist_article_with(manager, title, Options::new())
}

pub fn persist_article_with(
    manager: &DocumentManager,
    title: &str,
    options: Options,
) -> anyhow::Result<DocumentRef> {
    let article = manager.create("article")?;
    article.write(|a: &mut Article| a.title = Some(title.to_string()))?;
    manager.persist(&article, None, options)?;
    Ok(article)
}

/// Create and persist a folder at `path`
pub fn persist_folder(manager: &DocumentManager, path: &str) -> anyhow::Result<DocumentRef> {
    let folder = manager.create("folder")?;
    folder.write(|f: &mut Folder| f.title = Some(path.to_string()))?;
    manager.persist(&folder, None, options(&[("path", Value::String(path.to_string()))]))?;
    Ok(folder)
}

pub fn title_of(document: &DocumentRef) -> anyhow::Result<Option<String>> {
    Ok(document.read(|a: &Article| a.title.clone())?)
}

pub fn path_of(document: &DocumentRef) -> anyhow::Result<Option<String>> {
    if document.is::<Folder>() {
        return Ok(document.read(|f: &Folder| f.path.clone())?);
    }
    if document.is::<Note>() {
        return Ok(document.read(|n: &Note| n.path.clone())?);
    }
    if document.is::<Snippet>() {
        return Ok(document.read(|s: &Snippet| s.path.clone())?);
    }
    Ok(document.read(|a: &Article| a.path.clone())?)
}
