use crate::error::Result;
use crate::events::{Event, EventDispatcher, EventSubscriber, PersistEvent, PersistStage};
use std::rc::Rc;

/// Files documents below a folder named after their pluralized alias
///
/// The folder is created below the parent node chosen so far, or below the
/// root when none was chosen: an `article` filed below `/cmf` lands in
/// `/cmf/articles`.
#[derive(Debug, Default)]
pub struct AliasFilingSubscriber;

impl AliasFilingSubscriber {
    pub fn new() -> Self {
        Self
    }

    fn handle_persist(event: &mut PersistEvent) -> Result<()> {
        let document = event.document()?.clone();
        if !document.raw()?.uses_alias_filing() {
            return Ok(());
        }
        let context = event.context()?;
        let alias = context
            .metadata_factory()
            .metadata_for_class(document.type_name())?
            .alias()
            .to_string();

        let current_path = if event.has_parent_node() {
            context.session().path(event.parent_node()?)?
        } else {
            String::new()
        };
        let path = format!("{}/{}", current_path.trim_end_matches('/'), pluralize(&alias));

        let parent = context.node_manager().create_path(&path, None)?;
        event.set_parent_node(parent);
        Ok(())
    }
}

impl EventSubscriber for AliasFilingSubscriber {
    fn subscribe(self: Rc<Self>, dispatcher: &EventDispatcher) {
        dispatcher.add_listener::<PersistEvent>(
            PersistStage::AliasFiling,
            "alias_filing.persist",
            Self::handle_persist,
        );
    }
}

/// English plural of a lowercase alias
pub fn pluralize(word: &str) -> String {
    const IRREGULAR: [(&str, &str); 6] = [
        ("person", "people"),
        ("child", "children"),
        ("man", "men"),
        ("woman", "women"),
        ("mouse", "mice"),
        ("news", "news"),
    ];
    if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == word) {
        return plural.to_string();
    }

    let ends_with_consonant_y = word.ends_with('y')
        && !word
            .chars()
            .rev()
            .nth(1)
            .map_or(false, |c| "aeiou".contains(c));

    if ends_with_consonant_y {
        format!("{}ies", &word[..word.len() - 1])
    } else if ["s", "x", "z", "ch", "sh"].iter().any(|suffix| word.ends_with(suffix)) {
        format!("{}es", word)
    } else {
        format!("{}s", word)
    }
}
