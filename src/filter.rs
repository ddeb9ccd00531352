//! Typed filter value objects, one per entity kind.
//!
//! Filters are immutable, structurally comparable, and hashable; they are
//! the registry's dedup key. `Option` fields represent unset parameters:
//! absence is never conflated with zero or the empty string.

use std::fmt::Debug;
use std::hash::Hash;

use serde::de::DeserializeOwned;

use crate::query::QueryBuilder;
use crate::types::{Character, Comic, Creator, EntityKind, Event, Identified, Series, Story};

/// Per-entity configuration for the generic fetch engine: item type, path,
/// and the fixed-order mapping of filter fields to query parameters.
pub trait CatalogFilter: Clone + Debug + Eq + Hash + Send + Sync + 'static {
    type Item: Identified + Clone + DeserializeOwned + Send + Sync + 'static;

    const KIND: EntityKind;

    /// Path relative to the gateway root. Most kinds use the flat
    /// collection path; comics nest under a character when one is set.
    fn path(&self) -> String {
        Self::KIND.to_string()
    }

    /// Append the non-default filter parameters in this kind's fixed order.
    fn append_params(&self, query: &mut QueryBuilder);
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CharacterFilter {
    pub name: Option<String>,
    pub name_starts_with: Option<String>,
    pub modified_since: Option<String>,
    pub comic_id: Option<u64>,
    pub series_id: Option<u64>,
    pub event_id: Option<u64>,
    pub story_id: Option<u64>,
    pub order_by: Option<String>,
}

impl CatalogFilter for CharacterFilter {
    type Item = Character;

    const KIND: EntityKind = EntityKind::Characters;

    fn append_params(&self, query: &mut QueryBuilder) {
        query.text("name", self.name.as_deref());
        query.text("nameStartsWith", self.name_starts_with.as_deref());
        query.text("modifiedSince", self.modified_since.as_deref());
        query.num("comics", self.comic_id);
        query.num("series", self.series_id);
        query.num("events", self.event_id);
        query.num("stories", self.story_id);
        query.text("orderBy", self.order_by.as_deref());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ComicFilter {
    /// Narrows the path to `characters/{id}/comics` rather than adding a
    /// query parameter.
    pub character_id: Option<u64>,
    pub format: Option<String>,
    pub title: Option<String>,
    pub title_starts_with: Option<String>,
    pub start_year: Option<u64>,
    pub isbn: Option<String>,
    pub creator_id: Option<u64>,
    pub series_id: Option<u64>,
    pub event_id: Option<u64>,
    pub story_id: Option<u64>,
    pub order_by: Option<String>,
}

impl CatalogFilter for ComicFilter {
    type Item = Comic;

    const KIND: EntityKind = EntityKind::Comics;

    fn path(&self) -> String {
        match self.character_id {
            Some(id) => format!("characters/{id}/comics"),
            None => Self::KIND.to_string(),
        }
    }

    fn append_params(&self, query: &mut QueryBuilder) {
        query.text("format", self.format.as_deref());
        query.text("title", self.title.as_deref());
        query.text("titleStartsWith", self.title_starts_with.as_deref());
        query.num("startYear", self.start_year);
        query.text("isbn", self.isbn.as_deref());
        query.num("creators", self.creator_id);
        query.num("series", self.series_id);
        query.num("events", self.event_id);
        query.num("stories", self.story_id);
        query.text("orderBy", self.order_by.as_deref());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CreatorFilter {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub suffix: Option<String>,
    pub name_starts_with: Option<String>,
    pub first_name_starts_with: Option<String>,
    pub middle_name_starts_with: Option<String>,
    pub last_name_starts_with: Option<String>,
    pub modified_since: Option<String>,
    pub comic_id: Option<u64>,
    pub series_id: Option<u64>,
    pub event_id: Option<u64>,
    pub story_id: Option<u64>,
    pub order_by: Option<String>,
}

impl CatalogFilter for CreatorFilter {
    type Item = Creator;

    const KIND: EntityKind = EntityKind::Creators;

    fn append_params(&self, query: &mut QueryBuilder) {
        query.text("firstName", self.first_name.as_deref());
        query.text("middleName", self.middle_name.as_deref());
        query.text("lastName", self.last_name.as_deref());
        query.text("suffix", self.suffix.as_deref());
        query.text("nameStartsWith", self.name_starts_with.as_deref());
        query.text("firstNameStartsWith", self.first_name_starts_with.as_deref());
        query.text(
            "middleNameStartsWith",
            self.middle_name_starts_with.as_deref(),
        );
        query.text("lastNameStartsWith", self.last_name_starts_with.as_deref());
        query.text("modifiedSince", self.modified_since.as_deref());
        query.num("comics", self.comic_id);
        query.num("series", self.series_id);
        query.num("events", self.event_id);
        query.num("stories", self.story_id);
        query.text("orderBy", self.order_by.as_deref());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct EventFilter {
    pub name: Option<String>,
    pub name_starts_with: Option<String>,
    pub modified_since: Option<String>,
    pub creator_id: Option<u64>,
    pub character_id: Option<u64>,
    pub series_id: Option<u64>,
    pub comic_id: Option<u64>,
    pub story_id: Option<u64>,
    pub order_by: Option<String>,
}

impl CatalogFilter for EventFilter {
    type Item = Event;

    const KIND: EntityKind = EntityKind::Events;

    fn append_params(&self, query: &mut QueryBuilder) {
        query.text("name", self.name.as_deref());
        query.text("nameStartsWith", self.name_starts_with.as_deref());
        query.text("modifiedSince", self.modified_since.as_deref());
        query.num("creators", self.creator_id);
        query.num("characters", self.character_id);
        query.num("series", self.series_id);
        query.num("comics", self.comic_id);
        query.num("stories", self.story_id);
        query.text("orderBy", self.order_by.as_deref());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SeriesFilter {
    pub title: Option<String>,
    pub title_starts_with: Option<String>,
    pub start_year: Option<u64>,
    pub modified_since: Option<String>,
    pub comic_id: Option<u64>,
    pub story_id: Option<u64>,
    pub event_id: Option<u64>,
    pub creator_id: Option<u64>,
    pub character_id: Option<u64>,
    pub series_type: Option<String>,
    pub contains: Option<String>,
    pub order_by: Option<String>,
}

impl CatalogFilter for SeriesFilter {
    type Item = Series;

    const KIND: EntityKind = EntityKind::Series;

    fn append_params(&self, query: &mut QueryBuilder) {
        query.text("title", self.title.as_deref());
        query.text("titleStartsWith", self.title_starts_with.as_deref());
        query.num("startYear", self.start_year);
        query.text("modifiedSince", self.modified_since.as_deref());
        query.num("comics", self.comic_id);
        query.num("stories", self.story_id);
        query.num("events", self.event_id);
        query.num("creators", self.creator_id);
        query.num("characters", self.character_id);
        query.text("seriesType", self.series_type.as_deref());
        query.text("contains", self.contains.as_deref());
        query.text("orderBy", self.order_by.as_deref());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StoryFilter {
    pub name: Option<String>,
    pub name_starts_with: Option<String>,
    pub comic_id: Option<u64>,
    pub modified_since: Option<String>,
    pub order_by: Option<String>,
}

impl CatalogFilter for StoryFilter {
    type Item = Story;

    const KIND: EntityKind = EntityKind::Stories;

    fn append_params(&self, query: &mut QueryBuilder) {
        query.text("name", self.name.as_deref());
        query.text("nameStartsWith", self.name_starts_with.as_deref());
        query.num("comics", self.comic_id);
        query.text("modifiedSince", self.modified_since.as_deref());
        query.text("orderBy", self.order_by.as_deref());
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    use pretty_assertions::assert_eq;

    use super::*;

    fn hash_of(filter: &impl Hash) -> u64 {
        let mut hasher = DefaultHasher::new();
        filter.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn equal_filters_hash_identically() {
        let a = ComicFilter {
            character_id: Some(1009368),
            order_by: Some("-modified".to_string()),
            ..Default::default()
        };
        let b = a.clone();

        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn unset_and_zero_are_distinct_filter_values() {
        let unset = CharacterFilter::default();
        let zero = CharacterFilter {
            comic_id: Some(0),
            ..Default::default()
        };

        // Distinct registry keys even though both omit the parameter from
        // the query string.
        assert_ne!(unset, zero);
    }

    #[test]
    fn default_path_is_the_collection_segment() {
        assert_eq!(StoryFilter::default().path(), "stories");
        assert_eq!(ComicFilter::default().path(), "comics");
    }
}
