//! Entity models decoded from the catalog wire format.
//!
//! Items are immutable snapshots; they are never mutated in place, only
//! replaced by newer fetches of the same logical entity. Identity is the
//! stable numeric `id` carried by every kind.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// The six entity collections exposed by the gateway.
///
/// The `Display` form is the collection's path segment below the gateway
/// root.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    #[display("characters")]
    Characters,
    #[display("comics")]
    Comics,
    #[display("creators")]
    Creators,
    #[display("events")]
    Events,
    #[display("series")]
    Series,
    #[display("stories")]
    Stories,
}

/// Stable numeric identity used to deduplicate items across page windows.
pub trait Identified {
    fn id(&self) -> u64;
}

/// A representative image reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    /// Directory path of the image.
    pub path: String,
    /// File extension, without the dot.
    #[serde(rename = "extension")]
    pub ext: String,
}

impl Image {
    /// Full image URL, upgraded to https (the gateway hands out http).
    pub fn url(&self) -> String {
        format!("{}.{}", secure(&self.path), self.ext)
    }
}

/// A public web site URL attached to a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlRef {
    /// Text identifier for the URL, e.g. `detail` or `wiki`.
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

impl UrlRef {
    pub fn secure_url(&self) -> String {
        secure(&self.url)
    }
}

/// Summary representation of a related resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRef {
    #[serde(rename = "resourceURI")]
    pub resource_uri: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub modified: String,
    #[serde(default)]
    pub urls: Vec<UrlRef>,
    pub thumbnail: Image,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comic {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub modified: String,
    /// Generally only populated for collection formats.
    #[serde(default)]
    pub isbn: String,
    /// Publication format, e.g. comic, hardcover, trade paperback.
    pub format: String,
    pub page_count: u32,
    #[serde(default)]
    pub urls: Vec<UrlRef>,
    pub thumbnail: Image,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creator {
    pub id: u64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub middle_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub suffix: String,
    pub full_name: String,
    pub modified: String,
    #[serde(default)]
    pub urls: Vec<UrlRef>,
    pub thumbnail: Image,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub urls: Vec<UrlRef>,
    pub modified: String,
    /// Publication date of the first issue in this event.
    pub start: Option<String>,
    /// Publication date of the last issue in this event.
    pub end: Option<String>,
    pub thumbnail: Image,
    pub next: Option<SummaryRef>,
    pub previous: Option<SummaryRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub urls: Vec<UrlRef>,
    pub start_year: i32,
    /// Conventionally 2099 for ongoing series.
    pub end_year: i32,
    pub rating: String,
    pub modified: String,
    pub thumbnail: Image,
    pub next: Option<SummaryRef>,
    pub previous: Option<SummaryRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Story type, e.g. interior story, cover, text story.
    #[serde(rename = "type")]
    pub kind: String,
    pub modified: String,
    /// Stories frequently ship without a representative image.
    pub thumbnail: Option<Image>,
    #[serde(rename = "originalissue")]
    pub original_issue: Option<SummaryRef>,
}

macro_rules! identified {
    ($($entity:ty),* $(,)?) => {
        $(impl Identified for $entity {
            fn id(&self) -> u64 {
                self.id
            }
        })*
    };
}

identified!(Character, Comic, Creator, Event, Series, Story);

fn secure(raw: &str) -> String {
    match raw.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn entity_kind_displays_path_segment() {
        assert_eq!(EntityKind::Characters.to_string(), "characters");
        assert_eq!(EntityKind::Series.to_string(), "series");
    }

    #[test]
    fn image_url_is_upgraded_to_https() {
        let image = Image {
            path: "http://i.annihil.us/u/prod/marvel/i/mg/c/e0/portrait".to_string(),
            ext: "jpg".to_string(),
        };
        assert_eq!(
            image.url(),
            "https://i.annihil.us/u/prod/marvel/i/mg/c/e0/portrait.jpg"
        );
    }

    #[test]
    fn already_secure_urls_are_untouched() {
        let url = UrlRef {
            kind: "detail".to_string(),
            url: "https://www.marvel.com/comics/issue/1".to_string(),
        };
        assert_eq!(url.secure_url(), "https://www.marvel.com/comics/issue/1");
    }

    #[test]
    fn character_decodes_from_wire_shape() {
        let body = serde_json::json!({
            "id": 1009368,
            "name": "Iron Man",
            "description": "Wounded, captured and forced to build a weapon",
            "modified": "2016-09-28T12:08:19-0400",
            "urls": [{"type": "detail", "url": "http://marvel.com/characters/29"}],
            "thumbnail": {"path": "http://i.annihil.us/9/c0/iron", "extension": "jpg"},
            "resourceURI": "http://gateway.marvel.com/v1/public/characters/1009368"
        });

        let character: Character = serde_json::from_value(body).unwrap();
        assert_eq!(character.id, 1009368);
        assert_eq!(character.urls[0].kind, "detail");
    }

    #[test]
    fn story_tolerates_missing_thumbnail() {
        let body = serde_json::json!({
            "id": 12345,
            "title": "Cover #12345",
            "description": "",
            "type": "cover",
            "modified": "1969-12-31T19:00:00-0500",
            "thumbnail": null,
            "originalissue": {"resourceURI": "http://gateway/comics/1", "name": "Issue 1"}
        });

        let story: Story = serde_json::from_value(body).unwrap();
        assert!(story.thumbnail.is_none());
        assert_eq!(story.kind, "cover");
    }
}
