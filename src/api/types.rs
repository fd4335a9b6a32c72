use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

// ============================================================================
// Envelope Types
// ============================================================================

/// Pagination metadata carried by every collection response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Total number of pages. Absent on search responses.
    pub total_pages: Option<u32>,
    /// Number of entities in this response.
    pub count: u32,
    pub previous_page: Option<String>,
    pub next_page: Option<String>,
}

impl PageInfo {
    /// Total page count, treating an absent value as a single page.
    pub fn total_pages_or_default(&self) -> u32 {
        self.total_pages.unwrap_or(1)
    }
}

/// A page of characters plus its pagination metadata.
///
/// The API returns a bare object instead of a one-element array when a
/// query matches exactly one character, so `data` accepts both shapes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageEnvelope {
    pub info: PageInfo,
    #[serde(deserialize_with = "one_or_many")]
    pub data: Vec<Character>,
}

/// Response wrapper for a single-character lookup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DetailEnvelope {
    pub info: PageInfo,
    pub data: Character,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<Character>),
    One(Box<Character>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<Character>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(items) => items,
        OneOrMany::One(item) => vec![*item],
    })
}

// ============================================================================
// Character
// ============================================================================

/// A character as decoded from the API. Never mutated after decoding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    #[serde(rename = "_id")]
    pub id: i64,
    pub name: String,
    pub image_url: Option<String>,
    pub source_url: Option<String>,
    pub films: Vec<String>,
    pub short_films: Vec<String>,
    pub tv_shows: Vec<String>,
    pub video_games: Vec<String>,
    pub park_attractions: Vec<String>,
    pub allies: Vec<String>,
    pub enemies: Vec<String>,
    /// Canonical API URL of this character.
    pub url: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// A named group of appearances or relations, as shown in the detail view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category<'a> {
    pub title: &'static str,
    pub items: &'a [String],
}

/// Label used when a character has no films, shows, shorts or games.
pub const OTHER_CATEGORY: &str = "Other";

impl Character {
    /// True when an image URL is present and non-empty.
    pub fn has_image(&self) -> bool {
        self.image_url.as_deref().is_some_and(|u| !u.is_empty())
    }

    /// Image URL, filtered to non-empty values.
    pub fn image(&self) -> Option<&str> {
        self.image_url.as_deref().filter(|u| !u.is_empty())
    }

    /// Films + short films + TV shows + video games.
    ///
    /// Park attractions, allies and enemies do not count.
    pub fn total_appearances(&self) -> usize {
        self.films.len() + self.short_films.len() + self.tv_shows.len() + self.video_games.len()
    }

    /// First non-empty category in the order Films, TV Shows, Short Films,
    /// Video Games; `"Other"` otherwise.
    pub fn primary_category(&self) -> &'static str {
        [
            ("Films", &self.films),
            ("TV Shows", &self.tv_shows),
            ("Short Films", &self.short_films),
            ("Video Games", &self.video_games),
        ]
        .into_iter()
        .find(|(_, items)| !items.is_empty())
        .map(|(title, _)| title)
        .unwrap_or(OTHER_CATEGORY)
    }

    /// All seven named sequences in display order, empty ones included.
    pub fn categories(&self) -> [Category<'_>; 7] {
        [
            Category {
                title: "Films",
                items: &self.films,
            },
            Category {
                title: "TV Shows",
                items: &self.tv_shows,
            },
            Category {
                title: "Short Films",
                items: &self.short_films,
            },
            Category {
                title: "Video Games",
                items: &self.video_games,
            },
            Category {
                title: "Park Attractions",
                items: &self.park_attractions,
            },
            Category {
                title: "Allies",
                items: &self.allies,
            },
            Category {
                title: "Enemies",
                items: &self.enemies,
            },
        ]
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.created_at.as_deref())
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.updated_at.as_deref())
    }
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            tracing::debug!(value = raw, error = %e, "Ignoring unparseable timestamp");
            None
        }
    }
}
