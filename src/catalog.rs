//! Catalog data model
//!
//! This module defines the records kept in the local catalog: movies with a
//! single streaming URL and TV shows with nested seasons and episodes. The
//! serialized field names match the persisted blob layout
//! (`tmdbId`, `season_number`, `episode_number`, and `tv` for shows).

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Identifier assigned to a title by the metadata source (TMDB id)
///
/// Older blobs sometimes stored ids as strings. Deserialization accepts
/// either a JSON number or a string of decimal digits, serialization always
/// writes a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExternalId(pub u64);

impl ExternalId {
    /// Returns the raw numeric id
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<u64> for ExternalId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl FromStr for ExternalId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self)
    }
}

impl Serialize for ExternalId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

struct ExternalIdVisitor;

impl<'de> Visitor<'de> for ExternalIdVisitor {
    type Value = ExternalId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer id or a string of digits")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(ExternalId(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        u64::try_from(v)
            .map(ExternalId)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse()
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}

impl<'de> Deserialize<'de> for ExternalId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ExternalIdVisitor)
    }
}

/// Kind of title in the metadata source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// A feature film
    Movie,
    /// A television series
    Tv,
}

impl MediaType {
    /// Path segment used by the metadata API for this media type
    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A movie with its attached streaming URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    #[serde(rename = "tmdbId")]
    pub external_id: ExternalId,
    pub url: String,
}

/// A single episode and its streaming URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub episode_number: u32,
    pub url: String,
}

/// A season of a show
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub season_number: u32,
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

/// A TV show with the seasons that have links attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Show {
    #[serde(rename = "tmdbId")]
    pub external_id: ExternalId,
    #[serde(default)]
    pub seasons: Vec<Season>,
}

impl Show {
    /// Looks up the URL saved for a specific episode
    pub fn episode_url(&self, season_number: u32, episode_number: u32) -> Option<&str> {
        self.seasons
            .iter()
            .find(|s| s.season_number == season_number)?
            .episodes
            .iter()
            .find(|e| e.episode_number == episode_number)
            .map(|e| e.url.as_str())
    }

    /// Total number of episodes across all seasons
    pub fn episode_count(&self) -> usize {
        self.seasons.iter().map(|s| s.episodes.len()).sum()
    }

    /// Merges another record for the same show into this one
    ///
    /// Seasons missing here are appended unchanged. For seasons present in
    /// both, incoming episodes replace episodes with the same number or are
    /// appended. Nothing already stored is ever removed.
    pub fn merge(&mut self, incoming: Show) {
        for season in incoming.seasons {
            match self
                .seasons
                .iter_mut()
                .find(|s| s.season_number == season.season_number)
            {
                Some(existing) => {
                    for episode in season.episodes {
                        match existing
                            .episodes
                            .iter_mut()
                            .find(|e| e.episode_number == episode.episode_number)
                        {
                            Some(slot) => *slot = episode,
                            None => existing.episodes.push(episode),
                        }
                    }
                }
                None => self.seasons.push(season),
            }
        }
    }

    /// Returns the first duplicated season or (season, episode) pair, if any
    pub(crate) fn find_duplicate(&self) -> Option<String> {
        for (i, season) in self.seasons.iter().enumerate() {
            if self.seasons[..i]
                .iter()
                .any(|s| s.season_number == season.season_number)
            {
                return Some(format!("season {}", season.season_number));
            }
            for (j, episode) in season.episodes.iter().enumerate() {
                if season.episodes[..j]
                    .iter()
                    .any(|e| e.episode_number == episode.episode_number)
                {
                    return Some(format!(
                        "S{:02}E{:02}",
                        season.season_number, episode.episode_number
                    ));
                }
            }
        }
        None
    }
}

/// The whole persisted catalog: two independent collections
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub movies: Vec<Movie>,
    #[serde(rename = "tv", alias = "shows")]
    pub shows: Vec<Show>,
}

impl Catalog {
    /// Checks the invariants of both collections
    ///
    /// Ids must be unique per collection, (season, episode) pairs unique per
    /// show, and every stored URL non-blank.
    ///
    /// # Returns
    ///
    /// A description of the first violation found
    pub(crate) fn validate(&self) -> Result<(), String> {
        for (i, movie) in self.movies.iter().enumerate() {
            if movie.url.trim().is_empty() {
                return Err(format!("movie {} has no URL", movie.external_id));
            }
            if self.movies[..i]
                .iter()
                .any(|m| m.external_id == movie.external_id)
            {
                return Err(format!("duplicate movie id {}", movie.external_id));
            }
        }
        for (i, show) in self.shows.iter().enumerate() {
            if self.shows[..i]
                .iter()
                .any(|s| s.external_id == show.external_id)
            {
                return Err(format!("duplicate show id {}", show.external_id));
            }
            if let Some(dup) = show.find_duplicate() {
                return Err(format!("show {} has duplicate {}", show.external_id, dup));
            }
            if let Some((season, episode)) = show.seasons.iter().find_map(|s| {
                s.episodes
                    .iter()
                    .find(|e| e.url.trim().is_empty())
                    .map(|e| (s.season_number, e.episode_number))
            }) {
                return Err(format!(
                    "show {} has no URL for S{:02}E{:02}",
                    show.external_id, season, episode
                ));
            }
        }
        Ok(())
    }
}
