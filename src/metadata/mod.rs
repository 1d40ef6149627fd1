/// Data structures and traits for movie and TV metadata retrieval.
///
/// This module provides the typed records the rest of the crate works with
/// (catalog items, details, seasons, genres) and the [`MetadataProvider`]
/// trait implemented by the TMDB client and its caching wrapper.
mod cached;
mod tmdb;
mod tmdb_types;

pub use cached::CachedMetadataProvider;
pub(crate) use cached::details_cache_key;
pub use tmdb::TmdbProvider;

use crate::catalog::{ExternalId, MediaType};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during metadata retrieval operations.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Request to the metadata provider failed
    #[error("Request failed: {0}")]
    Request(String),

    /// Failed to parse the provider's JSON response
    #[error("Failed to parse API response: {0}")]
    Parse(String),

    /// The requested title was not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The API returned invalid or unexpected data
    #[error("API returned invalid data: {0}")]
    InvalidData(String),
}

/// A movie or show as listed by search and browse endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ExternalId,
    pub media_type: MediaType,
    /// Display title (`"Untitled"` when the source has none)
    pub title: String,
    pub overview: Option<String>,
    /// Year of release or first air date
    pub release_year: Option<i32>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub vote_average: Option<f64>,
    pub genre_ids: Vec<u32>,
}

/// A genre as defined by the metadata source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

/// Short description of a season in a show's details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonSummary {
    pub season_number: u32,
    pub name: String,
    pub episode_count: u32,
}

/// Full record for a single title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDetails {
    pub item: CatalogItem,
    pub genres: Vec<Genre>,
    /// Runtime in minutes (movies only)
    pub runtime: Option<u32>,
    /// Seasons of a show, empty for movies
    pub seasons: Vec<SeasonSummary>,
    /// Top-billed cast names
    pub cast: Vec<String>,
    /// YouTube key of the first trailer, if any
    pub trailer_key: Option<String>,
    pub similar: Vec<CatalogItem>,
}

/// An episode in a season listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub episode_number: u32,
    pub name: String,
    pub overview: Option<String>,
    pub air_date: Option<String>,
}

/// Episode listing of one season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonDetails {
    pub season_number: u32,
    pub name: String,
    pub episodes: Vec<EpisodeSummary>,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub page: u32,
    pub total_pages: u32,
    pub items: Vec<CatalogItem>,
}

impl Page {
    /// An empty page, used when a listing could not be loaded
    pub fn empty() -> Self {
        Self {
            page: 1,
            total_pages: 0,
            items: Vec::new(),
        }
    }
}

/// Which titles a trending listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendingScope {
    /// Movies and shows mixed
    All,
    Only(MediaType),
}

impl TrendingScope {
    fn as_str(self) -> &'static str {
        match self {
            TrendingScope::All => "all",
            TrendingScope::Only(media_type) => media_type.as_str(),
        }
    }
}

/// Time window of a trending listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeWindow {
    Day,
    #[default]
    Week,
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
        })
    }
}

/// Trait for metadata providers that can fetch movie and TV information.
///
/// Implementors map whatever the source returns into the typed records of
/// this module; absent fields are defaulted or the item is rejected at that
/// boundary, never later.
pub trait MetadataProvider {
    /// Searches titles of one media type.
    fn search(&self, query: &str, media_type: MediaType, page: u32) -> Result<Page, MetadataError>;

    /// Fetches the full record of a title, including credits, videos and
    /// similar titles.
    fn details(&self, id: ExternalId, media_type: MediaType) -> Result<ItemDetails, MetadataError>;

    /// Lists trending titles.
    fn trending(&self, scope: TrendingScope, window: TimeWindow) -> Result<Page, MetadataError>;

    /// Lists popular titles.
    fn popular(&self, media_type: MediaType, page: u32) -> Result<Page, MetadataError>;

    /// Lists top rated titles.
    fn top_rated(&self, media_type: MediaType, page: u32) -> Result<Page, MetadataError>;

    /// Lists the episodes of one season of a show.
    fn season_details(
        &self,
        show_id: ExternalId,
        season_number: u32,
    ) -> Result<SeasonDetails, MetadataError>;

    /// Lists the genres defined for a media type.
    fn genres(&self, media_type: MediaType) -> Result<Vec<Genre>, MetadataError>;

    /// Lists titles of a genre.
    fn discover_by_genre(
        &self,
        genre_id: u32,
        media_type: MediaType,
        page: u32,
    ) -> Result<Page, MetadataError>;
}

impl<P: MetadataProvider + ?Sized> MetadataProvider for Box<P> {
    fn search(&self, query: &str, media_type: MediaType, page: u32) -> Result<Page, MetadataError> {
        (**self).search(query, media_type, page)
    }

    fn details(&self, id: ExternalId, media_type: MediaType) -> Result<ItemDetails, MetadataError> {
        (**self).details(id, media_type)
    }

    fn trending(&self, scope: TrendingScope, window: TimeWindow) -> Result<Page, MetadataError> {
        (**self).trending(scope, window)
    }

    fn popular(&self, media_type: MediaType, page: u32) -> Result<Page, MetadataError> {
        (**self).popular(media_type, page)
    }

    fn top_rated(&self, media_type: MediaType, page: u32) -> Result<Page, MetadataError> {
        (**self).top_rated(media_type, page)
    }

    fn season_details(
        &self,
        show_id: ExternalId,
        season_number: u32,
    ) -> Result<SeasonDetails, MetadataError> {
        (**self).season_details(show_id, season_number)
    }

    fn genres(&self, media_type: MediaType) -> Result<Vec<Genre>, MetadataError> {
        (**self).genres(media_type)
    }

    fn discover_by_genre(
        &self,
        genre_id: u32,
        media_type: MediaType,
        page: u32,
    ) -> Result<Page, MetadataError> {
        (**self).discover_by_genre(genre_id, media_type, page)
    }
}
