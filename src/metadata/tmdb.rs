/// TMDB metadata provider implementation.
use super::tmdb_types::{TmdbDetails, TmdbGenreList, TmdbItem, TmdbPage, TmdbSeason};
use super::{
    CatalogItem, EpisodeSummary, Genre, ItemDetails, MetadataError, MetadataProvider, Page,
    SeasonDetails, SeasonSummary, TimeWindow, TrendingScope,
};
use crate::catalog::{ExternalId, MediaType};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Base URL of the TMDB v3 API
pub const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";

/// Number of cast members kept in details
const CAST_LIMIT: usize = 10;

/// Metadata provider for the TMDB API.
///
/// Requests authenticate with the `api_key` query parameter.
#[derive(Debug, Clone)]
pub struct TmdbProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl TmdbProvider {
    /// Creates a new TMDB provider using the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self, MetadataError> {
        Self::with_base_url(api_key, TMDB_BASE_URL)
    }

    /// Creates a provider talking to a different API root.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, MetadataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("streamiz/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MetadataError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Performs a GET request and parses the JSON body.
    fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, MetadataError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, "tmdb request");

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .map_err(|e| MetadataError::Request(e.to_string()))?;

        if response.status() == 404 {
            return Err(MetadataError::NotFound(path.to_string()));
        }

        if !response.status().is_success() {
            return Err(MetadataError::Request(format!(
                "HTTP {} {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .json()
            .map_err(|e| MetadataError::Parse(e.to_string()))
    }

    fn get_page(
        &self,
        path: &str,
        params: &[(&str, String)],
        media_type: Option<MediaType>,
    ) -> Result<Page, MetadataError> {
        let raw: TmdbPage = self.get(path, params)?;
        Ok(convert_page(raw, media_type))
    }
}

/// Extracts the year from a `YYYY-MM-DD` date.
fn parse_year(date: Option<&str>) -> Option<i32> {
    date?.split('-').next()?.parse().ok()
}

/// Converts a listing item to a [`CatalogItem`].
///
/// `media_type` is the type implied by the endpoint; mixed listings pass
/// `None` and the item's own `media_type` decides. Items without an id, and
/// entries that are neither movies nor shows, are rejected.
pub(super) fn convert_item(raw: TmdbItem, media_type: Option<MediaType>) -> Option<CatalogItem> {
    let media_type = match (media_type, raw.media_type.as_deref()) {
        (Some(media_type), _) => media_type,
        (None, Some("movie")) => MediaType::Movie,
        (None, Some("tv")) => MediaType::Tv,
        (None, other) => {
            debug!(media_type = ?other, "skipping non-title listing entry");
            return None;
        }
    };

    let Some(id) = raw.id else {
        warn!(title = ?raw.title.as_ref().or(raw.name.as_ref()), "skipping item without id");
        return None;
    };

    let (title, date) = match media_type {
        MediaType::Movie => (raw.title.or(raw.name), raw.release_date.or(raw.first_air_date)),
        MediaType::Tv => (raw.name.or(raw.title), raw.first_air_date.or(raw.release_date)),
    };

    Some(CatalogItem {
        id: ExternalId(id),
        media_type,
        title: title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "Untitled".to_string()),
        overview: raw.overview.filter(|o| !o.trim().is_empty()),
        release_year: parse_year(date.as_deref()),
        poster_path: raw.poster_path,
        backdrop_path: raw.backdrop_path,
        vote_average: raw.vote_average,
        genre_ids: raw.genre_ids,
    })
}

pub(super) fn convert_page(raw: TmdbPage, media_type: Option<MediaType>) -> Page {
    Page {
        page: raw.page,
        total_pages: raw.total_pages,
        items: raw
            .results
            .into_iter()
            .filter_map(|item| convert_item(item, media_type))
            .collect(),
    }
}

pub(super) fn convert_details(
    raw: TmdbDetails,
    media_type: MediaType,
) -> Result<ItemDetails, MetadataError> {
    let item = convert_item(raw.item, Some(media_type))
        .ok_or_else(|| MetadataError::InvalidData("details without an id".to_string()))?;

    let trailer_key = raw.videos.and_then(|videos| {
        videos
            .results
            .into_iter()
            .find(|v| {
                v.site.as_deref() == Some("YouTube") && v.kind.as_deref() == Some("Trailer")
            })
            .map(|v| v.key)
    });

    Ok(ItemDetails {
        item,
        genres: raw
            .genres
            .into_iter()
            .map(|g| Genre {
                id: g.id,
                name: g.name,
            })
            .collect(),
        runtime: raw.runtime.filter(|&r| r > 0),
        seasons: raw
            .seasons
            .into_iter()
            .map(|s| SeasonSummary {
                name: s
                    .name
                    .unwrap_or_else(|| format!("Season {}", s.season_number)),
                season_number: s.season_number,
                episode_count: s.episode_count,
            })
            .collect(),
        cast: raw
            .credits
            .map(|c| c.cast.into_iter().take(CAST_LIMIT).map(|m| m.name).collect())
            .unwrap_or_default(),
        trailer_key,
        similar: raw
            .similar
            .map(|page| convert_page(page, Some(media_type)).items)
            .unwrap_or_default(),
    })
}

pub(super) fn convert_season(raw: TmdbSeason) -> SeasonDetails {
    SeasonDetails {
        name: raw
            .name
            .unwrap_or_else(|| format!("Season {}", raw.season_number)),
        season_number: raw.season_number,
        episodes: raw
            .episodes
            .into_iter()
            .map(|e| EpisodeSummary {
                name: e
                    .name
                    .unwrap_or_else(|| format!("Episode {}", e.episode_number)),
                episode_number: e.episode_number,
                overview: e.overview.filter(|o| !o.trim().is_empty()),
                air_date: e.air_date.filter(|d| !d.is_empty()),
            })
            .collect(),
    }
}

impl MetadataProvider for TmdbProvider {
    fn search(&self, query: &str, media_type: MediaType, page: u32) -> Result<Page, MetadataError> {
        self.get_page(
            &format!("search/{}", media_type),
            &[("query", query.to_string()), ("page", page.to_string())],
            Some(media_type),
        )
    }

    fn details(&self, id: ExternalId, media_type: MediaType) -> Result<ItemDetails, MetadataError> {
        let raw: TmdbDetails = self.get(
            &format!("{}/{}", media_type, id),
            &[("append_to_response", "credits,videos,similar".to_string())],
        )?;
        convert_details(raw, media_type)
    }

    fn trending(&self, scope: TrendingScope, window: TimeWindow) -> Result<Page, MetadataError> {
        let media_type = match scope {
            TrendingScope::All => None,
            TrendingScope::Only(media_type) => Some(media_type),
        };
        self.get_page(
            &format!("trending/{}/{}", scope.as_str(), window),
            &[],
            media_type,
        )
    }

    fn popular(&self, media_type: MediaType, page: u32) -> Result<Page, MetadataError> {
        self.get_page(
            &format!("{}/popular", media_type),
            &[("page", page.to_string())],
            Some(media_type),
        )
    }

    fn top_rated(&self, media_type: MediaType, page: u32) -> Result<Page, MetadataError> {
        self.get_page(
            &format!("{}/top_rated", media_type),
            &[("page", page.to_string())],
            Some(media_type),
        )
    }

    fn season_details(
        &self,
        show_id: ExternalId,
        season_number: u32,
    ) -> Result<SeasonDetails, MetadataError> {
        let raw: TmdbSeason = self.get(&format!("tv/{}/season/{}", show_id, season_number), &[])?;
        Ok(convert_season(raw))
    }

    fn genres(&self, media_type: MediaType) -> Result<Vec<Genre>, MetadataError> {
        let raw: TmdbGenreList = self.get(&format!("genre/{}/list", media_type), &[])?;
        Ok(raw
            .genres
            .into_iter()
            .map(|g| Genre {
                id: g.id,
                name: g.name,
            })
            .collect())
    }

    fn discover_by_genre(
        &self,
        genre_id: u32,
        media_type: MediaType,
        page: u32,
    ) -> Result<Page, MetadataError> {
        self.get_page(
            &format!("discover/{}", media_type),
            &[("with_genres", genre_id.to_string()), ("page", page.to_string())],
            Some(media_type),
        )
    }
}
