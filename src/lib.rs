//! Streamiz - browse TMDB and keep a local catalog of streaming links
//!
//! This library provides the local catalog store (movies and shows keyed by
//! their TMDB id), the editor that reconciles flat episode lists into the
//! stored season structure, and a cached client for the TMDB metadata API.

mod cache;
mod catalog;
mod config;
mod editor;
mod links;
mod metadata;
mod store;
mod temp;

pub use cache::CacheError;
pub use catalog::{Catalog, Episode, ExternalId, MediaType, Movie, Season, Show};
pub use config::{Config, DEFAULT_CACHE_TTL, default_cache_dir, default_data_dir};
pub use editor::{
    DisplayOrder, EditorError, EditorSession, EpisodeEntry, OpenEntry, WorkingSet, flatten_show,
    sort_for_display, to_nested_seasons,
};
pub use links::{
    BACKDROP_SIZE, POSTER_SIZE, StreamLink, StreamSource, backdrop_url, image_url,
    movie_embed_url, resolve_episode_stream, resolve_movie_stream, tv_embed_url,
};
pub use metadata::{
    CachedMetadataProvider, CatalogItem, EpisodeSummary, Genre, ItemDetails, MetadataError,
    MetadataProvider, Page, SeasonDetails, SeasonSummary, TimeWindow, TmdbProvider, TrendingScope,
};
pub use store::{
    BackendError, EXPORT_FILE_NAME, FileBackend, LocalStore, MemoryBackend, STORE_KEY,
    StorageBackend, StoreError,
};

use cache::CacheStorage;
use thiserror::Error;
use tracing::{debug, warn};

/// Top-level error type for Streamiz operations
#[derive(Debug, Error)]
pub enum StreamizError {
    /// Error in the catalog store
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Error in the storage backend
    #[error("Storage error: {0}")]
    Backend(#[from] BackendError),

    /// Error while editing an entry
    #[error("{0}")]
    Editor(#[from] EditorError),

    /// Error during metadata retrieval
    #[error("Metadata retrieval error: {0}")]
    Metadata(#[from] MetadataError),

    /// Error during cache operations
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// No TMDB API key was configured
    #[error("No TMDB API key configured (use --api-key or set TMDB_API_KEY)")]
    MissingApiKey,
}

/// Opens the catalog store in the configured data directory
pub fn open_store(config: &Config) -> Result<LocalStore<FileBackend>, StreamizError> {
    let backend = match &config.data_dir {
        Some(dir) => FileBackend::open(dir)?,
        None => FileBackend::open_default()?,
    };
    debug!(dir = %backend.dir().display(), "opening catalog");
    Ok(LocalStore::open(backend)?)
}

/// Builds the metadata provider described by the configuration
///
/// The TMDB client is wrapped in a response cache unless caching is
/// disabled.
pub fn open_metadata_provider(
    config: &Config,
) -> Result<Box<dyn MetadataProvider>, StreamizError> {
    let api_key = config.api_key.clone().ok_or(StreamizError::MissingApiKey)?;
    let tmdb = TmdbProvider::new(api_key)?;

    if !config.use_cache {
        return Ok(Box::new(tmdb));
    }

    let root = config
        .cache_dir
        .as_ref()
        .ok_or(CacheError::CacheDirectoryNotFound)?;
    let cache = CacheStorage::open(root, "tmdb", Some(config.cache_ttl))?;
    debug!(dir = %cache.cache_dir().display(), "metadata cache ready");
    Ok(Box::new(CachedMetadataProvider::new(tmdb, cache)))
}

/// Looks up a title in previously cached details without any network access
///
/// # Arguments
///
/// * `config` - Configuration naming the cache directory and TTL
/// * `id` - External id of the title
/// * `media_type` - Whether `id` names a movie or a show
///
/// # Returns
///
/// The cached title, or `None` when caching is off or the details were never
/// fetched (or have expired)
pub fn cached_title(config: &Config, id: ExternalId, media_type: MediaType) -> Option<String> {
    if !config.use_cache {
        return None;
    }
    let root = config.cache_dir.as_ref()?;
    let cache = match CacheStorage::<ItemDetails>::open(root, "tmdb", Some(config.cache_ttl)) {
        Ok(cache) => cache,
        Err(e) => {
            warn!(error = %e, "metadata cache unavailable");
            return None;
        }
    };
    match cache.load(&metadata::details_cache_key(id, media_type)) {
        Ok(details) => details.map(|d| d.item.title),
        Err(e) => {
            warn!(error = %e, "metadata cache read failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_store_creates_catalog_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default().with_data_dir(Some(dir.path().to_path_buf()));

        let store = open_store(&config).unwrap();
        assert_eq!(store.get_all(), &Catalog::default());
        assert!(dir.path().join("streamiz_db.json").is_file());
    }

    #[test]
    fn test_provider_requires_api_key() {
        let config = Config::default().with_api_key(None);
        assert!(matches!(
            open_metadata_provider(&config),
            Err(StreamizError::MissingApiKey)
        ));
    }

    #[test]
    fn test_provider_uses_configured_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            cache_dir: Some(dir.path().to_path_buf()),
            ..Config::default().with_api_key(Some("key".to_string()))
        };

        assert!(open_metadata_provider(&config).is_ok());
        assert!(dir.path().join("tmdb").is_dir());
    }

    #[test]
    fn test_cached_title_reads_details_cache_only() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            cache_dir: Some(dir.path().to_path_buf()),
            ..Config::default()
        };
        assert_eq!(cached_title(&config, ExternalId(1399), MediaType::Tv), None);

        let details = ItemDetails {
            item: CatalogItem {
                id: ExternalId(1399),
                media_type: MediaType::Tv,
                title: "Game of Thrones".to_string(),
                overview: None,
                release_year: Some(2011),
                poster_path: None,
                backdrop_path: None,
                vote_average: None,
                genre_ids: Vec::new(),
            },
            genres: Vec::new(),
            runtime: None,
            seasons: Vec::new(),
            cast: Vec::new(),
            trailer_key: None,
            similar: Vec::new(),
        };
        CacheStorage::open(dir.path(), "tmdb", None)
            .unwrap()
            .store("tv/1399", &details)
            .unwrap();

        assert_eq!(
            cached_title(&config, ExternalId(1399), MediaType::Tv).as_deref(),
            Some("Game of Thrones")
        );
        assert_eq!(cached_title(&config, ExternalId(1399), MediaType::Movie), None);

        let disabled = Config {
            use_cache: false,
            ..config
        };
        assert_eq!(cached_title(&disabled, ExternalId(1399), MediaType::Tv), None);
    }
}
