//! Cached metadata provider implementation
//!
//! This module provides a caching wrapper for metadata providers that
//! automatically stores and retrieves responses from a local cache.

use super::{
    Genre, ItemDetails, MetadataError, MetadataProvider, Page, SeasonDetails, TimeWindow,
    TrendingScope,
};
use crate::cache::CacheStorage;
use crate::catalog::{ExternalId, MediaType};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// A caching wrapper for metadata providers
///
/// This provider wraps another metadata provider and caches the results
/// to avoid redundant network requests. The cache is persistent across
/// application runs and entries expire after the cache's TTL.
pub struct CachedMetadataProvider<P>
where
    P: MetadataProvider,
{
    /// The underlying metadata provider
    provider: P,
    /// Cache storage for raw response values
    cache: CacheStorage<serde_json::Value>,
}

impl<P> CachedMetadataProvider<P>
where
    P: MetadataProvider,
{
    /// Creates a new cached metadata provider wrapping the given provider
    pub(crate) fn new(provider: P, cache: CacheStorage<serde_json::Value>) -> Self {
        Self { provider, cache }
    }

    /// Returns the cached value for `key`, or fetches and caches it
    ///
    /// Cache failures are logged and otherwise ignored; they never fail the
    /// request.
    fn cached<T, F>(&self, key: &str, fetch: F) -> Result<T, MetadataError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&P) -> Result<T, MetadataError>,
    {
        match self.cache.load(key) {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(data) => {
                    debug!(key, "metadata cache hit");
                    return Ok(data);
                }
                Err(e) => warn!(key, error = %e, "ignoring unreadable cache entry"),
            },
            Ok(None) => debug!(key, "metadata cache miss"),
            Err(e) => warn!(key, error = %e, "metadata cache read failed"),
        }

        let data = fetch(&self.provider)?;

        match serde_json::to_value(&data) {
            Ok(value) => {
                if let Err(e) = self.cache.store(key, &value) {
                    warn!(key, error = %e, "metadata cache write failed");
                }
            }
            Err(e) => warn!(key, error = %e, "metadata not cacheable"),
        }

        Ok(data)
    }
}

/// Cache key of a details response
pub(crate) fn details_cache_key(id: ExternalId, media_type: MediaType) -> String {
    format!("{}/{}", media_type, id)
}

impl<P> MetadataProvider for CachedMetadataProvider<P>
where
    P: MetadataProvider,
{
    fn search(&self, query: &str, media_type: MediaType, page: u32) -> Result<Page, MetadataError> {
        let key = format!("search/{}?query={}&page={}", media_type, query, page);
        self.cached(&key, |p| p.search(query, media_type, page))
    }

    fn details(&self, id: ExternalId, media_type: MediaType) -> Result<ItemDetails, MetadataError> {
        let key = details_cache_key(id, media_type);
        self.cached(&key, |p| p.details(id, media_type))
    }

    fn trending(&self, scope: TrendingScope, window: TimeWindow) -> Result<Page, MetadataError> {
        let key = format!("trending/{}/{}", scope.as_str(), window);
        self.cached(&key, |p| p.trending(scope, window))
    }

    fn popular(&self, media_type: MediaType, page: u32) -> Result<Page, MetadataError> {
        let key = format!("{}/popular?page={}", media_type, page);
        self.cached(&key, |p| p.popular(media_type, page))
    }

    fn top_rated(&self, media_type: MediaType, page: u32) -> Result<Page, MetadataError> {
        let key = format!("{}/top_rated?page={}", media_type, page);
        self.cached(&key, |p| p.top_rated(media_type, page))
    }

    fn season_details(
        &self,
        show_id: ExternalId,
        season_number: u32,
    ) -> Result<SeasonDetails, MetadataError> {
        let key = format!("tv/{}/season/{}", show_id, season_number);
        self.cached(&key, |p| p.season_details(show_id, season_number))
    }

    fn genres(&self, media_type: MediaType) -> Result<Vec<Genre>, MetadataError> {
        let key = format!("genre/{}/list", media_type);
        self.cached(&key, |p| p.genres(media_type))
    }

    fn discover_by_genre(
        &self,
        genre_id: u32,
        media_type: MediaType,
        page: u32,
    ) -> Result<Page, MetadataError> {
        let key = format!("discover/{}?with_genres={}&page={}", media_type, genre_id, page);
        self.cached(&key, |p| p.discover_by_genre(genre_id, media_type, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::CatalogItem;
    use std::cell::Cell;

    /// Provider that counts calls and fails on demand
    struct FakeProvider {
        calls: Cell<usize>,
        fail: bool,
    }

    impl FakeProvider {
        fn new(fail: bool) -> Self {
            Self {
                calls: Cell::new(0),
                fail,
            }
        }

        fn page(&self, title: &str) -> Result<Page, MetadataError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(MetadataError::Request("offline".to_string()));
            }
            Ok(Page {
                page: 1,
                total_pages: 1,
                items: vec![CatalogItem {
                    id: ExternalId(1),
                    media_type: MediaType::Movie,
                    title: title.to_string(),
                    overview: None,
                    release_year: Some(2000),
                    poster_path: None,
                    backdrop_path: None,
                    vote_average: Some(7.5),
                    genre_ids: vec![],
                }],
            })
        }
    }

    impl MetadataProvider for FakeProvider {
        fn search(&self, query: &str, _: MediaType, _: u32) -> Result<Page, MetadataError> {
            self.page(query)
        }

        fn details(&self, id: ExternalId, _: MediaType) -> Result<ItemDetails, MetadataError> {
            Err(MetadataError::NotFound(id.to_string()))
        }

        fn trending(&self, _: TrendingScope, _: TimeWindow) -> Result<Page, MetadataError> {
            self.page("trending")
        }

        fn popular(&self, _: MediaType, _: u32) -> Result<Page, MetadataError> {
            self.page("popular")
        }

        fn top_rated(&self, _: MediaType, _: u32) -> Result<Page, MetadataError> {
            self.page("top")
        }

        fn season_details(&self, id: ExternalId, _: u32) -> Result<SeasonDetails, MetadataError> {
            Err(MetadataError::NotFound(id.to_string()))
        }

        fn genres(&self, _: MediaType) -> Result<Vec<Genre>, MetadataError> {
            Ok(vec![Genre {
                id: 18,
                name: "Drama".to_string(),
            }])
        }

        fn discover_by_genre(&self, _: u32, _: MediaType, _: u32) -> Result<Page, MetadataError> {
            self.page("discover")
        }
    }

    fn cache(root: &std::path::Path) -> CacheStorage<serde_json::Value> {
        CacheStorage::open(root, "metadata", None).unwrap()
    }

    #[test]
    fn test_second_call_is_served_from_cache() {
        let root = tempfile::tempdir().unwrap();
        let provider = CachedMetadataProvider::new(FakeProvider::new(false), cache(root.path()));

        let first = provider.search("alien", MediaType::Movie, 1).unwrap();
        let second = provider.search("alien", MediaType::Movie, 1).unwrap();
        assert_eq!(first, second);
        assert_eq!(provider.provider.calls.get(), 1);

        provider.search("alien", MediaType::Movie, 2).unwrap();
        assert_eq!(provider.provider.calls.get(), 2);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let root = tempfile::tempdir().unwrap();
        let provider = CachedMetadataProvider::new(FakeProvider::new(true), cache(root.path()));

        assert!(provider.popular(MediaType::Tv, 1).is_err());
        assert!(provider.popular(MediaType::Tv, 1).is_err());
        assert_eq!(provider.provider.calls.get(), 2);
    }

    #[test]
    fn test_unreadable_entry_falls_back_to_provider() {
        let root = tempfile::tempdir().unwrap();
        let storage = cache(root.path());
        storage
            .store("movie/popular?page=1", &serde_json::json!({"bogus": true}))
            .unwrap();
        let provider = CachedMetadataProvider::new(FakeProvider::new(false), storage);

        let page = provider.popular(MediaType::Movie, 1).unwrap();
        assert_eq!(page.items[0].title, "popular");
        assert_eq!(provider.provider.calls.get(), 1);
    }
}
