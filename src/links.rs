//! Image and player links
//!
//! Builds poster and backdrop URLs for metadata image paths and resolves the
//! URL to play a title: the link saved in the catalog when there is one,
//! otherwise the embed player URL.

use crate::catalog::ExternalId;
use crate::store::{LocalStore, StorageBackend};

/// Base URL for TMDB images
pub const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p";

/// Shown when a title has no poster
pub const PLACEHOLDER_IMAGE_URL: &str = "https://via.placeholder.com/500x750?text=No+Image";

/// Base URL of the embed player
pub const EMBED_BASE_URL: &str = "https://vidsrc.xyz/embed";

/// Default poster size
pub const POSTER_SIZE: &str = "w500";

/// Default backdrop size
pub const BACKDROP_SIZE: &str = "original";

/// URL of a poster image, or the placeholder when there is no path
pub fn image_url(path: Option<&str>, size: &str) -> String {
    match path.filter(|p| !p.is_empty()) {
        Some(path) => format!("{}/{}{}", IMAGE_BASE_URL, size, path),
        None => PLACEHOLDER_IMAGE_URL.to_string(),
    }
}

/// URL of a backdrop image, or an empty string when there is no path
pub fn backdrop_url(path: Option<&str>, size: &str) -> String {
    match path.filter(|p| !p.is_empty()) {
        Some(path) => format!("{}/{}{}", IMAGE_BASE_URL, size, path),
        None => String::new(),
    }
}

/// Embed player URL for a movie
pub fn movie_embed_url(id: ExternalId) -> String {
    format!("{}/movie/{}", EMBED_BASE_URL, id)
}

/// Embed player URL for an episode
pub fn tv_embed_url(id: ExternalId, season: u32, episode: u32) -> String {
    format!("{}/tv/{}/{}/{}", EMBED_BASE_URL, id, season, episode)
}

/// Where a stream URL came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSource {
    /// A link saved in the catalog
    Catalog,
    /// The embed player fallback
    Embed,
}

/// A playable URL and its origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamLink {
    pub url: String,
    pub source: StreamSource,
}

/// Resolves the URL to play a movie
pub fn resolve_movie_stream<B: StorageBackend>(store: &LocalStore<B>, id: ExternalId) -> StreamLink {
    match store.get_movie(id) {
        Some(movie) => StreamLink {
            url: movie.url.clone(),
            source: StreamSource::Catalog,
        },
        None => StreamLink {
            url: movie_embed_url(id),
            source: StreamSource::Embed,
        },
    }
}

/// Resolves the URL to play an episode
pub fn resolve_episode_stream<B: StorageBackend>(
    store: &LocalStore<B>,
    id: ExternalId,
    season: u32,
    episode: u32,
) -> StreamLink {
    match store
        .get_show(id)
        .and_then(|show| show.episode_url(season, episode))
    {
        Some(url) => StreamLink {
            url: url.to_string(),
            source: StreamSource::Catalog,
        },
        None => StreamLink {
            url: tv_embed_url(id, season, episode),
            source: StreamSource::Embed,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Episode, Movie, Season, Show};
    use crate::store::MemoryBackend;

    #[test]
    fn test_image_urls() {
        assert_eq!(
            image_url(Some("/abc.jpg"), POSTER_SIZE),
            "https://image.tmdb.org/t/p/w500/abc.jpg"
        );
        assert_eq!(image_url(None, POSTER_SIZE), PLACEHOLDER_IMAGE_URL);
        assert_eq!(image_url(Some(""), POSTER_SIZE), PLACEHOLDER_IMAGE_URL);
        assert_eq!(
            backdrop_url(Some("/b.jpg"), BACKDROP_SIZE),
            "https://image.tmdb.org/t/p/original/b.jpg"
        );
        assert_eq!(backdrop_url(None, BACKDROP_SIZE), "");
    }

    #[test]
    fn test_embed_urls() {
        assert_eq!(movie_embed_url(ExternalId(550)), "https://vidsrc.xyz/embed/movie/550");
        assert_eq!(
            tv_embed_url(ExternalId(1399), 2, 3),
            "https://vidsrc.xyz/embed/tv/1399/2/3"
        );
    }

    #[test]
    fn test_resolve_prefers_catalog() {
        let mut store = LocalStore::open(MemoryBackend::new()).unwrap();
        store
            .upsert_movie(Movie {
                external_id: ExternalId(1),
                url: "https://cdn.example/1".to_string(),
            })
            .unwrap();
        store
            .upsert_show(Show {
                external_id: ExternalId(2),
                seasons: vec![Season {
                    season_number: 1,
                    episodes: vec![Episode {
                        episode_number: 1,
                        url: "https://cdn.example/2/1/1".to_string(),
                    }],
                }],
            })
            .unwrap();

        let movie = resolve_movie_stream(&store, ExternalId(1));
        assert_eq!(movie.source, StreamSource::Catalog);
        assert_eq!(movie.url, "https://cdn.example/1");

        let fallback = resolve_movie_stream(&store, ExternalId(3));
        assert_eq!(fallback.source, StreamSource::Embed);

        let episode = resolve_episode_stream(&store, ExternalId(2), 1, 1);
        assert_eq!(episode.url, "https://cdn.example/2/1/1");
        let missing = resolve_episode_stream(&store, ExternalId(2), 1, 2);
        assert_eq!(missing.url, "https://vidsrc.xyz/embed/tv/2/1/2");
    }
}
