//! HTTP client for the metadata provider, with request spacing and
//! response memoization.

use super::models::*;
use crate::ttl_cache::TtlCache;
use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const DEFAULT_METADATA_BASE_URL: &str = "https://musicbrainz.org/ws/2";
const DEFAULT_COVER_ART_BASE_URL: &str = "https://coverartarchive.org";
const SEARCH_LIMIT: usize = 10;

/// Errors from the metadata provider or the cover-art service.
///
/// Callers must not assume automatic retry; nothing here retries.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("entity not found on remote service")]
    NotFound,

    #[error("remote service unavailable: {0}")]
    Unavailable(String),
}

/// Read operations against the external metadata service.
///
/// Implemented by [`MusicBrainzClient`]; substitutable with call-counting
/// doubles in resolver tests.
#[async_trait]
pub trait RemoteMetadataClient: Send + Sync {
    async fn search_artists(&self, query: &str) -> Result<Vec<ArtistSummary>, RemoteError>;

    async fn search_albums(&self, query: &str) -> Result<Vec<AlbumSummary>, RemoteError>;

    async fn search_tracks(&self, query: &str) -> Result<Vec<TrackSummary>, RemoteError>;

    /// Resolve a release-group to its full detail, including the ordered
    /// tracklist of its first release and best-effort cover art.
    async fn fetch_full_album(&self, external_id: &str) -> Result<AlbumDetail, RemoteError>;

    /// Resolve an artist, including top genre tags and the album-type
    /// release-group list.
    async fn fetch_artist(&self, external_id: &str) -> Result<ArtistDetail, RemoteError>;

    /// Cover art is optional enrichment: any failure degrades to `None`
    /// instead of failing the enclosing operation.
    async fn fetch_cover_art(&self, external_id: &str) -> Option<String>;
}

#[derive(Debug, Clone)]
pub struct RemoteClientConfig {
    pub metadata_base_url: String,
    pub cover_art_base_url: String,
    /// Sent as User-Agent; the provider requires a descriptive client
    /// identifier for anonymous access.
    pub user_agent: String,
    /// Minimum spacing between outbound requests, shared by all callers.
    pub request_interval: Duration,
    /// Per-call timeout; expiry is treated as the service being
    /// unavailable.
    pub request_timeout: Duration,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
}

impl Default for RemoteClientConfig {
    fn default() -> Self {
        Self {
            metadata_base_url: DEFAULT_METADATA_BASE_URL.to_string(),
            cover_art_base_url: DEFAULT_COVER_ART_BASE_URL.to_string(),
            user_agent: format!("tunescore-server/{}", env!("CARGO_PKG_VERSION")),
            request_interval: Duration::from_millis(1000),
            request_timeout: Duration::from_secs(5),
            cache_ttl: crate::ttl_cache::DEFAULT_TTL,
            cache_capacity: crate::ttl_cache::DEFAULT_CAPACITY,
        }
    }
}

/// Serializes outbound dispatch across all concurrent callers.
///
/// The lock is held across the spacing sleep, so the total outbound rate
/// stays bounded no matter how many tasks are waiting.
pub struct DispatchGate {
    last_dispatch: Mutex<Instant>,
    interval: Duration,
}

impl DispatchGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            // Backdated so the first request goes out immediately.
            last_dispatch: Mutex::new(Instant::now() - interval),
            interval,
        }
    }

    pub async fn wait(&self) {
        let mut last = self.last_dispatch.lock().await;
        let elapsed = last.elapsed();
        if elapsed < self.interval {
            tokio::time::sleep(self.interval - elapsed).await;
        }
        *last = Instant::now();
    }
}

/// Client for the MusicBrainz web service and the Cover Art Archive.
///
/// Every operation probes its cache first; a hit costs neither the
/// inter-request delay nor a network call.
pub struct MusicBrainzClient {
    http: reqwest::Client,
    config: RemoteClientConfig,
    gate: DispatchGate,
    artist_search_cache: TtlCache<String, Vec<ArtistSummary>>,
    album_search_cache: TtlCache<String, Vec<AlbumSummary>>,
    track_search_cache: TtlCache<String, Vec<TrackSummary>>,
    album_detail_cache: TtlCache<String, AlbumDetail>,
    artist_detail_cache: TtlCache<String, ArtistDetail>,
    cover_art_cache: TtlCache<String, Option<String>>,
}

impl MusicBrainzClient {
    pub fn new(config: RemoteClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout)
            .build()?;

        let (ttl, cap) = (config.cache_ttl, config.cache_capacity);

        Ok(Self {
            http,
            gate: DispatchGate::new(config.request_interval),
            artist_search_cache: TtlCache::new(ttl, cap),
            album_search_cache: TtlCache::new(ttl, cap),
            track_search_cache: TtlCache::new(ttl, cap),
            album_detail_cache: TtlCache::new(ttl, cap),
            artist_detail_cache: TtlCache::new(ttl, cap),
            cover_art_cache: TtlCache::new(ttl, cap),
            config,
        })
    }

    /// Issue a GET through the dispatch gate and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, RemoteError> {
        self.gate.wait().await;
        debug!("remote GET {}", url);

        let response = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;

        match response.status() {
            status if status.as_u16() == 404 => Err(RemoteError::NotFound),
            status if !status.is_success() => {
                Err(RemoteError::Unavailable(format!("status {}", status)))
            }
            _ => response
                .json()
                .await
                .map_err(|e| RemoteError::Unavailable(format!("malformed payload: {}", e))),
        }
    }

    async fn lookup_cover_art(&self, external_id: &str) -> Result<Option<String>, RemoteError> {
        let url = format!(
            "{}/release-group/{}",
            self.config.cover_art_base_url, external_id
        );
        match self.get_json::<CoverArtResponse>(&url).await {
            Ok(body) => Ok(body.into_url()),
            // Entities with no art 404 on the archive; that is not an error.
            Err(RemoteError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl RemoteMetadataClient for MusicBrainzClient {
    async fn search_artists(&self, query: &str) -> Result<Vec<ArtistSummary>, RemoteError> {
        let key = query.to_string();
        if let Some(hit) = self.artist_search_cache.get(&key) {
            return Ok(hit);
        }

        let url = format!(
            "{}/artist?query={}&limit={}&fmt=json",
            self.config.metadata_base_url,
            urlencoding::encode(query),
            SEARCH_LIMIT
        );
        let body: ArtistSearchResponse = self.get_json(&url).await?;
        let artists: Vec<ArtistSummary> =
            body.artists.into_iter().map(MbArtist::into_summary).collect();

        self.artist_search_cache.set(key, artists.clone());
        Ok(artists)
    }

    async fn search_albums(&self, query: &str) -> Result<Vec<AlbumSummary>, RemoteError> {
        let key = query.to_string();
        if let Some(hit) = self.album_search_cache.get(&key) {
            return Ok(hit);
        }

        let url = format!(
            "{}/release-group?query={}&type=album&limit={}&fmt=json",
            self.config.metadata_base_url,
            urlencoding::encode(query),
            SEARCH_LIMIT
        );
        let body: ReleaseGroupSearchResponse = self.get_json(&url).await?;
        let albums: Vec<AlbumSummary> = body
            .release_groups
            .iter()
            .map(MbReleaseGroup::to_album_summary)
            .collect();

        self.album_search_cache.set(key, albums.clone());
        Ok(albums)
    }

    async fn search_tracks(&self, query: &str) -> Result<Vec<TrackSummary>, RemoteError> {
        let key = query.to_string();
        if let Some(hit) = self.track_search_cache.get(&key) {
            return Ok(hit);
        }

        let url = format!(
            "{}/recording?query={}&limit={}&fmt=json",
            self.config.metadata_base_url,
            urlencoding::encode(query),
            SEARCH_LIMIT
        );
        let body: RecordingSearchResponse = self.get_json(&url).await?;
        let tracks: Vec<TrackSummary> = body
            .recordings
            .into_iter()
            .map(MbRecording::into_summary)
            .collect();

        self.track_search_cache.set(key, tracks.clone());
        Ok(tracks)
    }

    async fn fetch_full_album(&self, external_id: &str) -> Result<AlbumDetail, RemoteError> {
        let key = external_id.to_string();
        if let Some(hit) = self.album_detail_cache.get(&key) {
            return Ok(hit);
        }

        let url = format!(
            "{}/release-group/{}?inc=artists+releases&fmt=json",
            self.config.metadata_base_url, external_id
        );
        let release_group: MbReleaseGroup = self.get_json(&url).await?;

        let credit = release_group
            .artist_credit
            .iter()
            .find_map(|c| c.artist.as_ref())
            .ok_or_else(|| {
                RemoteError::Unavailable("release group carries no artist credit".to_string())
            })?;
        let artist_name = credit.name.clone();
        let artist_external_id = credit.id.clone();

        // The provider may expose several releases of one logical album;
        // the first one supplies the ordered tracklist.
        let tracks = match release_group.releases.first() {
            Some(release) => {
                let url = format!(
                    "{}/release/{}?inc=recordings&fmt=json",
                    self.config.metadata_base_url, release.id
                );
                let detail: MbReleaseDetail = self.get_json(&url).await?;
                detail.into_tracks()
            }
            None => Vec::new(),
        };

        let cover_url = self.fetch_cover_art(external_id).await;

        let detail = AlbumDetail {
            external_id: release_group.id,
            title: release_group.title,
            artist_name,
            artist_external_id,
            release_date: release_group.first_release_date.filter(|d| !d.is_empty()),
            album_type: release_group.primary_type,
            cover_url,
            tracks,
        };

        self.album_detail_cache.set(key, detail.clone());
        Ok(detail)
    }

    async fn fetch_artist(&self, external_id: &str) -> Result<ArtistDetail, RemoteError> {
        let key = external_id.to_string();
        if let Some(hit) = self.artist_detail_cache.get(&key) {
            return Ok(hit);
        }

        let url = format!(
            "{}/artist/{}?inc=release-groups+tags&fmt=json",
            self.config.metadata_base_url, external_id
        );
        let body: MbArtistDetail = self.get_json(&url).await?;
        let detail = body.into_detail();

        self.artist_detail_cache.set(key, detail.clone());
        Ok(detail)
    }

    async fn fetch_cover_art(&self, external_id: &str) -> Option<String> {
        let key = external_id.to_string();
        if let Some(hit) = self.cover_art_cache.get(&key) {
            return hit;
        }

        let result = match self.lookup_cover_art(external_id).await {
            Ok(url) => url,
            Err(err) => {
                warn!("cover art lookup failed for {}: {}", external_id, err);
                None
            }
        };

        self.cover_art_cache.set(key, result.clone());
        result
    }
}
