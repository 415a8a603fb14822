//! Cache-aside resolution of albums and artists.
//!
//! The local store is consulted first and is authoritative once an entity
//! has been persisted; the remote service is only reached on a miss. Two
//! tasks racing to persist the same unseen entity both succeed: the store
//! enforces uniqueness on the external id and the loser adopts the
//! winner's row.

mod views;

pub use views::{AlbumView, ArtistView, DiscographyEntry, SearchAlbumResult, SearchResults};

use crate::catalog_store::{CatalogStore, NewAlbum, NewArtist, NewTrack};
use crate::error::{CatalogError, CatalogResult};
use crate::musicbrainz::RemoteMetadataClient;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Queries shorter than this return an empty result instead of an error.
pub const MIN_SEARCH_QUERY_CHARS: usize = 2;

/// Normalize a provider release date to a full calendar date.
///
/// `"1990"` → `"1990-01-01"`, `"1990-11"` → `"1990-11-01"`, anything else
/// (including absent) passes through unchanged.
pub fn normalize_release_date(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    match raw.len() {
        4 => Some(format!("{}-01-01", raw)),
        7 => Some(format!("{}-01", raw)),
        _ => Some(raw.to_string()),
    }
}

pub struct CatalogResolver {
    store: Arc<dyn CatalogStore>,
    remote: Arc<dyn RemoteMetadataClient>,
}

impl CatalogResolver {
    pub fn new(store: Arc<dyn CatalogStore>, remote: Arc<dyn RemoteMetadataClient>) -> Self {
        Self { store, remote }
    }

    /// Produce a consistent album view whether or not the album is already
    /// local.
    pub async fn resolve_album(&self, external_id: &str) -> CatalogResult<AlbumView> {
        if let Some(found) = self.store.get_album_by_external_id(external_id)? {
            let tracks = self.store.get_album_tracks(found.album.id)?;
            return Ok(AlbumView {
                album: found.album,
                artist_name: found.artist_name,
                artist_external_id: found.artist_external_id,
                tracks,
            });
        }

        debug!("album {} not in local catalog, resolving remotely", external_id);
        let detail = self.remote.fetch_full_album(external_id).await?;

        // Resolve the owning artist; a minimal row is enough, the full
        // profile is filled in if the artist is ever resolved directly.
        let artist_id = match self
            .store
            .get_artist_by_external_id(&detail.artist_external_id)?
        {
            Some(artist) => artist.id,
            None => self.store.insert_artist_if_absent(&NewArtist {
                external_id: detail.artist_external_id.clone(),
                name: detail.artist_name.clone(),
                country: None,
                formed_year: None,
                genres: Vec::new(),
            })?,
        };

        let album_id = self.store.insert_album_if_absent(&NewAlbum {
            external_id: detail.external_id.clone(),
            artist_id,
            title: detail.title.clone(),
            release_date: normalize_release_date(detail.release_date.as_deref()),
            album_type: detail.album_type.clone(),
            cover_url: detail.cover_url.clone(),
        })?;

        let new_tracks: Vec<NewTrack> = detail
            .tracks
            .iter()
            .map(|t| NewTrack {
                external_id: t.external_id.clone(),
                title: t.title.clone(),
                track_number: t.track_number,
                duration_ms: t.duration_ms,
            })
            .collect();
        self.store.insert_tracks(album_id, artist_id, &new_tracks)?;

        // Re-read so a lost insert race still returns the winner's row.
        let stored = self
            .store
            .get_album_by_external_id(&detail.external_id)?
            .ok_or(CatalogError::NotFound)?;
        let tracks = self.store.get_album_tracks(stored.album.id)?;
        Ok(AlbumView {
            album: stored.album,
            artist_name: stored.artist_name,
            artist_external_id: stored.artist_external_id,
            tracks,
        })
    }

    /// Produce an artist view; on a store miss the remote profile is
    /// persisted (name refreshed, genres re-derived on repeat) and the
    /// remote discography attached, keyed against locally-known albums.
    pub async fn resolve_artist(&self, external_id: &str) -> CatalogResult<ArtistView> {
        if let Some(artist) = self.store.get_artist_by_external_id(external_id)? {
            let albums = self.store.get_artist_albums(artist.id)?;
            return Ok(ArtistView {
                artist,
                albums,
                discography: Vec::new(),
            });
        }

        debug!("artist {} not in local catalog, resolving remotely", external_id);
        let detail = self.remote.fetch_artist(external_id).await?;

        let artist_id = self.store.upsert_artist(&NewArtist {
            external_id: detail.external_id.clone(),
            name: detail.name.clone(),
            country: detail.country.clone(),
            formed_year: detail.formed_year,
            genres: detail.genres.clone(),
        })?;

        let albums = self.store.get_artist_albums(artist_id)?;

        let release_ids: Vec<String> = detail
            .release_groups
            .iter()
            .map(|rg| rg.external_id.clone())
            .collect();
        let local_by_external_id: HashMap<String, i64> = self
            .store
            .get_albums_by_external_ids(&release_ids)?
            .into_iter()
            .map(|album| (album.external_id.clone(), album.id))
            .collect();

        let discography = detail
            .release_groups
            .iter()
            .map(|rg| DiscographyEntry {
                external_id: rg.external_id.clone(),
                title: rg.title.clone(),
                release_date: rg.release_date.clone(),
                album_type: rg.album_type.clone(),
                local_album_id: local_by_external_id.get(&rg.external_id).copied(),
            })
            .collect();

        let artist = self
            .store
            .get_artist_by_external_id(&detail.external_id)?
            .ok_or(CatalogError::NotFound)?;
        Ok(ArtistView {
            artist,
            albums,
            discography,
        })
    }

    /// Run all three remote searches and overlay local album data onto the
    /// album hits. Never writes to the store.
    pub async fn search(&self, query: &str) -> CatalogResult<SearchResults> {
        let trimmed = query.trim();
        if trimmed.chars().count() < MIN_SEARCH_QUERY_CHARS {
            return Ok(SearchResults::default());
        }

        // Issued together; the client's dispatch gate spaces the actual
        // network sends.
        let (artists, albums, tracks) = futures::join!(
            self.remote.search_artists(trimmed),
            self.remote.search_albums(trimmed),
            self.remote.search_tracks(trimmed),
        );
        let artists = artists?;
        let albums = albums?;
        let tracks = tracks?;

        let album_ids: Vec<String> = albums.iter().map(|a| a.external_id.clone()).collect();
        let local_albums: HashMap<String, crate::catalog_store::Album> = self
            .store
            .get_albums_by_external_ids(&album_ids)?
            .into_iter()
            .map(|album| (album.external_id.clone(), album))
            .collect();

        let mut album_results = Vec::with_capacity(albums.len());
        for summary in albums {
            match local_albums.get(&summary.external_id) {
                Some(local) => album_results.push(SearchAlbumResult {
                    cover_url: local.cover_url.clone(),
                    avg_rating: Some(local.avg_rating),
                    rating_count: Some(local.rating_count),
                    local_id: Some(local.id),
                    summary,
                }),
                None => {
                    // Best-effort enrichment; a cover-art failure must not
                    // fail the whole search.
                    let cover_url = self.remote.fetch_cover_art(&summary.external_id).await;
                    album_results.push(SearchAlbumResult {
                        cover_url,
                        avg_rating: None,
                        rating_count: None,
                        local_id: None,
                        summary,
                    });
                }
            }
        }

        Ok(SearchResults {
            artists,
            albums: album_results,
            tracks,
        })
    }
}
