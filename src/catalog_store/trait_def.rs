//! CatalogStore trait definition.

use super::models::*;
use anyhow::Result;

/// Storage backend for the local catalog.
///
/// The local store is the single source of truth: once an entity has been
/// persisted, resolution returns the local copy without consulting the
/// remote service. Implementations must enforce uniqueness of
/// `external_id` per entity table and treat a lost insert race as "someone
/// else just inserted it" (first-writer-wins).
pub trait CatalogStore: Send + Sync {
    // =========================================================================
    // Artists
    // =========================================================================

    fn get_artist_by_external_id(&self, external_id: &str) -> Result<Option<Artist>>;

    /// Insert a minimal artist row, or return the existing row's id when
    /// the external id is already present (including when a concurrent
    /// insert won the race).
    fn insert_artist_if_absent(&self, artist: &NewArtist) -> Result<i64>;

    /// Insert or refresh an artist: on conflict the name is refreshed,
    /// country/formation year filled in when newly known, and the genre
    /// tags re-derived. Returns the row id.
    fn upsert_artist(&self, artist: &NewArtist) -> Result<i64>;

    /// Albums locally known for an artist, newest release first.
    fn get_artist_albums(&self, artist_id: i64) -> Result<Vec<Album>>;

    // =========================================================================
    // Albums
    // =========================================================================

    fn get_album_by_external_id(&self, external_id: &str) -> Result<Option<AlbumWithArtist>>;

    /// Single batched lookup used by the search overlay.
    fn get_albums_by_external_ids(&self, external_ids: &[String]) -> Result<Vec<Album>>;

    /// Insert an album, or return the existing row's id on a lost race
    /// (first-writer-wins).
    fn insert_album_if_absent(&self, album: &NewAlbum) -> Result<i64>;

    // =========================================================================
    // Tracks
    // =========================================================================

    /// Tracks of an album in tracklist order.
    fn get_album_tracks(&self, album_id: i64) -> Result<Vec<Track>>;

    /// Idempotent bulk insert: a track whose external id already exists is
    /// silently skipped, never duplicated and never an error.
    fn insert_tracks(&self, album_id: i64, artist_id: i64, tracks: &[NewTrack]) -> Result<()>;

    // =========================================================================
    // Ratings
    // =========================================================================

    fn entity_exists(&self, entity_type: RatedEntity, entity_id: i64) -> Result<bool>;

    /// Upsert the rating keyed on (user, entity kind, entity) and recompute
    /// the target row's avg_rating/rating_count. Both writes happen in one
    /// transaction; the recompute reads post-write state inside it.
    fn upsert_rating(
        &self,
        user_id: &str,
        entity_type: RatedEntity,
        entity_id: i64,
        value: f64,
    ) -> Result<Rating>;

    fn get_rating(
        &self,
        user_id: &str,
        entity_type: RatedEntity,
        entity_id: i64,
    ) -> Result<Option<Rating>>;

    /// Delete the rating if present (absent is not an error) and recompute
    /// aggregates the same way, with avg_rating falling back to 0 when no
    /// ratings remain. Returns whether a row was deleted.
    fn delete_rating(
        &self,
        user_id: &str,
        entity_type: RatedEntity,
        entity_id: i64,
    ) -> Result<bool>;

    // =========================================================================
    // Counts
    // =========================================================================

    fn count_artists(&self) -> Result<usize>;

    fn count_albums(&self) -> Result<usize>;

    fn count_tracks(&self) -> Result<usize>;
}
