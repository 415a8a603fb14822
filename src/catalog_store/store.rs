//! SQLite-backed catalog store implementation.

use super::models::*;
use super::schema::CATALOG_VERSIONED_SCHEMAS;
use super::trait_def::CatalogStore;
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{Context, Result};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// SQLite-backed catalog store.
///
/// One guarded write connection (WAL mode) serializes all mutation, which
/// is what makes the upsert-then-recompute rating path atomic with respect
/// to concurrent submissions.
#[derive(Clone)]
pub struct SqliteCatalogStore {
    read_conn: Arc<Mutex<Connection>>,
    write_conn: Arc<Mutex<Connection>>,
}

fn migrate_if_needed(conn: &mut Connection) -> Result<()> {
    let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;

    let latest_version = CATALOG_VERSIONED_SCHEMAS.len() - 1;
    let latest_schema = &CATALOG_VERSIONED_SCHEMAS[latest_version];

    let table_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
            [],
            |r| r.get(0),
        )
        .unwrap_or(0);

    if table_count == 0 {
        info!("Creating catalog db schema at version {}", latest_version);
        latest_schema.create(conn)?;
        return Ok(());
    }

    let mut current_version = if db_version < BASE_DB_VERSION as i64 {
        0
    } else {
        (db_version - BASE_DB_VERSION as i64) as usize
    };

    if current_version >= latest_version {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for schema in CATALOG_VERSIONED_SCHEMAS.iter().skip(current_version + 1) {
        if let Some(migration_fn) = schema.migration {
            info!(
                "Migrating catalog db from version {} to {}",
                current_version, schema.version
            );
            migration_fn(&tx)?;
            current_version = schema.version;
        }
    }
    tx.pragma_update(None, "user_version", BASE_DB_VERSION + current_version)?;
    tx.commit()?;
    Ok(())
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// A lost check-else-insert race surfaces as a UNIQUE violation; the
/// caller re-reads and adopts the winner's row.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(rusqlite::ErrorCode::ConstraintViolation)
    )
}

impl SqliteCatalogStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path_ref = db_path.as_ref();

        let mut write_conn = Connection::open_with_flags(
            db_path_ref,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open catalog database")?;

        migrate_if_needed(&mut write_conn)?;

        write_conn
            .pragma_update(None, "journal_mode", "WAL")
            .context("Failed to set WAL mode on catalog write connection")?;
        write_conn.pragma_update(None, "foreign_keys", "ON")?;

        let read_conn = Connection::open_with_flags(
            db_path_ref,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open catalog database for reading")?;

        read_conn
            .pragma_update(None, "journal_mode", "WAL")
            .context("Failed to set WAL mode on catalog read connection")?;

        let artist_count: i64 = read_conn
            .query_row("SELECT COUNT(*) FROM artists", [], |r| r.get(0))
            .unwrap_or(0);
        let album_count: i64 = read_conn
            .query_row("SELECT COUNT(*) FROM albums", [], |r| r.get(0))
            .unwrap_or(0);
        info!(
            "Opened catalog: {} artists, {} albums",
            artist_count, album_count
        );

        Ok(Self {
            read_conn: Arc::new(Mutex::new(read_conn)),
            write_conn: Arc::new(Mutex::new(write_conn)),
        })
    }

    fn get_artist_genres(conn: &Connection, artist_id: i64) -> Result<Vec<String>> {
        let mut stmt = conn.prepare_cached(
            "SELECT genre FROM artist_genres WHERE artist_id = ?1 ORDER BY position",
        )?;
        let genres = stmt
            .query_map(params![artist_id], |r| r.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(genres)
    }

    fn replace_artist_genres(tx: &Transaction, artist_id: i64, genres: &[String]) -> Result<()> {
        tx.execute(
            "DELETE FROM artist_genres WHERE artist_id = ?1",
            params![artist_id],
        )?;
        let mut stmt = tx.prepare_cached(
            "INSERT INTO artist_genres (artist_id, genre, position) VALUES (?1, ?2, ?3)",
        )?;
        for (position, genre) in genres.iter().enumerate() {
            stmt.execute(params![artist_id, genre, position as i64])?;
        }
        Ok(())
    }

    fn parse_album_row(row: &rusqlite::Row) -> rusqlite::Result<Album> {
        Ok(Album {
            id: row.get(0)?,
            external_id: row.get(1)?,
            artist_id: row.get(2)?,
            title: row.get(3)?,
            release_date: row.get(4)?,
            album_type: row.get(5)?,
            cover_url: row.get(6)?,
            avg_rating: row.get(7)?,
            rating_count: row.get(8)?,
        })
    }

    fn parse_track_row(row: &rusqlite::Row) -> rusqlite::Result<Track> {
        Ok(Track {
            id: row.get(0)?,
            external_id: row.get(1)?,
            album_id: row.get(2)?,
            artist_id: row.get(3)?,
            title: row.get(4)?,
            track_number: row.get(5)?,
            duration_ms: row.get(6)?,
            avg_rating: row.get(7)?,
            rating_count: row.get(8)?,
        })
    }

    /// Rewrite the target row's derived aggregate columns from the rating
    /// rows visible inside `tx`. The statement is chosen by matching on
    /// the closed entity enum.
    fn recompute_aggregates(
        tx: &Transaction,
        entity_type: RatedEntity,
        entity_id: i64,
    ) -> Result<()> {
        let sql = match entity_type {
            RatedEntity::Album => {
                "UPDATE albums SET
                    avg_rating = COALESCE((SELECT ROUND(AVG(value), 2) FROM ratings
                                           WHERE entity_type = ?1 AND entity_id = ?2), 0),
                    rating_count = (SELECT COUNT(*) FROM ratings
                                    WHERE entity_type = ?1 AND entity_id = ?2)
                 WHERE id = ?2"
            }
            RatedEntity::Track => {
                "UPDATE tracks SET
                    avg_rating = COALESCE((SELECT ROUND(AVG(value), 2) FROM ratings
                                           WHERE entity_type = ?1 AND entity_id = ?2), 0),
                    rating_count = (SELECT COUNT(*) FROM ratings
                                    WHERE entity_type = ?1 AND entity_id = ?2)
                 WHERE id = ?2"
            }
        };
        tx.execute(sql, params![entity_type.to_int(), entity_id])?;
        Ok(())
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn get_artist_by_external_id(&self, external_id: &str) -> Result<Option<Artist>> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, external_id, name, country, formed_year
             FROM artists WHERE external_id = ?1",
        )?;
        let row = stmt
            .query_row(params![external_id], |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, Option<String>>(3)?,
                    r.get::<_, Option<i32>>(4)?,
                ))
            })
            .optional()?;

        match row {
            None => Ok(None),
            Some((id, external_id, name, country, formed_year)) => {
                let genres = Self::get_artist_genres(&conn, id)?;
                Ok(Some(Artist {
                    id,
                    external_id,
                    name,
                    country,
                    formed_year,
                    genres,
                }))
            }
        }
    }

    fn insert_artist_if_absent(&self, artist: &NewArtist) -> Result<i64> {
        let mut conn = self.write_conn.lock().unwrap();
        let tx = conn.transaction()?;

        let insert = tx.execute(
            "INSERT INTO artists (external_id, name, country, formed_year)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                artist.external_id,
                artist.name,
                artist.country,
                artist.formed_year
            ],
        );

        let id = match insert {
            Ok(_) => {
                let id = tx.last_insert_rowid();
                Self::replace_artist_genres(&tx, id, &artist.genres)?;
                id
            }
            Err(err) if is_unique_violation(&err) => {
                debug!(
                    "artist {} already present, adopting existing row",
                    artist.external_id
                );
                tx.query_row(
                    "SELECT id FROM artists WHERE external_id = ?1",
                    params![artist.external_id],
                    |r| r.get(0),
                )?
            }
            Err(err) => return Err(err).context("Failed to insert artist"),
        };

        tx.commit()?;
        Ok(id)
    }

    fn upsert_artist(&self, artist: &NewArtist) -> Result<i64> {
        let mut conn = self.write_conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO artists (external_id, name, country, formed_year)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(external_id) DO UPDATE SET
                name = excluded.name,
                country = COALESCE(excluded.country, artists.country),
                formed_year = COALESCE(excluded.formed_year, artists.formed_year)",
            params![
                artist.external_id,
                artist.name,
                artist.country,
                artist.formed_year
            ],
        )
        .context("Failed to upsert artist")?;

        let id: i64 = tx.query_row(
            "SELECT id FROM artists WHERE external_id = ?1",
            params![artist.external_id],
            |r| r.get(0),
        )?;
        Self::replace_artist_genres(&tx, id, &artist.genres)?;

        tx.commit()?;
        Ok(id)
    }

    fn get_artist_albums(&self, artist_id: i64) -> Result<Vec<Album>> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, external_id, artist_id, title, release_date, album_type, cover_url,
                    avg_rating, rating_count
             FROM albums WHERE artist_id = ?1 ORDER BY release_date DESC",
        )?;
        let albums = stmt
            .query_map(params![artist_id], Self::parse_album_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(albums)
    }

    fn get_album_by_external_id(&self, external_id: &str) -> Result<Option<AlbumWithArtist>> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT a.id, a.external_id, a.artist_id, a.title, a.release_date, a.album_type,
                    a.cover_url, a.avg_rating, a.rating_count, ar.name, ar.external_id
             FROM albums a
             JOIN artists ar ON ar.id = a.artist_id
             WHERE a.external_id = ?1",
        )?;
        let result = stmt
            .query_row(params![external_id], |row| {
                Ok(AlbumWithArtist {
                    album: Self::parse_album_row(row)?,
                    artist_name: row.get(9)?,
                    artist_external_id: row.get(10)?,
                })
            })
            .optional()?;
        Ok(result)
    }

    fn get_albums_by_external_ids(&self, external_ids: &[String]) -> Result<Vec<Album>> {
        if external_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.read_conn.lock().unwrap();
        let placeholders = vec!["?"; external_ids.len()].join(", ");
        let mut stmt = conn.prepare(&format!(
            "SELECT id, external_id, artist_id, title, release_date, album_type, cover_url,
                    avg_rating, rating_count
             FROM albums WHERE external_id IN ({})",
            placeholders
        ))?;
        let albums = stmt
            .query_map(params_from_iter(external_ids.iter()), Self::parse_album_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(albums)
    }

    fn insert_album_if_absent(&self, album: &NewAlbum) -> Result<i64> {
        let mut conn = self.write_conn.lock().unwrap();
        let tx = conn.transaction()?;

        let insert = tx.execute(
            "INSERT INTO albums (external_id, artist_id, title, release_date, album_type, cover_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                album.external_id,
                album.artist_id,
                album.title,
                album.release_date,
                album.album_type,
                album.cover_url
            ],
        );

        let id = match insert {
            Ok(_) => tx.last_insert_rowid(),
            Err(err) if is_unique_violation(&err) => {
                debug!(
                    "album {} already present, adopting existing row",
                    album.external_id
                );
                tx.query_row(
                    "SELECT id FROM albums WHERE external_id = ?1",
                    params![album.external_id],
                    |r| r.get(0),
                )?
            }
            Err(err) => return Err(err).context("Failed to insert album"),
        };

        tx.commit()?;
        Ok(id)
    }

    fn get_album_tracks(&self, album_id: i64) -> Result<Vec<Track>> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, external_id, album_id, artist_id, title, track_number, duration_ms,
                    avg_rating, rating_count
             FROM tracks WHERE album_id = ?1
             ORDER BY track_number NULLS LAST, id",
        )?;
        let tracks = stmt
            .query_map(params![album_id], Self::parse_track_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tracks)
    }

    fn insert_tracks(&self, album_id: i64, artist_id: i64, tracks: &[NewTrack]) -> Result<()> {
        let mut conn = self.write_conn.lock().unwrap();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO tracks (external_id, album_id, artist_id, title, track_number, duration_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(external_id) DO NOTHING",
            )?;
            for track in tracks {
                stmt.execute(params![
                    track.external_id,
                    album_id,
                    artist_id,
                    track.title,
                    track.track_number,
                    track.duration_ms
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn entity_exists(&self, entity_type: RatedEntity, entity_id: i64) -> Result<bool> {
        let conn = self.read_conn.lock().unwrap();
        let sql = match entity_type {
            RatedEntity::Album => "SELECT 1 FROM albums WHERE id = ?1",
            RatedEntity::Track => "SELECT 1 FROM tracks WHERE id = ?1",
        };
        let exists = conn
            .query_row(sql, params![entity_id], |_| Ok(()))
            .optional()?
            .is_some();
        Ok(exists)
    }

    fn upsert_rating(
        &self,
        user_id: &str,
        entity_type: RatedEntity,
        entity_id: i64,
        value: f64,
    ) -> Result<Rating> {
        let mut conn = self.write_conn.lock().unwrap();
        let tx = conn.transaction()?;

        let updated_at = now_unix();
        tx.execute(
            "INSERT INTO ratings (user_id, entity_type, entity_id, value, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id, entity_type, entity_id) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            params![user_id, entity_type.to_int(), entity_id, value, updated_at],
        )
        .context("Failed to upsert rating")?;

        Self::recompute_aggregates(&tx, entity_type, entity_id)?;
        tx.commit()?;

        Ok(Rating {
            user_id: user_id.to_string(),
            entity_type,
            entity_id,
            value,
            updated_at,
        })
    }

    fn get_rating(
        &self,
        user_id: &str,
        entity_type: RatedEntity,
        entity_id: i64,
    ) -> Result<Option<Rating>> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT value, updated_at FROM ratings
             WHERE user_id = ?1 AND entity_type = ?2 AND entity_id = ?3",
        )?;
        let row = stmt
            .query_row(params![user_id, entity_type.to_int(), entity_id], |r| {
                Ok((r.get::<_, f64>(0)?, r.get::<_, i64>(1)?))
            })
            .optional()?;
        Ok(row.map(|(value, updated_at)| Rating {
            user_id: user_id.to_string(),
            entity_type,
            entity_id,
            value,
            updated_at,
        }))
    }

    fn delete_rating(
        &self,
        user_id: &str,
        entity_type: RatedEntity,
        entity_id: i64,
    ) -> Result<bool> {
        let mut conn = self.write_conn.lock().unwrap();
        let tx = conn.transaction()?;

        let deleted = tx.execute(
            "DELETE FROM ratings WHERE user_id = ?1 AND entity_type = ?2 AND entity_id = ?3",
            params![user_id, entity_type.to_int(), entity_id],
        )?;
        Self::recompute_aggregates(&tx, entity_type, entity_id)?;

        tx.commit()?;
        Ok(deleted > 0)
    }

    fn count_artists(&self) -> Result<usize> {
        let conn = self.read_conn.lock().unwrap();
        Ok(conn.query_row("SELECT COUNT(*) FROM artists", [], |r| r.get(0))?)
    }

    fn count_albums(&self) -> Result<usize> {
        let conn = self.read_conn.lock().unwrap();
        Ok(conn.query_row("SELECT COUNT(*) FROM albums", [], |r| r.get(0))?)
    }

    fn count_tracks(&self) -> Result<usize> {
        let conn = self.read_conn.lock().unwrap();
        Ok(conn.query_row("SELECT COUNT(*) FROM tracks", [], |r| r.get(0))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (SqliteCatalogStore, TempDir) {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("catalog.db");
        let store = SqliteCatalogStore::new(&db_path).unwrap();
        (store, tmp)
    }

    fn make_artist(external_id: &str) -> NewArtist {
        NewArtist {
            external_id: external_id.to_string(),
            name: "Test Artist".to_string(),
            country: Some("GB".to_string()),
            formed_year: Some(1970),
            genres: vec!["rock".to_string(), "pop".to_string()],
        }
    }

    fn make_album(external_id: &str, artist_id: i64) -> NewAlbum {
        NewAlbum {
            external_id: external_id.to_string(),
            artist_id,
            title: "Test Album".to_string(),
            release_date: Some("1979-11-30".to_string()),
            album_type: Some("Album".to_string()),
            cover_url: Some("http://art/cover.jpg".to_string()),
        }
    }

    fn make_tracks(n: usize) -> Vec<NewTrack> {
        (1..=n)
            .map(|i| NewTrack {
                external_id: format!("rec-{}", i),
                title: format!("Track {}", i),
                track_number: Some(i as i32),
                duration_ms: Some(180_000),
            })
            .collect()
    }

    fn seed_album(store: &SqliteCatalogStore) -> (i64, i64) {
        let artist_id = store.insert_artist_if_absent(&make_artist("ar-1")).unwrap();
        let album_id = store
            .insert_album_if_absent(&make_album("rg-1", artist_id))
            .unwrap();
        store
            .insert_tracks(album_id, artist_id, &make_tracks(3))
            .unwrap();
        (artist_id, album_id)
    }

    // =========================================================================
    // Entity persistence
    // =========================================================================

    #[test]
    fn insert_artist_if_absent_is_first_writer_wins() {
        let (store, _tmp) = create_test_store();

        let first = store.insert_artist_if_absent(&make_artist("ar-1")).unwrap();
        let mut second_payload = make_artist("ar-1");
        second_payload.name = "Late Duplicate".to_string();
        let second = store.insert_artist_if_absent(&second_payload).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.count_artists().unwrap(), 1);
        // The winner's data stands.
        let artist = store.get_artist_by_external_id("ar-1").unwrap().unwrap();
        assert_eq!(artist.name, "Test Artist");
    }

    #[test]
    fn upsert_artist_refreshes_name_and_genres() {
        let (store, _tmp) = create_test_store();

        let id = store.upsert_artist(&make_artist("ar-1")).unwrap();

        let mut refreshed = make_artist("ar-1");
        refreshed.name = "Renamed".to_string();
        refreshed.genres = vec!["jazz".to_string()];
        let id_again = store.upsert_artist(&refreshed).unwrap();

        assert_eq!(id, id_again);
        let artist = store.get_artist_by_external_id("ar-1").unwrap().unwrap();
        assert_eq!(artist.name, "Renamed");
        assert_eq!(artist.genres, vec!["jazz".to_string()]);
        // country survives an upsert that does not carry one
        assert_eq!(artist.country.as_deref(), Some("GB"));
    }

    #[test]
    fn genres_keep_insertion_order() {
        let (store, _tmp) = create_test_store();
        let mut artist = make_artist("ar-1");
        artist.genres = vec![
            "zeuhl".to_string(),
            "ambient".to_string(),
            "krautrock".to_string(),
        ];
        store.insert_artist_if_absent(&artist).unwrap();

        let stored = store.get_artist_by_external_id("ar-1").unwrap().unwrap();
        assert_eq!(stored.genres, artist.genres);
    }

    #[test]
    fn insert_album_if_absent_is_idempotent() {
        let (store, _tmp) = create_test_store();
        let artist_id = store.insert_artist_if_absent(&make_artist("ar-1")).unwrap();

        let first = store
            .insert_album_if_absent(&make_album("rg-1", artist_id))
            .unwrap();
        let second = store
            .insert_album_if_absent(&make_album("rg-1", artist_id))
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.count_albums().unwrap(), 1);
    }

    #[test]
    fn insert_tracks_ignores_duplicates() {
        let (store, _tmp) = create_test_store();
        let (artist_id, album_id) = seed_album(&store);

        // Re-inserting the same tracklist must not create duplicate rows.
        store
            .insert_tracks(album_id, artist_id, &make_tracks(3))
            .unwrap();

        assert_eq!(store.count_tracks().unwrap(), 3);
        let tracks = store.get_album_tracks(album_id).unwrap();
        assert_eq!(tracks.len(), 3);
        assert_eq!(tracks[0].track_number, Some(1));
        assert_eq!(tracks[2].track_number, Some(3));
    }

    #[test]
    fn tracks_with_unparseable_numbers_sort_last() {
        let (store, _tmp) = create_test_store();
        let artist_id = store.insert_artist_if_absent(&make_artist("ar-1")).unwrap();
        let album_id = store
            .insert_album_if_absent(&make_album("rg-1", artist_id))
            .unwrap();

        let tracks = vec![
            NewTrack {
                external_id: "rec-bonus".to_string(),
                title: "Hidden Bonus".to_string(),
                track_number: None,
                duration_ms: None,
            },
            NewTrack {
                external_id: "rec-1".to_string(),
                title: "Opener".to_string(),
                track_number: Some(1),
                duration_ms: Some(100_000),
            },
        ];
        store.insert_tracks(album_id, artist_id, &tracks).unwrap();

        let stored = store.get_album_tracks(album_id).unwrap();
        assert_eq!(stored[0].title, "Opener");
        assert_eq!(stored[1].title, "Hidden Bonus");
        assert_eq!(stored[1].track_number, None);
    }

    #[test]
    fn album_lookup_joins_owning_artist() {
        let (store, _tmp) = create_test_store();
        seed_album(&store);

        let found = store.get_album_by_external_id("rg-1").unwrap().unwrap();
        assert_eq!(found.album.title, "Test Album");
        assert_eq!(found.artist_name, "Test Artist");
        assert_eq!(found.artist_external_id, "ar-1");

        assert!(store.get_album_by_external_id("rg-missing").unwrap().is_none());
    }

    #[test]
    fn batched_album_lookup_returns_only_known_ids() {
        let (store, _tmp) = create_test_store();
        seed_album(&store);

        let hits = store
            .get_albums_by_external_ids(&[
                "rg-1".to_string(),
                "rg-unknown".to_string(),
            ])
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].external_id, "rg-1");

        assert!(store.get_albums_by_external_ids(&[]).unwrap().is_empty());
    }

    #[test]
    fn artist_albums_newest_first() {
        let (store, _tmp) = create_test_store();
        let artist_id = store.insert_artist_if_absent(&make_artist("ar-1")).unwrap();

        let mut old = make_album("rg-old", artist_id);
        old.release_date = Some("1971-01-01".to_string());
        let mut new = make_album("rg-new", artist_id);
        new.release_date = Some("1999-01-01".to_string());
        store.insert_album_if_absent(&old).unwrap();
        store.insert_album_if_absent(&new).unwrap();

        let albums = store.get_artist_albums(artist_id).unwrap();
        assert_eq!(albums[0].external_id, "rg-new");
        assert_eq!(albums[1].external_id, "rg-old");
    }

    // =========================================================================
    // Ratings
    // =========================================================================

    #[test]
    fn rating_upsert_recomputes_album_aggregates() {
        let (store, _tmp) = create_test_store();
        let (_, album_id) = seed_album(&store);

        store
            .upsert_rating("u1", RatedEntity::Album, album_id, 7.5)
            .unwrap();
        store
            .upsert_rating("u2", RatedEntity::Album, album_id, 8.0)
            .unwrap();

        let album = store.get_album_by_external_id("rg-1").unwrap().unwrap().album;
        assert_eq!(album.rating_count, 2);
        assert!((album.avg_rating - 7.75).abs() < 1e-9);
    }

    #[test]
    fn rating_resubmission_updates_in_place() {
        let (store, _tmp) = create_test_store();
        let (_, album_id) = seed_album(&store);

        store
            .upsert_rating("u1", RatedEntity::Album, album_id, 4.0)
            .unwrap();
        store
            .upsert_rating("u1", RatedEntity::Album, album_id, 9.5)
            .unwrap();

        let album = store.get_album_by_external_id("rg-1").unwrap().unwrap().album;
        assert_eq!(album.rating_count, 1);
        assert!((album.avg_rating - 9.5).abs() < 1e-9);

        let rating = store
            .get_rating("u1", RatedEntity::Album, album_id)
            .unwrap()
            .unwrap();
        assert!((rating.value - 9.5).abs() < 1e-9);
    }

    #[test]
    fn rating_average_is_rounded_to_two_decimals() {
        let (store, _tmp) = create_test_store();
        let (_, album_id) = seed_album(&store);

        // 7.5, 8.0, 8.0 → 23.5 / 3 = 7.8333… → 7.83
        for (user, value) in [("u1", 7.5), ("u2", 8.0), ("u3", 8.0)] {
            store
                .upsert_rating(user, RatedEntity::Album, album_id, value)
                .unwrap();
        }

        let album = store.get_album_by_external_id("rg-1").unwrap().unwrap().album;
        assert!((album.avg_rating - 7.83).abs() < 1e-9);
    }

    #[test]
    fn track_ratings_land_on_the_track_row() {
        let (store, _tmp) = create_test_store();
        let (_, album_id) = seed_album(&store);
        let track_id = store.get_album_tracks(album_id).unwrap()[0].id;

        store
            .upsert_rating("u1", RatedEntity::Track, track_id, 10.0)
            .unwrap();

        let tracks = store.get_album_tracks(album_id).unwrap();
        assert_eq!(tracks[0].rating_count, 1);
        assert!((tracks[0].avg_rating - 10.0).abs() < 1e-9);
        // Sibling tracks and the album itself are untouched.
        assert_eq!(tracks[1].rating_count, 0);
        let album = store.get_album_by_external_id("rg-1").unwrap().unwrap().album;
        assert_eq!(album.rating_count, 0);
    }

    #[test]
    fn delete_rating_recomputes_and_is_idempotent() {
        let (store, _tmp) = create_test_store();
        let (_, album_id) = seed_album(&store);

        store
            .upsert_rating("u1", RatedEntity::Album, album_id, 6.0)
            .unwrap();

        assert!(store
            .delete_rating("u1", RatedEntity::Album, album_id)
            .unwrap());
        let album = store.get_album_by_external_id("rg-1").unwrap().unwrap().album;
        assert_eq!(album.rating_count, 0);
        assert!((album.avg_rating - 0.0).abs() < 1e-9);

        // Deleting an absent rating succeeds without touching anything.
        assert!(!store
            .delete_rating("u1", RatedEntity::Album, album_id)
            .unwrap());
    }

    #[test]
    fn entity_exists_checks_the_right_table() {
        let (store, _tmp) = create_test_store();
        let (_, album_id) = seed_album(&store);
        let track_id = store.get_album_tracks(album_id).unwrap()[0].id;

        assert!(store.entity_exists(RatedEntity::Album, album_id).unwrap());
        assert!(store.entity_exists(RatedEntity::Track, track_id).unwrap());
        assert!(!store.entity_exists(RatedEntity::Album, 9999).unwrap());
    }
}
