//! SQLite schema for the local catalog database.
//!
//! Primary keys are integer rowids; every entity table carries the
//! external service's stable id under a UNIQUE constraint, which is what
//! the resolver's check-else-insert path leans on when two tasks race to
//! persist the same entity.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
};

const ARTIST_FK: ForeignKey = ForeignKey {
    foreign_table: "artists",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const ALBUM_FK: ForeignKey = ForeignKey {
    foreign_table: "albums",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const ARTISTS_TABLE: Table = Table {
    name: "artists",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("external_id", &SqlType::Text, non_null = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("country", &SqlType::Text),
        sqlite_column!("formed_year", &SqlType::Integer),
    ],
    indices: &[("idx_artists_external_id", "external_id")],
    unique_constraints: &[&["external_id"]],
};

/// Ordered genre tags, at most five per artist; re-derived on repeated
/// artist resolution.
const ARTIST_GENRES_TABLE: Table = Table {
    name: "artist_genres",
    columns: &[
        sqlite_column!(
            "artist_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ARTIST_FK)
        ),
        sqlite_column!("genre", &SqlType::Text, non_null = true),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_artist_genres_artist", "artist_id")],
    unique_constraints: &[],
};

const ALBUMS_TABLE: Table = Table {
    name: "albums",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("external_id", &SqlType::Text, non_null = true),
        sqlite_column!(
            "artist_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ARTIST_FK)
        ),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("release_date", &SqlType::Text), // normalized full date
        sqlite_column!("album_type", &SqlType::Text),
        sqlite_column!("cover_url", &SqlType::Text),
        sqlite_column!(
            "avg_rating",
            &SqlType::Real,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "rating_count",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[
        ("idx_albums_external_id", "external_id"),
        ("idx_albums_artist", "artist_id"),
    ],
    unique_constraints: &[&["external_id"]],
};

const TRACKS_TABLE: Table = Table {
    name: "tracks",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("external_id", &SqlType::Text, non_null = true),
        sqlite_column!(
            "album_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ALBUM_FK)
        ),
        sqlite_column!(
            "artist_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ARTIST_FK)
        ),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("track_number", &SqlType::Integer), // absent when unparseable
        sqlite_column!("duration_ms", &SqlType::Integer),
        sqlite_column!(
            "avg_rating",
            &SqlType::Real,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "rating_count",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[
        ("idx_tracks_external_id", "external_id"),
        ("idx_tracks_album", "album_id"),
    ],
    unique_constraints: &[&["external_id"]],
};

/// One rating per (user, entity kind, entity). No foreign key: the target
/// table depends on entity_type; existence is checked by the aggregation
/// path before the upsert.
const RATINGS_TABLE: Table = Table {
    name: "ratings",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("user_id", &SqlType::Text, non_null = true),
        sqlite_column!("entity_type", &SqlType::Integer, non_null = true),
        sqlite_column!("entity_id", &SqlType::Integer, non_null = true),
        sqlite_column!("value", &SqlType::Real, non_null = true),
        sqlite_column!("updated_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_ratings_entity", "entity_type, entity_id")],
    unique_constraints: &[&["user_id", "entity_type", "entity_id"]],
};

pub const CATALOG_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        ARTISTS_TABLE,
        ARTIST_GENRES_TABLE,
        ALBUMS_TABLE,
        TRACKS_TABLE,
        RATINGS_TABLE,
    ],
    migration: None,
}];
