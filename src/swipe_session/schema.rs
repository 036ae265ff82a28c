use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};

/// V 0
pub const SWIPE_SESSION_TABLE_V_0: Table = Table {
    name: "swipe_session",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("owner_id", &SqlType::Text, non_null = true),
        // JSON array
        sqlite_column!("seed_ids", &SqlType::Text, non_null = true),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
        sqlite_column!("completed_at", &SqlType::Integer),
        // Optimistic concurrency token
        sqlite_column!(
            "version",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[("idx_swipe_session_owner_id", "owner_id")],
    unique_constraints: &[],
};

pub const SWIPE_DECISION_TABLE_V_0: Table = Table {
    name: "swipe_decision",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            non_null = true
        ),
        sqlite_column!(
            "session_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "swipe_session",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("track_key", &SqlType::Text, non_null = true),
        sqlite_column!("decision", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_swipe_decision_session_id", "session_id")],
    unique_constraints: &[&["session_id", "track_key"]],
};

pub static VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[SWIPE_SESSION_TABLE_V_0, SWIPE_DECISION_TABLE_V_0],
    migration: None,
}];
