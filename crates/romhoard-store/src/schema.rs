//! SQL schema for the RomHoard cache database.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per (identity, kind, source) triple. The whole table is replaced
-- on every full flush; the in-memory arena is the working copy.
CREATE TABLE IF NOT EXISTS facts (
    identity    TEXT NOT NULL,   -- content or filename hash
    kind        TEXT NOT NULL,   -- ResourceKind discriminant
    source      TEXT NOT NULL,   -- backend name or 'user'
    value       TEXT NOT NULL,   -- attribute text, or media-relative path
    recorded_at TEXT NOT NULL,   -- ISO 8601 UTC; store-assigned
    PRIMARY KEY (identity, kind, source)
);

-- Side index: skip re-hashing files whose mtime has not moved.
CREATE TABLE IF NOT EXISTS quick_ids (
    file_path  TEXT PRIMARY KEY,
    checked_at TEXT NOT NULL,    -- ISO 8601 UTC; when the identity was computed
    identity   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS facts_identity_idx     ON facts(identity);
CREATE INDEX IF NOT EXISTS quick_ids_identity_idx ON quick_ids(identity);

PRAGMA user_version = 1;
";
