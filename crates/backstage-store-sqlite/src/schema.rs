//! SQL schema for the Backstage SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS theaters (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    name         TEXT NOT NULL,
    slug         TEXT NOT NULL,
    street       TEXT NOT NULL,
    number       TEXT,
    neighborhood TEXT,
    city         TEXT NOT NULL,
    state        TEXT NOT NULL,
    postal_code  TEXT,
    country      TEXT NOT NULL DEFAULT 'BR',
    lng          REAL,
    lat          REAL,
    website      TEXT,
    instagram    TEXT,
    phone        TEXT,
    email        TEXT,
    photo        TEXT,             -- base64 or data URL
    created_at   TEXT NOT NULL,    -- RFC 3339 UTC, fixed width
    updated_at   TEXT NOT NULL,
    CHECK ((lng IS NULL) = (lat IS NULL))
);

CREATE UNIQUE INDEX IF NOT EXISTS theaters_slug_idx ON theaters(slug);

CREATE TABLE IF NOT EXISTS performances (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    name           TEXT NOT NULL,
    synopsis       TEXT NOT NULL,
    tags           TEXT NOT NULL DEFAULT '[]',   -- JSON array of strings
    classification TEXT NOT NULL,                -- 'Livre' | '10' | ... | '18'
    season         INTEGER NOT NULL,
    dramaturgy     TEXT NOT NULL DEFAULT '[]',
    direction      TEXT NOT NULL DEFAULT '[]',
    cast_list      TEXT NOT NULL DEFAULT '[]',
    crew           TEXT NOT NULL DEFAULT '[]',   -- JSON array of {role, people}
    banner         TEXT,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS performances_season_idx ON performances(season);
CREATE INDEX IF NOT EXISTS performances_classification_idx ON performances(classification);

-- Sessions pin a theater (which may not be deleted while referenced) and
-- optionally belong to a performance (deleted along with it).
CREATE TABLE IF NOT EXISTS sessions (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    starts_at      TEXT NOT NULL,
    theater_id     INTEGER NOT NULL REFERENCES theaters(id) ON DELETE RESTRICT,
    performance_id INTEGER REFERENCES performances(id) ON DELETE CASCADE,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS sessions_performance_idx ON sessions(performance_id);
CREATE INDEX IF NOT EXISTS sessions_theater_idx     ON sessions(theater_id);
CREATE INDEX IF NOT EXISTS sessions_starts_idx      ON sessions(starts_at);

-- Full-text index over name, synopsis and tags; kept in sync by triggers.
CREATE VIRTUAL TABLE IF NOT EXISTS performances_fts USING fts5(
    name, synopsis, tags,
    content = 'performances',
    content_rowid = 'id',
    tokenize = 'unicode61 remove_diacritics 2'
);

CREATE TRIGGER IF NOT EXISTS performances_fts_ai AFTER INSERT ON performances BEGIN
    INSERT INTO performances_fts(rowid, name, synopsis, tags)
    VALUES (new.id, new.name, new.synopsis, new.tags);
END;

CREATE TRIGGER IF NOT EXISTS performances_fts_ad AFTER DELETE ON performances BEGIN
    INSERT INTO performances_fts(performances_fts, rowid, name, synopsis, tags)
    VALUES ('delete', old.id, old.name, old.synopsis, old.tags);
END;

CREATE TRIGGER IF NOT EXISTS performances_fts_au AFTER UPDATE ON performances BEGIN
    INSERT INTO performances_fts(performances_fts, rowid, name, synopsis, tags)
    VALUES ('delete', old.id, old.name, old.synopsis, old.tags);
    INSERT INTO performances_fts(rowid, name, synopsis, tags)
    VALUES (new.id, new.name, new.synopsis, new.tags);
END;

PRAGMA user_version = 1;
";
