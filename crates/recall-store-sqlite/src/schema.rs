//! SQL schema for the Recall SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision for later migrations.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS decks (
    deck_id     TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL,
    name        TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    is_public   INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cards (
    card_id       TEXT PRIMARY KEY,
    deck_id       TEXT NOT NULL REFERENCES decks(deck_id) ON DELETE CASCADE,
    front         TEXT NOT NULL,
    back          TEXT NOT NULL,
    pronunciation TEXT NOT NULL DEFAULT '',
    created_at    TEXT NOT NULL
);

-- One row per (user, card) once the card has been reviewed.
-- `version` increases by one on every committed write.
CREATE TABLE IF NOT EXISTS card_progress (
    user_id          TEXT NOT NULL,
    card_id          TEXT NOT NULL REFERENCES cards(card_id) ON DELETE CASCADE,
    easiness_factor  REAL NOT NULL,
    repetitions      INTEGER NOT NULL,
    interval_days    INTEGER NOT NULL,
    due_at           TEXT NOT NULL,   -- fixed-width RFC 3339 UTC, sorts as text
    last_reviewed_at TEXT,
    lapses           INTEGER NOT NULL DEFAULT 0,
    version          INTEGER NOT NULL,
    PRIMARY KEY (user_id, card_id),
    CHECK (version > 0)
);

CREATE TABLE IF NOT EXISTS study_sessions (
    session_id    TEXT PRIMARY KEY,
    user_id       TEXT NOT NULL,
    deck_id       TEXT NOT NULL REFERENCES decks(deck_id) ON DELETE CASCADE,
    started_at    TEXT NOT NULL,
    ended_at      TEXT,
    cards_studied INTEGER NOT NULL DEFAULT 0,
    cards_correct INTEGER NOT NULL DEFAULT 0,
    cards_lapsed  INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS decks_owner_idx      ON decks(user_id, created_at);
CREATE INDEX IF NOT EXISTS cards_deck_idx       ON cards(deck_id, created_at);
CREATE INDEX IF NOT EXISTS progress_due_idx     ON card_progress(user_id, due_at);
CREATE INDEX IF NOT EXISTS sessions_user_idx    ON study_sessions(user_id, started_at);

PRAGMA user_version = 1;
";
