//! PostgreSQL schema definitions for the chat domain.

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema SQL for PostgreSQL.
pub const SCHEMA: &str = r#"
-- =============================================================================
-- Infrastructure: Schema version tracking
-- =============================================================================
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    applied_at BIGINT NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at BIGINT NOT NULL,
    checksum TEXT NOT NULL,
    execution_time_ms INTEGER,
    success BOOLEAN NOT NULL DEFAULT TRUE
);

-- =============================================================================
-- Rooms
-- =============================================================================
CREATE TABLE IF NOT EXISTS rooms (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

-- =============================================================================
-- Members: current roster per room. Removed members are deleted, not
-- soft-deleted; the MemberLeft message is the durable record of departure.
-- =============================================================================
CREATE TABLE IF NOT EXISTS members (
    id UUID PRIMARY KEY,
    room_id UUID NOT NULL REFERENCES rooms(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    joined_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS idx_members_room_id ON members(room_id);

-- =============================================================================
-- Messages: append-only event log. (sent, id) is the pagination ordering.
-- =============================================================================
CREATE TABLE IF NOT EXISTS messages (
    id UUID PRIMARY KEY,
    room_id UUID NOT NULL REFERENCES rooms(id) ON DELETE CASCADE,
    member_id UUID NOT NULL,
    member_name TEXT NOT NULL,
    message_type TEXT NOT NULL,
    body TEXT NOT NULL DEFAULT '',
    sent TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS idx_messages_room_sent_id ON messages(room_id, sent, id);
"#;

/// No seed data needed.
pub const DEFAULT_DATA: &str = "";
