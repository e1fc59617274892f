//! Application-wide constants: identity, environment variable names, and
//! tunable defaults. Centralized here so `core::cli` and `core::config` stay
//! in sync and every default has exactly one source of truth.

// =============================================================================
// Application Identity
// =============================================================================

pub const APP_NAME: &str = "ShareChat";
pub const APP_NAME_LOWER: &str = "sharechat";
pub const APP_DOT_FOLDER: &str = ".sharechat";

// =============================================================================
// Configuration Files
// =============================================================================

pub const CONFIG_FILE_NAME: &str = "sharechat.json";
pub const ENV_CONFIG: &str = "SHARECHAT_CONFIG";

// =============================================================================
// Environment Variables - Debug / Logging
// =============================================================================

pub const ENV_DEBUG: &str = "SHARECHAT_DEBUG";
pub const ENV_LOG: &str = "SHARECHAT_LOG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

pub const ENV_HOST: &str = "SHARECHAT_HOST";
pub const ENV_PORT: &str = "SHARECHAT_PORT";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5380;

// =============================================================================
// CORS
// =============================================================================

pub const ENV_CORS_ORIGINS: &str = "SHARECHAT_CORS_ORIGINS";

// =============================================================================
// Database Backends
// =============================================================================

pub const ENV_DATABASE_BACKEND: &str = "SHARECHAT_DATABASE_BACKEND";
pub const ENV_POSTGRES_URL: &str = "SHARECHAT_POSTGRES_URL";

pub const POSTGRES_DEFAULT_MAX_CONNECTIONS: u32 = 20;
pub const POSTGRES_DEFAULT_MIN_CONNECTIONS: u32 = 2;
pub const POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;
pub const POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;
pub const POSTGRES_DEFAULT_MAX_LIFETIME_SECS: u64 = 1800;
pub const POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// Pub/Sub Backends
// =============================================================================

pub const ENV_PUBSUB_BACKEND: &str = "SHARECHAT_PUBSUB_BACKEND";
pub const ENV_REDIS_URL: &str = "SHARECHAT_REDIS_URL";
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/0";

// =============================================================================
// Room / Participant Tuning
// =============================================================================

/// How long a room-pump fan-out send may block on one slow participant before
/// it is dropped for that message only.
pub const ENV_FANOUT_TIMEOUT_MS: &str = "SHARECHAT_FANOUT_TIMEOUT_MS";
pub const DEFAULT_FANOUT_TIMEOUT_MS: u64 = 2_000;

/// How long `ServeRoom` waits for the Reader/Writer ready handshakes.
pub const ENV_READY_TIMEOUT_MS: &str = "SHARECHAT_READY_TIMEOUT_MS";
pub const DEFAULT_READY_TIMEOUT_MS: u64 = 5_000;

/// Per-room inbound/roster channel capacity.
pub const ROOM_CHANNEL_CAPACITY: usize = 256;

/// Per-participant inbound/outbound channel capacity.
pub const PARTICIPANT_CHANNEL_CAPACITY: usize = 64;

// =============================================================================
// Message Pagination
// =============================================================================

pub const DEFAULT_MESSAGE_PAGE_LIMIT: i64 = 100;
pub const MAX_MESSAGE_PAGE_LIMIT: i64 = 500;

// =============================================================================
// HTTP
// =============================================================================

/// Max request body size accepted by the API (a chat body is small; this
/// guards against accidental huge uploads on `POST /api/room`).
pub const DEFAULT_BODY_LIMIT: usize = 64 * 1024;

// =============================================================================
// Shutdown
// =============================================================================

pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;
