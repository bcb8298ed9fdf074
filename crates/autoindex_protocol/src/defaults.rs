//! Canonical default values shared by the index and the server.

pub const APP_NAME: &str = "autoindex";
pub const DEFAULT_ROOT: &str = ".";
pub const DEFAULT_HTTP_ADDR: &str = "::";
pub const DEFAULT_HTTP_PORT: u16 = 80;
pub const DEFAULT_TTL_SECS: u64 = 60;
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_MAX_ENTRY_SIZE_BYTES: usize = 10 * 1024;
pub const DEFAULT_SHARD_COUNT: usize = 1024;
pub const MIN_MAX_SIZE_BYTES: u64 = 1024 * 1024;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const NOT_FOUND_BODY: &str = r#"{"code":404}"#;
