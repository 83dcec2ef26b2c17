//! Typed models for the embedded store.
//!
//! Each entity mirrors the application's in-memory field convention
//! (camelCase record keys via serde), with CRUD implemented as runtime
//! sqlx queries. Row IDs are opaque strings minted by the creating side
//! (UUID v4), never by the store.

pub mod attachment;
pub mod comment;
pub mod project;
pub mod project_member;
pub mod task;
pub mod task_status;
pub mod user;

pub use attachment::Attachment;
pub use comment::Comment;
pub use project::Project;
pub use project_member::ProjectMember;
pub use task::Task;
pub use task_status::TaskStatus;
pub use user::User;

use chrono::{DateTime, SecondsFormat, Utc};

/// Mint a new opaque row id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Serialize a timestamp for storage (RFC 3339, millisecond precision).
pub(crate) fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serialize an optional timestamp for storage.
pub(crate) fn opt_ts(dt: &Option<DateTime<Utc>>) -> Option<String> {
    dt.as_ref().map(ts)
}
