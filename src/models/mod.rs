//! # Data Models
//!
//! Read-only records returned by the dashboard API. The server is the sole
//! writer; the client only deserializes, inspects and projects these values.

pub mod account;
pub mod email;
pub mod job;
pub mod timestamp;
pub mod user;

pub use account::{AccountSummary, AuthorizationLink, ConnectedAccount, NewAccount};
pub use email::EmailRecord;
pub use job::{Job, JobStats, JobStatus, payload_account_id};
pub use user::{LoginResponse, RegisterRequest, Role, UserProfile};
