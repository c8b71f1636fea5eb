//! # Job monitoring
//!
//! Client-side pipeline over the jobs collection: a poller keeps the raw
//! collection fresh, a pure projection derives the display list, and a small
//! state machine tracks the job opened for inspection.

pub mod monitor;
pub mod selection;
pub mod source;
pub mod view;

pub use monitor::{JobMonitor, MonitorHandle, MonitorOptions, MonitorSnapshot};
pub use selection::Selection;
pub use source::JobSource;
pub use view::{JobQuery, SortField, SortOrder, StatusFilter, project};
