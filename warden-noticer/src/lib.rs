//! Noticer runtime: long-poll the control socket for notices, classify them
//! into workload events, and dispatch one probe invocation per event.

mod error;
pub mod pending;
pub mod rotation;
mod runtime;

pub use error::NoticerError;
pub use pending::PendingEvents;
pub use runtime::{run, start_blocking, NoticeSource, NoticerConfig};
