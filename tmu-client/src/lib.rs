// Library interface for the TMU Times client
#[macro_use]
pub mod logging;

pub mod announcements;
pub mod api;
pub mod compose;
pub mod config;
pub mod elections;
pub mod error;
pub mod feed;
pub mod format;
pub mod profile;
pub mod session;
pub mod sidebar;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use error::{ActionError, ActionResult, ValidationError};
