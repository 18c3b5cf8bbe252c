//! Command handlers
//!
//! Each handler reads its argument from the session, talks to the drivers
//! and writes its own replies. Only control connection failures propagate
//! as fatal errors.

pub mod auth;
pub mod dirs;
pub mod files;
pub mod misc;

use std::sync::Arc;

use crate::client::Session;
use crate::driver::ClientHandlingDriver;
use crate::error::SessionError;

/// Filesystem driver of the session; replies `530` when there is none.
pub(crate) async fn require_driver(
    session: &mut Session,
) -> Result<Option<Arc<dyn ClientHandlingDriver>>, SessionError> {
    match session.fs_driver() {
        Some(driver) => Ok(Some(driver)),
        None => {
            session
                .reply(530, "Please login with USER and PASS")
                .await?;
            Ok(None)
        }
    }
}
