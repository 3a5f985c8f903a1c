//! Admin dashboard client
//!
//! Everything the dashboard needs to drive the backend without a UI:
//! - [`CmsApi`] / [`HttpApi`]: typed calls over reqwest
//! - [`QueryCache`]: cached reads, invalidate-on-mutation, polling
//! - [`InFlightGuard`]: one outstanding call per action id
//! - [`Notifications`]: non-blocking success/error messages
//! - [`AuthContext`]: explicit capability flags

pub mod api;
pub mod auth;
pub mod error;
pub mod guard;
pub mod notify;
pub mod query;

#[cfg(test)]
pub(crate) mod fake;

pub use api::{form_link, CmsApi, HttpApi};
pub use auth::AuthContext;
pub use error::{ClientError, FALLBACK_MESSAGE};
pub use guard::{actions, InFlightGuard, InFlightToken};
pub use notify::{Notification, NotificationLevel, Notifications};
pub use query::{PollHandle, QueryCache, QueryKey, Subscription};
