//! iCloud CalDAV client for shiftcal external calendar sync.
//!
//! Authentication uses an Apple ID plus an app-specific password; the
//! server stores those per linked calendar and passes them in as
//! [`Credentials`]. The flow is:
//!
//! 1. [`discovery::discover`] — resolve the account's principal and
//!    calendar-home URLs from the well-known endpoint
//! 2. [`discovery::list_calendars`] — enumerate calendar collections
//! 3. [`caldav::fetch_events`] — time-ranged `calendar-query` REPORT,
//!    parsed into flat [`event::RemoteEvent`]s

pub mod caldav;
pub mod discovery;
pub mod event;

pub use caldav::fetch_events;
pub use discovery::{DiscoveredAccount, RemoteCalendar, discover, list_calendars};
pub use event::RemoteEvent;

/// Well-known iCloud CalDAV endpoint. Requests are redirected from here to
/// the user-specific pXX-caldav.icloud.com host.
pub const CALDAV_ENDPOINT: &str = "https://caldav.icloud.com";

/// Apple ID + app-specific password for CalDAV basic auth.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub apple_id: String,
    pub app_password: String,
}

impl Credentials {
    pub fn new(apple_id: impl Into<String>, app_password: impl Into<String>) -> Self {
        Credentials {
            apple_id: apple_id.into(),
            app_password: app_password.into(),
        }
    }
}
