//! ICS parsing using the icalendar crate's parser.
//!
//! Only the fields shiftcal surfaces for external events are extracted:
//! uid, summary, times, location, description. Recurrence expansion is left
//! to the caller's display layer; the CalDAV time-range REPORT already
//! scopes what comes back.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{read_calendar, unfold},
};

/// A flat event as fetched from the remote calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEvent {
    pub uid: String,
    pub summary: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub all_day: bool,
    pub location: Option<String>,
    pub description: Option<String>,
}

/// Parse every VEVENT in an ICS document. Components missing a UID or a
/// parseable DTSTART are skipped rather than failing the whole document.
pub fn parse_events(content: &str) -> Vec<RemoteEvent> {
    let unfolded = unfold(content);
    let Ok(calendar) = read_calendar(&unfolded) else {
        return Vec::new();
    };

    calendar
        .components
        .iter()
        .filter(|c| c.name == "VEVENT")
        .filter_map(|vevent| {
            let uid = vevent.find_prop("UID")?.val.to_string();
            let summary = vevent
                .find_prop("SUMMARY")
                .map(|p| p.val.to_string())
                .unwrap_or_else(|| "(No title)".to_string());

            let start_prop = vevent.find_prop("DTSTART")?;
            let start = DatePerhapsTime::try_from(start_prop).ok()?;
            let all_day = matches!(start, DatePerhapsTime::Date(_));
            let starts_at = to_utc(&start);

            let ends_at = vevent
                .find_prop("DTEND")
                .and_then(|p| DatePerhapsTime::try_from(p).ok())
                .map(|end| to_utc(&end))
                .unwrap_or_else(|| default_end(starts_at, all_day));

            let location = vevent.find_prop("LOCATION").map(|p| p.val.to_string());
            let description = vevent.find_prop("DESCRIPTION").map(|p| p.val.to_string());

            Some(RemoteEvent {
                uid,
                summary,
                starts_at,
                ends_at,
                all_day,
                location,
                description,
            })
        })
        .collect()
}

/// Collapse the ICS time forms to UTC. Floating and timezone-qualified
/// times are taken at face value; iCloud serves Zulu times in REPORT
/// responses, so the lossy cases are rare in practice.
fn to_utc(time: &DatePerhapsTime) -> DateTime<Utc> {
    match time {
        DatePerhapsTime::Date(date) => start_of_day(*date),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => *dt,
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(dt)) => dt.and_utc(),
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, .. }) => {
            date_time.and_utc()
        }
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .expect("midnight always exists")
        .and_utc()
}

fn default_end(start: DateTime<Utc>, all_day: bool) -> DateTime<Utc> {
    if all_day {
        start + Duration::days(1)
    } else {
        start + Duration::hours(1)
    }
}
