//! Account discovery and calendar enumeration.
//!
//! iCloud CalDAV discovery:
//! 1. `current-user-principal` lookup on the well-known endpoint
//! 2. `calendar-home-set` lookup on the principal
//! 3. Depth-1 PROPFIND on the home set to list calendar collections

use anyhow::{Context, Result};
use http::Method;
use libdav::caldav::FindCalendarHomeSet;
use libdav::requests::{DavRequest, ParseResponseError, PreparedRequest};
use serde::Serialize;

use crate::caldav::{client, url_to_href};
use crate::{CALDAV_ENDPOINT, Credentials};

/// URLs discovered for an authenticated account.
#[derive(Debug, Clone)]
pub struct DiscoveredAccount {
    pub principal_url: String,
    pub calendar_home_url: String,
}

/// A calendar collection on the account. Serialized as-is in API
/// responses listing an account's calendars.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteCalendar {
    /// Absolute collection URL, usable with [`crate::fetch_events`].
    pub url: String,
    pub name: String,
    /// Apple's `calendar-color`, normalized to `#RRGGBB`.
    pub color: Option<String>,
}

/// Validate credentials and resolve the account's CalDAV URLs.
///
/// A missing principal means authentication failed; iCloud answers the
/// PROPFIND but without a principal for bad app passwords.
pub async fn discover(credentials: &Credentials) -> Result<DiscoveredAccount> {
    let caldav = client(CALDAV_ENDPOINT, credentials)?;

    let principal = caldav
        .find_current_user_principal()
        .await
        .context("Failed to query current user principal")?
        .ok_or_else(|| {
            anyhow::anyhow!("iCloud authentication failed. Check the Apple ID and app password.")
        })?;

    let home_sets = caldav
        .request(FindCalendarHomeSet::new(&principal))
        .await
        .context("Failed to find calendar home set")?
        .home_sets;

    let calendar_home = home_sets
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("No calendar home set found for this account"))?;

    Ok(DiscoveredAccount {
        principal_url: absolute_url(&caldav, principal.path()),
        calendar_home_url: absolute_url(&caldav, calendar_home.path()),
    })
}

/// List the account's calendar collections under `calendar_home_url`.
pub async fn list_calendars(
    credentials: &Credentials,
    calendar_home_url: &str,
) -> Result<Vec<RemoteCalendar>> {
    let caldav = client(calendar_home_url, credentials)?;
    let home_href = url_to_href(calendar_home_url);

    let response = caldav
        .request(ListCalendarCollections::new(&home_href))
        .await
        .context("Failed to list calendars")?;

    let base = base_of(calendar_home_url);
    let calendars = response
        .calendars
        .into_iter()
        .map(|c| RemoteCalendar {
            url: if c.href.starts_with("http") {
                c.href
            } else {
                format!("{}{}", base, c.href)
            },
            name: c.name,
            color: c.color,
        })
        .collect();

    Ok(calendars)
}

fn absolute_url(caldav: &crate::caldav::ICloudClient, path: &str) -> String {
    format!(
        "{}://{}{}",
        caldav.base_url().scheme_str().unwrap_or("https"),
        caldav
            .base_url()
            .authority()
            .map(|a| a.as_str())
            .unwrap_or("caldav.icloud.com"),
        path
    )
}

fn base_of(url: &str) -> String {
    match url.parse::<http::Uri>() {
        Ok(uri) => format!(
            "{}://{}",
            uri.scheme_str().unwrap_or("https"),
            uri.authority().map(|a| a.as_str()).unwrap_or_default()
        ),
        Err(_) => String::new(),
    }
}

/// Depth-1 PROPFIND asking for displayname, resourcetype, and Apple's
/// calendar-color on every child of the calendar home.
struct ListCalendarCollections<'a> {
    home_href: &'a str,
}

impl<'a> ListCalendarCollections<'a> {
    fn new(home_href: &'a str) -> Self {
        ListCalendarCollections { home_href }
    }
}

#[derive(Debug)]
struct CollectionEntry {
    href: String,
    name: String,
    color: Option<String>,
}

#[derive(Debug)]
struct ListCalendarCollectionsResponse {
    calendars: Vec<CollectionEntry>,
}

impl DavRequest for ListCalendarCollections<'_> {
    type Response = ListCalendarCollectionsResponse;
    type ParseError = ParseResponseError;
    type Error<E> = libdav::dav::WebDavError<E>;

    fn prepare_request(&self) -> std::result::Result<PreparedRequest, http::Error> {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<d:propfind xmlns:d="DAV:" xmlns:ic="http://apple.com/ns/ical/">
  <d:prop>
    <d:displayname/>
    <d:resourcetype/>
    <ic:calendar-color/>
  </d:prop>
</d:propfind>"#
            .to_string();

        Ok(PreparedRequest {
            method: Method::from_bytes(b"PROPFIND")?,
            path: self.home_href.to_string(),
            body,
            headers: vec![("Depth".to_string(), "1".to_string())],
        })
    }

    fn parse_response(
        &self,
        parts: &http::response::Parts,
        body: &[u8],
    ) -> std::result::Result<Self::Response, ParseResponseError> {
        if !parts.status.is_success() {
            return Err(ParseResponseError::BadStatusCode(parts.status));
        }

        let calendars = parse_collections(body, self.home_href)?;
        Ok(ListCalendarCollectionsResponse { calendars })
    }
}

/// Parse calendar collections out of the PROPFIND multistatus, skipping the
/// home collection itself and anything that is not a calendar resource.
fn parse_collections(
    body: &[u8],
    home_href: &str,
) -> std::result::Result<Vec<CollectionEntry>, ParseResponseError> {
    let text = std::str::from_utf8(body)?;
    let doc = roxmltree::Document::parse(text)?;
    let root = doc.root_element();

    let home_trimmed = home_href.trim_end_matches('/');
    let mut calendars = Vec::new();

    for response in root
        .descendants()
        .filter(|n| n.tag_name().name() == "response")
    {
        let href = response
            .descendants()
            .find(|n| n.tag_name().name() == "href")
            .and_then(|n| n.text())
            .map(str::to_string);
        let Some(href) = href else { continue };

        if href.trim_end_matches('/') == home_trimmed {
            continue;
        }

        let is_calendar = response
            .descendants()
            .filter(|n| n.tag_name().name() == "resourcetype")
            .any(|rt| rt.children().any(|c| c.tag_name().name() == "calendar"));
        if !is_calendar {
            continue;
        }

        let name = response
            .descendants()
            .find(|n| n.tag_name().name() == "displayname")
            .and_then(|n| n.text())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                href.trim_end_matches('/')
                    .rsplit('/')
                    .next()
                    .unwrap_or("Calendar")
                    .to_string()
            });

        let color = response
            .descendants()
            .find(|n| n.tag_name().name() == "calendar-color")
            .and_then(|n| n.text())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(normalize_color);

        calendars.push(CollectionEntry { href, name, color });
    }

    Ok(calendars)
}

/// iCloud reports colors as #RRGGBBAA; drop the alpha channel.
fn normalize_color(c: &str) -> String {
    if c.len() == 9 && c.starts_with('#') {
        c[..7].to_string()
    } else {
        c.to_string()
    }
}
