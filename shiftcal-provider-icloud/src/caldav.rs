//! CalDAV plumbing: client construction and the time-ranged event query.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use http::{Method, Uri};
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::{client::legacy::Client, rt::TokioExecutor};
use libdav::CalDavClient;
use libdav::dav::WebDavClient;
use libdav::requests::{DavRequest, ParseResponseError, PreparedRequest};
use tower::ServiceBuilder;
use tower_http::auth::AddAuthorization;
use tower_http::follow_redirect::FollowRedirect;

use crate::Credentials;
use crate::event::RemoteEvent;

type HttpClient = FollowRedirect<
    AddAuthorization<
        Client<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>, String>,
    >,
>;

pub type ICloudClient = CalDavClient<HttpClient>;

/// Build a CalDAV client for iCloud: HTTPS, basic auth, and redirect
/// following (iCloud redirects to per-user pXX-caldav hosts).
pub fn client(base_url: &str, credentials: &Credentials) -> Result<ICloudClient> {
    let uri: Uri = base_url
        .parse()
        .with_context(|| format!("Invalid CalDAV base URL: {base_url}"))?;

    let https_connector = HttpsConnectorBuilder::new()
        .with_native_roots()
        .context("Failed to load native TLS roots")?
        .https_or_http()
        .enable_http1()
        .build();

    let http_client = Client::builder(TokioExecutor::new()).build(https_connector);

    let auth_client = AddAuthorization::basic(
        http_client,
        &credentials.apple_id,
        &credentials.app_password,
    );

    let service = ServiceBuilder::new()
        .layer(tower_http::follow_redirect::FollowRedirectLayer::new())
        .service(auth_client);

    Ok(CalDavClient::new(WebDavClient::new(uri, service)))
}

/// Reduce a full URL to its href path, as CalDAV requests expect.
pub fn url_to_href(url: &str) -> String {
    match url.parse::<Uri>() {
        Ok(uri) => uri.path().to_string(),
        Err(_) => url.to_string(),
    }
}

/// Fetch all events of `calendar_url` overlapping [`from`, `to`].
pub async fn fetch_events(
    credentials: &Credentials,
    calendar_url: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<RemoteEvent>> {
    let caldav = client(calendar_url, credentials)?;
    let href = url_to_href(calendar_url);

    let request = EventsInRange::new(&href, from, to);
    let response = caldav
        .request(request)
        .await
        .context("CalDAV calendar-query failed")?;

    let mut events = Vec::new();
    for resource in response.resources {
        events.extend(crate::event::parse_events(&resource.data));
    }
    Ok(events)
}

/// `calendar-query` REPORT with a server-side time-range filter; far
/// cheaper than pulling the whole collection and filtering locally.
pub struct EventsInRange<'a> {
    collection_href: &'a str,
    start: String,
    end: String,
}

impl<'a> EventsInRange<'a> {
    pub fn new(collection_href: &'a str, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        EventsInRange {
            collection_href,
            start: caldav_datetime(from),
            end: caldav_datetime(to),
        }
    }
}

/// One fetched calendar resource with its ICS payload.
#[derive(Debug)]
pub struct CalendarResource {
    pub href: String,
    pub etag: Option<String>,
    pub data: String,
}

#[derive(Debug)]
pub struct EventsInRangeResponse {
    pub resources: Vec<CalendarResource>,
}

impl DavRequest for EventsInRange<'_> {
    type Response = EventsInRangeResponse;
    type ParseError = ParseResponseError;
    type Error<E> = libdav::dav::WebDavError<E>;

    fn prepare_request(&self) -> std::result::Result<PreparedRequest, http::Error> {
        let body = format!(
            r#"<C:calendar-query xmlns="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
    <prop>
        <getetag/>
        <C:calendar-data/>
    </prop>
    <C:filter>
        <C:comp-filter name="VCALENDAR">
            <C:comp-filter name="VEVENT">
                <C:time-range start="{}" end="{}"/>
            </C:comp-filter>
        </C:comp-filter>
    </C:filter>
</C:calendar-query>"#,
            self.start, self.end
        );

        Ok(PreparedRequest {
            method: Method::from_bytes(b"REPORT")?,
            path: self.collection_href.to_string(),
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

        let resources = parse_multistatus(body)?;
        Ok(EventsInRangeResponse { resources })
    }
}

/// Parse a CalDAV multistatus response into resources carrying ICS data.
fn parse_multistatus(body: &[u8]) -> std::result::Result<Vec<CalendarResource>, ParseResponseError> {
    let text = std::str::from_utf8(body)?;
    let doc = roxmltree::Document::parse(text)?;
    let root = doc.root_element();

    let mut resources = Vec::new();

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

        let etag = response
            .descendants()
            .find(|n| n.tag_name().name() == "getetag")
            .and_then(|n| n.text())
            .map(str::to_string);

        let data = response
            .descendants()
            .find(|n| n.tag_name().name() == "calendar-data")
            .and_then(|n| n.text())
            .map(str::to_string);

        if let Some(data) = data {
            resources.push(CalendarResource { href, etag, data });
        }
    }

    Ok(resources)
}

/// CalDAV time-range timestamps are `YYYYMMDDTHHMMSSZ`.
pub fn caldav_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}
