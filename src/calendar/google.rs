//! Google Calendar importer.
//!
//! Authenticates with an installed-application OAuth client. The first
//! import runs the authorization-code flow on the terminal; the resulting
//! token is cached in a JSON file and refreshed when it expires.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::reqwest::http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, RefreshToken,
    Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use super::ics::IcsEvent;
use super::CalendarImporter;
use crate::error::{Result, TidyError};

const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
const CALENDARS_ENDPOINT: &str = "https://www.googleapis.com/calendar/v3/calendars";
const DEFAULT_REDIRECT: &str = "http://localhost";

/// Refresh a little before the server-side expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// The `installed` (or `web`) section of a downloaded client secret file.
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecretSection>,
    web: Option<ClientSecretSection>,
}

#[derive(Debug, Deserialize)]
struct ClientSecretSection {
    client_id: String,
    client_secret: String,
    auth_uri: String,
    token_uri: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

/// Token cache file contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredToken {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl StoredToken {
    fn from_response(response: &BasicTokenResponse, previous_refresh: Option<String>) -> Self {
        let expires_at = response
            .expires_in()
            .and_then(|d| Duration::from_std(d).ok())
            .map(|d| Utc::now() + d);
        Self {
            access_token: response.access_token().secret().clone(),
            refresh_token: response
                .refresh_token()
                .map(|t| t.secret().clone())
                .or(previous_refresh),
            expires_at,
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(at) => at - Duration::seconds(EXPIRY_MARGIN_SECS) <= now,
            None => false,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventDateTime {
    date_time: String,
}

#[derive(Debug, Serialize)]
struct EventRequest {
    summary: String,
    description: String,
    start: EventDateTime,
    end: EventDateTime,
}

impl From<&IcsEvent> for EventRequest {
    fn from(event: &IcsEvent) -> Self {
        Self {
            summary: event.summary.clone(),
            description: event.description.clone(),
            start: EventDateTime {
                date_time: event.start.to_rfc3339(),
            },
            end: EventDateTime {
                date_time: event.end.to_rfc3339(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventResponse {
    html_link: String,
}

/// Inserts events into a Google calendar.
pub struct GoogleCalendar {
    credentials_file: PathBuf,
    token_file: PathBuf,
    calendar_id: String,
    http: reqwest::blocking::Client,
    token: Option<StoredToken>,
}

impl GoogleCalendar {
    pub fn new(
        credentials_file: impl Into<PathBuf>,
        token_file: impl Into<PathBuf>,
        calendar_id: impl Into<String>,
    ) -> Self {
        Self {
            credentials_file: credentials_file.into(),
            token_file: token_file.into(),
            calendar_id: calendar_id.into(),
            http: reqwest::blocking::Client::new(),
            token: None,
        }
    }

    fn oauth_client(&self) -> Result<BasicClient> {
        let data = std::fs::read(&self.credentials_file)
            .map_err(|e| TidyError::io(&self.credentials_file, e))?;
        let file: ClientSecretFile = serde_json::from_slice(&data).map_err(|e| {
            TidyError::Calendar(format!("unable to parse client secret file: {e}"))
        })?;
        let section = file.installed.or(file.web).ok_or_else(|| {
            TidyError::Calendar("client secret file has no installed or web section".into())
        })?;

        let redirect = section
            .redirect_uris
            .first()
            .cloned()
            .unwrap_or_else(|| DEFAULT_REDIRECT.to_string());
        let invalid = |e: url::ParseError| TidyError::Calendar(e.to_string());

        Ok(BasicClient::new(
            ClientId::new(section.client_id),
            Some(ClientSecret::new(section.client_secret)),
            AuthUrl::new(section.auth_uri).map_err(invalid)?,
            Some(TokenUrl::new(section.token_uri).map_err(invalid)?),
        )
        .set_redirect_uri(RedirectUrl::new(redirect).map_err(invalid)?))
    }

    /// Return a valid access token, loading, refreshing or acquiring one as needed.
    fn access_token(&mut self) -> Result<String> {
        if self.token.is_none() {
            self.token = load_token(&self.token_file);
        }

        match self.token.clone() {
            Some(token) if !token.is_expired(Utc::now()) => Ok(token.access_token),
            Some(StoredToken {
                refresh_token: Some(refresh),
                ..
            }) => {
                debug!("Refreshing calendar access token");
                let client = self.oauth_client()?;
                let response = client
                    .exchange_refresh_token(&RefreshToken::new(refresh.clone()))
                    .request(http_client)
                    .map_err(|e| TidyError::Calendar(format!("token refresh failed: {e}")))?;
                self.store_token(StoredToken::from_response(&response, Some(refresh)))
            }
            _ => {
                let client = self.oauth_client()?;
                let response = authorize_on_terminal(&client)?;
                self.store_token(StoredToken::from_response(&response, None))
            }
        }
    }

    fn store_token(&mut self, token: StoredToken) -> Result<String> {
        let json = serde_json::to_vec_pretty(&token)
            .map_err(|e| TidyError::Calendar(format!("unable to encode oauth token: {e}")))?;
        if let Some(parent) = self.token_file.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TidyError::io(parent, e))?;
        }
        std::fs::write(&self.token_file, json).map_err(|e| TidyError::io(&self.token_file, e))?;
        info!(path = %self.token_file.display(), "Cached calendar token");

        let access = token.access_token.clone();
        self.token = Some(token);
        Ok(access)
    }
}

impl CalendarImporter for GoogleCalendar {
    fn import_event(&mut self, ics: &[u8]) -> Result<String> {
        let event = IcsEvent::parse(ics)?;
        let token = self.access_token()?;

        let url = events_url(&self.calendar_id)?;
        let response: EventResponse = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&EventRequest::from(&event))
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .map_err(|e| TidyError::Calendar(format!("unable to create event: {e}")))?;

        info!(summary = %event.summary, link = %response.html_link, "Created calendar event");
        Ok(response.html_link)
    }
}

/// Insert endpoint for a calendar; the id is escaped as one path segment.
fn events_url(calendar_id: &str) -> Result<Url> {
    let mut url =
        Url::parse(CALENDARS_ENDPOINT).map_err(|e| TidyError::Calendar(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| TidyError::Calendar("calendar endpoint cannot take a path".into()))?
        .push(calendar_id)
        .push("events");
    Ok(url)
}

fn load_token(path: &Path) -> Option<StoredToken> {
    let data = std::fs::read(path).ok()?;
    match serde_json::from_slice(&data) {
        Ok(token) => Some(token),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Ignoring unreadable token cache");
            None
        }
    }
}

/// Print the consent URL and exchange the pasted authorization code.
fn authorize_on_terminal(client: &BasicClient) -> Result<BasicTokenResponse> {
    let (auth_url, _csrf) = client
        .authorize_url(CsrfToken::new_random)
        .add_scope(Scope::new(CALENDAR_SCOPE.to_string()))
        .add_extra_param("access_type", "offline")
        .url();

    let mut stdout = std::io::stdout();
    writeln!(
        stdout,
        "Go to the following link in your browser then type the authorization code:\n{auth_url}"
    )?;
    stdout.flush()?;

    let mut code = String::new();
    if std::io::stdin().lock().read_line(&mut code)? == 0 {
        return Err(TidyError::InputClosed);
    }

    client
        .exchange_code(AuthorizationCode::new(code.trim().to_string()))
        .request(http_client)
        .map_err(|e| TidyError::Calendar(format!("unable to retrieve token: {e}")))
}
