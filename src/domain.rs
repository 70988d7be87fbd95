use std::fmt;
use std::path::PathBuf;

use derive_setters::Setters;
use ratatui::crossterm::event::KeyEvent;
use serde::Deserialize;
use thiserror::Error;

/// Number of records shown per page.
pub const PAGE_SIZE: usize = 4;

/// Settling delay before a typed search term becomes effective.
pub const SEARCH_DEBOUNCE_MS: u64 = 500;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000/users";

pub const HELP_TEXT: &str = "\
Login
  e / Enter   open the user list
  q           quit

User list
  /           focus the search box (Enter submits, Esc leaves)
  s           cycle sort key
  N E P D T   sort by name, email, phone, address, status
  a / i / x   filter Active / Inactive / clear filter
  r           reset search, sort and filter
  h / Left    previous page
  l / Right   next page
  g / Home    first page
  G / End     last page
  1-9         jump to page
  b           back to login
  ?           toggle this help
  q           quit";

#[derive(Debug, Error)]
pub enum ListError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed record data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not parse config file: {0}")]
    Config(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("could not install log subscriber: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),
}

/// A user id as served by the backend, which hands out both numeric and string ids.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{n}"),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub status: String,
}

impl Record {
    pub fn field(&self, key: SortKey) -> &str {
        match key {
            SortKey::Name => &self.name,
            SortKey::Email => &self.email,
            SortKey::Phone => &self.phone,
            SortKey::Address => &self.address,
            SortKey::Status => &self.status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Email,
    Phone,
    Address,
    Status,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::Name,
        SortKey::Email,
        SortKey::Phone,
        SortKey::Address,
        SortKey::Status,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Name => "name",
            SortKey::Email => "email",
            SortKey::Phone => "phone",
            SortKey::Address => "address",
            SortKey::Status => "status",
        }
    }

    /// Next key in selector order, `None` after the last one.
    pub fn cycle(current: Option<SortKey>) -> Option<SortKey> {
        match current {
            None => Some(SortKey::ALL[0]),
            Some(key) => {
                let pos = SortKey::ALL.iter().position(|k| *k == key).unwrap_or(0);
                SortKey::ALL.get(pos + 1).copied()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    #[default]
    Login,
    Edit,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/",
            Route::Edit => "/edit",
        }
    }
}

#[derive(Debug, Clone, Setters)]
#[setters(into, strip_option)]
pub struct ListConfig {
    pub endpoint: String,
    pub data_file: Option<PathBuf>,
    pub request_timeout_ms: u64,
    pub event_poll_time: u64,
    pub start_route: Route,
    pub log_file: PathBuf,
    pub log_level: String,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            data_file: None,
            request_timeout_ms: 5000,
            event_poll_time: 100,
            start_route: Route::Login,
            log_file: PathBuf::from("userlist.log"),
            log_level: "info".to_string(),
        }
    }
}

/// On-disk form of [`ListConfig`]; every key is optional and overrides the default.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub endpoint: Option<String>,
    pub data_file: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub event_poll_time: Option<u64>,
    pub start_route: Option<Route>,
    pub log_file: Option<String>,
    pub log_level: Option<String>,
}

impl ListConfig {
    pub fn from_toml(raw: &str) -> Result<Self, ListError> {
        let file: FileConfig = toml::from_str(raw)?;
        Self::default().merge(file)
    }

    pub fn merge(mut self, file: FileConfig) -> Result<Self, ListError> {
        if let Some(endpoint) = file.endpoint {
            self = self.endpoint(endpoint);
        }
        if let Some(path) = file.data_file {
            self = self.data_file(expand_path(&path)?);
        }
        if let Some(timeout) = file.request_timeout_ms {
            self = self.request_timeout_ms(timeout);
        }
        if let Some(poll) = file.event_poll_time {
            self = self.event_poll_time(poll);
        }
        if let Some(route) = file.start_route {
            self = self.start_route(route);
        }
        if let Some(path) = file.log_file {
            self = self.log_file(expand_path(&path)?);
        }
        if let Some(level) = file.log_level {
            self = self.log_level(level);
        }
        self.validate()
    }

    pub fn validate(self) -> Result<Self, ListError> {
        if self.event_poll_time == 0 {
            return Err(ListError::InvalidConfig(
                "event_poll_time must be at least 1ms".to_string(),
            ));
        }
        if self.data_file.is_none() && !self.endpoint.starts_with("http") {
            return Err(ListError::InvalidConfig(format!(
                "endpoint '{}' is not an http(s) url",
                self.endpoint
            )));
        }
        Ok(self)
    }
}

/// Expands `~` and environment variables in user supplied paths.
pub fn expand_path(raw: &str) -> Result<PathBuf, ListError> {
    shellexpand::full(raw)
        .map(|p| PathBuf::from(p.into_owned()))
        .map_err(|e| ListError::InvalidConfig(format!("cannot expand path '{raw}': {e}")))
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    Help,
    Exit,
    Tick,
    Resize(usize, usize),
    Navigate(Route),
    FocusSearch,
    RawKey(KeyEvent),
    SubmitSearch,
    CycleSort,
    Sort(SortKey),
    Filter(Option<String>),
    Reset,
    PreviousPage,
    NextPage,
    FirstPage,
    LastPage,
    GoToPage(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_ids_accept_numbers_and_strings() {
        let raw = r#"[
            {"id": 7, "name": "Bob", "email": "b@x", "phone": "1", "address": "A", "status": "Active"},
            {"id": "u-2", "name": "Al", "email": "a@x", "phone": "2", "address": "B", "status": "Inactive"}
        ]"#;
        let records: Vec<Record> = serde_json::from_str(raw).unwrap();
        assert_eq!(records[0].id, RecordId::Number(7));
        assert_eq!(records[1].id.to_string(), "u-2");
        assert_eq!(records[1].field(SortKey::Status), "Inactive");
    }

    #[test]
    fn sort_key_cycles_through_all_and_back_to_none() {
        let mut key = None;
        let mut seen = Vec::new();
        for _ in 0..SortKey::ALL.len() {
            key = SortKey::cycle(key);
            seen.push(key.unwrap());
        }
        assert_eq!(seen, SortKey::ALL.to_vec());
        assert_eq!(SortKey::cycle(key), None);
    }

    #[test]
    fn config_file_overrides_defaults() {
        let cfg = ListConfig::from_toml(
            r#"
            endpoint = "http://example.test/users"
            event_poll_time = 50
            start_route = "edit"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.endpoint, "http://example.test/users");
        assert_eq!(cfg.event_poll_time, 50);
        assert_eq!(cfg.start_route, Route::Edit);
        assert_eq!(cfg.request_timeout_ms, 5000);
    }

    #[test]
    fn config_rejects_bad_values() {
        assert!(matches!(
            ListConfig::from_toml("event_poll_time = 0"),
            Err(ListError::InvalidConfig(_))
        ));
        assert!(matches!(
            ListConfig::from_toml("endpoint = \"ftp://nope\""),
            Err(ListError::InvalidConfig(_))
        ));
        assert!(matches!(
            ListConfig::from_toml("page_size = 10"),
            Err(ListError::Config(_))
        ));
    }
}
