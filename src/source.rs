use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::domain::{ListConfig, ListError, Record};

/// Where the user records come from. Read once, on a worker thread, when the list is mounted.
pub trait RecordSource: Send {
    fn fetch(&self) -> Result<Vec<Record>, ListError>;

    /// Human readable origin, used in logs and the status line.
    fn describe(&self) -> String;
}

#[derive(Debug)]
pub struct HttpSource {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ListError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }
}

impl RecordSource for HttpSource {
    fn fetch(&self) -> Result<Vec<Record>, ListError> {
        let start_time = Instant::now();
        let response = self.client.get(&self.endpoint).send()?.error_for_status()?;
        let body = response.bytes()?;
        let records: Vec<Record> = serde_json::from_slice(&body)?;
        info!(
            "GET {} returned {} records in {}ms",
            self.endpoint,
            records.len(),
            start_time.elapsed().as_millis()
        );
        Ok(records)
    }

    fn describe(&self) -> String {
        self.endpoint.clone()
    }
}

#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSource for FileSource {
    fn fetch(&self) -> Result<Vec<Record>, ListError> {
        let raw = fs::read(&self.path)?;
        let records: Vec<Record> = serde_json::from_slice(&raw)?;
        debug!("Read {} records from {:?}", records.len(), self.path);
        Ok(records)
    }

    fn describe(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// Picks the source the configuration asks for; a data file wins over the endpoint.
pub fn from_config(cfg: &ListConfig) -> Result<Box<dyn RecordSource>, ListError> {
    match &cfg.data_file {
        Some(path) => Ok(Box::new(FileSource::new(path.clone()))),
        None => Ok(Box::new(HttpSource::new(
            cfg.endpoint.clone(),
            Duration::from_millis(cfg.request_timeout_ms),
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RecordId;
    use axum::{Router, http::StatusCode, routing::get};
    use std::net::SocketAddr;
    use std::sync::mpsc;

    /// Serves `body` with `status` on `/users` from a background runtime.
    fn serve(status: StatusCode, body: &'static str) -> SocketAddr {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().expect("runtime");
            rt.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind");
                tx.send(listener.local_addr().expect("addr")).expect("send addr");
                let app = Router::new().route(
                    "/users",
                    get(move || async move {
                        (
                            status,
                            [(axum::http::header::CONTENT_TYPE, "application/json")],
                            body,
                        )
                    }),
                );
                let _ = axum::serve(listener, app).await;
            });
        });
        rx.recv().expect("server address")
    }

    fn http(addr: SocketAddr) -> HttpSource {
        HttpSource::new(format!("http://{addr}/users"), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn http_source_decodes_record_array() {
        let addr = serve(
            StatusCode::OK,
            r#"[{"id": 1, "name": "Alice", "email": "alice@example.com", "phone": "555-0100", "address": "1 Main St", "status": "Active"}]"#,
        );
        let records = http(addr).fetch().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, RecordId::Number(1));
        assert_eq!(records[0].name, "Alice");
    }

    #[test]
    fn http_source_reports_server_errors() {
        let addr = serve(StatusCode::INTERNAL_SERVER_ERROR, "[]");
        assert!(matches!(http(addr).fetch(), Err(ListError::Http(_))));
    }

    #[test]
    fn http_source_reports_malformed_bodies() {
        let addr = serve(StatusCode::OK, r#"{"users": []}"#);
        assert!(matches!(http(addr).fetch(), Err(ListError::Json(_))));
    }

    #[test]
    fn http_source_reports_unreachable_endpoint() {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        assert!(matches!(http(addr).fetch(), Err(ListError::Http(_))));
    }

    #[test]
    fn file_source_reads_fixture() {
        let source = FileSource::new(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/users.json"
        ));
        let records = source.fetch().unwrap();
        assert_eq!(records.len(), 10);
        assert!(source.describe().ends_with("users.json"));
    }

    #[test]
    fn file_source_missing_file_is_io_error() {
        let source = FileSource::new("tests/fixtures/does_not_exist.json");
        assert!(matches!(source.fetch(), Err(ListError::Io(_))));
    }

    #[test]
    fn config_picks_file_source_when_data_file_set() {
        let cfg = ListConfig::default().data_file("tests/fixtures/users.json");
        let source = from_config(&cfg).unwrap();
        assert_eq!(source.describe(), "tests/fixtures/users.json");

        let source = from_config(&ListConfig::default()).unwrap();
        assert_eq!(source.describe(), crate::domain::DEFAULT_ENDPOINT);
    }
}
