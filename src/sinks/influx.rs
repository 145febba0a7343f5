//! Push sink writing line protocol to InfluxDB 1.x or 2.x

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::InfluxConfig;
use crate::errors::{SinkError, SinkResult};
use crate::points::MetricPoint;
use crate::sinks::line_protocol;

const SINK_NAME: &str = "influxdb";
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
enum InfluxAuth {
    Basic { username: String, password: String },
    Token(String),
}

/// Best-effort InfluxDB writer
///
/// Constructed once at start-up. If the server cannot be reached then, the
/// sink stays disabled for the life of the process and every write is a no-op.
pub struct InfluxSink {
    writer: Option<InfluxWriter>,
}

struct InfluxWriter {
    client: Client,
    base: Url,
    write_url: Url,
    database: String,
    version: u8,
    auth: InfluxAuth,
}

impl InfluxSink {
    /// Build the sink and probe the server, disabling the sink on failure
    pub async fn connect(config: &InfluxConfig) -> Self {
        let writer = match InfluxWriter::new(config) {
            Ok(writer) => writer,
            Err(e) => {
                error!("{e}; InfluxDB writes are disabled");
                return Self::disabled();
            }
        };

        match writer.initialise().await {
            Ok(()) => Self {
                writer: Some(writer),
            },
            Err(e) => {
                error!("{e}; InfluxDB writes are disabled");
                Self::disabled()
            }
        }
    }

    /// Build the sink without contacting the server
    pub fn new(config: &InfluxConfig) -> SinkResult<Self> {
        Ok(Self {
            writer: Some(InfluxWriter::new(config)?),
        })
    }

    /// A sink that drops everything
    pub fn disabled() -> Self {
        Self { writer: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    pub fn write_url(&self) -> Option<&Url> {
        self.writer.as_ref().map(|w| &w.write_url)
    }

    /// Write a batch, logging rather than returning any failure
    pub async fn write(&self, points: &[MetricPoint]) {
        if points.is_empty() {
            return;
        }
        if let Err(e) = self.try_write(points).await {
            error!("{e}");
        }
    }

    /// Write a batch and report the outcome
    pub async fn try_write(&self, points: &[MetricPoint]) -> SinkResult<()> {
        match &self.writer {
            Some(writer) => writer.write(points).await,
            None => Ok(()),
        }
    }
}

impl InfluxWriter {
    fn new(config: &InfluxConfig) -> SinkResult<Self> {
        let base = base_url(config)?;
        let write_url = write_url(&base, config)?;
        let client = Client::builder()
            .timeout(WRITE_TIMEOUT)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| SinkError::init(SINK_NAME, e.to_string()))?;

        let auth = if config.version == 2 {
            InfluxAuth::Token(config.token.clone())
        } else {
            InfluxAuth::Basic {
                username: config.username.clone(),
                password: config.password.clone(),
            }
        };

        Ok(Self {
            client,
            base,
            write_url,
            database: config.database.clone(),
            version: config.version,
            auth,
        })
    }

    fn authorise(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            InfluxAuth::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
            InfluxAuth::Token(token) => request.header("Authorization", format!("Token {token}")),
        }
    }

    fn endpoint(&self, path: &str) -> SinkResult<Url> {
        self.base
            .join(path)
            .map_err(|e| SinkError::init(SINK_NAME, e.to_string()))
    }

    async fn initialise(&self) -> SinkResult<()> {
        let response = self
            .client
            .get(self.endpoint("ping")?)
            .send()
            .await
            .map_err(|e| SinkError::init(SINK_NAME, e.without_url().to_string()))?;
        if !response.status().is_success() {
            return Err(SinkError::init(
                SINK_NAME,
                format!("ping returned {}", response.status()),
            ));
        }

        if self.version == 1 {
            let mut query = self.endpoint("query")?;
            query
                .query_pairs_mut()
                .append_pair("q", &format!("CREATE DATABASE \"{}\"", self.database));
            let response = self
                .authorise(self.client.post(query))
                .send()
                .await
                .map_err(|e| SinkError::init(SINK_NAME, e.without_url().to_string()))?;
            if !response.status().is_success() {
                return Err(SinkError::init(
                    SINK_NAME,
                    format!("CREATE DATABASE returned {}", response.status()),
                ));
            }
        }

        info!("Connected to InfluxDB at {}", self.base);
        Ok(())
    }

    async fn write(&self, points: &[MetricPoint]) -> SinkResult<()> {
        let body = line_protocol::encode_batch(points);
        if body.is_empty() {
            warn!("Nothing writable in a batch of {} points", points.len());
            return Ok(());
        }

        let response = self
            .authorise(self.client.post(self.write_url.clone()))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|e| SinkError::write(SINK_NAME, e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SinkError::write(
                SINK_NAME,
                format!("{status}: {}", detail.trim()),
            ));
        }

        debug!("Wrote {} points to InfluxDB", points.len());
        Ok(())
    }
}

fn base_url(config: &InfluxConfig) -> SinkResult<Url> {
    let host = config.url.trim().trim_end_matches('/');
    let raw = if host.starts_with("http://") || host.starts_with("https://") {
        format!("{host}/")
    } else {
        let scheme = if config.ssl { "https" } else { "http" };
        format!("{scheme}://{host}:{}/", config.port)
    };
    Url::parse(&raw).map_err(|e| SinkError::init(SINK_NAME, format!("invalid url '{raw}': {e}")))
}

fn write_url(base: &Url, config: &InfluxConfig) -> SinkResult<Url> {
    let (path, params) = if config.version == 2 {
        (
            "api/v2/write",
            vec![
                ("org", config.org.as_str()),
                ("bucket", config.bucket.as_str()),
                ("precision", "ns"),
            ],
        )
    } else {
        (
            "write",
            vec![("db", config.database.as_str()), ("precision", "ns")],
        )
    };
    let mut url = base
        .join(path)
        .map_err(|e| SinkError::init(SINK_NAME, e.to_string()))?;
    url.query_pairs_mut().extend_pairs(params);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::{
        Router,
        extract::State,
        http::{HeaderMap, Uri},
        routing::{get, post},
    };
    use chrono::DateTime;
    use tokio::net::TcpListener;

    #[derive(Clone, Default)]
    struct Captured {
        requests: Arc<Mutex<Vec<(String, String)>>>,
        auth: Arc<Mutex<Vec<String>>>,
    }

    async fn capture(
        State(captured): State<Captured>,
        headers: HeaderMap,
        uri: Uri,
        body: String,
    ) -> &'static str {
        captured.requests.lock().unwrap().push((uri.to_string(), body));
        if let Some(auth) = headers.get("authorization") {
            captured
                .auth
                .lock()
                .unwrap()
                .push(auth.to_str().unwrap().to_string());
        }
        ""
    }

    async fn fake_influx() -> (u16, Captured) {
        let captured = Captured::default();
        let app = Router::new()
            .route("/ping", get(|| async { "" }))
            .route("/query", post(capture))
            .route("/write", post(capture))
            .route("/api/v2/write", post(capture))
            .with_state(captured.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (port, captured)
    }

    fn config(port: u16) -> InfluxConfig {
        InfluxConfig {
            url: "127.0.0.1".to_string(),
            port,
            ..InfluxConfig::default()
        }
    }

    fn point() -> MetricPoint {
        let time = DateTime::parse_from_rfc3339("1970-01-01T00:00:01+00:00").unwrap();
        MetricPoint::new("Sonarr", time)
            .tag("type", "Queue")
            .field("count", 2_i64)
    }

    #[test]
    fn test_v1_write_url() {
        let sink = InfluxSink::new(&config(8086)).unwrap();
        assert_eq!(
            sink.write_url().unwrap().as_str(),
            "http://127.0.0.1:8086/write?db=varken&precision=ns"
        );
    }

    #[test]
    fn test_v2_write_url_and_token() {
        let config = InfluxConfig {
            url: "https://influx.lan".to_string(),
            version: 2,
            org: "home".to_string(),
            bucket: "media".to_string(),
            token: "t0k".to_string(),
            ..InfluxConfig::default()
        };
        let writer = InfluxWriter::new(&config).unwrap();
        assert_eq!(
            writer.write_url.as_str(),
            "https://influx.lan/api/v2/write?org=home&bucket=media&precision=ns"
        );
        assert_eq!(writer.auth, InfluxAuth::Token("t0k".to_string()));
    }

    #[tokio::test]
    async fn test_unreachable_server_disables_sink() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let sink = InfluxSink::connect(&config(port)).await;
        assert!(!sink.is_enabled());
        assert!(sink.try_write(&[point()]).await.is_ok());
    }

    #[tokio::test]
    async fn test_v1_creates_database_and_writes_lines() {
        let (port, captured) = fake_influx().await;
        let sink = InfluxSink::connect(&config(port)).await;
        assert!(sink.is_enabled());

        sink.write(&[point()]).await;

        let requests = captured.requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].0.starts_with("/query?q=CREATE+DATABASE"));
        assert_eq!(requests[1].0, "/write?db=varken&precision=ns");
        assert_eq!(requests[1].1, "Sonarr,type=Queue count=2i 1000000000");
        assert!(
            captured
                .auth
                .lock()
                .unwrap()
                .iter()
                .all(|a| a.starts_with("Basic "))
        );
    }

    #[tokio::test]
    async fn test_write_failure_is_reported_not_raised() {
        let (port, _) = fake_influx().await;
        let mut writer = InfluxWriter::new(&config(port)).unwrap();
        writer.write_url = writer.base.join("missing").unwrap();
        let sink = InfluxSink {
            writer: Some(writer),
        };

        assert!(sink.try_write(&[point()]).await.is_err());
        sink.write(&[point()]).await;
    }
}
