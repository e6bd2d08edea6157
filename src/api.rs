use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::model::*;
use crate::session::Authenticated;

/// The external reservation REST API, as the booking flow sees it.
#[async_trait]
pub trait BookingApi: Send + Sync {
    async fn court(&self, court_id: u64) -> Result<Court, ApiError>;

    /// Reservations held by anyone on the day starting at `day_start`.
    async fn reserved_spans(&self, day_start: DateTime<Utc>) -> Result<Vec<ReservedSpan>, ApiError>;

    async fn create_reservation(
        &self,
        auth: Authenticated<'_>,
        request: &ReservationRequest,
    ) -> Result<CreatedReservation, ApiError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    Transport(String),
    Unauthorized,
    Status(u16, String),
    Decode(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Transport(e) => write!(f, "request failed: {e}"),
            ApiError::Unauthorized => write!(f, "not signed in (HTTP 401)"),
            ApiError::Status(code, detail) => write!(f, "HTTP {code}: {detail}"),
            ApiError::Decode(e) => write!(f, "unexpected response: {e}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

/// `BookingApi` over HTTP + JSON.
pub struct HttpBookingApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBookingApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl BookingApi for HttpBookingApi {
    async fn court(&self, court_id: u64) -> Result<Court, ApiError> {
        let start = Instant::now();
        let resp = self
            .client
            .get(self.url(&format!("/api/courts/{court_id}")))
            .send()
            .await;
        record_latency("court", start);
        read_json(resp?).await
    }

    async fn reserved_spans(&self, day_start: DateTime<Utc>) -> Result<Vec<ReservedSpan>, ApiError> {
        let start = Instant::now();
        let date_time = day_start.to_rfc3339_opts(SecondsFormat::Millis, true);
        let resp = self
            .client
            .get(self.url("/api/reserves_by_day/"))
            .query(&[("date_time", date_time.as_str())])
            .send()
            .await;
        record_latency("reserved_spans", start);
        let spans: Vec<ReservedSpan> = read_json(resp?).await?;
        debug!(%date_time, count = spans.len(), "fetched reserved spans");
        Ok(spans)
    }

    async fn create_reservation(
        &self,
        auth: Authenticated<'_>,
        request: &ReservationRequest,
    ) -> Result<CreatedReservation, ApiError> {
        let start = Instant::now();
        let mut builder = self
            .client
            .post(self.url("/api/users/create_reserves/"))
            .json(request);
        if let Some(token) = auth.token() {
            builder = builder.bearer_auth(token);
        }
        let resp = builder.send().await;
        record_latency("create_reservation", start);
        read_json(resp?).await
    }
}

fn record_latency(call: &'static str, start: Instant) {
    metrics::histogram!(crate::observability::API_REQUEST_DURATION_SECONDS, "call" => call)
        .record(start.elapsed().as_secs_f64());
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized);
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ApiError::Status(status.as_u16(), error_detail(&body)));
    }
    resp.json::<T>().await.map_err(|e| ApiError::Decode(e.to_string()))
}

/// The API reports failures as `{"detail": "..."}`; fall back to the raw body.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
