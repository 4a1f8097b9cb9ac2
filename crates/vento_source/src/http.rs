use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, info};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;

use vento_core::config::{DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_TOKEN_VALIDITY_SECS};
use vento_core::{FieldSet, RawRecord, SourceApi, SourceConfig, VentoError, VentoResult};

use crate::payload::{parse_body, within_day};

const TOKEN_PATH: &str = "generate-token";
const DATA_PATH: &str = "get-data-fields/";
const FIELDS_HEADER: &str = "fields";
/// Tokens are renewed this long before the issuer would reject them.
const TOKEN_SKEW: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug)]
struct CachedToken {
    value: String,
    issued_at: Instant,
}

/// Client for the source collaborator's token and data endpoints.
pub struct HttpSource {
    client: Client,
    base_url: String,
    allowed: FieldSet,
    token_validity: Duration,
    token: Mutex<Option<CachedToken>>,
}

impl HttpSource {
    /// `allowed` is the configured field set; projections outside it are refused.
    pub fn new(config: &SourceConfig, allowed: FieldSet) -> VentoResult<Self> {
        let timeout_ms = config
            .request_timeout_ms
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|err| VentoError::config(format!("http client: {err}")))?;
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(VentoError::config("source base_url is empty"));
        }
        Ok(Self {
            client,
            base_url,
            allowed,
            token_validity: Duration::from_secs(
                config
                    .token_validity_secs
                    .unwrap_or(DEFAULT_TOKEN_VALIDITY_SECS),
            ),
            token: Mutex::new(None),
        })
    }

    pub fn token_url(&self) -> String {
        format!("{}/{}", self.base_url, TOKEN_PATH)
    }

    pub fn data_url(&self) -> String {
        format!("{}/{}", self.base_url, DATA_PATH)
    }

    /// Projection header for a request, after validating it against the configured set.
    pub fn fields_header(&self, fields: &FieldSet) -> VentoResult<String> {
        Ok(self.allowed.validate_projection(fields.names())?.join(", "))
    }

    async fn token(&self) -> VentoResult<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if !token_expired(token.issued_at.elapsed(), self.token_validity) {
                return Ok(token.value.clone());
            }
        }
        let value = self.request_token().await?;
        *cached = Some(CachedToken {
            value: value.clone(),
            issued_at: Instant::now(),
        });
        Ok(value)
    }

    async fn request_token(&self) -> VentoResult<String> {
        let response = self
            .client
            .get(self.token_url())
            .send()
            .await
            .map_err(|err| VentoError::source_fetch(format!("token request: {err}")))?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(VentoError::source_fetch(format!(
                "token request returned HTTP {status}"
            )));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| VentoError::source_fetch(format!("token payload: {err}")))?;
        debug!("source: issued new access token");
        Ok(token.access_token)
    }
}

fn token_expired(age: Duration, validity: Duration) -> bool {
    age + TOKEN_SKEW >= validity
}

#[async_trait]
impl SourceApi for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_day(&self, date: NaiveDate, fields: &FieldSet) -> VentoResult<Vec<RawRecord>> {
        let header = self.fields_header(fields)?;
        let token = self.token().await?;
        let day = date.format("%Y-%m-%d").to_string();
        info!("source: fetching {day} from {}", self.base_url);
        let response = self
            .client
            .get(self.data_url())
            .query(&[
                ("from_date", day.as_str()),
                ("to_date", day.as_str()),
                ("token", token.as_str()),
            ])
            .header(FIELDS_HEADER, header)
            .send()
            .await
            .map_err(|err| VentoError::source_fetch(format!("data request: {err}")))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| VentoError::source_fetch(format!("data body: {err}")))?;
        if !status.is_success() {
            return Err(VentoError::source_fetch(format!(
                "data request returned HTTP {status}: {}",
                String::from_utf8_lossy(&body)
            )));
        }
        let records = within_day(parse_body(&body, fields)?, date);
        if records.is_empty() {
            return Err(VentoError::empty_dataset(format!("no records for {day}")));
        }
        debug!("source: received {} records for {day}", records.len());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(base_url: &str) -> HttpSource {
        let config = SourceConfig {
            base_url: base_url.to_string(),
            ..SourceConfig::default()
        };
        let allowed = FieldSet::new(["wind_speed", "power", "ambient_temperature"]).expect("fields");
        HttpSource::new(&config, allowed).expect("source")
    }

    #[test]
    fn endpoint_urls_tolerate_trailing_slash() {
        let source = source("http://127.0.0.1:8007/");
        assert_eq!(source.token_url(), "http://127.0.0.1:8007/generate-token");
        assert_eq!(source.data_url(), "http://127.0.0.1:8007/get-data-fields/");
    }

    #[test]
    fn fields_header_lists_timestamp_last() {
        let source = source("http://127.0.0.1:8007");
        let fields = FieldSet::new(["wind_speed", "power"]).expect("fields");
        assert_eq!(
            source.fields_header(&fields).expect("header"),
            "wind_speed, power, timestamp"
        );
    }

    #[tokio::test]
    async fn unknown_fields_are_rejected_before_any_request() {
        // Nothing listens on port 9; reaching the network would fail differently.
        let source = source("http://127.0.0.1:9");
        let fields = FieldSet::new(["wind_speed", "blade_pitch"]).expect("fields");
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).expect("date");
        let err = source.fetch_day(date, &fields).await.expect_err("unknown field");
        assert!(matches!(err, VentoError::InvalidInput { .. }), "{err}");
        assert!(err.to_string().contains("blade_pitch"));
    }

    #[test]
    fn token_is_renewed_before_validity_ends() {
        let validity = Duration::from_secs(300);
        assert!(!token_expired(Duration::from_secs(0), validity));
        assert!(!token_expired(Duration::from_secs(289), validity));
        assert!(token_expired(Duration::from_secs(290), validity));
        assert!(token_expired(Duration::from_secs(600), validity));
    }

    #[test]
    fn empty_base_url_is_a_config_error() {
        let config = SourceConfig {
            base_url: "/".to_string(),
            ..SourceConfig::default()
        };
        let allowed = FieldSet::new(["power"]).expect("fields");
        assert!(matches!(
            HttpSource::new(&config, allowed),
            Err(VentoError::Config { .. })
        ));
    }
}
