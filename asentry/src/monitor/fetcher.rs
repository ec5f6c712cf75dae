/*!
Sources of current Sentry data
*/

use std::time::Duration;

use async_trait::async_trait;
use sentry_data::{TrackedObject, parse_response};
use tracing::{debug, info};

use crate::monitor::{config::SourceConfig, error::AsentryError};

/// Anything that can produce the current list of tracked objects.
#[async_trait]
pub trait ThreatSource: Send + Sync {
    /// Name of the source, for logs
    fn name(&self) -> &'static str;

    /// Fetch the current objects, in the order the source lists them.
    async fn fetch(&self) -> Result<Vec<TrackedObject>, AsentryError>;
}

/// Live Sentry API client.
pub struct SentryClient {
    config: SourceConfig,
    client: reqwest::Client,
}

impl SentryClient {
    pub fn new(config: SourceConfig) -> Result<Self, AsentryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl ThreatSource for SentryClient {
    fn name(&self) -> &'static str {
        "Sentry API"
    }

    async fn fetch(&self) -> Result<Vec<TrackedObject>, AsentryError> {
        info!(
            "Fetching {} with ps-min={}",
            self.config.endpoint, self.config.ps_min
        );

        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&[("ps-min", self.config.ps_min.to_string())])
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        let objects = parse_response(
            &body,
            &self.config.expected_source,
            &self.config.expected_version,
        )?;

        debug!("Received {} objects", objects.len());
        Ok(objects)
    }
}

/// Fixed offline dataset for trying the pipeline without network access.
pub struct SampleSource;

#[async_trait]
impl ThreatSource for SampleSource {
    fn name(&self) -> &'static str {
        "sample data"
    }

    async fn fetch(&self) -> Result<Vec<TrackedObject>, AsentryError> {
        let rows = serde_json::json!([
            {
                "id": "a0101955", "ps_cum": "-1.55", "ts_max": null,
                "last_obs": "2020-10-3.80160", "fullname": "101955 Bennu (1999 RQ36)",
                "range": "2178-2290", "ip": "0.000571699999999996", "diameter": "0.49",
                "ps_max": "-1.59", "n_imp": 157, "des": "101955"
            },
            {
                "id": "bK23T04L", "ps_cum": "-1.77", "ts_max": "1",
                "ip": "3.93877e-05", "range": "2119-2121", "fullname": "(2023 TL4)",
                "last_obs": "2023-11-14", "ps_max": "-1.80", "diameter": "0.32",
                "des": "2023 TL4", "n_imp": 3
            }
        ]);
        serde_json::from_value(rows)
            .map_err(|e| AsentryError::Format(sentry_data::DataError::Json(e)))
    }
}
