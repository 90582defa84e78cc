//! reqwest backend for the receiver's embedded web server.

use crate::{
    DeviceCommand, DeviceSnapshot, LogEntry, LogFilter, Result, SensorGroup, SensorReading,
    SourceError, SwarmSource,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Paths served by the receiver node.
pub mod endpoints {
    pub const SWARM_DATA: &str = "/getSwarmData";
    pub const SENSOR_VALUES: &str = "/getEnabledSensorValues";
    pub const LOGS: &str = "/logging/getLogs";
    pub const NEW_LOGS: &str = "/logging/getNewLogs";
    pub const SENSOR_SETTINGS: &str = "/settings/getSensorData";
    pub const TOGGLE_FUNCTION: &str = "/settings/toggleFunction";
    pub const COMMAND_PREFIX: &str = "/command/";
}

pub struct HttpSwarmSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSwarmSource {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(SourceError::Config("base url is empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Config(e.to_string()))?;
        Ok(Self {
            base_url: base_url.to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .client
            .get(self.url(endpoint))
            .query(query)
            .send()
            .await
            .map_err(|e| transport(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        // A truncated transfer is a transport error; only a complete body can
        // fail to decode.
        let body = response
            .bytes()
            .await
            .map_err(|e| transport(endpoint, e))?;
        serde_json::from_slice(&body).map_err(|e| SourceError::Decode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }

    async fn expect_success(&self, endpoint: &str, request: reqwest::RequestBuilder) -> Result<()> {
        let response = request.send().await.map_err(|e| transport(endpoint, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

fn transport(endpoint: &str, err: reqwest::Error) -> SourceError {
    SourceError::Transport {
        endpoint: endpoint.to_string(),
        message: err.to_string(),
    }
}

#[async_trait]
impl SwarmSource for HttpSwarmSource {
    async fn devices(&self) -> Result<Vec<DeviceSnapshot>> {
        self.get_json(endpoints::SWARM_DATA, &[]).await
    }

    async fn sensor_values(&self, device: Option<&str>) -> Result<Vec<SensorReading>> {
        let query: Vec<(&str, String)> = device
            .filter(|d| !d.is_empty())
            .map(|d| vec![("mac", d.to_string())])
            .unwrap_or_default();
        self.get_json(endpoints::SENSOR_VALUES, &query).await
    }

    async fn logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>> {
        self.get_json(endpoints::LOGS, &filter.query_pairs()).await
    }

    async fn new_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>> {
        self.get_json(endpoints::NEW_LOGS, &filter.query_pairs()).await
    }

    async fn sensor_settings(&self) -> Result<Vec<SensorGroup>> {
        self.get_json(endpoints::SENSOR_SETTINGS, &[]).await
    }

    async fn toggle_function(&self, name: &str, enabled: bool) -> Result<()> {
        #[derive(serde::Serialize)]
        #[serde(rename_all = "camelCase")]
        struct ToggleReq<'a> {
            sensor_function: &'a str,
            enabled: bool,
        }

        let request = self
            .client
            .post(self.url(endpoints::TOGGLE_FUNCTION))
            .json(&ToggleReq {
                sensor_function: name,
                enabled,
            });
        self.expect_success(endpoints::TOGGLE_FUNCTION, request).await?;
        tracing::info!(function = name, enabled, "toggled sensor function");
        Ok(())
    }

    async fn send_command(&self, command: DeviceCommand, device: &str) -> Result<()> {
        let endpoint = format!("{}{}", endpoints::COMMAND_PREFIX, command.as_str());
        let request = self
            .client
            .post(self.url(&endpoint))
            .form(&[("mac", device)]);
        self.expect_success(&endpoint, request).await?;
        tracing::info!(%command, device, "sent device command");
        Ok(())
    }
}
