use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::Result;
use crate::types::ZoneId;

/// Narrow interface to the pool controller. Calls are blocking from the
/// caller's point of view and never retried; a failure surfaces to the
/// caller and recovery is left to the next scheduled poll.
#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// Fetch the full status payload (raw XML).
    async fn fetch_status(&self) -> Result<String>;

    /// Set a named device element to an integer value.
    async fn set_value(&self, name: &str, value: i32) -> Result<()>;

    async fn set_on(&self, name: &str) -> Result<()> {
        self.set_value(name, 1).await
    }

    async fn set_off(&self, name: &str) -> Result<()> {
        self.set_value(name, 0).await
    }

    async fn set_heat_mode(&self, zone: ZoneId, mode: i32) -> Result<()> {
        self.set_value(zone.address(), mode).await
    }

    async fn set_temp(&self, field: &str, value: i32) -> Result<()> {
        self.set_value(field, value).await
    }
}

/// HTTP client for the Autelis Pool Control interface: `GET /status.xml`
/// for status, `GET /set.cgi?name=...&value=...` for commands, HTTP basic
/// auth throughout.
pub struct AutelisClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl AutelisClient {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            base_url: format!("http://{}", host.into()),
            username: username.into(),
            password: password.into(),
        }
    }
}

#[async_trait]
impl DeviceClient for AutelisClient {
    async fn fetch_status(&self) -> Result<String> {
        let url = format!("{}/status.xml", self.base_url);
        let resp = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.text().await?)
    }

    async fn set_value(&self, name: &str, value: i32) -> Result<()> {
        let url = format!("{}/set.cgi", self.base_url);
        debug!(name, value, "sending device command");
        let value = value.to_string();
        self.http
            .get(&url)
            .query(&[("name", name), ("value", value.as_str())])
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
