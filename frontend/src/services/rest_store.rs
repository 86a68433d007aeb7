//! Period table over a PostgREST-style HTTP endpoint.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use gloo::net::http::{Request, RequestBuilder, Response};
use pricing_calendar::storage::PeriodStore;
use pricing_calendar::RemoteConfig;
use shared::PeriodRow;

pub struct RestPeriodStore {
    base_url: String,
    api_key: String,
    table: String,
}

impl RestPeriodStore {
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            table: config.table.clone(),
        }
    }

    pub fn table_url(&self) -> String {
        format!("{}/{}", self.base_url, self.table)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .header("Authorization", &format!("Bearer {}", self.api_key))
    }
}

/// Row filter selecting one service
pub fn service_filter(service_id: &str) -> (&'static str, String) {
    ("service_id", format!("eq.{}", service_id))
}

fn ensure_success(response: &Response, action: &str) -> Result<()> {
    if !response.ok() {
        bail!("{} failed with HTTP {} {}", action, response.status(), response.status_text());
    }
    Ok(())
}

#[async_trait(?Send)]
impl PeriodStore for RestPeriodStore {
    async fn fetch_periods(&self, service_id: &str) -> Result<Vec<PeriodRow>> {
        let response = self
            .authorized(Request::get(&self.table_url()))
            .query([
                service_filter(service_id),
                ("order", "date.asc".to_string()),
                ("select", "*".to_string()),
            ])
            .send()
            .await
            .context("period fetch request failed")?;
        ensure_success(&response, "period fetch")?;

        response
            .json::<Vec<PeriodRow>>()
            .await
            .context("malformed period rows")
    }

    async fn delete_periods(&self, service_id: &str) -> Result<u64> {
        let response = self
            .authorized(Request::delete(&self.table_url()))
            .header("Prefer", "return=representation")
            .query([service_filter(service_id)])
            .send()
            .await
            .context("period delete request failed")?;
        ensure_success(&response, "period delete")?;

        let removed = response
            .json::<Vec<serde_json::Value>>()
            .await
            .map(|rows| rows.len() as u64)
            .unwrap_or(0);
        Ok(removed)
    }

    async fn insert_periods(&self, rows: &[PeriodRow]) -> Result<()> {
        let response = self
            .authorized(Request::post(&self.table_url()))
            .header("Prefer", "return=minimal")
            .json(&rows)
            .context("failed to serialize period rows")?
            .send()
            .await
            .context("period insert request failed")?;
        ensure_success(&response, "period insert")
    }
}
