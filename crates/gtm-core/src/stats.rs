//! Call-count polling for the header label.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("stats endpoint returned HTTP {0}")]
    Unavailable(u16),

    #[error("stats request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Clone)]
pub struct StatsClient {
    client: Client,
    url: String,
}

impl StatsClient {
    pub fn new(url: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
        }
    }

    /// Number of calls the webhook has indexed.
    pub async fn fetch_call_count(&self) -> Result<u64, StatsError> {
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(StatsError::Unavailable(response.status().as_u16()));
        }

        let body: CountResponse = response.json().await?;
        Ok(body.count)
    }
}

/// Poll the stats endpoint forever, reporting `None` whenever a poll fails.
///
/// The first poll runs immediately. Failures never stop the loop; the next
/// tick simply tries again.
pub fn spawn_call_count_poller<F>(client: StatsClient, period: Duration, mut report: F) -> JoinHandle<()>
where
    F: FnMut(Option<u64>) -> bool + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let count = match client.fetch_call_count().await {
                Ok(count) => {
                    tracing::debug!(count, "Fetched call count");
                    Some(count)
                }
                Err(e) => {
                    tracing::warn!(error = %e, url = %client.url, "Call count unavailable");
                    None
                }
            };
            // receiver gone, nobody left to show the label
            if !report(count) {
                break;
            }
        }
    })
}

/// Header text for the current call count.
pub fn call_count_label(count: Option<u64>) -> String {
    match count {
        Some(1) => "1 call analyzed".to_string(),
        Some(n) => format!("{} calls analyzed", n),
        None => "calls: unknown".to_string(),
    }
}
