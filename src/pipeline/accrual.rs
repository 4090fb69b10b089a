//! Client for the external Accrual Provider (§6). Pooled keep-alive connections and a
//! 15s end-to-end timeout, matching the teacher's preference for a long-lived,
//! explicitly-tuned `reqwest::Client` rather than a default one per call.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use std::time::Duration;

use crate::database::order::OrderStatus;

const TIMEOUT: Duration = Duration::from_secs(15);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(60);
const POOL_MAX_IDLE_PER_HOST: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
enum UpstreamStatus {
    Registered,
    Processing,
    Invalid,
    Processed,
}

impl From<UpstreamStatus> for OrderStatus {
    fn from(value: UpstreamStatus) -> Self {
        match value {
            UpstreamStatus::Registered | UpstreamStatus::Processing => OrderStatus::Processing,
            UpstreamStatus::Invalid => OrderStatus::Invalid,
            UpstreamStatus::Processed => OrderStatus::Processed,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct AccrualReportWire {
    #[serde(deserialize_with = "deserialize_order_number")]
    #[allow(dead_code)]
    order: i64,
    status: UpstreamStatus,
    #[serde(default)]
    accrual: Option<Decimal>,
}

fn deserialize_order_number<'de, D>(de: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;
    let raw = String::deserialize(de)?;
    raw.parse().map_err(serde::de::Error::custom)
}

/// Mapped upstream status plus the accrual, meaningful only when `status` is `Processed`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccrualReport {
    pub status: OrderStatus,
    pub accrual: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbeOutcome {
    Report(AccrualReport),
    /// 204 or 429: "upstream has not registered this order yet". Not an error.
    NotRegistered,
}

#[derive(Debug, thiserror::Error)]
pub enum AccrualError {
    #[error("upstream request failed: {0}")]
    Unavailable(#[from] reqwest::Error),
    #[error("upstream returned status {0}")]
    UnexpectedStatus(StatusCode),
    #[error("upstream response was not valid JSON")]
    Malformed,
}

#[async_trait]
pub trait AccrualProvider: Send + Sync {
    async fn probe(&self, order_number: i64) -> Result<ProbeOutcome, AccrualError>;
}

pub struct AccrualClient {
    client: Client,
    base_url: String,
}

impl AccrualClient {
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(TIMEOUT)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .build()
            .expect("reqwest client with static config should always build");

        Self { client, base_url }
    }
}

#[async_trait]
impl AccrualProvider for AccrualClient {
    async fn probe(&self, order_number: i64) -> Result<ProbeOutcome, AccrualError> {
        let url = format!("{}/api/orders/{}", self.base_url, order_number);

        let resp = self.client.get(&url).send().await?;

        match resp.status() {
            StatusCode::OK => {
                let wire: AccrualReportWire =
                    resp.json().await.map_err(|_| AccrualError::Malformed)?;

                let status = OrderStatus::from(wire.status);
                let accrual = if status == OrderStatus::Processed {
                    wire.accrual.unwrap_or(Decimal::ZERO)
                } else {
                    Decimal::ZERO
                };

                Ok(ProbeOutcome::Report(AccrualReport { status, accrual }))
            }
            StatusCode::NO_CONTENT => Ok(ProbeOutcome::NotRegistered),
            StatusCode::TOO_MANY_REQUESTS => {
                if let Some(delay) = retry_after(&resp) {
                    tokio::time::sleep(delay.min(TIMEOUT)).await;
                }
                Ok(ProbeOutcome::NotRegistered)
            }
            other => Err(AccrualError::UnexpectedStatus(other)),
        }
    }
}

fn retry_after(resp: &reqwest::Response) -> Option<Duration> {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::sync::Mutex;

    /// Returns a canned sequence of outcomes, one per call; once exhausted it keeps
    /// returning the last entry (so a "flaky then healthy" sequence can be queried more
    /// times than it has stages).
    pub struct FakeAccrual {
        outcomes: Vec<Result<ProbeOutcome, ()>>,
        calls: Mutex<usize>,
    }

    impl FakeAccrual {
        pub fn sequence(outcomes: Vec<Result<ProbeOutcome, ()>>) -> Self {
            assert!(!outcomes.is_empty());
            Self {
                outcomes,
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl AccrualProvider for FakeAccrual {
        async fn probe(&self, _order_number: i64) -> Result<ProbeOutcome, AccrualError> {
            let mut calls = self.calls.lock().unwrap();
            let idx = (*calls).min(self.outcomes.len() - 1);
            *calls += 1;

            self.outcomes[idx]
                .map_err(|_| AccrualError::UnexpectedStatus(StatusCode::INTERNAL_SERVER_ERROR))
        }
    }
}
