// src/alert.rs
//! Alert rendering and webhook delivery. The monitor core calls `deliver`
//! at most once per distinct alert key; delivery itself is fire-and-forget.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::json;

use crate::error::MonitorError;
use crate::models::OutflowRecord;
use crate::window::WindowVerdict;

/// Outbound notification seam. Production uses [`WebhookSink`]; tests
/// inject a recording fake.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, text: &str) -> Result<(), MonitorError>;
}

/// Posts the rendered text as `{"content": ...}` to a webhook URL.
pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: &str) -> Result<Self, MonitorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl AlertSink for WebhookSink {
    async fn deliver(&self, text: &str) -> Result<(), MonitorError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&json!({ "content": text }))
            .send()
            .await
            .map_err(|e| MonitorError::Delivery(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(MonitorError::Delivery(format!(
                "webhook returned HTTP {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

/// Inputs for one rendered notification.
pub struct AlertContext<'a> {
    pub watched: &'a str,
    pub window: &'a [OutflowRecord],
    pub verdict: &'a WindowVerdict,
    pub min_sol: Decimal,
    pub max_sol: Decimal,
    pub threshold: usize,
    pub preview_limit: usize,
}

/// Build the notification text: headline, counters, and a bounded preview of
/// (amount, destination) pairs, newest first.
pub fn render_alert(ctx: &AlertContext) -> String {
    let verdict = ctx.verdict;
    let window_size = ctx.window.len();

    let mut lines = vec![
        format!(
            "Structured outflow alert for {}: {}/{} windowed transfers matched \
             [{} SOL, {} SOL] with five significant digits (threshold {}).",
            ctx.watched,
            verdict.match_count,
            window_size,
            ctx.min_sol,
            ctx.max_sol,
            ctx.threshold,
        ),
        format!(
            "In range: {}/{}. Five-digit: {}/{}. Distinct destinations: {}.",
            verdict.in_range_count,
            window_size,
            verdict.digit_match_count,
            window_size,
            verdict.distinct_destinations,
        ),
    ];

    let preview: Vec<String> = ctx
        .window
        .iter()
        .zip(verdict.classifications.iter())
        .take(ctx.preview_limit)
        .map(|(record, classification)| {
            format!("{} SOL to {}", classification.formatted, record.destination)
        })
        .collect();

    let mut preview_line = format!("Recent: {}", preview.join("; "));
    if window_size > ctx.preview_limit {
        preview_line.push_str(&format!(" (+{} more)", window_size - ctx.preview_limit));
    }
    lines.push(preview_line);

    lines.join("\n")
}
