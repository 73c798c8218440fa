use crate::app::ports::MetricPublisher;
use crate::error::{MonitorError, Result};
use crate::types::{PushTarget, Sample};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use std::time::Duration;
use tracing::debug;

const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Pushes single gauge samples to a Prometheus Pushgateway.
///
/// Uses `POST`, which replaces only the metrics named in the body within the
/// grouping key. Other sources sharing the same instance keep their values.
pub struct PushgatewayPublisher {
    client: reqwest::Client,
}

impl PushgatewayPublisher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self::with_client(client))
    }

    /// Use a preconfigured client (proxy settings, TLS roots, timeouts)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetricPublisher for PushgatewayPublisher {
    async fn publish(&self, sample: &Sample, target: &PushTarget) -> Result<()> {
        let url = push_url(target)?;
        let body = render_gauge(sample);
        debug!(url = %url, metric = %sample.metric, value = %sample.value, "pushing sample");

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MonitorError::PushRejected {
                status,
                body: body.trim().to_string(),
            });
        }
        Ok(())
    }
}

/// `{gateway}/metrics/job/{job}/{label}/{value}...` with each segment percent-encoded
pub fn push_url(target: &PushTarget) -> Result<Url> {
    let invalid = |reason: &str| MonitorError::InvalidUrl {
        url: target.gateway_url.clone(),
        reason: reason.to_string(),
    };

    let mut url = Url::parse(&target.gateway_url).map_err(|e| invalid(&e.to_string()))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| invalid("URL cannot be a base"))?;
        segments.pop_if_empty().extend(["metrics", "job", target.job.as_str()]);
        for (name, value) in &target.grouping {
            segments.push(name).push(value);
        }
    }
    Ok(url)
}

/// Prometheus text exposition of one untimestamped gauge
pub fn render_gauge(sample: &Sample) -> String {
    let help = sample.help.replace('\\', "\\\\").replace('\n', "\\n");
    format!(
        "# HELP {name} {help}\n# TYPE {name} gauge\n{name} {value}\n",
        name = sample.metric,
        help = help,
        value = sample.value
    )
}
