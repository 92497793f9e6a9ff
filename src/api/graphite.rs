use std::time::Duration;

use reqwest::{Method, Response, Url};
use serde_json::Value;

use super::client::{expect_success, send};
use crate::error::{DashboardError, Result};
use crate::models::{GraphFormat, GraphQuery, TimeWindow};

pub const RENDER_WIDTH: u32 = 800;

/// Client for the time-series `/render` endpoint.
#[derive(Clone)]
pub struct GraphiteClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl GraphiteClient {
    pub fn new(client: reqwest::Client, base_url: &str, timeout: Duration) -> Self {
        GraphiteClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn render_url(&self, window: TimeWindow, format: GraphFormat, query: &GraphQuery) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/render", self.base_url))
            .map_err(|e| DashboardError::Config(format!("invalid GRAPHITE_URL: {}", e)))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("from", &format!("-{}", window.as_str()))
                .append_pair("width", &RENDER_WIDTH.to_string())
                .append_pair("format", format.as_str());
            for target in &query.targets {
                pairs.append_pair("target", target);
            }
            if let Some(y_min) = query.y_min {
                pairs.append_pair("yMin", &y_min.to_string());
            }
        }
        Ok(url)
    }

    /// GET a render URL, failing on transport errors and non-2xx answers.
    pub async fn fetch(&self, url: &Url) -> Result<Response> {
        let resp = send(&self.client, Method::GET, url.as_str(), None, None, Some(self.timeout)).await?;
        expect_success("time-series", resp).await
    }

    pub async fn fetch_json(&self, url: &Url) -> Result<Value> {
        let resp = self.fetch(url).await?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Value of the sample `offset` positions from the end of the first
/// series' datapoints. `None` for a missing series, a short series, or a
/// null sample.
pub fn sample_from_end(payload: &Value, offset: usize) -> Option<f64> {
    if offset == 0 {
        return None;
    }
    let points = payload
        .as_array()?
        .first()?
        .get("datapoints")?
        .as_array()?;
    let idx = points.len().checked_sub(offset)?;
    points.get(idx)?.as_array()?.first()?.as_f64()
}
