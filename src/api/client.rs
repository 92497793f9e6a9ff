use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::{Method, Response};
use serde_json::Value;
use yansi::Paint;

use crate::error::{DashboardError, Result};

static SILENT: AtomicBool = AtomicBool::new(false);

pub fn set_silent(silent: bool) {
    SILENT.store(silent, Ordering::Relaxed);
}

fn log_output(msg: String) {
    if !SILENT.load(Ordering::Relaxed) {
        println!("{}", msg);
    }
}

/// Render an outbound request as a colourised curl command. The token value
/// is never printed.
pub fn curl_line(method: &Method, url: &str, has_token: bool, body: Option<&Value>) -> String {
    let mut parts = Vec::new();
    parts.push(Paint::new("curl").fg(yansi::Color::Green).bold().to_string());
    parts.push(format!("-X {}", Paint::new(method.as_str()).fg(yansi::Color::Yellow).bold()));
    parts.push(format!("'{}'", Paint::new(url).fg(yansi::Color::Cyan)));

    if has_token {
        parts.push(format!(
            "{} {}",
            Paint::new("-H").fg(yansi::Color::Magenta),
            Paint::new("'X-Auth-Token: <redacted>'").fg(yansi::Color::Magenta)
        ));
    }
    if let Some(d) = body {
        parts.push(format!(
            "{} {}",
            Paint::new("-H").fg(yansi::Color::Magenta),
            Paint::new("'Content-Type: application/json'").fg(yansi::Color::Magenta)
        ));
        let json_str = serde_json::to_string(&redact_secrets(d, "")).unwrap_or_default();
        let escaped_json = json_str.replace('\'', "'\\''");
        parts.push(format!(
            "{} {}",
            Paint::new("-d").fg(yansi::Color::Blue),
            Paint::new(format!("'{}'", escaped_json)).fg(yansi::Color::White)
        ));
    }
    parts.join(" ")
}

// Password strings and token ids inside a `token` object.
fn redact_secrets(value: &Value, parent: &str) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let secret = v.is_string() && (k == "password" || (parent == "token" && k == "id"));
                    if secret {
                        (k.clone(), Value::String("<redacted>".into()))
                    } else {
                        (k.clone(), redact_secrets(v, k))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| redact_secrets(v, parent)).collect()),
        other => other.clone(),
    }
}

/// Core HTTP call shared by every external service client.
/// Adds the auth token, logs the request, and returns the raw response
/// whatever its status.
pub async fn send(
    client: &reqwest::Client,
    method: Method,
    url: &str,
    token: Option<&str>,
    body: Option<&Value>,
    timeout: Option<Duration>,
) -> Result<Response> {
    log_output(format!("Request:\n{}", curl_line(&method, url, token.is_some(), body)));

    let mut req = client.request(method.clone(), url);
    if let Some(t) = token {
        req = req.header("X-Auth-Token", t);
    }
    if let Some(b) = body {
        req = req.json(b);
    }
    if let Some(t) = timeout {
        req = req.timeout(t);
    }

    match req.send().await {
        Ok(resp) => {
            let status_line = format!("{} {} -> {}", method, url, resp.status());
            log_output(format!("Response: {}", Paint::new(status_line).rgb(100, 100, 100)));
            Ok(resp)
        }
        Err(e) => {
            tracing::warn!(%e, %method, url, "Request failed");
            Err(DashboardError::Http(e))
        }
    }
}

/// Turn a non-2xx response into the matching error, reading the body for context.
pub async fn expect_success(service: &'static str, resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(DashboardError::from_status(service, status.as_u16(), body))
}

pub async fn json_call(
    client: &reqwest::Client,
    service: &'static str,
    method: Method,
    url: &str,
    token: Option<&str>,
    body: Option<&Value>,
) -> Result<Value> {
    let resp = send(client, method, url, token, body, None).await?;
    let resp = expect_success(service, resp).await?;
    if resp.status() == reqwest::StatusCode::NO_CONTENT {
        return Ok(Value::Null);
    }
    let bytes = resp.bytes().await?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)?)
}
