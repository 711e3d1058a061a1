use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::from_str;

use crate::error::{RagError, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// `Ok(false)` on 404, `Ok(true)` on any success status.
pub fn resource_exists(url: &str) -> Result<bool> {
    let client = Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .map_err(|e| RagError::Upstream(e.to_string()))?;
    let resp = client
        .get(url)
        .send()
        .map_err(|e| RagError::Upstream(format!("GET {} failed: {}", url, e)))?;
    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        return Ok(false);
    }
    if !status.is_success() {
        let text = resp.text().unwrap_or_default();
        return Err(RagError::Upstream(format!("GET {} failed: {} {}", url, status, text)));
    }
    Ok(true)
}

pub fn put_json<T: DeserializeOwned, B: Serialize>(url: &str, body: &B) -> Result<T> {
    send_json(Method::PUT, url, None, Some(body), DEFAULT_TIMEOUT)
}

pub fn post_json<T: DeserializeOwned, B: Serialize>(url: &str, body: &B) -> Result<T> {
    send_json(Method::POST, url, None, Some(body), DEFAULT_TIMEOUT)
}

/// POST with a bearer token, used for the Cohere and Slack Web APIs.
pub fn post_json_authed<T: DeserializeOwned, B: Serialize>(
    url: &str,
    token: &str,
    body: &B,
) -> Result<T> {
    send_json(Method::POST, url, Some(token), Some(body), DEFAULT_TIMEOUT)
}

pub fn post_json_with_timeout<T: DeserializeOwned, B: Serialize>(
    url: &str,
    body: &B,
    timeout: Duration,
) -> Result<T> {
    send_json(Method::POST, url, None, Some(body), timeout)
}

fn send_json<T: DeserializeOwned, B: Serialize>(
    method: Method,
    url: &str,
    token: Option<&str>,
    body: Option<&B>,
    timeout: Duration,
) -> Result<T> {
    let client = Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RagError::Upstream(e.to_string()))?;
    let mut req = client.request(method.clone(), url);
    if let Some(token) = token {
        req = req.header(AUTHORIZATION, format!("Bearer {}", token));
    }
    if let Some(body) = body {
        req = req.header(CONTENT_TYPE, "application/json").json(body);
    }
    let resp = req
        .send()
        .map_err(|e| RagError::Upstream(format!("{} {} failed: {}", method, url, e)))?;
    let status = resp.status();
    let text = resp.text().unwrap_or_default();
    if !status.is_success() {
        return Err(RagError::Upstream(format!(
            "{} {} failed: {} {}",
            method, url, status, text
        )));
    }
    from_str::<T>(&text).map_err(|e| {
        RagError::Upstream(format!("{} {} decode failed: {} | {}", method, url, e, text))
    })
}
