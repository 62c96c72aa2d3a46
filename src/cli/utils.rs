use anyhow::{anyhow, bail, Context};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use crate::cli::{OutputFormat, Remote};

/// Output a success message in the appropriate format
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });
            if let Some(data_value) = data {
                response["data"] = data_value;
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Call the API and unwrap its `{ success, data }` envelope
pub async fn call(remote: &Remote, method: Method, path: &str, body: Option<Value>) -> anyhow::Result<Value> {
    let client = reqwest::Client::new();
    let url = format!("{}{}", remote.url, path);

    let mut request = client
        .request(method, &url)
        .timeout(std::time::Duration::from_secs(30));
    if let Some(token) = &remote.token {
        request = request.bearer_auth(token);
    }
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request.send().await.with_context(|| format!("request to {} failed", url))?;
    let status = response.status();
    let payload: Value = response
        .json()
        .await
        .with_context(|| format!("{} returned a non-JSON body ({})", url, status))?;

    if status == StatusCode::UNAUTHORIZED && remote.token.is_none() {
        bail!("{} requires a session token; pass --token or set DASHBOARD_TOKEN", path);
    }
    if !status.is_success() {
        let message = payload
            .get("message")
            .or_else(|| payload.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("request failed");
        return Err(anyhow!("{} ({})", message, status));
    }

    Ok(payload.get("data").cloned().unwrap_or(payload))
}
