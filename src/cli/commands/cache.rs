use anyhow::bail;
use clap::Subcommand;
use reqwest::Method;
use serde_json::{json, Value};

use crate::cache::CacheTag;
use crate::cli::{
    utils::{call, output_success},
    OutputFormat, Remote,
};

#[derive(Subcommand)]
pub enum CacheCommands {
    #[command(about = "Purge every cached result under a tag")]
    Invalidate {
        #[arg(help = "Cache tag, e.g. funnel-metrics or sga-hub")]
        tag: String,
    },

    #[command(about = "Report a completed warehouse load")]
    Refresh {
        #[arg(long = "tag", help = "Refreshed tag (repeatable); all tags when omitted")]
        tags: Vec<String>,
        #[arg(long, help = "Name of the loader reporting the refresh")]
        source: Option<String>,
    },

    #[command(about = "Show cache counters")]
    Stats,
}

fn parse_tags(raw: &[String]) -> anyhow::Result<Vec<CacheTag>> {
    raw.iter()
        .map(|t| t.parse::<CacheTag>().map_err(anyhow::Error::msg))
        .collect()
}

pub async fn handle(cmd: CacheCommands, remote: &Remote, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        CacheCommands::Invalidate { tag } => {
            let tag: CacheTag = tag.parse().map_err(anyhow::Error::msg)?;
            let data = call(remote, Method::POST, &format!("/api/admin/cache/invalidate/{}", tag), None).await?;
            let purged = data.get("purged").and_then(Value::as_u64).unwrap_or(0);
            output_success(output_format, &format!("Invalidated '{}' ({} entries)", tag, purged), Some(data))
        }
        CacheCommands::Refresh { tags, source } => {
            let tags = parse_tags(&tags)?;
            let mut body = json!({});
            if !tags.is_empty() {
                body["tags"] = json!(tags);
            }
            if let Some(source) = source {
                body["source"] = json!(source);
            }
            let data = call(remote, Method::POST, "/api/admin/cache/refresh", Some(body)).await?;
            let id = data.get("id").and_then(Value::as_str).unwrap_or("?").to_string();
            output_success(output_format, &format!("Refresh {} queued", id), Some(data))
        }
        CacheCommands::Stats => {
            let data = call(remote, Method::GET, "/api/admin/cache/stats", None).await?;
            match output_format {
                OutputFormat::Json => output_success(output_format, "Cache stats", Some(data)),
                OutputFormat::Text => {
                    if let Some(fields) = data.as_object() {
                        for (name, value) in fields {
                            println!("{:<14} {}", name, value);
                        }
                    }
                    Ok(())
                }
            }
        }
    }
}

pub async fn health(remote: &Remote, output_format: OutputFormat) -> anyhow::Result<()> {
    let data = call(remote, Method::GET, "/health", None).await?;
    if data.get("status").and_then(Value::as_str) != Some("ok") {
        bail!("server at {} is degraded", remote.url);
    }
    output_success(output_format, &format!("{} is healthy", remote.url), Some(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tags_are_rejected_before_any_call() {
        assert!(parse_tags(&["sga-hub".to_string()]).is_ok());
        assert!(parse_tags(&["q4-2025".to_string()]).is_err());
    }
}
