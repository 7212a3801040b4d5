use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use slarn_core::{Item, RemoteSource};

use crate::error::{HttpSourceError, Result};

/// Marks where the percent-encoded query goes in an endpoint string.
pub const QUERY_TOKEN: &str = "{query}";

const USER_AGENT: &str = "slarn/0.1";

/// Build the request URL for `query` against `source`.
///
/// `https://api/people?name={query}` substitutes the token; any other
/// endpoint gets the query appended as the `q` parameter.
pub fn request_url(source: &str, query: &str) -> Result<String> {
    let encoded = urlencoding::encode(query);
    let url = if source.contains(QUERY_TOKEN) {
        source.replace(QUERY_TOKEN, &encoded)
    } else if source.contains('?') {
        format!("{source}&q={encoded}")
    } else {
        format!("{source}?q={encoded}")
    };

    reqwest::Url::parse(&url).map_err(|e| HttpSourceError::InvalidUrl(format!("{url}: {e}")))?;
    Ok(url)
}

/// Remote search over HTTP: `GET` the endpoint, read a JSON list of items.
///
/// Accepts a bare array or an object holding the array under `items` or
/// `data`. Requests are never retried.
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(10))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .gzip(true)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn fetch(&self, query: &str, source: &str) -> Result<Vec<Item>> {
        let url = request_url(source, query)?;
        tracing::debug!(%url, "fetching suggestions");

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(HttpSourceError::Api(
                url,
                format!("HTTP {}: {body}", status.as_u16()),
            ));
        }

        let text = resp.text().await?;
        let val: Value =
            serde_json::from_str(&text).map_err(|e| HttpSourceError::Parse(e.to_string()))?;
        parse_items(val)
    }
}

fn parse_items(val: Value) -> Result<Vec<Item>> {
    let elements = match val {
        Value::Array(elements) => elements,
        Value::Object(mut fields) => match fields.remove("items").or_else(|| fields.remove("data")) {
            Some(Value::Array(elements)) => elements,
            _ => {
                return Err(HttpSourceError::Parse(
                    "expected an \"items\" or \"data\" array in the response".to_string(),
                ));
            }
        },
        other => {
            return Err(HttpSourceError::Parse(format!(
                "expected a JSON array of items, got {other}"
            )));
        }
    };

    elements
        .into_iter()
        .map(|e| Item::from_value(e).map_err(|err| HttpSourceError::Parse(err.to_string())))
        .collect()
}

#[async_trait]
impl RemoteSource for HttpSource {
    async fn search(&self, query: &str, source: &str) -> slarn_core::Result<Vec<Item>> {
        Ok(self.fetch(query, source).await?)
    }
}
