//! PostgREST-backed leaderboard store.
//!
//! Rows live in one table keyed by `(device_id, month_year)`. Filters use
//! the PostgREST operator syntax (`eq.`, `gt.`) in the query string.

use async_trait::async_trait;
use reqwest::header::CONTENT_RANGE;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use url::Url;

use super::remote::{DeleteFilter, RemoteStore};
use super::LeaderboardEntry;
use crate::error::{ConfigError, RemoteError, Result};
use crate::storage::LeaderboardConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for a PostgREST leaderboard table.
#[derive(Debug, Clone)]
pub struct RestRemoteStore {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl RestRemoteStore {
    /// Build a store for `table` under `base_url`.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: &str, table: &str, api_key: Option<String>) -> Result<Self> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: "leaderboard.remote_url".into(),
            message,
        };

        let mut base = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base
            .join(&format!("rest/v1/{table}"))
            .map_err(|e| invalid(e.to_string()))?;

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(RemoteError::from)?;

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    /// Store described by the `[leaderboard]` config section, if a URL is set.
    ///
    /// # Errors
    /// Returns an error if the configured URL is invalid.
    pub fn from_config(config: &LeaderboardConfig) -> Result<Option<Self>> {
        match config.remote_url.as_deref().filter(|u| !u.trim().is_empty()) {
            Some(url) => Self::new(url, &config.table, config.api_key.clone()).map(Some),
            None => Ok(None),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("apikey", key).bearer_auth(key),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, RemoteError> {
        let response = self.authorized(builder).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), %body, "leaderboard request rejected");
        Err(RemoteError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn fetch_rows(&self, query: &[(&str, String)]) -> Result<Vec<LeaderboardEntry>, RemoteError> {
        let response = self
            .send(self.client.get(self.endpoint.clone()).query(query))
            .await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }
}

/// Total from a PostgREST `Content-Range` value such as `0-9/42` or `*/42`.
fn parse_total_count(range: &str) -> Result<usize, RemoteError> {
    range
        .rsplit_once('/')
        .and_then(|(_, total)| total.trim().parse().ok())
        .ok_or_else(|| RemoteError::InvalidResponse(format!("bad Content-Range: {range}")))
}

#[async_trait]
impl RemoteStore for RestRemoteStore {
    async fn upsert(&self, entry: &LeaderboardEntry) -> Result<(), RemoteError> {
        let request = self
            .client
            .post(self.endpoint.clone())
            .query(&[("on_conflict", "device_id,month_year")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[entry]);
        self.send(request).await?;
        tracing::debug!(device_id = %entry.device_id, month = %entry.month_year, sessions = entry.total_sessions, "leaderboard row upserted");
        Ok(())
    }

    async fn top_for_month(
        &self,
        month: &str,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, RemoteError> {
        self.fetch_rows(&[
            ("select", "*".to_string()),
            ("month_year", format!("eq.{month}")),
            ("order", "total_sessions.desc".to_string()),
            ("limit", limit.to_string()),
        ])
        .await
    }

    async fn find(
        &self,
        device_id: &str,
        month: &str,
    ) -> Result<Option<LeaderboardEntry>, RemoteError> {
        let rows = self
            .fetch_rows(&[
                ("select", "*".to_string()),
                ("device_id", format!("eq.{device_id}")),
                ("month_year", format!("eq.{month}")),
                ("limit", "1".to_string()),
            ])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn count_above(&self, month: &str, sessions: u32) -> Result<usize, RemoteError> {
        let request = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("select", "device_id".to_string()),
                ("month_year", format!("eq.{month}")),
                ("total_sessions", format!("gt.{sessions}")),
                ("limit", "0".to_string()),
            ])
            .header("Prefer", "count=exact");
        let response = self.send(request).await?;
        let range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| RemoteError::InvalidResponse("missing Content-Range".to_string()))?;
        parse_total_count(range)
    }

    async fn delete(&self, filter: &DeleteFilter) -> Result<(), RemoteError> {
        let mut query = Vec::new();
        match filter {
            DeleteFilter::Device { device_id, month } => {
                query.push(("device_id", format!("eq.{device_id}")));
                if let Some(month) = month {
                    query.push(("month_year", format!("eq.{month}")));
                }
            }
            DeleteFilter::Month(month) => query.push(("month_year", format!("eq.{month}"))),
        }
        self.send(self.client.delete(self.endpoint.clone()).query(&query))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mockito::Matcher;

    const PATH: &str = "/rest/v1/leaderboard_users";

    fn store(server: &mockito::Server) -> RestRemoteStore {
        RestRemoteStore::new(&server.url(), "leaderboard_users", Some("anon-key".into())).unwrap()
    }

    fn row_json(device: &str, sessions: u32) -> serde_json::Value {
        serde_json::json!({
            "device_id": device,
            "username": null,
            "country_code": "TH",
            "total_sessions": sessions,
            "month_year": "2025-06",
            "last_updated": "2025-06-10T08:00:00+00:00"
        })
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let store = RestRemoteStore::new("https://example.com/api", "scores", None).unwrap();
        assert_eq!(store.endpoint().as_str(), "https://example.com/api/rest/v1/scores");
    }

    #[test]
    fn missing_url_means_no_store() {
        let config = LeaderboardConfig::default();
        assert!(RestRemoteStore::from_config(&config).unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_posts_merge_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .match_query(Matcher::UrlEncoded(
                "on_conflict".into(),
                "device_id,month_year".into(),
            ))
            .match_header("apikey", "anon-key")
            .match_header("authorization", "Bearer anon-key")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"^\[\{"#.into()),
                Matcher::Regex(r#""device_id":"neckline-a""#.into()),
                Matcher::Regex(r#""total_sessions":7"#.into()),
            ]))
            .with_status(201)
            .create_async()
            .await;

        let entry = LeaderboardEntry {
            device_id: "neckline-a".into(),
            username: Some("sam".into()),
            country_code: None,
            total_sessions: 7,
            month_year: "2025-06".into(),
            last_updated: Utc::now(),
            rank: Some(4),
        };
        store(&server).upsert(&entry).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn top_for_month_filters_and_orders() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::json!([row_json("a", 50), row_json("b", 30)]).to_string();
        let mock = server
            .mock("GET", PATH)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("month_year".into(), "eq.2025-06".into()),
                Matcher::UrlEncoded("order".into(), "total_sessions.desc".into()),
                Matcher::UrlEncoded("limit".into(), "100".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let rows = store(&server).top_for_month("2025-06", 100).await.unwrap();
        mock.assert_async().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].total_sessions, 50);
        assert_eq!(rows[1].country_code.as_deref(), Some("TH"));
        assert_eq!(rows[0].rank, None);
    }

    #[tokio::test]
    async fn count_above_reads_exact_count_without_rows() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", PATH)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("select".into(), "device_id".into()),
                Matcher::UrlEncoded("month_year".into(), "eq.2025-06".into()),
                Matcher::UrlEncoded("total_sessions".into(), "gt.40".into()),
                Matcher::UrlEncoded("limit".into(), "0".into()),
            ]))
            .match_header("prefer", "count=exact")
            .with_status(200)
            .with_header("content-range", "*/1234")
            .with_body("[]")
            .create_async()
            .await;

        let count = store(&server).count_above("2025-06", 40).await.unwrap();
        mock.assert_async().await;
        assert_eq!(count, 1234);
    }

    #[tokio::test]
    async fn count_above_without_content_range_is_invalid() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let err = store(&server).count_above("2025-06", 40).await.unwrap_err();
        assert!(matches!(err, RemoteError::InvalidResponse(_)));
    }

    #[test]
    fn content_range_total_is_parsed() {
        assert_eq!(parse_total_count("0-9/42").unwrap(), 42);
        assert_eq!(parse_total_count("*/0").unwrap(), 0);
        assert!(parse_total_count("*/*").is_err());
    }

    #[tokio::test]
    async fn delete_targets_device() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", PATH)
            .match_query(Matcher::UrlEncoded(
                "device_id".into(),
                "eq.neckline-a".into(),
            ))
            .with_status(204)
            .create_async()
            .await;

        store(&server)
            .delete(&DeleteFilter::Device {
                device_id: "neckline-a".into(),
                month: None,
            })
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", PATH)
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("invalid api key")
            .create_async()
            .await;

        let err = store(&server).find("neckline-a", "2025-06").await.unwrap_err();
        match err {
            RemoteError::Status { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid api key");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn malformed_payload_is_invalid_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("{\"not\":\"a list\"}")
            .create_async()
            .await;

        let err = store(&server).top_for_month("2025-06", 5).await.unwrap_err();
        assert!(matches!(err, RemoteError::InvalidResponse(_)));
    }
}
