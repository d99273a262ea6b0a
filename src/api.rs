use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use thiserror::Error;
use tracing::warn;

pub const NOTIFICATIONS_PATH: &str = "/api/notifications";
pub const DASHBOARD_PATH: &str = "/api/dashboard_data";

#[derive(Debug, Error)]
pub enum PollError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned {status}")]
    Status { url: String, status: StatusCode },
    #[error("malformed response body: {0}")]
    Body(#[from] serde_json::Error),
}

/// Task priority as the server sends it: usually a label, sometimes a number,
/// occasionally `null` straight from an unset column.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Priority {
    Number(serde_json::Number),
    Text(String),
    Other(Value),
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Text(String::new())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Number(n) => write!(f, "{}", n),
            Priority::Text(s) => f.write_str(s),
            Priority::Other(v) => f.write_str(&display_value(v)),
        }
    }
}

/// Renders a JSON value the way it reads in a message: strings bare,
/// everything else in its JSON form (`null`, `true`, `42`).
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn any_as_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Value::deserialize(deserializer).map(|v| display_value(&v))
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct NotificationItem {
    #[serde(deserialize_with = "any_as_text")]
    pub title: String,
    pub priority: Priority,
}

impl NotificationItem {
    pub fn headline(&self) -> String {
        format!("Tarefa: {}", self.title)
    }

    pub fn detail(&self) -> String {
        format!("Prioridade: {}", self.priority)
    }

    /// Text of the blocking fallback dialog.
    pub fn dialog_text(&self) -> String {
        format!("{}\n{}", self.headline(), self.detail())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub struct DashboardStats {
    pub total: u64,
    pub pending: u64,
    pub overdue: u64,
    pub no_notify: u64,
}

/// Anything shaped other than a non-empty array means "nothing due".
pub fn parse_notifications(body: &str) -> Result<Vec<NotificationItem>, PollError> {
    let value: Value = serde_json::from_str(body)?;
    let Value::Array(entries) = value else {
        return Ok(Vec::new());
    };
    let items = entries
        .into_iter()
        .filter_map(|entry| {
            if !entry.is_object() {
                warn!(%entry, "skipping notification entry that is not an object");
                return None;
            }
            match serde_json::from_value::<NotificationItem>(entry) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(error = %e, "skipping malformed notification entry");
                    None
                }
            }
        })
        .collect();
    Ok(items)
}

pub fn parse_dashboard(body: &str) -> Result<DashboardStats, PollError> {
    Ok(serde_json::from_str(body)?)
}

/// The two read-only endpoints the pollers hit.
pub trait TaskApi: Clone + Send + Sync + 'static {
    fn fetch_notifications(
        &self,
    ) -> impl Future<Output = Result<Vec<NotificationItem>, PollError>> + Send;

    fn fetch_dashboard(&self) -> impl Future<Output = Result<DashboardStats, PollError>> + Send;
}

#[derive(Clone)]
pub struct HttpApi {
    base_url: String,
    http: Client,
}

impl HttpApi {
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let http = Client::builder().build()?;
        Ok(Self::with_client(base_url, http))
    }

    pub fn with_client(base_url: &str, http: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_text(&self, path: &str, require_success: bool) -> Result<String, PollError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| PollError::Transport { url: url.clone(), source })?;

        let status = resp.status();
        if require_success && !status.is_success() {
            return Err(PollError::Status { url, status });
        }

        resp.text()
            .await
            .map_err(|source| PollError::Transport { url, source })
    }
}

impl TaskApi for HttpApi {
    async fn fetch_notifications(&self) -> Result<Vec<NotificationItem>, PollError> {
        // The notifications feed is read regardless of status; an error page
        // simply fails to parse.
        let body = self.get_text(NOTIFICATIONS_PATH, false).await?;
        parse_notifications(&body)
    }

    async fn fetch_dashboard(&self) -> Result<DashboardStats, PollError> {
        let body = self.get_text(DASHBOARD_PATH, true).await?;
        parse_dashboard(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{}", addr)
    }

    fn api(base: &str) -> HttpApi {
        let http = Client::builder().no_proxy().build().unwrap();
        HttpApi::with_client(base, http)
    }

    #[test]
    fn test_parse_notifications_mixed_priorities() {
        let items = parse_notifications(
            r#"[{"title":"Pagar conta","priority":"Alta"},{"title":"Ligar","priority":2}]"#,
        )
        .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].headline(), "Tarefa: Pagar conta");
        assert_eq!(items[0].detail(), "Prioridade: Alta");
        assert_eq!(items[1].detail(), "Prioridade: 2");
        assert_eq!(items[1].dialog_text(), "Tarefa: Ligar\nPrioridade: 2");
    }

    #[test]
    fn test_parse_notifications_non_array_is_empty() {
        assert!(parse_notifications(r#"{"title":"x"}"#).unwrap().is_empty());
        assert!(parse_notifications("null").unwrap().is_empty());
        assert!(parse_notifications("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_notifications_skips_non_objects() {
        let items = parse_notifications(r#"["oops", {"title":"Ok","priority":"Baixa"}]"#).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Ok");
    }

    #[test]
    fn test_parse_notifications_null_priority_and_numeric_title() {
        let items = parse_notifications(
            r#"[{"id":7,"title":"Pagar conta","priority":null},{"id":8,"title":42,"priority":"Alta"}]"#,
        )
        .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].priority, Priority::Other(Value::Null));
        assert_eq!(items[0].dialog_text(), "Tarefa: Pagar conta\nPrioridade: null");
        assert_eq!(items[1].title, "42");
        assert_eq!(items[1].headline(), "Tarefa: 42");
    }

    #[test]
    fn test_parse_notifications_odd_field_types() {
        let items = parse_notifications(
            r#"[{"title":null,"priority":true},{"title":"Sem prioridade"}]"#,
        )
        .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].dialog_text(), "Tarefa: null\nPrioridade: true");
        assert_eq!(items[1].detail(), "Prioridade: ");
    }

    #[test]
    fn test_parse_notifications_invalid_json() {
        assert!(matches!(parse_notifications("<html>"), Err(PollError::Body(_))));
    }

    #[test]
    fn test_parse_dashboard() {
        let stats =
            parse_dashboard(r#"{"total":10,"pending":4,"overdue":2,"no_notify":1}"#).unwrap();
        assert_eq!(
            stats,
            DashboardStats { total: 10, pending: 4, overdue: 2, no_notify: 1 }
        );
        assert!(parse_dashboard(r#"{"total":10}"#).is_err());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        assert_eq!(api("http://localhost:5000/").base_url(), "http://localhost:5000");
    }

    #[tokio::test]
    async fn test_fetch_dashboard_over_http() {
        let base =
            serve_once("200 OK", r#"{"total":10,"pending":4,"overdue":2,"no_notify":1}"#).await;
        let stats = api(&base).fetch_dashboard().await.unwrap();
        assert_eq!(stats.total, 10);
        assert_eq!(stats.no_notify, 1);
    }

    #[tokio::test]
    async fn test_fetch_dashboard_non_success_status() {
        let base = serve_once("500 Internal Server Error", r#"{"error":"boom"}"#).await;
        let err = api(&base).fetch_dashboard().await.unwrap_err();
        assert!(matches!(err, PollError::Status { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn test_fetch_notifications_over_http() {
        let base = serve_once("200 OK", r#"[{"title":"Relatório","priority":"Média"}]"#).await;
        let items = api(&base).fetch_notifications().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Relatório");
    }

    #[tokio::test]
    async fn test_fetch_unreachable_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = api(&format!("http://{}", addr)).fetch_notifications().await.unwrap_err();
        assert!(matches!(err, PollError::Transport { .. }));
    }
}
