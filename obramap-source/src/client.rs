use crate::error::{Result, SourceError};
use crate::result::FetchResult;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// View queried when none is configured.
pub const DEFAULT_VIEW: &str = "constructions_view";

/// PostgREST caps responses at 1000 rows unless told otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Paged reads need a stable row order; PostgREST gives none without `order`.
pub const DEFAULT_ORDER: &str = "id.asc";

/// Called after every page with `(pages_fetched, rows_so_far)`.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Reads every row of a Supabase table or view through its PostgREST API.
pub struct ConstructionSource {
    client: Client,
    endpoint: Url,
    api_key: String,
    view: String,
    page_size: Option<usize>,
    order: Option<String>,
    progress_callback: Option<ProgressCallback>,
}

impl ConstructionSource {
    pub fn new(endpoint: Url, api_key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(endpoint, api_key, 15)
    }

    pub fn with_timeout(endpoint: Url, api_key: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        if endpoint.cannot_be_a_base() {
            return Err(SourceError::InvalidUrl(format!(
                "{} cannot be used as a base URL",
                endpoint
            )));
        }

        let client = Client::builder()
            .user_agent(concat!("obramap/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs((timeout_secs / 2).max(1)))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
            view: DEFAULT_VIEW.to_string(),
            page_size: Some(DEFAULT_PAGE_SIZE),
            order: Some(DEFAULT_ORDER.to_string()),
            progress_callback: None,
        })
    }

    pub fn with_view(mut self, view: impl Into<String>) -> Self {
        self.view = view.into();
        self
    }

    /// `None` issues a single unpaged request.
    pub fn with_page_size(mut self, page_size: Option<usize>) -> Self {
        self.page_size = page_size.filter(|size| *size > 0);
        self
    }

    /// PostgREST `order` expression, e.g. `id.asc` or `date.desc,id.asc`.
    /// An empty string sends no ordering.
    pub fn with_order(mut self, order: impl Into<String>) -> Self {
        let order = order.into();
        self.order = (!order.trim().is_empty()).then_some(order);
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Fetch every row of the view, following pages until a short one comes back.
    pub async fn fetch(&self) -> Result<FetchResult> {
        info!("Fetching rows from view {}", self.view);

        let url = self.view_url()?;
        let start = Instant::now();
        let mut result = FetchResult::new(self.view.clone());
        let mut offset = 0usize;

        loop {
            let page = self.fetch_page(&url, offset).await?;
            let page_len = page.len();
            result.pages += 1;
            result.rows.extend(page);

            if let Some(ref callback) = self.progress_callback {
                callback(result.pages, result.rows.len());
            }

            match self.page_size {
                Some(size) if page_len >= size => offset += page_len,
                _ => break,
            }
        }

        result.response_time = start.elapsed();
        info!(
            "Fetched {} rows from {} in {} page(s)",
            result.rows.len(),
            self.view,
            result.pages
        );
        Ok(result)
    }

    /// Convenience wrapper around [`fetch`](Self::fetch) returning only the rows.
    pub async fn fetch_rows(&self) -> Result<Vec<Value>> {
        Ok(self.fetch().await?.rows)
    }

    async fn fetch_page(&self, url: &Url, offset: usize) -> Result<Vec<Value>> {
        let mut request = self
            .client
            .get(url.clone())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .query(&[("select", "*")]);

        if let Some(size) = self.page_size {
            request = request.query(&[("limit", size), ("offset", offset)]);
        }
        if let Some(ref order) = self.order {
            request = request.query(&[("order", order)]);
        }

        debug!("GET {} (offset {})", url, offset);
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = api_error_message(status, &body);
            warn!("Backend error for {}: {} {}", self.view, status.as_u16(), message);
            return Err(SourceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Array(rows)) => Ok(rows),
            Ok(other) => Err(SourceError::UnexpectedPayload(format!(
                "expected a JSON array, got {}",
                json_kind(&other)
            ))),
            Err(e) => Err(SourceError::UnexpectedPayload(format!("invalid JSON: {}", e))),
        }
    }

    fn view_url(&self) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::InvalidUrl(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(["rest", "v1", self.view.as_str()]);
        Ok(url)
    }
}

/// PostgREST puts the human readable part of an error in `message`.
fn api_error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path, query_param},
    };

    fn source_for(server: &MockServer) -> ConstructionSource {
        let endpoint = Url::parse(&server.uri()).unwrap();
        ConstructionSource::new(endpoint, "test-key").unwrap()
    }

    #[tokio::test]
    async fn test_fetch_sends_supabase_headers() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/constructions_view"))
            .and(header("apikey", "test-key"))
            .and(header("authorization", "Bearer test-key"))
            .and(query_param("select", "*"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "1", "status": "aprovada"},
                {"id": "2", "status": "consulta"}
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let rows = source_for(&mock_server).fetch_rows().await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], "1");
    }

    #[tokio::test]
    async fn test_fetch_follows_pages_until_short_page() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/constructions_view"))
            .and(query_param("offset", "0"))
            .and(query_param("limit", "2"))
            .and(query_param("order", "id.asc"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"id": "a"}, {"id": "b"}])),
            )
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/constructions_view"))
            .and(query_param("offset", "2"))
            .and(query_param("order", "id.asc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "c"}])))
            .mount(&mock_server)
            .await;

        let progress: Arc<Mutex<Vec<(usize, usize)>>> = Arc::new(Mutex::new(Vec::new()));
        let progress_clone = progress.clone();

        let result = source_for(&mock_server)
            .with_page_size(Some(2))
            .with_progress_callback(Arc::new(move |pages, rows| {
                progress_clone.lock().unwrap().push((pages, rows));
            }))
            .fetch()
            .await
            .unwrap();

        assert_eq!(result.pages, 2);
        assert_eq!(result.len(), 3);
        assert_eq!(result.rows[2]["id"], "c");
        assert_eq!(*progress.lock().unwrap(), vec![(1, 2), (2, 3)]);
    }

    #[tokio::test]
    async fn test_custom_view_and_endpoint_path() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/base/rest/v1/obras"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let endpoint = Url::parse(&format!("{}/base/", mock_server.uri())).unwrap();
        let source = ConstructionSource::new(endpoint, "k")
            .unwrap()
            .with_view("obras")
            .with_page_size(None);

        let result = source.fetch().await.unwrap();
        assert!(result.is_empty());
        assert_eq!(result.pages, 1);
    }

    #[tokio::test]
    async fn test_custom_order_is_sent() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/constructions_view"))
            .and(query_param("order", "date.desc,id.asc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "1"}])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let rows = source_for(&mock_server)
            .with_order("date.desc,id.asc")
            .fetch_rows()
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_blank_order_is_dropped() {
        let endpoint = Url::parse("https://abc.supabase.co").unwrap();
        let source = ConstructionSource::new(endpoint, "k").unwrap();
        assert_eq!(source.order.as_deref(), Some(DEFAULT_ORDER));
        assert!(source.with_order("  ").order.is_none());
    }

    #[tokio::test]
    async fn test_api_error_message_is_extracted() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "code": "42P01",
                "message": "relation \"public.constructions_view\" does not exist"
            })))
            .mount(&mock_server)
            .await;

        let err = source_for(&mock_server).fetch_rows().await.unwrap_err();

        match err {
            SourceError::Api { status, message } => {
                assert_eq!(status, 404);
                assert!(message.contains("does not exist"));
            }
            other => panic!("expected an API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_array_payload_is_an_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rows": []})))
            .mount(&mock_server)
            .await;

        let err = source_for(&mock_server).fetch_rows().await.unwrap_err();
        assert!(matches!(err, SourceError::UnexpectedPayload(_)));
        assert!(err.to_string().contains("an object"));
    }

    #[test]
    fn test_api_error_message_falls_back_to_body_then_reason() {
        assert_eq!(
            api_error_message(StatusCode::BAD_GATEWAY, "  upstream down "),
            "upstream down"
        );
        assert_eq!(
            api_error_message(StatusCode::UNAUTHORIZED, ""),
            "Unauthorized"
        );
    }

    #[test]
    fn test_rejects_non_base_endpoint() {
        let endpoint = Url::parse("mailto:someone@example.com").unwrap();
        assert!(matches!(
            ConstructionSource::new(endpoint, "k"),
            Err(SourceError::InvalidUrl(_))
        ));
    }
}
