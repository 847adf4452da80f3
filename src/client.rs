use std::env;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use serde::Deserialize;
use url::Url;

use crate::client_logger::ClientLogger;
use crate::decoder::decode_frames;
use crate::error::{Error, Result};
use crate::observability::CLIENT_API_ERRORS;
use crate::retry::{DEFAULT_RETRY_BACKOFF, send_with_retry};
use crate::types::{
    ChatCompletion, ChatCompletionResponse, GenerationRequest, ModelCatalog, ModelDescriptor,
};

const DEFAULT_INFERENCE_URL: &str = "https://models.github.ai/";
const DEFAULT_CATALOG_URL: &str = "https://models.github.ai/catalog/models";
const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variable consulted when no token is passed explicitly.
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// A stream of text fragments decoded from a streamed completion.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Client for the GitHub Models API.
#[derive(Clone)]
pub struct GithubModels {
    token: String,
    client: ReqwestClient,
    base_url: Url,
    catalog_url: Url,
    organization: Option<String>,
    timeout: Duration,
    retry_backoff: Duration,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl fmt::Debug for GithubModels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubModels")
            .field("base_url", &self.base_url.as_str())
            .field("catalog_url", &self.catalog_url.as_str())
            .field("organization", &self.organization)
            .field("timeout", &self.timeout)
            .field("retry_backoff", &self.retry_backoff)
            .finish_non_exhaustive()
    }
}

impl GithubModels {
    /// Create a new client.
    ///
    /// The token can be provided directly or read from the `GITHUB_TOKEN`
    /// environment variable.
    pub fn new(token: Option<String>) -> Result<Self> {
        Self::with_options(token, None, None, None)
    }

    /// Create a new client with custom endpoints and timeout.
    pub fn with_options(
        token: Option<String>,
        base_url: Option<&str>,
        catalog_url: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let token = match token {
            Some(token) => token,
            None => env::var(TOKEN_ENV_VAR).map_err(|_| {
                Error::authentication(
                    "token not provided and GITHUB_TOKEN environment variable not set",
                )
            })?,
        };
        if HeaderValue::from_str(&format!("Bearer {token}")).is_err() {
            return Err(Error::authentication(
                "token contains characters that are not allowed in a header",
            ));
        }

        let base_url = parse_base_url(base_url.unwrap_or(DEFAULT_INFERENCE_URL))?;
        let catalog_url = Url::parse(catalog_url.unwrap_or(DEFAULT_CATALOG_URL))?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        // Streamed bodies are unbounded; buffered calls set a per-request timeout.
        let client = ReqwestClient::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            token,
            client,
            base_url,
            catalog_url,
            organization: None,
            timeout,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            logger: None,
        })
    }

    /// Route chat requests through an organization, billing usage to it.
    pub fn with_organization(mut self, organization: Option<String>) -> Self {
        self.organization = organization.filter(|org| !org.trim().is_empty());
        self
    }

    /// Change the delay before retrying a rate-limited request.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Attach a logger that observes requests and responses.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The organization chat requests are routed through, if any.
    pub fn organization(&self) -> Option<&str> {
        self.organization.as_deref()
    }

    /// Endpoint that receives chat-completion requests.
    pub fn chat_url(&self) -> Result<Url> {
        let path = match &self.organization {
            Some(org) => format!("orgs/{org}/v1/chat/completions"),
            None => "v1/chat/completions".to_string(),
        };
        Ok(self.base_url.join(&path)?)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| Error::authentication("token is not a valid header value"))?;
        headers.insert(header::AUTHORIZATION, bearer);
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        Ok(headers)
    }

    fn request(&self, method: Method, url: Url) -> Result<RequestBuilder> {
        Ok(self
            .client
            .request(method, url)
            .headers(self.default_headers()?))
    }

    /// A request whose whole exchange, body included, must finish within the
    /// configured timeout.
    fn buffered_request(&self, method: Method, url: Url) -> Result<RequestBuilder> {
        Ok(self.request(method, url)?.timeout(self.timeout))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let request = builder.build().map_err(|e| {
            Error::http_client(format!("Failed to build request: {e}"), Some(Box::new(e)))
        })?;
        let response = send_with_retry(&self.client, request, self.retry_backoff).await?;
        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }
        Ok(response)
    }

    /// Convert a non-success response into an [`Error::Api`].
    ///
    /// The message is the first non-empty of the JSON `message` and
    /// `error.message` fields, otherwise the raw body text.
    async fn process_error_response(response: Response) -> Error {
        CLIENT_API_ERRORS.click();
        let status = response.status();

        #[derive(Deserialize)]
        struct ErrorResponse {
            message: Option<String>,
            error: Option<ErrorDetail>,
        }

        #[derive(Deserialize)]
        struct ErrorDetail {
            message: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };

        let parsed = serde_json::from_str::<ErrorResponse>(&error_body).ok();
        let message = parsed
            .and_then(|e| {
                e.message
                    .filter(|m| !m.is_empty())
                    .or_else(|| e.error.and_then(|d| d.message))
                    .filter(|m| !m.is_empty())
            })
            .unwrap_or_else(|| {
                if error_body.trim().is_empty() {
                    status.canonical_reason().unwrap_or_default().to_string()
                } else {
                    error_body.clone()
                }
            });

        tracing::debug!(status = status.as_u16(), %message, "API error");
        Error::api(status.as_u16(), message)
    }

    /// List the models advertised by the catalog.
    pub async fn list_models(&self) -> Result<Vec<ModelDescriptor>> {
        let builder = self.buffered_request(Method::GET, self.catalog_url.clone())?;
        let response = self.send(builder).await?;
        let catalog = response.json::<ModelCatalog>().await.map_err(|e| {
            Error::serialization(format!("Failed to parse catalog: {e}"), Some(Box::new(e)))
        })?;
        Ok(catalog.into_models())
    }

    /// Send a chat request and wait for the complete response.
    pub async fn complete(&self, request: &GenerationRequest) -> Result<ChatCompletion> {
        let mut request = request.clone();
        request.stream = false;
        if let Some(logger) = &self.logger {
            logger.log_request(&request);
        }

        let builder = self
            .buffered_request(Method::POST, self.chat_url()?)?
            .json(&request);
        let response = self.send(builder).await?;
        let body = response.json::<ChatCompletionResponse>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {e}"),
                Some(Box::new(e)),
            )
        })?;

        let completion = ChatCompletion::from(body);
        if let Some(logger) = &self.logger {
            logger.log_completion(&completion);
        }
        Ok(completion)
    }

    /// Send a chat request and stream the response as text fragments.
    ///
    /// Only connecting is bounded by the configured timeout; a healthy stream may
    /// run for as long as the model keeps generating. Dropping the returned stream
    /// aborts the underlying connection.
    pub async fn stream(&self, request: &GenerationRequest) -> Result<FragmentStream> {
        let mut request = request.clone();
        request.stream = true;
        if let Some(logger) = &self.logger {
            logger.log_request(&request);
        }

        let builder = self.request(Method::POST, self.chat_url()?)?.json(&request);
        let response = self.send(builder).await?;
        let fragments = decode_frames(response.bytes_stream());

        match self.logger.clone() {
            Some(logger) => Ok(Box::pin(fragments.inspect(move |fragment| {
                if let Ok(fragment) = fragment {
                    logger.log_fragment(fragment);
                }
            }))),
            None => Ok(Box::pin(fragments)),
        }
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GithubModels {
        GithubModels::new(Some("test-token".to_string())).unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = client();
        assert_eq!(client.token, "test-token");
        assert_eq!(client.base_url.as_str(), DEFAULT_INFERENCE_URL);
        assert_eq!(client.catalog_url.as_str(), DEFAULT_CATALOG_URL);
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);
        assert_eq!(client.retry_backoff, DEFAULT_RETRY_BACKOFF);

        let client = GithubModels::with_options(
            Some("test-key".to_string()),
            Some("http://127.0.0.1:8080/proxy"),
            Some("http://127.0.0.1:8080/catalog/models"),
            Some(Duration::from_secs(30)),
        )
        .unwrap();
        assert_eq!(client.base_url.as_str(), "http://127.0.0.1:8080/proxy/");
        assert_eq!(client.timeout, Duration::from_secs(30));
    }

    #[test]
    fn invalid_urls_are_rejected() {
        let err = GithubModels::with_options(Some("t".to_string()), Some("not a url"), None, None)
            .unwrap_err();
        assert!(matches!(err, Error::Url { .. }));
    }

    #[test]
    fn token_with_newline_is_rejected() {
        let err = GithubModels::new(Some("bad\ntoken".to_string())).unwrap_err();
        assert!(err.is_authentication());
    }

    #[test]
    fn chat_url_with_and_without_organization() {
        let client = client();
        assert_eq!(
            client.chat_url().unwrap().as_str(),
            "https://models.github.ai/v1/chat/completions"
        );
        let client = client.with_organization(Some("octo-org".to_string()));
        assert_eq!(client.organization(), Some("octo-org"));
        assert_eq!(
            client.chat_url().unwrap().as_str(),
            "https://models.github.ai/orgs/octo-org/v1/chat/completions"
        );
        let client = client.with_organization(Some("  ".to_string()));
        assert_eq!(client.organization(), None);
    }

    #[test]
    fn default_headers_carry_github_values() {
        let headers = client().default_headers().unwrap();
        assert_eq!(headers[header::ACCEPT], "application/vnd.github+json");
        assert_eq!(headers[header::AUTHORIZATION], "Bearer test-token");
        assert_eq!(headers["x-github-api-version"], "2022-11-28");
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn only_buffered_requests_carry_a_total_timeout() {
        let client = client();
        let url = client.chat_url().unwrap();
        let streamed = client
            .request(Method::POST, url.clone())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(streamed.timeout(), None);
        let buffered = client
            .buffered_request(Method::POST, url)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(buffered.timeout(), Some(&DEFAULT_TIMEOUT));
    }

    #[test]
    fn debug_does_not_leak_token() {
        let rendered = format!("{:?}", client());
        assert!(!rendered.contains("test-token"));
    }
}
