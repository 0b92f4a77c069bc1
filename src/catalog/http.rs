use super::{ProductSource, RequestDescriptor, ResponsePage, SourceError, SourceFuture};
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB

/// REST client for a catalog API exposing `GET {base}/products`.
///
/// Query parameters follow the catalog contract: `category`, `brand`,
/// `search` (only when non-empty), `minPrice`/`maxPrice`, `inStock` (only
/// when true), `sort`, `feedSeed`, `page`, `limit`, plus a `_t` timestamp so
/// intermediaries never serve a stale page.
#[derive(Clone)]
pub struct HttpCatalog {
    client: reqwest::Client,
    endpoint: Url,
    token: Option<SecretString>,
    timeout: Duration,
    fallback: Option<Arc<dyn ProductSource>>,
}

impl HttpCatalog {
    /// Build a client for the API rooted at `base_url` (http or https).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let mut endpoint =
            Url::parse(base_url).map_err(|e| SourceError::InvalidBaseUrl(e.to_string()))?;

        match endpoint.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(SourceError::InvalidBaseUrl(format!(
                    "unsupported scheme '{scheme}'"
                )))
            }
        }

        endpoint
            .path_segments_mut()
            .map_err(|_| SourceError::InvalidBaseUrl(base_url.to_string()))?
            .pop_if_empty()
            .push("products");

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            token: None,
            timeout,
            fallback: None,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    /// Answer from `fallback` when the API cannot be reached at all.
    ///
    /// HTTP errors and malformed bodies are still reported; only
    /// connectivity failures (connect, DNS, timeout) fall back.
    pub fn with_fallback(mut self, fallback: Arc<dyn ProductSource>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Full request URL for `request`, without the `_t` cache buster.
    pub fn products_url(&self, request: &RequestDescriptor) -> Url {
        let mut url = self.endpoint.clone();
        {
            let filters = &request.filters;
            let mut pairs = url.query_pairs_mut();
            if !filters.category.is_empty() {
                pairs.append_pair("category", &filters.category);
            }
            if !filters.brand.is_empty() {
                pairs.append_pair("brand", &filters.brand);
            }
            pairs.append_pair("minPrice", &filters.price_range.min().to_string());
            pairs.append_pair("maxPrice", &filters.price_range.max().to_string());
            if filters.in_stock {
                pairs.append_pair("inStock", "true");
            }
            if !filters.search.is_empty() {
                pairs.append_pair("search", &filters.search);
            }
            pairs.append_pair("sort", request.sort.as_str());
            pairs.append_pair("feedSeed", &request.feed_seed.to_string());
            pairs.append_pair("page", &request.page.to_string());
            pairs.append_pair("limit", &request.page_size.to_string());
        }
        url
    }
}

impl ProductSource for HttpCatalog {
    fn fetch_products(&self, request: &RequestDescriptor) -> SourceFuture {
        let mut url = self.products_url(request);
        url.query_pairs_mut()
            .append_pair("_t", &chrono::Utc::now().timestamp_millis().to_string());

        let client = self.client.clone();
        let token = self.token.clone();
        let timeout = self.timeout;
        let fallback = self.fallback.clone();
        let request = request.clone();

        Box::pin(async move {
            match fetch_page(&client, url, token.as_ref(), timeout).await {
                Ok(page) => Ok(page),
                Err(e) if e.is_connectivity() => match fallback {
                    Some(fallback) => {
                        tracing::info!(
                            error = %e,
                            fallback = fallback.name(),
                            "Catalog API unreachable, answering from fallback source"
                        );
                        fallback.fetch_products(&request).await
                    }
                    None => Err(e),
                },
                Err(e) => Err(e),
            }
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

async fn fetch_page(
    client: &reqwest::Client,
    url: Url,
    token: Option<&SecretString>,
    timeout: Duration,
) -> Result<ResponsePage, SourceError> {
    tracing::debug!(url = %url, "Requesting catalog page");

    let mut builder = client.get(url);
    if let Some(token) = token {
        builder = builder.bearer_auth(token.expose_secret());
    }

    let response = tokio::time::timeout(timeout, builder.send())
        .await
        .map_err(|_| SourceError::Timeout(timeout.as_secs()))?
        .map_err(SourceError::Network)?;

    let status = response.status();
    if !status.is_success() {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            tracing::warn!("Catalog API rejected credentials (401), session token may be expired");
        } else {
            tracing::warn!(status = %status, "Catalog API returned an error status");
        }
        return Err(SourceError::HttpStatus(status.as_u16()));
    }

    let bytes = read_limited_bytes(response, MAX_RESPONSE_SIZE).await?;
    let page: ResponsePage = serde_json::from_slice(&bytes)?;
    Ok(page)
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, SourceError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(SourceError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(SourceError::Body)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(SourceError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
