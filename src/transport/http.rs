use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::header::{self, HeaderMap, HeaderValue};
use tracing::debug;
use url::Url;

use crate::config::ApiSettings;
use crate::error::Error;

use super::{ApiRequest, ApiResponse, Transport};

/// Transport backed by a shared `reqwest` client.
///
/// The client keeps a cookie store, so session cookies set by the API are sent
/// back automatically, and attaches the configured cookie header and bearer
/// token to every request. Clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Builds a transport from API settings.
    pub fn new(settings: &ApiSettings) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(cookie) = settings.cookie.as_deref() {
            headers.insert(header::COOKIE, sensitive(cookie)?);
        }
        if let Some(token) = settings.bearer_token.as_deref() {
            headers.insert(header::AUTHORIZATION, sensitive(&format!("Bearer {token}"))?);
        }

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout)
            .build()
            .map_err(|err| Error::Config(err.to_string()))?;

        Ok(Self::with_client(client, settings.base_url.clone()))
    }

    /// Wraps an already configured client.
    pub fn with_client(client: reqwest::Client, base_url: Url) -> Self {
        Self {
            client,
            base_url: directory(base_url),
        }
    }

    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> Result<Url, Error> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| Error::Config(format!("invalid request path `{path}`: {err}")))
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiResponse, Error>> {
        async move {
            let url = self.url_for(&request.path)?;
            let mut builder = self.client.request(request.method.clone(), url);
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            if let Some(body) = request.body.as_ref() {
                builder = builder.json(body);
            }

            let response = builder.send().await?;
            let status = response.status();
            let body = response.bytes().await?;
            debug!(method = %request.method, path = %request.path, %status, "api request");

            Ok(ApiResponse::new(status, body.to_vec()))
        }
        .boxed()
    }
}

fn sensitive(value: &str) -> Result<HeaderValue, Error> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|err| Error::Config(format!("invalid credential header: {err}")))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Makes sure relative paths are joined below the base path, not beside it.
fn directory(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
