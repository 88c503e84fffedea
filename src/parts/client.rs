use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;
use tracing::debug;
use url::Url;

use crate::config::ApiConfig;
use crate::error::FetchError;
use crate::parts::api_types::ApiErrorBody;
use crate::parts::types::{AllowableStatuses, Configuration, Part, PartUpdate};

/// Entity fetchers. Every call is a single request with no caching.
pub trait PartsApi: Clone + Send + Sync + 'static {
  /// Children of `parent`, or the top-level machines when `parent` is `None`.
  ///
  /// An existing parent without children yields an empty list; an unknown
  /// parent yields `NotFound`.
  fn list_children(
    &self,
    parent: Option<&str>,
  ) -> impl Future<Output = Result<Vec<Configuration>, FetchError>> + Send;

  fn get_part(&self, id: &str) -> impl Future<Output = Result<Part, FetchError>> + Send;

  fn get_allowable_statuses(
    &self,
    id: &str,
  ) -> impl Future<Output = Result<AllowableStatuses, FetchError>> + Send;

  /// Apply `update` and return the full updated part.
  fn update_part(
    &self,
    id: &str,
    update: &PartUpdate,
  ) -> impl Future<Output = Result<Part, FetchError>> + Send;
}

/// REST client for the configuration service
#[derive(Clone)]
pub struct HttpPartsApi {
  http: reqwest::Client,
  base: Url,
}

impl HttpPartsApi {
  pub fn new(config: &ApiConfig, api_key: &str) -> Result<Self> {
    let base = Url::parse(&config.url)
      .map_err(|e| eyre!("Invalid API url {}: {}", config.url, e))?;
    if base.cannot_be_a_base() {
      return Err(eyre!("API url {} cannot be used as a base", config.url));
    }

    let header = HeaderName::from_bytes(config.key_header.as_bytes())
      .map_err(|e| eyre!("Invalid API key header {}: {}", config.key_header, e))?;
    let mut value =
      HeaderValue::from_str(api_key).map_err(|e| eyre!("API key is not a valid header value: {}", e))?;
    value.set_sensitive(true);
    let mut headers = HeaderMap::new();
    headers.insert(header, value);

    let http = reqwest::Client::builder()
      .default_headers(headers)
      .timeout(config.timeout)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base })
  }

  /// Build `{base}/seg/seg/...`, percent-encoding each segment.
  fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  async fn send<T: DeserializeOwned>(
    &self,
    request: RequestBuilder,
    resource: &str,
  ) -> Result<T, FetchError> {
    let response = request
      .send()
      .await
      .map_err(|e| FetchError::transport(e.to_string()))?;
    let status = response.status();
    debug!(resource, status = status.as_u16(), "response");

    if status.is_success() {
      return response.json::<T>().await.map_err(|e| {
        if e.is_decode() {
          FetchError::Unknown(format!("Unexpected response for {}: {}", resource, e))
        } else {
          FetchError::transport(e.to_string())
        }
      });
    }

    let body = response.bytes().await.unwrap_or_default();
    Err(classify(status, resource, &body))
  }
}

fn classify(status: StatusCode, resource: &str, body: &[u8]) -> FetchError {
  FetchError::from_status(status.as_u16(), resource, ApiErrorBody::message(body))
}

impl PartsApi for HttpPartsApi {
  async fn list_children(&self, parent: Option<&str>) -> Result<Vec<Configuration>, FetchError> {
    let mut url = self.endpoint(&["api", "configs", "children"]);
    if let Some(parent) = parent {
      url.query_pairs_mut().append_pair("parentUuid", parent);
    }
    let resource = match parent {
      Some(parent) => format!("configuration {}", parent),
      None => "machine list".to_string(),
    };
    self.send(self.http.get(url), &resource).await
  }

  async fn get_part(&self, id: &str) -> Result<Part, FetchError> {
    let url = self.endpoint(&["api", "parts", id]);
    self.send(self.http.get(url), &format!("part {}", id)).await
  }

  async fn get_allowable_statuses(&self, id: &str) -> Result<AllowableStatuses, FetchError> {
    let url = self.endpoint(&["api", "parts", id, "allowable-statuses"]);
    self
      .send(self.http.get(url), &format!("allowable statuses of part {}", id))
      .await
  }

  async fn update_part(&self, id: &str, update: &PartUpdate) -> Result<Part, FetchError> {
    let url = self.endpoint(&["api", "parts", id]);
    self
      .send(self.http.put(url).json(update), &format!("part {}", id))
      .await
  }
}
