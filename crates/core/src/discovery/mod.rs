//! Existence probing for numbered media files.
//!
//! Discovery runs once at startup. Every candidate id in the configured range
//! is checked concurrently and the survivors are kept in ascending id order,
//! whatever order the checks complete in.

use std::{path::PathBuf, time::Duration};

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::header::CACHE_CONTROL;
use serde::Serialize;
use url::Url;

use crate::{config::RadioConfig, OverlayError, Result};

/// Answers whether an asset URL currently resolves to something playable.
/// Any failure counts as "missing".
#[async_trait]
pub trait AssetProbe: Send + Sync {
    async fn exists(&self, asset: &str) -> bool;
}

/// Naming scheme for the candidate files: `<path>/<prefix><id><suffix>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSpec {
    pub path: String,
    pub start: i64,
    pub end: i64,
    pub prefix: String,
    pub suffix: String,
    pub max_candidates: usize,
}

impl CatalogSpec {
    pub fn asset_url(&self, id: i64) -> String {
        let path = self.path.trim_matches('/');
        if path.is_empty() {
            format!("{}{id}{}", self.prefix, self.suffix)
        } else {
            format!("{path}/{}{id}{}", self.prefix, self.suffix)
        }
    }

    /// Candidate URLs in ascending id order, at most `max_candidates` of them.
    /// Empty when `start > end`.
    pub fn candidates(&self) -> impl Iterator<Item = String> + '_ {
        (self.start..=self.end)
            .take(self.max_candidates)
            .map(|id| self.asset_url(id))
    }

    /// Whether the configured range holds more ids than will be probed.
    pub fn is_truncated(&self) -> bool {
        let cap = i64::try_from(self.max_candidates).unwrap_or(i64::MAX);
        self.start <= self.end && self.end.saturating_sub(self.start) >= cap
    }
}

impl From<&RadioConfig> for CatalogSpec {
    fn from(config: &RadioConfig) -> Self {
        Self {
            path: config.path.clone(),
            start: config.start,
            end: config.end,
            prefix: config.prefix.clone(),
            suffix: config.suffix.clone(),
            max_candidates: config.max_candidates,
        }
    }
}

/// Ordered set of media URLs that passed their existence check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MediaCatalog {
    urls: Vec<String>,
}

impl MediaCatalog {
    pub fn new(urls: Vec<String>) -> Self {
        Self { urls }
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Probes every candidate of `spec` at once and keeps the ones that exist.
///
/// An empty result is reported as [`OverlayError::EmptyCatalog`].
pub async fn discover<P>(probe: &P, spec: &CatalogSpec) -> Result<MediaCatalog>
where
    P: AssetProbe + ?Sized,
{
    if spec.is_truncated() {
        tracing::warn!(
            start = spec.start,
            end = spec.end,
            max = spec.max_candidates,
            "id range too large, probing only the first ids"
        );
    }

    let candidates: Vec<String> = spec.candidates().collect();
    let checks = join_all(candidates.iter().map(|url| probe.exists(url))).await;

    let urls: Vec<String> = candidates
        .into_iter()
        .zip(checks)
        .filter_map(|(url, exists)| exists.then_some(url))
        .collect();

    if urls.is_empty() {
        return Err(OverlayError::EmptyCatalog {
            path: spec.path.clone(),
            start: spec.start,
            end: spec.end,
        });
    }

    tracing::info!(found = urls.len(), path = %spec.path, "media discovered");
    Ok(MediaCatalog::new(urls))
}

/// Checks assets with `HEAD` requests relative to a base URL.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    base: Url,
}

impl HttpProbe {
    /// `timeout` bounds each request so a hung server cannot stall discovery.
    pub fn new(base: Url, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base, client))
    }

    /// Uses a preconfigured client; its timeout applies to every probe.
    pub fn with_client(base: Url, client: reqwest::Client) -> Self {
        Self {
            client,
            base: directory_base(base),
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }
}

#[async_trait]
impl AssetProbe for HttpProbe {
    async fn exists(&self, asset: &str) -> bool {
        let Ok(target) = self.base.join(asset) else {
            return false;
        };

        match self
            .client
            .head(target)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                tracing::debug!(asset, error = %err, "probe failed");
                false
            }
        }
    }
}

/// Checks assets as regular files below a root directory.
#[derive(Debug, Clone)]
pub struct FileProbe {
    root: PathBuf,
}

impl FileProbe {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl AssetProbe for FileProbe {
    async fn exists(&self, asset: &str) -> bool {
        tokio::fs::metadata(self.root.join(asset))
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }
}

/// Relative joins only keep the last path segment of the base when it ends in
/// a slash.
fn directory_base(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}
