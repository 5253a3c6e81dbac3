use reqwest::Client;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::CatalogError;

pub const DEFAULT_CATALOG_URL: &str = "https://ollama.com/library?sort=newest";

/// Where the raw listing page comes from: the network, or the page saved by
/// the last successful download.
pub struct CatalogSource {
    client: Client,
    url: String,
    cache_path: PathBuf,
}

impl CatalogSource {
    pub fn new(url: impl Into<String>, cache_path: impl Into<PathBuf>) -> Self {
        Self {
            client: Client::builder()
                .user_agent(concat!("modelpull/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            url: url.into(),
            cache_path: cache_path.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    pub fn has_cache(&self) -> bool {
        self.cache_path.is_file()
    }

    /// Download the listing page and overwrite the cache with it.
    ///
    /// There is no retry at this layer: a bad status or network error ends
    /// the attempt.
    pub async fn fetch(&self) -> Result<String, CatalogError> {
        info!(url = %self.url, "fetching model list");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|source| CatalogError::Network {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(CatalogError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| CatalogError::Network {
            url: self.url.clone(),
            source,
        })?;

        self.store(&body)?;
        Ok(body)
    }

    pub fn load_cached(&self) -> Result<String, CatalogError> {
        debug!(path = %self.cache_path.display(), "loading cached model list");
        fs::read_to_string(&self.cache_path).map_err(|source| self.cache_error(source))
    }

    fn store(&self, body: &str) -> Result<(), CatalogError> {
        if let Some(parent) = self.cache_path.parent() {
            fs::create_dir_all(parent).map_err(|source| self.cache_error(source))?;
        }
        fs::write(&self.cache_path, body).map_err(|source| self.cache_error(source))?;
        info!(path = %self.cache_path.display(), "saved model list");
        Ok(())
    }

    fn cache_error(&self, source: std::io::Error) -> CatalogError {
        CatalogError::Cache {
            path: self.cache_path.display().to_string(),
            source,
        }
    }
}
