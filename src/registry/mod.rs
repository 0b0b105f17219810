//! Registry metadata lookup for resolving the `latest` specifier.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use std::collections::HashMap;

use crate::http::HttpClient;

pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Accept header asking the registry for abbreviated install metadata.
pub const ABBREVIATED_METADATA: &str =
    "application/vnd.npm.install-v1+json; q=1.0, application/json; q=0.8, */*";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Registry: Send + Sync {
    /// The version currently published under the `latest` dist-tag.
    async fn latest_version(&self, name: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct PackageDocument {
    #[serde(rename = "dist-tags", default)]
    dist_tags: HashMap<String, String>,
}

pub struct NpmRegistry {
    http: HttpClient,
    base_url: String,
}

impl NpmRegistry {
    #[tracing::instrument(skip(http, base_url))]
    pub fn new(http: HttpClient, base_url: Option<String>) -> Self {
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_REGISTRY_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Document URL for a package. Names are lower-cased; the scope separator is escaped.
    pub fn package_url(&self, name: &str) -> String {
        let name = name.to_lowercase().replace('/', "%2f");
        format!("{}/{}", self.base_url, name)
    }
}

#[async_trait]
impl Registry for NpmRegistry {
    #[tracing::instrument(skip(self))]
    async fn latest_version(&self, name: &str) -> Result<String> {
        let url = self.package_url(name);
        debug!("Fetching package metadata from {}...", url);

        let doc: PackageDocument = self
            .http
            .get_json(&url)
            .await
            .with_context(|| format!("Failed to fetch registry metadata for {}", name))?;

        doc.dist_tags
            .get("latest")
            .cloned()
            .with_context(|| format!("Registry metadata for {} has no latest dist-tag", name))
    }
}
