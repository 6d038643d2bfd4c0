//! Product catalog client.
//!
//! The bulk-data service describes a product as deliveries of items, each
//! carrying a display size and a SHA-1 checksum. The client flattens that
//! into one [`DownloadDescriptor`] per item for the fetcher.

use crate::error::{FetchError, Result};
use crate::filesize::parse_file_size;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// One item of a delivery as published by the catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Item identifier within the delivery.
    pub item_id: i64,
    /// File name of the item.
    pub item_name: String,
    /// Display size, e.g. `"12.3 MB"`.
    #[serde(default)]
    pub file_size: String,
    /// SHA-1 checksum, lowercase hex.
    #[serde(default)]
    pub file_checksum: String,
}

/// One delivery of a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    /// Delivery identifier within the product.
    pub delivery_id: i64,
    /// Items of this delivery.
    #[serde(default)]
    pub items: Vec<Item>,
}

/// A bulk-data product with its deliveries.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product identifier.
    pub id: i64,
    /// Product display name.
    pub name: String,
    /// Deliveries of this product.
    #[serde(default)]
    pub deliveries: Vec<Delivery>,
}

/// Everything the fetcher needs to download one item.
///
/// Built once by the catalog client, consumed once by the fetcher, never
/// mutated.
#[derive(Debug, Clone)]
pub struct DownloadDescriptor {
    /// File name of the item.
    pub filename: String,
    /// Target path on disk.
    pub file_path: PathBuf,
    /// Expected size in bytes (0 when the display size is unparseable).
    pub expected_size: u64,
    /// SHA-1 checksum, hex.
    pub checksum: String,
    /// Item download URL.
    pub url: Url,
}

/// Catalog client over a shared HTTP client.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    /// Create a catalog client. `base_url` is used verbatim apart from a
    /// trailing-slash trim.
    #[must_use]
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch and decode the manifest for one product.
    ///
    /// # Errors
    /// Returns `FetchError::Catalog` on a non-2xx status or a decode failure.
    pub async fn fetch_product(&self, product_id: &str) -> Result<Product> {
        let url = format!("{}/products/{product_id}", self.base_url);
        debug!(url = %url, "fetching product catalog");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Catalog {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Catalog {
                url,
                message: format!("HTTP status {}", status.as_u16()),
            });
        }

        response.json().await.map_err(|e| FetchError::Catalog {
            url,
            message: format!("decode failed: {e}"),
        })
    }

    /// Flatten a product's deliveries × items into download descriptors.
    ///
    /// # Errors
    /// Returns `FetchError::InvalidUrl` if an item URL cannot be built.
    pub fn descriptors(
        &self,
        product: &Product,
        download_dir: &Path,
    ) -> Result<Vec<DownloadDescriptor>> {
        let mut descriptors = Vec::new();
        for delivery in &product.deliveries {
            for item in &delivery.items {
                let raw = format!(
                    "{}/products/{}/delivery/{}/item/{}/download",
                    self.base_url, product.id, delivery.delivery_id, item.item_id
                );
                let url = Url::parse(&raw).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
                descriptors.push(DownloadDescriptor {
                    filename: item.item_name.clone(),
                    file_path: download_dir.join(&item.item_name),
                    expected_size: parse_file_size(&item.file_size),
                    checksum: item.file_checksum.clone(),
                    url,
                });
            }
        }
        debug!(
            product = %product.name,
            items = descriptors.len(),
            "catalog flattened"
        );
        Ok(descriptors)
    }

    /// Fetch the product and return its descriptors in one step.
    ///
    /// # Errors
    /// Returns error if the catalog cannot be fetched or decoded.
    pub async fn fetch_descriptors(
        &self,
        product_id: &str,
        download_dir: &Path,
    ) -> Result<Vec<DownloadDescriptor>> {
        let product = self.fetch_product(product_id).await?;
        self.descriptors(&product, download_dir)
    }
}
