use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::catalog::normalize::{normalize_clusters, normalize_programmes};
use crate::catalog::CatalogSnapshot;
use crate::config::Config;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 12;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 6;

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent("placement-catalog/0.1")
        .timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
        .build()
        .expect("failed to build HTTP client")
});

/// Upstream supplier of raw catalog and transcript payloads. Implementations
/// return untyped JSON; the normalization boundary owns the typing.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    fn describe(&self) -> String;
    async fn fetch_programmes(&self) -> Result<Vec<Value>>;
    async fn fetch_clusters(&self) -> Result<Vec<Value>>;
    async fn fetch_student_results(&self, index_number: &str) -> Result<Vec<Value>>;
}

/// REST backend client. Endpoints follow the placement API's resource layout:
/// `/programmes`, `/clusters`, `/students/{index}/results`.
pub struct RestCatalog {
    base_url: String,
}

impl RestCatalog {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl CatalogProvider for RestCatalog {
    fn describe(&self) -> String {
        self.base_url.clone()
    }

    async fn fetch_programmes(&self) -> Result<Vec<Value>> {
        let payload = fetch_json(&self.url("programmes")).await?;
        Ok(extract_records(&payload))
    }

    async fn fetch_clusters(&self) -> Result<Vec<Value>> {
        let payload = fetch_json(&self.url("clusters")).await?;
        Ok(extract_records(&payload))
    }

    async fn fetch_student_results(&self, index_number: &str) -> Result<Vec<Value>> {
        let path = format!("students/{index_number}/results");
        let payload = fetch_json(&self.url(&path)).await?;
        Ok(extract_records(&payload))
    }
}

/// Fixture-file provider for offline use and tests.
pub struct FileCatalog {
    programmes_path: PathBuf,
    clusters_path: PathBuf,
    results_path: Option<PathBuf>,
}

impl FileCatalog {
    pub fn new(
        programmes_path: impl Into<PathBuf>,
        clusters_path: impl Into<PathBuf>,
        results_path: Option<PathBuf>,
    ) -> Self {
        Self {
            programmes_path: programmes_path.into(),
            clusters_path: clusters_path.into(),
            results_path,
        }
    }
}

#[async_trait]
impl CatalogProvider for FileCatalog {
    fn describe(&self) -> String {
        format!("file:{}", self.programmes_path.display())
    }

    async fn fetch_programmes(&self) -> Result<Vec<Value>> {
        Ok(extract_records(&read_json_file(&self.programmes_path)?))
    }

    async fn fetch_clusters(&self) -> Result<Vec<Value>> {
        Ok(extract_records(&read_json_file(&self.clusters_path)?))
    }

    async fn fetch_student_results(&self, _index_number: &str) -> Result<Vec<Value>> {
        let Some(path) = &self.results_path else {
            return Err(anyhow!("no results file configured for this catalog"));
        };
        Ok(extract_records(&read_json_file(path)?))
    }
}

/// Pick a provider from configuration: fixture files when both are set,
/// otherwise the REST backend.
pub fn provider_from_config(config: &Config) -> Box<dyn CatalogProvider> {
    if config.has_fixture_catalog() {
        let results = Some(config.catalog.results_file.trim())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        Box::new(FileCatalog::new(
            config.catalog.programmes_file.trim(),
            config.catalog.clusters_file.trim(),
            results,
        ))
    } else {
        Box::new(RestCatalog::new(config.api.base_url.clone()))
    }
}

/// Fetch both catalog collections, normalize them, and package a snapshot.
/// Malformed records are logged and dropped; they never abort the load.
pub async fn load_catalog_snapshot(provider: &dyn CatalogProvider) -> Result<CatalogSnapshot> {
    let raw_programmes = provider.fetch_programmes().await?;
    let raw_clusters = provider.fetch_clusters().await?;

    let programmes = normalize_programmes(&raw_programmes);
    let clusters = normalize_clusters(&raw_clusters);
    for failure in programmes.failures.iter().chain(clusters.failures.iter()) {
        warn!(
            "dropping malformed catalog record at index {}: {}",
            failure.index, failure.error
        );
    }
    debug!(
        "catalog snapshot loaded from {}: {} programmes, {} clusters",
        provider.describe(),
        programmes.records.len(),
        clusters.records.len()
    );

    Ok(CatalogSnapshot::with_hash(
        provider.describe(),
        programmes.records,
        clusters.records,
    ))
}

pub async fn fetch_json(url: &str) -> Result<Value> {
    let response = HTTP_CLIENT
        .get(url)
        .send()
        .await
        .with_context(|| format!("failed GET request: {url}"))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .with_context(|| format!("failed reading response body: {url}"))?;
    if !status.is_success() {
        let preview: String = body.chars().take(180).collect();
        return Err(anyhow!("GET {url} returned {status}: {preview}"));
    }
    serde_json::from_str(&body).with_context(|| format!("invalid JSON response: {url}"))
}

fn read_json_file(path: &PathBuf) -> Result<Value> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed reading catalog file: {}", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("invalid JSON in catalog file: {}", path.display()))
}

/// List payloads arrive either as a bare array or wrapped in an envelope
/// object. Accept the common envelope keys rather than failing on shape.
fn extract_records(payload: &Value) -> Vec<Value> {
    if let Some(array) = payload.as_array() {
        return array.clone();
    }
    if let Some(object) = payload.as_object() {
        for key in ["data", "items", "results", "records", "content"] {
            if let Some(Value::Array(array)) = object.get(key) {
                return array.clone();
            }
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn rest_catalog_builds_resource_urls() {
        let catalog = RestCatalog::new("http://localhost:8000/api/");
        assert_eq!(catalog.url("programmes"), "http://localhost:8000/api/programmes");
        assert_eq!(
            catalog.url("students/12345/results"),
            "http://localhost:8000/api/students/12345/results"
        );
    }

    #[test]
    fn extract_records_unwraps_envelopes() {
        let bare = json!([{"id": 1}]);
        assert_eq!(extract_records(&bare).len(), 1);

        let wrapped = json!({"data": [{"id": 1}, {"id": 2}]});
        assert_eq!(extract_records(&wrapped).len(), 2);

        let unknown = json!({"payload": 7});
        assert!(extract_records(&unknown).is_empty());
    }

    #[test]
    fn file_catalog_loads_snapshot() {
        let dir = std::env::temp_dir().join("placement-catalog-test-fixtures");
        std::fs::create_dir_all(&dir).expect("failed creating fixture dir");
        let programmes = dir.join("programmes.json");
        let clusters = dir.join("clusters.json");
        std::fs::write(
            &programmes,
            r#"{"data": [{"id": 1, "name": "BSc Computer Science"}, {"name": "no id"}]}"#,
        )
        .expect("failed writing fixture");
        std::fs::write(&clusters, r#"[{"id": 1, "name": "Science"}]"#)
            .expect("failed writing fixture");

        let provider = FileCatalog::new(&programmes, &clusters, None);
        let snapshot =
            tokio_test::block_on(load_catalog_snapshot(&provider)).expect("snapshot should load");
        assert_eq!(snapshot.programmes.len(), 1);
        assert_eq!(snapshot.clusters.len(), 1);
    }
}
