use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub student: StudentConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StudentConfig {
    #[serde(default)]
    pub index_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

/// Optional fixture files; when set they take precedence over the API.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogConfig {
    #[serde(default)]
    pub programmes_file: String,
    #[serde(default)]
    pub clusters_file: String,
    #[serde(default)]
    pub results_file: String,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub index_number: Option<String>,
    pub base_url: Option<String>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/placement-catalog/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(index_number) = overrides.index_number {
            self.student.index_number = index_number;
        }
        if let Some(base_url) = overrides.base_url {
            self.api.base_url = base_url;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    pub fn has_fixture_catalog(&self) -> bool {
        !self.catalog.programmes_file.trim().is_empty()
            && !self.catalog.clusters_file.trim().is_empty()
    }

    pub fn default_template() -> String {
        let template = r#"[student]
index_number = ""

[api]
base_url = "http://localhost:8000/api"
requests_per_second = 5

[storage]
db_path = "~/.local/share/placement-catalog/catalog.db"

[catalog]
programmes_file = ""
clusters_file = ""
results_file = ""
"#;
        template.to_string()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_requests_per_second() -> u32 {
    5
}

fn default_db_path() -> String {
    "~/.local/share/placement-catalog/catalog.db".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_back_into_defaults() {
        let parsed: Config =
            toml::from_str(&Config::default_template()).expect("template should parse");
        assert_eq!(parsed.api.base_url, default_base_url());
        assert!(parsed.student.index_number.is_empty());
        assert!(!parsed.has_fixture_catalog());
    }

    #[test]
    fn overrides_win_over_file_values() {
        let mut config = Config::default();
        config.apply_overrides(ConfigOverrides {
            index_number: Some("38201019".to_string()),
            base_url: Some("https://api.placement.example/v2".to_string()),
        });
        assert_eq!(config.student.index_number, "38201019");
        assert_eq!(config.api.base_url, "https://api.placement.example/v2");
    }
}
