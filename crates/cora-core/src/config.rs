use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoraError, Result};
use crate::types::Endpoint;

/// Top-level configuration for Cora.
///
/// Loaded from a TOML file at startup. The `[config]` and `[endpoints]`
/// sections describe the deployment and have no defaults: a missing key is a
/// startup error. The remaining sections are optional.
#[derive(Debug, Clone)]
pub struct CoraConfig {
    pub general: GeneralConfig,
    pub project: ProjectConfig,
    pub endpoints: EndpointsConfig,
    pub auth: AuthConfig,
    pub warehouse: WarehouseConfig,
    pub display: DisplayConfig,
}

impl CoraConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed, or if a
    /// required key is missing.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;
        raw.validate()
    }

    /// Absolute URL of a backend endpoint.
    pub fn endpoint_url(&self, endpoint: Endpoint) -> String {
        join_url(&self.project.backend_url, self.endpoints.path(endpoint))
    }
}

/// Join a base URL and a path with exactly one `/` between them.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Deployment identifiers, from the `[config]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub project_id: String,
    /// Default database passed to the backend with every question.
    pub dataset_id: String,
    pub region_id: String,
    /// Base URL of the backend; also the audience of the identity token.
    pub backend_url: String,
}

/// Per-endpoint paths, relative to `backend_url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointsConfig {
    pub available_databases: String,
    pub get_known_sql: String,
    pub generate_sql: String,
    pub run_query: String,
    pub embed_sql: String,
    pub natural_response: String,
    pub generate_visualization: String,
}

impl EndpointsConfig {
    pub fn path(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::AvailableDatabases => &self.available_databases,
            Endpoint::GetKnownSql => &self.get_known_sql,
            Endpoint::GenerateSql => &self.generate_sql,
            Endpoint::RunQuery => &self.run_query,
            Endpoint::EmbedSql => &self.embed_sql,
            Endpoint::NaturalResponse => &self.natural_response,
            Endpoint::GenerateViz => &self.generate_visualization,
        }
    }
}

/// Where identity tokens for the backend come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthProvider {
    /// GCE / Cloud Run metadata server.
    #[default]
    Metadata,
    /// Output of a shell command such as `gcloud auth print-identity-token`.
    Command,
    /// A fixed token from the config file or `CORA_ID_TOKEN`.
    Static,
}

/// Identity token configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub provider: AuthProvider,
    /// Base URL of the metadata server.
    pub metadata_url: String,
    /// Command for the `command` provider.
    pub command: Option<String>,
    /// Token for the `static` provider.
    pub token: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            provider: AuthProvider::Metadata,
            metadata_url: "http://metadata.google.internal".to_string(),
            command: None,
            token: None,
        }
    }
}

/// How generated SQL is executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarehouseMode {
    /// Through the backend's `run_query` endpoint.
    #[default]
    Backend,
    /// Directly against the BigQuery REST API.
    Bigquery,
}

/// Warehouse configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    pub mode: WarehouseMode,
    pub bigquery_url: String,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            mode: WarehouseMode::Backend,
            bigquery_url: "https://bigquery.googleapis.com".to_string(),
        }
    }
}

/// Terminal rendering options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Write chart definitions to HTML files.
    pub show_charts: bool,
    /// Directory for chart HTML files.
    pub chart_dir: String,
    /// Maximum rows printed per table.
    pub max_table_rows: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_charts: false,
            chart_dir: "charts".to_string(),
            max_table_rows: 50,
        }
    }
}

// =============================================================================
// Raw (unvalidated) file layout
// =============================================================================

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    general: GeneralConfig,
    config: Option<RawProject>,
    endpoints: Option<RawEndpoints>,
    #[serde(default)]
    auth: AuthConfig,
    #[serde(default)]
    warehouse: WarehouseConfig,
    #[serde(default)]
    display: DisplayConfig,
}

#[derive(Debug, Default, Deserialize)]
struct RawProject {
    project_id: Option<String>,
    dataset_id: Option<String>,
    region_id: Option<String>,
    backend_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawEndpoints {
    available_databases: Option<String>,
    get_known_sql: Option<String>,
    generate_sql: Option<String>,
    run_query: Option<String>,
    embed_sql: Option<String>,
    natural_response: Option<String>,
    #[serde(alias = "generate_vizualization")]
    generate_visualization: Option<String>,
}

fn require(section: &str, key: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(CoraError::MissingKey {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

impl RawConfig {
    fn validate(self) -> Result<CoraConfig> {
        let project = self.config.ok_or_else(|| CoraError::MissingKey {
            section: "config".to_string(),
            key: "*".to_string(),
        })?;
        let endpoints = self.endpoints.ok_or_else(|| CoraError::MissingKey {
            section: "endpoints".to_string(),
            key: "*".to_string(),
        })?;

        let project = ProjectConfig {
            project_id: require("config", "project_id", project.project_id)?,
            dataset_id: require("config", "dataset_id", project.dataset_id)?,
            region_id: require("config", "region_id", project.region_id)?,
            backend_url: require("config", "backend_url", project.backend_url)?,
        };
        if !(project.backend_url.starts_with("http://")
            || project.backend_url.starts_with("https://"))
        {
            return Err(CoraError::Config(format!(
                "backend_url must be an http(s) URL, got '{}'",
                project.backend_url
            )));
        }

        let endpoints = EndpointsConfig {
            available_databases: require(
                "endpoints",
                "available_databases",
                endpoints.available_databases,
            )?,
            get_known_sql: require("endpoints", "get_known_sql", endpoints.get_known_sql)?,
            generate_sql: require("endpoints", "generate_sql", endpoints.generate_sql)?,
            run_query: require("endpoints", "run_query", endpoints.run_query)?,
            embed_sql: require("endpoints", "embed_sql", endpoints.embed_sql)?,
            natural_response: require(
                "endpoints",
                "natural_response",
                endpoints.natural_response,
            )?,
            generate_visualization: require(
                "endpoints",
                "generate_visualization",
                endpoints.generate_visualization,
            )?,
        };

        if self.auth.provider == AuthProvider::Command
            && self.auth.command.as_deref().map_or(true, |c| c.trim().is_empty())
        {
            return Err(CoraError::MissingKey {
                section: "auth".to_string(),
                key: "command".to_string(),
            });
        }

        Ok(CoraConfig {
            general: self.general,
            project,
            endpoints,
            auth: self.auth,
            warehouse: self.warehouse,
            display: self.display,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[config]
project_id = "acme-analytics"
dataset_id = "finance"
region_id = "us-central1"
backend_url = "https://cora-backend.example.run.app/"

[endpoints]
available_databases = "available_databases"
get_known_sql = "get_known_sql"
generate_sql = "generate_sql"
run_query = "run_query"
embed_sql = "embed_sql"
natural_response = "natural_response"
generate_vizualization = "generate_viz"
"#;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn missing_key(result: Result<CoraConfig>) -> (String, String) {
        match result {
            Err(CoraError::MissingKey { section, key }) => (section, key),
            other => panic!("expected MissingKey, got {:?}", other),
        }
    }

    // ---- Loading ----

    #[test]
    fn test_load_minimal_config() {
        let file = create_temp_config(MINIMAL);
        let config = CoraConfig::load(file.path()).unwrap();
        assert_eq!(config.project.project_id, "acme-analytics");
        assert_eq!(config.project.dataset_id, "finance");
        assert_eq!(config.project.region_id, "us-central1");
        assert_eq!(config.endpoints.generate_visualization, "generate_viz");
    }

    #[test]
    fn test_optional_sections_use_defaults() {
        let config = CoraConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.auth.provider, AuthProvider::Metadata);
        assert_eq!(config.auth.metadata_url, "http://metadata.google.internal");
        assert_eq!(config.warehouse.mode, WarehouseMode::Backend);
        assert!(!config.display.show_charts);
        assert_eq!(config.display.chart_dir, "charts");
        assert_eq!(config.display.max_table_rows, 50);
    }

    #[test]
    fn test_load_full_config() {
        let content = format!(
            r#"{}
[general]
log_level = "debug"

[auth]
provider = "command"
command = "gcloud auth print-identity-token"

[warehouse]
mode = "bigquery"

[display]
show_charts = true
chart_dir = "/tmp/charts"
max_table_rows = 10
"#,
            MINIMAL
        );
        let config = CoraConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.auth.provider, AuthProvider::Command);
        assert_eq!(
            config.auth.command.as_deref(),
            Some("gcloud auth print-identity-token")
        );
        assert_eq!(config.warehouse.mode, WarehouseMode::Bigquery);
        assert!(config.display.show_charts);
        assert_eq!(config.display.max_table_rows, 10);
    }

    #[test]
    fn test_load_missing_file() {
        let result = CoraConfig::load(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(CoraError::Io(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = CoraConfig::from_toml_str("this is {{ not valid TOML");
        assert!(matches!(result, Err(CoraError::Config(_))));
    }

    // ---- Required keys ----

    #[test]
    fn test_missing_config_section() {
        let content = MINIMAL.replace("[config]", "[other]");
        let (section, _) = missing_key(CoraConfig::from_toml_str(&content));
        assert_eq!(section, "config");
    }

    #[test]
    fn test_missing_project_key() {
        let content = MINIMAL.replace("region_id = \"us-central1\"\n", "");
        let (section, key) = missing_key(CoraConfig::from_toml_str(&content));
        assert_eq!(section, "config");
        assert_eq!(key, "region_id");
    }

    #[test]
    fn test_missing_endpoint_key() {
        let content = MINIMAL.replace("embed_sql = \"embed_sql\"\n", "");
        let (section, key) = missing_key(CoraConfig::from_toml_str(&content));
        assert_eq!(section, "endpoints");
        assert_eq!(key, "embed_sql");
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let content = MINIMAL.replace("dataset_id = \"finance\"", "dataset_id = \"  \"");
        let (_, key) = missing_key(CoraConfig::from_toml_str(&content));
        assert_eq!(key, "dataset_id");
    }

    #[test]
    fn test_visualization_key_accepts_both_spellings() {
        let content = MINIMAL.replace("generate_vizualization", "generate_visualization");
        let config = CoraConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.endpoints.generate_visualization, "generate_viz");
    }

    #[test]
    fn test_backend_url_must_be_http() {
        let content = MINIMAL.replace("https://cora-backend.example.run.app/", "ftp://x");
        let result = CoraConfig::from_toml_str(&content);
        assert!(matches!(result, Err(CoraError::Config(_))));
    }

    #[test]
    fn test_command_provider_requires_command() {
        let content = format!("{}\n[auth]\nprovider = \"command\"\n", MINIMAL);
        let (section, key) = missing_key(CoraConfig::from_toml_str(&content));
        assert_eq!(section, "auth");
        assert_eq!(key, "command");
    }

    // ---- URLs ----

    #[test]
    fn test_endpoint_url_joins_with_single_slash() {
        let config = CoraConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(
            config.endpoint_url(Endpoint::GenerateSql),
            "https://cora-backend.example.run.app/generate_sql"
        );
        assert_eq!(
            config.endpoint_url(Endpoint::GenerateViz),
            "https://cora-backend.example.run.app/generate_viz"
        );
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://a", "b"), "http://a/b");
        assert_eq!(join_url("http://a/", "/b"), "http://a/b");
        assert_eq!(join_url("http://a//", "b/c"), "http://a/b/c");
    }

    #[test]
    fn test_every_endpoint_has_a_path() {
        let config = CoraConfig::from_toml_str(MINIMAL).unwrap();
        for endpoint in Endpoint::ALL {
            assert!(!config.endpoints.path(endpoint).is_empty());
        }
    }
}
