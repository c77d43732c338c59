//! Settings and path resolution for the CLI.
//!
//! Settings come from environment variables (a `.env` file in the working
//! directory is loaded first); command-line flags override them in `main`.

use anyhow::{anyhow, bail, Context, Result};
use directories::ProjectDirs;
use ranksight_core::config::{TOP_K_JUDGE, TOP_K_RETRIEVAL};
use ranksight_core::search::SearchMode;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Database file name inside the data directory
const DATABASE_FILENAME: &str = "evaluation.redb";

const DEFAULT_LLM_MODEL: &str = "gpt-4o";
const DEFAULT_AZURE_API_VERSION: &str = "2024-08-01-preview";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_ELASTIC_URL: &str = "http://localhost:9200";
const DEFAULT_ELASTIC_INDEX: &str = "projects";
const DEFAULT_HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

/// Chat completion backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    /// Azure OpenAI deployment (`LLM_MODEL` is the deployment name)
    Azure,
    /// OpenAI or any OpenAI-compatible endpoint
    OpenAi,
}

impl FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "azure" => Ok(LlmProvider::Azure),
            "openai" => Ok(LlmProvider::OpenAi),
            other => bail!("Unknown LLM_PROVIDER '{}' (expected 'azure' or 'openai')", other),
        }
    }
}

/// Language model settings.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    pub model: String,
    pub azure_endpoint: Option<String>,
    pub azure_api_key: Option<String>,
    pub azure_api_version: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
}

/// Elasticsearch settings.
#[derive(Debug, Clone)]
pub struct ElasticSettings {
    pub url: String,
    pub api_key: Option<String>,
    pub index: String,
    /// Dense vector field for kNN search, if the index has one
    pub vector_field: Option<String>,
    /// Model deployed in Elasticsearch that embeds the query text
    pub embedding_model_id: Option<String>,
}

/// Timeouts shared by the Elasticsearch and LLM clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    pub connect_timeout: Duration,
    /// Whole-request limit, including reading the body
    pub request_timeout: Duration,
}

impl HttpSettings {
    /// Builds the HTTP client used by every outbound call.
    pub fn client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .build()
            .context("Failed to build HTTP client")
    }
}

/// All CLI settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub llm: LlmSettings,
    pub elastic: ElasticSettings,
    pub http: HttpSettings,
    pub db_path: Option<PathBuf>,
    pub top_k_retrieval: usize,
    pub top_k_judge: usize,
    pub search_mode: SearchMode,
}

impl Settings {
    /// Loads `.env` (if present) and reads settings from the environment.
    pub fn from_env() -> Result<Self> {
        // A missing .env file is normal
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let provider = match get("LLM_PROVIDER") {
            Some(p) => p.parse()?,
            None => LlmProvider::Azure,
        };

        let llm = LlmSettings {
            provider,
            model: or("LLM_MODEL", DEFAULT_LLM_MODEL),
            azure_endpoint: get("AZURE_OPENAI_ENDPOINT"),
            azure_api_key: get("AZURE_OPENAI_API_KEY"),
            azure_api_version: or("AZURE_OPENAI_API_VERSION", DEFAULT_AZURE_API_VERSION),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: or("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
        };

        let elastic = ElasticSettings {
            url: or("ELASTIC_URL", DEFAULT_ELASTIC_URL),
            api_key: get("ELASTIC_API_KEY"),
            index: or("ELASTIC_INDEX", DEFAULT_ELASTIC_INDEX),
            vector_field: get("ELASTIC_VECTOR_FIELD"),
            embedding_model_id: get("ELASTIC_EMBEDDING_MODEL_ID"),
        };

        let http = HttpSettings {
            connect_timeout: Duration::from_secs(parse_u64(
                get("HTTP_CONNECT_TIMEOUT_SECS"),
                "HTTP_CONNECT_TIMEOUT_SECS",
                DEFAULT_HTTP_CONNECT_TIMEOUT_SECS,
            )?),
            request_timeout: Duration::from_secs(parse_u64(
                get("HTTP_TIMEOUT_SECS"),
                "HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
        };
        if http.connect_timeout.is_zero() || http.request_timeout.is_zero() {
            bail!("HTTP_CONNECT_TIMEOUT_SECS and HTTP_TIMEOUT_SECS must be greater than 0");
        }

        let search_mode = match get("SEARCH_MODE") {
            Some(mode) => mode
                .parse()
                .map_err(|e| anyhow!("Invalid SEARCH_MODE: {}", e))?,
            None => SearchMode::Text,
        };

        Ok(Self {
            llm,
            elastic,
            http,
            db_path: get("RANKSIGHT_DB_PATH").map(PathBuf::from),
            top_k_retrieval: parse_usize(get("TOP_K_RETRIEVAL"), "TOP_K_RETRIEVAL", TOP_K_RETRIEVAL)?,
            top_k_judge: parse_usize(get("TOP_K_JUDGE"), "TOP_K_JUDGE", TOP_K_JUDGE)?,
            search_mode,
        })
    }
}

fn parse_usize(value: Option<String>, key: &str, default: usize) -> Result<usize> {
    match value {
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("{} must be a non-negative integer, got '{}'", key, v)),
        None => Ok(default),
    }
}

fn parse_u64(value: Option<String>, key: &str, default: u64) -> Result<u64> {
    match value {
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("{} must be a whole number of seconds, got '{}'", key, v)),
        None => Ok(default),
    }
}

/// Returns the data directory.
///
/// - macOS: `~/Library/Application Support/dev.ranksight.Ranksight/`
/// - Linux: `~/.local/share/ranksight/`
/// - Windows: `%APPDATA%\ranksight\Ranksight\data\`
pub fn get_data_dir(custom_dir: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = custom_dir {
        return Ok(dir.clone());
    }

    ProjectDirs::from("dev", "ranksight", "Ranksight")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| anyhow!("Could not determine data directory"))
}

/// Returns the path to the database file.
///
/// `--data-dir` wins over `RANKSIGHT_DB_PATH`, which wins over the platform
/// data directory.
pub fn database_path(custom_dir: Option<&PathBuf>, settings: &Settings) -> Result<PathBuf> {
    if custom_dir.is_none() {
        if let Some(path) = &settings.db_path {
            return Ok(path.clone());
        }
    }
    let data_dir = get_data_dir(custom_dir)?;
    Ok(data_dir.join(DATABASE_FILENAME))
}
