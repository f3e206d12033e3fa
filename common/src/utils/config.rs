use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Local,
    Memory,
}

fn default_storage_kind() -> StorageKind {
    StorageKind::Local
}

#[derive(Clone, Copy, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    #[default]
    OpenAI,
    FastEmbed,
    Hashed,
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default = "default_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_store_dir")]
    pub store_dir: String,
    #[serde(default = "default_storage_kind")]
    pub storage: StorageKind,
    #[serde(default)]
    pub embedding_backend: EmbeddingBackend,
    #[serde(default)]
    pub embedding_model: Option<String>,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: u32,
    #[serde(default = "default_query_model")]
    pub query_model: String,
    #[serde(default = "default_query_temperature")]
    pub query_temperature: f32,
    #[serde(default = "default_retrieval_top_k")]
    pub retrieval_top_k: usize,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_transcript_language")]
    pub transcript_language: String,
    #[serde(default = "default_youtube_base_url")]
    pub youtube_base_url: String,
    #[serde(default = "default_ask_max_question_bytes")]
    pub ask_max_question_bytes: usize,
    #[serde(default = "default_ask_max_body_bytes")]
    pub ask_max_body_bytes: usize,
    /// Comma separated list of browser origins allowed to call the API.
    /// `*` allows any origin.
    #[serde(default = "default_cors_allowed_origins")]
    pub cors_allowed_origins: String,
    /// Questions accepted per client address per hour. 0 disables the limit.
    #[serde(default = "default_ask_rate_limit_per_hour")]
    pub ask_rate_limit_per_hour: u32,
}

fn default_store_dir() -> String {
    "./store".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

const fn default_http_port() -> u16 {
    8000
}

const fn default_embedding_dimensions() -> u32 {
    1536
}

fn default_query_model() -> String {
    "gpt-4o-mini".to_string()
}

const fn default_query_temperature() -> f32 {
    0.2
}

const fn default_retrieval_top_k() -> usize {
    4
}

const fn default_chunk_size() -> usize {
    1000
}

const fn default_chunk_overlap() -> usize {
    200
}

fn default_transcript_language() -> String {
    "en".to_string()
}

fn default_youtube_base_url() -> String {
    "https://www.youtube.com".to_string()
}

const fn default_ask_max_question_bytes() -> usize {
    4 * 1024
}

const fn default_ask_max_body_bytes() -> usize {
    64 * 1024
}

fn default_cors_allowed_origins() -> String {
    "chrome-extension://pjolcmgepmllfkicompfklfhdobbmiab".to_string()
}

const fn default_ask_rate_limit_per_hour() -> u32 {
    100
}

impl AppConfig {
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_base_url: default_base_url(),
            http_port: default_http_port(),
            store_dir: default_store_dir(),
            storage: default_storage_kind(),
            embedding_backend: EmbeddingBackend::default(),
            embedding_model: None,
            embedding_dimensions: default_embedding_dimensions(),
            query_model: default_query_model(),
            query_temperature: default_query_temperature(),
            retrieval_top_k: default_retrieval_top_k(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            transcript_language: default_transcript_language(),
            youtube_base_url: default_youtube_base_url(),
            ask_max_question_bytes: default_ask_max_question_bytes(),
            ask_max_body_bytes: default_ask_max_body_bytes(),
            cors_allowed_origins: default_cors_allowed_origins(),
            ask_rate_limit_per_hour: default_ask_rate_limit_per_hour(),
        }
    }
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_transcript_pipeline() {
        let config = AppConfig::default();
        assert_eq!(config.store_dir, "./store");
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.retrieval_top_k, 4);
        assert_eq!(config.query_model, "gpt-4o-mini");
        assert_eq!(config.embedding_backend, EmbeddingBackend::OpenAI);
        assert_eq!(config.storage, StorageKind::Local);
        assert_eq!(config.ask_rate_limit_per_hour, 100);
        assert_eq!(
            config.cors_origins(),
            vec!["chrome-extension://pjolcmgepmllfkicompfklfhdobbmiab".to_string()]
        );
    }

    #[test]
    fn cors_origins_split_on_commas() {
        let config = AppConfig {
            cors_allowed_origins: " https://a.example , ,https://b.example".into(),
            ..Default::default()
        };
        assert_eq!(
            config.cors_origins(),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn deserializes_partial_sources_with_defaults() {
        let config: AppConfig = Config::builder()
            .set_override("store_dir", "/var/lib/store")
            .expect("override store_dir")
            .set_override("embedding_backend", "hashed")
            .expect("override backend")
            .set_override("http_port", 9000)
            .expect("override port")
            .build()
            .expect("build config")
            .try_deserialize()
            .expect("deserialize config");

        assert_eq!(config.store_dir, "/var/lib/store");
        assert_eq!(config.embedding_backend, EmbeddingBackend::Hashed);
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.transcript_language, "en");
    }
}
