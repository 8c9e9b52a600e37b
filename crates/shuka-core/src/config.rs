//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`APP_SEARCH__RRF_K=30` sets `search.rrf_k`). `Settings` is the typed view
//! the engine consumes; every field has a default so an empty configuration is
//! valid.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;
use crate::types::Language;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    /// Build from an explicit figment, layered over the defaults.
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment: Figment::from(Serialized::defaults(Settings::default())).merge(figment) }
    }

    pub fn from_toml_str(toml: &str) -> Self {
        Self::from_figment(Figment::from(Toml::string(toml)))
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed, validated settings.
    pub fn settings(&self) -> crate::error::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::Configuration(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub embedding: EmbeddingSettings,
    pub reranker: RerankerSettings,
    pub search: SearchSettings,
}

impl Settings {
    pub fn validate(&self) -> crate::error::Result<()> {
        let s = &self.search;
        if s.max_top_k == 0 || s.default_top_k == 0 || s.default_top_k > s.max_top_k {
            return Err(Error::Configuration(format!(
                "search.default_top_k ({}) must be within 1..={}",
                s.default_top_k, s.max_top_k
            )));
        }
        if s.max_variants == 0 {
            return Err(Error::Configuration("search.max_variants must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&s.fuzzy_cutoff) {
            return Err(Error::Configuration(format!(
                "search.fuzzy_cutoff ({}) must be within [0, 1]",
                s.fuzzy_cutoff
            )));
        }
        let e = &self.embedding;
        if e.dimension == 0 {
            return Err(Error::Configuration("embedding.dimension must be positive".into()));
        }
        if e.batch_size == 0 || e.batch_size > MAX_REMOTE_BATCH {
            return Err(Error::Configuration(format!(
                "embedding.batch_size ({}) must be within 1..={MAX_REMOTE_BATCH}",
                e.batch_size
            )));
        }
        if self.data.languages.is_empty() {
            return Err(Error::Configuration("data.languages must name at least one language".into()));
        }
        Ok(())
    }
}

/// Upper bound the remote embedding API accepts per request.
pub const MAX_REMOTE_BATCH: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Directory holding the per-language artifacts; `~` and `${VAR}` expand.
    pub dir: String,
    pub languages: Vec<Language>,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { dir: "rag".to_string(), languages: vec![Language::Ru, Language::En] }
    }
}

impl DataSettings {
    pub fn base_dir(&self) -> PathBuf {
        expand_path(&self.dir)
    }

    pub fn artifacts(&self, language: Language) -> ArtifactPaths {
        ArtifactPaths::in_dir(&self.base_dir(), language)
    }
}

/// Locations of one language's four aligned artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub metadata: PathBuf,
    pub corpus: PathBuf,
    pub keyword_dir: PathBuf,
    pub vector_uri: PathBuf,
    pub vector_table: String,
}

impl ArtifactPaths {
    pub fn in_dir(base: &Path, language: Language) -> Self {
        let code = language.code();
        Self {
            metadata: base.join(format!("metadata_{code}.json")),
            corpus: base.join(format!("corpus_{code}.json")),
            keyword_dir: base.join(format!("keyword_{code}")),
            vector_uri: base.join("vectors.lance"),
            vector_table: format!("chunks_{code}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    Remote,
    Local,
    Fake,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProviderKind,
    pub dimension: usize,
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub model_dir: Option<String>,
    pub max_len: usize,
    pub timeout_ms: u64,
    pub batch_size: usize,
    pub min_interval_ms: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Remote,
            dimension: 768,
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "models/text-embedding-004".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            model_dir: None,
            max_len: 256,
            timeout_ms: 15_000,
            batch_size: MAX_REMOTE_BATCH,
            min_interval_ms: 1_000,
        }
    }
}

impl EmbeddingSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerSettings {
    pub enabled: bool,
    pub model_dir: Option<String>,
    pub max_len: usize,
}

impl Default for RerankerSettings {
    fn default() -> Self {
        Self { enabled: true, model_dir: None, max_len: 512 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub default_top_k: usize,
    pub max_top_k: usize,
    pub rrf_k: usize,
    pub max_variants: usize,
    pub fuzzy_cutoff: f64,
    pub query_timeout_ms: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            max_top_k: 50,
            rrf_k: 60,
            max_variants: 5,
            fuzzy_cutoff: 0.8,
            query_timeout_ms: 30_000,
        }
    }
}

impl SearchSettings {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

/// `${VAR}`/`$VAR` first, then a leading `~`. Unknown variables are left as written.
pub fn expand_path(raw: &str) -> PathBuf {
    let with_vars = shellexpand::env(raw).unwrap_or(std::borrow::Cow::Borrowed(raw));
    PathBuf::from(shellexpand::tilde(&with_vars).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_yields_defaults() {
        let settings = Config::from_toml_str("").settings().expect("defaults are valid");
        assert_eq!(settings.search.rrf_k, 60);
        assert_eq!(settings.search.max_variants, 5);
        assert_eq!(settings.embedding.dimension, 768);
        assert_eq!(settings.data.languages, vec![Language::Ru, Language::En]);
    }

    #[test]
    fn toml_overrides_nested_keys() {
        let config = Config::from_toml_str(
            r#"
            [search]
            default_top_k = 10
            [embedding]
            provider = "fake"
            "#,
        );
        let settings = config.settings().expect("valid");
        assert_eq!(settings.search.default_top_k, 10);
        assert_eq!(settings.embedding.provider, EmbeddingProviderKind::Fake);
        assert_eq!(config.get::<usize>("search.rrf_k").expect("default present"), 60);
    }

    #[test]
    fn oversized_batch_is_rejected() {
        let config = Config::from_toml_str("[embedding]\nbatch_size = 500\n");
        assert!(matches!(config.settings(), Err(Error::Configuration(_))));
    }

    #[test]
    fn artifact_paths_are_language_scoped() {
        let paths = ArtifactPaths::in_dir(Path::new("/data"), Language::Ru);
        assert_eq!(paths.metadata, PathBuf::from("/data/metadata_ru.json"));
        assert_eq!(paths.keyword_dir, PathBuf::from("/data/keyword_ru"));
        assert_eq!(paths.vector_table, "chunks_ru");
    }

    #[test]
    fn data_dir_expands_environment_variables() {
        std::env::set_var("SHUKA_TEST_DATA_ROOT", "/srv/shuka");
        let data = DataSettings { dir: "${SHUKA_TEST_DATA_ROOT}/rag".into(), languages: vec![Language::En] };
        assert_eq!(data.base_dir(), PathBuf::from("/srv/shuka/rag"));
        assert_eq!(expand_path("/abs/path"), PathBuf::from("/abs/path"));
    }
}
