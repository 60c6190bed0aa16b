//! Multi-tier TOML configuration for Tessera.
//!
//! Reads configuration from multiple sources with precedence:
//! CLI flags > env vars > config file > defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tessera_types::ConfigError;

/// Base URL of the OpenAI-compatible model server all collaborators talk to by default.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080/v1";

pub const DEFAULT_GENERATION_MODEL: &str = "microsoft/DialoGPT-medium";
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "openai/whisper-base";
pub const DEFAULT_CAPTIONING_MODEL: &str = "Salesforce/blip-image-captioning-base";
pub const DEFAULT_SYNTHESIS_MODEL: &str = "facebook/mms-tts-eng";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TOP_P: f32 = 0.95;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
/// Context length of the default generation model.
pub const DEFAULT_CONTEXT_WINDOW: u64 = 1000;

pub const DEFAULT_CAPTION_PROMPT: &str = "Describe this image in one short sentence.";
pub const DEFAULT_OCR_COMMAND: &str = "tesseract";

pub const DEFAULT_OUTPUTS_DIR: &str = "outputs";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

/// Resolved configuration.
#[derive(Debug, Clone)]
pub struct TesseraConfig {
    pub config_dir: PathBuf,
    /// Where uploads, synthesized audio and the feature logs live.
    pub outputs_dir: PathBuf,
    /// Retries for transient collaborator HTTP errors. Zero by default.
    pub max_retries: u32,
    pub generation: GenerationConfig,
    pub transcription: Endpoint,
    pub captioning: CaptioningConfig,
    pub synthesis: SynthesisConfig,
    pub ocr: OcrConfig,
    pub server: ServerConfig,
}

/// An OpenAI-compatible HTTP endpoint serving one model.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub endpoint: Endpoint,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub context_window: u64,
}

#[derive(Debug, Clone)]
pub struct CaptioningConfig {
    pub endpoint: Endpoint,
    pub prompt: String,
}

#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    pub endpoint: Endpoint,
    pub voice: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub command: String,
    pub language: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Settings that can be read from a TOML config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub generation: GenerationSettings,
    #[serde(default)]
    pub transcription: EndpointSettings,
    #[serde(default)]
    pub captioning: CaptioningSettings,
    #[serde(default)]
    pub synthesis: SynthesisSettings,
    #[serde(default)]
    pub ocr: OcrSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Shared defaults for every HTTP collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiSettings {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointSettings {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationSettings {
    #[serde(flatten)]
    pub endpoint: EndpointSettings,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
    pub context_window: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptioningSettings {
    #[serde(flatten)]
    pub endpoint: EndpointSettings,
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthesisSettings {
    #[serde(flatten)]
    pub endpoint: EndpointSettings,
    pub voice: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrSettings {
    pub command: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    pub outputs_dir: Option<PathBuf>,
}

/// CLI overrides that take highest precedence.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// Explicit config file; unlike the default location it must exist.
    pub config_path: Option<PathBuf>,
    pub base_url: Option<String>,
    pub outputs_dir: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl TesseraConfig {
    /// Load configuration from all sources, applying precedence rules.
    ///
    /// Precedence (highest to lowest):
    /// 1. CLI flags
    /// 2. Environment variables
    /// 3. Config file (`--config`, or ~/.tessera/config.toml)
    /// 4. Defaults
    pub fn load(overrides: CliOverrides) -> Result<Self, ConfigError> {
        let config_dir = config_dir();
        let settings = match &overrides.config_path {
            Some(path) => load_explicit_settings(path)?,
            None => load_settings_file(&config_dir.join("config.toml")),
        };
        Self::resolve(settings, &|key| std::env::var(key).ok(), overrides, config_dir)
    }

    /// Merge already-loaded settings with an environment lookup and CLI overrides.
    pub fn resolve(
        settings: SettingsFile,
        env: &dyn Fn(&str) -> Option<String>,
        overrides: CliOverrides,
        config_dir: PathBuf,
    ) -> Result<Self, ConfigError> {
        // Shared base URL / key: CLI > env > [api] > default
        let base_url = overrides
            .base_url
            .or_else(|| env("TESSERA_BASE_URL"))
            .or(settings.api.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let api_key = env("TESSERA_API_KEY").or(settings.api.api_key);

        let endpoint = |section: EndpointSettings, default_model: &str| Endpoint {
            base_url: section.base_url.unwrap_or_else(|| base_url.clone()),
            api_key: section.api_key.or_else(|| api_key.clone()),
            model: section.model.unwrap_or_else(|| default_model.to_string()),
        };

        let generation = GenerationConfig {
            endpoint: endpoint(settings.generation.endpoint, DEFAULT_GENERATION_MODEL),
            temperature: settings.generation.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            top_p: settings.generation.top_p.unwrap_or(DEFAULT_TOP_P),
            max_tokens: settings.generation.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            context_window: settings
                .generation
                .context_window
                .unwrap_or(DEFAULT_CONTEXT_WINDOW),
        };
        let transcription = endpoint(settings.transcription, DEFAULT_TRANSCRIPTION_MODEL);
        let captioning = CaptioningConfig {
            endpoint: endpoint(settings.captioning.endpoint, DEFAULT_CAPTIONING_MODEL),
            prompt: settings
                .captioning
                .prompt
                .unwrap_or_else(|| DEFAULT_CAPTION_PROMPT.to_string()),
        };
        let synthesis = SynthesisConfig {
            endpoint: endpoint(settings.synthesis.endpoint, DEFAULT_SYNTHESIS_MODEL),
            voice: settings.synthesis.voice,
        };
        let ocr = OcrConfig {
            command: settings
                .ocr
                .command
                .unwrap_or_else(|| DEFAULT_OCR_COMMAND.to_string()),
            language: settings.ocr.language,
        };

        let outputs_dir = overrides
            .outputs_dir
            .or_else(|| env("TESSERA_OUTPUTS_DIR").map(PathBuf::from))
            .or(settings.storage.outputs_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUTS_DIR));

        let host = overrides
            .host
            .or_else(|| env("TESSERA_HOST"))
            .or(settings.server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let env_port = match env("TESSERA_PORT") {
            Some(raw) => Some(raw.trim().parse::<u16>().map_err(|e| {
                ConfigError::InvalidValue {
                    key: "TESSERA_PORT".into(),
                    message: format!("'{raw}': {e}"),
                }
            })?),
            None => None,
        };
        let port = overrides
            .port
            .or(env_port)
            .or(settings.server.port)
            .unwrap_or(DEFAULT_PORT);

        if !(0.0..=2.0).contains(&generation.temperature) {
            return Err(ConfigError::InvalidValue {
                key: "generation.temperature".into(),
                message: format!("{} is outside 0.0..=2.0", generation.temperature),
            });
        }

        Ok(TesseraConfig {
            config_dir,
            outputs_dir,
            max_retries: settings.api.max_retries.unwrap_or(0),
            generation,
            transcription,
            captioning,
            synthesis,
            ocr,
            server: ServerConfig { host, port },
        })
    }
}

/// Get the Tessera config directory path (~/.tessera/).
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TESSERA_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tessera")
}

/// Load and parse a TOML settings file, returning defaults on any error.
fn load_settings_file(path: &Path) -> SettingsFile {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("Failed to parse {}: {}", path.display(), e);
            SettingsFile::default()
        }),
        Err(_) => SettingsFile::default(),
    }
}

/// Load a settings file the user named explicitly. Missing or malformed is an error.
fn load_explicit_settings(path: &Path) -> Result<SettingsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|_| ConfigError::NotFound {
        path: path.display().to_string(),
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}
