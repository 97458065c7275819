use std::time::Duration;

use serde::Deserialize;

fn default_http_port() -> u16 {
    8090
}

fn default_genai_provider() -> String {
    "gemini".into()
}

fn default_gemini_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".into()
}

fn default_openai_api_base() -> String {
    "https://api.openai.com".into()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".into()
}

fn default_speech_api_base() -> String {
    "https://speech.googleapis.com/v1".into()
}

fn default_speech_language() -> String {
    "en-IN".into()
}

fn default_vision_api_base() -> String {
    "https://vision.googleapis.com/v1".into()
}

fn default_whatsapp_api_base() -> String {
    "https://graph.facebook.com/v19.0".into()
}

fn default_upstream_timeout_secs() -> u64 {
    60
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

/// Process configuration, read from the environment (`GEMINI_API_KEY`,
/// `HTTP_PORT`, ...). An empty API key leaves that upstream unconfigured.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// `gemini` or `openai`.
    #[serde(default = "default_genai_provider")]
    pub genai_provider: String,
    #[serde(default)]
    pub gemini_api_key: String,
    #[serde(default = "default_gemini_api_base")]
    pub gemini_api_base: String,
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default = "default_openai_api_base")]
    pub openai_api_base: String,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default)]
    pub speech_api_key: String,
    #[serde(default = "default_speech_api_base")]
    pub speech_api_base: String,
    #[serde(default = "default_speech_language")]
    pub speech_language: String,
    #[serde(default)]
    pub vision_api_key: String,
    #[serde(default = "default_vision_api_base")]
    pub vision_api_base: String,
    #[serde(default)]
    pub whatsapp_token: String,
    #[serde(default)]
    pub whatsapp_phone_number_id: String,
    #[serde(default = "default_whatsapp_api_base")]
    pub whatsapp_api_base: String,
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::default())
            .build()?
            .try_deserialize()
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs.max(1))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            http_port: default_http_port(),
            genai_provider: default_genai_provider(),
            gemini_api_key: String::new(),
            gemini_api_base: default_gemini_api_base(),
            gemini_model: default_gemini_model(),
            openai_api_key: String::new(),
            openai_api_base: default_openai_api_base(),
            openai_model: default_openai_model(),
            speech_api_key: String::new(),
            speech_api_base: default_speech_api_base(),
            speech_language: default_speech_language(),
            vision_api_key: String::new(),
            vision_api_base: default_vision_api_base(),
            whatsapp_token: String::new(),
            whatsapp_phone_number_id: String::new(),
            whatsapp_api_base: default_whatsapp_api_base(),
            upstream_timeout_secs: default_upstream_timeout_secs(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}
