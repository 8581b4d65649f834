// Cloud Classifier Provider
// Optional second opinion from an OpenAI-compatible chat-completions endpoint.
// Independent of the local engine: nothing here feeds back into a DetectionResult.

use crate::services::config_store::{CloudConfig, ConfigStore};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::info;

const OPENAI_DEFAULT_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEEPSEEK_DEFAULT_URL: &str = "https://api.deepseek.com/chat/completions";
const GLM_DEFAULT_URL: &str = "https://open.bigmodel.cn/api/paas/v4/chat/completions";

const CLOUD_MAX_TOKENS: i32 = 512;

const CLASSIFY_SYSTEM_PROMPT: &str = r#"You judge whether a passage was written by an AI system or by a person.
Consider fluency, personal voice, repetition and structural uniformity.
Reply with JSON only, using these fields:
- probability: number between 0 and 1, the probability the passage is AI-generated
- confidence: number between 0 and 1, how sure you are
- reasoning: one short sentence"#;

#[derive(Error, Debug)]
pub enum CloudError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Missing content in response")]
    MissingContent,
    #[error("JSON parse error: {0}")]
    JsonError(String),
    #[error("API key not configured for {0}")]
    MissingApiKey(String),
    #[error("Unknown provider {0}; set cloud.baseUrl")]
    UnknownProvider(String),
    #[error("Cloud check timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderSpec {
    pub name: String,
    pub model: String,
}

pub fn parse_provider(spec: &str) -> ProviderSpec {
    let parts: Vec<&str> = spec.splitn(2, ':').collect();
    if parts.len() == 2 {
        ProviderSpec {
            name: parts[0].to_string(),
            model: parts[1].to_string(),
        }
    } else {
        ProviderSpec {
            name: spec.to_string(),
            model: String::new(),
        }
    }
}

fn default_url(provider: &str) -> Option<&'static str> {
    match provider {
        "openai" => Some(OPENAI_DEFAULT_URL),
        "deepseek" => Some(DEEPSEEK_DEFAULT_URL),
        "glm" => Some(GLM_DEFAULT_URL),
        _ => None,
    }
}

fn default_model(provider: &str) -> &'static str {
    match provider {
        "deepseek" => "deepseek-chat",
        "glm" => "glm-4-flash",
        _ => "gpt-4o-mini",
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: i32,
    temperature: f64,
    response_format: ResponseFormat,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    r#type: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessageResponse>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    probability: f64,
    #[serde(default = "default_confidence")]
    confidence: f64,
    #[serde(default)]
    reasoning: Option<String>,
}

fn default_confidence() -> f64 {
    0.6
}

/// The cloud model's answer, labeled with where it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudVerdict {
    pub provider: String,
    pub model: String,
    pub ai_probability: f64,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub latency_ms: i64,
}

pub struct CloudClassifier {
    client: Client,
    url: String,
    spec: ProviderSpec,
    api_key: String,
    timeout_secs: u64,
}

impl CloudClassifier {
    /// Resolve URL, model and key. Fails without a key or a usable endpoint.
    pub fn from_config(config: &CloudConfig) -> Result<Self, CloudError> {
        let mut spec = parse_provider(&config.provider);
        if spec.model.is_empty() {
            spec.model = default_model(&spec.name).to_string();
        }

        let url = match &config.base_url {
            Some(url) if !url.trim().is_empty() => url.trim().to_string(),
            _ => default_url(&spec.name)
                .map(str::to_string)
                .ok_or_else(|| CloudError::UnknownProvider(spec.name.clone()))?,
        };

        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| get_api_key(&spec.name))
            .ok_or_else(|| CloudError::MissingApiKey(spec.name.clone()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            client,
            url,
            spec,
            api_key,
            timeout_secs: config.timeout_secs.max(1),
        })
    }

    pub fn provider(&self) -> &ProviderSpec {
        &self.spec
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    pub async fn classify(&self, text: &str) -> Result<CloudVerdict, CloudError> {
        let request = ChatRequest {
            model: self.spec.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: CLASSIFY_SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!("Classify this passage and answer in JSON:\n\n{}", text),
                },
            ],
            max_tokens: CLOUD_MAX_TOKENS,
            temperature: 0.0,
            response_format: ResponseFormat {
                r#type: "json_object".to_string(),
            },
        };

        let start = Instant::now();
        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let latency_ms = start.elapsed().as_millis() as i64;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CloudError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let data: ChatResponse = response
            .json()
            .await
            .map_err(|e| CloudError::JsonError(e.to_string()))?;

        let content = data
            .choices
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.clone())
            .ok_or(CloudError::MissingContent)?;

        let verdict = parse_verdict(&content, &self.spec, latency_ms)?;
        info!(
            provider = %self.spec.name,
            model = %self.spec.model,
            latency_ms,
            ai_probability = verdict.ai_probability,
            "cloud.verdict"
        );
        Ok(verdict)
    }
}

/// Take the outermost `{...}` span so prose around the JSON is tolerated.
pub fn extract_json(content: &str) -> &str {
    let trimmed = content.trim();
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            return &trimmed[start..=end];
        }
    }
    trimmed
}

pub fn parse_verdict(content: &str, spec: &ProviderSpec, latency_ms: i64) -> Result<CloudVerdict, CloudError> {
    let raw: RawVerdict =
        serde_json::from_str(extract_json(content)).map_err(|e| CloudError::JsonError(e.to_string()))?;
    if !raw.probability.is_finite() || !raw.confidence.is_finite() {
        return Err(CloudError::JsonError("non-finite probability".to_string()));
    }
    Ok(CloudVerdict {
        provider: spec.name.clone(),
        model: spec.model.clone(),
        ai_probability: raw.probability.clamp(0.0, 1.0),
        confidence: raw.confidence.clamp(0.0, 1.0),
        reasoning: raw.reasoning.filter(|r| !r.trim().is_empty()),
        latency_ms,
    })
}

/// Env first (`STYLOSCOPE_CLOUD_API_KEY`, then the provider's usual variable),
/// then the default config file.
pub fn get_api_key(provider: &str) -> Option<String> {
    let mut env_keys = vec!["STYLOSCOPE_CLOUD_API_KEY"];
    env_keys.extend(match provider {
        "openai" => vec!["OPENAI_API_KEY"],
        "deepseek" => vec!["DEEPSEEK_API_KEY"],
        "glm" => vec!["GLM_API_KEY"],
        _ => vec![],
    });

    for key in env_keys {
        if let Ok(val) = env::var(key) {
            let v = val.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }

    let store = ConfigStore::new(ConfigStore::default_config_dir()?);
    store
        .load()
        .ok()
        .and_then(|config| config.cloud.api_key)
        .filter(|k| !k.trim().is_empty())
}
