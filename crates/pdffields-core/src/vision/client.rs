//! OpenAI-compatible chat completion client for page images.

use std::io::Cursor;
use std::time::Duration;

use base64::Engine;
use image::{DynamicImage, ImageFormat, RgbaImage};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use tracing::{info, trace, warn};

use super::prompts::{FIELD_SYSTEM, PAGE_SYSTEM, PAGE_USER, field_user_prompt};
use super::{PageCandidates, Throttle, VisionProvider, parse_field_answer, parse_page_answer};
use crate::error::VisionError;
use crate::fields::Field;
use crate::models::config::{FieldsConfig, ProviderKind, VisionConfig};

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const MAX_ERROR_BODY: usize = 500;

/// How requests authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// `Authorization: Bearer <key>` (OpenAI).
    Bearer(String),
    /// `api-key: <key>` (Azure OpenAI).
    ApiKey(String),
}

/// Chat completion URL plus credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub auth: Auth,
}

impl Endpoint {
    /// OpenAI (or any compatible server) at `base_url`.
    pub fn openai(base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            auth: Auth::Bearer(api_key.into()),
        }
    }

    /// Azure OpenAI deployment named after the model.
    pub fn azure(endpoint: &str, deployment: &str, api_version: &str, api_key: impl Into<String>) -> Self {
        Self {
            url: format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                endpoint.trim_end_matches('/'),
                deployment,
                api_version
            ),
            auth: Auth::ApiKey(api_key.into()),
        }
    }

    /// Resolve the endpoint from the process environment.
    pub fn from_env(vision: &VisionConfig) -> Result<Self, VisionError> {
        Self::from_env_with(vision, |key| std::env::var(key).ok())
    }

    /// Resolve the endpoint from an arbitrary variable lookup.
    pub fn from_env_with<F>(vision: &VisionConfig, lookup: F) -> Result<Self, VisionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| VisionError::Credentials(format!("{} is not set", key)))
        };

        match vision.provider {
            ProviderKind::OpenAi => {
                let api_key = required("OPENAI_API_KEY")?;
                let base_url = lookup("OPENAI_BASE_URL")
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());
                Ok(Self::openai(&base_url, api_key))
            }
            ProviderKind::Azure => {
                let api_key = required("AZURE_OPENAI_API_KEY")?;
                let endpoint = required("AZURE_OPENAI_ENDPOINT")?;
                let api_version = lookup("AZURE_OPENAI_API_VERSION")
                    .or_else(|| lookup("OPENAI_API_VERSION"))
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| vision.azure_api_version.clone());
                Ok(Self::azure(&endpoint, &vision.model, &api_version, api_key))
            }
        }
    }

    fn headers(&self) -> Result<HeaderMap, VisionError> {
        let (name, value) = match &self.auth {
            Auth::Bearer(key) => (AUTHORIZATION, format!("Bearer {}", key)),
            Auth::ApiKey(key) => (HeaderName::from_static("api-key"), key.clone()),
        };
        let value = HeaderValue::from_str(&value)
            .map_err(|_| VisionError::Credentials("API key is not a valid header value".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(name, value);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    response_format: ResponseFormat,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ContentPart<'a> {
    #[serde(rename = "text")]
    Text { text: &'a str },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Vision provider talking to an OpenAI-compatible endpoint.
pub struct VisionClient {
    http: reqwest::Client,
    endpoint: Endpoint,
    model: String,
    throttle: Throttle,
}

impl VisionClient {
    pub fn new(endpoint: Endpoint, model: impl Into<String>, throttle: Throttle) -> Result<Self, VisionError> {
        let http = reqwest::Client::builder()
            .default_headers(endpoint.headers()?)
            .build()?;

        Ok(Self {
            http,
            endpoint,
            model: model.into(),
            throttle,
        })
    }

    /// Build the client for a run, reading credentials from the environment.
    pub fn from_config(config: &FieldsConfig) -> Result<Self, VisionError> {
        let endpoint = Endpoint::from_env(&config.vision)?;
        info!(
            "Using {} vision provider with model {}",
            config.vision.provider.as_str(),
            config.vision.model
        );
        Self::new(endpoint, config.vision.model.clone(), Throttle::from_config(&config.throttle))
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Send one system + (text, image) exchange; `None` once retries are spent.
    async fn chat(&self, system: &str, user: &str, image: &RgbaImage) -> Option<String> {
        let data_url = match png_data_url(image) {
            Ok(url) => url,
            Err(e) => {
                warn!("Skipping vision call: {}", e);
                return None;
            }
        };

        let request = ChatCompletionRequest {
            model: &self.model,
            temperature: 0.0,
            response_format: ResponseFormat { kind: "json_object" },
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(system),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Parts(vec![
                        ContentPart::Text { text: user },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl { url: &data_url },
                        },
                    ]),
                },
            ],
        };

        self.throttle.call(|| self.send(&request)).await
    }

    async fn send(&self, request: &ChatCompletionRequest<'_>) -> Result<String, VisionError> {
        trace!("POST {}", self.endpoint.url);
        let response = self.http.post(&self.endpoint.url).json(request).send().await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(VisionError::RateLimited {
                retry_after: retry_after_hint(response.headers()),
            });
        }
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY).rev().find(|&i| body.is_char_boundary(i)).unwrap_or(0);
                body.truncate(cut);
            }
            return Err(VisionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let data: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| VisionError::Response(e.to_string()))?;

        Ok(data
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_else(|| "{}".to_string()))
    }
}

impl VisionProvider for VisionClient {
    async fn extract_field(&self, image: &RgbaImage, field: Field) -> Option<String> {
        let content = self.chat(FIELD_SYSTEM, &field_user_prompt(field), image).await?;
        parse_field_answer(&content, field)
    }

    async fn extract_all(&self, image: &RgbaImage) -> PageCandidates {
        match self.chat(PAGE_SYSTEM, PAGE_USER, image).await {
            Some(content) => parse_page_answer(&content),
            None => PageCandidates::default(),
        }
    }
}

/// Encode an image as a `data:image/png;base64,` URL (RGB, alpha dropped).
pub fn png_data_url(image: &RgbaImage) -> Result<String, VisionError> {
    let rgb = DynamicImage::ImageRgba8(image.clone()).into_rgb8();
    let mut png = Vec::new();
    DynamicImage::ImageRgb8(rgb)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| VisionError::Encode(e.to_string()))?;

    Ok(format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(&png)
    ))
}

/// Wait hint from `retry-after-ms` (milliseconds) or `retry-after` (seconds).
fn retry_after_hint(headers: &HeaderMap) -> Option<Duration> {
    let number = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v >= 0.0)
    };

    // Values too large for a Duration count as no hint.
    number("retry-after-ms")
        .and_then(|ms| Duration::try_from_secs_f64(ms / 1000.0).ok())
        .or_else(|| number(RETRY_AFTER.as_str()).and_then(|s| Duration::try_from_secs_f64(s).ok()))
}
