use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use config::{ApiKeySettings, ProviderKind};

use crate::catalog::{Catalog, ModelCapability};
use crate::error::LlmError;
use crate::provider::http::{self, RetryPolicy};
use crate::provider::images;
use crate::provider::Provider;
use crate::request::{GenerationRequest, ModelResponse, Usage};

const DEFAULT_GOOGLE_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini client over the native `generateContent` API.
pub struct GoogleProvider {
    client: Client,
    api_key: SecretString,
    base_url: String,
}

impl GoogleProvider {
    pub fn new(settings: &ApiKeySettings) -> crate::Result<Self> {
        Ok(Self {
            client: http::client()?,
            api_key: settings.api_key.clone(),
            base_url: DEFAULT_GOOGLE_API_URL.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
enum Part {
    #[serde(rename = "text")]
    Text(String),
    #[serde(rename = "inlineData", rename_all = "camelCase")]
    InlineData { mime_type: String, data: String },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: Option<u64>,
    #[serde(default)]
    candidates_token_count: Option<u64>,
    #[serde(default)]
    total_token_count: Option<u64>,
}

#[async_trait]
impl Provider for GoogleProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    fn validate_model(&self, name: &str) -> bool {
        Catalog::builtin(ProviderKind::Google).capabilities(name).is_some()
    }

    fn capabilities(&self, name: &str) -> Option<ModelCapability> {
        Catalog::builtin(ProviderKind::Google).capabilities(name).cloned()
    }

    async fn generate(&self, mut request: GenerationRequest) -> crate::Result<ModelResponse> {
        let capability = self.capabilities(&request.model).ok_or_else(|| LlmError::ModelUnavailable {
            requested: request.model.clone(),
            detail: "Model is not in the Gemini catalog".to_string(),
        })?;

        request.model = capability.name.clone();

        let mut warnings = Vec::new();

        let (temperature, warning) = capability.temperature.correct(request.temperature);
        if let Some(warning) = warning {
            log::warn!("Gemini model '{}': {warning}", request.model);
            warnings.push(warning);
        }

        let thinking_config = match request.thinking_mode {
            Some(mode) if capability.supports_thinking => Some(ThinkingConfig {
                thinking_budget: mode.budget_tokens(capability.max_thinking_tokens) as u32,
            }),
            Some(_) => {
                log::warn!("Model '{}' does not support thinking mode, ignoring", request.model);
                warnings.push("thinking_mode dropped: model has no thinking budget".to_string());
                None
            }
            None => None,
        };

        let mut parts = vec![Part::Text(request.prompt.clone())];

        for reference in &request.images {
            if !capability.supports_images {
                log::warn!("Model '{}' does not support images, dropping", request.model);
                warnings.push(format!(
                    "{} image(s) dropped: model does not support vision",
                    request.images.len()
                ));
                break;
            }

            let payload = images::load_image(reference)?;
            parts.push(Part::InlineData {
                mime_type: payload.mime_type,
                data: payload.base64_data,
            });
        }

        let system_instruction = request.system_prompt.as_ref().map(|text| Content {
            role: None,
            parts: vec![Part::Text(text.clone())],
        });

        let (response_mime_type, response_schema) = match request.json_schema.clone() {
            Some(schema) => (Some("application/json"), Some(schema)),
            None => (None, None),
        };

        let wire = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts,
            }],
            system_instruction,
            generation_config: GenerationConfig {
                temperature,
                max_output_tokens: request.max_output_tokens,
                thinking_config,
                response_mime_type,
                response_schema,
            },
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url,
            request.model,
            self.api_key.expose_secret()
        );

        let policy = RetryPolicy::default();
        let timeout = http::request_timeout(request.thinking_mode);

        let response = http::send_with_retry("Gemini", &policy, || {
            self.client
                .post(&url)
                .timeout(timeout)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .json(&wire)
        })
        .await?;

        let status = response.status();

        if !status.is_success() {
            return Err(http::error_from_response("Gemini", &request.model, response).await);
        }

        let response_text = response.text().await.map_err(|e| {
            log::error!("Failed to read Gemini response body: {e}");
            LlmError::Internal(None)
        })?;

        let parsed: GenerateContentResponse = serde_json::from_str(&response_text).map_err(|e| {
            log::error!("Failed to parse Gemini response: {e}");
            log::debug!("Response parsing failed, length: {} bytes", response_text.len());
            LlmError::Internal(None)
        })?;

        let Some(candidate) = parsed.candidates.into_iter().next() else {
            log::error!("Gemini returned an empty candidates array");
            return Err(LlmError::Internal(None));
        };

        let content = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let mut metadata = serde_json::Map::new();

        if let Some(finish_reason) = candidate.finish_reason {
            metadata.insert("finish_reason".to_string(), finish_reason.into());
        }

        if !warnings.is_empty() {
            metadata.insert("warnings".to_string(), warnings.into());
        }

        let usage = parsed.usage_metadata.map(|meta| Usage {
            input_tokens: meta.prompt_token_count,
            output_tokens: meta.candidates_token_count,
            total_tokens: meta.total_token_count,
        });

        Ok(ModelResponse {
            content,
            usage,
            model_name: request.model,
            friendly_name: capability.friendly_name,
            provider: ProviderKind::Google,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_json_snapshot;

    use super::*;

    #[test]
    fn wire_request_shape() {
        let wire = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part::Text("hello".to_string())],
            }],
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part::Text("be brief".to_string())],
            }),
            generation_config: GenerationConfig {
                temperature: 0.5,
                max_output_tokens: Some(2048),
                thinking_config: Some(ThinkingConfig {
                    thinking_budget: 8_110,
                }),
                response_mime_type: None,
                response_schema: None,
            },
        };

        assert_json_snapshot!(wire, @r#"
        {
          "contents": [
            {
              "role": "user",
              "parts": [
                {
                  "text": "hello"
                }
              ]
            }
          ],
          "systemInstruction": {
            "parts": [
              {
                "text": "be brief"
              }
            ]
          },
          "generationConfig": {
            "temperature": 0.5,
            "maxOutputTokens": 2048,
            "thinkingConfig": {
              "thinkingBudget": 8110
            }
          }
        }
        "#);
    }

    #[test]
    fn response_parses_candidates_and_usage() {
        let raw = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "first "}, {"text": "second"}]}, "finishReason": "STOP"}
            ],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 3, "totalTokenCount": 15}
        }"#;

        let parsed: GenerateContentResponse = serde_json::from_str(raw).unwrap();

        assert_eq!(parsed.candidates.len(), 1);
        assert_eq!(parsed.usage_metadata.unwrap().total_token_count, Some(15));
    }
}
