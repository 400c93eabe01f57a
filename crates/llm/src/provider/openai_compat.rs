//! Shared wire format and call driver for OpenAI-compatible chat APIs.
//!
//! OpenAI, X.AI, OpenRouter, DIAL and custom endpoints all speak this
//! dialect; each client contributes its URL pattern, auth header and
//! capability lookup while the request/response shapes live here.

use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use config::ProviderKind;

use crate::error::LlmError;
use crate::provider::http::{self, RetryPolicy};
use crate::provider::images;
use crate::request::{GenerationRequest, ModelResponse, Usage};

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<serde_json::Value>,
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage {
    pub role: &'static str,
    pub content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
pub(crate) struct ImageUrl {
    pub url: String,
}

/// Per-client knobs applied while translating a [`GenerationRequest`].
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct RequestOptions {
    pub supports_system_prompt: bool,
    pub supports_images: bool,
    pub supports_json_mode: bool,
    /// `reasoning_effort` for reasoning models; mutually exclusive with a
    /// caller temperature.
    pub reasoning_effort: Option<&'static str>,
    /// Reasoning models take `max_completion_tokens` instead of `max_tokens`.
    pub use_max_completion_tokens: bool,
}

/// Translate the uniform request into the wire shape.
///
/// Unsupported knobs are dropped, not rejected; every drop is logged and
/// returned as a warning for response metadata.
pub(crate) fn build_request(
    request: &GenerationRequest,
    options: RequestOptions,
) -> crate::Result<(ChatRequest, Vec<String>)> {
    let mut warnings = Vec::new();
    let mut messages = Vec::new();

    let mut user_text = request.prompt.clone();

    if let Some(system_prompt) = &request.system_prompt {
        if options.supports_system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: MessageContent::Text(system_prompt.clone()),
            });
        } else {
            // Fold the system prompt into the user message rather than lose it.
            user_text = format!("{system_prompt}\n\n{user_text}");
            warnings.push("system prompt folded into user message".to_string());
        }
    }

    let content = if request.images.is_empty() {
        MessageContent::Text(user_text)
    } else if options.supports_images {
        let mut parts = vec![ContentPart::Text { text: user_text }];

        for reference in &request.images {
            let payload = images::load_image(reference)?;
            parts.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: payload.to_data_url(),
                },
            });
        }

        MessageContent::Parts(parts)
    } else {
        let dropped = request.images.len();
        log::warn!("Model '{}' does not support images, dropping {dropped}", request.model);
        warnings.push(format!("{dropped} image(s) dropped: model does not support vision"));
        MessageContent::Text(user_text)
    };

    messages.push(ChatMessage {
        role: "user",
        content,
    });

    let response_format = match &request.json_schema {
        Some(schema) if options.supports_json_mode => Some(serde_json::json!({
            "type": "json_schema",
            "json_schema": { "name": "response", "schema": schema },
        })),
        Some(_) => {
            warnings.push("json_schema dropped: model does not support structured output".to_string());
            None
        }
        None => None,
    };

    let (max_tokens, max_completion_tokens) = if options.use_max_completion_tokens {
        (None, request.max_output_tokens)
    } else {
        (request.max_output_tokens, None)
    };

    // Reasoning models own their sampling; only send temperature elsewhere.
    let temperature = if options.reasoning_effort.is_some() {
        None
    } else {
        Some(request.temperature)
    };

    let wire = ChatRequest {
        model: request.model.clone(),
        messages,
        temperature,
        max_tokens,
        max_completion_tokens,
        reasoning_effort: options.reasoning_effort,
        response_format,
        stream: false,
    };

    Ok((wire, warnings))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireUsage {
    #[serde(default)]
    pub prompt_tokens: Option<u64>,
    #[serde(default)]
    pub completion_tokens: Option<u64>,
    #[serde(default)]
    pub total_tokens: Option<u64>,
}

/// Authentication scheme for a call.
pub(crate) enum Auth<'a> {
    Bearer(&'a SecretString),
    /// DIAL-style `Api-Key` header.
    ApiKey(&'a SecretString),
    None,
}

/// One resolved endpoint invocation.
pub(crate) struct ChatCall<'a> {
    pub provider_label: &'static str,
    pub url: String,
    pub auth: Auth<'a>,
    /// Extra query parameters (DIAL's `api-version`).
    pub query: Vec<(&'static str, String)>,
}

/// Execute a chat completion against an OpenAI-compatible endpoint.
pub(crate) async fn execute(
    client: &Client,
    call: ChatCall<'_>,
    wire: &ChatRequest,
    request: &GenerationRequest,
) -> crate::Result<ChatResponse> {
    let policy = RetryPolicy::default();
    let timeout = http::request_timeout(request.thinking_mode);

    let response = http::send_with_retry(call.provider_label, &policy, || {
        let mut builder = client
            .post(&call.url)
            .timeout(timeout)
            .header("Content-Type", "application/json")
            .query(&call.query)
            .json(wire);

        builder = match &call.auth {
            Auth::Bearer(key) => builder.header(AUTHORIZATION, format!("Bearer {}", key.expose_secret())),
            Auth::ApiKey(key) => builder.header("Api-Key", key.expose_secret().to_string()),
            Auth::None => builder,
        };

        builder
    })
    .await?;

    let status = response.status();

    if !status.is_success() {
        return Err(http::error_from_response(call.provider_label, &request.model, response).await);
    }

    let response_text = response.text().await.map_err(|e| {
        log::error!("Failed to read {} response body: {e}", call.provider_label);
        LlmError::Internal(None)
    })?;

    serde_json::from_str(&response_text).map_err(|e| {
        log::error!("Failed to parse {} chat completion response: {e}", call.provider_label);
        log::debug!("Response parsing failed, length: {} bytes", response_text.len());
        LlmError::Internal(None)
    })
}

/// Fold a wire response into the uniform [`ModelResponse`].
pub(crate) fn into_model_response(
    response: ChatResponse,
    request: &GenerationRequest,
    friendly_name: String,
    kind: ProviderKind,
    warnings: Vec<String>,
) -> crate::Result<ModelResponse> {
    let Some(choice) = response.choices.into_iter().next() else {
        log::error!("{kind} returned no choices");
        return Err(LlmError::Internal(None));
    };

    let mut metadata = serde_json::Map::new();

    if let Some(finish_reason) = choice.finish_reason {
        metadata.insert("finish_reason".to_string(), finish_reason.into());
    }

    if !warnings.is_empty() {
        metadata.insert("warnings".to_string(), warnings.into());
    }

    let usage = response.usage.map(|wire| Usage {
        input_tokens: wire.prompt_tokens,
        output_tokens: wire.completion_tokens,
        total_tokens: wire.total_tokens,
    });

    Ok(ModelResponse {
        content: choice.message.content.unwrap_or_default(),
        usage,
        model_name: request.model.clone(),
        friendly_name,
        provider: kind,
        metadata,
    })
}
