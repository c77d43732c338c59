//! OpenAI / Azure OpenAI chat completion client.
//!
//! Requests ask for a JSON object at temperature 0; the judge prompt and the
//! parsing of the answer live in `ranksight_core::judge`.

use crate::config::{LlmProvider, LlmSettings};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ranksight_core::error::JudgeError;
use ranksight_core::judge::ChatModel;
use serde::{Deserialize, Serialize};

/// Longest error body kept in an error message.
const MAX_ERROR_BODY: usize = 500;

/// Chat model over the OpenAI chat completions API.
pub struct OpenAiChatModel {
    client: reqwest::Client,
    provider: LlmProvider,
    model: String,
    url: String,
    api_key: String,
}

impl OpenAiChatModel {
    /// Builds a client for the configured provider.
    ///
    /// # Errors
    ///
    /// Fails if the provider's endpoint or API key is missing.
    pub fn from_settings(client: reqwest::Client, settings: &LlmSettings) -> Result<Self> {
        let (url, api_key) = match settings.provider {
            LlmProvider::Azure => {
                let endpoint = settings
                    .azure_endpoint
                    .as_deref()
                    .ok_or_else(|| anyhow!("AZURE_OPENAI_ENDPOINT is required for LLM_PROVIDER=azure"))?;
                let key = settings
                    .azure_api_key
                    .clone()
                    .ok_or_else(|| anyhow!("AZURE_OPENAI_API_KEY is required for LLM_PROVIDER=azure"))?;
                let url = format!(
                    "{}/openai/deployments/{}/chat/completions?api-version={}",
                    endpoint.trim_end_matches('/'),
                    settings.model,
                    settings.azure_api_version
                );
                (url, key)
            }
            LlmProvider::OpenAi => {
                let key = settings
                    .openai_api_key
                    .clone()
                    .ok_or_else(|| anyhow!("OPENAI_API_KEY is required for LLM_PROVIDER=openai"))?;
                let url = format!(
                    "{}/chat/completions",
                    settings.openai_base_url.trim_end_matches('/')
                );
                (url, key)
            }
        };

        Ok(Self {
            client,
            provider: settings.provider,
            model: settings.model.clone(),
            url,
            api_key,
        })
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            // Azure routes by deployment in the URL; the field is ignored there
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        }
    }
}

#[async_trait(?Send)]
impl ChatModel for OpenAiChatModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete_json(&self, prompt: &str) -> Result<String, JudgeError> {
        let request = self.client.post(&self.url).json(&self.request_body(prompt));
        let request = match self.provider {
            LlmProvider::Azure => request.header("api-key", &self.api_key),
            LlmProvider::OpenAi => request.bearer_auth(&self.api_key),
        };

        let resp = request
            .send()
            .await
            .map_err(|e| JudgeError::Request(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(JudgeError::Status {
                status,
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let body: ChatResponse = resp
            .json()
            .await
            .map_err(|e| JudgeError::Request(format!("invalid completion envelope: {}", e)))?;

        first_content(body).ok_or(JudgeError::EmptyCompletion)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

fn first_content(response: ChatResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm_settings(provider: LlmProvider) -> LlmSettings {
        LlmSettings {
            provider,
            model: "gpt-4o".to_string(),
            azure_endpoint: Some("https://example.openai.azure.com/".to_string()),
            azure_api_key: Some("azure-key".to_string()),
            azure_api_version: "2024-08-01-preview".to_string(),
            openai_api_key: Some("sk-test".to_string()),
            openai_base_url: "https://api.openai.com/v1/".to_string(),
        }
    }

    #[test]
    fn test_azure_url() {
        let model =
            OpenAiChatModel::from_settings(reqwest::Client::new(), &llm_settings(LlmProvider::Azure))
                .unwrap();
        assert_eq!(
            model.url,
            "https://example.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-08-01-preview"
        );
        assert_eq!(model.model_name(), "gpt-4o");
    }

    #[test]
    fn test_openai_url() {
        let model =
            OpenAiChatModel::from_settings(reqwest::Client::new(), &llm_settings(LlmProvider::OpenAi))
                .unwrap();
        assert_eq!(model.url, "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn test_missing_credentials() {
        let mut settings = llm_settings(LlmProvider::Azure);
        settings.azure_endpoint = None;
        let err = OpenAiChatModel::from_settings(reqwest::Client::new(), &settings)
            .err()
            .unwrap();
        assert!(err.to_string().contains("AZURE_OPENAI_ENDPOINT"));

        let mut settings = llm_settings(LlmProvider::OpenAi);
        settings.openai_api_key = None;
        assert!(OpenAiChatModel::from_settings(reqwest::Client::new(), &settings).is_err());
    }

    #[test]
    fn test_request_body() {
        let model =
            OpenAiChatModel::from_settings(reqwest::Client::new(), &llm_settings(LlmProvider::OpenAi))
                .unwrap();
        let body = serde_json::to_value(model.request_body("hello")).unwrap();
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
    }

    #[test]
    fn test_first_content() {
        let ok: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"content": "{\"winner\": \"A\"}"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_content(ok).as_deref(), Some("{\"winner\": \"A\"}"));

        let empty: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap();
        assert_eq!(first_content(empty), None);

        let none: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert_eq!(first_content(none), None);
    }
}
