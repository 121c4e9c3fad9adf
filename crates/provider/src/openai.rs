//! OpenAI-compatible chat completions client
//!
//! Works against any server exposing `POST {api_base}/chat/completions`
//! (OpenAI, OpenRouter, vLLM, llama.cpp, Ollama's compatibility layer).

use crate::*;
use reqwest::Client;
use serde_json::json;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    api_base: String,
    default_model: String,
}

impl OpenAiProvider {
    pub fn new(
        api_key: impl Into<String>,
        api_base: Option<String>,
        default_model: Option<String>,
    ) -> Self {
        let api_base = api_base
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let default_model = default_model
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
            default_model,
        }
    }

    fn build_request(&self, params: &ChatParams) -> serde_json::Value {
        let model = if params.model.is_empty() {
            self.default_model.clone()
        } else {
            params.model.clone()
        };

        let messages: Vec<serde_json::Value> = params
            .messages
            .iter()
            .map(|m| json!({ "role": &m.role, "content": &m.content }))
            .collect();

        json!({
            "model": model,
            "messages": messages,
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
        })
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<ChatResponse> {
        let choice = json["choices"]
            .get(0)
            .ok_or(ProviderError::InvalidResponse)?;
        let message = &choice["message"];
        let raw = message["content"].as_str().unwrap_or("");
        let finish_reason = choice["finish_reason"]
            .as_str()
            .unwrap_or("stop")
            .to_string();

        let (content, inline_reasoning) = split_reasoning(raw);
        let reasoning = message["reasoning_content"]
            .as_str()
            .filter(|r| !r.is_empty())
            .map(|r| r.to_string())
            .or(inline_reasoning);

        let usage = if let Some(usage) = json["usage"].as_object() {
            Usage {
                prompt_tokens: usage["prompt_tokens"].as_u64().unwrap_or(0) as u32,
                completion_tokens: usage["completion_tokens"].as_u64().unwrap_or(0) as u32,
                total_tokens: usage["total_tokens"].as_u64().unwrap_or(0) as u32,
            }
        } else {
            Usage::default()
        };

        Ok(ChatResponse {
            content: Some(content),
            reasoning,
            finish_reason,
            usage,
        })
    }
}

#[async_trait::async_trait]
impl Provider for OpenAiProvider {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NoApiKey);
        }
        trace!("◆ requesting completion from {}", self.api_base);

        let url = format!("{}/chat/completions", self.api_base);
        let body = self.build_request(&params);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let json: serde_json::Value = response.json().await?;

        if !status.is_success() {
            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }
            let error = json["error"]["message"]
                .as_str()
                .unwrap_or("unknown error")
                .to_string();
            return Err(ProviderError::Api(error));
        }

        debug!(
            "◆ completion received, finish_reason={}",
            json["choices"][0]["finish_reason"].as_str().unwrap_or("?")
        );

        self.parse_response(json)
    }

    fn default_model(&self) -> String {
        self.default_model.clone()
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults() {
        let provider = OpenAiProvider::new("sk-test", None, None);
        assert_eq!(provider.api_base, "https://api.openai.com/v1");
        assert_eq!(provider.default_model(), "gpt-4o-mini");
        assert!(provider.is_configured());
    }

    #[test]
    fn test_new_custom_base_strips_slash() {
        let provider = OpenAiProvider::new(
            "key",
            Some("http://localhost:11434/v1/".to_string()),
            Some("llama3".to_string()),
        );
        assert_eq!(provider.api_base, "http://localhost:11434/v1");
        assert_eq!(provider.default_model(), "llama3");
    }

    #[test]
    fn test_empty_key_not_configured() {
        let provider = OpenAiProvider::new("", None, None);
        assert!(!provider.is_configured());
    }

    #[test]
    fn test_build_request_uses_default_model() {
        let provider = OpenAiProvider::new("key", None, Some("m1".to_string()));
        let params = ChatParams {
            messages: vec![Message::system("sys"), Message::user("hi")],
            ..Default::default()
        };
        let request = provider.build_request(&params);
        assert_eq!(request["model"], "m1");
        assert_eq!(request["max_tokens"], 4096);
        let messages = request["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["content"], "hi");
    }

    #[test]
    fn test_parse_response_inline_reasoning() {
        let provider = OpenAiProvider::new("key", None, None);
        let json = json!({
            "choices": [{
                "message": {"content": "<think>hmm</think>Done."},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5}
        });
        let response = provider.parse_response(json).unwrap();
        assert_eq!(response.answer(), "Done.");
        assert_eq!(response.reasoning.as_deref(), Some("hmm"));
        assert_eq!(response.usage.total_tokens, 5);
    }

    #[test]
    fn test_parse_response_reasoning_field() {
        let provider = OpenAiProvider::new("key", None, None);
        let json = json!({
            "choices": [{
                "message": {"content": "ok", "reasoning_content": "because"},
                "finish_reason": "stop"
            }]
        });
        let response = provider.parse_response(json).unwrap();
        assert_eq!(response.answer(), "ok");
        assert_eq!(response.reasoning.as_deref(), Some("because"));
    }

    #[test]
    fn test_parse_response_no_choices() {
        let provider = OpenAiProvider::new("key", None, None);
        let result = provider.parse_response(json!({"choices": []}));
        assert!(matches!(result, Err(ProviderError::InvalidResponse)));
    }
}
