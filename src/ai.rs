// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Blocking Gemini client. The provider is a black-box text-completion
//! service: one POST, one candidate text back. Any transport error,
//! non-2xx status, or empty candidate is a hard failure for that call and
//! must never touch ledger state.

use anyhow::Result;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::errors::{Result as AiResult, StewardError};
use crate::utils::{get_setting, http_client};

const DEFAULT_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent";
const API_KEY_ENV: &str = "GEMINI_API_KEY";
const CALL_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_MAX_TOKENS: i32 = 1200;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    system_instruction: SystemInstruction,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: i32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

pub struct GeminiClient {
    client: reqwest::blocking::Client,
    api_url: String,
    api_key: String,
}

impl GeminiClient {
    /// Endpoint comes from the settings table when overridden, the API key
    /// from the environment.
    pub fn from_settings(conn: &Connection) -> Result<Self> {
        let api_url =
            get_setting(conn, "ai_api_url")?.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_key = std::env::var(API_KEY_ENV).unwrap_or_default();
        Ok(Self {
            client: http_client(CALL_TIMEOUT_SECS)?,
            api_url,
            api_key,
        })
    }

    pub fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
        max_tokens: i32,
    ) -> AiResult<String> {
        if self.api_key.is_empty() {
            return Err(StewardError::Ai(format!("{} is not set", API_KEY_ENV)));
        }

        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![Part {
                    text: user_prompt.to_string(),
                }],
            }],
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: system_prompt.to_string(),
                }],
            },
            generation_config: GenerationConfig {
                temperature,
                max_output_tokens: max_tokens,
            },
        };

        let url = format!("{}?key={}", self.api_url, self.api_key);
        debug!(prompt_len = user_prompt.len(), "calling Gemini");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .map_err(|e| {
                error!("Gemini request failed: {}", e);
                StewardError::Ai(format!("request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            error!(%status, "Gemini returned an error");
            return Err(StewardError::Ai(format!("HTTP {}: {}", status, body)));
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| StewardError::Ai(format!("unreadable response: {}", e)))?;

        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(StewardError::Ai("empty response".into()));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_provider_shape() {
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![Part {
                    text: "How is my budget doing?".into(),
                }],
            }],
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: "You are a budgeting assistant".into(),
                }],
            },
            generation_config: GenerationConfig {
                temperature: 0.2,
                max_output_tokens: 1200,
            },
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"systemInstruction\""));
        assert!(json.contains("\"generationConfig\""));
        assert!(json.contains("\"maxOutputTokens\":1200"));
        assert!(json.contains("\"role\":\"user\""));
    }

    #[test]
    fn response_text_extraction() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"hello"}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.candidates[0].content.parts[0].text, "hello");
    }
}
