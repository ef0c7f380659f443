//! Chat-completions transport classifier. The model answers a single
//! JSON object `{"transportista": "...", "confianza": 0.0-1.0}`; anything
//! it cannot identify comes back as DESCONOCIDO. Without an API key the
//! process simply never constructs this client.

use async_trait::async_trait;
use reparto::provider::{
    AiClassification, ProviderError, TransportClassifier, AI_TIMEOUT,
};
use serde::{Deserialize, Serialize};

pub const OPENAI_API_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub struct OpenAiClient {
    api_key: String,
    model: String,
    base_url: String,
    valid_names: Vec<String>,
    http: reqwest::Client,
}

impl OpenAiClient {
    /// `valid_names` is the canonical carrier vocabulary offered to the
    /// model; the cascade re-validates the answer against the carrier
    /// table anyway.
    pub fn new<S: Into<String>>(api_key: S, valid_names: Vec<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_owned(),
            base_url: OPENAI_API_URL.to_owned(),
            valid_names,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn system_prompt(&self) -> String {
        format!(
            "Sos un clasificador de textos de logística en Argentina. \
             Dado un texto, identificás el transportista. \
             Respondé SOLO con JSON: {{\"transportista\": \"NOMBRE\", \"confianza\": 0.95}}. \
             Si no podés identificarlo con certeza, usá 'DESCONOCIDO'. \
             Nombres válidos: {}.",
            self.valid_names.join(", ")
        )
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f64,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

fn parse_answer(content: &str) -> Option<AiClassification> {
    serde_json::from_str(content.trim()).ok()
}

#[async_trait]
impl TransportClassifier for OpenAiClient {
    async fn classify(
        &self,
        texto: &str,
    ) -> Result<Option<AiClassification>, ProviderError> {
        let truncated: String = texto.chars().take(500).collect();
        let user_content = format!("Texto: {truncated}");
        let system = self.system_prompt();
        let body = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            max_tokens: 100,
            messages: vec![
                Message {
                    role: "system",
                    content: &system,
                },
                Message {
                    role: "user",
                    content: &user_content,
                },
            ],
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .http
            .post(url)
            .timeout(AI_TIMEOUT)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|why| match why.status() {
                Some(status) => {
                    ProviderError::status(status.as_u16(), why.to_string())
                }
                None => ProviderError::other(why),
            })?;

        if !response.status().is_success() {
            return Err(ProviderError::status(
                response.status().as_u16(),
                "chat completion failed",
            ));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|why| ProviderError::parse(why.to_string()))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content);
        Ok(content.as_deref().and_then(parse_answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_expected_json_shape() {
        let answer =
            parse_answer(r#"{"transportista": "ANDREANI", "confianza": 0.97}"#)
                .unwrap();
        assert_eq!(answer.transportista, "ANDREANI");
        assert_eq!(answer.confianza, 0.97);
    }

    #[test]
    fn prose_answers_are_discarded() {
        assert!(parse_answer("No puedo identificar el transportista").is_none());
    }

    #[test]
    fn prompt_lists_the_carrier_vocabulary() {
        let client = OpenAiClient::new(
            "key",
            vec!["ANDREANI".to_owned(), "DESCONOCIDO".to_owned()],
        );
        let prompt = client.system_prompt();
        assert!(prompt.contains("ANDREANI, DESCONOCIDO"));
    }
}
