//! OpenAI Responses API provider
//!
//! ```text
//! create_conversation ──► POST {base}/conversations  {items}
//! create_completion   ──► POST {base}/responses      {model, conversation, input, tools?}
//! ```
//!
//! The HTTP body carries no `output_text` field; it is assembled from the
//! `output_text` parts of every `message` output item.

use std::time::Duration;

use async_trait::async_trait;
use hq_domain::ConversationHandle;
use hq_usecase::ports::{Completion, FunctionCall, InputItem, ModelProvider, OutputItem};
use hq_usecase::ProviderError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

const CLIENT_TIMEOUT: Duration = Duration::from_secs(120);
const ERROR_BODY_PREVIEW: usize = 500;

pub struct OpenAiResponsesProvider {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiResponsesProvider {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .build()
            .map_err(from_reqwest)?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            client,
        })
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> Result<Value, ProviderError> {
        let url = format!("{}/{}", self.base_url, path);
        let mut request = self.client.post(&url).json(body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(from_reqwest)?;
        let status = response.status();
        let text = response.text().await.map_err(from_reqwest)?;
        if !status.is_success() {
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body: preview(&text),
            });
        }

        debug!(url = %url, status = status.as_u16(), "Provider request done");
        serde_json::from_str(&text).map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

fn from_reqwest(err: reqwest::Error) -> ProviderError {
    match err.status() {
        Some(status) => ProviderError::Http {
            status: status.as_u16(),
            body: err.to_string(),
        },
        None => ProviderError::Transport(err.to_string()),
    }
}

fn preview(body: &str) -> String {
    match body.char_indices().nth(ERROR_BODY_PREVIEW) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

// ========== Wire format ==========

/// The JSON shape of one input item
pub fn wire_item(item: &InputItem) -> Value {
    match item {
        InputItem::System { content } => json!({"role": "system", "content": content}),
        InputItem::User { content } => json!({"role": "user", "content": content}),
        InputItem::FunctionCallOutput { call_id, output } => json!({
            "type": "function_call_output",
            "call_id": call_id,
            "output": output,
        }),
    }
}

#[derive(Serialize)]
struct ResponseRequest<'a> {
    model: &'a str,
    conversation: &'a str,
    input: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [Value]>,
}

#[derive(Deserialize)]
struct ConversationBody {
    id: String,
}

#[derive(Deserialize)]
struct ResponseBody {
    #[serde(default)]
    output: Vec<WireOutput>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum WireOutput {
    #[serde(rename = "message")]
    Message {
        #[serde(default)]
        content: Vec<WireContent>,
    },
    #[serde(rename = "function_call")]
    FunctionCall {
        name: String,
        #[serde(default)]
        arguments: String,
        call_id: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum WireContent {
    #[serde(rename = "output_text")]
    OutputText { text: String },
    #[serde(other)]
    Other,
}

/// Decode a `/responses` body into a [`Completion`]
pub fn parse_completion(body: Value) -> Result<Completion, ProviderError> {
    let body: ResponseBody =
        serde_json::from_value(body).map_err(|e| ProviderError::Decode(e.to_string()))?;

    let mut completion = Completion::default();
    for item in body.output {
        match item {
            WireOutput::Message { content } => {
                for part in content {
                    if let WireContent::OutputText { text } = part {
                        completion.output_text.push_str(&text);
                    }
                }
            }
            WireOutput::FunctionCall {
                name,
                arguments,
                call_id,
            } => completion.output_items.push(OutputItem::FunctionCall(FunctionCall {
                name,
                arguments,
                call_id,
            })),
            WireOutput::Other => completion.output_items.push(OutputItem::Other),
        }
    }
    Ok(completion)
}

#[async_trait]
impl ModelProvider for OpenAiResponsesProvider {
    async fn create_conversation(
        &self,
        items: &[InputItem],
    ) -> Result<ConversationHandle, ProviderError> {
        let body = json!({ "items": items.iter().map(wire_item).collect::<Vec<_>>() });
        let value = self.post("conversations", &body).await?;
        let conversation: ConversationBody =
            serde_json::from_value(value).map_err(|e| ProviderError::Decode(e.to_string()))?;
        Ok(ConversationHandle::new(conversation.id))
    }

    async fn create_completion(
        &self,
        model: &str,
        conversation: &ConversationHandle,
        input: &[InputItem],
        tools: Option<&[Value]>,
    ) -> Result<Completion, ProviderError> {
        let request = ResponseRequest {
            model,
            conversation: conversation.as_str(),
            input: input.iter().map(wire_item).collect(),
            tools,
        };
        let value = self.post("responses", &request).await?;
        parse_completion(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============== Wire Format Tests ==============

    #[test]
    fn test_function_call_output_wire_shape() {
        let item = InputItem::FunctionCallOutput {
            call_id: "call_1".to_string(),
            output: "No players found.".to_string(),
        };
        assert_eq!(
            wire_item(&item),
            json!({"type": "function_call_output", "call_id": "call_1", "output": "No players found."})
        );
        assert_eq!(
            wire_item(&InputItem::user("hi")),
            json!({"role": "user", "content": "hi"})
        );
    }

    #[test]
    fn test_request_omits_tools_on_second_round() {
        let request = ResponseRequest {
            model: "gpt-4o",
            conversation: "conv_1",
            input: vec![wire_item(&InputItem::user("hi"))],
            tools: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("tools").is_none());
        assert_eq!(value["conversation"], "conv_1");
    }

    #[test]
    fn test_parse_text_answer() {
        let completion = parse_completion(json!({
            "id": "resp_1",
            "output": [{
                "type": "message",
                "role": "assistant",
                "content": [
                    {"type": "output_text", "text": "Welcome, "},
                    {"type": "output_text", "text": "team."}
                ]
            }]
        }))
        .unwrap();
        assert_eq!(completion.output_text, "Welcome, team.");
        assert_eq!(completion.function_calls().count(), 0);
    }

    #[test]
    fn test_parse_function_calls() {
        let completion = parse_completion(json!({
            "output": [
                {"type": "reasoning", "summary": []},
                {
                    "type": "function_call",
                    "name": "get_all_players",
                    "arguments": "{}",
                    "call_id": "call_abc"
                }
            ]
        }))
        .unwrap();

        assert!(completion.output_text.is_empty());
        let calls: Vec<_> = completion.function_calls().collect();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "get_all_players");
        assert_eq!(calls[0].call_id, "call_abc");
    }

    #[test]
    fn test_malformed_body_is_decode_error() {
        let result = parse_completion(json!({"output": "nope"}));
        assert!(matches!(result, Err(ProviderError::Decode(_))));
    }

    #[test]
    fn test_error_preview_is_bounded() {
        let long = "x".repeat(2_000);
        assert!(preview(&long).chars().count() <= ERROR_BODY_PREVIEW + 3);
        assert_eq!(preview("short"), "short");
    }
}
