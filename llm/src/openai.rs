//! [`GenerationCapability`] over an OpenAI-compatible chat-completions API.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::capability::{GenerationCapability, TextStream};
use crate::config::LlmConfig;
use crate::error::{LlmError, Result};
use crate::tool::{ToolChoice, ToolSchema};

const TOOL_SYSTEM_PROMPT: &str = "You are a helpful assistant that decides which tool to use \
based on the user's question. Respond with only the tool call.";

const CONTEXT_SYSTEM_PROMPT: &str = "You are a direct Q&A assistant. Answer the user's question \
based only on the provided context. If the context contains code, commands or steps, present \
them directly as the answer. Do not invent answers or apologize if the context isn't perfect.";

const GENERAL_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Answer the user's question to the best of your ability.";

const RELEVANCE_SYSTEM_PROMPT: &str = "You are a relevance-checking assistant. Your only job is \
to determine if the provided context can help answer the user's question. Respond with only \
'yes' or 'no' in lowercase.";

const KEYWORD_SYSTEM_PROMPT: &str =
    "You are an expert in keyword extraction. You only respond with a JSON list of strings.";

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat client.
pub struct OpenAiChat {
    config: LlmConfig,
    client: reqwest::Client,
}

impl OpenAiChat {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Whether an API key is present.
    pub fn is_available(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn messages(system: &str, user: &str) -> Value {
        json!([
            {"role": "system", "content": system},
            {"role": "user", "content": user},
        ])
    }

    async fn post(&self, mut body: Value) -> Result<reqwest::Response> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(LlmError::NotConfigured)?;
        body["model"] = Value::String(self.config.model.clone());

        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiRequest(format!("{status}: {error_text}")));
        }
        Ok(response)
    }

    async fn complete(&self, body: Value) -> Result<ResponseMessage> {
        let response: ChatResponse = self.post(body).await?.json().await?;
        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| LlmError::InvalidResponse("no choices in response".to_string()))
    }

    async fn stream(&self, system: &str, user: &str) -> Result<TextStream> {
        let response = self
            .post(json!({
                "messages": Self::messages(system, user),
                "stream": true,
            }))
            .await?;

        let fragments = response
            .bytes_stream()
            .eventsource()
            .take_while(|event| {
                let done = matches!(event, Ok(event) if event.data.trim() == "[DONE]");
                futures::future::ready(!done)
            })
            .filter_map(|event| {
                futures::future::ready(match event {
                    Ok(event) => match serde_json::from_str::<StreamChunk>(&event.data) {
                        Ok(chunk) => chunk
                            .choices
                            .into_iter()
                            .next()
                            .and_then(|choice| choice.delta.content)
                            .filter(|content| !content.is_empty())
                            .map(Ok),
                        Err(e) => Some(Err(LlmError::Stream(format!("bad chunk: {e}")))),
                    },
                    Err(e) => Some(Err(LlmError::Stream(e.to_string()))),
                })
            });

        Ok(fragments.boxed())
    }
}

/// Keywords from a JSON reply: a bare list, or the first list-valued field
/// of an object. Non-string and blank entries are dropped.
pub fn parse_keywords(content: &str, max_count: usize) -> Result<Vec<String>> {
    let value: Value = serde_json::from_str(content)?;
    let list = match value {
        Value::Array(items) => items,
        Value::Object(fields) => fields
            .into_iter()
            .find_map(|(_, v)| match v {
                Value::Array(items) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    Ok(list
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .take(max_count)
        .collect())
}

#[async_trait]
impl GenerationCapability for OpenAiChat {
    async fn decide_tool(&self, query: &str, tools: &[ToolSchema]) -> Result<ToolChoice> {
        let tools: Vec<Value> = tools.iter().map(ToolSchema::to_openai).collect();
        let message = self
            .complete(json!({
                "messages": Self::messages(TOOL_SYSTEM_PROMPT, query),
                "tools": tools,
                "tool_choice": "auto",
            }))
            .await?;

        let choice = match message.tool_calls.into_iter().next() {
            Some(call) => ToolChoice::from_call(&call.function.name, &call.function.arguments),
            None => ToolChoice::NoTool,
        };
        debug!("Tool decision: {choice:?}");
        Ok(choice)
    }

    async fn generate_with_context(&self, query: &str, context: &str) -> Result<TextStream> {
        info!("Generating answer with {} bytes of context", context.len());
        let prompt = format!(
            "Based on the following context, please answer the user's question.\n\
             Context:\n---\n{context}\n---\nQuestion: {query}\n"
        );
        self.stream(CONTEXT_SYSTEM_PROMPT, &prompt).await
    }

    async fn generate_without_context(&self, query: &str) -> Result<TextStream> {
        info!("Generating answer without context");
        self.stream(GENERAL_SYSTEM_PROMPT, query).await
    }

    async fn validate_relevance(&self, query: &str, context: &str) -> Result<bool> {
        let prompt = format!(
            "User Question: \"{query}\"\n\nContext:\n---\n{context}\n---\n\n\
             Is the provided Context relevant to the User Question and can it be used to \
             answer the question?\nAnswer with only \"yes\" or \"no\"."
        );
        let message = self
            .complete(json!({
                "messages": Self::messages(RELEVANCE_SYSTEM_PROMPT, &prompt),
                "max_tokens": 5,
                "temperature": 0,
            }))
            .await?;

        let answer = message.content.unwrap_or_default().trim().to_lowercase();
        debug!("Relevance validation replied {answer:?}");
        Ok(answer.contains("yes"))
    }

    async fn extract_keywords(&self, query: &str, max_count: usize) -> Result<Vec<String>> {
        let prompt = format!(
            "From the following user question, extract the most relevant keywords for a \
             database search. Return the keywords as a JSON list of strings. For example, for \
             the question \"How do I renew my K3S certificate?\", the output should be \
             [\"K3S\", \"certificate\", \"renew\"]. Do not return more than {max_count} \
             keywords.\n\nQuestion: \"{query}\""
        );
        let message = self
            .complete(json!({
                "messages": Self::messages(KEYWORD_SYSTEM_PROMPT, &prompt),
                "response_format": {"type": "json_object"},
            }))
            .await?;

        let content = message
            .content
            .ok_or_else(|| LlmError::InvalidResponse("empty keyword reply".to_string()))?;
        let keywords = parse_keywords(&content, max_count)?;
        debug!("Extracted keywords {keywords:?}");
        Ok(keywords)
    }
}
