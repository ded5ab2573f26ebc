//! The closed set of operations a model may route a question to.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

pub const SEARCH_MEMOS: &str = "search_memos";
pub const GET_LATEST_MEMOS: &str = "get_latest_memos";

/// A tool decision, decoded from the model's structured output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolChoice {
    /// Hybrid search for `query`.
    SearchMemos { query: String, limit: Option<usize> },
    /// Most recently created notes.
    GetLatestMemos { limit: Option<usize> },
    /// The model declined, or chose something unusable.
    NoTool,
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct LatestArgs {
    #[serde(default)]
    limit: Option<usize>,
}

impl ToolChoice {
    /// Decode a function call by name and JSON arguments.
    ///
    /// Unknown names and malformed arguments decode to [`ToolChoice::NoTool`].
    pub fn from_call(name: &str, arguments: &str) -> Self {
        let arguments = if arguments.trim().is_empty() {
            "{}"
        } else {
            arguments
        };

        let decoded = match name {
            SEARCH_MEMOS => serde_json::from_str::<SearchArgs>(arguments)
                .map(|args| Self::SearchMemos {
                    query: args.query,
                    limit: args.limit,
                }),
            GET_LATEST_MEMOS => serde_json::from_str::<LatestArgs>(arguments)
                .map(|args| Self::GetLatestMemos { limit: args.limit }),
            other => {
                warn!("Model chose unknown tool {other}");
                return Self::NoTool;
            }
        };

        decoded.unwrap_or_else(|e| {
            warn!("Could not decode arguments for {name}: {e}");
            Self::NoTool
        })
    }
}

/// A function the model may call, in chat-completions `tools` form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments object.
    pub parameters: serde_json::Value,
}

impl ToolSchema {
    /// `{"type": "function", "function": {...}}`
    pub fn to_openai(&self) -> serde_json::Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

/// Schemas for [`ToolChoice::GetLatestMemos`] and [`ToolChoice::SearchMemos`].
pub fn memo_tools() -> Vec<ToolSchema> {
    vec![
        ToolSchema {
            name: GET_LATEST_MEMOS.to_string(),
            description: "Get the most recent memos by creation time.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "limit": {
                        "type": "integer",
                        "description": "The number of recent memos to retrieve."
                    }
                },
                "required": ["limit"]
            }),
        },
        ToolSchema {
            name: SEARCH_MEMOS.to_string(),
            description: "Search for memos based on a semantic query.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The semantic query to search for."
                    },
                    "limit": {
                        "type": "integer",
                        "description": "The maximum number of memos to return."
                    }
                },
                "required": ["query", "limit"]
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_search() {
        assert_eq!(
            ToolChoice::from_call(SEARCH_MEMOS, r#"{"query": "k3s cert", "limit": 3}"#),
            ToolChoice::SearchMemos {
                query: "k3s cert".to_string(),
                limit: Some(3),
            }
        );
    }

    #[test]
    fn test_decode_latest_without_limit() {
        assert_eq!(
            ToolChoice::from_call(GET_LATEST_MEMOS, ""),
            ToolChoice::GetLatestMemos { limit: None }
        );
    }

    #[test]
    fn test_unknown_or_malformed_is_no_tool() {
        assert_eq!(ToolChoice::from_call("delete_everything", "{}"), ToolChoice::NoTool);
        assert_eq!(ToolChoice::from_call(SEARCH_MEMOS, "{\"limit\": 2}"), ToolChoice::NoTool);
        assert_eq!(ToolChoice::from_call(GET_LATEST_MEMOS, "not json"), ToolChoice::NoTool);
    }

    #[test]
    fn test_schemas_render_as_functions() {
        let tools = memo_tools();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec![GET_LATEST_MEMOS, SEARCH_MEMOS]);

        let rendered = tools[1].to_openai();
        assert_eq!(rendered["type"], "function");
        assert_eq!(rendered["function"]["name"], SEARCH_MEMOS);
    }
}
