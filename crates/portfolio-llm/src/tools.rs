//! Tool definitions advertised to the model

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A callable tool: name, description and JSON Schema for its arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// JSON Schema fragments for tool arguments
pub mod schema {
    use serde_json::{Value, json};

    /// Object schema with the given properties
    ///
    /// ```
    /// use portfolio_llm::tools::schema;
    /// use serde_json::json;
    ///
    /// let s = schema::object(json!({ "limit": schema::integer("Maximum rows") }), &[]);
    /// assert_eq!(s["type"], "object");
    /// ```
    pub fn object(properties: Value, required: &[&str]) -> Value {
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Object schema with no arguments
    pub fn empty() -> Value {
        object(json!({}), &[])
    }

    pub fn string(description: &str) -> Value {
        json!({ "type": "string", "description": description })
    }

    /// String restricted to a fixed set of values
    pub fn string_enum(description: &str, values: &[&str]) -> Value {
        json!({ "type": "string", "description": description, "enum": values })
    }

    pub fn integer(description: &str) -> Value {
        json!({ "type": "integer", "description": description })
    }

    pub fn number(description: &str) -> Value {
        json!({ "type": "number", "description": description })
    }
}
