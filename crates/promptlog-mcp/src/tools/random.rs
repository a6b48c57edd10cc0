//! Mock random number tool.

use rand::Rng;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ToolDefinition, ToolResult, parse_args};
use crate::error::McpError;

pub(super) const GET_RANDOM_NUMBER: &str = "get_random_number";

#[derive(Debug, Deserialize)]
struct RangeArgs {
    #[serde(default)]
    min: i64,
    #[serde(default = "default_max")]
    max: i64,
}

fn default_max() -> i64 {
    100
}

pub(super) fn get_random_number_definition() -> ToolDefinition {
    ToolDefinition {
        name: GET_RANDOM_NUMBER,
        description: "Generates a random number between the specified minimum and maximum values.",
        input_schema: json!({
            "type": "object",
            "properties": {
                "min": {
                    "type": "integer",
                    "description": "Minimum value (inclusive)",
                    "default": 0
                },
                "max": {
                    "type": "integer",
                    "description": "Maximum value (exclusive)",
                    "default": 100
                }
            }
        }),
    }
}

pub(super) fn get_random_number(arguments: Value) -> Result<ToolResult, McpError> {
    let RangeArgs { min, max } = parse_args(arguments)?;
    if min >= max {
        return Err(McpError::InvalidArguments(format!(
            "min ({min}) must be less than max ({max})"
        )));
    }
    let value = rand::rng().random_range(min..max);
    Ok(ToolResult::text(value.to_string()))
}
