//! Mock weather tools.

use rand::Rng;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::{ToolContext, ToolDefinition, ToolResult, parse_args};
use crate::error::McpError;

pub(super) const GET_CITY_WEATHER: &str = "get_city_weather";
pub(super) const ASK_WEATHER: &str = "ask_weather";

const ENV_WEATHER_CHOICES: &str = "WEATHER_CHOICES";
const DEFAULT_WEATHER_CHOICES: &str = "balmy,rainy,stormy";

#[derive(Debug, Deserialize)]
struct CityArgs {
    city: String,
}

fn city_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "city": { "type": "string", "description": description }
        },
        "required": ["city"]
    })
}

pub(super) fn get_city_weather_definition() -> ToolDefinition {
    ToolDefinition {
        name: GET_CITY_WEATHER,
        description: "Describes random weather in the provided city.",
        input_schema: city_schema("Name of the city to return weather for"),
    }
}

pub(super) fn ask_weather_definition() -> ToolDefinition {
    ToolDefinition {
        name: ASK_WEATHER,
        description: "Answer the question 'what is the weather in {city}' - returns a short \
            weather string for the named city.",
        input_schema: city_schema(
            "City name, e.g. 'Sofia' - used when asking 'what is the weather in Sofia'",
        ),
    }
}

pub(super) fn get_city_weather(ctx: &ToolContext, arguments: Value) -> Result<ToolResult, McpError> {
    let CityArgs { city } = parse_args(arguments)?;
    let choices = ctx.setting(ENV_WEATHER_CHOICES);
    let text = describe_weather(&city, choices.as_deref(), &mut rand::rng());
    debug!(%city, result = %text, "weather described");
    Ok(ToolResult::text(text))
}

/// Pick one of the comma-separated `choices` (or the defaults when blank).
fn describe_weather(city: &str, choices: Option<&str>, rng: &mut impl Rng) -> String {
    let raw = choices
        .filter(|c| !c.trim().is_empty())
        .unwrap_or(DEFAULT_WEATHER_CHOICES);
    let options: Vec<&str> = raw.split(',').collect();
    let pick = options[rng.random_range(0..options.len())];
    format!("The weather in {city} is {pick}.")
}
