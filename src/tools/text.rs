//! Text analysis tool.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::mcp::handler::{get_optional_string_arg, ToolHandler};
use crate::mcp::protocol::Tool;

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "amazing", "wonderful", "fantastic", "love", "like", "happy",
    "joy",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad",
    "terrible",
    "awful",
    "hate",
    "dislike",
    "sad",
    "angry",
    "disappointed",
    "frustrated",
];

/// Text pattern analysis and string operations.
pub struct TextAnalyzerTool;

impl TextAnalyzerTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextAnalyzerTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for TextAnalyzerTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "text_analyzer".to_string(),
            description: "Text pattern analysis, regex, and string operations".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "operation": {
                        "type": "string",
                        "description": "Operation: analyze, regex, sentiment, transform"
                    },
                    "text": {
                        "type": "string",
                        "description": "Text to analyze"
                    },
                    "pattern": {
                        "type": "string",
                        "description": "Regex pattern"
                    },
                    "transform": {
                        "type": "string",
                        "description": "Transform: upper, lower, reverse, count"
                    }
                },
                "required": ["operation", "text"]
            }),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<String> {
        let operation = get_optional_string_arg(&args, "operation")
            .unwrap_or_default()
            .to_lowercase();
        let text = get_optional_string_arg(&args, "text").unwrap_or_default();

        match operation.as_str() {
            "analyze" => Ok(analyze(&text)),
            "regex" => {
                let pattern = get_optional_string_arg(&args, "pattern").unwrap_or_default();
                regex_matches(&text, &pattern)
            }
            "sentiment" => Ok(sentiment(&text)),
            "transform" => {
                let transform = get_optional_string_arg(&args, "transform")
                    .unwrap_or_default()
                    .to_lowercase();
                Ok(apply_transform(&text, &transform))
            }
            _ => Ok("Available operations: analyze, regex, transform, sentiment".to_string()),
        }
    }
}

fn analyze(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let chars = text.chars().count();
    let lines = text.split('\n').count();
    let avg = if words.is_empty() {
        0.0
    } else {
        words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / words.len() as f64
    };

    format!(
        "Text Analysis:\nCharacters: {}\nWords: {}\nLines: {}\nAvg word length: {:.1}",
        chars,
        words.len(),
        lines,
        avg
    )
}

fn regex_matches(text: &str, pattern: &str) -> Result<String> {
    let re = Regex::new(pattern)
        .map_err(|e| Error::InvalidToolArguments(format!("invalid pattern: {}", e)))?;
    let found: Vec<&str> = re.find_iter(text).map(|m| m.as_str()).collect();

    Ok(format!(
        "Regex matches for '{}':\nFound {} matches\n{}",
        pattern,
        found.len(),
        found.join("\n")
    ))
}

fn sentiment(text: &str) -> String {
    let lower = text.to_lowercase();
    let positive = POSITIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();
    let negative = NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();

    let overall = match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => "Positive",
        std::cmp::Ordering::Less => "Negative",
        std::cmp::Ordering::Equal => "Neutral",
    };

    format!(
        "Sentiment Analysis:\nPositive words: {}\nNegative words: {}\nOverall: {}",
        positive, negative, overall
    )
}

fn apply_transform(text: &str, transform: &str) -> String {
    match transform {
        "upper" => text.to_uppercase(),
        "lower" => text.to_lowercase(),
        "reverse" => text.chars().rev().collect(),
        "count" => format!("Character count: {}", text.chars().count()),
        _ => "Available transforms: upper, lower, reverse, count".to_string(),
    }
}
