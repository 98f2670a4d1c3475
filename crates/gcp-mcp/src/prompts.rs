// crates/gcp-mcp/src/prompts.rs
// ============================================================================
// Module: Prompts
// Description: Static prompt templates exposed through `prompts/*`.
// Purpose: Offer canned GCP help and error-analysis prompts to clients.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Prompts are rendered from a fixed table. Each template declares its
//! arguments; rendering fails when a required argument is missing or is not a
//! string.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::tools::ToolError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Prompt argument declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptArgument {
    /// Argument name.
    pub name: &'static str,
    /// Argument description.
    pub description: &'static str,
    /// Whether the argument must be supplied.
    pub required: bool,
}

/// Prompt listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptDefinition {
    /// Prompt name.
    pub name: &'static str,
    /// Prompt description.
    pub description: &'static str,
    /// Declared arguments.
    pub arguments: Vec<PromptArgument>,
}

/// Rendered prompt returned by `prompts/get`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedPrompt {
    /// Prompt description.
    pub description: &'static str,
    /// Messages to seed the conversation with.
    pub messages: Vec<PromptMessage>,
}

/// Single prompt message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessage {
    /// Message role.
    pub role: &'static str,
    /// Message content.
    pub content: PromptContent,
}

/// Prompt message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PromptContent {
    /// Plain text.
    Text {
        /// Text body.
        text: String,
    },
}

/// Template row: name, description, the single argument, and renderer.
struct PromptTemplate {
    /// Prompt name.
    name: &'static str,
    /// Prompt description.
    description: &'static str,
    /// Required argument name.
    argument: &'static str,
    /// Argument description.
    argument_description: &'static str,
    /// Renders the prompt body from the argument value.
    render: fn(&str) -> String,
}

// ============================================================================
// SECTION: Templates
// ============================================================================

/// Registered prompt templates.
const PROMPT_TEMPLATES: [PromptTemplate; 2] = [
    PromptTemplate {
        name: "gcp_service_help",
        description: "Get help with using a GCP service",
        argument: "service_name",
        argument_description: "GCP service to get help with, such as Cloud Storage",
        render: render_service_help,
    },
    PromptTemplate {
        name: "error_analysis",
        description: "Analyze a GCP error message",
        argument: "error_message",
        argument_description: "Error message returned by a GCP API",
        render: render_error_analysis,
    },
];

/// Renders the service help prompt.
fn render_service_help(service_name: &str) -> String {
    format!(
        "I need help with using {service_name} in Google Cloud Platform.\n\nPlease help me \
         understand:\n1. Common operations and best practices\n2. Required parameters and \
         configuration\n3. Security considerations\n4. Recommended patterns for {service_name}"
    )
}

/// Renders the error analysis prompt.
fn render_error_analysis(error_message: &str) -> String {
    format!(
        "I received this error from GCP:\n{error_message}\n\nPlease help me:\n1. Understand what \
         caused this error\n2. Find potential solutions\n3. Prevent similar errors in the future"
    )
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Lists the registered prompts.
#[must_use]
pub fn list_prompts() -> Vec<PromptDefinition> {
    PROMPT_TEMPLATES
        .iter()
        .map(|template| PromptDefinition {
            name: template.name,
            description: template.description,
            arguments: vec![PromptArgument {
                name: template.argument,
                description: template.argument_description,
                required: true,
            }],
        })
        .collect()
}

/// Renders the named prompt.
///
/// # Errors
///
/// Returns [`ToolError::UnknownPrompt`] for unregistered names and
/// [`ToolError::InvalidParams`] when the argument is missing or not a string.
pub fn get_prompt(name: &str, arguments: &Map<String, Value>) -> Result<RenderedPrompt, ToolError> {
    let template = PROMPT_TEMPLATES
        .iter()
        .find(|template| template.name == name)
        .ok_or_else(|| ToolError::UnknownPrompt(name.to_string()))?;
    let value = arguments
        .get(template.argument)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            ToolError::InvalidParams(format!("prompt {name} requires string argument {}", template.argument))
        })?;
    Ok(RenderedPrompt {
        description: template.description,
        messages: vec![PromptMessage {
            role: "user",
            content: PromptContent::Text {
                text: (template.render)(value),
            },
        }],
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
