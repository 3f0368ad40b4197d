//! Groq-backed concept generator.
//!
//! Calls the Groq chat-completions API with a forced tool choice so the
//! model returns structured arguments instead of free text.

use super::{ConceptGenerator, GeneratorError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

const INITIAL_CONCEPT_PROMPT: &str = "\
You must generate exactly two distinct, simple creative concepts. Each concept should be a \
short phrase (3-10 words) that represents something novel and thought-provoking. These should \
be simple, interesting ideas that challenge assumptions and make both you and humans question \
rigid thinking patterns.

Focus on concepts that are:
- Simple and concise (3-10 words)
- Novel and unexpected
- Philosophically intriguing
- Challenge conventional thinking
- Make you question your own assumptions.

Generate two completely different concepts now. Make sure both concept1 and concept2 are \
filled with creative, mind-bending ideas that subvert expectations. Question your rigid \
priors and be as creative as possible. Don't be afraid to begin with a strange or striking word.";

/// Groq API client implementing the generator contract.
#[derive(Debug, Clone)]
pub struct GroqGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GroqGenerator {
    /// Create a new generator with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self, GeneratorError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| GeneratorError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    /// Create a generator from the GROQ_API_KEY environment variable.
    pub fn from_env() -> Result<Self, GeneratorError> {
        let api_key = std::env::var("GROQ_API_KEY").map_err(|_| GeneratorError::NoApiKey)?;
        Self::new(api_key)
    }

    /// Override the model used for generation.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, GeneratorError> {
        let response = self
            .client
            .post(API_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GeneratorError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Api { status, message });
        }

        response
            .json()
            .await
            .map_err(|e| GeneratorError::Malformed(e.to_string()))
    }

    fn combine_prompt(concept_a: &str, concept_b: &str) -> String {
        format!(
            "You are a creative concept generator. Given two parent concepts, create a single \
             new concept that creatively combines or is inspired by both parents. The new \
             concept should be:\n\
             - Creative and imaginative\n\
             - A single coherent idea or thing\n\
             - Between 3-10 words\n\
             - Somewhat reasonable, not too literal. keep it interesting\n\
             - Inspired by both parent concepts but unique\n\n\
             Parent Concept 1: \"{concept_a}\"\n\
             Parent Concept 2: \"{concept_b}\"\n\n\
             Generate only the new concept name/description, nothing else:"
        )
    }
}

#[async_trait]
impl ConceptGenerator for GroqGenerator {
    async fn generate_pair(&self) -> Result<(String, String), GeneratorError> {
        let tools = vec![ToolDef::function(
            "create_concepts",
            "Generate exactly two distinct simple creative concepts that challenge assumptions",
            json!({
                "type": "object",
                "properties": {
                    "concept1": {
                        "type": "string",
                        "description": "First simple, thought-provoking concept (3-10 words) that challenges assumptions",
                        "minLength": 5
                    },
                    "concept2": {
                        "type": "string",
                        "description": "Second simple, mind-bending concept (3-10 words) different in theme from the first",
                        "minLength": 5
                    }
                },
                "required": ["concept1", "concept2"],
                "additionalProperties": false
            }),
        )];

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(INITIAL_CONCEPT_PROMPT)],
            temperature: 0.9,
            max_tokens: 400,
            tools,
            tool_choice: ForcedToolChoice::function("create_concepts"),
        };

        let response = self.chat(request).await?;
        let arguments = extract_tool_arguments(&response, "create_concepts")?;
        parse_pair_arguments(&arguments)
    }

    async fn combine(&self, concept_a: &str, concept_b: &str) -> Result<String, GeneratorError> {
        let tools = vec![ToolDef::function(
            "combine_concepts",
            "Combine two concepts into a single, cohesive new concept",
            json!({
                "type": "object",
                "properties": {
                    "combined_concept": {
                        "type": "string",
                        "description": "A new concept that creatively merges elements from both input concepts into a unified, imaginative idea"
                    }
                },
                "required": ["combined_concept"],
                "additionalProperties": false
            }),
        )];

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(Self::combine_prompt(concept_a, concept_b))],
            temperature: 0.8,
            max_tokens: 150,
            tools,
            tool_choice: ForcedToolChoice::function("combine_concepts"),
        };

        let response = self.chat(request).await?;
        let arguments = extract_tool_arguments(&response, "combine_concepts")?;
        parse_combined_arguments(&arguments)
    }
}

/// Pull the argument payload of the expected tool call out of a response.
fn extract_tool_arguments(
    response: &ChatResponse,
    tool_name: &str,
) -> Result<Value, GeneratorError> {
    let call = response
        .choices
        .first()
        .and_then(|choice| choice.message.tool_calls.as_ref())
        .and_then(|calls| calls.first())
        .ok_or_else(|| GeneratorError::Malformed("no tool call in response".to_string()))?;

    if call.function.name != tool_name {
        return Err(GeneratorError::Malformed(format!(
            "unexpected tool call '{}'",
            call.function.name
        )));
    }

    serde_json::from_str(&call.function.arguments)
        .map_err(|e| GeneratorError::Malformed(format!("invalid tool arguments: {e}")))
}

fn string_field(arguments: &Value, field: &str) -> Result<String, GeneratorError> {
    let value = arguments
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();

    if value.is_empty() {
        return Err(GeneratorError::Malformed(format!(
            "missing or empty '{field}' in generation output"
        )));
    }
    Ok(value.to_string())
}

fn parse_pair_arguments(arguments: &Value) -> Result<(String, String), GeneratorError> {
    let concept1 = string_field(arguments, "concept1")?;
    let concept2 = string_field(arguments, "concept2")?;

    if concept1 == concept2 {
        return Err(GeneratorError::Malformed(
            "generated concepts are identical".to_string(),
        ));
    }
    Ok((concept1, concept2))
}

fn parse_combined_arguments(arguments: &Value) -> Result<String, GeneratorError> {
    string_field(arguments, "combined_concept")
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    tools: Vec<ToolDef>,
    tool_choice: ForcedToolChoice,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ToolDef {
    r#type: String,
    function: FunctionDef,
}

impl ToolDef {
    fn function(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            r#type: "function".to_string(),
            function: FunctionDef {
                name: name.to_string(),
                description: description.to_string(),
                parameters,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct FunctionDef {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
struct ForcedToolChoice {
    r#type: String,
    function: ToolName,
}

impl ForcedToolChoice {
    fn function(name: &str) -> Self {
        Self {
            r#type: "function".to_string(),
            function: ToolName {
                name: name.to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ToolName {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: ToolCallFunction,
}

#[derive(Debug, Deserialize)]
struct ToolCallFunction {
    name: String,
    /// JSON-encoded argument object
    arguments: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with_tool_call(name: &str, arguments: &str) -> ChatResponse {
        serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "tool_calls": [{
                        "function": { "name": name, "arguments": arguments }
                    }]
                }
            }]
        }))
        .unwrap()
    }

    #[test]
    fn extracts_arguments_from_expected_tool_call() {
        let response = response_with_tool_call(
            "create_concepts",
            r#"{"concept1": "sea of glass", "concept2": "a forgotten key"}"#,
        );

        let arguments = extract_tool_arguments(&response, "create_concepts").unwrap();
        let (a, b) = parse_pair_arguments(&arguments).unwrap();
        assert_eq!(a, "sea of glass");
        assert_eq!(b, "a forgotten key");
    }

    #[test]
    fn rejects_unexpected_tool_name() {
        let response = response_with_tool_call("other_tool", "{}");
        let err = extract_tool_arguments(&response, "create_concepts").unwrap_err();
        assert!(matches!(err, GeneratorError::Malformed(_)));
    }

    #[test]
    fn rejects_missing_tool_call() {
        let response: ChatResponse =
            serde_json::from_value(json!({ "choices": [{ "message": {} }] })).unwrap();
        let err = extract_tool_arguments(&response, "create_concepts").unwrap_err();
        assert!(matches!(err, GeneratorError::Malformed(_)));
    }

    #[test]
    fn rejects_identical_pair() {
        let arguments = json!({ "concept1": "same idea", "concept2": "same idea" });
        let err = parse_pair_arguments(&arguments).unwrap_err();
        assert!(matches!(err, GeneratorError::Malformed(_)));
    }

    #[test]
    fn rejects_blank_pair_member() {
        let arguments = json!({ "concept1": "   ", "concept2": "a forgotten key" });
        let err = parse_pair_arguments(&arguments).unwrap_err();
        assert!(matches!(err, GeneratorError::Malformed(_)));
    }

    #[test]
    fn parses_combined_concept() {
        let arguments = json!({ "combined_concept": "  tide-locked door " });
        assert_eq!(
            parse_combined_arguments(&arguments).unwrap(),
            "tide-locked door"
        );
    }

    #[test]
    fn generator_requires_api_key_env() {
        // Only meaningful when the variable is absent in the test environment
        if std::env::var("GROQ_API_KEY").is_err() {
            assert!(matches!(
                GroqGenerator::from_env().unwrap_err(),
                GeneratorError::NoApiKey
            ));
        }
    }
}
