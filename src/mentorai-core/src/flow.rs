//! Schema-validated prompt flows.
//!
//! A [`Flow`] renders its template from a typed input, sends the prompt to a
//! [`GenerativeModel`] and parses the reply into a typed output. Replies that
//! do not parse or fail validation surface as
//! [`MentorError::InvalidResponse`].

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::MentorError;
use crate::model::GenerativeModel;
use crate::template::{PromptTemplate, TemplateContext};

/// Structural checks applied after a reply has been decoded.
pub trait Validate {
    /// Returns the reason the value is unusable, if it is.
    fn validate(&self) -> Result<(), String>;
}

/// A type a flow can produce from raw model text.
pub trait FlowOutput: Sized {
    fn from_response(flow: &str, raw: &str) -> Result<Self, MentorError>;
}

impl FlowOutput for String {
    fn from_response(flow: &str, raw: &str) -> Result<Self, MentorError> {
        let text = sanitize_response(raw);
        if text.is_empty() {
            return Err(MentorError::invalid_response(flow, "empty text"));
        }
        Ok(text)
    }
}

impl<T: DeserializeOwned + Validate> FlowOutput for Vec<T> {
    fn from_response(flow: &str, raw: &str) -> Result<Self, MentorError> {
        let items: Vec<T> = decode_json(flow, raw)?;
        if items.is_empty() {
            return Err(MentorError::invalid_response(flow, "empty list"));
        }
        for (i, item) in items.iter().enumerate() {
            item.validate().map_err(|reason| {
                MentorError::invalid_response(flow, format!("item {}: {}", i, reason))
            })?;
        }
        Ok(items)
    }
}

/// Decode and validate a JSON object reply.
pub fn parse_json_output<T: DeserializeOwned + Validate>(
    flow: &str,
    raw: &str,
) -> Result<T, MentorError> {
    let value: T = decode_json(flow, raw)?;
    value
        .validate()
        .map_err(|reason| MentorError::invalid_response(flow, reason))?;
    Ok(value)
}

/// Implements [`FlowOutput`] for JSON object outputs.
#[macro_export]
macro_rules! json_flow_output {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::flow::FlowOutput for $ty {
                fn from_response(
                    flow: &str,
                    raw: &str,
                ) -> Result<Self, $crate::error::MentorError> {
                    $crate::flow::parse_json_output(flow, raw)
                }
            }
        )+
    };
}

fn decode_json<T: DeserializeOwned>(flow: &str, raw: &str) -> Result<T, MentorError> {
    let cleaned = strip_reasoning(raw);
    let mut first_error = None;

    for start in json_starts(&cleaned) {
        let mut values = serde_json::Deserializer::from_str(&cleaned[start..]).into_iter::<T>();
        match values.next() {
            Some(Ok(value)) => return Ok(value),
            Some(Err(e)) => {
                first_error.get_or_insert_with(|| e.to_string());
            }
            None => {}
        }
    }

    Err(MentorError::invalid_response(
        flow,
        first_error.unwrap_or_else(|| "no JSON value in reply".to_string()),
    ))
}

/// Byte offsets where a JSON object or array could begin.
fn json_starts(text: &str) -> impl Iterator<Item = usize> + '_ {
    text.char_indices()
        .filter(|(_, c)| matches!(c, '{' | '['))
        .map(|(i, _)| i)
}

/// Locate the first complete JSON object or array in a reply. Code fences,
/// chatter and brackets in the surrounding prose are skipped.
pub fn extract_json(raw: &str) -> Option<&str> {
    json_starts(raw).find_map(|start| {
        let mut values =
            serde_json::Deserializer::from_str(&raw[start..]).into_iter::<serde_json::Value>();
        match values.next() {
            Some(Ok(_)) => Some(&raw[start..start + values.byte_offset()]),
            _ => None,
        }
    })
}

/// A named prompt template bound to its input and output types.
pub struct Flow<I, O> {
    template: PromptTemplate,
    max_tokens: u32,
    _types: PhantomData<fn(&I) -> O>,
}

impl<I: TemplateContext, O: FlowOutput> Flow<I, O> {
    pub fn new(template: PromptTemplate, max_tokens: u32) -> Self {
        Self {
            template,
            max_tokens,
            _types: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        self.template.name()
    }

    /// Render the prompt for `input` without calling the model.
    pub fn render(&self, input: &I) -> Result<String, MentorError> {
        self.template.render(input)
    }

    /// Render, generate and parse.
    pub async fn invoke(&self, model: &dyn GenerativeModel, input: &I) -> Result<O, MentorError> {
        let prompt = self.render(input)?;
        debug!(flow = self.name(), prompt_chars = prompt.len(), "Invoking flow");

        let raw = model.generate(&prompt, self.max_tokens).await?;
        O::from_response(self.name(), &raw)
    }
}

const REASONING_TAGS: [&str; 15] = [
    "thinking",
    "think",
    "reflection",
    "reflect",
    "internal",
    "reasoning",
    "thought",
    "scratch",
    "scratchpad",
    "plan",
    "analysis",
    "analyze",
    "consider",
    "pondering",
    "deliberation",
];

/// Remove reasoning blocks such as `<thinking>...</thinking>` with their content.
pub fn strip_reasoning(response: &str) -> String {
    let mut result = response.to_string();

    for tag in &REASONING_TAGS {
        let pattern = format!(r"(?is)<{tag}(?:\s[^>]*)?>.*?</{tag}>", tag = tag);
        if let Ok(re) = regex::Regex::new(&pattern) {
            result = re.replace_all(&result, "").to_string();
        }
    }

    result
}

/// Turn a free-text reply into display text: reasoning blocks and stray
/// reasoning tags removed, markdown emphasis unwrapped, whitespace collapsed.
/// Other angle brackets and asterisks are content (`Vec<T>`, `a*b`).
pub fn sanitize_response(response: &str) -> String {
    let mut result = strip_reasoning(response);

    let orphan = format!(r"(?i)</?(?:{})(?:\s[^>]*)?>", REASONING_TAGS.join("|"));
    let rules = [
        (orphan.as_str(), ""),
        (r"\B\*\*([^\s*](?:[^\n]*?[^\s*])?)\*\*\B", "$1"),
        (r"\B\*([^\s*](?:[^*\n]*?[^\s*])?)\*\B", "$1"),
        (r"\s+", " "),
    ];
    for (pattern, replacement) in rules {
        if let Ok(re) = regex::Regex::new(pattern) {
            result = re.replace_all(&result, replacement).to_string();
        }
    }

    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::sync::Mutex;

    use crate::template::TemplateValue;

    #[test]
    fn test_sanitize_response_thinking_tags() {
        let input = "<thinking>Let me think about this...</thinking>The answer is 42.";
        assert_eq!(sanitize_response(input), "The answer is 42.");
    }

    #[test]
    fn test_sanitize_response_multiline_tags() {
        let input = "<thinking>\nMultiple\nlines\nof\nthought\n</thinking>Final answer here.";
        assert_eq!(sanitize_response(input), "Final answer here.");
    }

    #[test]
    fn test_sanitize_response_nested_content() {
        let input = "Start <think>nested <inner>tags</inner> content</think> end";
        let output = sanitize_response(input);
        assert!(!output.contains('<'));
        assert!(!output.contains('>'));
    }

    #[test]
    fn test_sanitize_response_emphasis_and_whitespace() {
        let input = "A **bold**   claim\n\nwith  gaps.";
        assert_eq!(sanitize_response(input), "A bold claim with gaps.");
    }

    #[test]
    fn test_sanitize_response_keeps_code_and_math() {
        assert_eq!(sanitize_response("Use Vec<T> and a*b here."), "Use Vec<T> and a*b here.");
        assert_eq!(
            sanitize_response("if x < y and a<b then c>d"),
            "if x < y and a<b then c>d"
        );
        assert_eq!(sanitize_response("2 * 3 * 4 = 24"), "2 * 3 * 4 = 24");
    }

    #[test]
    fn test_sanitize_response_orphan_reasoning_tag() {
        assert_eq!(sanitize_response("<thinking>The answer is *42*."), "The answer is 42.");
        assert_eq!(sanitize_response("Done.</reasoning>"), "Done.");
    }

    #[test]
    fn test_extract_json_from_fenced_reply() {
        let raw = "Sure! Here you go:\n```json\n{\"keyNotes\": [\"a\", \"b\"]}\n```\nEnjoy.";
        assert_eq!(extract_json(raw), Some("{\"keyNotes\": [\"a\", \"b\"]}"));
    }

    #[test]
    fn test_extract_json_array() {
        let raw = "[{\"persona\": \"A\", \"text\": \"x\"}]";
        assert_eq!(extract_json(raw), Some(raw));
        assert_eq!(extract_json("no json at all"), None);
    }

    #[test]
    fn test_extract_json_skips_brackets_in_prose() {
        let raw =
            "Here is the script on [Recursion]:\n[{\"persona\": \"X\", \"text\": \"real x\"}]";
        assert_eq!(
            extract_json(raw),
            Some("[{\"persona\": \"X\", \"text\": \"real x\"}]")
        );

        let raw = "Sure [see below]:\n{\"keyNotes\": [\"a\"]}";
        assert_eq!(extract_json(raw), Some("{\"keyNotes\": [\"a\"]}"));
    }

    #[test]
    fn test_extract_json_ignores_trailing_brackets() {
        let raw = "{\"keyNotes\": [\"a\"]}\nSee [1] and {2} for more.";
        assert_eq!(extract_json(raw), Some("{\"keyNotes\": [\"a\"]}"));
        assert_eq!(extract_json("only [prose] here"), None);
    }

    #[derive(Debug, Deserialize)]
    struct Notes {
        notes: Vec<String>,
    }

    impl Validate for Notes {
        fn validate(&self) -> Result<(), String> {
            if self.notes.is_empty() {
                Err("notes is empty".to_string())
            } else {
                Ok(())
            }
        }
    }

    json_flow_output!(Notes);

    struct Topic(&'static str);

    impl TemplateContext for Topic {
        fn field(&self, name: &str) -> Option<TemplateValue> {
            (name == "topic").then(|| self.0.into())
        }
    }

    struct CannedModel {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl GenerativeModel for CannedModel {
        async fn generate(&self, prompt: &str, _max_tokens: u32) -> Result<String, MentorError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    fn canned(reply: &str) -> CannedModel {
        CannedModel {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn notes_flow() -> Flow<Topic, Notes> {
        Flow::new(PromptTemplate::parse("notes", "Notes on {topic}").unwrap(), 100)
    }

    #[tokio::test]
    async fn test_flow_renders_and_parses() {
        let model = canned("<think>hmm</think>{\"notes\": [\"one\", \"two\"]}");
        let out = notes_flow().invoke(&model, &Topic("Rust")).await.unwrap();

        assert_eq!(out.notes, vec!["one", "two"]);
        assert_eq!(model.prompts.lock().unwrap().as_slice(), &["Notes on Rust"]);
    }

    #[tokio::test]
    async fn test_flow_decodes_around_bracketed_chatter() {
        let model = canned("Notes on [Rust]:\n```json\n{\"notes\": [\"one\"]}\n```\n(see [docs])");
        let out = notes_flow().invoke(&model, &Topic("Rust")).await.unwrap();
        assert_eq!(out.notes, vec!["one"]);
    }

    #[tokio::test]
    async fn test_flow_rejects_invalid_output() {
        let err = notes_flow()
            .invoke(&canned("{\"notes\": []}"), &Topic("Rust"))
            .await
            .unwrap_err();
        assert!(matches!(err, MentorError::InvalidResponse { ref flow, .. } if flow == "notes"));

        let err = notes_flow()
            .invoke(&canned("I'd rather not."), &Topic("Rust"))
            .await
            .unwrap_err();
        assert!(matches!(err, MentorError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_text_flow_sanitizes() {
        let flow: Flow<Topic, String> =
            Flow::new(PromptTemplate::parse("explain", "Explain {topic}").unwrap(), 100);
        let out = flow.invoke(&canned("  *Ownership*  matters. "), &Topic("Rust")).await.unwrap();
        assert_eq!(out, "Ownership matters.");

        let err = flow.invoke(&canned("<thinking>only this</thinking>"), &Topic("Rust")).await;
        assert!(err.is_err());
    }
}
