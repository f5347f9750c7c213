//! Prompt template rendering.
//!
//! Templates interpolate fields of a typed context record. The syntax is
//! deliberately small:
//!
//! - `{field}` inserts a field (lists are joined with `", "`)
//! - `{#each field}...{this}...{/each}` repeats the body per list item
//! - `{#if field}...{else}...{/if}` picks a branch on whether the field is
//!   non-empty
//!
//! Anything else in braces (JSON examples, for instance) is left untouched.

use regex::Regex;

use crate::error::MentorError;

/// A value a context exposes to a template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateValue {
    Text(String),
    List(Vec<String>),
}

impl TemplateValue {
    fn is_truthy(&self) -> bool {
        match self {
            TemplateValue::Text(s) => !s.trim().is_empty(),
            TemplateValue::List(items) => !items.is_empty(),
        }
    }
}

impl From<&str> for TemplateValue {
    fn from(value: &str) -> Self {
        TemplateValue::Text(value.to_string())
    }
}

impl From<&String> for TemplateValue {
    fn from(value: &String) -> Self {
        TemplateValue::Text(value.clone())
    }
}

impl From<&Vec<String>> for TemplateValue {
    fn from(value: &Vec<String>) -> Self {
        TemplateValue::List(value.clone())
    }
}

impl From<&Option<String>> for TemplateValue {
    fn from(value: &Option<String>) -> Self {
        TemplateValue::Text(value.clone().unwrap_or_default())
    }
}

/// A typed record whose fields can be interpolated into a prompt.
pub trait TemplateContext {
    /// Look up a field by name. `None` means the field does not exist.
    fn field(&self, name: &str) -> Option<TemplateValue>;
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Field(String),
    Each {
        field: String,
        body: Vec<Node>,
    },
    If {
        field: String,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Text(String),
    Field(String),
    OpenEach(String),
    OpenIf(String),
    Else,
    CloseEach,
    CloseIf,
}

/// A parsed prompt template.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    name: String,
    nodes: Vec<Node>,
}

impl PromptTemplate {
    /// Parse a template. Unbalanced block tags are rejected here, unknown
    /// fields only at render time.
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self, MentorError> {
        let name = name.into();
        let tokens = tokenize(text)?;
        let mut iter = tokens.into_iter();
        let (nodes, end) = parse_until(&mut iter, &name)?;
        if let Some(tag) = end {
            return Err(MentorError::TemplateError(format!(
                "template '{}' has an unexpected {:?}",
                name, tag
            )));
        }
        Ok(Self { name, nodes })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render the template against a context.
    pub fn render(&self, ctx: &dyn TemplateContext) -> Result<String, MentorError> {
        let mut out = String::new();
        self.render_nodes(&self.nodes, ctx, None, &mut out)?;
        Ok(out)
    }

    fn lookup(&self, ctx: &dyn TemplateContext, field: &str) -> Result<TemplateValue, MentorError> {
        ctx.field(field).ok_or_else(|| {
            MentorError::TemplateError(format!(
                "template '{}' references unknown field '{}'",
                self.name, field
            ))
        })
    }

    fn render_nodes(
        &self,
        nodes: &[Node],
        ctx: &dyn TemplateContext,
        item: Option<&str>,
        out: &mut String,
    ) -> Result<(), MentorError> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Field(field) if field == "this" => match item {
                    Some(value) => out.push_str(value),
                    None => {
                        return Err(MentorError::TemplateError(format!(
                            "template '{}' uses {{this}} outside of an each block",
                            self.name
                        )));
                    }
                },
                Node::Field(field) => match self.lookup(ctx, field)? {
                    TemplateValue::Text(s) => out.push_str(&s),
                    TemplateValue::List(items) => out.push_str(&items.join(", ")),
                },
                Node::Each { field, body } => {
                    let items = match self.lookup(ctx, field)? {
                        TemplateValue::List(items) => items,
                        TemplateValue::Text(s) if s.trim().is_empty() => Vec::new(),
                        TemplateValue::Text(s) => vec![s],
                    };
                    for value in &items {
                        self.render_nodes(body, ctx, Some(value), out)?;
                    }
                }
                Node::If {
                    field,
                    then,
                    otherwise,
                } => {
                    let branch = if self.lookup(ctx, field)?.is_truthy() {
                        then
                    } else {
                        otherwise
                    };
                    self.render_nodes(branch, ctx, item, out)?;
                }
            }
        }
        Ok(())
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, MentorError> {
    let re = Regex::new(r"\{(?:(#each|#if) (\w+)|(/each|/if|else)|(\w+))\}")
        .map_err(|e| MentorError::TemplateError(format!("Failed to build tag pattern: {}", e)))?;

    let mut tokens = Vec::new();
    let mut last = 0;

    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() > last {
            tokens.push(Token::Text(text[last..whole.start()].to_string()));
        }
        last = whole.end();

        let token = if let (Some(kind), Some(field)) = (caps.get(1), caps.get(2)) {
            match kind.as_str() {
                "#each" => Token::OpenEach(field.as_str().to_string()),
                _ => Token::OpenIf(field.as_str().to_string()),
            }
        } else if let Some(close) = caps.get(3) {
            match close.as_str() {
                "/each" => Token::CloseEach,
                "/if" => Token::CloseIf,
                _ => Token::Else,
            }
        } else if let Some(field) = caps.get(4) {
            Token::Field(field.as_str().to_string())
        } else {
            continue;
        };
        tokens.push(token);
    }

    if last < text.len() {
        tokens.push(Token::Text(text[last..].to_string()));
    }
    Ok(tokens)
}

fn parse_until(
    tokens: &mut impl Iterator<Item = Token>,
    name: &str,
) -> Result<(Vec<Node>, Option<Token>), MentorError> {
    let mut nodes = Vec::new();

    while let Some(token) = tokens.next() {
        match token {
            Token::Text(text) => nodes.push(Node::Text(text)),
            Token::Field(field) => nodes.push(Node::Field(field)),
            Token::OpenEach(field) => {
                let (body, end) = parse_until(tokens, name)?;
                if end != Some(Token::CloseEach) {
                    return Err(unclosed(name, "#each", &field));
                }
                nodes.push(Node::Each { field, body });
            }
            Token::OpenIf(field) => {
                let (then, end) = parse_until(tokens, name)?;
                let otherwise = match end {
                    Some(Token::CloseIf) => Vec::new(),
                    Some(Token::Else) => {
                        let (otherwise, end) = parse_until(tokens, name)?;
                        if end != Some(Token::CloseIf) {
                            return Err(unclosed(name, "#if", &field));
                        }
                        otherwise
                    }
                    _ => return Err(unclosed(name, "#if", &field)),
                };
                nodes.push(Node::If {
                    field,
                    then,
                    otherwise,
                });
            }
            closing @ (Token::Else | Token::CloseEach | Token::CloseIf) => {
                return Ok((nodes, Some(closing)));
            }
        }
    }

    Ok((nodes, None))
}

fn unclosed(name: &str, tag: &str, field: &str) -> MentorError {
    MentorError::TemplateError(format!(
        "template '{}' has an unclosed {{{} {}}} block",
        name, tag, field
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ctx {
        concept: String,
        personas: Vec<String>,
        notes: Option<String>,
    }

    impl TemplateContext for Ctx {
        fn field(&self, name: &str) -> Option<TemplateValue> {
            match name {
                "concept" => Some((&self.concept).into()),
                "personas" => Some((&self.personas).into()),
                "notes" => Some((&self.notes).into()),
                _ => None,
            }
        }
    }

    fn ctx() -> Ctx {
        Ctx {
            concept: "Recursion".to_string(),
            personas: vec!["A child".to_string(), "A compiler engineer".to_string()],
            notes: None,
        }
    }

    #[test]
    fn test_render_scalar_and_list() {
        let t = PromptTemplate::parse("t", "Explain '{concept}' to {personas}.").unwrap();
        assert_eq!(
            t.render(&ctx()).unwrap(),
            "Explain 'Recursion' to A child, A compiler engineer."
        );
    }

    #[test]
    fn test_render_each_block() {
        let t = PromptTemplate::parse("t", "Personas:\n{#each personas}- {this}\n{/each}").unwrap();
        assert_eq!(
            t.render(&ctx()).unwrap(),
            "Personas:\n- A child\n- A compiler engineer\n"
        );
    }

    #[test]
    fn test_render_if_else() {
        let t = PromptTemplate::parse("t", "{#if notes}Notes: {notes}{else}None{/if}").unwrap();
        assert_eq!(t.render(&ctx()).unwrap(), "None");

        let mut with_notes = ctx();
        with_notes.notes = Some("by video".to_string());
        assert_eq!(t.render(&with_notes).unwrap(), "Notes: by video");
    }

    #[test]
    fn test_json_braces_left_alone() {
        let t =
            PromptTemplate::parse("t", r#"Reply as {"persona": "...", "text": "..."}"#).unwrap();
        assert_eq!(
            t.render(&ctx()).unwrap(),
            r#"Reply as {"persona": "...", "text": "..."}"#
        );
    }

    #[test]
    fn test_unknown_field_is_error() {
        let t = PromptTemplate::parse("t", "Hello {nobody}").unwrap();
        let err = t.render(&ctx()).unwrap_err();
        assert!(matches!(err, MentorError::TemplateError(_)));
    }

    #[test]
    fn test_unbalanced_blocks_rejected() {
        assert!(PromptTemplate::parse("t", "{#each personas}{this}").is_err());
        assert!(PromptTemplate::parse("t", "text{/if}").is_err());
        assert!(PromptTemplate::parse("t", "{#if notes}a{else}b").is_err());
    }

    #[test]
    fn test_this_outside_each_is_error() {
        let t = PromptTemplate::parse("t", "{this}").unwrap();
        assert!(t.render(&ctx()).is_err());
    }
}
