use chumsky::Parser;

use super::lexer::{MarkupToken, RawAttribute, lexer};
use super::{Span, Spanned, TemplateError};

pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS
        .iter()
        .any(|void| void.eq_ignore_ascii_case(tag))
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkupAttribute {
    pub name: String,
    /// Raw value, character references not yet decoded.
    pub value: Option<String>,
    pub value_span: Span,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkupElement {
    pub name: String,
    pub attributes: Vec<MarkupAttribute>,
    pub children: Vec<MarkupNode>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkupNode {
    Element(MarkupElement),
    Text { content: String, span: Span },
    /// Content of `<script>`/`<style>`: no entities, no interpolation.
    RawText { content: String, span: Span },
}

/// Lexes `source` and assembles the element tree. Comments and doctypes are
/// dropped; void elements never take children.
pub fn parse_markup(source: &str) -> Result<Vec<MarkupNode>, Vec<TemplateError>> {
    let (tokens, errors) = lexer().parse(source).into_output_errors();
    if !errors.is_empty() {
        return Err(errors.iter().map(TemplateError::from_parse_error).collect());
    }
    let Some(tokens) = tokens else {
        return Err(vec![TemplateError::new(
            Span::from(0..source.len()),
            "markup could not be read",
        )]);
    };
    build(tokens)
}

fn build(tokens: Vec<Spanned<MarkupToken<'_>>>) -> Result<Vec<MarkupNode>, Vec<TemplateError>> {
    let mut roots = Vec::new();
    let mut open: Vec<MarkupElement> = Vec::new();

    for Spanned { node, span } in tokens {
        match node {
            MarkupToken::Comment(_) | MarkupToken::Doctype(_) => {}
            MarkupToken::Text(text) => push_child(
                &mut open,
                &mut roots,
                MarkupNode::Text {
                    content: text.to_owned(),
                    span,
                },
            ),
            MarkupToken::OpenTag {
                name,
                attributes,
                self_closing,
            } => {
                let element = MarkupElement {
                    name: name.to_owned(),
                    attributes: attributes.into_iter().map(attribute).collect(),
                    children: Vec::new(),
                    span,
                };
                if self_closing || is_void(name) {
                    push_child(&mut open, &mut roots, MarkupNode::Element(element));
                } else {
                    open.push(element);
                }
            }
            MarkupToken::RawTextElement {
                name,
                attributes,
                content: (content, content_span),
            } => {
                let mut children = Vec::new();
                if !content.is_empty() {
                    children.push(MarkupNode::RawText {
                        content: content.to_owned(),
                        span: content_span,
                    });
                }
                let element = MarkupElement {
                    name: name.to_owned(),
                    attributes: attributes.into_iter().map(attribute).collect(),
                    children,
                    span,
                };
                push_child(&mut open, &mut roots, MarkupNode::Element(element));
            }
            MarkupToken::CloseTag(name) if is_void(name) => {}
            MarkupToken::CloseTag(name) => match open.pop() {
                Some(mut element) if element.name.eq_ignore_ascii_case(name) => {
                    element.span = Span::from(element.span.start..span.end);
                    push_child(&mut open, &mut roots, MarkupNode::Element(element));
                }
                Some(element) => {
                    return Err(vec![TemplateError {
                        span,
                        message: format!("expected </{}>, found </{name}>", element.name),
                        label: format!("<{}> is still open here", element.name),
                    }]);
                }
                None => {
                    return Err(vec![TemplateError::new(
                        span,
                        format!("unexpected </{name}>, no element is open"),
                    )]);
                }
            },
        }
    }

    match open.pop() {
        Some(element) => Err(vec![TemplateError::new(
            element.span,
            format!("<{}> is never closed", element.name),
        )]),
        None => Ok(roots),
    }
}

fn push_child(open: &mut [MarkupElement], roots: &mut Vec<MarkupNode>, node: MarkupNode) {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

fn attribute(raw: RawAttribute<'_>) -> MarkupAttribute {
    let (value, value_span) = match raw.value {
        Some((value, span)) => (Some(value.to_owned()), span),
        None => (None, raw.span),
    };
    MarkupAttribute {
        name: raw.name.to_owned(),
        value,
        value_span,
        span: raw.span,
    }
}
