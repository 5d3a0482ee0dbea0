use chumsky::prelude::*;
use std::fmt;

use super::{ParseError, Span, Spanned};

#[derive(Debug, Clone, PartialEq)]
pub struct RawAttribute<'src> {
    pub name: &'src str,
    /// Value without its quotes, with the span of the value itself.
    pub value: Option<(&'src str, Span)>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkupToken<'src> {
    OpenTag {
        name: &'src str,
        attributes: Vec<RawAttribute<'src>>,
        self_closing: bool,
    },
    CloseTag(&'src str),
    /// `<script>`/`<style>` with its content taken verbatim up to the
    /// matching close tag.
    RawTextElement {
        name: &'src str,
        attributes: Vec<RawAttribute<'src>>,
        content: (&'src str, Span),
    },
    Text(&'src str),
    Comment(&'src str),
    Doctype(&'src str),
}

impl fmt::Display for MarkupToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::OpenTag { name, .. } => write!(f, "<{name}>"),
            Self::CloseTag(name) => write!(f, "</{name}>"),
            Self::RawTextElement { name, content, .. } => write!(f, "<{name}>{}</{name}>", content.0),
            Self::Text(text) => write!(f, "{text}"),
            Self::Comment(comment) => write!(f, "<!--{comment}-->"),
            Self::Doctype(doctype) => write!(f, "<!{doctype}>"),
        }
    }
}

pub fn lexer<'src>()
-> impl Parser<'src, &'src str, Vec<Spanned<MarkupToken<'src>>>, extra::Err<ParseError<'src>>> {
    let tag_name = any()
        .filter(|c: &char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
        .repeated()
        .at_least(1)
        .to_slice();

    let attribute_name = none_of(" \t\r\n\x0c/>=\"'<")
        .repeated()
        .at_least(1)
        .to_slice();

    let quoted_value = choice((
        none_of("\"")
            .repeated()
            .to_slice()
            .map_with(|value, extra| (value, extra.span()))
            .delimited_by(just('"'), just('"')),
        none_of("'")
            .repeated()
            .to_slice()
            .map_with(|value, extra| (value, extra.span()))
            .delimited_by(just('\''), just('\'')),
    ));

    let unquoted_value = none_of(" \t\r\n\x0c\"'=<>`")
        .repeated()
        .at_least(1)
        .to_slice()
        .map_with(|value, extra| (value, extra.span()));

    let attribute = attribute_name
        .then(
            just('=')
                .padded()
                .ignore_then(quoted_value.or(unquoted_value))
                .or_not(),
        )
        .map_with(|(name, value), extra| RawAttribute {
            name,
            value,
            span: extra.span(),
        });

    let attributes = text::whitespace()
        .at_least(1)
        .ignore_then(attribute)
        .repeated()
        .collect::<Vec<_>>();

    let raw_text_element = |name: &'static str, close: &'static str| {
        just('<')
            .ignore_then(just(name))
            .then(attributes.clone())
            .then_ignore(text::whitespace())
            .then_ignore(just('>'))
            .then(
                any()
                    .and_is(just(close).not())
                    .repeated()
                    .to_slice()
                    .map_with(|content, extra| (content, extra.span())),
            )
            .then_ignore(just(close))
            .then_ignore(text::whitespace())
            .then_ignore(just('>'))
            .map(|((name, attributes), content)| MarkupToken::RawTextElement {
                name,
                attributes,
                content,
            })
    };
    let raw_text_element = choice((
        raw_text_element("script", "</script"),
        raw_text_element("style", "</style"),
    ));

    let open_tag = just('<')
        .ignore_then(tag_name)
        .then(attributes)
        .then_ignore(text::whitespace())
        .then(just('/').or_not().map(|slash| slash.is_some()))
        .then_ignore(just('>'))
        .map(|((name, attributes), self_closing)| MarkupToken::OpenTag {
            name,
            attributes,
            self_closing,
        });

    let close_tag = just("</")
        .ignore_then(tag_name)
        .then_ignore(text::whitespace())
        .then_ignore(just('>'))
        .map(MarkupToken::CloseTag);

    let comment = just("<!--")
        .ignore_then(any().and_is(just("-->").not()).repeated().to_slice())
        .then_ignore(just("-->"))
        .map(MarkupToken::Comment);

    let doctype = just("<!")
        .ignore_then(none_of(">").repeated().to_slice())
        .then_ignore(just('>'))
        .map(MarkupToken::Doctype);

    let text = none_of("<")
        .repeated()
        .at_least(1)
        .to_slice()
        .map(MarkupToken::Text);

    choice((comment, doctype, close_tag, raw_text_element, open_tag, text))
        .map_with(|node, extra| Spanned {
            node,
            span: extra.span(),
        })
        .repeated()
        .collect()
        .then_ignore(end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<MarkupToken<'_>> {
        lexer()
            .parse(source)
            .into_result()
            .unwrap()
            .into_iter()
            .map(|spanned| spanned.node)
            .collect()
    }

    #[test]
    fn lexes_elements_and_text() {
        assert_eq!(
            tokens("<p class=\"x\">hi</p>"),
            vec![
                MarkupToken::OpenTag {
                    name: "p",
                    attributes: vec![RawAttribute {
                        name: "class",
                        value: Some(("x", Span::from(10..11))),
                        span: Span::from(3..12),
                    }],
                    self_closing: false,
                },
                MarkupToken::Text("hi"),
                MarkupToken::CloseTag("p"),
            ]
        );
    }

    #[test]
    fn lexes_directive_attributes() {
        let tokens = tokens(r#"<input v-on:input='oninput(null, "q", $event)' disabled @click.stop=go />"#);
        let MarkupToken::OpenTag {
            attributes,
            self_closing,
            ..
        } = &tokens[0]
        else {
            panic!("expected an open tag, got {:?}", tokens[0]);
        };
        assert!(*self_closing);
        let names: Vec<_> = attributes.iter().map(|attribute| attribute.name).collect();
        assert_eq!(names, ["v-on:input", "disabled", "@click.stop"]);
        assert_eq!(attributes[0].value.unwrap().0, r#"oninput(null, "q", $event)"#);
        assert_eq!(attributes[1].value, None);
        assert_eq!(attributes[2].value.unwrap().0, "go");
    }

    #[test]
    fn comments_and_doctype() {
        assert_eq!(
            tokens("<!DOCTYPE html><!-- <b>not a tag</b> -->x"),
            vec![
                MarkupToken::Doctype("DOCTYPE html"),
                MarkupToken::Comment(" <b>not a tag</b> "),
                MarkupToken::Text("x"),
            ]
        );
    }

    #[test]
    fn script_and_style_content_is_taken_verbatim() {
        let source = "<script type=\"module\">if (a < b && c > d) {}</script><style>p > a {}</style>";
        let tokens = tokens(source);
        let MarkupToken::RawTextElement {
            name,
            attributes,
            content,
        } = &tokens[0]
        else {
            panic!("expected a raw text element, got {:?}", tokens[0]);
        };
        assert_eq!(*name, "script");
        assert_eq!(attributes[0].name, "type");
        assert_eq!(content.0, "if (a < b && c > d) {}");
        assert_eq!(&source[content.1.into_range()], content.0);
        assert!(matches!(
            tokens[1],
            MarkupToken::RawTextElement {
                name: "style",
                content: ("p > a {}", _),
                ..
            }
        ));
    }

    #[test]
    fn scripts_prefix_is_an_ordinary_tag() {
        assert!(matches!(
            tokens("<scripts>x</scripts>")[0],
            MarkupToken::OpenTag { name: "scripts", .. }
        ));
    }

    #[test]
    fn stray_angle_bracket_is_an_error() {
        assert!(lexer().parse("a < b").into_result().is_err());
    }
}
