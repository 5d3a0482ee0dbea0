//! Markup → render tree.
//!
//! Schemas arrive as markup strings. They are lexed (`lexer`), assembled into
//! an element tree (`tree`) and then synthesized into a `Component` whose
//! listeners are resolved against the fixed method table (`component`).
//! Everything that goes wrong on the way is reported as a `MountError` with an
//! ariadne report pointing into the markup (`report`).

use chumsky::prelude::*;

mod component;
pub use component::{
    AttributeValue, Component, EventArgument, LAZY_LOADER_TAGS, LazyRegion, Listener,
    METHOD_TABLE, MethodCall, PropertyBindings, TextPart, ViewAttribute, ViewElement, ViewNode, parse_method_call,
    synthesize,
};
pub(crate) use component::{attribute_text, display_value, is_truthy};

mod entities;
pub use entities::{decode_entities, escape_attribute, escape_text};

mod expression;
pub use expression::{Argument, Call, Expression, parse_call, parse_expression};

mod lexer;
pub use lexer::{MarkupToken, RawAttribute, lexer};

mod report;
pub use report::{TemplateError, mount_error};

mod tree;
pub use tree::{MarkupAttribute, MarkupElement, MarkupNode, VOID_ELEMENTS, is_void, parse_markup};

pub type Span = SimpleSpan;
pub type ParseError<'src> = Rich<'src, char, Span>;

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub span: Span,
    pub node: T,
}
