use serde_json::Value as JsonValue;
use std::borrow::Cow;
use std::fmt::Write;
use std::rc::Rc;

use super::entities::{decode_entities, escape_attribute, escape_text};
use super::expression::{Argument, Call, Expression, parse_call, parse_expression};
use super::report::{TemplateError, mount_error};
use super::tree::{MarkupAttribute, MarkupElement, MarkupNode, is_void, parse_markup};
use super::Span;
use crate::protocol::{EventDescriptor, FormState, MountError, RawEvent};

/// Methods a schema may call from its listeners.
pub const METHOD_TABLE: &[&str] = &["onclick", "oninput"];

/// Tags that declare a lazily loaded region.
pub const LAZY_LOADER_TAGS: &[&str] = &["lazy-loader", "bran-lazy-loader"];

#[derive(Debug, Clone, PartialEq)]
pub enum EventArgument {
    /// `$event`.
    DomEvent,
    /// The current value of a state key, sent as a bare primitive.
    State(String),
    Literal(RawEvent),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MethodCall {
    /// `onclick(eventFuncId, event)`.
    Click {
        descriptor: EventDescriptor,
        event: EventArgument,
    },
    /// `oninput(eventFuncId | null, fieldName | null, event)`.
    Input {
        descriptor: Option<EventDescriptor>,
        field: Option<String>,
        event: EventArgument,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Listener {
    /// DOM event name with modifiers stripped, e.g. `click`.
    pub event: String,
    pub call: MethodCall,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Static(Option<String>),
    Bound(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewAttribute {
    pub name: String,
    pub value: AttributeValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewElement {
    pub tag: String,
    pub attributes: Vec<ViewAttribute>,
    pub listeners: Vec<Listener>,
    pub children: Vec<ViewNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LazyRegion {
    pub loader: EventDescriptor,
    pub visible: Expression,
    /// Portal name other responses can address this region by.
    pub name: Option<String>,
    pub on_loaded: Option<MethodCall>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextPart {
    Literal(String),
    Interpolation(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewNode {
    Element(ViewElement),
    Text(Vec<TextPart>),
    /// Script or style content, emitted as is.
    RawText(String),
    LazyRegion(LazyRegion),
}

/// A mountable component: the markup it was synthesized from plus its render
/// tree with listeners resolved against `METHOD_TABLE`.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    markup: Rc<str>,
    nodes: Vec<ViewNode>,
}

impl Component {
    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn nodes(&self) -> &[ViewNode] {
        &self.nodes
    }

    /// Deterministic HTML for the given state. Lazy regions render as empty
    /// placeholders while visible.
    pub fn render_html(&self, state: &FormState) -> String {
        let mut html = String::new();
        for node in &self.nodes {
            render_node(node, state, &mut html);
        }
        html
    }
}

pub fn synthesize(markup: &str) -> Result<Component, MountError> {
    let tree = parse_markup(markup).map_err(|errors| mount_error(&errors, markup))?;
    let mut synthesizer = Synthesizer::default();
    let nodes = synthesizer.nodes(&tree);
    if !synthesizer.errors.is_empty() {
        return Err(mount_error(&synthesizer.errors, markup));
    }
    Ok(Component {
        markup: Rc::from(markup),
        nodes,
    })
}

/// Parses a single method call such as `onclick({"id":"x"})`, as sent in a
/// portal update's `afterLoaded`.
pub fn parse_method_call(source: &str) -> Result<MethodCall, MountError> {
    let span = Span::from(0..source.len());
    let attribute = MarkupAttribute {
        name: "afterLoaded".to_owned(),
        value: Some(source.to_owned()),
        value_span: span,
        span,
    };
    let mut synthesizer = Synthesizer::default();
    match synthesizer.listener_call(&attribute) {
        Some(call) if synthesizer.errors.is_empty() => Ok(call),
        _ => Err(mount_error(&synthesizer.errors, source)),
    }
}

#[derive(Default)]
struct Synthesizer {
    errors: Vec<TemplateError>,
}

impl Synthesizer {
    fn error(&mut self, span: Span, message: impl Into<String>) {
        self.errors.push(TemplateError::new(span, message));
    }

    fn nodes(&mut self, nodes: &[MarkupNode]) -> Vec<ViewNode> {
        nodes.iter().filter_map(|node| self.node(node)).collect()
    }

    fn node(&mut self, node: &MarkupNode) -> Option<ViewNode> {
        match node {
            MarkupNode::Text { content, span } => {
                let parts = self.text(content, *span);
                (!parts.is_empty()).then_some(ViewNode::Text(parts))
            }
            MarkupNode::RawText { content, .. } => Some(ViewNode::RawText(content.clone())),
            MarkupNode::Element(element)
                if LAZY_LOADER_TAGS
                    .iter()
                    .any(|tag| tag.eq_ignore_ascii_case(&element.name)) =>
            {
                self.lazy_region(element).map(ViewNode::LazyRegion)
            }
            MarkupNode::Element(element) => Some(ViewNode::Element(self.element(element))),
        }
    }

    fn text(&mut self, content: &str, span: Span) -> Vec<TextPart> {
        let mut parts = Vec::new();
        let mut rest = content;
        let mut offset = span.start;
        while !rest.is_empty() {
            let Some(open) = rest.find("{{") else {
                parts.push(TextPart::Literal(decode_entities(rest).into_owned()));
                break;
            };
            let Some(close) = rest[open + 2..].find("}}") else {
                self.error(
                    Span::from(offset + open..span.end),
                    "interpolation is missing its closing `}}`",
                );
                break;
            };
            if open > 0 {
                parts.push(TextPart::Literal(decode_entities(&rest[..open]).into_owned()));
            }
            let consumed = open + 2 + close + 2;
            let source = decode_entities(&rest[open + 2..open + 2 + close]);
            match parse_expression(&source) {
                Ok(expression) => parts.push(TextPart::Interpolation(expression)),
                Err(reason) => self.error(
                    Span::from(offset + open..offset + consumed),
                    format!("invalid expression `{}`: {reason}", source.trim()),
                ),
            }
            rest = &rest[consumed..];
            offset += consumed;
        }
        parts
    }

    fn element(&mut self, element: &MarkupElement) -> ViewElement {
        let mut view = ViewElement {
            tag: element.name.clone(),
            attributes: Vec::new(),
            listeners: Vec::new(),
            children: self.nodes(&element.children),
        };
        for attribute in &element.attributes {
            let name = attribute.name.as_str();
            if let Some(event) = name.strip_prefix('@').or_else(|| name.strip_prefix("v-on:")) {
                let event = event.split_once('.').map_or(event, |(event, _)| event);
                if let Some(call) = self.listener_call(attribute) {
                    view.listeners.push(Listener {
                        event: event.to_owned(),
                        call,
                    });
                }
            } else if let Some(bound) = name.strip_prefix(':').or_else(|| name.strip_prefix("v-bind:")) {
                if let Some(expression) = self.bound_expression(attribute) {
                    view.attributes.push(ViewAttribute {
                        name: bound.to_owned(),
                        value: AttributeValue::Bound(expression),
                    });
                }
            } else if name != "v-cloak" {
                view.attributes.push(ViewAttribute {
                    name: name.to_owned(),
                    value: AttributeValue::Static(
                        attribute
                            .value
                            .as_deref()
                            .map(|value| decode_entities(value).into_owned()),
                    ),
                });
            }
        }
        view
    }

    fn lazy_region(&mut self, element: &MarkupElement) -> Option<LazyRegion> {
        let mut loader = None;
        let mut loader_declared = false;
        let mut visible = Expression::Literal(JsonValue::Bool(true));
        let mut name = None;
        let mut on_loaded = None;

        for attribute in &element.attributes {
            match attribute.name.as_str() {
                ":loader-func" | "v-bind:loader-func" | "loader-func" => {
                    loader_declared = true;
                    loader = self
                        .bound_expression(attribute)
                        .and_then(|expression| self.descriptor(expression, attribute.value_span));
                }
                ":visible" | "v-bind:visible" => {
                    if let Some(expression) = self.bound_expression(attribute) {
                        visible = expression;
                    }
                }
                "name" => {
                    name = attribute
                        .value
                        .as_deref()
                        .map(|value| decode_entities(value).into_owned());
                }
                "@loaded" | "v-on:loaded" => on_loaded = self.listener_call(attribute),
                _ => {}
            }
        }

        let Some(loader) = loader else {
            if !loader_declared {
                self.error(element.span, format!("<{}> needs a `:loader-func`", element.name));
            }
            return None;
        };
        Some(LazyRegion {
            loader,
            visible,
            name,
            on_loaded,
        })
    }

    fn attribute_source<'a>(&mut self, attribute: &'a MarkupAttribute) -> Option<Cow<'a, str>> {
        match &attribute.value {
            Some(value) => Some(decode_entities(value)),
            None => {
                self.error(attribute.span, format!("`{}` needs a value", attribute.name));
                None
            }
        }
    }

    fn bound_expression(&mut self, attribute: &MarkupAttribute) -> Option<Expression> {
        let source = self.attribute_source(attribute)?;
        match parse_expression(&source) {
            Ok(expression) => Some(expression),
            Err(reason) => {
                self.error(
                    attribute.value_span,
                    format!("invalid expression `{}`: {reason}", source.trim()),
                );
                None
            }
        }
    }

    fn listener_call(&mut self, attribute: &MarkupAttribute) -> Option<MethodCall> {
        let source = self.attribute_source(attribute)?;
        let span = attribute.value_span;
        let Call { method, arguments } = match parse_call(&source) {
            Ok(call) => call,
            Err(reason) => {
                self.error(span, format!("invalid handler `{}`: {reason}", source.trim()));
                return None;
            }
        };
        match (method.as_str(), arguments.as_slice()) {
            ("onclick", [descriptor]) => Some(MethodCall::Click {
                descriptor: self.descriptor_argument(descriptor, span)?,
                event: EventArgument::Literal(RawEvent::Opaque),
            }),
            ("onclick", [descriptor, event]) => Some(MethodCall::Click {
                descriptor: self.descriptor_argument(descriptor, span)?,
                event: event_argument(event),
            }),
            ("oninput", [descriptor, field]) | ("oninput", [descriptor, field, _]) => {
                let event = match arguments.get(2) {
                    Some(event) => event_argument(event),
                    None => EventArgument::Literal(RawEvent::Opaque),
                };
                let descriptor = match descriptor {
                    Argument::Expression(Expression::Literal(JsonValue::Null)) => None,
                    other => Some(self.descriptor_argument(other, span)?),
                };
                let field = match field {
                    Argument::Expression(Expression::Literal(JsonValue::Null)) => None,
                    Argument::Expression(Expression::Literal(JsonValue::String(field))) => {
                        Some(field.clone())
                    }
                    _ => {
                        self.error(span, "oninput field name must be a string or null");
                        return None;
                    }
                };
                Some(MethodCall::Input {
                    descriptor,
                    field,
                    event,
                })
            }
            ("onclick", _) => {
                self.error(span, "onclick expects (eventFuncId, event)");
                None
            }
            ("oninput", _) => {
                self.error(span, "oninput expects (eventFuncId, fieldName, event)");
                None
            }
            (other, _) => {
                self.error(
                    span,
                    format!("unknown method `{other}`, expected one of: {}", METHOD_TABLE.join(", ")),
                );
                None
            }
        }
    }

    fn descriptor_argument(&mut self, argument: &Argument, span: Span) -> Option<EventDescriptor> {
        match argument {
            Argument::Expression(expression) => self.descriptor(expression.clone(), span),
            Argument::Event => {
                self.error(span, "`$event` cannot be used as an event function id");
                None
            }
        }
    }

    fn descriptor(&mut self, expression: Expression, span: Span) -> Option<EventDescriptor> {
        let Expression::Literal(literal) = expression else {
            self.error(span, "event function id must be a literal object");
            return None;
        };
        match serde_json::from_value(literal) {
            Ok(descriptor) => Some(descriptor),
            Err(error) => {
                self.error(span, format!("invalid event function id: {error}"));
                None
            }
        }
    }
}

fn event_argument(argument: &Argument) -> EventArgument {
    match argument {
        Argument::Event => EventArgument::DomEvent,
        Argument::Expression(Expression::State(key)) => EventArgument::State(key.clone()),
        Argument::Expression(Expression::Literal(literal)) => {
            EventArgument::Literal(RawEvent::from_json(literal))
        }
    }
}

/// Text form of an evaluated expression.
pub(crate) fn display_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(text) => text.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(flag) => *flag,
        JsonValue::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        JsonValue::String(text) => !text.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

/// `None` drops the attribute, `Some(None)` renders it without a value.
pub(crate) fn attribute_text(value: &JsonValue) -> Option<Option<String>> {
    match value {
        JsonValue::Null | JsonValue::Bool(false) => None,
        JsonValue::Bool(true) => Some(None),
        other => Some(Some(display_value(other))),
    }
}

fn render_node(node: &ViewNode, state: &FormState, html: &mut String) {
    match node {
        ViewNode::Text(parts) => {
            for part in parts {
                match part {
                    TextPart::Literal(text) => html.push_str(&escape_text(text)),
                    TextPart::Interpolation(expression) => {
                        html.push_str(&escape_text(&display_value(&expression.evaluate(state))))
                    }
                }
            }
        }
        ViewNode::RawText(content) => html.push_str(content),
        ViewNode::Element(element) => {
            let _ = write!(html, "<{}", element.tag);
            for attribute in &element.attributes {
                let value = match &attribute.value {
                    AttributeValue::Static(value) => Some(value.clone()),
                    AttributeValue::Bound(expression) => attribute_text(&expression.evaluate(state)),
                };
                match value {
                    Some(Some(value)) => {
                        let _ = write!(html, " {}=\"{}\"", attribute.name, escape_attribute(&value));
                    }
                    Some(None) => {
                        let _ = write!(html, " {}", attribute.name);
                    }
                    None => {}
                }
            }
            html.push('>');
            if is_void(&element.tag) && element.children.is_empty() {
                return;
            }
            for child in &element.children {
                render_node(child, state, html);
            }
            let _ = write!(html, "</{}>", element.tag);
        }
        ViewNode::LazyRegion(region) => {
            if !is_truthy(&region.visible.evaluate(state)) {
                return;
            }
            html.push_str("<div class=\"bran-lazy-loader\"");
            if let Some(name) = &region.name {
                let _ = write!(html, " data-portal=\"{}\"", escape_attribute(name));
            }
            html.push_str("></div>");
        }
    }
}

/// `value`/`checked` bindings of one element, with the value each one last
/// wrote. Rewriting an unchanged property would discard what the user typed.
#[derive(Clone, Debug, Default)]
pub struct PropertyBindings {
    bindings: Vec<(String, Expression, Option<JsonValue>)>,
}

impl PropertyBindings {
    pub fn new(properties: impl IntoIterator<Item = (String, Expression)>) -> Self {
        Self {
            bindings: properties
                .into_iter()
                .map(|(name, expression)| (name, expression, None))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Evaluates every binding and returns the ones whose value differs from
    /// the previous call.
    pub fn changes(&mut self, state: &FormState) -> Vec<(&str, JsonValue)> {
        let mut changes = Vec::new();
        for (name, expression, last) in &mut self.bindings {
            let value = expression.evaluate(state);
            if last.as_ref() != Some(&value) {
                *last = Some(value.clone());
                changes.push((name.as_str(), value));
            }
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTER: &str = r#"<div class="counter">
  <span>Count: {{ states.count }}</span>
  <button v-on:click="onclick({&#34;id&#34;:&#34;inc&#34;,&#34;pushState&#34;:null}, $event)">+</button>
  <input type="text" :value="states.name" @input='oninput(null, "name", $event)'>
</div>"#;

    fn state(entries: &[(&str, &str)]) -> FormState {
        let mut state = FormState::new();
        for (key, value) in entries {
            state.set(*key, *value);
        }
        state
    }

    fn root(component: &Component) -> &ViewElement {
        match &component.nodes()[0] {
            ViewNode::Element(element) => element,
            other => panic!("expected an element, got {other:?}"),
        }
    }

    fn find<'a>(element: &'a ViewElement, tag: &str) -> &'a ViewElement {
        element
            .children
            .iter()
            .find_map(|child| match child {
                ViewNode::Element(child) if child.tag == tag => Some(child),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn resolves_listeners_against_the_method_table() {
        let component = synthesize(COUNTER).unwrap();
        let button = find(root(&component), "button");
        assert_eq!(
            button.listeners,
            [Listener {
                event: "click".to_owned(),
                call: MethodCall::Click {
                    descriptor: EventDescriptor::new("inc"),
                    event: EventArgument::DomEvent,
                },
            }]
        );
        let input = find(root(&component), "input");
        assert_eq!(
            input.listeners[0].call,
            MethodCall::Input {
                descriptor: None,
                field: Some("name".to_owned()),
                event: EventArgument::DomEvent,
            }
        );
    }

    #[test]
    fn renders_deterministic_html() {
        let component = synthesize(COUNTER).unwrap();
        let html = component.render_html(&state(&[("count", "2"), ("name", "<Ann>")]));
        assert_eq!(
            html,
            "<div class=\"counter\">\n  <span>Count: 2</span>\n  <button>+</button>\n  \
             <input type=\"text\" value=\"&lt;Ann&gt;\">\n</div>"
        );
        assert_eq!(html, component.render_html(&state(&[("count", "2"), ("name", "<Ann>")])));
    }

    #[test]
    fn script_content_is_neither_parsed_nor_escaped() {
        let markup = "<div><script>if (a < b) { x = \"{{\" }</script><p>ok</p></div>";
        let component = synthesize(markup).unwrap();
        let script = find(root(&component), "script");
        assert_eq!(
            script.children,
            [ViewNode::RawText("if (a < b) { x = \"{{\" }".to_owned())]
        );
        assert_eq!(component.render_html(&FormState::new()), markup);
    }

    #[test]
    fn single_method_call() {
        assert_eq!(
            parse_method_call(r#"onclick({"id":"refresh"})"#).unwrap(),
            MethodCall::Click {
                descriptor: EventDescriptor::new("refresh"),
                event: EventArgument::Literal(RawEvent::Opaque),
            }
        );
        let error = parse_method_call("alert(1)").unwrap_err();
        assert!(error.message.contains("unknown method `alert`"));
    }

    #[test]
    fn boolean_bindings() {
        let component =
            synthesize(r#"<button :disabled="states.busy" :hidden="false">go</button>"#).unwrap();
        let mut busy = FormState::new();
        busy.set("busy", "yes");
        assert_eq!(component.render_html(&busy), "<button disabled=\"yes\">go</button>");
        assert_eq!(component.render_html(&FormState::new()), "<button>go</button>");
    }

    #[test]
    fn lazy_region() {
        let component = synthesize(
            r#"<lazy-loader name="detail" :visible="states.open" :loader-func='{"id":"loadDetail"}' @loaded='onclick({"id":"seen"})'></lazy-loader>"#,
        )
        .unwrap();
        let ViewNode::LazyRegion(region) = &component.nodes()[0] else {
            panic!("expected a lazy region");
        };
        assert_eq!(region.loader, EventDescriptor::new("loadDetail"));
        assert_eq!(region.name.as_deref(), Some("detail"));
        assert_eq!(region.visible, Expression::State("open".to_owned()));
        assert!(matches!(region.on_loaded, Some(MethodCall::Click { .. })));

        assert_eq!(component.render_html(&FormState::new()), "");
        assert_eq!(
            component.render_html(&state(&[("open", "1")])),
            "<div class=\"bran-lazy-loader\" data-portal=\"detail\"></div>"
        );
    }

    #[test]
    fn unknown_method_is_a_mount_error() {
        let error = synthesize(r#"<a @click="navigate({})">x</a>"#).unwrap_err();
        assert_eq!(
            error.message,
            "unknown method `navigate`, expected one of: onclick, oninput"
        );
        assert!(error.report.contains("schema:1:"));
    }

    #[test]
    fn wrong_arity_and_bad_descriptor() {
        assert_eq!(
            synthesize(r#"<a @click="onclick()">x</a>"#).unwrap_err().message,
            "onclick expects (eventFuncId, event)"
        );
        assert!(
            synthesize(r#"<a @click="onclick($event, $event)">x</a>"#)
                .unwrap_err()
                .message
                .contains("$event")
        );
        assert!(
            synthesize(r#"<a @click='onclick({"id": 3}, $event)'>x</a>"#)
                .unwrap_err()
                .message
                .starts_with("invalid event function id")
        );
    }

    #[test]
    fn literal_and_state_event_arguments() {
        let component = synthesize(
            r#"<i @click='onclick({"id":"page"}, 3)'></i><i @click='onclick({"id":"pick"}, states.choice)'></i>"#,
        )
        .unwrap();
        let events: Vec<_> = component
            .nodes()
            .iter()
            .map(|node| match node {
                ViewNode::Element(element) => match &element.listeners[0].call {
                    MethodCall::Click { event, .. } => event.clone(),
                    other => panic!("unexpected call {other:?}"),
                },
                other => panic!("unexpected node {other:?}"),
            })
            .collect();
        assert_eq!(
            events,
            [
                EventArgument::Literal(RawEvent::number(3.0)),
                EventArgument::State("choice".to_owned()),
            ]
        );
    }

    #[test]
    fn broken_interpolation() {
        let error = synthesize("<p>{{ states. }}</p>").unwrap_err();
        assert!(error.message.starts_with("invalid expression `states.`"), "{}", error.message);
        assert!(synthesize("<p>{{ states.a </p>").is_err());
    }

    #[test]
    fn lazy_loader_without_loader_func() {
        assert_eq!(
            synthesize("<lazy-loader></lazy-loader>").unwrap_err().message,
            "<lazy-loader> needs a `:loader-func`"
        );
    }

    #[test]
    fn property_bindings_report_only_changes() {
        let mut bindings = PropertyBindings::new([
            ("value".to_owned(), Expression::State("a".into())),
            ("checked".to_owned(), Expression::State("b".into())),
        ]);
        let mut form = state(&[("a", "x")]);
        assert_eq!(
            bindings.changes(&form),
            [("value", JsonValue::from("x")), ("checked", JsonValue::Null)]
        );

        form.set("c", "unrelated");
        assert!(bindings.changes(&form).is_empty());

        form.set("b", "on");
        assert_eq!(bindings.changes(&form), [("checked", JsonValue::from("on"))]);
    }
}
