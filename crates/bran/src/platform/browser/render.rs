//! Synthesized components → zoon elements.
//!
//! A host renders inside a `display: contents` wrapper whose only child is
//! rebuilt on every install. Interpolations and bound attributes follow the
//! context's state revision, so they pick up store writes without a reload.

use serde_json::Value as JsonValue;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CustomEvent, EventTarget, HtmlElement, HtmlInputElement};
use zoon::*;

use crate::diagnostics::Diagnostics;
use crate::protocol::{DomEvent, FormState, Primitive, RawEvent, TargetState, number_to_string};
use crate::runtime::{LazyLoader, MethodTable, RuntimeContext, TemplateHost};
use crate::template::{
    AttributeValue, Expression, Listener, PropertyBindings, TextPart, ViewElement, ViewNode,
    attribute_text, display_value, is_truthy,
};

pub type WidgetRender = Rc<dyn Fn(&ViewElement, &TemplateHost) -> RawElOrText>;

/// Custom tags rendered by Rust code instead of as plain elements.
#[derive(Clone, Default)]
pub struct WidgetRegistry {
    widgets: HashMap<String, WidgetRender>,
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        mut self,
        tag: &str,
        render: impl Fn(&ViewElement, &TemplateHost) -> RawElOrText + 'static,
    ) -> Self {
        self.widgets.insert(tag.to_ascii_lowercase(), Rc::new(render));
        self
    }

    fn get(&self, tag: &str) -> Option<&WidgetRender> {
        self.widgets.get(&tag.to_ascii_lowercase())
    }
}

pub fn host_view(host: TemplateHost, widgets: Rc<WidgetRegistry>) -> RawElOrText {
    let revision = host.revision().signal();
    RawHtmlEl::new("div")
        .attr("class", "bran-host")
        .style("display", "contents")
        .child_signal(revision.map(move |_| {
            host.current()
                .map(|component| nodes_view(component.nodes(), &host, &widgets))
        }))
        .unify()
}

fn nodes_view(nodes: &[ViewNode], host: &TemplateHost, widgets: &Rc<WidgetRegistry>) -> RawElOrText {
    RawHtmlEl::new("div")
        .style("display", "contents")
        .children(nodes.iter().map(|node| node_view(node, host, widgets)))
        .unify()
}

fn node_view(node: &ViewNode, host: &TemplateHost, widgets: &Rc<WidgetRegistry>) -> RawElOrText {
    match node {
        ViewNode::Text(parts) => text_view(parts, host.context()),
        ViewNode::RawText(content) => Text::new(content.clone()).unify(),
        ViewNode::Element(element) => match widgets.get(&element.tag) {
            Some(render) => render(element, host),
            None => element_view(element, host, widgets),
        },
        ViewNode::LazyRegion(region) => lazy_view(host.lazy_loader(region.clone()), widgets),
    }
}

fn interpolate(parts: &[TextPart], state: &FormState) -> String {
    parts
        .iter()
        .map(|part| match part {
            TextPart::Literal(text) => text.clone(),
            TextPart::Interpolation(expression) => display_value(&expression.evaluate(state)),
        })
        .collect()
}

fn text_view(parts: &[TextPart], context: &RuntimeContext) -> RawElOrText {
    if parts.iter().all(|part| matches!(part, TextPart::Literal(_))) {
        return Text::new(interpolate(parts, &FormState::new())).unify();
    }
    let parts = parts.to_vec();
    let store = context.store().clone();
    Text::with_signal(
        context
            .state_revision()
            .signal()
            .map(move |_| store.with(|state| interpolate(&parts, state))),
    )
    .unify()
}

/// Bound attributes the DOM only honours as properties once the user has
/// interacted with the element.
fn is_property(name: &str) -> bool {
    matches!(name, "value" | "checked")
}

fn element_view(element: &ViewElement, host: &TemplateHost, widgets: &Rc<WidgetRegistry>) -> RawElOrText {
    let context = host.context();
    let mut raw_el = RawHtmlEl::new(element.tag.as_str());
    let mut properties = Vec::new();
    for attribute in &element.attributes {
        match &attribute.value {
            AttributeValue::Static(value) => {
                raw_el = raw_el.attr(attribute.name.as_str(), value.as_deref().unwrap_or_default());
            }
            AttributeValue::Bound(expression) if is_property(&attribute.name) => {
                properties.push((attribute.name.clone(), expression.clone()));
            }
            AttributeValue::Bound(expression) => {
                let expression = expression.clone();
                let store = context.store().clone();
                raw_el = raw_el.attr_signal(
                    attribute.name.clone(),
                    context.state_revision().signal().map(move |_| {
                        store
                            .with(|state| attribute_text(&expression.evaluate(state)))
                            .map(Option::unwrap_or_default)
                    }),
                );
            }
        }
    }
    let raw_el = bind_properties(raw_el, PropertyBindings::new(properties), context);
    let raw_el = attach_listeners(
        raw_el,
        element.listeners.clone(),
        host.methods(),
        context.diagnostics().clone(),
    );
    raw_el
        .children(element.children.iter().map(|child| node_view(child, host, widgets)))
        .unify()
}

fn bind_properties(
    raw_el: RawHtmlEl<HtmlElement>,
    mut properties: PropertyBindings,
    context: &RuntimeContext,
) -> RawHtmlEl<HtmlElement> {
    if properties.is_empty() {
        return raw_el;
    }
    let task = Rc::new(RefCell::new(None::<TaskHandle>));
    let revision = context.state_revision().clone();
    let store = context.store().clone();
    raw_el
        .after_insert({
            let task = task.clone();
            move |dom_element| {
                let updates = revision.signal().for_each(move |_| {
                    store.with(|state| {
                        for (name, value) in properties.changes(state) {
                            let value = match value {
                                JsonValue::Bool(flag) => JsValue::from_bool(flag),
                                other => JsValue::from_str(&display_value(&other)),
                            };
                            let _ = js_sys::Reflect::set(&dom_element, &JsValue::from_str(name), &value);
                        }
                    });
                    async {}
                });
                task.replace(Some(Task::start_droppable(updates)));
            }
        })
        .after_remove(move |_| drop(task))
}

struct DomListener {
    target: EventTarget,
    event: String,
    closure: Closure<dyn FnMut(web_sys::Event)>,
}

impl DomListener {
    fn attach(
        target: &EventTarget,
        event: String,
        callback: impl FnMut(web_sys::Event) + 'static,
    ) -> Result<Self, JsValue> {
        let closure = Closure::<dyn FnMut(web_sys::Event)>::new(callback);
        target.add_event_listener_with_callback(&event, closure.as_ref().unchecked_ref())?;
        Ok(Self {
            target: target.clone(),
            event,
            closure,
        })
    }
}

impl Drop for DomListener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(&self.event, self.closure.as_ref().unchecked_ref());
    }
}

fn attach_listeners(
    raw_el: RawHtmlEl<HtmlElement>,
    listeners: Vec<Listener>,
    methods: MethodTable,
    diagnostics: Diagnostics,
) -> RawHtmlEl<HtmlElement> {
    if listeners.is_empty() {
        return raw_el;
    }
    let attached = Rc::new(RefCell::new(Vec::new()));
    raw_el
        .after_insert({
            let attached = attached.clone();
            move |dom_element| {
                let target: EventTarget = dom_element.into();
                for Listener { event, call } in listeners {
                    let methods = methods.clone();
                    let callback = move |dom_event: web_sys::Event| {
                        methods.call(&call, Some(classify_event(&dom_event)));
                    };
                    match DomListener::attach(&target, event, callback) {
                        Ok(listener) => attached.borrow_mut().push(listener),
                        Err(error) => diagnostics.error(format!("listener not attached: {error:?}")),
                    }
                }
            }
        })
        .after_remove(move |_| drop(attached))
}

/// Reads what the runtime needs from a DOM event: a custom event's primitive
/// `detail`, `checked` of checkbox and radio inputs, the target's `value` when
/// the property exists, a keyboard `key` when there is no target.
pub fn classify_event(event: &web_sys::Event) -> RawEvent {
    let detail = event.dyn_ref::<CustomEvent>().and_then(|custom| {
        let detail = custom.detail();
        detail
            .as_string()
            .map(Primitive::Text)
            .or_else(|| detail.as_f64().map(Primitive::Number))
    });
    let target = event.target().map(|target| TargetState {
        checked: target
            .dyn_ref::<HtmlInputElement>()
            .filter(|input| matches!(input.type_().as_str(), "checkbox" | "radio"))
            .map(HtmlInputElement::checked),
        value: property_text(target.as_ref(), "value"),
    });
    let key = match target {
        Some(_) => None,
        None => property_text(event.as_ref(), "key"),
    };
    RawEvent::from(DomEvent { detail, target, key })
}

fn property_text(object: &JsValue, name: &str) -> Option<String> {
    let value = js_sys::Reflect::get(object, &JsValue::from_str(name)).ok()?;
    value
        .as_string()
        .or_else(|| value.as_f64().map(number_to_string))
}

fn visibility_signal(
    context: &RuntimeContext,
    expression: &Expression,
) -> impl Signal<Item = bool> + Unpin + use<> {
    let store = context.store().clone();
    let expression = expression.clone();
    context
        .state_revision()
        .signal()
        .map(move |_| store.with(|state| is_truthy(&expression.evaluate(state))))
        .dedupe()
}

fn lazy_view(loader: LazyLoader, widgets: &Rc<WidgetRegistry>) -> RawElOrText {
    let context = loader.host().context().clone();
    let task = Rc::new(RefCell::new(None::<TaskHandle>));
    let mut raw_el = RawHtmlEl::new("div").attr("class", "bran-lazy-loader");
    if let Some(name) = &loader.region().name {
        raw_el = raw_el.attr("data-portal", name.as_str());
    }
    raw_el
        .attr_signal(
            "data-loader-phase",
            loader.phase_signal().map(|phase| Some(phase.as_str())),
        )
        .style_signal(
            "display",
            visibility_signal(&context, &loader.region().visible)
                .map(|visible| (!visible).then_some("none")),
        )
        .child(host_view(loader.host().clone(), widgets.clone()))
        .after_insert({
            let loader = loader.clone();
            let task = task.clone();
            let visible = visibility_signal(&context, &loader.region().visible);
            move |_| {
                loader.mount();
                let watcher = loader.clone();
                task.replace(Some(Task::start_droppable(visible.for_each(move |visible| {
                    watcher.set_visible(visible);
                    async {}
                }))));
            }
        })
        .after_remove(move |_| {
            loader.unmount();
            drop(task);
        })
        .unify()
}
