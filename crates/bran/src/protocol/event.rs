//! Event descriptors and event normalization.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::{json_number_to_string, number_to_string};

/// Event the runtime sends when a response asks for the page to reload.
pub const RELOAD_EVENT_ID: &str = "__reload__";

/// A pushState value: the server side models query parameters as lists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    One(String),
    Many(Vec<String>),
}

impl QueryValue {
    pub fn values(&self) -> &[String] {
        match self {
            Self::One(value) => std::slice::from_ref(value),
            Self::Many(values) => values,
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

pub type PushState = IndexMap<String, QueryValue>;

/// Identifies a server event function plus how to call it.
///
/// `pushState` is always serialized (as `null` when absent) because the server
/// distinguishes an empty object from a missing one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDescriptor {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,
    #[serde(default, rename = "pushState")]
    pub push_state: Option<PushState>,
}

impl EventDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_params<S: Into<String>>(mut self, params: impl IntoIterator<Item = S>) -> Self {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_push_state<K, V>(mut self, entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<QueryValue>,
    {
        self.push_state = Some(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        );
        self
    }
}

/// Canonical event payload sent to the server.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
}

impl NormalizedEvent {
    pub fn value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            checked: None,
        }
    }

    pub fn checked() -> Self {
        Self {
            value: None,
            checked: Some(true),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.checked.is_none()
    }
}

/// Value stored under the reserved event-data key.
#[derive(Debug, Serialize)]
pub struct EventEnvelope<'a> {
    #[serde(rename = "eventFuncId")]
    pub event_func_id: &'a EventDescriptor,
    pub event: &'a NormalizedEvent,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    Text(String),
    Number(f64),
}

/// A user interaction before normalization.
#[derive(Clone, Debug, PartialEq)]
pub enum RawEvent {
    /// Pointer/keyboard event on an element. `checked` is only exposed by
    /// checkbox-like targets, `value` only when the target defines one.
    PointerTarget {
        checked: Option<bool>,
        value: Option<String>,
    },
    /// Selection in a keyed list.
    KeyedSelection { key: String },
    /// Bare value emitted by a widget (radio, pager).
    Primitive(Primitive),
    Opaque,
}

impl RawEvent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Primitive(Primitive::Text(text.into()))
    }

    pub fn number(number: f64) -> Self {
        Self::Primitive(Primitive::Number(number))
    }

    pub fn input(value: impl Into<String>) -> Self {
        Self::PointerTarget {
            checked: None,
            value: Some(value.into()),
        }
    }

    /// Classifies a literal event argument written in a template.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::String(text) => Self::text(text.clone()),
            JsonValue::Number(number) => number
                .as_f64()
                .map(Self::number)
                .unwrap_or_else(|| Self::text(json_number_to_string(number))),
            JsonValue::Object(object) => {
                if let Some(JsonValue::Object(target)) = object.get("target") {
                    return Self::pointer_target(target);
                }
                if object.contains_key("checked") || object.contains_key("value") {
                    return Self::pointer_target(object);
                }
                match object.get("key") {
                    Some(JsonValue::String(key)) => Self::KeyedSelection { key: key.clone() },
                    Some(JsonValue::Number(key)) => Self::KeyedSelection {
                        key: json_number_to_string(key),
                    },
                    _ => Self::Opaque,
                }
            }
            JsonValue::Null | JsonValue::Bool(_) | JsonValue::Array(_) => Self::Opaque,
        }
    }

    fn pointer_target(target: &serde_json::Map<String, JsonValue>) -> Self {
        let checked = target.get("checked").and_then(JsonValue::as_bool);
        let value = match target.get("value") {
            Some(JsonValue::String(text)) => Some(text.clone()),
            Some(JsonValue::Number(number)) => Some(json_number_to_string(number)),
            Some(JsonValue::Bool(flag)) => Some(flag.to_string()),
            _ => None,
        };
        Self::PointerTarget { checked, value }
    }

    /// The target's own value, as copied into the store by `oninput`.
    pub fn target_value(&self) -> Option<String> {
        match self {
            Self::PointerTarget { value, .. } => value.clone(),
            Self::KeyedSelection { key } => Some(key.clone()),
            Self::Primitive(Primitive::Text(text)) => Some(text.clone()),
            Self::Primitive(Primitive::Number(number)) => Some(number_to_string(*number)),
            Self::Opaque => None,
        }
    }
}

/// Properties read off a browser event, before classification.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DomEvent {
    /// Primitive `detail` of a custom event a widget dispatched.
    pub detail: Option<Primitive>,
    /// `None` when the event has no target element.
    pub target: Option<TargetState>,
    pub key: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TargetState {
    pub checked: Option<bool>,
    pub value: Option<String>,
}

impl From<DomEvent> for RawEvent {
    /// A widget's detail wins; otherwise any event with a target is a target
    /// event, whether or not the target exposes a value.
    fn from(event: DomEvent) -> Self {
        match event {
            DomEvent {
                detail: Some(detail),
                ..
            } => Self::Primitive(detail),
            DomEvent {
                target: Some(TargetState { checked, value }),
                ..
            } => Self::PointerTarget { checked, value },
            DomEvent { key: Some(key), .. } => Self::KeyedSelection { key },
            DomEvent { .. } => Self::Opaque,
        }
    }
}

/// Pure and total: checked > value > key > primitive > empty.
pub fn normalize(raw: &RawEvent) -> NormalizedEvent {
    match raw {
        RawEvent::PointerTarget {
            checked: Some(true),
            ..
        } => NormalizedEvent::checked(),
        RawEvent::PointerTarget {
            value: Some(value), ..
        } => NormalizedEvent::value(value.clone()),
        RawEvent::PointerTarget { .. } => NormalizedEvent::default(),
        RawEvent::KeyedSelection { key } if !key.is_empty() => NormalizedEvent::value(key.clone()),
        RawEvent::KeyedSelection { .. } => NormalizedEvent::default(),
        RawEvent::Primitive(Primitive::Text(text)) => NormalizedEvent::value(text.clone()),
        RawEvent::Primitive(Primitive::Number(number)) => {
            NormalizedEvent::value(number_to_string(*number))
        }
        RawEvent::Opaque => NormalizedEvent::default(),
    }
}
