//! Persistent form/state store.
//!
//! One `FormState` exists per page. It is seeded from the server-embedded
//! initial states, written by input handlers and by response merges, and sent
//! whole with every event request.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use super::json_number_to_string;

/// Reserved key holding the serialized outgoing event envelope.
pub const EVENT_DATA_KEY: &str = "__event_data__";

/// Partial state as sent by the server (`states` of a response or of the
/// initial page data).
pub type StateDelta = IndexMap<String, JsonValue>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Rc<[u8]>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    /// Sent as repeated fields with the same name.
    List(Vec<String>),
    Blob(Blob),
}

impl FormValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::List(values) => values.first().map(String::as_str),
            Self::Blob(_) => None,
        }
    }

    /// Converts a JSON state value. Total: anything that is not a string or a
    /// list of scalars is kept as its JSON text.
    pub fn from_state(value: &JsonValue) -> Self {
        match value {
            JsonValue::Array(items) => Self::List(items.iter().map(scalar_to_string).collect()),
            other => Self::Text(scalar_to_string(other)),
        }
    }

    /// Display form used by template interpolation.
    pub fn display(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::List(values) => values.join(","),
            Self::Blob(blob) => blob.file_name.clone().unwrap_or_default(),
        }
    }
}

fn scalar_to_string(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::Bool(flag) => flag.to_string(),
        JsonValue::Number(number) => json_number_to_string(number),
        JsonValue::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl From<&str> for FormValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for FormValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Blob> for FormValue {
    fn from(blob: Blob) -> Self {
        Self::Blob(blob)
    }
}

/// A single field of the request body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormField {
    Text(String),
    Blob(Blob),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormState {
    fields: IndexMap<String, FormValue>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_states(states: &StateDelta) -> Self {
        let mut state = Self::new();
        state.merge(states);
        state
    }

    /// Inserts or overwrites. An overwritten key keeps its position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FormValue>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Applies every key of `partial` as an overwrite; other keys stay.
    pub fn merge(&mut self, partial: &StateDelta) {
        for (key, value) in partial {
            self.fields.insert(key.clone(), FormValue::from_state(value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&FormValue> {
        self.fields.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(FormValue::as_text)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormValue)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// All fields in insertion order, lists expanded into repeated fields.
    pub fn snapshot(&self) -> Vec<(String, FormField)> {
        let mut fields = Vec::with_capacity(self.fields.len());
        for (key, value) in &self.fields {
            match value {
                FormValue::Text(text) => fields.push((key.clone(), FormField::Text(text.clone()))),
                FormValue::List(values) => fields.extend(
                    values
                        .iter()
                        .map(|value| (key.clone(), FormField::Text(value.clone()))),
                ),
                FormValue::Blob(blob) => fields.push((key.clone(), FormField::Blob(blob.clone()))),
            }
        }
        fields
    }
}

/// Shared handle to the page's `FormState`.
///
/// Created once by the page root and handed to every dispatcher, processor and
/// host through the runtime context. All access happens on the UI thread.
#[derive(Clone, Default)]
pub struct Store {
    state: Rc<RefCell<FormState>>,
}

impl Store {
    pub fn new(state: FormState) -> Self {
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<FormValue>) {
        self.state.borrow_mut().set(key, value);
    }

    pub fn merge(&self, partial: &StateDelta) {
        self.state.borrow_mut().merge(partial);
    }

    pub fn get(&self, key: &str) -> Option<FormValue> {
        self.state.borrow().get(key).cloned()
    }

    pub fn text(&self, key: &str) -> Option<String> {
        self.state.borrow().text(key).map(str::to_string)
    }

    pub fn len(&self) -> usize {
        self.state.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().is_empty()
    }

    pub fn snapshot(&self) -> Vec<(String, FormField)> {
        self.state.borrow().snapshot()
    }

    pub fn with<R>(&self, f: impl FnOnce(&FormState) -> R) -> R {
        f(&self.state.borrow())
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut FormState) -> R) -> R {
        f(&mut self.state.borrow_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn delta(value: JsonValue) -> StateDelta {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn merge_keeps_untouched_keys() {
        let mut state = FormState::from_states(&delta(json!({"name": "felix", "age": "30"})));
        state.merge(&delta(json!({"age": "31"})));
        assert_eq!(state.text("name"), Some("felix"));
        assert_eq!(state.text("age"), Some("31"));
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn merge_sequence_is_last_writer_wins_per_key() {
        let deltas = [
            json!({"a": "1", "b": "1"}),
            json!({"b": "2", "c": "2"}),
            json!({"a": "3"}),
            json!({"c": "4", "d": "4"}),
        ];
        let mut state = FormState::new();
        let mut expected = IndexMap::<String, String>::new();
        for value in deltas {
            let partial = delta(value);
            for (key, value) in &partial {
                expected.insert(key.clone(), value.as_str().unwrap().to_string());
            }
            state.merge(&partial);
        }
        let actual: IndexMap<String, String> = state
            .iter()
            .map(|(key, value)| (key.to_string(), value.display()))
            .collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn overwrite_keeps_position() {
        let mut state = FormState::new();
        state.set("first", "1");
        state.set("second", "2");
        state.set("first", "changed");
        let keys: Vec<_> = state.iter().map(|(key, _)| key.to_string()).collect();
        assert_eq!(keys, ["first", "second"]);
        assert_eq!(state.text("first"), Some("changed"));
    }

    #[test]
    fn state_values_are_coerced() {
        let state = FormState::from_states(&delta(json!({
            "count": 1,
            "ratio": 1.5,
            "done": true,
            "gone": null,
            "tags": ["a", "b", 3],
        })));
        assert_eq!(state.text("count"), Some("1"));
        assert_eq!(state.text("ratio"), Some("1.5"));
        assert_eq!(state.text("done"), Some("true"));
        assert_eq!(state.text("gone"), Some(""));
        assert_eq!(
            state.get("tags"),
            Some(&FormValue::List(vec!["a".into(), "b".into(), "3".into()]))
        );
    }

    #[test]
    fn snapshot_expands_lists() {
        let mut state = FormState::new();
        state.set("q", "x");
        state.set("tags", FormValue::List(vec!["a".into(), "b".into()]));
        assert_eq!(
            state.snapshot(),
            vec![
                ("q".to_string(), FormField::Text("x".into())),
                ("tags".to_string(), FormField::Text("a".into())),
                ("tags".to_string(), FormField::Text("b".into())),
            ]
        );
    }

    #[test]
    fn store_handles_share_state() {
        let store = Store::default();
        let other = store.clone();
        store.set("field", "value");
        assert_eq!(other.text("field").as_deref(), Some("value"));
    }
}
