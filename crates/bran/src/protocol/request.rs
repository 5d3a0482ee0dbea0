//! Building event requests.

use super::{
    EVENT_DATA_KEY, EventDescriptor, EventEnvelope, FormField, FormState, NormalizedEvent,
    PushState, TransportError, pushed_search,
};

/// Where the page currently is.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocationSnapshot {
    pub pathname: String,
    pub search: String,
}

/// History entry to push before the request goes out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryPush {
    pub state: PushState,
    pub url: String,
}

impl HistoryPush {
    /// Entry for `push_state` merged into the query of `location`.
    pub fn merged(location: &LocationSnapshot, push_state: &PushState) -> Self {
        Self {
            state: push_state.clone(),
            url: format!(
                "{}{}",
                location.pathname,
                pushed_search(&location.search, push_state)
            ),
        }
    }

    /// The `?query` part of `url`, empty when there is none.
    pub fn search(&self) -> &str {
        self.url.find('?').map_or("", |index| &self.url[index..])
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventRequest {
    pub url: String,
    pub body: Vec<(String, FormField)>,
}

impl EventRequest {
    pub fn text_field(&self, name: &str) -> Option<&str> {
        self.body.iter().find_map(|(key, field)| match field {
            FormField::Text(text) if key == name => Some(text.as_str()),
            _ => None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedDispatch {
    pub request: EventRequest,
    pub history: Option<HistoryPush>,
}

/// Writes the envelope into `state`, works out the history entry and reads
/// the body. The body is taken from `state` as it is at this moment.
pub fn prepare_dispatch(
    execute_prefix: &str,
    descriptor: &EventDescriptor,
    event: &NormalizedEvent,
    location: &LocationSnapshot,
    state: &mut FormState,
) -> Result<PreparedDispatch, TransportError> {
    let envelope = EventEnvelope {
        event_func_id: descriptor,
        event,
    };
    let envelope = serde_json::to_string(&envelope)
        .map_err(|error| TransportError::Encode(error.to_string()))?;
    state.set(EVENT_DATA_KEY, envelope);

    let history = descriptor
        .push_state
        .as_ref()
        .map(|push_state| HistoryPush::merged(location, push_state));
    let search = history
        .as_ref()
        .map_or(location.search.as_str(), HistoryPush::search);

    let request = EventRequest {
        url: format!(
            "{}/{}{}",
            execute_prefix.trim_end_matches('/'),
            descriptor.id,
            search
        ),
        body: state.snapshot(),
    };
    Ok(PreparedDispatch { request, history })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(search: &str) -> LocationSnapshot {
        LocationSnapshot {
            pathname: "/products".into(),
            search: search.into(),
        }
    }

    #[test]
    fn plain_event_keeps_current_query() {
        let mut state = FormState::new();
        state.set("name", "felix");
        let prepared = prepare_dispatch(
            "__execute_event__",
            &EventDescriptor::new("save"),
            &NormalizedEvent::value("1"),
            &location("?sort=name"),
            &mut state,
        )
        .unwrap();
        assert_eq!(prepared.request.url, "__execute_event__/save?sort=name");
        assert!(prepared.history.is_none());
        assert_eq!(prepared.request.text_field("name"), Some("felix"));
        assert_eq!(
            prepared.request.text_field(EVENT_DATA_KEY),
            Some(r#"{"eventFuncId":{"id":"save","pushState":null},"event":{"value":"1"}}"#)
        );
    }

    #[test]
    fn push_state_event_uses_merged_query() {
        let mut state = FormState::new();
        let prepared = prepare_dispatch(
            "/admin/__execute_event__/",
            &EventDescriptor::new("x").with_push_state([("page", "2")]),
            &NormalizedEvent::default(),
            &location("?sort=name"),
            &mut state,
        )
        .unwrap();
        assert_eq!(prepared.request.url, "/admin/__execute_event__/x?sort=name&page=2");
        let history = prepared.history.unwrap();
        assert_eq!(history.url, "/products?sort=name&page=2");
        assert_eq!(history.state["page"].values(), ["2"]);
        assert_eq!(history.search(), "?sort=name&page=2");
    }

    #[test]
    fn empty_push_state_entry_has_no_query() {
        let history = HistoryPush::merged(&location("?sort=name"), &PushState::new());
        assert_eq!(history.url, "/products");
        assert_eq!(history.search(), "");
    }

    #[test]
    fn envelope_is_written_before_the_body_is_read() {
        let mut state = FormState::new();
        state.set(EVENT_DATA_KEY, "stale");
        let prepared = prepare_dispatch(
            "p",
            &EventDescriptor::new("a"),
            &NormalizedEvent::default(),
            &location(""),
            &mut state,
        )
        .unwrap();
        assert_ne!(prepared.request.text_field(EVENT_DATA_KEY), Some("stale"));
        assert_eq!(prepared.request.body.len(), 1);
    }
}
