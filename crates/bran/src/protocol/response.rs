//! Server responses.

use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::{ParseError, PushState, StateDelta, TransportError};

/// Response as handed back by a transport, before interpretation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn into_body(self) -> Result<String, TransportError> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(TransportError::Status(self.status))
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalUpdate {
    pub name: String,
    #[serde(default)]
    pub schema: Option<String>,
    /// Method call to run once the portal's new schema is installed.
    #[serde(default)]
    pub after_loaded: Option<String>,
}

impl PortalUpdate {
    pub fn schema(&self) -> Option<&str> {
        non_empty(&self.schema)
    }

    pub fn after_loaded(&self) -> Option<&str> {
        non_empty(&self.after_loaded)
    }
}

/// Every field is optional and acts independently. Empty strings count as
/// absent, like the server's `omitempty`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    #[serde(default)]
    pub states: Option<StateDelta>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default, rename = "redirectURL")]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub styles: Option<String>,
    #[serde(default)]
    pub scripts: Option<String>,
    #[serde(default)]
    pub page_title: Option<String>,
    /// Re-run the page's reload event once this response is applied.
    #[serde(default, deserialize_with = "null_as_default")]
    pub reload: bool,
    /// History entry to push, merged into the current query like an event's
    /// `pushState`. `null` means none; `{}` clears the query.
    #[serde(default)]
    pub push_state: Option<PushState>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub update_portals: Vec<PortalUpdate>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reload_portals: Vec<String>,
    #[serde(default)]
    pub data: Option<JsonValue>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl EventResponse {
    /// The body must be a JSON object; arrays and scalars are rejected even
    /// where serde would accept them positionally.
    pub fn parse(body: &str) -> Result<Self, ParseError> {
        let object: serde_json::Map<String, JsonValue> = serde_json::from_str(body)?;
        Ok(serde_json::from_value(JsonValue::Object(object))?)
    }

    pub fn schema(&self) -> Option<&str> {
        non_empty(&self.schema)
    }

    pub fn redirect_url(&self) -> Option<&str> {
        non_empty(&self.redirect_url)
    }

    pub fn page_title(&self) -> Option<&str> {
        non_empty(&self.page_title)
    }

    pub fn styles(&self) -> Option<&str> {
        non_empty(&self.styles)
    }

    pub fn scripts(&self) -> Option<&str> {
        non_empty(&self.scripts)
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_response() {
        let response = EventResponse::parse(
            r#"{
                "states": {"count": "1"},
                "schema": "<div>1</div>",
                "pageTitle": "Counter",
                "updatePortals": [{"name": "side", "schema": "<p>x</p>"}],
                "reloadPortals": ["list"],
                "pushState": null,
                "data": {"items": [1, 2]}
            }"#,
        )
        .unwrap();
        assert_eq!(response.states.unwrap()["count"], "1");
        assert_eq!(response.schema.as_deref(), Some("<div>1</div>"));
        assert_eq!(response.page_title.as_deref(), Some("Counter"));
        assert_eq!(response.update_portals[0].name, "side");
        assert_eq!(response.reload_portals, ["list"]);
        assert_eq!(response.push_state, None);
        assert!(!response.reload);
        assert!(response.data.is_some());
    }

    #[test]
    fn reload_push_state_and_portal_callbacks() {
        let response = EventResponse::parse(
            r#"{
                "reload": true,
                "pushState": {"page": "3", "tag": ["a", "b"]},
                "updatePortals": [
                    {"name": "side", "schema": "<p></p>", "afterLoaded": "onclick({\"id\":\"x\"})"},
                    {"name": "top", "afterLoaded": ""}
                ]
            }"#,
        )
        .unwrap();
        assert!(response.reload);
        let push_state = response.push_state.unwrap();
        assert_eq!(push_state["tag"].values(), ["a", "b"]);
        assert_eq!(response.update_portals[0].after_loaded(), Some(r#"onclick({"id":"x"})"#));
        assert_eq!(response.update_portals[1].after_loaded(), None);
        assert_eq!(response.update_portals[1].schema(), None);
        assert_eq!(EventResponse::parse(r#"{"pushState": {}}"#).unwrap().push_state, Some(PushState::new()));
    }

    #[test]
    fn empty_strings_count_as_absent() {
        let response = EventResponse::parse(r#"{"schema": "", "redirectURL": ""}"#).unwrap();
        assert_eq!(response.schema(), None);
        assert_eq!(response.redirect_url(), None);
    }

    #[test]
    fn accepts_reserved_head_fields() {
        let response =
            EventResponse::parse(r#"{"styles": "body{}", "scripts": "void 0", "updatePortals": null}"#)
                .unwrap();
        assert_eq!(response.styles(), Some("body{}"));
        assert!(response.update_portals.is_empty());
    }

    #[test]
    fn malformed_body_is_a_parse_error() {
        let error = EventResponse::parse("<html>oops</html>").unwrap_err();
        assert_eq!(error.line, 1);
        assert!(EventResponse::parse(r#"{"schema": 5}"#).is_err());
        assert!(EventResponse::parse("[]").is_err());
        assert!(EventResponse::parse(r#"[null, "<p>x</p>"]"#).is_err());
        assert!(EventResponse::parse("\"<p>x</p>\"").is_err());
        assert_eq!(EventResponse::parse("\n  [1]").unwrap_err().line, 2);
    }

    #[test]
    fn non_success_status_is_a_transport_error() {
        let response = RawResponse {
            status: 502,
            body: String::new(),
        };
        assert_eq!(response.into_body(), Err(TransportError::Status(502)));
        assert_eq!(RawResponse::ok("{}").into_body(), Ok("{}".to_string()));
    }
}
