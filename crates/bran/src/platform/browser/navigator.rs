use wasm_bindgen::JsValue;

use crate::diagnostics::Diagnostics;
use crate::protocol::{HistoryPush, LocationSnapshot};
use crate::runtime::Navigator;

/// `window.location` and `window.history`.
pub struct WindowNavigator {
    diagnostics: Diagnostics,
}

impl WindowNavigator {
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self { diagnostics }
    }
}

impl Navigator for WindowNavigator {
    fn location(&self) -> LocationSnapshot {
        let Some(location) = web_sys::window().map(|window| window.location()) else {
            return LocationSnapshot::default();
        };
        LocationSnapshot {
            pathname: location.pathname().unwrap_or_default(),
            search: location.search().unwrap_or_default(),
        }
    }

    fn push_history(&self, entry: &HistoryPush) {
        let result = history_state(entry).and_then(|state| {
            web_sys::window()
                .ok_or_else(|| JsValue::from_str("no window"))?
                .history()?
                .push_state_with_url(&state, "", Some(&entry.url))
        });
        if let Err(error) = result {
            self.diagnostics.error(format!("history entry for {} not pushed: {error:?}", entry.url));
        }
    }

    fn replace(&self, url: &str) {
        let result = web_sys::window()
            .ok_or_else(|| JsValue::from_str("no window"))
            .and_then(|window| window.location().replace(url));
        if let Err(error) = result {
            self.diagnostics.error(format!("redirect to {url} failed: {error:?}"));
        }
    }
}

fn history_state(entry: &HistoryPush) -> Result<JsValue, JsValue> {
    let json = serde_json::to_string(&entry.state)
        .map_err(|error| JsValue::from_str(&error.to_string()))?;
    js_sys::JSON::parse(&json)
}
