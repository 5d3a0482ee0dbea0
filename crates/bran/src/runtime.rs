//! Hosts, the dispatcher and the response processor.
//!
//! Nothing in here touches the DOM or the network directly; the page is
//! reached through the ports in `Environment`.

use serde::Deserialize;

use crate::diagnostics::Diagnostics;
use crate::protocol::{FormState, MountError, StateDelta, Store};

mod config;
pub use config::{
    DEBOUNCE_WINDOW_MS, EXECUTE_PREFIX, HeadInjection, MOUNT_ID, RevisibilityPolicy, RuntimeConfig,
};

mod context;
pub use context::RuntimeContext;

mod dispatcher;
pub use dispatcher::dispatch;

mod host;
pub use host::{AfterLoaded, TemplateHost, WeakHost};

mod lazy_loader;
pub use lazy_loader::{LazyLoader, LoaderPhase, WeakLoader};

mod methods;
pub use methods::{MethodTable, PendingInput};

mod ports;
pub use ports::{Environment, HeadSlot, Navigator, PageHead, Scheduler, Transport};

mod processor;
pub use processor::{ProcessOutcome, dispatch_and_process, process};

/// `window.__serverSideData__`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ServerSideData {
    #[serde(default)]
    pub states: StateDelta,
    #[serde(default)]
    pub config: Option<RuntimeConfig>,
}

/// The page root: one store, one context, one root host.
pub struct Runtime {
    context: RuntimeContext,
    root: TemplateHost,
}

impl Runtime {
    pub fn new(environment: Environment, data: ServerSideData) -> Self {
        Self::with_diagnostics(environment, data, Diagnostics::new())
    }

    pub fn with_diagnostics(
        environment: Environment,
        data: ServerSideData,
        diagnostics: Diagnostics,
    ) -> Self {
        let config = data.config.unwrap_or_default();
        let store = Store::new(FormState::from_states(&data.states));
        let context = RuntimeContext::new(config, store, environment, diagnostics);
        let root = TemplateHost::new(context.clone());
        Self { context, root }
    }

    pub fn mount(&self, markup: &str) -> Result<(), MountError> {
        self.root.mount(markup)
    }

    pub fn root(&self) -> &TemplateHost {
        &self.root
    }

    pub fn context(&self) -> &RuntimeContext {
        &self.context
    }

    pub fn store(&self) -> &Store {
        self.context.store()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        self.context.diagnostics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::memory::MemoryPlatform;
    use crate::protocol::{EventDescriptor, RawEvent, RawResponse};

    fn runtime(platform: &MemoryPlatform, data: &str) -> Runtime {
        Runtime::new(platform.environment(), serde_json::from_str(data).unwrap())
    }

    #[test]
    fn server_side_data_seeds_the_store_and_config() {
        let platform = MemoryPlatform::new();
        let runtime = runtime(
            &platform,
            r#"{"states": {"count": "0", "tags": ["a", "b"]}, "config": {"debounceMs": 10}}"#,
        );
        assert_eq!(runtime.store().text("count").as_deref(), Some("0"));
        assert_eq!(runtime.store().len(), 2);
        assert_eq!(runtime.context().config().debounce_ms, 10);
        assert_eq!(runtime.context().config().mount_id, "app");
    }

    #[test]
    fn states_are_merged_before_the_schema_renders() {
        let platform = MemoryPlatform::new();
        let runtime = runtime(&platform, r#"{"states": {"count": "0"}}"#);
        runtime.mount("<b>{{ states.count }}</b>").unwrap();
        platform.transport.respond(RawResponse::ok(
            r#"{"states": {"count": "1"}, "schema": "<i>{{ states.count }}</i>"}"#,
        ));

        runtime
            .root()
            .methods()
            .onclick(&EventDescriptor::new("inc"), &RawEvent::Opaque);
        platform.run_until_stalled();
        assert_eq!(runtime.root().render_html(), "<i>1</i>");
    }

    #[test]
    fn process_order_stops_at_redirect() {
        let platform = MemoryPlatform::new();
        let runtime = runtime(&platform, "{}");
        runtime.mount("<p>before</p>").unwrap();
        let outcome = process(
            runtime.root(),
            RawResponse::ok(
                r#"{"states": {"k": "v"}, "redirectURL": "/done", "schema": "<p>after</p>", "pageTitle": "T"}"#,
            ),
        )
        .unwrap();
        assert_eq!(outcome.redirected.as_deref(), Some("/done"));
        assert!(!outcome.reloaded);
        assert_eq!(runtime.store().text("k").as_deref(), Some("v"));
        assert_eq!(platform.navigator.replaced(), ["/done"]);
        assert_eq!(platform.head.title(), None);
        assert_eq!(runtime.root().render_html(), "<p>before</p>");
    }
}
