use serde_json::Value as JsonValue;

use super::dispatcher::dispatch;
use super::host::TemplateHost;
use super::{HeadInjection, HeadSlot, RuntimeContext};
use crate::diagnostics::LOG_EVENTS;
use crate::protocol::{
    EventDescriptor, EventResponse, HistoryPush, NormalizedEvent, RELOAD_EVENT_ID, RawResponse,
    RuntimeError,
};
use crate::template::parse_method_call;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProcessOutcome {
    pub redirected: Option<String>,
    /// The target host installed a new schema.
    pub reloaded: bool,
    /// A `__reload__` event was scheduled against the target host.
    pub reload_requested: bool,
    /// The response's `data`, untouched.
    pub data: Option<JsonValue>,
}

/// Applies one response to `target` in a fixed order: states, redirect,
/// history, title, head, schema, portal updates, portal reloads, page
/// reload. A redirect ends processing.
pub fn process(target: &TemplateHost, raw: RawResponse) -> Result<ProcessOutcome, RuntimeError> {
    let context = target.context();
    let environment = context.environment();
    let body = raw.into_body()?;
    let response = EventResponse::parse(&body)?;
    let mut outcome = ProcessOutcome {
        data: response.data.clone(),
        ..ProcessOutcome::default()
    };

    if let Some(states) = &response.states {
        context.merge_states(states);
    }

    if let Some(url) = response.redirect_url() {
        context.coalescer().borrow_mut().cancel_all();
        environment.navigator.replace(url);
        outcome.redirected = Some(url.to_owned());
        return Ok(outcome);
    }

    if let Some(push_state) = &response.push_state {
        let location = environment.navigator.location();
        environment
            .navigator
            .push_history(&HistoryPush::merged(&location, push_state));
    }

    if let Some(title) = response.page_title() {
        environment.head.set_title(title);
    }

    inject_head(context, &response);

    if let Some(schema) = response.schema() {
        target.reload(schema)?;
        outcome.reloaded = true;
    }

    for portal in &response.update_portals {
        let Some(loader) = context.portal(&portal.name) else {
            context
                .diagnostics()
                .warn(format!("no portal named `{}` to update", portal.name));
            continue;
        };
        let Some(schema) = portal.schema() else {
            continue;
        };
        let on_loaded = match portal.after_loaded().map(parse_method_call).transpose() {
            Ok(call) => call,
            Err(error) => {
                context.diagnostics().warn(format!(
                    "portal `{}` afterLoaded ignored: {error}",
                    portal.name
                ));
                None
            }
        };
        if let Err(error) = loader.install(schema, on_loaded) {
            context.diagnostics().error(&error);
            return Err(error.into());
        }
    }

    for name in &response.reload_portals {
        match context.portal(name) {
            Some(loader) => loader.refetch(),
            None => context
                .diagnostics()
                .warn(format!("no portal named `{name}` to reload")),
        }
    }

    if response.reload {
        let host = target.clone();
        environment.scheduler.spawn(Box::pin(async move {
            let descriptor = EventDescriptor::new(RELOAD_EVENT_ID);
            // Failures are reported inside.
            let _ = dispatch_and_process(host, descriptor, NormalizedEvent::default()).await;
        }));
        outcome.reload_requested = true;
    }

    Ok(outcome)
}

fn inject_head(context: &RuntimeContext, response: &EventResponse) {
    let head = &context.environment().head;
    match context.config().head_injection {
        HeadInjection::Ignore => {}
        HeadInjection::Inject => {
            if let Some(styles) = response.styles() {
                head.inject(HeadSlot::Styles, styles);
            }
            if let Some(scripts) = response.scripts() {
                head.inject(HeadSlot::Scripts, scripts);
            }
        }
    }
}

/// Dispatches `descriptor` and processes the response against `host`.
/// Failures are reported to the diagnostics channel and returned.
pub async fn dispatch_and_process(
    host: TemplateHost,
    descriptor: EventDescriptor,
    event: NormalizedEvent,
) -> Result<ProcessOutcome, RuntimeError> {
    let context = host.context().clone();
    let result = match dispatch(&context, &descriptor, &event).await {
        Ok(raw) => process(&host, raw),
        Err(error) => Err(error.into()),
    };
    match &result {
        // Mount failures were already reported by the host.
        Err(RuntimeError::Mount(_)) => {}
        Err(error) => context
            .diagnostics()
            .error(format!("event `{}` failed: {error}", descriptor.id)),
        Ok(outcome) if LOG_EVENTS => context.diagnostics().info(format!(
            "event `{}` processed, reloaded: {}",
            descriptor.id, outcome.reloaded
        )),
        Ok(_) => {}
    }
    result
}
