use super::RuntimeContext;
use crate::diagnostics::LOG_EVENTS;
use crate::protocol::{EventDescriptor, NormalizedEvent, RawResponse, TransportError, prepare_dispatch};

/// Sends one event: envelope into the store, history entry for `pushState`,
/// then a POST carrying the whole store as it is right now.
pub async fn dispatch(
    context: &RuntimeContext,
    descriptor: &EventDescriptor,
    event: &NormalizedEvent,
) -> Result<RawResponse, TransportError> {
    let environment = context.environment();
    let location = environment.navigator.location();
    let prepared = context.store().with_mut(|state| {
        prepare_dispatch(
            &context.config().execute_prefix,
            descriptor,
            event,
            &location,
            state,
        )
    })?;
    if let Some(history) = &prepared.history {
        environment.navigator.push_history(history);
    }
    if LOG_EVENTS {
        context
            .diagnostics()
            .info(format!("POST {}", prepared.request.url));
    }
    environment.transport.post(prepared.request).await
}
