//! The fixed method table every synthesized component calls into.

use super::host::{TemplateHost, WeakHost};
use super::processor::dispatch_and_process;
use super::RuntimeContext;
use crate::diagnostics::LOG_EVENTS;
use crate::protocol::{CoalesceKey, EventDescriptor, NormalizedEvent, RawEvent, normalize};
use crate::template::{EventArgument, MethodCall};

/// An input event waiting out the debounce window.
pub struct PendingInput {
    host: WeakHost,
    descriptor: EventDescriptor,
    event: NormalizedEvent,
}

/// `onclick`/`oninput` bound to one host. Responses of the events it sends
/// are processed against that host.
#[derive(Clone)]
pub struct MethodTable {
    host: WeakHost,
    host_id: u64,
    context: RuntimeContext,
}

impl MethodTable {
    pub fn new(host: &TemplateHost) -> Self {
        Self {
            host: host.downgrade(),
            host_id: host.id(),
            context: host.context().clone(),
        }
    }

    /// Dispatches at once, no debounce.
    pub fn onclick(&self, descriptor: &EventDescriptor, raw: &RawEvent) {
        let Some(host) = self.host.upgrade() else {
            return;
        };
        let descriptor = descriptor.clone();
        let event = normalize(raw);
        self.context
            .environment()
            .scheduler
            .spawn(Box::pin(async move {
                let _ = dispatch_and_process(host, descriptor, event).await;
            }));
    }

    /// Copies the target value into the store under `field`, then sends
    /// `descriptor` once input on the same slot has been quiet for the
    /// debounce window.
    pub fn oninput(&self, descriptor: Option<&EventDescriptor>, field: Option<&str>, raw: &RawEvent) {
        if let Some(field) = field {
            self.context
                .set_state(field, raw.target_value().unwrap_or_default());
        }
        let Some(descriptor) = descriptor else {
            return;
        };

        let key = CoalesceKey::new(self.host_id, field.unwrap_or(descriptor.id.as_str()));
        let pending = PendingInput {
            host: self.host.clone(),
            descriptor: descriptor.clone(),
            event: normalize(raw),
        };
        let ticket = self.context.coalescer().borrow_mut().schedule(key, pending);

        let context = self.context.clone();
        let quiet = context
            .environment()
            .scheduler
            .sleep(context.config().debounce_window());
        self.context
            .environment()
            .scheduler
            .spawn(Box::pin(async move {
                quiet.await;
                let pending = context.coalescer().borrow_mut().take_if_current(&ticket);
                let Some(PendingInput {
                    host,
                    descriptor,
                    event,
                }) = pending
                else {
                    if LOG_EVENTS {
                        context.diagnostics().info("input superseded");
                    }
                    return;
                };
                if let Some(host) = host.upgrade() {
                    let _ = dispatch_and_process(host, descriptor, event).await;
                }
            }));
    }

    /// Runs a listener call, `dom_event` standing in for `$event`.
    pub fn call(&self, call: &MethodCall, dom_event: Option<RawEvent>) {
        match call {
            MethodCall::Click { descriptor, event } => {
                let raw = self.resolve(event, dom_event);
                self.onclick(descriptor, &raw);
            }
            MethodCall::Input {
                descriptor,
                field,
                event,
            } => {
                let raw = self.resolve(event, dom_event);
                self.oninput(descriptor.as_ref(), field.as_deref(), &raw);
            }
        }
    }

    fn resolve(&self, argument: &EventArgument, dom_event: Option<RawEvent>) -> RawEvent {
        match argument {
            EventArgument::DomEvent => dom_event.unwrap_or(RawEvent::Opaque),
            EventArgument::State(key) => {
                RawEvent::text(self.context.store().text(key).unwrap_or_default())
            }
            EventArgument::Literal(raw) => raw.clone(),
        }
    }
}
