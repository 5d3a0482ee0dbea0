//! In-memory ports: a scripted transport, a navigator that records history,
//! a head that records writes, and a scheduler on virtual time.

use futures_util::future::{self, LocalBoxFuture};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use crate::diagnostics::Diagnostics;
use crate::protocol::{
    EventRequest, FormState, HistoryPush, LocationSnapshot, RawResponse, Store, TransportError,
};
use crate::runtime::{
    Environment, HeadSlot, Navigator, PageHead, RuntimeConfig, RuntimeContext, Transport,
};

mod clock;
pub use clock::{ManualClock, MemoryScheduler, Sleep};

/// Answers requests from a queue, `{}` once the queue is empty.
#[derive(Default)]
pub struct MemoryTransport {
    responses: RefCell<VecDeque<Result<RawResponse, TransportError>>>,
    requests: RefCell<Vec<EventRequest>>,
}

impl MemoryTransport {
    pub fn respond(&self, response: RawResponse) {
        self.responses.borrow_mut().push_back(Ok(response));
    }

    pub fn fail(&self, error: TransportError) {
        self.responses.borrow_mut().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<EventRequest> {
        self.requests.borrow().clone()
    }

    pub fn last_request(&self) -> Option<EventRequest> {
        self.requests.borrow().last().cloned()
    }
}

impl Transport for MemoryTransport {
    fn post(&self, request: EventRequest) -> LocalBoxFuture<'static, Result<RawResponse, TransportError>> {
        self.requests.borrow_mut().push(request);
        let response = self
            .responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(RawResponse::ok("{}")));
        Box::pin(future::ready(response))
    }
}

pub struct MemoryNavigator {
    location: RefCell<LocationSnapshot>,
    history: RefCell<Vec<HistoryPush>>,
    replaced: RefCell<Vec<String>>,
}

impl MemoryNavigator {
    pub fn new(url: &str) -> Self {
        Self {
            location: RefCell::new(split_url(url)),
            history: RefCell::new(Vec::new()),
            replaced: RefCell::new(Vec::new()),
        }
    }

    pub fn history(&self) -> Vec<HistoryPush> {
        self.history.borrow().clone()
    }

    pub fn replaced(&self) -> Vec<String> {
        self.replaced.borrow().clone()
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for MemoryNavigator {
    fn location(&self) -> LocationSnapshot {
        self.location.borrow().clone()
    }

    fn push_history(&self, entry: &HistoryPush) {
        self.history.borrow_mut().push(entry.clone());
        self.location.replace(split_url(&entry.url));
    }

    fn replace(&self, url: &str) {
        self.replaced.borrow_mut().push(url.to_owned());
        self.location.replace(split_url(url));
    }
}

fn split_url(url: &str) -> LocationSnapshot {
    let (pathname, search) = match url.find('?') {
        Some(index) => url.split_at(index),
        None => (url, ""),
    };
    LocationSnapshot {
        pathname: pathname.to_owned(),
        search: search.to_owned(),
    }
}

#[derive(Default)]
pub struct MemoryHead {
    title: RefCell<Option<String>>,
    injected: RefCell<Vec<(HeadSlot, String)>>,
}

impl MemoryHead {
    pub fn title(&self) -> Option<String> {
        self.title.borrow().clone()
    }

    pub fn injected(&self) -> Vec<(HeadSlot, String)> {
        self.injected.borrow().clone()
    }
}

impl PageHead for MemoryHead {
    fn set_title(&self, title: &str) {
        self.title.replace(Some(title.to_owned()));
    }

    fn inject(&self, slot: HeadSlot, content: &str) {
        self.injected.borrow_mut().push((slot, content.to_owned()));
    }
}

/// All memory ports plus a context over an empty store.
pub struct MemoryPlatform {
    pub transport: Rc<MemoryTransport>,
    pub navigator: Rc<MemoryNavigator>,
    pub head: Rc<MemoryHead>,
    pub scheduler: Rc<MemoryScheduler>,
    context: RuntimeContext,
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::with_location(config, "/")
    }

    pub fn with_location(config: RuntimeConfig, url: &str) -> Self {
        let transport = Rc::new(MemoryTransport::default());
        let navigator = Rc::new(MemoryNavigator::new(url));
        let head = Rc::new(MemoryHead::default());
        let scheduler = Rc::new(MemoryScheduler::default());
        let environment = Environment {
            transport: transport.clone(),
            navigator: navigator.clone(),
            scheduler: scheduler.clone(),
            head: head.clone(),
        };
        let context = RuntimeContext::new(
            config,
            Store::new(FormState::new()),
            environment,
            Diagnostics::new(),
        );
        Self {
            transport,
            navigator,
            head,
            scheduler,
            context,
        }
    }

    pub fn environment(&self) -> Environment {
        self.context.environment().clone()
    }

    pub fn context(&self) -> RuntimeContext {
        self.context.clone()
    }

    pub fn run_until_stalled(&self) {
        self.scheduler.run_until_stalled();
    }

    pub fn advance_by(&self, duration: Duration) {
        self.scheduler.advance_by(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::QueryValue;
    use indexmap::IndexMap;

    #[test]
    fn navigator_tracks_pushed_and_replaced_urls() {
        let navigator = MemoryNavigator::new("/products?sort=name");
        assert_eq!(navigator.location().search, "?sort=name");
        navigator.push_history(&HistoryPush {
            state: IndexMap::from([("page".to_owned(), QueryValue::from("2"))]),
            url: "/products?sort=name&page=2".to_owned(),
        });
        assert_eq!(navigator.location().search, "?sort=name&page=2");
        navigator.replace("/done");
        assert_eq!(
            navigator.location(),
            LocationSnapshot {
                pathname: "/done".to_owned(),
                search: String::new(),
            }
        );
        assert_eq!(navigator.history().len(), 1);
    }

    #[test]
    fn transport_answers_in_order_then_with_empty_responses() {
        let transport = MemoryTransport::default();
        transport.fail(TransportError::Status(502));
        let request = EventRequest {
            url: "/__execute_event__/x".to_owned(),
            body: Vec::new(),
        };
        let first = futures_executor::block_on(transport.post(request.clone()));
        let second = futures_executor::block_on(transport.post(request));
        assert_eq!(first, Err(TransportError::Status(502)));
        assert_eq!(second, Ok(RawResponse::ok("{}")));
        assert_eq!(transport.requests().len(), 2);
    }
}
