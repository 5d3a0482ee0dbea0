//! What the runtime needs from the page it runs in.
//!
//! `platform::browser` implements these with fetch, `window.history` and zoon
//! tasks; `platform::memory` with scripted, inspectable doubles.

use futures_util::future::LocalBoxFuture;
use std::rc::Rc;
use std::time::Duration;

use crate::protocol::{EventRequest, HistoryPush, LocationSnapshot, RawResponse, TransportError};

pub trait Transport {
    /// Sends one event request. Never retried.
    fn post(&self, request: EventRequest) -> LocalBoxFuture<'static, Result<RawResponse, TransportError>>;
}

pub trait Navigator {
    fn location(&self) -> LocationSnapshot;
    /// Adds a history entry; the location reflects it immediately.
    fn push_history(&self, entry: &HistoryPush);
    /// Full navigation without a history entry.
    fn replace(&self, url: &str);
}

pub trait Scheduler {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HeadSlot {
    Styles,
    Scripts,
}

impl HeadSlot {
    pub fn element_id(self) -> &'static str {
        match self {
            Self::Styles => "main_styles",
            Self::Scripts => "main_scripts",
        }
    }
}

pub trait PageHead {
    fn set_title(&self, title: &str);
    fn inject(&self, slot: HeadSlot, content: &str);
}

#[derive(Clone)]
pub struct Environment {
    pub transport: Rc<dyn Transport>,
    pub navigator: Rc<dyn Navigator>,
    pub scheduler: Rc<dyn Scheduler>,
    pub head: Rc<dyn PageHead>,
}
