//! Client runtime for server-driven pages.
//!
//! The server renders markup fragments ("schemas") and answers events by id.
//! This crate turns user interactions into event requests, keeps the page's
//! form state across re-renders, and re-mounts freshly received markup inside
//! the running zoon tree.
//!
//! - `protocol/`: pure request/response/state logic. NO zoon, web_sys, Mutable.
//! - `template/`: markup → validated render tree.
//! - `runtime/`: hosts, dispatcher, processor; talks to the outside via ports.
//! - `platform/`: port implementations for the browser and for memory.

pub mod diagnostics;
pub mod platform;
pub mod protocol;
pub mod runtime;
pub mod template;

pub use zoon;
