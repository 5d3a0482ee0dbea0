//! The event protocol spoken with the server.
//!
//! Pure data and pure functions only: the form state, event descriptors and
//! their normalization, query-string merging, request building, response
//! parsing and the input coalescer. Nothing here touches the browser or spawns
//! work; `runtime` wires these pieces to the ports.

mod coalesce;
pub use coalesce::{CoalesceKey, Coalescer, DebounceScope, Ticket};

mod error;
pub use error::{MissingRootError, MountError, ParseError, RuntimeError, TransportError};

mod event;
pub use event::{
    DomEvent, EventDescriptor, EventEnvelope, NormalizedEvent, Primitive, PushState, QueryValue,
    RELOAD_EVENT_ID, RawEvent, TargetState, normalize,
};

mod query;
pub use query::{merge_query, parse_query, pushed_search, to_search};

mod request;
pub use request::{EventRequest, HistoryPush, LocationSnapshot, PreparedDispatch, prepare_dispatch};

mod response;
pub use response::{EventResponse, PortalUpdate, RawResponse};

mod store;
pub use store::{Blob, EVENT_DATA_KEY, FormField, FormState, FormValue, StateDelta, Store};

/// Formats a number the way the page's JavaScript would (`String(n)`):
/// integral values carry no fraction.
pub(crate) fn number_to_string(number: f64) -> String {
    if number.is_finite() && number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        format!("{number}")
    }
}

pub(crate) fn json_number_to_string(number: &serde_json::Number) -> String {
    if number.is_f64() {
        number
            .as_f64()
            .map(number_to_string)
            .unwrap_or_else(|| number.to_string())
    } else {
        number.to_string()
    }
}
