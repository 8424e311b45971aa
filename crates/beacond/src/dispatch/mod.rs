//! JSONL request dispatch.
//!
//! Each connection sends one JSON object per line:
//!
//! ```json
//! {"UUID":"client-1","ACTION":"set","ID":"r1","sede":"Centro"}
//! ```
//!
//! and receives exactly one line back, either a success
//! `{"action":"set","data":{...}}` or a failure `{"error":"..."}`. A
//! `subscribe` request is acknowledged with
//! `{"action":"subscribe","status":"subscribed","uuid":"client-1"}` and the
//! connection then carries change notifications until it closes.

mod errors;
mod handler;
mod request;
mod response;
mod router;

pub use self::errors::{DispatchError, StoreOperation};
pub use self::handler::{ConnectionSettings, DispatchConnectionHandler};
pub use self::request::{
    ACTION_FIELD, Action, CLIENT_ID_FIELD, ID_FIELD, RECORD_ATTRIBUTES, RawRequest, Request,
};
pub use self::response::{Response, ResponseData, ResponseWriter, SUBSCRIBED_STATUS};
pub use self::router::{Routed, Router};
