pub mod relay;
pub mod sse;

pub use relay::{ChatRequest, RelayTiming, StreamEvent, chunk_text, relay};
pub use sse::{sse_response, to_sse_event};
