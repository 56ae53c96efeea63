//! Stateful SSE-to-SSE translation (§4.D): one state machine instance per
//! in-flight streaming request, fed upstream chunks and drained into
//! Messages-format SSE events.

pub mod completions;
pub mod generative;
