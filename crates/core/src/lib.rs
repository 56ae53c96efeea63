//! Small shared primitives used across the gateway workspace: a cheap
//! immutable string type and prometheus metric helpers.

pub mod metrics;
pub mod strng;
