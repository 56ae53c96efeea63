//! Wire-format type definitions, one module per format, grounded in the
//! teacher's `llm::types::messages::typed` / `completions::typed` split.

pub mod completions;
pub mod generative;
pub mod messages;
