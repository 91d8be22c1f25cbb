pub mod openai;
pub mod scripted;

pub use openai::{OpenAiOracle, OpenAiSettings};
pub use scripted::ScriptedOracle;
