pub mod openai;
pub mod provider;
pub mod runner;

pub use openai::OpenAiCompatProvider;
pub use provider::{ChatTurn, InferenceError, InferenceProvider, InferenceStream, Result};
pub use runner::{TurnOutcome, TurnRunner};
