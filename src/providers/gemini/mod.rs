mod backend;
pub mod types;

pub use backend::{GeminiBackend, GeminiParser};
