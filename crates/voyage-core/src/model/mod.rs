//! Upstream generative-text model interface.
//!
//! The [`TextModel`] trait is what the relay drives; [`GeminiClient`] is
//! the production implementation over the Gemini REST API.
//!
//! ```text
//! Relay --generate(req)--------> String
//!       --generate_stream(req)-> TextStream (lazy; dropping it closes the upstream response)
//! ```

pub mod gemini;
pub mod sse;
pub mod trait_def;
pub mod types;

pub use gemini::GeminiClient;
pub use trait_def::TextModel;
pub use types::{GenerationRequest, ModelError, ResponseFormat, TextStream};
