//! A streaming text-generation client over several heterogeneous AI backends.
//!
//! Requests are issued through a [`ProviderClient`] obtained from a [`Registry`].
//! Responses are parsed incrementally into display-ready HTML, an optional
//! reasoning trace and a monotonic [`GenerationPhase`], and reported either through
//! [`GenerationCallbacks`] or as a [`GenerationStream`].

pub mod accumulator;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod processor;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod render;
pub mod response;
pub mod sse_stream;
pub mod thinking;
pub mod types;

// Re-export core types for easy usage
pub use client::ProviderClient;
pub use config::ClientConfig;
pub use credentials::{CredentialStore, EnvCredentials, StaticCredentials};
pub use error::{Error, GenerationError};
pub use provider::{Backend, ParsedChunk, ResponseParser};
pub use registry::{builtin_providers, Registry, CUSTOM_PROVIDER_PREFIX};
pub use response::*;
pub use sse_stream::SseEvent;
pub use types::*;

pub use tokio_util::sync::CancellationToken;
