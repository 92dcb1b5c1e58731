pub mod chunker;
pub mod config;
pub mod error;
pub mod naming;
pub mod registry;

pub use chunker::{ChunkSink, StreamChunker};
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use registry::Registry;
