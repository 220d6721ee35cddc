//! HTTP surface exposing the engine to dashboards and CLIs

pub mod server;

pub use server::{ApiServer, ApiServerConfig, EngineHandle};
