//! The proxy server: request pipeline, upstream forwarding, lifecycle.

pub mod client;
pub mod context;
pub mod forwarding;
pub mod handler;
pub mod lifecycle;
pub mod network;
pub mod response;
pub mod server;

pub use context::{ProxyState, TargetMode};
pub use lifecycle::{LifecycleHandle, ServerState};
pub use server::ProxyServer;
