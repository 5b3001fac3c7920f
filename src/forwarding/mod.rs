//! Port Forwarding Module
//!
//! Local port forwards run as backgrounded `ssh` multiplexing masters.
//! Their control sockets double as the record of which forwards are open.

pub mod client;
mod error;
pub mod manager;
mod pattern;
pub mod registry;

pub use client::{PortForwardClient, SshForwardClient};
pub use error::ForwardError;
pub use manager::ForwardingManager;
pub use pattern::{is_valid_server_name, ForwardPattern};
pub use registry::{RegistryLock, SocketRegistry};
