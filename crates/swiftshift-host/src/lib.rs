//! Native-messaging host: the process the browser extension talks to.
//!
//! The extension forwards clicks, tab changes and page results over stdio and
//! applies the menu commands and page requests this crate sends back.

pub mod bridge;
pub mod framing;
pub mod host;
pub mod protocol;

pub use bridge::HostBridge;
pub use host::{run_host, HostApp};
