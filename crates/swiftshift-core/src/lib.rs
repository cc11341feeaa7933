//! Core of the SwiftShift context-menu engine.
//!
//! This crate is intentionally framework-agnostic. The browser (menus, tabs,
//! notifications) and Telegram live behind ports (traits) implemented in
//! adapter crates; everything here is testable with in-memory fakes.

pub mod activity;
pub mod capture;
pub mod config;
pub mod delivery;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod menu;
pub mod payload;
pub mod ports;
pub mod preview;
pub mod registration;
pub mod router;
pub mod send;
pub mod store;

pub use errors::{Error, Result};
