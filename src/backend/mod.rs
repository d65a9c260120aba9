pub mod client;

pub use client::{BackendClient, BackendError, ControlReply};
