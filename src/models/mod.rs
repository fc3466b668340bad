//! Data models for the fetch controller
//!
//! The request handed to the transport and the state published to callers.

pub mod request;
pub mod state;

// Re-export commonly used types
pub use request::FetchRequest;
pub use state::{ControllerState, ErrorInfo, ResponseData};
