//! Shared protocol definitions for Framecast
//!
//! Plain-data types and message shapes exchanged between the streaming
//! core and the external control/observability layers that drive it.

pub mod messages;
pub mod types;

pub use messages::{ControlRequest, PipelineEvent};
pub use types::*;
