//! The Supervise SDK prelude

pub use crate::protocol::{ChildStatus, ControlRequest, Disposition};

#[cfg(feature = "blocking")]
pub use crate::blocking::{Controller, StatusReader};
