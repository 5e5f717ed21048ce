//! # The Supervise SDK
//! The Supervise SDK provides the wire protocol spoken by `supervise` on its control and status channels, and a blocking
//! client for the owner side of those channels.

pub mod error;
pub mod prelude;
pub mod protocol;

#[cfg(feature = "blocking")]
pub mod blocking;

pub use error::Error;
