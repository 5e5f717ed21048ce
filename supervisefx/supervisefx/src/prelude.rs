//! The `SuperviseFX` prelude.

pub use crate::io::{Channel, Transfer};
pub use crate::signal::SignalSource;
pub use crate::util::ResultExt as _;
