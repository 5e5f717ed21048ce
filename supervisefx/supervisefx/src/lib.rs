//! # SuperviseFX
//! Base OS support library of `supervise`. This is internal to the `supervise` project and is NOT subjected to be published
//! as a part of the Supervise SDK.

pub mod log;
pub mod prelude;
pub mod util;

pub use supervisefx_env as env;
pub use supervisefx_io as io;
pub use supervisefx_process as process;
pub use supervisefx_signal as signal;
