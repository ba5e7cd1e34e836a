//! Port traits (interfaces)
//!
//! These traits define the boundaries between the receiver core and external I/O.
//! Adapters implement these traits to connect to real hardware and files.

pub mod audio;
pub mod source;
pub mod stations;

pub use audio::*;
pub use source::*;
pub use stations::*;
