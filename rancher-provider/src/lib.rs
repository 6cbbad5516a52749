//! Vagrant lifecycle control for a Homestead box.
//!
//! [`LifecycleController`] is the entry point for presentation code: it
//! starts, suspends, halts, destroys and provisions the box, and reports what
//! `vagrant status` says afterwards as a [`StatusReport`].

pub mod existence;
pub mod lifecycle;
pub mod status;

pub use existence::Existence;
pub use lifecycle::{LifecycleController, StatusReport, Summary, Transition};
pub use status::{classify, VmStatus};
