//! # teller-core
//!
//! Foundation pieces shared by every teller crate:
//!
//! - **Lifecycle**: a one-shot `Unstarted → Started → Stopped` state machine
//!   guarding components that must be started and stopped exactly once
//!   (the database pool, the REST listener).
//! - **Logging**: `tracing` subscriber setup for binaries and tests.

#![deny(unsafe_code)]

pub mod lifecycle;
pub mod logging;

pub use lifecycle::{Lifecycle, LifecycleError, LifecycleState};
pub use logging::init_subscriber;
