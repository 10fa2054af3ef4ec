//! Application layer: the control loop and the rules for remote settings.
//!
//! Nothing in here touches a socket directly.  The scheduler talks to the
//! outside world through the [`scheduler::ConnectionPool`],
//! [`scheduler::SignalSource`] and [`remote_config::ControlSource`]
//! capabilities, which the infrastructure layer implements.

pub mod remote_config;
pub mod scheduler;
