//! Process pipeline for the box system.
//!
//! Three process applications (users, shippings, negotiations) each own one
//! aggregate type. A declared [`SubscriptionGraph`] routes events between
//! them and the [`Runner`] delivers the notification log along it, one event
//! at a time, committing each policy's output with its projections and
//! tracking position. [`BoxSystem`] exposes the command and query surface.

pub mod error;
pub mod graph;
pub mod process;
pub mod processes;
pub mod runner;
pub mod system;

pub use error::{Result, SystemError};
pub use graph::{ProcessName, Subscription, SubscriptionGraph};
pub use process::Process;
pub use processes::{NegotiationsProcess, ShippingsProcess, UsersProcess};
pub use runner::{Runner, RunnerConfig};
pub use system::BoxSystem;
