//! joblet: a bounded OS-process job pool.
//!
//! Reads opaque shell-command lines and runs each as an independent child
//! process, never allowing more than a fixed number to run at once.
//! Admission is a fixed-capacity slot table; a slot is freed by reaping
//! whichever tracked job happens to finish first.

mod config;
mod dispatch;
mod spawn;

pub mod pool;

pub use config::{ConfigError, PoolConfig};
pub use dispatch::Dispatcher;
pub use spawn::{JobCommand, JobSpawner, ProcessSpawner, SpawnError};
