//! Pool configuration, resolved once at startup.

use std::thread;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid job capacity '{0}': expected a positive integer")]
    InvalidCapacity(String),

    #[error("failed to determine available parallelism: {0}")]
    Parallelism(#[from] std::io::Error),
}

/// Admission-control configuration for the job pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of concurrently running jobs. Always >= 1.
    pub capacity: usize,
}

impl PoolConfig {
    /// Resolve the pool capacity from an optional command-line argument.
    ///
    /// With no argument the capacity defaults to the host's available
    /// parallelism. Unparseable or non-positive values are rejected before
    /// any input is read.
    pub fn from_arg(arg: Option<&str>) -> Result<Self, ConfigError> {
        let capacity = match arg {
            Some(raw) => {
                let n: i64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidCapacity(raw.to_string()))?;
                if n <= 0 {
                    return Err(ConfigError::InvalidCapacity(raw.to_string()));
                }
                n as usize
            }
            None => thread::available_parallelism()?.get(),
        };

        Ok(Self { capacity })
    }
}
