//! Dispatch loop: read input lines, admit, spawn, and finally drain.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::config::PoolConfig;
use crate::pool::{SlotTable, drain, ensure_free_slot};
use crate::spawn::{JobCommand, JobSpawner};

/// Single control flow tying the input stream to the slot table.
///
/// Jobs are spawned strictly in input order, gated only by slot
/// availability; they complete in whatever order the OS delivers.
pub struct Dispatcher {
    table: SlotTable,
    spawner: Arc<dyn JobSpawner>,
}

impl Dispatcher {
    pub fn new(config: &PoolConfig, spawner: Arc<dyn JobSpawner>) -> Self {
        Self {
            table: SlotTable::new(config.capacity),
            spawner,
        }
    }

    /// Run every job in `input` (one shell command per line, blank lines
    /// skipped), then wait for the stragglers.
    ///
    /// A failed read still drains before the error is returned, so no child
    /// is ever left unreaped by the launcher.
    pub async fn run<R>(&mut self, input: R) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let result = self.dispatch(input).await;
        self.drain().await;
        result
    }

    async fn dispatch<R>(&mut self, input: R) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            ensure_free_slot(&mut self.table).await;

            let job = JobCommand::shell(line);
            match self.spawner.spawn(&job) {
                Ok(child) => {
                    let pid = child.id().unwrap_or_default();
                    let slot = self.table.occupy(child);
                    tracing::info!(%slot, pid, command = %job, "launched job");
                }
                Err(e) => {
                    // The job never existed: no slot is consumed.
                    tracing::warn!(command = %job, error = %e, "failed to launch job");
                }
            }
        }
        Ok(())
    }

    /// Wait for every outstanding job. Idempotent.
    pub async fn drain(&mut self) {
        drain(&mut self.table).await;
    }

    /// Number of jobs currently occupying slots.
    pub fn outstanding(&self) -> usize {
        self.table.len()
    }
}
