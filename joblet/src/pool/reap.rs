//! Freeing slots: the reap protocol and the shutdown drain.
//!
//! Flow:
//! 1. Fast path: a slot is already EMPTY.
//! 2. Poll path: one non-blocking exit check per occupant, index order.
//! 3. Blocking path: suspend until whichever tracked job exits first.

use futures::future;

use super::table::{SlotId, SlotTable};

/// Block until at least one slot in `table` is EMPTY.
///
/// Prefers a non-blocking scan of the occupants; only when every job is
/// still running does it suspend, and then only on the children this table
/// tracks, never on unrelated subprocesses of the embedding program.
pub async fn ensure_free_slot(table: &mut SlotTable) {
    loop {
        if table.has_free_slot() {
            return;
        }

        if let Some(slot) = poll_occupants(table) {
            let _ = table.release(slot);
            return;
        }

        tracing::warn!(
            capacity = table.capacity(),
            "all slots busy; waiting for a job to exit"
        );
        if let Some(slot) = await_any_exit(table).await {
            let _ = table.release(slot);
            return;
        }
        // Transient wait failure: start over from the fast path.
    }
}

/// One non-blocking exit check per occupant, in index order. Returns the
/// first slot whose job has already exited.
fn poll_occupants(table: &mut SlotTable) -> Option<SlotId> {
    let mut exited = None;
    for (slot, child) in table.occupied_mut() {
        match child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!(%slot, %status, "job exited");
                exited = Some(slot);
                break;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(%slot, error = %e, "failed to poll job status");
            }
        }
    }
    exited
}

/// Suspend until one tracked job exits and return its slot, or `None` on a
/// transient wait failure (the caller retries the whole protocol).
async fn await_any_exit(table: &mut SlotTable) -> Option<SlotId> {
    // Child::wait is cancel safe, so the losing waits can be resumed by a
    // later reap or by drain.
    let waits: Vec<_> = table
        .occupied_mut()
        .map(|(slot, child)| Box::pin(async move { (slot, child.wait().await) }))
        .collect();
    if waits.is_empty() {
        tracing::warn!("no jobs to wait for despite a full table; retrying");
        return None;
    }

    let ((slot, result), _index, remaining) = future::select_all(waits).await;
    drop(remaining);

    match result {
        Ok(status) => {
            tracing::debug!(%slot, %status, "job exited");
            Some(slot)
        }
        Err(e) => {
            tracing::warn!(%slot, error = %e, "wait for job failed; retrying");
            None
        }
    }
}

/// Wait for every still-occupied slot's job, in index order, leaving the
/// table fully EMPTY. Draining an already-empty table does nothing.
pub async fn drain(table: &mut SlotTable) {
    if table.is_empty() {
        return;
    }

    tracing::info!(remaining = table.len(), "waiting for all outstanding jobs");
    let occupied: Vec<SlotId> = table.occupied().collect();
    for slot in occupied {
        let Some(child) = table.get_mut(slot) else {
            continue;
        };
        match child.wait().await {
            Ok(status) => tracing::debug!(%slot, %status, "job exited"),
            Err(e) => tracing::warn!(%slot, error = %e, "wait for job failed during drain"),
        }
        let _ = table.release(slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use tokio::process::{Child, Command};

    fn spawn_child(cmd: &str) -> Child {
        Command::new("/bin/sh").arg("-c").arg(cmd).spawn().unwrap()
    }

    #[tokio::test]
    async fn fast_path_when_slot_free() {
        let mut table = SlotTable::new(2);
        let _a = table.occupy(spawn_child("sleep 2"));

        let start = Instant::now();
        ensure_free_slot(&mut table).await;

        assert!(start.elapsed() < Duration::from_millis(100));
        assert!(table.has_free_slot());
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn poll_path_frees_exited_job_without_blocking() {
        let mut table = SlotTable::new(2);
        let _a = table.occupy(spawn_child("sleep 2"));
        let _b = table.occupy(spawn_child("exit 0"));

        // Give the second job time to exit before the scan.
        tokio::time::sleep(Duration::from_millis(200)).await;

        let start = Instant::now();
        ensure_free_slot(&mut table).await;

        assert!(start.elapsed() < Duration::from_millis(100));
        assert_eq!(table.len(), 1);
        assert!(table.has_free_slot());
    }

    #[tokio::test]
    async fn blocking_path_waits_for_first_exit() {
        let mut table = SlotTable::new(2);
        let _a = table.occupy(spawn_child("sleep 2"));
        let _b = table.occupy(spawn_child("sleep 0.3"));

        let start = Instant::now();
        ensure_free_slot(&mut table).await;
        let elapsed = start.elapsed();

        assert!(
            elapsed >= Duration::from_millis(250),
            "returned before any job exited: {elapsed:?}"
        );
        assert!(
            elapsed < Duration::from_millis(1500),
            "waited on the wrong job: {elapsed:?}"
        );
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn nonzero_exit_is_reaped_normally() {
        let mut table = SlotTable::new(1);
        let _a = table.occupy(spawn_child("exit 7"));
        tokio::time::sleep(Duration::from_millis(200)).await;

        ensure_free_slot(&mut table).await;
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn drain_waits_for_everything() {
        let mut table = SlotTable::new(3);
        let _a = table.occupy(spawn_child("sleep 0.2"));
        let _b = table.occupy(spawn_child("sleep 0.3"));
        let _c = table.occupy(spawn_child("exit 1"));

        let start = Instant::now();
        drain(&mut table).await;

        assert!(start.elapsed() >= Duration::from_millis(250));
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn drain_on_empty_table_is_immediate() {
        let mut table = SlotTable::new(4);

        let start = Instant::now();
        drain(&mut table).await;
        drain(&mut table).await;

        assert!(start.elapsed() < Duration::from_millis(50));
        assert!(table.is_empty());
    }
}
