//! Sync-mode barrier pacing: when `WorkerConfig.sync` is set, every Worker
//! waits here after each `do_one()` so the whole population issues its next
//! request in lockstep rather than free-running.
//!
//! Grounded in the original `syncWorkAdd`/`syncWorkWait`/`syncWorkDel` trio —
//! a mutex-guarded registration map plus one oneshot-style gate per
//! participant, released and reset once every registered participant has
//! arrived.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::broadcast;
use tracing::debug;

/// Reusable phase barrier. Participants register once, then call
/// [`SyncBarrier::wait`] after every iteration; dynamic dropout is handled
/// by [`SyncBarrier::leave`].
pub struct SyncBarrier {
    inner: Mutex<Inner>,
}

struct Inner {
    next_id: u64,
    /// One broadcast receiver's sender per registered participant, so a
    /// barrier release can wake everyone without an extra allocation per
    /// round.
    participants: HashMap<u64, broadcast::Sender<()>>,
    arrived: u64,
}

impl SyncBarrier {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner { next_id: 0, participants: HashMap::new(), arrived: 0 }),
        }
    }

    /// Registers a new participant, returning a handle used for `wait`/`leave`.
    pub fn join(&self) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        let (tx, _rx) = broadcast::channel(1);
        debug!(worker = id, "joining sync barrier");
        inner.participants.insert(id, tx);
        id
    }

    /// Deregisters a participant. Safe to call after the participant has
    /// already been released by a `wait`.
    pub fn leave(&self, id: u64) {
        let mut inner = self.inner.lock().unwrap();
        debug!(worker = id, "leaving sync barrier");
        inner.participants.remove(&id);
        // A participant leaving mid-round can make the round completable;
        // release eagerly so the rest aren't stuck waiting on a worker that
        // just terminated.
        if !inner.participants.is_empty() && inner.arrived >= inner.participants.len() as u64 {
            release(&mut inner);
        }
    }

    /// Blocks until every currently-registered participant has called
    /// `wait` for this round, then releases all of them and resets.
    pub async fn wait(&self, id: u64) {
        let mut rx = {
            let mut inner = self.inner.lock().unwrap();
            let rx = match inner.participants.get(&id) {
                Some(tx) => tx.subscribe(),
                None => return,
            };
            inner.arrived += 1;
            if inner.arrived >= inner.participants.len() as u64 {
                release(&mut inner);
            }
            rx
        };
        let _ = rx.recv().await;
    }
}

fn release(inner: &mut Inner) {
    for tx in inner.participants.values() {
        let _ = tx.send(());
    }
    inner.arrived = 0;
}

impl Default for SyncBarrier {
    fn default() -> Self {
        Self::new()
    }
}
