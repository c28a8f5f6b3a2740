//! Pending-call table: tracks outstanding requests awaiting a reply, with
//! timeout and shutdown resolution.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::DuplicateIdError;

/// How a parked call was ultimately resolved.
#[derive(Debug)]
pub enum Completion {
    Value(Vec<u8>),
    RemoteError(String),
    Timeout,
    Shutdown,
}

struct PendingSlot {
    deadline: Instant,
    sender: oneshot::Sender<Completion>,
}

/// `packet_id -> PendingSlot`, guarded by a plain mutex: slots are held only
/// long enough to insert, remove, or scan for expiry, never across an await.
#[derive(Default)]
pub struct PendingCallTable {
    slots: Mutex<HashMap<u32, PendingSlot>>,
}

impl PendingCallTable {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Park a new call under `packet_id`, returning the receiver half that
    /// resolves exactly once. Fails if `packet_id` is already parked — this
    /// should never happen given a correct [`rpc_protocol::PacketIdSource`].
    pub fn park(
        &self,
        packet_id: u32,
        deadline: Instant,
    ) -> Result<oneshot::Receiver<Completion>, DuplicateIdError> {
        let (sender, receiver) = oneshot::channel();
        let mut slots = self.slots.lock().expect("pending call table mutex poisoned");
        if slots.contains_key(&packet_id) {
            return Err(DuplicateIdError(packet_id));
        }
        slots.insert(packet_id, PendingSlot { deadline, sender });
        Ok(receiver)
    }

    pub fn complete_value(&self, packet_id: u32, body: Vec<u8>) {
        self.complete(packet_id, Completion::Value(body));
    }

    pub fn complete_remote_error(&self, packet_id: u32, message: String) {
        self.complete(packet_id, Completion::RemoteError(message));
    }

    fn complete(&self, packet_id: u32, completion: Completion) {
        let slot = self
            .slots
            .lock()
            .expect("pending call table mutex poisoned")
            .remove(&packet_id);
        match slot {
            // A dropped receiver (caller gave up) makes this a no-op: the
            // write-once contract never surfaces an error here.
            Some(slot) => {
                let _ = slot.sender.send(completion);
            }
            None => debug!(packet_id, "late or duplicate completion dropped"),
        }
    }

    /// Resolve every parked call as `Shutdown`, draining every parked sender.
    pub fn take_all(&self) -> usize {
        let slots: Vec<_> = self
            .slots
            .lock()
            .expect("pending call table mutex poisoned")
            .drain()
            .map(|(_, slot)| slot)
            .collect();
        let count = slots.len();
        for slot in slots {
            let _ = slot.sender.send(Completion::Shutdown);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.slots.lock().expect("pending call table mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep_expired(&self) {
        let now = Instant::now();
        let expired: Vec<_> = {
            let mut slots = self.slots.lock().expect("pending call table mutex poisoned");
            let expired_ids: Vec<u32> = slots
                .iter()
                .filter(|(_, slot)| slot.deadline <= now)
                .map(|(id, _)| *id)
                .collect();
            expired_ids
                .into_iter()
                .filter_map(|id| slots.remove(&id))
                .collect()
        };
        for slot in expired {
            let _ = slot.sender.send(Completion::Timeout);
        }
    }
}

/// Spawn the background task that periodically sweeps expired calls. The
/// session aborts this handle on shutdown.
pub fn spawn_timeout_sweep(table: Arc<PendingCallTable>, timeout: Duration) -> JoinHandle<()> {
    let interval = (timeout / 10).max(Duration::from_millis(10));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            table.sweep_expired();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parking_the_same_id_twice_fails() {
        let table = PendingCallTable::default();
        let deadline = Instant::now() + Duration::from_secs(1);
        let _first = table.park(7, deadline).unwrap();
        let err = table.park(7, deadline).unwrap_err();
        assert_eq!(err.0, 7);
    }

    #[tokio::test]
    async fn completing_a_parked_call_resolves_its_receiver() {
        let table = PendingCallTable::default();
        let deadline = Instant::now() + Duration::from_secs(1);
        let receiver = table.park(3, deadline).unwrap();
        table.complete_value(3, vec![1, 2, 3]);
        match receiver.await.unwrap() {
            Completion::Value(body) => assert_eq!(body, vec![1, 2, 3]),
            other => panic!("expected Value, got {other:?}"),
        }
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn a_late_completion_for_an_unknown_id_is_a_silent_no_op() {
        let table = PendingCallTable::default();
        table.complete_value(99, vec![]);
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn take_all_resolves_every_parked_call_as_shutdown() {
        let table = PendingCallTable::default();
        let deadline = Instant::now() + Duration::from_secs(10);
        let a = table.park(1, deadline).unwrap();
        let b = table.park(2, deadline).unwrap();

        assert_eq!(table.take_all(), 2);

        assert!(matches!(a.await.unwrap(), Completion::Shutdown));
        assert!(matches!(b.await.unwrap(), Completion::Shutdown));
    }

    #[tokio::test(start_paused = true)]
    async fn the_sweep_task_times_out_calls_past_their_deadline() {
        let table = PendingCallTable::new();
        let receiver = table.park(1, Instant::now() + Duration::from_millis(50)).unwrap();
        let _sweep = spawn_timeout_sweep(table.clone(), Duration::from_millis(50));

        tokio::time::advance(Duration::from_millis(200)).await;

        assert!(matches!(receiver.await.unwrap(), Completion::Timeout));
    }
}
