use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::{debug, trace};

use crate::events::ConnectionState;
use crate::handlers::CommandFrame;
use crate::protocol::ChannelId;

/// One step of a queued transaction.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum QueuedAction {
    Write {
        channel: ChannelId,
        frame: CommandFrame,
    },
    Subscribe(ChannelId),
    RequestDeviceInfo,
    RequestBatteryInfo,
    SetState(ConnectionState),
}

/// An ordered group of actions transmitted back to back.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct Transaction {
    label: &'static str,
    actions: Vec<QueuedAction>,
}

impl Transaction {
    pub(crate) fn new(label: &'static str) -> Self {
        Self {
            label,
            actions: Vec::new(),
        }
    }

    pub(crate) fn write(mut self, channel: ChannelId, frame: CommandFrame) -> Self {
        self.actions.push(QueuedAction::Write { channel, frame });
        self
    }

    pub(crate) fn subscribe(mut self, channel: ChannelId) -> Self {
        self.actions.push(QueuedAction::Subscribe(channel));
        self
    }

    pub(crate) fn request_device_info(mut self) -> Self {
        self.actions.push(QueuedAction::RequestDeviceInfo);
        self
    }

    pub(crate) fn request_battery_info(mut self) -> Self {
        self.actions.push(QueuedAction::RequestBatteryInfo);
        self
    }

    pub(crate) fn set_state(mut self, state: ConnectionState) -> Self {
        self.actions.push(QueuedAction::SetState(state));
        self
    }

    pub(crate) fn label(&self) -> &'static str {
        self.label
    }

    pub(crate) fn into_actions(self) -> Vec<QueuedAction> {
        self.actions
    }
}

#[derive(Debug, Default)]
struct QueueInner {
    state: ConnectionState,
    pending: VecDeque<Transaction>,
}

/// Outgoing transaction queue and connection state behind one lock.
///
/// Transactions already taken by [`CommandQueue::pop`] are in flight and are
/// never affected by a later clear.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    inner: Arc<Mutex<QueueInner>>,
    work: Arc<Notify>,
}

impl CommandQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drops every queued transaction, then queues `transactions` in order.
    pub(crate) fn replace_pending(&self, transactions: impl IntoIterator<Item = Transaction>) {
        {
            let mut inner = self.lock();
            let discarded = inner.pending.len();
            inner.pending.clear();
            inner.pending.extend(transactions);
            if discarded > 0 {
                debug!(discarded, "cleared unsent transactions");
            }
        }
        self.work.notify_one();
    }

    /// Appends a transaction behind anything already queued.
    #[cfg(test)]
    pub(crate) fn enqueue(&self, transaction: Transaction) {
        self.lock().pending.push_back(transaction);
        self.work.notify_one();
    }

    /// Takes the oldest queued transaction.
    pub(crate) fn pop(&self) -> Option<Transaction> {
        let transaction = self.lock().pending.pop_front();
        if let Some(transaction) = &transaction {
            trace!(label = transaction.label(), "dequeued transaction");
        }
        transaction
    }

    /// Number of transactions waiting to be transmitted.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    /// Stores a new state, returning whether it changed.
    pub(crate) fn set_state(&self, state: ConnectionState) -> bool {
        let mut inner = self.lock();
        let changed = inner.state != state;
        inner.state = state;
        changed
    }

    /// Clears queued work and resets to [`ConnectionState::Disconnected`].
    pub(crate) fn reset(&self) -> bool {
        let mut inner = self.lock();
        inner.pending.clear();
        let changed = inner.state != ConnectionState::Disconnected;
        inner.state = ConnectionState::Disconnected;
        changed
    }

    /// Resolves once work has been queued since the last wake-up.
    pub(crate) async fn work_available(&self) {
        self.work.notified().await;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::handlers::FrameCodec;

    fn write_tx(label: &'static str) -> Transaction {
        Transaction::new(label).write(ChannelId::ControlPoint, FrameCodec::encode_find_device())
    }

    #[test]
    fn replace_pending_discards_unsent_work() {
        let queue = CommandQueue::new();
        queue.enqueue(write_tx("a"));
        queue.enqueue(write_tx("b"));

        queue.replace_pending([write_tx("c")]);

        assert_eq!(1, queue.pending_len());
        assert_eq!(Some("c"), queue.pop().map(|tx| tx.label()));
        assert_eq!(None, queue.pop());
    }

    #[test]
    fn popped_transaction_survives_later_clear() {
        let queue = CommandQueue::new();
        queue.enqueue(write_tx("in-flight"));
        let in_flight = queue.pop().expect("queued transaction");

        queue.replace_pending([write_tx("next")]);

        assert_eq!("in-flight", in_flight.label());
        assert_eq!(1, in_flight.into_actions().len());
        assert_eq!(1, queue.pending_len());
    }

    #[test]
    fn reset_clears_work_and_state() {
        let queue = CommandQueue::new();
        queue.set_state(ConnectionState::Initialized);
        queue.enqueue(write_tx("a"));

        assert!(queue.reset());
        assert_eq!(ConnectionState::Disconnected, queue.state());
        assert_eq!(0, queue.pending_len());
        assert!(!queue.reset());
    }

    #[test]
    fn clones_share_one_critical_section() {
        let queue = CommandQueue::new();
        let other = queue.clone();
        other.set_state(ConnectionState::Initializing);
        other.enqueue(write_tx("a"));

        assert_eq!(ConnectionState::Initializing, queue.state());
        assert_eq!(1, queue.pending_len());
    }

    #[tokio::test]
    async fn work_available_resolves_after_enqueue() {
        let queue = CommandQueue::new();
        queue.enqueue(write_tx("a"));
        tokio::time::timeout(std::time::Duration::from_secs(1), queue.work_available())
            .await
            .expect("queued work should wake the waiter");
    }
}
