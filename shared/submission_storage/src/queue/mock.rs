use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;

use crate::queue::{
    error::{QueueError, QueueResult},
    transport::QueueTransport,
    types::{ReceiveRequest, ReceivedMessage},
};

#[derive(Debug, Clone)]
struct StoredMessage {
    message_id: String,
    body: Option<String>,
}

/// In-memory visibility-timeout queue with call counters and failure switches
///
/// Received messages move to an in-flight set keyed by receipt handle until
/// they are deleted or [`InMemoryTransport::expire_in_flight`] makes them
/// visible again. Every delivery gets a fresh receipt handle.
#[derive(Default)]
pub struct InMemoryTransport {
    visible: Mutex<VecDeque<StoredMessage>>,
    in_flight: Mutex<HashMap<String, StoredMessage>>,
    sequence: AtomicUsize,
    receive_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    send_calls: AtomicUsize,
    fail_receive: AtomicBool,
    fail_delete: AtomicBool,
    fail_send: AtomicBool,
    receive_requests: Mutex<Vec<ReceiveRequest>>,
}

impl InMemoryTransport {
    /// Creates an empty transport
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.sequence.fetch_add(1, Ordering::SeqCst))
    }

    /// Makes a message with the given raw body visible, returning its ID
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned
    pub fn push_raw(&self, body: Option<String>) -> String {
        let message_id = self.next_id("msg");
        self.visible.lock().unwrap().push_back(StoredMessage {
            message_id: message_id.clone(),
            body,
        });
        message_id
    }

    /// Returns every in-flight message to the visible set, as if their
    /// visibility timeout had expired
    ///
    /// # Panics
    ///
    /// Panics if an internal lock is poisoned
    pub fn expire_in_flight(&self) {
        let expired: Vec<StoredMessage> = self
            .in_flight
            .lock()
            .unwrap()
            .drain()
            .map(|(_, message)| message)
            .collect();
        self.visible.lock().unwrap().extend(expired);
    }

    /// Number of visible messages
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned
    pub fn visible_len(&self) -> usize {
        self.visible.lock().unwrap().len()
    }

    /// Number of received but not yet deleted messages
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }

    /// Bodies of all visible messages, oldest first
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned
    pub fn visible_bodies(&self) -> Vec<Option<String>> {
        self.visible
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.body.clone())
            .collect()
    }

    /// Number of receive calls made
    pub fn receive_calls(&self) -> usize {
        self.receive_calls.load(Ordering::SeqCst)
    }

    /// Number of delete calls made
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Number of send calls made
    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    /// Parameters of every receive call, in order
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned
    pub fn receive_requests(&self) -> Vec<ReceiveRequest> {
        self.receive_requests.lock().unwrap().clone()
    }

    /// Makes every receive call fail
    pub fn fail_receive(&self, fail: bool) {
        self.fail_receive.store(fail, Ordering::SeqCst);
    }

    /// Makes every delete call fail
    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    /// Makes every send call fail
    pub fn fail_send(&self, fail: bool) {
        self.fail_send.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl QueueTransport for InMemoryTransport {
    async fn receive(
        &self,
        _queue_url: &str,
        request: ReceiveRequest,
    ) -> QueueResult<Vec<ReceivedMessage>> {
        self.receive_calls.fetch_add(1, Ordering::SeqCst);
        self.receive_requests.lock().unwrap().push(request);
        if self.fail_receive.load(Ordering::SeqCst) {
            return Err(QueueError::Unavailable);
        }

        let max = usize::try_from(request.max_messages).unwrap_or(0);
        let mut visible = self.visible.lock().unwrap();
        let batch: Vec<StoredMessage> = (0..max).map_while(|_| visible.pop_front()).collect();
        drop(visible);

        let mut in_flight = self.in_flight.lock().unwrap();
        Ok(batch
            .into_iter()
            .map(|message| {
                let receipt_handle = self.next_id("receipt");
                in_flight.insert(receipt_handle.clone(), message.clone());
                ReceivedMessage {
                    message_id: message.message_id,
                    receipt_handle,
                    body: message.body,
                }
            })
            .collect())
    }

    async fn delete(&self, _queue_url: &str, receipt_handle: &str) -> QueueResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(QueueError::Unavailable);
        }

        self.in_flight
            .lock()
            .unwrap()
            .remove(receipt_handle)
            .map(|_| ())
            .ok_or_else(|| QueueError::UnknownReceipt(receipt_handle.to_string()))
    }

    async fn send(&self, _queue_url: &str, body: String) -> QueueResult<String> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(QueueError::Unavailable);
        }

        Ok(self.push_raw(Some(body)))
    }
}
