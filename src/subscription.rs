//! Subscription engine: long-lived attribute/event report channels.
//!
//! Each subscription runs the state machine
//! `Requested -> Established -> Updating -> Terminated`; nothing leaves
//! `Terminated`. The engine holds only a sender and a phase flag per live
//! subscription, keyed by a random id; the consumer owns the
//! [Subscription] handle for its whole lifetime. Events are delivered in
//! strict arrival order over a bounded channel, and cancellation from the
//! consumer side releases the engine entry on the next producer call.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::interaction::ReadResponse;
use crate::path::{AttributePath, EventPath};

const EVENT_CHANNEL_SIZE: usize = 32;

/// Subscription over a set of paths with a negotiated reporting interval
/// range in seconds.
#[derive(Debug, Clone)]
pub struct SubscribeRequest {
    pub attribute_paths: Vec<AttributePath>,
    pub event_paths: Vec<EventPath>,
    pub min_interval: Duration,
    pub max_interval: Duration,
}

impl SubscribeRequest {
    pub fn attributes(paths: Vec<AttributePath>, min_interval: Duration, max_interval: Duration) -> Self {
        Self {
            attribute_paths: paths,
            event_paths: Vec::new(),
            min_interval,
            max_interval,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("invalid reporting interval: min {min:?} exceeds max {max:?}")]
    InvalidInterval { min: Duration, max: Duration },
    #[error("subscription {0} is not active")]
    NotActive(u32),
    #[error("subscription {0} already established")]
    AlreadyEstablished(u32),
    #[error("update delivered before establish on subscription {0}")]
    NotEstablished(u32),
    #[error("subscription terminated, cause {cause}")]
    Terminated { cause: u32 },
}

/// One event on the subscription channel. The first event is always
/// `Established`; `Error` is terminal and is followed by channel close.
#[derive(Debug, Clone)]
pub enum SubscriptionState {
    Established,
    Update(ReadResponse),
    Error(SubscriptionError),
}

/// Consumer side of a subscription. Dropping or cancelling the handle stops
/// producer delivery; the engine entry is reaped on the next producer call.
pub struct Subscription {
    id: u32,
    rx: mpsc::Receiver<SubscriptionState>,
    cancel: CancellationToken,
}

impl Subscription {
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Receive the next event. Returns None once the channel is closed
    /// (after a terminal error, or engine shutdown).
    pub async fn next(&mut self) -> Option<SubscriptionState> {
        self.rx.recv().await
    }

    /// Receive without blocking.
    pub fn try_next(&mut self) -> Option<SubscriptionState> {
        self.rx.try_recv().ok()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Track {
    tx: mpsc::Sender<SubscriptionState>,
    established: bool,
    cancel: CancellationToken,
}

/// Producer-side registry driving all live subscriptions of one controller.
///
/// A controller implementation registers the subscription, then feeds it
/// with `establish`, `update` and `fail` as report messages arrive.
pub struct SubscriptionEngine {
    subs: Mutex<HashMap<u32, Track>>,
}

impl SubscriptionEngine {
    pub fn new() -> Self {
        Self {
            subs: Mutex::new(HashMap::new()),
        }
    }

    /// Validate the request and allocate a subscription channel.
    pub fn register(&self, request: &SubscribeRequest) -> Result<Subscription, SubscriptionError> {
        if request.min_interval > request.max_interval {
            return Err(SubscriptionError::InvalidInterval {
                min: request.min_interval,
                max: request.max_interval,
            });
        }
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let cancel = CancellationToken::new();
        let mut subs = self.subs.lock().unwrap();
        let mut id: u32 = rand::random();
        while subs.contains_key(&id) {
            id = rand::random();
        }
        subs.insert(
            id,
            Track {
                tx,
                established: false,
                cancel: cancel.clone(),
            },
        );
        log::debug!(
            "subscription {} registered, {} attribute path(s), {} event path(s), interval {:?}..{:?}",
            id,
            request.attribute_paths.len(),
            request.event_paths.len(),
            request.min_interval,
            request.max_interval
        );
        Ok(Subscription { id, rx, cancel })
    }

    fn remove(&self, id: u32) {
        self.subs.lock().unwrap().remove(&id);
    }

    /// Look up the sender for a live, non-cancelled subscription. Cancelled
    /// entries are reaped here.
    fn sender(&self, id: u32, for_update: bool) -> Result<(mpsc::Sender<SubscriptionState>, CancellationToken), SubscriptionError> {
        let mut subs = self.subs.lock().unwrap();
        let track = subs.get(&id).ok_or(SubscriptionError::NotActive(id))?;
        if track.cancel.is_cancelled() {
            subs.remove(&id);
            log::debug!("subscription {} cancelled by consumer, releasing", id);
            return Err(SubscriptionError::NotActive(id));
        }
        if for_update && !track.established {
            return Err(SubscriptionError::NotEstablished(id));
        }
        Ok((track.tx.clone(), track.cancel.clone()))
    }

    async fn deliver(
        &self,
        id: u32,
        tx: mpsc::Sender<SubscriptionState>,
        cancel: CancellationToken,
        state: SubscriptionState,
    ) -> Result<(), SubscriptionError> {
        tokio::select! {
            _ = cancel.cancelled() => {
                self.remove(id);
                Err(SubscriptionError::NotActive(id))
            }
            sent = tx.send(state) => {
                if sent.is_err() {
                    // receiver dropped
                    self.remove(id);
                    return Err(SubscriptionError::NotActive(id));
                }
                Ok(())
            }
        }
    }

    /// Move the subscription to Established and emit the marker event. Must
    /// be the first event on the channel.
    pub async fn establish(&self, id: u32) -> Result<(), SubscriptionError> {
        let (tx, cancel) = {
            let mut subs = self.subs.lock().unwrap();
            let track = subs.get_mut(&id).ok_or(SubscriptionError::NotActive(id))?;
            if track.cancel.is_cancelled() {
                subs.remove(&id);
                return Err(SubscriptionError::NotActive(id));
            }
            if track.established {
                return Err(SubscriptionError::AlreadyEstablished(id));
            }
            track.established = true;
            (track.tx.clone(), track.cancel.clone())
        };
        log::debug!("subscription {} established", id);
        self.deliver(id, tx, cancel, SubscriptionState::Established)
            .await
    }

    /// Deliver one node-state update batch.
    pub async fn update(&self, id: u32, batch: ReadResponse) -> Result<(), SubscriptionError> {
        let (tx, cancel) = self.sender(id, true)?;
        log::trace!(
            "subscription {} update, {} success(es) {} failure(s)",
            id,
            batch.successes.len(),
            batch.failures.len()
        );
        self.deliver(id, tx, cancel, SubscriptionState::Update(batch))
            .await
    }

    /// Terminate with an error. The entry is removed first, so no later
    /// event can fire; closing the sender ends the consumer stream after
    /// the error is observed.
    pub async fn fail(&self, id: u32, cause: u32) -> Result<(), SubscriptionError> {
        let track = {
            let mut subs = self.subs.lock().unwrap();
            subs.remove(&id).ok_or(SubscriptionError::NotActive(id))?
        };
        log::debug!("subscription {} terminated, cause {}", id, cause);
        if !track.cancel.is_cancelled() {
            let _ = track
                .tx
                .send(SubscriptionState::Error(SubscriptionError::Terminated {
                    cause,
                }))
                .await;
        }
        Ok(())
    }

    pub fn is_active(&self, id: u32) -> bool {
        self.subs.lock().unwrap().contains_key(&id)
    }
}

impl Default for SubscriptionEngine {
    fn default() -> Self {
        Self::new()
    }
}
