//! Single-writer, many-subscriber broadcast of raw sentence bytes.
//!
//! Modeled as an actor (design note: "Forwarder as an actor"): one task
//! owns the subscriber map and a `tokio::select!` over three channels -
//! `packets` to broadcast, `add` for new subscribers, `closer` for
//! subscriber tasks reporting their own exit. No state is shared with the
//! subscriber tasks themselves; they own their sink exclusively and only
//! ever talk back to the actor through `closer`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// Bound on a subscriber's backlog queue.
pub const CONN_CHANNEL_CAP: usize = 20;
/// Consecutive full-queue drops before a subscriber is evicted.
pub const CLOSE_CONN_AFTER: u32 = 20;

pub type Token = u64;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("forwarder has shut down")]
    ShutDown,
}

struct NewSubscriber {
    token: Token,
    queue: mpsc::Sender<Bytes>,
}

struct Entry {
    queue: mpsc::Sender<Bytes>,
    full_in_a_row: u32,
}

/// Handle used by transport servers to push packets and register
/// subscribers. Cloning is cheap; every clone talks to the same actor.
#[derive(Clone)]
pub struct Handle {
    packets: mpsc::Sender<Bytes>,
    add: mpsc::Sender<NewSubscriber>,
    closer: mpsc::Sender<Token>,
    next_token: Arc<AtomicU64>,
}

/// A freshly registered subscriber: the receiving half of its queue, to be
/// drained by a subscriber task (see [`run_subscriber_task`]), plus the
/// `closer` sender that task must use to report its own exit.
pub struct Subscription {
    pub token: Token,
    pub queue: mpsc::Receiver<Bytes>,
    pub closer: mpsc::Sender<Token>,
}

/// Capacity of the `packets`, `add`, and `closer` actor-input channels.
/// The sentence-pipeline queue per source; not a subscriber-facing bound.
const ACTOR_INPUT_CAP: usize = 200;

impl Handle {
    pub async fn broadcast(&self, packet: Bytes) -> Result<(), Error> {
        self.packets.send(packet).await.map_err(|_| Error::ShutDown)
    }

    pub async fn subscribe(&self) -> Result<Subscription, Error> {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(CONN_CHANNEL_CAP);
        self.add
            .send(NewSubscriber { token, queue: tx })
            .await
            .map_err(|_| Error::ShutDown)?;
        Ok(Subscription {
            token,
            queue: rx,
            closer: self.closer.clone(),
        })
    }
}

/// Builds a forwarder actor and the handle used to talk to it. Callers
/// must `tokio::spawn` the returned future (or poll it some other way) for
/// broadcasts and subscriptions to have any effect.
pub fn spawn() -> (Handle, impl std::future::Future<Output = ()>) {
    let (packets_tx, packets_rx) = mpsc::channel(ACTOR_INPUT_CAP);
    let (add_tx, add_rx) = mpsc::channel(ACTOR_INPUT_CAP);
    let (closer_tx, closer_rx) = mpsc::channel(ACTOR_INPUT_CAP);

    let handle = Handle {
        packets: packets_tx,
        add: add_tx,
        closer: closer_tx,
        next_token: Arc::new(AtomicU64::new(0)),
    };
    let actor = run(packets_rx, add_rx, closer_rx);
    (handle, actor)
}

async fn run(
    mut packets: mpsc::Receiver<Bytes>,
    mut add: mpsc::Receiver<NewSubscriber>,
    mut closer: mpsc::Receiver<Token>,
) {
    let mut subscribers: HashMap<Token, Entry> = HashMap::new();
    loop {
        tokio::select! {
            packet = packets.recv() => {
                match packet {
                    Some(packet) => broadcast_to_all(&mut subscribers, packet),
                    None => break,
                }
            }
            new_sub = add.recv() => {
                if let Some(new_sub) = new_sub {
                    subscribers.insert(new_sub.token, Entry { queue: new_sub.queue, full_in_a_row: 0 });
                }
            }
            token = closer.recv() => {
                if let Some(token) = token {
                    subscribers.remove(&token);
                }
            }
        }
    }
    // Dropping the map closes every subscriber's queue sender, which the
    // subscriber task observes as end-of-stream on its next recv().
}

fn broadcast_to_all(subscribers: &mut HashMap<Token, Entry>, packet: Bytes) {
    let mut evict = Vec::new();
    for (&token, entry) in subscribers.iter_mut() {
        match entry.queue.try_send(packet.clone()) {
            Ok(()) => entry.full_in_a_row = 0,
            Err(mpsc::error::TrySendError::Full(_)) => {
                entry.full_in_a_row += 1;
                if entry.full_in_a_row >= CLOSE_CONN_AFTER {
                    evict.push(token);
                }
            }
            Err(mpsc::error::TrySendError::Closed(_)) => evict.push(token),
        }
    }
    for token in evict {
        subscribers.remove(&token);
    }
}

/// Drains `subscription.queue` and writes each packet to `sink`, retrying
/// a partial write for the remainder. Notifies the forwarder via `closer`
/// on any other write error (a closed forwarder entry means the token was
/// already removed, so the send is simply dropped - no double-close race).
pub async fn run_subscriber_task<W>(mut subscription: Subscription, mut sink: W)
where
    W: AsyncWrite + Unpin,
{
    while let Some(packet) = subscription.queue.recv().await {
        if let Err(_err) = sink.write_all(&packet).await {
            let _ = subscription.closer.try_send(subscription.token);
            break;
        }
    }
    let _ = sink.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn broadcast_delivers_to_subscribed_queue() {
        let (handle, actor) = spawn();
        tokio::spawn(actor);

        let mut sub = handle.subscribe().await.unwrap();
        handle.broadcast(Bytes::from_static(b"hello")).await.unwrap();

        let received = sub.queue.recv().await.unwrap();
        assert_eq!(&received[..], b"hello");
    }

    #[tokio::test]
    async fn full_queue_increments_then_evicts_subscriber() {
        let (handle, actor) = spawn();
        tokio::spawn(actor);

        let sub = handle.subscribe().await.unwrap();
        // Fill the subscriber's queue without ever draining it.
        for _ in 0..CONN_CHANNEL_CAP {
            handle.broadcast(Bytes::from_static(b"x")).await.unwrap();
        }
        // Give the actor a moment to process the backlog before flooding it
        // past the eviction threshold.
        tokio::task::yield_now().await;
        for _ in 0..CLOSE_CONN_AFTER {
            handle.broadcast(Bytes::from_static(b"y")).await.unwrap();
        }
        tokio::task::yield_now().await;

        // The subscriber should have been evicted: its queue sender was
        // dropped, so recv() on the (still-open) receiver yields None once
        // drained.
        let mut queue = sub.queue;
        let mut drained = 0;
        while queue.recv().await.is_some() {
            drained += 1;
            if drained > CONN_CHANNEL_CAP + CLOSE_CONN_AFTER {
                panic!("queue never closed");
            }
        }
    }

    #[tokio::test]
    async fn closing_packets_input_shuts_down_all_subscribers() {
        let (handle, actor) = spawn();
        let actor_handle = tokio::spawn(actor);

        let sub = handle.subscribe().await.unwrap();
        drop(handle);
        actor_handle.await.unwrap();

        let mut queue = sub.queue;
        assert_eq!(queue.recv().await, None);
    }

    #[tokio::test]
    async fn subscriber_task_writes_packets_and_reports_closer_on_write_error() {
        let (handle, actor) = spawn();
        tokio::spawn(actor);

        let sub = handle.subscribe().await.unwrap();
        let (client, server) = duplex(64);
        drop(server); // immediately broken pipe on write

        handle.broadcast(Bytes::from_static(b"data")).await.unwrap();
        run_subscriber_task(sub, client).await;
        // No panic, and the task returns once the queue is drained/closed.
    }
}
