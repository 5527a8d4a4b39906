#![forbid(unsafe_code)]
#![warn(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! Fan-out hub that distributes one producer's items to many subscribers.
//!
//! Every subscriber owns an unbounded queue, so a stalled consumer never blocks
//! the producer or its peers. The trade-off is memory: a consumer that stops
//! reading grows its queue without bound until it unsubscribes or the hub shuts
//! down. Items are shared as `Arc<T>` and never mutated after publish.
//!
//! Registration is guarded by a single mutex. Publishing holds that lock while
//! enqueueing, which makes "registered before the publish" well defined: a
//! subscriber either sees an item or was registered after it.

use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError};
use tokio_stream::Stream;
use tracing::debug;

/// Identifier assigned to each registered subscriber.
type SubscriberId = u64;

/// Outcome of a [`Broadcaster::publish`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The item was enqueued for this many live subscribers.
    Delivered {
        /// Number of subscribers that received the item.
        subscribers: usize,
    },
    /// The hub has shut down; the item was dropped.
    Closed,
}

struct Registry<T> {
    next_id: SubscriberId,
    subscribers: BTreeMap<SubscriberId, UnboundedSender<Arc<T>>>,
    closed: bool,
}

impl<T> Registry<T> {
    const fn new() -> Self {
        Self {
            next_id: 1,
            subscribers: BTreeMap::new(),
            closed: false,
        }
    }
}

fn lock<T>(registry: &Mutex<Registry<T>>) -> MutexGuard<'_, Registry<T>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Publish/subscribe hub with one producer and any number of subscribers.
pub struct Broadcaster<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T> Clone for Broadcaster<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T> Default for Broadcaster<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Broadcaster<T> {
    /// Construct an empty hub that accepts publishes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::new())),
        }
    }

    /// Register a new subscriber.
    ///
    /// The returned [`DoneSignal`] unregisters the subscriber when closed or
    /// dropped, so keep it alive for as long as the subscription is wanted.
    /// Subscribing after [`Broadcaster::shutdown`] yields a subscription that
    /// is already closed.
    #[must_use]
    pub fn subscribe(&self) -> (Subscription<T>, DoneSignal<T>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        if registry.closed {
            drop(sender);
        } else {
            registry.subscribers.insert(id, sender);
        }
        drop(registry);

        (
            Subscription { receiver },
            DoneSignal {
                id,
                registry: Arc::downgrade(&self.registry),
            },
        )
    }

    /// Deliver `item` to every currently registered subscriber, in call order.
    ///
    /// Subscribers whose receiving half has been dropped are pruned on the way.
    /// After shutdown this is a no-op that returns [`Delivery::Closed`].
    pub fn publish(&self, item: T) -> Delivery {
        let item = Arc::new(item);
        let mut registry = lock(&self.registry);
        if registry.closed {
            return Delivery::Closed;
        }
        registry
            .subscribers
            .retain(|_, sender| sender.send(Arc::clone(&item)).is_ok());
        Delivery::Delivered {
            subscribers: registry.subscribers.len(),
        }
    }

    /// Stop accepting publishes and close every subscriber channel.
    ///
    /// Items already queued remain readable; each subscription then yields `None`.
    /// Calling this more than once is harmless.
    pub fn shutdown(&self) {
        let mut registry = lock(&self.registry);
        if registry.closed {
            return;
        }
        registry.closed = true;
        let dropped = registry.subscribers.len();
        registry.subscribers.clear();
        debug!(subscribers = dropped, "broadcaster shut down");
    }

    /// Whether [`Broadcaster::shutdown`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        lock(&self.registry).closed
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).subscribers.len()
    }
}

/// Consumer half of a subscription: an ordered queue of published items.
pub struct Subscription<T> {
    receiver: UnboundedReceiver<Arc<T>>,
}

impl<T> Subscription<T> {
    /// Wait for the next item; `None` once the subscription is closed and drained.
    pub async fn recv(&mut self) -> Option<Arc<T>> {
        self.receiver.recv().await
    }

    /// Take the next queued item without waiting.
    ///
    /// Returns `Ok(None)` when nothing is queued yet and `Err(Closed)` once the
    /// channel is closed and drained.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionClosed`] when no further items can arrive.
    pub fn try_recv(&mut self) -> Result<Option<Arc<T>>, SubscriptionClosed> {
        match self.receiver.try_recv() {
            Ok(item) => Ok(Some(item)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(SubscriptionClosed),
        }
    }
}

impl<T> Stream for Subscription<T> {
    type Item = Arc<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// Returned by [`Subscription::try_recv`] once the subscription can yield nothing more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionClosed;

impl std::fmt::Display for SubscriptionClosed {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("subscription closed")
    }
}

impl std::error::Error for SubscriptionClosed {}

/// Control half of a subscription; closing it unregisters the subscriber.
pub struct DoneSignal<T> {
    id: SubscriberId,
    registry: Weak<Mutex<Registry<T>>>,
}

impl<T> DoneSignal<T> {
    /// Unregister the subscriber and close its channel.
    pub fn close(self) {
        drop(self);
    }

    fn unregister(&self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).subscribers.remove(&self.id);
        }
    }
}

impl<T> Drop for DoneSignal<T> {
    fn drop(&mut self) {
        self.unregister();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    const RECV_TIMEOUT: Duration = Duration::from_millis(200);

    fn drain(subscription: &mut Subscription<u32>) -> Vec<u32> {
        let mut items = Vec::new();
        while let Ok(Some(item)) = subscription.try_recv() {
            items.push(*item);
        }
        items
    }

    #[tokio::test]
    async fn subscribers_receive_items_in_publish_order() {
        let hub = Broadcaster::new();
        let (mut first, _first_done) = hub.subscribe();
        let (mut second, _second_done) = hub.subscribe();

        for value in 0..50 {
            assert_eq!(hub.publish(value), Delivery::Delivered { subscribers: 2 });
        }

        let expected: Vec<u32> = (0..50).collect();
        assert_eq!(drain(&mut first), expected);
        assert_eq!(drain(&mut second), expected);
    }

    #[tokio::test]
    async fn late_subscribers_do_not_see_earlier_items() {
        let hub = Broadcaster::new();
        let (mut early, _early_done) = hub.subscribe();
        let _ = hub.publish(1);
        let (mut late, _late_done) = hub.subscribe();
        let _ = hub.publish(2);

        assert_eq!(drain(&mut early), vec![1, 2]);
        assert_eq!(drain(&mut late), vec![2]);
    }

    #[tokio::test]
    async fn closing_done_signal_stops_delivery_to_that_subscriber_only() {
        let hub = Broadcaster::new();
        let (mut leaving, leaving_done) = hub.subscribe();
        let (mut staying, _staying_done) = hub.subscribe();

        let _ = hub.publish(1);
        leaving_done.close();
        assert_eq!(hub.subscriber_count(), 1);
        let _ = hub.publish(2);

        assert_eq!(leaving.recv().await.as_deref(), Some(&1));
        assert!(leaving.recv().await.is_none(), "channel should be closed");
        assert_eq!(drain(&mut staying), vec![1, 2]);
    }

    #[tokio::test]
    async fn shutdown_closes_channels_and_ignores_later_publishes() {
        let hub = Broadcaster::new();
        let (mut subscription, _done) = hub.subscribe();
        let _ = hub.publish(7);

        hub.shutdown();
        assert!(hub.is_closed());
        assert_eq!(hub.publish(8), Delivery::Closed);

        assert_eq!(subscription.recv().await.as_deref(), Some(&7));
        assert!(subscription.recv().await.is_none());
        assert_eq!(subscription.try_recv(), Err(SubscriptionClosed));

        let (mut after, _after_done) = hub.subscribe();
        assert!(after.recv().await.is_none());
    }

    #[tokio::test]
    async fn stalled_subscriber_does_not_block_others() {
        let hub = Broadcaster::new();
        let (_stalled, _stalled_done) = hub.subscribe();
        let (mut active, _active_done) = hub.subscribe();

        let publisher = {
            let hub = hub.clone();
            tokio::spawn(async move {
                for value in 0..1_000 {
                    let _ = hub.publish(value);
                }
            })
        };

        let mut received = 0;
        while received < 1_000 {
            let item = timeout(RECV_TIMEOUT, active.next())
                .await
                .expect("publisher stalled")
                .expect("stream closed");
            assert_eq!(*item, received);
            received += 1;
        }
        publisher.await.expect("publisher task panicked");
    }

    #[tokio::test]
    async fn subscribing_from_a_consumer_does_not_deadlock() {
        let hub: Broadcaster<u32> = Broadcaster::new();
        let (mut subscription, _done) = hub.subscribe();

        let consumer = {
            let hub = hub.clone();
            tokio::spawn(async move {
                let first = subscription.recv().await.expect("first item");
                let (mut nested, nested_done) = hub.subscribe();
                let second = subscription.recv().await.expect("second item");
                let nested_item = nested.recv().await.expect("nested item");
                nested_done.close();
                (*first, *second, *nested_item)
            })
        };

        let _ = hub.publish(1);
        while hub.subscriber_count() < 2 {
            tokio::task::yield_now().await;
        }
        let _ = hub.publish(2);

        let (first, second, nested) = timeout(RECV_TIMEOUT, consumer)
            .await
            .expect("consumer timed out")
            .expect("consumer panicked");
        assert_eq!((first, second, nested), (1, 2, 2));
    }

    #[tokio::test]
    async fn dropped_receivers_are_pruned_on_publish() {
        let hub = Broadcaster::new();
        let (subscription, _done) = hub.subscribe();
        drop(subscription);

        assert_eq!(hub.publish(1), Delivery::Delivered { subscribers: 0 });
        assert_eq!(hub.subscriber_count(), 0);
    }
}
