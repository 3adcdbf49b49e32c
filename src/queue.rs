//! Bounded queues that drop the oldest entry on overflow.
//!
//! Built on `crossbeam-channel`: the producer keeps a clone of the receiving end
//! so it can evict the head when the channel is full. With a single consumer the
//! queue therefore always holds the newest `capacity` items.
//!
//! Because of that clone the channel itself never reports the consumer as gone.
//! The consumer half carries a liveness token instead, and the producer watches
//! it through a [`Weak`].

use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::ops::Deref;
use std::sync::{Arc, Weak};

pub fn drop_oldest<T>(capacity: usize) -> (DropOldestSender<T>, DropOldestReceiver<T>) {
    let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
    let alive = Arc::new(());
    (
        DropOldestSender {
            tx,
            evict: rx.clone(),
            consumer: Arc::downgrade(&alive),
        },
        DropOldestReceiver { rx, _alive: alive },
    )
}

/// Producer half of [`drop_oldest`]. Never blocks.
pub struct DropOldestSender<T> {
    tx: Sender<T>,
    evict: Receiver<T>,
    consumer: Weak<()>,
}

/// Consumer half of [`drop_oldest`]. Derefs to the underlying receiver, so it
/// works with `try_recv`, `recv_deadline` and `Select`.
pub struct DropOldestReceiver<T> {
    rx: Receiver<T>,
    _alive: Arc<()>,
}

impl<T> Deref for DropOldestReceiver<T> {
    type Target = Receiver<T>;

    fn deref(&self) -> &Receiver<T> {
        &self.rx
    }
}

/// Outcome of a [`DropOldestSender::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Push {
    Queued,
    /// Queued after evicting the oldest item.
    Evicted,
    /// The consumer is gone; the item was discarded.
    Closed,
}

impl<T> DropOldestSender<T> {
    pub fn push(&self, item: T) -> Push {
        if self.is_closed() {
            // Nothing will read what is still buffered either.
            while self.evict.try_recv().is_ok() {}
            return Push::Closed;
        }
        let mut item = match self.tx.try_send(item) {
            Ok(()) => return Push::Queued,
            Err(TrySendError::Disconnected(_)) => return Push::Closed,
            Err(TrySendError::Full(item)) => item,
        };
        // The consumer may drain concurrently; retry until there is room.
        loop {
            let _ = self.evict.try_recv();
            match self.tx.try_send(item) {
                Ok(()) => return Push::Evicted,
                Err(TrySendError::Disconnected(_)) => return Push::Closed,
                Err(TrySendError::Full(back)) => item = back,
            }
        }
    }

    /// True once the [`DropOldestReceiver`] has been dropped.
    pub fn is_closed(&self) -> bool {
        self.consumer.strong_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn overflow_keeps_newest() {
        let (tx, rx) = drop_oldest(2);
        assert_eq!(tx.push(1), Push::Queued);
        assert_eq!(tx.push(2), Push::Queued);
        assert_eq!(tx.push(3), Push::Evicted);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn push_after_consumer_drop_is_closed() {
        let (tx, rx) = drop_oldest::<u8>(1);
        assert!(!tx.is_closed());
        assert_eq!(tx.push(1), Push::Queued);
        drop(rx);
        assert!(tx.is_closed());
        assert_eq!(tx.push(2), Push::Closed);
    }

    #[test]
    fn consumer_dropped_on_another_thread_closes() {
        let (tx, rx) = drop_oldest::<u8>(4);
        tx.push(9);
        thread::spawn(move || {
            assert_eq!(rx.recv().ok(), Some(9));
        })
        .join()
        .unwrap();
        assert!(tx.is_closed());
    }

    #[test]
    fn select_works_through_the_consumer() {
        let (tx, rx) = drop_oldest(1);
        tx.push(5u8);
        let mut select = crossbeam_channel::Select::new();
        select.recv(&*rx);
        assert_eq!(select.ready_timeout(std::time::Duration::from_secs(1)).ok(), Some(0));
        assert_eq!(rx.try_recv().ok(), Some(5));
    }
}
