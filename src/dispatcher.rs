/* Multi-subscriber signal dispatch, generalising the source's `on_* += lambda`
 * event hooks into a typed, lock-guarded vector of callbacks. Emission walks
 * subscribers in registration order, synchronously, on the caller's task
 * (for `on_frame_received` that is the reader task); subscribers must be fast
 * and non-blocking, handing off any real work themselves. */
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

type Callback<T> = Box<dyn FnMut(T) + Send>;

struct Subscriber<T> {
    id: u64,
    callback: Callback<T>,
}

/// An ordered list of subscribers for one signal type `T`.
pub struct Signal<T> {
    subscribers: Mutex<Vec<Subscriber<T>>>,
    next_id: AtomicU64,
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self { subscribers: Mutex::new(Vec::new()), next_id: AtomicU64::new(0) }
    }
}

impl<T: Clone> Signal<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a subscriber and return its id for later removal.
    pub fn subscribe(&self, callback: impl FnMut(T) + Send + 'static) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().unwrap().push(Subscriber { id, callback: Box::new(callback) });
        id
    }

    /// Remove the subscriber with the given id, if still present.
    pub fn unsubscribe(&self, id: u64) {
        self.subscribers.lock().unwrap().retain(|s| s.id != id);
    }

    /// Invoke every subscriber, in registration order, with a clone of `value`.
    pub fn emit(&self, value: T) {
        let mut subscribers = self.subscribers.lock().unwrap();
        for subscriber in subscribers.iter_mut() {
            (subscriber.callback)(value.clone());
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }
}

/// RAII guard that unsubscribes from a [`Signal`] on drop, so a short-lived
/// subscriber (e.g. the transaction layer's one-shot ACK waiter) is always
/// removed — on success, on timeout, or on an early return via `?`.
pub struct Subscription<T: Clone + 'static> {
    signal: Arc<Signal<T>>,
    id: u64,
}

impl<T: Clone + 'static> Subscription<T> {
    pub fn new(signal: Arc<Signal<T>>, callback: impl FnMut(T) + Send + 'static) -> Self {
        let id = signal.subscribe(callback);
        Self { signal, id }
    }
}

impl<T: Clone + 'static> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.signal.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn emits_in_registration_order() {
        let signal: Signal<u32> = Signal::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o1 = order.clone();
        signal.subscribe(move |v| o1.lock().unwrap().push(("a", v)));
        let o2 = order.clone();
        signal.subscribe(move |v| o2.lock().unwrap().push(("b", v)));

        signal.emit(7);
        assert_eq!(*order.lock().unwrap(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn unsubscribe_removes_only_that_subscriber() {
        let signal: Signal<u32> = Signal::new();
        let count_a = Arc::new(AtomicUsize::new(0));
        let count_b = Arc::new(AtomicUsize::new(0));

        let ca = count_a.clone();
        let id_a = signal.subscribe(move |_| {
            ca.fetch_add(1, Ordering::SeqCst);
        });
        let cb = count_b.clone();
        signal.subscribe(move |_| {
            cb.fetch_add(1, Ordering::SeqCst);
        });

        signal.unsubscribe(id_a);
        signal.emit(1);

        assert_eq!(count_a.load(Ordering::SeqCst), 0);
        assert_eq!(count_b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscription_guard_unsubscribes_on_drop() {
        let signal = Arc::new(Signal::<u32>::new());
        {
            let _guard = Subscription::new(signal.clone(), |_| {});
            assert_eq!(signal.subscriber_count(), 1);
        }
        assert_eq!(signal.subscriber_count(), 0);
    }
}
