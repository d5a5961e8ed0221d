use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

/// A live value that pushes every change to its subscribers.
///
/// Subscribers receive the current value as soon as they subscribe, and every
/// later value in the order it was set. Values are delivered through unbounded
/// channels, so a slow subscriber never blocks the thread that set the value.
pub struct Signal<T> {
    state: Mutex<SignalState<T>>,
}

struct SignalState<T> {
    value: T,
    subscribers: Vec<Sender<T>>,
}

/// A receiving end of a [Signal] or [Broadcaster].
#[derive(Debug)]
pub struct Subscription<T> {
    receiver: Receiver<T>,
}

/// Fans events out to subscribers. Unlike a [Signal], there is no current value.
pub struct Broadcaster<T> {
    subscribers: Mutex<Vec<Sender<T>>>,
}

impl<T> Signal<T>
where
    T: Clone + PartialEq,
{
    pub fn new(value: T) -> Self {
        Self {
            state: Mutex::new(SignalState {
                value,
                subscribers: Vec::new(),
            }),
        }
    }

    /// Returns a copy of the current value.
    pub fn get(&self) -> T {
        self.state.lock().value.clone()
    }

    /// Subscribes to the signal. The current value is the first value received.
    pub fn subscribe(&self) -> Subscription<T> {
        let (sender, receiver) = unbounded();
        let mut state = self.state.lock();

        // The receiver is alive right here, so this cannot fail.
        let _ = sender.send(state.value.clone());
        state.subscribers.push(sender);

        Subscription { receiver }
    }

    /// Stores the value and notifies subscribers, but only if it differs from the current one.
    /// Returns whether subscribers were notified.
    pub fn set(&self, value: T) -> bool {
        let mut state = self.state.lock();

        if state.value == value {
            return false;
        }

        state.broadcast(value);
        true
    }

    /// Stores the value and notifies subscribers, even if it did not change.
    pub fn emit(&self, value: T) {
        self.state.lock().broadcast(value);
    }
}

impl<T> SignalState<T>
where
    T: Clone,
{
    fn broadcast(&mut self, value: T) {
        self.subscribers
            .retain(|subscriber| subscriber.send(value.clone()).is_ok());
        self.value = value;
    }
}

impl<T> Default for Signal<T>
where
    T: Clone + PartialEq + Default,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Broadcaster<T>
where
    T: Clone,
{
    pub fn new() -> Self {
        Self {
            subscribers: Default::default(),
        }
    }

    pub fn subscribe(&self) -> Subscription<T> {
        let (sender, receiver) = unbounded();
        self.subscribers.lock().push(sender);

        Subscription { receiver }
    }

    /// Sends an event to every live subscriber, dropping the ones that went away.
    pub fn send(&self, event: T) {
        self.subscribers
            .lock()
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}

impl<T> Default for Broadcaster<T>
where
    T: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Subscription<T> {
    /// Takes every buffered value, oldest first.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }

    /// Takes every buffered value and returns the newest one.
    pub fn latest(&self) -> Option<T> {
        self.receiver.try_iter().last()
    }
}
