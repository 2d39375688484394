use std::fmt::{Debug, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use tracing::trace;

static CELL_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct CellId(pub u64);

impl CellId {
    pub fn next() -> Self {
        Self(CELL_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst))
    }
}

impl Display for CellId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "cell-{}", self.0)
    }
}

type SubscriberFn<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Subscriber<T> {
    id: u64,
    callback: SubscriberFn<T>,
}

struct CellInner<T> {
    id: CellId,
    value: RwLock<T>,
    version: AtomicU64,
    next_subscriber: AtomicU64,
    subscribers: RwLock<Vec<Subscriber<T>>>,
}

/// Shared, version-tracked value with change notification.
///
/// Cloning a `ReactiveCell` yields another handle to the same value; every
/// holder observes every write. Subscribers run in registration order after
/// the value lock has been released, so a subscriber may freely read or write
/// the cell it observes.
pub struct ReactiveCell<T> {
    inner: Arc<CellInner<T>>,
}

impl<T> Clone for ReactiveCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Default + Send + Sync + 'static> Default for ReactiveCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Debug> Debug for ReactiveCell<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveCell")
            .field("id", &self.inner.id)
            .field("value", &*read_guard(&self.inner.value))
            .field("version", &self.inner.version.load(Ordering::SeqCst))
            .finish()
    }
}

impl<T> ReactiveCell<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(CellInner {
                id: CellId::next(),
                value: RwLock::new(value),
                version: AtomicU64::new(0),
                next_subscriber: AtomicU64::new(1),
                subscribers: RwLock::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> CellId {
        self.inner.id
    }

    /// Number of writes observed so far. Every `set`, `update`, `replace` and
    /// `take` bumps it by exactly one.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::SeqCst)
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        read_guard(&self.inner.value).clone()
    }

    pub fn with<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        f(&*read_guard(&self.inner.value))
    }

    pub fn set(&self, value: T)
    where
        T: Clone,
    {
        let snapshot = value.clone();
        *write_guard(&self.inner.value) = value;
        self.notify(&snapshot);
    }

    pub fn update(&self, f: impl FnOnce(&mut T))
    where
        T: Clone,
    {
        let snapshot = {
            let mut guard = write_guard(&self.inner.value);
            f(&mut *guard);
            guard.clone()
        };
        self.notify(&snapshot);
    }

    pub fn replace(&self, value: T) -> T
    where
        T: Clone,
    {
        let snapshot = value.clone();
        let previous = std::mem::replace(&mut *write_guard(&self.inner.value), value);
        self.notify(&snapshot);
        previous
    }

    pub fn take(&self) -> T
    where
        T: Clone + Default,
    {
        self.replace(T::default())
    }

    /// Registers `callback` to run after every write. The returned guard
    /// unsubscribes when dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::SeqCst);
        write_guard(&self.inner.subscribers).push(Subscriber {
            id,
            callback: Arc::new(callback),
        });

        let weak: Weak<CellInner<T>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                write_guard(&inner.subscribers).retain(|subscriber| subscriber.id != id);
            }
        })
    }

    pub fn subscriber_count(&self) -> usize {
        read_guard(&self.inner.subscribers).len()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn notify(&self, value: &T) {
        let version = self.inner.version.fetch_add(1, Ordering::SeqCst) + 1;
        let callbacks = read_guard(&self.inner.subscribers)
            .iter()
            .map(|subscriber| subscriber.callback.clone())
            .collect::<Vec<_>>();
        trace!(
            cell = %self.inner.id,
            version,
            subscribers = callbacks.len(),
            "reactive cell changed"
        );
        for callback in callbacks {
            callback(value);
        }
    }
}

/// RAII guard returned by [`ReactiveCell::subscribe`].
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new(unsubscribe: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Keeps the callback registered for the lifetime of the cell.
    pub fn detach(mut self) {
        self.unsubscribe = None;
    }
}

impl Debug for Subscription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

// Poisoned locks are recovered; the cell stays usable after a panicking updater.
fn read_guard<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_guard<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
