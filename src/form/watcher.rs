use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{trace, warn};

use super::report::ErrorReport;
use super::schema::{Schema, Validation};
use crate::reactive::{ReactiveCell, Source, Subscription};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Flush {
    /// Every change re-evaluates inside the cell notification, so subscribers
    /// of the published cells see each result as it happens.
    #[default]
    Sync,
    /// Changes only mark the watcher dirty. Nothing is republished until the
    /// next `flush` or read accessor, which re-evaluates once however many
    /// changes arrived.
    Batched,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WatchOptions {
    pub flush: Flush,
    pub immediate: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            flush: Flush::Sync,
            immediate: true,
        }
    }
}

struct WatcherInner<S: Schema> {
    input: Source<S::Input>,
    schema: Source<Arc<S>>,
    options: WatchOptions,
    dirty: AtomicBool,
    runs: AtomicU64,
    result: ReactiveCell<Option<Validation<S::Output>>>,
    output: ReactiveCell<Option<S::Output>>,
    errors: ReactiveCell<Option<ErrorReport>>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl<S> WatcherInner<S>
where
    S: Schema,
    S::Input: Clone,
    S::Output: Clone + Sync,
{
    fn invalidate(&self) {
        self.dirty.store(true, Ordering::SeqCst);
        if self.options.flush == Flush::Sync {
            self.evaluate();
        }
    }

    fn evaluate(&self) {
        let input = match self.input.get() {
            Ok(input) => input,
            Err(error) => {
                warn!(%error, "validation watcher could not read its input");
                self.dirty.store(true, Ordering::SeqCst);
                return;
            }
        };
        let schema = match self.schema.get() {
            Ok(schema) => schema,
            Err(error) => {
                warn!(%error, "validation watcher could not read its schema");
                self.dirty.store(true, Ordering::SeqCst);
                return;
            }
        };
        self.dirty.store(false, Ordering::SeqCst);
        let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;

        let result = schema.validate(&input);
        trace!(run, success = result.is_success(), "validation watcher re-evaluated");
        match &result {
            Validation::Success(output) => {
                self.output.set(Some(output.clone()));
                self.errors.set(None);
            }
            Validation::Failure(issues) => {
                self.output.set(None);
                self.errors.set(Some(schema.flatten(issues)));
            }
        }
        self.result.set(Some(result));
    }
}

/// Revalidates an input against a schema whenever either changes.
///
/// Cell-backed sources are tracked automatically. Getter-backed sources read
/// state the watcher cannot see, so their cells must be registered with
/// [`depend_on`](Self::depend_on). Dropping the last clone of the watcher
/// unsubscribes from every dependency.
///
/// With the default [`Flush::Sync`] the `result`, `output` and `errors` cells
/// are rewritten on every dependency change. Under [`Flush::Batched`] they are
/// pull-on-read: call [`flush`](Self::flush) from the host's scheduler tick.
pub struct ValidationWatcher<S: Schema> {
    inner: Arc<WatcherInner<S>>,
}

impl<S: Schema> Clone for ValidationWatcher<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> ValidationWatcher<S>
where
    S: Schema,
    S::Input: Clone,
    S::Output: Clone + Sync,
{
    pub fn new(input: Source<S::Input>, schema: Source<Arc<S>>, options: WatchOptions) -> Self {
        let watcher = Self {
            inner: Arc::new(WatcherInner {
                input,
                schema,
                options,
                dirty: AtomicBool::new(true),
                runs: AtomicU64::new(0),
                result: ReactiveCell::new(None),
                output: ReactiveCell::new(None),
                errors: ReactiveCell::new(None),
                subscriptions: Mutex::new(Vec::new()),
            }),
        };
        if let Some(cell) = watcher.inner.input.as_cell() {
            watcher.depend_on(cell);
        }
        if let Some(cell) = watcher.inner.schema.as_cell() {
            watcher.depend_on(cell);
        }
        if options.immediate {
            watcher.inner.evaluate();
        }
        watcher
    }

    /// Re-evaluates (or marks dirty, under [`Flush::Batched`]) whenever `cell`
    /// changes.
    pub fn depend_on<U>(&self, cell: &ReactiveCell<U>)
    where
        U: Send + Sync + 'static,
    {
        let weak = Arc::downgrade(&self.inner);
        let subscription = cell.subscribe(move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.invalidate();
            }
        });
        lock(&self.inner.subscriptions).push(subscription);
    }

    /// Re-evaluates if a dependency changed since the last run. Returns whether
    /// an evaluation happened.
    pub fn flush(&self) -> bool {
        if !self.is_dirty() {
            return false;
        }
        let before = self.runs();
        self.inner.evaluate();
        self.runs() != before
    }

    pub fn revalidate(&self) {
        self.inner.evaluate();
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.load(Ordering::SeqCst)
    }

    /// Number of completed evaluations.
    pub fn runs(&self) -> u64 {
        self.inner.runs.load(Ordering::SeqCst)
    }

    pub fn options(&self) -> WatchOptions {
        self.inner.options
    }

    pub fn result(&self) -> ReactiveCell<Option<Validation<S::Output>>> {
        self.flush();
        self.inner.result.clone()
    }

    pub fn output(&self) -> ReactiveCell<Option<S::Output>> {
        self.flush();
        self.inner.output.clone()
    }

    pub fn errors(&self) -> ReactiveCell<Option<ErrorReport>> {
        self.flush();
        self.inner.errors.clone()
    }

    pub fn current_output(&self) -> Option<S::Output> {
        self.flush();
        self.inner.output.get()
    }

    pub fn current_errors(&self) -> Option<ErrorReport> {
        self.flush();
        self.inner.errors.get()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
