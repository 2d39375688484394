use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::native::FormHandle;
use super::report::ErrorReport;
use super::schema::Schema;
use crate::reactive::{ReactiveCell, Source};

pub type SubmitFuture<R> = Pin<Box<dyn Future<Output = anyhow::Result<R>> + Send + 'static>>;
pub type ErrorsFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

pub(super) type ValueCallbackFn<T, A, R> = Arc<dyn Fn(T, A) -> SubmitFuture<R> + Send + Sync>;
pub(super) type ArgsCallbackFn<A, R> = Arc<dyn Fn(A) -> SubmitFuture<R> + Send + Sync>;
pub(super) type ErrorsCallbackFn = Arc<dyn Fn(ErrorReport) -> ErrorsFuture + Send + Sync>;
pub(super) type PassthroughFn<I, T> = Arc<dyn Fn(I) -> T + Send + Sync>;
pub(super) type DynSchema<I, T> = Arc<dyn Schema<Input = I, Output = T>>;

pub(super) enum Resolve<I, T> {
    Passthrough(PassthroughFn<I, T>),
    Schema(Source<DynSchema<I, T>>),
}

/// Error hook and externally owned cells, common to both config shapes.
#[derive(Default)]
pub(super) struct Hooks {
    pub(super) on_errors: Option<ErrorsCallbackFn>,
    pub(super) form: Option<FormHandle>,
    pub(super) submitting: Option<ReactiveCell<bool>>,
    pub(super) submitted: Option<ReactiveCell<bool>>,
    pub(super) errors: Option<ReactiveCell<Option<ErrorReport>>>,
}

impl Hooks {
    fn set_on_errors<F, Fut>(&mut self, callback: F)
    where
        F: Fn(ErrorReport) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_errors = Some(Arc::new(move |report: ErrorReport| -> ErrorsFuture {
            Box::pin(callback(report))
        }));
    }
}

/// Options for a controller that validates or passes through an input.
///
/// `I` is the input type, `T` the value handed to the submit callback (the
/// input itself, or the schema output), `A` the call-time arguments of
/// `submit` and `R` the callback result.
pub struct FormConfig<I, T, A, R> {
    pub(super) input: Source<I>,
    pub(super) resolve: Resolve<I, T>,
    pub(super) callback: Option<ValueCallbackFn<T, A, R>>,
    pub(super) hooks: Hooks,
}

impl<I, A, R> FormConfig<I, I, A, R>
where
    I: Clone + Send + Sync + 'static,
    A: Send + 'static,
    R: Send + 'static,
{
    /// The callback receives the dereferenced input unchanged.
    pub fn from_input(input: Source<I>) -> Self {
        Self::from_parts(input, Resolve::Passthrough(Arc::new(|value: I| value)))
    }
}

impl<I, T, A, R> FormConfig<I, T, A, R>
where
    I: Clone + Send + Sync + 'static,
    T: Send + 'static,
    A: Send + 'static,
    R: Send + 'static,
{
    pub fn from_schema<S>(input: Source<I>, schema: S) -> Self
    where
        S: Schema<Input = I, Output = T>,
    {
        let schema: DynSchema<I, T> = Arc::new(schema);
        Self::from_parts(input, Resolve::Schema(Source::Value(schema)))
    }

    /// The schema is read from `schema` on every attempt, so a cell or getter
    /// can tighten or relax it from state outside the form.
    pub fn from_schema_source<S>(input: Source<I>, schema: Source<Arc<S>>) -> Self
    where
        S: Schema<Input = I, Output = T>,
    {
        let schema = schema.map(|schema| -> DynSchema<I, T> { schema });
        Self::from_parts(input, Resolve::Schema(schema))
    }

    fn from_parts(input: Source<I>, resolve: Resolve<I, T>) -> Self {
        Self {
            input,
            resolve,
            callback: None,
            hooks: Hooks::default(),
        }
    }

    pub fn on_submit<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(T, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        self.callback = Some(Arc::new(move |value: T, args: A| -> SubmitFuture<R> {
            Box::pin(callback(value, args))
        }));
        self
    }

    pub fn on_errors<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(ErrorReport) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.hooks.set_on_errors(callback);
        self
    }

    pub fn form(mut self, form: FormHandle) -> Self {
        self.hooks.form = Some(form);
        self
    }

    pub fn submitting(mut self, submitting: ReactiveCell<bool>) -> Self {
        self.hooks.submitting = Some(submitting);
        self
    }

    pub fn submitted(mut self, submitted: ReactiveCell<bool>) -> Self {
        self.hooks.submitted = Some(submitted);
        self
    }

    pub fn errors(mut self, errors: ReactiveCell<Option<ErrorReport>>) -> Self {
        self.hooks.errors = Some(errors);
        self
    }
}

impl<T, A, R> FormConfig<(), T, A, R>
where
    T: Send + 'static,
    A: Send + 'static,
    R: Send + 'static,
{
    /// Schema configured without an input: every attempt validates `()`, and
    /// the callback receives the schema output.
    pub fn from_schema_only<S>(schema: S) -> Self
    where
        S: Schema<Input = (), Output = T>,
    {
        Self::from_schema(Source::Value(()), schema)
    }
}

/// Options for a controller without input or schema: the callback receives
/// only the arguments given to `submit`.
pub struct CallbackConfig<A, R> {
    pub(super) callback: ArgsCallbackFn<A, R>,
    pub(super) hooks: Hooks,
}

impl<A, R> CallbackConfig<A, R>
where
    A: Send + 'static,
    R: Send + 'static,
{
    pub fn new<F, Fut>(callback: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        Self {
            callback: Arc::new(move |args: A| -> SubmitFuture<R> { Box::pin(callback(args)) }),
            hooks: Hooks::default(),
        }
    }

    pub fn on_errors<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(ErrorReport) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.hooks.set_on_errors(callback);
        self
    }

    pub fn form(mut self, form: FormHandle) -> Self {
        self.hooks.form = Some(form);
        self
    }

    pub fn submitting(mut self, submitting: ReactiveCell<bool>) -> Self {
        self.hooks.submitting = Some(submitting);
        self
    }

    pub fn submitted(mut self, submitted: ReactiveCell<bool>) -> Self {
        self.hooks.submitted = Some(submitted);
        self
    }

    pub fn errors(mut self, errors: ReactiveCell<Option<ErrorReport>>) -> Self {
        self.hooks.errors = Some(errors);
        self
    }
}

/// Either shape accepted by [`use_form`](super::use_form). A bare closure
/// converts into the `Callback` shape.
pub enum UseForm<I, T, A, R> {
    Options(FormConfig<I, T, A, R>),
    Callback(CallbackConfig<A, R>),
}

impl<I, T, A, R> From<FormConfig<I, T, A, R>> for UseForm<I, T, A, R> {
    fn from(config: FormConfig<I, T, A, R>) -> Self {
        UseForm::Options(config)
    }
}

impl<A, R> From<CallbackConfig<A, R>> for UseForm<(), (), A, R> {
    fn from(config: CallbackConfig<A, R>) -> Self {
        UseForm::Callback(config)
    }
}

impl<A, R, F, Fut> From<F> for UseForm<(), (), A, R>
where
    A: Send + 'static,
    R: Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
{
    fn from(callback: F) -> Self {
        UseForm::Callback(CallbackConfig::new(callback))
    }
}
