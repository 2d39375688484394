use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::config::{ArgsCallbackFn, ErrorsCallbackFn, Hooks, Resolve, UseForm, ValueCallbackFn};
use super::native::{FormHandle, empty_form_handle, resolve_form};
use super::report::{ErrorReport, SubmissionError};
use super::schema::Validation;
use crate::reactive::{ReactiveCell, Source};

static FORM_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FormId(pub u64);

impl FormId {
    pub fn next() -> Self {
        Self(FORM_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst))
    }
}

impl Display for FormId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "form-{}", self.0)
    }
}

/// How the most recent attempt ended. Attempts turned away by the
/// re-entrancy guard are not recorded.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// The native form reported itself invalid; nothing else ran.
    NativeInvalid,
    /// The schema rejected the input; the callback was not invoked.
    ValidationFailed,
    /// The callback returned a [`SubmissionError`].
    Declined,
    /// The callback completed but left a non-empty report in `errors`.
    ManualErrors,
    Submitted,
    /// A source or the callback failed with an error that was handed back to
    /// the caller of `submit`.
    Faulted,
}

impl SubmitOutcome {
    pub fn is_submitted(self) -> bool {
        self == SubmitOutcome::Submitted
    }

    /// Outcomes observed through the error channel rather than a returned error.
    pub fn reports_errors(self) -> bool {
        matches!(
            self,
            SubmitOutcome::ValidationFailed | SubmitOutcome::Declined | SubmitOutcome::ManualErrors
        )
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SubmitSnapshot {
    pub submitting: bool,
    pub submitted: bool,
    pub errors: Option<ErrorReport>,
    pub attempts: u64,
    pub last_outcome: Option<SubmitOutcome>,
}

enum Pipeline<I, T, A, R> {
    Value {
        input: Source<I>,
        resolve: Resolve<I, T>,
        callback: Option<ValueCallbackFn<T, A, R>>,
    },
    ArgsOnly {
        callback: ArgsCallbackFn<A, R>,
    },
}

struct ControllerInner<I, T, A, R> {
    pipeline: Pipeline<I, T, A, R>,
    on_errors: Option<ErrorsCallbackFn>,
    has_synthetic_input: bool,
}

enum Invocation<R> {
    Invalid(ErrorReport),
    Declined(ErrorReport),
    Returned(Option<R>),
}

/// Drives submission attempts for one form.
///
/// Clones share every cell and the attempt counter. Cells passed in through
/// the config may also be shared with other controllers, in which case the
/// `submitting` guard spans all of them.
pub struct FormController<I, T, A, R> {
    id: FormId,
    inner: Arc<ControllerInner<I, T, A, R>>,
    form: FormHandle,
    submitting: ReactiveCell<bool>,
    submitted: ReactiveCell<bool>,
    errors: ReactiveCell<Option<ErrorReport>>,
    attempts: Arc<AtomicU64>,
    last_outcome: ReactiveCell<Option<SubmitOutcome>>,
}

impl<I, T, A, R> Clone for FormController<I, T, A, R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Arc::clone(&self.inner),
            form: self.form.clone(),
            submitting: self.submitting.clone(),
            submitted: self.submitted.clone(),
            errors: self.errors.clone(),
            attempts: Arc::clone(&self.attempts),
            last_outcome: self.last_outcome.clone(),
        }
    }
}

impl<I, T, A, R> Debug for FormController<I, T, A, R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormController")
            .field("id", &self.id)
            .field("has_synthetic_input", &self.inner.has_synthetic_input)
            .field("attempts", &self.attempts.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Builds a controller from either a [`FormConfig`](super::FormConfig), a
/// [`CallbackConfig`](super::CallbackConfig) or a bare `Fn(A) -> Future`.
pub fn use_form<I, T, A, R>(config: impl Into<UseForm<I, T, A, R>>) -> FormController<I, T, A, R>
where
    I: Clone + Send + Sync + 'static,
    T: Send + 'static,
    A: Send + 'static,
    R: Send + 'static,
{
    let (pipeline, hooks) = match config.into() {
        UseForm::Options(config) => (
            Pipeline::Value {
                input: config.input,
                resolve: config.resolve,
                callback: config.callback,
            },
            config.hooks,
        ),
        UseForm::Callback(config) => (
            Pipeline::ArgsOnly {
                callback: config.callback,
            },
            config.hooks,
        ),
    };
    FormController::from_parts(pipeline, hooks)
}

impl<I, T, A, R> FormController<I, T, A, R>
where
    I: Clone + Send + Sync + 'static,
    T: Send + 'static,
    A: Send + 'static,
    R: Send + 'static,
{
    fn from_parts(pipeline: Pipeline<I, T, A, R>, hooks: Hooks) -> Self {
        let Hooks {
            on_errors,
            form,
            submitting,
            submitted,
            errors,
        } = hooks;
        let has_synthetic_input = matches!(pipeline, Pipeline::Value { .. });
        Self {
            id: FormId::next(),
            inner: Arc::new(ControllerInner {
                pipeline,
                on_errors,
                has_synthetic_input,
            }),
            form: form.unwrap_or_else(empty_form_handle),
            submitting: submitting.unwrap_or_default(),
            submitted: submitted.unwrap_or_default(),
            errors: errors.unwrap_or_default(),
            attempts: Arc::new(AtomicU64::new(0)),
            last_outcome: ReactiveCell::new(None),
        }
    }

    pub fn id(&self) -> FormId {
        self.id
    }

    pub fn form(&self) -> &FormHandle {
        &self.form
    }

    pub fn submitting(&self) -> &ReactiveCell<bool> {
        &self.submitting
    }

    pub fn submitted(&self) -> &ReactiveCell<bool> {
        &self.submitted
    }

    pub fn errors(&self) -> &ReactiveCell<Option<ErrorReport>> {
        &self.errors
    }

    /// Whether the callback receives the resolved input ahead of the
    /// call-time arguments.
    pub fn has_synthetic_input(&self) -> bool {
        self.inner.has_synthetic_input
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.get()
    }

    pub fn has_errors(&self) -> bool {
        self.errors.with(|errors| errors.as_ref().is_some_and(|report| !report.is_empty()))
    }

    /// Attempts that passed the re-entrancy guard.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn last_outcome(&self) -> Option<SubmitOutcome> {
        self.last_outcome.get()
    }

    pub fn snapshot(&self) -> SubmitSnapshot {
        SubmitSnapshot {
            submitting: self.submitting.get(),
            submitted: self.submitted.get(),
            errors: self.errors.get(),
            attempts: self.attempts(),
            last_outcome: self.last_outcome(),
        }
    }

    /// Clears `submitted` and `errors`. Refused while an attempt is in flight.
    pub fn reset(&self) -> bool {
        if self.submitting.get() {
            return false;
        }
        self.submitted.set(false);
        self.errors.set(None);
        true
    }

    pub fn set_errors(&self, report: ErrorReport) {
        self.errors.set(Some(report));
    }

    pub fn clear_errors(&self) {
        self.errors.set(None);
    }

    /// Runs one submission attempt.
    ///
    /// Returns `Ok(None)` when the attempt was turned away, blocked by the
    /// native form, failed validation, declined with a [`SubmissionError`] or
    /// had no callback to run. Any other error from a source or the callback
    /// is returned unchanged.
    pub async fn submit(&self, args: A) -> anyhow::Result<Option<R>> {
        if self.submitting.get() {
            debug!(form = %self.id, "submit ignored, an attempt is already in flight");
            return Ok(None);
        }
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        self.run_attempt(attempt, args).await
    }

    #[instrument(level = "debug", name = "form_submit", skip(self, args), fields(form = %self.id))]
    async fn run_attempt(&self, attempt: u64, args: A) -> anyhow::Result<Option<R>> {
        self.submitted.set(false);
        self.errors.set(None);

        if let Some(form) = resolve_form(&self.form) {
            if !form.check_validity() {
                form.report_validity();
                self.record(SubmitOutcome::NativeInvalid);
                return Ok(None);
            }
        }

        let _submitting = SubmittingGuard::raise(&self.submitting);

        let invocation = match self.invoke(args).await {
            Ok(invocation) => invocation,
            Err(error) => {
                debug!(%error, "submit attempt failed");
                self.record(SubmitOutcome::Faulted);
                return Err(error);
            }
        };

        let (result, declined) = match invocation {
            Invocation::Invalid(report) => {
                debug!(messages = report.message_count(), "schema validation failed");
                self.errors.set(Some(report.clone()));
                self.emit_errors(report).await;
                self.record(SubmitOutcome::ValidationFailed);
                return Ok(None);
            }
            Invocation::Declined(report) => {
                debug!(messages = report.message_count(), "submit callback declined");
                self.errors.set(Some(report));
                (None, true)
            }
            Invocation::Returned(result) => (result, false),
        };

        let pending = self.errors.get().filter(|report| !report.is_empty());
        match pending {
            Some(report) => {
                self.emit_errors(report).await;
                self.record(if declined {
                    SubmitOutcome::Declined
                } else {
                    SubmitOutcome::ManualErrors
                });
            }
            None => {
                self.submitted.set(true);
                self.record(SubmitOutcome::Submitted);
            }
        }
        Ok(result)
    }

    async fn invoke(&self, args: A) -> anyhow::Result<Invocation<R>> {
        match &self.inner.pipeline {
            Pipeline::Value {
                input,
                resolve,
                callback,
            } => {
                let input = input.get()?;
                let value = match resolve {
                    Resolve::Passthrough(passthrough) => passthrough(input),
                    Resolve::Schema(schema) => {
                        let schema = schema.get()?;
                        match schema.validate_async(&input).await {
                            Validation::Success(output) => output,
                            Validation::Failure(issues) => {
                                return Ok(Invocation::Invalid(schema.flatten(&issues)));
                            }
                        }
                    }
                };
                match callback {
                    Some(callback) => classify(callback(value, args).await),
                    None => Ok(Invocation::Returned(None)),
                }
            }
            Pipeline::ArgsOnly { callback } => classify(callback(args).await),
        }
    }

    async fn emit_errors(&self, report: ErrorReport) {
        if let Some(on_errors) = &self.inner.on_errors {
            on_errors(report).await;
        }
    }

    fn record(&self, outcome: SubmitOutcome) {
        debug!(?outcome, "submit attempt finished");
        self.last_outcome.set(Some(outcome));
    }
}

fn classify<R>(result: anyhow::Result<R>) -> anyhow::Result<Invocation<R>> {
    match result {
        Ok(value) => Ok(Invocation::Returned(Some(value))),
        Err(error) => error
            .downcast::<SubmissionError>()
            .map(|declined| Invocation::Declined(declined.into_report())),
    }
}

/// Lowers the `submitting` flag when the attempt ends, including when the
/// `submit` future is dropped mid-flight.
struct SubmittingGuard {
    flag: ReactiveCell<bool>,
}

impl SubmittingGuard {
    fn raise(flag: &ReactiveCell<bool>) -> Self {
        flag.set(true);
        Self { flag: flag.clone() }
    }
}

impl Drop for SubmittingGuard {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}
