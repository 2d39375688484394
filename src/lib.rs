//! Form submission controller for reactive UI layers.
//!
//! [`use_form`] wires an input, an optional schema and a submit callback into
//! a [`FormController`] that guards against overlapping attempts and funnels
//! schema failures, declined submissions and manually assigned errors into one
//! observable [`ErrorReport`] cell. [`ValidationWatcher`] revalidates the same
//! kind of input continuously, outside of any submission.

pub mod form;
pub mod prelude;
pub mod reactive;

pub use form::{
    CallbackConfig, ErrorReport, FormConfig, FormController, FormHandle, NativeForm,
    SubmissionError, SubmitOutcome, ValidationWatcher, use_form,
};
pub use reactive::{ReactiveCell, Source};
