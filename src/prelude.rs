pub use crate::form::{
    CallbackConfig, ErrorReport, Flush, FormConfig, FormController, FormHandle, Issue, NativeForm,
    Schema, SubmissionError, SubmitOutcome, SubmitSnapshot, Validation, ValidationWatcher,
    WatchOptions, attach_form, form_handle, schema_fn, use_form,
};
pub use crate::reactive::{ReactiveCell, Source, Subscription};
