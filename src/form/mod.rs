mod config;
mod controller;
mod native;
mod report;
mod schema;
mod watcher;


pub use config::{CallbackConfig, ErrorsFuture, FormConfig, SubmitFuture, UseForm};
pub use controller::{FormController, FormId, SubmitOutcome, SubmitSnapshot, use_form};
pub use native::{FormHandle, NativeForm, attach_form, empty_form_handle, form_handle};
pub use report::{ErrorReport, SubmissionError};
pub use schema::{BoxedValidationFuture, FnSchema, Issue, PathItem, Schema, Validation, schema_fn};
pub use watcher::{Flush, ValidationWatcher, WatchOptions};
