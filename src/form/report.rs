use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::schema::Issue;

/// Flattened error channel shared by schema failures, designated submission
/// errors and manual assignment.
///
/// `root` holds messages about the input as a whole, `nested` maps a dotted
/// field path to its messages. Either side is omitted from the serialized
/// form when absent.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested: Option<BTreeMap<String, Vec<String>>>,
}

impl ErrorReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(message: impl Into<String>) -> Self {
        Self::new().with_root(message)
    }

    pub fn field(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new().with_field(path, message)
    }

    pub fn with_root(mut self, message: impl Into<String>) -> Self {
        self.push_root(message);
        self
    }

    pub fn with_field(mut self, path: impl Into<String>, message: impl Into<String>) -> Self {
        self.push_field(path, message);
        self
    }

    pub fn push_root(&mut self, message: impl Into<String>) {
        self.root.get_or_insert_with(Vec::new).push(message.into());
    }

    pub fn push_field(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.nested
            .get_or_insert_with(BTreeMap::new)
            .entry(path.into())
            .or_default()
            .push(message.into());
    }

    /// Groups issues by path. Issues without a path land in `root`; message
    /// order within a key follows issue order.
    pub fn flatten(issues: &[Issue]) -> Self {
        let mut report = Self::new();
        for issue in issues {
            match issue.dotted_path() {
                Some(path) => report.push_field(path, issue.message.clone()),
                None => report.push_root(issue.message.clone()),
            }
        }
        report
    }

    pub fn is_empty(&self) -> bool {
        self.message_count() == 0
    }

    pub fn message_count(&self) -> usize {
        let root = self.root.as_ref().map_or(0, Vec::len);
        let nested = self
            .nested
            .as_ref()
            .map_or(0, |nested| nested.values().map(Vec::len).sum());
        root + nested
    }

    pub fn root_errors(&self) -> &[String] {
        self.root.as_deref().unwrap_or_default()
    }

    pub fn field_errors(&self, path: &str) -> &[String] {
        self.nested
            .as_ref()
            .and_then(|nested| nested.get(path))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.nested
            .iter()
            .flat_map(|nested| nested.iter())
            .filter(|(_, messages)| !messages.is_empty())
            .map(|(path, _)| path.as_str())
    }

    pub fn first_message(&self) -> Option<&str> {
        self.root_errors()
            .first()
            .or_else(|| {
                self.nested
                    .as_ref()
                    .and_then(|nested| nested.values().find_map(|messages| messages.first()))
            })
            .map(String::as_str)
    }

    pub fn merge(&mut self, other: ErrorReport) {
        for message in other.root.into_iter().flatten() {
            self.push_root(message);
        }
        for (path, messages) in other.nested.into_iter().flatten() {
            for message in messages {
                self.push_field(path.clone(), message);
            }
        }
    }
}

impl Display for ErrorReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for message in self.root_errors() {
            if !first {
                f.write_str("; ")?;
            }
            f.write_str(message)?;
            first = false;
        }
        for (path, messages) in self.nested.iter().flatten() {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{path}: {message}")?;
                first = false;
            }
        }
        if first {
            f.write_str("no errors")?;
        }
        Ok(())
    }
}

/// The designated "expected failure" raised from a submit callback.
///
/// Returning it (through `anyhow`) folds its report into the controller's
/// error channel instead of failing the `submit` call.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("submission rejected: {report}")]
pub struct SubmissionError {
    report: ErrorReport,
}

impl SubmissionError {
    pub fn new(report: ErrorReport) -> Self {
        Self { report }
    }

    pub fn root(message: impl Into<String>) -> Self {
        Self::new(ErrorReport::root(message))
    }

    pub fn field(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorReport::field(path, message))
    }

    pub fn report(&self) -> &ErrorReport {
        &self.report
    }

    pub fn into_report(self) -> ErrorReport {
        self.report
    }
}

impl From<ErrorReport> for SubmissionError {
    fn from(report: ErrorReport) -> Self {
        Self::new(report)
    }
}
