use std::fmt::{Display, Formatter};
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

use super::report::ErrorReport;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum PathItem {
    Key(String),
    Index(usize),
}

impl Display for PathItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PathItem::Key(key) => f.write_str(key),
            PathItem::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PathItem {
    fn from(value: &str) -> Self {
        Self::Key(value.to_string())
    }
}

impl From<String> for PathItem {
    fn from(value: String) -> Self {
        Self::Key(value)
    }
}

impl From<usize> for PathItem {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

/// One problem reported by a schema. An empty path addresses the input as a
/// whole.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Issue {
    pub message: String,
    pub path: Vec<PathItem>,
}

impl Issue {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
        }
    }

    pub fn at(mut self, item: impl Into<PathItem>) -> Self {
        self.path.push(item.into());
        self
    }

    pub fn with_path<P>(mut self, path: impl IntoIterator<Item = P>) -> Self
    where
        P: Into<PathItem>,
    {
        self.path = path.into_iter().map(Into::into).collect();
        self
    }

    /// `address.lines.0` style key, or `None` for root issues.
    pub fn dotted_path(&self) -> Option<String> {
        if self.path.is_empty() {
            return None;
        }
        let segments = self
            .path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        Some(segments.join("."))
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Validation<T> {
    Success(T),
    Failure(Vec<Issue>),
}

impl<T> Validation<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Validation::Success(_))
    }

    pub fn output(&self) -> Option<&T> {
        match self {
            Validation::Success(output) => Some(output),
            Validation::Failure(_) => None,
        }
    }

    pub fn into_output(self) -> Option<T> {
        match self {
            Validation::Success(output) => Some(output),
            Validation::Failure(_) => None,
        }
    }

    pub fn issues(&self) -> &[Issue] {
        match self {
            Validation::Success(_) => &[],
            Validation::Failure(issues) => issues,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Validation<U> {
        match self {
            Validation::Success(output) => Validation::Success(f(output)),
            Validation::Failure(issues) => Validation::Failure(issues),
        }
    }
}

pub type BoxedValidationFuture<'a, T> = Pin<Box<dyn Future<Output = Validation<T>> + Send + 'a>>;

/// Contract with a validation engine.
///
/// `validate` is the synchronous entry point used by
/// [`ValidationWatcher`](super::ValidationWatcher); the submit path always goes
/// through `validate_async`, which engines with asynchronous checks override.
pub trait Schema: Send + Sync + 'static {
    type Input: Send + Sync + 'static;
    type Output: Send + 'static;

    fn validate(&self, input: &Self::Input) -> Validation<Self::Output>;

    fn validate_async<'a>(
        &'a self,
        input: &'a Self::Input,
    ) -> BoxedValidationFuture<'a, Self::Output> {
        let result = self.validate(input);
        Box::pin(async move { result })
    }

    fn flatten(&self, issues: &[Issue]) -> ErrorReport {
        ErrorReport::flatten(issues)
    }
}

/// Adapts a closure to [`Schema`].
pub struct FnSchema<I, O, F> {
    validate: F,
    _marker: PhantomData<fn(&I) -> O>,
}

impl<I, O, F> FnSchema<I, O, F>
where
    F: Fn(&I) -> Validation<O> + Send + Sync + 'static,
{
    pub fn new(validate: F) -> Self {
        Self {
            validate,
            _marker: PhantomData,
        }
    }
}

impl<I, O, F> Schema for FnSchema<I, O, F>
where
    I: Send + Sync + 'static,
    O: Send + 'static,
    F: Fn(&I) -> Validation<O> + Send + Sync + 'static,
{
    type Input = I;
    type Output = O;

    fn validate(&self, input: &I) -> Validation<O> {
        (self.validate)(input)
    }
}

pub fn schema_fn<I, O, F>(validate: F) -> FnSchema<I, O, F>
where
    F: Fn(&I) -> Validation<O> + Send + Sync + 'static,
{
    FnSchema::new(validate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn trimmed() -> impl Schema<Input = String, Output = String> {
        schema_fn(|input: &String| {
            let value = input.trim();
            if value.is_empty() {
                Validation::Failure(vec![
                    Issue::new("Required.").with_path(["lines".into(), PathItem::Index(0)]),
                ])
            } else {
                Validation::Success(value.to_string())
            }
        })
    }

    #[test]
    fn success_exposes_the_output_and_no_issues() {
        let result = trimmed().validate(&"  abc ".to_string());

        assert!(result.is_success());
        assert_eq!(result.output().map(String::as_str), Some("abc"));
        assert!(result.issues().is_empty());
        assert_eq!(result.map(|value| value.len()).into_output(), Some(3));
    }

    #[test]
    fn failure_keeps_issues_through_map() {
        let result = trimmed().validate(&"   ".to_string()).map(|value| value.len());

        assert!(!result.is_success());
        assert_eq!(result.output(), None);
        assert_eq!(result.issues().len(), 1);
        assert_eq!(result.issues()[0].dotted_path().as_deref(), Some("lines.0"));
        assert_eq!(result.into_output(), None);
    }

    #[test]
    fn root_issue_has_no_dotted_path() {
        assert_eq!(Issue::new("Form is incomplete.").dotted_path(), None);
    }

    #[test]
    fn default_async_entry_matches_sync_validation() {
        let schema = trimmed();
        let input = " ok".to_string();

        assert_eq!(block_on(schema.validate_async(&input)), schema.validate(&input));
    }
}
