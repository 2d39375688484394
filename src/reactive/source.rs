use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use super::cell::ReactiveCell;

pub type Getter<T> = Arc<dyn Fn() -> anyhow::Result<T> + Send + Sync>;

/// Where a value comes from at read time: a constant, a reactive cell, or an
/// accessor evaluated on every read.
pub enum Source<T> {
    Value(T),
    Cell(ReactiveCell<T>),
    Getter(Getter<T>),
}

impl<T> Source<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn value(value: T) -> Self {
        Self::Value(value)
    }

    pub fn reactive(cell: ReactiveCell<T>) -> Self {
        Self::Cell(cell)
    }

    pub fn getter(f: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self::Getter(Arc::new(move || Ok(f())))
    }

    /// Accessor whose failure propagates to whoever dereferences the source.
    pub fn try_getter(f: impl Fn() -> anyhow::Result<T> + Send + Sync + 'static) -> Self {
        Self::Getter(Arc::new(f))
    }

    /// Dereferences the source. Plain values and cells never fail.
    pub fn get(&self) -> anyhow::Result<T> {
        match self {
            Self::Value(value) => Ok(value.clone()),
            Self::Cell(cell) => Ok(cell.get()),
            Self::Getter(getter) => getter(),
        }
    }

    pub fn as_cell(&self) -> Option<&ReactiveCell<T>> {
        match self {
            Self::Cell(cell) => Some(cell),
            _ => None,
        }
    }

    pub fn is_reactive(&self) -> bool {
        !matches!(self, Self::Value(_))
    }

    /// Converts every read through `f`. A cell-backed source becomes a getter
    /// over the same cell, so reads stay live.
    pub fn map<U: 'static>(self, f: impl Fn(T) -> U + Send + Sync + 'static) -> Source<U> {
        match self {
            Self::Value(value) => Source::Value(f(value)),
            Self::Cell(cell) => Source::Getter(Arc::new(move || Ok(f(cell.get())))),
            Self::Getter(getter) => Source::Getter(Arc::new(move || getter().map(&f))),
        }
    }
}

impl<T> Clone for Source<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        match self {
            Self::Value(value) => Self::Value(value.clone()),
            Self::Cell(cell) => Self::Cell(cell.clone()),
            Self::Getter(getter) => Self::Getter(getter.clone()),
        }
    }
}

impl<T: Debug> Debug for Source<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Cell(cell) => f.debug_tuple("Cell").field(cell).finish(),
            Self::Getter(_) => f.write_str("Getter(..)"),
        }
    }
}

impl<T> From<ReactiveCell<T>> for Source<T> {
    fn from(cell: ReactiveCell<T>) -> Self {
        Self::Cell(cell)
    }
}

impl<T> From<&ReactiveCell<T>> for Source<T> {
    fn from(cell: &ReactiveCell<T>) -> Self {
        Self::Cell(cell.clone())
    }
}
