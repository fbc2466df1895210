#![forbid(unsafe_code)]

//! Construction-time configuration for a lazy list binding.

use std::borrow::Cow;
use std::fmt;

use super::load::{Load, LoadFailure};
use crate::cx::Cx;

type Loader<T> = dyn Fn() -> Load<T>;
type SuccessHook<T> = dyn Fn(&[T]);
type ErrorHook = dyn Fn(&LoadFailure);

/// Default label attached to tracing events.
pub const DEFAULT_LABEL: &str = "lazy_list";

/// Options captured when a binding is built. Never mutated afterwards.
///
/// # Example
///
/// ```
/// use ftui_lazy::lazy_list::LazyListOptions;
///
/// let options = LazyListOptions::<i32>::new(|| vec![1, 2, 3])
///     .with_label("numbers")
///     .on_error(|err| eprintln!("numbers failed: {err}"));
/// assert_eq!(options.label(), "numbers");
/// ```
pub struct LazyListOptions<T> {
    pub(crate) loader: Box<Loader<T>>,
    pub(crate) on_success: Option<Box<SuccessHook<T>>>,
    pub(crate) on_error: Option<Box<ErrorHook>>,
    pub(crate) label: Cow<'static, str>,
    pub(crate) parent: Option<Cx>,
}

impl<T: 'static> LazyListOptions<T> {
    /// Options with the given loader and no callbacks.
    ///
    /// The loader may return a `Vec<T>`, a `Result<Vec<T>, E>` or a
    /// [`Load<T>`] (for deferred values).
    #[must_use]
    pub fn new<L, R>(loader: L) -> Self
    where
        L: Fn() -> R + 'static,
        R: Into<Load<T>>,
    {
        Self {
            loader: Box::new(move || -> Load<T> { loader().into() }),
            on_success: None,
            on_error: None,
            label: Cow::Borrowed(DEFAULT_LABEL),
            parent: None,
        }
    }

    /// Called with the loaded list after it has been written back.
    #[must_use]
    pub fn on_success(mut self, hook: impl Fn(&[T]) + 'static) -> Self {
        self.on_success = Some(Box::new(hook));
        self
    }

    /// Called instead of logging when a load fails.
    #[must_use]
    pub fn on_error(mut self, hook: impl Fn(&LoadFailure) + 'static) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }

    /// Name used in tracing events.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = label.into();
        self
    }

    /// Tie the binding's lifetime to a parent context.
    #[must_use]
    pub fn with_parent(mut self, cx: &Cx) -> Self {
        self.parent = Some(cx.clone());
        self
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl<T> fmt::Debug for LazyListOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyListOptions")
            .field("label", &self.label)
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("parent", &self.parent.as_ref().map(Cx::id))
            .finish_non_exhaustive()
    }
}
