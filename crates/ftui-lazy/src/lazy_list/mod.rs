#![forbid(unsafe_code)]

//! Lazily populated list bindings.
//!
//! - [`ListCell`]: the contract a shared list cell must meet. Implemented for
//!   [`Observable<Vec<T>>`](crate::reactive::Observable).
//! - [`LazyListOptions`]: loader plus optional success/error hooks.
//! - [`LazyList`] / [`ListSetter`]: the read handle and the overwrite handle
//!   returned by [`make_lazy_list`].
//! - [`Load`] / [`LoadFailure`]: what a loader returns and how it fails.
//!
//! # Known characteristic
//!
//! Loads are not de-duplicated. Every read of an empty list starts a new
//! load, so several reads in the same frame start several loads and the last
//! one to resolve wins. Loaders should be idempotent.

pub mod binding;
pub mod cell;
pub mod load;
pub mod options;

pub use binding::{LazyList, ListSetter, make_lazy_list};
pub use cell::ListCell;
pub use load::{Load, LoadFailure};
pub use options::{DEFAULT_LABEL, LazyListOptions};
