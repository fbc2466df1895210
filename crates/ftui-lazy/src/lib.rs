#![forbid(unsafe_code)]

//! Lazily populated, observable list bindings for FrankenTUI.
//!
//! A [`LazyList`] defers loading a list until it is first read while empty,
//! writes the result back into a shared [`Observable`] cell, and exposes a
//! [`ListSetter`] to overwrite the list later.
//!
//! # Role in FrankenTUI
//! Widgets hold a `LazyList` for the lifetime of their component and read it
//! during render. The load runs on the runtime's local executor; subscribers
//! of the cell schedule the re-render that picks up the loaded list.
//!
//! # Modules
//! - [`reactive`]: `Observable` and `Subscription`.
//! - [`cx`]: liveness context guarding writes after teardown.
//! - [`lazy_list`]: the binding itself.

pub mod cx;
pub mod lazy_list;
pub mod reactive;

pub use cx::{Cx, CxController, CxError};
pub use lazy_list::{
    LazyList, LazyListOptions, ListCell, ListSetter, Load, LoadFailure, make_lazy_list,
};
pub use reactive::{Observable, Subscription};
