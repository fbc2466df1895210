#![forbid(unsafe_code)]

//! The shared list cell contract.

use crate::reactive::{Observable, Subscription};

/// An externally owned, observable holder of an ordered list.
///
/// A lazy list binding reads and writes through this trait only; it never
/// creates, resets, or takes exclusive ownership of the cell. Implementations
/// are expected to be cheap handles onto shared state (clones see the same
/// list).
pub trait ListCell<T> {
    /// Number of items currently held.
    fn len(&self) -> usize;

    /// Whether the cell is empty. An empty cell makes its binding eligible
    /// to load.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone out the current list.
    fn snapshot(&self) -> Vec<T>;

    /// Replace the list through the cell's standard update path.
    fn replace(&self, value: Vec<T>);

    /// Register a change callback. Dropping the returned guard unsubscribes.
    fn subscribe(&self, callback: Box<dyn Fn(&[T])>) -> Subscription;
}

impl<T: Clone + PartialEq + 'static> ListCell<T> for Observable<Vec<T>> {
    fn len(&self) -> usize {
        self.with(Vec::len)
    }

    fn snapshot(&self) -> Vec<T> {
        self.get()
    }

    fn replace(&self, value: Vec<T>) {
        self.set(value);
    }

    fn subscribe(&self, callback: Box<dyn Fn(&[T])>) -> Subscription {
        Observable::subscribe(self, move |list: &Vec<T>| callback(list.as_slice()))
    }
}
