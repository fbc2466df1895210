#![forbid(unsafe_code)]

//! The lazy list binding: read-triggered loading over a shared list cell.
//!
//! # Design
//!
//! [`LazyList<T, C>`] wraps a caller-owned [`ListCell`] and keeps its own
//! `data` field mirroring the cell. Reading through [`data()`](LazyList::data)
//! while the cell is empty calls the loader and spawns a task on the local
//! executor that awaits the result. The read itself returns the current
//! (usually still empty) value; subscribers see the loaded list once the
//! task has run.
//!
//! The binding subscribes to the cell when it is built, so writes made by
//! other parts of the application reach `data` too. That subscription is
//! registered before any caller's, which means a caller's subscriber
//! already sees the new list through [`data()`](LazyList::data).
//!
//! On success the task writes the cell, then the binding's own field (unless
//! a newer write landed while the cell was notifying), then calls
//! `on_success`.
//!
//! Only `data()` and `with_data()` can trigger a load. Diagnostic accessors
//! never do.
//!
//! # Invariants
//!
//! 1. A read dispatches a load iff the cell is empty and the binding is live.
//! 2. Every dispatch calls the loader exactly once, synchronously, before the
//!    read returns.
//! 3. Dispatch is unguarded: N eligible reads before the first completion
//!    start N loads. Completions race and the last one to resolve wins.
//! 4. A load that completes after teardown (cancelled `Cx`, or every handle
//!    dropped) writes nothing and calls no callbacks.
//! 5. The setter writes the cell and the `data` field synchronously and never
//!    calls the loader.
//! 6. Once a write (from any source) has finished notifying, `data` equals
//!    the cell. A write made from inside a subscriber is never overwritten
//!    by the write that triggered it.
//!
//! # Failure Modes
//!
//! - **Loader fails**: routed to `on_error`, or logged at `ERROR` when no
//!   hook is set. The cell is left as it was, so the next read retries.
//! - **Executor shut down**: the spawn failure is reported the same way as a
//!   loader failure.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use futures::task::{LocalSpawn, LocalSpawnExt};
use tracing::{debug, error, trace, warn};

use super::cell::ListCell;
use super::load::LoadFailure;
use super::options::LazyListOptions;
use crate::cx::{Cx, CxController};
use crate::reactive::{Observable, Subscription};

struct LazyListInner<T, C> {
    cell: C,
    /// Mirrors `cell`; written directly by completions and the setter.
    data: RefCell<Vec<T>>,
    options: LazyListOptions<T>,
    spawner: Rc<dyn LocalSpawn>,
    cx: Cx,
    cx_ctrl: CxController,
    dispatched: Cell<u64>,
    in_flight: Cell<usize>,
    /// Bumped on every write to `data`; lets an outer write detect a nested one.
    writes: Cell<u64>,
    /// Keeps `data` in step with writes made directly to the cell.
    cell_sync: RefCell<Option<Subscription>>,
}

impl<T: Clone + 'static, C: ListCell<T> + 'static> LazyListInner<T, C> {
    fn bump_writes(&self) -> u64 {
        let seq = self.writes.get() + 1;
        self.writes.set(seq);
        seq
    }

    fn write(&self, list: Vec<T>) {
        let seq = self.bump_writes();
        self.cell.replace(list.clone());
        // A notification may already have synced `data`, possibly to a
        // newer list written re-entrantly by a subscriber.
        if self.writes.get() == seq {
            *self.data.borrow_mut() = list;
        }
    }

    fn sync_from_cell(&self, list: &[T]) {
        self.bump_writes();
        *self.data.borrow_mut() = list.to_vec();
    }

    fn complete(&self, load: u64, result: Result<Vec<T>, LoadFailure>) {
        match result {
            Ok(list) => {
                debug!(
                    list = %self.options.label,
                    load,
                    len = list.len(),
                    "lazy list load committed"
                );
                self.write(list.clone());
                if let Some(hook) = &self.options.on_success {
                    hook(list.as_slice());
                }
            }
            Err(err) => self.fail(load, &err),
        }
    }

    fn fail(&self, load: u64, err: &LoadFailure) {
        match &self.options.on_error {
            Some(hook) => hook(err),
            None => error!(list = %self.options.label, load, error = %err, "lazy list load failed"),
        }
    }
}

/// Read-triggered, lazily loaded view of a shared list cell.
///
/// Cloning a `LazyList` creates a new handle to the **same** binding.
pub struct LazyList<T, C = Observable<Vec<T>>> {
    inner: Rc<LazyListInner<T, C>>,
}

/// Overwrites the list of a [`LazyList`].
///
/// Obtained from [`make_lazy_list`] or [`LazyList::setter`].
pub struct ListSetter<T, C = Observable<Vec<T>>> {
    inner: Rc<LazyListInner<T, C>>,
}

impl<T, C> Clone for LazyList<T, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T, C> Clone for ListSetter<T, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Build a lazy list binding over `cell`.
///
/// Returns the read handle and its setter. `spawner` runs the load tasks;
/// any [`LocalSpawn`] works, e.g. a `futures::executor::LocalSpawner`.
///
/// # Example
///
/// ```
/// use futures::executor::LocalPool;
/// use ftui_lazy::lazy_list::{LazyListOptions, make_lazy_list};
/// use ftui_lazy::reactive::Observable;
///
/// let mut pool = LocalPool::new();
/// let cell = Observable::new(Vec::new());
/// let (list, set_list) = make_lazy_list(
///     cell.clone(),
///     LazyListOptions::new(|| vec!["a", "b"]),
///     pool.spawner(),
/// );
///
/// assert!(list.data().is_empty()); // first read starts the load
/// pool.run_until_stalled();
/// assert_eq!(list.data(), vec!["a", "b"]);
///
/// set_list.set(vec!["c"]);
/// assert_eq!(cell.get(), vec!["c"]);
/// ```
pub fn make_lazy_list<T, C, S>(
    cell: C,
    options: LazyListOptions<T>,
    spawner: S,
) -> (LazyList<T, C>, ListSetter<T, C>)
where
    T: Clone + 'static,
    C: ListCell<T> + 'static,
    S: LocalSpawn + 'static,
{
    let list = LazyList::new(cell, options, spawner);
    let setter = list.setter();
    (list, setter)
}

impl<T, C> LazyList<T, C>
where
    T: Clone + 'static,
    C: ListCell<T> + 'static,
{
    /// Build a binding. See [`make_lazy_list`].
    #[must_use]
    pub fn new(cell: C, options: LazyListOptions<T>, spawner: impl LocalSpawn + 'static) -> Self {
        let (cx, cx_ctrl) = match &options.parent {
            Some(parent) => parent.child_inherit(),
            None => Cx::background(),
        };
        let data = RefCell::new(cell.snapshot());
        debug!(list = %options.label, cx_id = cx.id(), "lazy list created");
        let inner = Rc::new(LazyListInner {
            cell,
            data,
            options,
            spawner: Rc::new(spawner),
            cx,
            cx_ctrl,
            dispatched: Cell::new(0),
            in_flight: Cell::new(0),
            writes: Cell::new(0),
            cell_sync: RefCell::new(None),
        });

        let weak_inner: Weak<LazyListInner<T, C>> = Rc::downgrade(&inner);
        let sub = inner.cell.subscribe(Box::new(move |list: &[T]| {
            if let Some(strong) = weak_inner.upgrade() {
                strong.sync_from_cell(list);
            }
        }));
        *inner.cell_sync.borrow_mut() = Some(sub);

        Self { inner }
    }

    /// Read the list, starting a load first if the cell is empty.
    ///
    /// The returned value is the binding's current list. A load started by
    /// this call has not completed yet, so re-read (or subscribe) to observe
    /// its result.
    pub fn data(&self) -> Vec<T> {
        self.load_if_eligible();
        self.inner.data.borrow().clone()
    }

    /// Like [`data()`](Self::data), by reference.
    ///
    /// # Panics
    ///
    /// Panics if `f` writes to this binding or its cell (re-entrant borrow).
    pub fn with_data<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        self.load_if_eligible();
        let data = self.inner.data.borrow();
        f(data.as_slice())
    }

    /// Replace the list. Same as calling the binding's [`ListSetter`].
    pub fn set(&self, value: Vec<T>) {
        self.inner.write(value);
    }

    /// A setter for this binding.
    #[must_use]
    pub fn setter(&self) -> ListSetter<T, C> {
        ListSetter {
            inner: Rc::clone(&self.inner),
        }
    }

    /// Subscribe to changes of the underlying cell.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&[T]) + 'static) -> Subscription {
        self.inner.cell.subscribe(Box::new(callback))
    }

    /// Whether the next read would start a load.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.inner.cell.is_empty() && !self.inner.cx.is_cancelled()
    }

    /// Total loads dispatched over the binding's lifetime.
    #[must_use]
    pub fn loads_dispatched(&self) -> u64 {
        self.inner.dispatched.get()
    }

    /// Loads dispatched but not yet completed.
    #[must_use]
    pub fn loads_in_flight(&self) -> usize {
        self.inner.in_flight.get()
    }

    /// The binding's liveness context.
    #[must_use]
    pub fn cx(&self) -> &Cx {
        &self.inner.cx
    }

    /// Tear the binding down. Idempotent.
    ///
    /// Reads stop dispatching, and loads still in flight discard their
    /// results when they complete.
    pub fn unmount(&self) {
        let in_flight = self.inner.in_flight.get();
        if in_flight > 0 && !self.inner.cx_ctrl.is_cancelled() {
            warn!(
                list = %self.inner.options.label,
                in_flight,
                "lazy list unmounted with loads in flight"
            );
        }
        self.inner.cx_ctrl.cancel();
    }

    fn load_if_eligible(&self) {
        if !self.inner.cell.is_empty() {
            return;
        }
        if self.inner.cx.is_cancelled() {
            trace!(list = %self.inner.options.label, "read after unmount; not loading");
            return;
        }
        self.dispatch();
    }

    // Deliberately unguarded: overlapping reads each start their own load.
    fn dispatch(&self) {
        let inner = &self.inner;
        let load = inner.dispatched.get() + 1;
        inner.dispatched.set(load);
        inner.in_flight.set(inner.in_flight.get() + 1);
        debug!(
            list = %inner.options.label,
            load,
            in_flight = inner.in_flight.get(),
            "dispatching lazy list load"
        );

        let pending = (inner.options.loader)();
        let weak: Weak<LazyListInner<T, C>> = Rc::downgrade(inner);
        let cx = inner.cx.clone();
        let label = inner.options.label.clone();

        let task = async move {
            let result = pending.resolve().await;
            let Some(inner) = weak.upgrade() else {
                debug!(list = %label, load, "binding dropped; discarding load result");
                return;
            };
            inner.in_flight.set(inner.in_flight.get().saturating_sub(1));
            if cx.check().is_err() {
                debug!(list = %label, load, "binding unmounted; discarding load result");
                return;
            }
            inner.complete(load, result);
        };

        if let Err(err) = inner.spawner.spawn_local(task) {
            inner.in_flight.set(inner.in_flight.get().saturating_sub(1));
            inner.fail(load, &LoadFailure::from(err));
        }
    }
}

impl<T, C> ListSetter<T, C>
where
    T: Clone + 'static,
    C: ListCell<T> + 'static,
{
    /// Replace the list in both the cell and the binding.
    pub fn set(&self, value: Vec<T>) {
        trace!(list = %self.inner.options.label, len = value.len(), "lazy list set");
        self.inner.write(value);
    }
}

impl<T: fmt::Debug, C> fmt::Debug for LazyList<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyList")
            .field("label", &self.inner.options.label)
            .field("data", &self.inner.data.borrow())
            .field("dispatched", &self.inner.dispatched.get())
            .field("in_flight", &self.inner.in_flight.get())
            .field("cx_id", &self.inner.cx.id())
            .finish()
    }
}

impl<T, C> fmt::Debug for ListSetter<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListSetter")
            .field("label", &self.inner.options.label)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lazy_list::Load;
    use futures::channel::oneshot;
    use futures::executor::LocalPool;

    fn counting_loader(
        result: Vec<u32>,
    ) -> (Rc<Cell<u32>>, impl Fn() -> Vec<u32> + 'static) {
        let calls = Rc::new(Cell::new(0));
        let calls_clone = Rc::clone(&calls);
        (calls, move || {
            calls_clone.set(calls_clone.get() + 1);
            result.clone()
        })
    }

    #[test]
    fn initial_data_mirrors_cell() {
        let pool = LocalPool::new();
        let cell = Observable::new(vec![7u32]);
        let (calls, loader) = counting_loader(vec![1]);
        let list = LazyList::new(cell, LazyListOptions::new(loader), pool.spawner());

        assert_eq!(list.data(), vec![7]);
        assert_eq!(calls.get(), 0);
        assert!(!list.is_eligible());
    }

    #[test]
    fn ready_result_is_applied_on_next_poll() {
        let mut pool = LocalPool::new();
        let cell = Observable::new(Vec::new());
        let (calls, loader) = counting_loader(vec![1, 2]);
        let list = LazyList::new(cell.clone(), LazyListOptions::new(loader), pool.spawner());

        assert!(list.data().is_empty());
        assert_eq!(calls.get(), 1);
        assert_eq!(list.loads_in_flight(), 1);
        assert!(cell.get().is_empty());

        pool.run_until_stalled();
        assert_eq!(cell.get(), vec![1, 2]);
        assert_eq!(list.data(), vec![1, 2]);
        assert_eq!(list.loads_in_flight(), 0);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn diagnostics_do_not_dispatch() {
        let pool = LocalPool::new();
        let (calls, loader) = counting_loader(vec![1]);
        let list = LazyList::new(
            Observable::new(Vec::new()),
            LazyListOptions::new(loader),
            pool.spawner(),
        );

        assert!(list.is_eligible());
        let _ = list.loads_dispatched();
        let _ = list.loads_in_flight();
        let _ = list.cx();
        let _ = format!("{list:?}");
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn with_data_dispatches_too() {
        let pool = LocalPool::new();
        let (calls, loader) = counting_loader(vec![1]);
        let list = LazyList::new(
            Observable::new(Vec::new()),
            LazyListOptions::new(loader),
            pool.spawner(),
        );

        let len = list.with_data(<[u32]>::len);
        assert_eq!(len, 0);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn subscriber_sees_synced_data_field() {
        let mut pool = LocalPool::new();
        let cell = Observable::new(Vec::new());
        let (_calls, loader) = counting_loader(vec![5, 6]);
        let list = LazyList::new(cell, LazyListOptions::new(loader), pool.spawner());

        let observed = Rc::new(RefCell::new(None));
        let observed_clone = Rc::clone(&observed);
        let reader = list.clone();
        let _sub = list.subscribe(move |cell_value| {
            *observed_clone.borrow_mut() = Some((cell_value.to_vec(), reader.data()));
        });

        let _ = list.data();
        pool.run_until_stalled();
        assert_eq!(*observed.borrow(), Some((vec![5, 6], vec![5, 6])));
        assert_eq!(list.data(), vec![5, 6]);
    }

    #[test]
    fn setter_and_inherent_set_agree() {
        let pool = LocalPool::new();
        let cell = Observable::new(vec![1u32]);
        let (list, setter) = make_lazy_list(
            cell.clone(),
            LazyListOptions::new(|| vec![0u32]),
            pool.spawner(),
        );

        setter.set(vec![2, 3]);
        assert_eq!(cell.get(), vec![2, 3]);
        assert_eq!(list.data(), vec![2, 3]);

        list.set(vec![4]);
        assert_eq!(cell.get(), vec![4]);
        assert_eq!(list.data(), vec![4]);
        assert_eq!(list.loads_dispatched(), 0);
    }

    #[test]
    fn unmount_discards_pending_result() {
        let mut pool = LocalPool::new();
        let cell = Observable::new(Vec::new());
        let successes = Rc::new(Cell::new(0u32));
        let successes_clone = Rc::clone(&successes);
        let (tx, rx) = oneshot::channel::<Vec<u32>>();
        let rx = RefCell::new(Some(rx));
        let options = LazyListOptions::new(move || match rx.borrow_mut().take() {
            Some(rx) => Load::deferred(async move { rx.await.map_err(LoadFailure::new) }),
            None => Load::failed("loader reused"),
        })
        .on_success(move |_| successes_clone.set(successes_clone.get() + 1));
        let list = LazyList::new(cell.clone(), options, pool.spawner());

        let _ = list.data();
        list.unmount();
        list.unmount();
        assert!(!list.is_eligible());

        tx.send(vec![1, 2, 3]).expect("receiver alive");
        pool.run_until_stalled();
        assert!(cell.get().is_empty());
        assert!(list.data().is_empty());
        assert_eq!(successes.get(), 0);
        assert_eq!(list.loads_dispatched(), 1);
        assert_eq!(list.loads_in_flight(), 0);
    }

    #[test]
    fn dropping_all_handles_discards_pending_result() {
        let mut pool = LocalPool::new();
        let cell = Observable::new(Vec::new());
        let (list, setter) = make_lazy_list(
            cell.clone(),
            LazyListOptions::new(|| vec![1u32]),
            pool.spawner(),
        );

        let _ = list.data();
        drop(list);
        drop(setter);
        pool.run_until_stalled();
        assert!(cell.get().is_empty());
    }

    #[test]
    fn parent_cancel_unmounts_binding() {
        let pool = LocalPool::new();
        let (parent, parent_ctrl) = Cx::background();
        let (calls, loader) = counting_loader(vec![1]);
        let list = LazyList::new(
            Observable::new(Vec::new()),
            LazyListOptions::new(loader).with_parent(&parent),
            pool.spawner(),
        );

        parent_ctrl.cancel();
        assert!(list.cx().is_cancelled());
        let _ = list.data();
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn spawn_failure_reaches_error_hook() {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        drop(pool);

        let errors = Rc::new(RefCell::new(Vec::new()));
        let errors_clone = Rc::clone(&errors);
        let list = LazyList::new(
            Observable::new(Vec::new()),
            LazyListOptions::new(|| vec![1u32])
                .on_error(move |err| errors_clone.borrow_mut().push(err.to_string())),
            spawner,
        );

        let _ = list.data();
        assert_eq!(errors.borrow().len(), 1);
        assert!(errors.borrow()[0].starts_with("could not schedule load"));
        assert_eq!(list.loads_in_flight(), 0);
    }

    #[test]
    fn external_cell_writes_reach_data() {
        let mut pool = LocalPool::new();
        let cell = Observable::new(Vec::new());
        let (calls, loader) = counting_loader(vec![1]);
        let list = LazyList::new(cell.clone(), LazyListOptions::new(loader), pool.spawner());

        cell.set(vec![3]);
        pool.run_until_stalled();
        assert_eq!(list.data(), vec![3]);
        assert_eq!(calls.get(), 0);

        cell.update(|v| v.push(4));
        assert_eq!(list.with_data(<[u32]>::to_vec), vec![3, 4]);
    }

    #[test]
    fn nested_set_from_subscriber_wins() {
        let mut pool = LocalPool::new();
        let cell = Observable::new(Vec::new());
        let (_calls, loader) = counting_loader(vec![1]);
        let list = LazyList::new(cell.clone(), LazyListOptions::new(loader), pool.spawner());

        let writer = list.clone();
        let _sub = list.subscribe(move |seen| {
            if seen == [1] {
                writer.set(vec![7]);
            }
        });

        let _ = list.data();
        pool.run_until_stalled();
        assert_eq!(cell.get(), vec![7]);
        assert_eq!(list.data(), vec![7]);
    }

    #[test]
    fn dropping_binding_releases_cell_subscription() {
        let pool = LocalPool::new();
        let cell = Observable::new(vec![1u32]);
        let list = LazyList::new(cell.clone(), LazyListOptions::new(Vec::<u32>::new), pool.spawner());
        assert_eq!(cell.subscriber_count(), 1);

        drop(list);
        assert_eq!(cell.subscriber_count(), 0);
        cell.set(vec![2]);
    }
}
