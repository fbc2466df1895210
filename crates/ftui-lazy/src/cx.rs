//! Liveness context (`Cx`) for lazy list bindings.
//!
//! A binding owns a `Cx` for as long as the component that created it is
//! mounted. Pending loads check it before writing back, so a load that
//! resolves after teardown never touches the shared list cell.
//!
//! # Design
//!
//! `Cx` is cheaply cloneable (`Arc` inside) and read-only. Cancellation is
//! triggered through the companion [`CxController`]. A child context observes
//! the cancellation of any ancestor, which lets a parent component tear down
//! every binding it created with one call.
//!
//! # Example
//!
//! ```
//! use ftui_lazy::cx::Cx;
//!
//! let (parent, parent_ctrl) = Cx::background();
//! let (child, _child_ctrl) = parent.child_inherit();
//! assert!(!child.is_cancelled());
//!
//! parent_ctrl.cancel();
//! assert!(child.is_cancelled());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use thiserror::Error;

static NEXT_CX_ID: AtomicU64 = AtomicU64::new(1);

fn next_cx_id() -> u64 {
    NEXT_CX_ID.fetch_add(1, Ordering::Relaxed)
}

/// Total number of Cx cancellations observed.
static CX_CANCELLATIONS_TOTAL: AtomicU64 = AtomicU64::new(0);

/// Read the total cancellation count (for diagnostics).
#[must_use]
pub fn cx_cancellations_total() -> u64 {
    CX_CANCELLATIONS_TOTAL.load(Ordering::Relaxed)
}

#[derive(Debug)]
struct CxInner {
    id: u64,
    cancelled: AtomicBool,
    parent: Option<Arc<CxInner>>,
}

impl CxInner {
    fn is_cancelled(&self) -> bool {
        if self.cancelled.load(Ordering::Acquire) {
            return true;
        }
        self.parent.as_ref().is_some_and(|p| p.is_cancelled())
    }
}

/// Liveness context handle.
///
/// Check `is_cancelled()` before any write that must not outlive the owner.
#[derive(Clone, Debug)]
pub struct Cx {
    inner: Arc<CxInner>,
}

impl Cx {
    /// Create a root context.
    #[must_use]
    pub fn background() -> (Self, CxController) {
        Self::new_inner(None)
    }

    /// Derive a child context. Cancelling `self` also cancels the child.
    #[must_use]
    pub fn child_inherit(&self) -> (Self, CxController) {
        Self::new_inner(Some(Arc::clone(&self.inner)))
    }

    fn new_inner(parent: Option<Arc<CxInner>>) -> (Self, CxController) {
        let inner = Arc::new(CxInner {
            id: next_cx_id(),
            cancelled: AtomicBool::new(false),
            parent,
        });
        let ctrl = CxController {
            inner: Arc::clone(&inner),
        };
        (Self { inner }, ctrl)
    }

    /// Unique identifier for this context (for tracing/logging).
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Check if this context (or any ancestor) has been cancelled.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Return `Err` if the context has been cancelled.
    pub fn check(&self) -> Result<(), CxError> {
        if self.is_cancelled() {
            Err(CxError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Control handle for a [`Cx`].
///
/// Dropping the controller does **not** cancel the context; cancellation
/// is always explicit.
#[derive(Debug)]
pub struct CxController {
    inner: Arc<CxInner>,
}

impl CxController {
    /// Cancel the associated context. Idempotent.
    pub fn cancel(&self) {
        let was_cancelled = self.inner.cancelled.swap(true, Ordering::Release);
        if !was_cancelled {
            CX_CANCELLATIONS_TOTAL.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(cx_id = self.inner.id, "cx cancelled");
        }
    }

    /// Whether this context itself has been cancelled (ancestors not checked).
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }
}

/// Error returned by [`Cx::check`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CxError {
    /// The context, or one of its ancestors, was cancelled.
    #[error("context cancelled")]
    Cancelled,
}
