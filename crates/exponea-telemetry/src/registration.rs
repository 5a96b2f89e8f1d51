//! Process-wide panic hook registration
//!
//! Holds the current [`CrashManager`] and installs the dispatching hook.
//!
//! Every installation captures the hook that was active right before it and
//! keeps it twice: on the manager, which calls it before doing its own work,
//! and inside the installed dispatcher. Installing several times therefore
//! builds a chain of dispatchers. A thread-local guard makes sure only the
//! outermost dispatcher runs manager logic; the inner ones just forward, so
//! the hook that was there before the first installation runs exactly once
//! per panic.
//!
//! The current manager has a single writer, [`CrashManager::start`]. Callers
//! must not start managers concurrently.

use std::cell::Cell;
use std::panic::{self, PanicHookInfo};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::manager::CrashManager;

/// A panic hook as returned by [`std::panic::take_hook`], shareable
pub type PanicHook = Arc<dyn Fn(&PanicHookInfo<'_>) + Send + Sync + 'static>;

static CURRENT: RwLock<Option<Arc<CrashManager>>> = RwLock::new(None);

thread_local! {
    static DISPATCHING: Cell<bool> = const { Cell::new(false) };
}

/// The manager that handles panics, if one was started
pub fn current() -> Option<Arc<CrashManager>> {
    CURRENT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Detaches the current manager.
///
/// Installed hooks stay in place and only forward to the hooks they replaced.
pub fn clear_current() {
    *CURRENT.write().unwrap_or_else(PoisonError::into_inner) = None;
}

/// Installs the dispatching hook for `manager` and makes it current.
pub(crate) fn install(manager: &Arc<CrashManager>) {
    let previous: PanicHook = Arc::from(panic::take_hook());
    manager.set_previous_handler(Arc::clone(&previous));

    panic::set_hook(Box::new(move |info| dispatch(info, &previous)));

    *CURRENT.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(manager));
    debug!("Crash handler installed");
}

fn dispatch(info: &PanicHookInfo<'_>, previous: &PanicHook) {
    let Some(_guard) = DispatchGuard::enter() else {
        previous(info);
        return;
    };

    match current() {
        Some(manager) => manager.uncaught_exception_handler(info),
        None => previous(info),
    }
}

/// Marks the current thread as running manager logic for a panic.
struct DispatchGuard;

impl DispatchGuard {
    /// `None` if this thread is already dispatching, or its thread-locals
    /// are gone.
    fn enter() -> Option<Self> {
        let entered = DISPATCHING
            .try_with(|dispatching| !dispatching.replace(true))
            .unwrap_or(false);
        entered.then_some(Self)
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        let _ = DISPATCHING.try_with(|dispatching| dispatching.set(false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_is_not_reentrant() {
        let outer = DispatchGuard::enter();
        assert!(outer.is_some());
        assert!(DispatchGuard::enter().is_none());

        drop(outer);
        assert!(DispatchGuard::enter().is_some());
    }

    #[test]
    fn test_guard_is_per_thread() {
        let _outer = DispatchGuard::enter().unwrap();
        let entered_elsewhere = std::thread::spawn(|| DispatchGuard::enter().is_some())
            .join()
            .unwrap();
        assert!(entered_elsewhere);
    }
}
