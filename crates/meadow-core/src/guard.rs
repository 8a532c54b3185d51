//! Re-entrancy guard
//!
//! One in-progress flag per component. Entering while the flag is set fails
//! immediately instead of blocking; the flag is cleared when the returned
//! scope is dropped, on success and on early return alike.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::{Error, Result};

#[derive(Debug)]
pub struct ReentrancyGuard {
    component: &'static str,
    entered: AtomicBool,
}

impl ReentrancyGuard {
    pub const fn new(component: &'static str) -> Self {
        Self {
            component,
            entered: AtomicBool::new(false),
        }
    }

    /// Mark the component busy until the returned scope drops.
    pub fn enter(&self) -> Result<GuardScope<'_>> {
        self.entered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                tracing::warn!(component = self.component, "Nested call rejected");
                Error::Reentrancy {
                    component: self.component,
                }
            })?;
        Ok(GuardScope { guard: self })
    }

    pub fn is_entered(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }
}

/// Held for the duration of one guarded call
#[must_use]
#[derive(Debug)]
pub struct GuardScope<'a> {
    guard: &'a ReentrancyGuard,
}

impl Drop for GuardScope<'_> {
    fn drop(&mut self) {
        self.guard.entered.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_enter_fails() {
        let guard = ReentrancyGuard::new("router");
        let scope = guard.enter().unwrap();
        assert!(guard.is_entered());
        assert_eq!(
            guard.enter().unwrap_err(),
            Error::Reentrancy { component: "router" }
        );
        drop(scope);
        assert!(!guard.is_entered());
    }

    #[test]
    fn test_released_after_failure() {
        let guard = ReentrancyGuard::new("farm");
        let failing = || -> Result<()> {
            let _scope = guard.enter()?;
            Err(Error::Config("boom".into()))
        };
        assert!(failing().is_err());
        assert!(guard.enter().is_ok());
    }
}
