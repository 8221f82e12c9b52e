//! Process-wide reconfiguration registry.
//!
//! Every stage capable of rebuilding itself against a new default device
//! registers a weak handle here on construction (see
//! [`RegistryHandle::register`]) and is dropped from the set automatically
//! once its strong owner goes away. `reconf_all` is the single entry point
//! the device layer calls after it observes a default-device change.

use std::sync::{Arc, Mutex, OnceLock, Weak};

use crate::traits::Reconfigurable;

type WeakEntry = Weak<dyn Reconfigurable>;

fn registry() -> &'static Mutex<Vec<WeakEntry>> {
    static REGISTRY: OnceLock<Mutex<Vec<WeakEntry>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(Vec::new()))
}

/// An RAII registration: holding this keeps the stage's weak handle in the
/// registry, but the handle itself does not keep the stage alive. Dropping
/// this removes the entry eagerly; if it is merely forgotten, the entry
/// is pruned lazily on the next `reconf_all`.
pub struct RegistryHandle {
    entry: WeakEntry,
}

impl RegistryHandle {
    /// Registers `stage` in the process-wide set and returns a handle
    /// tying the registration's lifetime to the caller (typically stored
    /// as a field on the stage itself).
    pub fn register(stage: &Arc<dyn Reconfigurable>) -> Self {
        let entry = Arc::downgrade(stage);
        registry().lock().unwrap_or_else(|e| e.into_inner()).push(entry.clone());
        Self { entry }
    }
}

impl Drop for RegistryHandle {
    fn drop(&mut self) {
        let mut guard = registry().lock().unwrap_or_else(|e| e.into_inner());
        guard.retain(|w| !w.ptr_eq(&self.entry));
    }
}

/// Calls `reconf()` on every stage still alive in the registry. Order is
/// unspecified. Dead entries (owner already dropped) are pruned in the
/// same pass.
pub fn reconf_all() {
    let mut guard = registry().lock().unwrap_or_else(|e| e.into_inner());
    guard.retain(|weak| {
        match weak.upgrade() {
            Some(stage) => {
                if let Err(e) = stage.reconf() {
                    tracing::warn!(error = %e, "reconfigurable stage failed to reconf");
                }
                true
            }
            None => false,
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStage {
        count: Arc<AtomicUsize>,
    }

    impl Reconfigurable for CountingStage {
        fn reconf(&self) -> Result<(), crate::error::BoxError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn reconf_all_calls_live_entries_and_skips_dropped_ones() {
        let count = Arc::new(AtomicUsize::new(0));
        let stage: Arc<dyn Reconfigurable> = Arc::new(CountingStage {
            count: Arc::clone(&count),
        });
        let handle = RegistryHandle::register(&stage);

        reconf_all();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        drop(stage);
        drop(handle);
        reconf_all();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
