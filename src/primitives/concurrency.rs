#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::types::Result;

/// Lazily materialized, shared, read-only state.
///
/// The first callers racing to build serialize on a build lock and exactly
/// one build runs; the rest observe the published snapshot. Once published,
/// readers only clone an [`Arc`] under a short shared lock and compute
/// without holding anything. A failed build publishes nothing, so the next
/// caller retries.
pub struct BuildOnce<T> {
    name: &'static str,
    state: RwLock<Option<Arc<T>>>,
    build_lock: Mutex<()>,
    builds: AtomicU64,
}

impl<T> BuildOnce<T> {
    /// Creates an empty cell; `name` labels trace events.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: RwLock::new(None),
            build_lock: Mutex::new(()),
            builds: AtomicU64::new(0),
        }
    }

    /// Returns the published snapshot, if any.
    pub fn get(&self) -> Option<Arc<T>> {
        self.state.read().clone()
    }

    /// Whether a snapshot has been published.
    pub fn is_built(&self) -> bool {
        self.state.read().is_some()
    }

    /// Number of builds that completed successfully over the cell's lifetime.
    pub fn build_count(&self) -> u64 {
        self.builds.load(Ordering::Acquire)
    }

    /// Returns the published snapshot, building it first if needed.
    pub fn get_or_try_build<F>(&self, build: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        if let Some(state) = self.get() {
            return Ok(state);
        }
        let _guard = self.build_lock.lock();
        // Another caller may have published while we waited.
        if let Some(state) = self.get() {
            debug!(cell = self.name, "build_once.joined");
            return Ok(state);
        }
        self.publish(build()?)
    }

    /// Builds a fresh snapshot and swaps it in.
    ///
    /// Readers already holding the previous snapshot keep it until they drop
    /// their handle.
    pub fn rebuild<F>(&self, build: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        let _guard = self.build_lock.lock();
        self.publish(build()?)
    }

    fn publish(&self, value: T) -> Result<Arc<T>> {
        let state = Arc::new(value);
        *self.state.write() = Some(Arc::clone(&state));
        let builds = self.builds.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(cell = self.name, builds, "build_once.published");
        Ok(state)
    }
}

impl<T> std::fmt::Debug for BuildOnce<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildOnce")
            .field("name", &self.name)
            .field("built", &self.is_built())
            .field("builds", &self.build_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecError;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn builds_once_and_reuses() -> Result<()> {
        let cell = BuildOnce::new("test");
        assert!(!cell.is_built());
        let first = cell.get_or_try_build(|| Ok(41 + 1))?;
        let second = cell.get_or_try_build(|| -> Result<i32> { panic!("must not rebuild") })?;
        assert_eq!(*first, 42);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cell.build_count(), 1);
        Ok(())
    }

    #[test]
    fn failed_build_leaves_cell_empty() {
        let cell: BuildOnce<i32> = BuildOnce::new("test");
        let err = cell
            .get_or_try_build(|| Err(RecError::Repository("offline".into())))
            .unwrap_err();
        assert!(matches!(err, RecError::Repository(_)));
        assert!(!cell.is_built());
        assert_eq!(cell.get_or_try_build(|| Ok(7)).unwrap().as_ref(), &7);
    }

    #[test]
    fn rebuild_swaps_snapshot() -> Result<()> {
        let cell = BuildOnce::new("test");
        let old = cell.get_or_try_build(|| Ok(String::from("old")))?;
        let new = cell.rebuild(|| Ok(String::from("new")))?;
        assert_eq!(old.as_str(), "old");
        assert_eq!(new.as_str(), "new");
        assert_eq!(cell.get().unwrap().as_str(), "new");
        assert_eq!(cell.build_count(), 2);
        Ok(())
    }

    #[test]
    fn concurrent_first_access_builds_once() {
        const THREADS: usize = 8;
        let cell = Arc::new(BuildOnce::new("test"));
        let barrier = Arc::new(Barrier::new(THREADS));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let cell = Arc::clone(&cell);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cell.get_or_try_build(|| {
                        thread::sleep(std::time::Duration::from_millis(10));
                        Ok(vec![1u8, 2, 3])
                    })
                    .unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().len(), 3);
        }
        assert_eq!(cell.build_count(), 1);
    }
}
