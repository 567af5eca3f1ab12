//! Per-page live viewer counters.
//!
//! Each page source owns a [`PageView`] whose count is only ever changed
//! through atomic operations, so a handle obtained from the map can be
//! mutated after the map lock is released.  The count never goes negative.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

// ---------------------------------------------------------------------------
// PageView
// ---------------------------------------------------------------------------

/// Viewer count for a single page source.
#[derive(Debug)]
pub struct PageView {
    source: String,
    count: AtomicU64,
}

impl PageView {
    fn new(source: &str, initial: u64) -> Self {
        Self {
            source: source.to_owned(),
            count: AtomicU64::new(initial),
        }
    }

    #[cfg(test)]
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn increment(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    /// Decrement by one unless the count is already zero.
    pub fn decrement(&self) {
        let _ = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// ViewCounter
// ---------------------------------------------------------------------------

/// Mapping from page source to its [`PageView`].
#[derive(Debug, Default)]
pub struct ViewCounter {
    views: Mutex<HashMap<String, Arc<PageView>>>,
}

impl ViewCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more viewer of `source`, creating the entry at 1 if needed.
    pub fn add(&self, source: &str) {
        let mut views = self.lock();
        match views.get(source) {
            Some(view) => view.increment(),
            None => {
                views.insert(source.to_owned(), Arc::new(PageView::new(source, 1)));
            }
        }
        trace!(source, "viewer added");
    }

    pub fn get(&self, source: &str) -> Option<Arc<PageView>> {
        self.lock().get(source).cloned()
    }

    /// Return the entry for `source`, inserting one at 0 if it is missing.
    pub fn get_or_set(&self, source: &str) -> Arc<PageView> {
        let mut views = self.lock();
        Arc::clone(
            views
                .entry(source.to_owned())
                .or_insert_with(|| Arc::new(PageView::new(source, 0))),
        )
    }

    pub fn reset(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Sum of every page's current count.
    pub fn total(&self) -> u64 {
        self.lock().values().map(|v| v.count()).sum()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<PageView>>> {
        self.views.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_creates_at_one_then_increments() {
        let views = ViewCounter::new();
        views.add("page-a");
        assert_eq!(views.get("page-a").unwrap().count(), 1);
        views.add("page-a");
        views.add("page-a");
        assert_eq!(views.get("page-a").unwrap().count(), 3);
        assert!(views.get("page-b").is_none());
    }

    #[test]
    fn get_or_set_inserts_at_zero_and_returns_existing() {
        let views = ViewCounter::new();
        let fresh = views.get_or_set("page-a");
        assert_eq!(fresh.count(), 0);
        assert_eq!(fresh.source(), "page-a");

        fresh.increment();
        let again = views.get_or_set("page-a");
        assert_eq!(again.count(), 1);
        assert!(Arc::ptr_eq(&fresh, &again));
        assert_eq!(views.len(), 1);
    }

    #[test]
    fn decrement_floors_at_zero() {
        let views = ViewCounter::new();
        views.add("page-a");
        let view = views.get("page-a").unwrap();
        view.decrement();
        view.decrement();
        view.decrement();
        assert_eq!(view.count(), 0);
        view.increment();
        assert_eq!(view.count(), 1);
    }

    #[test]
    fn count_tracks_adds_minus_decrements() {
        let views = ViewCounter::new();
        let ops: &[(bool, u32)] = &[(true, 3), (false, 1), (true, 2), (false, 5), (true, 1)];
        let mut expected: u64 = 0;
        for &(is_add, times) in ops {
            for _ in 0..times {
                if is_add {
                    views.add("p");
                    expected += 1;
                } else {
                    views.get_or_set("p").decrement();
                    expected = expected.saturating_sub(1);
                }
            }
            assert_eq!(views.get("p").unwrap().count(), expected);
        }
    }

    #[test]
    fn racing_decrements_never_underflow() {
        let views = Arc::new(ViewCounter::new());
        for _ in 0..100 {
            views.add("p");
        }
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let views = Arc::clone(&views);
                std::thread::spawn(move || {
                    let view = views.get("p").unwrap();
                    for _ in 0..50 {
                        view.decrement();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(views.get("p").unwrap().count(), 0);
    }

    #[test]
    fn total_and_reset() {
        let views = ViewCounter::new();
        views.add("a");
        views.add("a");
        views.add("b");
        assert_eq!(views.total(), 3);
        views.reset();
        assert!(views.is_empty());
        assert!(views.get("a").is_none());
    }
}
