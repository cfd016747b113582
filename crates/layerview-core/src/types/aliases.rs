//! Type aliases for commonly used complex types.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use layerview_core::types::*;
//!
//! // Instead of: Arc<Mutex<Vec<BufferHandle>>>
//! let queue: ThreadSafeVec<BufferHandle> = thread_safe_vec();
//! ```

use crate::color::Rgba;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

// =============================================================================
// THREAD-SAFE SHARED TYPES (Arc<Mutex<Vec<T>>> / Arc<RwLock<T>>)
// =============================================================================

/// A thread-safe vector for cross-thread collection management.
///
/// Uses `parking_lot::Mutex`, so locking never returns a poison error.
pub type ThreadSafeVec<T> = Arc<Mutex<Vec<T>>>;

/// A thread-safe reader-writer lock wrapper for read-heavy workloads.
///
/// Multiple readers can access concurrently, but writes require exclusive access.
pub type ThreadSafeRw<T> = Arc<RwLock<T>>;

// =============================================================================
// CALLBACK TYPES
// =============================================================================

/// Resolves the material color of an extruder (tool) index.
pub type ExtruderColorFn = Arc<dyn Fn(usize) -> Rgba + Send + Sync>;

/// Resolves the XY offset (mm) of an extruder relative to extruder 0.
pub type ExtruderOffsetFn = Arc<dyn Fn(usize) -> [f64; 2] + Send + Sync>;

// =============================================================================
// CONSTRUCTOR HELPERS
// =============================================================================

/// Create a new empty `ThreadSafeVec<T>`.
#[inline]
pub fn thread_safe_vec<T>() -> ThreadSafeVec<T> {
    Arc::new(Mutex::new(Vec::new()))
}

/// Create a new `ThreadSafeRw<T>` from a value.
#[inline]
pub fn thread_safe_rw<T>(value: T) -> ThreadSafeRw<T> {
    Arc::new(RwLock::new(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_safe_vec_shared_between_clones() {
        let vec: ThreadSafeVec<u32> = thread_safe_vec();
        let other = Arc::clone(&vec);
        vec.lock().push(1);
        other.lock().push(2);

        assert_eq!(vec.lock().len(), 2);
    }

    #[test]
    fn test_thread_safe_rw() {
        let value: ThreadSafeRw<i32> = thread_safe_rw(42);

        // Multiple readers
        assert_eq!(*value.read(), 42);
        assert_eq!(*value.read(), 42);

        // Writer
        *value.write() = 100;
        assert_eq!(*value.read(), 100);
    }

    #[test]
    fn test_extruder_callbacks() {
        let colors: ExtruderColorFn = Arc::new(|tool| {
            if tool == 0 {
                Rgba::ORANGE
            } else {
                Rgba::CYAN
            }
        });
        let offsets: ExtruderOffsetFn = Arc::new(|tool| [tool as f64 * 20.0, 0.0]);

        assert_eq!(colors(0), Rgba::ORANGE);
        assert_eq!(colors(1), Rgba::CYAN);
        assert_eq!(offsets(2), [40.0, 0.0]);
    }
}
