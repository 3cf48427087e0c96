//! Mutex used by the diagnostic sinks.
//!
//! Sinks are the only state shared between concurrent forward calls. The
//! `fast-lock` feature swaps in `parking_lot`; the default is `std::sync`.

#[cfg(feature = "fast-lock")]
use parking_lot::Mutex as ParkingLotMutex;

#[cfg(not(feature = "fast-lock"))]
use std::sync::Mutex as StdMutex;

/// `parking_lot` mutex.
///
/// # Example
///
/// ```rust
/// use fewtag::sync::{lock, Mutex};
///
/// let data = Mutex::new(42);
/// *lock(&data) = 100;
/// assert_eq!(*lock(&data), 100);
/// ```
#[cfg(feature = "fast-lock")]
pub type Mutex<T> = ParkingLotMutex<T>;

/// Standard library mutex; see [`lock`] for poison handling.
#[cfg(not(feature = "fast-lock"))]
pub type Mutex<T> = StdMutex<T>;

/// Acquire the sink lock.
///
/// A `std` mutex poisoned by a panicking writer is recovered rather than
/// propagated; the worst outcome is one truncated record.
#[cfg(feature = "fast-lock")]
pub fn lock<T>(mutex: &Mutex<T>) -> parking_lot::MutexGuard<'_, T> {
    mutex.lock()
}

/// Acquire the sink lock, recovering a poisoned guard.
#[cfg(not(feature = "fast-lock"))]
pub fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
