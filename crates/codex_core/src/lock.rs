//! Lock acquisition that reports poisoning as an invariant violation.

use codex_error::InvariantError;
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Acquire a read guard.
///
/// # Errors
///
/// `InvariantError` if a previous holder panicked.
pub fn read_lock<'a, T>(lock: &'a RwLock<T>, what: &str) -> Result<RwLockReadGuard<'a, T>, InvariantError> {
    lock.read()
        .map_err(|_| InvariantError::new(format!("{} lock poisoned", what)))
}

/// Acquire a write guard.
///
/// # Errors
///
/// `InvariantError` if a previous holder panicked.
pub fn write_lock<'a, T>(lock: &'a RwLock<T>, what: &str) -> Result<RwLockWriteGuard<'a, T>, InvariantError> {
    lock.write()
        .map_err(|_| InvariantError::new(format!("{} lock poisoned", what)))
}

/// Acquire a mutex guard.
///
/// # Errors
///
/// `InvariantError` if a previous holder panicked.
pub fn lock_mutex<'a, T>(lock: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, InvariantError> {
    lock.lock()
        .map_err(|_| InvariantError::new(format!("{} lock poisoned", what)))
}
