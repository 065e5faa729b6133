//! Scoped lock guards
//!
//! Constructing a guard acquires the lock; dropping it releases it. Release is
//! idempotent: [`LockReader::release`] / [`LockWriter::release`] may be called
//! early and the later drop does nothing. Guards are tied to the thread that
//! created them (`!Send`), since the primitive tracks holders per thread.

use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use super::lock::{Acquisition, LockMode, RawReaderWriter, ReaderWriterLock};
use crate::error::LockResult;

/// Shared (or upgradeable shared) hold on a reader/writer lock
///
/// # Example
/// ```
/// use std::time::Duration;
///
/// use expiration_cache::sync::{LockMode, LockReader, ReaderWriterLock};
///
/// let lock = ReaderWriterLock::new();
/// let reader = LockReader::upgradeable_with_timeout(&lock, Some(Duration::from_secs(1)))?;
/// {
///     // Promote without giving up the upgradeable hold
///     let writer = reader.upgrade()?;
///     assert!(writer.is_upgraded());
///     assert_eq!(lock.current_mode(), Some(LockMode::Exclusive));
/// }
/// // Dropping the writer reverts to upgradeable, not unlocked
/// assert_eq!(lock.current_mode(), Some(LockMode::Upgradeable));
/// drop(reader);
/// assert_eq!(lock.current_mode(), None);
/// # Ok::<(), expiration_cache::error::LockError>(())
/// ```
pub struct LockReader<'a, L: RawReaderWriter + ?Sized = ReaderWriterLock> {
    lock: &'a L,
    mode: LockMode,
    acquisition: Option<Acquisition>,
    _thread_bound: PhantomData<*const ()>,
}

impl<'a, L: RawReaderWriter + ?Sized> LockReader<'a, L> {
    /// Acquire shared access, waiting indefinitely
    pub fn new(lock: &'a L) -> LockResult<Self> {
        Self::with_timeout(lock, None)
    }

    /// Acquire shared access, failing with `LockError::Timeout` once
    /// `timeout` elapses (`None` waits indefinitely)
    pub fn with_timeout(lock: &'a L, timeout: Option<Duration>) -> LockResult<Self> {
        let acquisition = lock.acquire_shared(timeout)?;
        Ok(Self::held(lock, LockMode::Shared, acquisition))
    }

    /// Acquire upgradeable shared access, waiting indefinitely
    pub fn upgradeable(lock: &'a L) -> LockResult<Self> {
        Self::upgradeable_with_timeout(lock, None)
    }

    /// Acquire upgradeable shared access with a timeout
    pub fn upgradeable_with_timeout(lock: &'a L, timeout: Option<Duration>) -> LockResult<Self> {
        let acquisition = lock.acquire_upgradeable(timeout)?;
        Ok(Self::held(lock, LockMode::Upgradeable, acquisition))
    }

    fn held(lock: &'a L, mode: LockMode, acquisition: Acquisition) -> Self {
        Self { lock, mode, acquisition: Some(acquisition), _thread_bound: PhantomData }
    }

    /// Promote to exclusive access, waiting indefinitely
    ///
    /// See [`LockReader::upgrade_with_timeout`].
    pub fn upgrade(&self) -> LockResult<LockWriter<'_, L>> {
        self.upgrade_with_timeout(None)
    }

    /// Promote to exclusive access
    ///
    /// Only an upgradeable reader can be promoted; a plain shared reader gets
    /// `LockError::RecursionViolation`. The returned writer borrows this
    /// reader, and releasing it reverts the lock to upgradeable shared.
    pub fn upgrade_with_timeout(&self, timeout: Option<Duration>) -> LockResult<LockWriter<'_, L>> {
        let acquisition = self.lock.acquire_exclusive(timeout)?;
        Ok(LockWriter::held(self.lock, acquisition))
    }

    /// The mode this reader was requested in
    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Check whether the reader still holds its acquisition
    pub fn is_held(&self) -> bool {
        self.acquisition.is_some()
    }

    /// Check whether acquisition was a no-op because the thread already held
    /// a compatible lock
    pub fn is_reentrant(&self) -> bool {
        self.acquisition.is_some_and(|acquisition| acquisition.is_reentrant())
    }

    /// Release the hold now; later calls and the drop do nothing
    pub fn release(&mut self) {
        if let Some(acquisition) = self.acquisition.take() {
            self.lock.release(acquisition);
        }
    }
}

impl<L: RawReaderWriter + ?Sized> Drop for LockReader<'_, L> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<L: RawReaderWriter + ?Sized> fmt::Debug for LockReader<'_, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockReader")
            .field("mode", &self.mode)
            .field("acquisition", &self.acquisition)
            .finish()
    }
}

/// Exclusive hold on a reader/writer lock
///
/// Either acquired directly or produced by [`LockReader::upgrade`].
pub struct LockWriter<'a, L: RawReaderWriter + ?Sized = ReaderWriterLock> {
    lock: &'a L,
    acquisition: Option<Acquisition>,
    _thread_bound: PhantomData<*const ()>,
}

impl<'a, L: RawReaderWriter + ?Sized> LockWriter<'a, L> {
    /// Acquire exclusive access, waiting indefinitely
    pub fn new(lock: &'a L) -> LockResult<Self> {
        Self::with_timeout(lock, None)
    }

    /// Acquire exclusive access with a timeout
    pub fn with_timeout(lock: &'a L, timeout: Option<Duration>) -> LockResult<Self> {
        let acquisition = lock.acquire_exclusive(timeout)?;
        Ok(Self::held(lock, acquisition))
    }

    fn held(lock: &'a L, acquisition: Acquisition) -> Self {
        Self { lock, acquisition: Some(acquisition), _thread_bound: PhantomData }
    }

    /// Check whether the writer still holds its acquisition
    pub fn is_held(&self) -> bool {
        self.acquisition.is_some()
    }

    /// Check whether this writer was promoted from an upgradeable hold
    pub fn is_upgraded(&self) -> bool {
        self.acquisition == Some(Acquisition::Upgraded)
    }

    /// Check whether acquisition was a no-op because the thread already held
    /// exclusive access
    pub fn is_reentrant(&self) -> bool {
        self.acquisition.is_some_and(|acquisition| acquisition.is_reentrant())
    }

    /// Release the hold now; later calls and the drop do nothing
    pub fn release(&mut self) {
        if let Some(acquisition) = self.acquisition.take() {
            self.lock.release(acquisition);
        }
    }
}

impl<L: RawReaderWriter + ?Sized> Drop for LockWriter<'_, L> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<L: RawReaderWriter + ?Sized> fmt::Debug for LockWriter<'_, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockWriter").field("acquisition", &self.acquisition).finish()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for sync::guard.
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    use parking_lot::Mutex;

    use super::*;
    use crate::error::LockError;

    /// Primitive that counts releases, to observe idempotence
    #[derive(Default)]
    struct CountingLock {
        inner: ReaderWriterLock,
        releases: AtomicUsize,
        released: Mutex<Vec<Acquisition>>,
    }

    impl RawReaderWriter for CountingLock {
        fn acquire_shared(&self, timeout: Option<Duration>) -> LockResult<Acquisition> {
            self.inner.acquire_shared(timeout)
        }

        fn acquire_upgradeable(&self, timeout: Option<Duration>) -> LockResult<Acquisition> {
            self.inner.acquire_upgradeable(timeout)
        }

        fn acquire_exclusive(&self, timeout: Option<Duration>) -> LockResult<Acquisition> {
            self.inner.acquire_exclusive(timeout)
        }

        fn release(&self, acquisition: Acquisition) {
            self.releases.fetch_add(1, Ordering::SeqCst);
            self.released.lock().push(acquisition);
            self.inner.release(acquisition);
        }

        fn held_mode(&self) -> Option<LockMode> {
            self.inner.held_mode()
        }
    }

    /// Validates that explicit release followed by drop releases once.
    #[test]
    fn test_release_is_idempotent() {
        let lock = CountingLock::default();
        {
            let mut writer = LockWriter::new(&lock).unwrap();
            writer.release();
            writer.release();
            assert!(!writer.is_held());
        }
        assert_eq!(lock.releases.load(Ordering::SeqCst), 1);

        {
            let mut reader = LockReader::new(&lock).unwrap();
            reader.release();
        }
        assert_eq!(lock.releases.load(Ordering::SeqCst), 2);
        assert_eq!(lock.held_mode(), None);
    }

    /// Validates release on early return through `?`.
    #[test]
    fn test_released_on_error_path() {
        fn fails_while_holding(lock: &ReaderWriterLock) -> Result<(), &'static str> {
            let _writer = LockWriter::new(lock).map_err(|_| "lock")?;
            Err("work failed")
        }

        let lock = ReaderWriterLock::new();
        assert_eq!(fails_while_holding(&lock), Err("work failed"));
        assert!(!lock.is_write_locked());
    }

    /// Validates that a plain reader cannot be upgraded.
    #[test]
    fn test_plain_reader_upgrade_fails() {
        let lock = ReaderWriterLock::new();
        let reader = LockReader::new(&lock).unwrap();
        assert_eq!(reader.mode(), LockMode::Shared);

        let err = reader.upgrade().unwrap_err();
        assert_eq!(
            err,
            LockError::RecursionViolation { requested: LockMode::Exclusive, held: LockMode::Shared }
        );
        assert!(reader.is_held());
    }

    /// Validates that the upgraded writer records `Upgraded` and the reader
    /// releases `Upgradeable` afterwards.
    #[test]
    fn test_upgrade_release_order() {
        let lock = CountingLock::default();
        {
            let reader = LockReader::upgradeable(&lock).unwrap();
            let writer = reader.upgrade().unwrap();
            assert!(writer.is_upgraded());
            assert!(!writer.is_reentrant());
        }
        assert_eq!(
            *lock.released.lock(),
            vec![Acquisition::Upgraded, Acquisition::Upgradeable]
        );
    }

    /// Validates that nested compatible guards do not unlock the outer one.
    #[test]
    fn test_nested_reader_under_writer() {
        let lock = ReaderWriterLock::new();
        let writer = LockWriter::new(&lock).unwrap();
        {
            let reader = LockReader::new(&lock).unwrap();
            assert!(reader.is_reentrant());
        }
        assert!(lock.is_write_locked());
        drop(writer);
        assert!(!lock.is_write_locked());
    }

    /// Validates the timeout path through the guard constructor.
    #[test]
    fn test_reader_times_out_behind_writer() {
        let lock = Arc::new(ReaderWriterLock::new());
        let writer = LockWriter::new(&*lock).unwrap();

        let contender = Arc::clone(&lock);
        let err = thread::spawn(move || {
            LockReader::with_timeout(&*contender, Some(Duration::from_millis(30))).map(|_| ())
        })
        .join()
        .unwrap()
        .unwrap_err();
        assert!(err.is_timeout());

        drop(writer);
    }
}
