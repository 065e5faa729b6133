//! Reader/writer lock primitive with upgrade and recursion awareness
//!
//! [`RawReaderWriter`] is the seam the scoped guards are generic over. It
//! coordinates access only; it does not own the data it protects.
//!
//! [`ReaderWriterLock`] is the provided implementation. It is built on a
//! `parking_lot` mutex and condition variable and records which thread holds
//! the lock in which mode, so that it can:
//!
//! - treat a request the current thread already satisfies (shared while
//!   holding exclusive, a second shared hold, ...) as a no-op,
//! - promote an upgradeable hold to exclusive without giving up its place,
//! - report a [`LockError::RecursionViolation`] instead of deadlocking when a
//!   plain reader asks for exclusive access.
//!
//! Waiting writers block new readers, so a steady stream of readers cannot
//! starve a writer. No FIFO ordering is provided beyond that.

use std::collections::HashSet;
use std::fmt;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::warn;

use crate::error::{LockError, LockResult};

/// Mode in which a lock is requested or held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Shared read access, many holders at once
    Shared,
    /// Shared read access that may later be promoted to exclusive; at most
    /// one upgradeable holder at a time
    Upgradeable,
    /// Exclusive write access, single holder
    Exclusive,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared => write!(f, "shared"),
            Self::Upgradeable => write!(f, "upgradeable"),
            Self::Exclusive => write!(f, "exclusive"),
        }
    }
}

/// What an acquisition actually did
///
/// Returned by the `acquire_*` methods and handed back to
/// [`RawReaderWriter::release`] so the release undoes exactly that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    /// A new shared hold
    Shared,
    /// A new upgradeable hold
    Upgradeable,
    /// A new exclusive hold
    Exclusive,
    /// Exclusive access obtained by promoting the thread's upgradeable hold;
    /// releasing it reverts to upgradeable
    Upgraded,
    /// The thread already held a compatible lock; releasing is a no-op
    Reentrant,
}

impl Acquisition {
    /// Check whether releasing this acquisition changes the lock state
    pub fn is_reentrant(&self) -> bool {
        matches!(self, Self::Reentrant)
    }
}

/// Reader/writer coordination primitive
///
/// Acquisition blocks the calling thread until granted or until `timeout`
/// elapses (`None` waits indefinitely). Implementations decide recursion
/// policy; compatible re-acquisition must return [`Acquisition::Reentrant`].
pub trait RawReaderWriter: Send + Sync {
    /// Acquire shared access
    fn acquire_shared(&self, timeout: Option<Duration>) -> LockResult<Acquisition>;

    /// Acquire upgradeable shared access
    fn acquire_upgradeable(&self, timeout: Option<Duration>) -> LockResult<Acquisition>;

    /// Acquire exclusive access, promoting an upgradeable hold of the
    /// current thread if there is one
    fn acquire_exclusive(&self, timeout: Option<Duration>) -> LockResult<Acquisition>;

    /// Undo an acquisition made by the current thread
    fn release(&self, acquisition: Acquisition);

    /// Strongest mode the current thread holds, if any
    fn held_mode(&self) -> Option<LockMode>;
}

#[derive(Debug, Default)]
struct LockState {
    readers: HashSet<ThreadId>,
    upgradeable: Option<ThreadId>,
    writer: Option<ThreadId>,
    waiting_writers: usize,
    upgrade_pending: bool,
}

impl LockState {
    fn held_by(&self, thread: ThreadId) -> Option<LockMode> {
        if self.writer == Some(thread) {
            Some(LockMode::Exclusive)
        } else if self.upgradeable == Some(thread) {
            Some(LockMode::Upgradeable)
        } else if self.readers.contains(&thread) {
            Some(LockMode::Shared)
        } else {
            None
        }
    }

    fn can_share(&self) -> bool {
        self.writer.is_none() && self.waiting_writers == 0 && !self.upgrade_pending
    }

    fn can_hold_upgradeable(&self) -> bool {
        self.writer.is_none() && self.upgradeable.is_none() && self.waiting_writers == 0
    }

    fn can_upgrade(&self) -> bool {
        self.writer.is_none() && self.readers.is_empty()
    }

    fn can_write(&self) -> bool {
        self.writer.is_none() && self.upgradeable.is_none() && self.readers.is_empty()
    }
}

/// Default [`RawReaderWriter`] implementation
///
/// ```
/// use expiration_cache::sync::{LockMode, LockReader, LockWriter, ReaderWriterLock};
///
/// let lock = ReaderWriterLock::new();
/// {
///     let _writer = LockWriter::new(&lock)?;
///     assert_eq!(lock.current_mode(), Some(LockMode::Exclusive));
///
///     // Shared access is already implied by the exclusive hold
///     let reader = LockReader::new(&lock)?;
///     assert!(reader.is_reentrant());
/// }
/// assert_eq!(lock.current_mode(), None);
/// # Ok::<(), expiration_cache::error::LockError>(())
/// ```
#[derive(Debug, Default)]
pub struct ReaderWriterLock {
    state: Mutex<LockState>,
    changed: Condvar,
}

impl ReaderWriterLock {
    /// Create an unlocked lock
    pub fn new() -> Self {
        Self::default()
    }

    /// Strongest mode the current thread holds, if any
    pub fn current_mode(&self) -> Option<LockMode> {
        self.state.lock().held_by(thread::current().id())
    }

    /// Number of threads holding plain shared access
    pub fn reader_count(&self) -> usize {
        self.state.lock().readers.len()
    }

    /// Check whether any thread holds exclusive access
    pub fn is_write_locked(&self) -> bool {
        self.state.lock().writer.is_some()
    }

    /// Block on the condition variable until `ready` holds or the deadline
    /// passes. Returns whether `ready` holds.
    fn wait_until(
        &self,
        state: &mut MutexGuard<'_, LockState>,
        deadline: Option<Instant>,
        ready: fn(&LockState) -> bool,
    ) -> bool {
        while !ready(&**state) {
            match deadline {
                Some(deadline) => {
                    if self.changed.wait_until(state, deadline).timed_out() {
                        return ready(&**state);
                    }
                }
                None => self.changed.wait(state),
            }
        }
        true
    }

    fn timed_out(&self, mode: LockMode, timeout: Option<Duration>) -> LockError {
        // Waiters we held back (readers behind a waiting writer) must re-check
        self.changed.notify_all();
        let timeout = timeout.unwrap_or(Duration::MAX);
        warn!(%mode, ?timeout, "lock acquisition timed out");
        LockError::Timeout { mode, timeout }
    }
}

fn deadline_for(timeout: Option<Duration>) -> Option<Instant> {
    timeout.and_then(|timeout| Instant::now().checked_add(timeout))
}

fn recursion(requested: LockMode, held: LockMode) -> LockError {
    warn!(%requested, %held, "lock recursion violation");
    LockError::RecursionViolation { requested, held }
}

impl RawReaderWriter for ReaderWriterLock {
    fn acquire_shared(&self, timeout: Option<Duration>) -> LockResult<Acquisition> {
        let me = thread::current().id();
        let mut state = self.state.lock();

        if state.held_by(me).is_some() {
            return Ok(Acquisition::Reentrant);
        }

        if !self.wait_until(&mut state, deadline_for(timeout), LockState::can_share) {
            return Err(self.timed_out(LockMode::Shared, timeout));
        }

        state.readers.insert(me);
        Ok(Acquisition::Shared)
    }

    fn acquire_upgradeable(&self, timeout: Option<Duration>) -> LockResult<Acquisition> {
        let me = thread::current().id();
        let mut state = self.state.lock();

        match state.held_by(me) {
            Some(LockMode::Exclusive | LockMode::Upgradeable) => return Ok(Acquisition::Reentrant),
            Some(LockMode::Shared) => {
                return Err(recursion(LockMode::Upgradeable, LockMode::Shared));
            }
            None => {}
        }

        if !self.wait_until(&mut state, deadline_for(timeout), LockState::can_hold_upgradeable) {
            return Err(self.timed_out(LockMode::Upgradeable, timeout));
        }

        state.upgradeable = Some(me);
        Ok(Acquisition::Upgradeable)
    }

    fn acquire_exclusive(&self, timeout: Option<Duration>) -> LockResult<Acquisition> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        let deadline = deadline_for(timeout);

        match state.held_by(me) {
            Some(LockMode::Exclusive) => Ok(Acquisition::Reentrant),
            Some(LockMode::Shared) => Err(recursion(LockMode::Exclusive, LockMode::Shared)),
            Some(LockMode::Upgradeable) => {
                state.upgrade_pending = true;
                let granted = self.wait_until(&mut state, deadline, LockState::can_upgrade);
                state.upgrade_pending = false;
                if !granted {
                    return Err(self.timed_out(LockMode::Exclusive, timeout));
                }
                state.writer = Some(me);
                Ok(Acquisition::Upgraded)
            }
            None => {
                state.waiting_writers += 1;
                let granted = self.wait_until(&mut state, deadline, LockState::can_write);
                state.waiting_writers -= 1;
                if !granted {
                    return Err(self.timed_out(LockMode::Exclusive, timeout));
                }
                state.writer = Some(me);
                Ok(Acquisition::Exclusive)
            }
        }
    }

    fn release(&self, acquisition: Acquisition) {
        let me = thread::current().id();
        let mut state = self.state.lock();

        match acquisition {
            Acquisition::Reentrant => return,
            Acquisition::Shared => {
                state.readers.remove(&me);
            }
            Acquisition::Upgradeable => {
                if state.upgradeable == Some(me) {
                    state.upgradeable = None;
                }
            }
            Acquisition::Exclusive | Acquisition::Upgraded => {
                if state.writer == Some(me) {
                    state.writer = None;
                }
            }
        }

        drop(state);
        self.changed.notify_all();
    }

    fn held_mode(&self) -> Option<LockMode> {
        self.current_mode()
    }
}
