// Error types
//
// HandlerError is what a handler reports when its work failed; the
// scheduler never retries it. Error is what run()/start()/stop() give
// back to whoever drives the loop.

use core::fmt;

use crate::kernel::EventId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerError {
    Failed(&'static str),
    Code(i32),
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Failed(msg) => write!(f, "handler failed: {}", msg),
            HandlerError::Code(code) => write!(f, "handler failed with code {}", code),
        }
    }
}

/// `E` is the tick source's own error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error<E> {
    /// The tick source could not be armed; the loop never started.
    Arm(E),
    /// A handler failed and the policy is to propagate. The event was
    /// still rescheduled before the loop stopped.
    Handler { id: EventId, source: HandlerError },
    AlreadyRunning,
    NotRunning,
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Arm(e) => write!(f, "failed to arm tick source: {:?}", e),
            Error::Handler { id, source } => write!(f, "event {}: {}", id, source),
            Error::AlreadyRunning => write!(f, "scheduler already running"),
            Error::NotRunning => write!(f, "scheduler not running"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HandlerError {}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for Error<E> {}
