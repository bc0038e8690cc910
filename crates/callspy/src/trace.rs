//! Call-site capture.
//!
//! A record's call site is diagnostic context only: the spy stores whatever
//! the configured [`StackCapture`] hands back and never looks inside it. The
//! default is a stack snapshot taken when the record is built, alongside the
//! `#[track_caller]` location of the code that invoked the spy.

use serde::{Serialize, Serializer};
use std::backtrace::Backtrace;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Where an invocation came from
#[derive(Debug, Clone)]
pub enum CallSiteTrace {
    /// Stack snapshot taken at record construction, with the invoking location
    Stack {
        /// Source location of the code that invoked the spy
        caller: &'static Location<'static>,
        /// Frames of the recording thread at that moment
        backtrace: Arc<Backtrace>,
    },
    /// Source location only
    Caller(&'static Location<'static>),
    /// Caller-supplied marker
    Marker(String),
}

impl CallSiteTrace {
    /// Snapshot of the current stack, located at the caller of this function
    #[track_caller]
    #[must_use]
    pub fn here() -> Self {
        Self::Stack {
            caller: Location::caller(),
            backtrace: Arc::new(Backtrace::force_capture()),
        }
    }

    /// Caller-supplied marker
    pub fn marker(marker: impl Into<String>) -> Self {
        Self::Marker(marker.into())
    }

    /// Source location, if this trace carries one
    #[must_use]
    pub fn location(&self) -> Option<&'static Location<'static>> {
        match self {
            Self::Stack { caller, .. } | Self::Caller(caller) => Some(*caller),
            Self::Marker(_) => None,
        }
    }

    /// Stack snapshot, if this trace carries one
    #[must_use]
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self {
            Self::Stack { backtrace, .. } => Some(backtrace),
            _ => None,
        }
    }

    /// Marker text, if this trace carries one
    #[must_use]
    pub fn as_marker(&self) -> Option<&str> {
        match self {
            Self::Marker(marker) => Some(marker),
            _ => None,
        }
    }
}

impl PartialEq for CallSiteTrace {
    fn eq(&self, other: &Self) -> bool {
        fn same_location(a: &Location<'_>, b: &Location<'_>) -> bool {
            a.file() == b.file() && a.line() == b.line() && a.column() == b.column()
        }

        match (self, other) {
            // snapshots compare by identity
            (
                Self::Stack { caller: a, backtrace: x },
                Self::Stack { caller: b, backtrace: y },
            ) => same_location(a, b) && Arc::ptr_eq(x, y),
            (Self::Caller(a), Self::Caller(b)) => same_location(a, b),
            (Self::Marker(a), Self::Marker(b)) => a == b,
            _ => false,
        }
    }
}

/// `{}` renders the location; `{:#}` adds the stack snapshot
impl fmt::Display for CallSiteTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stack { caller, backtrace } if f.alternate() => {
                write!(f, "{caller}\n{backtrace}")
            }
            Self::Stack { caller, .. } | Self::Caller(caller) => write!(f, "{caller}"),
            Self::Marker(marker) => f.write_str(marker),
        }
    }
}

impl Serialize for CallSiteTrace {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&format_args!("{self:#}"))
    }
}

/// Produces the call-site trace for a new record
///
/// `caller` is the location of the code that invoked the spy, as reported
/// by `#[track_caller]`.
pub trait StackCapture: Send + Sync + fmt::Debug {
    /// Capture the trace for one invocation
    fn capture(&self, caller: &'static Location<'static>) -> CallSiteTrace;
}

/// Snapshots the full stack regardless of `RUST_BACKTRACE`
#[derive(Debug, Clone, Copy, Default)]
pub struct StackSnapshot;

impl StackCapture for StackSnapshot {
    fn capture(&self, caller: &'static Location<'static>) -> CallSiteTrace {
        CallSiteTrace::Stack {
            caller,
            backtrace: Arc::new(Backtrace::force_capture()),
        }
    }
}

/// Records only the caller's source location
#[derive(Debug, Clone, Copy, Default)]
pub struct CallerLocation;

impl StackCapture for CallerLocation {
    fn capture(&self, caller: &'static Location<'static>) -> CallSiteTrace {
        CallSiteTrace::Caller(caller)
    }
}

/// Stamps every record with the same marker
#[derive(Debug, Clone, Default)]
pub struct FixedMarker(pub String);

impl FixedMarker {
    /// Create a marker capturer
    pub fn new(marker: impl Into<String>) -> Self {
        Self(marker.into())
    }
}

impl StackCapture for FixedMarker {
    fn capture(&self, _caller: &'static Location<'static>) -> CallSiteTrace {
        CallSiteTrace::Marker(self.0.clone())
    }
}
