//! The immutable record of one completed invocation.

use crate::clock::Clock;
use crate::trace::{CallSiteTrace, StackCapture};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::panic::Location;

/// One completed call made through a spy
///
/// Fields are private and there is no `&mut` API: once built, a record
/// never changes. `arguments` and `result` hold exactly what was passed
/// and returned, including zero, empty and `None` results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationRecord<Args, R> {
    timestamp: DateTime<Utc>,
    arguments: Args,
    result: R,
    call_site: CallSiteTrace,
}

impl<Args, R> InvocationRecord<Args, R> {
    /// Record stamped with the current time and a stack snapshot
    #[track_caller]
    pub fn new(arguments: Args, result: R) -> Self {
        Self::with_context(arguments, result, None, None)
    }

    /// Record with an optional timestamp and call-site trace
    ///
    /// Whatever is left out is captured now: `Utc::now()` for the timestamp
    /// and a snapshot of the current stack, located at the caller, for the
    /// trace.
    #[track_caller]
    pub fn with_context(
        arguments: Args,
        result: R,
        timestamp: Option<DateTime<Utc>>,
        call_site: Option<CallSiteTrace>,
    ) -> Self {
        Self {
            timestamp: timestamp.unwrap_or_else(Utc::now),
            arguments,
            result,
            // direct call so #[track_caller] reaches our caller
            call_site: match call_site {
                Some(trace) => trace,
                None => CallSiteTrace::here(),
            },
        }
    }

    /// Record whose context is read from the given collaborators
    pub fn captured(
        arguments: Args,
        result: R,
        clock: &dyn Clock,
        stack: &dyn StackCapture,
        caller: &'static Location<'static>,
    ) -> Self {
        Self {
            timestamp: clock.now(),
            arguments,
            result,
            call_site: stack.capture(caller),
        }
    }

    /// When the call completed
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Arguments as passed
    #[must_use]
    pub const fn arguments(&self) -> &Args {
        &self.arguments
    }

    /// Value returned by the target
    #[must_use]
    pub const fn result(&self) -> &R {
        &self.result
    }

    /// Where the call came from
    #[must_use]
    pub const fn call_site(&self) -> &CallSiteTrace {
        &self.call_site
    }

    /// Take the record apart
    pub fn into_parts(self) -> (DateTime<Utc>, Args, R, CallSiteTrace) {
        (self.timestamp, self.arguments, self.result, self.call_site)
    }
}
