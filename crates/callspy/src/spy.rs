//! The call-recording proxy.
//!
//! ```text
//! caller ──call(args)──► Spy ──invoke(args)──► target
//!                         │ ◄──────result──────┘
//!                         ├─ InvocationRecord { args, result, clock.now(), call site }
//!                         ├─ history.push(record)
//! caller ◄──result────────┘
//! ```
//!
//! Invocations are serialized by a call gate held from "invoke target"
//! through "append record", so history order is call order even when the
//! spy is shared between threads. The gate is reentrant: a target that
//! calls back into its own spy on the same thread nests, and the inner call
//! is recorded first because it completes first. The history itself sits
//! behind its own lock so a running target can still inspect the spy.

use crate::clock::{Clock, SystemClock};
use crate::config::SpyConfig;
use crate::gate::CallGate;
use crate::invocable::Invocable;
use crate::record::InvocationRecord;
use crate::result::{SpyError, SpyResult};
use crate::trace::StackCapture;
use serde::Serialize;
use std::fmt;
use std::panic::Location;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

/// Whether a spy has seen a completed call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpyState {
    /// No call has completed yet
    Unused,
    /// At least one call is recorded; never left once entered
    Used,
}

/// Shared record handle stored in a spy's history
pub type Record<F, Args> = Arc<InvocationRecord<Args, <F as Invocable<Args>>::Output>>;

/// Transparent proxy that records every completed call to its target
///
/// Cloning a `Spy` yields another handle onto the same target and history,
/// so a test can hand one clone to the code under test and inspect the
/// other.
///
/// # Example
///
/// ```
/// use callspy::Spy;
///
/// let multiply = Spy::new(|a: i32, b: i32| a * b);
/// assert_eq!(multiply.call((5, 3)), 15);
///
/// let last = multiply.last_call().unwrap();
/// assert_eq!(last.arguments(), &(5, 3));
/// assert_eq!(*last.result(), 15);
/// ```
pub struct Spy<F, Args>
where
    F: Invocable<Args>,
{
    inner: Arc<Inner<F, Args, F::Output>>,
}

struct Inner<F, Args, R> {
    target: F,
    config: SpyConfig,
    clock: Arc<dyn Clock>,
    stack: Arc<dyn StackCapture>,
    gate: CallGate,
    history: RwLock<Vec<Arc<InvocationRecord<Args, R>>>>,
}

impl<F, Args> Spy<F, Args>
where
    F: Invocable<Args>,
{
    /// Wrap `target` with default configuration
    pub fn new(target: F) -> Self {
        SpyBuilder::new(target).build()
    }

    /// Wrap `target` with the given configuration
    pub fn with_config(target: F, config: SpyConfig) -> Self {
        SpyBuilder::new(target).config(config).build()
    }

    /// Call the target and record the completed call
    ///
    /// The arguments are forwarded as-is and the target's return value is
    /// handed back unchanged. If the target panics the panic propagates and
    /// nothing is recorded.
    ///
    /// The record keeps its own copy of the arguments and the result, so
    /// both must be `Clone`. Owned values, shared references, `Arc`s and
    /// other `Clone` types all qualify. A target taking `&mut T` or
    /// returning a non-`Clone` value can't be spied through `call`; wrap the
    /// value in `Arc` (or `Arc<Mutex<T>>` for mutation) first.
    #[track_caller]
    pub fn call(&self, args: Args) -> F::Output
    where
        Args: Clone,
        F::Output: Clone,
    {
        let caller = Location::caller();
        let _pass = self.inner.gate.enter();
        let result = self.inner.target.invoke(args.clone());
        self.inner.append(args, result.clone(), caller);
        result
    }

    /// Call a fallible target, recording only successful calls
    ///
    /// `Ok(value)` is recorded and returned. `Err(error)` is returned
    /// untouched and leaves no record.
    #[track_caller]
    pub fn try_call<T, E>(&self, args: Args) -> Result<T, E>
    where
        F: Invocable<Args, Output = Result<T, E>>,
        Args: Clone,
        T: Clone,
    {
        let caller = Location::caller();
        let _pass = self.inner.gate.enter();
        match self.inner.target.invoke(args.clone()) {
            Ok(value) => {
                self.inner.append(args, Ok(value.clone()), caller);
                Ok(value)
            }
            Err(error) => {
                tracing::debug!(
                    spy = self.inner.label(),
                    call_site = %caller,
                    "target returned an error, call not recorded"
                );
                Err(error)
            }
        }
    }

    /// Number of completed calls
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.inner.history().len()
    }

    /// Whether any call has completed
    #[must_use]
    pub fn was_called(&self) -> bool {
        self.call_count() > 0
    }

    /// Most recent completed call
    ///
    /// # Errors
    ///
    /// Returns [`SpyError::NoCallsRecorded`] if the spy hasn't been called.
    pub fn last_call(&self) -> SpyResult<Record<F, Args>> {
        self.inner
            .history()
            .last()
            .cloned()
            .ok_or_else(|| SpyError::NoCallsRecorded {
                spy: self.inner.config.name.clone(),
            })
    }

    /// All completed calls in call order
    ///
    /// The returned vector is a snapshot: later calls don't show up in it
    /// and nothing done to it reaches the spy.
    #[must_use]
    pub fn calls(&self) -> Vec<Record<F, Args>> {
        self.inner.history().clone()
    }

    /// Completed call at `index` (0 = first)
    #[must_use]
    pub fn nth_call(&self, index: usize) -> Option<Record<F, Args>> {
        self.inner.history().get(index).cloned()
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> SpyState {
        if self.was_called() {
            SpyState::Used
        } else {
            SpyState::Unused
        }
    }

    /// Configured name
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.inner.config.name.as_deref()
    }

    /// Configuration the spy was built with
    #[must_use]
    pub fn config(&self) -> &SpyConfig {
        &self.inner.config
    }

    /// The wrapped target
    #[must_use]
    pub fn target(&self) -> &F {
        &self.inner.target
    }

    /// Pretty-printed JSON array of the recorded calls
    pub fn to_json(&self) -> SpyResult<String>
    where
        Args: Serialize,
        F::Output: Serialize,
    {
        let history = self.inner.history();
        let records: Vec<&InvocationRecord<Args, F::Output>> =
            history.iter().map(|record| &**record).collect();
        Ok(serde_json::to_string_pretty(&records)?)
    }
}

impl<Args, R, F> Inner<F, Args, R> {
    fn history(&self) -> RwLockReadGuard<'_, Vec<Arc<InvocationRecord<Args, R>>>> {
        self.history.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn append(&self, args: Args, result: R, caller: &'static Location<'static>) {
        let record = InvocationRecord::captured(
            args,
            result,
            self.clock.as_ref(),
            self.stack.as_ref(),
            caller,
        );
        let mut history = self.history.write().unwrap_or_else(PoisonError::into_inner);
        if self.config.log_calls {
            tracing::trace!(
                spy = self.label(),
                call = history.len() + 1,
                depth = self.gate.depth(),
                call_site = %record.call_site(),
                "recorded call"
            );
        }
        history.push(Arc::new(record));
    }

    fn label(&self) -> &str {
        self.config.name.as_deref().unwrap_or("<unnamed>")
    }
}

impl<F, Args> Clone for Spy<F, Args>
where
    F: Invocable<Args>,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F, Args> fmt::Debug for Spy<F, Args>
where
    F: Invocable<Args>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spy")
            .field("name", &self.inner.config.name)
            .field("calls", &self.call_count())
            .field("clock", &self.inner.clock)
            .field("stack", &self.inner.stack)
            .finish_non_exhaustive()
    }
}

/// Builder for a [`Spy`] with custom collaborators
///
/// ```
/// use callspy::{FakeClock, FixedMarker, SpyBuilder};
/// use std::sync::Arc;
///
/// let spy = SpyBuilder::new(|name: &str| name.len())
///     .name("measure")
///     .clock(Arc::new(FakeClock::fixed(0)))
///     .stack_capture(Arc::new(FixedMarker::new("setup")))
///     .build();
///
/// spy.call(("abc",));
/// assert_eq!(spy.last_call().unwrap().call_site().as_marker(), Some("setup"));
/// ```
pub struct SpyBuilder<F> {
    target: F,
    config: SpyConfig,
    clock: Option<Arc<dyn Clock>>,
    stack: Option<Arc<dyn StackCapture>>,
}

impl<F> SpyBuilder<F> {
    /// Start building a spy around `target`
    pub fn new(target: F) -> Self {
        Self {
            target,
            config: SpyConfig::default(),
            clock: None,
            stack: None,
        }
    }

    /// Replace the configuration
    #[must_use]
    pub fn config(mut self, config: SpyConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the spy name
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = Some(name.into());
        self
    }

    /// Clock used to stamp records (default: [`SystemClock`])
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Call-site capturer (default: derived from the configured trace mode)
    #[must_use]
    pub fn stack_capture(mut self, stack: Arc<dyn StackCapture>) -> Self {
        self.stack = Some(stack);
        self
    }

    /// Finish the spy
    pub fn build<Args>(self) -> Spy<F, Args>
    where
        F: Invocable<Args>,
    {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let stack = self.stack.unwrap_or_else(|| self.config.trace.capturer());
        tracing::debug!(
            spy = self.config.name.as_deref().unwrap_or("<unnamed>"),
            trace = %self.config.trace,
            "spy created"
        );
        Spy {
            inner: Arc::new(Inner {
                target: self.target,
                config: self.config,
                clock,
                stack,
                gate: CallGate::default(),
                history: RwLock::new(Vec::new()),
            }),
        }
    }
}

impl<F> fmt::Debug for SpyBuilder<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpyBuilder")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .field("stack", &self.stack)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::config::TraceMode;
    use crate::trace::FixedMarker;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    fn stub_fn(a: i32, b: i32) -> i32 {
        a * b
    }

    // =========================================================================
    // Forwarding and recording
    // =========================================================================

    #[test]
    fn test_call_forwards_and_records() {
        let spy = Spy::new(stub_fn);

        assert_eq!(spy.call((5, 3)), 15);

        assert_eq!(spy.call_count(), 1);
        let last = spy.last_call().unwrap();
        assert_eq!(last.arguments(), &(5, 3));
        assert_eq!(*last.result(), 15);
    }

    #[test]
    fn test_zero_result_is_recorded() {
        let spy = Spy::new(stub_fn);

        assert_eq!(spy.call((7, 0)), 0);
        assert_eq!(*spy.last_call().unwrap().result(), 0);
    }

    #[test]
    fn test_none_and_empty_results_are_recorded() {
        let lookup = Spy::new(|_key: &str| None::<u32>);
        assert_eq!(lookup.call(("missing",)), None);
        assert_eq!(lookup.last_call().unwrap().result(), &None);

        let empty = Spy::new(String::new);
        assert_eq!(empty.call(()), "");
        assert_eq!(empty.last_call().unwrap().result(), "");
        assert_eq!(empty.last_call().unwrap().arguments(), &());
    }

    #[test]
    fn test_calls_in_order() {
        let spy = Spy::new(stub_fn);
        spy.call((1, 2));
        spy.call((5, 4));

        let calls = spy.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].arguments(), &(1, 2));
        assert_eq!(*calls[0].result(), 2);
        assert_eq!(calls[1].arguments(), &(5, 4));
        assert_eq!(*calls[1].result(), 20);
        assert!(Arc::ptr_eq(&spy.last_call().unwrap(), &calls[1]));
    }

    #[test]
    fn test_nth_call() {
        let spy = Spy::new(stub_fn);
        spy.call((2, 2));
        spy.call((3, 3));

        assert_eq!(*spy.nth_call(0).unwrap().result(), 4);
        assert_eq!(*spy.nth_call(1).unwrap().result(), 9);
        assert!(spy.nth_call(2).is_none());
    }

    #[test]
    fn test_calls_snapshot_is_detached() {
        let spy = Spy::new(stub_fn);
        spy.call((1, 1));

        let mut snapshot = spy.calls();
        snapshot.clear();
        spy.call((2, 2));

        assert!(snapshot.is_empty());
        assert_eq!(spy.calls().len(), 2);
    }

    // =========================================================================
    // State machine
    // =========================================================================

    #[test]
    fn test_unused_spy() {
        let spy: Spy<_, (i32, i32)> = Spy::new(stub_fn);

        assert!(!spy.was_called());
        assert_eq!(spy.call_count(), 0);
        assert_eq!(spy.state(), SpyState::Unused);
        assert!(matches!(
            spy.last_call(),
            Err(SpyError::NoCallsRecorded { spy: None })
        ));
    }

    #[test]
    fn test_used_is_terminal() {
        let spy = Spy::new(|divisor: i32| 10 / divisor);
        spy.call((1,));
        assert_eq!(spy.state(), SpyState::Used);

        let _ = catch_unwind(AssertUnwindSafe(|| spy.call((0,))));
        assert_eq!(spy.state(), SpyState::Used);
    }

    #[test]
    fn test_named_spy_error() {
        let spy: Spy<_, (i32, i32)> =
            Spy::with_config(stub_fn, SpyConfig::new().with_name("stub_fn"));

        assert_eq!(spy.name(), Some("stub_fn"));
        let err = spy.last_call().unwrap_err();
        assert_eq!(err.to_string(), "stub_fn hasn't been called");
    }

    // =========================================================================
    // Failure pass-through
    // =========================================================================

    #[test]
    fn test_panicking_target_is_not_recorded() {
        let spy = Spy::new(|divisor: i32| 100 / divisor);
        spy.call((4,));

        let outcome = catch_unwind(AssertUnwindSafe(|| spy.call((0,))));

        assert!(outcome.is_err());
        assert_eq!(spy.call_count(), 1);
        assert_eq!(spy.call((5,)), 20);
        assert_eq!(spy.call_count(), 2);
    }

    #[test]
    fn test_try_call_records_success_only() {
        let parse = Spy::new(|raw: &str| raw.parse::<u8>());

        assert_eq!(parse.try_call(("42",)), Ok(42));
        assert!(parse.try_call(("nope",)).is_err());

        assert_eq!(parse.call_count(), 1);
        let last = parse.last_call().unwrap();
        assert_eq!(last.arguments(), &("42",));
        assert_eq!(last.result(), &Ok(42));
    }

    #[test]
    fn test_try_call_returns_error_unchanged() {
        #[derive(Debug, PartialEq)]
        struct Refused(&'static str);

        let spy = Spy::new(|code: u16| -> Result<u16, Refused> {
            if code >= 400 {
                Err(Refused("client error"))
            } else {
                Ok(code)
            }
        });

        assert_eq!(spy.try_call((404,)), Err(Refused("client error")));
        assert!(!spy.was_called());
    }

    #[test]
    fn test_call_records_returned_err_values() {
        let spy = Spy::new(|raw: &str| raw.parse::<u8>());
        assert!(spy.call(("x",)).is_err());
        assert_eq!(spy.call_count(), 1);
        assert!(spy.last_call().unwrap().result().is_err());
    }

    // =========================================================================
    // Collaborators
    // =========================================================================

    #[test]
    fn test_fake_clock_stamps_records() {
        let clock = Arc::new(FakeClock::fixed(1_705_312_800_000));
        let spy = SpyBuilder::new(stub_fn).clock(clock.clone()).build();

        spy.call((1, 1));
        clock.fast_forward_ms(1_000);
        spy.call((2, 2));

        let calls = spy.calls();
        assert_eq!(calls[0].timestamp().timestamp_millis(), 1_705_312_800_000);
        assert_eq!(calls[1].timestamp().timestamp_millis(), 1_705_312_801_000);
    }

    #[test]
    fn test_default_trace_is_stack_snapshot() {
        let spy = Spy::new(stub_fn);
        let line = line!() + 1;
        spy.call((1, 1));

        let last = spy.last_call().unwrap();
        let location = last.call_site().location().unwrap();
        assert!(location.file().ends_with("spy.rs"));
        assert_eq!(location.line(), line);
        assert!(last.call_site().backtrace().is_some());
    }

    #[test]
    fn test_location_mode_skips_stack() {
        let spy = Spy::with_config(
            stub_fn,
            SpyConfig::new().with_trace(TraceMode::Location),
        );
        spy.call((1, 1));

        let last = spy.last_call().unwrap();
        assert!(last.call_site().location().is_some());
        assert!(last.call_site().backtrace().is_none());
    }

    #[test]
    fn test_custom_stack_capture() {
        let spy = SpyBuilder::new(stub_fn)
            .stack_capture(Arc::new(FixedMarker::new("ctx")))
            .build();
        spy.call((1, 1));
        assert_eq!(spy.last_call().unwrap().call_site().as_marker(), Some("ctx"));
    }

    // =========================================================================
    // Handles and export
    // =========================================================================

    #[test]
    fn test_clones_share_history() {
        let spy = Spy::new(stub_fn);
        let handle = spy.clone();

        handle.call((3, 3));
        assert_eq!(spy.call_count(), 1);
        assert!(Arc::ptr_eq(
            &spy.last_call().unwrap(),
            &handle.last_call().unwrap()
        ));
    }

    #[test]
    fn test_target_is_exposed_read_only() {
        let spy: Spy<_, (i32, i32)> = Spy::new(stub_fn);
        assert_eq!((spy.target())(6, 7), 42);
        assert!(!spy.was_called());
    }

    #[test]
    fn test_to_json() {
        let spy = SpyBuilder::new(stub_fn)
            .clock(Arc::new(FakeClock::fixed(0)))
            .stack_capture(Arc::new(FixedMarker::new("test")))
            .build();
        spy.call((5, 3));

        let json: serde_json::Value = serde_json::from_str(&spy.to_json().unwrap()).unwrap();
        assert_eq!(json[0]["arguments"], serde_json::json!([5, 3]));
        assert_eq!(json[0]["result"], 15);
        assert_eq!(json[0]["call_site"], "test");
    }

    #[test]
    fn test_debug_output() {
        let spy = SpyBuilder::new(stub_fn).name("dbg").build();
        spy.call((1, 2));
        let rendered = format!("{spy:?}");
        assert!(rendered.contains("dbg"));
        assert!(rendered.contains("calls: 1"));
    }
}
