//! callspy: Call-Recording Spies for Rust Tests
//!
//! Wrap a function, method or closure in a [`Spy`] and hand the spy to the
//! code under test. Every call goes straight through to the real target;
//! the spy only remembers what happened so the test can look afterwards.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      CALLSPY Architecture                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Code under │    │    Spy     │    │   Target   │            │
//! │   │ test       │───►│ (gate +    │───►│ (Fn, method│            │
//! │   │            │◄───│  history)  │◄───│  closure)  │            │
//! │   └────────────┘    └─────┬──────┘    └────────────┘            │
//! │                           │ Clock + StackCapture                │
//! │                           ▼                                     │
//! │                  Vec<Arc<InvocationRecord>>                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use callspy::Spy;
//!
//! let caught = 3;
//! let describe = Spy::new(move |value: i32, message: &str| {
//!     format!("{message} = {}", value + caught)
//! });
//!
//! assert_eq!(describe.call((55, "result")), "result = 58");
//! assert_eq!(describe.call_count(), 1);
//!
//! let last = describe.last_call().unwrap();
//! assert_eq!(last.arguments(), &(55, "result"));
//! assert_eq!(last.result(), "result = 58");
//! ```

#![warn(missing_docs)]

mod clock;
mod config;
pub mod dynamic;
mod gate;
mod invocable;
mod record;
mod result;
mod spy;
mod trace;

pub use clock::{Clock, ClockError, FakeClock, SystemClock};
pub use config::{SpyConfig, TraceMode, LOG_CALLS_ENV, TRACE_ENV};
pub use dynamic::{DynamicSpy, Registry, Target};
pub use invocable::Invocable;
pub use record::InvocationRecord;
pub use result::{SpyError, SpyResult};
pub use spy::{Record, Spy, SpyBuilder, SpyState};
pub use trace::{CallSiteTrace, CallerLocation, FixedMarker, StackCapture, StackSnapshot};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::clock::*;
    pub use super::config::*;
    pub use super::dynamic::{DynamicSpy, Registry, Target};
    pub use super::invocable::*;
    pub use super::record::*;
    pub use super::result::*;
    pub use super::spy::*;
    pub use super::trace::*;
}
