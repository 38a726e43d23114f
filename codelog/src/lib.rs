//! # codelog - Code Event Distribution and Sampling Profiler
//!
//! codelog records what a managed runtime does with its generated code:
//! every creation, relocation, deoptimization and disabled optimization,
//! plus statistical samples of the running thread. Producers (compiler,
//! GC, interpreter) describe each event once; the registry fans it out to
//! every registered encoder, and each encoder writes its own format.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │              Runtime (compiler / GC / interpreter)              │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ LogEvent (borrowed, stack-allocated)
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Logger (listener registry)                     │
//! │        timestamps with LogClock, broadcasts EventRecord         │
//! └──┬──────────────┬──────────────┬──────────────┬─────────────┬───┘
//!    ▼              ▼              ▼              ▼             ▼
//! ┌────────┐  ┌───────────┐  ┌───────────┐  ┌──────────┐  ┌──────────┐
//! │  Text  │  │ Low-level │  │ perf map  │  │   JIT    │  │ External │
//! │  log   │  │   (.ll)   │  │ (/tmp/..) │  │ callback │  │   API    │
//! └────────┘  └───────────┘  └───────────┘  └──────────┘  └──────────┘
//!    ▲
//!    │ tick records
//! ┌──┴──────────────────────────────────────────────────────────────┐
//! │  TickSource → Ticker (SamplingThread) → SampleRing → Profiler   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`domain`]: code objects, tags, kinds, names and error types
//! - [`events`]: the event model, the [`events::Logger`] registry and its clock
//! - [`listeners`]: the encoders, the bounded name formatter and the replay
//!   of pre-existing code
//! - [`log_file`]: the shared, lock-protected text destination
//! - [`profiling`]: sample capture, the bounded ring and the consumer thread
//! - [`session`]: builds, owns and tears down a configured set of encoders
//! - [`config`]: logging options
//! - [`export`]: offline decoding of the low-level log
//! - [`cli`]: command-line arguments and event replay scripts
//!
//! ## Failure Policy
//!
//! Nothing on the event path returns an error to the producer. A
//! destination that fails to open disables its encoder at setup; a write
//! that fails later is reported through the `log` facade and dropped.

pub mod cli;
pub mod config;
pub mod domain;
pub mod events;
pub mod export;
pub mod listeners;
pub mod log_file;
pub mod profiling;
pub mod session;

#[cfg(test)]
mod test_support;
