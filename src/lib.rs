#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![cfg_attr(test, deny(rust_2018_idioms))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # wicket-http1
//!
//! A zero-allocation HTTP/1.1 request parser and response composer for
//! resource-constrained environments.
//!
//! Both halves work over a fixed-size buffer the caller sizes at compile
//! time via a const generic (`RequestParser<const N: usize>`,
//! `ResponseComposer<const N: usize>`); neither ever allocates, and
//! neither owns a socket or performs I/O of its own. Driving one is a
//! small two-step loop: ask the codec for a writable (or readable) slice,
//! do the actual I/O yourself, then tell the codec how many bytes you
//! moved. See [`request::RequestParser`] and [`response::ResponseComposer`]
//! for the two loops.
//!
//! ## Crate layout
//!
//! - [`request`] — the streaming request parser.
//! - [`response`] — the streaming response composer.
//! - [`status`] — the canonical reason-phrase table.
//! - [`error`] — the composer's error type.
//! - [`chars`] — header name/value character-class validation shared by
//!   both halves.
//!
//! ## Optional Features
//!
//! - `std` — links the standard library instead of only `core`. Off by
//!   default; this crate has no use for `std` beyond implementing
//!   [`std::error::Error`] for [`error::ComposeError`].
//! - `logging` — emits `trace`/`debug`-level state-transition diagnostics
//!   through the [`log`] crate's facade. Off by default so the parser's
//!   hot loop carries no logging overhead unless a consumer opts in and
//!   installs a logger.

#[cfg(any(test, feature = "std"))]
extern crate std;

#[macro_use]
mod trace;

pub mod chars;
pub mod error;
pub mod request;
pub mod response;
pub mod status;
mod view;

pub use error::{ComposeError, Result};
pub use request::{ParserState, RequestParser};
pub use response::{ComposerState, ResponseComposer};
