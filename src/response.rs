//! The streaming response composer.
//!
//! [`ResponseComposer`] builds an HTTP/1.1 response status line and header
//! block directly into a fixed-size buffer it owns, then hands that buffer
//! back out through the same chunk-handoff protocol as
//! [`crate::request::RequestParser`]: the caller pulls bytes out with
//! [`ResponseComposer::next_chunk_info`] and confirms how many it actually
//! wrote out (to a socket, say) with [`ResponseComposer::mark_read`].
//!
//! ```
//! use wicket_http1::response::ResponseComposer;
//!
//! let mut composer = ResponseComposer::<256>::new();
//! composer.add_status(200, "OK").unwrap();
//! composer.add_header(b"Content-Length", b"5").unwrap();
//! composer.end_headers().unwrap();
//!
//! let mut out = Vec::new();
//! loop {
//!     let chunk = composer.next_chunk_info(64);
//!     if chunk.is_empty() {
//!         break;
//!     }
//!     out.extend_from_slice(chunk);
//!     let n = chunk.len();
//!     composer.mark_read(n);
//! }
//! assert_eq!(&out, b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\n");
//! ```

use crate::chars::{is_header_name_valid, is_header_value_valid};
use crate::error::{ComposeError, Result};
use crate::status::canonical_reason;

const CRLF: &[u8] = b"\r\n";

/// Number of trailing bytes permanently reserved for the final
/// `\r\n\r\n` terminator written by [`ResponseComposer::end_headers`].
const TERMINATOR_RESERVE: usize = 4;

/// Minimum buffer capacity a [`ResponseComposer`] can be built with: large
/// enough for the shortest status line (`HTTP/1.1 100 \r\n`, no reason
/// phrase) plus the reserved terminator, with a little headroom for a
/// realistic single header.
pub const RESPONSE_COMPOSER_MIN_CAPACITY: usize = 52;

/// Suggested default buffer capacity for a [`ResponseComposer`], in bytes.
/// Just a convenient constant for callers picking a const-generic `N`;
/// the composer itself enforces no ceiling, only the
/// [`RESPONSE_COMPOSER_MIN_CAPACITY`] floor.
pub const HTTP_RESPONSE_MAX_HEADERS_DEFAULT_SIZE: u16 = 2048;

/// State of a [`ResponseComposer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerState {
    /// No status line written yet; only [`ResponseComposer::add_status`]
    /// or [`ResponseComposer::add_status_canonical`] is valid.
    Ready,
    /// Status line written; [`ResponseComposer::add_header`] or
    /// [`ResponseComposer::end_headers`] is valid.
    WritingHeaders,
    /// Header block terminated; only the chunk-handoff read methods are
    /// valid.
    Done,
}

/// A streaming HTTP/1.1 response composer over a `N`-byte buffer.
///
/// `N` must be at least [`RESPONSE_COMPOSER_MIN_CAPACITY`]; this is
/// checked at construction time via a `const` assertion evaluated in
/// [`ResponseComposer::new`], so an undersized `N` fails to compile rather
/// than panicking or silently truncating output.
pub struct ResponseComposer<const N: usize> {
    state: ComposerState,
    buffer: [u8; N],
    /// End of bytes written so far (the write cursor).
    write_end: u16,
    /// Start of the unread region (the chunk-handoff read cursor).
    read_start: u16,
}

impl<const N: usize> ResponseComposer<N> {
    const ASSERT_MIN_CAPACITY: () = assert!(
        N >= RESPONSE_COMPOSER_MIN_CAPACITY,
        "ResponseComposer capacity N is too small to hold a status line and the CRLF CRLF terminator"
    );

    /// Creates a new composer in [`ComposerState::Ready`] with an empty
    /// buffer.
    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let _ = Self::ASSERT_MIN_CAPACITY;
        ResponseComposer {
            state: ComposerState::Ready,
            buffer: [0u8; N],
            write_end: 0,
            read_start: 0,
        }
    }

    /// Returns the composer to [`ComposerState::Ready`], discarding
    /// whatever has been written (read or not). With `zero_buffer` (the
    /// recommended default), every buffer byte is overwritten with zero,
    /// so a previous response's bytes never leak into a reused composer's
    /// unread region.
    pub fn reset(&mut self, zero_buffer: bool) {
        if zero_buffer {
            self.buffer = [0u8; N];
        }
        self.state = ComposerState::Ready;
        self.write_end = 0;
        self.read_start = 0;
    }

    /// The current state.
    #[inline]
    pub fn state(&self) -> ComposerState {
        self.state
    }

    /// The compile-time buffer capacity, `N`.
    #[inline]
    pub fn capacity(&self) -> usize {
        N
    }

    fn remaining_for_write(&self) -> usize {
        N - self.write_end as usize
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.remaining_for_write() {
            return Err(ComposeError::InsufficientCapacity);
        }
        let start = self.write_end as usize;
        self.buffer[start..start + bytes.len()].copy_from_slice(bytes);
        self.write_end += bytes.len() as u16;
        Ok(())
    }

    /// Checks that writing `extra` more bytes still leaves room for the
    /// reserved terminator.
    fn check_reserve(&self, extra: usize) -> Result<()> {
        if extra + TERMINATOR_RESERVE > self.remaining_for_write() {
            return Err(ComposeError::InsufficientCapacity);
        }
        Ok(())
    }

    /// Writes the status line: `HTTP/1.1 <code> <reason>\r\n`.
    ///
    /// `code` and `reason` are written verbatim; neither is validated
    /// against the standard registry (use
    /// [`ResponseComposer::add_status_canonical`] for that). Valid only
    /// from [`ComposerState::Ready`].
    pub fn add_status(&mut self, code: u16, reason: &str) -> Result<()> {
        if self.state != ComposerState::Ready {
            return Err(ComposeError::BadState);
        }
        let mut code_buf = [0u8; 3];
        write_u16_as_3_digits(code, &mut code_buf);

        let needed = b"HTTP/1.1 ".len() + 3 + 1 + reason.len() + CRLF.len();
        self.check_reserve(needed)?;

        self.write_bytes(b"HTTP/1.1 ")?;
        self.write_bytes(&code_buf)?;
        self.write_bytes(b" ")?;
        self.write_bytes(reason.as_bytes())?;
        self.write_bytes(CRLF)?;

        self.state = ComposerState::WritingHeaders;
        trace!("wrote status line {} {}", code, reason);
        Ok(())
    }

    /// Writes the status line using the canonical reason phrase for
    /// `code` (see [`crate::status::canonical_reason`]), falling back to
    /// `"Unknown"` for a code outside the standard registry.
    pub fn add_status_canonical(&mut self, code: u16) -> Result<()> {
        let reason = canonical_reason(code).unwrap_or("Unknown");
        self.add_status(code, reason)
    }

    /// Writes one header line: `<name>: <value>\r\n`.
    ///
    /// Neither `name` nor `value` is validated against RFC 7230's tchar
    /// grammar; callers who want that check first can use
    /// [`is_header_name_valid`]/[`is_header_value_valid`] from
    /// [`crate::chars`]. Valid only from [`ComposerState::WritingHeaders`].
    pub fn add_header(&mut self, name: &[u8], value: &[u8]) -> Result<()> {
        if self.state != ComposerState::WritingHeaders {
            return Err(ComposeError::BadState);
        }
        // Deliberately excludes this header's own trailing CRLF: that CRLF,
        // plus the blank-line CRLF written by `end_headers`, are exactly the
        // two CRLFs `TERMINATOR_RESERVE` keeps standing room for.
        let needed = name.len() + b": ".len() + value.len();
        self.check_reserve(needed)?;

        self.write_bytes(name)?;
        self.write_bytes(b": ")?;
        self.write_bytes(value)?;
        self.write_bytes(CRLF)?;
        Ok(())
    }

    /// Writes the terminating blank line (`\r\n`) that ends the header
    /// block. Always succeeds if called from [`ComposerState::WritingHeaders`]
    /// — the terminator's 4 bytes are reserved in advance by every prior
    /// `add_status`/`add_header` call via [`ResponseComposer::check_reserve`].
    pub fn end_headers(&mut self) -> Result<()> {
        if self.state != ComposerState::WritingHeaders {
            return Err(ComposeError::BadState);
        }
        debug_assert!(self.remaining_for_write() >= TERMINATOR_RESERVE);
        // Every prior add_status/add_header call kept TERMINATOR_RESERVE
        // bytes standing room for this write, so it cannot overflow; written
        // directly rather than through the fallible write_bytes path.
        let start = self.write_end as usize;
        self.buffer[start..start + CRLF.len()].copy_from_slice(CRLF);
        self.write_end += CRLF.len() as u16;
        self.state = ComposerState::Done;
        Ok(())
    }

    /// Borrows up to `desired` unread bytes for the caller to write out
    /// (e.g. to a socket), per the chunk-handoff protocol. Returns an
    /// empty slice once every written byte has been handed out, or while
    /// the composer is still in [`ComposerState::Ready`] (nothing written
    /// yet).
    ///
    /// The caller must write at most the returned slice's length (in
    /// order, from the start), then call [`ResponseComposer::mark_read`]
    /// with the exact number of bytes it actually wrote out.
    pub fn next_chunk_info(&mut self, desired: usize) -> &[u8] {
        let start = self.read_start as usize;
        let end = self.write_end as usize;
        let max = desired.min(end - start);
        &self.buffer[start..start + max]
    }

    /// Advances the read cursor by `n` bytes, confirming that many bytes
    /// from the last [`ResponseComposer::next_chunk_info`] slice were
    /// successfully written out. `n` is clamped to the unread region's
    /// length.
    pub fn mark_read(&mut self, n: usize) {
        let unread = self.write_end as usize - self.read_start as usize;
        let n = n.min(unread);
        self.read_start += n as u16;
    }

    /// True once every byte written has also been confirmed read via
    /// [`ResponseComposer::mark_read`].
    #[inline]
    pub fn is_fully_read(&self) -> bool {
        self.read_start == self.write_end
    }
}

impl<const N: usize> Default for ResponseComposer<N> {
    fn default() -> Self {
        Self::new()
    }
}

fn write_u16_as_3_digits(code: u16, out: &mut [u8; 3]) {
    out[0] = b'0' + (code / 100 % 10) as u8;
    out[1] = b'0' + (code / 10 % 10) as u8;
    out[2] = b'0' + (code % 10) as u8;
}

#[cfg(test)]
mod tests {
    use super::*;
    use matches::assert_matches;

    fn drain<const N: usize>(composer: &mut ResponseComposer<N>, chunk_size: usize) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let chunk = composer.next_chunk_info(chunk_size);
            if chunk.is_empty() {
                break;
            }
            out.extend_from_slice(chunk);
            let n = chunk.len();
            composer.mark_read(n);
        }
        out
    }

    #[test]
    fn happy_path() {
        let mut c = ResponseComposer::<256>::new();
        c.add_status(200, "OK").unwrap();
        c.add_header(b"Content-Length", b"5").unwrap();
        c.add_header(b"Connection", b"close").unwrap();
        c.end_headers().unwrap();
        assert_matches!(c.state(), ComposerState::Done);

        let out = drain(&mut c, 1024);
        assert_eq!(
            out,
            b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\n".to_vec()
        );
        assert!(c.is_fully_read());
    }

    #[test]
    fn canonical_reason_used() {
        let mut c = ResponseComposer::<128>::new();
        c.add_status_canonical(404).unwrap();
        c.end_headers().unwrap();
        let out = drain(&mut c, 1024);
        assert_eq!(out, b"HTTP/1.1 404 Not Found\r\n\r\n".to_vec());
    }

    #[test]
    fn canonical_reason_falls_back_to_unknown() {
        let mut c = ResponseComposer::<128>::new();
        c.add_status_canonical(999).unwrap();
        c.end_headers().unwrap();
        let out = drain(&mut c, 1024);
        assert_eq!(out, b"HTTP/1.1 999 Unknown\r\n\r\n".to_vec());
    }

    #[test]
    fn out_of_order_calls_rejected() {
        let mut c = ResponseComposer::<128>::new();
        assert_matches!(c.add_header(b"X", b"y"), Err(ComposeError::BadState));
        assert_matches!(c.end_headers(), Err(ComposeError::BadState));

        c.add_status(200, "OK").unwrap();
        assert_matches!(c.add_status(200, "OK"), Err(ComposeError::BadState));

        c.end_headers().unwrap();
        assert_matches!(c.add_header(b"X", b"y"), Err(ComposeError::BadState));
        assert_matches!(c.end_headers(), Err(ComposeError::BadState));
    }

    #[test]
    fn insufficient_capacity_leaves_state_unchanged() {
        let mut c = ResponseComposer::<RESPONSE_COMPOSER_MIN_CAPACITY>::new();
        c.add_status(200, "OK").unwrap();
        assert_matches!(
            c.add_header(b"X-Very-Long-Header-Name", b"a-rather-long-value-too"),
            Err(ComposeError::InsufficientCapacity)
        );
        // Still in WritingHeaders: the failed add_header wrote nothing.
        assert_matches!(c.state(), ComposerState::WritingHeaders);
        c.add_header(b"X", b"y").unwrap();
        c.end_headers().unwrap();
        assert_matches!(c.state(), ComposerState::Done);
    }

    #[test]
    fn chunked_read_matches_whole_read() {
        let build = || {
            let mut c = ResponseComposer::<256>::new();
            c.add_status(200, "OK").unwrap();
            c.add_header(b"Host", b"example.com").unwrap();
            c.add_header(b"Accept", b"*/*").unwrap();
            c.end_headers().unwrap();
            c
        };

        let mut whole = build();
        let whole_out = drain(&mut whole, 1024);

        for chunk_size in [1, 2, 5, 13] {
            let mut c = build();
            let out = drain(&mut c, chunk_size);
            assert_eq!(out, whole_out);
            assert!(c.is_fully_read());
        }
    }

    #[test]
    fn reset_allows_reuse() {
        let mut c = ResponseComposer::<128>::new();
        c.add_status(200, "OK").unwrap();
        c.end_headers().unwrap();
        let _ = drain(&mut c, 1024);

        c.reset(false);
        assert_matches!(c.state(), ComposerState::Ready);
        c.add_status(500, "Internal Server Error").unwrap();
        c.end_headers().unwrap();
        let out = drain(&mut c, 1024);
        assert_eq!(out, b"HTTP/1.1 500 Internal Server Error\r\n\r\n".to_vec());
    }

    #[test]
    fn reset_zeroes_buffer_by_default() {
        let mut c = ResponseComposer::<64>::new();
        c.add_status(200, "OK").unwrap();
        c.end_headers().unwrap();
        let _ = drain(&mut c, 1024);

        c.reset(true);
        assert_matches!(c.state(), ComposerState::Ready);
        assert!(c.buffer.iter().all(|&b| b == 0));
    }

    #[test]
    fn header_validators_available_for_callers() {
        assert!(is_header_name_valid(b"X-Custom"));
        assert!(is_header_value_valid(b"anything printable"));
    }
}
