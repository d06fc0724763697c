//! The streaming request parser.
//!
//! [`RequestParser`] incrementally consumes bytes into a fixed-size buffer
//! it owns, advancing a byte-oriented state machine, and exposes the
//! parsed method, request-target, and headers as slices borrowed straight
//! out of that buffer. Nothing is copied, and nothing is allocated: the
//! only storage is the `[u8; N]` embedded in the parser itself.
//!
//! Driving a parser is a two-step loop:
//!
//! ```
//! use wicket_http1::request::{ParserState, RequestParser};
//!
//! let mut parser = RequestParser::<512>::new();
//! let input = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";
//! let mut sent = 0;
//! while sent < input.len() {
//!     let chunk = parser.next_chunk_info(input.len() - sent);
//!     let n = chunk.len();
//!     chunk.copy_from_slice(&input[sent..sent + n]);
//!     parser.ingest(n);
//!     sent += n;
//! }
//!
//! assert_eq!(parser.state(), ParserState::Done);
//! assert_eq!(parser.method(), b"GET");
//! assert_eq!(parser.get_header(b"host"), Some(&b"example.com"[..]));
//! ```

use crate::chars::{is_header_name_byte, is_header_value_byte};
use crate::view::{HeaderView, View};

/// Maximum number of headers a [`RequestParser`] will track. Fixed at 32
/// regardless of buffer capacity `N`; a request with more distinct headers
/// than this is rejected (`InvalidRequest`), not truncated silently.
pub const HTTP_REQUEST_MAX_HEADERS_COUNT: usize = 32;

/// Suggested default buffer capacity for a [`RequestParser`], in bytes.
/// Just a convenient constant for callers picking a const-generic `N`;
/// the parser itself enforces no particular size.
pub const HTTP_REQUEST_MAX_HEADERS_DEFAULT_SIZE: u16 = 2048;

const CR: u8 = b'\r';
const LF: u8 = b'\n';
const SP: u8 = b' ';
const COLON: u8 = b':';

/// State of a [`RequestParser`].
///
/// Declaration order is numeric order: any state that compares less than
/// [`ParserState::InvalidRequest`] is still accepting bytes ("active");
/// [`ParserState::InvalidRequest`] and [`ParserState::Done`] are terminal.
/// See [`ParserState::is_active`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ParserState {
    /// No bytes ingested yet.
    Ready,
    /// Accumulating the request method, up to the first space.
    ReadingMethod,
    /// Accumulating the request-target, up to the next space.
    ReadingUri,
    /// Expecting the literal `HTTP/1.1` followed by CRLF.
    ReadingProtocol,
    /// Accumulating a header name, or the terminating CRLF.
    ReadingHeaderName,
    /// Accumulating a header value, up to its terminating CRLF.
    ReadingHeaderValue,
    /// Terminal: the input was rejected. No further bytes are accepted
    /// until [`RequestParser::reset`].
    InvalidRequest,
    /// Terminal: the request line and header block were fully parsed.
    Done,
}

impl ParserState {
    /// True for any state that can still accept bytes, i.e. any state
    /// ordered before [`ParserState::InvalidRequest`].
    #[inline]
    pub fn is_active(self) -> bool {
        self < ParserState::InvalidRequest
    }
}

/// A streaming HTTP/1.1 request parser over a `N`-byte embedded buffer.
///
/// `N` is a compile-time capacity. There is no enforced floor: a `N` too
/// small for the request line plus headers simply can't reach
/// [`ParserState::Done`] (the caller observes `buffer_len() == capacity()`
/// without `Done` and treats that as "request too large" at the
/// application layer — the parser itself does not raise an error for it).
pub struct RequestParser<const N: usize> {
    state: ParserState,
    buffer: [u8; N],
    buffer_len: u16,
    headers_end_idx: u16,
    method_view: View,
    uri_view: View,
    header_views: [HeaderView; HTTP_REQUEST_MAX_HEADERS_COUNT],
    headers_count: u8,

    // Scratch state for the header-name/value sub-machine. Not part of the
    // conceptual data model in the design doc, but needed to implement it
    // correctly one byte at a time: `cur_name`/`cur_value` accumulate the
    // header currently being read before it is committed into
    // `header_views`, and `cr_seen` distinguishes "just saw a CR, next
    // byte must be LF" from "reading ordinary bytes" across ingest calls.
    cur_name: View,
    cur_value: View,
    cr_seen: bool,
    protocol_count: u8,
}

impl<const N: usize> RequestParser<N> {
    const ASSERT_CAPACITY_FITS_U16: () = assert!(
        N <= u16::MAX as usize,
        "RequestParser capacity N must fit in a u16"
    );

    /// Creates a new parser in [`ParserState::Ready`] with a zeroed buffer.
    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let _ = Self::ASSERT_CAPACITY_FITS_U16;
        RequestParser {
            state: ParserState::Ready,
            buffer: [0u8; N],
            buffer_len: 0,
            headers_end_idx: 0,
            method_view: View::EMPTY,
            uri_view: View::EMPTY,
            header_views: [HeaderView {
                name: View::EMPTY,
                value: View::EMPTY,
            }; HTTP_REQUEST_MAX_HEADERS_COUNT],
            headers_count: 0,
            cur_name: View::EMPTY,
            cur_value: View::EMPTY,
            cr_seen: false,
            protocol_count: 0,
        }
    }

    /// Returns the parser to [`ParserState::Ready`], discarding all parsed
    /// state. With `zero_buffer` (the recommended default), every buffer
    /// byte is overwritten with zero, so a previous request's bytes never
    /// leak into a reused parser's `buffer_fragment`.
    pub fn reset(&mut self, zero_buffer: bool) {
        if zero_buffer {
            self.buffer = [0u8; N];
        }
        self.state = ParserState::Ready;
        self.buffer_len = 0;
        self.headers_end_idx = 0;
        self.method_view = View::EMPTY;
        self.uri_view = View::EMPTY;
        self.header_views = [HeaderView {
            name: View::EMPTY,
            value: View::EMPTY,
        }; HTTP_REQUEST_MAX_HEADERS_COUNT];
        self.headers_count = 0;
        self.cur_name = View::EMPTY;
        self.cur_value = View::EMPTY;
        self.cr_seen = false;
        self.protocol_count = 0;
    }

    /// The current state.
    #[inline]
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// The compile-time buffer capacity, `N`.
    #[inline]
    pub fn capacity(&self) -> usize {
        N
    }

    /// Number of bytes written into the buffer so far.
    #[inline]
    pub fn buffer_len(&self) -> usize {
        self.buffer_len as usize
    }

    /// Borrows up to `desired` unwritten bytes of the internal buffer for
    /// the caller to fill via external I/O (e.g. a socket read), per the
    /// chunk-handoff protocol. Returns an empty slice once the parser has
    /// reached a terminal state, or once the buffer is full.
    ///
    /// The caller must write at most the returned slice's length, then
    /// call [`RequestParser::ingest`] with the exact number of bytes
    /// written.
    pub fn next_chunk_info(&mut self, desired: usize) -> &mut [u8] {
        if !self.state.is_active() {
            return &mut [];
        }
        let start = self.buffer_len as usize;
        let remaining = N - start;
        let max = desired.min(remaining);
        &mut self.buffer[start..start + max]
    }

    /// Advances the state machine over the `n` bytes most recently written
    /// via [`RequestParser::next_chunk_info`], and returns the resulting
    /// state.
    ///
    /// `n` is clamped to the remaining buffer capacity as a hardening
    /// measure; the specification this parser follows treats exceeding
    /// the chunk-handoff's advertised maximum as caller misuse, which in
    /// safe Rust simply can't corrupt memory — it can only under-consume.
    ///
    /// Calling `ingest(0)` on an active parser signals that the peer
    /// closed the connection before the request finished, and transitions
    /// to [`ParserState::InvalidRequest`] (truncated request). Calling
    /// `ingest` at all on a terminal parser is a no-op that returns the
    /// current state.
    pub fn ingest(&mut self, n: usize) -> ParserState {
        if !self.state.is_active() {
            return self.state;
        }

        if n == 0 {
            trace!("ingest(0) on active parser: truncated request");
            self.state = ParserState::InvalidRequest;
            return self.state;
        }

        let remaining = N - self.buffer_len as usize;
        let n = n.min(remaining);
        let start = self.buffer_len as usize;
        let end = start + n;

        let mut i = start;
        while i < end {
            if !self.state.is_active() {
                break;
            }

            if self.state == ParserState::Ready {
                self.state = ParserState::ReadingMethod;
                self.method_view.idx = i as u16;
            }

            let b = self.buffer[i];
            if b == 0 {
                debug!("NUL byte at {} rejected", i);
                self.state = ParserState::InvalidRequest;
                break;
            }

            match self.state {
                ParserState::ReadingMethod => self.step_method(i, b),
                ParserState::ReadingUri => self.step_uri(i, b),
                ParserState::ReadingProtocol => self.step_protocol(i, b),
                ParserState::ReadingHeaderName => self.step_header_name(i, b),
                ParserState::ReadingHeaderValue => self.step_header_value(i, b),
                ParserState::Ready | ParserState::InvalidRequest | ParserState::Done => {
                    unreachable!("handled above")
                }
            }

            i += 1;
        }

        self.buffer_len = end as u16;
        trace!("ingest consumed {} bytes, state now {:?}", n, self.state);
        self.state
    }

    fn step_method(&mut self, i: usize, b: u8) {
        if b == SP {
            self.uri_view.idx = i as u16 + 1;
            self.state = ParserState::ReadingUri;
        } else {
            self.method_view.len += 1;
        }
    }

    fn step_uri(&mut self, i: usize, b: u8) {
        if b == SP {
            self.state = ParserState::ReadingProtocol;
            self.protocol_count = 0;
        } else {
            self.uri_view.len += 1;
            let _ = i;
        }
    }

    fn step_protocol(&mut self, i: usize, _b: u8) {
        self.protocol_count += 1;
        if self.protocol_count == 10 {
            let protocol_start = self.uri_view.idx as usize + self.uri_view.len as usize + 1;
            let protocol_end = protocol_start + 10;
            let matches_literal = protocol_end <= i + 1
                && &self.buffer[protocol_start..protocol_end] == b"HTTP/1.1\r\n";
            if matches_literal {
                self.state = ParserState::ReadingHeaderName;
                self.cur_name = View::EMPTY;
                self.cur_value = View::EMPTY;
                self.cr_seen = false;
            } else {
                debug!("non-literal HTTP/1.1 protocol line rejected");
                self.state = ParserState::InvalidRequest;
            }
        }
    }

    fn step_header_name(&mut self, i: usize, b: u8) {
        if self.cr_seen {
            if b == LF {
                self.state = ParserState::Done;
                self.headers_end_idx = i as u16 + 1;
            } else {
                debug!("CR not followed by LF in header block");
                self.state = ParserState::InvalidRequest;
            }
            self.cr_seen = false;
            return;
        }

        if self.cur_name.len == 0 && b == CR {
            self.cur_name.idx = i as u16;
            self.cr_seen = true;
            return;
        }

        if b == COLON && self.cur_name.len > 0 {
            self.state = ParserState::ReadingHeaderValue;
            self.cur_value = View::EMPTY;
            return;
        }

        if is_header_name_byte(b) {
            if self.cur_name.len == 0 {
                if self.headers_count as usize >= HTTP_REQUEST_MAX_HEADERS_COUNT {
                    debug!("header count ceiling ({}) reached", HTTP_REQUEST_MAX_HEADERS_COUNT);
                    self.state = ParserState::InvalidRequest;
                    return;
                }
                self.cur_name.idx = i as u16;
            }
            self.cur_name.len += 1;
        } else {
            debug!("invalid header-name byte 0x{:02x}", b);
            self.state = ParserState::InvalidRequest;
        }
    }

    fn step_header_value(&mut self, i: usize, b: u8) {
        if self.cr_seen {
            if b == LF {
                self.header_views[self.headers_count as usize] = HeaderView {
                    name: self.cur_name,
                    value: self.cur_value,
                };
                self.headers_count += 1;
                self.state = ParserState::ReadingHeaderName;
                self.cur_name = View::EMPTY;
                self.cur_value = View::EMPTY;
            } else {
                debug!("CR not followed by LF in header value");
                self.state = ParserState::InvalidRequest;
            }
            self.cr_seen = false;
            return;
        }

        if self.cur_value.len == 0 && b == SP {
            // Leading OWS: ignored until the first real value byte.
            return;
        }

        if b == CR {
            if self.cur_value.len == 0 {
                self.cur_value.idx = i as u16;
            }
            self.cr_seen = true;
            return;
        }

        if is_header_value_byte(b) {
            if self.cur_value.len == 0 {
                self.cur_value.idx = i as u16;
            }
            self.cur_value.len += 1;
        } else {
            debug!("invalid header-value byte 0x{:02x}", b);
            self.state = ParserState::InvalidRequest;
        }
    }

    /// The request method, e.g. `b"GET"`. Empty until at least one byte of
    /// the method has been parsed.
    #[inline]
    pub fn method(&self) -> &[u8] {
        self.method_view.slice(&self.buffer)
    }

    /// The request-target, e.g. `b"/index.html"`. Empty until at least one
    /// byte of the URI has been parsed.
    #[inline]
    pub fn uri(&self) -> &[u8] {
        self.uri_view.slice(&self.buffer)
    }

    /// Number of headers parsed so far.
    #[inline]
    pub fn headers_count(&self) -> usize {
        self.headers_count as usize
    }

    /// Looks up a header value by name, case-insensitively. Returns the
    /// first match in arrival order, or `None` if no header with this name
    /// (in any ASCII case) was parsed.
    pub fn get_header(&self, name: &[u8]) -> Option<&[u8]> {
        for view in &self.header_views[..self.headers_count as usize] {
            let candidate = view.name.slice(&self.buffer);
            if eq_ignore_ascii_case(candidate, name) {
                return Some(view.value.slice(&self.buffer));
            }
        }
        None
    }

    /// Iterates all parsed headers in arrival order, preserving the
    /// original case of each header name.
    #[inline]
    pub fn headers(&self) -> Headers<'_, N> {
        Headers {
            parser: self,
            idx: 0,
        }
    }

    /// Bytes in `[headers_end_idx, buffer_len)`: whatever the caller read
    /// past the terminating CRLF CRLF in the same chunk that completed
    /// the headers. Typically the start of the body, or the next
    /// pipelined request. Empty until [`ParserState::Done`].
    #[inline]
    pub fn buffer_fragment(&self) -> &[u8] {
        if self.state != ParserState::Done {
            return &[];
        }
        &self.buffer[self.headers_end_idx as usize..self.buffer_len as usize]
    }
}

impl<const N: usize> Default for RequestParser<N> {
    fn default() -> Self {
        Self::new()
    }
}

fn eq_ignore_ascii_case(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| x.eq_ignore_ascii_case(&y))
}

/// Lazy iterator over a [`RequestParser`]'s parsed headers, in arrival
/// order. Returned by [`RequestParser::headers`].
pub struct Headers<'p, const N: usize> {
    parser: &'p RequestParser<N>,
    idx: usize,
}

impl<'p, const N: usize> Iterator for Headers<'p, N> {
    type Item = (&'p [u8], &'p [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.idx >= self.parser.headers_count as usize {
            return None;
        }
        let view = self.parser.header_views[self.idx];
        self.idx += 1;
        Some((
            view.name.slice(&self.parser.buffer),
            view.value.slice(&self.parser.buffer),
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.parser.headers_count as usize - self.idx;
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matches::assert_matches;

    fn feed<const N: usize>(parser: &mut RequestParser<N>, input: &[u8], chunk_size: usize) {
        let mut sent = 0;
        while sent < input.len() {
            let want = chunk_size.min(input.len() - sent);
            let chunk = parser.next_chunk_info(want);
            let n = chunk.len();
            assert!(n > 0, "parser stalled before consuming all input");
            chunk[..n].copy_from_slice(&input[sent..sent + n]);
            parser.ingest(n);
            sent += n;
        }
    }

    #[test]
    fn minimal_get() {
        let mut p = RequestParser::<128>::new();
        feed(&mut p, b"GET / HTTP/1.1\r\n\r\n", 1024);
        assert_matches!(p.state(), ParserState::Done);
        assert_eq!(p.method(), b"GET");
        assert_eq!(p.uri(), b"/");
        assert_eq!(p.headers_count(), 0);
        assert!(p.buffer_fragment().is_empty());
    }

    #[test]
    fn two_headers_mixed_case_lookup() {
        let input = b"POST /x HTTP/1.1\r\nHost: a\r\nContent-Length: 3\r\n\r\nABC";
        let mut p = RequestParser::<256>::new();
        feed(&mut p, input, 1024);
        assert_matches!(p.state(), ParserState::Done);
        assert_eq!(p.headers_count(), 2);
        assert_eq!(p.get_header(b"host"), Some(&b"a"[..]));
        assert_eq!(p.get_header(b"CONTENT-LENGTH"), Some(&b"3"[..]));
        assert_eq!(p.buffer_fragment(), b"ABC");
    }

    #[test]
    fn byte_at_a_time_matches_whole_buffer() {
        let input = b"POST /x HTTP/1.1\r\nHost: a\r\nContent-Length: 3\r\n\r\nABC";

        let mut whole = RequestParser::<256>::new();
        feed(&mut whole, input, 1024);

        let mut one_at_a_time = RequestParser::<256>::new();
        feed(&mut one_at_a_time, input, 1);

        assert_eq!(whole.state(), one_at_a_time.state());
        assert_eq!(whole.method(), one_at_a_time.method());
        assert_eq!(whole.uri(), one_at_a_time.uri());
        assert_eq!(whole.headers_count(), one_at_a_time.headers_count());
        for (a, b) in whole.headers().zip(one_at_a_time.headers()) {
            assert_eq!(a, b);
        }
        assert_eq!(whole.buffer_fragment(), one_at_a_time.buffer_fragment());
    }

    #[test]
    fn chunk_split_idempotence_across_granularities() {
        let input = b"PUT /widgets/42 HTTP/1.1\r\nHost: api.example\r\nX-Trace-Id: abc123\r\nAccept: */*\r\n\r\nbody-start";

        let mut reference = RequestParser::<512>::new();
        feed(&mut reference, input, input.len());

        for chunk_size in [1, 3, 7, 17] {
            let mut p = RequestParser::<512>::new();
            feed(&mut p, input, chunk_size);
            assert_eq!(p.state(), reference.state());
            assert_eq!(p.method(), reference.method());
            assert_eq!(p.uri(), reference.uri());
            assert_eq!(p.headers_count(), reference.headers_count());
            for (a, b) in p.headers().zip(reference.headers()) {
                assert_eq!(a, b);
            }
            assert_eq!(p.buffer_fragment(), reference.buffer_fragment());
        }
    }

    #[test]
    fn malformed_protocol_version() {
        let mut p = RequestParser::<128>::new();
        feed(&mut p, b"GET / HTTP/1.0\r\n\r\n", 1024);
        assert_matches!(p.state(), ParserState::InvalidRequest);
    }

    #[test]
    fn rejects_nul_byte() {
        let mut p = RequestParser::<128>::new();
        feed(&mut p, b"GET /\x00 HTTP/1.1\r\n\r\n", 1024);
        assert_matches!(p.state(), ParserState::InvalidRequest);
    }

    #[test]
    fn rejects_invalid_header_name_char() {
        let mut p = RequestParser::<128>::new();
        feed(&mut p, b"GET / HTTP/1.1\r\nX-Foo!: bar\r\n\r\n", 1024);
        assert_matches!(p.state(), ParserState::InvalidRequest);
    }

    #[test]
    fn rejects_invalid_header_value_char() {
        let mut p = RequestParser::<128>::new();
        feed(&mut p, b"GET / HTTP/1.1\r\nX-Foo: ba\x01r\r\n\r\n", 1024);
        assert_matches!(p.state(), ParserState::InvalidRequest);
    }

    #[test]
    fn truncated_request_via_ingest_zero() {
        let mut p = RequestParser::<128>::new();
        let chunk = p.next_chunk_info(16);
        chunk[..16].copy_from_slice(b"GET / HTTP/1.1\r\n");
        p.ingest(16);
        assert!(p.state().is_active());
        p.ingest(0);
        assert_matches!(p.state(), ParserState::InvalidRequest);
    }

    #[test]
    fn rejection_is_closed() {
        let mut p = RequestParser::<128>::new();
        feed(&mut p, b"GET / HTTP/1.0\r\n\r\n", 1024);
        assert_matches!(p.state(), ParserState::InvalidRequest);
        // Further bytes (even well-formed ones) cannot move the parser
        // out of InvalidRequest.
        let n = p.ingest(3);
        assert_matches!(n, ParserState::InvalidRequest);
    }

    #[test]
    fn more_than_32_headers_is_rejected() {
        let mut input = Vec::new();
        input.extend_from_slice(b"GET / HTTP/1.1\r\n");
        for i in 0..33 {
            input.extend_from_slice(format!("H{i}: v\r\n").as_bytes());
        }
        input.extend_from_slice(b"\r\n");

        let mut p = RequestParser::<4096>::new();
        feed(&mut p, &input, 4096);
        assert_matches!(p.state(), ParserState::InvalidRequest);
    }

    #[test]
    fn buffer_too_small_never_reaches_done_without_error() {
        let mut p = RequestParser::<8>::new();
        feed(&mut p, b"GET / HT", 8);
        assert_eq!(p.buffer_len(), 8);
        assert!(p.state().is_active());
    }

    #[test]
    fn reset_zeroes_buffer_by_default() {
        let mut p = RequestParser::<64>::new();
        feed(&mut p, b"GET / HTTP/1.1\r\n\r\n", 1024);
        assert_matches!(p.state(), ParserState::Done);

        p.reset(true);
        assert_matches!(p.state(), ParserState::Ready);
        assert_eq!(p.buffer_len(), 0);
        assert_eq!(p.headers_count(), 0);

        let chunk = p.next_chunk_info(64);
        assert!(chunk.iter().all(|&b| b == 0));
    }

    #[test]
    fn empty_header_value_is_allowed() {
        let mut p = RequestParser::<128>::new();
        feed(&mut p, b"GET / HTTP/1.1\r\nX-Empty:\r\n\r\n", 1024);
        assert_matches!(p.state(), ParserState::Done);
        assert_eq!(p.get_header(b"x-empty"), Some(&b""[..]));
    }
}
