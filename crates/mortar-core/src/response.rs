//! Response sink.
//!
//! [`ResponseWriter`] is what a transport implements. [`ResponseSink`] wraps
//! one for the duration of a request and remembers whether anything has been
//! written yet; the execution loop stops as soon as that flag flips, and
//! handlers use it to avoid writing a second response.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use http::header::AsHeaderName;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use parking_lot::Mutex;
use tracing::warn;

/// The transport-level writer a response is written to.
pub trait ResponseWriter: Send {
    /// Sends the status line.
    fn write_status(&mut self, status: StatusCode) -> io::Result<()>;

    /// Sets a header, replacing earlier values. Only meaningful before the
    /// status is written.
    fn set_header(&mut self, name: HeaderName, value: HeaderValue);

    /// Returns `true` if a header named `name` has been set.
    fn has_header(&self, name: &HeaderName) -> bool;

    /// Appends a chunk to the body.
    fn write_body(&mut self, chunk: &[u8]) -> io::Result<()>;
}

struct SinkState {
    writer: Box<dyn ResponseWriter>,
    status: Option<StatusCode>,
}

/// Wraps a [`ResponseWriter`] and tracks whether the response was written.
///
/// The first status or body write flips [`written`](Self::written) to `true`;
/// nothing flips it back.
pub struct ResponseSink {
    state: Mutex<SinkState>,
    written: AtomicBool,
    size: AtomicUsize,
}

impl ResponseSink {
    /// Wraps `writer` in a sink that has not been written to.
    pub fn new(writer: Box<dyn ResponseWriter>) -> Self {
        Self {
            state: Mutex::new(SinkState {
                writer,
                status: None,
            }),
            written: AtomicBool::new(false),
            size: AtomicUsize::new(0),
        }
    }

    /// Returns `true` once a status or body has been written.
    pub fn written(&self) -> bool {
        self.written.load(Ordering::SeqCst)
    }

    /// The status that was sent, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.state.lock().status
    }

    /// Number of body bytes written so far.
    pub fn size(&self) -> usize {
        self.size.load(Ordering::SeqCst)
    }

    /// Sets a response header. Ignored once the response is written.
    pub fn set_header(&self, name: HeaderName, value: HeaderValue) {
        if self.written() {
            warn!(header = %name, "Header set after response was written, ignoring");
            return;
        }
        self.state.lock().writer.set_header(name, value);
    }

    /// Returns `true` if the header has been set.
    pub fn has_header(&self, name: &HeaderName) -> bool {
        self.state.lock().writer.has_header(name)
    }

    /// Sends the status line. A second call is ignored.
    pub fn write_status(&self, status: StatusCode) -> io::Result<()> {
        let mut state = self.state.lock();
        self.write_status_locked(&mut state, status)
    }

    /// Writes a body chunk, sending `200` first if no status was sent.
    pub fn write(&self, chunk: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.status.is_none() {
            self.write_status_locked(&mut state, StatusCode::OK)?;
        }
        state.writer.write_body(chunk)?;
        self.size.fetch_add(chunk.len(), Ordering::SeqCst);
        self.written.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn write_status_locked(&self, state: &mut SinkState, status: StatusCode) -> io::Result<()> {
        if let Some(previous) = state.status {
            warn!(%previous, %status, "Superfluous status write, ignoring");
            return Ok(());
        }
        state.writer.write_status(status)?;
        state.status = Some(status);
        self.written.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl std::fmt::Debug for ResponseSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseSink")
            .field("written", &self.written())
            .field("status", &self.status())
            .field("size", &self.size())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// BufferedResponse
// =============================================================================

#[derive(Debug, Default)]
struct BufferedParts {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

/// An in-memory [`ResponseWriter`].
///
/// Clones share the same buffer, so a transport can keep one handle and give
/// the other to the application.
#[derive(Debug, Clone, Default)]
pub struct BufferedResponse {
    parts: Arc<Mutex<BufferedParts>>,
}

impl BufferedResponse {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// The status written so far, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.parts.lock().status
    }

    /// Returns the value of header `name` if it is visible ASCII.
    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<String> {
        self.parts
            .lock()
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// A copy of every header set so far.
    pub fn headers(&self) -> HeaderMap {
        self.parts.lock().headers.clone()
    }

    /// A copy of the body written so far.
    pub fn body(&self) -> Vec<u8> {
        self.parts.lock().body.clone()
    }

    /// The body decoded as UTF-8, with invalid sequences replaced.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.parts.lock().body).into_owned()
    }
}

impl ResponseWriter for BufferedResponse {
    fn write_status(&mut self, status: StatusCode) -> io::Result<()> {
        self.parts.lock().status = Some(status);
        Ok(())
    }

    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.parts.lock().headers.insert(name, value);
    }

    fn has_header(&self, name: &HeaderName) -> bool {
        self.parts.lock().headers.contains_key(name)
    }

    fn write_body(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.parts.lock().body.extend_from_slice(chunk);
        Ok(())
    }
}
