//! Handler return values and the return dispatcher.
//!
//! A handler may return anything implementing [`IntoReturnValues`]. When the
//! resulting [`ReturnValues`] are non-empty, the execution loop resolves the
//! [`ReturnHandler`] bound under `dyn ReturnHandler` and lets it write them to
//! the response. Rebinding that type is the way to change how return values
//! are rendered:
//!
//! ```rust,ignore
//! app.bind_as::<dyn ReturnHandler>(Arc::new(MyTemplateRenderer::new()));
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use serde::Serialize;
use tracing::trace;

use crate::error::{BoxError, ChainError, ChainResult};
use crate::inject::Injector;
use crate::response::ResponseSink;

// ============================================================================
// Return values
// ============================================================================

/// A single value produced by a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnValue {
    /// A response status code.
    Status(StatusCode),
    /// Raw bytes, written verbatim.
    Bytes(Vec<u8>),
    /// Text, written as UTF-8.
    Text(String),
    /// A structured value, serialized as JSON.
    Json(serde_json::Value),
}

/// The ordered values produced by one handler invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReturnValues(Vec<ReturnValue>);

impl ReturnValues {
    /// No values; the dispatcher is not consulted.
    pub fn none() -> Self {
        Self(Vec::new())
    }

    /// Exactly one value.
    pub fn single(value: ReturnValue) -> Self {
        Self(vec![value])
    }

    /// Appends a value.
    pub fn push(&mut self, value: ReturnValue) {
        self.0.push(value);
    }

    /// The value the dispatcher looks at first.
    pub fn first(&self) -> Option<&ReturnValue> {
        self.0.first()
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no values.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the values in order.
    pub fn iter(&self) -> std::slice::Iter<'_, ReturnValue> {
        self.0.iter()
    }
}

impl From<Vec<ReturnValue>> for ReturnValues {
    fn from(values: Vec<ReturnValue>) -> Self {
        Self(values)
    }
}

impl IntoIterator for ReturnValues {
    type Item = ReturnValue;
    type IntoIter = std::vec::IntoIter<ReturnValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A status code returned on its own.
///
/// Ahead of a body use `(StatusCode, body)` or `(u16, body)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status(pub StatusCode);

/// Wraps a serializable value so it is rendered as JSON.
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

// ============================================================================
// IntoReturnValues
// ============================================================================

/// Types a handler may return.
pub trait IntoReturnValues {
    /// Converts `self` into return values, or a chain error.
    fn into_return_values(self) -> ChainResult<ReturnValues>;
}

impl IntoReturnValues for () {
    fn into_return_values(self) -> ChainResult<ReturnValues> {
        Ok(ReturnValues::none())
    }
}

impl IntoReturnValues for ReturnValues {
    fn into_return_values(self) -> ChainResult<ReturnValues> {
        Ok(self)
    }
}

impl IntoReturnValues for ReturnValue {
    fn into_return_values(self) -> ChainResult<ReturnValues> {
        Ok(ReturnValues::single(self))
    }
}

impl IntoReturnValues for String {
    fn into_return_values(self) -> ChainResult<ReturnValues> {
        Ok(ReturnValues::single(ReturnValue::Text(self)))
    }
}

impl IntoReturnValues for &'static str {
    fn into_return_values(self) -> ChainResult<ReturnValues> {
        Ok(ReturnValues::single(ReturnValue::Text(self.to_string())))
    }
}

impl IntoReturnValues for Vec<u8> {
    fn into_return_values(self) -> ChainResult<ReturnValues> {
        Ok(ReturnValues::single(ReturnValue::Bytes(self)))
    }
}

impl IntoReturnValues for Status {
    fn into_return_values(self) -> ChainResult<ReturnValues> {
        Ok(ReturnValues::single(ReturnValue::Status(self.0)))
    }
}

impl IntoReturnValues for StatusCode {
    fn into_return_values(self) -> ChainResult<ReturnValues> {
        Ok(ReturnValues::single(ReturnValue::Status(self)))
    }
}

impl IntoReturnValues for serde_json::Value {
    fn into_return_values(self) -> ChainResult<ReturnValues> {
        Ok(ReturnValues::single(ReturnValue::Json(self)))
    }
}

impl<T: Serialize> IntoReturnValues for Json<T> {
    fn into_return_values(self) -> ChainResult<ReturnValues> {
        let value = serde_json::to_value(self.0)?;
        Ok(ReturnValues::single(ReturnValue::Json(value)))
    }
}

/// `(status, body)`: the status is written before the body.
impl<T: IntoReturnValues> IntoReturnValues for (StatusCode, T) {
    fn into_return_values(self) -> ChainResult<ReturnValues> {
        let mut values = vec![ReturnValue::Status(self.0)];
        values.extend(self.1.into_return_values()?);
        Ok(ReturnValues(values))
    }
}

/// A numeric status must be a valid code (`100..=999`).
impl<T: IntoReturnValues> IntoReturnValues for (u16, T) {
    fn into_return_values(self) -> ChainResult<ReturnValues> {
        (StatusCode::from_u16(self.0)?, self.1).into_return_values()
    }
}

/// `None` produces no values.
impl<T: IntoReturnValues> IntoReturnValues for Option<T> {
    fn into_return_values(self) -> ChainResult<ReturnValues> {
        match self {
            Some(t) => t.into_return_values(),
            None => Ok(ReturnValues::none()),
        }
    }
}

/// `Err` aborts the chain; a [`ChainError`] inside it is passed through as is.
impl<T: IntoReturnValues, E: Into<BoxError>> IntoReturnValues for Result<T, E> {
    fn into_return_values(self) -> ChainResult<ReturnValues> {
        match self {
            Ok(t) => t.into_return_values(),
            Err(e) => Err(ChainError::from_boxed(e.into())),
        }
    }
}

// ============================================================================
// ReturnHandler
// ============================================================================

/// Writes handler return values to the response.
///
/// The registry passed in is the request's own, so implementations resolve
/// the [`ResponseSink`] (and anything else they need) from it.
#[async_trait]
pub trait ReturnHandler: Send + Sync {
    /// Renders `values` into the response.
    async fn handle_return(&self, injector: &Injector, values: ReturnValues) -> ChainResult<()>;
}

/// The built-in return dispatcher.
///
/// Precedence, looking at the first value:
///
/// 1. A status followed by another value: write the status, render the second
///    value as the body.
/// 2. Bytes are written verbatim.
/// 3. Text is written as UTF-8 (`text/plain` unless a content type is set).
/// 4. JSON values are serialized (`application/json` unless a content type is set).
/// 5. A lone status writes only the status line.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultReturnHandler;

impl DefaultReturnHandler {
    /// The dispatcher as the trait object the registry binds.
    pub fn shared() -> Arc<dyn ReturnHandler> {
        Arc::new(Self)
    }
}

#[async_trait]
impl ReturnHandler for DefaultReturnHandler {
    async fn handle_return(&self, injector: &Injector, values: ReturnValues) -> ChainResult<()> {
        let sink = injector.resolve::<ResponseSink>()?;
        let mut values = values.into_iter();

        let (status, body) = match values.next() {
            None => return Ok(()),
            Some(ReturnValue::Status(code)) => (Some(code), values.next()),
            Some(other) => (None, Some(other)),
        };
        trace!(?status, "Dispatching return values");

        let bytes = match body {
            None => None,
            Some(ReturnValue::Status(code)) => {
                // A second status has no body to carry; the first one wins.
                sink.write_status(status.unwrap_or(code))?;
                return Ok(());
            }
            Some(ReturnValue::Bytes(bytes)) => Some(bytes),
            Some(ReturnValue::Text(text)) => {
                default_content_type(&sink, "text/plain; charset=utf-8");
                Some(text.into_bytes())
            }
            Some(ReturnValue::Json(value)) => {
                default_content_type(&sink, "application/json");
                Some(serde_json::to_vec(&value)?)
            }
        };

        if let Some(code) = status {
            sink.write_status(code)?;
        }
        if let Some(bytes) = bytes {
            sink.write(&bytes)?;
        }
        Ok(())
    }
}

fn default_content_type(sink: &ResponseSink, value: &'static str) {
    if !sink.has_header(&CONTENT_TYPE) {
        sink.set_header(CONTENT_TYPE, HeaderValue::from_static(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::BufferedResponse;

    fn render(values: impl IntoReturnValues) -> BufferedResponse {
        let buffer = BufferedResponse::new();
        let mut injector = Injector::new();
        injector.bind(ResponseSink::new(Box::new(buffer.clone())));

        let values = values.into_return_values().unwrap();
        tokio_test::block_on(DefaultReturnHandler.handle_return(&injector, values)).unwrap();
        buffer
    }

    #[test]
    fn test_unit_writes_nothing() {
        let buffer = render(());
        assert_eq!(buffer.status(), None);
        assert!(buffer.body().is_empty());
    }

    #[test]
    fn test_text_is_written_as_utf8() {
        let buffer = render("héllo");
        assert_eq!(buffer.status(), Some(StatusCode::OK));
        assert_eq!(buffer.body_text(), "héllo");
        assert_eq!(
            buffer.header("content-type").as_deref(),
            Some("text/plain; charset=utf-8")
        );
    }

    #[test]
    fn test_bytes_are_written_verbatim() {
        let buffer = render(vec![0u8, 159, 146, 150]);
        assert_eq!(buffer.body(), vec![0u8, 159, 146, 150]);
        assert_eq!(buffer.header("content-type"), None);
    }

    #[test]
    fn test_status_then_body() {
        let buffer = render((201u16, "created".to_string()));
        assert_eq!(buffer.status(), Some(StatusCode::CREATED));
        assert_eq!(buffer.body_text(), "created");
    }

    #[test]
    fn test_lone_status() {
        let buffer = render(Status(StatusCode::NO_CONTENT));
        assert_eq!(buffer.status(), Some(StatusCode::NO_CONTENT));
        assert!(buffer.body().is_empty());
    }

    #[test]
    fn test_typed_status_then_body() {
        let buffer = render((StatusCode::ACCEPTED, "queued"));
        assert_eq!(buffer.status(), Some(StatusCode::ACCEPTED));
        assert_eq!(buffer.body_text(), "queued");
    }

    #[test]
    fn test_out_of_range_status_is_rejected() {
        let err = (0u16, "never sent").into_return_values().unwrap_err();
        assert!(matches!(err, ChainError::InvalidStatus(_)));

        let err = (1000u16, "never sent").into_return_values().unwrap_err();
        assert!(matches!(err, ChainError::InvalidStatus(_)));
    }

    #[test]
    fn test_json_body() {
        #[derive(Serialize)]
        struct User {
            name: &'static str,
        }

        let buffer = render(Json(User { name: "ada" }));
        assert_eq!(buffer.body_text(), r#"{"name":"ada"}"#);
        assert_eq!(
            buffer.header("content-type").as_deref(),
            Some("application/json")
        );
    }

    #[test]
    fn test_result_error_becomes_chain_error() {
        let result: Result<String, std::io::Error> = Err(std::io::Error::other("disk on fire"));
        let err = result.into_return_values().unwrap_err();
        assert!(matches!(err, ChainError::Handler(_)));
    }

    #[test]
    fn test_missing_sink_is_a_resolve_error() {
        let injector = Injector::new();
        let values = "orphan".into_return_values().unwrap();
        let err = tokio_test::block_on(DefaultReturnHandler.handle_return(&injector, values))
            .unwrap_err();
        assert!(err.is_resolve());
    }
}
