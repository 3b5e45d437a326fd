use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::error;

use crate::extractor::Next;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use mortar_core::{ChainError, ChainResult, Dep, Mode, ResponseSink};

const INTERNAL_ERROR: &str = "500 Internal Server Error";

/// Turns errors and panics from the rest of the chain into a 500 response.
///
/// The failure is logged. If nothing has been written yet, a complete
/// plain-text response is written; the error detail is included only in
/// [`Mode::Development`]. When no [`Mode`] is bound the default is used.
pub async fn recovery(
    next: Next,
    response: Dep<ResponseSink>,
    mode: Option<Dep<Mode>>,
) -> ChainResult<()> {
    let err = match AssertUnwindSafe(next.run()).catch_unwind().await {
        Ok(Ok(())) => return Ok(()),
        Ok(Err(err)) => err,
        Err(payload) => ChainError::Panic(panic_message(payload.as_ref())),
    };
    error!(error = %err, "Recovered from request failure");

    if response.written() {
        return Ok(());
    }

    let mode = mode.map(|m| *m).unwrap_or_default();
    let body = if mode.is_development() {
        format!("{INTERNAL_ERROR}\n\n{err}")
    } else {
        INTERNAL_ERROR.to_string()
    };

    response.set_header(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response.write_status(StatusCode::INTERNAL_SERVER_ERROR)?;
    response.write(body.as_bytes())?;
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
