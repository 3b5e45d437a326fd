use std::time::Instant;

use tracing::info;

use crate::extractor::Next;
use mortar_core::{ChainResult, Dep, Request, ResponseSink};

/// Logs the start and completion of every request.
pub async fn logger(
    next: Next,
    request: Dep<Request>,
    response: Dep<ResponseSink>,
) -> ChainResult<()> {
    let start = Instant::now();
    info!(method = %request.method(), path = request.path(), "Started");

    let result = next.run().await;

    info!(
        method = %request.method(),
        path = request.path(),
        status = response.status().map(|s| s.as_u16()).unwrap_or_default(),
        elapsed = ?start.elapsed(),
        "Completed"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Application, chain};
    use mortar_core::BufferedResponse;

    #[tokio::test]
    async fn test_logger_passes_through() {
        let mut app = Application::new();
        app.use_handler(logger);
        app.router()
            .get("/ping", chain![|| async { "pong" }])
            .unwrap();

        let buffer = BufferedResponse::new();
        app.serve(Request::get("/ping"), buffer.clone())
            .await
            .unwrap();
        assert_eq!(buffer.body_text(), "pong");
    }

    #[tokio::test]
    async fn test_logger_propagates_errors() {
        let mut app = Application::new();
        app.use_handler(logger);
        app.router()
            .get("/fail", chain![|| async { Err::<(), _>("nope") }])
            .unwrap();

        let result = app.serve(Request::get("/fail"), BufferedResponse::new()).await;
        assert!(result.is_err());
    }
}
