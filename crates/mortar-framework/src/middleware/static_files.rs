use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tracing::{debug, warn};

use crate::handler::Handler;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderValue, Method, StatusCode};
use mortar_core::{ChainResult, Dep, Request, ResponseSink};

const INDEX_FILE: &str = "index.html";

/// Serves files below `directory` for `GET` and `HEAD` requests.
///
/// Directories are served through their `index.html`. Requests that do not
/// map to a readable file fall through to the rest of the chain, as do
/// paths containing `..`.
pub fn static_files(directory: PathBuf) -> impl Handler<(Dep<Request>, Dep<ResponseSink>)> {
    let directory = Arc::new(directory);
    move |request: Dep<Request>, response: Dep<ResponseSink>| {
        let directory = Arc::clone(&directory);
        async move { serve_file(&directory, &request, &response).await }
    }
}

async fn serve_file(directory: &Path, request: &Request, response: &ResponseSink) -> ChainResult<()> {
    let method = request.method();
    if method != Method::GET && method != Method::HEAD {
        return Ok(());
    }
    let Some(relative) = sanitize(request.path()) else {
        debug!(path = request.path(), "Rejecting static path");
        return Ok(());
    };

    let mut path = directory.join(relative);
    match fs::metadata(&path).await {
        Ok(meta) if meta.is_dir() => path.push(INDEX_FILE),
        Ok(_) => {}
        Err(_) => return Ok(()),
    }

    let contents = match fs::read(&path).await {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Failed to read static file");
            return Ok(());
        }
    };

    debug!(path = %path.display(), size = contents.len(), "Serving static file");
    if !response.has_header(&CONTENT_TYPE) {
        response.set_header(CONTENT_TYPE, HeaderValue::from_static(content_type(&path)));
    }
    response.set_header(CONTENT_LENGTH, HeaderValue::from(contents.len()));

    if method == Method::HEAD {
        response.write_status(StatusCode::OK)?;
    } else {
        response.write(&contents)?;
    }
    Ok(())
}

/// Maps a request path to a relative file path, refusing to leave the root.
fn sanitize(path: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => return None,
            part if part.contains('\\') => return None,
            part => relative.push(part),
        }
    }
    Some(relative)
}

fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "wasm" => "application/wasm",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Application, chain};
    use mortar_core::BufferedResponse;

    fn site(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("mortar-static-{name}-{}", std::process::id()));
        std::fs::create_dir_all(root.join("docs")).unwrap();
        std::fs::write(root.join("site.css"), "body {}").unwrap();
        std::fs::write(root.join("docs").join("index.html"), "<h1>docs</h1>").unwrap();
        root
    }

    fn app(root: PathBuf) -> Application {
        let mut app = Application::new();
        app.use_handler(static_files(root));
        app.router()
            .get("/site.css", chain![|| async { "from route" }])
            .unwrap()
            .post("/site.css", chain![|| async { "posted" }])
            .unwrap();
        app
    }

    async fn request(app: &Application, request: Request) -> BufferedResponse {
        let buffer = BufferedResponse::new();
        app.serve(request, buffer.clone()).await.unwrap();
        buffer
    }

    #[tokio::test]
    async fn test_serves_file_with_content_type() {
        let root = site("file");
        let buffer = request(&app(root.clone()), Request::get("/site.css")).await;

        assert_eq!(buffer.status(), Some(StatusCode::OK));
        assert_eq!(buffer.body_text(), "body {}");
        assert_eq!(
            buffer.header("Content-Type").as_deref(),
            Some("text/css; charset=utf-8")
        );
        std::fs::remove_dir_all(root).ok();
    }

    #[tokio::test]
    async fn test_directory_serves_index() {
        let root = site("index");
        let buffer = request(&app(root.clone()), Request::get("/docs/")).await;

        assert_eq!(buffer.body_text(), "<h1>docs</h1>");
        std::fs::remove_dir_all(root).ok();
    }

    #[tokio::test]
    async fn test_head_sends_headers_only() {
        let root = site("head");
        let buffer = request(&app(root.clone()), Request::new(Method::HEAD, "/site.css")).await;

        assert_eq!(buffer.status(), Some(StatusCode::OK));
        assert_eq!(buffer.header("Content-Length").as_deref(), Some("7"));
        assert!(buffer.body().is_empty());
        std::fs::remove_dir_all(root).ok();
    }

    #[tokio::test]
    async fn test_other_methods_and_missing_files_fall_through() {
        let root = site("fallthrough");
        let app = app(root.clone());

        let posted = request(&app, Request::new(Method::POST, "/site.css")).await;
        assert_eq!(posted.body_text(), "posted");

        let missing = request(&app, Request::get("/nope.txt")).await;
        assert_eq!(missing.status(), Some(StatusCode::NOT_FOUND));
        std::fs::remove_dir_all(root).ok();
    }

    #[test]
    fn test_sanitize_rejects_parent_segments() {
        assert_eq!(sanitize("/a/./b"), Some(PathBuf::from("a").join("b")));
        assert_eq!(sanitize("/"), Some(PathBuf::new()));
        assert_eq!(sanitize("/../etc/passwd"), None);
        assert_eq!(sanitize("/a/..\\b"), None);
    }

    #[test]
    fn test_content_type_by_extension() {
        assert_eq!(content_type(Path::new("a/INDEX.HTML")), "text/html; charset=utf-8");
        assert_eq!(content_type(Path::new("logo.png")), "image/png");
        assert_eq!(content_type(Path::new("blob")), "application/octet-stream");
    }
}
