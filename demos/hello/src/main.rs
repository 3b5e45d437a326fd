use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use mortar::prelude::*;
use mortar::runtime::tracing::info;
use serde::Serialize;

#[derive(Default)]
struct Visits {
    count: AtomicU64,
}

#[derive(Serialize)]
struct Stats {
    visits: u64,
    mode: Mode,
}

const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

struct ApiKey {
    key: String,
}

async fn hello(params: Params, visits: Dep<Visits>) -> String {
    visits.count.fetch_add(1, Ordering::Relaxed);
    format!("hello {}", params.get("name").unwrap_or("world"))
}

async fn stats(visits: Dep<Visits>, mode: Dep<Mode>) -> Json<Stats> {
    Json(Stats {
        visits: visits.count.load(Ordering::Relaxed),
        mode: *mode,
    })
}

/// Rejects API requests without the demo key; otherwise records it for
/// downstream handlers.
async fn require_key(ctx: Arc<Context>) -> Option<(StatusCode, &'static str)> {
    match ctx.request().header(&API_KEY_HEADER) {
        Some(key) if key == "demo" => {
            ctx.bind(ApiKey {
                key: key.to_string(),
            });
            None
        }
        _ => Some((StatusCode::UNAUTHORIZED, "missing or invalid api key")),
    }
}

async fn whoami(key: Dep<ApiKey>) -> String {
    format!("authenticated with key {}", key.key)
}

#[tokio::main]
async fn main() -> RuntimeResult<()> {
    let runtime = Runtime::new();
    let mut app = runtime.classic();
    app.bind(Visits::default());

    app.router()
        .get("/hello/:name", chain![hello])?
        .group("/api", chain![require_key], |api| {
            api.get("/stats", chain![stats])?;
            api.get("/whoami", chain![whoami])?;
            Ok(())
        })?;

    let requests = [
        Request::get("/hello/mortar"),
        Request::get("/hello/again"),
        Request::get("/api/stats").with_header(API_KEY_HEADER, HeaderValue::from_static("demo")),
        Request::get("/api/whoami"),
        Request::get("/api/whoami").with_header(API_KEY_HEADER, HeaderValue::from_static("demo")),
        Request::get("/nowhere"),
    ];

    info!(addr = %runtime.bind_addr(), "Serving demo requests");
    for request in requests {
        let target = request.path().to_string();
        let response = BufferedResponse::new();
        if let Err(err) = app.serve(request, response.clone()).await {
            eprintln!("{target}: {err}");
            continue;
        }
        println!(
            "{target} -> {} {}",
            response.status().map(|s| s.to_string()).unwrap_or_default(),
            response.body_text()
        );
    }

    Ok(())
}
