//! `tower::Service` adapter.
//!
//! [`AppService`] lets tower-based transports drive an [`Application`]: each
//! call serves one [`Request`] into a fresh [`BufferedResponse`].

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use tower::Service;

use crate::app::Application;
use mortar_core::{BufferedResponse, ChainError, Request};

/// A cloneable service wrapping a shared [`Application`].
#[derive(Clone)]
pub struct AppService {
    app: Arc<Application>,
}

impl AppService {
    pub fn new(app: Arc<Application>) -> Self {
        Self { app }
    }

    pub fn application(&self) -> &Arc<Application> {
        &self.app
    }
}

impl From<Application> for AppService {
    fn from(app: Application) -> Self {
        Self::new(Arc::new(app))
    }
}

impl Service<Request> for AppService {
    type Response = BufferedResponse;
    type Error = ChainError;
    type Future = BoxFuture<'static, Result<BufferedResponse, ChainError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let app = Arc::clone(&self.app);
        async move {
            let response = BufferedResponse::new();
            app.serve(request, response.clone()).await?;
            Ok(response)
        }
        .boxed()
    }
}

impl std::fmt::Debug for AppService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppService").field("app", &self.app).finish()
    }
}
