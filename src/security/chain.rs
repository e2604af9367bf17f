//! Security chain dispatch.
//!
//! Each request is handed to the first chain whose prefix matches its path.
//! That chain authenticates the request with its own pipeline and then asks
//! its own authorization matrix. Paths outside every chain pass through
//! untouched. No chain reads or writes any session state.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    http::{HeaderMap, Method, Request},
    response::{IntoResponse, Response},
};
use tower::{Layer, Service};

use super::{
    credentials::AuthOutcome,
    matrix::{AuthorizationMatrix, Denial, PathPattern},
    pipeline::AuthenticationPipeline,
    principal::Principal,
};
use crate::error::{AppError, AppResult};

/// One independently configured security pipeline
pub struct SecurityChain {
    name: &'static str,
    prefix: PathPattern,
    pipeline: Arc<dyn AuthenticationPipeline>,
    matrix: AuthorizationMatrix,
    allow_cross_origin: bool,
}

impl SecurityChain {
    pub fn new(
        name: &'static str,
        prefix: &str,
        pipeline: Arc<dyn AuthenticationPipeline>,
        matrix: AuthorizationMatrix,
    ) -> Self {
        Self {
            name,
            prefix: PathPattern::new(prefix),
            pipeline,
            matrix,
            allow_cross_origin: false,
        }
    }

    pub fn with_cross_origin(mut self) -> Self {
        self.allow_cross_origin = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn matches(&self, path: &str) -> bool {
        self.prefix.matches(path)
    }

    pub fn allows_cross_origin(&self) -> bool {
        self.allow_cross_origin
    }
}

/// What the dispatcher decided for a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    /// No chain covers the path
    PassThrough,
    /// The request may proceed, with the identity if one was established
    Admitted(Option<Principal>),
    Denied(Denial),
}

/// Ordered list of chains; the first match owns the request
pub struct ChainDispatcher {
    chains: Vec<SecurityChain>,
}

impl ChainDispatcher {
    pub fn new(chains: Vec<SecurityChain>) -> Self {
        Self { chains }
    }

    /// Token chain on `/api/**` first, password chain on `/users/**` second
    pub fn standard(
        token_pipeline: Arc<dyn AuthenticationPipeline>,
        password_pipeline: Arc<dyn AuthenticationPipeline>,
    ) -> Self {
        Self::new(vec![
            SecurityChain::new("api", "/api/**", token_pipeline, AuthorizationMatrix::api_rules())
                .with_cross_origin(),
            SecurityChain::new(
                "users",
                "/users/**",
                password_pipeline,
                AuthorizationMatrix::users_rules(),
            ),
        ])
    }

    pub fn select(&self, path: &str) -> Option<&SecurityChain> {
        self.chains.iter().find(|chain| chain.matches(path))
    }

    pub fn allows_cross_origin(&self, path: &str) -> bool {
        self.select(path)
            .map(SecurityChain::allows_cross_origin)
            .unwrap_or(false)
    }

    pub async fn check(&self, method: &Method, path: &str, headers: &HeaderMap) -> AppResult<Gate> {
        let Some(chain) = self.select(path) else {
            return Ok(Gate::PassThrough);
        };

        let principal = match chain.pipeline.authenticate(headers).await? {
            AuthOutcome::Authenticated(principal) => Some(principal),
            AuthOutcome::Rejected(reason) => {
                tracing::debug!(
                    chain = chain.name,
                    pipeline = chain.pipeline.name(),
                    %method,
                    path,
                    %reason,
                    "Continuing without identity"
                );
                None
            }
        };

        match chain.matrix.evaluate(method, path, principal.as_ref()) {
            Ok(()) => Ok(Gate::Admitted(principal)),
            Err(denial) => {
                tracing::debug!(
                    chain = chain.name,
                    %method,
                    path,
                    subject = principal.as_ref().map(|p| p.subject_id.as_str()),
                    ?denial,
                    "Request denied"
                );
                Ok(Gate::Denied(denial))
            }
        }
    }
}

fn denial_response(denial: Denial) -> Response {
    match denial {
        Denial::Unauthorized => {
            AppError::Authentication("Authentication required".to_string()).into_response()
        }
        Denial::Forbidden(_) => AppError::Authorization("Access denied".to_string()).into_response(),
    }
}

// =============================================================================
// SecurityLayer
// =============================================================================

/// Tower layer running the chain dispatcher in front of every route
#[derive(Clone)]
pub struct SecurityLayer {
    dispatcher: Arc<ChainDispatcher>,
}

impl SecurityLayer {
    pub fn new(dispatcher: Arc<ChainDispatcher>) -> Self {
        Self { dispatcher }
    }
}

impl<S> Layer<S> for SecurityLayer {
    type Service = SecurityService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityService {
            inner,
            dispatcher: self.dispatcher.clone(),
        }
    }
}

#[derive(Clone)]
pub struct SecurityService<S> {
    inner: S,
    dispatcher: Arc<ChainDispatcher>,
}

impl<S> Service<Request<Body>> for SecurityService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let dispatcher = self.dispatcher.clone();
        // the clone is not ready; keep the one poll_ready was called on
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            // the body is not Sync, so only the parts are borrowed across the await
            let (mut parts, body) = req.into_parts();
            let gate = dispatcher
                .check(&parts.method, parts.uri.path(), &parts.headers)
                .await;

            match gate {
                Ok(Gate::PassThrough) | Ok(Gate::Admitted(None)) => {
                    inner.call(Request::from_parts(parts, body)).await
                }
                Ok(Gate::Admitted(Some(principal))) => {
                    parts.extensions.insert(principal);
                    inner.call(Request::from_parts(parts, body)).await
                }
                Ok(Gate::Denied(denial)) => Ok(denial_response(denial)),
                Err(e) => Ok(e.into_response()),
            }
        })
    }
}
