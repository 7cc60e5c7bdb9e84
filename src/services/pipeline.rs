//! Request pipeline.
//!
//! Every use case is a [`Request`] handled by a [`RequestHandler`]. Handlers
//! are wrapped by behaviors that run before and after them:
//!
//! - [`ValidationBehavior`]: rejects invalid requests before any I/O
//! - [`TransactionBehavior`]: runs commands inside one ambient transaction

use std::any::type_name;
use std::sync::Arc;

use async_trait::async_trait;
use validator::Validate;

use crate::errors::AppResult;
use crate::infra::DbContext;

/// Whether a request mutates state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Command,
    Query,
}

pub trait Request: Send + Sync + 'static {
    type Response: Send;

    const KIND: RequestKind;
}

#[async_trait]
pub trait RequestHandler<R: Request>: Send + Sync {
    async fn handle(&self, request: R) -> AppResult<R::Response>;
}

/// Short type name used in logs (`RegisterUser` instead of the full path)
fn request_name<R: Request>() -> &'static str {
    let name = type_name::<R>();
    name.rsplit("::").next().unwrap_or(name)
}

/// Runs `validator` rules before the inner handler.
pub struct ValidationBehavior<H> {
    inner: H,
}

impl<H> ValidationBehavior<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R, H> RequestHandler<R> for ValidationBehavior<H>
where
    R: Request + Validate,
    H: RequestHandler<R>,
{
    async fn handle(&self, request: R) -> AppResult<R::Response> {
        if let Err(errors) = request.validate() {
            tracing::debug!(request = request_name::<R>(), "Validation failed");
            return Err(errors.into());
        }
        self.inner.handle(request).await
    }
}

/// Opens one transaction per command on `context`, flushes staged changes
/// and commits once the handler succeeded. Queries and commands issued while
/// a transaction is already open pass through untouched.
pub struct TransactionBehavior<H> {
    inner: H,
    context: Arc<DbContext>,
}

impl<H> TransactionBehavior<H> {
    pub fn new(inner: H, context: Arc<DbContext>) -> Self {
        Self { inner, context }
    }
}

#[async_trait]
impl<R, H> RequestHandler<R> for TransactionBehavior<H>
where
    R: Request,
    H: RequestHandler<R>,
{
    async fn handle(&self, request: R) -> AppResult<R::Response> {
        if R::KIND == RequestKind::Query || self.context.in_transaction() {
            return self.inner.handle(request).await;
        }

        let name = request_name::<R>();
        self.context.begin_transaction().await?;
        tracing::info!(context = self.context.name(), "Begin transaction for {}", name);

        let outcome = match self.inner.handle(request).await {
            Ok(response) => self.context.save_changes().await.map(|_| response),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(response) => {
                self.context.commit_transaction().await?;
                tracing::info!(context = self.context.name(), "Committed transaction for {}", name);
                Ok(response)
            }
            Err(e) => {
                tracing::error!(error = %e, "Rolling back transaction for {}", name);
                if let Err(rollback_err) = self.context.rollback_transaction().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                self.context.discard_changes().await;
                Err(e)
            }
        }
    }
}
