//! Service Container - composition root and request dispatch.
//!
//! [`Services`] is built once at startup around the context registry. Each
//! incoming request gets its own [`RequestScope`], so contexts, units of work
//! and transactions are never shared between requests.

use std::sync::Arc;

use futures::future::try_join_all;
use sea_orm::{EntityTrait, IntoActiveModel};

use super::pipeline::{Request, RequestHandler};
use crate::config::Config;
use crate::errors::AppResult;
use crate::infra::repositories::entities::users_model;
use crate::infra::{
    ContextRegistry, DbContext, DbContextResolver, PooledContextFactory, Repository,
};

/// Associates a request with the handler pipeline that serves it.
pub trait Dispatch: Request + Sized {
    type Handler: RequestHandler<Self>;

    /// Build the pipeline for one request inside `scope`.
    fn handler(scope: &RequestScope) -> AppResult<Self::Handler>;
}

/// Application-wide services
#[derive(Debug, Clone)]
pub struct Services {
    registry: Arc<ContextRegistry>,
}

impl Services {
    pub fn new(registry: ContextRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Connect every bounded context described by `config`.
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let users = PooledContextFactory::connect(&config.database, users_model(&config.database))
            .await?;
        let registry = ContextRegistry::builder().register(users).build();
        Ok(Self::new(registry))
    }

    pub fn registry(&self) -> &Arc<ContextRegistry> {
        &self.registry
    }

    /// Open a new request scope
    pub fn scope(&self) -> RequestScope {
        RequestScope::new(self.registry.clone())
    }

    /// Dispatch `request` in a fresh scope.
    pub async fn send<R: Dispatch>(&self, request: R) -> AppResult<R::Response> {
        self.scope().send(request).await
    }

    /// Create the tables of every registered context, concurrently.
    pub async fn ensure_created(&self) -> AppResult<()> {
        try_join_all(self.registry.factories().iter().map(|factory| async move {
            factory.create_context().ensure_created().await
        }))
        .await?;
        Ok(())
    }
}

/// Everything one request resolves: at most one context per bounded context.
pub struct RequestScope {
    resolver: DbContextResolver,
}

impl RequestScope {
    pub fn new(registry: Arc<ContextRegistry>) -> Self {
        Self {
            resolver: registry.resolver(),
        }
    }

    pub fn resolver(&self) -> &DbContextResolver {
        &self.resolver
    }

    /// Context owning `E` in this scope
    pub fn context<E: EntityTrait>(&self) -> AppResult<Arc<DbContext>> {
        self.resolver.resolve::<E>()
    }

    pub fn repository<E>(&self) -> AppResult<Repository<E>>
    where
        E: EntityTrait,
        E::Model: IntoActiveModel<E::ActiveModel> + Sync + 'static,
        E::ActiveModel: Send,
    {
        Repository::new(&self.resolver)
    }

    /// Run `request` through its pipeline inside this scope.
    pub async fn send<R: Dispatch>(&self, request: R) -> AppResult<R::Response> {
        let handler = R::handler(self)?;
        handler.handle(request).await
    }
}
