//! Resolution of the database context that owns an entity type.
//!
//! The [`ContextRegistry`] is built once at startup: it reads every
//! registered factory's model and records which factory owns each entity
//! type. A [`DbContextResolver`] lives for one request scope and creates at
//! most one context per factory.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use sea_orm::EntityTrait;

use super::{DbContext, DbContextFactory};
use crate::errors::{AppError, AppResult};

/// Entity type → factory map, fixed after [`ContextRegistryBuilder::build`].
pub struct ContextRegistry {
    factories: Vec<Arc<dyn DbContextFactory>>,
    owners: HashMap<TypeId, usize>,
}

impl std::fmt::Debug for ContextRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextRegistry")
            .field("factories", &self.factories.len())
            .field("entities", &self.owners.len())
            .finish()
    }
}

impl ContextRegistry {
    pub fn builder() -> ContextRegistryBuilder {
        ContextRegistryBuilder {
            factories: Vec::new(),
        }
    }

    pub fn factories(&self) -> &[Arc<dyn DbContextFactory>] {
        &self.factories
    }

    /// Index of the factory owning `type_id`
    pub fn owner_of(&self, type_id: TypeId) -> Option<usize> {
        self.owners.get(&type_id).copied()
    }

    /// Open a resolver for a new request scope.
    pub fn resolver(self: &Arc<Self>) -> DbContextResolver {
        DbContextResolver::new(self.clone())
    }
}

/// Collects factories in registration order.
pub struct ContextRegistryBuilder {
    factories: Vec<Arc<dyn DbContextFactory>>,
}

impl ContextRegistryBuilder {
    pub fn register<F>(self, factory: F) -> Self
    where
        F: DbContextFactory + 'static,
    {
        self.register_shared(Arc::new(factory))
    }

    pub fn register_shared(mut self, factory: Arc<dyn DbContextFactory>) -> Self {
        self.factories.push(factory);
        self
    }

    /// Read every factory's model once. An entity type declared by several
    /// factories belongs to the one registered first.
    pub fn build(self) -> ContextRegistry {
        let mut owners = HashMap::new();

        for (idx, factory) in self.factories.iter().enumerate() {
            let model = factory.model();
            for entity in model.entities() {
                if owners.contains_key(&entity.type_id()) {
                    tracing::debug!(
                        entity = entity.type_name(),
                        context = model.name(),
                        "Entity already owned by an earlier context"
                    );
                    continue;
                }
                owners.insert(entity.type_id(), idx);
            }
            tracing::info!(
                context = model.name(),
                schema = model.schema(),
                entities = model.entities().len(),
                "Registered database context"
            );
        }

        ContextRegistry {
            factories: self.factories,
            owners,
        }
    }
}

/// Per-scope resolver; caches one context per factory.
pub struct DbContextResolver {
    registry: Arc<ContextRegistry>,
    contexts: Mutex<HashMap<usize, Arc<DbContext>>>,
}

impl DbContextResolver {
    pub fn new(registry: Arc<ContextRegistry>) -> Self {
        Self {
            registry,
            contexts: Mutex::new(HashMap::new()),
        }
    }

    /// Context owning the entity type `E`.
    pub fn resolve<E: EntityTrait>(&self) -> AppResult<Arc<DbContext>> {
        self.resolve_type(TypeId::of::<E>(), type_name::<E>())
    }

    pub fn resolve_type(&self, type_id: TypeId, type_name: &str) -> AppResult<Arc<DbContext>> {
        let idx = self.registry.owner_of(type_id).ok_or_else(|| {
            AppError::configuration(format!(
                "no database context is registered for entity type `{}`",
                type_name
            ))
        })?;

        let mut contexts = self
            .contexts
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let context = contexts
            .entry(idx)
            .or_insert_with(|| self.registry.factories[idx].create_context());
        Ok(context.clone())
    }

    /// Contexts opened so far in this scope
    pub fn opened(&self) -> Vec<Arc<DbContext>> {
        self.contexts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::context::{MockDbContextFactory, SchemaModel};
    use crate::infra::repositories::entities::user;
    use sea_orm::DatabaseConnection;
    use sea_orm_migration::seaql_migrations;

    fn mock_factory(model: SchemaModel, contexts: usize) -> MockDbContextFactory {
        let model = Arc::new(model);
        let mut factory = MockDbContextFactory::new();
        let declared = model.clone();
        factory.expect_model().returning(move || declared.clone());
        factory
            .expect_create_context()
            .times(contexts)
            .returning(move || {
                Arc::new(DbContext::new(DatabaseConnection::Disconnected, model.clone()))
            });
        factory
    }

    #[test]
    fn test_resolve_caches_context_per_scope() {
        let factory = mock_factory(
            SchemaModel::builder("users").entity::<user::Entity>().build(),
            1,
        );
        let registry = Arc::new(ContextRegistry::builder().register(factory).build());
        let resolver = registry.resolver();

        let first = resolver.resolve::<user::Entity>().unwrap();
        let second = resolver.resolve::<user::Entity>().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.name(), "users");
        assert_eq!(resolver.opened().len(), 1);
    }

    #[test]
    fn test_first_registration_wins() {
        let first = mock_factory(
            SchemaModel::builder("first").entity::<user::Entity>().build(),
            1,
        );
        let second = mock_factory(
            SchemaModel::builder("second")
                .entity::<user::Entity>()
                .entity::<seaql_migrations::Entity>()
                .build(),
            1,
        );
        let registry = Arc::new(
            ContextRegistry::builder()
                .register(first)
                .register(second)
                .build(),
        );
        let resolver = registry.resolver();

        assert_eq!(resolver.resolve::<user::Entity>().unwrap().name(), "first");
        assert_eq!(
            resolver.resolve::<seaql_migrations::Entity>().unwrap().name(),
            "second"
        );
    }

    #[test]
    fn test_unregistered_entity_names_the_type() {
        let factory = mock_factory(
            SchemaModel::builder("users").entity::<user::Entity>().build(),
            0,
        );
        let registry = Arc::new(ContextRegistry::builder().register(factory).build());

        let err = registry
            .resolver()
            .resolve::<seaql_migrations::Entity>()
            .unwrap_err();

        assert!(matches!(err, AppError::Configuration(_)));
        assert!(err.to_string().contains("seaql_migrations"));
    }

    #[test]
    fn test_scopes_do_not_share_contexts() {
        let factory = mock_factory(
            SchemaModel::builder("users").entity::<user::Entity>().build(),
            2,
        );
        let registry = Arc::new(ContextRegistry::builder().register(factory).build());

        let a = registry.resolver().resolve::<user::Entity>().unwrap();
        let b = registry.resolver().resolve::<user::Entity>().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
