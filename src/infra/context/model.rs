//! Schema model of a bounded context: the entity types one database context owns.

use std::any::{type_name, TypeId};

use sea_orm::sea_query::TableCreateStatement;
use sea_orm::{EntityTrait, Schema};

/// One entity type registered in a [`SchemaModel`].
#[derive(Clone)]
pub struct EntityDescriptor {
    type_id: TypeId,
    type_name: &'static str,
    table_name: String,
    create_table: fn(&Schema) -> TableCreateStatement,
}

impl std::fmt::Debug for EntityDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("type_name", &self.type_name)
            .field("table_name", &self.table_name)
            .finish()
    }
}

impl EntityDescriptor {
    fn of<E: EntityTrait>() -> Self {
        Self {
            type_id: TypeId::of::<E>(),
            type_name: type_name::<E>(),
            table_name: E::default().table_name().to_string(),
            create_table: create_table::<E>,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// `CREATE TABLE` statement derived from the entity definition
    pub fn create_table_statement(&self, schema: &Schema) -> TableCreateStatement {
        (self.create_table)(schema)
    }
}

fn create_table<E: EntityTrait>(schema: &Schema) -> TableCreateStatement {
    schema.create_table_from_entity(E::default())
}

/// Entity types owned by one bounded context, in registration order.
#[derive(Debug, Clone)]
pub struct SchemaModel {
    name: String,
    schema: String,
    entities: Vec<EntityDescriptor>,
}

impl SchemaModel {
    /// Start describing the bounded context `name`.
    pub fn builder(name: impl Into<String>) -> SchemaModelBuilder {
        SchemaModelBuilder {
            name: name.into(),
            schema: "public".to_string(),
            entities: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Database schema the context's tables live in
    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn entities(&self) -> &[EntityDescriptor] {
        &self.entities
    }

    /// Whether this model declares the entity type `E`.
    pub fn contains<E: EntityTrait>(&self) -> bool {
        self.contains_type(TypeId::of::<E>())
    }

    pub fn contains_type(&self, type_id: TypeId) -> bool {
        self.entities.iter().any(|entity| entity.type_id == type_id)
    }
}

/// Builder for [`SchemaModel`]; entities are registered explicitly.
#[derive(Debug)]
pub struct SchemaModelBuilder {
    name: String,
    schema: String,
    entities: Vec<EntityDescriptor>,
}

impl SchemaModelBuilder {
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Declare that this context owns `E`. Registering the same type twice is ignored.
    pub fn entity<E: EntityTrait>(mut self) -> Self {
        if !self.entities.iter().any(|e| e.type_id == TypeId::of::<E>()) {
            self.entities.push(EntityDescriptor::of::<E>());
        }
        self
    }

    pub fn build(self) -> SchemaModel {
        SchemaModel {
            name: self.name,
            schema: self.schema,
            entities: self.entities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::repositories::entities::user;

    #[test]
    fn test_model_declares_registered_entities_only() {
        let model = SchemaModel::builder("users")
            .schema("users_db")
            .entity::<user::Entity>()
            .entity::<user::Entity>()
            .build();

        assert_eq!(model.name(), "users");
        assert_eq!(model.schema(), "users_db");
        assert_eq!(model.entities().len(), 1);
        assert_eq!(model.entities()[0].table_name(), "users");
        assert!(model.contains::<user::Entity>());
        assert!(!model.contains::<sea_orm_migration::seaql_migrations::Entity>());
    }
}
