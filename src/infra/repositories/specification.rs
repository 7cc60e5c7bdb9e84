//! Composable query descriptors.
//!
//! A [`Specification`] bundles a filter condition, an optional ordering and
//! a list of include directives that shape the query (joins, eager loading).
//! It carries no connection and can be reused across repositories and scopes.

use std::sync::Arc;

use sea_orm::sea_query::{IntoCondition, SimpleExpr};
use sea_orm::{
    Condition, EntityTrait, IntoActiveModel, IntoSimpleExpr, JoinType, Order, QuerySelect,
    RelationTrait, Select,
};

use super::repository::Repository;
use crate::errors::AppResult;
use crate::types::Page;

/// Query-shaping directive applied after the criteria and before ordering.
pub type Include<E> = Arc<dyn Fn(Select<E>) -> Select<E> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn from_ascending(ascending: bool) -> Self {
        if ascending {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        }
    }
}

impl From<SortDirection> for Order {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Ascending => Order::Asc,
            SortDirection::Descending => Order::Desc,
        }
    }
}

/// Criteria + ordering + includes for entity `E`.
pub struct Specification<E: EntityTrait> {
    criteria: Option<Condition>,
    order_by: Option<SimpleExpr>,
    direction: Option<SortDirection>,
    includes: Vec<Include<E>>,
}

impl<E: EntityTrait> Clone for Specification<E> {
    fn clone(&self) -> Self {
        Self {
            criteria: self.criteria.clone(),
            order_by: self.order_by.clone(),
            direction: self.direction,
            includes: self.includes.clone(),
        }
    }
}

impl<E: EntityTrait> Default for Specification<E> {
    fn default() -> Self {
        Self {
            criteria: None,
            order_by: None,
            direction: None,
            includes: Vec::new(),
        }
    }
}

impl<E: EntityTrait> std::fmt::Debug for Specification<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Specification")
            .field("criteria", &self.criteria)
            .field("order_by", &self.order_by)
            .field("direction", &self.direction)
            .field("includes", &self.includes.len())
            .finish()
    }
}

impl<E: EntityTrait> Specification<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Specification matching `criteria`
    pub fn with_criteria<C: IntoCondition>(criteria: C) -> Self {
        Self::new().apply_criteria(criteria)
    }

    /// Replace the filter condition.
    pub fn apply_criteria<C: IntoCondition>(mut self, criteria: C) -> Self {
        self.criteria = Some(criteria.into_condition());
        self
    }

    /// Sort by `key` in `direction`.
    pub fn order_by<K: IntoSimpleExpr>(mut self, key: K, direction: SortDirection) -> Self {
        self.order_by = Some(key.into_simple_expr());
        self.direction = Some(direction);
        self
    }

    /// Set the direction and an optional key. Without a key the primary key is used.
    pub fn apply_order(mut self, ascending: bool, key: Option<SimpleExpr>) -> Self {
        self.order_by = key;
        self.direction = Some(SortDirection::from_ascending(ascending));
        self
    }

    /// Register a query-shaping directive.
    pub fn include<F>(mut self, include: F) -> Self
    where
        F: Fn(Select<E>) -> Select<E> + Send + Sync + 'static,
    {
        self.includes.push(Arc::new(include));
        self
    }

    /// Left-join `relation`; rows stay distinct when the relation is one-to-many.
    pub fn include_join<R>(self, relation: R) -> Self
    where
        R: RelationTrait + Send + Sync + 'static,
    {
        self.include(move |query| query.join(JoinType::LeftJoin, relation.def()).distinct())
    }

    pub fn criteria(&self) -> Option<&Condition> {
        self.criteria.as_ref()
    }

    pub fn order_key(&self) -> Option<&SimpleExpr> {
        self.order_by.as_ref()
    }

    /// `None` means the query is left unordered
    pub fn direction(&self) -> Option<SortDirection> {
        self.direction
    }

    pub fn includes(&self) -> &[Include<E>] {
        &self.includes
    }
}

impl<E> Specification<E>
where
    E: EntityTrait,
    E::Model: IntoActiveModel<E::ActiveModel> + Sync + 'static,
    E::ActiveModel: Send,
{
    /// Run this specification through `repository`.
    pub async fn execute(&self, repository: &Repository<E>) -> AppResult<Vec<E::Model>> {
        repository.query_by_specification(self).await
    }

    pub async fn execute_paged(
        &self,
        repository: &Repository<E>,
        page: u64,
        page_size: u64,
    ) -> AppResult<Page<E::Model>> {
        repository
            .query_by_specification_paged(self, page, page_size)
            .await
    }
}
