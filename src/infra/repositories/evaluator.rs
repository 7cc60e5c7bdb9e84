//! Applies a [`Specification`] onto a base query.

use sea_orm::{EntityTrait, Iterable, Order, PrimaryKeyToColumn, QueryFilter, QueryOrder, Select};

use super::specification::Specification;

pub struct SpecificationEvaluator;

impl SpecificationEvaluator {
    /// Criteria first, then every include in registration order, then ordering.
    pub fn apply<E: EntityTrait>(base: Select<E>, spec: &Specification<E>) -> Select<E> {
        let mut query = base;

        if let Some(criteria) = spec.criteria() {
            query = query.filter(criteria.clone());
        }

        for include in spec.includes() {
            query = include(query);
        }

        let Some(direction) = spec.direction() else {
            return query;
        };

        match spec.order_key() {
            Some(key) => query.order_by(key.clone(), Order::from(direction)),
            None => E::PrimaryKey::iter().fold(query, |query, pk| {
                query.order_by(pk.into_column(), Order::from(direction))
            }),
        }
    }
}
