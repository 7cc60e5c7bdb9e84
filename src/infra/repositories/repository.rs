//! Generic repository over any SeaORM entity.
//!
//! Reads go straight to the database (through the ambient transaction when
//! one is open) and never touch the unit of work. `add`, `update` and
//! `remove` only stage changes; they are written by `save_changes`.
//! `update_where` and `remove_where` are set-based and run immediately.

use std::any::type_name;
use std::marker::PhantomData;
use std::sync::Arc;

use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    Condition, EntityTrait, IdenStatic, IntoActiveModel, Iterable, PaginatorTrait,
    PrimaryKeyToColumn, PrimaryKeyTrait, QueryFilter, QuerySelect, Related, Select, TryGetableMany,
};

use super::evaluator::SpecificationEvaluator;
use super::specification::Specification;
use crate::errors::{AppError, AppResult};
use crate::infra::context::{on_connection, DbContext, DbContextResolver};
use crate::types::{page_window, Page};

/// Column assignments for [`Repository::update_where`].
pub struct SetExpression<E: EntityTrait> {
    assignments: Vec<(E::Column, SimpleExpr)>,
}

impl<E: EntityTrait> SetExpression<E> {
    pub fn new() -> Self {
        Self {
            assignments: Vec::new(),
        }
    }

    /// Assign `value` to `column`.
    pub fn set<V: Into<SimpleExpr>>(mut self, column: E::Column, value: V) -> Self {
        self.assignments.push((column, value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn assignments(&self) -> &[(E::Column, SimpleExpr)] {
        &self.assignments
    }
}

impl<E: EntityTrait> Default for SetExpression<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EntityTrait> Clone for SetExpression<E> {
    fn clone(&self) -> Self {
        Self {
            assignments: self.assignments.clone(),
        }
    }
}

impl<E: EntityTrait> std::fmt::Debug for SetExpression<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.assignments.iter().map(|(column, _)| column.as_str()))
            .finish()
    }
}

fn is_primary_key<E: EntityTrait>(column: &E::Column) -> bool {
    E::PrimaryKey::iter().any(|pk| pk.into_column().as_str() == column.as_str())
}

/// Repository of entity `E`, bound to the context that owns `E`.
pub struct Repository<E: EntityTrait> {
    context: Arc<DbContext>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: EntityTrait> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: EntityTrait> std::fmt::Debug for Repository<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("entity", &type_name::<E>())
            .field("context", &self.context.name())
            .finish()
    }
}

impl<E> Repository<E>
where
    E: EntityTrait,
    E::Model: IntoActiveModel<E::ActiveModel> + Sync + 'static,
    E::ActiveModel: Send,
{
    /// Repository on the scope's context that owns `E`.
    pub fn new(resolver: &DbContextResolver) -> AppResult<Self> {
        Ok(Self {
            context: resolver.resolve::<E>()?,
            _entity: PhantomData,
        })
    }

    /// Repository on an explicit context, which must own `E`.
    pub fn for_context(context: Arc<DbContext>) -> AppResult<Self> {
        if !context.owns::<E>() {
            return Err(AppError::configuration(format!(
                "context `{}` does not own entity type `{}`",
                context.name(),
                type_name::<E>()
            )));
        }
        Ok(Self {
            context,
            _entity: PhantomData,
        })
    }

    pub fn context(&self) -> &Arc<DbContext> {
        &self.context
    }

    fn filtered(predicate: Option<Condition>) -> Select<E> {
        match predicate {
            Some(predicate) => E::find().filter(predicate),
            None => E::find(),
        }
    }

    fn project(query: Select<E>, selector: &[E::Column]) -> AppResult<Select<E>> {
        if selector.is_empty() {
            return Err(AppError::invalid_argument("selector must name at least one column"));
        }
        Ok(query.select_only().columns(selector.iter().copied()))
    }

    /// `SELECT 1 ... LIMIT 1`: stops at the first matching row.
    fn existence(predicate: Condition) -> Select<E> {
        E::find()
            .filter(predicate)
            .select_only()
            .expr(Expr::val(1))
            .limit(1)
    }

    async fn page_of_models(
        &self,
        query: Select<E>,
        page: u64,
        page_size: u64,
    ) -> AppResult<Page<E::Model>> {
        let (offset, limit) = page_window(page, page_size)?;

        let (total, items) = on_connection!(self.context, |db| {
            let total = query.clone().count(db).await?;
            let items = query.offset(offset).limit(limit).all(db).await?;
            (total, items)
        });

        Ok(Page::new(items, page, page_size, total))
    }

    async fn page_of_tuples<T>(
        &self,
        query: Select<E>,
        page: u64,
        page_size: u64,
    ) -> AppResult<Page<T>>
    where
        T: TryGetableMany + Send,
    {
        let (offset, limit) = page_window(page, page_size)?;

        let (total, items) = on_connection!(self.context, |db| {
            let total = query.clone().count(db).await?;
            let items = query
                .offset(offset)
                .limit(limit)
                .into_tuple::<T>()
                .all(db)
                .await?;
            (total, items)
        });

        Ok(Page::new(items, page, page_size, total))
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Find entity by primary key
    pub async fn get_by_id<K>(&self, id: K) -> AppResult<Option<E::Model>>
    where
        K: Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType>,
    {
        let query = E::find_by_id(id);
        let model = on_connection!(self.context, |db| query.one(db).await)?;
        Ok(model)
    }

    /// Count matching rows. With a `selector` the rows of that projection are
    /// counted, so the result equals the unprojected count.
    pub async fn count(
        &self,
        predicate: Option<Condition>,
        selector: Option<E::Column>,
    ) -> AppResult<u64> {
        let query = match selector {
            Some(column) => Self::filtered(predicate).select_only().column(column),
            None => Self::filtered(predicate),
        };
        tracing::debug!(entity = type_name::<E>(), "count");

        let total = on_connection!(self.context, |db| query.count(db).await)?;
        Ok(total)
    }

    /// All entities matching `predicate`, unordered.
    pub async fn list_all(&self, predicate: Option<Condition>) -> AppResult<Vec<E::Model>> {
        let query = Self::filtered(predicate);
        tracing::debug!(entity = type_name::<E>(), "list_all");
        let models = on_connection!(self.context, |db| query.all(db).await)?;
        Ok(models)
    }

    /// Project the `selector` columns of every matching row into `T`.
    pub async fn list_all_as<T>(
        &self,
        selector: &[E::Column],
        predicate: Option<Condition>,
    ) -> AppResult<Vec<T>>
    where
        T: TryGetableMany + Send,
    {
        let query = Self::project(Self::filtered(predicate), selector)?.into_tuple::<T>();
        let items = on_connection!(self.context, |db| query.all(db).await)?;
        Ok(items)
    }

    pub async fn list_all_paged(
        &self,
        predicate: Option<Condition>,
        page: u64,
        page_size: u64,
    ) -> AppResult<Page<E::Model>> {
        tracing::debug!(entity = type_name::<E>(), page, page_size, "list_all_paged");
        self.page_of_models(Self::filtered(predicate), page, page_size)
            .await
    }

    pub async fn list_all_paged_as<T>(
        &self,
        selector: &[E::Column],
        predicate: Option<Condition>,
        page: u64,
        page_size: u64,
    ) -> AppResult<Page<T>>
    where
        T: TryGetableMany + Send,
    {
        let query = Self::project(Self::filtered(predicate), selector)?;
        self.page_of_tuples(query, page, page_size).await
    }

    pub async fn query_by_specification(
        &self,
        spec: &Specification<E>,
    ) -> AppResult<Vec<E::Model>> {
        let query = SpecificationEvaluator::apply(E::find(), spec);
        tracing::debug!(entity = type_name::<E>(), ?spec, "query_by_specification");
        let models = on_connection!(self.context, |db| query.all(db).await)?;
        Ok(models)
    }

    pub async fn query_by_specification_as<T>(
        &self,
        spec: &Specification<E>,
        selector: &[E::Column],
    ) -> AppResult<Vec<T>>
    where
        T: TryGetableMany + Send,
    {
        let query = Self::project(SpecificationEvaluator::apply(E::find(), spec), selector)?
            .into_tuple::<T>();
        let items = on_connection!(self.context, |db| query.all(db).await)?;
        Ok(items)
    }

    pub async fn query_by_specification_paged(
        &self,
        spec: &Specification<E>,
        page: u64,
        page_size: u64,
    ) -> AppResult<Page<E::Model>> {
        let query = SpecificationEvaluator::apply(E::find(), spec);
        tracing::debug!(entity = type_name::<E>(), ?spec, page, page_size, "query_by_specification_paged");
        self.page_of_models(query, page, page_size).await
    }

    pub async fn query_by_specification_paged_as<T>(
        &self,
        spec: &Specification<E>,
        selector: &[E::Column],
        page: u64,
        page_size: u64,
    ) -> AppResult<Page<T>>
    where
        T: TryGetableMany + Send,
    {
        let query = Self::project(SpecificationEvaluator::apply(E::find(), spec), selector)?;
        self.page_of_tuples(query, page, page_size).await
    }

    /// Evaluate `spec` and eager-load the related `R` rows of every result.
    pub async fn query_by_specification_with_related<R>(
        &self,
        spec: &Specification<E>,
    ) -> AppResult<Vec<(E::Model, Vec<R::Model>)>>
    where
        R: EntityTrait,
        R::Model: Sync,
        E: Related<R>,
    {
        let query = SpecificationEvaluator::apply(E::find(), spec).find_with_related(R::default());
        let rows = on_connection!(self.context, |db| query.all(db).await)?;
        Ok(rows)
    }

    /// Whether any row matches `predicate`.
    pub async fn exist(&self, predicate: Condition) -> AppResult<bool> {
        let query = Self::existence(predicate).into_tuple::<i32>();
        let found = on_connection!(self.context, |db| query.one(db).await)?;
        Ok(found.is_some())
    }

    // ========================================================================
    // Staged writes
    // ========================================================================

    /// Stage entities for insertion.
    pub async fn add<I>(&self, entities: I) -> AppResult<usize>
    where
        I: IntoIterator<Item = E::Model>,
    {
        let staged = self
            .context
            .changes()
            .lock()
            .await
            .stage_added::<E, _>(entities)?;
        tracing::debug!(entity = type_name::<E>(), staged, "add");
        Ok(staged)
    }

    /// Stage entities as modified. Entities unknown to the unit of work are attached.
    pub async fn update<I>(&self, entities: I) -> AppResult<usize>
    where
        I: IntoIterator<Item = E::Model>,
    {
        let staged = self
            .context
            .changes()
            .lock()
            .await
            .stage_modified::<E, _>(entities)?;
        tracing::debug!(entity = type_name::<E>(), staged, "update");
        Ok(staged)
    }

    /// Stage entities for deletion.
    pub async fn remove<I>(&self, entities: I) -> AppResult<usize>
    where
        I: IntoIterator<Item = E::Model>,
    {
        let staged = self
            .context
            .changes()
            .lock()
            .await
            .stage_deleted::<E, _>(entities)?;
        tracing::debug!(entity = type_name::<E>(), staged, "remove");
        Ok(staged)
    }

    /// Write every change staged in this repository's context.
    pub async fn save_changes(&self) -> AppResult<usize> {
        self.context.save_changes().await
    }

    // ========================================================================
    // Set-based writes
    // ========================================================================

    /// Apply `set` to every row matching `predicate` (all rows when `None`).
    pub async fn update_where(
        &self,
        set: SetExpression<E>,
        predicate: Option<Condition>,
    ) -> AppResult<u64> {
        if set.is_empty() {
            return Err(AppError::invalid_argument("set expression is empty"));
        }
        if let Some((column, _)) = set
            .assignments()
            .iter()
            .find(|(column, _)| is_primary_key::<E>(column))
        {
            return Err(AppError::invalid_argument(format!(
                "identity column `{}` cannot be updated",
                column.as_str()
            )));
        }

        let mut statement = E::update_many();
        for (column, value) in set.assignments {
            statement = statement.col_expr(column, value);
        }
        if let Some(predicate) = predicate {
            statement = statement.filter(predicate);
        }

        let result = on_connection!(self.context, |db| statement.exec(db).await)?;
        tracing::debug!(
            entity = type_name::<E>(),
            rows = result.rows_affected,
            "update_where"
        );
        Ok(result.rows_affected)
    }

    /// Delete every row matching `predicate`.
    pub async fn remove_where(&self, predicate: Condition) -> AppResult<u64> {
        if predicate.is_empty() {
            return Err(AppError::invalid_argument(
                "remove_where requires a non-empty predicate",
            ));
        }

        let statement = E::delete_many().filter(predicate);
        let result = on_connection!(self.context, |db| statement.exec(db).await)?;
        tracing::debug!(
            entity = type_name::<E>(),
            rows = result.rows_affected,
            "remove_where"
        );
        Ok(result.rows_affected)
    }
}
