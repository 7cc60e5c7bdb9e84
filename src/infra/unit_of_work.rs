//! Unit of Work pattern implementation.
//!
//! Collects the inserts, updates and deletes staged through repositories of
//! one database context and flushes them inside a single transaction.
//!
//! - Entries are tracked by primary key, per entity type, in staging order
//! - Inserts and updates reach principal tables before the tables that
//!   reference them; deletes run in the reverse order
//! - Duplicate identities among staged inserts are rejected before any write
//! - Updates and deletes of rows that do not exist are silent no-ops

use std::any::{type_name, Any, TypeId};

use async_trait::async_trait;
use sea_orm::sea_query::TableRef;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, DbErr, EntityTrait,
    IntoActiveModel, Iterable, ModelTrait, PrimaryKeyToColumn, QueryFilter, RelationTrait, Value,
};

use crate::errors::{AppError, AppResult};

/// Tracking state of a staged entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Added,
    Modified,
    Deleted,
}

/// Number of staged entries written by a flush, per state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Updates/deletes whose identity matched no row
    pub skipped: usize,
}

impl FlushStats {
    pub fn written(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }

    fn merge(&mut self, other: FlushStats) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.skipped += other.skipped;
    }
}

/// Primary-key values of a model, in primary-key column order.
pub(crate) fn primary_key_of<E: EntityTrait>(model: &E::Model) -> Vec<Value> {
    E::PrimaryKey::iter()
        .map(|pk| model.get(pk.into_column()))
        .collect()
}

/// `pk_1 = v_1 AND pk_2 = v_2 ...` for the given key values.
pub(crate) fn key_condition<E: EntityTrait>(key: &[Value]) -> Condition {
    E::PrimaryKey::iter()
        .zip(key.iter())
        .fold(Condition::all(), |condition, (pk, value)| {
            condition.add(pk.into_column().eq(value.clone()))
        })
}

struct Entry<E: EntityTrait> {
    key: Vec<Value>,
    model: E::Model,
    state: EntryState,
}

/// Staged entries of one entity type.
struct EntitySet<E: EntityTrait> {
    entries: Vec<Entry<E>>,
}

impl<E: EntityTrait> EntitySet<E> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn position(&self, key: &[Value]) -> Option<usize> {
        self.entries.iter().rposition(|entry| entry.key == key)
    }

    fn stage_added(&mut self, model: E::Model) {
        let key = primary_key_of::<E>(&model);
        // The row still exists, so adding it back replaces it
        if let Some(idx) = self.position(&key) {
            if self.entries[idx].state == EntryState::Deleted {
                let entry = &mut self.entries[idx];
                entry.model = model;
                entry.state = EntryState::Modified;
                return;
            }
        }
        self.entries.push(Entry {
            key,
            model,
            state: EntryState::Added,
        });
    }

    fn stage_modified(&mut self, model: E::Model) {
        let key = primary_key_of::<E>(&model);
        match self.position(&key) {
            Some(idx) => {
                let entry = &mut self.entries[idx];
                entry.model = model;
                // Added stays an insert; a staged delete becomes an update again
                if entry.state == EntryState::Deleted {
                    entry.state = EntryState::Modified;
                }
            }
            None => self.entries.push(Entry {
                key,
                model,
                state: EntryState::Modified,
            }),
        }
    }

    fn stage_deleted(&mut self, model: E::Model) {
        let key = primary_key_of::<E>(&model);
        match self.position(&key) {
            Some(idx) if self.entries[idx].state == EntryState::Added => {
                self.entries.remove(idx);
            }
            Some(idx) => {
                let entry = &mut self.entries[idx];
                entry.model = model;
                entry.state = EntryState::Deleted;
            }
            None => self.entries.push(Entry {
                key,
                model,
                state: EntryState::Deleted,
            }),
        }
    }

    fn state_of(&self, key: &[Value]) -> Option<EntryState> {
        self.position(key).map(|idx| self.entries[idx].state)
    }
}

/// Type-erased view of an [`EntitySet`] so sets of different entities share one list.
#[async_trait]
trait PendingChanges: Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn entity_name(&self) -> &'static str;

    fn len(&self) -> usize;

    /// Table this set writes to
    fn table(&self) -> TableRef;

    /// Tables this set's rows reference through `belongs_to` relations
    fn principals(&self) -> Vec<TableRef>;

    fn check_conflicts(&self) -> AppResult<()>;

    /// Write staged inserts and updates.
    async fn flush_saves(&self, txn: &DatabaseTransaction) -> AppResult<FlushStats>;

    /// Write staged deletes.
    async fn flush_deletes(&self, txn: &DatabaseTransaction) -> AppResult<FlushStats>;
}

#[async_trait]
impl<E> PendingChanges for EntitySet<E>
where
    E: EntityTrait,
    E::Model: IntoActiveModel<E::ActiveModel> + Sync + 'static,
    E::ActiveModel: Send,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn entity_name(&self) -> &'static str {
        type_name::<E>()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn table(&self) -> TableRef {
        E::default().table_ref()
    }

    fn principals(&self) -> Vec<TableRef> {
        let own = self.table();
        E::Relation::iter()
            .map(|relation| relation.def())
            .filter(|def| !def.is_owner && def.to_tbl != own)
            .map(|def| def.to_tbl)
            .collect()
    }

    fn check_conflicts(&self) -> AppResult<()> {
        let added: Vec<&Entry<E>> = self
            .entries
            .iter()
            .filter(|entry| entry.state == EntryState::Added)
            .collect();

        for (idx, entry) in added.iter().enumerate() {
            if added[idx + 1..].iter().any(|other| other.key == entry.key) {
                return Err(AppError::conflict(format!(
                    "identity {:?} is staged more than once for insertion into `{}`",
                    entry.key,
                    type_name::<E>()
                )));
            }
        }
        Ok(())
    }

    async fn flush_saves(&self, txn: &DatabaseTransaction) -> AppResult<FlushStats> {
        let mut stats = FlushStats::default();

        for entry in &self.entries {
            match entry.state {
                EntryState::Added => {
                    let active = entry.model.clone().into_active_model().reset_all();
                    active.insert(txn).await?;
                    stats.inserted += 1;
                }
                EntryState::Modified => {
                    let active = entry.model.clone().into_active_model().reset_all();
                    match active.update(txn).await {
                        Ok(_) => stats.updated += 1,
                        Err(DbErr::RecordNotUpdated) => {
                            tracing::debug!(
                                entity = type_name::<E>(),
                                key = ?entry.key,
                                "Skipping update of detached entity"
                            );
                            stats.skipped += 1;
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                EntryState::Deleted => {}
            }
        }

        Ok(stats)
    }

    async fn flush_deletes(&self, txn: &DatabaseTransaction) -> AppResult<FlushStats> {
        let mut stats = FlushStats::default();

        for entry in self
            .entries
            .iter()
            .filter(|entry| entry.state == EntryState::Deleted)
        {
            let result = E::delete_many()
                .filter(key_condition::<E>(&entry.key))
                .exec(txn)
                .await?;
            if result.rows_affected == 0 {
                stats.skipped += 1;
            } else {
                stats.deleted += 1;
            }
        }

        Ok(stats)
    }
}

/// Change tracker of one database context.
#[derive(Default)]
pub struct UnitOfWork {
    sets: Vec<(TypeId, Box<dyn PendingChanges>)>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    fn set<E: EntityTrait>(&self) -> Option<&EntitySet<E>> {
        self.sets
            .iter()
            .find(|(type_id, _)| *type_id == TypeId::of::<E>())
            .and_then(|(_, set)| set.as_any().downcast_ref::<EntitySet<E>>())
    }

    fn set_mut<E>(&mut self) -> AppResult<&mut EntitySet<E>>
    where
        E: EntityTrait,
        E::Model: IntoActiveModel<E::ActiveModel> + Sync + 'static,
        E::ActiveModel: Send,
    {
        let type_id = TypeId::of::<E>();
        let idx = match self.sets.iter().position(|(id, _)| *id == type_id) {
            Some(idx) => idx,
            None => {
                self.sets.push((type_id, Box::new(EntitySet::<E>::new())));
                self.sets.len() - 1
            }
        };

        self.sets[idx]
            .1
            .as_any_mut()
            .downcast_mut::<EntitySet<E>>()
            .ok_or_else(|| {
                AppError::internal(format!("change set type mismatch for `{}`", type_name::<E>()))
            })
    }

    /// Stage entities for insertion.
    pub fn stage_added<E, I>(&mut self, models: I) -> AppResult<usize>
    where
        E: EntityTrait,
        E::Model: IntoActiveModel<E::ActiveModel> + Sync + 'static,
        E::ActiveModel: Send,
        I: IntoIterator<Item = E::Model>,
    {
        let mut models = models.into_iter().peekable();
        if models.peek().is_none() {
            return Ok(0);
        }
        let set = self.set_mut::<E>()?;
        let mut staged = 0;
        for model in models {
            set.stage_added(model);
            staged += 1;
        }
        Ok(staged)
    }

    /// Stage entities as modified; unknown entities are attached.
    pub fn stage_modified<E, I>(&mut self, models: I) -> AppResult<usize>
    where
        E: EntityTrait,
        E::Model: IntoActiveModel<E::ActiveModel> + Sync + 'static,
        E::ActiveModel: Send,
        I: IntoIterator<Item = E::Model>,
    {
        let mut models = models.into_iter().peekable();
        if models.peek().is_none() {
            return Ok(0);
        }
        let set = self.set_mut::<E>()?;
        let mut staged = 0;
        for model in models {
            set.stage_modified(model);
            staged += 1;
        }
        Ok(staged)
    }

    /// Stage entities for deletion; removing an unsaved insert unstages it.
    pub fn stage_deleted<E, I>(&mut self, models: I) -> AppResult<usize>
    where
        E: EntityTrait,
        E::Model: IntoActiveModel<E::ActiveModel> + Sync + 'static,
        E::ActiveModel: Send,
        I: IntoIterator<Item = E::Model>,
    {
        let mut models = models.into_iter().peekable();
        if models.peek().is_none() {
            return Ok(0);
        }
        let set = self.set_mut::<E>()?;
        let mut staged = 0;
        for model in models {
            set.stage_deleted(model);
            staged += 1;
        }
        Ok(staged)
    }

    /// Current tracking state of the entity with the given model's identity.
    pub fn state_of<E: EntityTrait>(&self, model: &E::Model) -> Option<EntryState> {
        let key = primary_key_of::<E>(model);
        self.set::<E>().and_then(|set| set.state_of(&key))
    }

    /// Total number of staged entries
    pub fn len(&self) -> usize {
        self.sets.iter().map(|(_, set)| set.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reject the batch if any entity type stages the same identity twice.
    pub fn check_conflicts(&self) -> AppResult<()> {
        self.sets
            .iter()
            .try_for_each(|(_, set)| set.check_conflicts())
    }

    /// Indices of the staged sets, principals before the sets referencing them.
    /// Ties and reference cycles keep staging order.
    fn flush_order(&self) -> Vec<usize> {
        let mut remaining: Vec<usize> = (0..self.sets.len()).collect();
        let mut order = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            let next = remaining
                .iter()
                .position(|&idx| {
                    let principals = self.sets[idx].1.principals();
                    !remaining.iter().any(|&other| {
                        other != idx && principals.contains(&self.sets[other].1.table())
                    })
                })
                .unwrap_or(0);
            order.push(remaining.remove(next));
        }
        order
    }

    /// Write every staged entry through `txn`. Committing is the caller's job.
    pub async fn flush(&self, txn: &DatabaseTransaction) -> AppResult<FlushStats> {
        let order = self.flush_order();
        let mut per_set = vec![FlushStats::default(); self.sets.len()];

        for &idx in &order {
            per_set[idx].merge(self.sets[idx].1.flush_saves(txn).await?);
        }
        for &idx in order.iter().rev() {
            per_set[idx].merge(self.sets[idx].1.flush_deletes(txn).await?);
        }

        let mut stats = FlushStats::default();
        for &idx in &order {
            let set_stats = per_set[idx];
            tracing::debug!(
                entity = self.sets[idx].1.entity_name(),
                inserted = set_stats.inserted,
                updated = set_stats.updated,
                deleted = set_stats.deleted,
                skipped = set_stats.skipped,
                "Flushed staged changes"
            );
            stats.merge(set_stats);
        }
        Ok(stats)
    }

    /// Drop every staged entry
    pub fn clear(&mut self) {
        self.sets.clear();
    }
}
