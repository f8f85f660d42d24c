// Todo collection state with write-through persistence

use crate::clock::{Clock, SystemClock};
use crate::codec;
use crate::filter::{FilterUpdate, TodoFilter};
use crate::kv::KvStore;
use crate::models::{NewTodo, Todo, TodoStats, TodoStatus, TodoUpdate};
use eyre::{Context, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Key the collection is stored under
pub const STORAGE_KEY: &str = "todos";

/// Ordered todo collection plus the session's active filter
///
/// The collection is read from the backing [`KvStore`] once, in
/// [`TodoStore::open`], and written back in full after every mutation, so the
/// in-memory list and the persisted copy never diverge. The filter is
/// session-only and never persisted.
///
/// Operations on an unknown id are silent no-ops: they return `Ok(())`
/// without touching the collection or the backend.
pub struct TodoStore {
    kv: Box<dyn KvStore>,
    clock: Arc<dyn Clock>,
    todos: Vec<Todo>,
    filter: TodoFilter,
}

impl TodoStore {
    /// Load the collection from `kv`, or start empty if nothing usable is stored
    pub fn open<K: KvStore + 'static>(kv: K) -> Result<Self> {
        Self::open_with_clock(kv, Arc::new(SystemClock))
    }

    /// Same as [`TodoStore::open`] with an explicit time source
    pub fn open_with_clock<K: KvStore + 'static>(kv: K, clock: Arc<dyn Clock>) -> Result<Self> {
        let raw = kv.get(STORAGE_KEY).context("Failed to read stored todos")?;
        let todos = codec::decode_collection(raw.as_deref());

        info!(count = todos.len(), "Loaded todo collection");

        Ok(Self {
            kv: Box::new(kv),
            clock,
            todos,
            filter: TodoFilter::default(),
        })
    }

    /// The full collection in display order
    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    /// The active filter
    pub fn filter(&self) -> &TodoFilter {
        &self.filter
    }

    // ========================================================================
    // Derived views
    // ========================================================================

    /// Records passing the active filter, in collection order
    pub fn filtered_todos(&self) -> Vec<&Todo> {
        self.filter.apply(&self.todos)
    }

    /// Total count and count per status
    pub fn stats(&self) -> TodoStats {
        let mut stats = TodoStats {
            total: self.todos.len(),
            ..Default::default()
        };

        for todo in &self.todos {
            match todo.status {
                TodoStatus::Todo => stats.todo += 1,
                TodoStatus::InProgress => stats.in_progress += 1,
                TodoStatus::Done => stats.done += 1,
            }
        }

        stats
    }

    /// Distinct non-empty categories in first-seen order
    pub fn categories(&self) -> Vec<&str> {
        distinct(self.todos.iter().map(|t| t.category.as_str()).filter(|c| !c.is_empty()))
    }

    /// Distinct tags across all records in first-seen order
    pub fn all_tags(&self) -> Vec<&str> {
        distinct(self.todos.iter().flat_map(|t| t.tags.iter().map(String::as_str)))
    }

    /// Look up a record
    pub fn get_todo_by_id(&self, id: &str) -> Option<&Todo> {
        self.todos.iter().find(|t| t.id == id)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Append a new record and return its generated id
    pub fn add_todo(&mut self, data: NewTodo) -> Result<String> {
        let mut id = Uuid::now_v7().to_string();
        while self.get_todo_by_id(&id).is_some() {
            id = Uuid::now_v7().to_string();
        }

        let todo = data.into_todo(id.clone(), self.clock.now());
        debug!(id = %todo.id, title = %todo.title, "add_todo");

        let mut next = self.todos.clone();
        next.push(todo);
        self.commit(next)?;
        Ok(id)
    }

    /// Merge `updates` into the record and re-stamp `updated_at`
    ///
    /// `updated_at` moves even when `updates` is empty.
    pub fn update_todo(&mut self, id: &str, updates: TodoUpdate) -> Result<()> {
        let Some(index) = self.todos.iter().position(|t| t.id == id) else {
            return Ok(());
        };

        let mut next = self.todos.clone();
        let todo = &mut next[index];
        updates.apply_to(todo);
        todo.updated_at = self.clock.now();
        debug!(id, "update_todo");

        self.commit(next)
    }

    /// Remove the record permanently
    pub fn delete_todo(&mut self, id: &str) -> Result<()> {
        let Some(index) = self.todos.iter().position(|t| t.id == id) else {
            return Ok(());
        };

        let mut next = self.todos.clone();
        next.remove(index);
        debug!(id, "delete_todo");

        self.commit(next)
    }

    /// Advance the status one step along `todo -> in-progress -> done -> todo`
    ///
    /// Reaching `done` stamps `completed_at`; any other status clears it.
    pub fn toggle_todo_status(&mut self, id: &str) -> Result<()> {
        let Some(todo) = self.get_todo_by_id(id) else {
            return Ok(());
        };

        let status = todo.status.next();
        let completed_at = (status == TodoStatus::Done).then(|| self.clock.now());

        self.update_todo(id, TodoUpdate::new().status(status).completed_at(completed_at))
    }

    /// Replace the collection order wholesale
    ///
    /// The caller must pass the same records as the current collection in the
    /// new order. This is not checked.
    pub fn reorder_todos(&mut self, new_order: Vec<Todo>) -> Result<()> {
        debug!(before = self.todos.len(), after = new_order.len(), "reorder_todos");
        self.commit(new_order)
    }

    /// Move one record to `position`, shifting the others
    ///
    /// Positions past the end place the record last.
    pub fn move_todo(&mut self, id: &str, position: usize) -> Result<()> {
        let Some(index) = self.todos.iter().position(|t| t.id == id) else {
            return Ok(());
        };

        let mut new_order = self.todos.clone();
        let todo = new_order.remove(index);
        let position = position.min(new_order.len());
        new_order.insert(position, todo);

        self.reorder_todos(new_order)
    }

    // ========================================================================
    // Filter
    // ========================================================================

    /// Shallow-merge into the active filter
    pub fn update_filter(&mut self, update: FilterUpdate) {
        self.filter.merge(update);
    }

    /// Drop every predicate
    pub fn clear_filter(&mut self) {
        self.filter = TodoFilter::default();
    }

    /// Persist `next` and make it the current collection
    ///
    /// On a write failure the current collection is left as it was, so memory
    /// never holds a change the backend rejected.
    fn commit(&mut self, next: Vec<Todo>) -> Result<()> {
        let encoded = codec::encode_collection(&next)?;
        self.kv
            .set(STORAGE_KEY, &encoded)
            .context("Failed to persist todo collection")?;

        self.todos = next;
        debug!(count = self.todos.len(), "Persisted todo collection");
        Ok(())
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    values.filter(|value| seen.insert(*value)).collect()
}
