//! Persistence for todo lists and items.
//!
//! [`TodoDatabase`] opens a [`TodoSession`] per request. Reads go straight to
//! committed state; writes are staged on the session and applied together
//! by [`Persistence::save_changes`]. Deleting a list deletes its items.

use crate::domain::{TodoItem, TodoItemId, TodoList, TodoListId};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tidy_core::{Persistence, PersistenceError};
use tokio::sync::RwLock;

/// Source of per-request sessions.
pub trait TodoDatabase: Send + Sync {
    /// Open a unit of work.
    fn session(&self) -> Box<dyn TodoSession>;
}

/// A unit of work against the todo tables.
pub trait TodoSession: Persistence {
    /// All lists.
    fn lists(&self) -> BoxFuture<'_, Result<Vec<TodoList>, PersistenceError>>;

    /// One list.
    fn find_list(&self, id: TodoListId)
    -> BoxFuture<'_, Result<Option<TodoList>, PersistenceError>>;

    /// One item.
    fn find_item(&self, id: TodoItemId)
    -> BoxFuture<'_, Result<Option<TodoItem>, PersistenceError>>;

    /// Items belonging to a list.
    fn items_in(&self, list_id: TodoListId)
    -> BoxFuture<'_, Result<Vec<TodoItem>, PersistenceError>>;

    /// Stage an insert or update of a list.
    fn put_list(&self, list: TodoList);

    /// Stage a list deletion (cascades to its items).
    fn remove_list(&self, id: TodoListId);

    /// Stage an insert or update of an item.
    fn put_item(&self, item: TodoItem);

    /// Stage an item deletion.
    fn remove_item(&self, id: TodoItemId);
}

#[derive(Debug, Clone)]
enum Change {
    PutList(TodoList),
    RemoveList(TodoListId),
    PutItem(TodoItem),
    RemoveItem(TodoItemId),
}

#[derive(Debug, Default)]
struct Tables {
    lists: HashMap<TodoListId, TodoList>,
    items: HashMap<TodoItemId, TodoItem>,
}

impl Tables {
    fn apply(&mut self, change: Change) -> Result<usize, PersistenceError> {
        match change {
            Change::PutList(list) => {
                self.lists.insert(list.id, list);
                Ok(1)
            }
            Change::RemoveList(id) => {
                if self.lists.remove(&id).is_none() {
                    return Err(PersistenceError::Conflict(format!(
                        "TodoList {id} no longer exists"
                    )));
                }
                let before = self.items.len();
                self.items.retain(|_, item| item.list_id != id);
                Ok(1 + before - self.items.len())
            }
            Change::PutItem(item) => {
                if !self.lists.contains_key(&item.list_id) {
                    return Err(PersistenceError::Conflict(format!(
                        "TodoList {} no longer exists",
                        item.list_id
                    )));
                }
                self.items.insert(item.id, item);
                Ok(1)
            }
            Change::RemoveItem(id) => self.items.remove(&id).map(|_| 1).ok_or_else(|| {
                PersistenceError::Conflict(format!("TodoItem {id} no longer exists"))
            }),
        }
    }
}

/// In-process database behind a `tokio` read-write lock.
///
/// Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTodoDatabase {
    tables: Arc<RwLock<Tables>>,
    offline: Arc<AtomicBool>,
}

impl InMemoryTodoDatabase {
    /// Create an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: while offline every read and commit fails with
    /// [`PersistenceError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of stored lists and items.
    pub async fn counts(&self) -> (usize, usize) {
        let tables = self.tables.read().await;
        (tables.lists.len(), tables.items.len())
    }
}

impl TodoDatabase for InMemoryTodoDatabase {
    fn session(&self) -> Box<dyn TodoSession> {
        Box::new(InMemorySession {
            database: self.clone(),
            staged: Mutex::new(Vec::new()),
        })
    }
}

struct InMemorySession {
    database: InMemoryTodoDatabase,
    staged: Mutex<Vec<Change>>,
}

impl InMemorySession {
    fn check_online(&self) -> Result<(), PersistenceError> {
        if self.database.offline.load(Ordering::SeqCst) {
            Err(PersistenceError::Unavailable(
                "todo database is offline".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn stage(&self, change: Change) {
        self.staged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(change);
    }
}

impl Persistence for InMemorySession {
    fn save_changes(&self) -> BoxFuture<'_, Result<usize, PersistenceError>> {
        Box::pin(async move {
            self.check_online()?;
            let changes = std::mem::take(
                &mut *self.staged.lock().unwrap_or_else(PoisonError::into_inner),
            );

            let mut tables = self.database.tables.write().await;
            // Apply to a scratch copy so a conflict leaves the tables untouched.
            let mut scratch = Tables {
                lists: tables.lists.clone(),
                items: tables.items.clone(),
            };
            let mut written = 0;
            for change in changes {
                written += scratch.apply(change)?;
            }
            *tables = scratch;

            tracing::debug!(written, "Changes saved");
            Ok(written)
        })
    }
}

impl TodoSession for InMemorySession {
    fn lists(&self) -> BoxFuture<'_, Result<Vec<TodoList>, PersistenceError>> {
        Box::pin(async move {
            self.check_online()?;
            Ok(self.database.tables.read().await.lists.values().cloned().collect())
        })
    }

    fn find_list(
        &self,
        id: TodoListId,
    ) -> BoxFuture<'_, Result<Option<TodoList>, PersistenceError>> {
        Box::pin(async move {
            self.check_online()?;
            Ok(self.database.tables.read().await.lists.get(&id).cloned())
        })
    }

    fn find_item(
        &self,
        id: TodoItemId,
    ) -> BoxFuture<'_, Result<Option<TodoItem>, PersistenceError>> {
        Box::pin(async move {
            self.check_online()?;
            Ok(self.database.tables.read().await.items.get(&id).cloned())
        })
    }

    fn items_in(
        &self,
        list_id: TodoListId,
    ) -> BoxFuture<'_, Result<Vec<TodoItem>, PersistenceError>> {
        Box::pin(async move {
            self.check_online()?;
            Ok(self
                .database
                .tables
                .read()
                .await
                .items
                .values()
                .filter(|item| item.list_id == list_id)
                .cloned()
                .collect())
        })
    }

    fn put_list(&self, list: TodoList) {
        self.stage(Change::PutList(list));
    }

    fn remove_list(&self, id: TodoListId) {
        self.stage(Change::RemoveList(id));
    }

    fn put_item(&self, item: TodoItem) {
        self.stage(Change::PutItem(item));
    }

    fn remove_item(&self, id: TodoItemId) {
        self.stage(Change::RemoveItem(id));
    }
}
