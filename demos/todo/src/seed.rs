//! Development seed data.

use crate::domain::{Audit, Colour, TodoItem, TodoItemId, TodoList, TodoListId};
use crate::store::TodoDatabase;
use tidy_core::{Clock, PersistenceError};

/// Title of the seeded list.
pub const SEED_LIST_TITLE: &str = "Todo List";

const SEED_ITEMS: [&str; 4] = [
    "Make a todo list 📃",
    "Check off the first item ✅",
    "Realise you've already done two things on the list! 🤯",
    "Reward yourself with a nice, long nap 🏆",
];

/// Add the starter list when the database holds no lists.
///
/// Returns whether anything was written.
///
/// # Errors
///
/// Returns [`PersistenceError`] if the database fails.
pub async fn seed_database(
    database: &dyn TodoDatabase,
    clock: &dyn Clock,
) -> Result<bool, PersistenceError> {
    let session = database.session();
    if !session.lists().await?.is_empty() {
        tracing::debug!("Database already seeded");
        return Ok(false);
    }

    let audit = Audit::created(clock.now(), None);
    let list = TodoList::new(
        TodoListId::new(),
        SEED_LIST_TITLE.to_string(),
        Colour::White,
        audit.clone(),
    );
    let list_id = list.id;
    session.put_list(list);
    for title in SEED_ITEMS {
        session.put_item(TodoItem::new(
            TodoItemId::new(),
            list_id,
            title.to_string(),
            audit.clone(),
        ));
    }

    let written = session.save_changes().await?;
    tracing::info!(written, "Seeded development data");
    Ok(true)
}
