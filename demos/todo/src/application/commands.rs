//! State-changing operations.

use super::{RequestContext, TodoError, TodoService, check, validate_title};
use crate::domain::{
    Audit, Colour, PriorityLevel, TodoItem, TodoItemCreatedEvent, TodoItemDeletedEvent,
    TodoItemId, TodoList, TodoListId,
};
use crate::store::TodoSession;
use serde::Deserialize;

/// Create a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoList {
    /// Title, unique across lists
    pub title: String,
    /// Palette colour; white when omitted
    #[serde(default)]
    pub colour: Option<Colour>,
}

/// Rename a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoList {
    /// List to rename
    pub id: TodoListId,
    /// New title
    pub title: String,
}

/// Create an item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoItem {
    /// Owning list
    pub list_id: TodoListId,
    /// Title
    pub title: String,
}

/// Change an item's title and done flag.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoItem {
    /// Item to change
    pub id: TodoItemId,
    /// New title
    pub title: String,
    /// New done flag
    pub done: bool,
}

/// Move an item or change its priority and note.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoItemDetail {
    /// Item to change
    pub id: TodoItemId,
    /// List the item should belong to
    pub list_id: TodoListId,
    /// New priority
    pub priority: PriorityLevel,
    /// New note
    #[serde(default)]
    pub note: Option<String>,
}

impl TodoService {
    /// Create a list and return its id.
    ///
    /// # Errors
    ///
    /// [`TodoError::Validation`] for an empty, overlong or duplicate title;
    /// [`TodoError::Persistence`] if the commit fails.
    pub async fn create_todo_list(
        &self,
        command: CreateTodoList,
        context: &RequestContext,
    ) -> Result<TodoListId, TodoError> {
        let session = self.database.session();

        let mut errors = Vec::new();
        validate_title(&command.title, &mut errors);
        if errors.is_empty() && !self.title_is_unique(&*session, &command.title, None).await? {
            errors.push("The specified title already exists.".to_string());
        }
        check(errors)?;

        let list = TodoList::new(
            TodoListId::new(),
            command.title,
            command.colour.unwrap_or_default(),
            Audit::created(self.clock.now(), context.user_name()),
        );
        let id = list.id;
        session.put_list(list);

        context.ensure_live()?;
        session.save_changes().await?;
        tracing::info!(list_id = %id, "Todo list created");
        Ok(id)
    }

    /// Rename a list.
    ///
    /// # Errors
    ///
    /// [`TodoError::NotFound`] for an unknown list, [`TodoError::Validation`]
    /// for a bad or duplicate title, [`TodoError::Persistence`] if the
    /// commit fails.
    pub async fn update_todo_list(
        &self,
        command: UpdateTodoList,
        context: &RequestContext,
    ) -> Result<(), TodoError> {
        let session = self.database.session();

        let mut errors = Vec::new();
        validate_title(&command.title, &mut errors);
        if errors.is_empty()
            && !self
                .title_is_unique(&*session, &command.title, Some(command.id))
                .await?
        {
            errors.push("The specified title already exists.".to_string());
        }
        check(errors)?;

        let mut list = session
            .find_list(command.id)
            .await?
            .ok_or_else(|| TodoError::not_found("TodoList", command.id))?;
        list.title = command.title;
        list.audit.touch(self.clock.now(), context.user_name());
        session.put_list(list);

        context.ensure_live()?;
        session.save_changes().await?;
        Ok(())
    }

    /// Delete a list and its items.
    ///
    /// # Errors
    ///
    /// [`TodoError::NotFound`] for an unknown list, [`TodoError::Persistence`]
    /// if the commit fails.
    pub async fn delete_todo_list(
        &self,
        id: TodoListId,
        context: &RequestContext,
    ) -> Result<(), TodoError> {
        let session = self.database.session();
        if session.find_list(id).await?.is_none() {
            return Err(TodoError::not_found("TodoList", id));
        }
        session.remove_list(id);

        context.ensure_live()?;
        session.save_changes().await?;
        tracing::info!(list_id = %id, "Todo list deleted");
        Ok(())
    }

    /// Delete every list and item. Returns the number of lists removed.
    ///
    /// Access is restricted to administrators by the authorization policy.
    ///
    /// # Errors
    ///
    /// [`TodoError::Persistence`] if the commit fails.
    pub async fn purge_todo_lists(&self, context: &RequestContext) -> Result<usize, TodoError> {
        let session = self.database.session();
        let lists = session.lists().await?;
        for list in &lists {
            session.remove_list(list.id);
        }

        context.ensure_live()?;
        session.save_changes().await?;
        tracing::warn!(
            lists = lists.len(),
            by = context.user_name().unwrap_or("anonymous"),
            "Todo lists purged"
        );
        Ok(lists.len())
    }

    /// Create an item and publish [`TodoItemCreatedEvent`].
    ///
    /// # Errors
    ///
    /// [`TodoError::Validation`] for a bad title, [`TodoError::NotFound`] for
    /// an unknown list, [`TodoError::Persistence`] if the commit fails,
    /// [`TodoError::Dispatch`] if a handler fails afterwards.
    pub async fn create_todo_item(
        &self,
        command: CreateTodoItem,
        context: &RequestContext,
    ) -> Result<TodoItemId, TodoError> {
        let mut errors = Vec::new();
        validate_title(&command.title, &mut errors);
        check(errors)?;

        let session = self.database.session();
        if session.find_list(command.list_id).await?.is_none() {
            return Err(TodoError::not_found("TodoList", command.list_id));
        }

        let item = TodoItem::new(
            TodoItemId::new(),
            command.list_id,
            command.title,
            Audit::created(self.clock.now(), context.user_name()),
        );
        let event = TodoItemCreatedEvent {
            item_id: item.id,
            list_id: item.list_id,
        };
        session.put_item(item);

        context.ensure_live()?;
        session.save_changes().await?;
        self.publish(&event, context).await?;
        Ok(event.item_id)
    }

    /// Change an item's title and done flag.
    ///
    /// Publishes [`TodoItemCompletedEvent`](crate::domain::TodoItemCompletedEvent)
    /// when the item goes from open to done.
    ///
    /// # Errors
    ///
    /// [`TodoError::Validation`] for a bad title, [`TodoError::NotFound`] for
    /// an unknown item, [`TodoError::Persistence`] if the commit fails,
    /// [`TodoError::Dispatch`] if a handler fails afterwards (the change stays
    /// committed).
    pub async fn update_todo_item(
        &self,
        command: UpdateTodoItem,
        context: &RequestContext,
    ) -> Result<(), TodoError> {
        let mut errors = Vec::new();
        validate_title(&command.title, &mut errors);
        check(errors)?;

        let session = self.database.session();
        let mut item = session
            .find_item(command.id)
            .await?
            .ok_or_else(|| TodoError::not_found("TodoItem", command.id))?;

        item.title = command.title;
        let completed = item.set_done(command.done);
        item.audit.touch(self.clock.now(), context.user_name());
        session.put_item(item);

        context.ensure_live()?;
        session.save_changes().await?;

        if let Some(event) = completed {
            self.publish(&event, context).await?;
        }
        Ok(())
    }

    /// Move an item to another list and set its priority and note.
    ///
    /// # Errors
    ///
    /// [`TodoError::NotFound`] for an unknown item or list,
    /// [`TodoError::Persistence`] if the commit fails.
    pub async fn update_todo_item_detail(
        &self,
        command: UpdateTodoItemDetail,
        context: &RequestContext,
    ) -> Result<(), TodoError> {
        let session = self.database.session();
        let mut item = session
            .find_item(command.id)
            .await?
            .ok_or_else(|| TodoError::not_found("TodoItem", command.id))?;
        if item.list_id != command.list_id && session.find_list(command.list_id).await?.is_none()
        {
            return Err(TodoError::not_found("TodoList", command.list_id));
        }

        item.list_id = command.list_id;
        item.priority = command.priority;
        item.note = command.note.filter(|note| !note.trim().is_empty());
        item.audit.touch(self.clock.now(), context.user_name());
        session.put_item(item);

        context.ensure_live()?;
        session.save_changes().await?;
        Ok(())
    }

    /// Delete an item and publish [`TodoItemDeletedEvent`].
    ///
    /// # Errors
    ///
    /// [`TodoError::NotFound`] for an unknown item, [`TodoError::Persistence`]
    /// if the commit fails, [`TodoError::Dispatch`] if a handler fails
    /// afterwards.
    pub async fn delete_todo_item(
        &self,
        id: TodoItemId,
        context: &RequestContext,
    ) -> Result<(), TodoError> {
        let session = self.database.session();
        let item = session
            .find_item(id)
            .await?
            .ok_or_else(|| TodoError::not_found("TodoItem", id))?;
        session.remove_item(id);

        context.ensure_live()?;
        session.save_changes().await?;
        self.publish(
            &TodoItemDeletedEvent {
                item_id: item.id,
                list_id: item.list_id,
            },
            context,
        )
        .await
    }

    async fn title_is_unique(
        &self,
        session: &dyn TodoSession,
        title: &str,
        except: Option<TodoListId>,
    ) -> Result<bool, TodoError> {
        let title = title.trim();
        let lists = session.lists().await?;
        Ok(!lists.iter().any(|list| {
            Some(list.id) != except && list.title.trim().eq_ignore_ascii_case(title)
        }))
    }
}
