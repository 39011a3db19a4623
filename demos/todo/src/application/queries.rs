//! Read-only operations and their view models.

use super::{TodoError, TodoService, check};
use crate::domain::{Colour, PriorityLevel, TodoItem, TodoItemId, TodoListId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Value/name pair for UI pick lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupDto {
    /// Numeric value
    pub id: u8,
    /// Display name
    pub title: String,
}

/// An item inside [`TodoListDto`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItemDto {
    /// Item id
    pub id: TodoItemId,
    /// Owning list
    pub list_id: TodoListId,
    /// Title
    pub title: String,
    /// Done flag
    pub done: bool,
    /// Priority
    pub priority: PriorityLevel,
    /// Note
    pub note: Option<String>,
    /// Reminder
    pub reminder: Option<DateTime<Utc>>,
}

impl From<TodoItem> for TodoItemDto {
    fn from(item: TodoItem) -> Self {
        Self {
            id: item.id,
            list_id: item.list_id,
            title: item.title,
            done: item.done,
            priority: item.priority,
            note: item.note,
            reminder: item.reminder,
        }
    }
}

/// A list with its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoListDto {
    /// List id
    pub id: TodoListId,
    /// Title
    pub title: String,
    /// Colour code
    pub colour: Colour,
    /// Items, ordered by title
    pub items: Vec<TodoItemDto>,
}

/// Everything the todo page needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodosVm {
    /// Available priority levels
    pub priority_levels: Vec<LookupDto>,
    /// Available colours
    pub colours: Vec<String>,
    /// Lists, ordered by title
    pub lists: Vec<TodoListDto>,
}

/// Item summary for paginated listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItemBriefDto {
    /// Item id
    pub id: TodoItemId,
    /// Owning list
    pub list_id: TodoListId,
    /// Title
    pub title: String,
    /// Done flag
    pub done: bool,
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedList<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// 1-based page number
    pub page_number: usize,
    /// Number of pages
    pub total_pages: usize,
    /// Number of items across all pages
    pub total_count: usize,
    /// Whether a previous page exists
    pub has_previous_page: bool,
    /// Whether a next page exists
    pub has_next_page: bool,
}

impl<T> PaginatedList<T> {
    /// Cut page `page_number` (1-based) of `page_size` out of `all`.
    #[must_use]
    pub fn paginate(all: Vec<T>, page_number: usize, page_size: usize) -> Self {
        let total_count = all.len();
        let page_size = page_size.max(1);
        let total_pages = total_count.div_ceil(page_size);
        let skip = page_number.saturating_sub(1).saturating_mul(page_size);
        let items = all.into_iter().skip(skip).take(page_size).collect();
        Self {
            items,
            page_number,
            total_pages,
            total_count,
            has_previous_page: page_number > 1,
            has_next_page: page_number < total_pages,
        }
    }
}

/// Paginated items of one list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTodoItems {
    /// List to read
    pub list_id: TodoListId,
    /// 1-based page number
    #[serde(default = "default_page_number")]
    pub page_number: usize,
    /// Page size
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

const fn default_page_number() -> usize {
    1
}

const fn default_page_size() -> usize {
    10
}

impl TodoService {
    /// All lists with their items, plus the priority and colour catalogues.
    ///
    /// # Errors
    ///
    /// [`TodoError::Persistence`] if the database fails.
    pub async fn get_todos(&self) -> Result<TodosVm, TodoError> {
        let session = self.database.session();
        let mut lists = session.lists().await?;
        lists.sort_by_key(|list| list.title.to_lowercase());

        let mut dtos = Vec::with_capacity(lists.len());
        for list in lists {
            let mut items = session.items_in(list.id).await?;
            items.sort_by_key(|item| item.title.to_lowercase());
            dtos.push(TodoListDto {
                id: list.id,
                title: list.title,
                colour: list.colour,
                items: items.into_iter().map(TodoItemDto::from).collect(),
            });
        }

        Ok(TodosVm {
            priority_levels: PriorityLevel::ALL
                .into_iter()
                .map(|level| LookupDto {
                    id: level.into(),
                    title: level.name().to_string(),
                })
                .collect(),
            colours: Colour::PALETTE.into_iter().map(String::from).collect(),
            lists: dtos,
        })
    }

    /// One page of a list's items, ordered by title.
    ///
    /// # Errors
    ///
    /// [`TodoError::Validation`] for a page number or size below 1,
    /// [`TodoError::Persistence`] if the database fails.
    pub async fn get_todo_items(
        &self,
        query: GetTodoItems,
    ) -> Result<PaginatedList<TodoItemBriefDto>, TodoError> {
        let mut errors = Vec::new();
        if query.page_number < 1 {
            errors.push("PageNumber at least greater than or equal to 1.".to_string());
        }
        if query.page_size < 1 {
            errors.push("PageSize at least greater than or equal to 1.".to_string());
        }
        check(errors)?;

        let mut items = self.database.session().items_in(query.list_id).await?;
        items.sort_by_key(|item| item.title.to_lowercase());
        let briefs = items
            .into_iter()
            .map(|item| TodoItemBriefDto {
                id: item.id,
                list_id: item.list_id,
                title: item.title,
                done: item.done,
            })
            .collect();

        Ok(PaginatedList::paginate(briefs, query.page_number, query.page_size))
    }
}
