//! Domain types for the todo application.
//!
//! Todo lists own todo items. Marking an item done is the one transition
//! other parts of the system react to: it raises
//! [`TodoItemCompletedEvent`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tidy_core::DomainEvent;
use uuid::Uuid;

/// Longest title accepted for lists and items.
pub const MAX_TITLE_LENGTH: usize = 200;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random id
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an id from a UUID
            #[must_use]
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Returns the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Unique identifier for a todo list
    TodoListId
);

id_type!(
    /// Unique identifier for a todo item
    TodoItemId
);

/// Item priority.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum PriorityLevel {
    /// No priority
    #[default]
    None = 0,
    /// Low
    Low = 1,
    /// Medium
    Medium = 2,
    /// High
    High = 3,
}

impl PriorityLevel {
    /// Every level, in ascending order.
    pub const ALL: [Self; 4] = [Self::None, Self::Low, Self::Medium, Self::High];

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl From<PriorityLevel> for u8 {
    fn from(level: PriorityLevel) -> Self {
        level as Self
    }
}

impl TryFrom<u8> for PriorityLevel {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|level| u8::from(*level) == value)
            .ok_or(DomainError::UnknownPriority(value))
    }
}

/// List colour, restricted to a fixed palette.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Colour {
    /// `#FFFFFF`
    #[default]
    White,
    /// `#FF5733`
    Red,
    /// `#FFC300`
    Orange,
    /// `#FFFF66`
    Yellow,
    /// `#CCFF99`
    Green,
    /// `#6666FF`
    Blue,
    /// `#9966CC`
    Purple,
    /// `#999999`
    Grey,
}

impl Colour {
    /// The supported palette.
    pub const PALETTE: [Self; 8] = [
        Self::White,
        Self::Red,
        Self::Orange,
        Self::Yellow,
        Self::Green,
        Self::Blue,
        Self::Purple,
        Self::Grey,
    ];

    /// Hex code, e.g. `#FF5733`.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::White => "#FFFFFF",
            Self::Red => "#FF5733",
            Self::Orange => "#FFC300",
            Self::Yellow => "#FFFF66",
            Self::Green => "#CCFF99",
            Self::Blue => "#6666FF",
            Self::Purple => "#9966CC",
            Self::Grey => "#999999",
        }
    }

    /// Look up a palette colour by hex code (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::UnsupportedColour`] for codes outside the
    /// palette.
    pub fn from_code(code: &str) -> Result<Self, DomainError> {
        Self::PALETTE
            .into_iter()
            .find(|colour| colour.code().eq_ignore_ascii_case(code.trim()))
            .ok_or_else(|| DomainError::UnsupportedColour(code.to_string()))
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl From<Colour> for String {
    fn from(colour: Colour) -> Self {
        colour.code().to_string()
    }
}

impl TryFrom<String> for Colour {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_code(&value)
    }
}

/// Invalid domain values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Colour code outside the palette.
    #[error("Colour \"{0}\" is unsupported")]
    UnsupportedColour(String),

    /// Priority value outside 0..=3.
    #[error("Priority level {0} is unsupported")]
    UnknownPriority(u8),
}

/// Who changed an entity, and when.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Principal that created the entity
    pub created_by: Option<String>,
    /// Last modification time
    pub last_modified: DateTime<Utc>,
    /// Principal that last modified the entity
    pub last_modified_by: Option<String>,
}

impl Audit {
    /// Audit record for a new entity.
    #[must_use]
    pub fn created(at: DateTime<Utc>, by: Option<&str>) -> Self {
        Self {
            created_at: at,
            created_by: by.map(str::to_string),
            last_modified: at,
            last_modified_by: by.map(str::to_string),
        }
    }

    /// Record a modification.
    pub fn touch(&mut self, at: DateTime<Utc>, by: Option<&str>) {
        self.last_modified = at;
        self.last_modified_by = by.map(str::to_string);
    }
}

/// A named, coloured list of todo items.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TodoList {
    /// Unique identifier
    pub id: TodoListId,
    /// Title, unique across lists
    pub title: String,
    /// Display colour
    pub colour: Colour,
    /// Change tracking
    pub audit: Audit,
}

impl TodoList {
    /// Creates a new list
    #[must_use]
    pub const fn new(id: TodoListId, title: String, colour: Colour, audit: Audit) -> Self {
        Self {
            id,
            title,
            colour,
            audit,
        }
    }
}

/// A single todo item
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TodoItem {
    /// Unique identifier
    pub id: TodoItemId,
    /// Owning list
    pub list_id: TodoListId,
    /// Title of the todo
    pub title: String,
    /// Free-form note
    pub note: Option<String>,
    /// Priority
    pub priority: PriorityLevel,
    /// Optional reminder time
    pub reminder: Option<DateTime<Utc>>,
    /// Whether the todo is done
    pub done: bool,
    /// Change tracking
    pub audit: Audit,
}

impl TodoItem {
    /// Creates a new, open todo item
    #[must_use]
    pub const fn new(id: TodoItemId, list_id: TodoListId, title: String, audit: Audit) -> Self {
        Self {
            id,
            list_id,
            title,
            note: None,
            priority: PriorityLevel::None,
            reminder: None,
            done: false,
            audit,
        }
    }

    /// Set the done flag.
    ///
    /// Returns the completion event when the item goes from open to done;
    /// re-marking a done item raises nothing.
    pub fn set_done(&mut self, done: bool) -> Option<TodoItemCompletedEvent> {
        let completed = done && !self.done;
        self.done = done;
        completed.then(|| TodoItemCompletedEvent {
            item_id: self.id,
            list_id: self.list_id,
        })
    }
}

/// Raised after a todo item was created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TodoItemCreatedEvent {
    /// The new item
    pub item_id: TodoItemId,
    /// Its list
    pub list_id: TodoListId,
}

impl DomainEvent for TodoItemCreatedEvent {
    fn event_name(&self) -> &'static str {
        "TodoItemCreatedEvent"
    }
}

/// Raised after a todo item was marked done.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TodoItemCompletedEvent {
    /// The completed item
    pub item_id: TodoItemId,
    /// Its list
    pub list_id: TodoListId,
}

impl DomainEvent for TodoItemCompletedEvent {
    fn event_name(&self) -> &'static str {
        "TodoItemCompletedEvent"
    }
}

/// Raised after a todo item was deleted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TodoItemDeletedEvent {
    /// The deleted item
    pub item_id: TodoItemId,
    /// The list it belonged to
    pub list_id: TodoListId,
}

impl DomainEvent for TodoItemDeletedEvent {
    fn event_name(&self) -> &'static str {
        "TodoItemDeletedEvent"
    }
}
