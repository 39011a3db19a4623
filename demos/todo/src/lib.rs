//! Todo lists served through the Tidy request pipeline.
//!
//! The application layer ([`application::TodoService`]) validates commands,
//! commits them through a [`store::TodoSession`] and publishes domain events
//! to the notification dispatcher. The HTTP layer ([`api`]) maps endpoints
//! onto the service and sits behind the full [`tidy_web::Pipeline`].
//!
//! # Quick Start
//!
//! ```no_run
//! use todo_app::{ApplicationBuilder, Config};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! ApplicationBuilder::new(Config::from_env())
//!     .build()
//!     .await?
//!     .run()
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod application;
pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod identity;
pub mod seed;
pub mod store;

// Re-export commonly used types
pub use application::{RequestContext, TodoError, TodoService};
pub use bootstrap::{ApplicationBuilder, BootstrapError, TodoApplication};
pub use config::Config;
pub use domain::{TodoItem, TodoItemId, TodoList, TodoListId};
pub use store::{InMemoryTodoDatabase, TodoDatabase, TodoSession};
