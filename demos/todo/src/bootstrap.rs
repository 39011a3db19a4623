//! Application assembly.
//!
//! [`ApplicationBuilder`] wires the collaborators together in a fixed order:
//!
//! 1. notification dispatcher (logging handlers plus any extra registrations)
//! 2. application service over the database
//! 3. development seed data
//! 4. identity resolver from `AUTH_TOKENS`
//! 5. request pipeline and router
//! 6. optional Prometheus recorder
//!
//! [`TodoApplication::run`] then binds the listener, starts the rate-limit
//! window eviction task and serves until Ctrl+C or SIGTERM.
//!
//! # Example
//!
//! ```rust,ignore
//! ApplicationBuilder::new(Config::from_env())
//!     .build()
//!     .await?
//!     .run()
//!     .await?;
//! ```

use crate::api::{AppState, authorization_policy, build_router};
use crate::application::{TodoService, register_handlers};
use crate::config::Config;
use crate::identity::{TokenConfigError, TokenIdentityResolver};
use crate::seed::seed_database;
use crate::store::{InMemoryTodoDatabase, TodoDatabase};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tidy_core::{Clock, PersistenceError, SystemClock};
use tidy_runtime::metrics::{MetricsError, MetricsRecorder};
use tidy_runtime::{DispatcherBuilder, FixedWindowRateLimiter, NotificationDispatcher};
use tidy_web::Pipeline;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Errors raised while starting the application.
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// `AUTH_TOKENS` could not be parsed.
    #[error("Invalid token configuration: {0}")]
    Tokens(#[from] TokenConfigError),

    /// The metrics recorder could not be installed.
    #[error(transparent)]
    Metrics(#[from] MetricsError),

    /// Seeding the development database failed.
    #[error("Failed to seed database: {0}")]
    Seed(#[from] PersistenceError),

    /// Binding or serving failed.
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Builder for [`TodoApplication`].
pub struct ApplicationBuilder {
    config: Config,
    database: Arc<dyn TodoDatabase>,
    dispatcher: DispatcherBuilder,
    clock: Arc<dyn Clock>,
}

impl ApplicationBuilder {
    /// Start from `config` with an empty in-memory database, the logging
    /// handlers and the system clock.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            database: Arc::new(InMemoryTodoDatabase::new()),
            dispatcher: register_handlers(NotificationDispatcher::builder()),
            clock: Arc::new(SystemClock),
        }
    }

    /// Use `database` instead of a fresh in-memory one.
    #[must_use]
    pub fn database(mut self, database: Arc<dyn TodoDatabase>) -> Self {
        self.database = database;
        self
    }

    /// Register additional notification handlers after the built-in ones.
    #[must_use]
    pub fn handlers(mut self, register: impl FnOnce(DispatcherBuilder) -> DispatcherBuilder) -> Self {
        self.dispatcher = register(self.dispatcher);
        self
    }

    /// Clock for audit stamps and rate-limit windows.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Assemble the application.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError`] if the token configuration is malformed,
    /// seeding fails or the metrics recorder cannot be installed.
    pub async fn build(self) -> Result<TodoApplication, BootstrapError> {
        let Self {
            config,
            database,
            dispatcher,
            clock,
        } = self;

        let dispatcher = Arc::new(dispatcher.build());
        let todos = Arc::new(TodoService::new(
            Arc::clone(&database),
            dispatcher,
            Arc::clone(&clock),
        ));

        let pipeline_config = config.pipeline_config();
        if pipeline_config.mode.is_development()
            && seed_database(database.as_ref(), clock.as_ref()).await?
        {
            info!("Development database seeded");
        }

        let identity = TokenIdentityResolver::parse(&config.auth.tokens)?;
        if identity.is_empty() {
            warn!("No bearer tokens configured; every API request will be rejected with 401");
        }

        let pipeline = Pipeline::builder(pipeline_config)
            .identity(Arc::new(identity))
            .authorization(authorization_policy())
            .clock(clock)
            .build();

        let metrics = if config.metrics_enabled {
            let mut recorder = MetricsRecorder::new();
            recorder.install()?;
            Some(Arc::new(recorder))
        } else {
            None
        };

        Ok(TodoApplication {
            config,
            pipeline,
            state: AppState { todos, metrics },
        })
    }
}

/// The assembled application.
pub struct TodoApplication {
    config: Config,
    pipeline: Pipeline,
    state: AppState,
}

impl TodoApplication {
    /// Application service behind the endpoints.
    #[must_use]
    pub fn service(&self) -> &Arc<TodoService> {
        &self.state.todos
    }

    /// The request pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Every endpoint behind the full pipeline.
    #[must_use]
    pub fn router(&self) -> Router {
        self.pipeline.wrap(build_router(self.state.clone()))
    }

    /// Bind the configured address and serve until shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Io`] if the listener cannot be bound or the
    /// server fails.
    pub async fn run(self) -> Result<(), BootstrapError> {
        let eviction = self.pipeline.rate_limiter().map(|limiter| {
            spawn_window_eviction(Arc::clone(limiter), limiter.policy().window)
        });

        let addr = self.config.bind_address();
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(address = %addr, mode = ?self.config.mode(), "Server listening");

        let app = self.router();
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        if let Some(task) = eviction {
            task.abort();
        }
        info!("Server stopped");
        Ok(())
    }
}

/// Periodically drop rate-limit windows that have elapsed.
///
/// Time comes from the limiter's own clock. Runs until the returned task is
/// aborted.
pub fn spawn_window_eviction(
    limiter: Arc<FixedWindowRateLimiter>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(period.max(Duration::from_secs(1)));
        loop {
            ticks.tick().await;
            let evicted = limiter.evict_expired_now();
            if evicted > 0 {
                tracing::debug!(
                    evicted,
                    remaining = limiter.partition_count(),
                    "Evicted expired rate-limit windows"
                );
            }
        }
    })
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C signal, shutting down gracefully..."),
        () = terminate => info!("Received SIGTERM signal, shutting down gracefully..."),
    }
}
