//! Service context - dependency container for services
//!
//! Holds the store ports, the notification side channel, the credential
//! verifier and the background pool. Cheap to clone.

use std::sync::Arc;

use kizuna_common::auth::JwtService;
use kizuna_core::traits::{
    MessageRepository, NotificationDispatcher, PresenceRepository, RoomRepository, UserRepository,
};
use kizuna_core::{Snowflake, SnowflakeGenerator};

use super::dispatcher::LogDispatcher;
use super::error::{ServiceError, ServiceResult};
use super::task_pool::TaskPool;

/// Service context containing all dependencies
///
/// Passed by reference to every service. Repositories are trait objects so
/// the same services run against PostgreSQL, Redis or the in-memory store.
#[derive(Clone)]
pub struct ServiceContext {
    // Repositories
    user_repo: Arc<dyn UserRepository>,
    room_repo: Arc<dyn RoomRepository>,
    message_repo: Arc<dyn MessageRepository>,
    presence_repo: Arc<dyn PresenceRepository>,

    // Side channel
    notifier: Arc<dyn NotificationDispatcher>,
    task_pool: TaskPool,

    // Services
    jwt_service: Arc<JwtService>,
    snowflake_generator: Arc<SnowflakeGenerator>,
}

impl ServiceContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        room_repo: Arc<dyn RoomRepository>,
        message_repo: Arc<dyn MessageRepository>,
        presence_repo: Arc<dyn PresenceRepository>,
        notifier: Arc<dyn NotificationDispatcher>,
        task_pool: TaskPool,
        jwt_service: Arc<JwtService>,
        snowflake_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            user_repo,
            room_repo,
            message_repo,
            presence_repo,
            notifier,
            task_pool,
            jwt_service,
            snowflake_generator,
        }
    }

    // === Repositories ===

    pub fn user_repo(&self) -> &dyn UserRepository {
        self.user_repo.as_ref()
    }

    pub fn room_repo(&self) -> &dyn RoomRepository {
        self.room_repo.as_ref()
    }

    pub fn message_repo(&self) -> &dyn MessageRepository {
        self.message_repo.as_ref()
    }

    /// Owned handle for work moved onto the background pool
    pub fn message_repo_arc(&self) -> Arc<dyn MessageRepository> {
        Arc::clone(&self.message_repo)
    }

    pub fn presence_repo(&self) -> &dyn PresenceRepository {
        self.presence_repo.as_ref()
    }

    // === Side channel ===

    pub fn notifier(&self) -> Arc<dyn NotificationDispatcher> {
        Arc::clone(&self.notifier)
    }

    pub fn task_pool(&self) -> &TaskPool {
        &self.task_pool
    }

    // === Services ===

    pub fn jwt_service(&self) -> &JwtService {
        self.jwt_service.as_ref()
    }

    pub fn snowflake_generator(&self) -> &SnowflakeGenerator {
        self.snowflake_generator.as_ref()
    }

    /// Generate a new Snowflake ID
    pub fn generate_id(&self) -> Snowflake {
        self.snowflake_generator.generate()
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("repositories", &"...")
            .field("task_pool", &self.task_pool)
            .field("worker_id", &self.snowflake_generator.worker_id())
            .finish()
    }
}

/// Builder for creating ServiceContext
///
/// The notifier defaults to [`LogDispatcher`], the pool to
/// [`TaskPool::default`] and the generator to worker 0.
#[derive(Default)]
pub struct ServiceContextBuilder {
    user_repo: Option<Arc<dyn UserRepository>>,
    room_repo: Option<Arc<dyn RoomRepository>>,
    message_repo: Option<Arc<dyn MessageRepository>>,
    presence_repo: Option<Arc<dyn PresenceRepository>>,
    notifier: Option<Arc<dyn NotificationDispatcher>>,
    task_pool: Option<TaskPool>,
    jwt_service: Option<Arc<JwtService>>,
    snowflake_generator: Option<Arc<SnowflakeGenerator>>,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_repo(mut self, repo: Arc<dyn UserRepository>) -> Self {
        self.user_repo = Some(repo);
        self
    }

    pub fn room_repo(mut self, repo: Arc<dyn RoomRepository>) -> Self {
        self.room_repo = Some(repo);
        self
    }

    pub fn message_repo(mut self, repo: Arc<dyn MessageRepository>) -> Self {
        self.message_repo = Some(repo);
        self
    }

    pub fn presence_repo(mut self, repo: Arc<dyn PresenceRepository>) -> Self {
        self.presence_repo = Some(repo);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn NotificationDispatcher>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn task_pool(mut self, pool: TaskPool) -> Self {
        self.task_pool = Some(pool);
        self
    }

    pub fn jwt_service(mut self, service: Arc<JwtService>) -> Self {
        self.jwt_service = Some(service);
        self
    }

    pub fn snowflake_generator(mut self, generator: Arc<SnowflakeGenerator>) -> Self {
        self.snowflake_generator = Some(generator);
        self
    }

    /// Build the ServiceContext
    ///
    /// # Errors
    /// Returns `ServiceError::Internal` if a repository or the JWT service is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        let missing = |name: &str| ServiceError::internal(format!("{name} is required"));

        Ok(ServiceContext::new(
            self.user_repo.ok_or_else(|| missing("user_repo"))?,
            self.room_repo.ok_or_else(|| missing("room_repo"))?,
            self.message_repo.ok_or_else(|| missing("message_repo"))?,
            self.presence_repo.ok_or_else(|| missing("presence_repo"))?,
            self.notifier.unwrap_or_else(|| Arc::new(LogDispatcher)),
            self.task_pool.unwrap_or_default(),
            self.jwt_service.ok_or_else(|| missing("jwt_service"))?,
            self.snowflake_generator
                .unwrap_or_else(|| Arc::new(SnowflakeGenerator::default())),
        ))
    }
}
