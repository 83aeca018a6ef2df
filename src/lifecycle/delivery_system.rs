use crate::auth::{AuthError, PasswordAuthenticator, UserDirectory};
use crate::clients::DeliveryClient;
use crate::config::AppConfig;
use crate::delivery_actor::{DeliveryError, DeliveryStore};
use crate::model::{Delivery, User, UserCreate};
use crate::persistence::{self, DataFiles, PersistenceError};
use crate::settings::AppSettings;
use crate::worker::{DeliveryWorker, Sampler, WorkerSettings, WorkerStats};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Errors surfaced by [`DeliverySystem`].
#[derive(Debug, Error)]
pub enum SystemError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Actor task failed: {0}")]
    ActorTask(String),
}

/// The runtime orchestrator: owns the delivery actor, the worker, the users
/// and the session.
///
/// # Architecture
///
/// - **Delivery actor**: single owner of the [`DeliveryStore`]; the foreground
///   and the worker both reach it through a [`DeliveryClient`].
/// - **Worker**: runs only while a user is logged in and
///   [`AppSettings::delivery_enabled`] is set.
/// - **Users & passwords**: foreground only, never touched by the worker.
///
/// # Example
///
/// ```ignore
/// let mut system = DeliverySystem::load(&config);
/// system.login("alice", "secret").await?;
/// system.client().create(params).await?;
/// system.save(&DataFiles::in_dir(&config.data_dir)).await?;
/// system.shutdown().await?;
/// ```
pub struct DeliverySystem {
    client: DeliveryClient,
    worker: DeliveryWorker,
    actor: JoinHandle<DeliveryStore>,
    settings: AppSettings,
    users: UserDirectory,
    auth: PasswordAuthenticator,
    session: Option<User>,
}

impl DeliverySystem {
    /// Spawns the delivery actor around `store`. The worker stays stopped
    /// until someone logs in.
    pub fn new(
        store: DeliveryStore,
        users: UserDirectory,
        settings: AppSettings,
        config: &AppConfig,
    ) -> Self {
        let worker_settings = Arc::new(WorkerSettings::new(
            settings.delivery_intensity,
            settings.delivery_fail_rate,
        ));
        Self::build(store, users, settings, config, |client| {
            DeliveryWorker::new(Arc::new(client), worker_settings, config.idle_recheck())
        })
    }

    /// Same as [`DeliverySystem::new`] with an explicit worker sampler.
    pub fn with_sampler(
        store: DeliveryStore,
        users: UserDirectory,
        settings: AppSettings,
        config: &AppConfig,
        sampler: Box<dyn Sampler>,
    ) -> Self {
        let worker_settings = Arc::new(WorkerSettings::new(
            settings.delivery_intensity,
            settings.delivery_fail_rate,
        ));
        Self::build(store, users, settings, config, |client| {
            DeliveryWorker::with_sampler(
                Arc::new(client),
                worker_settings,
                config.idle_recheck(),
                sampler,
            )
        })
    }

    /// Loads users, deliveries and settings from `config.data_dir`.
    pub fn load(config: &AppConfig) -> Self {
        let files = DataFiles::in_dir(&config.data_dir);
        let users = persistence::load_users(&files.users);
        let store = persistence::load_deliveries(&files.deliveries);
        let settings = persistence::load_settings(&files.settings);
        Self::new(store, users, settings, config)
    }

    fn build(
        store: DeliveryStore,
        users: UserDirectory,
        settings: AppSettings,
        config: &AppConfig,
        make_worker: impl FnOnce(DeliveryClient) -> DeliveryWorker,
    ) -> Self {
        let (actor, client) = crate::delivery_actor::new(config.channel_capacity, store);
        let actor = tokio::spawn(actor.run());
        let worker = make_worker(client.clone());

        let mut auth = PasswordAuthenticator::new();
        if let Err(e) = auth.set_default_strategy(settings.password_storage_strategy) {
            warn!(error = %e, "Keeping default password strategy");
        }

        Self {
            client,
            worker,
            actor,
            settings,
            users,
            auth,
            session: None,
        }
    }

    pub fn client(&self) -> &DeliveryClient {
        &self.client
    }

    pub fn worker(&self) -> &DeliveryWorker {
        &self.worker
    }

    pub fn worker_stats(&self) -> WorkerStats {
        self.worker.stats()
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    pub fn current_user(&self) -> Option<&User> {
        self.session.as_ref()
    }

    pub fn register_user(&mut self, params: UserCreate) -> Result<User, AuthError> {
        self.users.register(params, &self.auth)
    }

    /// Opens a session and starts the worker if deliveries are enabled.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<User, SystemError> {
        let user = self
            .users
            .authenticate(username, password, &self.auth)?
            .clone();
        info!(user = %user.username, "Logged in");
        self.session = Some(user.clone());
        self.sync_worker().await?;
        Ok(user)
    }

    /// Closes the session and stops the worker.
    pub async fn logout(&mut self) -> Result<(), SystemError> {
        if let Some(user) = self.session.take() {
            info!(user = %user.username, "Logged out");
        }
        self.sync_worker().await
    }

    /// Pushes new settings into the worker and starts or stops it accordingly.
    pub async fn apply_settings(&mut self, settings: AppSettings) -> Result<(), SystemError> {
        self.worker.set_events_per_minute(settings.delivery_intensity);
        self.worker.set_fail_probability(settings.delivery_fail_rate);
        if let Err(e) = self.auth.set_default_strategy(settings.password_storage_strategy) {
            warn!(error = %e, "Keeping previous password strategy");
        }
        self.settings = settings;
        self.sync_worker().await
    }

    async fn sync_worker(&mut self) -> Result<(), SystemError> {
        if self.session.is_some() && self.settings.delivery_enabled {
            self.worker.start().await?;
        } else {
            self.worker.stop().await?;
        }
        Ok(())
    }

    /// Every delivery, in insertion order.
    pub async fn snapshot(&self) -> Result<Vec<Delivery>, DeliveryError> {
        self.client.list().await
    }

    /// Writes deliveries, users and settings.
    pub async fn save(&self, files: &DataFiles) -> Result<(), SystemError> {
        let deliveries = self.snapshot().await?;
        persistence::save_users(&files.users, &self.users)?;
        persistence::save_deliveries(&files.deliveries, &deliveries)?;
        persistence::save_settings(&files.settings, &self.settings)?;
        Ok(())
    }

    /// Stops the worker, closes the actor's channel and waits for it to exit.
    ///
    /// Returns the final collection.
    pub async fn shutdown(mut self) -> Result<DeliveryStore, SystemError> {
        info!("Shutting down system...");
        if let Err(e) = self.worker.stop().await {
            warn!(error = %e, "Worker stop failed");
        }

        // The worker holds a client too; both must go before the actor can exit.
        drop(self.worker);
        drop(self.client);

        match self.actor.await {
            Ok(store) => {
                info!(size = store.len(), "System shutdown complete.");
                Ok(store)
            }
            Err(e) => {
                error!("Actor task failed: {:?}", e);
                Err(SystemError::ActorTask(e.to_string()))
            }
        }
    }
}
