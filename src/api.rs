//! Default wiring for embedding hosts.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{ConfigError, PublisherConfig};
use crate::events::EventBus;
use crate::prefs::{FilePreferences, PreferenceError};
use crate::publisher::{LocationPublisher, PublisherDeps, PublisherError};
use crate::remote::{HttpLocationService, RemoteError};
use crate::retention::StoreRetentionScheduler;
use crate::source::LocationSource;
use crate::store::{LocationStore, SqliteLocationStore, StoreError};

/// Errors raised while assembling the core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The preference file could not be opened.
    #[error(transparent)]
    Preferences(#[from] PreferenceError),

    /// The location database could not be opened.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The API base URL is invalid.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The publisher could not be spawned.
    #[error(transparent)]
    Publisher(#[from] PublisherError),
}

/// Core interface for Where@ functionality.
///
/// Owns the default implementations of every collaborator except the
/// location source, which the host platform supplies:
///
/// - [`SqliteLocationStore`] at `{data_dir}/{database_file}`
/// - [`FilePreferences`] at `{data_dir}/{preferences_file}`
/// - [`HttpLocationService`] against `api_base_url`
/// - [`StoreRetentionScheduler`] over the same store
///
/// # Example
///
/// ```rust,ignore
/// use whereat_core::{PublisherConfig, WhereatCore};
///
/// let core = WhereatCore::open(Path::new("/data/whereat"), PublisherConfig::default(), source)?;
/// let mut events = core.events().subscribe();
/// core.publisher().start().await?;
/// ```
pub struct WhereatCore {
    publisher: LocationPublisher,
    events: EventBus,
    store: Arc<SqliteLocationStore>,
    prefs: Arc<FilePreferences>,
}

impl WhereatCore {
    /// Opens storage under `data_dir` and spawns the publisher.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, storage cannot be
    /// opened, or the publisher cannot be spawned.
    pub fn open(
        data_dir: &Path,
        config: PublisherConfig,
        source: Arc<dyn LocationSource>,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        std::fs::create_dir_all(data_dir).map_err(ConfigError::Io)?;

        let events = EventBus::new(config.event_capacity);
        let store = Arc::new(SqliteLocationStore::open(
            &data_dir.join(&config.database_file),
        )?);
        let prefs = Arc::new(FilePreferences::open(
            &data_dir.join(&config.preferences_file),
        )?);
        let remote = Arc::new(HttpLocationService::new(&config.api_base_url)?);
        let retention = Arc::new(StoreRetentionScheduler::new(
            store.clone(),
            events.clone(),
        ));

        let publisher = LocationPublisher::spawn(
            PublisherDeps {
                source,
                remote,
                store: store.clone(),
                retention,
                prefs: prefs.clone(),
                events: events.clone(),
            },
            config,
        )?;

        Ok(Self {
            publisher,
            events,
            store,
            prefs,
        })
    }

    /// Handle to the running publisher.
    #[must_use]
    pub const fn publisher(&self) -> &LocationPublisher {
        &self.publisher
    }

    /// Event bus for UI observers.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Local location storage, for map screens that list stored locations.
    #[must_use]
    pub fn store(&self) -> &dyn LocationStore {
        self.store.as_ref()
    }

    /// Preference store, for settings screens.
    #[must_use]
    pub fn preferences(&self) -> &FilePreferences {
        &self.prefs
    }
}
