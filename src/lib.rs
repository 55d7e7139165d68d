pub mod auth;
pub mod booking;
pub mod db;
pub mod error;
pub mod session;
pub mod settings;
mod utils;

use std::path::Path;

pub use auth::{AuthService, AuthenticatedUser};
pub use booking::{BookingService, OverlapPolicy, RideWindow};
pub use db::models::{
    AssignedRide, Booking, BookingInput, BookingOverview, BookingStatus, NewUser, Role,
    UsageReport, User,
};
pub use db::Database;
pub use error::{Result, ServiceError, ValidationError};
pub use session::{AdminSession, CustomerSession, DriverSession, RoleSession};
pub use settings::SettingsStore;

/// Everything a desktop shell needs, wired against one data directory.
pub struct App {
    db: Database,
    settings: SettingsStore,
    auth: AuthService,
    bookings: BookingService,
}

impl App {
    /// Open (or create) the data directory and bring up the store,
    /// settings, and services.
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(data_dir)?;

        let database = Database::new(data_dir.join("cabstand.sqlite3"))?;
        let settings = SettingsStore::new(data_dir.join("settings.json"))?;
        let bookings = BookingService::new(database.clone(), settings.overlap_policy());
        let auth = AuthService::new(database.clone());

        log::info!("Cabstand core ready at {}", data_dir.display());

        Ok(Self {
            db: database,
            settings,
            auth,
            bookings,
        })
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn bookings(&self) -> &BookingService {
        &self.bookings
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Verify credentials and open the matching role session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<RoleSession> {
        let identity = self.auth.verify(email, password).await?;
        Ok(RoleSession::open(
            identity,
            self.db.clone(),
            self.bookings.clone(),
        ))
    }

    /// Persist a new overlap policy. Sessions opened before the change
    /// keep the policy they were opened with.
    pub fn set_overlap_policy(&mut self, policy: OverlapPolicy) -> anyhow::Result<()> {
        self.settings.update_overlap_policy(policy)?;
        self.bookings = BookingService::new(self.db.clone(), policy);
        Ok(())
    }
}

/// Initialize logging (reads RUST_LOG env var). Safe to call more than
/// once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}
