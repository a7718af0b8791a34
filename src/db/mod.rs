mod from_row;
mod schema;
pub mod queries;

pub use schema::init_db;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::flutterwave::FlutterwaveClient;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub flutterwave: FlutterwaveClient,
    /// Shared secret expected in the `verif-hash` webhook header.
    pub webhook_hash: String,
    /// True when running against the provider's sandbox; controls whether
    /// customer emails are unmangled before lookup.
    pub test_mode: bool,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}
