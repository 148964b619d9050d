// SQLite backend, built on rusqlite.
//
// - config: connector and session setup
// - params: bound values to rusqlite values
// - query: result extraction
// - executor: the `Backend` implementation

pub mod config;
pub mod executor;
pub mod params;
pub mod query;

pub use config::SqliteConnector;
pub use executor::SqliteBackend;
pub use query::build_result_set;
