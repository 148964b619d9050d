// PostgreSQL backend, built on tokio-postgres.
//
// - runtime: the private current-thread runtime and the sync bridge onto it
// - config: connector and session setup
// - params: bound values converted to declared parameter types
// - query: result extraction
// - executor: the `Backend` implementation

pub mod config;
pub mod executor;
pub mod params;
pub mod query;
mod runtime;

pub use config::PostgresConnector;
pub use executor::PostgresBackend;
pub use params::{PgNumeric, PgParam};
pub use query::build_result_set;
