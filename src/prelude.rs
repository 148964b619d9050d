//! Convenient imports for common functionality.
//!
//! ```rust
//! use sql_conduit::prelude::*;
//! ```

pub use crate::args::{Args, FieldMap};
pub use crate::backend::{Backend, Connector};
pub use crate::config::{ConnectionConfig, EngineOptions};
pub use crate::cursor::ResultCursor;
pub use crate::engine::Engine;
pub use crate::error::SqlConduitError;
pub use crate::format::format_statement;
pub use crate::mapping::RowMapping;
pub use crate::results::{CustomDbRow, ResultSet};
pub use crate::router::ConnectionRouter;
pub use crate::types::{ConnectionRole, DatabaseType, RowValues, TimePeriod};
pub use crate::validation::PlaceholderKind;
