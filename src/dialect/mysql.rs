use super::{ConvertedSql, Dialect};
use crate::types::DatabaseType;

/// The canonical dialect itself; conversion is the identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::MySql
    }

    fn convert(&self, sql: &str) -> ConvertedSql {
        ConvertedSql::unchanged(sql)
    }
}
