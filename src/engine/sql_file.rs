use std::fs;
use std::path::Path;

use tracing::info;

use super::Engine;
use crate::error::SqlConduitError;
use crate::format::split_sql_statements;

impl Engine {
    /// Run every `;`-separated statement of a SQL script file, in order.
    ///
    /// Each statement goes through [`Engine::query`] without arguments, so it is routed and
    /// converted like any other call. Execution stops at the first failure.
    ///
    /// # Errors
    /// `SqlFileError` when the file cannot be read, otherwise the first statement's error.
    pub fn execute_sql_file(&mut self, path: impl AsRef<Path>) -> Result<usize, SqlConduitError> {
        let path = path.as_ref();
        let script = fs::read_to_string(path).map_err(|err| SqlConduitError::SqlFileError {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        let count = self.execute_statements(split_sql_statements(&script))?;
        info!(path = %path.display(), statements = count, "executed SQL file");
        Ok(count)
    }

    /// Run each statement in order; returns how many ran.
    ///
    /// # Errors
    /// The first statement's error; earlier statements are not undone.
    pub fn execute_statements<I, S>(&mut self, statements: I) -> Result<usize, SqlConduitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut count = 0;
        for statement in statements {
            let statement = statement.as_ref().trim();
            if statement.is_empty() {
                continue;
            }
            self.query(statement, ())?;
            count += 1;
        }
        Ok(count)
    }
}
