//! The execution surface of a database command
//!
//! Defines the [`Executable`] trait a driver's command implements. Property
//! members configure the command; execution members talk to the database
//! and can fail with the driver's error type.

use async_trait::async_trait;
use dbretry_core::classify::DescribeError;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How the command text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CommandType {
    /// A SQL statement.
    #[default]
    Text,
    /// The name of a stored procedure.
    StoredProcedure,
    /// The name of a table whose rows are returned.
    TableDirect,
}

/// How command results are applied to the row being updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UpdateRowSource {
    /// Results are ignored.
    None,
    /// Output parameters are mapped to the row.
    OutputParameters,
    /// The first returned record is mapped to the row.
    FirstReturnedRecord,
    /// Both output parameters and the first returned record are mapped.
    #[default]
    Both,
}

/// Hints describing what a reader should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CommandBehavior {
    /// No hint.
    #[default]
    Default,
    /// Only the first result set is needed.
    SingleResult,
    /// Only column information is needed.
    SchemaOnly,
    /// Column and primary key information is needed.
    KeyInfo,
    /// Only the first row is needed.
    SingleRow,
    /// Columns are read in order, allowing large values to be streamed.
    SequentialAccess,
    /// Closing the reader closes the connection.
    CloseConnection,
}

/// A database command.
///
/// Execution members take `&self`: a command may be cancelled from another
/// thread while it executes, so implementations keep any per-execution
/// state behind interior mutability.
///
/// # Example
///
/// ```ignore
/// use dbretry_command::Executable;
///
/// command.set_command_text("SELECT COUNT(*) FROM orders");
/// let count = command.execute_scalar()?;
/// ```
#[async_trait]
pub trait Executable: Send + Sync {
    /// Driver error type.
    type Error: DescribeError + std::error::Error + Send + Sync + 'static;

    /// Scalar value type.
    type Value: Send;

    /// Result reader type.
    type Reader: Send;

    /// A single command parameter.
    type Parameter;

    /// The parameter collection.
    type Parameters;

    /// Connection the command runs on.
    type Connection;

    /// Transaction the command runs within.
    type Transaction;

    /// The SQL text or object name.
    fn command_text(&self) -> &str;

    /// Set the SQL text or object name.
    fn set_command_text(&mut self, text: String);

    /// Wait before the driver aborts an execution.
    fn command_timeout(&self) -> Duration;

    /// Set the execution timeout.
    fn set_command_timeout(&mut self, timeout: Duration);

    /// How the command text is interpreted.
    fn command_type(&self) -> CommandType;

    /// Set how the command text is interpreted.
    fn set_command_type(&mut self, command_type: CommandType);

    /// How results are applied to an updated row.
    fn updated_row_source(&self) -> UpdateRowSource;

    /// Set how results are applied to an updated row.
    fn set_updated_row_source(&mut self, source: UpdateRowSource);

    /// The connection, if one is attached.
    fn connection(&self) -> Option<&Self::Connection>;

    /// Attach or detach the connection.
    fn set_connection(&mut self, connection: Option<Self::Connection>);

    /// The parameter collection.
    fn parameters(&self) -> &Self::Parameters;

    /// Mutable access to the parameter collection.
    fn parameters_mut(&mut self) -> &mut Self::Parameters;

    /// The transaction, if one is attached.
    fn transaction(&self) -> Option<&Self::Transaction>;

    /// Attach or detach the transaction.
    fn set_transaction(&mut self, transaction: Option<Self::Transaction>);

    /// Whether designer tooling shows the command.
    fn design_time_visible(&self) -> bool;

    /// Set whether designer tooling shows the command.
    fn set_design_time_visible(&mut self, visible: bool);

    /// Create a parameter bound to this command's driver.
    fn create_parameter(&mut self) -> Self::Parameter;

    /// Prepare the command on the server.
    fn prepare(&self) -> Result<(), Self::Error>;

    /// Ask the driver to cancel an in-flight execution.
    fn cancel(&self) -> Result<(), Self::Error>;

    /// Execute and return the number of affected rows.
    fn execute_non_query(&self) -> Result<i64, Self::Error>;

    /// Execute and return the first column of the first row.
    ///
    /// `Ok(None)` when the result set is empty.
    fn execute_scalar(&self) -> Result<Option<Self::Value>, Self::Error>;

    /// Execute and return a reader over the results.
    fn execute_reader(&self, behavior: CommandBehavior) -> Result<Self::Reader, Self::Error>;

    /// Async [`execute_non_query`](Self::execute_non_query).
    async fn execute_non_query_async(&self, token: CancellationToken) -> Result<i64, Self::Error>;

    /// Async [`execute_scalar`](Self::execute_scalar).
    async fn execute_scalar_async(
        &self,
        token: CancellationToken,
    ) -> Result<Option<Self::Value>, Self::Error>;

    /// Async [`execute_reader`](Self::execute_reader).
    async fn execute_reader_async(
        &self,
        behavior: CommandBehavior,
        token: CancellationToken,
    ) -> Result<Self::Reader, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(CommandType::default(), CommandType::Text);
        assert_eq!(UpdateRowSource::default(), UpdateRowSource::Both);
        assert_eq!(CommandBehavior::default(), CommandBehavior::Default);
    }
}
