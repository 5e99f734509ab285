//! Retrying command decorator

use crate::executable::{CommandBehavior, CommandType, Executable, UpdateRowSource};
use crate::proxy::Proxy;
use async_trait::async_trait;
use dbretry_core::error::RetryError;
use dbretry_core::retry::{ExecutionStrategy, RetryPolicy};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// A command whose execution members run under a retry policy.
///
/// Property members read and write the wrapped command directly. `prepare`,
/// `cancel` and every `execute_*` member run through the policy, so a
/// transient failure is retried and a terminal one surfaces as a
/// [`RetryError`] exactly as the policy produced it.
///
/// # Example
///
/// ```ignore
/// use dbretry_command::{Executable, RetryingCommand};
/// use dbretry_core::prelude::*;
///
/// let command = RetryingCommand::new(driver_command, RetryPolicy::default());
/// match command.execute_non_query() {
///     Ok(rows) => println!("{rows} rows affected"),
///     Err(RetryError::Exhausted { attempts, .. }) => eprintln!("gave up after {attempts}"),
///     Err(err) => eprintln!("{err}"),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RetryingCommand<C> {
    command: C,
    policy: RetryPolicy,
}

impl<C: Executable> RetryingCommand<C> {
    /// Wrap `command` so that its execution runs under `policy`.
    pub fn new(command: C, policy: RetryPolicy) -> Self {
        Self { command, policy }
    }

    /// The policy applied to every execution.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<C: Executable> Executable for RetryingCommand<C> {
    type Error = RetryError<C::Error>;
    type Value = C::Value;
    type Reader = C::Reader;
    type Parameter = C::Parameter;
    type Parameters = C::Parameters;
    type Connection = C::Connection;
    type Transaction = C::Transaction;

    fn command_text(&self) -> &str {
        self.command.command_text()
    }

    fn set_command_text(&mut self, text: String) {
        self.command.set_command_text(text);
    }

    fn command_timeout(&self) -> Duration {
        self.command.command_timeout()
    }

    fn set_command_timeout(&mut self, timeout: Duration) {
        self.command.set_command_timeout(timeout);
    }

    fn command_type(&self) -> CommandType {
        self.command.command_type()
    }

    fn set_command_type(&mut self, command_type: CommandType) {
        self.command.set_command_type(command_type);
    }

    fn updated_row_source(&self) -> UpdateRowSource {
        self.command.updated_row_source()
    }

    fn set_updated_row_source(&mut self, source: UpdateRowSource) {
        self.command.set_updated_row_source(source);
    }

    fn connection(&self) -> Option<&Self::Connection> {
        self.command.connection()
    }

    fn set_connection(&mut self, connection: Option<Self::Connection>) {
        self.command.set_connection(connection);
    }

    fn parameters(&self) -> &Self::Parameters {
        self.command.parameters()
    }

    fn parameters_mut(&mut self) -> &mut Self::Parameters {
        self.command.parameters_mut()
    }

    fn transaction(&self) -> Option<&Self::Transaction> {
        self.command.transaction()
    }

    fn set_transaction(&mut self, transaction: Option<Self::Transaction>) {
        self.command.set_transaction(transaction);
    }

    fn design_time_visible(&self) -> bool {
        self.command.design_time_visible()
    }

    fn set_design_time_visible(&mut self, visible: bool) {
        self.command.set_design_time_visible(visible);
    }

    fn create_parameter(&mut self) -> Self::Parameter {
        self.command.create_parameter()
    }

    fn prepare(&self) -> Result<(), Self::Error> {
        trace!(command = self.command.command_text(), "prepare");
        self.policy.execute(|| self.command.prepare())
    }

    fn cancel(&self) -> Result<(), Self::Error> {
        self.policy.execute(|| self.command.cancel())
    }

    fn execute_non_query(&self) -> Result<i64, Self::Error> {
        trace!(command = self.command.command_text(), "execute_non_query");
        self.policy.execute(|| self.command.execute_non_query())
    }

    fn execute_scalar(&self) -> Result<Option<Self::Value>, Self::Error> {
        trace!(command = self.command.command_text(), "execute_scalar");
        self.policy.execute(|| self.command.execute_scalar())
    }

    fn execute_reader(&self, behavior: CommandBehavior) -> Result<Self::Reader, Self::Error> {
        trace!(command = self.command.command_text(), ?behavior, "execute_reader");
        self.policy.execute(|| self.command.execute_reader(behavior))
    }

    async fn execute_non_query_async(&self, token: CancellationToken) -> Result<i64, Self::Error> {
        trace!(command = self.command.command_text(), "execute_non_query_async");
        let command = &self.command;
        self.policy
            .execute_async(|attempt| command.execute_non_query_async(attempt), &token)
            .await
    }

    async fn execute_scalar_async(
        &self,
        token: CancellationToken,
    ) -> Result<Option<Self::Value>, Self::Error> {
        trace!(command = self.command.command_text(), "execute_scalar_async");
        let command = &self.command;
        self.policy
            .execute_async(|attempt| command.execute_scalar_async(attempt), &token)
            .await
    }

    async fn execute_reader_async(
        &self,
        behavior: CommandBehavior,
        token: CancellationToken,
    ) -> Result<Self::Reader, Self::Error> {
        trace!(command = self.command.command_text(), ?behavior, "execute_reader_async");
        let command = &self.command;
        self.policy
            .execute_async(
                |attempt| command.execute_reader_async(behavior, attempt),
                &token,
            )
            .await
    }
}

impl<C> Proxy for RetryingCommand<C> {
    type Underlying = C;

    fn underlying(&self) -> &C {
        &self.command
    }

    fn underlying_mut(&mut self) -> &mut C {
        &mut self.command
    }

    fn into_underlying(self) -> C {
        self.command
    }
}
