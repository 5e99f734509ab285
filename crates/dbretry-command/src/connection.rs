//! Retrying connection decorator
//!
//! Opening a connection is the other place transient failures show up
//! (server restarts, failovers, exhausted pools). [`RetryingConnection`]
//! retries `open` under a policy and hands out commands that share it.

use crate::command::RetryingCommand;
use crate::executable::Executable;
use crate::proxy::Proxy;
use async_trait::async_trait;
use dbretry_core::classify::DescribeError;
use dbretry_core::error::RetryError;
use dbretry_core::retry::{ExecutionStrategy, RetryPolicy};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// State of a database connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Not connected.
    #[default]
    Closed,
    /// Connecting to the server.
    Connecting,
    /// Connected and idle.
    Open,
    /// Executing a command.
    Executing,
    /// Reading results.
    Fetching,
    /// The connection failed and must be closed before it is reopened.
    Broken,
}

/// A database connection.
#[async_trait]
pub trait Connect: Send + Sync {
    /// Driver error type.
    type Error: DescribeError + std::error::Error + Send + Sync + 'static;

    /// Command type created by this connection.
    type Command: Executable;

    /// Open the connection.
    fn open(&self) -> Result<(), Self::Error>;

    /// Async [`open`](Self::open).
    async fn open_async(&self, token: CancellationToken) -> Result<(), Self::Error>;

    /// Close the connection. Closing a closed connection does nothing.
    fn close(&self);

    /// Current state.
    fn state(&self) -> ConnectionState;

    /// Create a command bound to this connection.
    fn create_command(&self) -> Self::Command;
}

/// A connection whose `open` runs under a retry policy.
///
/// Commands created through [`Connect::create_command`] are
/// [`RetryingCommand`]s sharing this connection's policy.
#[derive(Debug, Clone)]
pub struct RetryingConnection<C> {
    connection: C,
    policy: RetryPolicy,
}

impl<C: Connect> RetryingConnection<C> {
    /// Wrap `connection` so that opening it runs under `policy`.
    pub fn new(connection: C, policy: RetryPolicy) -> Self {
        Self { connection, policy }
    }

    /// The policy applied to `open` and to created commands.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<C: Connect> Connect for RetryingConnection<C> {
    type Error = RetryError<C::Error>;
    type Command = RetryingCommand<C::Command>;

    fn open(&self) -> Result<(), Self::Error> {
        debug!("opening connection");
        self.policy.execute(|| self.connection.open())
    }

    async fn open_async(&self, token: CancellationToken) -> Result<(), Self::Error> {
        debug!("opening connection");
        let connection = &self.connection;
        self.policy
            .execute_async(|attempt| connection.open_async(attempt), &token)
            .await
    }

    fn close(&self) {
        self.connection.close();
    }

    fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    fn create_command(&self) -> Self::Command {
        RetryingCommand::new(self.connection.create_command(), self.policy.clone())
    }
}

impl<C> Proxy for RetryingConnection<C> {
    type Underlying = C;

    fn underlying(&self) -> &C {
        &self.connection
    }

    fn underlying_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    fn into_underlying(self) -> C {
        self.connection
    }
}
