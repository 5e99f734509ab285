//! Mock database command and connection
//!
//! Simulates a driver without a database. Failures are scripted up front
//! and returned, in order, by the next execution members called; once the
//! script is empty every execution succeeds. Every execution member records
//! its name so tests can assert on what reached the driver.

#![allow(dead_code)]

use async_trait::async_trait;
use dbretry_command::{
    CommandBehavior, CommandType, Connect, ConnectionState, Executable, UpdateRowSource,
};
use dbretry_core::classify::{DescribeError, ErrorCategory, ErrorDescription};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Error raised by the mock driver, identified by a server error number.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("server error {number}: {message}")]
pub struct DriverError {
    pub number: i64,
    pub message: String,
}

impl DriverError {
    pub fn deadlock() -> Self {
        Self {
            number: 1205,
            message: "transaction was deadlocked".to_string(),
        }
    }

    pub fn timeout() -> Self {
        Self {
            number: -2,
            message: "execution timeout expired".to_string(),
        }
    }

    pub fn unique_violation() -> Self {
        Self {
            number: 2627,
            message: "violation of unique key constraint".to_string(),
        }
    }

    pub fn syntax() -> Self {
        Self {
            number: 102,
            message: "incorrect syntax near 'SELEC'".to_string(),
        }
    }

    pub fn login_failed() -> Self {
        Self {
            number: 18456,
            message: "login failed".to_string(),
        }
    }

    pub fn server_unavailable() -> Self {
        Self {
            number: 40613,
            message: "database is not currently available".to_string(),
        }
    }
}

impl DescribeError for DriverError {
    fn describe(&self) -> ErrorDescription {
        let category = match self.number {
            1205 => ErrorCategory::Deadlock,
            -2 => ErrorCategory::Timeout,
            2627 | 547 => ErrorCategory::ConstraintViolation,
            102 => ErrorCategory::Syntax,
            18456 => ErrorCategory::Authentication,
            40613 => ErrorCategory::ConnectionReset,
            _ => ErrorCategory::Other,
        };
        ErrorDescription::new(category, self.message.clone()).with_code(self.number)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockParameter {
    pub name: String,
    pub value: Option<i64>,
}

/// A scripted command.
#[derive(Debug)]
pub struct MockCommand {
    text: String,
    timeout: Duration,
    command_type: CommandType,
    row_source: UpdateRowSource,
    connection: Option<String>,
    parameters: Vec<MockParameter>,
    transaction: Option<u32>,
    design_time_visible: bool,

    failures: Mutex<VecDeque<DriverError>>,
    calls: Mutex<Vec<&'static str>>,
    latency: Duration,
    rows: i64,
    scalar: Option<i64>,
}

impl Default for MockCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCommand {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            timeout: Duration::from_secs(30),
            command_type: CommandType::Text,
            row_source: UpdateRowSource::Both,
            connection: None,
            parameters: Vec::new(),
            transaction: None,
            design_time_visible: true,
            failures: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
            rows: 1,
            scalar: Some(42),
        }
    }

    /// Fail the next executions with these errors, in order.
    pub fn failing_with(self, failures: impl IntoIterator<Item = DriverError>) -> Self {
        self.failures.lock().unwrap().extend(failures);
        self
    }

    pub fn with_rows(mut self, rows: i64) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_scalar(mut self, scalar: Option<i64>) -> Self {
        self.scalar = scalar;
        self
    }

    /// Make every async execution take this long.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Names of the execution members that reached the driver, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn remaining_failures(&self) -> usize {
        self.failures.lock().unwrap().len()
    }

    fn record(&self, member: &'static str) {
        self.calls.lock().unwrap().push(member);
    }

    fn outcome(&self) -> Result<(), DriverError> {
        match self.failures.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn run(&self, member: &'static str) -> Result<(), DriverError> {
        self.record(member);
        self.outcome()
    }

    async fn run_async(&self, member: &'static str) -> Result<(), DriverError> {
        self.record(member);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.outcome()
    }
}

#[async_trait]
impl Executable for MockCommand {
    type Error = DriverError;
    type Value = i64;
    type Reader = Vec<i64>;
    type Parameter = MockParameter;
    type Parameters = Vec<MockParameter>;
    type Connection = String;
    type Transaction = u32;

    fn command_text(&self) -> &str {
        &self.text
    }

    fn set_command_text(&mut self, text: String) {
        self.text = text;
    }

    fn command_timeout(&self) -> Duration {
        self.timeout
    }

    fn set_command_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    fn command_type(&self) -> CommandType {
        self.command_type
    }

    fn set_command_type(&mut self, command_type: CommandType) {
        self.command_type = command_type;
    }

    fn updated_row_source(&self) -> UpdateRowSource {
        self.row_source
    }

    fn set_updated_row_source(&mut self, source: UpdateRowSource) {
        self.row_source = source;
    }

    fn connection(&self) -> Option<&String> {
        self.connection.as_ref()
    }

    fn set_connection(&mut self, connection: Option<String>) {
        self.connection = connection;
    }

    fn parameters(&self) -> &Vec<MockParameter> {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut Vec<MockParameter> {
        &mut self.parameters
    }

    fn transaction(&self) -> Option<&u32> {
        self.transaction.as_ref()
    }

    fn set_transaction(&mut self, transaction: Option<u32>) {
        self.transaction = transaction;
    }

    fn design_time_visible(&self) -> bool {
        self.design_time_visible
    }

    fn set_design_time_visible(&mut self, visible: bool) {
        self.design_time_visible = visible;
    }

    fn create_parameter(&mut self) -> MockParameter {
        MockParameter {
            name: format!("@p{}", self.parameters.len()),
            value: None,
        }
    }

    fn prepare(&self) -> Result<(), DriverError> {
        self.run("prepare")
    }

    fn cancel(&self) -> Result<(), DriverError> {
        self.run("cancel")
    }

    fn execute_non_query(&self) -> Result<i64, DriverError> {
        self.run("execute_non_query")?;
        Ok(self.rows)
    }

    fn execute_scalar(&self) -> Result<Option<i64>, DriverError> {
        self.run("execute_scalar")?;
        Ok(self.scalar)
    }

    fn execute_reader(&self, behavior: CommandBehavior) -> Result<Vec<i64>, DriverError> {
        self.run("execute_reader")?;
        Ok(rows_for(behavior, self.rows))
    }

    async fn execute_non_query_async(&self, _token: CancellationToken) -> Result<i64, DriverError> {
        self.run_async("execute_non_query_async").await?;
        Ok(self.rows)
    }

    async fn execute_scalar_async(
        &self,
        _token: CancellationToken,
    ) -> Result<Option<i64>, DriverError> {
        self.run_async("execute_scalar_async").await?;
        Ok(self.scalar)
    }

    async fn execute_reader_async(
        &self,
        behavior: CommandBehavior,
        _token: CancellationToken,
    ) -> Result<Vec<i64>, DriverError> {
        self.run_async("execute_reader_async").await?;
        Ok(rows_for(behavior, self.rows))
    }
}

fn rows_for(behavior: CommandBehavior, rows: i64) -> Vec<i64> {
    match behavior {
        CommandBehavior::SchemaOnly => Vec::new(),
        CommandBehavior::SingleRow => (1..=rows.min(1)).collect(),
        _ => (1..=rows).collect(),
    }
}

/// A scripted connection.
#[derive(Debug, Default)]
pub struct MockConnection {
    failures: Mutex<VecDeque<DriverError>>,
    state: Mutex<ConnectionState>,
    opens: AtomicU32,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_with(self, failures: impl IntoIterator<Item = DriverError>) -> Self {
        self.failures.lock().unwrap().extend(failures);
        self
    }

    /// Number of open attempts that reached the driver.
    pub fn opens(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }

    fn try_open(&self) -> Result<(), DriverError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        match self.failures.lock().unwrap().pop_front() {
            Some(err) => {
                *self.state.lock().unwrap() = ConnectionState::Broken;
                Err(err)
            }
            None => {
                *self.state.lock().unwrap() = ConnectionState::Open;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Connect for MockConnection {
    type Error = DriverError;
    type Command = MockCommand;

    fn open(&self) -> Result<(), DriverError> {
        self.try_open()
    }

    async fn open_async(&self, _token: CancellationToken) -> Result<(), DriverError> {
        tokio::task::yield_now().await;
        self.try_open()
    }

    fn close(&self) {
        *self.state.lock().unwrap() = ConnectionState::Closed;
    }

    fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    fn create_command(&self) -> MockCommand {
        let mut command = MockCommand::new();
        command.set_connection(Some("mock".to_string()));
        command
    }
}
