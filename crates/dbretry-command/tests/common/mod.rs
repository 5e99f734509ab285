//! Shared test doubles for the command decorators

pub mod mock_command;
