#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Retrying decorators for database commands and connections
//!
//! Wraps a driver's command (or connection) so that every executing member
//! runs under a [`RetryPolicy`](dbretry_core::retry::RetryPolicy) while every
//! property passes straight through to the wrapped object.
//!
//! # Architecture
//!
//! - **[`Executable`]**: the execution surface of a database command
//! - **[`Connect`]**: the open/close surface of a database connection
//! - **[`RetryingCommand`]** / **[`RetryingConnection`]**: decorators that
//!   route execution through the policy
//! - **[`Proxy`]**: access to the wrapped object
//!
//! # Usage
//!
//! ```ignore
//! use dbretry_command::{Executable, RetryingCommand};
//! use dbretry_core::prelude::*;
//!
//! let mut command = RetryingCommand::new(driver_command, RetryPolicy::default());
//! command.set_command_text("UPDATE accounts SET balance = balance - 10");
//! let affected = command.execute_non_query()?;
//! ```

pub mod command;
pub mod connection;
pub mod executable;
pub mod proxy;

// Re-export commonly used types
pub use command::RetryingCommand;
pub use connection::{Connect, ConnectionState, RetryingConnection};
pub use executable::{CommandBehavior, CommandType, Executable, UpdateRowSource};
pub use proxy::Proxy;
