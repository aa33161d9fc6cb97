//! Redis bit store adapter
//!
//! Wraps one synchronous `redis::Connection`. Commands are packed and
//! written straight to the socket; replies are read back one at a time, so
//! a whole batch of `SETBIT`/`GETBIT` goes out before the first reply is
//! read.
//!
//! The connection is opened without credentials or a database: `AUTH` and
//! `SELECT` go through the filter handshake like any other command.

use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo, RedisError, Value};
use tracing::{debug, warn};

use crate::domain::StoreOptions;
use crate::error::{FilterError, StoreError};
use crate::ports::{BitStore, StoreCommand, StoreReply};

/// Redis connection implementing [`BitStore`]
pub struct RedisStore {
    connection: redis::Connection,
}

impl RedisStore {
    /// Open a TCP connection to `options.host:options.port`
    ///
    /// Fails with [`FilterError::ConnectionError`] if the server cannot be
    /// reached within `options.connect_timeout`.
    pub fn connect(options: &StoreOptions) -> Result<Self, FilterError> {
        let endpoint = format!("{}:{}", options.host, options.port);
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(options.host.clone(), options.port),
            redis: RedisConnectionInfo::default(),
        };

        let client = redis::Client::open(info).map_err(|e| {
            FilterError::ConnectionError(format!("invalid address {endpoint}: {e}"))
        })?;
        let connection = client
            .get_connection_with_timeout(options.connect_timeout)
            .map_err(|e| {
                warn!(%endpoint, error = %e, "Store connection failed");
                FilterError::ConnectionError(format!("cannot connect to {endpoint}: {e}"))
            })?;

        debug!(%endpoint, "Connected to store");
        Ok(Self { connection })
    }
}

impl BitStore for RedisStore {
    fn send(&mut self, commands: &[StoreCommand]) -> Result<(), StoreError> {
        let mut packed = Vec::new();
        for command in commands {
            packed.extend(to_cmd(command).get_packed_command());
        }
        self.connection
            .send_packed_command(&packed)
            .map_err(|e| StoreError::Transport(e.to_string()))
    }

    fn receive(&mut self) -> Result<StoreReply, StoreError> {
        match self.connection.recv_response() {
            Ok(value) => from_value(value),
            Err(e) => from_error(e),
        }
    }
}

fn to_cmd(command: &StoreCommand) -> redis::Cmd {
    let mut cmd = redis::cmd(command.name());
    match command {
        StoreCommand::Auth { password } => {
            cmd.arg(password);
        }
        StoreCommand::Ping => {}
        StoreCommand::Select { db } => {
            cmd.arg(*db);
        }
        StoreCommand::SetBit { key, offset } => {
            cmd.arg(key).arg(*offset).arg(1);
        }
        StoreCommand::GetBit { key, offset } => {
            cmd.arg(key).arg(*offset);
        }
        StoreCommand::Del { key } => {
            cmd.arg(key);
        }
    }
    cmd
}

/// Error replies arrive as values; surface them before mapping the rest
fn from_value(value: Value) -> Result<StoreReply, StoreError> {
    match value.extract_error() {
        Ok(value) => Ok(to_reply(value)),
        Err(e) => from_error(e),
    }
}

fn to_reply(value: Value) -> StoreReply {
    match value {
        Value::Int(n) => StoreReply::Integer(n),
        Value::Nil => StoreReply::Nil,
        Value::Okay => StoreReply::Status("OK".to_string()),
        other => match redis::from_redis_value::<String>(&other) {
            Ok(status) => StoreReply::Status(status),
            Err(e) if e.kind() == redis::ErrorKind::TypeError => {
                StoreReply::Other(format!("{other:?}"))
            }
            Err(e) => StoreReply::Error(e.to_string()),
        },
    }
}

/// Server error replies stay values; anything touching the socket is fatal
fn from_error(e: RedisError) -> Result<StoreReply, StoreError> {
    if e.is_io_error() || e.is_connection_dropped() || e.is_timeout() {
        Err(StoreError::Transport(e.to_string()))
    } else {
        Ok(StoreReply::Error(e.to_string()))
    }
}
