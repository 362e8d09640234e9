//! Sending commands to the quote server over TCP.
//!
//! This module provides a small helper that owns the connection, writes one
//! `Command` line and reads back the matching `Response` line.
use log::debug;
use quote_common::{Command, ParserError, Response};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::time::Duration;

/// How long to wait for a single response. Covers the server's own provider
/// timeout plus a margin.
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Request/response channel to the server.
pub struct CommandSender {
    writer: TcpStream,
    reader: BufReader<TcpStream>,
}

impl CommandSender {
    /// Connect to the server's command port.
    pub fn connect(address: &str) -> Result<Self, ParserError> {
        let writer = TcpStream::connect(address)
            .map_err(|e| ParserError::Format(format!("Failed to connect to server: {}", e)))?;
        writer.set_read_timeout(Some(READ_TIMEOUT))?;
        let reader = BufReader::new(writer.try_clone()?);
        Ok(Self { writer, reader })
    }

    /// Send one command and wait for its response.
    pub fn send_command(&mut self, command: &Command) -> Result<Response, ParserError> {
        debug!("Sending command: {:?}", command);
        self.writer.write_all(&command.to_line()?)?;
        self.writer.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(ParserError::ConnectionClosed);
        }
        debug!("Received response: {}", line.trim_end());
        Response::from_line(&line)
    }
}
