//! TCP front end of the quote server.
//!
//! Each connection carries newline-delimited JSON `Command`s and gets one
//! `Response` line back per request line.
use crate::error::ResolverError;
use crate::resolver::QuoteResolver;
use log::{debug, error, info, warn};
use quote_common::{Command, ErrorKind, ParserError, Response};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

/// TCP command receiver serving quote requests.
///
/// Accepts connections and handles each on its own thread. A connection
/// carries newline-delimited JSON `Command`s; every line gets exactly one
/// `Response` line back. Failures of one client never stop the listener.
pub struct QuoteReceiver {
    /// The underlying TCP listening socket.
    pub(crate) socket: TcpListener,
}

impl QuoteReceiver {
    /// Bind a new TCP receiver to the provided `bind_addr` (e.g., `0.0.0.0:8080`).
    pub fn new(bind_addr: &str) -> Result<Self, ParserError> {
        let socket = TcpListener::bind(bind_addr)?;
        Ok(Self { socket })
    }

    /// Address actually bound, useful when binding port 0.
    pub fn local_addr(&self) -> Result<SocketAddr, ParserError> {
        Ok(self.socket.local_addr()?)
    }

    /// Blocking accept loop. Returns only if the listener itself fails.
    pub fn serve(self, resolver: Arc<QuoteResolver>) -> Result<(), ParserError> {
        info!(
            "Command TCP server is started on {}",
            self.socket.local_addr()?
        );

        for stream in self.socket.incoming() {
            match stream {
                Ok(stream) => {
                    let resolver = Arc::clone(&resolver);
                    thread::spawn(move || {
                        let peer = stream
                            .peer_addr()
                            .map(|a| a.to_string())
                            .unwrap_or_else(|_| "<unknown>".into());
                        debug!("Client connected: {}", peer);
                        if let Err(e) = handle_connection(stream, &resolver) {
                            error!("Client {} failed: {}", peer, e);
                        }
                        debug!("Client disconnected: {}", peer);
                    });
                }
                Err(e) => error!("TCP connection error: {}", e),
            }
        }
        Ok(())
    }
}

/// Longest accepted request line in bytes, newline included.
pub const MAX_LINE: usize = 8 * 1024;

/// Serve one connection until the peer closes it.
///
/// Lines that are not UTF-8, are too long or do not decode as a `Command`
/// are answered with `BadRequest` and the session continues.
pub fn handle_connection(stream: TcpStream, resolver: &QuoteResolver) -> Result<(), ParserError> {
    let mut writer = stream.try_clone()?;
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::with_capacity(256);

    loop {
        buf.clear();
        let read = (&mut reader).take(MAX_LINE as u64).read_until(b'\n', &mut buf)?;
        if read == 0 {
            return Ok(());
        }

        let response = if buf.last() != Some(&b'\n') && read == MAX_LINE {
            discard_rest_of_line(&mut reader)?;
            warn!("Rejected request: line exceeds {} bytes", MAX_LINE);
            Response::error(
                ErrorKind::BadRequest,
                format!("request line exceeds {MAX_LINE} bytes"),
            )
        } else {
            match std::str::from_utf8(&buf) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => decode_and_dispatch(resolver, line),
                Err(e) => {
                    warn!("Rejected request: {}", e);
                    Response::error(ErrorKind::BadRequest, format!("request is not UTF-8: {e}"))
                }
            }
        };
        writer.write_all(&response.to_line()?)?;
        writer.flush()?;
    }
}

fn decode_and_dispatch(resolver: &QuoteResolver, line: &str) -> Response {
    debug!("Received line {}", line.trim_end());
    match Command::from_line(line) {
        Ok(cmd) => {
            info!("Received command {:?}", cmd);
            dispatch(resolver, cmd)
        }
        Err(e) => {
            warn!("Rejected request: {}", e);
            Response::error(ErrorKind::BadRequest, e.to_string())
        }
    }
}

/// Skip input up to and including the next newline, without buffering it.
fn discard_rest_of_line<R: BufRead>(reader: &mut R) -> Result<(), ParserError> {
    loop {
        let chunk = reader.fill_buf()?;
        if chunk.is_empty() {
            return Ok(());
        }
        match chunk.iter().position(|b| *b == b'\n') {
            Some(pos) => {
                reader.consume(pos + 1);
                return Ok(());
            }
            None => {
                let len = chunk.len();
                reader.consume(len);
            }
        }
    }
}

/// Execute a command against the resolver and build its response.
pub fn dispatch(resolver: &QuoteResolver, cmd: Command) -> Response {
    match cmd {
        Command::Get { symbol } => quote_response(resolver.get_quote(&symbol)),
        Command::Refresh { symbol } => quote_response(resolver.refresh_quote(&symbol)),
        Command::Reset => match resolver.reset() {
            Ok(()) => Response::Done,
            Err(e) => error_response(e),
        },
        Command::List => match resolver.cached_symbols() {
            Ok(symbols) => Response::Symbols { symbols },
            Err(e) => error_response(e),
        },
    }
}

fn quote_response(outcome: Result<quote_common::QuoteRecord, ResolverError>) -> Response {
    match outcome {
        Ok(record) => Response::Quote { record },
        Err(ResolverError::PersistenceFailed { record, reason }) => Response::Partial {
            record,
            error: reason,
        },
        Err(e) => error_response(e),
    }
}

fn error_response(err: ResolverError) -> Response {
    Response::error(err.kind(), err.to_string())
}
