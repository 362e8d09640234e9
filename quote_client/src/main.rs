//! Quote Client — a TCP client for the quote cache server. It sends `GET`,
//! `REFRESH`, `LIST` or `RESET` commands and prints the answers to stdout.
//!
//! Usage example (CLI):
//! ```bash
//! quote_client --server-ip 192.168.0.10 get AAPL msft
//! quote_client get --path ./tickers.txt
//! quote_client refresh AAPL
//! ```
//!
//! The ticker file should contain symbols separated by commas, spaces, or new lines.
//! See `quote_common::tickers` for details.
#![warn(missing_docs)]
mod args;
mod sender;

use crate::args::{Action, Args, normalize_path};
use crate::sender::CommandSender;
use clap::Parser;
use log::{error, info, warn};
use quote_common::net::addr;
use quote_common::tickers::{Symbol, SymbolParser};
use quote_common::{Command, ErrorKind, ParserError, Response, Result};
use std::fs::File;
use std::io::BufReader;

fn main() -> Result<(), ParserError> {
    init_logger();
    let args = Args::parse();

    let server_ip = args.server_ip.trim().replace('"', "");
    let server_address = addr(&server_ip, args.port);

    let commands = build_commands(args.action)?;
    if commands.is_empty() {
        warn!("No symbols given; nothing to do.");
        return Ok(());
    }

    info!("Connecting to TCP server at {}", server_address);
    let mut sender = CommandSender::connect(&server_address)?;

    let mut failures = 0;
    for command in &commands {
        let response = sender.send_command(command)?;
        if !print_response(command, &response) {
            failures += 1;
        }
    }

    if failures > 0 {
        return Err(ParserError::Format(format!(
            "{} of {} requests failed",
            failures,
            commands.len()
        )));
    }
    Ok(())
}

/// Turn the CLI action into the commands to send, in order.
fn build_commands(action: Action) -> Result<Vec<Command>, ParserError> {
    let commands = match action {
        Action::Get { symbols, path } => {
            let mut raw = symbols;
            if let Some(path) = path {
                let file = File::open(normalize_path(&path))?;
                let from_file = Symbol::parse_from_file(BufReader::new(file))?;
                info!("Symbols from file: {:?}", from_file);
                raw.extend(from_file.into_iter().map(String::from));
            }
            raw.into_iter()
                .map(|symbol| Command::Get { symbol })
                .collect()
        }
        Action::Refresh { symbol } => vec![Command::Refresh { symbol }],
        Action::List => vec![Command::List],
        Action::Reset => vec![Command::Reset],
    };
    Ok(commands)
}

/// Print a response; returns `false` when it reports a failure.
fn print_response(command: &Command, response: &Response) -> bool {
    match response {
        Response::Quote { record } => {
            println!("{}", record);
            true
        }
        Response::Partial { record, error } => {
            println!("{}", record);
            warn!("{} was not cached: {}", record.symbol, error);
            true
        }
        Response::Symbols { symbols } => {
            if symbols.is_empty() {
                println!("Cache is empty.");
            }
            for symbol in symbols {
                println!("{}", symbol);
            }
            true
        }
        Response::Done => {
            println!("Done.");
            true
        }
        Response::Error { kind, message } => {
            let hint = match kind {
                ErrorKind::ProviderRejected => " (check the server's API key)",
                _ if kind.is_retryable() => " (retry later)",
                _ => "",
            };
            error!("{:?} failed: {}: {}{}", command, kind, message, hint);
            false
        }
    }
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_builds_one_command_per_symbol() {
        let commands = build_commands(Action::Get {
            symbols: vec!["aapl".into(), "msft".into()],
            path: None,
        })
        .unwrap();
        assert_eq!(
            commands,
            vec![
                Command::Get {
                    symbol: "aapl".into()
                },
                Command::Get {
                    symbol: "msft".into()
                },
            ]
        );
    }

    #[test]
    fn missing_symbols_file_is_an_error() {
        let result = build_commands(Action::Get {
            symbols: vec![],
            path: Some("/definitely/not/here.txt".into()),
        });
        assert!(matches!(result, Err(ParserError::Io(_))));
    }

    #[test]
    fn error_responses_count_as_failures() {
        let cmd = Command::List;
        assert!(print_response(&cmd, &Response::Done));
        assert!(!print_response(
            &cmd,
            &Response::error(ErrorKind::StoreFailure, "disk gone")
        ));
        assert!(!print_response(
            &cmd,
            &Response::error(ErrorKind::ProviderRejected, "HTTP 401")
        ));
    }
}
