//! End-to-end tests over a loopback TCP socket and an on-disk SQLite file.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;

use quote_common::{Command, ErrorKind, QuoteRecord, Response, Symbol};
use quote_server::receiver::{MAX_LINE, QuoteReceiver};
use quote_server::{
    ProviderError, QuoteProvider, QuoteResolver, QuoteStore, SqliteQuoteStore, StoreError,
};

/// Knows AAPL, fails for `DOWN`, refuses the key for `LOCKED`, has no data
/// for anything else.
struct DemoProvider;

impl QuoteProvider for DemoProvider {
    fn name(&self) -> &str {
        "demo"
    }

    fn fetch(&self, symbol: &Symbol) -> Result<Option<QuoteRecord>, ProviderError> {
        match symbol.as_str() {
            "AAPL" => Ok(Some(QuoteRecord {
                name: Some("Apple Inc.".into()),
                price: Some(172.35),
                exchange: Some("NASDAQ".into()),
                exchange_short: Some("NASDAQ".into()),
                instrument_type: Some("stock".into()),
                ..QuoteRecord::new(symbol.clone())
            })),
            "DOWN" => Err(ProviderError::Status(502)),
            "LOCKED" => Err(ProviderError::Unauthorized(401)),
            _ => Ok(None),
        }
    }
}

struct Session {
    writer: TcpStream,
    reader: BufReader<TcpStream>,
}

impl Session {
    fn connect(addr: std::net::SocketAddr) -> Self {
        let writer = TcpStream::connect(addr).unwrap();
        let reader = BufReader::new(writer.try_clone().unwrap());
        Self { writer, reader }
    }

    fn send_raw(&mut self, line: &str) -> Response {
        self.send_bytes(line.as_bytes())
    }

    fn send_bytes(&mut self, line: &[u8]) -> Response {
        self.writer.write_all(line).unwrap();
        self.writer.write_all(b"\n").unwrap();
        let mut reply = String::new();
        self.reader.read_line(&mut reply).unwrap();
        Response::from_line(&reply).unwrap()
    }

    fn send(&mut self, cmd: &Command) -> Response {
        let line = String::from_utf8(cmd.to_line().unwrap()).unwrap();
        self.send_raw(line.trim_end())
    }
}

/// Reads from SQLite, refuses every write.
struct FullDiskStore {
    inner: SqliteQuoteStore,
}

impl QuoteStore for FullDiskStore {
    fn lookup(&self, symbol: &Symbol) -> Result<Option<QuoteRecord>, StoreError> {
        self.inner.lookup(symbol)
    }

    fn upsert(&self, _record: &QuoteRecord) -> Result<(), StoreError> {
        Err(StoreError::IoFailure("database or disk is full".into()))
    }

    fn contains(&self, symbol: &Symbol) -> Result<bool, StoreError> {
        self.inner.contains(symbol)
    }

    fn reset(&self) -> Result<(), StoreError> {
        self.inner.reset()
    }

    fn symbols(&self) -> Result<Vec<Symbol>, StoreError> {
        self.inner.symbols()
    }
}

fn start_server(store: Arc<dyn QuoteStore>) -> std::net::SocketAddr {
    let resolver = Arc::new(QuoteResolver::new(store, Arc::new(DemoProvider)));
    let receiver = QuoteReceiver::new("127.0.0.1:0").unwrap();
    let addr = receiver.local_addr().unwrap();
    thread::spawn(move || receiver.serve(resolver));
    addr
}

fn get(symbol: &str) -> Command {
    Command::Get {
        symbol: symbol.into(),
    }
}

#[test]
fn commands_round_trip_over_tcp() {
    let store = Arc::new(SqliteQuoteStore::open_in_memory().unwrap());
    let addr = start_server(store.clone());
    let mut session = Session::connect(addr);

    match session.send(&get("aapl")) {
        Response::Quote { record } => {
            assert_eq!(record.symbol.as_str(), "AAPL");
            assert_eq!(record.price, Some(172.35));
        }
        other => panic!("unexpected response: {other:?}"),
    }
    assert!(store.contains(&Symbol::parse("AAPL").unwrap()).unwrap());

    assert!(matches!(
        session.send(&get("ZZZZ")),
        Response::Error {
            kind: ErrorKind::NotFound,
            ..
        }
    ));
    assert!(matches!(
        session.send(&get("DOWN")),
        Response::Error {
            kind: ErrorKind::ProviderUnavailable,
            ..
        }
    ));
    assert!(matches!(
        session.send(&get("LOCKED")),
        Response::Error {
            kind: ErrorKind::ProviderRejected,
            ..
        }
    ));
    assert!(matches!(
        session.send(&get("   ")),
        Response::Error {
            kind: ErrorKind::InvalidSymbol,
            ..
        }
    ));

    assert_eq!(
        session.send(&Command::List),
        Response::Symbols {
            symbols: vec![Symbol::parse("AAPL").unwrap()]
        }
    );
    assert_eq!(session.send(&Command::Reset), Response::Done);
    assert_eq!(
        session.send(&Command::List),
        Response::Symbols { symbols: vec![] }
    );
}

#[test]
fn bad_request_does_not_end_the_session() {
    let store = Arc::new(SqliteQuoteStore::open_in_memory().unwrap());
    let addr = start_server(store);
    let mut session = Session::connect(addr);

    assert!(matches!(
        session.send_raw("{\"command\":\"EXPLODE\"}"),
        Response::Error {
            kind: ErrorKind::BadRequest,
            ..
        }
    ));
    assert!(matches!(session.send(&get("AAPL")), Response::Quote { .. }));

    // A second client is unaffected by the first.
    let mut other = Session::connect(addr);
    assert!(matches!(
        other.send(&Command::Refresh {
            symbol: "AAPL".into()
        }),
        Response::Quote { .. }
    ));
}

#[test]
fn invalid_utf8_gets_bad_request_and_session_continues() {
    let addr = start_server(Arc::new(SqliteQuoteStore::open_in_memory().unwrap()));
    let mut session = Session::connect(addr);

    assert!(matches!(
        session.send_bytes(b"{\"command\":\"GET\",\"symbol\":\"\xff\xfe\"}"),
        Response::Error {
            kind: ErrorKind::BadRequest,
            ..
        }
    ));
    assert_eq!(
        session.send(&Command::List),
        Response::Symbols { symbols: vec![] }
    );
}

#[test]
fn oversized_line_gets_bad_request_and_session_continues() {
    let addr = start_server(Arc::new(SqliteQuoteStore::open_in_memory().unwrap()));
    let mut session = Session::connect(addr);

    let huge = vec![b'A'; MAX_LINE * 3];
    assert!(matches!(
        session.send_bytes(&huge),
        Response::Error {
            kind: ErrorKind::BadRequest,
            ..
        }
    ));
    assert!(matches!(session.send(&get("AAPL")), Response::Quote { .. }));
}

#[test]
fn failed_cache_write_is_served_as_partial() {
    let store = Arc::new(FullDiskStore {
        inner: SqliteQuoteStore::open_in_memory().unwrap(),
    });
    let addr = start_server(store.clone());
    let mut session = Session::connect(addr);

    match session.send(&get("aapl")) {
        Response::Partial { record, error } => {
            assert_eq!(record.symbol.as_str(), "AAPL");
            assert_eq!(record.name.as_deref(), Some("Apple Inc."));
            assert_eq!(record.price, Some(172.35));
            assert!(error.contains("disk is full"), "{error}");
        }
        other => panic!("unexpected response: {other:?}"),
    }
    assert!(!store.contains(&Symbol::parse("AAPL").unwrap()).unwrap());
}

#[test]
fn cached_quotes_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quotes.db");

    {
        let store = Arc::new(SqliteQuoteStore::open(&path).unwrap());
        let resolver = QuoteResolver::new(store, Arc::new(DemoProvider));
        resolver.get_quote("AAPL").unwrap();
    }

    let reopened = SqliteQuoteStore::open(&path).unwrap();
    let record = reopened
        .lookup(&Symbol::parse("AAPL").unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(record.name.as_deref(), Some("Apple Inc."));
}
