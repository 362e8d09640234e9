//! Persistent quote cache keyed by symbol.
//!
//! `QuoteStore` is the seam the resolver depends on; `SqliteQuoteStore` is the
//! production implementation. The SQLite connection lives behind a mutex and
//! every operation holds the lock only for its own statements, so the lock is
//! never held across a provider round-trip.

use std::path::Path;
use std::sync::Mutex;

use log::{debug, info};
use quote_common::{QuoteRecord, Symbol};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::StoreError;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS quotes (
    symbol TEXT PRIMARY KEY NOT NULL,
    name TEXT,
    price REAL,
    exchange TEXT,
    exchange_short TEXT,
    type TEXT
)";

const DROP_TABLE: &str = "DROP TABLE IF EXISTS quotes";

/// Durable key-value persistence for quotes.
pub trait QuoteStore: Send + Sync {
    /// Point lookup. `None` when the symbol was never cached.
    fn lookup(&self, symbol: &Symbol) -> Result<Option<QuoteRecord>, StoreError>;

    /// Insert or fully replace the record with the same symbol.
    fn upsert(&self, record: &QuoteRecord) -> Result<(), StoreError>;

    /// Whether a record for `symbol` exists.
    fn contains(&self, symbol: &Symbol) -> Result<bool, StoreError>;

    /// Drop every record and recreate the schema. Idempotent.
    fn reset(&self) -> Result<(), StoreError>;

    /// All cached symbols in ascending order.
    fn symbols(&self) -> Result<Vec<Symbol>, StoreError>;
}

/// SQLite-backed `QuoteStore`.
pub struct SqliteQuoteStore {
    conn: Mutex<Connection>,
}

impl SqliteQuoteStore {
    /// Open (or create) the database file and make sure the schema exists.
    /// Existing rows are kept.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        info!("Quote store opened at {}", path.display());
        Self::with_connection(conn)
    }

    /// Private in-memory database, mainly for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(CREATE_TABLE, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// Raw column values of one `quotes` row.
struct StoredRow {
    symbol: String,
    name: Option<String>,
    price: Option<f64>,
    exchange: Option<String>,
    exchange_short: Option<String>,
    instrument_type: Option<String>,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(StoredRow {
            symbol: row.get(0)?,
            name: row.get(1)?,
            price: row.get(2)?,
            exchange: row.get(3)?,
            exchange_short: row.get(4)?,
            instrument_type: row.get(5)?,
        })
    }

    fn into_record(self) -> Result<QuoteRecord, StoreError> {
        Ok(QuoteRecord {
            symbol: restore_symbol(&self.symbol)?,
            name: self.name,
            price: self.price,
            exchange: self.exchange,
            exchange_short: self.exchange_short,
            instrument_type: self.instrument_type,
        })
    }
}

fn restore_symbol(raw: &str) -> Result<Symbol, StoreError> {
    Symbol::parse(raw).map_err(|e| StoreError::IoFailure(format!("corrupt row for '{raw}': {e}")))
}

impl QuoteStore for SqliteQuoteStore {
    fn lookup(&self, symbol: &Symbol) -> Result<Option<QuoteRecord>, StoreError> {
        let conn = self.conn.lock()?;
        let row = conn
            .query_row(
                "SELECT symbol, name, price, exchange, exchange_short, type
                 FROM quotes WHERE symbol = ?1",
                params![symbol.as_str()],
                StoredRow::from_row,
            )
            .optional()?;
        drop(conn);

        match row {
            Some(row) => {
                debug!("Store hit for {}", symbol);
                Ok(Some(row.into_record()?))
            }
            None => {
                debug!("Store miss for {}", symbol);
                Ok(None)
            }
        }
    }

    fn upsert(&self, record: &QuoteRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO quotes (symbol, name, price, exchange, exchange_short, type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(symbol) DO UPDATE SET
                name = excluded.name,
                price = excluded.price,
                exchange = excluded.exchange,
                exchange_short = excluded.exchange_short,
                type = excluded.type",
            params![
                record.symbol.as_str(),
                record.name,
                record.price,
                record.exchange,
                record.exchange_short,
                record.instrument_type,
            ],
        )?;
        debug!("Stored quote for {}", record.symbol);
        Ok(())
    }

    fn contains(&self, symbol: &Symbol) -> Result<bool, StoreError> {
        let conn = self.conn.lock()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM quotes WHERE symbol = ?1)",
            params![symbol.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn reset(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction()?;
        tx.execute(DROP_TABLE, [])?;
        tx.execute(CREATE_TABLE, [])?;
        tx.commit()?;
        info!("Quote store reset");
        Ok(())
    }

    fn symbols(&self) -> Result<Vec<Symbol>, StoreError> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare("SELECT symbol FROM quotes ORDER BY symbol ASC")?;
        let raw: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<_>>()?;
        raw.iter().map(|s| restore_symbol(s)).collect()
    }
}
