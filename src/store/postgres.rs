/// PostgreSQL observation store
///
/// Each observation is kept as a JSONB document alongside its natural key
/// columns, which carry the unique index that makes upserts possible:
///
///   obs_date DATE, hour SMALLINT, station TEXT, document JSONB,
///   UNIQUE (obs_date, hour, station)
///
/// A connection is opened for each operation and closed when it returns,
/// error paths included. A batch is written inside one transaction, so a
/// failed write leaves nothing behind.

use chrono::NaiveDate;
use postgres::error::SqlState;
use postgres::{Client, NoTls};
use serde_json::Value;

use crate::logging::{self, Component};
use crate::model::{NATURAL_KEY, StoreError};
use crate::store::{FlatRecord, ObservationStore, natural_key};

pub struct PostgresStore {
    database_url: String,
    table: String,
}

/// One record ready to bind: key columns plus the whole document.
struct Row {
    date: NaiveDate,
    hour: i16,
    station: String,
    document: Value,
}

impl PostgresStore {
    /// `table` must already be a valid (optionally schema-qualified)
    /// identifier; configuration loading checks this.
    pub fn new(database_url: &str, table: &str) -> Self {
        Self {
            database_url: database_url.to_string(),
            table: table.to_string(),
        }
    }

    fn connect(&self) -> Result<Client, StoreError> {
        Client::connect(&self.database_url, NoTls)
            .map_err(|e| StoreError::Unavailable(format!("connect failed: {}", e)))
    }

    /// Open a connection and ping the server.
    pub fn connect_and_verify(&self) -> Result<(), StoreError> {
        let mut client = self.connect()?;
        client
            .simple_query("SELECT 1")
            .map_err(|e| StoreError::Unavailable(format!("ping failed: {}", e)))?;
        logging::info(Component::Store, None, "Database reachable");
        Ok(())
    }

    /// Create the observation table (and its schema) if missing.
    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        let mut client = self.connect()?;
        client
            .batch_execute(&self.schema_sql())
            .map_err(|e| StoreError::Unavailable(format!("schema setup failed: {}", e)))?;
        logging::info(Component::Store, None, &format!("Table {} ready", self.table));
        Ok(())
    }

    fn schema_sql(&self) -> String {
        let schema = match self.table.split_once('.') {
            Some((schema, _)) => format!("CREATE SCHEMA IF NOT EXISTS {};\n", schema),
            None => String::new(),
        };
        format!(
            "{}CREATE TABLE IF NOT EXISTS {} (
                id          BIGSERIAL PRIMARY KEY,
                obs_date    DATE NOT NULL,
                hour        SMALLINT NOT NULL CHECK (hour BETWEEN 1 AND 24),
                station     TEXT NOT NULL,
                document    JSONB NOT NULL,
                inserted_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
                UNIQUE (obs_date, hour, station)
            );",
            schema, self.table
        )
    }

    fn insert_sql(&self, upsert: bool) -> String {
        let insert = format!(
            "INSERT INTO {} (obs_date, hour, station, document) VALUES ($1, $2, $3, $4)",
            self.table
        );
        if upsert {
            format!(
                "{} ON CONFLICT (obs_date, hour, station) \
                 DO UPDATE SET document = EXCLUDED.document, updated_at = now()",
                insert
            )
        } else {
            insert
        }
    }

    fn prepare_rows(batch: &[FlatRecord]) -> Result<Vec<Row>, StoreError> {
        batch
            .iter()
            .map(|record| {
                let (date, hour, station) = natural_key(record)?;
                Ok(Row {
                    date,
                    hour: i16::from(hour),
                    station,
                    document: Value::Object(record.clone()),
                })
            })
            .collect()
    }
}

/// The only unique index is the natural key, so an upsert must name
/// exactly those fields.
fn check_key_fields(key_fields: &[&str]) -> Result<bool, StoreError> {
    if key_fields.is_empty() {
        return Ok(false);
    }
    let mut wanted: Vec<&str> = key_fields.to_vec();
    let mut natural: Vec<&str> = NATURAL_KEY.to_vec();
    wanted.sort_unstable();
    wanted.dedup();
    natural.sort_unstable();
    if wanted != natural {
        return Err(StoreError::UnsupportedKey(format!(
            "{:?} (only {:?} is indexed)",
            key_fields, NATURAL_KEY
        )));
    }
    Ok(true)
}

impl ObservationStore for PostgresStore {
    fn upsert(&mut self, batch: &[FlatRecord], key_fields: &[&str]) -> Result<usize, StoreError> {
        let upsert = check_key_fields(key_fields)?;
        let rows = Self::prepare_rows(batch)?;

        let mut client = self.connect()?;
        let mut tx = client
            .transaction()
            .map_err(|e| StoreError::Unavailable(format!("begin failed: {}", e)))?;
        let statement = tx
            .prepare(&self.insert_sql(upsert))
            .map_err(|e| StoreError::Unavailable(format!("prepare failed: {}", e)))?;

        for row in &rows {
            tx.execute(&statement, &[&row.date, &row.hour, &row.station, &row.document])
                .map_err(|e| {
                    if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                        StoreError::WriteConflict(format!(
                            "{} {} {}",
                            row.date.format(crate::model::DATE_FORMAT),
                            row.hour,
                            row.station
                        ))
                    } else {
                        StoreError::Unavailable(format!("write failed: {}", e))
                    }
                })?;
        }

        tx.commit()
            .map_err(|e| StoreError::Unavailable(format!("commit failed: {}", e)))?;

        logging::debug(
            Component::Store,
            None,
            &format!("Wrote {} documents to {}", rows.len(), self.table),
        );
        Ok(rows.len())
    }

    fn find(&mut self, date: NaiveDate, hour: u8) -> Result<Vec<FlatRecord>, StoreError> {
        let mut client = self.connect()?;
        let query = format!(
            "SELECT document FROM {} WHERE obs_date = $1 AND hour = $2 ORDER BY station",
            self.table
        );
        let rows = client
            .query(&query, &[&date, &i16::from(hour)])
            .map_err(|e| StoreError::Unavailable(format!("query failed: {}", e)))?;

        rows.iter()
            .map(|row| match row.get::<_, Value>(0) {
                Value::Object(map) => Ok(map),
                other => Err(StoreError::InvalidRecord(format!("stored document is not an object: {}", other))),
            })
            .collect()
    }
}
