// src/db.rs
//! SQLite-backed durable state: cursor, window contents, last alert key.
//! One write transaction per cycle; reads degrade to the empty default.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use crate::error::MonitorError;
use crate::models::{OutflowRecord, PersistentState};

const INIT_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS monitor_state (
  id               INTEGER PRIMARY KEY CHECK (id = 1),
  anchor_signature TEXT,
  last_alert_key   TEXT
);

CREATE TABLE IF NOT EXISTS window_outflows (
  position    INTEGER PRIMARY KEY,
  signature   TEXT NOT NULL,
  destination TEXT NOT NULL,
  lamports    INTEGER NOT NULL,
  observed_at TEXT NOT NULL
);
"#;

/// Connect to SQLite (WAL mode, same as every other writer in this family).
pub fn connect(path: &str) -> Result<Connection, MonitorError> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    Ok(conn)
}

/// Run schema migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), MonitorError> {
    conn.execute_batch(INIT_SQL)?;
    Ok(())
}

/// Replace the whole durable record in one transaction. `position` 0 is the
/// newest window entry, matching in-memory order.
pub fn save_state(conn: &mut Connection, state: &PersistentState) -> Result<(), MonitorError> {
    let tx = conn.transaction()?;

    tx.execute(
        r#"
        INSERT INTO monitor_state (id, anchor_signature, last_alert_key)
        VALUES (1, ?1, ?2)
        ON CONFLICT(id) DO UPDATE SET
            anchor_signature = excluded.anchor_signature,
            last_alert_key   = excluded.last_alert_key
        "#,
        params![state.anchor, state.last_alert_key],
    )?;

    tx.execute("DELETE FROM window_outflows", [])?;
    for (position, record) in state.window.iter().enumerate() {
        tx.execute(
            r#"
            INSERT INTO window_outflows (position, signature, destination, lamports, observed_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                position as i64,
                record.signature,
                record.destination,
                record.lamports as i64,
                record.observed_at.to_rfc3339(),
            ],
        )?;
    }

    tx.commit()?;
    Ok(())
}

/// Load the durable record; an absent row means a fresh deployment.
pub fn load_state(conn: &Connection) -> Result<PersistentState, MonitorError> {
    let head: Option<(Option<String>, Option<String>)> = conn
        .query_row(
            "SELECT anchor_signature, last_alert_key FROM monitor_state WHERE id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (anchor, last_alert_key) = head.unwrap_or((None, None));

    let mut stmt = conn.prepare(
        r#"
        SELECT signature, destination, lamports, observed_at
        FROM window_outflows
        ORDER BY position ASC
        "#,
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    let mut window = Vec::new();
    for row in rows {
        let (signature, destination, lamports, observed) = row?;
        let observed_at = DateTime::parse_from_rfc3339(&observed)
            .map_err(|e| MonitorError::Decode(format!("bad observed_at '{observed}': {e}")))?
            .with_timezone(&Utc);
        window.push(OutflowRecord {
            signature,
            destination,
            lamports: lamports as u64,
            observed_at,
        });
    }

    Ok(PersistentState {
        anchor,
        window,
        last_alert_key,
    })
}

/// Read policy from the error table: any load failure degrades to the empty
/// default, which re-triggers warm-up at the accepted cost of the window.
pub fn load_state_or_default(conn: &Connection) -> PersistentState {
    match load_state(conn) {
        Ok(state) => state,
        Err(e) => {
            warn!("state load failed, starting from empty default: {e}");
            PersistentState::default()
        }
    }
}
