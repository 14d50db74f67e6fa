//! SQLite result store for sessions, scenario runs and logs

use crate::types::{
    LogEntry, LogLevel, ScenarioRun, ScenarioRunId, ScenarioStatus, Session, SessionDetail,
    SessionId, ScenarioDetail,
};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Database wrapper for result persistence
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.init_schema()?;

        info!("Opened database at {:?}", path.as_ref());
        Ok(db)
    }

    /// Open in-memory database (for testing)
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            -- One batch execution
            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                server TEXT NOT NULL DEFAULT '',
                executed_apps TEXT NOT NULL DEFAULT '',
                start_time TEXT NOT NULL,
                end_time TEXT
            );

            -- One executed scenario instance
            CREATE TABLE IF NOT EXISTS scenarios (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                scenario_name TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT,
                status TEXT NOT NULL DEFAULT 'unknown'
            );
            CREATE INDEX IF NOT EXISTS idx_scenarios_session ON scenarios(session_id);
            CREATE INDEX IF NOT EXISTS idx_scenarios_name ON scenarios(session_id, scenario_name);

            -- Step-level diagnostics
            CREATE TABLE IF NOT EXISTS logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                scenario_id INTEGER NOT NULL REFERENCES scenarios(id) ON DELETE CASCADE,
                level TEXT NOT NULL DEFAULT 'info',
                text TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_logs_scenario ON logs(scenario_id);
            "#,
        )?;

        debug!("Database schema initialized");
        Ok(())
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    /// Open a new session for the given environment key
    pub fn create_session(&self, server: &str) -> Result<Session> {
        let conn = self.conn.lock();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO sessions (server, executed_apps, start_time) VALUES (?1, '', ?2)",
            params![server, now],
        )?;

        let id = conn.last_insert_rowid();
        debug!("Created session {} for {}", id, server);
        Ok(Session {
            id,
            server: server.to_string(),
            executed_apps: String::new(),
            start_time: now,
            end_time: None,
        })
    }

    /// Record the touched modules and stamp `end_time`; only once per session
    pub fn finalize_session(&self, id: SessionId, executed_apps: &str) -> Result<Session> {
        let conn = self.conn.lock();
        let start: DateTime<Utc> = conn
            .query_row(
                "SELECT start_time FROM sessions WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| not_found("session", id))?;
        let end = Utc::now().max(start);

        let rows = conn.execute(
            "UPDATE sessions SET executed_apps = ?1, end_time = ?2 WHERE id = ?3 AND end_time IS NULL",
            params![executed_apps, end, id],
        )?;
        if rows == 0 {
            return Err(Error::InvalidStateTransition {
                from: "finalized".to_string(),
                to: "finalized".to_string(),
            });
        }

        debug!("Finalized session {} ({})", id, executed_apps);
        conn.query_row(
            "SELECT id, server, executed_apps, start_time, end_time FROM sessions WHERE id = ?1",
            params![id],
            session_from_row,
        )
        .map_err(Error::from)
    }

    /// Get a session by ID
    pub fn get_session(&self, id: SessionId) -> Result<Option<Session>> {
        let conn = self.conn.lock();
        let session = conn
            .query_row(
                "SELECT id, server, executed_apps, start_time, end_time FROM sessions WHERE id = ?1",
                params![id],
                session_from_row,
            )
            .optional()?;
        Ok(session)
    }

    /// Most recently created session
    pub fn latest_session(&self) -> Result<Option<Session>> {
        let conn = self.conn.lock();
        let session = conn
            .query_row(
                "SELECT id, server, executed_apps, start_time, end_time FROM sessions
                 ORDER BY id DESC LIMIT 1",
                [],
                session_from_row,
            )
            .optional()?;
        Ok(session)
    }

    /// List sessions, newest first
    pub fn list_sessions(&self, limit: usize) -> Result<Vec<Session>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, server, executed_apps, start_time, end_time FROM sessions
             ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], session_from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Delete a session together with its scenario runs and logs
    pub fn delete_session(&self, id: SessionId) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;

        if rows > 0 {
            debug!("Deleted session {}", id);
        }
        Ok(rows > 0)
    }

    // ========================================================================
    // Scenario runs
    // ========================================================================

    /// Create a run record in `unknown` state
    pub fn create_scenario_run(&self, session_id: SessionId, scenario_name: &str) -> Result<ScenarioRun> {
        let conn = self.conn.lock();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO scenarios (session_id, scenario_name, start_time, status)
             VALUES (?1, ?2, ?3, ?4)",
            params![session_id, scenario_name, now, ScenarioStatus::Unknown.as_str()],
        )?;

        let id = conn.last_insert_rowid();
        debug!("Created scenario run {} ({}) in session {}", id, scenario_name, session_id);
        Ok(ScenarioRun {
            id,
            session_id,
            scenario_name: scenario_name.to_string(),
            start_time: now,
            end_time: None,
            status: ScenarioStatus::Unknown,
        })
    }

    /// Move a run from `unknown` into a terminal status
    pub fn set_scenario_status(&self, id: ScenarioRunId, status: ScenarioStatus) -> Result<()> {
        if !status.is_terminal() {
            return Err(Error::InvalidStateTransition {
                from: ScenarioStatus::Unknown.to_string(),
                to: status.to_string(),
            });
        }

        let conn = self.conn.lock();
        let rows = conn.execute(
            "UPDATE scenarios SET status = ?1 WHERE id = ?2 AND status = 'unknown'",
            params![status.as_str(), id],
        )?;
        if rows > 0 {
            return Ok(());
        }

        let current: Option<String> = conn
            .query_row("SELECT status FROM scenarios WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;
        match current {
            Some(from) => Err(Error::InvalidStateTransition {
                from,
                to: status.to_string(),
            }),
            None => Err(not_found("scenario", id)),
        }
    }

    /// Stamp `end_time` on a run; a second call keeps the first stamp
    pub fn finalize_scenario_run(&self, id: ScenarioRunId) -> Result<ScenarioRun> {
        let conn = self.conn.lock();
        let start: DateTime<Utc> = conn
            .query_row(
                "SELECT start_time FROM scenarios WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| not_found("scenario", id))?;
        let end = Utc::now().max(start);

        conn.execute(
            "UPDATE scenarios SET end_time = ?1 WHERE id = ?2 AND end_time IS NULL",
            params![end, id],
        )?;

        conn.query_row(
            "SELECT id, session_id, scenario_name, start_time, end_time, status
             FROM scenarios WHERE id = ?1",
            params![id],
            scenario_from_row,
        )
        .map_err(Error::from)
    }

    /// Mark the first unfinished run with this name as `error`.
    ///
    /// Returns false when no run in `unknown` state matched.
    pub fn fail_unfinished_run(&self, session_id: SessionId, scenario_name: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let now = Utc::now();
        let rows = conn.execute(
            "UPDATE scenarios SET status = 'error', end_time = COALESCE(end_time, MAX(start_time, ?1))
             WHERE id = (
                SELECT id FROM scenarios
                WHERE session_id = ?2 AND scenario_name = ?3 AND status = 'unknown'
                ORDER BY id LIMIT 1
             )",
            params![now, session_id, scenario_name],
        )?;
        Ok(rows > 0)
    }

    /// Get a scenario run by ID
    pub fn get_scenario_run(&self, id: ScenarioRunId) -> Result<Option<ScenarioRun>> {
        let conn = self.conn.lock();
        let run = conn
            .query_row(
                "SELECT id, session_id, scenario_name, start_time, end_time, status
                 FROM scenarios WHERE id = ?1",
                params![id],
                scenario_from_row,
            )
            .optional()?;
        Ok(run)
    }

    /// List the runs of a session in creation order
    pub fn list_scenario_runs(&self, session_id: SessionId) -> Result<Vec<ScenarioRun>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, session_id, scenario_name, start_time, end_time, status
             FROM scenarios WHERE session_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![session_id], scenario_from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    // ========================================================================
    // Logs
    // ========================================================================

    /// Append a log line to a run
    pub fn add_log(&self, scenario_id: ScenarioRunId, level: LogLevel, text: &str) -> Result<LogEntry> {
        let conn = self.conn.lock();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO logs (scenario_id, level, text, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![scenario_id, level.as_str(), text, now],
        )?;

        Ok(LogEntry {
            id: conn.last_insert_rowid(),
            scenario_id,
            level,
            text: text.to_string(),
            created_at: now,
        })
    }

    /// List the logs of a run in insertion order
    pub fn list_logs(&self, scenario_id: ScenarioRunId) -> Result<Vec<LogEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, scenario_id, level, text, created_at FROM logs
             WHERE scenario_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![scenario_id], log_from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Load a session with its runs and their logs
    pub fn session_detail(&self, id: SessionId) -> Result<Option<SessionDetail>> {
        let Some(session) = self.get_session(id)? else {
            return Ok(None);
        };

        let mut scenarios = Vec::new();
        for run in self.list_scenario_runs(id)? {
            let logs = self.list_logs(run.id)?;
            scenarios.push(ScenarioDetail { run, logs });
        }

        Ok(Some(SessionDetail { session, scenarios }))
    }
}

fn not_found(kind: &str, id: i64) -> Error {
    Error::NotFound {
        kind: kind.to_string(),
        id: id.to_string(),
    }
}

fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        server: row.get(1)?,
        executed_apps: row.get(2)?,
        start_time: row.get(3)?,
        end_time: row.get(4)?,
    })
}

fn scenario_from_row(row: &Row<'_>) -> rusqlite::Result<ScenarioRun> {
    Ok(ScenarioRun {
        id: row.get(0)?,
        session_id: row.get(1)?,
        scenario_name: row.get(2)?,
        start_time: row.get(3)?,
        end_time: row.get(4)?,
        status: parse_column(row, 5)?,
    })
}

fn log_from_row(row: &Row<'_>) -> rusqlite::Result<LogEntry> {
    Ok(LogEntry {
        id: row.get(0)?,
        scenario_id: row.get(1)?,
        level: parse_column(row, 2)?,
        text: row.get(3)?,
        created_at: row.get(4)?,
    })
}
