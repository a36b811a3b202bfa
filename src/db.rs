use crate::ledger::{PairKey, Partnership, PartnershipLedger};
use crate::participant::Participant;
use crate::session::SessionState;
use crate::stations::{Assignment, RoundId};
use anyhow::{Context, Result};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Open (or create) the session database and make sure the schema exists
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database: {:?}", path))?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Roster
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS participants (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            is_paused INTEGER NOT NULL DEFAULT 0,
            sit_out_count INTEGER NOT NULL DEFAULT 0,
            position INTEGER NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Partnership ledger (recent_rounds is a JSON array of round ids)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS partnerships (
            player1_id TEXT NOT NULL,
            player2_id TEXT NOT NULL,
            times_played INTEGER NOT NULL,
            recent_rounds TEXT NOT NULL,
            PRIMARY KEY (player1_id, player2_id)
        )",
        [],
    )?;

    // ==========================================================================
    // Station assignments (player_ids is a JSON array, team A first)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS station_assignments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            round_id INTEGER NOT NULL,
            station_number INTEGER NOT NULL,
            player_ids TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_assignments_round ON station_assignments(round_id)",
        [],
    )?;

    // ==========================================================================
    // Session metadata (latest_round survives rounds that left no rows)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS session_meta (
            key TEXT PRIMARY KEY,
            value INTEGER NOT NULL
        )",
        [],
    )?;

    Ok(())
}

/// Replace everything stored with `state`, atomically
pub fn save_state(conn: &Connection, state: &SessionState) -> Result<()> {
    let tx = conn
        .unchecked_transaction()
        .context("Failed to begin save transaction")?;

    tx.execute("DELETE FROM participants", [])?;
    tx.execute("DELETE FROM partnerships", [])?;
    tx.execute("DELETE FROM station_assignments", [])?;
    tx.execute("DELETE FROM session_meta", [])?;

    for (position, p) in state.participants.iter().enumerate() {
        tx.execute(
            "INSERT INTO participants (id, name, is_active, is_paused, sit_out_count, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                p.id,
                p.name,
                p.is_active,
                p.is_paused,
                p.sit_out_count,
                position as i64,
            ],
        )?;
    }

    for (key, partnership) in state.ledger.iter() {
        let recent_json = serde_json::to_string(&partnership.recent_rounds)?;
        tx.execute(
            "INSERT INTO partnerships (player1_id, player2_id, times_played, recent_rounds)
             VALUES (?1, ?2, ?3, ?4)",
            params![key.first(), key.second(), partnership.times_played, recent_json],
        )?;
    }

    for row in &state.assignments {
        let ids_json = serde_json::to_string(&row.player_ids)?;
        tx.execute(
            "INSERT INTO station_assignments (round_id, station_number, player_ids)
             VALUES (?1, ?2, ?3)",
            params![row.round_id.as_i64(), row.station_number as i64, ids_json],
        )?;
    }

    if let Some(round_id) = state.latest_round {
        tx.execute(
            "INSERT INTO session_meta (key, value) VALUES ('latest_round', ?1)",
            params![round_id.as_i64()],
        )?;
    }

    tx.commit().context("Failed to commit session state")?;
    Ok(())
}

/// Load the stored session (empty state on a fresh database)
pub fn load_state(conn: &Connection) -> Result<SessionState> {
    Ok(SessionState {
        participants: get_participants(conn)?,
        ledger: get_ledger(conn)?,
        assignments: get_assignments(conn)?,
        latest_round: get_latest_round(conn)?,
    })
}

pub fn get_latest_round(conn: &Connection) -> Result<Option<RoundId>> {
    let value: Option<i64> = conn
        .query_row(
            "SELECT value FROM session_meta WHERE key = 'latest_round'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    Ok(value.map(RoundId))
}

pub fn get_participants(conn: &Connection) -> Result<Vec<Participant>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, is_active, is_paused, sit_out_count
         FROM participants
         ORDER BY position ASC",
    )?;

    let participants = stmt
        .query_map([], |row| {
            Ok(Participant {
                id: row.get(0)?,
                name: row.get(1)?,
                is_active: row.get(2)?,
                is_paused: row.get(3)?,
                sit_out_count: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(participants)
}

pub fn get_ledger(conn: &Connection) -> Result<PartnershipLedger> {
    let mut stmt = conn.prepare(
        "SELECT player1_id, player2_id, times_played, recent_rounds FROM partnerships",
    )?;

    let entries = stmt
        .query_map([], |row| {
            let a: String = row.get(0)?;
            let b: String = row.get(1)?;
            let recent_json: String = row.get(3)?;
            let recent_rounds: Vec<RoundId> = serde_json::from_str(&recent_json)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

            Ok((
                PairKey::new(&a, &b),
                Partnership {
                    times_played: row.get(2)?,
                    recent_rounds,
                },
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PartnershipLedger::from_entries(entries))
}

pub fn get_assignments(conn: &Connection) -> Result<Vec<Assignment>> {
    let mut stmt = conn.prepare(
        "SELECT round_id, station_number, player_ids
         FROM station_assignments
         ORDER BY round_id ASC, station_number ASC",
    )?;

    let rows = stmt
        .query_map([], |row| {
            let round_id: i64 = row.get(0)?;
            let station_number: i64 = row.get(1)?;
            let ids_json: String = row.get(2)?;
            let player_ids: Vec<String> = serde_json::from_str(&ids_json)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

            Ok(Assignment {
                station_number: station_number as usize,
                round_id: RoundId(round_id),
                player_ids,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}
