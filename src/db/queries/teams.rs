use crate::models::Team;
use rusqlite::{Connection, OptionalExtension};

pub fn list_teams(conn: &Connection) -> rusqlite::Result<Vec<Team>> {
    let mut stmt = conn.prepare("SELECT id, name FROM teams ORDER BY name")?;

    let teams = stmt
        .query_map([], |row| {
            Ok(Team {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .filter_map(|t| t.ok())
        .collect();

    Ok(teams)
}

pub fn get_team(conn: &Connection, id: i64) -> rusqlite::Result<Option<Team>> {
    conn.query_row("SELECT id, name FROM teams WHERE id = ?", [id], |row| {
        Ok(Team {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })
    .optional()
}
