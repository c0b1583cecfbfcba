//! Shift, preset, and note persistence.

use chrono::{NaiveDate, NaiveTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use shiftcal_core::{Error, Note, Result, Shift, ShiftPreset};
use uuid::Uuid;

use super::{SqliteStore, date, parse_date, parse_time_opt, parse_ts, store_err, time_opt, ts};

fn shift_from_row(row: &Row<'_>) -> rusqlite::Result<Shift> {
    Ok(Shift {
        id: row.get("id")?,
        calendar_id: row.get("calendar_id")?,
        date: parse_date(0, &row.get::<_, String>("date")?)?,
        start_time: parse_time_opt(0, row.get::<_, Option<String>>("start_time")?.as_deref())?,
        end_time: parse_time_opt(0, row.get::<_, Option<String>>("end_time")?.as_deref())?,
        title: row.get("title")?,
        preset_id: row.get("preset_id")?,
        note: row.get("note")?,
        created_by: row.get("created_by")?,
        created_at: parse_ts(0, &row.get::<_, String>("created_at")?)?,
        updated_at: parse_ts(0, &row.get::<_, String>("updated_at")?)?,
    })
}

fn preset_from_row(row: &Row<'_>) -> rusqlite::Result<ShiftPreset> {
    Ok(ShiftPreset {
        id: row.get("id")?,
        calendar_id: row.get("calendar_id")?,
        name: row.get("name")?,
        color: row.get("color")?,
        start_time: parse_time_opt(0, row.get::<_, Option<String>>("start_time")?.as_deref())?,
        end_time: parse_time_opt(0, row.get::<_, Option<String>>("end_time")?.as_deref())?,
        created_at: parse_ts(0, &row.get::<_, String>("created_at")?)?,
    })
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get("id")?,
        calendar_id: row.get("calendar_id")?,
        date: parse_date(0, &row.get::<_, String>("date")?)?,
        text: row.get("text")?,
        updated_at: parse_ts(0, &row.get::<_, String>("updated_at")?)?,
    })
}

/// Caller-supplied shift fields; the store fills ids and timestamps.
#[derive(Debug, Clone)]
pub struct NewShift {
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub title: String,
    pub preset_id: Option<String>,
    pub note: Option<String>,
}

impl SqliteStore {
    pub fn shifts_in_range(
        &self,
        calendar_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Shift>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT * FROM shifts
                 WHERE calendar_id = ?1 AND date >= ?2 AND date <= ?3
                 ORDER BY date, start_time",
            )
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![calendar_id, date(from), date(to)], shift_from_row)
            .map_err(store_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(store_err)
    }

    pub fn create_shift(
        &self,
        calendar_id: &str,
        new: &NewShift,
        created_by: Option<&str>,
    ) -> Result<Shift> {
        let conn = self.conn()?;
        let now = Utc::now();
        let shift = Shift {
            id: Uuid::new_v4().to_string(),
            calendar_id: calendar_id.to_string(),
            date: new.date,
            start_time: new.start_time,
            end_time: new.end_time,
            title: new.title.clone(),
            preset_id: new.preset_id.clone(),
            note: new.note.clone(),
            created_by: created_by.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        conn.execute(
            "INSERT INTO shifts (id, calendar_id, date, start_time, end_time, title, preset_id, note, created_by, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                shift.id,
                shift.calendar_id,
                date(shift.date),
                time_opt(shift.start_time),
                time_opt(shift.end_time),
                shift.title,
                shift.preset_id,
                shift.note,
                shift.created_by,
                ts(shift.created_at),
                ts(shift.updated_at),
            ],
        )
        .map_err(store_err)?;
        Ok(shift)
    }

    /// Update a shift, scoped to its calendar so a valid grant on one
    /// calendar can never reach a shift on another.
    pub fn update_shift(&self, calendar_id: &str, shift_id: &str, new: &NewShift) -> Result<Shift> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE shifts
                 SET date = ?3, start_time = ?4, end_time = ?5, title = ?6, preset_id = ?7, note = ?8, updated_at = ?9
                 WHERE id = ?1 AND calendar_id = ?2",
                params![
                    shift_id,
                    calendar_id,
                    date(new.date),
                    time_opt(new.start_time),
                    time_opt(new.end_time),
                    new.title,
                    new.preset_id,
                    new.note,
                    ts(Utc::now()),
                ],
            )
            .map_err(store_err)?;
        if changed == 0 {
            return Err(Error::InvalidOperation(format!(
                "no shift {shift_id} on this calendar"
            )));
        }
        drop(conn);
        self.shift(calendar_id, shift_id)?
            .ok_or_else(|| Error::Store("updated shift vanished".to_string()))
    }

    pub fn shift(&self, calendar_id: &str, shift_id: &str) -> Result<Option<Shift>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT * FROM shifts WHERE id = ?1 AND calendar_id = ?2",
            params![shift_id, calendar_id],
            shift_from_row,
        )
        .optional()
        .map_err(store_err)
    }

    pub fn delete_shift(&self, calendar_id: &str, shift_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "DELETE FROM shifts WHERE id = ?1 AND calendar_id = ?2",
                params![shift_id, calendar_id],
            )
            .map_err(store_err)?;
        Ok(changed > 0)
    }

    // ==================== Presets ====================

    pub fn presets_for_calendar(&self, calendar_id: &str) -> Result<Vec<ShiftPreset>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT * FROM shift_presets WHERE calendar_id = ?1 ORDER BY name")
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![calendar_id], preset_from_row)
            .map_err(store_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(store_err)
    }

    pub fn create_preset(
        &self,
        calendar_id: &str,
        name: &str,
        color: &str,
        start_time: Option<NaiveTime>,
        end_time: Option<NaiveTime>,
    ) -> Result<ShiftPreset> {
        let conn = self.conn()?;
        let preset = ShiftPreset {
            id: Uuid::new_v4().to_string(),
            calendar_id: calendar_id.to_string(),
            name: name.to_string(),
            color: color.to_string(),
            start_time,
            end_time,
            created_at: Utc::now(),
        };
        conn.execute(
            "INSERT INTO shift_presets (id, calendar_id, name, color, start_time, end_time, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                preset.id,
                preset.calendar_id,
                preset.name,
                preset.color,
                time_opt(preset.start_time),
                time_opt(preset.end_time),
                ts(preset.created_at),
            ],
        )
        .map_err(store_err)?;
        Ok(preset)
    }

    pub fn delete_preset(&self, calendar_id: &str, preset_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "DELETE FROM shift_presets WHERE id = ?1 AND calendar_id = ?2",
                params![preset_id, calendar_id],
            )
            .map_err(store_err)?;
        // Shifts stamped from the preset keep their copied fields.
        conn.execute(
            "UPDATE shifts SET preset_id = NULL WHERE preset_id = ?1 AND calendar_id = ?2",
            params![preset_id, calendar_id],
        )
        .map_err(store_err)?;
        Ok(changed > 0)
    }

    // ==================== Notes ====================

    pub fn notes_in_range(
        &self,
        calendar_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Note>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT * FROM notes
                 WHERE calendar_id = ?1 AND date >= ?2 AND date <= ?3
                 ORDER BY date",
            )
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![calendar_id, date(from), date(to)], note_from_row)
            .map_err(store_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(store_err)
    }

    /// One note per (calendar, day): writing replaces, empty text deletes.
    pub fn put_note(&self, calendar_id: &str, day: NaiveDate, text: &str) -> Result<Option<Note>> {
        let conn = self.conn()?;
        if text.trim().is_empty() {
            conn.execute(
                "DELETE FROM notes WHERE calendar_id = ?1 AND date = ?2",
                params![calendar_id, date(day)],
            )
            .map_err(store_err)?;
            return Ok(None);
        }

        conn.execute(
            "INSERT INTO notes (id, calendar_id, date, text, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (calendar_id, date) DO UPDATE SET text = ?4, updated_at = ?5",
            params![
                Uuid::new_v4().to_string(),
                calendar_id,
                date(day),
                text,
                ts(Utc::now()),
            ],
        )
        .map_err(store_err)?;

        conn.query_row(
            "SELECT * FROM notes WHERE calendar_id = ?1 AND date = ?2",
            params![calendar_id, date(day)],
            note_from_row,
        )
        .optional()
        .map_err(store_err)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::temp_store;
    use super::*;
    use pretty_assertions::assert_eq;

    fn fixture(store: &SqliteStore) -> String {
        let owner = store.create_user("owner", "x").unwrap();
        store
            .create_calendar("Ward A", "#ff0000", Some(&owner.id))
            .unwrap()
            .id
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn new_shift(on: &str, title: &str) -> NewShift {
        NewShift {
            date: day(on),
            start_time: NaiveTime::from_hms_opt(8, 0, 0),
            end_time: NaiveTime::from_hms_opt(16, 0, 0),
            title: title.to_string(),
            preset_id: None,
            note: None,
        }
    }

    #[test]
    fn range_query_is_inclusive() {
        let (_dir, store) = temp_store();
        let calendar_id = fixture(&store);
        for on in ["2026-03-01", "2026-03-15", "2026-03-31", "2026-04-01"] {
            store
                .create_shift(&calendar_id, &new_shift(on, "early"), None)
                .unwrap();
        }

        let march = store
            .shifts_in_range(&calendar_id, day("2026-03-01"), day("2026-03-31"))
            .unwrap();
        assert_eq!(march.len(), 3);
    }

    #[test]
    fn update_is_scoped_to_calendar() {
        let (_dir, store) = temp_store();
        let calendar_id = fixture(&store);
        let other = store.create_calendar("Other", "#00ff00", None).unwrap();
        let shift = store
            .create_shift(&calendar_id, &new_shift("2026-03-01", "early"), None)
            .unwrap();

        let err = store
            .update_shift(&other.id, &shift.id, &new_shift("2026-03-02", "late"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));

        let updated = store
            .update_shift(&calendar_id, &shift.id, &new_shift("2026-03-02", "late"))
            .unwrap();
        assert_eq!(updated.title, "late");
        assert_eq!(updated.date, day("2026-03-02"));
    }

    #[test]
    fn deleting_preset_detaches_shifts() {
        let (_dir, store) = temp_store();
        let calendar_id = fixture(&store);
        let preset = store
            .create_preset(&calendar_id, "Early", "#ff0000", None, None)
            .unwrap();
        let mut shift = new_shift("2026-03-01", "early");
        shift.preset_id = Some(preset.id.clone());
        let shift = store.create_shift(&calendar_id, &shift, None).unwrap();

        assert!(store.delete_preset(&calendar_id, &preset.id).unwrap());
        let detached = store.shift(&calendar_id, &shift.id).unwrap().unwrap();
        assert_eq!(detached.preset_id, None);
        assert_eq!(detached.title, "early");
    }

    #[test]
    fn note_replaces_and_empty_deletes() {
        let (_dir, store) = temp_store();
        let calendar_id = fixture(&store);
        let on = day("2026-03-01");

        store.put_note(&calendar_id, on, "first").unwrap();
        store.put_note(&calendar_id, on, "second").unwrap();
        let notes = store.notes_in_range(&calendar_id, on, on).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].text, "second");

        store.put_note(&calendar_id, on, "  ").unwrap();
        assert!(store.notes_in_range(&calendar_id, on, on).unwrap().is_empty());
    }
}
