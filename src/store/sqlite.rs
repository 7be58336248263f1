//! SQLite-backed repositories.
//!
//! Dates are stored as `YYYY-MM-DD` text so range queries compare
//! lexicographically; timestamps as RFC 3339.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::schema::run_migrations;
use super::{
    EraRepository, EventRepository, PendingEventRepository, StoreError, TagCount, Vocabulary,
};
use crate::domain::{Category, Era, Event, PendingEvent};

const DATE_FMT: &str = "%Y-%m-%d";

/// (label table, link table) pairs for the event many-to-many relations
const TAGS: (&str, &str) = ("tags", "event_tags");
const PEOPLE: (&str, &str) = ("people", "event_people");
const LOCATIONS: (&str, &str) = ("locations", "event_locations");

/// Single-connection SQLite store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a database at `path` and migrate it
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Migrated in-memory database (for tests)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

// ============================================
// Conversions
// ============================================

fn conversion_err<E>(err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(err))
}

fn date_to_sql(date: NaiveDate) -> String {
    date.format(DATE_FMT).to_string()
}

fn parse_date(s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FMT).map_err(conversion_err)
}

fn parse_opt_date(s: Option<String>) -> rusqlite::Result<Option<NaiveDate>> {
    s.as_deref().map(parse_date).transpose()
}

fn parse_timestamp(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(conversion_err)
}

fn parse_uuid(s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(conversion_err)
}

fn parse_category(s: &str) -> rusqlite::Result<Category> {
    s.parse::<Category>().map_err(conversion_err)
}

fn parse_string_list(s: &str) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(s).map_err(conversion_err)
}

// ============================================
// Event rows
// ============================================

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    let id: String = row.get("id")?;
    let start: String = row.get("start_date")?;
    let category: String = row.get("category")?;
    let era_id: Option<String> = row.get("era_id")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Event {
        id: parse_uuid(&id)?,
        title: row.get("title")?,
        description: row.get("description")?,
        start_date: parse_date(&start)?,
        end_date: parse_opt_date(row.get("end_date")?)?,
        category: parse_category(&category)?,
        era_id: era_id.as_deref().map(parse_uuid).transpose()?,
        tags: Vec::new(),
        people: Vec::new(),
        locations: Vec::new(),
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn write_labels(
    conn: &Connection,
    event_id: &str,
    (table, link): (&str, &str),
    names: &[String],
) -> rusqlite::Result<()> {
    conn.execute(
        &format!("DELETE FROM {} WHERE event_id = ?1", link),
        params![event_id],
    )?;

    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        conn.execute(
            &format!("INSERT OR IGNORE INTO {} (name) VALUES (?1)", table),
            params![name],
        )?;
        let label_id: i64 = conn.query_row(
            &format!("SELECT id FROM {} WHERE name = ?1", table),
            params![name],
            |r| r.get(0),
        )?;
        conn.execute(
            &format!("INSERT OR IGNORE INTO {} (event_id, label_id) VALUES (?1, ?2)", link),
            params![event_id, label_id],
        )?;
    }

    Ok(())
}

fn read_labels(conn: &Connection, event_id: &str, (table, link): (&str, &str)) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT t.name FROM {} t JOIN {} l ON l.label_id = t.id WHERE l.event_id = ?1 ORDER BY t.name",
        table, link
    ))?;
    let rows = stmt.query_map(params![event_id], |r| r.get(0))?;
    rows.collect()
}

fn all_labels(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("SELECT name FROM {} ORDER BY name", table))?;
    let rows = stmt.query_map([], |r| r.get(0))?;
    rows.collect()
}

fn attach_labels(conn: &Connection, mut event: Event) -> rusqlite::Result<Event> {
    let id = event.id.to_string();
    event.tags = read_labels(conn, &id, TAGS)?;
    event.people = read_labels(conn, &id, PEOPLE)?;
    event.locations = read_labels(conn, &id, LOCATIONS)?;
    Ok(event)
}

fn write_all_labels(conn: &Connection, event: &Event) -> rusqlite::Result<()> {
    let id = event.id.to_string();
    write_labels(conn, &id, TAGS, &event.tags)?;
    write_labels(conn, &id, PEOPLE, &event.people)?;
    write_labels(conn, &id, LOCATIONS, &event.locations)
}

fn insert_event(conn: &Connection, event: &Event) -> Result<(), StoreError> {
    event.validate()?;

    conn.execute(
        "INSERT INTO events (id, title, description, start_date, end_date, category, era_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            event.id.to_string(),
            event.title,
            event.description,
            date_to_sql(event.start_date),
            event.end_date.map(date_to_sql),
            event.category.as_str(),
            event.era_id.map(|id| id.to_string()),
            event.created_at.to_rfc3339(),
            event.updated_at.to_rfc3339(),
        ],
    )?;
    write_all_labels(conn, event)?;

    Ok(())
}

// ============================================
// Pending rows
// ============================================

fn pending_from_row(row: &Row<'_>) -> rusqlite::Result<PendingEvent> {
    let id: String = row.get("id")?;
    let start: String = row.get("start_date")?;
    let category: Option<String> = row.get("category")?;
    let tags: String = row.get("tags")?;
    let people: String = row.get("people")?;
    let locations: String = row.get("locations")?;
    let created_at: String = row.get("created_at")?;
    let reviewed_at: Option<String> = row.get("reviewed_at")?;

    Ok(PendingEvent {
        id: parse_uuid(&id)?,
        queue_item_id: row.get("queue_item_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        start_date: parse_date(&start)?,
        end_date: parse_opt_date(row.get("end_date")?)?,
        category: category.as_deref().map(parse_category).transpose()?,
        tags: parse_string_list(&tags)?,
        people: parse_string_list(&people)?,
        locations: parse_string_list(&locations)?,
        confidence_score: row.get("confidence_score")?,
        extracted_data_json: row.get("extracted_data_json")?,
        is_approved: row.get("is_approved")?,
        created_at: parse_timestamp(&created_at)?,
        reviewed_at: reviewed_at.as_deref().map(parse_timestamp).transpose()?,
    })
}

fn approved_filter(approved: Option<bool>) -> &'static str {
    match approved {
        Some(true) => " WHERE is_approved = 1",
        Some(false) => " WHERE is_approved = 0",
        None => "",
    }
}

fn era_from_row(row: &Row<'_>) -> rusqlite::Result<Era> {
    let id: String = row.get("id")?;
    let start: String = row.get("start_date")?;

    Ok(Era {
        id: parse_uuid(&id)?,
        name: row.get("name")?,
        start_date: parse_date(&start)?,
        end_date: parse_opt_date(row.get("end_date")?)?,
        color_code: row.get("color_code")?,
        description: row.get("description")?,
    })
}

#[async_trait]
impl EventRepository for SqliteStore {
    async fn add_event(&self, event: &Event) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        insert_event(&tx, event)?;
        tx.commit()?;
        Ok(())
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        let conn = self.conn()?;
        let event = conn
            .query_row(
                "SELECT * FROM events WHERE id = ?1",
                params![id.to_string()],
                event_from_row,
            )
            .optional()?;

        Ok(event.map(|e| attach_labels(&conn, e)).transpose()?)
    }

    async fn update_event(&self, event: &Event) -> Result<(), StoreError> {
        event.validate()?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let changed = tx.execute(
            "UPDATE events SET title = ?2, description = ?3, start_date = ?4, end_date = ?5,
                category = ?6, era_id = ?7, updated_at = ?8
             WHERE id = ?1",
            params![
                event.id.to_string(),
                event.title,
                event.description,
                date_to_sql(event.start_date),
                event.end_date.map(date_to_sql),
                event.category.as_str(),
                event.era_id.map(|id| id.to_string()),
                event.updated_at.to_rfc3339(),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("event {}", event.id)));
        }
        write_all_labels(&tx, event)?;
        tx.commit()?;

        Ok(())
    }

    async fn delete_event(&self, id: Uuid) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM events WHERE id = ?1", params![id.to_string()])?;
        Ok(changed > 0)
    }

    async fn list_events_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Event>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM events
             WHERE start_date <= ?2 AND COALESCE(end_date, start_date) >= ?1
             ORDER BY start_date, created_at",
        )?;
        let events = stmt
            .query_map(params![date_to_sql(start), date_to_sql(end)], event_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let events = events
            .into_iter()
            .map(|e| attach_labels(&conn, e))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    async fn recent_event_titles(&self, limit: usize) -> Result<Vec<String>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT title FROM events ORDER BY created_at DESC LIMIT ?1")?;
        let titles = stmt
            .query_map(params![limit as i64], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(titles)
    }

    async fn vocabulary(&self) -> Result<Vocabulary, StoreError> {
        let conn = self.conn()?;
        Ok(Vocabulary {
            tags: all_labels(&conn, TAGS.0)?,
            people: all_labels(&conn, PEOPLE.0)?,
            locations: all_labels(&conn, LOCATIONS.0)?,
        })
    }

    async fn tag_counts(&self) -> Result<Vec<TagCount>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT t.name, COUNT(l.event_id) AS uses FROM tags t
             LEFT JOIN event_tags l ON l.label_id = t.id
             GROUP BY t.id ORDER BY uses DESC, t.name",
        )?;
        let counts = stmt
            .query_map([], |r| {
                let count: i64 = r.get(1)?;
                Ok(TagCount {
                    name: r.get(0)?,
                    count: count as usize,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(counts)
    }
}

#[async_trait]
impl PendingEventRepository for SqliteStore {
    async fn add_pending(&self, events: &[PendingEvent]) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        for event in events {
            event.validate()?;
            tx.execute(
                "INSERT INTO pending_events (id, queue_item_id, title, description, start_date, end_date,
                    category, tags, people, locations, confidence_score, extracted_data_json,
                    is_approved, created_at, reviewed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    event.id.to_string(),
                    event.queue_item_id,
                    event.title,
                    event.description,
                    date_to_sql(event.start_date),
                    event.end_date.map(date_to_sql),
                    event.category.map(|c| c.as_str()),
                    serde_json::to_string(&event.tags)?,
                    serde_json::to_string(&event.people)?,
                    serde_json::to_string(&event.locations)?,
                    event.confidence_score,
                    event.extracted_data_json,
                    event.is_approved,
                    event.created_at.to_rfc3339(),
                    event.reviewed_at.map(|t| t.to_rfc3339()),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    async fn get_pending(&self, id: Uuid) -> Result<Option<PendingEvent>, StoreError> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                "SELECT * FROM pending_events WHERE id = ?1",
                params![id.to_string()],
                pending_from_row,
            )
            .optional()?)
    }

    async fn update_pending(&self, event: &PendingEvent) -> Result<(), StoreError> {
        event.validate()?;

        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE pending_events SET title = ?2, description = ?3, start_date = ?4, end_date = ?5,
                category = ?6, tags = ?7, people = ?8, locations = ?9, confidence_score = ?10
             WHERE id = ?1 AND is_approved = 0",
            params![
                event.id.to_string(),
                event.title,
                event.description,
                date_to_sql(event.start_date),
                event.end_date.map(date_to_sql),
                event.category.map(|c| c.as_str()),
                serde_json::to_string(&event.tags)?,
                serde_json::to_string(&event.people)?,
                serde_json::to_string(&event.locations)?,
                event.confidence_score,
            ],
        )?;

        if changed == 0 {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM pending_events WHERE id = ?1)",
                params![event.id.to_string()],
                |r| r.get(0),
            )?;
            return Err(if exists {
                StoreError::Conflict(format!("pending event {} is already approved", event.id))
            } else {
                StoreError::NotFound(format!("pending event {}", event.id))
            });
        }

        Ok(())
    }

    async fn delete_pending(&self, id: Uuid) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "DELETE FROM pending_events WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(changed > 0)
    }

    async fn list_pending(&self, approved: Option<bool>) -> Result<Vec<PendingEvent>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT * FROM pending_events{} ORDER BY created_at, start_date",
            approved_filter(approved)
        );
        let mut stmt = conn.prepare(&sql)?;
        let events = stmt
            .query_map([], pending_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    async fn count_pending(&self, approved: Option<bool>) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let sql = format!("SELECT COUNT(*) FROM pending_events{}", approved_filter(approved));
        let count: i64 = conn.query_row(&sql, [], |r| r.get(0))?;
        Ok(count as usize)
    }

    async fn approve_pending(
        &self,
        id: Uuid,
        event: &Event,
        reviewed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let approved: Option<bool> = tx
            .query_row(
                "SELECT is_approved FROM pending_events WHERE id = ?1",
                params![id.to_string()],
                |r| r.get(0),
            )
            .optional()?;

        match approved {
            None => return Err(StoreError::NotFound(format!("pending event {}", id))),
            Some(true) => {
                return Err(StoreError::Conflict(format!(
                    "pending event {} is already approved",
                    id
                )))
            }
            Some(false) => {}
        }

        insert_event(&tx, event)?;
        tx.execute(
            "UPDATE pending_events SET is_approved = 1, reviewed_at = ?2 WHERE id = ?1",
            params![id.to_string(), reviewed_at.to_rfc3339()],
        )?;
        tx.commit()?;

        Ok(())
    }
}

#[async_trait]
impl EraRepository for SqliteStore {
    async fn add_era(&self, era: &Era) -> Result<(), StoreError> {
        era.validate()?;

        let conn = self.conn()?;
        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM eras WHERE name = ?1)",
            params![era.name],
            |r| r.get(0),
        )?;
        if taken {
            return Err(StoreError::Conflict(format!("era name '{}' already exists", era.name)));
        }

        conn.execute(
            "INSERT INTO eras (id, name, start_date, end_date, color_code, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                era.id.to_string(),
                era.name,
                date_to_sql(era.start_date),
                era.end_date.map(date_to_sql),
                era.color_code,
                era.description,
            ],
        )?;
        Ok(())
    }

    async fn get_era(&self, id: Uuid) -> Result<Option<Era>, StoreError> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                "SELECT * FROM eras WHERE id = ?1",
                params![id.to_string()],
                era_from_row,
            )
            .optional()?)
    }

    async fn list_eras(&self) -> Result<Vec<Era>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT * FROM eras ORDER BY start_date, name")?;
        let eras = stmt
            .query_map([], era_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(eras)
    }

    async fn delete_era(&self, id: Uuid) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM eras WHERE id = ?1", params![id.to_string()])?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExtractedEventCandidate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn pending(title: &str) -> PendingEvent {
        let candidate = ExtractedEventCandidate::new(title, date(2023, 4, 2)).with_confidence(0.8);
        PendingEvent::from_candidate(Some("q1".into()), &candidate, Some(Category::Travel)).unwrap()
    }

    #[tokio::test]
    async fn test_event_roundtrip_with_labels() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut event = Event::new("Trip to Japan", date(2023, 4, 2), Category::Travel)
            .with_end_date(date(2023, 4, 16));
        event.tags = vec!["japan".into(), "family".into()];
        event.people = vec!["Ana".into()];

        store.add_event(&event).await.unwrap();
        let loaded = store.get_event(event.id).await.unwrap().unwrap();

        assert_eq!(loaded.title, "Trip to Japan");
        assert_eq!(loaded.end_date, Some(date(2023, 4, 16)));
        assert_eq!(loaded.tags, vec!["family".to_string(), "japan".to_string()]);
        assert_eq!(loaded.people, vec!["Ana".to_string()]);

        let vocab = store.vocabulary().await.unwrap();
        assert_eq!(vocab.tags.len(), 2);

        let mut other = Event::new("Kyoto again", date(2024, 4, 2), Category::Travel);
        other.tags = vec!["Japan".into()];
        store.add_event(&other).await.unwrap();

        let counts = store.tag_counts().await.unwrap();
        assert_eq!(counts[0], TagCount { name: "japan".into(), count: 2 });
    }

    #[tokio::test]
    async fn test_invalid_range_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        let event = Event::new("Backwards", date(2023, 4, 2), Category::Other)
            .with_end_date(date(2023, 4, 1));
        assert!(matches!(store.add_event(&event).await, Err(StoreError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_list_by_date_range_includes_overlaps() {
        let store = SqliteStore::open_in_memory().unwrap();
        let spanning = Event::new("Semester abroad", date(2023, 1, 10), Category::Education)
            .with_end_date(date(2023, 6, 1));
        let inside = Event::new("Birthday", date(2023, 3, 3), Category::Other);
        let outside = Event::new("Later", date(2023, 9, 1), Category::Other);

        for e in [&spanning, &inside, &outside] {
            store.add_event(e).await.unwrap();
        }

        let found = store
            .list_events_by_date_range(date(2023, 3, 1), date(2023, 3, 31))
            .await
            .unwrap();
        let titles: Vec<&str> = found.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Semester abroad", "Birthday"]);
    }

    #[tokio::test]
    async fn test_approve_is_atomic_and_single_shot() {
        let store = SqliteStore::open_in_memory().unwrap();
        let p = pending("Trip to Japan");
        store.add_pending(&[p.clone()]).await.unwrap();

        let event = p.to_event();
        store.approve_pending(p.id, &event, Utc::now()).await.unwrap();

        let again = p.to_event();
        let err = store.approve_pending(p.id, &again, Utc::now()).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store.get_event(again.id).await.unwrap().is_none());

        let stored = store.get_pending(p.id).await.unwrap().unwrap();
        assert!(stored.is_approved);
        assert!(stored.reviewed_at.is_some());
    }

    #[tokio::test]
    async fn test_failed_approve_rolls_back() {
        let store = SqliteStore::open_in_memory().unwrap();
        let p = pending("Trip");
        store.add_pending(&[p.clone()]).await.unwrap();

        // Unknown era violates the foreign key after the flag check
        let mut event = p.to_event();
        event.era_id = Some(Uuid::new_v4());
        assert!(store.approve_pending(p.id, &event, Utc::now()).await.is_err());

        assert!(!store.get_pending(p.id).await.unwrap().unwrap().is_approved);
        assert!(store.get_event(event.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pending_counts() {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = pending("a");
        let b = pending("b");
        store.add_pending(&[a.clone(), b]).await.unwrap();
        store.approve_pending(a.id, &a.to_event(), Utc::now()).await.unwrap();

        assert_eq!(store.count_pending(None).await.unwrap(), 2);
        assert_eq!(store.count_pending(Some(true)).await.unwrap(), 1);
        assert_eq!(store.count_pending(Some(false)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_era_delete_sets_event_era_null() {
        let store = SqliteStore::open_in_memory().unwrap();
        let era = Era::new("College", date(2015, 9, 1), "#aa3300").with_end_date(date(2019, 5, 31));
        store.add_era(&era).await.unwrap();

        let mut event = Event::new("Graduation", date(2019, 5, 20), Category::Education);
        event.era_id = Some(era.id);
        store.add_event(&event).await.unwrap();

        assert!(store.delete_era(era.id).await.unwrap());
        let loaded = store.get_event(event.id).await.unwrap().unwrap();
        assert_eq!(loaded.era_id, None);
    }

    #[tokio::test]
    async fn test_era_names_unique() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.add_era(&Era::new("College", date(2015, 9, 1), "#111111")).await.unwrap();
        let err = store
            .add_era(&Era::new("College", date(2016, 1, 1), "#222222"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
