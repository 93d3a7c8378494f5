//! Image record persistence.

use super::{Database, db_err};
use crate::errors::{BakeError, BakeResult};
use crate::images::{ImageRecord, ImageRef};
use rusqlite::OptionalExtension;

/// Store for built image records.
#[derive(Clone)]
pub struct ImageStore {
    db: Database,
}

impl ImageStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert or replace the record for its reference.
    pub fn save(&self, record: &ImageRecord) -> BakeResult<()> {
        let blob = serde_json::to_string(record)
            .map_err(|e| BakeError::Internal(format!("image record serialization: {}", e)))?;
        let conn = self.db.conn();
        db_err!(conn.execute(
            "INSERT OR REPLACE INTO images (reference, id, digest, created_at, record)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                record.reference.to_string(),
                record.id.as_str(),
                record.digest,
                record.created_at.to_rfc3339(),
                blob,
            ],
        ))?;
        Ok(())
    }

    pub fn get_by_reference(&self, reference: &ImageRef) -> BakeResult<Option<ImageRecord>> {
        let conn = self.db.conn();
        let blob: Option<String> = db_err!(
            conn.query_row(
                "SELECT record FROM images WHERE reference = ?1",
                [reference.to_string()],
                |row| row.get(0),
            )
            .optional()
        )?;
        blob.map(|b| deserialize_record(&b)).transpose()
    }

    /// All records, newest first.
    pub fn list(&self) -> BakeResult<Vec<ImageRecord>> {
        let conn = self.db.conn();
        let mut stmt = db_err!(conn.prepare(
            "SELECT record FROM images ORDER BY created_at DESC, reference ASC"
        ))?;
        let rows = db_err!(stmt.query_map([], |row| row.get::<_, String>(0)))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(deserialize_record(&db_err!(row)?)?);
        }
        Ok(records)
    }

    /// Delete by reference. Returns whether a row was removed.
    pub fn remove(&self, reference: &ImageRef) -> BakeResult<bool> {
        let conn = self.db.conn();
        let changed = db_err!(conn.execute(
            "DELETE FROM images WHERE reference = ?1",
            [reference.to_string()],
        ))?;
        Ok(changed > 0)
    }
}

fn deserialize_record(blob: &str) -> BakeResult<ImageRecord> {
    serde_json::from_str(blob)
        .map_err(|e| BakeError::Database(format!("corrupt image record: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::{ImageConfig, ImageId, LayerKey, LayerRecord};
    use chrono::Utc;

    fn record(reference: &str) -> ImageRecord {
        let key = LayerKey::derive(None, reference);
        ImageRecord {
            id: ImageId::new(),
            reference: ImageRef::parse(reference).unwrap(),
            digest: format!("sha256:{}", key.as_hex()),
            base_digest: "sha256:base".into(),
            config: ImageConfig {
                env: vec!["PATH=/usr/bin".into()],
                workdir: Some("/app".into()),
                cmd: vec!["python".into(), "main.py".into()],
            },
            layers: vec![LayerRecord {
                key,
                instruction: "FROM test".into(),
                cached: false,
                duration_ms: 3,
            }],
            created_at: Utc::now(),
        }
    }

    fn store() -> (tempfile::TempDir, ImageStore) {
        let tmp = tempfile::tempdir().unwrap();
        let db = Database::open(&tmp.path().join("meta.db")).unwrap();
        (tmp, ImageStore::new(db))
    }

    #[test]
    fn test_save_and_get_round_trip() {
        let (_tmp, store) = store();
        let rec = record("app:v1");
        store.save(&rec).unwrap();

        let loaded = store
            .get_by_reference(&ImageRef::parse("app:v1").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(loaded.digest, rec.digest);
        assert_eq!(loaded.config.cmd, vec!["python", "main.py"]);
        assert_eq!(loaded.layers.len(), 1);
    }

    #[test]
    fn test_save_replaces_same_reference() {
        let (_tmp, store) = store();
        store.save(&record("app")).unwrap();
        let second = record("app");
        store.save(&second).unwrap();

        let all = store.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, second.id);
    }

    #[test]
    fn test_remove_reports_missing() {
        let (_tmp, store) = store();
        let reference = ImageRef::parse("ghost").unwrap();
        assert!(!store.remove(&reference).unwrap());

        store.save(&record("ghost")).unwrap();
        assert!(store.remove(&reference).unwrap());
        assert!(store.get_by_reference(&reference).unwrap().is_none());
    }
}
