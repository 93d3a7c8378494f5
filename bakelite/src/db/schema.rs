//! Database schema definitions.

pub const SCHEMA_VERSION: i32 = 1;

const SCHEMA_VERSION_TABLE: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    updated_at TEXT NOT NULL
);
";

/// Images: one row per registered reference, full record as a JSON blob.
const IMAGES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS images (
    reference TEXT PRIMARY KEY,
    id TEXT NOT NULL,
    digest TEXT NOT NULL,
    created_at TEXT NOT NULL,
    record TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_images_digest ON images(digest);
";

pub fn all_schemas() -> &'static [&'static str] {
    &[SCHEMA_VERSION_TABLE, IMAGES_TABLE]
}
