//! Database schema definitions.

/// Main schema SQL for initializing the catalog database.
pub const SCHEMA: &str = r#"
-- Products table
CREATE TABLE IF NOT EXISTS products (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    product_data TEXT DEFAULT '{}',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- FTS5 virtual table for lexical search over titles
CREATE VIRTUAL TABLE IF NOT EXISTS products_fts USING fts5(
    title,
    content=products,
    content_rowid=rowid
);

-- Triggers to keep FTS5 in sync with the products table
CREATE TRIGGER IF NOT EXISTS products_ai AFTER INSERT ON products BEGIN
    INSERT INTO products_fts(rowid, title) VALUES (NEW.rowid, NEW.title);
END;

CREATE TRIGGER IF NOT EXISTS products_ad AFTER DELETE ON products BEGIN
    INSERT INTO products_fts(products_fts, rowid, title) VALUES ('delete', OLD.rowid, OLD.title);
END;

CREATE TRIGGER IF NOT EXISTS products_au AFTER UPDATE ON products BEGIN
    INSERT INTO products_fts(products_fts, rowid, title) VALUES ('delete', OLD.rowid, OLD.title);
    INSERT INTO products_fts(rowid, title) VALUES (NEW.rowid, NEW.title);
END;
"#;

/// Schema for the sqlite-vec virtual table. The embedding dimension comes
/// from configuration, so the table is created from this template after
/// loading the extension.
pub fn vec_schema(dimension: usize) -> String {
    format!(
        r#"
CREATE VIRTUAL TABLE IF NOT EXISTS vec_products USING vec0(
    product_id TEXT PRIMARY KEY,
    embedding float[{dimension}] distance_metric=cosine
);
"#
    )
}

/// Schema version for migrations.
pub const SCHEMA_VERSION: u32 = 1;
