//! SQLite-backed product store.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection, OpenFlags};
use tracing::{debug, info, warn};

use shopsearch_core::{Candidate, Lane, Product, ProductStore, Result, SearchError};

use crate::schema::{vec_schema, SCHEMA};

/// SQLite-based product store.
///
/// Uses a blocking Mutex for thread-safe access; the ANN lane is served by
/// the sqlite-vec extension, the lexical lane by FTS5 over product titles.
pub struct SqliteProductStore {
    /// Connection wrapped in blocking Mutex.
    conn: Arc<Mutex<Connection>>,

    /// Embedding dimension the vec table was created with.
    dimension: usize,

    /// Whether sqlite-vec extension is loaded.
    vec_enabled: bool,
}

// Manually implement Send + Sync since Connection is protected by Mutex
unsafe impl Send for SqliteProductStore {}
unsafe impl Sync for SqliteProductStore {}

impl SqliteProductStore {
    /// Open or create a catalog database at the given path.
    pub fn open(path: impl AsRef<Path>, dimension: usize) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| SearchError::store(format!("Failed to open database: {}", e)))?;

        Self::init(conn, dimension, path)
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory(dimension: usize) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SearchError::store(format!("Failed to open in-memory database: {}", e)))?;

        Self::init(conn, dimension, Path::new(":memory:"))
    }

    /// Initialize the store with a connection.
    fn init(conn: Connection, dimension: usize, path: &Path) -> Result<Self> {
        Self::configure_connection(&conn)?;

        conn.execute_batch(SCHEMA)
            .map_err(|e| SearchError::store(format!("Failed to initialize schema: {}", e)))?;

        let vec_enabled = Self::try_load_vec_extension(&conn);

        if vec_enabled {
            conn.execute_batch(&vec_schema(dimension))
                .map_err(|e| SearchError::store(format!("Failed to create vec table: {}", e)))?;
            info!("sqlite-vec extension loaded successfully");
        } else {
            warn!("sqlite-vec extension not available - ANN lane disabled");
        }

        info!("Catalog database opened at {:?}", path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            dimension,
            vec_enabled,
        })
    }

    /// Configure SQLite connection for optimal performance.
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;
            PRAGMA busy_timeout = 30000;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
            "#,
        )
        .map_err(|e| SearchError::store(format!("Failed to configure connection: {}", e)))?;

        Ok(())
    }

    /// Try to load the sqlite-vec extension.
    fn try_load_vec_extension(conn: &Connection) -> bool {
        // Try common extension paths
        let paths = [
            "vec0",
            "libsqlite_vec",
            "/usr/local/lib/libsqlite_vec",
            "/opt/homebrew/lib/libsqlite_vec",
        ];

        unsafe {
            if conn.load_extension_enable().is_err() {
                return false;
            }

            for path in paths {
                if conn.load_extension(path, None).is_ok() {
                    let _ = conn.load_extension_disable();
                    return true;
                }
            }

            let _ = conn.load_extension_disable();
        }

        false
    }

    /// Check if the ANN lane is available.
    pub fn vec_enabled(&self) -> bool {
        self.vec_enabled
    }

    /// The embedding dimension the vec table was created with.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Execute a blocking operation on the connection.
    fn with_conn<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R>,
    {
        let conn = self.conn.lock().map_err(|e| SearchError::store(e.to_string()))?;
        f(&conn)
    }

    /// Convert f32 vector to bytes (little-endian).
    fn vec_to_bytes(v: &[f32]) -> Vec<u8> {
        v.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Escape FTS5 query syntax.
    ///
    /// Any term carrying a non-alphanumeric character gets quoted so that
    /// FTS5 operators in plain query text (`:`, `^`, parentheses, `-` and
    /// friends) read as terms, never as syntax. Free text with no matches
    /// must be an empty lane, not a query error.
    fn escape_fts5_query(query: &str) -> String {
        query
            .split_whitespace()
            .map(|term| {
                if term.chars().all(char::is_alphanumeric) {
                    term.to_string()
                } else {
                    format!("\"{}\"", term.replace('"', "\"\""))
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn now_millis() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

#[async_trait]
impl ProductStore for SqliteProductStore {
    async fn ann_search(&self, embedding: &[f32], k: u32) -> Result<Vec<Candidate>> {
        if !self.vec_enabled {
            return Err(SearchError::retrieval(
                Lane::Ann,
                "sqlite-vec extension not loaded",
            ));
        }

        if embedding.len() != self.dimension {
            return Err(SearchError::retrieval(
                Lane::Ann,
                format!(
                    "query vector has {} values, index expects {}",
                    embedding.len(),
                    self.dimension
                ),
            ));
        }

        let embedding_bytes = Self::vec_to_bytes(embedding);

        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT product_id
                    FROM vec_products
                    WHERE embedding MATCH ?1
                    ORDER BY distance
                    LIMIT ?2
                    "#,
                )
                .map_err(|e| SearchError::retrieval(Lane::Ann, e.to_string()))?;

            let rows = stmt
                .query_map(params![embedding_bytes, k], |row| row.get::<_, String>(0))
                .map_err(|e| SearchError::retrieval(Lane::Ann, e.to_string()))?;

            let ids: Vec<String> = rows
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| SearchError::retrieval(Lane::Ann, e.to_string()))?;

            Ok(ids
                .into_iter()
                .enumerate()
                .map(|(i, id)| Candidate::new(id, i as u32 + 1))
                .collect())
        })
    }

    async fn lexical_search(&self, query: &str, k: u32) -> Result<Vec<Candidate>> {
        let escaped_query = Self::escape_fts5_query(query);

        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT p.id
                    FROM products_fts f
                    JOIN products p ON p.rowid = f.rowid
                    WHERE products_fts MATCH ?1
                    ORDER BY bm25(products_fts)
                    LIMIT ?2
                    "#,
                )
                .map_err(|e| SearchError::retrieval(Lane::Lexical, e.to_string()))?;

            let rows = stmt
                .query_map(params![escaped_query, k], |row| row.get::<_, String>(0))
                .map_err(|e| SearchError::retrieval(Lane::Lexical, e.to_string()))?;

            let ids: Vec<String> = rows
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| SearchError::retrieval(Lane::Lexical, e.to_string()))?;

            Ok(ids
                .into_iter()
                .enumerate()
                .map(|(i, id)| Candidate::new(id, i as u32 + 1))
                .collect())
        })
    }

    async fn hydrate(&self, ids: &[String]) -> Result<HashMap<String, Product>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let ids: Vec<String> = ids.to_vec();

        self.with_conn(move |conn| {
            // One batched round trip, not N point lookups.
            let placeholders = (1..=ids.len())
                .map(|i| format!("?{}", i))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "SELECT id, title, product_data FROM products WHERE id IN ({})",
                placeholders
            );

            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| SearchError::hydration(e.to_string()))?;

            let rows = stmt
                .query_map(params_from_iter(ids.iter()), |row| {
                    let id: String = row.get(0)?;
                    let title: String = row.get(1)?;
                    let data: String = row.get(2)?;
                    Ok((id, title, data))
                })
                .map_err(|e| SearchError::hydration(e.to_string()))?;

            let mut products = HashMap::with_capacity(ids.len());
            for row in rows {
                let (id, title, data) = row.map_err(|e| SearchError::hydration(e.to_string()))?;

                // A malformed payload skips this record only.
                let product_data = match serde_json::from_str(&data) {
                    Ok(value) => value,
                    Err(e) => {
                        debug!("Skipping product {} with malformed payload: {}", id, e);
                        continue;
                    }
                };

                products.insert(
                    id.clone(),
                    Product {
                        id,
                        title,
                        embedding: None,
                        product_data,
                    },
                );
            }

            Ok(products)
        })
    }

    async fn upsert_products(&self, products: &[Product]) -> Result<()> {
        let products: Vec<Product> = products.to_vec();
        let vec_enabled = self.vec_enabled;
        let dimension = self.dimension;

        self.with_conn(move |conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| SearchError::store(e.to_string()))?;

            {
                let mut stmt = tx
                    .prepare(
                        r#"
                        INSERT INTO products (id, title, product_data, created_at, updated_at)
                        VALUES (?1, ?2, ?3, ?4, ?4)
                        ON CONFLICT(id) DO UPDATE SET
                            title = excluded.title,
                            product_data = excluded.product_data,
                            updated_at = excluded.updated_at
                        "#,
                    )
                    .map_err(|e| SearchError::store(e.to_string()))?;

                let now = Self::now_millis();
                for product in &products {
                    let data = serde_json::to_string(&product.product_data)?;
                    stmt.execute(params![product.id, product.title, data, now])
                        .map_err(|e| {
                            SearchError::store(format!("Failed to upsert product: {}", e))
                        })?;
                }
            }

            if vec_enabled {
                for product in &products {
                    // Replace the embedding row; products without an
                    // embedding carry no vec row and stay out of the
                    // ANN lane.
                    tx.execute(
                        "DELETE FROM vec_products WHERE product_id = ?1",
                        params![product.id],
                    )
                    .map_err(|e| SearchError::store(e.to_string()))?;

                    if let Some(embedding) = &product.embedding {
                        if embedding.len() != dimension {
                            return Err(SearchError::store(format!(
                                "product {} embedding has {} values, index expects {}",
                                product.id,
                                embedding.len(),
                                dimension
                            )));
                        }
                        tx.execute(
                            "INSERT INTO vec_products (product_id, embedding) VALUES (?1, ?2)",
                            params![product.id, Self::vec_to_bytes(embedding)],
                        )
                        .map_err(|e| {
                            SearchError::store(format!("Failed to insert embedding: {}", e))
                        })?;
                    }
                }
            }

            tx.commit().map_err(|e| SearchError::store(e.to_string()))?;

            debug!("Upserted {} products", products.len());
            Ok(())
        })
    }

    async fn count_products(&self) -> Result<u64> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))
                .map_err(|e| SearchError::store(e.to_string()))
        })
    }
}
