//! SQLite-backed corpus index with FTS5 BM25 and int8 vector search.
//!
//! The database is written by the ingestion pipeline and opened here once per
//! process. All chunk embeddings are dequantized and L2-normalized into an
//! in-memory matrix at open time so cosine search is a single matrix-vector
//! product per query.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2, Axis};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::embedding::{dequantize_uint8, quantize_uint8};
use crate::schema::{FTS_SCHEMA_SQL, FTS_TRIGGERS_SQL, SCHEMA_SQL};
use crate::types::*;
use reportsage_core::{Error, Result};

/// Corpus index store: FTS5 full-text search plus int8 vector search.
pub struct IndexStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    embedding_dim: usize,
    /// Pre-loaded normalized embedding matrix for vector search: (N, dim) float32.
    embedding_matrix: Mutex<EmbeddingMatrix>,
}

struct EmbeddingMatrix {
    /// Normalized embeddings, shape (N, dim).
    matrix: Array2<f32>,
    /// Chunk IDs corresponding to each row.
    chunk_ids: Vec<i64>,
    /// Whether the matrix needs reloading.
    dirty: bool,
}

impl IndexStore {
    /// Open the index at `index_dir/reportsage.db`, creating an empty one if
    /// no pre-built database is present.
    pub fn open(index_dir: impl AsRef<Path>, embedding_dim: usize) -> Result<Self> {
        let index_dir = index_dir.as_ref();
        std::fs::create_dir_all(index_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = index_dir.join("reportsage.db");

        let conn = Self::create_connection(&db_path)?;
        Self::init_schema(&conn)?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
            embedding_dim,
            embedding_matrix: Mutex::new(EmbeddingMatrix {
                matrix: Array2::zeros((0, embedding_dim)),
                chunk_ids: Vec::new(),
                dirty: true,
            }),
        };

        store.load_embedding_matrix()?;

        let doc_count = store.count_documents()?;
        let chunk_count = store.count_chunks()?;
        info!(
            "IndexStore opened: {} documents, {} chunks, dim={}, path={}",
            doc_count,
            chunk_count,
            embedding_dim,
            store.db_path.display()
        );

        Ok(store)
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA cache_size = -65536;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(conn)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        let full_schema = format!("{}\n{}\n{}", SCHEMA_SQL, FTS_SCHEMA_SQL, FTS_TRIGGERS_SQL);
        conn.execute_batch(&full_schema)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Write surface (ingestion pipeline and tests)
    // ---------------------------------------------------------------

    /// Insert a source document. Returns the new document ID.
    pub fn add_document(
        &self,
        source: &str,
        title: Option<&str>,
        metadata: Option<&serde_json::Value>,
    ) -> Result<i64> {
        let now = now_millis();
        let meta_json = metadata.map(|m| serde_json::to_string(m).unwrap());

        let conn = self.conn.lock();
        let id = conn
            .prepare_cached(
                "INSERT INTO documents (source, title, metadata_json, created_at) \
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .insert(params![source, title, meta_json, now])
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(id)
    }

    /// Insert a chunk. Returns the new chunk ID.
    pub fn add_chunk(
        &self,
        doc_id: i64,
        text: &str,
        chunk_index: i32,
        opts: AddChunkOptions,
    ) -> Result<i64> {
        let now = opts.created_at.unwrap_or_else(now_millis);
        let meta_json = opts.metadata.as_ref().map(|m| serde_json::to_string(m).unwrap());

        let conn = self.conn.lock();
        let id = conn
            .prepare_cached(
                "INSERT INTO chunks (doc_id, text, page_label, chunk_index, metadata_json, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .insert(params![doc_id, text, opts.page_label, chunk_index, meta_json, now])
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(id)
    }

    /// Store a quantized embedding for a chunk and mark the matrix dirty.
    pub fn add_chunk_embedding(&self, chunk_id: i64, embedding: &Array1<f32>) -> Result<()> {
        let (q_bytes, scale, offset) = quantize_uint8(embedding);
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO chunk_embeddings (chunk_id, embedding, scale, offset_val) \
             VALUES (?1, ?2, ?3, ?4)",
            params![chunk_id, q_bytes, scale, offset],
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        drop(conn);
        self.embedding_matrix.lock().dirty = true;
        Ok(())
    }

    /// Append a single embedding to the in-memory matrix without a full reload.
    pub fn append_to_matrix(&self, chunk_id: i64, embedding: &Array1<f32>) -> Result<()> {
        self.ensure_matrix_loaded()?;

        let norm = embedding.dot(embedding).sqrt();
        if norm < 1e-9 {
            return Ok(());
        }
        let normalized = embedding / norm;

        let mut mat = self.embedding_matrix.lock();
        if mat.matrix.nrows() == 0 {
            mat.matrix = normalized.insert_axis(Axis(0)).to_owned();
        } else {
            mat.matrix
                .push(Axis(0), normalized.view())
                .map_err(|e| Error::Internal(format!("Matrix append failed: {}", e)))?;
        }
        mat.chunk_ids.push(chunk_id);
        mat.dirty = false;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    /// Get a document by ID.
    pub fn get_document(&self, doc_id: i64) -> Result<Option<Document>> {
        let conn = self.conn.lock();
        let row = conn
            .prepare_cached("SELECT * FROM documents WHERE id = ?1")
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![doc_id], |row| Ok(Self::row_to_document(row)))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(row)
    }

    /// Get a chunk by ID.
    pub fn get_chunk(&self, chunk_id: i64) -> Result<Option<Chunk>> {
        let conn = self.conn.lock();
        let row = conn
            .prepare_cached("SELECT * FROM chunks WHERE id = ?1")
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![chunk_id], |row| Ok(Self::row_to_chunk(row)))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(row)
    }

    /// Count indexed documents.
    pub fn count_documents(&self) -> Result<i64> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count)
    }

    /// Count indexed chunks.
    pub fn count_chunks(&self) -> Result<i64> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count)
    }

    // ---------------------------------------------------------------
    // BM25 Search (FTS5)
    // ---------------------------------------------------------------

    /// Full-text search using FTS5 BM25 ranking.
    pub fn bm25_search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        let fts_query = Self::sanitize_fts_query(query);
        if fts_query.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock();
        let sql = "SELECT c.*, d.source AS doc_source, chunks_fts.rank AS bm25_score \
                   FROM chunks_fts \
                   JOIN chunks c ON c.id = chunks_fts.rowid \
                   JOIN documents d ON d.id = c.doc_id \
                   WHERE chunks_fts MATCH ?1 \
                   ORDER BY chunks_fts.rank \
                   LIMIT ?2";

        let mut stmt = conn.prepare_cached(sql).map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![fts_query, top_k as i64], |row| {
                let bm25_score: f64 = row.get("bm25_score").unwrap_or(0.0);
                Ok(SearchHit {
                    chunk_id: row.get("id")?,
                    doc_id: row.get("doc_id")?,
                    text: row.get("text")?,
                    score: -bm25_score, // FTS5 rank is negative; negate for positive
                    page_label: row.get("page_label")?,
                    source: row.get("doc_source")?,
                    metadata: row
                        .get::<_, Option<String>>("metadata_json")?
                        .and_then(|s| serde_json::from_str(&s).ok()),
                    chunk_index: row.get("chunk_index")?,
                })
            })
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Sanitize a user query for FTS5 MATCH syntax.
    /// Wraps each token in double quotes and joins with OR.
    fn sanitize_fts_query(query: &str) -> String {
        let tokens: Vec<String> = query
            .split_whitespace()
            .filter(|t| !t.is_empty())
            .map(|t| format!("\"{}\"", t.replace('"', "")))
            .collect();
        if tokens.is_empty() {
            return String::new();
        }
        tokens.join(" OR ")
    }

    // ---------------------------------------------------------------
    // Vector Search
    // ---------------------------------------------------------------

    /// Load and normalize all chunk embeddings into a matrix for fast search.
    fn load_embedding_matrix(&self) -> Result<()> {
        let mut chunk_ids = Vec::new();
        let mut embeddings: Vec<Array1<f32>> = Vec::new();

        {
            let conn = self.conn.lock();
            let mut stmt = conn
                .prepare(
                    "SELECT chunk_id, embedding, scale, offset_val FROM chunk_embeddings",
                )
                .map_err(|e| Error::Database(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| {
                    let chunk_id: i64 = row.get(0)?;
                    let blob: Vec<u8> = row.get(1)?;
                    let scale: f64 = row.get(2)?;
                    let offset: f64 = row.get(3)?;
                    Ok((chunk_id, blob, scale as f32, offset as f32))
                })
                .map_err(|e| Error::Database(e.to_string()))?;

            for row in rows {
                let (cid, blob, scale, offset) = row.map_err(|e| Error::Database(e.to_string()))?;
                let emb = dequantize_uint8(&blob, scale, offset);
                chunk_ids.push(cid);
                embeddings.push(emb);
            }
        } // conn and stmt dropped here

        let mut mat = self.embedding_matrix.lock();
        if embeddings.is_empty() {
            mat.matrix = Array2::zeros((0, self.embedding_dim));
            mat.chunk_ids = Vec::new();
            mat.dirty = false;
            return Ok(());
        }

        // Stack into matrix and normalize rows
        let n = embeddings.len();
        let dim = self.embedding_dim;
        let mut matrix = Array2::zeros((n, dim));
        for (i, emb) in embeddings.iter().enumerate() {
            matrix.row_mut(i).assign(emb);
        }

        // Normalize rows for cosine similarity via dot product
        for mut row in matrix.rows_mut() {
            let norm = row.dot(&row).sqrt();
            if norm > 1e-9 {
                row /= norm;
            }
        }

        mat.matrix = matrix;
        mat.chunk_ids = chunk_ids;
        mat.dirty = false;
        debug!("Loaded {} embeddings into matrix", n);
        Ok(())
    }

    fn ensure_matrix_loaded(&self) -> Result<()> {
        if self.embedding_matrix.lock().dirty {
            self.load_embedding_matrix()?;
        }
        Ok(())
    }

    /// Cosine similarity search using the pre-loaded normalized matrix.
    pub fn vector_search(&self, query_embedding: &Array1<f32>, top_k: usize) -> Result<Vec<SearchHit>> {
        self.ensure_matrix_loaded()?;

        let mat = self.embedding_matrix.lock();
        if mat.matrix.nrows() == 0 {
            return Ok(Vec::new());
        }

        // Normalize query
        let q_norm = query_embedding.dot(query_embedding).sqrt();
        if q_norm < 1e-9 {
            return Ok(Vec::new());
        }
        let q = query_embedding / q_norm;

        // Matrix multiply: (N, dim) @ (dim,) → (N,)
        let similarities = mat.matrix.dot(&q);

        // Top-k indices by similarity
        let k = top_k.min(similarities.len());
        let mut indexed: Vec<(usize, f32)> = similarities
            .iter()
            .enumerate()
            .map(|(i, &s)| (i, s))
            .collect();
        indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        indexed.truncate(k);

        let top_chunk_ids: Vec<(i64, f64)> = indexed
            .iter()
            .map(|&(i, s)| (mat.chunk_ids[i], s as f64))
            .collect();
        drop(mat);

        // Hydrate chunk rows (with document source) for the top hits
        let mut results = Vec::with_capacity(k);
        for (cid, score) in top_chunk_ids {
            if let Some(hit) = self.hit_for_chunk(cid, score)? {
                results.push(hit);
            }
        }
        Ok(results)
    }

    /// Fetch one chunk joined with its document source, as a scored hit.
    fn hit_for_chunk(&self, chunk_id: i64, score: f64) -> Result<Option<SearchHit>> {
        let conn = self.conn.lock();
        let row = conn
            .prepare_cached(
                "SELECT c.*, d.source AS doc_source \
                 FROM chunks c JOIN documents d ON d.id = c.doc_id \
                 WHERE c.id = ?1",
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![chunk_id], |row| {
                Ok(SearchHit {
                    chunk_id: row.get("id")?,
                    doc_id: row.get("doc_id")?,
                    text: row.get("text")?,
                    score,
                    page_label: row.get("page_label")?,
                    source: row.get("doc_source")?,
                    metadata: row
                        .get::<_, Option<String>>("metadata_json")?
                        .and_then(|s| serde_json::from_str(&s).ok()),
                    chunk_index: row.get("chunk_index")?,
                })
            })
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(row)
    }

    // ---------------------------------------------------------------
    // Reciprocal Rank Fusion
    // ---------------------------------------------------------------

    /// Fuse BM25 and vector search results using Reciprocal Rank Fusion.
    /// RRF score = sum(1 / (k + rank)) across result lists.
    pub fn reciprocal_rank_fusion(
        bm25_results: &[SearchHit],
        vector_results: &[SearchHit],
        k: usize,
    ) -> Vec<SearchHit> {
        let mut rrf_scores: HashMap<i64, f64> = HashMap::new();
        let mut chunk_map: HashMap<i64, &SearchHit> = HashMap::new();

        for (rank, hit) in bm25_results.iter().enumerate() {
            *rrf_scores.entry(hit.chunk_id).or_insert(0.0) += 1.0 / (k as f64 + rank as f64 + 1.0);
            chunk_map.entry(hit.chunk_id).or_insert(hit);
        }

        for (rank, hit) in vector_results.iter().enumerate() {
            *rrf_scores.entry(hit.chunk_id).or_insert(0.0) += 1.0 / (k as f64 + rank as f64 + 1.0);
            chunk_map.entry(hit.chunk_id).or_insert(hit);
        }

        let mut sorted: Vec<(i64, f64)> = rrf_scores.into_iter().collect();
        sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        sorted
            .into_iter()
            .filter_map(|(cid, score)| {
                chunk_map.get(&cid).map(|hit| SearchHit {
                    chunk_id: hit.chunk_id,
                    doc_id: hit.doc_id,
                    text: hit.text.clone(),
                    score,
                    page_label: hit.page_label.clone(),
                    source: hit.source.clone(),
                    metadata: hit.metadata.clone(),
                    chunk_index: hit.chunk_index,
                })
            })
            .collect()
    }

    // ---------------------------------------------------------------
    // Hybrid Search (BM25 + Vector → RRF)
    // ---------------------------------------------------------------

    /// Combined BM25 + vector search with RRF fusion.
    pub fn hybrid_search(
        &self,
        query: &str,
        query_embedding: &Array1<f32>,
        bm25_top_k: usize,
        vector_top_k: usize,
        rrf_k: usize,
    ) -> Result<Vec<SearchHit>> {
        let bm25_hits = self.bm25_search(query, bm25_top_k)?;
        let vector_hits = self.vector_search(query_embedding, vector_top_k)?;
        Ok(Self::reciprocal_rank_fusion(&bm25_hits, &vector_hits, rrf_k))
    }

    // ---------------------------------------------------------------
    // Stats
    // ---------------------------------------------------------------

    /// Get index statistics.
    pub fn stats(&self) -> Result<StoreStats> {
        let doc_count = self.count_documents()?;
        let chunk_count = self.count_chunks()?;

        let conn = self.conn.lock();
        let emb_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM chunk_embeddings", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        drop(conn);

        let db_size = std::fs::metadata(&self.db_path).map(|m| m.len()).unwrap_or(0);

        let mat = self.embedding_matrix.lock();
        let matrix_rows = mat.matrix.nrows();
        let matrix_loaded = matrix_rows > 0;

        Ok(StoreStats {
            total_documents: doc_count,
            total_chunks: chunk_count,
            embeddings_stored: emb_count,
            embedding_dimension: self.embedding_dim,
            db_path: self.db_path.to_string_lossy().to_string(),
            db_size_mb: db_size as f64 / (1024.0 * 1024.0),
            matrix_loaded,
            matrix_rows,
        })
    }

    // ---------------------------------------------------------------
    // Row Mapping Helpers
    // ---------------------------------------------------------------

    fn row_to_document(row: &rusqlite::Row<'_>) -> Document {
        Document {
            id: row.get("id").unwrap_or(0),
            source: row.get("source").unwrap_or_default(),
            title: row.get("title").ok().flatten(),
            metadata: row
                .get::<_, Option<String>>("metadata_json")
                .ok()
                .flatten()
                .and_then(|s| serde_json::from_str(&s).ok()),
            created_at: row.get("created_at").unwrap_or(0),
        }
    }

    fn row_to_chunk(row: &rusqlite::Row<'_>) -> Chunk {
        Chunk {
            id: row.get("id").unwrap_or(0),
            doc_id: row.get("doc_id").unwrap_or(0),
            text: row.get("text").unwrap_or_default(),
            page_label: row.get("page_label").ok().flatten(),
            chunk_index: row.get("chunk_index").unwrap_or(0),
            metadata: row
                .get::<_, Option<String>>("metadata_json")
                .ok()
                .flatten()
                .and_then(|s| serde_json::from_str(&s).ok()),
            created_at: row.get("created_at").unwrap_or(0),
        }
    }
}

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (IndexStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::open(dir.path(), 384).unwrap();
        (store, dir)
    }

    fn seed_report(store: &IndexStore) -> i64 {
        let doc_id = store
            .add_document("annual-report.pdf", Some("Annual Report FY24"), None)
            .unwrap();
        store
            .add_chunk(
                doc_id,
                "Revenue from operations grew 36% year on year to Rs 11,247 crore.",
                0,
                AddChunkOptions {
                    page_label: Some("12".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        store
            .add_chunk(
                doc_id,
                "The board of directors recommends no dividend for the financial year.",
                1,
                AddChunkOptions {
                    page_label: Some("47".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        doc_id
    }

    #[test]
    fn test_add_and_get_document() {
        let (store, _dir) = test_store();

        let doc_id = store
            .add_document("annual-report.pdf", Some("Annual Report FY24"), None)
            .unwrap();

        let doc = store.get_document(doc_id).unwrap().unwrap();
        assert_eq!(doc.source, "annual-report.pdf");
        assert_eq!(doc.title.as_deref(), Some("Annual Report FY24"));
    }

    #[test]
    fn test_get_chunk() {
        let (store, _dir) = test_store();
        let doc_id = seed_report(&store);

        let cid = store
            .add_chunk(
                doc_id,
                "Standalone chunk",
                2,
                AddChunkOptions {
                    page_label: Some("3".into()),
                    metadata: Some(serde_json::json!({"section": "MD&A"})),
                    ..Default::default()
                },
            )
            .unwrap();

        let chunk = store.get_chunk(cid).unwrap().unwrap();
        assert_eq!(chunk.text, "Standalone chunk");
        assert_eq!(chunk.page_label.as_deref(), Some("3"));
        assert_eq!(chunk.metadata.unwrap()["section"], "MD&A");
        assert!(store.get_chunk(cid + 999).unwrap().is_none());
    }

    #[test]
    fn test_bm25_search_returns_source_and_page() {
        let (store, _dir) = test_store();
        seed_report(&store);

        let results = store.bm25_search("revenue operations", 10).unwrap();
        assert!(!results.is_empty());
        assert!(results[0].text.contains("Revenue"));
        assert_eq!(results[0].source, "annual-report.pdf");
        assert_eq!(results[0].page_label.as_deref(), Some("12"));
        assert!(results[0].score > 0.0);
    }

    #[test]
    fn test_bm25_search_empty_query() {
        let (store, _dir) = test_store();
        seed_report(&store);

        let results = store.bm25_search("   ", 10).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_vector_search_ranks_by_similarity() {
        let (store, _dir) = test_store();
        let doc_id = seed_report(&store);

        let chunks: Vec<i64> = {
            let c1 = store
                .add_chunk(doc_id, "Food delivery segment details", 2, Default::default())
                .unwrap();
            let c2 = store
                .add_chunk(doc_id, "Quick commerce segment details", 3, Default::default())
                .unwrap();
            vec![c1, c2]
        };

        let mut emb1 = Array1::zeros(384);
        emb1[0] = 1.0;
        emb1[1] = 0.5;

        let mut emb2 = Array1::zeros(384);
        emb2[0] = 0.1;
        emb2[2] = 1.0;

        store.add_chunk_embedding(chunks[0], &emb1).unwrap();
        store.add_chunk_embedding(chunks[1], &emb2).unwrap();

        // Query close to emb1
        let mut query = Array1::zeros(384);
        query[0] = 1.0;
        query[1] = 0.3;

        let results = store.vector_search(&query, 5).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk_id, chunks[0]);
        assert!(results[0].score > results[1].score);
        assert_eq!(results[0].source, "annual-report.pdf");
    }

    #[test]
    fn test_vector_search_zero_query_is_empty() {
        let (store, _dir) = test_store();
        let doc_id = seed_report(&store);
        let cid = store
            .add_chunk(doc_id, "Some chunk", 2, Default::default())
            .unwrap();
        let mut emb = Array1::zeros(384);
        emb[0] = 1.0;
        store.add_chunk_embedding(cid, &emb).unwrap();

        let results = store.vector_search(&Array1::zeros(384), 5).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_reciprocal_rank_fusion_prefers_agreement() {
        let hit = |cid: i64, score: f64| SearchHit {
            chunk_id: cid,
            doc_id: 1,
            text: format!("chunk {}", cid),
            score,
            page_label: None,
            source: "annual-report.pdf".into(),
            metadata: None,
            chunk_index: cid as i32,
        };

        // Chunk 2 appears in both lists, chunks 1 and 3 in one each
        let bm25 = vec![hit(1, 3.0), hit(2, 2.0)];
        let vector = vec![hit(2, 0.9), hit(3, 0.8)];

        let fused = IndexStore::reciprocal_rank_fusion(&bm25, &vector, 60);
        assert_eq!(fused[0].chunk_id, 2);
        assert_eq!(fused.len(), 3);
    }

    #[test]
    fn test_hybrid_search_falls_through_both_paths() {
        let (store, _dir) = test_store();
        let doc_id = seed_report(&store);
        let cid = store
            .add_chunk(doc_id, "Employee stock option plan expenses", 2, Default::default())
            .unwrap();

        let mut emb = Array1::zeros(384);
        emb[5] = 1.0;
        store.add_chunk_embedding(cid, &emb).unwrap();

        let mut query_emb = Array1::zeros(384);
        query_emb[5] = 1.0;

        let results = store
            .hybrid_search("stock option expenses", &query_emb, 10, 10, 60)
            .unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].chunk_id, cid);
    }

    #[test]
    fn test_stats() {
        let (store, _dir) = test_store();
        let doc_id = seed_report(&store);

        let cid = store
            .add_chunk(doc_id, "Embedded chunk", 2, Default::default())
            .unwrap();
        let mut emb = Array1::zeros(384);
        emb[0] = 1.0;
        store.add_chunk_embedding(cid, &emb).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_documents, 1);
        assert_eq!(stats.total_chunks, 3);
        assert_eq!(stats.embeddings_stored, 1);
        assert_eq!(stats.embedding_dimension, 384);
    }

    #[test]
    fn test_reopen_loads_matrix_from_disk() {
        let dir = TempDir::new().unwrap();
        {
            let store = IndexStore::open(dir.path(), 384).unwrap();
            let doc_id = store.add_document("annual-report.pdf", None, None).unwrap();
            let cid = store
                .add_chunk(doc_id, "Persisted chunk", 0, Default::default())
                .unwrap();
            let mut emb = Array1::zeros(384);
            emb[7] = 1.0;
            store.add_chunk_embedding(cid, &emb).unwrap();
        }

        // A fresh open must see the stored embedding without any writes
        let store = IndexStore::open(dir.path(), 384).unwrap();
        let stats = store.stats().unwrap();
        assert!(stats.matrix_loaded);
        assert_eq!(stats.matrix_rows, 1);

        let mut query = Array1::zeros(384);
        query[7] = 1.0;
        let results = store.vector_search(&query, 5).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "Persisted chunk");
    }
}
