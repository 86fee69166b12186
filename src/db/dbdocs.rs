use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Error as SqlxError, Row};
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

use crate::db::store::{
    AnalyticsRecord, BodyCommit, DocStore, DocumentFilter, DocumentPatch, NewOperation,
};
use crate::db::util::escape_like_pattern;
use crate::models::binding::{BindingRecord, Permission};
use crate::models::doc::DocumentRecord;
use crate::models::error::ApiError;

/// Database connection pool
pub struct DbDocs {
    pool: PgPool,
}

impl DbDocs {
    /// Create a new database connection pool
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    ///
    /// # Returns
    /// * `Result<Self, SqlxError>` - Database connection pool or error
    pub async fn new(database_url: &str) -> Result<Self, SqlxError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        Ok(Self { pool })
    }

    fn log_pool_state(&self, action: &str, document_id: Uuid) {
        let pool_idle = self.pool.num_idle() as u32;
        let pool_size = self.pool.size();
        info!(
            "{} for doc {}. Pool connections: {} idle, {} in use",
            action,
            document_id,
            pool_idle,
            pool_size.saturating_sub(pool_idle)
        );
    }
}

fn row_to_document(row: &PgRow) -> Result<DocumentRecord, ApiError> {
    Ok(DocumentRecord {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        content: row.try_get("content")?,
        tags: row.try_get("tags")?,
        is_public: row.try_get("is_public")?,
        allow_comments: row.try_get("allow_comments")?,
        allow_suggestions: row.try_get("allow_suggestions")?,
        require_approval: row.try_get("require_approval")?,
        owner_id: row.try_get("owner_id")?,
        revision: row.try_get("revision")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        last_edited_at: row.try_get("last_edited_at")?,
    })
}

fn row_to_body_commit(row: &PgRow) -> Result<BodyCommit, ApiError> {
    Ok(BodyCommit {
        revision: row.try_get("revision")?,
        updated_at: row.try_get("updated_at")?,
        last_edited_at: row.try_get("last_edited_at")?,
    })
}

#[async_trait]
impl DocStore for DbDocs {
    /// Insert a document together with its implicit owner binding
    ///
    /// # Arguments
    /// * `doc` - The document row to insert; the owner binding is derived
    async fn create_document(&self, doc: &DocumentRecord) -> Result<(), ApiError> {
        self.log_pool_state("Creating document", doc.id);

        let mut tx = match self.pool.begin().await {
            Ok(tx) => tx,
            Err(e) => {
                error!(
                    "Failed to acquire connection from pool: {}. Pool state: {} idle, {} total",
                    e,
                    self.pool.num_idle(),
                    self.pool.size()
                );
                return Err(e.into());
            }
        };

        sqlx::query(
            r#"
            INSERT INTO documents (
                id, title, description, content, tags, is_public,
                allow_comments, allow_suggestions, require_approval,
                owner_id, revision, created_at, updated_at, last_edited_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(doc.id)
        .bind(&doc.title)
        .bind(&doc.description)
        .bind(&doc.content)
        .bind(&doc.tags)
        .bind(doc.is_public)
        .bind(doc.allow_comments)
        .bind(doc.allow_suggestions)
        .bind(doc.require_approval)
        .bind(&doc.owner_id)
        .bind(doc.revision)
        .bind(doc.created_at)
        .bind(doc.updated_at)
        .bind(doc.last_edited_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO collaborators (document_id, user_id, permission, active, created_at)
            VALUES ($1, $2, 'owner', TRUE, $3)
            "#,
        )
        .bind(doc.id)
        .bind(&doc.owner_id)
        .bind(doc.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!("Document created: {}", doc.id);
        Ok(())
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<DocumentRecord>, ApiError> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_document).transpose()
    }

    /// Apply a partial update
    ///
    /// A patch carrying `content` bumps the revision and the last-edit
    /// timestamp in the same statement, so the body and counter always move
    /// together.
    async fn update_document(
        &self,
        id: Uuid,
        patch: &DocumentPatch,
    ) -> Result<Option<DocumentRecord>, ApiError> {
        self.log_pool_state("Updating document", id);

        let row = sqlx::query(
            r#"
            UPDATE documents SET
                title = COALESCE($2::text, title),
                description = COALESCE($3::text, description),
                content = COALESCE($4::text, content),
                tags = COALESCE($5::text[], tags),
                is_public = COALESCE($6::boolean, is_public),
                allow_comments = COALESCE($7::boolean, allow_comments),
                allow_suggestions = COALESCE($8::boolean, allow_suggestions),
                require_approval = COALESCE($9::boolean, require_approval),
                revision = revision + CASE WHEN $4::text IS NULL THEN 0 ELSE 1 END,
                last_edited_at = CASE WHEN $4::text IS NULL THEN last_edited_at ELSE NOW() END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.title.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.content.as_deref())
        .bind(patch.tags.as_deref())
        .bind(patch.is_public)
        .bind(patch.allow_comments)
        .bind(patch.allow_suggestions)
        .bind(patch.require_approval)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_document).transpose()
    }

    async fn delete_document(&self, id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List documents readable by the filtering principal
    ///
    /// A document is readable when the principal owns it, holds an active
    /// binding on it, or the document is public.
    async fn list_documents(
        &self,
        filter: &DocumentFilter,
    ) -> Result<Vec<DocumentRecord>, ApiError> {
        let pattern = filter
            .search
            .as_deref()
            .map(|s| format!("%{}%", escape_like_pattern(s)));

        let query_sql = r#"
            SELECT DISTINCT d.*
            FROM documents d
            LEFT JOIN collaborators c
                ON c.document_id = d.id AND c.user_id = $1 AND c.active
            WHERE
                (d.owner_id = $1 OR d.is_public OR c.user_id IS NOT NULL)
                AND ($2::text IS NULL
                     OR d.title ILIKE $2 ESCAPE '\'
                     OR d.description ILIKE $2 ESCAPE '\'
                     OR ($3 AND d.content ILIKE $2 ESCAPE '\'))
                AND ($4::boolean IS NULL OR d.is_public = $4)
            ORDER BY d.updated_at DESC
            LIMIT $5 OFFSET $6
        "#;

        let rows = sqlx::query(query_sql)
            .bind(&filter.user_id)
            .bind(pattern.as_deref())
            .bind(filter.search_content)
            .bind(filter.public)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_document).collect()
    }

    async fn get_binding(
        &self,
        document_id: Uuid,
        user_id: &str,
    ) -> Result<Option<BindingRecord>, ApiError> {
        let row = sqlx::query(
            r#"
            SELECT document_id, user_id, permission, active, created_at
            FROM collaborators
            WHERE document_id = $1 AND user_id = $2
            "#,
        )
        .bind(document_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let permission_raw: String = row.try_get("permission")?;
                let permission = Permission::parse(&permission_raw).ok_or_else(|| {
                    ApiError::internal(format!("unknown permission '{}'", permission_raw))
                })?;
                Ok(Some(BindingRecord {
                    document_id: row.try_get("document_id")?,
                    user_id: row.try_get("user_id")?,
                    permission,
                    active: row.try_get("active")?,
                    created_at: row.try_get("created_at")?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn upsert_binding(&self, binding: &BindingRecord) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            INSERT INTO collaborators (document_id, user_id, permission, active, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (document_id, user_id)
            DO UPDATE SET permission = EXCLUDED.permission, active = EXCLUDED.active
            "#,
        )
        .bind(binding.document_id)
        .bind(&binding.user_id)
        .bind(binding.permission.as_str())
        .bind(binding.active)
        .bind(binding.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Commit a change request in one transaction
    ///
    /// The body UPDATE takes the document row lock, so concurrent change
    /// requests for the same document serialize here. Operation records get
    /// contiguous sequence numbers continuing from the current maximum.
    ///
    /// # Arguments
    /// * `document_id` - Document UUID
    /// * `new_body` - The working copy after all applied ops
    /// * `user_id` - Authoring principal
    /// * `ops` - One record per applied op, in application order
    /// * `analytics` - Summary of the whole request
    async fn commit_change(
        &self,
        document_id: Uuid,
        new_body: &str,
        user_id: &str,
        ops: &[NewOperation],
        analytics: &AnalyticsRecord,
    ) -> Result<BodyCommit, ApiError> {
        self.log_pool_state("Committing change", document_id);

        let mut tx = match self.pool.begin().await {
            Ok(tx) => tx,
            Err(e) => {
                error!(
                    "Failed to acquire connection from pool for document {}: {}. Pool state: {} idle, {} total",
                    document_id,
                    e,
                    self.pool.num_idle(),
                    self.pool.size()
                );
                return Err(e.into());
            }
        };

        let row = sqlx::query(
            r#"
            UPDATE documents
            SET content = $2,
                revision = revision + 1,
                updated_at = NOW(),
                last_edited_at = NOW()
            WHERE id = $1
            RETURNING revision, updated_at, last_edited_at
            "#,
        )
        .bind(document_id)
        .bind(new_body)
        .fetch_optional(&mut *tx)
        .await?;

        let commit = match row {
            Some(row) => row_to_body_commit(&row)?,
            None => {
                error!("Document not found for change commit: {}", document_id);
                return Err(ApiError::not_found("document not found"));
            }
        };

        let seq_row =
            sqlx::query("SELECT COALESCE(MAX(seq), 0) AS max_seq FROM document_operations WHERE document_id = $1")
                .bind(document_id)
                .fetch_one(&mut *tx)
                .await?;
        let mut seq: i64 = seq_row.try_get("max_seq")?;

        for op in ops {
            seq += 1;
            sqlx::query(
                r#"
                INSERT INTO document_operations
                    (document_id, seq, kind, position, length, content, user_id, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
                "#,
            )
            .bind(document_id)
            .bind(seq)
            .bind(op.kind.as_str())
            .bind(op.position)
            .bind(op.length)
            .bind(&op.content)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO document_analytics (document_id, user_id, kind, metadata, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            "#,
        )
        .bind(analytics.document_id)
        .bind(&analytics.user_id)
        .bind(&analytics.kind)
        .bind(&analytics.metadata)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            "Change committed for document {}: revision {}, {} ops",
            document_id,
            commit.revision,
            ops.len()
        );
        Ok(commit)
    }

    /// Replace the body and bump the revision for a realtime content push
    async fn update_body(
        &self,
        document_id: Uuid,
        new_body: &str,
        user_id: &str,
    ) -> Result<BodyCommit, ApiError> {
        self.log_pool_state("Writing realtime content", document_id);

        let row = sqlx::query(
            r#"
            UPDATE documents
            SET content = $2,
                revision = revision + 1,
                updated_at = NOW(),
                last_edited_at = NOW()
            WHERE id = $1
            RETURNING revision, updated_at, last_edited_at
            "#,
        )
        .bind(document_id)
        .bind(new_body)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let commit = row_to_body_commit(&row)?;
                info!(
                    "Realtime content written by {} for document {}: revision {}",
                    user_id, document_id, commit.revision
                );
                Ok(commit)
            }
            None => Err(ApiError::not_found("document not found")),
        }
    }
}
