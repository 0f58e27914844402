//! Persona repository: categories and personas.
//!
//! External: SQLite via sqlx. Callers: the `persona` CLI (admin commands) and
//! `SqliteChatRepository::find_conversation`.

use chrono::Utc;
use sqlx::{FromRow, Row};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::StorageError;
use crate::models::{CategoryRecord, NewPersona, PersonaListing, PersonaRecord, DEFAULT_CATEGORIES};
use crate::sqlite_pool::SqlitePoolManager;

#[derive(Clone)]
pub struct PersonaRepository {
    pool_manager: SqlitePoolManager,
}

impl PersonaRepository {
    pub fn new(pool_manager: SqlitePoolManager) -> Self {
        Self { pool_manager }
    }

    /// Opens `database_url` and creates the schema if needed.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        Ok(Self::new(SqlitePoolManager::new(database_url).await?))
    }

    /// Inserts the default categories that are not present yet. Returns how many were added.
    pub async fn seed_default_categories(&self) -> Result<usize, StorageError> {
        let pool = self.pool_manager.pool();
        let mut inserted = 0;
        for name in DEFAULT_CATEGORIES {
            let result = sqlx::query("INSERT OR IGNORE INTO categories (id, name) VALUES (?, ?)")
                .bind(Uuid::new_v4().to_string())
                .bind(name)
                .execute(pool)
                .await?;
            inserted += result.rows_affected() as usize;
        }
        info!(inserted, "Seeded default categories");
        Ok(inserted)
    }

    pub async fn list_categories(&self) -> Result<Vec<CategoryRecord>, StorageError> {
        let categories = sqlx::query_as::<_, CategoryRecord>(
            "SELECT id, name FROM categories ORDER BY name ASC",
        )
        .fetch_all(self.pool_manager.pool())
        .await?;
        Ok(categories)
    }

    pub async fn find_category(&self, id: &str) -> Result<Option<CategoryRecord>, StorageError> {
        let category =
            sqlx::query_as::<_, CategoryRecord>("SELECT id, name FROM categories WHERE id = ?")
                .bind(id)
                .fetch_optional(self.pool_manager.pool())
                .await?;
        Ok(category)
    }

    /// Resolves a category by id or (case-insensitive) name.
    pub async fn resolve_category(
        &self,
        id_or_name: &str,
    ) -> Result<Option<CategoryRecord>, StorageError> {
        let category = sqlx::query_as::<_, CategoryRecord>(
            "SELECT id, name FROM categories WHERE id = ? OR LOWER(name) = LOWER(?) LIMIT 1",
        )
        .bind(id_or_name)
        .bind(id_or_name)
        .fetch_optional(self.pool_manager.pool())
        .await?;
        Ok(category)
    }

    async fn ensure_category(&self, category_id: &str) -> Result<(), StorageError> {
        match self.find_category(category_id).await? {
            Some(_) => Ok(()),
            None => Err(StorageError::Invalid(format!(
                "unknown category: {}",
                category_id
            ))),
        }
    }

    #[instrument(skip_all, fields(user_id = %input.user_id, name = %input.name))]
    pub async fn create_persona(&self, input: NewPersona) -> Result<PersonaRecord, StorageError> {
        input.validate()?;
        self.ensure_category(&input.category_id).await?;

        let now = Utc::now();
        let record = PersonaRecord {
            id: Uuid::new_v4().to_string(),
            user_id: input.user_id,
            user_name: input.user_name,
            src: input.src,
            name: input.name,
            description: input.description,
            instructions: input.instructions,
            seed: input.seed,
            category_id: input.category_id,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO personas (id, user_id, user_name, src, name, description, instructions, seed, category_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.user_name)
        .bind(&record.src)
        .bind(&record.name)
        .bind(&record.description)
        .bind(&record.instructions)
        .bind(&record.seed)
        .bind(&record.category_id)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(self.pool_manager.pool())
        .await?;

        info!(persona_id = %record.id, "Created persona");
        Ok(record)
    }

    /// Replaces every editable field. Only the owner may update.
    #[instrument(skip_all, fields(persona_id = %id, user_id = %owner_user_id))]
    pub async fn update_persona(
        &self,
        id: &str,
        owner_user_id: &str,
        input: NewPersona,
    ) -> Result<PersonaRecord, StorageError> {
        input.validate()?;
        self.check_owner(id, owner_user_id).await?;
        self.ensure_category(&input.category_id).await?;

        sqlx::query(
            r#"
            UPDATE personas
            SET user_name = ?, src = ?, name = ?, description = ?, instructions = ?, seed = ?, category_id = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(&input.user_name)
        .bind(&input.src)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.instructions)
        .bind(&input.seed)
        .bind(&input.category_id)
        .bind(Utc::now())
        .bind(id)
        .bind(owner_user_id)
        .execute(self.pool_manager.pool())
        .await?;

        self.find_persona(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("persona {}", id)))
    }

    /// Deletes the persona and all of its messages. Only the owner may delete.
    #[instrument(skip_all, fields(persona_id = %id, user_id = %owner_user_id))]
    pub async fn delete_persona(
        &self,
        id: &str,
        owner_user_id: &str,
    ) -> Result<PersonaRecord, StorageError> {
        let persona = self.check_owner(id, owner_user_id).await?;

        let mut tx = self.pool_manager.pool().begin().await?;
        let removed = sqlx::query("DELETE FROM messages WHERE conversation_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM personas WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(owner_user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(removed_messages = removed, "Deleted persona");
        Ok(persona)
    }

    async fn check_owner(&self, id: &str, owner_user_id: &str) -> Result<PersonaRecord, StorageError> {
        match self.find_persona(id).await? {
            None => Err(StorageError::NotFound(format!("persona {}", id))),
            Some(p) if p.user_id != owner_user_id => Err(StorageError::Forbidden(format!(
                "persona {} belongs to another user",
                id
            ))),
            Some(p) => Ok(p),
        }
    }

    pub async fn find_persona(&self, id: &str) -> Result<Option<PersonaRecord>, StorageError> {
        let persona = sqlx::query_as::<_, PersonaRecord>("SELECT * FROM personas WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool_manager.pool())
            .await?;
        Ok(persona)
    }

    /// Lists personas newest first, optionally filtered by category and by a
    /// case-insensitive substring of the name.
    pub async fn list_personas(
        &self,
        category_id: Option<&str>,
        name_query: Option<&str>,
    ) -> Result<Vec<PersonaListing>, StorageError> {
        let mut sql = String::from(
            "SELECT p.*, (SELECT COUNT(*) FROM messages m WHERE m.conversation_id = p.id) AS message_count \
             FROM personas p WHERE 1=1",
        );
        let mut params: Vec<String> = Vec::new();

        if let Some(category_id) = category_id.filter(|c| !c.is_empty()) {
            sql.push_str(" AND p.category_id = ?");
            params.push(category_id.to_string());
        }
        if let Some(name) = name_query.map(str::trim).filter(|n| !n.is_empty()) {
            sql.push_str(" AND LOWER(p.name) LIKE ? ESCAPE '\\'");
            params.push(format!("%{}%", escape_like(&name.to_lowercase())));
        }
        sql.push_str(" ORDER BY p.created_at DESC, p.rowid DESC");

        let mut query = sqlx::query(&sql);
        for param in &params {
            query = query.bind(param);
        }
        let rows = query.fetch_all(self.pool_manager.pool()).await?;

        let mut listings = Vec::with_capacity(rows.len());
        for row in &rows {
            listings.push(PersonaListing {
                persona: PersonaRecord::from_row(row)?,
                message_count: row.try_get("message_count")?,
            });
        }
        info!("Retrieved {} personas", listings.len());
        Ok(listings)
    }
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
