use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::{
    config::MatchStrictness,
    db::store::RecipeStore,
    error::{AppError, AppResult},
    models::{ExternalId, MealPlan, PreferencesUpdate, Rating, Recipe, UserPreferences},
    services::ratings,
};

/// Creates a PostgreSQL connection pool and applies pending migrations
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

/// Recipe store backed by PostgreSQL
///
/// Recipe documents are stored as JSONB next to the columns used for lookup and ordering.
#[derive(Clone)]
pub struct PgRecipeStore {
    pool: PgPool,
}

/// Escapes LIKE wildcards and wraps the term for a substring match
fn like_pattern(term: &str) -> String {
    let escaped = term
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn ingredient_index(recipe: &Recipe) -> String {
    recipe.ingredient_names().join("\n")
}

fn not_found(id: &ExternalId) -> AppError {
    AppError::NotFound(format!("Recipe {} not found", id))
}

impl PgRecipeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_recipe(
        tx: &mut Transaction<'_, Postgres>,
        id: &ExternalId,
    ) -> AppResult<Recipe> {
        let row = sqlx::query("SELECT document FROM recipes WHERE external_id = $1 FOR UPDATE")
            .bind(id.to_string())
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| not_found(id))?;
        let Json(recipe): Json<Recipe> = row.try_get("document")?;
        Ok(recipe)
    }

    async fn write_recipe(tx: &mut Transaction<'_, Postgres>, recipe: &Recipe) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE recipes
            SET document = $2, rating_count = $3, favorite_count = $4, updated_at = $5,
                ingredient_names = $6, popularity = $7
            WHERE external_id = $1
            "#,
        )
        .bind(recipe.external_id.to_string())
        .bind(Json(recipe))
        .bind(recipe.rating_count as i32)
        .bind(recipe.favorite_count as i32)
        .bind(recipe.updated_at)
        .bind(ingredient_index(recipe))
        .bind(recipe.popularity)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn lock_preferences(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
    ) -> AppResult<UserPreferences> {
        let row =
            sqlx::query("SELECT preferences FROM user_preferences WHERE user_id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut **tx)
                .await?;

        match row {
            Some(row) => {
                let Json(prefs): Json<UserPreferences> = row.try_get("preferences")?;
                Ok(prefs)
            }
            None => Ok(UserPreferences::default()),
        }
    }

    async fn write_preferences(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        prefs: &UserPreferences,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_preferences (user_id, preferences, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id) DO UPDATE
            SET preferences = EXCLUDED.preferences, updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(Json(prefs))
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    fn documents(rows: Vec<sqlx::postgres::PgRow>) -> AppResult<Vec<Recipe>> {
        rows.into_iter()
            .map(|row| {
                let Json(recipe): Json<Recipe> = row.try_get("document")?;
                Ok(recipe)
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl RecipeStore for PgRecipeStore {
    async fn find_by_external_id(&self, id: &ExternalId) -> AppResult<Option<Recipe>> {
        let row = sqlx::query("SELECT document FROM recipes WHERE external_id = $1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let Json(recipe): Json<Recipe> = row.try_get("document")?;
                Ok(Some(recipe))
            }
            None => Ok(None),
        }
    }

    async fn find_many(&self, ids: &[ExternalId]) -> AppResult<Vec<Recipe>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<String> = ids.iter().map(|id| id.to_string()).collect();

        let rows = sqlx::query(
            r#"
            SELECT r.document
            FROM UNNEST($1::text[]) WITH ORDINALITY AS wanted(external_id, position)
            JOIN recipes r ON r.external_id = wanted.external_id
            ORDER BY wanted.position
            "#,
        )
        .bind(&keys)
        .fetch_all(&self.pool)
        .await?;

        Self::documents(rows)
    }

    async fn find_by_ingredients(
        &self,
        ingredients: &[String],
        strictness: MatchStrictness,
        limit: usize,
    ) -> AppResult<Vec<Recipe>> {
        if ingredients.is_empty() {
            return Ok(Vec::new());
        }
        let patterns: Vec<String> = ingredients.iter().map(|i| like_pattern(i)).collect();

        let sql = match strictness {
            MatchStrictness::Any => {
                r#"
                SELECT document FROM recipes
                WHERE ingredient_names ILIKE ANY($1)
                ORDER BY popularity DESC, external_id
                LIMIT $2
                "#
            }
            MatchStrictness::All => {
                r#"
                SELECT document FROM recipes
                WHERE ingredient_names ILIKE ALL($1)
                ORDER BY popularity DESC, external_id
                LIMIT $2
                "#
            }
        };

        let rows = sqlx::query(sql)
            .bind(&patterns)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Self::documents(rows)
    }

    async fn upsert_recipe(&self, recipe: Recipe) -> AppResult<Recipe> {
        let mut tx = self.pool.begin().await?;

        // First writer wins the row; later writers refresh it under the row lock
        let inserted = sqlx::query(
            r#"
            INSERT INTO recipes
                (id, external_id, ingredient_names, popularity, rating_count, favorite_count,
                 document, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (external_id) DO NOTHING
            "#,
        )
        .bind(recipe.id)
        .bind(recipe.external_id.to_string())
        .bind(ingredient_index(&recipe))
        .bind(recipe.popularity)
        .bind(recipe.rating_count as i32)
        .bind(recipe.favorite_count as i32)
        .bind(Json(&recipe))
        .bind(recipe.created_at)
        .bind(recipe.updated_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted > 0 {
            tx.commit().await?;
            return Ok(recipe);
        }

        let mut current = Self::lock_recipe(&mut tx, &recipe.external_id).await?;
        current.refresh_from(recipe);
        Self::write_recipe(&mut tx, &current).await?;

        tx.commit().await?;
        Ok(current)
    }

    async fn record_rating(&self, id: &ExternalId, rating: Rating) -> AppResult<Recipe> {
        let mut tx = self.pool.begin().await?;

        let mut recipe = Self::lock_recipe(&mut tx, id).await?;
        ratings::apply_rating(&mut recipe, rating, Utc::now());
        Self::write_recipe(&mut tx, &recipe).await?;

        tx.commit().await?;
        Ok(recipe)
    }

    async fn toggle_favorite(&self, user_id: Uuid, id: &ExternalId) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let mut recipe = Self::lock_recipe(&mut tx, id).await?;

        let removed = sqlx::query(
            "DELETE FROM user_favorites WHERE user_id = $1 AND external_id = $2",
        )
        .bind(user_id)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let favorite = if removed > 0 {
            recipe.favorite_count = recipe.favorite_count.saturating_sub(1);
            false
        } else {
            sqlx::query("INSERT INTO user_favorites (user_id, external_id) VALUES ($1, $2)")
                .bind(user_id)
                .bind(id.to_string())
                .execute(&mut *tx)
                .await?;
            recipe.favorite_count += 1;
            true
        };
        Self::write_recipe(&mut tx, &recipe).await?;

        let mut prefs = Self::lock_preferences(&mut tx, user_id).await?;
        if prefs.favorite_recipes.contains(id) != favorite {
            prefs.toggle_favorite(id);
            Self::write_preferences(&mut tx, user_id, &prefs).await?;
        }

        tx.commit().await?;
        Ok(favorite)
    }

    async fn rated_recipes(&self, limit: usize) -> AppResult<Vec<Recipe>> {
        let rows = sqlx::query(
            r#"
            SELECT document FROM recipes
            WHERE rating_count > 0
            ORDER BY rating_count DESC, external_id
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Self::documents(rows)
    }

    async fn get_preferences(&self, user_id: Uuid) -> AppResult<UserPreferences> {
        let row = sqlx::query("SELECT preferences FROM user_preferences WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let Json(prefs): Json<UserPreferences> = row.try_get("preferences")?;
                Ok(prefs)
            }
            None => Ok(UserPreferences::default()),
        }
    }

    async fn update_preferences(
        &self,
        user_id: Uuid,
        update: PreferencesUpdate,
    ) -> AppResult<UserPreferences> {
        let mut tx = self.pool.begin().await?;
        let mut prefs = Self::lock_preferences(&mut tx, user_id).await?;
        prefs.apply(update);
        Self::write_preferences(&mut tx, user_id, &prefs).await?;
        tx.commit().await?;
        Ok(prefs)
    }

    async fn record_search(
        &self,
        user_id: Uuid,
        ingredients: Vec<String>,
        limit: usize,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        let mut prefs = Self::lock_preferences(&mut tx, user_id).await?;
        prefs.record_search(ingredients, limit);
        Self::write_preferences(&mut tx, user_id, &prefs).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn save_meal_plan(&self, plan: &MealPlan) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO meal_plans (user_id, plan, generated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET plan = EXCLUDED.plan, generated_at = EXCLUDED.generated_at
            "#,
        )
        .bind(plan.user_id)
        .bind(Json(plan))
        .bind(plan.generated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn active_meal_plan(&self, user_id: Uuid) -> AppResult<Option<MealPlan>> {
        let row = sqlx::query("SELECT plan FROM meal_plans WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let Json(plan): Json<MealPlan> = row.try_get("plan")?;
                Ok(Some(plan))
            }
            None => Ok(None),
        }
    }
}
