use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    cache::Cache,
    error::ApiError,
    models::{
        admin_meal_plan::SyncAction,
        recipe::{
            AdminRecipe, AnyRecipe, CreateRecipeRequest, DiscoverRecipe, Recipe, RecipeNotification, SavedRecipe,
            UpdateRecipeRequest,
        },
    },
    services::auth::sanitize,
};

pub const DISCOVER_CACHE_KEY: &str = "admin_recipes:discover";
const RECIPE_STATUSES: [&str; 2] = ["published", "draft"];
const DIFFICULTIES: [&str; 3] = ["easy", "medium", "hard"];

/// Column values shared by both recipe tables, after validation.
#[derive(Debug, PartialEq)]
pub struct RecipeFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub instructions: Option<Vec<String>>,
    pub cook_time: Option<i32>,
    pub servings: Option<i32>,
    pub difficulty: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
}

fn clean_list(items: Option<Vec<String>>) -> Option<Vec<String>> {
    items.map(|list| list.iter().map(|i| sanitize(i)).filter(|i| !i.is_empty()).collect())
}

/// Validates and normalises recipe input. `require_title` is set on create.
#[allow(clippy::too_many_arguments)]
pub fn recipe_fields(
    title: Option<&str>,
    description: Option<&str>,
    ingredients: Option<Vec<String>>,
    instructions: Option<Vec<String>>,
    cook_time: Option<i32>,
    servings: Option<i32>,
    difficulty: Option<&str>,
    category: Option<&str>,
    image: Option<&str>,
    require_title: bool,
) -> Result<RecipeFields, ApiError> {
    let title = title.map(sanitize);
    match &title {
        Some(t) if t.is_empty() => return Err(ApiError::validation("Title cannot be empty")),
        None if require_title => return Err(ApiError::validation("Title is required")),
        _ => {}
    }
    if cook_time.is_some_and(|t| t < 0) {
        return Err(ApiError::validation("Cook time cannot be negative"));
    }
    if servings.is_some_and(|s| s < 1) {
        return Err(ApiError::validation("Servings must be at least 1"));
    }
    let difficulty = difficulty.map(|d| sanitize(d).to_lowercase());
    if let Some(d) = &difficulty {
        if !DIFFICULTIES.contains(&d.as_str()) {
            return Err(ApiError::validation("Difficulty must be easy, medium or hard"));
        }
    }
    Ok(RecipeFields {
        title,
        description: description.map(sanitize),
        ingredients: clean_list(ingredients),
        instructions: clean_list(instructions),
        cook_time,
        servings,
        difficulty,
        category: category.map(sanitize),
        image: image.map(sanitize).filter(|i| !i.is_empty()),
    })
}

fn create_fields(req: CreateRecipeRequest) -> Result<RecipeFields, ApiError> {
    recipe_fields(
        req.title.as_deref(),
        req.description.as_deref(),
        req.ingredients,
        req.instructions,
        req.cook_time,
        req.servings,
        req.difficulty.as_deref(),
        req.category.as_deref(),
        req.image.as_deref(),
        true,
    )
}

fn update_fields(req: UpdateRecipeRequest) -> Result<RecipeFields, ApiError> {
    recipe_fields(
        req.title.as_deref(),
        req.description.as_deref(),
        req.ingredients,
        req.instructions,
        req.cook_time,
        req.servings,
        req.difficulty.as_deref(),
        req.category.as_deref(),
        req.image.as_deref(),
        false,
    )
}

fn recipe_status(status: Option<&str>) -> Result<Option<String>, ApiError> {
    match status.map(str::trim) {
        Some(s) if RECIPE_STATUSES.contains(&s) => Ok(Some(s.to_string())),
        Some(_) => Err(ApiError::validation("Status must be published or draft")),
        None => Ok(None),
    }
}

pub struct RecipeService;

impl RecipeService {
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<(Vec<Recipe>, Vec<DiscoverRecipe>), ApiError> {
        let own = sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user_id)
            .fetch_all(pool)
            .await?;
        let curated = Self::published(pool).await?;
        Ok((own, curated.into_iter().map(DiscoverRecipe::from).collect()))
    }

    /// The user's own recipe, or a published admin recipe.
    pub async fn get(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<AnyRecipe, ApiError> {
        let own = sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
        if let Some(r) = own {
            return Ok(AnyRecipe::User(r));
        }
        sqlx::query_as::<_, AdminRecipe>("SELECT * FROM admin_recipes WHERE id = $1 AND status = 'published'")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .map(AnyRecipe::Admin)
            .ok_or_else(|| ApiError::not_found("Recipe not found"))
    }

    pub async fn create(pool: &PgPool, user_id: Uuid, req: CreateRecipeRequest) -> Result<Recipe, ApiError> {
        let f = create_fields(req)?;
        let recipe = sqlx::query_as::<_, Recipe>(
            r#"INSERT INTO recipes
                 (user_id, title, description, ingredients, instructions, cook_time, servings, difficulty, category, image)
               VALUES ($1, $2, COALESCE($3, ''), COALESCE($4, '{}'), COALESCE($5, '{}'), COALESCE($6, 30),
                       COALESCE($7, 1), COALESCE($8, 'medium'), COALESCE($9, 'Main'), COALESCE($10, '🍽️'))
               RETURNING *"#,
        )
        .bind(user_id)
        .bind(&f.title)
        .bind(&f.description)
        .bind(&f.ingredients)
        .bind(&f.instructions)
        .bind(f.cook_time)
        .bind(f.servings)
        .bind(&f.difficulty)
        .bind(&f.category)
        .bind(&f.image)
        .fetch_one(pool)
        .await?;
        Ok(recipe)
    }

    pub async fn update(pool: &PgPool, user_id: Uuid, id: Uuid, req: UpdateRecipeRequest) -> Result<Recipe, ApiError> {
        let f = update_fields(req)?;
        sqlx::query_as::<_, Recipe>(
            r#"UPDATE recipes SET
                 title = COALESCE($3, title),
                 description = COALESCE($4, description),
                 ingredients = COALESCE($5, ingredients),
                 instructions = COALESCE($6, instructions),
                 cook_time = COALESCE($7, cook_time),
                 servings = COALESCE($8, servings),
                 difficulty = COALESCE($9, difficulty),
                 category = COALESCE($10, category),
                 image = COALESCE($11, image),
                 updated_at = NOW()
               WHERE id = $1 AND user_id = $2
               RETURNING *"#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&f.title)
        .bind(&f.description)
        .bind(&f.ingredients)
        .bind(&f.instructions)
        .bind(f.cook_time)
        .bind(f.servings)
        .bind(&f.difficulty)
        .bind(&f.category)
        .bind(&f.image)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe not found"))
    }

    pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        let res = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(ApiError::not_found("Recipe not found"));
        }
        Ok(())
    }

    async fn visible(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool, ApiError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM recipes WHERE id = $1 AND user_id = $2)
                 OR EXISTS(SELECT 1 FROM admin_recipes WHERE id = $1 AND status = 'published')",
        )
        .bind(id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }

    pub async fn save(pool: &PgPool, user_id: Uuid, id: Uuid, is_favorite: bool) -> Result<(), ApiError> {
        if !Self::visible(pool, user_id, id).await? {
            return Err(ApiError::not_found("Recipe not found"));
        }
        sqlx::query(
            r#"INSERT INTO user_recipes (user_id, recipe_id, is_saved, is_favorite)
               VALUES ($1, $2, TRUE, $3)
               ON CONFLICT (user_id, recipe_id) DO UPDATE SET
                   is_saved = TRUE,
                   is_favorite = EXCLUDED.is_favorite,
                   saved_at = NOW()"#,
        )
        .bind(user_id)
        .bind(id)
        .bind(is_favorite)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn unsave(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        let res = sqlx::query("UPDATE user_recipes SET is_saved = FALSE, is_favorite = FALSE WHERE user_id = $1 AND recipe_id = $2 AND is_saved")
            .bind(user_id)
            .bind(id)
            .execute(pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(ApiError::not_found("Recipe is not saved"));
        }
        Ok(())
    }

    /// Records that the user opened the recipe.
    pub async fn touch(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        if !Self::visible(pool, user_id, id).await? {
            return Err(ApiError::not_found("Recipe not found"));
        }
        sqlx::query(
            r#"INSERT INTO user_recipes (user_id, recipe_id, is_saved)
               VALUES ($1, $2, FALSE)
               ON CONFLICT (user_id, recipe_id) DO UPDATE SET accessed_at = NOW()"#,
        )
        .bind(user_id)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn saved(pool: &PgPool, user_id: Uuid) -> Result<Vec<SavedRecipe>, ApiError> {
        let rows = sqlx::query_as::<_, SavedRecipe>(
            r#"SELECT ur.recipe_id,
                      COALESCE(r.title, a.title) AS title,
                      COALESCE(r.image, a.image) AS image,
                      ur.is_favorite, ur.accessed_at, ur.saved_at
               FROM user_recipes ur
               LEFT JOIN recipes r ON r.id = ur.recipe_id
               LEFT JOIN admin_recipes a ON a.id = ur.recipe_id
               WHERE ur.user_id = $1 AND ur.is_saved
               ORDER BY ur.accessed_at DESC"#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    // ─── Admin ──────────────────────────────────────────────────────────

    async fn published(pool: &PgPool) -> Result<Vec<AdminRecipe>, ApiError> {
        let rows = sqlx::query_as::<_, AdminRecipe>(
            "SELECT * FROM admin_recipes WHERE status = 'published' ORDER BY created_at DESC",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn admin_list(pool: &PgPool) -> Result<Vec<AdminRecipe>, ApiError> {
        let rows = sqlx::query_as::<_, AdminRecipe>("SELECT * FROM admin_recipes ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?;
        Ok(rows)
    }

    pub async fn discover(pool: &PgPool, cache: &Cache) -> Result<Vec<DiscoverRecipe>, ApiError> {
        cache
            .get_or_fetch(DISCOVER_CACHE_KEY, None, || async {
                let rows = Self::published(pool).await?;
                Ok::<_, ApiError>(rows.into_iter().map(DiscoverRecipe::from).collect::<Vec<_>>())
            })
            .await
    }

    pub async fn admin_create(
        pool: &PgPool,
        cache: &Cache,
        admin_id: Uuid,
        req: CreateRecipeRequest,
    ) -> Result<AdminRecipe, ApiError> {
        let status = recipe_status(req.status.as_deref())?;
        let author = req.author.as_deref().map(sanitize).filter(|a| !a.is_empty());
        let f = create_fields(req)?;
        let recipe = sqlx::query_as::<_, AdminRecipe>(
            r#"INSERT INTO admin_recipes
                 (title, description, ingredients, instructions, cook_time, servings, difficulty, category, image,
                  author, status, created_by)
               VALUES ($1, COALESCE($2, ''), COALESCE($3, '{}'), COALESCE($4, '{}'), COALESCE($5, 30),
                       COALESCE($6, 1), COALESCE($7, 'medium'), COALESCE($8, 'Main'), COALESCE($9, '🍽️'),
                       COALESCE($10, 'Admin'), COALESCE($11, 'published'), $12)
               RETURNING *"#,
        )
        .bind(&f.title)
        .bind(&f.description)
        .bind(&f.ingredients)
        .bind(&f.instructions)
        .bind(f.cook_time)
        .bind(f.servings)
        .bind(&f.difficulty)
        .bind(&f.category)
        .bind(&f.image)
        .bind(&author)
        .bind(&status)
        .bind(admin_id)
        .fetch_one(pool)
        .await?;

        Self::record_change(pool, cache, SyncAction::Create, &recipe).await;
        Ok(recipe)
    }

    pub async fn admin_update(
        pool: &PgPool,
        cache: &Cache,
        id: Uuid,
        req: UpdateRecipeRequest,
    ) -> Result<AdminRecipe, ApiError> {
        let status = recipe_status(req.status.as_deref())?;
        let author = req.author.as_deref().map(sanitize).filter(|a| !a.is_empty());
        let f = update_fields(req)?;
        let recipe = sqlx::query_as::<_, AdminRecipe>(
            r#"UPDATE admin_recipes SET
                 title = COALESCE($2, title),
                 description = COALESCE($3, description),
                 ingredients = COALESCE($4, ingredients),
                 instructions = COALESCE($5, instructions),
                 cook_time = COALESCE($6, cook_time),
                 servings = COALESCE($7, servings),
                 difficulty = COALESCE($8, difficulty),
                 category = COALESCE($9, category),
                 image = COALESCE($10, image),
                 author = COALESCE($11, author),
                 status = COALESCE($12, status),
                 updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(&f.title)
        .bind(&f.description)
        .bind(&f.ingredients)
        .bind(&f.instructions)
        .bind(f.cook_time)
        .bind(f.servings)
        .bind(&f.difficulty)
        .bind(&f.category)
        .bind(&f.image)
        .bind(&author)
        .bind(&status)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe not found"))?;

        Self::record_change(pool, cache, SyncAction::Update, &recipe).await;
        Ok(recipe)
    }

    pub async fn admin_delete(pool: &PgPool, cache: &Cache, id: Uuid) -> Result<(), ApiError> {
        let recipe = sqlx::query_as::<_, AdminRecipe>("DELETE FROM admin_recipes WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Recipe not found"))?;

        Self::record_change(pool, cache, SyncAction::Delete, &recipe).await;
        Ok(())
    }

    /// Latest recipe changes, newest first.
    pub async fn changes(pool: &PgPool, limit: i64) -> Result<Vec<RecipeNotification>, ApiError> {
        let rows = sqlx::query_as::<_, RecipeNotification>(
            "SELECT * FROM recipe_notifications ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Best effort: the recipe write has already committed.
    async fn record_change(pool: &PgPool, cache: &Cache, action: SyncAction, recipe: &AdminRecipe) {
        let res = sqlx::query(
            "INSERT INTO recipe_notifications (action, recipe_id, recipe_title, data) VALUES ($1, $2, $3, $4)",
        )
        .bind(action.as_str())
        .bind(recipe.id)
        .bind(&recipe.title)
        .bind(sqlx::types::Json(recipe))
        .execute(pool)
        .await;
        if let Err(e) = res {
            tracing::error!(recipe_id = %recipe.id, "Failed to record recipe change: {e}");
        }
        cache.delete(DISCOVER_CACHE_KEY).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(title: Option<&str>, require_title: bool) -> Result<RecipeFields, ApiError> {
        recipe_fields(title, None, None, None, None, None, None, None, None, require_title)
    }

    #[test]
    fn title_required_on_create_only() {
        assert!(matches!(fields(None, true), Err(ApiError::Validation(_))));
        assert!(fields(None, false).is_ok());
        assert!(fields(Some("   "), false).is_err());
        assert_eq!(fields(Some("  Soup "), true).unwrap().title.as_deref(), Some("Soup"));
    }

    #[test]
    fn numeric_and_difficulty_checks() {
        let bad_servings = recipe_fields(Some("x"), None, None, None, None, Some(0), None, None, None, true);
        assert!(bad_servings.is_err());
        let bad_time = recipe_fields(Some("x"), None, None, None, Some(-5), None, None, None, None, true);
        assert!(bad_time.is_err());
        let ok = recipe_fields(Some("x"), None, None, None, Some(10), Some(2), Some("Easy"), None, None, true).unwrap();
        assert_eq!(ok.difficulty.as_deref(), Some("easy"));
        assert!(recipe_fields(Some("x"), None, None, None, None, None, Some("extreme"), None, None, true).is_err());
    }

    #[test]
    fn lists_drop_blank_items() {
        let f = recipe_fields(
            Some("x"),
            None,
            Some(vec![" eggs ".into(), "".into(), "  ".into(), "salt".into()]),
            None,
            None,
            None,
            None,
            None,
            None,
            true,
        )
        .unwrap();
        assert_eq!(f.ingredients, Some(vec!["eggs".to_string(), "salt".to_string()]));
    }

    #[test]
    fn status_values() {
        assert_eq!(recipe_status(Some("draft")).unwrap().as_deref(), Some("draft"));
        assert_eq!(recipe_status(None).unwrap(), None);
        assert!(recipe_status(Some("hidden")).is_err());
    }
}
