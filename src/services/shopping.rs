use std::collections::HashSet;

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::content::{CreateShoppingItemRequest, ShoppingListItem, UpdateShoppingItemRequest},
    services::auth::sanitize,
};

/// Flattens ingredient lists, keeping the first spelling of each ingredient
/// (compared case-insensitively, ignoring surrounding whitespace).
pub fn aggregate_ingredients<I>(lists: I) -> Vec<String>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in lists.into_iter().flatten() {
        let item = item.trim().to_string();
        if item.is_empty() {
            continue;
        }
        if seen.insert(item.to_lowercase()) {
            out.push(item);
        }
    }
    out
}

pub struct ShoppingService;

impl ShoppingService {
    pub async fn list(pool: &PgPool, user_id: Uuid) -> Result<Vec<ShoppingListItem>, ApiError> {
        let items = sqlx::query_as::<_, ShoppingListItem>(
            "SELECT * FROM shopping_list_items WHERE user_id = $1 ORDER BY checked, created_at",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(items)
    }

    pub async fn add(pool: &PgPool, user_id: Uuid, req: CreateShoppingItemRequest) -> Result<ShoppingListItem, ApiError> {
        let name = sanitize(req.name.as_deref().unwrap_or_default());
        if name.is_empty() {
            return Err(ApiError::validation("Item name is required"));
        }
        let item = sqlx::query_as::<_, ShoppingListItem>(
            "INSERT INTO shopping_list_items (user_id, name, quantity) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(user_id)
        .bind(&name)
        .bind(req.quantity.as_deref().map(sanitize).unwrap_or_default())
        .fetch_one(pool)
        .await?;
        Ok(item)
    }

    pub async fn update(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
        req: UpdateShoppingItemRequest,
    ) -> Result<ShoppingListItem, ApiError> {
        let name = req.name.as_deref().map(sanitize);
        if name.as_deref() == Some("") {
            return Err(ApiError::validation("Item name cannot be empty"));
        }
        sqlx::query_as::<_, ShoppingListItem>(
            r#"UPDATE shopping_list_items SET
                 name = COALESCE($3, name),
                 quantity = COALESCE($4, quantity),
                 checked = COALESCE($5, checked)
               WHERE id = $1 AND user_id = $2
               RETURNING *"#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&name)
        .bind(req.quantity.as_deref().map(sanitize))
        .bind(req.checked)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))
    }

    pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        let res = sqlx::query("DELETE FROM shopping_list_items WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(ApiError::not_found("Item not found"));
        }
        Ok(())
    }

    /// Clears checked items, or the whole list.
    pub async fn clear(pool: &PgPool, user_id: Uuid, checked_only: bool) -> Result<u64, ApiError> {
        let res = sqlx::query("DELETE FROM shopping_list_items WHERE user_id = $1 AND (checked OR NOT $2)")
            .bind(user_id)
            .bind(checked_only)
            .execute(pool)
            .await?;
        Ok(res.rows_affected())
    }

    /// Builds the list from the recipes planned for `week`. Items previously
    /// generated for that week are replaced; manual items are kept.
    pub async fn generate(pool: &PgPool, user_id: Uuid, week: &str) -> Result<Vec<ShoppingListItem>, ApiError> {
        let week = sanitize(week);
        if week.is_empty() {
            return Err(ApiError::validation("Week is required"));
        }

        let lists: Vec<Vec<String>> = sqlx::query_scalar(
            r#"SELECT COALESCE(r.ingredients, a.ingredients, '{}')
               FROM meal_plans mp
               LEFT JOIN LATERAL (
                   SELECT ingredients FROM recipes
                   WHERE user_id = mp.user_id AND lower(title) = lower(mp.recipe_name)
                   ORDER BY created_at DESC LIMIT 1
               ) r ON TRUE
               LEFT JOIN LATERAL (
                   SELECT ingredients FROM admin_recipes
                   WHERE status = 'published' AND lower(title) = lower(mp.recipe_name)
                   ORDER BY created_at DESC LIMIT 1
               ) a ON TRUE
               WHERE mp.user_id = $1 AND mp.week = $2 AND NOT mp.is_template
               ORDER BY mp.day, mp.meal_time"#,
        )
        .bind(user_id)
        .bind(&week)
        .fetch_all(pool)
        .await?;
        let names = aggregate_ingredients(lists);

        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM shopping_list_items WHERE user_id = $1 AND source_week = $2")
            .bind(user_id)
            .bind(&week)
            .execute(&mut *tx)
            .await?;
        let mut items = Vec::with_capacity(names.len());
        for name in &names {
            let item = sqlx::query_as::<_, ShoppingListItem>(
                "INSERT INTO shopping_list_items (user_id, name, source_week) VALUES ($1, $2, $3) RETURNING *",
            )
            .bind(user_id)
            .bind(name)
            .bind(&week)
            .fetch_one(&mut *tx)
            .await?;
            items.push(item);
        }
        tx.commit().await?;

        tracing::info!(user_id = %user_id, week = %week, items = items.len(), "Shopping list generated");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn dedupes_case_insensitively_keeping_first_spelling() {
        let out = aggregate_ingredients(vec![
            list(&["Eggs", "Butter", " salt "]),
            list(&["eggs", "Spinach", "SALT", ""]),
        ]);
        assert_eq!(out, list(&["Eggs", "Butter", "salt", "Spinach"]));
    }

    #[test]
    fn empty_input() {
        assert!(aggregate_ingredients(Vec::<Vec<String>>::new()).is_empty());
    }
}
