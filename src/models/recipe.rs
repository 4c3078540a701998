use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

/// Recipe authored by an end user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub cook_time: i32,
    pub servings: i32,
    pub difficulty: String,
    pub category: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Curated recipe managed from the admin panel.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdminRecipe {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub cook_time: i32,
    pub servings: i32,
    pub difficulty: String,
    pub category: String,
    pub image: String,
    pub author: String,
    pub status: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Shared by user and admin recipe creation; `author`/`status` only apply to admin recipes.
#[derive(Debug, Deserialize)]
pub struct CreateRecipeRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub instructions: Option<Vec<String>>,
    pub cook_time: Option<i32>,
    pub servings: Option<i32>,
    pub difficulty: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub author: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRecipeRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub instructions: Option<Vec<String>>,
    pub cook_time: Option<i32>,
    pub servings: Option<i32>,
    pub difficulty: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub author: Option<String>,
    pub status: Option<String>,
}

/// Admin recipe reshaped for the discover page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoverRecipe {
    pub id: Uuid,
    pub name: String,
    pub title: String,
    pub time: String,
    pub servings: i32,
    pub image: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub difficulty: String,
    pub category: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

impl From<AdminRecipe> for DiscoverRecipe {
    fn from(r: AdminRecipe) -> Self {
        Self {
            id: r.id,
            name: r.title.clone(),
            time: format!("{} min", r.cook_time),
            title: r.title,
            servings: r.servings,
            image: r.image,
            ingredients: r.ingredients,
            instructions: r.instructions,
            difficulty: r.difficulty,
            category: r.category,
            author: r.author,
            created_at: r.created_at,
        }
    }
}

/// Either kind of recipe, as returned by a single-recipe lookup.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AnyRecipe {
    User(Recipe),
    Admin(AdminRecipe),
}

/// Saved-recipe link joined with whichever recipe table it points at.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SavedRecipe {
    pub recipe_id: Uuid,
    pub title: Option<String>,
    pub image: Option<String>,
    pub is_favorite: bool,
    pub accessed_at: DateTime<Utc>,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SaveRecipeRequest {
    #[serde(default)]
    pub is_favorite: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecipeNotification {
    pub id: Uuid,
    pub action: String,
    pub recipe_id: Uuid,
    pub recipe_title: String,
    pub data: Json<Value>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_shape_formats_cook_time() {
        let now = Utc::now();
        let recipe = AdminRecipe {
            id: Uuid::new_v4(),
            title: "Hummus Bowl".into(),
            description: String::new(),
            ingredients: vec!["chickpeas".into()],
            instructions: vec![],
            cook_time: 15,
            servings: 2,
            difficulty: "easy".into(),
            category: "Lunch".into(),
            image: "🍲".into(),
            author: "Admin".into(),
            status: "published".into(),
            created_by: None,
            created_at: now,
            updated_at: now,
        };
        let d = DiscoverRecipe::from(recipe);
        assert_eq!(d.time, "15 min");
        assert_eq!(d.name, "Hummus Bowl");
        assert_eq!(d.title, "Hummus Bowl");
    }
}
