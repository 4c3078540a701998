/// Seed the built-in sample meal plan templates.
///
/// Usage: seed-templates [--force] [--list]
///   --force : rewrite seeded templates that already exist
///   --list  : only print the templates currently stored
use anyhow::Context;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use mealplan_api::{
    db,
    error::ApiError,
    models::meal_plan::{MealSlot, MealSlotEntry, WeekMeals},
    services::{
        sync::{self, MealPlanStore},
        templates::{self, TemplateKey},
    },
};

#[derive(Parser)]
#[command(name = "seed-templates", about = "Seed sample meal plan templates")]
struct Args {
    /// Rewrite templates that already exist
    #[arg(long)]
    force: bool,

    /// Only list stored templates
    #[arg(long)]
    list: bool,
}

struct Sample {
    key: &'static str,
    meals: &'static [(&'static str, &'static str, &'static str, &'static str)],
}

const SAMPLES: &[Sample] = &[
    Sample {
        key: "admin_mediterranean",
        meals: &[
            ("Monday", "Breakfast", "Greek Yogurt with Berries", "🥣"),
            ("Monday", "Lunch", "Mediterranean Salad", "🥗"),
            ("Monday", "Dinner", "Grilled Fish with Vegetables", "🐟"),
            ("Tuesday", "Breakfast", "Avocado Toast", "🥑"),
            ("Tuesday", "Lunch", "Hummus Bowl", "🍲"),
            ("Tuesday", "Dinner", "Chicken Souvlaki", "🍗"),
            ("Wednesday", "Breakfast", "Mediterranean Omelet", "🍳"),
            ("Wednesday", "Lunch", "Quinoa Tabbouleh", "🥙"),
            ("Wednesday", "Dinner", "Baked Cod with Olives", "🐟"),
        ],
    },
    Sample {
        key: "admin_keto",
        meals: &[
            ("Monday", "Breakfast", "Keto Scrambled Eggs", "🍳"),
            ("Monday", "Lunch", "Avocado Chicken Salad", "🥗"),
            ("Monday", "Dinner", "Grilled Salmon with Asparagus", "🐟"),
            ("Tuesday", "Breakfast", "Bacon and Eggs", "🥓"),
            ("Tuesday", "Lunch", "Keto Caesar Salad", "🥗"),
            ("Tuesday", "Dinner", "Beef Steak with Butter", "🥩"),
        ],
    },
];

fn week_meals(sample: &Sample) -> WeekMeals {
    let mut meals = WeekMeals::new();
    for (day, meal_time, name, image) in sample.meals {
        meals.entry(day.to_string()).or_default().insert(
            meal_time.to_string(),
            MealSlot {
                image: image.to_string(),
                ..MealSlot::new(*name)
            },
        );
    }
    meals
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL environment variable not set")?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;
    mealplan_api::db::run_migrations(&pool).await?;

    if !args.list {
        for sample in SAMPLES {
            let key = TemplateKey::parse(sample.key)?;
            if !args.force && !pool.template_entries(&key).await?.is_empty() {
                tracing::info!("Template already exists: {key}");
                continue;
            }
            if db::meal_plans::plan_claims_key(&pool, &key).await? {
                tracing::warn!("Template {key} belongs to an admin meal plan, skipping");
                continue;
            }
            let entries = templates::encode(&key, &week_meals(sample), None);
            match sync::write_template(&pool, &key, None, &entries).await {
                Ok(()) => tracing::info!("Seeded template {key} ({} meals)", entries.len()),
                Err(ApiError::Conflict(e)) => tracing::warn!("Skipping {key}: {e}"),
                Err(e) => return Err(e.into()),
            }
        }
    }

    let rows = sqlx::query_as::<_, MealSlotEntry>("SELECT * FROM meal_plans WHERE is_template")
        .fetch_all(&pool)
        .await?;
    let stored = templates::decode(&rows);
    if stored.is_empty() {
        tracing::info!("No templates found");
    }
    for (key, meals) in &stored {
        let count: usize = meals.values().map(|slots| slots.len()).sum();
        tracing::info!("Template {key}: {count} meals");
        for (day, meal_time, slot) in templates::filled_slots(meals).take(3) {
            tracing::info!("  - {day} {meal_time}: {}", slot.recipe_name);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_encode_every_meal() {
        for sample in SAMPLES {
            let key = TemplateKey::parse(sample.key).unwrap();
            assert_eq!(templates::encode(&key, &week_meals(sample), None).len(), sample.meals.len());
        }
    }
}
