//! Conversion between a nested weekly plan (`day → meal time → slot`) and the
//! flat `meal_plans` rows used to store templates.
//!
//! Template rows are ownerless and tagged with `is_template`/`template_key`.
//! Their `week` column is `template_<key>` so clients reading the plan
//! identifier still recognise them.

use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;

use crate::{
    error::ApiError,
    models::meal_plan::{MealSlot, MealSlotEntry, NewMealEntry, TemplateView, WeekMeals},
};

pub const TEMPLATE_WEEK_PREFIX: &str = "template_";
pub const TEMPLATES_CACHE_KEY: &str = "templates:all";

/// Identifier of a template, without the `template_` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateKey(String);

impl TemplateKey {
    /// Accepts both `keto` and `template_keto`.
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        let raw = raw.trim();
        let key = raw.strip_prefix(TEMPLATE_WEEK_PREFIX).unwrap_or(raw);
        if key.is_empty() {
            return Err(ApiError::validation("Template id is required"));
        }
        if !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ApiError::validation("Invalid template id"));
        }
        Ok(Self(key.to_string()))
    }

    /// Key for an admin plan, derived once from its name: "Keto Weekly Plan" → `admin_keto_weekly_plan`.
    pub fn from_plan_name(name: &str) -> Result<Self, ApiError> {
        let mut slug = String::with_capacity(name.len());
        for c in name.trim().chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
            } else if !slug.ends_with('_') {
                slug.push('_');
            }
        }
        let slug = slug.trim_matches('_');
        if slug.is_empty() {
            return Err(ApiError::validation(
                "Meal plan name must contain at least one letter or digit",
            ));
        }
        Self::parse(&format!("admin_{slug}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Plan identifier stored on template rows.
    pub fn week(&self) -> String {
        format!("{TEMPLATE_WEEK_PREFIX}{}", self.0)
    }

    /// `admin_keto` → `Admin Keto Plan`
    pub fn display_name(&self) -> String {
        let words: Vec<String> = self
            .0
            .split(['_', '-'])
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect();
        format!("{} Plan", words.join(" "))
    }
}

impl std::fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Flattens `meals` into template rows. Slots with a blank recipe name, day
/// or meal time are dropped.
pub fn encode(key: &TemplateKey, meals: &WeekMeals, admin_meal_plan_id: Option<Uuid>) -> Vec<NewMealEntry> {
    filled_slots(meals)
        .map(|(day, meal_time, slot)| NewMealEntry {
            user_id: None,
            template_key: Some(key.as_str().to_string()),
            week: key.week(),
            day: day.to_string(),
            meal_time: meal_time.to_string(),
            recipe_id: format!("{key}_{day}_{meal_time}"),
            recipe_name: slot.recipe_name.clone(),
            servings: slot.servings,
            image: slot.image.clone(),
            admin_meal_plan_id,
        })
        .collect()
}

/// Groups template rows by key and re-nests them by day then meal time.
/// Non-template rows are ignored; rows missing a day or meal time are skipped
/// without dropping the rest of their template.
pub fn decode(rows: &[MealSlotEntry]) -> BTreeMap<String, WeekMeals> {
    let mut templates: BTreeMap<String, WeekMeals> = BTreeMap::new();
    for row in rows {
        let Some(key) = row.template_key.as_deref().filter(|_| row.is_template) else {
            continue;
        };
        let meals = templates.entry(key.to_string()).or_default();
        if row.day.trim().is_empty() || row.meal_time.trim().is_empty() {
            continue;
        }
        meals.entry(row.day.clone()).or_default().insert(
            row.meal_time.clone(),
            MealSlot {
                recipe_name: row.recipe_name.clone(),
                servings: row.servings,
                image: row.image.clone(),
                recipe_id: None,
                id: None,
            },
        );
    }
    templates
}

/// Nested view of one user's plan; slots keep their row id and recipe id.
pub fn nest_user_plan(rows: &[MealSlotEntry]) -> WeekMeals {
    let mut meals = WeekMeals::new();
    for row in rows.iter().filter(|r| !r.is_template) {
        meals.entry(row.day.clone()).or_default().insert(
            row.meal_time.clone(),
            MealSlot {
                recipe_name: row.recipe_name.clone(),
                servings: row.servings,
                image: row.image.clone(),
                recipe_id: Some(row.recipe_id.clone()),
                id: Some(row.id),
            },
        );
    }
    meals
}

/// Renders decoded templates for listing. `details` maps a key to the
/// (name, description) of the admin plan that produced it, when there is one.
pub fn template_views(
    decoded: BTreeMap<String, WeekMeals>,
    details: &HashMap<String, (String, String)>,
) -> Vec<TemplateView> {
    decoded
        .into_iter()
        .map(|(key, meals)| {
            let (name, description) = details.get(&key).cloned().unwrap_or_else(|| {
                let name = TemplateKey(key.clone()).display_name();
                let description = format!("Curated {} with balanced nutrition", name.to_lowercase());
                (name, description)
            });
            TemplateView {
                id: format!("{TEMPLATE_WEEK_PREFIX}{key}"),
                meal_count: meals.values().map(|slots| slots.len()).sum(),
                key,
                name,
                description,
                meals,
                created_by: "Admin".to_string(),
                is_admin_template: true,
            }
        })
        .collect()
}

/// Iterates (day, meal time, slot) for every slot that has a recipe.
pub fn filled_slots(meals: &WeekMeals) -> impl Iterator<Item = (&str, &str, &MealSlot)> {
    meals.iter().flat_map(|(day, slots)| {
        slots
            .iter()
            .filter(move |(meal_time, slot)| {
                !slot.recipe_name.trim().is_empty()
                    && !day.trim().is_empty()
                    && !meal_time.trim().is_empty()
            })
            .map(move |(meal_time, slot)| (day.as_str(), meal_time.as_str(), slot))
    })
}

/// Parses the admin-supplied `meals` JSON. Null slots are dropped.
pub fn parse_meals(value: serde_json::Value) -> Result<WeekMeals, ApiError> {
    let raw: BTreeMap<String, BTreeMap<String, Option<MealSlot>>> = serde_json::from_value(value)
        .map_err(|e| ApiError::validation(format!("Invalid meals structure: {e}")))?;
    Ok(raw
        .into_iter()
        .map(|(day, slots)| {
            let slots = slots
                .into_iter()
                .filter_map(|(meal_time, slot)| slot.map(|s| (meal_time, s)))
                .collect();
            (day, slots)
        })
        .collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    /// What the database would hand back after inserting `entry`.
    pub(crate) fn materialize(entry: &NewMealEntry) -> MealSlotEntry {
        let now = Utc::now();
        MealSlotEntry {
            id: Uuid::new_v4(),
            user_id: entry.user_id,
            is_template: entry.is_template(),
            template_key: entry.template_key.clone(),
            week: entry.week.clone(),
            day: entry.day.clone(),
            meal_time: entry.meal_time.clone(),
            recipe_id: entry.recipe_id.clone(),
            recipe_name: entry.recipe_name.clone(),
            servings: entry.servings,
            image: entry.image.clone(),
            admin_meal_plan_id: entry.admin_meal_plan_id,
            created_at: now,
            updated_at: now,
        }
    }

    fn slot(name: &str, servings: i32, image: &str) -> MealSlot {
        MealSlot {
            servings,
            image: image.to_string(),
            ..MealSlot::new(name)
        }
    }

    fn sample_week() -> WeekMeals {
        let mut meals = WeekMeals::new();
        meals.entry("Monday".into()).or_default().insert("Breakfast".into(), slot("Keto Eggs", 1, "🍳"));
        meals.entry("Monday".into()).or_default().insert("Lunch".into(), slot("Avocado Salad", 2, "🥗"));
        meals.entry("Monday".into()).or_default().insert("Dinner".into(), slot("   ", 1, "🍽️"));
        meals.entry("Tuesday".into()).or_default().insert("Breakfast".into(), slot("", 1, "🍽️"));
        meals.entry("Tuesday".into()).or_default().insert("Dinner".into(), slot("Beef Steak", 1, "🥩"));
        meals
    }

    #[test]
    fn parse_accepts_prefixed_and_bare_keys() {
        assert_eq!(TemplateKey::parse("template_admin_keto").unwrap().as_str(), "admin_keto");
        assert_eq!(TemplateKey::parse(" admin_keto ").unwrap().as_str(), "admin_keto");
        assert!(TemplateKey::parse("template_").is_err());
        assert!(TemplateKey::parse("").is_err());
        assert!(TemplateKey::parse("keto; drop").is_err());
    }

    #[test]
    fn key_from_plan_name_is_a_slug() {
        let key = TemplateKey::from_plan_name("7-Day Mediterranean  Plan!").unwrap();
        assert_eq!(key.as_str(), "admin_7_day_mediterranean_plan");
        assert!(TemplateKey::from_plan_name(" -- ").is_err());
    }

    #[test]
    fn display_name_title_cases_words() {
        assert_eq!(TemplateKey::parse("admin_keto").unwrap().display_name(), "Admin Keto Plan");
    }

    #[test]
    fn encode_skips_empty_recipe_names_and_tags_rows() {
        let key = TemplateKey::parse("admin_keto").unwrap();
        let rows = encode(&key, &sample_week(), None);

        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert!(row.is_template());
            assert_eq!(row.user_id, None);
            assert_eq!(row.week, "template_admin_keto");
        }
        let breakfast = rows.iter().find(|r| r.day == "Monday" && r.meal_time == "Breakfast").unwrap();
        assert_eq!(breakfast.recipe_id, "admin_keto_Monday_Breakfast");
        assert_eq!(breakfast.recipe_name, "Keto Eggs");
    }

    #[test]
    fn recipe_ids_are_distinct_across_templates() {
        let meals = sample_week();
        let a = encode(&TemplateKey::parse("a").unwrap(), &meals, None);
        let b = encode(&TemplateKey::parse("b").unwrap(), &meals, None);
        assert!(a.iter().all(|x| b.iter().all(|y| x.recipe_id != y.recipe_id)));
    }

    #[test]
    fn encode_then_decode_returns_filled_slots() {
        let key = TemplateKey::parse("admin_keto").unwrap();
        let input = sample_week();
        let rows: Vec<MealSlotEntry> = encode(&key, &input, None).iter().map(materialize).collect();

        let decoded = decode(&rows);
        let mut expected = WeekMeals::new();
        for (day, meal_time, slot) in filled_slots(&input) {
            expected.entry(day.to_string()).or_default().insert(meal_time.to_string(), slot.clone());
        }
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded["admin_keto"], expected);
    }

    #[test]
    fn decode_groups_by_key_and_ignores_user_rows() {
        let keto = encode(&TemplateKey::parse("keto").unwrap(), &sample_week(), None);
        let med = encode(&TemplateKey::parse("med").unwrap(), &sample_week(), None);
        let mut rows: Vec<MealSlotEntry> = keto.iter().chain(med.iter()).map(materialize).collect();

        let mut user_row = rows[0].clone();
        user_row.user_id = Some(Uuid::new_v4());
        user_row.is_template = false;
        user_row.template_key = None;
        user_row.week = "Week - 1".into();
        rows.push(user_row);

        let decoded = decode(&rows);
        assert_eq!(decoded.keys().cloned().collect::<Vec<_>>(), vec!["keto", "med"]);
    }

    #[test]
    fn decode_skips_rows_without_day_or_slot() {
        let key = TemplateKey::parse("keto").unwrap();
        let mut rows: Vec<MealSlotEntry> = encode(&key, &sample_week(), None).iter().map(materialize).collect();
        rows[0].day = String::new();
        rows[1].meal_time = "  ".into();

        let decoded = decode(&rows);
        let total: usize = decoded["keto"].values().map(|s| s.len()).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn views_fall_back_to_generated_names() {
        let key = TemplateKey::parse("admin_keto").unwrap();
        let rows: Vec<MealSlotEntry> = encode(&key, &sample_week(), None).iter().map(materialize).collect();
        let mut details = HashMap::new();
        details.insert("other".to_string(), ("Other".to_string(), "x".to_string()));

        let views = template_views(decode(&rows), &details);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].id, "template_admin_keto");
        assert_eq!(views[0].name, "Admin Keto Plan");
        assert_eq!(views[0].meal_count, 3);
        assert!(views[0].is_admin_template);
    }

    #[test]
    fn parse_meals_drops_null_slots_and_rejects_bad_shapes() {
        let meals = parse_meals(json!({
            "Monday": {
                "Breakfast": { "recipe_name": "Oatmeal", "servings": 2 },
                "Lunch": null
            }
        }))
        .unwrap();
        assert_eq!(meals["Monday"].len(), 1);
        assert_eq!(meals["Monday"]["Breakfast"].servings, 2);
        assert_eq!(meals["Monday"]["Breakfast"].image, "🍽️");

        assert!(parse_meals(json!(["Monday"])).is_err());
        assert!(parse_meals(json!({ "Monday": "Oatmeal" })).is_err());
    }

    #[test]
    fn user_plan_nesting_keeps_row_identity() {
        let user = Uuid::new_v4();
        let entry = NewMealEntry {
            user_id: Some(user),
            template_key: None,
            week: "Week - 1".into(),
            day: "Friday".into(),
            meal_time: "Dinner".into(),
            recipe_id: "r-1".into(),
            recipe_name: "Tacos".into(),
            servings: 4,
            image: "🌮".into(),
            admin_meal_plan_id: None,
        };
        let row = materialize(&entry);
        let nested = nest_user_plan(std::slice::from_ref(&row));
        let slot = &nested["Friday"]["Dinner"];
        assert_eq!(slot.id, Some(row.id));
        assert_eq!(slot.recipe_id.as_deref(), Some("r-1"));
    }
}
