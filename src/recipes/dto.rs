use rust_decimal::Decimal;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};

use super::repo_types::{Recipe, Tag};

/// List representation of a recipe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeSummary {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
}

/// Single-item representation: the summary fields plus the extended ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub summary: RecipeSummary,
    pub description: String,
    pub link: String,
}

impl From<&Recipe> for RecipeSummary {
    fn from(r: &Recipe) -> Self {
        Self {
            id: r.id,
            title: r.title.clone(),
            time_minutes: r.time_minutes,
            price: r.price,
        }
    }
}

impl From<Recipe> for RecipeDetail {
    fn from(r: Recipe) -> Self {
        Self {
            summary: RecipeSummary::from(&r),
            description: r.description,
            link: r.link,
        }
    }
}

/// Writable recipe fields. Anything else in the body (`id`, `user`, ...) is
/// ignored, so ownership cannot be reassigned through a payload.
///
/// Outer `None` means the key was absent, `Some(None)` an explicit `null`.
#[derive(Debug, Default, Deserialize)]
pub struct RecipePayload {
    #[serde(default, deserialize_with = "present")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "present_int")]
    pub time_minutes: Option<Option<i32>>,
    #[serde(default, deserialize_with = "present")]
    pub price: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub link: Option<Option<String>>,
}

fn present<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrText {
    Int(i64),
    Text(String),
}

/// Like [`present`], but also takes integers written as strings (`"30"`).
fn present_int<'de, D>(de: D) -> Result<Option<Option<i32>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<IntOrText>::deserialize(de)?;
    let value = raw
        .map(|raw| {
            let wide = match raw {
                IntOrText::Int(n) => Some(n),
                IntOrText::Text(s) => s.trim().parse::<i64>().ok(),
            };
            wide.and_then(|n| i32::try_from(n).ok())
                .ok_or_else(|| D::Error::custom("time_minutes: A valid integer is required."))
        })
        .transpose()?;
    Ok(Some(value))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagResponse {
    pub id: i64,
    pub name: String,
}

impl From<Tag> for TagResponse {
    fn from(t: Tag) -> Self {
        Self {
            id: t.id,
            name: t.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: serde_json::Value) -> Result<RecipePayload, serde_json::Error> {
        serde_json::from_value(body)
    }

    #[test]
    fn absent_and_null_are_distinct() {
        let payload = parse(json!({ "title": null })).unwrap();
        assert_eq!(payload.title, Some(None));
        assert_eq!(payload.price, None);
        assert_eq!(payload.time_minutes, None);
    }

    #[test]
    fn time_minutes_accepts_numeric_strings() {
        let payload = parse(json!({ "time_minutes": "30" })).unwrap();
        assert_eq!(payload.time_minutes, Some(Some(30)));
        let payload = parse(json!({ "time_minutes": 12 })).unwrap();
        assert_eq!(payload.time_minutes, Some(Some(12)));
        assert!(parse(json!({ "time_minutes": "soon" })).is_err());
        assert!(parse(json!({ "time_minutes": "99999999999" })).is_err());
    }
}
