use rust_decimal::Decimal;

use super::dto::RecipePayload;
use super::repo_types::{NewRecipe, Recipe};
use crate::error::{ApiResult, FieldErrors};

pub const MAX_TITLE_LEN: usize = 255;
pub const MAX_LINK_LEN: usize = 255;
pub const PRICE_MAX_DIGITS: u32 = 5;
pub const PRICE_DECIMAL_PLACES: u32 = 2;

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";

/// Unwraps one payload field, recording an error for an explicit `null`.
fn non_null<T>(
    errors: &mut FieldErrors,
    field: &'static str,
    value: Option<Option<T>>,
) -> Option<T> {
    match value {
        Some(None) => {
            errors.add(field, NOT_NULL);
            None
        }
        Some(v) => v,
        None => None,
    }
}

/// Create and full replace: title, time and price must be present; the
/// optional text fields fall back to empty.
pub fn recipe_from_payload(payload: RecipePayload) -> ApiResult<NewRecipe> {
    let mut errors = FieldErrors::default();
    let required = |errors: &mut FieldErrors, field: &'static str, present: bool| {
        if !present {
            errors.add(field, REQUIRED);
        }
    };
    required(&mut errors, "title", payload.title.is_some());
    required(&mut errors, "time_minutes", payload.time_minutes.is_some());
    required(&mut errors, "price", payload.price.is_some());

    let title = non_null(&mut errors, "title", payload.title);
    let time_minutes = non_null(&mut errors, "time_minutes", payload.time_minutes);
    let price = non_null(&mut errors, "price", payload.price);
    let description = non_null(&mut errors, "description", payload.description);
    let link = non_null(&mut errors, "link", payload.link);
    errors.into_result()?;

    validate(NewRecipe {
        title: title.unwrap_or_default(),
        time_minutes: time_minutes.unwrap_or_default(),
        price: price.unwrap_or_default(),
        description: description.unwrap_or_default(),
        link: link.unwrap_or_default(),
    })
}

/// Partial update: supplied fields replace the current ones, omitted fields
/// keep their value.
pub fn merge_payload(current: &Recipe, payload: RecipePayload) -> ApiResult<NewRecipe> {
    let mut errors = FieldErrors::default();
    let title = non_null(&mut errors, "title", payload.title);
    let time_minutes = non_null(&mut errors, "time_minutes", payload.time_minutes);
    let price = non_null(&mut errors, "price", payload.price);
    let description = non_null(&mut errors, "description", payload.description);
    let link = non_null(&mut errors, "link", payload.link);
    errors.into_result()?;

    validate(NewRecipe {
        title: title.unwrap_or_else(|| current.title.clone()),
        time_minutes: time_minutes.unwrap_or(current.time_minutes),
        price: price.unwrap_or(current.price),
        description: description.unwrap_or_else(|| current.description.clone()),
        link: link.unwrap_or_else(|| current.link.clone()),
    })
}

fn validate(mut recipe: NewRecipe) -> ApiResult<NewRecipe> {
    let mut errors = FieldErrors::default();

    if recipe.title.trim().is_empty() {
        errors.add("title", "This field may not be blank.");
    } else if recipe.title.chars().count() > MAX_TITLE_LEN {
        errors.add(
            "title",
            format!("Ensure this field has no more than {MAX_TITLE_LEN} characters."),
        );
    }
    if recipe.link.chars().count() > MAX_LINK_LEN {
        errors.add(
            "link",
            format!("Ensure this field has no more than {MAX_LINK_LEN} characters."),
        );
    }
    match normalize_price(recipe.price) {
        Ok(price) => recipe.price = price,
        Err(message) => errors.add("price", message),
    }

    errors.into_result()?;
    Ok(recipe)
}

/// Checks the NUMERIC(5, 2) bounds and fixes the scale at two places.
fn normalize_price(price: Decimal) -> Result<Decimal, String> {
    let reduced = price.normalize();
    if reduced.scale() > PRICE_DECIMAL_PLACES {
        return Err(format!(
            "Ensure that there are no more than {PRICE_DECIMAL_PLACES} decimal places."
        ));
    }
    let whole_limit = Decimal::from(10u64.pow(PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES));
    if reduced.trunc().abs() >= whole_limit {
        return Err(format!(
            "Ensure that there are no more than {PRICE_MAX_DIGITS} digits in total."
        ));
    }
    let mut fixed = reduced;
    fixed.rescale(PRICE_DECIMAL_PLACES);
    Ok(fixed)
}
