//! Product text featurizer
//!
//! Flattens a product into the single text blob the vectorizer is fit on.
//! Field order is fixed: name, description, category, category again,
//! key features, specification values. Category appears twice so its terms
//! weigh more than a single mention in the description would.

use crate::models::Product;
use serde_json::Value;

/// Build the combined text for one product. Missing fields contribute empty strings.
pub fn combined_text(product: &Product) -> String {
    let name = product.name.as_deref().unwrap_or("");
    let description = product.description.as_deref().unwrap_or("");
    let category = product.category.as_deref().unwrap_or("");
    let key_features = product.key_features.join(" ");
    let specifications = product
        .specifications
        .values()
        .map(spec_value_text)
        .collect::<Vec<_>>()
        .join(" ");

    [
        name,
        description,
        category,
        category,
        key_features.as_str(),
        specifications.as_str(),
    ]
    .join(" ")
}

/// Strings verbatim, null as empty, everything else as its JSON text.
fn spec_value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
