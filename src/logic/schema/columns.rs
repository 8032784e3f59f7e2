//! Column Names - normalization + legacy alias table
//!
//! Both sides of the alignment go through `canonical_column`, so a schema
//! exported as `"tr_p3"` and a fused feature named `issue_3` meet in the
//! middle.
//!
//! ## Alias table
//! | legacy spelling              | canonical name              |
//! |------------------------------|-----------------------------|
//! | `tr_p{i}` (i in 0..10)       | `issue_{i}`                 |
//! | `sk_p{i}` (i in 0..3)        | `skin_prob_{Dry,Normal,Oily}` |
//! | `predicted_skin_label_{X}`   | `skin_{X}`                  |
//! | `alcohol_consumption_No`     | `alcohol_consumption_None`  |
//! | `smoker`                     | `smoker_Yes`                |

use crate::logic::detection::ISSUE_CLASS_COUNT;
use crate::logic::skin::SkinType;

/// Trim, strip quote characters, trim again
pub fn normalize_column_name(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| *c != '"' && *c != '\'')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Normalized name with legacy spellings mapped to canonical feature names.
/// Names outside the alias table pass through unchanged.
pub fn canonical_column(raw: &str) -> String {
    let name = normalize_column_name(raw);
    resolve_alias(&name).unwrap_or(name)
}

fn resolve_alias(name: &str) -> Option<String> {
    if let Some(index) = indexed_suffix(name, "tr_p") {
        return (index < ISSUE_CLASS_COUNT).then(|| format!("issue_{}", index));
    }

    if let Some(index) = indexed_suffix(name, "sk_p") {
        return SkinType::from_index(index).map(|s| format!("skin_prob_{}", s.as_str()));
    }

    if let Some(label) = name.strip_prefix("predicted_skin_label_") {
        return Some(format!("skin_{}", label));
    }

    match name {
        "alcohol_consumption_No" => Some("alcohol_consumption_None".to_string()),
        "smoker" => Some("smoker_Yes".to_string()),
        _ => None,
    }
}

/// `tr_p7` → Some(7) for prefix `tr_p`
fn indexed_suffix(name: &str, prefix: &str) -> Option<usize> {
    let digits = name.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
