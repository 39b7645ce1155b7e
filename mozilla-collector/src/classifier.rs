use crate::types::{Category, CollectorError, Result};
use crate::utils::{parse_timestamp, scalar_to_string};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Extracts identity, update time and category from a decoded record.
///
/// The strategy is picked when the source is built. Every variant but
/// `Probe` knows the kind of record it will see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemClassifier {
    /// Kitsune questions.
    Question,
    /// ReMo events.
    Event,
    /// ReMo activity reports.
    Activity,
    /// ReMo reps.
    User,
    /// ReMo records of unknown kind.
    ///
    /// Fallback for ledgers replayed without a category selector: the kind is
    /// guessed from fields unique to each record type. This only holds as long
    /// as the API keeps those fields distinct.
    Probe,
}

impl ItemClassifier {
    pub fn for_category(category: Category) -> Self {
        match category {
            Category::Question => ItemClassifier::Question,
            Category::Event => ItemClassifier::Event,
            Category::Activity => ItemClassifier::Activity,
            Category::User => ItemClassifier::User,
        }
    }

    pub fn identify(&self, item: &Value) -> Result<String> {
        let field = match self {
            ItemClassifier::Question => "id",
            _ => "remo_url",
        };
        item.get(field)
            .and_then(scalar_to_string)
            .ok_or_else(|| CollectorError::Classification {
                id: "<unidentified>".to_string(),
                reason: format!("missing '{}' field", field),
            })
    }

    pub fn updated_at(&self, item: &Value) -> Result<DateTime<Utc>> {
        let candidates: &[&str] = match self {
            ItemClassifier::Question => &["updated"],
            ItemClassifier::Event => &["end"],
            ItemClassifier::Activity => &["report_date"],
            ItemClassifier::User => &["date_joined_program"],
            ItemClassifier::Probe => &["end", "date_joined_program", "report_date"],
        };

        let Some((field, raw)) = candidates
            .iter()
            .find_map(|field| item.get(*field).and_then(Value::as_str).map(|raw| (*field, raw)))
        else {
            return Err(self.failure(item, format!("can't find updated field among {:?}", candidates)));
        };

        parse_timestamp(raw).ok_or_else(|| self.failure(item, format!("invalid date '{}' in '{}'", raw, field)))
    }

    pub fn classify(&self, item: &Value) -> Result<Category> {
        match self {
            ItemClassifier::Question => Ok(Category::Question),
            ItemClassifier::Event => Ok(Category::Event),
            ItemClassifier::Activity => Ok(Category::Activity),
            ItemClassifier::User => Ok(Category::User),
            ItemClassifier::Probe => {
                if item.get("estimated_attendance").is_some() {
                    Ok(Category::Event)
                } else if item.get("activity").is_some() {
                    Ok(Category::Activity)
                } else if item.get("first_name").is_some() {
                    Ok(Category::User)
                } else {
                    Err(self.failure(item, "no field identifies its category".to_string()))
                }
            }
        }
    }

    fn failure(&self, item: &Value, reason: String) -> CollectorError {
        CollectorError::Classification {
            id: self.identify(item).unwrap_or_else(|_| "<unidentified>".to_string()),
            reason,
        }
    }
}
