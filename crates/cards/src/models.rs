use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidationError};

/// Caller-defined extension fields attached to a card, kept in insertion order.
pub type FieldsData = Map<String, Value>;

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct Card {
    pub id: i64,
    pub title: String,
    pub column: String,
    pub fields_data: FieldsData,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCardRequest {
    #[validate(custom(function = "not_blank", message = "title cannot be empty"))]
    pub title: String,
    #[validate(custom(function = "not_blank", message = "column cannot be empty"))]
    pub column: String,
    #[serde(default)]
    pub fields_data: Option<FieldsData>,
}

/// Partial update. `None` means "leave as stored".
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCardRequest {
    #[validate(custom(function = "not_blank", message = "title cannot be empty"))]
    pub title: Option<String>,
    #[validate(custom(function = "not_blank", message = "column cannot be empty"))]
    pub column: Option<String>,
    pub fields_data: Option<FieldsData>,
}

impl UpdateCardRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.column.is_none() && self.fields_data.is_none()
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Shallow merge: top-level keys from `incoming` replace those in `current`,
/// everything else in `current` is kept. Nested objects are replaced whole.
pub fn merge_fields(mut current: FieldsData, incoming: FieldsData) -> FieldsData {
    current.extend(incoming);
    current
}
