//! Category Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::Percent;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Category {
    id: Uuid,
    name: String,
    description: Option<String>,
    offer: Option<Percent>,
    listed: bool,
    created_at: DateTime<Utc>,
}

impl Category {
    pub fn create(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into().trim().to_string(),
            description,
            offer: None,
            listed: true,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn description(&self) -> Option<&str> { self.description.as_deref() }
    pub fn offer(&self) -> Option<Percent> { self.offer }
    pub fn is_listed(&self) -> bool { self.listed }

    /// Case-insensitive name comparison used for uniqueness checks.
    pub fn has_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.trim())
    }

    pub fn update(&mut self, name: impl Into<String>, description: Option<String>) {
        self.name = name.into().trim().to_string();
        self.description = description;
    }

    pub fn set_offer(&mut self, offer: Option<Percent>) { self.offer = offer; }
    pub fn list(&mut self) { self.listed = true; }
    pub fn unlist(&mut self) { self.listed = false; }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_matching_ignores_case_and_whitespace() {
        let mut c = Category::create(" Shoes ", None);
        assert_eq!(c.name(), "Shoes");
        assert!(c.has_name("shoes "));
        c.unlist();
        assert!(!c.is_listed());
    }
}
