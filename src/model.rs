//! Entities managed by the dashboard.

use serde::{Deserialize, Serialize};

use crate::resource::Entity;

/// A member of staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Employee {
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
            role: role.into(),
            phone: None,
        }
    }
}

impl Entity for Employee {
    type Id = u64;
    const ENDPOINT: &'static str = "/employees";
    const TAG: &'static str = "employees";

    fn id(&self) -> Option<&u64> {
        self.id.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProceedingStatus {
    #[default]
    Active,
    Suspended,
    Closed,
}

/// A legal proceeding followed by the association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalProceeding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    /// Court-assigned case number.
    pub process_number: String,
    pub title: String,
    #[serde(default)]
    pub court: String,
    #[serde(default)]
    pub status: ProceedingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible_employee_id: Option<u64>,
}

impl LegalProceeding {
    pub fn new(process_number: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: None,
            process_number: process_number.into(),
            title: title.into(),
            court: String::new(),
            status: ProceedingStatus::default(),
            responsible_employee_id: None,
        }
    }
}

impl Entity for LegalProceeding {
    type Id = u64;
    const ENDPOINT: &'static str = "/legal-proceedings";
    const TAG: &'static str = "proceedings";

    fn id(&self) -> Option<&u64> {
        self.id.as_ref()
    }
}

/// A reference link shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsefulLink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl UsefulLink {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            url: url.into(),
            description: None,
            category: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

impl Entity for UsefulLink {
    type Id = u64;
    const ENDPOINT: &'static str = "/useful-links";
    const TAG: &'static str = "links";

    fn id(&self) -> Option<&u64> {
        self.id.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_entities_have_no_identifier() {
        assert!(Employee::new("Ada", "ada@example.org", "Clerk").id().is_none());
        assert!(LegalProceeding::new("0001234-56", "Tenure dispute").id().is_none());
        assert!(UsefulLink::new("Court", "https://court.example").id().is_none());
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let mut proceeding = LegalProceeding::new("0001234-56", "Tenure dispute");
        proceeding.responsible_employee_id = Some(3);

        let value = serde_json::to_value(&proceeding).expect("serializable");
        assert_eq!(
            value,
            json!({
                "processNumber": "0001234-56",
                "title": "Tenure dispute",
                "court": "",
                "status": "active",
                "responsibleEmployeeId": 3
            })
        );
    }

    #[test]
    fn test_identifier_comes_from_server() {
        let link: UsefulLink = serde_json::from_value(json!({
            "id": 12,
            "title": "Bar association",
            "url": "https://bar.example",
            "category": "institutions"
        }))
        .expect("valid link");

        assert_eq!(link.id(), Some(&12));
        assert_eq!(link.category.as_deref(), Some("institutions"));
        assert!(link.description.is_none());
    }
}
