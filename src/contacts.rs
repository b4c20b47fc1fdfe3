use crate::db_types::Contact;
use crate::error::AppError;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Body for creating or editing a contact.
#[derive(Clone, Debug, Deserialize)]
pub struct ContactInput {
    pub phone: String,
    #[serde(default)]
    pub additional_fields: BTreeMap<String, String>,
}

impl ContactInput {
    /// Trim the phone number and reject it if nothing is left. Blank field names are dropped.
    pub fn validate(self) -> Result<ContactInput, AppError> {
        let phone = self.phone.trim().to_string();
        if phone.is_empty() {
            return Err(AppError::validation("phone is required"));
        }
        let additional_fields = self
            .additional_fields
            .into_iter()
            .filter(|(k, _)| !k.trim().is_empty())
            .collect();
        Ok(ContactInput {
            phone,
            additional_fields,
        })
    }
}

/// Phone substring, or any extra field value containing the query (case-insensitive).
pub fn matches_search(contact: &Contact, query: &str) -> bool {
    if query.is_empty() || contact.phone.contains(query) {
        return true;
    }
    let query = query.to_lowercase();
    contact
        .additional_fields
        .values()
        .any(|v| v.to_lowercase().contains(&query))
}

pub fn filter_contacts(contacts: Vec<Contact>, query: Option<&str>) -> Vec<Contact> {
    match query.map(str::trim) {
        Some(q) if !q.is_empty() => contacts.into_iter().filter(|c| matches_search(c, q)).collect(),
        _ => contacts,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactReason {
    General,
    Sales,
    Support,
    Partnership,
    Demo,
}

impl ContactReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactReason::General => "general",
            ContactReason::Sales => "sales",
            ContactReason::Support => "support",
            ContactReason::Partnership => "partnership",
            ContactReason::Demo => "demo",
        }
    }
}

/// "Contact us" form submission.
#[derive(Clone, Debug, Deserialize)]
pub struct ContactMessage {
    pub full_name: String,
    pub email: String,
    pub company: String,
    pub reason: Option<ContactReason>,
    pub message: String,
}

impl ContactMessage {
    pub fn validate(self) -> Result<(ContactMessage, ContactReason), AppError> {
        for (name, value) in [
            ("full_name", &self.full_name),
            ("email", &self.email),
            ("company", &self.company),
            ("message", &self.message),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::validation(format!("{name} is required")));
            }
        }
        if !self.email.contains('@') {
            return Err(AppError::validation("email is invalid"));
        }
        let reason = self.reason.ok_or_else(|| AppError::validation("reason is required"))?;
        Ok((self, reason))
    }
}
