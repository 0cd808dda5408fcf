//! The flat, exported shape of a contact.

use serde::Serialize;

/// Column names of the exported CSV, in output order.
pub const CSV_HEADER: [&str; 7] = [
    "Name",
    "Email",
    "Phone",
    "Organization",
    "Title",
    "Created",
    "Updated",
];

/// One exported contact.
///
/// Every column is always present; a value the provider did not supply is
/// an empty string, never a missing cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContactRow {
    /// Display name.
    #[serde(rename = "Name")]
    pub name: String,
    /// First email address.
    #[serde(rename = "Email")]
    pub email: String,
    /// First phone number.
    #[serde(rename = "Phone")]
    pub phone: String,
    /// Name of the first organization.
    #[serde(rename = "Organization")]
    pub organization: String,
    /// Job title at the first organization.
    #[serde(rename = "Title")]
    pub title: String,
    /// Creation timestamp as reported by the provider (ISO 8601 UTC).
    #[serde(rename = "Created")]
    pub created: String,
    /// Last update timestamp as reported by the provider (ISO 8601 UTC).
    #[serde(rename = "Updated")]
    pub updated: String,
}

impl ContactRow {
    /// Returns the column values in [`CSV_HEADER`] order.
    pub fn fields(&self) -> [&str; 7] {
        [
            self.name.as_str(),
            self.email.as_str(),
            self.phone.as_str(),
            self.organization.as_str(),
            self.title.as_str(),
            self.created.as_str(),
            self.updated.as_str(),
        ]
    }

    /// Returns true if every column is empty.
    pub fn is_blank(&self) -> bool {
        self.fields().iter().all(|f| f.is_empty())
    }
}
