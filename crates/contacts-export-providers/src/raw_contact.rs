//! Raw contact type from contact providers.
//!
//! [`RawContact`] keeps the per-field entry lists exactly as the provider
//! returned them: in order, possibly empty, possibly with duplicates, and
//! with every sub-field optional. Choosing which entry ends up in the
//! export is the normalizer's job.

use serde::{Deserialize, Serialize};

/// One name entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawName {
    /// The formatted display name.
    pub display_name: Option<String>,
    /// The given (first) name.
    pub given_name: Option<String>,
}

impl RawName {
    /// Creates a name entry with a display name.
    pub fn display(name: impl Into<String>) -> Self {
        Self {
            display_name: Some(name.into()),
            given_name: None,
        }
    }
}

/// A single-valued entry such as an email address or a phone number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawValue {
    /// The entry value, as entered by the user.
    pub value: Option<String>,
}

impl RawValue {
    /// Creates an entry with a value.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
        }
    }
}

/// One organization entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOrganization {
    /// Organization name.
    pub name: Option<String>,
    /// Job title within the organization.
    pub title: Option<String>,
}

impl RawOrganization {
    /// Creates an organization entry; empty strings are kept as given.
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            title: Some(title.into()),
        }
    }
}

/// Record-level timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawContactMetadata {
    /// When the contact was created (ISO 8601 UTC).
    pub created: Option<String>,
    /// When the contact was last updated (ISO 8601 UTC).
    pub updated: Option<String>,
}

/// A contact as delivered by a provider, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawContact {
    /// Provider identifier (e.g. `people/c123`).
    pub resource_name: Option<String>,
    /// Name entries.
    pub names: Vec<RawName>,
    /// Email entries.
    pub email_addresses: Vec<RawValue>,
    /// Phone entries.
    pub phone_numbers: Vec<RawValue>,
    /// Organization entries.
    pub organizations: Vec<RawOrganization>,
    /// Timestamps, if the provider sent any.
    pub metadata: Option<RawContactMetadata>,
}

impl RawContact {
    /// Creates an empty contact.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the resource name.
    pub fn with_resource_name(mut self, resource_name: impl Into<String>) -> Self {
        self.resource_name = Some(resource_name.into());
        self
    }

    /// Builder method to append a display name entry.
    pub fn with_name(mut self, display_name: impl Into<String>) -> Self {
        self.names.push(RawName::display(display_name));
        self
    }

    /// Builder method to append an email entry.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email_addresses.push(RawValue::new(email));
        self
    }

    /// Builder method to append a phone entry.
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone_numbers.push(RawValue::new(phone));
        self
    }

    /// Builder method to append an organization entry.
    pub fn with_organization(mut self, organization: RawOrganization) -> Self {
        self.organizations.push(organization);
        self
    }

    /// Builder method to set the creation and update timestamps.
    pub fn with_timestamps(
        mut self,
        created: Option<impl Into<String>>,
        updated: Option<impl Into<String>>,
    ) -> Self {
        self.metadata = Some(RawContactMetadata {
            created: created.map(Into::into),
            updated: updated.map(Into::into),
        });
        self
    }
}
