//! RawContact to ContactRow conversion.
//!
//! Each column is resolved on its own with a first-entry-wins rule: the
//! first entry of the relevant list is used and anything missing becomes an
//! empty string. Provider "primary" markers are not consulted. Organization
//! and Title are both read from the first organization entry, so a title on
//! a later entry is never borrowed.

use contacts_export_core::ContactRow;

use crate::raw_contact::{RawContact, RawName, RawValue};

/// Converts a [`RawContact`] to a [`ContactRow`].
///
/// Never fails: a contact with no usable data yields a row of empty strings.
pub fn normalize_contact(raw: &RawContact) -> ContactRow {
    let first_org = raw.organizations.first();
    let metadata = raw.metadata.as_ref();

    ContactRow {
        name: raw.names.first().map(name_of).unwrap_or_default(),
        email: first_value(&raw.email_addresses),
        phone: first_value(&raw.phone_numbers),
        organization: first_org
            .and_then(|org| org.name.clone())
            .unwrap_or_default(),
        title: first_org
            .and_then(|org| org.title.clone())
            .unwrap_or_default(),
        created: metadata.and_then(|m| m.created.clone()).unwrap_or_default(),
        updated: metadata.and_then(|m| m.updated.clone()).unwrap_or_default(),
    }
}

/// Converts a batch of contacts, preserving order.
pub fn normalize_contacts(raw: &[RawContact]) -> Vec<ContactRow> {
    raw.iter().map(normalize_contact).collect()
}

/// Display name of a name entry, falling back to its given name.
fn name_of(name: &RawName) -> String {
    name.display_name
        .as_deref()
        .filter(|s| !s.is_empty())
        .or(name.given_name.as_deref())
        .unwrap_or_default()
        .to_string()
}

fn first_value(entries: &[RawValue]) -> String {
    entries
        .first()
        .and_then(|e| e.value.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw_contact::{RawContactMetadata, RawOrganization};

    #[test]
    fn empty_contact_yields_blank_row() {
        let row = normalize_contact(&RawContact::new());
        assert_eq!(row, ContactRow::default());
        assert!(row.is_blank());
    }

    #[test]
    fn empty_lists_yield_empty_fields() {
        let raw = RawContact::new().with_timestamps(Some("2021-06-02T18:44:32Z"), None::<String>);
        let row = normalize_contact(&raw);
        assert_eq!(row.name, "");
        assert_eq!(row.email, "");
        assert_eq!(row.phone, "");
        assert_eq!(row.organization, "");
        assert_eq!(row.title, "");
        assert_eq!(row.created, "2021-06-02T18:44:32Z");
        assert_eq!(row.updated, "");
    }

    #[test]
    fn first_email_wins() {
        let raw = RawContact::new().with_email("a@x.com").with_email("b@x.com");
        assert_eq!(normalize_contact(&raw).email, "a@x.com");
    }

    #[test]
    fn first_phone_wins_even_when_duplicated() {
        let raw = RawContact::new()
            .with_phone("+1 111")
            .with_phone("+1 222")
            .with_phone("+1 111");
        assert_eq!(normalize_contact(&raw).phone, "+1 111");
    }

    #[test]
    fn title_comes_from_first_organization_only() {
        let raw = RawContact::new()
            .with_organization(RawOrganization::new("Acme", ""))
            .with_organization(RawOrganization::new("Other", "CEO"));
        let row = normalize_contact(&raw);
        assert_eq!(row.organization, "Acme");
        assert_eq!(row.title, "");
    }

    #[test]
    fn organization_without_name_keeps_its_title() {
        let raw = RawContact::new()
            .with_organization(RawOrganization {
                name: None,
                title: Some("Consultant".into()),
            })
            .with_organization(RawOrganization::new("Other", "CEO"));
        let row = normalize_contact(&raw);
        assert_eq!(row.organization, "");
        assert_eq!(row.title, "Consultant");
    }

    #[test]
    fn entry_without_value_is_not_skipped() {
        let mut raw = RawContact::new().with_email("second@x.com");
        raw.email_addresses.insert(0, RawValue { value: None });
        assert_eq!(normalize_contact(&raw).email, "");
    }

    #[test]
    fn name_falls_back_to_given_name_of_first_entry() {
        let mut raw = RawContact::new().with_name("Later Display");
        raw.names.insert(
            0,
            RawName {
                display_name: None,
                given_name: Some("Ada".into()),
            },
        );
        assert_eq!(normalize_contact(&raw).name, "Ada");
    }

    #[test]
    fn timestamps_pass_through_verbatim() {
        let raw = RawContact {
            metadata: Some(RawContactMetadata {
                created: Some("2021-06-02T18:44:32.123456Z".into()),
                updated: Some("not even a date".into()),
            }),
            ..Default::default()
        };
        let row = normalize_contact(&raw);
        assert_eq!(row.created, "2021-06-02T18:44:32.123456Z");
        assert_eq!(row.updated, "not even a date");
    }

    #[test]
    fn full_contact() {
        let raw = RawContact::new()
            .with_name("John Doe")
            .with_email("john@example.com")
            .with_phone("+1 555 555 1234")
            .with_organization(RawOrganization::new("Acme Corp", "Software Engineer"))
            .with_timestamps(Some("2021-06-02T18:44:32Z"), Some("2024-10-05T09:21:17Z"));

        let row = normalize_contact(&raw);
        assert_eq!(
            row.fields(),
            [
                "John Doe",
                "john@example.com",
                "+1 555 555 1234",
                "Acme Corp",
                "Software Engineer",
                "2021-06-02T18:44:32Z",
                "2024-10-05T09:21:17Z",
            ]
        );
    }

    #[test]
    fn batch_preserves_order() {
        let raw: Vec<RawContact> = (0..5)
            .map(|i| RawContact::new().with_name(format!("c{i}")))
            .collect();
        let names: Vec<String> = normalize_contacts(&raw).into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["c0", "c1", "c2", "c3", "c4"]);
    }
}
