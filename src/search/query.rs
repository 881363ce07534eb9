use crate::model::{Item, Location, StorageBox};

/// Trimmed, lower-cased query; `None` when nothing is left to search for.
pub fn normalize_query(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Entities that expose free-text fields to search.
pub trait Searchable {
    fn search_fields(&self) -> Vec<&str>;
}

impl Searchable for Item {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str()];
        fields.extend(self.category.as_deref());
        fields.extend(self.notes.as_deref());
        fields.extend(self.tags.iter().map(String::as_str));
        fields
    }
}

impl Searchable for StorageBox {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str()];
        fields.extend(self.description.as_deref());
        fields
    }
}

impl Searchable for Location {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![
            self.room.as_str(),
            self.furniture.as_str(),
            self.position.as_str(),
        ];
        fields.extend(self.notes.as_deref());
        fields
    }
}

/// `needle` must already be normalised. Plain substring containment: `%`,
/// `_` and friends carry no special meaning.
pub fn matches<T: Searchable + ?Sized>(needle: &str, entity: &T) -> bool {
    entity
        .search_fields()
        .into_iter()
        .any(|field| field.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str) -> Item {
        Item {
            id: "i".into(),
            box_id: "b".into(),
            name: name.into(),
            category: Some("Electronics".into()),
            quantity: 1,
            photo_path: None,
            notes: Some("USB-C, 65W".into()),
            tags: vec!["travel".into()],
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn normalizes_and_rejects_blank() {
        assert_eq!(normalize_query("  ChArG \n").as_deref(), Some("charg"));
        assert_eq!(normalize_query(""), None);
        assert_eq!(normalize_query(" \t "), None);
    }

    #[test]
    fn item_fields_are_searched() {
        let charger = item("Charger");
        assert!(matches("charg", &charger));
        assert!(matches("electron", &charger));
        assert!(matches("65w", &charger));
        assert!(matches("trav", &charger));
        assert!(!matches("sweater", &charger));
    }

    #[test]
    fn wildcards_are_literal() {
        let charger = item("Charger");
        assert!(!matches("c%r", &charger));
        assert!(!matches("_harger", &charger));
        assert!(matches("usb-c,", &charger));
    }

    #[test]
    fn box_and_location_fields() {
        let storage_box = StorageBox {
            id: "b".into(),
            name: "Winter clothes".into(),
            description: Some("Scarves and gloves".into()),
            location_id: None,
            photo_path: None,
            created_at: 0,
            updated_at: 0,
        };
        assert!(matches("glove", &storage_box));
        assert!(!matches("sock", &storage_box));

        let location = Location {
            id: "l".into(),
            room: "Bedroom".into(),
            furniture: "Wardrobe".into(),
            position: "Top shelf".into(),
            photo_path: None,
            notes: Some("behind the blankets".into()),
            created_at: 0,
        };
        assert!(matches("wardr", &location));
        assert!(matches("blanket", &location));
        assert!(!matches("garage", &location));
    }
}
