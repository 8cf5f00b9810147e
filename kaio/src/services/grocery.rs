//! Grocery list tracking
//!
//! Items are located by their store-assigned id. Every operation on a
//! missing id is a no-op that reports `false`.

use crate::config::GROCERY_ID_PREFIX;
use crate::models::{GroceryDraft, GroceryItem};
use std::collections::BTreeMap;

/// Trimmed, lowercased category
pub fn normalize_category(category: &str) -> String {
    category.trim().to_lowercase()
}

/// Fresh list from generator output: new ids, nothing purchased.
pub fn build_list(drafts: Vec<GroceryDraft>) -> Vec<GroceryItem> {
    drafts
        .into_iter()
        .enumerate()
        .map(|(index, draft)| GroceryItem {
            id: format!("{}{}", GROCERY_ID_PREFIX, index),
            name: draft.name,
            category: normalize_category(&draft.category),
            purchased: false,
        })
        .collect()
}

pub fn toggle(items: &mut [GroceryItem], id: &str) -> bool {
    match items.iter_mut().find(|item| item.id == id) {
        Some(item) => {
            item.purchased = !item.purchased;
            true
        }
        None => false,
    }
}

pub fn delete(items: &mut Vec<GroceryItem>, id: &str) -> bool {
    let before = items.len();
    items.retain(|item| item.id != id);
    items.len() != before
}

pub fn rename(items: &mut [GroceryItem], id: &str, name: &str) -> bool {
    match items.iter_mut().find(|item| item.id == id) {
        Some(item) => {
            item.name = name.to_string();
            true
        }
        None => false,
    }
}

pub fn recategorize(items: &mut [GroceryItem], id: &str, category: &str) -> bool {
    match items.iter_mut().find(|item| item.id == id) {
        Some(item) => {
            item.category = normalize_category(category);
            true
        }
        None => false,
    }
}

/// Items of one category with purchase progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroceryGroup<'a> {
    pub category: &'a str,
    pub items: Vec<&'a GroceryItem>,
    pub purchased: usize,
}

/// Group by category in alphabetical order, keeping list order inside groups.
pub fn group_by_category(items: &[GroceryItem]) -> Vec<GroceryGroup<'_>> {
    let mut groups: BTreeMap<&str, Vec<&GroceryItem>> = BTreeMap::new();
    for item in items {
        groups.entry(item.category.as_str()).or_default().push(item);
    }

    groups
        .into_iter()
        .map(|(category, items)| GroceryGroup {
            category,
            purchased: items.iter().filter(|i| i.purchased).count(),
            items,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drafts() -> Vec<GroceryDraft> {
        [
            ("Chicken breast", "Protein"),
            ("Broccoli", "produce "),
            ("Greek yogurt", "dairy"),
            ("Chiken", "Protein "),
        ]
        .iter()
        .map(|(name, category)| GroceryDraft {
            name: name.to_string(),
            category: category.to_string(),
        })
        .collect()
    }

    #[test]
    fn test_build_list_assigns_ids() {
        let items = build_list(drafts());

        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["grocery-0", "grocery-1", "grocery-2", "grocery-3"]);
        assert!(items.iter().all(|i| !i.purchased));
        assert_eq!(items[1].category, "produce");
    }

    #[test]
    fn test_recategorize_normalizes_and_keeps_name() {
        let mut items = build_list(drafts());
        items[3].category = "Protein ".to_string();

        assert!(recategorize(&mut items, "grocery-3", "Protein "));
        assert_eq!(items[3].category, "protein");
        assert_eq!(items[3].name, "Chiken");
    }

    #[test]
    fn test_missing_id_is_noop() {
        let mut items = build_list(drafts());
        let before = items.clone();

        assert!(!toggle(&mut items, "grocery-99"));
        assert!(!delete(&mut items, "grocery-99"));
        assert!(!rename(&mut items, "grocery-99", "x"));
        assert!(!recategorize(&mut items, "grocery-99", "x"));
        assert_eq!(items, before);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut items = build_list(drafts());

        assert!(delete(&mut items, "grocery-1"));
        assert!(!delete(&mut items, "grocery-1"));
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_group_by_category() {
        let mut items = build_list(drafts());
        toggle(&mut items, "grocery-0");

        let groups = group_by_category(&items);
        let names: Vec<&str> = groups.iter().map(|g| g.category).collect();
        assert_eq!(names, vec!["dairy", "produce", "protein"]);

        let protein = &groups[2];
        assert_eq!(protein.items.len(), 2);
        assert_eq!(protein.purchased, 1);
    }
}
