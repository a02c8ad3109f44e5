use std::collections::HashMap;

use serde::Serialize;

use super::models::{Category, ItemOption, MenuItem};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MenuItemWithOptions {
    #[serde(flatten)]
    pub item: MenuItem,
    pub options: Vec<ItemOption>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryWithItems {
    #[serde(flatten)]
    pub category: Category,
    pub items: Vec<MenuItemWithOptions>,
}

/**
Assembles the public menu out of the three flat tables.

Every level is sorted by `seq`. Items whose category isn't in `categories`, and
options whose item isn't in `items`, are left out.
*/
pub fn build_menu(
    mut categories: Vec<Category>,
    mut items: Vec<MenuItem>,
    mut options: Vec<ItemOption>,
) -> Vec<CategoryWithItems> {
    categories.sort_by_key(|category| category.seq);
    items.sort_by_key(|item| item.seq);
    options.sort_by_key(|option| option.seq);

    let mut options_by_item: HashMap<i64, Vec<ItemOption>> = HashMap::new();
    for option in options {
        options_by_item.entry(option.menu_item_id).or_default().push(option);
    }

    let mut items_by_category: HashMap<i64, Vec<MenuItemWithOptions>> = HashMap::new();
    for item in items {
        let options = options_by_item.remove(&item.id).unwrap_or_default();
        items_by_category
            .entry(item.category_id)
            .or_default()
            .push(MenuItemWithOptions { item, options });
    }

    categories
        .into_iter()
        .map(|category| CategoryWithItems {
            items: items_by_category.remove(&category.id).unwrap_or_default(),
            category,
        })
        .collect()
}
