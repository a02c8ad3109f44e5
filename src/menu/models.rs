use serde::{Deserialize, Serialize};

use crate::timing::daily::DayHours;

/// A row with a display rank, reordered by drag and drop in the admin panel.
pub trait Sequenced {
    fn seq(&self) -> i64;
    fn set_seq(&mut self, seq: i64);
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub seq: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub seq: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemOption {
    pub id: i64,
    pub menu_item_id: i64,
    pub name: String,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub seq: i64,
    pub created_at: String,
    pub updated_at: String,
}

macro_rules! impl_sequenced {
    ($($model:ty),*) => {
        $(impl Sequenced for $model {
            fn seq(&self) -> i64 {
                self.seq
            }

            fn set_seq(&mut self, seq: i64) {
                self.seq = seq;
            }
        })*
    };
}

impl_sequenced!(Category, MenuItem, ItemOption);

/// Fields the admin panel submits when creating or editing a category.
#[derive(Clone, Debug, Deserialize)]
pub struct CategoryForm {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MenuItemForm {
    pub name: String,
    pub description: Option<String>,
    pub price: Option<f64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ItemOptionForm {
    pub name: String,
    pub description: Option<String>,
    pub price: Option<f64>,
}

/// A message left through the public contact form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    pub created_at: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MessageForm {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub id: i64,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub hours_of_operation: Option<Vec<DayHours>>,
    pub facebook_url: Option<String>,
    pub instagram_url: Option<String>,
    pub tiktok_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    BasicUser,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::BasicUser => "basic_user",
            Role::Admin => "admin",
        }
    }

    /// Unknown values are treated as the least privileged role.
    pub fn parse(role: &str) -> Self {
        match role {
            "admin" => Role::Admin,
            _ => Role::BasicUser,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserRole {
    pub id: i64,
    pub user_id: String,
    pub role: Role,
    pub created_at: String,
    pub updated_at: String,
}
