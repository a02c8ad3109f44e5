use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{
    types::Type, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};

use crate::{
    menu::models::{
        Category, CategoryForm, CompanyProfile, ItemOption, ItemOptionForm, MenuItem,
        MenuItemForm, Message, MessageForm, Role, UserRole,
    },
    timing::daily::DayHours,
};

pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Tables that are addressed generically (count, delete, reorder).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Table {
    Category,
    MenuItem,
    ItemOptions,
    Messages,
    UserRoles,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Category => "category",
            Table::MenuItem => "menu_item",
            Table::ItemOptions => "item_options",
            Table::Messages => "messages",
            Table::UserRoles => "user_roles",
        }
    }
}

pub struct SqliteDatabase {}

impl SqliteDatabase {
    /**
    Start a transaction that holds the write lock from its first statement.

    Read-then-write sequences (next rank, reorder, copy hours) run inside one of
    these so that two admins can't interleave between the read and the write.
    */
    pub fn begin_write(connection: &mut Connection) -> rusqlite::Result<Transaction<'_>> {
        connection.transaction_with_behavior(TransactionBehavior::Immediate)
    }

    /**
    Get the company profile.

    Returns an `Ok(None)` if nothing has been saved yet.
    A `hours_of_operation` value that isn't a valid week is a conversion error.
    */
    pub fn query_profile(connection: &Connection) -> rusqlite::Result<Option<CompanyProfile>> {
        connection
            .query_row(
                "SELECT id, phone_number, email, hours_of_operation, facebook_url, instagram_url,
                        tiktok_url, created_at, updated_at
                 FROM company_profile ORDER BY id LIMIT 1",
                (),
                |row| {
                    let id: i64 = row.get(0)?;
                    let hours: Option<String> = row.get(3)?;
                    let hours_of_operation = match hours {
                        None => None,
                        Some(hours) => Some(serde_json::from_str(&hours).map_err(|err| {
                            tracing::warn!(id, error = %err, "Stored hours are unreadable");
                            rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(err))
                        })?),
                    };
                    Ok(CompanyProfile {
                        id,
                        phone_number: row.get(1)?,
                        email: row.get(2)?,
                        hours_of_operation,
                        facebook_url: row.get(4)?,
                        instagram_url: row.get(5)?,
                        tiktok_url: row.get(6)?,
                        created_at: row.get(7)?,
                        updated_at: row.get(8)?,
                    })
                },
            )
            .optional()
    }

    /**
    Store the weekly hours on the profile.

    Updates the existing profile row, or creates the profile if there is none.
    */
    pub fn save_hours(
        connection: &Connection,
        hours: &[DayHours],
        now: &str,
    ) -> rusqlite::Result<()> {
        let hours = serde_json::to_string(hours)
            .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))?;
        let updated = connection.execute(
            "UPDATE company_profile SET hours_of_operation = ?1, updated_at = ?2
             WHERE id = (SELECT id FROM company_profile ORDER BY id LIMIT 1)",
            rusqlite::params![hours, now],
        )?;
        if updated == 0 {
            connection.execute(
                "INSERT INTO company_profile (hours_of_operation, created_at, updated_at)
                 VALUES (?1, ?2, ?2)",
                rusqlite::params![hours, now],
            )?;
        }
        Ok(())
    }

    fn category_from_row(row: &Row) -> rusqlite::Result<Category> {
        Ok(Category {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            seq: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    /// All categories, ordered by `seq`.
    pub fn query_categories(connection: &Connection) -> rusqlite::Result<Vec<Category>> {
        let mut statement = connection.prepare(
            "SELECT id, name, description, seq, created_at, updated_at
             FROM category ORDER BY seq, id",
        )?;
        let rows = statement.query_map((), Self::category_from_row)?;
        rows.collect()
    }

    pub fn insert_category(
        connection: &Connection,
        form: &CategoryForm,
        seq: i64,
        now: &str,
    ) -> rusqlite::Result<Category> {
        connection.execute(
            "INSERT INTO category (name, description, seq, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            rusqlite::params![form.name, form.description, seq, now],
        )?;
        Ok(Category {
            id: connection.last_insert_rowid(),
            name: form.name.clone(),
            description: form.description.clone(),
            seq,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        })
    }

    /// Returns `false` if no category has that id.
    pub fn update_category(
        connection: &Connection,
        id: i64,
        form: &CategoryForm,
        now: &str,
    ) -> rusqlite::Result<bool> {
        let updated = connection.execute(
            "UPDATE category SET name = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
            rusqlite::params![form.name, form.description, now, id],
        )?;
        Ok(updated > 0)
    }

    fn menu_item_from_row(row: &Row) -> rusqlite::Result<MenuItem> {
        Ok(MenuItem {
            id: row.get(0)?,
            category_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            price: row.get(4)?,
            seq: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    /// Items of one category, ordered by `seq`.
    pub fn query_menu_items(
        connection: &Connection,
        category_id: i64,
    ) -> rusqlite::Result<Vec<MenuItem>> {
        let mut statement = connection.prepare(
            "SELECT id, category_id, name, description, price, seq, created_at, updated_at
             FROM menu_item WHERE category_id = ?1 ORDER BY seq, id",
        )?;
        let rows = statement.query_map(
            rusqlite::params![category_id],
            Self::menu_item_from_row,
        )?;
        rows.collect()
    }

    pub fn query_all_menu_items(connection: &Connection) -> rusqlite::Result<Vec<MenuItem>> {
        let mut statement = connection.prepare(
            "SELECT id, category_id, name, description, price, seq, created_at, updated_at
             FROM menu_item ORDER BY seq, id",
        )?;
        let rows = statement.query_map((), Self::menu_item_from_row)?;
        rows.collect()
    }

    /// Fails with a constraint violation if the category doesn't exist.
    pub fn insert_menu_item(
        connection: &Connection,
        category_id: i64,
        form: &MenuItemForm,
        seq: i64,
        now: &str,
    ) -> rusqlite::Result<MenuItem> {
        connection.execute(
            "INSERT INTO menu_item
                (category_id, name, description, price, seq, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            rusqlite::params![category_id, form.name, form.description, form.price, seq, now],
        )?;
        Ok(MenuItem {
            id: connection.last_insert_rowid(),
            category_id,
            name: form.name.clone(),
            description: form.description.clone(),
            price: form.price,
            seq,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        })
    }

    pub fn update_menu_item(
        connection: &Connection,
        id: i64,
        form: &MenuItemForm,
        now: &str,
    ) -> rusqlite::Result<bool> {
        let updated = connection.execute(
            "UPDATE menu_item SET name = ?1, description = ?2, price = ?3, updated_at = ?4
             WHERE id = ?5",
            rusqlite::params![form.name, form.description, form.price, now, id],
        )?;
        Ok(updated > 0)
    }

    fn item_option_from_row(row: &Row) -> rusqlite::Result<ItemOption> {
        Ok(ItemOption {
            id: row.get(0)?,
            menu_item_id: row.get(1)?,
            name: row.get(2)?,
            price: row.get(3)?,
            description: row.get(4)?,
            seq: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    /// Options of one menu item, ordered by `seq`.
    pub fn query_item_options(
        connection: &Connection,
        menu_item_id: i64,
    ) -> rusqlite::Result<Vec<ItemOption>> {
        let mut statement = connection.prepare(
            "SELECT id, menu_item_id, name, price, description, seq, created_at, updated_at
             FROM item_options WHERE menu_item_id = ?1 ORDER BY seq, id",
        )?;
        let rows = statement.query_map(
            rusqlite::params![menu_item_id],
            Self::item_option_from_row,
        )?;
        rows.collect()
    }

    pub fn query_all_item_options(connection: &Connection) -> rusqlite::Result<Vec<ItemOption>> {
        let mut statement = connection.prepare(
            "SELECT id, menu_item_id, name, price, description, seq, created_at, updated_at
             FROM item_options ORDER BY seq, id",
        )?;
        let rows = statement.query_map((), Self::item_option_from_row)?;
        rows.collect()
    }

    pub fn insert_item_option(
        connection: &Connection,
        menu_item_id: i64,
        form: &ItemOptionForm,
        seq: i64,
        now: &str,
    ) -> rusqlite::Result<ItemOption> {
        connection.execute(
            "INSERT INTO item_options
                (menu_item_id, name, price, description, seq, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            rusqlite::params![menu_item_id, form.name, form.price, form.description, seq, now],
        )?;
        Ok(ItemOption {
            id: connection.last_insert_rowid(),
            menu_item_id,
            name: form.name.clone(),
            price: form.price,
            description: form.description.clone(),
            seq,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        })
    }

    pub fn update_item_option(
        connection: &Connection,
        id: i64,
        form: &ItemOptionForm,
        now: &str,
    ) -> rusqlite::Result<bool> {
        let updated = connection.execute(
            "UPDATE item_options SET name = ?1, price = ?2, description = ?3, updated_at = ?4
             WHERE id = ?5",
            rusqlite::params![form.name, form.price, form.description, now, id],
        )?;
        Ok(updated > 0)
    }

    pub fn insert_message(
        connection: &Connection,
        form: &MessageForm,
        now: &str,
    ) -> rusqlite::Result<Message> {
        connection.execute(
            "INSERT INTO messages (name, email, phone, subject, message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![form.name, form.email, form.phone, form.subject, form.message, now],
        )?;
        Ok(Message {
            id: connection.last_insert_rowid(),
            name: form.name.clone(),
            email: form.email.clone(),
            phone: form.phone.clone(),
            subject: form.subject.clone(),
            message: form.message.clone(),
            created_at: now.to_string(),
        })
    }

    /// All contact messages, newest first.
    pub fn query_messages(connection: &Connection) -> rusqlite::Result<Vec<Message>> {
        let mut statement = connection.prepare(
            "SELECT id, name, email, phone, subject, message, created_at
             FROM messages ORDER BY created_at DESC, id DESC",
        )?;
        let rows = statement.query_map((), |row| {
            Ok(Message {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                phone: row.get(3)?,
                subject: row.get(4)?,
                message: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?;
        rows.collect()
    }

    /**
    Get the role of a user.

    Returns an `Ok(None)` if the user has never been assigned one.
    */
    pub fn query_role(
        connection: &Connection,
        user_id: &str,
    ) -> rusqlite::Result<Option<UserRole>> {
        connection
            .query_row(
                "SELECT id, user_id, role, created_at, updated_at
                 FROM user_roles WHERE user_id = ?1",
                rusqlite::params![user_id],
                |row| {
                    let role: String = row.get(2)?;
                    Ok(UserRole {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        role: Role::parse(&role),
                        created_at: row.get(3)?,
                        updated_at: row.get(4)?,
                    })
                },
            )
            .optional()
    }

    /// Assign `role` to `user_id`, replacing any previous role.
    pub fn ensure_role(
        connection: &Connection,
        user_id: &str,
        role: Role,
        now: &str,
    ) -> rusqlite::Result<()> {
        connection.execute(
            "INSERT INTO user_roles (user_id, role, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(user_id) DO UPDATE
             SET role = excluded.role, updated_at = excluded.updated_at",
            rusqlite::params![user_id, role.as_str(), now],
        )?;
        Ok(())
    }

    /// Returns `false` if nothing was deleted.
    pub fn delete(connection: &Connection, table: Table, id: i64) -> rusqlite::Result<bool> {
        let deleted = connection.execute(
            &format!("DELETE FROM {} WHERE id = ?1", table.name()),
            rusqlite::params![id],
        )?;
        Ok(deleted > 0)
    }

    pub fn exists(connection: &Connection, table: Table, id: i64) -> rusqlite::Result<bool> {
        connection.query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)", table.name()),
            rusqlite::params![id],
            |row| row.get(0),
        )
    }

    pub fn count(connection: &Connection, table: Table) -> rusqlite::Result<i64> {
        connection.query_row(&format!("SELECT COUNT(*) FROM {}", table.name()), (), |row| {
            row.get(0)
        })
    }

    /**
    Write back the ranks of a reordered list.

    `ranks` is a list of (id, seq). Call it inside the `begin_write` transaction
    the list was read in, so a failure halfway leaves the old order in place.
    */
    pub fn update_seq(
        connection: &Connection,
        table: Table,
        ranks: &[(i64, i64)],
    ) -> rusqlite::Result<()> {
        let mut statement =
            connection.prepare(&format!("UPDATE {} SET seq = ?1 WHERE id = ?2", table.name()))?;
        for (id, seq) in ranks {
            statement.execute(rusqlite::params![seq, id])?;
        }
        Ok(())
    }
}
