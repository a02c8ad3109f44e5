use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

/// The connection manager every pool is built from. Cascading deletes rely on
/// foreign keys, which SQLite leaves off per connection.
pub fn connection_manager(path: &str) -> SqliteConnectionManager {
    SqliteConnectionManager::file(path).with_init(|c| c.execute_batch("PRAGMA foreign_keys = ON;"))
}

const TABLES: [(&str, &str); 6] = [
    (
        "company_profile",
        "CREATE TABLE IF NOT EXISTS company_profile (
            id INTEGER PRIMARY KEY,
            phone_number TEXT,
            email TEXT,
            hours_of_operation TEXT,
            facebook_url TEXT,
            instagram_url TEXT,
            tiktok_url TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
    ),
    (
        "category",
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            seq INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
    ),
    (
        "menu_item",
        "CREATE TABLE IF NOT EXISTS menu_item (
            id INTEGER PRIMARY KEY,
            category_id INTEGER NOT NULL REFERENCES category(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            description TEXT,
            price REAL,
            seq INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
    ),
    (
        "item_options",
        "CREATE TABLE IF NOT EXISTS item_options (
            id INTEGER PRIMARY KEY,
            menu_item_id INTEGER NOT NULL REFERENCES menu_item(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            price REAL,
            description TEXT,
            seq INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
    ),
    (
        "messages",
        "CREATE TABLE IF NOT EXISTS messages (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT,
            subject TEXT,
            message TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
    ),
    (
        "user_roles",
        "CREATE TABLE IF NOT EXISTS user_roles (
            id INTEGER PRIMARY KEY,
            user_id TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
    ),
];

/// Creates every table the service needs, if missing.
pub fn create_tables(connection_pool: &Pool<SqliteConnectionManager>) -> Result<(), String> {
    let connection = match connection_pool.get() {
        Ok(connection) => connection,
        Err(err) => {
            return Err(format!(
                "Couldn't obtain a connection for database setup.\n{}",
                err
            ))
        }
    };
    for (name, statement) in TABLES {
        if let Err(err) = connection.execute(statement, ()) {
            return Err(format!("Could not create table '{}'.\n{}", name, err));
        }
        tracing::debug!(table = name, "Table ready");
    }
    Ok(())
}

#[cfg(test)]
pub mod testing {
    use r2d2::Pool;
    use r2d2_sqlite::SqliteConnectionManager;

    /// A single-connection in-memory pool with the schema in place. One
    /// connection, since every in-memory connection is its own database.
    pub fn memory_pool() -> Pool<SqliteConnectionManager> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|c| c.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder().max_size(1).build(manager).unwrap();
        super::create_tables(&pool).unwrap();
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_all_tables_twice() {
        let pool = testing::memory_pool();
        create_tables(&pool).unwrap();
        let connection = pool.get().unwrap();
        let count: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
                (),
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, TABLES.len() as i64);
    }
}
