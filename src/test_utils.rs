pub mod test_helpers {
    use crate::models::user::UserType;
    use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

    /// Create a new in-memory SQLite database for testing
    pub async fn create_test_db() -> Result<SqlitePool, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(pool)
    }

    /// Insert a user with a hashed password and placeholder profile fields
    pub async fn insert_test_user(
        pool: &SqlitePool,
        username: &str,
        password: &str,
        user_type: UserType,
    ) -> Result<i64, sqlx::Error> {
        let password_hash = crate::services::password::hash_password(password).map_err(|e| {
            sqlx::Error::Configuration(format!("Password hashing failed: {}", e).into())
        })?;

        let result = sqlx::query(
            "INSERT INTO users (username, email, first_name, last_name, password_hash, \
             user_type, address_line1, city, state, pincode) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(username)
        .bind(format!("{}@example.com", username))
        .bind("Test")
        .bind("User")
        .bind(password_hash)
        .bind(user_type)
        .bind("1 Test Street")
        .bind("Pune")
        .bind("MH")
        .bind("411001")
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }
}

#[cfg(test)]
pub async fn create_test_pool() -> sqlx::SqlitePool {
    match test_helpers::create_test_db().await {
        Ok(pool) => pool,
        Err(e) => panic!("Failed to create test pool: {}", e),
    }
}
