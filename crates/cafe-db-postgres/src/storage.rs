//! PostgreSQL implementation of the CafeStorage trait.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::{PgPool, PgTransaction};

use cafe_core::{Cafe, Category, City, CityNamePolicy, Comment, Id, Rating, Role, User};
use cafe_storage::{
    CafeChanges, CafeStorage, NewCafe, NewComment, NewRating, NewUser, RatingRecord,
    StorageError,
};

use crate::config::PostgresConfig;
use crate::error::{db_error, write_error};
use crate::migrations;
use crate::pool;

type CityRow = (i64, String, bool);
type CafeRow = (i64, i64, String, String, Option<String>, bool);
type UserRow = (i64, String, Option<String>, String, String);

const CAFE_COLUMNS: &str = "c.id, c.city_id, c.name, c.location, c.image, c.approved";
const USER_COLUMNS: &str = "id, username, email, password_hash, role";

fn city_from_row((id, name, display): CityRow) -> City {
    City { id, name, display }
}

fn cafe_from_row((id, city_id, name, location, image, approved): CafeRow) -> Cafe {
    Cafe {
        id,
        city_id,
        name,
        location,
        image,
        approved,
    }
}

fn user_from_row(
    (id, username, email, password_hash, role): UserRow,
) -> Result<User, StorageError> {
    let role = Role::from_str(&role).map_err(|e| StorageError::internal(e.to_string()))?;
    Ok(User {
        id,
        username,
        email,
        password_hash,
        role,
    })
}

/// SQL predicate comparing `column` with the bind parameter `param` under
/// the given city-name policy.
fn city_name_predicate(policy: CityNamePolicy, column: &str, param: &str) -> String {
    match policy {
        CityNamePolicy::CaseSensitive => format!("{column} = {param}"),
        CityNamePolicy::CaseInsensitive => format!("lower({column}) = lower({param})"),
    }
}

/// Sets `display` to true iff the city holds an approved cafe.
async fn refresh_display(tx: &mut PgTransaction<'_>, city_id: Id) -> Result<(), StorageError> {
    query(
        "UPDATE cities SET display = EXISTS \
         (SELECT 1 FROM cafes WHERE city_id = $1 AND approved) WHERE id = $1",
    )
    .bind(city_id)
    .execute(&mut **tx)
    .await
    .map_err(db_error)?;
    Ok(())
}

async fn city_name_by_id(tx: &mut PgTransaction<'_>, city_id: Id) -> Result<String, StorageError> {
    let name: Option<String> = query_scalar("SELECT name FROM cities WHERE id = $1")
        .bind(city_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(db_error)?;
    name.ok_or_else(|| StorageError::invalid_data(format!("city {city_id} does not exist")))
}

/// PostgreSQL storage backend for cafe ratings.
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PgPool,
    policy: CityNamePolicy,
}

impl PostgresStorage {
    /// Creates a new `PostgresStorage` with the given configuration.
    ///
    /// This will:
    /// 1. Create a connection pool
    /// 2. Run migrations (if configured)
    ///
    /// # Errors
    ///
    /// Returns an error if the connection pool cannot be created
    /// or if migrations fail.
    pub async fn new(config: PostgresConfig, policy: CityNamePolicy) -> Result<Self, StorageError> {
        let pool = pool::create_pool(&config).await?;

        if config.run_migrations {
            migrations::run(&pool).await?;
        }

        Ok(Self { pool, policy })
    }

    /// Creates a new `PostgresStorage` from an existing connection pool.
    ///
    /// Migrations are not run automatically when using this constructor.
    #[must_use]
    pub fn from_pool(pool: PgPool, policy: CityNamePolicy) -> Self {
        Self { pool, policy }
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin(&self) -> Result<PgTransaction<'static>, StorageError> {
        self.pool.begin().await.map_err(db_error)
    }
}

#[async_trait]
impl CafeStorage for PostgresStorage {
    async fn list_cities(&self) -> Result<Vec<City>, StorageError> {
        let rows: Vec<CityRow> = query_as("SELECT id, name, display FROM cities ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(city_from_row).collect())
    }

    async fn find_city(&self, name: &str) -> Result<Option<City>, StorageError> {
        let sql = format!(
            "SELECT id, name, display FROM cities WHERE {} ORDER BY id LIMIT 1",
            city_name_predicate(self.policy, "name", "$1")
        );
        let row: Option<CityRow> = query_as(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(row.map(city_from_row))
    }

    async fn get_or_create_city(&self, name: &str) -> Result<City, StorageError> {
        let mut tx = self.begin().await?;

        // Serializes concurrent creators of the same normalized name, which
        // the plain UNIQUE(name) constraint cannot do for the
        // case-insensitive policy.
        query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(self.policy.key(name))
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        let select = format!(
            "SELECT id, name, display FROM cities WHERE {} ORDER BY id LIMIT 1",
            city_name_predicate(self.policy, "name", "$1")
        );
        let existing: Option<CityRow> = query_as(&select)
            .bind(name)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;

        let row = match existing {
            Some(row) => row,
            None => {
                let row: CityRow = query_as(
                    "INSERT INTO cities (name, display) VALUES ($1, FALSE) \
                     RETURNING id, name, display",
                )
                .bind(name)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| write_error(e, "City", name))?;
                tracing::debug!(city_id = row.0, city = %row.1, "city created");
                row
            }
        };

        tx.commit().await.map_err(db_error)?;
        Ok(city_from_row(row))
    }

    async fn find_cafes_by_city(&self, city_name: &str) -> Result<Vec<Cafe>, StorageError> {
        let sql = format!(
            "SELECT {CAFE_COLUMNS} FROM cafes c JOIN cities ci ON ci.id = c.city_id \
             WHERE {} ORDER BY c.id",
            city_name_predicate(self.policy, "ci.name", "$1")
        );
        let rows: Vec<CafeRow> = query_as(&sql)
            .bind(city_name)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(cafe_from_row).collect())
    }

    async fn find_cafe(
        &self,
        city_name: &str,
        cafe_name: &str,
    ) -> Result<Option<Cafe>, StorageError> {
        let sql = format!(
            "SELECT {CAFE_COLUMNS} FROM cafes c JOIN cities ci ON ci.id = c.city_id \
             WHERE {} AND c.name = $2 ORDER BY c.id LIMIT 1",
            city_name_predicate(self.policy, "ci.name", "$1")
        );
        let row: Option<CafeRow> = query_as(&sql)
            .bind(city_name)
            .bind(cafe_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(row.map(cafe_from_row))
    }

    async fn create_cafe(&self, cafe: NewCafe) -> Result<Cafe, StorageError> {
        let mut tx = self.begin().await?;
        let city_name = city_name_by_id(&mut tx, cafe.city_id).await?;
        let key = format!("{city_name}/{}", cafe.name);

        let row: CafeRow = query_as(
            "INSERT INTO cafes AS c (city_id, name, location, image, approved) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING c.id, c.city_id, c.name, c.location, c.image, c.approved",
        )
        .bind(cafe.city_id)
        .bind(&cafe.name)
        .bind(&cafe.location)
        .bind(&cafe.image)
        .bind(cafe.approved)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| write_error(e, "Cafe", &key))?;

        let created = cafe_from_row(row);
        refresh_display(&mut tx, created.city_id).await?;
        tx.commit().await.map_err(db_error)?;

        tracing::debug!(cafe_id = created.id, city = %city_name, "cafe created");
        Ok(created)
    }

    async fn update_cafe(&self, id: Id, changes: CafeChanges) -> Result<Cafe, StorageError> {
        let mut tx = self.begin().await?;

        let sql = format!("SELECT {CAFE_COLUMNS} FROM cafes c WHERE c.id = $1 FOR UPDATE");
        let current: Option<CafeRow> = query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;
        let Some(current) = current.map(cafe_from_row) else {
            return Err(StorageError::not_found("Cafe", id.to_string()));
        };

        let mut updated = current.clone();
        changes.apply_to(&mut updated);
        let city_name = city_name_by_id(&mut tx, updated.city_id).await?;
        let key = format!("{city_name}/{}", updated.name);

        query(
            "UPDATE cafes SET city_id = $2, name = $3, location = $4, image = $5, approved = $6 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(updated.city_id)
        .bind(&updated.name)
        .bind(&updated.location)
        .bind(&updated.image)
        .bind(updated.approved)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error(e, "Cafe", &key))?;

        refresh_display(&mut tx, updated.city_id).await?;
        if current.city_id != updated.city_id {
            refresh_display(&mut tx, current.city_id).await?;
        }
        tx.commit().await.map_err(db_error)?;

        tracing::debug!(cafe_id = id, city = %city_name, "cafe updated");
        Ok(updated)
    }

    async fn delete_cafe(&self, id: Id) -> Result<(), StorageError> {
        let mut tx = self.begin().await?;

        // Ratings and comments go with it via ON DELETE CASCADE.
        let city_id: Option<i64> = query_scalar("DELETE FROM cafes WHERE id = $1 RETURNING city_id")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;
        let Some(city_id) = city_id else {
            return Err(StorageError::not_found("Cafe", id.to_string()));
        };

        refresh_display(&mut tx, city_id).await?;
        tx.commit().await.map_err(db_error)?;

        tracing::debug!(cafe_id = id, "cafe deleted with its ratings and comments");
        Ok(())
    }

    async fn average_rating_for(&self, cafe_id: Id) -> Result<Option<i32>, StorageError> {
        // trunc() rounds toward zero; avg() over no rows is NULL.
        query_scalar("SELECT trunc(avg(rating))::INT4 FROM ratings WHERE cafe_id = $1")
            .bind(cafe_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn find_ratings_for_cafe(
        &self,
        cafe_id: Id,
    ) -> Result<Vec<RatingRecord>, StorageError> {
        let rows: Vec<(i64, String, String, String, String, i32)> = query_as(
            "SELECT r.id, cat.name, u.username, c.name, r.icon, r.rating \
             FROM ratings r \
             JOIN categories cat ON cat.id = r.category_id \
             JOIN users u ON u.id = r.author_id \
             JOIN cafes c ON c.id = r.cafe_id \
             WHERE r.cafe_id = $1 ORDER BY r.id",
        )
        .bind(cafe_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows
            .into_iter()
            .map(|(id, category, author, cafe, icon, rating)| RatingRecord {
                id,
                category,
                author,
                cafe,
                icon,
                rating,
            })
            .collect())
    }

    async fn create_rating(&self, rating: NewRating) -> Result<Rating, StorageError> {
        let id: i64 = query_scalar(
            "INSERT INTO ratings (category_id, author_id, cafe_id, icon, rating) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(rating.category_id)
        .bind(rating.author_id)
        .bind(rating.cafe_id)
        .bind(&rating.icon)
        .bind(rating.rating)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, "Rating", &rating.cafe_id.to_string()))?;

        Ok(Rating {
            id,
            category_id: rating.category_id,
            author_id: rating.author_id,
            cafe_id: rating.cafe_id,
            icon: rating.icon,
            rating: rating.rating,
        })
    }

    async fn get_or_create_category(&self, name: &str) -> Result<Category, StorageError> {
        query("INSERT INTO categories (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(e, "Category", name))?;

        let (id, name): (i64, String) =
            query_as("SELECT id, name FROM categories WHERE name = $1")
                .bind(name)
                .fetch_one(&self.pool)
                .await
                .map_err(db_error)?;
        Ok(Category { id, name })
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment, StorageError> {
        let id: i64 = query_scalar(
            "INSERT INTO comments (author_id, cafe_id, body) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(comment.author_id)
        .bind(comment.cafe_id)
        .bind(&comment.body)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, "Comment", &comment.cafe_id.to_string()))?;

        Ok(Comment {
            id,
            author_id: comment.author_id,
            cafe_id: comment.cafe_id,
            body: comment.body,
        })
    }

    async fn find_comments_for_cafe(&self, cafe_id: Id) -> Result<Vec<Comment>, StorageError> {
        let rows: Vec<(i64, i64, i64, String)> = query_as(
            "SELECT id, author_id, cafe_id, body FROM comments WHERE cafe_id = $1 ORDER BY id",
        )
        .bind(cafe_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows
            .into_iter()
            .map(|(id, author_id, cafe_id, body)| Comment {
                id,
                author_id,
                cafe_id,
                body,
            })
            .collect())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        let id: i64 = query_scalar(
            "INSERT INTO users (username, email, password_hash, role) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, "User", &user.username))?;

        tracing::debug!(user_id = id, role = %user.role, "user created");
        Ok(User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
        })
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let row: Option<UserRow> = query_as(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(user_from_row).transpose()
    }

    async fn find_user_by_id(&self, id: Id) -> Result<Option<User>, StorageError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row: Option<UserRow> = query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(user_from_row).transpose()
    }

    async fn update_user_role(&self, id: Id, role: Role) -> Result<User, StorageError> {
        let sql = format!("UPDATE users SET role = $2 WHERE id = $1 RETURNING {USER_COLUMNS}");
        let row: Option<UserRow> = query_as(&sql)
            .bind(id)
            .bind(role.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        let Some(row) = row else {
            return Err(StorageError::not_found("User", id.to_string()));
        };
        tracing::debug!(user_id = id, role = %role, "user role changed");
        user_from_row(row)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    fn city_name_policy(&self) -> CityNamePolicy {
        self.policy
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
