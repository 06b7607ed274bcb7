//! Storage traits for the cafe storage abstraction layer.

use async_trait::async_trait;
use cafe_core::{Cafe, Category, City, CityNamePolicy, Comment, Id, Rating, Role, User};

use crate::error::StorageError;
use crate::types::{
    CafeChanges, CafeSummary, NewCafe, NewComment, NewRating, NewUser, RatingRecord,
};

/// The repository contract every backend implements.
///
/// City names passed in are compared using the backend's
/// [`CityNamePolicy`]. Every cafe write (create, update, delete) recomputes
/// the `display` flag of each city it touches: a city is displayed iff it
/// holds at least one approved cafe.
///
/// Implementations must be thread-safe (`Send + Sync`).
///
/// # Example
///
/// ```ignore
/// use cafe_storage::{CafeStorage, StorageError};
///
/// async fn cafe_or_404(storage: &dyn CafeStorage, city: &str, name: &str) -> Result<Cafe, StorageError> {
///     storage
///         .find_cafe(city, name)
///         .await?
///         .ok_or_else(|| StorageError::not_found("Cafe", format!("{city}/{name}")))
/// }
/// ```
#[async_trait]
pub trait CafeStorage: Send + Sync {
    // ==================== Cities ====================

    /// Returns every city ordered by name.
    async fn list_cities(&self) -> Result<Vec<City>, StorageError>;

    /// Looks a city up by name.
    async fn find_city(&self, name: &str) -> Result<Option<City>, StorageError>;

    /// Returns the city with this name, creating it (with `display = false`)
    /// if it does not exist. Exactly one row exists afterwards.
    async fn get_or_create_city(&self, name: &str) -> Result<City, StorageError>;

    // ==================== Cafes ====================

    /// Returns the cafes whose city matches `city_name`, ordered by id.
    ///
    /// Approved and unapproved cafes are both returned. An unknown city
    /// yields an empty list, not an error.
    async fn find_cafes_by_city(&self, city_name: &str) -> Result<Vec<Cafe>, StorageError>;

    /// Looks a cafe up by its city name and its own (exact) name.
    async fn find_cafe(
        &self,
        city_name: &str,
        cafe_name: &str,
    ) -> Result<Option<Cafe>, StorageError>;

    /// Inserts a cafe.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if the (name, city) pair is taken.
    /// Returns `StorageError::InvalidData` if the city does not exist.
    async fn create_cafe(&self, cafe: NewCafe) -> Result<Cafe, StorageError>;

    /// Applies `changes` to the cafe with this id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the cafe does not exist.
    /// Returns `StorageError::AlreadyExists` if the change collides with
    /// another cafe's (name, city) pair.
    async fn update_cafe(&self, id: Id, changes: CafeChanges) -> Result<Cafe, StorageError>;

    /// Deletes a cafe together with its ratings and comments.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the cafe does not exist.
    async fn delete_cafe(&self, id: Id) -> Result<(), StorageError>;

    // ==================== Ratings ====================

    /// Mean score of the cafe's ratings truncated toward zero, or `None`
    /// when the cafe has no ratings.
    async fn average_rating_for(&self, cafe_id: Id) -> Result<Option<i32>, StorageError>;

    /// Ratings of a cafe ordered by id, with relations resolved to names.
    async fn find_ratings_for_cafe(&self, cafe_id: Id)
    -> Result<Vec<RatingRecord>, StorageError>;

    /// Inserts a rating.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidData` if a referenced row is missing.
    async fn create_rating(&self, rating: NewRating) -> Result<Rating, StorageError>;

    // ==================== Categories ====================

    async fn get_or_create_category(&self, name: &str) -> Result<Category, StorageError>;

    // ==================== Comments ====================

    /// Inserts a comment.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidData` if a referenced row is missing.
    async fn create_comment(&self, comment: NewComment) -> Result<Comment, StorageError>;

    /// Comments of a cafe ordered by id.
    async fn find_comments_for_cafe(&self, cafe_id: Id) -> Result<Vec<Comment>, StorageError>;

    // ==================== Users ====================

    /// Inserts a user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if the username is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, StorageError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError>;

    async fn find_user_by_id(&self, id: Id) -> Result<Option<User>, StorageError>;

    /// Changes a user's role. Tokens already issued keep the old role until
    /// they are refreshed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist.
    async fn update_user_role(&self, id: Id, role: Role) -> Result<User, StorageError>;

    // ==================== Metadata ====================

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<(), StorageError>;

    /// The city-name comparison rule this backend was built with.
    fn city_name_policy(&self) -> CityNamePolicy;

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;

    // ==================== Composed queries ====================

    /// Cafes of a city with their average rating.
    async fn cafe_summaries_by_city(
        &self,
        city_name: &str,
    ) -> Result<Vec<CafeSummary>, StorageError> {
        let cafes = self.find_cafes_by_city(city_name).await?;
        let mut summaries = Vec::with_capacity(cafes.len());
        for cafe in &cafes {
            let average = self.average_rating_for(cafe.id).await?;
            summaries.push(CafeSummary::new(cafe, average));
        }
        tracing::debug!(
            backend = self.backend_name(),
            city = city_name,
            count = summaries.len(),
            "cafe summaries computed"
        );
        Ok(summaries)
    }
}
