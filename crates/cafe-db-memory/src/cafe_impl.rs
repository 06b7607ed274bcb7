//! Implementation of the CafeStorage trait for InMemoryStorage.

use async_trait::async_trait;

use cafe_core::{Cafe, Category, City, CityNamePolicy, Comment, Id, Rating, Role, User};
use cafe_storage::{
    CafeChanges, CafeStorage, NewCafe, NewComment, NewRating, NewUser, RatingRecord,
    StorageError, truncated_mean,
};

use crate::storage::InMemoryStorage;

#[async_trait]
impl CafeStorage for InMemoryStorage {
    async fn list_cities(&self) -> Result<Vec<City>, StorageError> {
        let tables = self.tables.read().await;
        let mut cities: Vec<City> = tables.cities.values().cloned().collect();
        cities.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(cities)
    }

    async fn find_city(&self, name: &str) -> Result<Option<City>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.city_by_name(self.policy, name).cloned())
    }

    async fn get_or_create_city(&self, name: &str) -> Result<City, StorageError> {
        let mut tables = self.tables.write().await;
        if let Some(city) = tables.city_by_name(self.policy, name) {
            return Ok(city.clone());
        }
        let city = tables.cities.insert_with(|id| City {
            id,
            name: name.to_string(),
            display: false,
        });
        tracing::debug!(city_id = city.id, city = %city.name, "city created");
        Ok(city)
    }

    async fn find_cafes_by_city(&self, city_name: &str) -> Result<Vec<Cafe>, StorageError> {
        let tables = self.tables.read().await;
        let Some(city) = tables.city_by_name(self.policy, city_name) else {
            return Ok(Vec::new());
        };
        Ok(tables
            .cafes
            .values()
            .filter(|c| c.city_id == city.id)
            .cloned()
            .collect())
    }

    async fn find_cafe(
        &self,
        city_name: &str,
        cafe_name: &str,
    ) -> Result<Option<Cafe>, StorageError> {
        let tables = self.tables.read().await;
        let Some(city) = tables.city_by_name(self.policy, city_name) else {
            return Ok(None);
        };
        Ok(tables
            .cafes
            .values()
            .find(|c| c.city_id == city.id && c.name == cafe_name)
            .cloned())
    }

    async fn create_cafe(&self, cafe: NewCafe) -> Result<Cafe, StorageError> {
        let mut tables = self.tables.write().await;
        let city_name = match tables.cities.get(cafe.city_id) {
            Some(city) => city.name.clone(),
            None => {
                return Err(StorageError::invalid_data(format!(
                    "city {} does not exist",
                    cafe.city_id
                )));
            }
        };
        if tables.cafe_name_taken(cafe.city_id, &cafe.name, None) {
            return Err(StorageError::already_exists(
                "Cafe",
                format!("{city_name}/{}", cafe.name),
            ));
        }

        let created = tables.cafes.insert_with(|id| Cafe {
            id,
            city_id: cafe.city_id,
            name: cafe.name,
            location: cafe.location,
            image: cafe.image,
            approved: cafe.approved,
        });
        tables.refresh_display(created.city_id);
        tracing::debug!(cafe_id = created.id, city = %city_name, "cafe created");
        Ok(created)
    }

    async fn update_cafe(&self, id: Id, changes: CafeChanges) -> Result<Cafe, StorageError> {
        let mut tables = self.tables.write().await;
        let Some(current) = tables.cafes.get(id).cloned() else {
            return Err(StorageError::not_found("Cafe", id.to_string()));
        };

        let mut updated = current.clone();
        changes.apply_to(&mut updated);

        let Some(city_name) = tables.cities.get(updated.city_id).map(|c| c.name.clone()) else {
            return Err(StorageError::invalid_data(format!(
                "city {} does not exist",
                updated.city_id
            )));
        };
        if tables.cafe_name_taken(updated.city_id, &updated.name, Some(id)) {
            return Err(StorageError::already_exists(
                "Cafe",
                format!("{city_name}/{}", updated.name),
            ));
        }

        tables.cafes.rows.insert(id, updated.clone());
        tables.refresh_display(updated.city_id);
        if current.city_id != updated.city_id {
            tables.refresh_display(current.city_id);
        }
        tracing::debug!(cafe_id = id, city = %city_name, "cafe updated");
        Ok(updated)
    }

    async fn delete_cafe(&self, id: Id) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        let Some(removed) = tables.cafes.rows.remove(&id) else {
            return Err(StorageError::not_found("Cafe", id.to_string()));
        };
        tables.ratings.rows.retain(|_, r| r.cafe_id != id);
        tables.comments.rows.retain(|_, c| c.cafe_id != id);
        tables.refresh_display(removed.city_id);
        tracing::debug!(cafe_id = id, "cafe deleted with its ratings and comments");
        Ok(())
    }

    async fn average_rating_for(&self, cafe_id: Id) -> Result<Option<i32>, StorageError> {
        let tables = self.tables.read().await;
        let scores: Vec<i32> = tables
            .ratings
            .values()
            .filter(|r| r.cafe_id == cafe_id)
            .map(|r| r.rating)
            .collect();
        Ok(truncated_mean(&scores))
    }

    async fn find_ratings_for_cafe(
        &self,
        cafe_id: Id,
    ) -> Result<Vec<RatingRecord>, StorageError> {
        let tables = self.tables.read().await;
        let mut records = Vec::new();
        for rating in tables.ratings.values().filter(|r| r.cafe_id == cafe_id) {
            let (Some(category), Some(author), Some(cafe)) = (
                tables.categories.get(rating.category_id),
                tables.users.get(rating.author_id),
                tables.cafes.get(rating.cafe_id),
            ) else {
                return Err(StorageError::internal(format!(
                    "rating {} references a missing row",
                    rating.id
                )));
            };
            records.push(RatingRecord {
                id: rating.id,
                category: category.name.clone(),
                author: author.username.clone(),
                cafe: cafe.name.clone(),
                icon: rating.icon.clone(),
                rating: rating.rating,
            });
        }
        Ok(records)
    }

    async fn create_rating(&self, rating: NewRating) -> Result<Rating, StorageError> {
        let mut tables = self.tables.write().await;
        if tables.categories.get(rating.category_id).is_none() {
            return Err(StorageError::invalid_data(format!(
                "category {} does not exist",
                rating.category_id
            )));
        }
        if tables.users.get(rating.author_id).is_none() {
            return Err(StorageError::invalid_data(format!(
                "user {} does not exist",
                rating.author_id
            )));
        }
        if tables.cafes.get(rating.cafe_id).is_none() {
            return Err(StorageError::invalid_data(format!(
                "cafe {} does not exist",
                rating.cafe_id
            )));
        }
        Ok(tables.ratings.insert_with(|id| Rating {
            id,
            category_id: rating.category_id,
            author_id: rating.author_id,
            cafe_id: rating.cafe_id,
            icon: rating.icon,
            rating: rating.rating,
        }))
    }

    async fn get_or_create_category(&self, name: &str) -> Result<Category, StorageError> {
        let mut tables = self.tables.write().await;
        if let Some(category) = tables.categories.values().find(|c| c.name == name) {
            return Ok(category.clone());
        }
        Ok(tables.categories.insert_with(|id| Category {
            id,
            name: name.to_string(),
        }))
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment, StorageError> {
        let mut tables = self.tables.write().await;
        if tables.users.get(comment.author_id).is_none() {
            return Err(StorageError::invalid_data(format!(
                "user {} does not exist",
                comment.author_id
            )));
        }
        if tables.cafes.get(comment.cafe_id).is_none() {
            return Err(StorageError::invalid_data(format!(
                "cafe {} does not exist",
                comment.cafe_id
            )));
        }
        Ok(tables.comments.insert_with(|id| Comment {
            id,
            author_id: comment.author_id,
            cafe_id: comment.cafe_id,
            body: comment.body,
        }))
    }

    async fn find_comments_for_cafe(&self, cafe_id: Id) -> Result<Vec<Comment>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .values()
            .filter(|c| c.cafe_id == cafe_id)
            .cloned()
            .collect())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StorageError::already_exists("User", user.username));
        }
        let created = tables.users.insert_with(|id| User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
        });
        tracing::debug!(user_id = created.id, role = %created.role, "user created");
        Ok(created)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_user_by_id(&self, id: Id) -> Result<Option<User>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(id).cloned())
    }

    async fn update_user_role(&self, id: Id, role: Role) -> Result<User, StorageError> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.rows.get_mut(&id) else {
            return Err(StorageError::not_found("User", id.to_string()));
        };
        user.role = role;
        tracing::debug!(user_id = id, role = %role, "user role changed");
        Ok(user.clone())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn city_name_policy(&self) -> CityNamePolicy {
        self.policy
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
