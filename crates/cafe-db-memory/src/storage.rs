use std::collections::BTreeMap;
use std::sync::Arc;

use cafe_core::{Cafe, Category, City, CityNamePolicy, Comment, Id, Rating, User};
use tokio::sync::RwLock;

/// A table of rows keyed by a monotonically increasing id.
///
/// `BTreeMap` keeps iteration in id order, which is the default ordering of
/// every listing query.
#[derive(Debug)]
pub(crate) struct Table<T> {
    pub(crate) rows: BTreeMap<Id, T>,
    next_id: Id,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T: Clone> Table<T> {
    /// Allocates the next id, builds the row from it and stores it.
    pub(crate) fn insert_with(&mut self, build: impl FnOnce(Id) -> T) -> T {
        let id = self.next_id;
        self.next_id += 1;
        let row = build(id);
        self.rows.insert(id, row.clone());
        row
    }

    pub(crate) fn get(&self, id: Id) -> Option<&T> {
        self.rows.get(&id)
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &T> {
        self.rows.values()
    }
}

/// All tables of the store.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub(crate) cities: Table<City>,
    pub(crate) cafes: Table<Cafe>,
    pub(crate) categories: Table<Category>,
    pub(crate) users: Table<User>,
    pub(crate) ratings: Table<Rating>,
    pub(crate) comments: Table<Comment>,
}

impl Tables {
    pub(crate) fn city_by_name(&self, policy: CityNamePolicy, name: &str) -> Option<&City> {
        self.cities.values().find(|c| policy.matches(&c.name, name))
    }

    pub(crate) fn cafe_name_taken(&self, city_id: Id, name: &str, except: Option<Id>) -> bool {
        self.cafes
            .values()
            .any(|c| c.city_id == city_id && c.name == name && Some(c.id) != except)
    }

    /// Sets `display` to true iff the city holds an approved cafe.
    pub(crate) fn refresh_display(&mut self, city_id: Id) {
        let display = self
            .cafes
            .values()
            .any(|c| c.city_id == city_id && c.approved);
        if let Some(city) = self.cities.rows.get_mut(&city_id) {
            city.display = display;
        }
    }
}

/// In-memory cafe storage backend.
///
/// This storage implementation provides:
/// - Atomic multi-table writes under a single `RwLock`
/// - Cascading cafe deletes (ratings, comments)
/// - City `display` maintenance on every cafe write
/// - City lookups under a configurable [`CityNamePolicy`]
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    pub(crate) tables: Arc<RwLock<Tables>>,
    pub(crate) policy: CityNamePolicy,
}

impl InMemoryStorage {
    /// Creates an empty store with case-sensitive city names.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with the given city-name policy.
    pub fn with_policy(policy: CityNamePolicy) -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            policy,
        }
    }

    #[cfg(test)]
    pub(crate) async fn city_count(&self) -> usize {
        self.tables.read().await.cities.rows.len()
    }

    #[cfg(test)]
    pub(crate) async fn cafe_count(&self) -> usize {
        self.tables.read().await.cafes.rows.len()
    }
}
