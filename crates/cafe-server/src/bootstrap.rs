//! Startup seeding of the admin account and rating categories.
//!
//! Both steps are idempotent: an existing admin (matched by username) is
//! left untouched, and categories are get-or-create.

use cafe_core::Role;
use cafe_storage::{CafeStorage, NewUser};
use tracing::{info, warn};

use crate::config::{AdminUserConfig, BootstrapConfig};

/// What a bootstrap run changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BootstrapStats {
    pub admin_created: bool,
    /// Categories present after the run.
    pub categories: usize,
}

/// Seeds the store from `cfg`.
///
/// # Errors
///
/// Returns an error if storage operations or password hashing fail.
pub async fn run(storage: &dyn CafeStorage, cfg: &BootstrapConfig) -> anyhow::Result<BootstrapStats> {
    let mut stats = BootstrapStats::default();

    if let Some(admin) = &cfg.admin_user {
        stats.admin_created = ensure_admin(storage, admin).await?;
    }

    for name in &cfg.categories {
        let name = name.trim();
        if name.is_empty() {
            warn!("Skipping blank bootstrap category");
            continue;
        }
        let category = storage.get_or_create_category(name).await?;
        info!(category_id = category.id, category = %category.name, "Category ready");
        stats.categories += 1;
    }

    Ok(stats)
}

async fn ensure_admin(storage: &dyn CafeStorage, admin: &AdminUserConfig) -> anyhow::Result<bool> {
    if storage.find_user_by_username(&admin.username).await?.is_some() {
        info!(username = %admin.username, "Admin user already exists, skipping");
        return Ok(false);
    }

    let password = admin.password.clone();
    let password_hash =
        tokio::task::spawn_blocking(move || cafe_auth::hash_password(&password)).await??;

    let user = storage
        .create_user(NewUser {
            username: admin.username.clone(),
            email: admin.email.clone(),
            password_hash,
            role: Role::Admin,
        })
        .await?;
    info!(user_id = user.id, username = %user.username, "Admin user created");
    Ok(true)
}
