use super::{
    GameCardAdmin, GameEventAdmin, GameInstanceAdmin, GameSetAdmin, ModelAdmin, SquareAdmin,
    UserAdmin,
};

use crate::{controllers, prelude::*};

use axum::Router;

/// Paths under `/admin` that aren't model pages.
const RESERVED_SLUGS: [&str; 2] = ["login", "logout"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminEntry {
    pub slug: &'static str,
    pub name: &'static str,
    pub name_plural: &'static str,
}

/// The set of registered models and the routes serving them.
pub struct AdminSite {
    entries: Vec<AdminEntry>,
    router: Router<AppState>,
}

impl AdminSite {
    pub fn new() -> Self {
        return Self {
            entries: vec![],
            router: Router::new(),
        };
    }

    pub fn register<M: ModelAdmin>(mut self) -> Result<Self> {
        if RESERVED_SLUGS.contains(&M::SLUG) {
            return Err(anyhow::anyhow!("'{}' is reserved by the admin site", M::SLUG).into());
        }

        if self.is_registered(M::SLUG) {
            return Err(anyhow::anyhow!("The model {} is already registered", M::NAME).into());
        }

        tracing::debug!("Registering {} at /admin/{}", M::NAME, M::SLUG);

        self.router = controllers::add_model_routes::<M>(self.router);
        self.entries.push(AdminEntry {
            slug: M::SLUG,
            name: M::NAME,
            name_plural: M::NAME_PLURAL,
        });

        return Ok(self);
    }

    pub fn is_registered(&self, slug: &str) -> bool {
        return self.entries.iter().any(|entry| entry.slug == slug);
    }

    pub fn entries(&self) -> &[AdminEntry] {
        return &self.entries;
    }

    pub fn into_router(self) -> Router<AppState> {
        return controllers::add_admin_index(self.router, self.entries);
    }
}

/// Every bingo model, plus the users they point at.
pub fn default_site() -> Result<AdminSite> {
    let site = AdminSite::new()
        .register::<UserAdmin>()?
        .register::<GameSetAdmin>()?
        .register::<SquareAdmin>()?
        .register::<GameInstanceAdmin>()?
        .register::<GameCardAdmin>()?
        .register::<GameEventAdmin>()?;

    tracing::debug!("Admin site serves {} models", site.entries().len());

    return Ok(site);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_site_registers_every_model() {
        let site = default_site().unwrap();

        let slugs: Vec<&str> = site.entries().iter().map(|entry| entry.slug).collect();

        assert_eq!(
            slugs,
            vec![
                "users",
                "game-sets",
                "squares",
                "game-instances",
                "game-cards",
                "game-events"
            ]
        );
    }

    #[test]
    fn registering_twice_fails() {
        let site = AdminSite::new().register::<GameSetAdmin>().unwrap();

        let err = site.register::<GameSetAdmin>().err().unwrap();

        assert!(err.0.to_string().contains("already registered"));
    }
}
