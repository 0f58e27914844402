use serde::{Deserialize, Serialize};

/// Categories inserted by `PersonaRepository::seed_default_categories`.
pub const DEFAULT_CATEGORIES: [&str; 6] = [
    "Famous People",
    "Movies & TV",
    "Musicians",
    "Games",
    "Developers",
    "Scientists",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CategoryRecord {
    pub id: String,
    pub name: String,
}
