//! Ordered registry of named schema migrations.
//!
//! Names are `{yyyyMMddHHmmssfff UTC}_{slug}`. Registration timestamps are
//! strictly increasing, so names are unique and sort in registration order
//! even when the same human name is registered twice in one millisecond.

use chrono::{DateTime, Duration, DurationRound, Utc};

use crate::domain::entities::MigrationDescriptor;

const NAME_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S%3f";

/// Registry of migrations, populated once at startup by the selected backend.
#[derive(Debug, Default, Clone)]
pub struct MigrationRegistry {
    migrations: Vec<MigrationDescriptor>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a migration and returns the stored descriptor.
    pub fn register(
        &mut self,
        human_name: &str,
        target: impl Into<String>,
        precondition: Option<String>,
        statements: Vec<String>,
    ) -> &MigrationDescriptor {
        self.register_at(Utc::now(), human_name, target, precondition, statements)
    }

    fn register_at(
        &mut self,
        now: DateTime<Utc>,
        human_name: &str,
        target: impl Into<String>,
        precondition: Option<String>,
        statements: Vec<String>,
    ) -> &MigrationDescriptor {
        let mut registered_at = now
            .duration_trunc(Duration::milliseconds(1))
            .unwrap_or(now);

        if let Some(last) = self.migrations.last()
            && registered_at <= last.registered_at
        {
            registered_at = last.registered_at + Duration::milliseconds(1);
        }

        let name = format!(
            "{}_{}",
            registered_at.format(NAME_TIMESTAMP_FORMAT),
            slugify(human_name)
        );

        tracing::debug!(migration = %name, "Registered migration");

        self.migrations.push(MigrationDescriptor {
            name,
            target: target.into(),
            precondition,
            statements,
            registered_at,
        });

        let index = self.migrations.len() - 1;
        &self.migrations[index]
    }

    /// Migrations in registration order.
    pub fn migrations(&self) -> &[MigrationDescriptor] {
        &self.migrations
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.migrations.iter().map(|m| m.name.as_str())
    }
}

/// Trims, lowercases and replaces spaces with hyphens.
pub fn slugify(human_name: &str) -> String {
    human_name.trim().replace(' ', "-").to_lowercase()
}
