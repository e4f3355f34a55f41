//! Table and collection names derived from the configured prefix.
//!
//! The migration registry and every repository resolve names through these
//! functions, so both always agree. Names are lowercased because some
//! backends compare identifiers case-sensitively.

const SHORTENED: &str = "shortened";
const MIGRATIONS: &str = "migrations";

/// Name of the shortened URL table or collection.
pub fn shortened_table(prefix: &str) -> String {
    prefixed(prefix, "_", SHORTENED)
}

/// Name of the migrations bookkeeping table or collection.
pub fn migrations_table(prefix: &str) -> String {
    prefixed(prefix, "__", MIGRATIONS)
}

fn prefixed(prefix: &str, separator: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}{separator}{name}").to_lowercase()
    }
}
