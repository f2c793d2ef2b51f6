//! ID generation utilities.

use ulid::Ulid;

/// Length of a ULID in its canonical text form.
const ULID_LEN: usize = 26;

/// ID generator for entities.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    ///
    /// IDs are lowercase, lexicographically sortable by creation time, and
    /// double as the default sort key for listings.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }

    /// Check whether a caller-supplied string can be an ID produced by [`Self::generate`].
    ///
    /// Used to reject malformed path parameters before they reach the database.
    #[must_use]
    pub fn is_valid(id: &str) -> bool {
        id.len() == ULID_LEN && Ulid::from_string(&id.to_uppercase()).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ulid() {
        let id_gen = IdGenerator::new();
        let id1 = id_gen.generate();
        let id2 = id_gen.generate();

        assert_eq!(id1.len(), 26);
        assert_ne!(id1, id2);
        assert_eq!(id1, id1.to_lowercase());
    }

    #[test]
    fn test_generated_ids_are_valid() {
        let id_gen = IdGenerator::new();
        assert!(IdGenerator::is_valid(&id_gen.generate()));
    }

    #[test]
    fn test_malformed_ids_are_rejected() {
        assert!(!IdGenerator::is_valid(""));
        assert!(!IdGenerator::is_valid("not-an-id"));
        assert!(!IdGenerator::is_valid("64f1c2e9a1b2c3d4e5f60718"));
        // 'u' is outside the Crockford base32 alphabet
        assert!(!IdGenerator::is_valid("01hxuuuuuuuuuuuuuuuuuuuuuu"));
    }
}
