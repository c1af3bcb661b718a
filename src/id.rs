//! Opaque, URL-safe id generation for event records and default stream ids.

use nanoid::nanoid;

/// Default length of a generated id (~11 characters, per the external id-generator contract).
pub const DEFAULT_SIZE: usize = 11;

/// Generates a short, URL-safe, collision-resistant opaque string.
///
/// Collision probability is negligible for typical per-store volumes at the default size;
/// callers that expect very high cardinality can request a larger size with [`generate_sized`].
pub fn generate() -> String {
    generate_sized(DEFAULT_SIZE)
}

/// Same as [`generate`], with a caller-chosen size.
pub fn generate_sized(size: usize) -> String {
    nanoid!(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_size_is_eleven() {
        assert_eq!(generate().len(), DEFAULT_SIZE);
    }

    #[test]
    fn sized_generation_respects_size() {
        assert_eq!(generate_sized(21).len(), 21);
    }

    #[test]
    fn generated_ids_are_distinct() {
        let a = generate();
        let b = generate();
        assert_ne!(a, b);
    }
}
