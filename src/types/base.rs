//! The canonical base-type table: `(DW_ATE encoding, byte size)` to name.
//!
//! Mirrors the `make_prims!`-style lookup table technique, generalized from
//! a name⇄enum table to a `(u8, u64)`⇄name table driven by one macro.

macro_rules! base_types {
  ($(($enc:expr, $size:expr) => $name:literal,)*) => {
    /// Map an observed `(encoding, byte_size)` pair to the canonical C name
    /// used when the DIE's own name is absent or considered unreliable.
    /// Returns `None` when the pair matches no known base type (see `Error::UnknownBaseType`).
    #[must_use] pub fn canonical_name(encoding: u8, size: u64) -> Option<&'static str> {
      match (encoding, size) {
        $(($enc, $size) => Some($name),)*
        _ => None,
      }
    }
  }
}

base_types! {
  (2, 1) => "_Bool",
  (6, 1) => "char",
  (8, 1) => "unsigned char",
  (5, 2) => "short",
  (7, 2) => "short unsigned int",
  (5, 4) => "int",
  (7, 4) => "unsigned int",
  (5, 8) => "long int",
  (7, 8) => "long unsigned int",
  (5, 16) => "__int128",
  (7, 16) => "__int128 unsigned",
  (4, 4) => "float",
  (4, 8) => "double",
  (4, 16) => "long double",
}

/// Rewrite producer-specific spellings to the name the rest of the system expects.
/// One producer emits `sizetype` for what is really `size_t`; this is the one
/// documented workaround.
#[must_use] pub fn normalize_name(raw: &str) -> &str {
  if raw == "sizetype" { "size_t" } else { raw }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn known_pairs_resolve() {
    assert_eq!(canonical_name(5, 4), Some("int"));
    assert_eq!(canonical_name(7, 8), Some("long unsigned int"));
    assert_eq!(canonical_name(2, 1), Some("_Bool"));
  }

  #[test]
  fn unknown_pair_is_none() {
    assert_eq!(canonical_name(5, 3), None);
  }

  #[test]
  fn sizetype_rewritten() {
    assert_eq!(normalize_name("sizetype"), "size_t");
    assert_eq!(normalize_name("int"), "int");
  }
}
