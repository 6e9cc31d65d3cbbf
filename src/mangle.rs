//! Deterministic name mangling for mutators and size-of helpers.
//!
//! Two types whose printed top-level declarations are textually identical
//! must produce the same mangled name; two different declarations must
//! collide only with negligible probability. We hash the
//! declaration text with FNV-1a using a fixed, documented seed rather than
//! `std`'s randomized `SipHash`, since the mangled name has to be stable
//! across process runs.

use byteorder::{BigEndian, WriteBytesExt};

/// The documented FNV-1a seed. Any fixed value works; this one is simply
/// the standard FNV offset basis for a 64-bit hash.
/// Exposed so [`crate::options::GenerationOptions::mangling_seed`]'s absence
/// can fall back to the same constant this module uses internally.
pub const DEFAULT_SEED: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_OFFSET_BASIS: u64 = DEFAULT_SEED;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(text: &str, seed: u64) -> u64 {
  let mut hash = seed;
  for byte in text.as_bytes() {
    hash ^= u64::from(*byte);
    hash = hash.wrapping_mul(FNV_PRIME);
  }
  hash
}

/// Base16 of the upper 32 bits of `fnv1a(text, seed)`.
fn mangled_suffix(text: &str, seed: u64) -> String {
  let hash = fnv1a(text, seed);
  let upper = (hash >> 32) as u32;
  let mut buf = Vec::with_capacity(4);
  buf.write_u32::<BigEndian>(upper).expect("writing into a Vec never fails");
  hex::encode(buf)
}

/// The mangled mutator function name for a type whose printed top-level
/// declaration is `decl_text`, hashed with the default FNV-1a seed.
#[must_use] pub fn mutator_name(decl_text: &str) -> String {
  mutator_name_seeded(decl_text, FNV_OFFSET_BASIS)
}

/// The mangled size-of helper name for the same type, sharing the mutator's suffix.
#[must_use] pub fn sizeof_name(decl_text: &str) -> String {
  sizeof_name_seeded(decl_text, FNV_OFFSET_BASIS)
}

/// Like [`mutator_name`], but hashed with an explicit seed — what
/// [`crate::options::GenerationOptions::mangling_seed`] overrides to, so a
/// test can assert on exact mangled names instead of just their stability.
#[must_use] pub fn mutator_name_seeded(decl_text: &str, seed: u64) -> String {
  format!("_Z_fffc_mutator_{}", mangled_suffix(decl_text, seed))
}

/// Like [`sizeof_name`], seeded explicitly.
#[must_use] pub fn sizeof_name_seeded(decl_text: &str, seed: u64) -> String {
  format!("fffc_get_sizeof_{}", mangled_suffix(decl_text, seed))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identical_text_yields_identical_names() {
    let a = mutator_name("struct Point { int x; int y; };");
    let b = mutator_name("struct Point { int x; int y; };");
    assert_eq!(a, b);
  }

  #[test]
  fn different_text_yields_different_names_with_overwhelming_probability() {
    let a = mutator_name("struct Point { int x; int y; };");
    let b = mutator_name("struct Pointt { int x; int y; };");
    assert_ne!(a, b);
  }

  #[test]
  fn mutator_and_sizeof_share_a_suffix() {
    let decl = "typedef int my_int;";
    let m = mutator_name(decl);
    let s = sizeof_name(decl);
    assert_eq!(m.trim_start_matches("_Z_fffc_mutator_"), s.trim_start_matches("fffc_get_sizeof_"));
  }

  #[test]
  fn seed_override_changes_the_mangled_name() {
    let decl = "typedef int my_int;";
    let default = mutator_name(decl);
    let overridden = mutator_name_seeded(decl, 0x1234_5678_9abc_def0);
    assert_ne!(default, overridden);
  }
}
