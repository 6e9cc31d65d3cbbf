//! DWARF offsets and code addresses.
//!
//! Offsets are the stable cross-reference key for DIEs within one translation
//! unit: they must be formatted consistently so that two references to
//! the same DIE compare equal textually as well as numerically.

use std::fmt;
use std::str::FromStr;

/// A byte offset into `.debug_info`, used to key the offset→DIE and
/// offset→type-node maps of a translation unit.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Offset(pub u64);

impl fmt::Debug for Offset {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Offset({self})") }
}

impl fmt::Display for Offset {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "0x{:x}", self.0) }
}

impl From<u64> for Offset {
  fn from(v: u64) -> Self { Offset(v) }
}

impl FromStr for Offset {
  type Err = std::num::ParseIntError;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(Offset(u64::from_str_radix(s.strip_prefix("0x").unwrap_or(s), 16)?))
  }
}

/// A code address, such as a function's low-PC. Distinct from [`Offset`]
/// (which indexes `.debug_info`) even though both print as hex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub u64);

impl fmt::Debug for Address {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Address({self})") }
}

impl fmt::Display for Address {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "0x{:x}", self.0) }
}
