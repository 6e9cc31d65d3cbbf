//! The DWARF/ELF collaborator boundary.
//!
//! The real `.debug_info`/ELF reader lives outside the core; it hands back
//! compilation units as plain data already split into DIEs with a tag,
//! offset, children, and attributes. This module only names that shape so
//! the type graph builder and scheduler have something to dispatch on.
//! Tests construct [`RawDie`]/[`CompilationUnitInput`] fixtures directly
//! instead of driving a real parser.

use hashbrown::HashMap;
use crate::offset::{Address, Offset};

/// The DWARF tags the type graph builder recognizes.
/// Anything else is ignored during the DIE walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
  BaseType,
  EnumerationType,
  StructureType,
  UnionType,
  SubroutineType,
  Subprogram,
  AtomicType,
  ArrayType,
  ConstType,
  PointerType,
  RestrictType,
  Typedef,
  VolatileType,
  SubrangeType,
  Enumerator,
  Member,
  FormalParameter,
  CompileUnit,
  /// Any tag outside the recognized set; carries the raw DWARF constant for diagnostics.
  Other(u16),
}

/// The attributes the core reads off a DIE. Narrower than the full DWARF
/// attribute set: only what the graph builder and scheduler actually consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrName {
  Type,
  Name,
  Encoding,
  ByteSize,
  Declaration,
  External,
  LowPc,
  UpperBound,
  Count,
  BitSize,
  DataMemberLocation,
  ConstValue,
  Variadic,
}

/// A narrowed DWARF attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
  Ref(Offset),
  UInt(u64),
  Int(i64),
  Str(String),
  Flag(bool),
}

impl AttrValue {
  #[must_use] pub fn as_ref_offset(&self) -> Option<Offset> {
    if let AttrValue::Ref(o) = self { Some(*o) } else { None }
  }
  #[must_use] pub fn as_uint(&self) -> Option<u64> {
    match *self {
      AttrValue::UInt(n) => Some(n),
      AttrValue::Int(n) if n >= 0 => Some(n as u64),
      _ => None,
    }
  }
  #[must_use] pub fn as_int(&self) -> Option<i64> {
    match *self {
      AttrValue::Int(n) => Some(n),
      AttrValue::UInt(n) => i64::try_from(n).ok(),
      _ => None,
    }
  }
  #[must_use] pub fn as_str(&self) -> Option<&str> {
    if let AttrValue::Str(s) = self { Some(s) } else { None }
  }
  #[must_use] pub fn as_flag(&self) -> bool {
    matches!(self, AttrValue::Flag(true)) || matches!(self, AttrValue::UInt(n) if *n != 0)
  }
}

/// One DWARF Debugging Information Entry, already decoded by the external parser.
#[derive(Debug, Clone, Default)]
pub struct RawDie {
  pub tag_raw: u16,
  pub offset: Offset,
  pub children: Vec<Offset>,
  pub attrs: HashMap<AttrName, AttrValue>,
}

impl RawDie {
  #[must_use] pub fn new(tag: Tag, offset: Offset) -> Self {
    RawDie { tag_raw: tag_to_raw(tag), offset, children: Vec::new(), attrs: HashMap::new() }
  }

  #[must_use] pub fn tag(&self) -> Tag { tag_from_raw(self.tag_raw) }

  pub fn with_attr(mut self, name: AttrName, value: AttrValue) -> Self {
    self.attrs.insert(name, value);
    self
  }

  pub fn with_child(mut self, offset: Offset) -> Self {
    self.children.push(offset);
    self
  }

  #[must_use] pub fn attr(&self, name: AttrName) -> Option<&AttrValue> { self.attrs.get(&name) }

  #[must_use] pub fn type_ref(&self) -> Option<Offset> {
    self.attr(AttrName::Type).and_then(AttrValue::as_ref_offset)
  }

  #[must_use] pub fn name(&self) -> Option<&str> { self.attr(AttrName::Name).and_then(AttrValue::as_str) }

  #[must_use] pub fn is_declaration(&self) -> bool {
    self.attr(AttrName::Declaration).is_some_and(AttrValue::as_flag)
  }

  #[must_use] pub fn is_external(&self) -> bool {
    self.attr(AttrName::External).is_some_and(AttrValue::as_flag)
  }

  #[must_use] pub fn low_pc(&self) -> Option<Address> {
    self.attr(AttrName::LowPc).and_then(AttrValue::as_uint).map(Address)
  }
}

fn tag_to_raw(tag: Tag) -> u16 {
  match tag {
    Tag::BaseType => 0x24,
    Tag::EnumerationType => 0x04,
    Tag::StructureType => 0x13,
    Tag::UnionType => 0x17,
    Tag::SubroutineType => 0x15,
    Tag::Subprogram => 0x2e,
    Tag::AtomicType => 0x47,
    Tag::ArrayType => 0x01,
    Tag::ConstType => 0x26,
    Tag::PointerType => 0x0f,
    Tag::RestrictType => 0x37,
    Tag::Typedef => 0x16,
    Tag::VolatileType => 0x35,
    Tag::SubrangeType => 0x21,
    Tag::Enumerator => 0x28,
    Tag::Member => 0x0d,
    Tag::FormalParameter => 0x05,
    Tag::CompileUnit => 0x11,
    Tag::Other(raw) => raw,
  }
}

fn tag_from_raw(raw: u16) -> Tag {
  match raw {
    0x24 => Tag::BaseType,
    0x04 => Tag::EnumerationType,
    0x13 => Tag::StructureType,
    0x17 => Tag::UnionType,
    0x15 => Tag::SubroutineType,
    0x2e => Tag::Subprogram,
    0x47 => Tag::AtomicType,
    0x01 => Tag::ArrayType,
    0x26 => Tag::ConstType,
    0x0f => Tag::PointerType,
    0x37 => Tag::RestrictType,
    0x16 => Tag::Typedef,
    0x35 => Tag::VolatileType,
    0x21 => Tag::SubrangeType,
    0x28 => Tag::Enumerator,
    0x0d => Tag::Member,
    0x05 => Tag::FormalParameter,
    0x11 => Tag::CompileUnit,
    other => Tag::Other(other),
  }
}

/// DWARF's `DW_LANG_*` codes for the three accepted source languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language { KAndR, Ansi, C99 }

impl Language {
  #[must_use] pub fn from_raw(code: u8) -> Option<Self> {
    match code {
      0x01 => Some(Language::KAndR),
      0x02 => Some(Language::Ansi),
      0x0c => Some(Language::C99),
      _ => None,
    }
  }
}

/// A toolchain identified from the DWARF producer string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compiler { Gcc, Clang, Unknown }

/// The `(compiler, major version)` pair parsed out of `DW_AT_producer`.
/// Parsing never fails: an unrecognized producer string yields `Unknown`/`0`,
/// since the producer is advisory only and never blocks generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Producer { pub compiler: Compiler, pub major: u32 }

impl Producer {
  #[must_use] pub fn parse(s: &str) -> Self {
    let (compiler, rest) = if let Some(r) = s.strip_prefix("GNU C") {
      (Compiler::Gcc, r)
    } else if let Some(r) = find_clang_suffix(s) {
      (Compiler::Clang, r)
    } else {
      return Producer { compiler: Compiler::Unknown, major: 0 };
    };
    // GCC's producer bakes the C-dialect year straight onto "C" (e.g. the
    // "17" in "GNU C17"), so the first digit run in `rest` names the
    // dialect, not the compiler version. The version triplet is the first
    // whitespace-separated token that actually looks like one (it contains
    // a '.'); fall back to the first digit run only if none does.
    let token = rest.split_whitespace().find(|tok| tok.contains('.'))
      .or_else(|| rest.split_whitespace().find(|tok| tok.chars().next().is_some_and(|c| c.is_ascii_digit())));
    let major = token
      .and_then(|tok| tok.split('.').next())
      .map(|tok| tok.chars().take_while(char::is_ascii_digit).collect::<String>())
      .and_then(|digits| digits.parse().ok())
      .unwrap_or(0);
    Producer { compiler, major }
  }
}

fn find_clang_suffix(s: &str) -> Option<&str> {
  let idx = s.find("clang version")?;
  Some(&s[idx + "clang version".len()..])
}

/// One compilation unit as handed to the core by the external parser: a flat
/// offset→DIE map plus the per-unit metadata.
#[derive(Debug, Clone)]
pub struct CompilationUnitInput {
  pub root_offset: Offset,
  pub source_file: String,
  pub language_raw: u8,
  pub producer: String,
  pub dies: HashMap<Offset, RawDie>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn producer_parses_gcc() {
    let p = Producer::parse("GNU C17 11.3.0 -mtune=generic -march=x86-64 -g");
    assert_eq!(p.compiler, Compiler::Gcc);
    assert_eq!(p.major, 11, "11.3.0 is the GCC version; C17 is the dialect, not the version");
  }

  #[test]
  fn producer_parses_clang() {
    let p = Producer::parse("clang version 14.0.0");
    assert_eq!(p.compiler, Compiler::Clang);
    assert_eq!(p.major, 14);
  }

  #[test]
  fn producer_unknown_is_harmless() {
    let p = Producer::parse("some weird toolchain 1.0");
    assert_eq!(p.compiler, Compiler::Unknown);
    assert_eq!(p.major, 0);
  }

  #[test]
  fn language_accepts_only_c_dialects() {
    assert_eq!(Language::from_raw(0x01), Some(Language::KAndR));
    assert_eq!(Language::from_raw(0x02), Some(Language::Ansi));
    assert_eq!(Language::from_raw(0x0c), Some(Language::C99));
    assert_eq!(Language::from_raw(0x04), None); // DW_LANG_C_plus_plus
  }
}
