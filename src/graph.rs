//! The type graph builder: lazily turns DIEs into [`TypeNode`]s.
//!
//! `get_or_add` is the one entry point. A DIE offset materializes a node on
//! its first reference; every later reference to the same offset reuses the
//! reserved [`TypeId`] instead of rebuilding. The reservation happens
//! *before* a node's dependencies are resolved, which is what lets a
//! `struct A { struct B *b }` / `struct B { struct A *a }` cycle terminate:
//! by the time the inner `get_or_add` call for `A` (from inside `B`'s
//! construction) runs, `A`'s slot already exists, even though `A` itself
//! isn't finished yet.

use log::{debug, warn};
use smallvec::SmallVec;
use crate::die::{AttrName, AttrValue, RawDie, Tag};
use crate::error::Error;
use crate::offset::Offset;
use crate::types::base;
use crate::types::{
  AggregateKind, ArrayNode, BaseNode, EnumConst, EnumNode, FunctionNode, Member, NodeHeader,
  Param, PointerNode, Qualifier, QualifiedNode, StructNode, TypeId, TypeNode, TypedefNode,
};
use crate::unit::TranslationUnit;

impl TranslationUnit {
  /// Resolve a DIE offset to a [`TypeId`], materializing the node on first
  /// visit and reusing it on every later one.
  pub fn get_or_add(&mut self, offset: Offset) -> Result<TypeId, Error> {
    if let Some(id) = self.existing_id(offset) { return Ok(id); }
    let id = self.reserve(offset, TypeNode::Void);
    let die = self.die(offset)?.clone();
    let node = build_node(self, id, &die)?;
    self.finish(id, node);
    Ok(id)
  }

  /// Resolve a DIE's `type` attribute, defaulting to the void pseudo-type
  /// when the attribute is absent.
  pub(crate) fn type_ref_or_void(&mut self, die: &RawDie) -> Result<TypeId, Error> {
    match die.type_ref() {
      Some(off) => self.get_or_add(off),
      None => Ok(self.void_id()),
    }
  }
}

fn build_node(unit: &mut TranslationUnit, id: TypeId, die: &RawDie) -> Result<TypeNode, Error> {
  match die.tag() {
    Tag::BaseType => build_base(unit, die),
    Tag::EnumerationType => build_enum(unit, die),
    Tag::StructureType => build_aggregate(unit, die, AggregateKind::Struct),
    Tag::UnionType => build_aggregate(unit, die, AggregateKind::Union),
    Tag::SubroutineType | Tag::Subprogram => build_function(unit, die),
    Tag::AtomicType => build_qualified(unit, die, Qualifier::Atomic),
    Tag::ConstType => build_qualified(unit, die, Qualifier::Const),
    Tag::RestrictType => build_qualified(unit, die, Qualifier::Restrict),
    Tag::VolatileType => build_qualified(unit, die, Qualifier::Volatile),
    Tag::PointerType => build_pointer(unit, die),
    Tag::ArrayType => build_array(unit, die),
    Tag::Typedef => build_typedef(unit, die),
    other => Err(Error::GraphError {
      file: unit.source_file.clone(), offset: id_offset(unit, id),
      reason: format!("DIE at {} has unsupported tag {other:?} for a named type reference", die.offset),
    }),
  }
}

fn id_offset(unit: &TranslationUnit, id: TypeId) -> Offset {
  unit.node(id).header().map_or(unit.root_offset, |h| h.offset)
}

fn build_base(unit: &TranslationUnit, die: &RawDie) -> Result<TypeNode, Error> {
  let encoding = die.attr(AttrName::Encoding).and_then(AttrValue::as_uint).unwrap_or(0) as u8;
  let byte_size = die.attr(AttrName::ByteSize).and_then(AttrValue::as_uint).unwrap_or(0);
  let name = match die.name() {
    Some(raw) => base::normalize_name(raw).to_string(),
    None => base::canonical_name(encoding, byte_size).map(str::to_string).ok_or_else(|| {
      warn!("{} at {}: unknown base type (encoding {encoding}, size {byte_size})", unit.source_file, die.offset);
      Error::UnknownBaseType { file: unit.source_file.clone(), offset: die.offset, encoding, size: byte_size }
    })?,
  };
  let mut header = NodeHeader::new(die.offset, Some(name));
  header.status.advance(crate::types::Status::Done); // Base is always DONE on construction
  Ok(TypeNode::Base(header, BaseNode { encoding, byte_size }))
}

fn build_enum(unit: &mut TranslationUnit, die: &RawDie) -> Result<TypeNode, Error> {
  let mut consts = Vec::new();
  for &child in &die.children {
    let cdie = unit.die(child)?.clone();
    if cdie.tag() != Tag::Enumerator { continue; }
    let name = cdie.name().ok_or_else(|| Error::GraphError {
      file: unit.source_file.clone(), offset: cdie.offset, reason: "enumerator without a name".into(),
    })?.to_string();
    let value = cdie.attr(AttrName::ConstValue).and_then(AttrValue::as_int).unwrap_or(0);
    consts.push(EnumConst { name, value });
  }
  let declaration = die.is_declaration();
  let header = NodeHeader::new(die.offset, die.name().map(str::to_string));
  Ok(TypeNode::Enum(header, EnumNode { consts, declaration }))
}

fn build_aggregate(unit: &mut TranslationUnit, die: &RawDie, kind: AggregateKind) -> Result<TypeNode, Error> {
  let declaration = die.is_declaration();
  let mut members = Vec::new();
  if !declaration {
    for &child in &die.children {
      let mdie = unit.die(child)?.clone();
      if mdie.tag() != Tag::Member { continue; }
      let ty = unit.type_ref_or_void(&mdie)?;
      let bit_size = mdie.attr(AttrName::BitSize).and_then(AttrValue::as_uint).map(|b| b as u32);
      let byte_offset = mdie.attr(AttrName::DataMemberLocation).and_then(AttrValue::as_uint).unwrap_or(0);
      members.push(Member { name: mdie.name().map(str::to_string), ty, bit_size, byte_offset });
    }
  }
  let packed = members.iter().any(|m| {
    static_byte_size(unit, m.ty).is_some_and(|sz| sz != 0 && m.byte_offset % sz != 0)
  });
  let header = NodeHeader::new(die.offset, die.name().map(str::to_string));
  Ok(TypeNode::Struct(header, StructNode { kind, members, packed, declaration }))
}

fn build_function(unit: &mut TranslationUnit, die: &RawDie) -> Result<TypeNode, Error> {
  let return_type = match die.type_ref() {
    Some(off) => Some(unit.get_or_add(off)?),
    None => None,
  };
  let mut params = SmallVec::new();
  let mut variadic = false;
  for &child in &die.children {
    let pdie = unit.die(child)?.clone();
    match pdie.tag() {
      Tag::FormalParameter => {
        let ty = unit.type_ref_or_void(&pdie)?;
        params.push(Param { name: pdie.name().map(str::to_string), ty });
      }
      Tag::Other(0x18) => variadic = true, // DW_TAG_unspecified_parameters
      _ => {}
    }
  }
  let low_pc = die.low_pc();
  // A DIE claiming `external` without a low-PC can't actually be interposed on;
  // demote it rather than propagating a stale flag.
  let external = die.is_external() && low_pc.is_some();
  let header = NodeHeader::new(die.offset, die.name().map(str::to_string));
  Ok(TypeNode::Function(header, FunctionNode { return_type, params, variadic, external, low_pc }))
}

fn build_typedef(unit: &mut TranslationUnit, die: &RawDie) -> Result<TypeNode, Error> {
  let underlying = unit.type_ref_or_void(die)?;
  let name = die.name().ok_or_else(|| Error::GraphError {
    file: unit.source_file.clone(), offset: die.offset, reason: "typedef without a name".into(),
  })?.to_string();
  let header = NodeHeader::new(die.offset, Some(name));
  Ok(TypeNode::Typedef(header, TypedefNode { underlying }))
}

fn build_qualified(unit: &mut TranslationUnit, die: &RawDie, qualifier: Qualifier) -> Result<TypeNode, Error> {
  let underlying = unit.type_ref_or_void(die)?;
  let header = NodeHeader::new(die.offset, None);
  Ok(TypeNode::Qualified(header, QualifiedNode { underlying, qualifier }))
}

fn build_pointer(unit: &mut TranslationUnit, die: &RawDie) -> Result<TypeNode, Error> {
  let underlying = unit.type_ref_or_void(die)?;
  let header = NodeHeader::new(die.offset, None);
  Ok(TypeNode::Pointer(header, PointerNode { underlying }))
}

fn build_array(unit: &mut TranslationUnit, die: &RawDie) -> Result<TypeNode, Error> {
  let underlying = unit.type_ref_or_void(die)?;
  let mut dims = SmallVec::new();
  for &child in &die.children {
    let sdie = unit.die(child)?.clone();
    if sdie.tag() != Tag::SubrangeType { continue; }
    dims.push(subrange_dim(unit, &sdie)?);
  }
  if dims.is_empty() { dims.push(0); } // unknown-length flexible array, best effort
  let header = NodeHeader::new(die.offset, None);
  Ok(TypeNode::Array(header, ArrayNode { underlying, dims }))
}

/// Resolve one array dimension from a subrange DIE.
fn subrange_dim(unit: &TranslationUnit, die: &RawDie) -> Result<u64, Error> {
  let upper = die.attr(AttrName::UpperBound).and_then(AttrValue::as_uint);
  let count = die.attr(AttrName::Count).and_then(AttrValue::as_uint);
  match (upper, count) {
    (Some(u), Some(c)) => {
      debug!("subrange at {} carries both upper_bound={u} and count={c}; preferring upper_bound+1", die.offset);
      Ok(u + 1)
    }
    (Some(u), None) => Ok(u + 1),
    (None, Some(c)) => Ok(c),
    (None, None) => Err(Error::GraphError {
      file: unit.source_file.clone(), offset: die.offset,
      reason: "subrange has neither upper_bound nor count".into(),
    }),
  }
}

/// Best-effort static size, used only to detect packed structs. Not
/// authoritative layout information: aggregate members return `None` rather
/// than attempting a full nested-layout computation.
fn static_byte_size(unit: &TranslationUnit, id: TypeId) -> Option<u64> {
  match unit.node(id) {
    TypeNode::Void | TypeNode::Function(..) | TypeNode::Struct(..) => None,
    TypeNode::Base(_, b) => Some(b.byte_size),
    TypeNode::Enum(..) => Some(4),
    TypeNode::Pointer(..) => Some(PointerNode::SIZE),
    TypeNode::Array(_, a) => static_byte_size(unit, a.underlying)
      .map(|sz| sz.saturating_mul(a.dims.iter().product())),
    TypeNode::Typedef(_, t) => static_byte_size(unit, t.underlying),
    TypeNode::Qualified(_, q) => static_byte_size(unit, q.underlying),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::die::{CompilationUnitInput, RawDie as D};
  use hashbrown::HashMap;

  fn unit_with(dies: Vec<D>) -> TranslationUnit {
    let mut map = HashMap::new();
    for d in dies { map.insert(d.offset, d); }
    TranslationUnit::new(CompilationUnitInput {
      root_offset: Offset(0), source_file: "t.c".into(), language_raw: 0x0c,
      producer: "GNU C17 11.3.0".into(), dies: map,
    }).unwrap()
  }

  #[test]
  fn base_type_resolves_canonical_name_when_unnamed() {
    let die = D::new(Tag::BaseType, Offset(0x10))
      .with_attr(AttrName::Encoding, AttrValue::UInt(5))
      .with_attr(AttrName::ByteSize, AttrValue::UInt(4));
    let mut u = unit_with(vec![die]);
    let id = u.get_or_add(Offset(0x10)).unwrap();
    assert_eq!(u.node(id).name(), Some("int"));
  }

  #[test]
  fn unknown_base_type_is_reported() {
    let die = D::new(Tag::BaseType, Offset(0x10))
      .with_attr(AttrName::Encoding, AttrValue::UInt(5))
      .with_attr(AttrName::ByteSize, AttrValue::UInt(3));
    let mut u = unit_with(vec![die]);
    let err = u.get_or_add(Offset(0x10)).unwrap_err();
    assert!(matches!(err, Error::UnknownBaseType { .. }));
  }

  #[test]
  fn sizetype_renamed_to_size_t() {
    let die = D::new(Tag::BaseType, Offset(0x10))
      .with_attr(AttrName::Name, AttrValue::Str("sizetype".into()))
      .with_attr(AttrName::Encoding, AttrValue::UInt(7))
      .with_attr(AttrName::ByteSize, AttrValue::UInt(8));
    let mut u = unit_with(vec![die]);
    let id = u.get_or_add(Offset(0x10)).unwrap();
    assert_eq!(u.node(id).name(), Some("size_t"));
  }

  #[test]
  fn pointer_cycle_terminates() {
    // struct A { struct B *b; }; struct B { struct A *a; };
    let ptr_to_b = D::new(Tag::PointerType, Offset(0x30)).with_attr(AttrName::Type, AttrValue::Ref(Offset(0x20)));
    let ptr_to_a = D::new(Tag::PointerType, Offset(0x31)).with_attr(AttrName::Type, AttrValue::Ref(Offset(0x10)));
    let member_b = D::new(Tag::Member, Offset(0x11))
      .with_attr(AttrName::Name, AttrValue::Str("b".into()))
      .with_attr(AttrName::Type, AttrValue::Ref(Offset(0x30)));
    let member_a = D::new(Tag::Member, Offset(0x21))
      .with_attr(AttrName::Name, AttrValue::Str("a".into()))
      .with_attr(AttrName::Type, AttrValue::Ref(Offset(0x31)));
    let a = D::new(Tag::StructureType, Offset(0x10))
      .with_attr(AttrName::Name, AttrValue::Str("A".into())).with_child(Offset(0x11));
    let b = D::new(Tag::StructureType, Offset(0x20))
      .with_attr(AttrName::Name, AttrValue::Str("B".into())).with_child(Offset(0x21));
    let mut u = unit_with(vec![a, b, ptr_to_a, ptr_to_b, member_a, member_b]);
    let id_a = u.get_or_add(Offset(0x10)).unwrap();
    let id_b = u.get_or_add(Offset(0x20)).unwrap();
    assert_ne!(id_a, id_b);
    // Re-requesting the same offsets must reuse the same ids (lazy materialization).
    assert_eq!(u.get_or_add(Offset(0x10)).unwrap(), id_a);
  }

  #[test]
  fn subrange_prefers_upper_bound_plus_one_when_both_present() {
    let elem = D::new(Tag::BaseType, Offset(0x10))
      .with_attr(AttrName::Encoding, AttrValue::UInt(5)).with_attr(AttrName::ByteSize, AttrValue::UInt(4));
    let sub = D::new(Tag::SubrangeType, Offset(0x21))
      .with_attr(AttrName::UpperBound, AttrValue::UInt(3)).with_attr(AttrName::Count, AttrValue::UInt(4));
    let arr = D::new(Tag::ArrayType, Offset(0x20))
      .with_attr(AttrName::Type, AttrValue::Ref(Offset(0x10))).with_child(Offset(0x21));
    let mut u = unit_with(vec![elem, sub, arr]);
    let id = u.get_or_add(Offset(0x20)).unwrap();
    match u.node(id) {
      TypeNode::Array(_, a) => assert_eq!(a.dims.as_slice(), &[4]),
      _ => panic!("expected array node"),
    }
  }

  #[test]
  fn external_without_low_pc_is_demoted() {
    let f = D::new(Tag::Subprogram, Offset(0x40))
      .with_attr(AttrName::Name, AttrValue::Str("f".into()))
      .with_attr(AttrName::External, AttrValue::Flag(true));
    let mut u = unit_with(vec![f]);
    let id = u.get_or_add(Offset(0x40)).unwrap();
    match u.node(id) {
      TypeNode::Function(_, fun) => assert!(!fun.external),
      _ => panic!("expected function node"),
    }
  }
}
