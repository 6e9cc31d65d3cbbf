//! The type-node sum type materialized from DWARF DIEs.
//!
//! Every node carries a source offset, an optional name, and a monotonic
//! [`Status`]. Cross-references between nodes are [`TypeId`] indices into the
//! owning translation unit's node table, never owning pointers.

pub mod base;

use smallvec::SmallVec;
use crate::offset::{Address, Offset};

/// An index into a translation unit's type-node table. The "handle, never
/// owning pointer": mutual references are expressed only this way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

/// The lifecycle a type node walks through as the scheduler visits it:
/// NEW → DECLARED → DONE, monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Status { New, Declared, Done }

impl Status {
  /// Move forward to `want` if we're behind it. Never regresses: once DONE,
  /// a node never returns to DECLARED or NEW.
  pub fn advance(&mut self, want: Status) {
    if want > *self { *self = want; }
  }
}

/// Fields shared by every non-void node: where it came from, its name (if
/// any — absent means anonymous), and its current lifecycle status.
#[derive(Debug, Clone)]
pub struct NodeHeader {
  pub offset: Offset,
  pub name: Option<String>,
  pub status: Status,
}

impl NodeHeader {
  #[must_use] pub fn new(offset: Offset, name: Option<String>) -> Self {
    NodeHeader { offset, name, status: Status::New }
  }
}

/// Struct and union share the same shape; only the C keyword and the
/// mutator's shape differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind { Struct, Union }

impl AggregateKind {
  #[must_use] pub fn keyword(self) -> &'static str {
    match self { AggregateKind::Struct => "struct", AggregateKind::Union => "union" }
  }
}

/// One member of a struct or union.
#[derive(Debug, Clone)]
pub struct Member {
  pub name: Option<String>,
  pub ty: TypeId,
  pub bit_size: Option<u32>,
  pub byte_offset: u64,
}

/// One `(name, value)` enumerator constant.
#[derive(Debug, Clone)]
pub struct EnumConst { pub name: String, pub value: i64 }

/// One named or unnamed formal parameter.
#[derive(Debug, Clone)]
pub struct Param { pub name: Option<String>, pub ty: TypeId }

/// A `const`/`volatile`/`restrict`/`_Atomic` wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualifier { Const, Volatile, Restrict, Atomic }

impl Qualifier {
  #[must_use] pub fn keyword(self) -> &'static str {
    match self {
      Qualifier::Const => "const",
      Qualifier::Volatile => "volatile",
      Qualifier::Restrict => "restrict",
      Qualifier::Atomic => "_Atomic",
    }
  }
}

#[derive(Debug, Clone)]
pub struct BaseNode { pub encoding: u8, pub byte_size: u64 }

#[derive(Debug, Clone)]
pub struct EnumNode { pub consts: Vec<EnumConst>, pub declaration: bool }

#[derive(Debug, Clone)]
pub struct StructNode {
  pub kind: AggregateKind,
  pub members: Vec<Member>,
  pub packed: bool,
  pub declaration: bool,
}

#[derive(Debug, Clone)]
pub struct FunctionNode {
  pub return_type: Option<TypeId>,
  pub params: SmallVec<[Param; 4]>,
  pub variadic: bool,
  /// Already demoted by the graph builder: true only when the DIE both carried the
  /// `external` attribute *and* had a known low-PC.
  pub external: bool,
  pub low_pc: Option<Address>,
}

#[derive(Debug, Clone)]
pub struct TypedefNode { pub underlying: TypeId }

#[derive(Debug, Clone)]
pub struct QualifiedNode { pub underlying: TypeId, pub qualifier: Qualifier }

/// The one node kind that breaks cycles: a pointer depends on its pointee
/// only through `declare`, never `define`.
#[derive(Debug, Clone)]
pub struct PointerNode { pub underlying: TypeId }

impl PointerNode {
  /// Pointers are always 8 bytes wide in this system's target model.
  pub const SIZE: u64 = 8;
}

#[derive(Debug, Clone)]
pub struct ArrayNode { pub underlying: TypeId, pub dims: SmallVec<[u64; 2]> }

/// A materialized type node. `Void` is the one variant without a
/// [`NodeHeader`]: it is a process-wide singleton, permanently DONE, named
/// `"void"`.
#[derive(Debug, Clone)]
pub enum TypeNode {
  Void,
  Base(NodeHeader, BaseNode),
  Enum(NodeHeader, EnumNode),
  Struct(NodeHeader, StructNode),
  Function(NodeHeader, FunctionNode),
  Typedef(NodeHeader, TypedefNode),
  Qualified(NodeHeader, QualifiedNode),
  Pointer(NodeHeader, PointerNode),
  Array(NodeHeader, ArrayNode),
}

impl TypeNode {
  #[must_use] pub fn header(&self) -> Option<&NodeHeader> {
    match self {
      TypeNode::Void => None,
      TypeNode::Base(h, _) | TypeNode::Enum(h, _) | TypeNode::Struct(h, _) |
      TypeNode::Function(h, _) | TypeNode::Typedef(h, _) | TypeNode::Qualified(h, _) |
      TypeNode::Pointer(h, _) | TypeNode::Array(h, _) => Some(h),
    }
  }

  fn header_mut(&mut self) -> Option<&mut NodeHeader> {
    match self {
      TypeNode::Void => None,
      TypeNode::Base(h, _) | TypeNode::Enum(h, _) | TypeNode::Struct(h, _) |
      TypeNode::Function(h, _) | TypeNode::Typedef(h, _) | TypeNode::Qualified(h, _) |
      TypeNode::Pointer(h, _) | TypeNode::Array(h, _) => Some(h),
    }
  }

  #[must_use] pub fn status(&self) -> Status { self.header().map_or(Status::Done, |h| h.status) }

  pub fn advance_status(&mut self, want: Status) {
    if let Some(h) = self.header_mut() { h.status.advance(want); }
  }

  /// The type's own name, or `None` for an anonymous type. Void's name is
  /// always `Some("void")` even though it has no header.
  #[must_use] pub fn name(&self) -> Option<&str> {
    match self {
      TypeNode::Void => Some("void"),
      other => other.header().and_then(|h| h.name.as_deref()),
    }
  }

  #[must_use] pub fn is_anonymous(&self) -> bool { self.name().is_none() }

  /// Whether this is specifically an anonymous struct/union/enum — the kind
  /// of anonymity that means a member's or typedef's underlying type gets
  /// inlined rather than referenced by name. Pointers, arrays, and qualifiers
  /// are also nameless by construction but are never inlined; they always go
  /// through the normal reference/declarator path.
  #[must_use] pub fn is_anonymous_aggregate(&self) -> bool {
    matches!(self, TypeNode::Struct(h, _) | TypeNode::Enum(h, _) if h.name.is_none())
  }

  /// Whether this node's printed name would start with `__builtin` and must
  /// never be emitted.
  #[must_use] pub fn is_builtin(&self) -> bool {
    self.name().is_some_and(|n| n.starts_with("__builtin"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_is_monotonic() {
    let mut s = Status::New;
    s.advance(Status::Declared);
    assert_eq!(s, Status::Declared);
    s.advance(Status::New);
    assert_eq!(s, Status::Declared, "status must never regress");
    s.advance(Status::Done);
    assert_eq!(s, Status::Done);
  }

  #[test]
  fn void_is_always_done_and_named() {
    let v = TypeNode::Void;
    assert_eq!(v.status(), Status::Done);
    assert_eq!(v.name(), Some("void"));
  }

  #[test]
  fn builtin_names_are_flagged() {
    let h = NodeHeader::new(Offset(0), Some("__builtin_va_list".into()));
    let n = TypeNode::Typedef(h, TypedefNode { underlying: TypeId(0) });
    assert!(n.is_builtin());
  }
}
