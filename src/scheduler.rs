//! The declaration/definition scheduler — the heart of the system.
//!
//! Three contracts, matching spec:
//! - [`declare`] makes a type nameable: its dependencies need only be declared.
//! - [`define`] makes a type usable by value: its non-pointer dependencies
//!   must be fully defined. [`crate::types::PointerNode`] is the one
//!   exception — it only ever needs its pointee *declared*, which is what
//!   lets structural cycles terminate.
//! - [`get_reference`] prints a use of an already-(at least)-declared type
//!   without emitting anything itself.
//!
//! Every form either function emits goes straight into the owning
//! [`crate::header::HeaderAccumulator`], which handles text-based
//! deduplication — callers never need to check "did I already emit this".

use crate::cast::{Form, MemberForm};
use crate::error::Error;
use crate::types::base;
use crate::types::{FunctionNode, Member, NodeHeader, Status, TypeId, TypeNode};
use crate::unit::TranslationUnit;

fn tag_name(header: &NodeHeader, id: TypeId) -> String {
  match &header.name {
    Some(n) => n.clone(),
    // Anonymous aggregate/enum referenced through a pointer still needs a C tag
    // to forward-declare; derive one from the DIE offset.
    None => format!("__anon_{:x}_{}", header.offset.0, id.0),
  }
}

/// Make `id` nameable: after this call its status is at least DECLARED.
pub fn declare(unit: &mut TranslationUnit, id: TypeId) -> Result<(), Error> {
  if unit.node(id).status() >= Status::Declared { return Ok(()); }
  let node = unit.node(id).clone();
  match node {
    TypeNode::Void => {}
    TypeNode::Base(..) => define(unit, id)?, // declare ≡ define for a base type
    TypeNode::Enum(h, _) => {
      let tag = tag_name(&h, id);
      unit.header.push(Form::ForwardDecl { keyword: "enum", tag }, h.name.as_deref());
      unit.node_mut(id).advance_status(Status::Declared);
    }
    TypeNode::Struct(h, s) => {
      let tag = tag_name(&h, id);
      unit.header.push(Form::ForwardDecl { keyword: s.kind.keyword(), tag }, h.name.as_deref());
      unit.node_mut(id).advance_status(Status::Declared);
    }
    TypeNode::Typedef(..) => define(unit, id)?, // a typedef name can't be forward-declared in C
    TypeNode::Qualified(_, q) => {
      declare(unit, q.underlying)?;
      unit.node_mut(id).advance_status(Status::Declared);
    }
    TypeNode::Pointer(_, p) => {
      declare(unit, p.underlying)?;
      unit.node_mut(id).advance_status(Status::Declared);
    }
    TypeNode::Array(_, a) => {
      declare(unit, a.underlying)?;
      unit.node_mut(id).advance_status(Status::Declared);
    }
    TypeNode::Function(_, f) => {
      if let Some(ret) = f.return_type { declare(unit, ret)?; }
      for p in &f.params { declare(unit, p.ty)?; }
      unit.node_mut(id).advance_status(Status::Declared);
    }
  }
  Ok(())
}

/// Make `id` fully usable by value: after this call its status is DONE.
pub fn define(unit: &mut TranslationUnit, id: TypeId) -> Result<(), Error> {
  if unit.node(id).status() == Status::Done { return Ok(()); }
  let node = unit.node(id).clone();
  match node {
    TypeNode::Void => {}
    TypeNode::Base(h, b) => {
      if let Some(canonical) = base::canonical_name(b.encoding, b.byte_size) {
        if let Some(observed) = &h.name {
          if observed != canonical {
            unit.header.push(
              Form::Typedef { underlying: canonical.to_string(), name: observed.clone() },
              Some(observed));
          }
        }
      }
      unit.node_mut(id).advance_status(Status::Done);
    }
    TypeNode::Enum(h, e) => {
      let tag = tag_name(&h, id);
      if e.declaration {
        unit.header.push(Form::ForwardDecl { keyword: "enum", tag }, h.name.as_deref());
      } else {
        let consts = e.consts.iter().map(|c| (c.name.clone(), c.value)).collect();
        unit.header.push(Form::EnumDef { tag, consts }, h.name.as_deref());
      }
      unit.node_mut(id).advance_status(Status::Done);
    }
    TypeNode::Struct(h, s) => {
      let tag = tag_name(&h, id);
      if s.declaration {
        unit.header.push(Form::ForwardDecl { keyword: s.kind.keyword(), tag }, h.name.as_deref());
      } else {
        let mut members = Vec::with_capacity(s.members.len());
        for m in &s.members {
          members.push(MemberForm { decl: member_decl(unit, m)?, bit_size: m.bit_size });
        }
        unit.header.push(Form::Aggregate { keyword: s.kind.keyword(), tag, members }, h.name.as_deref());
      }
      unit.node_mut(id).advance_status(Status::Done);
    }
    TypeNode::Typedef(h, t) => {
      let name = h.name.clone().expect("typedef nodes always carry a name");
      let underlying_text = if unit.node(t.underlying).is_anonymous_aggregate() {
        inline_anonymous(unit, t.underlying)?
      } else {
        define(unit, t.underlying)?;
        get_reference(unit, t.underlying)?
      };
      unit.header.push(Form::Typedef { underlying: underlying_text, name: name.clone() }, Some(&name));
      unit.node_mut(id).advance_status(Status::Done);
    }
    TypeNode::Qualified(_, q) => {
      define(unit, q.underlying)?;
      unit.node_mut(id).advance_status(Status::Done);
    }
    TypeNode::Pointer(_, p) => {
      // The load-bearing rule: a pointer only ever needs its pointee *declared*,
      // never defined, which is what breaks structural cycles.
      declare(unit, p.underlying)?;
      unit.node_mut(id).advance_status(Status::Done);
    }
    TypeNode::Array(_, a) => {
      define(unit, a.underlying)?;
      unit.node_mut(id).advance_status(Status::Done);
    }
    TypeNode::Function(_, f) => {
      if let Some(ret) = f.return_type { define(unit, ret)?; }
      for p in &f.params { define(unit, p.ty)?; }
      let proto = prototype_form(unit, id, &f)?;
      let name = unit.node(id).name().map(str::to_string);
      unit.header.push(proto, name.as_deref());
      unit.node_mut(id).advance_status(Status::Done);
    }
  }
  Ok(())
}

/// A printable use of `id`, assuming it is at least declared. Emits nothing.
pub fn get_reference(unit: &mut TranslationUnit, id: TypeId) -> Result<String, Error> {
  let node = unit.node(id).clone();
  match node {
    TypeNode::Void => Ok("void".to_string()),
    TypeNode::Base(h, _) => Ok(h.name.expect("base nodes always carry a name")),
    TypeNode::Enum(h, _) => Ok(format!("enum {}", tag_name(&h, id))),
    TypeNode::Struct(h, s) => Ok(format!("{} {}", s.kind.keyword(), tag_name(&h, id))),
    TypeNode::Typedef(h, _) => Ok(h.name.expect("typedef nodes always carry a name")),
    TypeNode::Qualified(_, q) => {
      let inner = get_reference(unit, q.underlying)?;
      Ok(format!("{} {inner}", q.qualifier.keyword()))
    }
    TypeNode::Pointer(_, p) => {
      let inner = get_reference(unit, p.underlying)?;
      Ok(format!("{inner} *"))
    }
    TypeNode::Array(_, a) => {
      let inner = get_reference(unit, a.underlying)?;
      let dims: String = a.dims.iter().map(|d| format!("[{d}]")).collect();
      Ok(format!("{inner} {dims}"))
    }
    TypeNode::Function(_, f) => {
      let ret = match f.return_type {
        Some(r) => get_reference(unit, r)?,
        None => "void".to_string(),
      };
      let mut params = Vec::with_capacity(f.params.len());
      for p in &f.params { params.push(get_reference(unit, p.ty)?); }
      if f.variadic { params.push("...".to_string()); }
      let joined = if params.is_empty() { "void".to_string() } else { params.join(", ") };
      Ok(format!("{ret} (*)({joined})"))
    }
  }
}

/// Place `name` into a declarator for `id`, handling arrays and pointers by
/// wrapping the name instead of just concatenating a reference in front of it
/// (`int *a[4]`, not `int * a[4]`).
pub fn declarator(unit: &mut TranslationUnit, id: TypeId, name: &str) -> Result<String, Error> {
  let node = unit.node(id).clone();
  match node {
    TypeNode::Array(_, a) => {
      let dims: String = a.dims.iter().map(|d| format!("[{d}]")).collect();
      declarator(unit, a.underlying, &format!("{name}{dims}"))
    }
    TypeNode::Pointer(_, p) => declarator(unit, p.underlying, &format!("*{name}")),
    _ => {
      let base = get_reference(unit, id)?;
      Ok(format!("{base} {name}"))
    }
  }
}

/// One struct/union member's declaration text, handling the inline-anonymous
/// case: anonymous member types are inlined into their enclosing aggregate.
fn member_decl(unit: &mut TranslationUnit, m: &Member) -> Result<String, Error> {
  if unit.node(m.ty).is_anonymous_aggregate() {
    let inline = inline_anonymous(unit, m.ty)?;
    Ok(match &m.name {
      Some(name) => format!("{inline} {name}"),
      None => inline, // a genuinely anonymous struct/union member, legal since C11
    })
  } else {
    define(unit, m.ty)?;
    match &m.name {
      Some(name) => declarator(unit, m.ty, name),
      None => get_reference(unit, m.ty),
    }
  }
}

/// Render an anonymous aggregate/enum's body inline, without registering a
/// top-level form for it — nested anonymous shapes.
fn inline_anonymous(unit: &mut TranslationUnit, id: TypeId) -> Result<String, Error> {
  let node = unit.node(id).clone();
  match node {
    TypeNode::Struct(_, s) => {
      let mut body = String::new();
      for m in &s.members {
        body.push_str("  ");
        body.push_str(&member_decl(unit, m)?);
        body.push_str(";\n");
      }
      Ok(format!("{} {{\n{body}}}", s.kind.keyword()))
    }
    TypeNode::Enum(_, e) => {
      let names = e.consts.iter().map(|c| c.name.clone()).collect::<Vec<_>>().join(", ");
      Ok(format!("enum {{ {names} }}"))
    }
    _ => get_reference(unit, id),
  }
}

/// The text the mutator synthesizer hashes to mangle a name:
/// the same text [`define`] would emit as this type's top-level form, computed
/// without touching the header accumulator or advancing status. Safe to call
/// on an already-DONE node (the common case, once the scheduler has run).
pub fn printed_declaration(unit: &mut TranslationUnit, id: TypeId) -> Result<String, Error> {
  let node = unit.node(id).clone();
  match node {
    TypeNode::Void => Ok("void".to_string()),
    TypeNode::Base(h, _) => Ok(h.name.expect("base nodes always carry a name")),
    TypeNode::Enum(h, e) => {
      let tag = tag_name(&h, id);
      Ok(if e.declaration {
        Form::ForwardDecl { keyword: "enum", tag }.render()
      } else {
        let consts = e.consts.iter().map(|c| (c.name.clone(), c.value)).collect();
        Form::EnumDef { tag, consts }.render()
      })
    }
    TypeNode::Struct(h, s) => {
      let tag = tag_name(&h, id);
      if s.declaration {
        Ok(Form::ForwardDecl { keyword: s.kind.keyword(), tag }.render())
      } else {
        let mut members = Vec::with_capacity(s.members.len());
        for m in &s.members { members.push(MemberForm { decl: member_decl(unit, m)?, bit_size: m.bit_size }); }
        Ok(Form::Aggregate { keyword: s.kind.keyword(), tag, members }.render())
      }
    }
    TypeNode::Typedef(h, t) => {
      let name = h.name.expect("typedef nodes always carry a name");
      let underlying_text = if unit.node(t.underlying).is_anonymous_aggregate() {
        inline_anonymous(unit, t.underlying)?
      } else {
        get_reference(unit, t.underlying)?
      };
      Ok(Form::Typedef { underlying: underlying_text, name }.render())
    }
    TypeNode::Qualified(..) | TypeNode::Pointer(..) | TypeNode::Array(..) => get_reference(unit, id),
    TypeNode::Function(_, f) => Ok(prototype_form(unit, id, &f)?.render()),
  }
}

fn prototype_form(unit: &mut TranslationUnit, id: TypeId, f: &FunctionNode) -> Result<Form, Error> {
  let name = unit.node(id).name().unwrap_or("").to_string();
  let ret = match f.return_type {
    Some(r) => get_reference(unit, r)?,
    None => "void".to_string(),
  };
  let mut params = Vec::with_capacity(f.params.len());
  for p in &f.params { params.push(get_reference(unit, p.ty)?); }
  Ok(Form::Prototype { ret, name, params, variadic: f.variadic })
}
