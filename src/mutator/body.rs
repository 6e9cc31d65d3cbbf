//! Category-specific mutator body construction.
//!
//! Every function here returns C statement text, already indented two
//! spaces, meant to be spliced directly into the synthesized function's
//! braces. None of it touches [`crate::header::HeaderAccumulator`] — that's
//! the scheduler's job; a sibling type's mutator is referenced here purely
//! by its mangled name, computed from its printed declaration, never by
//! re-synthesizing its body.

use crate::error::Error;
use crate::nesting::NestingContext;
use crate::mangle;
use crate::scheduler::{get_reference, printed_declaration};
use crate::types::{AggregateKind, ArrayNode, EnumNode, Member, PointerNode, StructNode, TypeId, TypeNode};
use crate::unit::TranslationUnit;

const FLOAT_ENCODING: u8 = 4;

/// Dispatch on `id`'s category and return the mutator body that operates on
/// the value reached through `storage` (a C expression naming a pointer to
/// the value, e.g. `storage` itself at the top level, or a reinterpreted
/// alias of it when delegating through a typedef or qualifier). `seed` is
/// the same mangling seed the caller's own name was computed with, so a
/// struct's member calls stay consistent with an overridden seed.
pub fn build(unit: &mut TranslationUnit, id: TypeId, ctx: &mut NestingContext, storage: &str, seed: u64) -> Result<String, Error> {
  let node = unit.node(id).clone();
  match node {
    TypeNode::Void => Ok(String::new()),
    TypeNode::Base(_, b) => Ok(build_base(storage, b.encoding)),
    TypeNode::Enum(_, e) => Ok(build_enum(&e, ctx, storage)),
    TypeNode::Struct(_, s) => build_aggregate(unit, &s, ctx, storage, seed),
    TypeNode::Pointer(_, p) => build_pointer(unit, &p, storage, seed),
    TypeNode::Array(_, a) => build_array(unit, &a, ctx, storage, seed),
    TypeNode::Qualified(_, q) => build(unit, q.underlying, ctx, storage, seed),
    TypeNode::Typedef(_, t) => build(unit, t.underlying, ctx, storage, seed),
    // Code itself is never mutated; calling through the pointer is the caller's business.
    TypeNode::Function(..) => Ok(format!("  (void){storage};\n")),
  }
}

/// The size-of helper's one expression: an anonymous aggregate has no tag to
/// `sizeof` a pointer-cast against, so it falls back to the allocator's own
/// bookkeeping; an array's element count isn't visible to a bare `sizeof`
/// cast once it has decayed to a pointer, so it's computed as
/// `dims * sizeof(element)` instead; everything else sizes through a cast
/// back to its own type.
pub fn size_expr(unit: &mut TranslationUnit, id: TypeId, storage: &str) -> Result<String, Error> {
  if unit.node(id).is_anonymous_aggregate() {
    return Ok(format!("fffc_estimate_allocation_size({storage})"));
  }
  match unit.node(id).clone() {
    TypeNode::Array(_, a) => {
      let total: u64 = a.dims.iter().product();
      let elem_ty = get_reference(unit, a.underlying)?;
      Ok(format!("{total} * sizeof({elem_ty})"))
    }
    // A typedef'd or qualified array still decays the same way once named
    // through its alias; chase the alias to find the real shape underneath.
    TypeNode::Typedef(_, t) => size_expr(unit, t.underlying, storage),
    TypeNode::Qualified(_, q) => size_expr(unit, q.underlying, storage),
    _ => {
      let ty_ref = get_reference(unit, id)?;
      Ok(format!("sizeof(*({ty_ref} *){storage})"))
    }
  }
}

fn build_base(storage: &str, encoding: u8) -> String {
  if encoding == FLOAT_ENCODING {
    format!("  fffc_mutate_float({storage});\n")
  } else {
    format!("  fffc_mutate_int({storage});\n")
  }
}

fn build_enum(e: &EnumNode, ctx: &mut NestingContext, storage: &str) -> String {
  let slot = ctx.next_values();
  let arr = e.consts.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", ");
  format!(
    "  {{\n    static const int values{slot}[] = {{ {arr} }};\n    *{storage} = values{slot}[fffc_get_random() % {}];\n  }}\n",
    e.consts.len()
  )
}

fn build_aggregate(unit: &mut TranslationUnit, s: &StructNode, ctx: &mut NestingContext, storage: &str, seed: u64) -> Result<String, Error> {
  match s.kind {
    AggregateKind::Struct => {
      let mut out = String::new();
      for m in &s.members { out.push_str(&member_mutate(unit, m, ctx, storage, seed)?); }
      Ok(out)
    }
    AggregateKind::Union => build_union(unit, s, ctx, storage, seed),
  }
}

/// One member's contribution to a struct.
///
/// A nameless member (no DWARF name at all) only arises for a C11 anonymous
/// struct/union member, which promotes its own members onto the enclosing
/// aggregate's namespace — so the same `storage` expression still reaches
/// them; recurse unchanged. A *named* field of anonymous struct/union/enum
/// type is an ordinary member that merely lacks a tag — it is addressed
/// through `&storage->name` like anything else, not flattened.
fn member_mutate(unit: &mut TranslationUnit, m: &Member, ctx: &mut NestingContext, storage: &str, seed: u64) -> Result<String, Error> {
  let Some(name) = &m.name else {
    return if unit.node(m.ty).is_anonymous_aggregate() {
      build(unit, m.ty, ctx, storage, seed)
    } else {
      // A nameless, non-aggregate member has no C name to address through;
      // can't occur in valid DWARF.
      Ok(String::new())
    };
  };
  if let Some(_bits) = m.bit_size {
    if matches!(unit.node(m.ty), TypeNode::Array(..)) {
      return Ok(format!("  /* {name}: array-typed bitfield, not representable, skipped */\n"));
    }
    let tmp = ctx.next_tmp();
    let decl_text = printed_declaration(unit, m.ty)?;
    let mutator = mangle::mutator_name_seeded(&decl_text, seed);
    return Ok(format!(
      "  {{\n    int tmp{tmp} = {storage}->{name};\n    {mutator}(&tmp{tmp});\n    {storage}->{name} = tmp{tmp};\n  }}\n",
    ));
  }
  if unit.node(m.ty).is_anonymous_aggregate() {
    return build(unit, m.ty, ctx, &format!("&{storage}->{name}"), seed);
  }
  let decl_text = printed_declaration(unit, m.ty)?;
  let mutator = mangle::mutator_name_seeded(&decl_text, seed);
  Ok(format!("  {mutator}(&{storage}->{name});\n"))
}

fn build_union(unit: &mut TranslationUnit, s: &StructNode, ctx: &mut NestingContext, storage: &str, seed: u64) -> Result<String, Error> {
  let rnd = ctx.next_rnd();
  let mut out = format!("  int rnd{rnd} = fffc_get_random() % {};\n", s.members.len());
  for (i, m) in s.members.iter().enumerate() {
    let keyword = if i == 0 { "if" } else { "else if" };
    out.push_str(&format!("  {keyword} (rnd{rnd} == {i}) {{\n"));
    for line in member_mutate(unit, m, ctx, storage, seed)?.lines() {
      out.push_str("  ");
      out.push_str(line);
      out.push('\n');
    }
    out.push_str("  }\n");
  }
  Ok(out)
}

fn build_pointer(unit: &mut TranslationUnit, p: &PointerNode, storage: &str, seed: u64) -> Result<String, Error> {
  if matches!(unit.node(p.underlying), TypeNode::Function(..)) {
    // A function pointer's pointee can't be mutated in place; leave it alone.
    return Ok(format!("  (void){storage};\n"));
  }
  let decl_text = printed_declaration(unit, p.underlying)?;
  let mutator = mangle::mutator_name_seeded(&decl_text, seed);
  Ok(format!("  if (*{storage} != NULL) {{\n    {mutator}(*{storage});\n  }}\n"))
}

fn build_array(unit: &mut TranslationUnit, a: &ArrayNode, ctx: &mut NestingContext, storage: &str, seed: u64) -> Result<String, Error> {
  let decl_text = printed_declaration(unit, a.underlying)?;
  let mutator = mangle::mutator_name_seeded(&decl_text, seed);
  let total: u64 = a.dims.iter().product();
  let i = ctx.next_tmp();
  Ok(format!(
    "  for (size_t i{i} = 0; i{i} < {total}; i{i}++) {{\n    {mutator}(&(*{storage})[i{i}]);\n  }}\n",
  ))
}
