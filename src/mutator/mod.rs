//! The mutator synthesizer: turns a fully-defined type node into a
//! `(forward declaration, definition)` pair of C text, plus the matching
//! size-of helper.

mod body;

use crate::error::Error;
use crate::mangle;
use crate::nesting::NestingContext;
use crate::options::GenerationOptions;
use crate::scheduler::{get_reference, printed_declaration};
use crate::types::{Status, TypeId};
use crate::unit::TranslationUnit;

/// The two generated functions for one type: a fuzzing mutator and its
/// companion size-of helper, both named deterministically from the type's
/// printed declaration.
#[derive(Debug, Clone)]
pub struct MutatorPair {
  pub mutator_name: String,
  pub sizeof_name: String,
  /// K&R-style empty-parameter forward declarations, for the header.
  pub forward_decls: String,
  /// Full ANSI-style definitions, for the generated C source.
  pub definitions: String,
}

/// Synthesize the mutator and size-of helper for `id`. The type must already
/// be DONE (the scheduler must have run over it first); a fresh
/// [`NestingContext`] is created per call, never shared across types.
pub fn synthesize(unit: &mut TranslationUnit, id: TypeId, options: &GenerationOptions) -> Result<MutatorPair, Error> {
  debug_assert_eq!(unit.node(id).status(), Status::Done, "mutator synthesis requires a defined type");
  let mut ctx = NestingContext::new();
  let seed = options.mangling_seed.unwrap_or(mangle::DEFAULT_SEED);
  let decl_text = printed_declaration(unit, id)?;
  let mutator_name = mangle::mutator_name_seeded(&decl_text, seed);
  let sizeof_name = mangle::sizeof_name_seeded(&decl_text, seed);
  let storage_ty = get_reference(unit, id)?;

  let stmts = body::build(unit, id, &mut ctx, "storage", seed)?;
  let definition = format!(
    "void {mutator_name}({storage_ty} *storage)\n{{\n{stmts}}}\n"
  );
  let forward_decl = format!("void {mutator_name}();");

  let size_expr = body::size_expr(unit, id, "storage")?;
  let sizeof_def = format!(
    "size_t {sizeof_name}(void *storage)\n{{\n  return {size_expr};\n}}\n"
  );
  let sizeof_decl = format!("size_t {sizeof_name}();");

  Ok(MutatorPair {
    mutator_name,
    sizeof_name,
    forward_decls: format!("{forward_decl}\n{sizeof_decl}"),
    definitions: format!("{definition}\n{sizeof_def}"),
  })
}

/// The six do-nothing stub mutators (the "do-nothing" category): one per
/// pointer-indirection depth 0..=5, for every named type that made it into
/// the header without ever getting an ordinary mutator (e.g. a function type
/// referenced only as a parameter, never itself mutated).
#[must_use] pub fn do_nothing_stubs(type_ref: &str, base_name: &str) -> (String, String) {
  use arrayvec::ArrayVec;
  let mut decls: ArrayVec<String, 6> = ArrayVec::new();
  let mut defs: ArrayVec<String, 6> = ArrayVec::new();
  for depth in 0..=5u32 {
    let stars = "*".repeat(depth as usize);
    let name = format!("{base_name}_do_nothing_{depth}");
    decls.push(format!("void {name}();"));
    defs.push(format!(
      "void {name}({type_ref} {stars}storage)\n{{\n  (void)storage;\n}}\n"
    ));
  }
  (decls.join("\n"), defs.join("\n"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::die::{AttrName, AttrValue, CompilationUnitInput, RawDie as D, Tag};
  use crate::offset::Offset;
  use crate::scheduler::define;
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
  fn struct_mutator_calls_member_mutators() {
    let int_die = D::new(Tag::BaseType, Offset(0x10))
      .with_attr(AttrName::Name, AttrValue::Str("int".into()))
      .with_attr(AttrName::Encoding, AttrValue::UInt(5))
      .with_attr(AttrName::ByteSize, AttrValue::UInt(4));
    let mx = D::new(Tag::Member, Offset(0x21))
      .with_attr(AttrName::Name, AttrValue::Str("x".into()))
      .with_attr(AttrName::Type, AttrValue::Ref(Offset(0x10)));
    let my = D::new(Tag::Member, Offset(0x22))
      .with_attr(AttrName::Name, AttrValue::Str("y".into()))
      .with_attr(AttrName::Type, AttrValue::Ref(Offset(0x10)));
    let point = D::new(Tag::StructureType, Offset(0x20))
      .with_attr(AttrName::Name, AttrValue::Str("Point".into()))
      .with_child(Offset(0x21)).with_child(Offset(0x22));
    let mut u = unit_with(vec![int_die, mx, my, point]);
    let id = u.get_or_add(Offset(0x20)).unwrap();
    define(&mut u, id).unwrap();
    let pair = synthesize(&mut u, id, &GenerationOptions::default()).unwrap();
    assert!(pair.definitions.contains("&storage->x"));
    assert!(pair.definitions.contains("&storage->y"));
    assert!(pair.mutator_name.starts_with("_Z_fffc_mutator_"));
  }

  #[test]
  fn do_nothing_has_six_depths() {
    let (decls, _) = do_nothing_stubs("struct Opaque", "opaque");
    for depth in 0..=5 {
      assert!(decls.contains(&format!("opaque_do_nothing_{depth}")));
    }
  }
}
