//! The composition root: glues the type graph builder, scheduler,
//! mutator synthesizer, and shim synthesizer into one call per translation
//! unit. Has no policy of its own — every decision it makes was already
//! made by the stage it calls.

use log::warn;

use crate::error::Error;
use crate::mutator::{self, MutatorPair};
use crate::options::GenerationOptions;
use crate::scheduler::define;
use crate::shim::{self, ShimOutput};
use crate::types::Status;
use crate::unit::TranslationUnit;

/// Everything one translation unit contributes to the generated output: the
/// header's top-level forms (already deduplicated and `__builtin`-filtered
/// by [`HeaderAccumulator`]), one [`MutatorPair`] per named type that made
/// it into the header, and one [`ShimOutput`] per eligible external function.
pub struct TranslationUnitOutput {
  pub header_forms: String,
  pub mutators: Vec<MutatorPair>,
  pub shims: Vec<ShimOutput>,
}

/// Run the full pipeline over every named type reachable from `unit`'s DIEs:
/// define it (declaration/definition scheduling), synthesize its
/// mutator, and, if it's an eligible external function, synthesize
/// its shim. A single type's failure is logged and the type is
/// skipped rather than aborting the whole unit — local recovery is
/// preferred at the target boundary, scoped here to per-type granularity
/// within one target.
pub fn run_translation_unit(
  unit: &mut TranslationUnit,
  options: &GenerationOptions,
  pie_flag: bool,
  providing_binary: &str,
) -> Result<TranslationUnitOutput, Error> {
  let mut mutators = Vec::new();
  let mut shims = Vec::new();

  for id in unit.named_nodes() {
    if let Err(e) = define(unit, id) {
      warn!("{}: skipping type, definition failed: {e}", unit.source_file);
      continue;
    }
    if unit.node(id).status() != Status::Done { continue; }

    // Subprograms are interposed on via a shim, never mutated as a value in
    // their own right; everything else gets a mutator.
    if !matches!(unit.node(id), crate::types::TypeNode::Function(..)) {
      match mutator::synthesize(unit, id, options) {
        Ok(pair) => mutators.push(pair),
        Err(e) => warn!("{}: skipping mutator synthesis: {e}", unit.source_file),
      }
    }

    match shim::synthesize(unit, id, options, pie_flag, providing_binary) {
      Ok(Some(s)) => shims.push(s),
      Ok(None) => {}
      Err(e) => warn!("{}: skipping shim synthesis: {e}", unit.source_file),
    }
  }

  Ok(TranslationUnitOutput { header_forms: unit.header.render(), mutators, shims })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::die::{AttrName, AttrValue, CompilationUnitInput, RawDie as D, Tag};
  use crate::offset::Offset;
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
  fn struct_and_external_function_both_produce_output() {
    let int_die = D::new(Tag::BaseType, Offset(0x10))
      .with_attr(AttrName::Name, AttrValue::Str("int".into()))
      .with_attr(AttrName::Encoding, AttrValue::UInt(5))
      .with_attr(AttrName::ByteSize, AttrValue::UInt(4));
    let mx = D::new(Tag::Member, Offset(0x21))
      .with_attr(AttrName::Name, AttrValue::Str("x".into()))
      .with_attr(AttrName::Type, AttrValue::Ref(Offset(0x10)));
    let point = D::new(Tag::StructureType, Offset(0x20))
      .with_attr(AttrName::Name, AttrValue::Str("Point".into()))
      .with_child(Offset(0x21));
    let param = D::new(Tag::FormalParameter, Offset(0x31))
      .with_attr(AttrName::Name, AttrValue::Str("x".into()))
      .with_attr(AttrName::Type, AttrValue::Ref(Offset(0x10)));
    let func = D::new(Tag::Subprogram, Offset(0x30))
      .with_attr(AttrName::Name, AttrValue::Str("f".into()))
      .with_attr(AttrName::External, AttrValue::Flag(true))
      .with_attr(AttrName::LowPc, AttrValue::UInt(0x1000))
      .with_child(Offset(0x31));
    let mut unit = unit_with(vec![int_die, mx, point, param, func]);
    unit.get_or_add(Offset(0x20)).unwrap();
    unit.get_or_add(Offset(0x30)).unwrap();

    let options = GenerationOptions::default();
    let out = run_translation_unit(&mut unit, &options, false, "").unwrap();
    assert!(out.header_forms.contains("struct Point"));
    // One mutator for "int" (a named base type) and one for "struct Point".
    assert_eq!(out.mutators.len(), 2);
    assert_eq!(out.shims.len(), 1);
    assert_eq!(out.shims[0].target_name, "f");
  }
}
