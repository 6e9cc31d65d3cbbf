//! The shim synthesizer: for each eligible external function, builds
//! an interposing runner that mutates its arguments before forwarding to the
//! real implementation through a recovered function pointer.
//!
//! A function is eligible exactly when its [`FunctionNode`] is external
//! (already demoted to non-external by the graph builder when no low-PC was
//! observed), non-variadic, and takes at least one parameter — a
//! zero-argument function has nothing for the runner to mutate.

use crate::error::Error;
use crate::mangle;
use crate::offset::Address;
use crate::options::GenerationOptions;
use crate::scheduler::{get_reference, printed_declaration};
use crate::types::{FunctionNode, TypeId, TypeNode};
use crate::unit::TranslationUnit;

/// Everything the driver needs to splice one interposing runner into the
/// generated shim source and its surrounding build metadata.
#[derive(Debug, Clone)]
pub struct ShimOutput {
  pub target_name: String,
  /// `RET (*FFFC_target)(T1, T2);` — recovered at load time by the
  /// out-of-scope driver via the symbol's low-PC, not by this module.
  pub function_pointer_decl: String,
  pub runner_definition: String,
  pub low_pc_hex: String,
  /// `true` for `ET_DYN` (PIE) executables, `false` for `ET_EXEC`.
  pub pie_flag: bool,
  /// Absolute path of the binary providing the symbol; empty when it's the
  /// main executable (the loader represents that entry as the empty name).
  pub providing_binary: String,
}

#[must_use] pub fn is_eligible(f: &FunctionNode) -> bool {
  f.external && !f.variadic && !f.params.is_empty()
}

/// Build the runner for `id`, or `None` if the node isn't an eligible
/// function (not a `TypeNode::Function` at all, or fails [`is_eligible`]).
pub fn synthesize(
  unit: &mut TranslationUnit,
  id: TypeId,
  options: &GenerationOptions,
  pie_flag: bool,
  providing_binary: &str,
) -> Result<Option<ShimOutput>, Error> {
  let node = unit.node(id).clone();
  let (header, f) = match node {
    TypeNode::Function(h, f) if is_eligible(&f) => (h, f),
    _ => return Ok(None),
  };
  let target_name = header.name.expect("external functions always carry a name");
  let low_pc = f.low_pc.expect("is_eligible implies external implies a known low-PC");
  let seed = options.mangling_seed.unwrap_or(mangle::DEFAULT_SEED);

  let ret_ty = match f.return_type {
    Some(r) => get_reference(unit, r)?,
    None => "void".to_string(),
  };

  let mut param_types = Vec::with_capacity(f.params.len());
  let mut param_decls = Vec::with_capacity(f.params.len());
  let mut locals = String::new();
  let mut mutate_calls = String::new();
  let mut call_args = Vec::with_capacity(f.params.len());
  for (i, p) in f.params.iter().enumerate() {
    let ty_ref = get_reference(unit, p.ty)?;
    let orig_name = p.name.clone().unwrap_or_else(|| format!("arg{i}"));
    let local_name = format!("_{orig_name}");
    param_types.push(ty_ref.clone());
    param_decls.push(format!("{ty_ref} {orig_name}"));
    locals.push_str(&format!("  {ty_ref} {local_name} = {orig_name};\n"));
    let decl_text = printed_declaration(unit, p.ty)?;
    let mutator = mangle::mutator_name_seeded(&decl_text, seed);
    mutate_calls.push_str(&format!("  {mutator}(&{local_name});\n"));
    call_args.push(local_name);
  }

  let function_pointer_decl = format!("{ret_ty} (*FFFC_target)({});", param_types.join(", "));
  let joined_args = call_args.join(", ");
  let call = if ret_ty == "void" {
    format!("  FFFC_target({joined_args});\n")
  } else {
    format!("  {ret_ty} retval = FFFC_target({joined_args});\n  return retval;\n")
  };
  let runner_definition = format!(
    "{ret_ty} {target_name}({})\n{{\n{locals}{mutate_calls}{call}}}\n",
    param_decls.join(", "),
  );

  Ok(Some(ShimOutput {
    target_name,
    function_pointer_decl,
    runner_definition,
    low_pc_hex: format_low_pc(low_pc),
    pie_flag,
    providing_binary: providing_binary.to_string(),
  }))
}

fn format_low_pc(addr: Address) -> String { addr.to_string() }

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
  fn s7_external_void_function_gets_a_runner() {
    // S7: void f(int x) with external and known low-PC.
    let int_die = D::new(Tag::BaseType, Offset(0x10))
      .with_attr(AttrName::Name, AttrValue::Str("int".into()))
      .with_attr(AttrName::Encoding, AttrValue::UInt(5))
      .with_attr(AttrName::ByteSize, AttrValue::UInt(4));
    let param = D::new(Tag::FormalParameter, Offset(0x11))
      .with_attr(AttrName::Name, AttrValue::Str("x".into()))
      .with_attr(AttrName::Type, AttrValue::Ref(Offset(0x10)));
    let func = D::new(Tag::Subprogram, Offset(0x20))
      .with_attr(AttrName::Name, AttrValue::Str("f".into()))
      .with_attr(AttrName::External, AttrValue::Flag(true))
      .with_attr(AttrName::LowPc, AttrValue::UInt(0x4010_a0))
      .with_child(Offset(0x11));
    let mut unit = unit_with(vec![int_die, param, func]);
    let id = unit.get_or_add(Offset(0x20)).unwrap();
    let options = GenerationOptions::default();
    let shim = synthesize(&mut unit, id, &options, true, "").unwrap().expect("eligible");
    assert_eq!(shim.target_name, "f");
    assert_eq!(shim.function_pointer_decl, "void (*FFFC_target)(int);");
    assert!(shim.runner_definition.contains("int _x = x;"));
    assert!(shim.runner_definition.contains("(&_x);"));
    assert!(shim.runner_definition.contains("FFFC_target(_x);"));
    assert!(shim.pie_flag);
    assert_eq!(shim.low_pc_hex, "0x4010a0");
  }

  #[test]
  fn zero_parameter_function_is_ineligible() {
    let func = D::new(Tag::Subprogram, Offset(0x20))
      .with_attr(AttrName::Name, AttrValue::Str("g".into()))
      .with_attr(AttrName::External, AttrValue::Flag(true))
      .with_attr(AttrName::LowPc, AttrValue::UInt(0x1000));
    let mut unit = unit_with(vec![func]);
    let id = unit.get_or_add(Offset(0x20)).unwrap();
    let options = GenerationOptions::default();
    assert!(synthesize(&mut unit, id, &options, false, "").unwrap().is_none());
  }

  #[test]
  fn non_external_function_is_ineligible() {
    let int_die = D::new(Tag::BaseType, Offset(0x10))
      .with_attr(AttrName::Name, AttrValue::Str("int".into()))
      .with_attr(AttrName::Encoding, AttrValue::UInt(5))
      .with_attr(AttrName::ByteSize, AttrValue::UInt(4));
    let param = D::new(Tag::FormalParameter, Offset(0x11))
      .with_attr(AttrName::Type, AttrValue::Ref(Offset(0x10)));
    let func = D::new(Tag::Subprogram, Offset(0x20))
      .with_attr(AttrName::Name, AttrValue::Str("h".into()))
      .with_child(Offset(0x11));
    let mut unit = unit_with(vec![int_die, param, func]);
    let id = unit.get_or_add(Offset(0x20)).unwrap();
    let options = GenerationOptions::default();
    assert!(synthesize(&mut unit, id, &options, false, "").unwrap().is_none());
  }
}
