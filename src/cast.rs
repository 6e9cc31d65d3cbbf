//! A neutral tree of C top-level constructs.
//!
//! The production system hands a richer version of this tree to an external
//! C AST printer; that printer is out of scope here. What follows is just
//! enough of a neutral `Form` to let the scheduler describe *what* it wants
//! emitted, and a small `render` so tests can assert on the resulting text
//! without reimplementing a full C pretty-printer.

use itertools::Itertools;

/// One top-level form the scheduler or a synthesizer wants written into a header
/// or source file. Two forms are the "same" for deduplication purposes
/// iff [`Form::render`] produces identical text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Form {
  /// `struct Tag;` / `union Tag;` / `enum Tag;`
  ForwardDecl { keyword: &'static str, tag: String },
  /// A full struct/union definition.
  Aggregate { keyword: &'static str, tag: String, members: Vec<MemberForm> },
  /// A full enum definition, members written as plain `int` constants.
  EnumDef { tag: String, consts: Vec<(String, i64)> },
  /// `typedef <underlying> <name>;`, underlying already rendered as a C declarator.
  Typedef { underlying: String, name: String },
  /// A function prototype.
  Prototype { ret: String, name: String, params: Vec<String>, variadic: bool },
  /// Pre-rendered text (mutator/shim bodies produced by template substitution).
  /// Still deduplicated textually like any other form.
  Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberForm {
  pub decl: String,
  pub bit_size: Option<u32>,
}

impl Form {
  /// Render this form to C text. Forms whose name starts with `__builtin`
  /// must never reach this function (the header emitter filters them first,
  /// a valid header would reject it.
  #[must_use] pub fn render(&self) -> String {
    match self {
      Form::ForwardDecl { keyword, tag } => format!("{keyword} {tag};"),
      Form::Aggregate { keyword, tag, members } => {
        let body = members.iter().map(|m| match m.bit_size {
          Some(bits) => format!("  {} : {};", m.decl, bits),
          None => format!("  {};", m.decl),
        }).join("\n");
        if body.is_empty() {
          format!("{keyword} {tag} {{\n}};")
        } else {
          format!("{keyword} {tag} {{\n{body}\n}};")
        }
      }
      Form::EnumDef { tag, consts } => {
        let body = consts.iter().map(|(n, v)| format!("  {n} = {v}")).join(",\n");
        format!("enum {tag} {{\n{body}\n}};")
      }
      Form::Typedef { underlying, name } => format!("typedef {underlying} {name};"),
      Form::Prototype { ret, name, params, variadic } => {
        let mut all: Vec<String> = params.clone();
        if *variadic { all.push("...".into()); }
        let joined = if all.is_empty() { "void".to_string() } else { all.join(", ") };
        format!("{ret} {name}({joined});")
      }
      Form::Raw(text) => text.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn aggregate_renders_members() {
    let f = Form::Aggregate {
      keyword: "struct", tag: "Point".into(),
      members: vec![
        MemberForm { decl: "int x".into(), bit_size: None },
        MemberForm { decl: "int y".into(), bit_size: None },
      ],
    };
    assert_eq!(f.render(), "struct Point {\n  int x;\n  int y;\n};");
  }

  #[test]
  fn prototype_with_no_params_uses_void() {
    let f = Form::Prototype { ret: "int".into(), name: "f".into(), params: vec![], variadic: false };
    assert_eq!(f.render(), "int f(void);");
  }
}
