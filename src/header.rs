//! The per-translation-unit header accumulator.

use hashbrown::HashMap;
use crate::cast::Form;
use crate::types::{Status, TypeId};

/// Accumulates the ordered stream of top-level forms the scheduler produces
/// for one translation unit, de-duplicating by rendered text and suppressing
/// anything whose name starts with `__builtin`.
#[derive(Debug, Default)]
pub struct HeaderAccumulator {
  /// Name → status, mirroring how far along each named type's emission is.
  defined: HashMap<String, Status>,
  /// Name → the type node that owns it, for forms a later pass needs to revisit.
  named: HashMap<String, TypeId>,
  forms: Vec<Form>,
  seen_text: hashbrown::HashSet<String>,
}

impl HeaderAccumulator {
  #[must_use] pub fn new() -> Self { Self::default() }

  /// Push a form into the stream unless an earlier form already rendered to
  /// the same text, or the form's name begins with `__builtin`.
  pub fn push(&mut self, form: Form, builtin_name: Option<&str>) {
    if builtin_name.is_some_and(|n| n.starts_with("__builtin")) { return; }
    let text = form.render();
    if self.seen_text.insert(text) { self.forms.push(form); }
  }

  pub fn note_named(&mut self, name: &str, id: TypeId, status: Status) {
    self.named.insert(name.to_string(), id);
    self.defined.insert(name.to_string(), status);
  }

  #[must_use] pub fn status_of(&self, name: &str) -> Option<Status> { self.defined.get(name).copied() }

  pub fn set_status(&mut self, name: &str, status: Status) {
    self.defined.entry(name.to_string())
      .and_modify(|s| s.advance(status))
      .or_insert(status);
  }

  #[must_use] pub fn forms(&self) -> &[Form] { &self.forms }

  /// Render the full header: one form per line-group, already deduplicated.
  #[must_use] pub fn render(&self) -> String {
    self.forms.iter().map(Form::render).collect::<Vec<_>>().join("\n\n")
  }

  /// Reset the synthesis-nesting bookkeeping boundary. Called once per
  /// top-level type before mutator synthesis begins; the header
  /// accumulator itself holds no nesting state, so this is a no-op hook kept
  /// for callers that want one reset point for the whole per-type pipeline.
  pub fn reset_nesting(&self) {}
}
