//! The nesting context: identifier-uniqueness counters threaded
//! explicitly through mutator synthesis instead of living as process-wide
//! globals. Reset at each top-level type boundary so that two independent
//! mutators never collide on a local variable name.

/// Per-synthesis counters for unique local identifiers inside a generated
/// mutator body. One top-level type's synthesis owns exactly one of these;
/// it is threaded by `&mut` into every recursive call instead of being
/// implicit global state.
#[derive(Debug, Default, Clone, Copy)]
pub struct NestingContext {
  /// Distinguishes `rnd` locals across nested union picks.
  rnd_count: u32,
  /// The most recently allocated `rnd` local's nesting depth, for diagnostics.
  current_rnd_value: u32,
  /// Distinguishes bitfield copy-out/copy-in temporaries.
  tmp_count: u32,
  /// Distinguishes `values[]` locals across nested enum picks.
  values_count: u32,
}

impl NestingContext {
  #[must_use] pub fn new() -> Self { Self::default() }

  /// Allocate a fresh `rndN` identifier, returning its suffix.
  pub fn next_rnd(&mut self) -> u32 {
    let n = self.rnd_count;
    self.rnd_count += 1;
    self.current_rnd_value = n;
    n
  }

  /// Allocate a fresh `tmpN` identifier, returning its suffix.
  pub fn next_tmp(&mut self) -> u32 {
    let n = self.tmp_count;
    self.tmp_count += 1;
    n
  }

  /// Allocate a fresh `valuesN` identifier, returning its suffix.
  pub fn next_values(&mut self) -> u32 {
    let n = self.values_count;
    self.values_count += 1;
    n
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn counters_are_independent_and_monotonic() {
    let mut ctx = NestingContext::new();
    assert_eq!(ctx.next_rnd(), 0);
    assert_eq!(ctx.next_tmp(), 0);
    assert_eq!(ctx.next_rnd(), 1);
    assert_eq!(ctx.next_values(), 0);
    assert_eq!(ctx.current_rnd_value, 1);
  }

  #[test]
  fn fresh_context_resets_everything() {
    let mut ctx = NestingContext::new();
    ctx.next_rnd();
    ctx.next_tmp();
    let fresh = NestingContext::new();
    assert_eq!(fresh.rnd_count, 0);
    assert_eq!(fresh.tmp_count, 0);
  }
}
