//! Generation-wide configuration, threaded explicitly through the
//! scheduler and synthesizer entry points rather than read from globals —
//! the same "pass it as an explicit parameter" discipline [`crate::nesting::NestingContext`]
//! follows for per-type counters.

use bitflags::bitflags;

bitflags! {
  /// Feature toggles that change what gets emitted, independent of the
  /// mangling seed.
  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub struct GenerationFlags: u32 {
    /// Emit `__attribute__((packed))` on a [`crate::types::StructNode`]
    /// whose `packed` bit is set. Reserved for future use: the scheduler
    /// currently computes the bit but the printer never acts on it, since
    /// no example in this corpus exercises a packed layout end to end.
    const ANNOTATE_PACKED = 1 << 0;
  }
}

impl Default for GenerationFlags {
  fn default() -> Self { GenerationFlags::empty() }
}

/// Knobs for one translation unit's run through the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct GenerationOptions {
  pub flags: GenerationFlags,
  /// Override the FNV-1a seed [`crate::mangle`] hashes with, so a test can
  /// assert on exact mangled names instead of just their stability.
  pub mangling_seed: Option<u64>,
}

impl Default for GenerationOptions {
  fn default() -> Self {
    GenerationOptions { flags: GenerationFlags::default(), mangling_seed: None }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_options_disable_packed_annotation() {
    let opts = GenerationOptions::default();
    assert!(!opts.flags.contains(GenerationFlags::ANNOTATE_PACKED));
    assert!(opts.mangling_seed.is_none());
  }
}
