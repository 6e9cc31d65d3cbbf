//! The error taxonomy, given a concrete shape.

use thiserror::Error;
use crate::offset::Offset;

/// Every fallible core operation returns this. Callers at the per-target
/// boundary match on the variant to decide whether the whole batch dies or
/// just this target is skipped.
#[derive(Debug, Error)]
pub enum Error {
  /// Target lacks `.debug_info`, lacks an ASan dependency, or a CU's
  /// language isn't one of K&R/ANSI/C99. Fatal for the target, not the batch.
  #[error("{file}: {reason}")]
  InputValidation { file: String, reason: String },

  /// A DIE contradicts itself, e.g. a subrange carrying both `upper_bound`
  /// and `count` with disagreeing values. Fatal for the target.
  #[error("{file} at {offset}: {reason}")]
  GraphError { file: String, offset: Offset, reason: String },

  /// The preprocessor/compiler/linker failed or could not be found. Fatal
  /// for the whole batch; there is no fallback.
  #[error("toolchain failure running {tool}: {reason}")]
  ToolchainFailure { tool: String, reason: String },

  /// The output directory already exists and `--overwrite` was not passed.
  #[error("output directory {path} already exists (pass --overwrite)")]
  OutputCollision { path: String },

  /// An observed base type's `(encoding, size)` pair matched nothing in the
  /// canonical table, and the DIE itself carried no name to fall back on.
  /// Fatal for the target; reported to the operator via `log::warn!` at the
  /// call site before being returned.
  #[error("{file} at {offset}: unknown base type (encoding {encoding}, size {size})")]
  UnknownBaseType { file: String, offset: Offset, encoding: u8, size: u64 },
}
