//! A translation unit: the per-CU state the rest of the pipeline operates on.

use hashbrown::HashMap;
use crate::die::{CompilationUnitInput, Language, Producer, RawDie};
use crate::error::Error;
use crate::header::HeaderAccumulator;
use crate::offset::Offset;
use crate::types::{TypeId, TypeNode};

/// One source file's worth of DWARF information, plus the type-node table and
/// header accumulator it grows as the builder and scheduler visit it.
///
/// The node table doubles as an arena keyed by DWARF offset: `nodes`
/// is index-allocated (never reallocated out from under a live [`TypeId`]),
/// and `by_offset` maps each DIE offset to the index that represents it.
#[derive(Debug)]
pub struct TranslationUnit {
  pub source_file: String,
  pub root_offset: Offset,
  pub language: Language,
  pub producer: Producer,
  dies: HashMap<Offset, RawDie>,
  nodes: Vec<TypeNode>,
  by_offset: HashMap<Offset, TypeId>,
  pub(crate) void_id: TypeId,
  pub header: HeaderAccumulator,
}

impl TranslationUnit {
  /// Build an (empty-of-nodes) translation unit from the external parser's
  /// output, rejecting languages outside {K&R, ANSI, C99}.
  pub fn new(input: CompilationUnitInput) -> Result<Self, Error> {
    let language = Language::from_raw(input.language_raw).ok_or_else(|| Error::InputValidation {
      file: input.source_file.clone(),
      reason: "not written in C (unsupported DW_AT_language)".to_string(),
    })?;
    let mut unit = TranslationUnit {
      source_file: input.source_file,
      root_offset: input.root_offset,
      language,
      producer: Producer::parse(&input.producer),
      dies: input.dies,
      nodes: vec![TypeNode::Void],
      by_offset: HashMap::new(),
      void_id: TypeId(0),
      header: HeaderAccumulator::new(),
    };
    unit.nodes.reserve(unit.dies.len());
    Ok(unit)
  }

  #[must_use] pub fn void_id(&self) -> TypeId { self.void_id }

  pub(crate) fn die(&self, offset: Offset) -> Result<&RawDie, Error> {
    self.dies.get(&offset).ok_or_else(|| Error::GraphError {
      file: self.source_file.clone(), offset,
      reason: "reference to an offset with no DIE".to_string(),
    })
  }

  #[must_use] pub fn node(&self, id: TypeId) -> &TypeNode { &self.nodes[id.0 as usize] }

  pub(crate) fn node_mut(&mut self, id: TypeId) -> &mut TypeNode { &mut self.nodes[id.0 as usize] }

  #[must_use] pub fn existing_id(&self, offset: Offset) -> Option<TypeId> { self.by_offset.get(&offset).copied() }

  pub(crate) fn reserve(&mut self, offset: Offset, placeholder: TypeNode) -> TypeId {
    let id = TypeId(self.nodes.len() as u32);
    self.nodes.push(placeholder);
    self.by_offset.insert(offset, id);
    id
  }

  pub(crate) fn finish(&mut self, id: TypeId, node: TypeNode) { self.nodes[id.0 as usize] = node; }

  /// Every offset that has a materialized node, in discovery order — the
  /// tie-break the scheduler falls back to when two forms would otherwise race.
  #[must_use] pub fn discovery_order(&self) -> Vec<TypeId> {
    (0..self.nodes.len() as u32).map(TypeId).collect()
  }

  /// All top-level named, non-anonymous type nodes materialized so far,
  /// i.e. the ones the declaration/definition scheduler walks to build a header.
  #[must_use] pub fn named_nodes(&self) -> Vec<TypeId> {
    self.discovery_order().into_iter()
      .filter(|&id| self.node(id).name().is_some())
      .collect()
  }
}
