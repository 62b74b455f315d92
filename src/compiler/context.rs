/*!
  The compilation context: everything one compile accumulates and then
  resolves. One context per compiled file (plus whatever that file's macro
  expansions feed back into it).
*/

use std::collections::HashMap;
use std::rc::Rc;

use crate::bytecode::{Instruction, Opcode};
use super::location::Location;
use super::macros::{self, MacroCommand};
use super::CompileError;

/// A declared label: its name, where it was declared, and how many
/// instructions had been collected when it was. The word offset jump
/// arguments want is *not* stored; it is computed lazily by
/// [`CompilationContext::word_offset_of`], because instructions can still be
/// appended (by macro expansion) after the label is declared.
#[derive(Clone, Debug)]
pub struct Label {
  pub name: String,
  pub location: Location,
  pub instruction_offset: usize,
}

/// One argument of a deferred instruction. Literal and register arguments
/// resolve at parse time; a label reference stays symbolic until the
/// resolution pass, when every label is guaranteed registered.
#[derive(Clone, Debug)]
pub enum Arg {
  Value(i64),
  LabelRef {
    name: String,
    location: Location
  },
}

/// An instruction whose arguments may still contain unresolved label
/// references.
#[derive(Clone, Debug)]
pub struct DeferredInstruction {
  pub opcode: Opcode,
  pub args: Vec<Arg>,
  pub location: Location,
}

/// Models the context in which a file of assembler is compiled.
pub struct CompilationContext {
  labels: HashMap<String, Label>,
  instructions: Vec<DeferredInstruction>,
  /// The macro registry; fixed at construction.
  macros: Rc<HashMap<&'static str, Rc<dyn MacroCommand>>>,
  /// Mints unique labels for macro-generated return addresses. Owned by the
  /// context so independent compiles cannot collide.
  invocation_counter: u64,
}

impl CompilationContext {

  pub fn new() -> CompilationContext {
    CompilationContext {
      labels: HashMap::new(),
      instructions: Vec::new(),
      macros: Rc::new(macros::built_ins()),
      invocation_counter: 0,
    }
  }

  /// Registers a label at the current instruction count. Redeclaration is an
  /// error naming both declaration sites.
  pub fn declare_label(&mut self, name: &str, location: Location) -> Result<(), CompileError> {
    if let Some(existing) = self.labels.get(name) {
      return Err(CompileError::DuplicateLabel {
        name: name.to_string(),
        original: existing.location.clone(),
        duplicate: location
      });
    }

    self.labels.insert(
      name.to_string(),
      Label {
        name: name.to_string(),
        location,
        instruction_offset: self.instructions.len()
      }
    );
    Ok(())
  }

  pub fn push(&mut self, instruction: DeferredInstruction) {
    self.instructions.push(instruction);
  }

  pub fn instruction_count(&self) -> usize {
    self.instructions.len()
  }

  /// Looks up a registered macro. The handle is cloned out so expansion can
  /// mutate the context while the command runs.
  pub fn macro_named(&self, name: &str) -> Option<Rc<dyn MacroCommand>> {
    self.macros.get(name).cloned()
  }

  /// The next unique id for macro-generated labels.
  pub fn next_invocation(&mut self) -> u64 {
    let id = self.invocation_counter;
    self.invocation_counter += 1;
    id
  }

  /// The label declared at the given instruction index, if any. Used by the
  /// program listing.
  pub fn label_at_instruction(&self, index: usize) -> Option<&Label> {
    self.labels.values().find(|label| label.instruction_offset == index)
  }

  /// The word offset of a label in the memory image: the sum of the widths
  /// of every instruction collected before it.
  fn word_offset_of(&self, label: &Label) -> i64 {
    self.instructions[..label.instruction_offset]
        .iter()
        .map(|deferred| deferred.opcode.qword_size())
        .sum()
  }

  /**
    The resolution pass: forces every deferred argument, now that the entire
    source (and all macro expansions) has been scanned and every label is
    registered. Deterministic and side-effect-free.
  */
  pub fn resolve(&self) -> Result<Vec<Instruction>, CompileError> {
    self.instructions
        .iter()
        .map(|deferred| {
          let args = deferred.args
                             .iter()
                             .map(|arg| self.resolve_arg(arg))
                             .collect::<Result<Vec<i64>, CompileError>>()?;
          Instruction::new(deferred.opcode, args).map_err(CompileError::from)
        })
        .collect()
  }

  fn resolve_arg(&self, arg: &Arg) -> Result<i64, CompileError> {
    match arg {
      Arg::Value(value) => Ok(*value),

      Arg::LabelRef { name, location } => {
        let label = self.labels.get(name)
                               .ok_or_else(|| CompileError::UnknownLabel {
                                 name: name.clone(),
                                 location: location.clone()
                               })?;
        Ok(self.word_offset_of(label))
      }
    }
  }
}

impl Default for CompilationContext {
  fn default() -> CompilationContext {
    CompilationContext::new()
  }
}
