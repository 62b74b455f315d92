/*!
  The assembler: turns textual assembly into instruction sequences.

  Compilation is two-phase. Phase one scans every source line (and,
  recursively, every statement produced by macro expansion) into a
  [`CompilationContext`], collecting labels and deferred instructions but
  resolving nothing. Phase two resolves every deferred label reference to a
  word offset and produces the final instruction list. The split exists
  because a label's offset is the sum of the widths of every
  instruction before it, and macro expansion can still be appending
  instructions when a forward reference is first seen: only once the whole
  file has been scanned is every offset known.

  Every compilation failure is fatal and carries the source location, chained
  through macro include sites. There is no partial recovery and no
  best-effort output.
*/

mod compile;
mod context;
mod location;
pub mod macros;

use thiserror::Error;

use crate::bytecode::{InstructionError, Opcode};

pub use compile::{compile_file, compile_lines, print_program, RUNTIME_PRELUDE};
pub use context::{Arg, CompilationContext, DeferredInstruction, Label};
pub use location::Location;

/// Compile-time errors. All fatal to the whole compile.
#[derive(Error, Debug)]
pub enum CompileError {
  #[error("unknown opcode {name} in {location}")]
  UnknownOpcode {
    name: String,
    location: Location
  },

  #[error("unknown register {name} in {location}")]
  UnknownRegister {
    name: String,
    location: Location
  },

  #[error("unknown label {name} in {location}")]
  UnknownLabel {
    name: String,
    location: Location
  },

  #[error("label {name} already defined in {original}; duplicate declaration in {duplicate}")]
  DuplicateLabel {
    name: String,
    original: Location,
    duplicate: Location
  },

  #[error("opcode {opcode:?} defines {expected} arguments, {given} given in {location}")]
  WrongArgumentCount {
    opcode: Opcode,
    expected: usize,
    given: usize,
    location: Location
  },

  #[error("invalid numeric literal {literal} in {location}")]
  BadLiteral {
    literal: String,
    location: Location
  },

  #[error("the {name} macro requires {requirement}, {given} given in {location}")]
  MacroParameterCount {
    name: &'static str,
    requirement: &'static str,
    given: usize,
    location: Location
  },

  #[error("the {name} macro expected {expected} as parameter {index}, got {token} in {location}")]
  MacroParameterShape {
    name: &'static str,
    expected: &'static str,
    index: usize,
    token: String,
    location: Location
  },

  #[error(transparent)]
  Instruction(#[from] InstructionError),

  #[error("i/o error: {0}")]
  Io(#[from] std::io::Error),
}
