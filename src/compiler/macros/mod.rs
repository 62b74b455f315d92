/*!
  Macro commands: each turns a single instruction-like statement in the
  source assembler into a sequence of primitive (or further macro)
  statements, which the compiler then scans back through itself. The
  built-in set implements a stack-frame calling convention as a pure
  assembly-level convention over flat memory; the VM itself knows nothing
  about frames.
*/

mod registers;
mod stack;

use std::collections::HashMap;
use std::rc::Rc;

use crate::register::Register;
use super::compile::parse_literal;
use super::context::CompilationContext;
use super::location::Location;
use super::CompileError;

pub use stack::FRAME_POINTER_CELL;

/**
  A macro command. `unroll` validates its own parameters and returns the
  statements to be compiled in place of the invocation; the compiler
  attributes each statement to the macro body, chained to the call site.
*/
pub trait MacroCommand {
  /// The name this macro is invoked by in source.
  fn name(&self) -> &'static str;

  fn unroll(
      &self,
      params           : &[&str],
      include_location : &Location,
      context          : &mut CompilationContext
    ) -> Result<Vec<String>, CompileError>;
}

/// The built-in macro registry, keyed by invocation name.
pub(super) fn built_ins() -> HashMap<&'static str, Rc<dyn MacroCommand>> {
  let commands: Vec<Rc<dyn MacroCommand>> = vec![
    Rc::new(registers::StoreAllRegisters),
    Rc::new(registers::RecallAllRegisters),
    Rc::new(stack::Invoke),
    Rc::new(stack::Return),
    Rc::new(stack::EnlargeCurrentStackFrame),
    Rc::new(stack::StoreInStack),
    Rc::new(stack::RecallFromStack),
    Rc::new(stack::DebugCurrentStackFrame),
  ];

  commands.into_iter()
          .map(|command| (command.name(), command))
          .collect()
}

/// True if the token is a register reference: a `#` sigil followed by a name
/// from the register table.
pub(crate) fn is_register_argument(token: &str) -> bool {
  token.strip_prefix('#')
       .map_or(false, |name| Register::from_name(name).is_some())
}

/// Validates that a macro parameter is a numeric literal (frame-slot indices
/// and sizes must be known at compile time).
fn literal_param(
    token    : &str,
    name     : &'static str,
    index    : usize,
    location : &Location
  ) -> Result<i64, CompileError>
{
  parse_literal(token).ok_or_else(|| CompileError::MacroParameterShape {
    name,
    expected: "a numeric literal",
    index,
    token: token.to_string(),
    location: location.clone()
  })
}

/// Shorthand for the count-mismatch error every macro raises.
fn parameter_count_error(
    name        : &'static str,
    requirement : &'static str,
    given       : usize,
    location    : &Location
  ) -> CompileError
{
  CompileError::MacroParameterCount {
    name,
    requirement,
    given,
    location: location.clone()
  }
}
