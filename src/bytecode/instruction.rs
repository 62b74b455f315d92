use std::fmt::{Display, Formatter};

use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use thiserror::Error;

/**
  Opcodes of the virtual machine.

  Each opcode carries a stable one-byte wire value and a fixed argument count.
  The wire values are a contract with every compiled binary in existence, so the
  discriminants below are explicit and must never be reordered or reused. The
  `strum` serializations double as the assembler mnemonics, which is how the
  compiler resolves a source token to an opcode (`Opcode::from_str`).
*/
#[derive(
StrumDisplay, IntoStaticStr, EnumString, EnumIter, TryFromPrimitive, IntoPrimitive,
Clone,        Copy,          Eq,         PartialEq, Debug,           Hash
)]
#[repr(u8)]
pub enum Opcode {
  #[strum(serialize = "ldc")]   LoadConstant       =  0, // ldc  <dstReg> <value>
  #[strum(serialize = "mov")]   Move               =  1, // mov  <srcReg> <dstReg>
  #[strum(serialize = "add")]   Add                =  2,
  #[strum(serialize = "sto")]   Store              =  3, // sto  <srcReg> <addrReg>
  #[strum(serialize = "rcl")]   Recall             =  4, // rcl  <addrReg> <dstReg>
  #[strum(serialize = "mul")]   Mul                =  5,
  #[strum(serialize = "jmp")]   Jump               =  6, // jmp  <target>
  #[strum(serialize = "cjmp")]  ConditionalJump    =  7,
  #[strum(serialize = "eq")]    Equals             =  8,
  #[strum(serialize = "gt")]    GreaterThan        =  9,
  #[strum(serialize = "gte")]   GreaterThanOrEqual = 10,
  #[strum(serialize = "or")]    Or                 = 11,
  #[strum(serialize = "and")]   And                = 12,
  #[strum(serialize = "xor")]   Xor                = 13,
  #[strum(serialize = "inc")]   Increment          = 14, // inc  <reg>
  #[strum(serialize = "term")]  Terminate          = 15,
  #[strum(serialize = "vjmp")]  VarJump            = 16, // vjmp <reg>
  #[strum(serialize = "cvjmp")] ConditionalVarJump = 17,
  #[strum(serialize = "dec")]   Decrement          = 18,
  #[strum(serialize = "lt")]    LessThan           = 19,
  #[strum(serialize = "lte")]   LessThanOrEqual    = 20,
  #[strum(serialize = "debug_core_state")]   DebugCoreState   = 21,
  #[strum(serialize = "debug_memory_range")] DebugMemoryRange = 22, // debug_memory_range <startReg> <endReg>
}

impl Opcode {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  /// The number of arguments the opcode is defined for.
  pub fn arity(&self) -> usize {
    use Opcode::*;
    match self {
      LoadConstant | Move | Store | Recall | DebugMemoryRange => 2,

      | Jump
      | ConditionalJump
      | VarJump
      | ConditionalVarJump
      | Increment
      | Decrement => 1,

      _ => 0
    }
  }

  /// The encoded width of an instruction with this opcode, in 64-bit words:
  /// one word for the opcode slot plus one per argument. This is both the
  /// number of memory cells the instruction occupies and the amount the
  /// instruction pointer advances past it.
  pub fn qword_size(&self) -> i64 {
    1 + self.arity() as i64
  }
}

/// Error raised when constructing an [`Instruction`] whose argument vector
/// does not match the opcode's arity.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum InstructionError {
  #[error("opcode {opcode:?} is defined for {expected} arguments, {given} given")]
  ArityMismatch {
    opcode: Opcode,
    expected: usize,
    given: usize
  },
}

/// An immutable decoded instruction: an opcode together with exactly
/// `opcode.arity()` signed 64-bit arguments.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Instruction {
  opcode: Opcode,
  args: Vec<i64>,
}

impl Instruction {

  pub fn new(opcode: Opcode, args: Vec<i64>) -> Result<Instruction, InstructionError> {
    if args.len() != opcode.arity() {
      return Err(InstructionError::ArityMismatch {
        opcode,
        expected: opcode.arity(),
        given: args.len()
      });
    }
    Ok(Instruction { opcode, args })
  }

  /// Construction for callers that obtained `args` from the opcode's own
  /// arity, e.g. the binary decoder and the memory fetch path.
  pub(crate) fn from_parts(opcode: Opcode, args: Vec<i64>) -> Instruction {
    debug_assert_eq!(args.len(), opcode.arity());
    Instruction { opcode, args }
  }

  pub fn opcode(&self) -> Opcode {
    self.opcode
  }

  pub fn arg(&self, index: usize) -> i64 {
    self.args[index]
  }

  pub fn args(&self) -> &[i64] {
    &self.args
  }

  pub fn qword_size(&self) -> i64 {
    self.opcode.qword_size()
  }
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.opcode)?;
    for arg in &self.args {
      write!(f, " {}", arg)?;
    }
    Ok(())
  }
}
