/*!
  The register file layout.

  The register set is part of the wire contract: instruction arguments that
  name registers do so by these indices, so the numbering is as immutable as
  the opcode table. There are eight general-purpose memory registers, two
  operator registers that the ALU-style opcodes implicitly read and write, and
  the instruction pointer.
*/

use std::convert::TryFrom;
use std::str::FromStr;

use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The number of registers in the file; register-indexing argument values must
/// lie in `[0, REGISTER_COUNT)`.
pub const REGISTER_COUNT: usize = 11;

/// Register identifiers. The variant names are the assembler names (written
/// `#m1`, `#a1`, `#ip` in source, case-insensitively).
#[derive(
StrumDisplay, IntoStaticStr, EnumString, EnumIter, TryFromPrimitive, IntoPrimitive,
Clone,        Copy,          Eq,         PartialEq, Debug,           Hash
)]
#[repr(u8)]
pub enum Register {
  M1 = 0,
  M2 = 1,
  M3 = 2,
  M4 = 3,
  M5 = 4,
  M6 = 5,
  M7 = 6,
  M8 = 7,
  /// OPERATOR1: left operand and result of the binary ALU opcodes.
  A1 = 8,
  /// OPERATOR2: right operand of the binary ALU opcodes.
  A2 = 9,
  /// The instruction pointer.
  #[strum(serialize = "IP")]
  Ip = 10,
}

impl Register {
  /// Converts the register to an index into the register file.
  pub fn index(&self) -> usize {
    Into::<u8>::into(*self) as usize
  }

  /// Resolves an assembler register name (without the `#` sigil), ignoring
  /// case.
  pub fn from_name(name: &str) -> Option<Register> {
    Register::from_str(&name.to_uppercase()).ok()
  }

  /// Resolves an instruction argument value that is supposed to name a
  /// register. `None` when the value is outside the register file.
  pub fn from_argument(value: i64) -> Option<Register> {
    u8::try_from(value).ok()
                       .and_then(|byte| Register::try_from(byte).ok())
  }
}
