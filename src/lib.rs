/*!

  A register-machine bytecode platform: a fixed-width instruction set over
  signed 64-bit words, a flat memory, an execution core, and a
  macro-expanding assembler with a binary reader/writer for the `.tbc`
  container format.

  The pieces compose in layers. [`bytecode`] defines the instruction set and
  its wire encoding. [`memory`] and [`register`] give the core its state;
  [`vm`] executes. [`compiler`] turns assembly text into instructions,
  unrolling the macro calling convention along the way.

*/

#[macro_use]
extern crate prettytable;
#[macro_use]
extern crate lazy_static;

pub mod bytecode;
pub mod compiler;
pub mod memory;
pub mod register;
pub mod vm;

pub use bytecode::{Instruction, Opcode};
pub use memory::Memory;
pub use register::Register;
pub use vm::{Core, Outcome, RuntimeError};
