/*!

  The VM uses a 64 bit word size. An instruction is one opcode byte followed by
  `arity` big-endian 8-byte argument words; arities are 0, 1, or 2, so encoded
  instructions are 1, 9, or 17 bytes on the wire. A bytecode file is a bare
  sequence of instructions with no header and no end marker.

  In memory the layout is wider: an instruction loaded for execution occupies
  `1 + arity` consecutive 64-bit cells, the opcode byte value in the first cell
  and one argument per following cell. The instruction pointer advances in
  these word units, and label offsets computed by the compiler count them too,
  so a compiled jump target is valid for the memory image, not for the file.

  One design decision that needed to be made is whether to make `Instruction`
  an enum with one variant per opcode. With at most two homogeneous `i64`
  arguments per opcode there is nothing for per-variant payload types to buy
  us, and the execution core wants uniform indexed access to arguments. An
  enum is only used for the opcode itself, which inhabits a single byte; the
  instruction is an opcode paired with its argument vector, validated against
  the opcode's arity at construction.

*/

mod binary;
mod instruction;

pub use binary::{decode_instruction, encode_instruction, BinaryError, BytecodeReader,
                 BytecodeWriter};
pub use instruction::{Instruction, InstructionError, Opcode};
