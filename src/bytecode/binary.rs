/*!
  Encoding and decoding of binary instructions, and the streaming reader and
  writer built on top of them.

  The wire layout of one instruction is a single opcode byte followed by
  `arity` big-endian 8-byte argument words. A bytecode file is nothing more
  than a sequence of such instructions: no header, no length prefix, no end
  marker. The only structural errors a stream can exhibit are an opcode byte
  that matches no opcode and a stream that ends in the middle of an
  instruction.
*/
use std::convert::TryFrom;
use std::io::{self, Read, Write};

use thiserror::Error;

use super::{Instruction, Opcode};

/// Errors detected while reading a binary instruction stream. Both structural
/// variants carry the byte offset at which they occurred.
#[derive(Error, Debug)]
pub enum BinaryError {
  #[error("unknown opcode {opcode:#04x} at offset {offset}")]
  UnknownOpcode {
    opcode: u8,
    offset: u64
  },

  #[error("unexpected end of stream at offset {offset}")]
  UnexpectedEof {
    offset: u64
  },

  #[error("i/o error: {0}")]
  Io(#[from] io::Error),
}

/// Encodes the instruction into its wire form.
pub fn encode_instruction(instruction: &Instruction) -> Vec<u8> {
  let mut bytes = Vec::with_capacity(1 + 8 * instruction.opcode().arity());
  bytes.push(instruction.opcode().code());
  for arg in instruction.args() {
    bytes.extend_from_slice(&arg.to_be_bytes());
  }
  bytes
}

/**
  Decodes one instruction from `bytes` starting at `offset`. Returns the
  instruction and the number of bytes consumed. The inverse of
  [`encode_instruction`] for every valid instruction.
*/
pub fn decode_instruction(bytes: &[u8], offset: usize) -> Result<(Instruction, usize), BinaryError> {
  let opcode_byte = *bytes.get(offset)
                          .ok_or(BinaryError::UnexpectedEof { offset: offset as u64 })?;
  let opcode = Opcode::try_from(opcode_byte)
                      .map_err(|_| BinaryError::UnknownOpcode {
                        opcode: opcode_byte,
                        offset: offset as u64
                      })?;

  let mut args = Vec::with_capacity(opcode.arity());
  let mut cursor = offset + 1;
  for _ in 0..opcode.arity() {
    let word = bytes.get(cursor..cursor + 8)
                    .ok_or(BinaryError::UnexpectedEof { offset: bytes.len() as u64 })?;
    let mut buffer = [0u8; 8];
    buffer.copy_from_slice(word);
    args.push(i64::from_be_bytes(buffer));
    cursor += 8;
  }

  Ok((Instruction::from_parts(opcode, args), cursor - offset))
}

/**
  Reads instructions from a binary stream.

  A `BytecodeReader` is a lazy, finite, non-restartable iterator over the
  instructions of the stream. Exhaustion exactly at an instruction boundary
  ends the iteration cleanly; exhaustion after an opcode byte but before all
  of its argument words is an [`BinaryError::UnexpectedEof`]. A running byte
  offset is kept for diagnostics.
*/
pub struct BytecodeReader<R: Read> {
  input: R,
  offset: u64,
}

impl<R: Read> BytecodeReader<R> {

  pub fn new(input: R) -> BytecodeReader<R> {
    BytecodeReader { input, offset: 0 }
  }

  /// The number of bytes consumed so far.
  pub fn offset(&self) -> u64 {
    self.offset
  }

  /// Reads the opcode byte of the next instruction. `Ok(None)` is the clean
  /// end of the stream.
  fn read_opcode_byte(&mut self) -> Result<Option<u8>, BinaryError> {
    let mut buffer = [0u8; 1];
    match self.input.read_exact(&mut buffer) {
      Ok(())                                                    => {
        self.offset += 1;
        Ok(Some(buffer[0]))
      }
      Err(ref e) if e.kind() == io::ErrorKind::UnexpectedEof    => Ok(None),
      Err(e)                                                    => Err(BinaryError::Io(e)),
    }
  }

  /// Reads one big-endian argument word. Running out of bytes here is always
  /// an error, because an opcode byte has already committed us to a full
  /// instruction.
  fn read_argument(&mut self) -> Result<i64, BinaryError> {
    let mut buffer = [0u8; 8];
    match self.input.read_exact(&mut buffer) {
      Ok(()) => {
        self.offset += 8;
        Ok(i64::from_be_bytes(buffer))
      }
      Err(ref e) if e.kind() == io::ErrorKind::UnexpectedEof => {
        Err(BinaryError::UnexpectedEof { offset: self.offset })
      }
      Err(e) => Err(BinaryError::Io(e)),
    }
  }

  fn read_instruction(&mut self) -> Result<Option<Instruction>, BinaryError> {
    let opcode_offset = self.offset;
    let opcode_byte = match self.read_opcode_byte()? {
      Some(byte) => byte,
      None       => return Ok(None),
    };

    let opcode = Opcode::try_from(opcode_byte)
                        .map_err(|_| BinaryError::UnknownOpcode {
                          opcode: opcode_byte,
                          offset: opcode_offset
                        })?;

    let mut args = Vec::with_capacity(opcode.arity());
    for _ in 0..opcode.arity() {
      args.push(self.read_argument()?);
    }

    Ok(Some(Instruction::from_parts(opcode, args)))
  }
}

impl<R: Read> Iterator for BytecodeReader<R> {
  type Item = Result<Instruction, BinaryError>;

  fn next(&mut self) -> Option<Self::Item> {
    self.read_instruction().transpose()
  }
}

/// Writes bytecode to a binary stream. It is the caller's responsibility to
/// manage the lifecycle of the output stream.
pub struct BytecodeWriter<W: Write> {
  out: W,
}

impl<W: Write> BytecodeWriter<W> {

  pub fn new(out: W) -> BytecodeWriter<W> {
    BytecodeWriter { out }
  }

  /// Writes the given instructions to the underlying output stream. Returns
  /// the total number of bytes written.
  pub fn write(&mut self, instructions: &[Instruction]) -> io::Result<usize> {
    let mut written = 0;
    for instruction in instructions {
      let bytes = encode_instruction(instruction);
      self.out.write_all(&bytes)?;
      written += bytes.len();
    }
    Ok(written)
  }
}
