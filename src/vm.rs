/*!
  The execution core: the register file, the semantics of every opcode, and
  the fetch-execute-advance loop that drives a program held in memory.

  A `Core` exclusively owns its `Memory`; one core executes one program on one
  memory at a time, single-threaded. Control transfer is expressed through the
  instruction pointer register: the run loop snapshots the pointer before each
  instruction, and an instruction that leaves it untouched is advanced past by
  its own encoded width, while one that rewrote it (the jump family) has its
  new target bounds-checked instead.
*/

use std::convert::TryFrom;
use std::io::{self, Write};

use prettytable::{format as TableFormat, Table};
use strum::IntoEnumIterator;
use thiserror::Error;

use crate::bytecode::{Instruction, Opcode};
use crate::memory::{Memory, MemoryError};
use crate::register::{Register, REGISTER_COUNT};

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

/// Errors that end a running program. None of these are caught internally;
/// recovery policy belongs to the caller.
#[derive(Error, Debug)]
pub enum RuntimeError {
  #[error("invalid jump offset {target}; cannot jump")]
  InvalidJump {
    target: i64
  },

  #[error("invalid jump offset {target}; cannot jump. Caused by instruction at offset {instruction_offset}")]
  InvalidJumpAt {
    target: i64,
    instruction_offset: i64
  },

  #[error("register index {index} is outside the register file")]
  InvalidRegister {
    index: i64
  },

  #[error("memory cell at offset {offset} does not decode to an instruction (value {value})")]
  DecodeFault {
    offset: i64,
    value: i64
  },

  #[error("instruction pointer ran past the end of memory at offset {offset}")]
  EndOfMemory {
    offset: i64
  },

  #[error(transparent)]
  Memory(#[from] MemoryError),

  #[error("i/o error on the diagnostic sink: {0}")]
  Diagnostics(#[from] io::Error),
}

/// The result of executing a single instruction. `Halted` is the expected,
/// non-error outcome of TERMINATE; it is distinct from every `RuntimeError`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
  Continue,
  Halted,
}

/**
  Writes the instruction to the given memory starting at the given offset,
  one cell for the opcode byte value and one per argument. Returns the offset
  of the first cell past the instruction.
*/
pub fn write_instruction(
    memory      : &mut Memory,
    instruction : &Instruction,
    offset      : i64
  ) -> Result<i64, MemoryError>
{
  memory.set(offset, instruction.opcode().code() as i64)?;
  for (index, arg) in instruction.args().iter().enumerate() {
    memory.set(offset + 1 + index as i64, *arg)?;
  }
  Ok(offset + instruction.qword_size())
}

/// A virtual processing core. `W` is the line-oriented sink the debug opcodes
/// write their register and memory dumps to; it defaults to standard output.
pub struct Core<W: Write = io::Stdout> {
  /// The register values
  registers   : [i64; REGISTER_COUNT],
  memory      : Memory,
  diagnostics : W,
}

impl Core<io::Stdout> {
  pub fn new(memory: Memory) -> Core<io::Stdout> {
    Core::with_diagnostics(memory, io::stdout())
  }
}

impl<W: Write> Core<W> {

  pub fn with_diagnostics(memory: Memory, diagnostics: W) -> Core<W> {
    Core {
      registers: [0; REGISTER_COUNT],
      memory,
      diagnostics,
    }
  }

  // region Register and memory access

  pub fn get(&self, register: Register) -> i64 {
    self.registers[register.index()]
  }

  pub fn set(&mut self, register: Register, value: i64) {
    self.registers[register.index()] = value;
  }

  pub fn memory(&self) -> &Memory {
    &self.memory
  }

  pub fn memory_mut(&mut self) -> &mut Memory {
    &mut self.memory
  }

  pub fn diagnostics(&self) -> &W {
    &self.diagnostics
  }

  fn ip(&self) -> i64 {
    self.registers[Register::Ip.index()]
  }

  fn set_ip(&mut self, value: i64) {
    self.registers[Register::Ip.index()] = value;
  }

  /// Resolves the instruction argument at `index` as a register-file index.
  fn register_arg(&self, instruction: &Instruction, index: usize) -> Result<usize, RuntimeError> {
    let value = instruction.arg(index);
    match Register::from_argument(value) {
      Some(register) => Ok(register.index()),
      None           => Err(RuntimeError::InvalidRegister { index: value }),
    }
  }

  // endregion

  // region Instruction semantics

  /**
    Decodes one instruction and applies its semantics, mutating registers
    and/or memory. The binary ALU opcodes read OPERATOR1 and OPERATOR2 and
    write OPERATOR1; no other register is touched by them. Arithmetic wraps
    in 64 bits.
  */
  pub fn step(&mut self, instruction: &Instruction) -> Result<Outcome, RuntimeError> {
    const A1: usize = Register::A1 as usize;
    const A2: usize = Register::A2 as usize;

    match instruction.opcode() {

      Opcode::LoadConstant => {
        let dst = self.register_arg(instruction, 0)?;
        self.registers[dst] = instruction.arg(1);
      }

      Opcode::Move => {
        let src = self.register_arg(instruction, 0)?;
        let dst = self.register_arg(instruction, 1)?;
        self.registers[dst] = self.registers[src];
      }

      Opcode::Store => {
        let src  = self.register_arg(instruction, 0)?;
        let addr = self.register_arg(instruction, 1)?;
        self.memory.set(self.registers[addr], self.registers[src])?;
      }

      Opcode::Recall => {
        let addr = self.register_arg(instruction, 0)?;
        let dst  = self.register_arg(instruction, 1)?;
        self.registers[dst] = self.memory.get(self.registers[addr])?;
      }

      Opcode::Add => {
        self.registers[A1] = self.registers[A1].wrapping_add(self.registers[A2]);
      }

      Opcode::Mul => {
        self.registers[A1] = self.registers[A1].wrapping_mul(self.registers[A2]);
      }

      Opcode::Increment => {
        let reg = self.register_arg(instruction, 0)?;
        self.registers[reg] = self.registers[reg].wrapping_add(1);
      }

      Opcode::Decrement => {
        let reg = self.register_arg(instruction, 0)?;
        self.registers[reg] = self.registers[reg].wrapping_sub(1);
      }

      Opcode::Equals => {
        self.registers[A1] = (self.registers[A1] == self.registers[A2]) as i64;
      }

      Opcode::GreaterThan => {
        self.registers[A1] = (self.registers[A1] > self.registers[A2]) as i64;
      }

      Opcode::GreaterThanOrEqual => {
        self.registers[A1] = (self.registers[A1] >= self.registers[A2]) as i64;
      }

      Opcode::LessThan => {
        self.registers[A1] = (self.registers[A1] < self.registers[A2]) as i64;
      }

      Opcode::LessThanOrEqual => {
        self.registers[A1] = (self.registers[A1] <= self.registers[A2]) as i64;
      }

      Opcode::Or => {
        self.registers[A1] = self.registers[A1] | self.registers[A2];
      }

      Opcode::And => {
        self.registers[A1] = self.registers[A1] & self.registers[A2];
      }

      Opcode::Xor => {
        self.registers[A1] = self.registers[A1] ^ self.registers[A2];
      }

      Opcode::Jump => {
        self.set_ip(instruction.arg(0));
      }

      Opcode::VarJump => {
        let reg = self.register_arg(instruction, 0)?;
        self.set_ip(self.registers[reg]);
      }

      Opcode::ConditionalJump => {
        if self.registers[A1] == 1 {
          self.set_ip(instruction.arg(0));
        }
      }

      Opcode::ConditionalVarJump => {
        if self.registers[A1] == 1 {
          let reg = self.register_arg(instruction, 0)?;
          self.set_ip(self.registers[reg]);
        }
      }

      Opcode::DebugCoreState => {
        self.dump_core_state()?;
      }

      Opcode::DebugMemoryRange => {
        let start = self.register_arg(instruction, 0)?;
        let end   = self.register_arg(instruction, 1)?;
        self.dump_memory_range(self.registers[start], self.registers[end])?;
      }

      Opcode::Terminate => {
        return Ok(Outcome::Halted);
      }

    }

    Ok(Outcome::Continue)
  }

  // endregion

  // region The fetch-execute-advance loop

  /// Reads one instruction out of memory at the given word offset. A cell
  /// that does not hold a valid opcode byte is a `DecodeFault`, distinct from
  /// the structural errors of the binary stream reader: this one happens
  /// mid-execution.
  fn fetch(&self, offset: i64) -> Result<Instruction, RuntimeError> {
    let cell = self.memory.get(offset)?;
    let opcode = u8::try_from(cell).ok()
                                   .and_then(|byte| Opcode::try_from(byte).ok())
                                   .ok_or(RuntimeError::DecodeFault { offset, value: cell })?;

    let mut args = Vec::with_capacity(opcode.arity());
    for index in 0..opcode.arity() {
      args.push(self.memory.get(offset + 1 + index as i64)?);
    }

    Ok(Instruction::from_parts(opcode, args))
  }

  /**
    Executes the program in memory starting at `start_offset` until it
    terminates or faults. The loop fetches at the instruction pointer,
    executes, and then either advances the pointer by the executed
    instruction's encoded width (when the instruction left it alone) or
    validates the target the instruction installed. Returns `Ok(())` only on
    a TERMINATE halt.
  */
  pub fn run(&mut self, start_offset: i64) -> Result<(), RuntimeError> {
    if start_offset < 0 || start_offset as usize >= self.memory.size() {
      return Err(RuntimeError::InvalidJump { target: start_offset });
    }
    self.set_ip(start_offset);

    loop {
      let current = self.ip();
      let instruction = self.fetch(current)?;

      if let Outcome::Halted = self.step(&instruction)? {
        return Ok(());
      }

      let after = self.ip();
      if after == current {
        // Not a control transfer; advance past the executed instruction.
        let next = current + instruction.qword_size();
        if next as usize >= self.memory.size() {
          return Err(RuntimeError::EndOfMemory { offset: next });
        }
        self.set_ip(next);
      } else if after < 0 || after as usize >= self.memory.size() {
        return Err(RuntimeError::InvalidJumpAt {
          target: after,
          instruction_offset: current
        });
      }
    }
  }

  // endregion

  // region Diagnostic dumps

  /// Emits a register-name/value table to the diagnostic sink.
  pub fn dump_core_state(&mut self) -> io::Result<()> {
    let mut table = Table::new();
    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Register", ubl->"Value"]);

    for register in Register::iter() {
      table.add_row(
        row![r->format!("{} =", register), format!("{}", self.registers[register.index()])]
      );
    }

    table.print(&mut self.diagnostics)?;
    Ok(())
  }

  /// Emits an address/value table for the inclusive cell range
  /// `[start, end]`.
  pub fn dump_memory_range(&mut self, start: i64, end: i64) -> Result<(), RuntimeError> {
    let mut table = Table::new();
    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Address", ubl->"Contents"]);

    let mut address = start;
    while address <= end {
      let value = self.memory.get(address)?;
      table.add_row(row![r->format!("[{}] =", address), format!("{}", value)]);
      address += 1;
    }

    table.print(&mut self.diagnostics)?;
    Ok(())
  }

  // endregion

}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;

  fn instruction(opcode: Opcode, args: Vec<i64>) -> Instruction {
    Instruction::new(opcode, args).unwrap()
  }

  fn core_with_size(size: usize) -> Core<Vec<u8>> {
    Core::with_diagnostics(Memory::with_size(size), Vec::new())
  }

  #[test]
  fn load_constant_reaches_every_register() {
    // Constants are loadable into all registers, the instruction pointer
    // included.
    let mut core = core_with_size(16);
    for register in Register::iter() {
      let constant = 100 + register.index() as i64;
      let outcome = core.step(
        &instruction(Opcode::LoadConstant, vec![register.index() as i64, constant])
      ).unwrap();
      assert_eq!(outcome, Outcome::Continue);
      assert_eq!(core.get(register), constant);
    }
  }

  #[test]
  fn move_copies_between_registers() {
    let mut core = core_with_size(16);
    core.set(Register::M3, 77);
    core.step(&instruction(Opcode::Move, vec![2, 5])).unwrap();
    assert_eq!(core.get(Register::M6), 77);
    assert_eq!(core.get(Register::M3), 77);
  }

  #[test]
  fn store_and_recall_go_through_memory() {
    let mut core = core_with_size(32);
    core.set(Register::M1, -9);     // value
    core.set(Register::M2, 20);     // address
    core.step(&instruction(Opcode::Store, vec![0, 1])).unwrap();
    assert_eq!(core.memory().get(20), Ok(-9));

    core.step(&instruction(Opcode::Recall, vec![1, 4])).unwrap();
    assert_eq!(core.get(Register::M5), -9);
  }

  #[test]
  fn store_out_of_bounds_is_a_memory_error() {
    let mut core = core_with_size(8);
    core.set(Register::M2, 8);
    let result = core.step(&instruction(Opcode::Store, vec![0, 1]));
    assert!(matches!(result, Err(RuntimeError::Memory(_))));
  }

  #[test]
  fn alu_ops_touch_only_operator1() {
    let cases: Vec<(Opcode, i64, i64, i64)> = vec![
      (Opcode::Add,                 7,  8, 15),
      (Opcode::Mul,                 6,  7, 42),
      (Opcode::Equals,              5,  5,  1),
      (Opcode::Equals,              5,  6,  0),
      (Opcode::GreaterThan,         6,  5,  1),
      (Opcode::GreaterThanOrEqual,  5,  5,  1),
      (Opcode::LessThan,            5,  6,  1),
      (Opcode::LessThanOrEqual,     7,  6,  0),
      (Opcode::Or,                  0b1010, 0b0110, 0b1110),
      (Opcode::And,                 0b1010, 0b0110, 0b0010),
      (Opcode::Xor,                 0b1010, 0b0110, 0b1100),
    ];

    for (opcode, left, right, expected) in cases {
      let mut core = core_with_size(16);
      for register in Register::iter() {
        core.set(register, 1000 + register.index() as i64);
      }
      core.set(Register::A1, left);
      core.set(Register::A2, right);

      core.step(&instruction(opcode, vec![])).unwrap();

      assert_eq!(core.get(Register::A1), expected, "{:?}", opcode);
      assert_eq!(core.get(Register::A2), right, "{:?} clobbered OPERATOR2", opcode);
      for register in Register::iter() {
        if register != Register::A1 && register != Register::A2 {
          assert_eq!(
            core.get(register),
            1000 + register.index() as i64,
            "{:?} clobbered {}", opcode, register
          );
        }
      }
    }
  }

  #[test]
  fn increment_and_decrement_wrap() {
    let mut core = core_with_size(16);
    core.set(Register::M1, i64::max_value());
    core.step(&instruction(Opcode::Increment, vec![0])).unwrap();
    assert_eq!(core.get(Register::M1), i64::min_value());

    core.step(&instruction(Opcode::Decrement, vec![0])).unwrap();
    assert_eq!(core.get(Register::M1), i64::max_value());
  }

  #[test]
  fn jump_rewrites_the_instruction_pointer() {
    let mut core = core_with_size(64);
    core.step(&instruction(Opcode::Jump, vec![40])).unwrap();
    assert_eq!(core.get(Register::Ip), 40);
  }

  #[test]
  fn conditional_jump_requires_operator1_exactly_one() {
    let mut core = core_with_size(64);
    core.set(Register::A1, 2);
    core.step(&instruction(Opcode::ConditionalJump, vec![40])).unwrap();
    assert_eq!(core.get(Register::Ip), 0);

    core.set(Register::A1, 1);
    core.step(&instruction(Opcode::ConditionalJump, vec![40])).unwrap();
    assert_eq!(core.get(Register::Ip), 40);
  }

  #[test]
  fn varjump_reads_the_named_register() {
    let mut core = core_with_size(64);
    core.set(Register::M4, 24);
    core.step(&instruction(Opcode::VarJump, vec![3])).unwrap();
    assert_eq!(core.get(Register::Ip), 24);
  }

  #[test]
  fn terminate_halts() {
    let mut core = core_with_size(16);
    let outcome = core.step(&instruction(Opcode::Terminate, vec![])).unwrap();
    assert_eq!(outcome, Outcome::Halted);
  }

  #[test]
  fn register_arguments_are_bounds_checked() {
    let mut core = core_with_size(16);
    let result = core.step(&instruction(Opcode::Increment, vec![11]));
    assert!(matches!(result, Err(RuntimeError::InvalidRegister { index: 11 })));
  }

  #[test]
  fn run_executes_a_loaded_program() {
    let mut core = core_with_size(64);
    let program = vec![
      instruction(Opcode::LoadConstant, vec![8, 7]),  // a1 = 7
      instruction(Opcode::LoadConstant, vec![9, 8]),  // a2 = 8
      instruction(Opcode::Add, vec![]),
      instruction(Opcode::Terminate, vec![]),
    ];
    let mut offset = 0;
    for i in &program {
      offset = write_instruction(core.memory_mut(), i, offset).unwrap();
    }

    core.run(0).unwrap();
    assert_eq!(core.get(Register::A1), 15);
  }

  #[test]
  fn run_follows_jumps_not_fallthrough() {
    let mut core = core_with_size(64);
    // Layout: jmp at 0, two skipped ldc at 2 and 5, term at 8.
    let program = vec![
      instruction(Opcode::Jump, vec![8]),                  // width 2, at 0
      instruction(Opcode::LoadConstant, vec![0, 111]),     // width 3, at 2 (skipped)
      instruction(Opcode::LoadConstant, vec![1, 222]),     // width 3, at 5 (skipped)
      instruction(Opcode::Terminate, vec![]),              // width 1, at 8
    ];
    let mut offset = 0;
    for i in &program {
      offset = write_instruction(core.memory_mut(), i, offset).unwrap();
    }

    core.run(0).unwrap();
    assert_eq!(core.get(Register::M1), 0);
    assert_eq!(core.get(Register::M2), 0);
  }

  #[test]
  fn run_rejects_invalid_start_offset() {
    let mut core = core_with_size(16);
    let result = core.run(16);
    assert!(matches!(result, Err(RuntimeError::InvalidJump { target: 16 })));
  }

  #[test]
  fn run_reports_invalid_jump_target_and_culprit() {
    let mut core = core_with_size(16);
    write_instruction(core.memory_mut(), &instruction(Opcode::Jump, vec![99]), 0).unwrap();
    let result = core.run(0);
    assert!(matches!(
      result,
      Err(RuntimeError::InvalidJumpAt { target: 99, instruction_offset: 0 })
    ));
  }

  #[test]
  fn run_faults_at_the_end_of_memory() {
    let mut core = core_with_size(4);
    // A single `add` at offset 3: the advanced pointer lands at 4 == size.
    write_instruction(core.memory_mut(), &instruction(Opcode::Add, vec![]), 3).unwrap();
    let result = core.run(3);
    assert!(matches!(result, Err(RuntimeError::EndOfMemory { offset: 4 })));
  }

  #[test]
  fn run_faults_on_garbage_cells() {
    let mut core = core_with_size(16);
    core.memory_mut().set(0, 99).unwrap();
    let result = core.run(0);
    assert!(matches!(
      result,
      Err(RuntimeError::DecodeFault { offset: 0, value: 99 })
    ));
  }

  #[test]
  fn debug_core_state_names_registers_and_values() {
    let mut core = core_with_size(16);
    core.set(Register::M5, 123456);
    core.step(&instruction(Opcode::DebugCoreState, vec![])).unwrap();

    let output = String::from_utf8(core.diagnostics().clone()).unwrap();
    assert!(output.contains("M5"));
    assert!(output.contains("123456"));
  }

  #[test]
  fn debug_memory_range_is_inclusive() {
    let mut core = core_with_size(32);
    core.memory_mut().set(10, 42).unwrap();
    core.memory_mut().set(12, 43).unwrap();
    core.set(Register::M1, 10);
    core.set(Register::M2, 12);
    core.step(&instruction(Opcode::DebugMemoryRange, vec![0, 1])).unwrap();

    let output = String::from_utf8(core.diagnostics().clone()).unwrap();
    assert!(output.contains("[10]"));
    assert!(output.contains("[12]"));
    assert!(output.contains("42"));
    assert!(output.contains("43"));
  }
}
