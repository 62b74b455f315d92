/*!
  Whole-pipeline tests: assembly text through the compiler, out over the wire
  format, back in through the reader, into memory, and executed on a core.
*/

use tbc::bytecode::{BytecodeReader, BytecodeWriter, Instruction};
use tbc::compiler::{compile_lines, CompilationContext, Location, RUNTIME_PRELUDE};
use tbc::memory::Memory;
use tbc::register::Register;
use tbc::vm::{write_instruction, Core};

/// Compiles source (optionally after the runtime prelude), round-trips the
/// program through the binary format, and loads it into a fresh memory at
/// offset 0.
fn assemble(source: &str, with_prelude: bool) -> Memory {
  let mut context = CompilationContext::new();
  if with_prelude {
    compile_lines(
      RUNTIME_PRELUDE.lines(),
      |line| Location::new("<prelude>", line),
      &mut context
    ).unwrap();
  }
  compile_lines(source.lines(), |line| Location::new("test.asm", line), &mut context).unwrap();
  let instructions = context.resolve().unwrap();

  let mut binary = Vec::new();
  BytecodeWriter::new(&mut binary).write(&instructions).unwrap();

  let decoded: Vec<Instruction> =
      BytecodeReader::new(binary.as_slice()).collect::<Result<_, _>>().unwrap();
  assert_eq!(decoded, instructions);

  let mut memory = Memory::new();
  let mut offset = 0;
  for instruction in &decoded {
    offset = write_instruction(&mut memory, instruction, offset).unwrap();
  }
  memory
}

fn run(source: &str, with_prelude: bool) -> Core<Vec<u8>> {
  let memory = assemble(source, with_prelude);
  let mut core = Core::with_diagnostics(memory, Vec::new());
  core.run(0).unwrap();
  core
}

#[test]
fn arithmetic_program_runs_to_completion() {
  let core = run(
    "ldc #m1 7\n\
     ldc #m2 8\n\
     mov #m1 #a1\n\
     mov #m2 #a2\n\
     add\n\
     term",
    false
  );
  assert_eq!(core.get(Register::A1), 15);
}

#[test]
fn conditional_jump_takes_the_equal_branch() {
  let core = run(
    "ldc #a1 5\n\
     ldc #a2 5\n\
     eq\n\
     cjmp :equal\n\
     ldc #m1 0\n\
     term\n\
     :equal\n\
     ldc #m1 1\n\
     term",
    false
  );
  assert_eq!(core.get(Register::M1), 1);
}

#[test]
fn invoke_and_return_thread_a_value_through_a_stackframe() {
  // The callee reads its single parameter, increments it and returns it; the
  // caller finds the result in #a2.
  let core = run(
    "enlarge-current-stackframe 1\n\
     store-in-stack 21 0\n\
     invoke :increment 0\n\
     mov #a2 #m7\n\
     term\n\
     :increment\n\
     recall-from-stack 0 #m1\n\
     inc #m1\n\
     return #m1",
    true
  );
  assert_eq!(core.get(Register::M7), 22);
}

#[test]
fn nested_invocations_restore_the_caller_frame() {
  // outer calls inner; inner's return must not disturb outer's ability to
  // return its own value.
  let core = run(
    "invoke :outer\n\
     mov #a2 #m6\n\
     term\n\
     :outer\n\
     invoke :inner\n\
     mov #a2 #m5\n\
     inc #m5\n\
     return #m5\n\
     :inner\n\
     ldc #m4 40\n\
     return #m4",
    true
  );
  assert_eq!(core.get(Register::M6), 41);
}

#[test]
fn store_all_registers_persists_the_register_block() {
  let source: String = (1..=8)
      .map(|r| format!("ldc #m{} {}\n", r, r * 10))
      .chain(std::iter::once("store-all-registers 200\nterm".to_string()))
      .collect();
  let core = run(&source, false);
  for r in 1..=8 {
    assert_eq!(core.memory().get(200 + (r - 1)).unwrap(), r * 10);
  }
}

#[test]
fn recall_all_registers_restores_the_register_block() {
  let core = run(
    "ldc #m1 300\n\
     ldc #m2 7\n\
     sto #m2 #m1\n\
     recall-all-registers 300\n\
     term",
    false
  );
  // Cell 300 was seeded with 7; the cells after it are still zero.
  assert_eq!(core.get(Register::M1), 7);
  assert_eq!(core.get(Register::M2), 0);
}
