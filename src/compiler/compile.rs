/*!
  Line dispatch and argument parsing: the phase-one scan that feeds a
  [`CompilationContext`], and the file-level driver that runs both phases and
  writes the binary.
*/

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::bytecode::{BytecodeWriter, Instruction, Opcode};
use crate::register::Register;
use super::context::{Arg, CompilationContext, DeferredInstruction};
use super::location::Location;
use super::CompileError;

/**
  Boot code compiled ahead of every file compile: points the reserved
  frame-pointer cell (`0xFFFE`) at the root stack frame. Memory is
  zero-initialized, so the root frame's previous-frame, return-offset and
  parameter-count slots are already valid.
*/
pub const RUNTIME_PRELUDE: &str = "\
// establish the root stack frame
ldc #m1 0x8000
ldc #m2 0xFFFE
sto #m1 #m2
";

/**
  Compiles the assembly file at `input` and writes the bytecode binary to
  `output`. The runtime prelude is compiled into the same context first, so
  the stack-frame macros find a live frame pointer at offset 0 of every
  program. On success the program listing is printed.
*/
pub fn compile_file(input: &Path, output: &Path) -> Result<(), CompileError> {
  let mut context = CompilationContext::new();

  compile_lines(
    RUNTIME_PRELUDE.lines(),
    |line| Location::new("<prelude>", line),
    &mut context
  )?;

  let source = fs::read_to_string(input)?;
  let input_name = input.display().to_string();
  compile_lines(
    source.lines(),
    |line| Location::new(input_name.clone(), line),
    &mut context
  )?;

  let instructions = context.resolve()?;

  let file = fs::File::create(output)?;
  let mut writer = BytecodeWriter::new(file);
  writer.write(&instructions)?;

  print_program(&context, &instructions);
  Ok(())
}

/**
  Scans a sequence of source lines into the context: phase one only, nothing
  resolved. `location_of` maps a 1-based line number to its diagnostic
  location, letting callers attribute lines to a file, the prelude, or a
  macro body.
*/
pub fn compile_lines<'a, I, F>(
    lines       : I,
    location_of : F,
    context     : &mut CompilationContext
  ) -> Result<(), CompileError>
  where I: IntoIterator<Item = &'a str>,
        F: Fn(u32) -> Location
{
  let mut line_number: u32 = 1;
  for line in lines {
    compile_line(line, location_of(line_number), context)?;
    line_number += 1;
  }
  Ok(())
}

/// Dispatches one trimmed source line: a label declaration, a primitive
/// instruction, a macro invocation, or nothing (blank / `//` comment).
fn compile_line(
    line     : &str,
    location : Location,
    context  : &mut CompilationContext
  ) -> Result<(), CompileError>
{
  let line = line.trim();

  if let Some(name) = line.strip_prefix(':') {
    return context.declare_label(name, location);
  }

  if line.is_empty() || line.starts_with("//") {
    return Ok(());
  }

  let tokens: Vec<&str> = line.split_whitespace().collect();
  let name = tokens[0];

  if let Ok(opcode) = Opcode::from_str(name) {
    if tokens.len() - 1 != opcode.arity() {
      return Err(CompileError::WrongArgumentCount {
        opcode,
        expected: opcode.arity(),
        given: tokens.len() - 1,
        location
      });
    }

    let args = tokens[1..]
        .iter()
        .map(|token| parse_opcode_argument(token, &location))
        .collect::<Result<Vec<Arg>, CompileError>>()?;

    context.push(DeferredInstruction { opcode, args, location });
    return Ok(());
  }

  if let Some(command) = context.macro_named(name) {
    let statements = command.unroll(&tokens[1..], &location, context)?;

    #[cfg(feature = "trace_compilation")]
    {
      println!("Unrolled macro {} ({:?}):", command.name(), &tokens[1..]);
      println!("{}", statements.join("\n"));
    }

    return compile_macro_expansion(&statements, command.name(), &location, context);
  }

  Err(CompileError::UnknownOpcode {
    name: name.to_string(),
    location
  })
}

/// Recursively compiles a macro's unrolled statements in the same context,
/// attributing each to the macro body and chaining the call site. A macro
/// body may invoke further macros to arbitrary depth.
fn compile_macro_expansion(
    statements   : &[String],
    macro_name   : &'static str,
    include_site : &Location,
    context      : &mut CompilationContext
  ) -> Result<(), CompileError>
{
  let mut line_number: u32 = 1;
  for statement in statements {
    let location = Location::new(format!("<{}>", macro_name), line_number)
                            .included_from(include_site.clone());
    compile_line(statement, location, context)?;
    line_number += 1;
  }
  Ok(())
}

/// Parses one argument token into a deferred argument. Register references
/// resolve to their index immediately; label references stay symbolic.
fn parse_opcode_argument(token: &str, location: &Location) -> Result<Arg, CompileError> {
  if let Some(name) = token.strip_prefix('#') {
    return match Register::from_name(name) {
      Some(register) => Ok(Arg::Value(register.index() as i64)),
      None => Err(CompileError::UnknownRegister {
        name: name.to_string(),
        location: location.clone()
      }),
    };
  }

  if let Some(name) = token.strip_prefix(':') {
    return Ok(Arg::LabelRef {
      name: name.to_string(),
      location: location.clone()
    });
  }

  match parse_literal(token) {
    Some(value) => Ok(Arg::Value(value)),
    None => Err(CompileError::BadLiteral {
      literal: token.to_string(),
      location: location.clone()
    }),
  }
}

/// Parses a hexadecimal (`0x`), binary (`0b`) or decimal literal.
pub(crate) fn parse_literal(token: &str) -> Option<i64> {
  if let Some(digits) = token.strip_prefix("0x") {
    return i64::from_str_radix(digits, 16).ok();
  }
  if let Some(digits) = token.strip_prefix("0b") {
    return i64::from_str_radix(digits, 2).ok();
  }
  token.parse::<i64>().ok()
}

/// Prints the compiled program, one instruction per line with its zero-padded
/// word offset, and a separator line wherever a label points.
pub fn print_program(context: &CompilationContext, instructions: &[Instruction]) {
  let mut offset: i64 = 0;
  for (index, instruction) in instructions.iter().enumerate() {
    if let Some(label) = context.label_at_instruction(index) {
      println!("----- :{}", label.name);
    }
    println!("{:05} {}", offset, instruction);
    offset += instruction.qword_size();
  }
}
