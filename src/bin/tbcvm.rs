/*!
  The bytecode interpreter: loads a `.tbc` binary into memory at offset 0 and
  runs it. The final register state is dumped whether the program halts
  cleanly or faults.
*/

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process;

use clap::Parser;

use tbc::bytecode::BytecodeReader;
use tbc::memory::Memory;
use tbc::vm::{write_instruction, Core};

#[derive(Parser)]
#[command(name = "tbcvm", about = "Runs a .tbc bytecode binary")]
struct Cli {
  /// The bytecode binary to execute
  program: PathBuf,
}

fn main() {
  let cli = Cli::parse();

  let file = match File::open(&cli.program) {
    Ok(file) => file,
    Err(error) => {
      eprintln!("{}: {}", cli.program.display(), error);
      process::exit(1);
    }
  };

  let mut memory = Memory::new();
  let mut offset: i64 = 0;
  for instruction in BytecodeReader::new(BufReader::new(file)) {
    let instruction = match instruction {
      Ok(instruction) => instruction,
      Err(error) => {
        eprintln!("malformed bytecode: {}", error);
        process::exit(1);
      }
    };
    offset = match write_instruction(&mut memory, &instruction, offset) {
      Ok(next) => next,
      Err(error) => {
        eprintln!("program too large: {}", error);
        process::exit(1);
      }
    };
  }

  let mut core = Core::new(memory);
  let result = core.run(0);

  match &result {
    Ok(()) => println!("Code terminated"),
    Err(error) => eprintln!("runtime fault: {}", error),
  }

  if core.dump_core_state().is_err() || result.is_err() {
    process::exit(1);
  }
}
