/*!
  The bytecode compiler: assembles a source file into a `.tbc` binary next to
  it and prints the program listing.
*/

use std::path::PathBuf;
use std::process;

use clap::Parser;

use tbc::compiler::compile_file;

#[derive(Parser)]
#[command(name = "tbcc", about = "Compiles assembly source to a .tbc bytecode binary")]
struct Cli {
  /// The assembly source file to compile
  input: PathBuf,
}

fn main() {
  let cli = Cli::parse();

  if !cli.input.is_file() {
    eprintln!("{}: no such file", cli.input.display());
    process::exit(1);
  }

  let mut output = cli.input.clone().into_os_string();
  output.push(".tbc");
  let output = PathBuf::from(output);

  if let Err(error) = compile_file(&cli.input, &output) {
    eprintln!("compile error: {}", error);
    process::exit(1);
  }

  println!("wrote {}", output.display());
}
