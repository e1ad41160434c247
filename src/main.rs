//! uCode toolchain driver.
//!
//! uCode Forth source is accepted on standard input (or from a file) and the
//! annotated Verilog memory image is produced on standard output:
//!
//!     ucode <ucode.f >ucode_rom.mem
//!
//! With `--run` the program is simulated instead, with a console UART bound
//! to device 0. A `.mem` input is parsed as an existing memory image rather
//! than compiled.

#![allow(dead_code)]
// ToDo: Remove the above `allow` attribute.

#[macro_use]
extern crate prettytable;
#[macro_use]
extern crate lazy_static;

mod bytecode;
mod chariter;
mod compiler;
mod device;
mod error;
mod machine;
mod quad;
mod stack;
mod wordtable;

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::exit;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::bytecode::{parse_memh, print_memh, Word};
use crate::compiler::compile;
use crate::device::Uart;
use crate::machine::Machine;
use crate::wordtable::WordTable;

#[derive(Parser)]
#[command(name = "ucode", version, about = "uCode compiler and machine simulator")]
struct Args {
  /// Source file; `-` or absent reads standard input. A `.mem` file is
  /// loaded as a memory image instead of compiled.
  input: Option<PathBuf>,

  /// Simulate the program instead of printing the memory image
  #[arg(long)]
  run: bool,

  /// Maximum number of instructions to simulate
  #[arg(long, default_value_t = 1_000_000)]
  steps: usize
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(io::stderr)
    .init();
  exit(toolchain(Args::parse()));
}

fn toolchain(args: Args) -> i32 {
  let from_stdin = match &args.input {
    Some(path) => path.as_os_str() == "-",
    None       => true
  };
  let label = match (&args.input, from_stdin) {
    (Some(path), false) => path.display().to_string(),
    _                   => "<stdin>".to_string()
  };
  let text = match read_input(&args.input, from_stdin) {
    Ok(text) => text,
    Err(err) => {
      eprintln!("{}: {}", label, err);
      return 1;
    }
  };

  // A `.mem` image skips compilation; anything else is uCode source.
  let (prog, words) = match label.ends_with(".mem") {

    true => (parse_memh(&text), WordTable::standard()),

    false => {
      match compile(&text, &label) {
        Ok(compilation) => (compilation.prog, compilation.words),
        Err(errors) => {
          for err in &errors {
            eprintln!("{}", err);
          }
          return 1;
        }
      }
    }

  };

  match args.run {
    true  => simulate(prog, &words, args.steps, from_stdin),
    false => {
      print!("{}", print_memh(&prog, &words, None));
      0
    }
  }
}

fn read_input(input: &Option<PathBuf>, from_stdin: bool) -> io::Result<String> {
  match (input, from_stdin) {
    (Some(path), false) => fs::read_to_string(path),
    _ => {
      let mut text = String::new();
      io::stdin().read_to_string(&mut text)?;
      Ok(text)
    }
  }
}

fn simulate(prog: Vec<Word>, words: &WordTable, steps: usize, source_was_stdin: bool) -> i32 {
  // When the program came from a file, whatever is on standard input feeds
  // the UART receive queue.
  let uart_input = match source_was_stdin {
    true  => Vec::new(),
    false => {
      let mut bytes = Vec::new();
      let _ = io::stdin().read_to_end(&mut bytes);
      bytes
    }
  };
  let mut machine = Machine::new(prog);
  machine.install_device(Box::new(Uart::new(uart_input, io::stdout())));
  match machine.run(steps) {
    Ok(()) => 0,
    Err(fault) => {
      eprintln!("{}", fault);
      eprintln!("{}", machine);
      eprintln!("{}", print_memh(machine.prog(), words, Some(machine.pc())));
      1
    }
  }
}
