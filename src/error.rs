/*!
  Error taxonomy for the toolchain.

  Compile errors carry the source label, the position (in UTF-16 code
  units), and the line where compilation stopped, and render in the
  `<source>:<line> <message>` form the command-line tools print. Machine
  faults are returned from `Machine::step()` as values so the faulted state
  remains inspectable by the caller.
*/

use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::bytecode::{Word, IMAGE_CAPACITY};

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum CompileErrorKind {
  #[error("unknown word: {0}")]
  UnknownWord(String),
  #[error("redefined word: {0}")]
  RedefinedWord(String),
  #[error("invalid data allocation")]
  InvalidAllocation,
  #[error("invalid constant: {0}")]
  InvalidConstant(String),
  #[error("missing name after {0}")]
  MissingName(&'static str),
  #[error("EXIT from counted-loop at depth {0}")]
  ExitFromCountedLoop(usize),
  #[error("no `I` at control depth {0}")]
  NoLoopIndex(usize),
  #[error("unclosed control context at end of input (depth {0})")]
  UnclosedControl(usize),
  #[error("no open control context for {0}")]
  NoOpenControl(&'static str),
  #[error("malformed control structure at {0}")]
  MalformedControl(&'static str),
  #[error("program image exceeds {} words", IMAGE_CAPACITY)]
  ImageOverflow,
}

/// A positioned compile diagnostic. The `Display` form is the one the CLI
/// prints to standard error, one diagnostic per line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompileError {
  pub src  :  String,
  pub pos  :  usize,
  pub line :  usize,
  pub kind :  CompileErrorKind
}

impl Display for CompileError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}:{} {}", self.src, self.line, self.kind)
  }
}

impl std::error::Error for CompileError {}

/// Which of the two machine stacks faulted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StackKind {
  Data,
  Return
}

impl Display for StackKind {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      StackKind::Data   => write!(f, "data"),
      StackKind::Return => write!(f, "return")
    }
  }
}

/// A fatal condition raised by `Machine::step()`. The machine is left
/// exactly as it was when the fault was detected.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum MachineFault {
  #[error("program address out of range: 0x{0:03x}")]
  PcOutOfRange(Word),
  #[error("unknown device: {0}")]
  UnknownDevice(u8),
  #[error("{0} stack overflow")]
  StackOverflow(StackKind),
  #[error("{0} stack underflow")]
  StackUnderflow(StackKind),
  #[error("FAIL signalled")]
  Failure,
}
