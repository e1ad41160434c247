/*!
  The human readable textual form of a program image. The printer renders
  one annotated line per word: code, address, disassembly, and the names
  bound to that address, and the parser reads the format back, ignoring
  everything but the hex runs outside comments. The pair round-trips: values
  survive, commentary does not influence them. The same format is the
  hand-off artifact toward the hardware tooling, so the 4-hex-digit width is
  fixed.
*/

use std::collections::HashMap;

use nom::{
  branch::alt,
  bytes::complete::{tag, take_till, take_till1, take_until, take_while1},
  combinator::{map, rest},
  sequence::terminated,
  IResult
};
use string_cache::DefaultAtom;

use crate::bytecode::{decode, uc_call, Instr, Word, ADDR_MASK, UC_CONST, UC_LIT};
use crate::wordtable::{WordEntry, WordTable};

/// Encoded word -> every name bound to it, in definition order.
pub type InvertedIndex = HashMap<Word, Vec<DefaultAtom>>;

/// Builds an inverted index mapping each encoded word to its names. This
/// step is necessary for efficient disassembly of a whole image.
pub fn invert_words(words: &WordTable) -> InvertedIndex {
  let mut inverted = InvertedIndex::new();
  for (name, entry) in words.iter() {
    if let WordEntry::Primitive(word) = entry {
      inverted.entry(*word).or_insert_with(Vec::new).push(name.clone());
    }
  }
  inverted
}

/// Disassembles a single machine word against a prebuilt inverted index.
pub fn fast_disasm(code: Word, index: &InvertedIndex) -> String {
  if code == UC_LIT {
    return "(LIT)".to_string();
  }
  if code == UC_CONST {
    return "(CONST)".to_string();
  }
  let mut code = code;
  let mut suffix = "";
  if (code & 0xF000) == 0x5000 {
    code &= ADDR_MASK;
    suffix = " EXIT";
  }
  match decode(code) {

    Instr::Control { push_pc, kind, addr } => {
      let verb = match push_pc {
        true  => "call",
        false => "jump"
      };
      let target = match index.get(&uc_call(addr)) {
        Some(names) => format!("{}", names[0]),
        None        => format!("0x{:03x}", addr)
      };
      format!("{}{}({})", verb, kind.suffix(), target)
    }

    Instr::Eval(_) => {
      match index.get(&code) {
        Some(names) => format!("{}{}", names[0], suffix),
        None        => format!("0x{:04x}", code)
      }
    }

  }
}

/// One-shot disassembly; builds the index on every call.
pub fn disasm(code: Word, words: &WordTable) -> String {
  fast_disasm(code, &invert_words(words))
}

const MEMH_HEADER: &str =
  "/*  CODE    ADR  DISASM                  NAMES                     */";

/**
  Prints the annotated memory image. `mark_address` selects at most one
  address to prefix with `>>> ` (the debugger uses it for the current PC).

  ```text
  /*  CODE    ADR  DISASM                  NAMES                     */
      021f // 0ac: (LIT)                   RX? KEY?
      0002 // 0ad: 0x0002
  >>> 533f // 0ae: IO@ EXIT
  ```
*/
pub fn print_memh(prog: &[Word], words: &WordTable, mark_address: Option<Word>) -> String {
  let index = invert_words(words);
  let mut lines = vec![MEMH_HEADER.to_string()];
  for (address, code) in prog.iter().enumerate() {
    let call = uc_call(address as Word);
    let names = match index.get(&call) {
      Some(names) => {
        names.iter()
             .map(|name| &**name)
             .collect::<Vec<&str>>()
             .join(" ")
      }
      None => String::new()
    };
    let mark = match mark_address == Some(address as Word) {
      true  => ">>> ",
      false => "    "
    };
    let line = format!(
      "{}{:04x} // {:03x}: {:<24}{}",
      mark, code, address, fast_disasm(*code, &index), names
    );
    lines.push(line.trim_end().to_string());
  }
  lines.join("\n") + "\n"
}

// Parsing. The scanner is deliberately permissive: non-hex characters
// outside comments are delimiters, never errors, so hand-edited images
// still load.

fn line_comment(input: &str) -> IResult<&str, ()> {
  let (input, _) = tag("//")(input)?;
  let (input, _) = take_till(|c| c == '\n')(input)?;
  Ok((input, ()))
}

// A block comment scans for the closing delimiter across arbitrary `*`
// runs; an unterminated comment swallows the rest of the input.
fn block_comment(input: &str) -> IResult<&str, ()> {
  let (input, _) = tag("/*")(input)?;
  let (input, _) = alt((terminated(take_until("*/"), tag("*/")), rest))(input)?;
  Ok((input, ()))
}

fn noise(input: &str) -> IResult<&str, ()> {
  alt((
    line_comment,
    block_comment,
    map(take_till1(|c: char| c.is_ascii_hexdigit() || c == '/'), |_| ()),
    // A slash that opens no comment is ordinary noise.
    map(tag("/"), |_| ())
  ))(input)
}

fn hex_run(input: &str) -> IResult<&str, Word> {
  map(
    take_while1(|c: char| c.is_ascii_hexdigit()),
    |digits: &str| {
      let mut num: u32 = 0;
      for c in digits.chars() {
        num = num.wrapping_shl(4) | c.to_digit(16).unwrap();
      }
      (num & 0xFFFF) as Word
    }
  )(input)
}

/// Parses a memory image: one word per maximal hex run outside comments.
/// The inverse of `print_memh` up to commentary.
pub fn parse_memh(text: &str) -> Vec<Word> {
  let mut prog = Vec::new();
  let mut input = text;
  loop {
    while let Ok((remainder, ())) = noise(input) {
      input = remainder;
    }
    match hex_run(input) {
      Ok((remainder, word)) => {
        prog.push(word);
        input = remainder;
      }
      Err(_) => break
    }
  }
  prog
}
