/*!
  The uCode compiler: a token-at-a-time driver over the word table.

  All compiler state lives in one `Compiler` value threaded through the
  keyword procedures: the growing program image, the control-flow context
  stack of placeholder words awaiting a patch, and the tail context
  classifying the most recent emission (which drives the `;` fusion rules
  and validates `CONSTANT`/`,`).

  The image always begins with a jump at address 0 whose target is rewritten
  by every `:` definition, so the last word defined becomes the entry point
  and a top-level `BOOT` word is reachable from address 0 regardless of
  definition order.
*/

use tracing::{debug, trace};

use crate::bytecode::{
  uc_call, uc_fixup, uc_is_auto, uc_jnz_dec, uc_jnz_inc, uc_jump, uc_jz,
  Word, ADDR_MASK, IMAGE_CAPACITY, UC_CONST, UC_EXIT, UC_LIT, UC_R_FETCH, UC_TO_R
};
use crate::chariter::CharIter;
use crate::error::{CompileError, CompileErrorKind};
use crate::wordtable::{Keyword, WordEntry, WordTable};

/// Classification of the most recently emitted instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum TailContext {
  None,
  /// A zero-operand evaluation primitive; `;` can fuse an EXIT into it.
  Eval,
  /// A procedure call; `;` demotes it to a plain jump (proper tail call).
  Call,
  /// A pending `(LIT)` literal; `CONSTANT` and `,` require this.
  Data,
}

/// A successful compilation: the program image and the word table grown by
/// the source's definitions.
pub struct Compilation {
  pub prog  :  Vec<Word>,
  pub words :  WordTable
}

pub struct Compiler<'d> {
  stream   :  CharIter<'d>,
  src      :  String,
  prog     :  Vec<Word>,
  words    :  WordTable,
  ctrl_ctx :  Vec<Word>,
  tail_ctx :  TailContext
}

/**
  Compiles uCode source to a program image. `src` labels diagnostics.

  Either the whole source compiles with no errors, or the (possibly
  partially patched) image is withheld: a failed compilation never yields a
  runnable image.
*/
pub fn compile(text: &str, src: &str) -> Result<Compilation, Vec<CompileError>> {
  let mut compiler = Compiler::new(text, src);
  match compiler.compile_driver() {
    Ok(())   => Ok(Compilation { prog: compiler.prog, words: compiler.words }),
    Err(err) => Err(vec![err])
  }
}

impl<'d> Compiler<'d> {

  pub fn new(text: &'d str, src: &str) -> Self {
    Compiler {
      stream   : CharIter::new(text),
      src      : src.to_string(),
      prog     : vec![uc_jump(0)],
      words    : WordTable::standard(),
      ctrl_ctx : Vec::new(),
      tail_ctx : TailContext::None
    }
  }

  // region Driver

  fn compile_driver(&mut self) -> Result<(), CompileError> {
    while let Some(token) = self.stream.next_token() {
      self.compile_word(&token)?;
    }
    match self.ctrl_ctx.is_empty() {
      true  => Ok(()),
      false => Err(self.error(CompileErrorKind::UnclosedControl(self.ctrl_ctx.len())))
    }
  }

  fn compile_word(&mut self, token: &str) -> Result<(), CompileError> {
    trace!("compile_word: {}", token);
    if token == "(" {
      self.skip_comment();
      return Ok(());
    }
    match self.words.lookup(token) {

      Some(WordEntry::Primitive(word)) => {
        // Compile a primitive or a call.
        self.emit(word)?;
        self.tail_ctx = match word & 0xF000 {
          0xC000 => TailContext::Call,
          0x0000 => TailContext::Eval,
          _      => TailContext::None
        };
        Ok(())
      }

      Some(WordEntry::Keyword(keyword)) => {
        // Invoke the compile-time procedure. `;`, `,`, and `CONSTANT` read
        // the prior tail context themselves before this reset lands.
        self.keyword(keyword)?;
        self.tail_ctx = TailContext::None;
        Ok(())
      }

      None => {
        match parse_number(token) {
          Some(num) => {
            // Compile a number literal, truncated to 16 bits.
            self.emit(UC_LIT)?;
            self.emit((num & 0xFFFF) as Word)?;
            self.tail_ctx = TailContext::Data;
            Ok(())
          }
          None => Err(self.error(CompileErrorKind::UnknownWord(token.to_string())))
        }
      }

    } // end match lookup
  }

  /// Comments nest: every `(` token opens another level, `)` closes one.
  /// An unterminated comment simply exhausts the stream.
  fn skip_comment(&mut self) {
    let mut depth = 1;
    while depth > 0 {
      match self.stream.next_token() {
        Some(token) => {
          trace!("compile_comment: {}", token);
          if token == "(" {
            depth += 1;
          } else if token == ")" {
            depth -= 1;
          }
        }
        None => break
      }
    }
  }

  // endregion

  // region Compile-time procedures

  fn keyword(&mut self, keyword: Keyword) -> Result<(), CompileError> {
    match keyword {
      Keyword::Colon         => self.compile_name(),
      Keyword::Comma         => self.compile_allocation(),
      Keyword::Constant      => self.compile_constant(),
      Keyword::Variable      => self.compile_variable(),
      Keyword::SkipIfZero    => self.compile_skip(),
      Keyword::Begin         => self.compile_begin(),
      Keyword::Until         => self.compile_until(),
      Keyword::While         => self.compile_while(),
      Keyword::Repeat        => self.compile_repeat(),
      Keyword::CountdownLoop => self.compile_counted_loop(uc_jnz_dec),
      Keyword::CountupLoop   => self.compile_counted_loop(uc_jnz_inc),
      Keyword::LoopIndex     => self.compile_loop_index(),
      Keyword::Again         => self.compile_again(),
      Keyword::If            => self.compile_if(),
      Keyword::Else          => self.compile_else(),
      Keyword::Then          => self.compile_then(),
      Keyword::Semicolon     => self.compile_exit(),
    }
  }

  /// `:` opens a new entry-point and rewrites the bootstrap jump at
  /// address 0.
  fn compile_name(&mut self) -> Result<(), CompileError> {
    let word = uc_call(self.here());
    let name = match self.stream.next_token() {
      Some(name) => name,
      None       => return Err(self.error(CompileErrorKind::MissingName(":")))
    };
    debug!("compile_name: {} = 0x{:04x}", name, word);
    self.define(&name, word)?;
    self.prog[0] = word; // update bootstrap entry-point
    Ok(())
  }

  /// `,`: allocate raw data by collapsing the pending `(LIT) n` pair into
  /// a single bare `n` slot.
  fn compile_allocation(&mut self) -> Result<(), CompileError> {
    if self.tail_ctx != TailContext::Data {
      return Err(self.error(CompileErrorKind::InvalidAllocation));
    }
    let addr = self.prog.len() - 2;
    self.prog[addr] = self.prog[addr + 1]; // copy data over (LIT)
    self.prog.pop(); // deallocate the duplicated data slot
    self.tail_ctx = TailContext::None;
    Ok(())
  }

  /// `CONSTANT`: rewrite the pending `(LIT)` opcode slot to `(CONST)` in
  /// place and name its address.
  fn compile_constant(&mut self) -> Result<(), CompileError> {
    let name = match self.stream.next_token() {
      Some(name) => name,
      None       => return Err(self.error(CompileErrorKind::MissingName("CONSTANT")))
    };
    if self.words.is_bound(&name) {
      return Err(self.error(CompileErrorKind::RedefinedWord(name)));
    }
    if self.tail_ctx != TailContext::Data {
      return Err(self.error(CompileErrorKind::InvalidConstant(name)));
    }
    let addr = self.prog.len() - 2;
    let word = uc_call(addr as Word);
    debug!("compile_const: {} = 0x{:04x}", name, word);
    self.prog[addr] = UC_CONST; // convert (LIT) to (CONST)
    self.define(&name, word)?;
    self.tail_ctx = TailContext::None;
    Ok(())
  }

  /// `VARIABLE`: a `(CONST)` header pushing the address of the zeroed data
  /// field that follows it.
  fn compile_variable(&mut self) -> Result<(), CompileError> {
    let word = uc_call(self.here());
    let name = match self.stream.next_token() {
      Some(name) => name,
      None       => return Err(self.error(CompileErrorKind::MissingName("VARIABLE")))
    };
    debug!("compile_var: {} = 0x{:04x}", name, word);
    if self.words.is_bound(&name) {
      return Err(self.error(CompileErrorKind::RedefinedWord(name)));
    }
    self.emit(UC_CONST)?;
    let data_field = self.here() + 1;
    self.emit(data_field)?; // variable address
    self.emit(0)?; // variable data field
    self.define(&name, word)
  }

  /// `SKZ` ( 0 -- ) pc+2->pc | ( n -- ): skip the next single-word
  /// instruction if TOS is zero.
  fn compile_skip(&mut self) -> Result<(), CompileError> {
    let here = self.here();
    self.emit(uc_jz(here + 2))
  }

  /// `BEGIN`: record the loop top as a placeholder jump on the control
  /// stack; nothing is emitted yet.
  fn compile_begin(&mut self) -> Result<(), CompileError> {
    let addr = self.here();
    debug!("compile_indefinite_loop: $0x{:03x}", addr);
    self.ctrl_ctx.push(uc_jump(addr));
    Ok(())
  }

  /// `UNTIL` ( cond -- ): end a bottom-test loop.
  fn compile_until(&mut self) -> Result<(), CompileError> {
    let addr = self.pop_ctrl("UNTIL")? & ADDR_MASK;
    self.emit(uc_jz(addr))
  }

  /// `WHILE` ( cond -- ): loop (top) test. The slot emitted here is a
  /// placeholder carrying the loop-top address for `REPEAT` to read back.
  fn compile_while(&mut self) -> Result<(), CompileError> {
    let addr = self.pop_ctrl("WHILE")? & ADDR_MASK;
    let here = self.here();
    self.ctrl_ctx.push(uc_jz(here));
    self.emit(uc_jz(addr)) // placeholder
  }

  /// `REPEAT`: end a top-test loop: jump back to the loop top and patch
  /// the `WHILE` placeholder to exit just past that jump.
  fn compile_repeat(&mut self) -> Result<(), CompileError> {
    let slot = (self.pop_ctrl("REPEAT")? & ADDR_MASK) as usize;
    let loop_top = match self.prog.get(slot) {
      Some(word) => *word,
      None       => return Err(self.error(CompileErrorKind::MalformedControl("REPEAT")))
    };
    self.emit(uc_jump(loop_top))?;
    let here = self.here();
    self.patch(slot, uc_jz(here), "REPEAT")
  }

  /// `?LOOP-` / `?LOOP+` ( n -- ) ( R: -- n' ): begin a counted loop: the
  /// count moves to the return stack and an auto-branch placeholder both
  /// enters the control context and occupies its own image slot.
  fn compile_counted_loop(&mut self, auto: fn(Word) -> Word) -> Result<(), CompileError> {
    self.emit(UC_TO_R)?;
    let addr = self.here();
    debug!("compile_counted_loop: $0x{:03x}", addr);
    let word = auto(addr); // placeholder
    self.ctrl_ctx.push(word);
    self.emit(word)
  }

  /// `I` ( -- n ) ( R: n -- n ): fetch the loop count, valid only
  /// directly inside a counted loop.
  fn compile_loop_index(&mut self) -> Result<(), CompileError> {
    let depth = self.ctrl_ctx.len();
    match self.ctrl_ctx.last() {
      Some(word) if uc_is_auto(*word) => self.emit(UC_R_FETCH),
      _ => Err(self.error(CompileErrorKind::NoLoopIndex(depth)))
    }
  }

  /// `AGAIN`: end an infinite or counted loop.
  fn compile_again(&mut self) -> Result<(), CompileError> {
    debug!("compile_again: $0x{:03x}", self.here());
    let word = self.pop_ctrl("AGAIN")?;
    let addr = word & ADDR_MASK;
    if uc_is_auto(word) {
      // The placeholder slot becomes a jump to the auto-branch emitted
      // here, which re-enters the body one past the placeholder. The body
      // therefore runs before the first count test is repeated.
      let here = self.here();
      self.patch(addr as usize, uc_jump(here), "AGAIN")?;
      self.emit(uc_fixup(word, addr + 1))
    } else {
      self.emit(uc_jump(addr))
    }
  }

  /// `IF` ( cond -- ): begin a conditional with a jump-if-zero
  /// placeholder.
  fn compile_if(&mut self) -> Result<(), CompileError> {
    debug!("compile_if: $0x{:03x}", self.here());
    let word = uc_jz(self.here()); // placeholder
    self.ctrl_ctx.push(word);
    self.emit(word)
  }

  /// `ELSE`: close the `IF` placeholder past the alternative's entry jump
  /// and open a new placeholder for `THEN`.
  fn compile_else(&mut self) -> Result<(), CompileError> {
    debug!("compile_else: $0x{:03x}", self.here());
    let slot = (self.pop_ctrl("ELSE")? & ADDR_MASK) as usize;
    let here = self.here();
    self.patch(slot, uc_jz(here + 1), "ELSE")?;
    let word = uc_jump(here); // placeholder
    self.ctrl_ctx.push(word);
    self.emit(word)
  }

  /// `THEN`: patch whichever placeholder is on top to land here. This one
  /// rule closes both the bare-`IF` and the `ELSE` cases, because `ELSE`
  /// already swapped in a fresh placeholder.
  fn compile_then(&mut self) -> Result<(), CompileError> {
    debug!("compile_then: $0x{:03x}", self.here());
    let word = self.pop_ctrl("THEN")?;
    let addr = (word & ADDR_MASK) as usize;
    let here = self.here();
    self.patch(addr, uc_fixup(word, here), "THEN")
  }

  /// `;`: return from procedure, with tail fusion.
  fn compile_exit(&mut self) -> Result<(), CompileError> {
    if self.ctrl_ctx.iter().copied().any(uc_is_auto) {
      // The count parked on the return stack cannot be unwound safely.
      return Err(self.error(CompileErrorKind::ExitFromCountedLoop(self.ctrl_ctx.len())));
    }
    match self.tail_ctx {
      TailContext::Eval => {
        // Attach a "free" EXIT to the previous word.
        if let Some(last) = self.prog.last_mut() {
          *last |= UC_EXIT;
        }
      }
      TailContext::Call => {
        // Convert the previous CALL to a JUMP.
        if let Some(last) = self.prog.last_mut() {
          *last &= !0x4000;
        }
      }
      _ => {
        self.emit(UC_EXIT)?;
      }
    }
    self.tail_ctx = TailContext::None;
    Ok(())
  }

  // endregion

  // region Low-level utility methods

  /// The address the next emission will occupy.
  fn here(&self) -> Word {
    self.prog.len() as Word
  }

  fn emit(&mut self, word: Word) -> Result<(), CompileError> {
    if self.prog.len() >= IMAGE_CAPACITY {
      return Err(self.error(CompileErrorKind::ImageOverflow));
    }
    self.prog.push(word);
    Ok(())
  }

  fn pop_ctrl(&mut self, closer: &'static str) -> Result<Word, CompileError> {
    match self.ctrl_ctx.pop() {
      Some(word) => Ok(word),
      None       => Err(self.error(CompileErrorKind::NoOpenControl(closer)))
    }
  }

  /// Rewrites an already-emitted placeholder slot. A context whose slot was
  /// never emitted (e.g. `THEN` closing a bare `BEGIN`) is malformed.
  fn patch(&mut self, slot: usize, word: Word, closer: &'static str) -> Result<(), CompileError> {
    match self.prog.get_mut(slot) {
      Some(cell) => {
        *cell = word;
        Ok(())
      }
      None => Err(self.error(CompileErrorKind::MalformedControl(closer)))
    }
  }

  fn define(&mut self, name: &str, word: Word) -> Result<(), CompileError> {
    match self.words.define(name, word) {
      Ok(())  => Ok(()),
      Err(_existing) => Err(self.error(CompileErrorKind::RedefinedWord(name.to_string())))
    }
  }

  fn error(&self, kind: CompileErrorKind) -> CompileError {
    let (pos, line) = self.stream.location();
    CompileError {
      src: self.src.clone(),
      pos,
      line,
      kind
    }
  }

  // endregion

}

/// Integer literal syntax: decimal with an optional leading `-`, or the
/// `0x`/`0b`/`0o` radix prefixes.
fn parse_number(token: &str) -> Option<i64> {
  let (negative, digits) = match token.strip_prefix('-') {
    Some(digits) => (true, digits),
    None         => (false, token)
  };
  let parsed =
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
      i64::from_str_radix(hex, 16)
    } else if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
      i64::from_str_radix(bin, 2)
    } else if let Some(oct) = digits.strip_prefix("0o").or_else(|| digits.strip_prefix("0O")) {
      i64::from_str_radix(oct, 8)
    } else {
      digits.parse::<i64>()
    };
  let value = parsed.ok()?;
  match negative {
    true  => Some(-value),
    false => Some(value)
  }
}
