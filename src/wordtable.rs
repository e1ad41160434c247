/*!
  The word table maps names to either a fixed 16-bit primitive encoding or a
  compile-time keyword. It is seeded with the built-in primitive table and
  grows as the source defines new words, constants, and variables.

  Names are interned and case-sensitive. Definition is strict: a name can be
  bound exactly once, whether the collision is with a primitive or an
  earlier user definition. `rebind` is the one audited exception, for
  embedders that deliberately swap a binding; ordinary compilation never
  reaches it.
*/

use std::collections::HashMap;

use string_cache::DefaultAtom;
use strum::IntoEnumIterator;
use strum_macros::{Display as StrumDisplay, EnumIter, IntoStaticStr};

use crate::bytecode::Word;

/// The built-in primitive encodings. Every value is bit-exact: the hardware
/// and the memory images exchanged with it depend on these numbers.
pub const PRIMITIVES: &[(&str, Word)] = &[
  ("NOP", 0x0000),     // ( -- )
  ("DROP", 0x0100),    // ( a -- )
  ("DUP", 0x0200),     // ( a -- a a )
  ("SWAP", 0x0400),    // ( a b -- b a )
  ("OVER", 0x0240),    // ( a b -- a b a )
  ("ROT", 0x0500),     // ( a b c -- b c a )
  ("-ROT", 0x0600),    // ( a b c -- c a b )
  ("TRUE", 0x02F6),    // ( -- -1 )
  ("FALSE", 0x02C0),   // ( -- 0 )
  ("0", 0x02C0),       // ( -- 0 )
  ("1", 0x02D6),       // ( -- 1 )
  ("-1", 0x02F6),      // ( -- -1 )
  ("LSB", 0x02D6),     // ( -- 1 )
  ("MSB", 0x02E6),     // ( -- 0x8000 )
  ("LSB&", 0x0314),    // ( a -- a&1 )
  ("MSB&", 0x0324),    // ( a -- a&0x8000 )
  ("LSB|", 0x0316),    // ( a -- a|1 )
  ("MSB|", 0x0326),    // ( a -- a|0x8000 )
  ("INVERT", 0x0335),  // ( a -- ~a )
  ("NEGATE", 0x03C2),  // ( a -- -a )
  ("1+", 0x0311),      // ( a -- a+1 )
  ("1-", 0x0312),      // ( a -- a-1 )
  ("2*", 0x0301),      // ( a -- a*2 )
  ("2/", 0x030B),      // ( a -- a/2 )
  ("+", 0x0741),       // ( a b -- a+b )
  ("-", 0x0742),       // ( a b -- a-b )
  ("*", 0x0743),       // ( a b -- a*b )
  ("AND", 0x0744),     // ( a b -- a&b )
  ("XOR", 0x0745),     // ( a b -- a^b )
  ("OR", 0x0746),      // ( a b -- a|b )
  ("ROL", 0x0307),     // ( a -- {a[14:0],a[15]} )
  ("2ROL", 0x0308),    // ( a -- {a[13:0],a[15:14]} )
  ("4ROL", 0x0309),    // ( a -- {a[11:0],a[15:12]} )
  ("8ROL", 0x030A),    // ( a -- {a[7:0],a[15:8]} )
  ("ASR", 0x030B),     // ( a -- {a[15],a[15:1]} )
  ("2ASR", 0x030C),    // ( a -- {a[15],a[15],a[15:2]} )
  ("4ASR", 0x030D),    // ( a -- {a[15],a[15],a[15],a[15],a[15:4]} )
  ("@", 0x030F),       // ( addr -- data )
  ("!", 0x098F),       // ( data addr -- )
  ("IO@", 0x033F),     // ( io_reg -- data )
  ("IO!", 0x09BF),     // ( data io_reg -- )
  ("QT@", 0x034F),     // ( qref -- data )
  ("QT!", 0x09CF),     // ( data qref -- )
  ("QX@", 0x035F),     // ( qref -- data )
  ("QX!", 0x09DF),     // ( data qref -- )
  ("QY@", 0x036F),     // ( qref -- data )
  ("QY!", 0x09EF),     // ( data qref -- )
  ("QZ@", 0x037F),     // ( qref -- data )
  ("QZ!", 0x09FF),     // ( data qref -- )
  ("GCC@", 0x032F),    // ( addr -- color )
  ("GCC!", 0x09AF),    // ( color addr -- )
  (">R", 0x2100),      // ( a -- ) ( R: -- a )
  ("R>", 0x1280),      // ( -- a ) ( R: a -- )
  ("R@", 0x0280),      // ( -- a ) ( R: a -- a )
  ("RDROP", 0x1000),   // ( -- ) ( R: a -- )
  ("FAIL", 0x000E),    // ( -- ) signal failure
  ("#?", 0x02C0),      // ( -- 0x0000 ) ... actor-machine literal
  ("#nil", 0x02D6),    // ( -- 0x0001 ) ... actor-machine literal
  ("#0", 0x02E6),      // ( -- 0x8000 ) ... actor-machine literal
  ("#-1", 0x02F6),     // ( -- 0xFFFF ) ... actor-machine literal
  ("is_fix", 0x0324),  // ( x -- x&0x8000 )
  ("int2fix", 0x0326), // ( x -- x|0x8000 )
  ("EXIT", 0x5000),    // ( -- ) ( R: addr -- ) addr->pc ; no TCO
];

/// Compile-time keywords. The serialized form is the source spelling.
#[derive(
  StrumDisplay, IntoStaticStr, EnumIter,
  Clone,        Copy,          Eq, PartialEq, Debug, Hash
)]
pub enum Keyword {
  #[strum(serialize = ":")]
  Colon,
  #[strum(serialize = ",")]
  Comma,
  #[strum(serialize = "CONSTANT")]
  Constant,
  #[strum(serialize = "VARIABLE")]
  Variable,
  #[strum(serialize = "SKZ")]
  SkipIfZero,
  #[strum(serialize = "BEGIN")]
  Begin,
  #[strum(serialize = "UNTIL")]
  Until,
  #[strum(serialize = "WHILE")]
  While,
  #[strum(serialize = "REPEAT")]
  Repeat,
  #[strum(serialize = "?LOOP-")]
  CountdownLoop,
  #[strum(serialize = "?LOOP+")]
  CountupLoop,
  #[strum(serialize = "I")]
  LoopIndex,
  #[strum(serialize = "AGAIN")]
  Again,
  #[strum(serialize = "IF")]
  If,
  #[strum(serialize = "ELSE")]
  Else,
  #[strum(serialize = "THEN")]
  Then,
  #[strum(serialize = ";")]
  Semicolon,
}

/// What a name resolves to during compilation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WordEntry {
  /// A fixed encoding to emit directly (primitives and user definitions).
  Primitive(Word),
  /// A compile-time procedure.
  Keyword(Keyword),
}

/// Name -> entry mapping with a remembered insertion order, so that
/// disassembly labels and the printed NAMES column are deterministic.
pub struct WordTable {
  table :  HashMap<DefaultAtom, WordEntry>,
  order :  Vec<DefaultAtom>
}

impl WordTable {

  /// The standard table: all primitives plus all compile-time keywords.
  pub fn standard() -> WordTable {
    let mut words = WordTable {
      table : HashMap::new(),
      order : Vec::new()
    };
    for (name, word) in PRIMITIVES {
      words.insert(DefaultAtom::from(*name), WordEntry::Primitive(*word));
    }
    for keyword in Keyword::iter() {
      let name: &'static str = keyword.into();
      words.insert(DefaultAtom::from(name), WordEntry::Keyword(keyword));
    }
    words
  }

  fn insert(&mut self, name: DefaultAtom, entry: WordEntry) {
    self.order.push(name.clone());
    self.table.insert(name, entry);
  }

  pub fn lookup(&self, name: &str) -> Option<WordEntry> {
    self.table.get(&DefaultAtom::from(name)).copied()
  }

  pub fn is_bound(&self, name: &str) -> bool {
    self.table.contains_key(&DefaultAtom::from(name))
  }

  /**
    Binds `name` to a fixed encoding. Fails with the existing entry if the
    name is already bound, whether to a primitive, a keyword, or an earlier
    user definition.
  */
  pub fn define(&mut self, name: &str, word: Word) -> Result<(), WordEntry> {
    match self.lookup(name) {
      Some(existing) => Err(existing),
      None => {
        self.insert(DefaultAtom::from(name), WordEntry::Primitive(word));
        Ok(())
      }
    }
  }

  /**
    Swaps the encoding bound to an existing name, returning the previous
    entry. This is a deliberate, audited operation for embedders; it fails
    if the name is unbound or names a compile-time keyword, and it is never
    invoked while compiling source text.
  */
  pub fn rebind(&mut self, name: &str, word: Word) -> Result<WordEntry, ()> {
    let atom = DefaultAtom::from(name);
    match self.table.get_mut(&atom) {
      Some(entry @ WordEntry::Primitive(_)) => {
        let previous = *entry;
        *entry = WordEntry::Primitive(word);
        Ok(previous)
      }
      _ => Err(())
    }
  }

  /// Entries in definition order, primitives and keywords alike.
  pub fn iter(&self) -> impl Iterator<Item = (&DefaultAtom, &WordEntry)> {
    let table = &self.table;
    self.order.iter().map(move |name| (name, &table[name]))
  }

}
