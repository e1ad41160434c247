/*!

  The machine uses a 16 bit word size for both instructions and data. An
  instruction is always exactly one word; the only multi-word construct is
  the `(LIT)`/`(CONST)` pair, whose second slot is a plain data word fetched
  through the program counter. Addresses are 12 bits and address words, not
  bytes, so a program image holds at most 4096 words.

  The top bit selects between the two instruction families:

    Control (bit 15 set):
      [1][PC->R:1][kind:2][address:12]

    Evaluation (bit 15 clear):
      [0][R->PC:1][R-effect:2][2drop:1][D-effect:3][A-sel:2][B-sel:2][ALU:4]

  ALU opcode 0xF is a sentinel meaning "memory operation": bits 7:4 are then
  reinterpreted as a write flag and a 3-bit memory-range selector instead of
  the operand selectors.

  One design decision that needed to be made is whether to carry instructions
  around in their decoded form. The simulator decodes on every step and the
  compiler emits raw words, so the image itself stays a flat `Vec<Word>` and
  the decoded `Instr` value is a transient view produced by `decode`. This
  keeps the image bit-identical with what the hardware loads from the
  textual memory image.

*/

mod assembly;
mod binary;
mod instruction;

pub use assembly::{disasm, fast_disasm, invert_words, parse_memh, print_memh, InvertedIndex};
pub use binary::{
  decode, uc_call, uc_fixup, uc_is_auto, uc_jnz_dec, uc_jnz_inc, uc_jump, uc_jz,
  ADDR_MASK, UC_CONST, UC_EXIT, UC_LIT, UC_R_FETCH, UC_TO_R
};
pub use instruction::{AluOp, BranchKind, DataEffect, Eval, EvalOp, Instr, MemRange, OperandA, OperandB, RetEffect};

// If you change this you must also change the decoder and the simulator.
pub type Word = u16;

/// Words addressable through a 12-bit program counter.
pub const IMAGE_CAPACITY: usize = 0x1000;
