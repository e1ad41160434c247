/*!
  This module is responsible for the bit-exact construction and decoding of
  machine words. The numeric values here are load-bearing: the hardware
  decodes the same layout, so every constant must match the memory images
  this toolchain exchanges with it.
*/

use std::convert::TryFrom;

use super::instruction::{AluOp, BranchKind, DataEffect, Eval, EvalOp, Instr, MemRange, OperandA, OperandB, RetEffect};
use crate::bytecode::Word;

/// 12-bit instruction addresses.
pub const ADDR_MASK: Word = 0x0FFF;

// Reserved composite encodings. `(LIT)` and `(CONST)` fetch the next image
// word through the PC; `(CONST)` additionally returns, so that calling a
// constant's address behaves like a zero-argument procedure.
pub const UC_LIT: Word = 0x021F; //     (LIT) item ( -- item )
pub const UC_CONST: Word = 0x521F; //   (CONST) item ( -- item ) ( R: addr -- ) addr->pc
pub const UC_TO_R: Word = 0x2100; //    >R ( a -- ) ( R: -- a )
pub const UC_R_FETCH: Word = 0x0280; // R@ ( -- a ) ( R: a -- a )
pub const UC_EXIT: Word = 0x5000; //    EXIT ( -- ) ( R: addr -- ) addr->pc

/// Jump (unconditional).
pub fn uc_jump(addr: Word) -> Word {
  0x8000 | (addr & ADDR_MASK)
}

/// Jump, if zero.
pub fn uc_jz(addr: Word) -> Word {
  0x9000 | (addr & ADDR_MASK)
}

/// Increment and jump, if not zero.
pub fn uc_jnz_inc(addr: Word) -> Word {
  0xA000 | (addr & ADDR_MASK)
}

/// Decrement and jump, if not zero.
pub fn uc_jnz_dec(addr: Word) -> Word {
  0xB000 | (addr & ADDR_MASK)
}

/// Push the return address and jump.
pub fn uc_call(addr: Word) -> Word {
  0xC000 | (addr & ADDR_MASK)
}

/// Is this word an auto increment/decrement branch?
pub fn uc_is_auto(word: Word) -> bool {
  (word & 0xE000) == 0xA000
}

/// Replaces the immediate address field of `word`, leaving the rest intact.
pub fn uc_fixup(word: Word, addr: Word) -> Word {
  (word & !ADDR_MASK) | (addr & ADDR_MASK)
}

/**
  Decodes a machine word. Decoding is total: every field is masked to its
  width before conversion, so the `try_from` calls below cannot fail.
*/
pub fn decode(word: Word) -> Instr {
  if (word & 0x8000) != 0 {
    return Instr::Control {
      push_pc : (word & 0x4000) != 0,
      kind    : BranchKind::try_from(((word >> 12) & 0x3) as u8).unwrap(),
      addr    : word & ADDR_MASK
    };
  }
  let alu = AluOp::try_from((word & 0xF) as u8).unwrap();
  let op = match alu {

    AluOp::Mem => {
      EvalOp::Mem {
        write : (word & 0x0080) != 0,
        range : MemRange::try_from(((word >> 4) & 0x7) as u8).unwrap()
      }
    }

    _ => {
      EvalOp::Alu {
        op : alu,
        a  : OperandA::try_from(((word >> 6) & 0x3) as u8).unwrap(),
        b  : OperandB::try_from(((word >> 4) & 0x3) as u8).unwrap()
      }
    }

  };
  Instr::Eval(Eval {
    r_to_pc    : (word & 0x4000) != 0,
    r_effect   : RetEffect::try_from(((word >> 12) & 0x3) as u8).unwrap(),
    extra_drop : (word & 0x0800) != 0,
    d_effect   : DataEffect::try_from(((word >> 8) & 0x7) as u8).unwrap(),
    op
  })
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn control_constructors(){
    assert_eq!(uc_jump(0x042), 0x8042);
    assert_eq!(uc_jz(0x0AF), 0x90AF);
    assert_eq!(uc_jnz_inc(0x252), 0xA252);
    assert_eq!(uc_jnz_dec(0x0B6), 0xB0B6);
    assert_eq!(uc_call(0x042), 0xC042);
    // Addresses are masked, not range-checked.
    assert_eq!(uc_jump(0x1042), 0x8042);
  }

  #[test]
  fn auto_detection(){
    assert!(uc_is_auto(uc_jnz_inc(7)));
    assert!(uc_is_auto(uc_jnz_dec(7)));
    assert!(!uc_is_auto(uc_jump(7)));
    assert!(!uc_is_auto(uc_jz(7)));
    assert!(!uc_is_auto(uc_call(7)));
  }

  #[test]
  fn fixup_preserves_opcode_bits(){
    assert_eq!(uc_fixup(uc_jz(0x001), 0x0FE), uc_jz(0x0FE));
    assert_eq!(uc_fixup(uc_jnz_dec(0x010), 0x011), uc_jnz_dec(0x011));
  }

  #[test]
  fn decode_control(){
    assert_eq!(
      decode(0xC042),
      Instr::Control { push_pc: true, kind: BranchKind::Always, addr: 0x042 }
    );
    assert_eq!(
      decode(0x90AF),
      Instr::Control { push_pc: false, kind: BranchKind::IfZero, addr: 0x0AF }
    );
    assert_eq!(
      decode(0xB0B6),
      Instr::Control { push_pc: false, kind: BranchKind::IfNotZeroDec, addr: 0x0B6 }
    );
  }

  #[test]
  fn decode_dup(){
    // DUP = 0x0200: push the pass-through of TOS.
    assert_eq!(
      decode(0x0200),
      Instr::Eval(Eval {
        r_to_pc    : false,
        r_effect   : RetEffect::None,
        extra_drop : false,
        d_effect   : DataEffect::Push,
        op         : EvalOp::Alu { op: AluOp::None, a: OperandA::Tos, b: OperandB::Tos }
      })
    );
  }

  #[test]
  fn decode_plus(){
    // + = 0x0741: drop two, push NOS+TOS.
    assert_eq!(
      decode(0x0741),
      Instr::Eval(Eval {
        r_to_pc    : false,
        r_effect   : RetEffect::None,
        extra_drop : false,
        d_effect   : DataEffect::Alu2,
        op         : EvalOp::Alu { op: AluOp::Add, a: OperandA::Nos, b: OperandB::Tos }
      })
    );
  }

  #[test]
  fn decode_store(){
    // ! = 0x098F: memory write to the image, consuming data and address.
    assert_eq!(
      decode(0x098F),
      Instr::Eval(Eval {
        r_to_pc    : false,
        r_effect   : RetEffect::None,
        extra_drop : true,
        d_effect   : DataEffect::Drop,
        op         : EvalOp::Mem { write: true, range: MemRange::Ucode }
      })
    );
  }

  #[test]
  fn decode_lit(){
    // (LIT) = 0x021F: push the word fetched through the PC.
    assert_eq!(
      decode(UC_LIT),
      Instr::Eval(Eval {
        r_to_pc    : false,
        r_effect   : RetEffect::None,
        extra_drop : false,
        d_effect   : DataEffect::Push,
        op         : EvalOp::Mem { write: false, range: MemRange::PcLiteral }
      })
    );
  }

  #[test]
  fn decode_const_is_lit_plus_exit(){
    // (CONST) = (LIT) | EXIT.
    assert_eq!(UC_CONST, UC_LIT | UC_EXIT);
    match decode(UC_CONST) {
      Instr::Eval(eval) => {
        assert!(eval.r_to_pc);
        assert_eq!(eval.r_effect, RetEffect::Drop);
        assert_eq!(eval.op, EvalOp::Mem { write: false, range: MemRange::PcLiteral });
      }
      _ => panic!("(CONST) decoded as a control instruction")
    }
  }

  #[test]
  fn decode_exit(){
    // EXIT = 0x5000: PC from TORS, drop the return stack.
    assert_eq!(
      decode(UC_EXIT),
      Instr::Eval(Eval {
        r_to_pc    : true,
        r_effect   : RetEffect::Drop,
        extra_drop : false,
        d_effect   : DataEffect::None,
        op         : EvalOp::Alu { op: AluOp::None, a: OperandA::Tos, b: OperandB::Tos }
      })
    );
  }

  #[test]
  fn decode_return_transfers(){
    // >R = 0x2100: drop from data, push onto return.
    assert_eq!(
      decode(UC_TO_R),
      Instr::Eval(Eval {
        r_to_pc    : false,
        r_effect   : RetEffect::Push,
        extra_drop : false,
        d_effect   : DataEffect::Drop,
        op         : EvalOp::Alu { op: AluOp::None, a: OperandA::Tos, b: OperandB::Tos }
      })
    );
    // R> = 0x1280: push TORS onto data, drop from return.
    assert_eq!(
      decode(0x1280),
      Instr::Eval(Eval {
        r_to_pc    : false,
        r_effect   : RetEffect::Drop,
        extra_drop : false,
        d_effect   : DataEffect::Push,
        op         : EvalOp::Alu { op: AluOp::None, a: OperandA::Tors, b: OperandB::Tos }
      })
    );
  }

}
