/*!
  The decoded form of a machine word. Every field of the encoding is a small
  enum so that the simulator's dispatch is a tagged match rather than a bag
  of bit tests. The order the variants are listed below is significant: the
  discriminants are the field values in the instruction encoding.
*/

use std::fmt::{Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display as StrumDisplay, IntoStaticStr};

use crate::bytecode::Word;

/// Branch selector of a control instruction (bits 13:12).
#[derive(
  StrumDisplay, IntoStaticStr, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq, PartialEq,    Debug,         Hash
)]
#[repr(u8)]
pub enum BranchKind {
  /// Unconditional transfer to the address field.
  Always,
  /// Pops the data stack; branches when the popped value was zero.
  IfZero,
  /// Pops the return stack; on nonzero, pushes back the incremented value
  /// and branches. On zero the count is discarded and control falls through.
  IfNotZeroInc,
  /// As `IfNotZeroInc` with a decrement.
  IfNotZeroDec,
}

impl BranchKind {
  /// The suffix the disassembler appends to `jump`/`call`.
  pub fn suffix(&self) -> &'static str {
    match self {
      BranchKind::Always       => "",
      BranchKind::IfZero       => "_ifzero",
      BranchKind::IfNotZeroInc => "_ifnz_inc",
      BranchKind::IfNotZeroDec => "_ifnz_dec",
    }
  }
}

/// Return-stack effect of an evaluation instruction (bits 13:12).
#[derive(
  StrumDisplay, IntoStaticStr, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq, PartialEq,    Debug,         Hash
)]
#[repr(u8)]
pub enum RetEffect {
  None,
  Drop,
  Push,
  Replace,
}

/// Data-stack effect of an evaluation instruction (bits 10:8).
#[derive(
  StrumDisplay, IntoStaticStr, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq, PartialEq,    Debug,         Hash
)]
#[repr(u8)]
pub enum DataEffect {
  None,
  /// Remove the top element.
  Drop,
  /// Push the result.
  Push,
  /// Replace the top element with the result.
  Replace,
  /// Swap the top two elements.
  Swap,
  /// Rotate the top three elements: ( a b c -- b c a ).
  Rot3,
  /// Reverse-rotate the top three elements: ( a b c -- c a b ).
  RevRot3,
  /// Drop two, push the result: the two-operand ALU pattern.
  Alu2,
}

/// ALU operand-A source (bits 7:6).
#[derive(
  StrumDisplay, IntoStaticStr, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq, PartialEq,    Debug,         Hash
)]
#[repr(u8)]
pub enum OperandA {
  Tos,
  Nos,
  Tors,
  Zero,
}

/// ALU operand-B source (bits 5:4).
#[derive(
  StrumDisplay, IntoStaticStr, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq, PartialEq,    Debug,         Hash
)]
#[repr(u8)]
pub enum OperandB {
  Tos,
  /// The constant 1.
  One,
  /// The constant 0x8000.
  Msb,
  /// The constant 0xFFFF.
  Ones,
}

/// ALU opcode (bits 3:0). `Mem` is the sentinel value signalling a memory
/// operation; it never reaches the ALU itself.
#[derive(
  StrumDisplay, IntoStaticStr, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq, PartialEq,    Debug,         Hash
)]
#[repr(u8)]
pub enum AluOp {
  /// Pass operand A through unchanged.
  None,
  Add,
  Sub,
  Mul,
  And,
  Xor,
  Or,
  /// Rotate left by 1/2/4/8 bit positions with wraparound.
  Rol,
  TwoRol,
  FourRol,
  EightRol,
  /// Arithmetic shift right by 1/2/4 positions, replicating the sign bit.
  Asr,
  TwoAsr,
  FourAsr,
  /// Signal failure; the simulator faults on this opcode.
  Fail,
  Mem,
}

/// Memory range of a memory operation (bits 6:4 when the ALU field is the
/// `Mem` sentinel).
#[derive(
  StrumDisplay, IntoStaticStr, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq, PartialEq,    Debug,         Hash
)]
#[repr(u8)]
pub enum MemRange {
  /// The program image itself (self-modification permitted).
  Ucode,
  /// The next image word through the PC, which advances an extra slot.
  /// This is how `(LIT)` and `(CONST)` fetch their payload.
  PcLiteral,
  /// Garbage-collector color memory, addressed by quad address.
  GcColor,
  /// Memory-mapped device registers: 4-bit device id, 4-bit register id.
  Device,
  /// The `t`, `x`, `y`, `z` fields of a quad record.
  QuadT,
  QuadX,
  QuadY,
  QuadZ,
}

impl MemRange {
  /// Quad field index (0..=3) for the quad ranges.
  pub fn quad_field(&self) -> Option<u8> {
    let value: u8 = (*self).into();
    match value >= Into::<u8>::into(MemRange::QuadT) {
      true  => Some(value & 0x3),
      false => None
    }
  }
}

/// The computation selected by an evaluation instruction: either an ALU
/// operation over the selected operands or a memory-range access.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EvalOp {
  Alu { op: AluOp, a: OperandA, b: OperandB },
  Mem { write: bool, range: MemRange },
}

/// A decoded evaluation instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Eval {
  /// Load the PC from the 12-bit-masked return-stack top (EXIT transfer).
  pub r_to_pc    :  bool,
  pub r_effect   :  RetEffect,
  /// One extra data-stack drop; the store operations consume both an
  /// address and a datum.
  pub extra_drop :  bool,
  pub d_effect   :  DataEffect,
  pub op         :  EvalOp
}

/// Holds the unencoded components of a machine word.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Instr {
  /// [1][PC->R:1][kind:2][address:12]
  Control {
    push_pc :  bool,
    kind    :  BranchKind,
    addr    :  Word
  },
  /// [0][R->PC:1][R-effect:2][2drop:1][D-effect:3][A:2][B:2][ALU:4]
  Eval(Eval),
}

impl Display for Instr {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      Instr::Control { push_pc, kind, addr } => {
        let verb = match push_pc {
          true  => "call",
          false => "jump"
        };
        write!(f, "{}{}(0x{:03x})", verb, kind.suffix(), addr)
      }

      Instr::Eval(eval) => {
        match eval.op {
          EvalOp::Alu { op, a, b } => {
            write!(f, "alu({}, {}, {})", op, a, b)?;
          }
          EvalOp::Mem { write, range } => {
            let verb = match write {
              true  => "store",
              false => "fetch"
            };
            write!(f, "{}({})", verb, range)?;
          }
        }
        write!(f, " d={} r={}", eval.d_effect, eval.r_effect)?;
        if eval.r_to_pc {
          write!(f, " exit")?;
        }
        Ok(())
      }

    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn field_discriminants(){
    assert_eq!(Into::<u8>::into(BranchKind::IfNotZeroDec), 3);
    assert_eq!(Into::<u8>::into(DataEffect::Alu2), 7);
    assert_eq!(Into::<u8>::into(OperandB::Ones), 3);
    assert_eq!(Into::<u8>::into(AluOp::Mem), 0xF);
    assert_eq!(Into::<u8>::into(MemRange::QuadZ), 7);
  }

  #[test]
  fn quad_field_selector(){
    assert_eq!(MemRange::Ucode.quad_field(), None);
    assert_eq!(MemRange::Device.quad_field(), None);
    assert_eq!(MemRange::QuadT.quad_field(), Some(0));
    assert_eq!(MemRange::QuadZ.quad_field(), Some(3));
  }

  #[test]
  fn control_display(){
    let instr = Instr::Control {
      push_pc: false,
      kind: BranchKind::IfNotZeroDec,
      addr: 0x0B6
    };
    assert_eq!(format!("{}", instr), "jump_ifnz_dec(0x0b6)");
  }

}
