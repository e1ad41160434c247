/*!
  The uCode machine: a cycle-accurate simulator for the 16-bit instruction
  encoding. One `step()` call fetches, decodes, and executes exactly one
  instruction; faults come back as values with the machine state intact, so
  a caller can display the faulted state before halting.
*/

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use prettytable::{format as TableFormat, Table};
use tracing::trace;

use crate::bytecode::{
  decode, AluOp, BranchKind, DataEffect, Eval, EvalOp, Instr, MemRange, OperandA,
  OperandB, RetEffect, Word, ADDR_MASK
};
use crate::device::Device;
use crate::error::{MachineFault, StackKind};
use crate::quad::{FlatQuadMemory, QuadMemory};
use crate::stack::Stack;

pub struct Machine {

  // Registers //
  pc     :  Word, // Program counter, auto-incrementing, 12 bits

  // Memory stores //
  prog      :  Vec<Word>,              // The program image; self-modification permitted
  gc_colors :  HashMap<Word, Word>,    // GC color memory, keyed by quad address
  quads     :  Box<dyn QuadMemory>,    // Bridge to the actor-machine memory

  // Stacks //
  dstack :  Stack,
  rstack :  Stack,

  // Memory-mapped devices, indexed by the 4-bit device id //
  devices :  Vec<Box<dyn Device>>
}

impl Machine {

  // region Construction and access

  pub fn new(prog: Vec<Word>) -> Machine {
    Machine {
      pc        : 0,
      prog,
      gc_colors : HashMap::new(),
      quads     : Box::new(FlatQuadMemory::new()),
      dstack    : Stack::new(StackKind::Data),
      rstack    : Stack::new(StackKind::Return),
      devices   : Vec::new()
    }
  }

  /// Binds the next free device id to `device`.
  pub fn install_device(&mut self, device: Box<dyn Device>) {
    self.devices.push(device);
  }

  /// Replaces the quad-memory bridge (the default is a flat in-memory
  /// store).
  pub fn set_quad_memory(&mut self, quads: Box<dyn QuadMemory>) {
    self.quads = quads;
  }

  pub fn pc(&self) -> Word {
    self.pc
  }

  pub fn set_pc(&mut self, addr: Word) {
    self.pc = addr & ADDR_MASK;
  }

  pub fn prog(&self) -> &[Word] {
    &self.prog
  }

  pub fn dstack(&self) -> &Stack {
    &self.dstack
  }

  pub fn dstack_mut(&mut self) -> &mut Stack {
    &mut self.dstack
  }

  pub fn rstack(&self) -> &Stack {
    &self.rstack
  }

  pub fn rstack_mut(&mut self) -> &mut Stack {
    &mut self.rstack
  }

  // endregion

  // region Execution

  /// Executes a single instruction.
  pub fn step(&mut self) -> Result<(), MachineFault> {
    if (self.pc as usize) >= self.prog.len() {
      return Err(MachineFault::PcOutOfRange(self.pc));
    }
    let instr = self.prog[self.pc as usize];
    trace!("step: pc=0x{:03x} instr=0x{:04x}", self.pc, instr);
    self.pc = (self.pc + 1) & ADDR_MASK;
    match decode(instr) {
      Instr::Control { push_pc, kind, addr } => self.control(push_pc, kind, addr),
      Instr::Eval(eval)                      => self.evaluate(eval)
    }
  }

  /// Executes up to `steps` instructions, stopping at the first fault.
  pub fn run(&mut self, steps: usize) -> Result<(), MachineFault> {
    for _ in 0..steps {
      #[cfg(feature = "trace_computation")]
      println!("{}", self);
      self.step()?;
    }
    Ok(())
  }

  fn control(&mut self, push_pc: bool, kind: BranchKind, addr: Word) -> Result<(), MachineFault> {
    if push_pc {
      // The post-increment PC is the correct resume address.
      self.rstack.push(self.pc)?;
    }
    match kind {

      BranchKind::Always => {
        self.pc = addr;
      }

      BranchKind::IfZero => {
        // The condition is consumed whether or not the branch is taken.
        let top = self.dstack.pop()?;
        if top == 0 {
          self.pc = addr;
        }
      }

      | BranchKind::IfNotZeroInc
      | BranchKind::IfNotZeroDec => {
        // The count lives on the return stack. A zero count is discarded
        // and control falls through; otherwise the adjusted count goes
        // back and the branch is taken.
        let count = self.rstack.pop()?;
        if count != 0 {
          let adjusted = match kind {
            BranchKind::IfNotZeroInc => count.wrapping_add(1),
            _                        => count.wrapping_sub(1)
          };
          self.rstack.push(adjusted)?;
          self.pc = addr;
        }
      }

    } // end match kind
    Ok(())
  }

  fn evaluate(&mut self, eval: Eval) -> Result<(), MachineFault> {
    let tos = self.dstack.tos();
    let nos = self.dstack.nos();
    let tors = self.rstack.tos();

    let result = match eval.op {

      EvalOp::Alu { op, a, b } => {
        let a = match a {
          OperandA::Tos  => tos,
          OperandA::Nos  => nos,
          OperandA::Tors => tors,
          OperandA::Zero => 0
        };
        let b = match b {
          OperandB::Tos  => tos,
          OperandB::One  => 1,
          OperandB::Msb  => 0x8000,
          OperandB::Ones => 0xFFFF
        };
        alu(op, a, b)?
      }

      EvalOp::Mem { write, range } => self.memory_op(write, range, tos, nos)?

    };

    if eval.extra_drop {
      self.dstack.apply(DataEffect::Drop, 0)?;
    }
    self.dstack.apply(eval.d_effect, result)?;
    match eval.r_effect {
      RetEffect::None => {}
      RetEffect::Drop => {
        self.rstack.pop()?;
      }
      RetEffect::Push => {
        self.rstack.push(result)?;
      }
      RetEffect::Replace => {
        self.rstack.pop()?;
        self.rstack.push(result)?;
      }
    }
    if eval.r_to_pc {
      // EXIT transfer: the PC comes from the return-stack top as it was
      // when the instruction began.
      self.pc = tors & ADDR_MASK;
    }
    Ok(())
  }

  /// Dispatches a memory operation. `addr` is the popped top of stack,
  /// `data` the next element (for writes). Reads return the value; writes
  /// return 0, which the store encodings discard.
  fn memory_op(
    &mut self,
    write: bool,
    range: MemRange,
    addr: Word,
    data: Word
  ) -> Result<Word, MachineFault> {
    match range {

      MemRange::Ucode => {
        let idx = (addr & ADDR_MASK) as usize;
        if write {
          if idx >= self.prog.len() {
            self.prog.resize(idx + 1, 0);
          }
          self.prog[idx] = data;
          Ok(0)
        } else {
          Ok(self.prog.get(idx).copied().unwrap_or(0))
        }
      }

      MemRange::PcLiteral => {
        if write {
          // No store form exists for the literal range.
          return Ok(0);
        }
        if (self.pc as usize) >= self.prog.len() {
          return Err(MachineFault::PcOutOfRange(self.pc));
        }
        let value = self.prog[self.pc as usize];
        self.pc = (self.pc + 1) & ADDR_MASK;
        Ok(value)
      }

      MemRange::GcColor => {
        if write {
          self.gc_colors.insert(addr, data);
          Ok(0)
        } else {
          Ok(self.gc_colors.get(&addr).copied().unwrap_or(0))
        }
      }

      MemRange::Device => {
        let id = ((addr >> 4) & 0xF) as u8;
        let reg = (addr & 0xF) as u8;
        match self.devices.get_mut(id as usize) {
          Some(device) => {
            if write {
              device.write(reg, data);
              Ok(0)
            } else {
              Ok(device.read(reg))
            }
          }
          None => Err(MachineFault::UnknownDevice(id))
        }
      }

      | MemRange::QuadT
      | MemRange::QuadX
      | MemRange::QuadY
      | MemRange::QuadZ => {
        let field = range.quad_field().unwrap_or(0);
        let mut quad = self.quads.fetch(addr);
        if write {
          quad.set_field(field, data);
          self.quads.store(quad, addr);
          Ok(0)
        } else {
          Ok(quad.field(field))
        }
      }

    } // end match range
  }

  // endregion

}

fn alu(op: AluOp, a: Word, b: Word) -> Result<Word, MachineFault> {
  let result = match op {
    AluOp::None     => a,
    AluOp::Add      => a.wrapping_add(b),
    AluOp::Sub      => a.wrapping_sub(b),
    AluOp::Mul      => a.wrapping_mul(b),
    AluOp::And      => a & b,
    AluOp::Xor      => a ^ b,
    AluOp::Or       => a | b,
    AluOp::Rol      => a.rotate_left(1),
    AluOp::TwoRol   => a.rotate_left(2),
    AluOp::FourRol  => a.rotate_left(4),
    AluOp::EightRol => a.rotate_left(8),
    AluOp::Asr      => ((a as i16) >> 1) as Word,
    AluOp::TwoAsr   => ((a as i16) >> 2) as Word,
    AluOp::FourAsr  => ((a as i16) >> 4) as Word,
    AluOp::Fail     => return Err(MachineFault::Failure),
    // The memory sentinel is routed to `memory_op` before the ALU runs.
    AluOp::Mem      => a
  };
  Ok(result)
}

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

fn make_stack_table(name: char, stack: &Stack) -> Table {
  let mut table = Table::new();
  table.set_format(*TABLE_DISPLAY_FORMAT);
  table.set_titles(row![ubr->"Cell", ubl->"Contents"]);
  for (i, value) in stack.contents().iter().rev().enumerate() {
    table.add_row(row![r->format!("{}[{}] =", name, i), format!("0x{:04x}", value)]);
  }
  let stats = stack.stats();
  table.add_row(row![r->"usage", format!("[{},{},{}]", stats.min, stats.cnt, stats.max)]);
  table
}

impl Display for Machine {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let d_table = make_stack_table('D', &self.dstack);
    let r_table = make_stack_table('R', &self.rstack);

    let mut combined_table = table!([d_table, r_table]);
    combined_table.set_titles(row![ub->"Data Stack", ub->"Return Stack"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    let code = self.prog.get(self.pc as usize).copied().unwrap_or(0);
    write!(f, "PC: 0x{:03x}  Code: 0x{:04x}\n{}", self.pc, code, combined_table)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::RefCell;
  use std::io::Write as IoWrite;
  use std::rc::Rc;

  use crate::bytecode::{uc_call, uc_jump, uc_jz, UC_CONST, UC_EXIT, UC_LIT};
  use crate::compiler::compile;
  use crate::device::Uart;
  use crate::wordtable::WordEntry;

  /// Records writes and serves a constant on every read.
  struct ProbeDevice {
    writes    :  Rc<RefCell<Vec<(u8, Word)>>>,
    read_back :  Word
  }

  impl ProbeDevice {
    fn new(read_back: Word) -> (ProbeDevice, Rc<RefCell<Vec<(u8, Word)>>>) {
      let writes = Rc::new(RefCell::new(Vec::new()));
      let device = ProbeDevice {
        writes: writes.clone(),
        read_back
      };
      (device, writes)
    }
  }

  impl Device for ProbeDevice {
    fn read(&mut self, _reg: u8) -> Word {
      self.read_back
    }
    fn write(&mut self, reg: u8, data: Word) {
      self.writes.borrow_mut().push((reg, data));
    }
  }

  /// A clonable sink for UART output.
  #[derive(Clone)]
  struct SharedWriter(Rc<RefCell<Vec<u8>>>);

  impl SharedWriter {
    fn new() -> SharedWriter {
      SharedWriter(Rc::new(RefCell::new(Vec::new())))
    }
    fn take(&self) -> Vec<u8> {
      self.0.borrow().clone()
    }
  }

  impl IoWrite for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
      self.0.borrow_mut().extend_from_slice(buf);
      Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
      Ok(())
    }
  }

  fn machine_with_stack(prog: Vec<Word>, dstack: &[Word]) -> Machine {
    let mut machine = Machine::new(prog);
    for value in dstack {
      machine.dstack_mut().push(*value).unwrap();
    }
    machine
  }

  #[test]
  fn add_instruction(){
    // `+` with [3, 4] leaves [7].
    let mut machine = machine_with_stack(vec![0x0741], &[3, 4]);
    machine.step().unwrap();
    assert_eq!(machine.dstack().contents(), &[7]);
    assert_eq!(machine.pc(), 1);
  }

  #[test]
  fn subtract_and_multiply_wrap(){
    let mut machine = machine_with_stack(vec![0x0742], &[3, 4]);
    machine.step().unwrap();
    assert_eq!(machine.dstack().contents(), &[0xFFFF]); // 3 - 4
    let mut machine = machine_with_stack(vec![0x0743], &[0x8000, 2]);
    machine.step().unwrap();
    assert_eq!(machine.dstack().contents(), &[0x0000]); // truncated
  }

  #[test]
  fn rotate_left_wraps(){
    // ROL of 0x8001 is 0x0003.
    let mut machine = machine_with_stack(vec![0x0307], &[0x8001]);
    machine.step().unwrap();
    assert_eq!(machine.dstack().contents(), &[0x0003]);
  }

  #[test]
  fn arithmetic_shift_replicates_sign(){
    let mut machine = machine_with_stack(vec![0x030B], &[0x8000]);
    machine.step().unwrap();
    assert_eq!(machine.dstack().contents(), &[0xC000]);
    let mut machine = machine_with_stack(vec![0x030D], &[0x0040]);
    machine.step().unwrap();
    assert_eq!(machine.dstack().contents(), &[0x0004]);
  }

  #[test]
  fn stack_shuffles(){
    let mut machine = machine_with_stack(vec![0x0200], &[5]); // DUP
    machine.step().unwrap();
    assert_eq!(machine.dstack().contents(), &[5, 5]);

    let mut machine = machine_with_stack(vec![0x0400], &[1, 2]); // SWAP
    machine.step().unwrap();
    assert_eq!(machine.dstack().contents(), &[2, 1]);

    let mut machine = machine_with_stack(vec![0x0240], &[1, 2]); // OVER
    machine.step().unwrap();
    assert_eq!(machine.dstack().contents(), &[1, 2, 1]);

    let mut machine = machine_with_stack(vec![0x0500], &[1, 2, 3]); // ROT
    machine.step().unwrap();
    assert_eq!(machine.dstack().contents(), &[2, 3, 1]);

    let mut machine = machine_with_stack(vec![0x0600], &[1, 2, 3]); // -ROT
    machine.step().unwrap();
    assert_eq!(machine.dstack().contents(), &[3, 1, 2]);
  }

  #[test]
  fn constant_generators(){
    let mut machine = machine_with_stack(vec![0x02F6, 0x02C0, 0x02D6, 0x02E6], &[]);
    machine.run(4).unwrap();
    assert_eq!(machine.dstack().contents(), &[0xFFFF, 0x0000, 0x0001, 0x8000]);
  }

  #[test]
  fn literal_fetches_through_pc(){
    let mut machine = machine_with_stack(vec![UC_LIT, 0x1234], &[]);
    machine.step().unwrap();
    assert_eq!(machine.dstack().contents(), &[0x1234]);
    // The PC skipped the payload slot.
    assert_eq!(machine.pc(), 2);
  }

  #[test]
  fn const_header_pushes_and_returns(){
    let mut machine = machine_with_stack(vec![UC_CONST, 0x0ABC], &[]);
    machine.rstack_mut().push(0x005).unwrap();
    machine.step().unwrap();
    assert_eq!(machine.dstack().contents(), &[0x0ABC]);
    assert_eq!(machine.pc(), 0x005);
    assert!(machine.rstack().is_empty());
  }

  #[test]
  fn call_pushes_resume_address(){
    let mut machine = machine_with_stack(vec![uc_call(2), 0x0000, UC_EXIT], &[]);
    machine.step().unwrap();
    assert_eq!(machine.pc(), 2);
    assert_eq!(machine.rstack().contents(), &[1]);
    // EXIT resumes at the pushed address and drops it.
    machine.step().unwrap();
    assert_eq!(machine.pc(), 1);
    assert!(machine.rstack().is_empty());
  }

  #[test]
  fn return_stack_transfers(){
    let mut machine = machine_with_stack(vec![0x2100, 0x0280, 0x1280], &[7]);
    machine.step().unwrap(); // >R
    assert!(machine.dstack().is_empty());
    assert_eq!(machine.rstack().contents(), &[7]);
    machine.step().unwrap(); // R@
    assert_eq!(machine.dstack().contents(), &[7]);
    assert_eq!(machine.rstack().contents(), &[7]);
    machine.step().unwrap(); // R>
    assert_eq!(machine.dstack().contents(), &[7, 7]);
    assert!(machine.rstack().is_empty());
  }

  #[test]
  fn jump_if_zero_consumes_condition(){
    let mut machine = machine_with_stack(vec![uc_jz(5)], &[0]);
    machine.step().unwrap();
    assert_eq!(machine.pc(), 5);
    assert!(machine.dstack().is_empty());

    let mut machine = machine_with_stack(vec![uc_jz(5)], &[1]);
    machine.step().unwrap();
    assert_eq!(machine.pc(), 1);
    assert!(machine.dstack().is_empty());
  }

  #[test]
  fn ucode_memory_fetch_and_store(){
    // 0xABC 0x100 ! grows the image; 0x100 @ reads it back.
    let prog = vec![
      UC_LIT, 0x0ABC, UC_LIT, 0x0100, 0x098F, // store
      UC_LIT, 0x0100, 0x030F                  // fetch
    ];
    let mut machine = machine_with_stack(prog, &[]);
    machine.run(3).unwrap();
    assert_eq!(machine.prog()[0x100], 0x0ABC);
    // The store consumed both operands.
    assert!(machine.dstack().is_empty());
    machine.run(2).unwrap();
    assert_eq!(machine.dstack().contents(), &[0x0ABC]);
  }

  #[test]
  fn fetch_beyond_image_reads_zero(){
    let mut machine = machine_with_stack(vec![UC_LIT, 0x0800, 0x030F], &[]);
    machine.run(2).unwrap();
    assert_eq!(machine.dstack().contents(), &[0x0000]);
  }

  #[test]
  fn device_read_and_write(){
    let (probe, writes) = ProbeDevice::new(0xBEEF);
    let prog = vec![
      UC_LIT, 0x0000, 0x033F,          // IO@ of device 0, register 0
      UC_LIT, 0x0042, UC_LIT, 0x0003, 0x09BF // 0x42 IO! to register 3
    ];
    let mut machine = machine_with_stack(prog, &[]);
    machine.install_device(Box::new(probe));
    machine.run(2).unwrap();
    assert_eq!(machine.dstack().contents(), &[0xBEEF]);
    machine.run(3).unwrap();
    assert_eq!(writes.borrow().as_slice(), &[(3, 0x0042)]);
  }

  #[test]
  fn unknown_device_faults(){
    // Register address 0x75 selects device 7, which is not installed.
    let mut machine = machine_with_stack(vec![UC_LIT, 0x0075, 0x033F], &[]);
    machine.step().unwrap();
    assert_eq!(machine.run(1), Err(MachineFault::UnknownDevice(7)));
  }

  #[test]
  fn pc_past_image_end_faults(){
    let mut machine = machine_with_stack(vec![uc_jump(5)], &[]);
    machine.step().unwrap();
    assert_eq!(machine.step(), Err(MachineFault::PcOutOfRange(5)));
    // The fault left the state inspectable.
    assert_eq!(machine.pc(), 5);
  }

  #[test]
  fn quad_field_store_and_fetch(){
    let prog = vec![
      UC_LIT, 0x0777, UC_LIT, 0x0042, 0x09CF, // 0x777 0x42 QT!
      UC_LIT, 0x0042, 0x034F,                 // 0x42 QT@
      UC_LIT, 0x0042, 0x035F                  // 0x42 QX@
    ];
    let mut machine = machine_with_stack(prog, &[]);
    machine.run(5).unwrap();
    assert_eq!(machine.dstack().contents(), &[0x0777]);
    // The untouched fields still read zero.
    machine.run(2).unwrap();
    assert_eq!(machine.dstack().contents(), &[0x0777, 0x0000]);
  }

  #[test]
  fn quad_memory_is_pluggable(){
    use crate::quad::{Quad, QuadMemory};

    // A bridge that derives every field from the address, standing in for
    // the external actor-machine memory.
    struct EchoQuads;
    impl QuadMemory for EchoQuads {
      fn fetch(&mut self, addr: Word) -> Quad {
        Quad { t: addr, x: addr.wrapping_add(1), y: 0, z: 0 }
      }
      fn store(&mut self, _quad: Quad, _addr: Word) {}
    }

    let prog = vec![UC_LIT, 0x0010, 0x035F]; // 0x10 QX@
    let mut machine = machine_with_stack(prog, &[]);
    machine.set_quad_memory(Box::new(EchoQuads));
    machine.run(2).unwrap();
    assert_eq!(machine.dstack().contents(), &[0x0011]);
  }

  #[test]
  fn gc_color_store_and_fetch(){
    let prog = vec![
      UC_LIT, 0x0002, UC_LIT, 0x0042, 0x09AF, // 2 0x42 GCC!
      UC_LIT, 0x0042, 0x032F                  // 0x42 GCC@
    ];
    let mut machine = machine_with_stack(prog, &[]);
    machine.run(5).unwrap();
    assert_eq!(machine.dstack().contents(), &[0x0002]);
  }

  #[test]
  fn fail_opcode_faults(){
    let mut machine = machine_with_stack(vec![0x000E], &[]);
    assert_eq!(machine.step(), Err(MachineFault::Failure));
  }

  #[test]
  fn data_stack_overflow_faults(){
    let mut prog = Vec::new();
    for _ in 0..13 {
      prog.push(UC_LIT);
      prog.push(0x0001);
    }
    let mut machine = machine_with_stack(prog, &[]);
    assert_eq!(
      machine.run(13),
      Err(MachineFault::StackOverflow(StackKind::Data))
    );
    assert_eq!(machine.dstack().len(), 12);
  }

  fn entry_of(compilation: &crate::compiler::Compilation, name: &str) -> Word {
    match compilation.words.lookup(name) {
      Some(WordEntry::Primitive(word)) => word & ADDR_MASK,
      _ => panic!("no such word: {}", name)
    }
  }

  #[test]
  fn counted_loop_runs_body_exactly_n_times(){
    for n in &[0usize, 1, 5] {
      let source = format!(": GO {} ?LOOP- 0 0 IO! AGAIN FAIL ;", n);
      let compilation = compile(&source, "loop.f").unwrap();
      let (probe, writes) = ProbeDevice::new(0);
      let mut machine = Machine::new(compilation.prog.clone());
      machine.install_device(Box::new(probe));
      machine.set_pc(entry_of(&compilation, "GO"));
      // The body counts iterations through the device; FAIL marks the
      // fall-through when the count is exhausted.
      assert_eq!(machine.run(10_000), Err(MachineFault::Failure));
      assert_eq!(writes.borrow().len(), *n);
    }
  }

  #[test]
  fn compiled_emit_writes_to_the_uart(){
    let source = "
      : EMIT ( ch -- )
          BEGIN 0x00 IO@ UNTIL 0x01 IO! ;
      : GO 72 EMIT 105 EMIT FAIL ;";
    let compilation = compile(source, "emit.f").unwrap();
    let writer = SharedWriter::new();
    let mut machine = Machine::new(compilation.prog.clone());
    machine.install_device(Box::new(Uart::new(Vec::new(), writer.clone())));
    machine.set_pc(entry_of(&compilation, "GO"));
    assert_eq!(machine.run(10_000), Err(MachineFault::Failure));
    assert_eq!(writer.take(), b"Hi");
  }

  #[test]
  fn compiled_key_reads_from_the_uart(){
    let source = "
      : KEY ( -- ch )
          BEGIN 0x02 IO@ UNTIL 0x03 IO@ ;
      : GO KEY FAIL ;";
    let compilation = compile(source, "key.f").unwrap();
    let mut machine = Machine::new(compilation.prog.clone());
    machine.install_device(Box::new(Uart::new(b"Z".to_vec(), Vec::new())));
    machine.set_pc(entry_of(&compilation, "GO"));
    assert_eq!(machine.run(10_000), Err(MachineFault::Failure));
    assert_eq!(machine.dstack().contents(), &[0x005A]);
  }

}
