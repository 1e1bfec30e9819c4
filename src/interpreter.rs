/// # interpreter
///
/// One tick is a whole fetch/decode/execute cycle:
///
///  1. fetch the big-endian word at pc/pc+1 (halts if pc+1 is off the end)
///  2. step pc by 2 *before* executing, so jumps and calls overwrite it
///  3. decode into the closed `Instruction` enum; anything unrecognised
///     halts the machine and reports the word -- never a silent skip
///  4. execute with a single exhaustive match
///
/// Flag discipline: v[0xf] ends up holding exactly the documented 0/1 for
/// every opcode that defines it, so the flag write always lands after the
/// result write.
use crate::error::ExecError;
use crate::machine::{Machine, DISPLAY_HEIGHT, DISPLAY_WIDTH, MEMORY_SIZE, STACK_SIZE};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Behavioural variants between historical CHIP-8 implementations. Picked
/// once at startup, never auto-detected per ROM. All-false reproduces the
/// canonical modern behaviour.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quirks {
    /// 8XY1/8XY2/8XY3 also zero v[0xf]
    pub vf_reset: bool,
    /// FX55/FX65 walk the index register instead of leaving it alone
    pub memory_incr: bool,
    /// 8XY6/8XYE copy v[y] into v[x] before shifting
    pub shift_swap: bool,
    /// BNNN becomes "jump to NN + v[x]" instead of "jump to NNN + v[0]"
    pub jump_x: bool,
}

/// A decoded instruction. `decode` is total over u16: every word maps to
/// exactly one variant or to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0
    ClearScreen,
    /// 00EE
    Return,
    /// 1NNN
    Jump(u16),
    /// 2NNN
    Call(u16),
    /// 3XNN
    SkipEqVal(usize, u8),
    /// 4XNN
    SkipNeVal(usize, u8),
    /// 5XY0
    SkipEqReg(usize, usize),
    /// 9XY0
    SkipNeReg(usize, usize),
    /// 6XNN
    LoadVal(usize, u8),
    /// 7XNN
    AddVal(usize, u8),
    /// 8XY0
    Copy(usize, usize),
    /// 8XY1
    Or(usize, usize),
    /// 8XY2
    And(usize, usize),
    /// 8XY3
    Xor(usize, usize),
    /// 8XY4
    AddReg(usize, usize),
    /// 8XY5
    SubXY(usize, usize),
    /// 8XY7
    SubYX(usize, usize),
    /// 8XY6
    ShiftRight(usize, usize),
    /// 8XYE
    ShiftLeft(usize, usize),
    /// ANNN
    SetIndex(u16),
    /// BNNN
    JumpOffset(u16),
    /// CXNN
    Random(usize, u8),
    /// DXYN
    Draw(usize, usize, usize),
    /// EX9E
    SkipKeyDown(usize),
    /// EXA1
    SkipKeyUp(usize),
    /// FX07
    ReadDelay(usize),
    /// FX15
    WriteDelay(usize),
    /// FX18
    WriteSound(usize),
    /// FX1E
    AddIndex(usize),
    /// FX0A
    WaitKey(usize),
    /// FX29
    FontChar(usize),
    /// FX33
    BcdSplit(usize),
    /// FX55
    StoreRegs(usize),
    /// FX65
    LoadRegs(usize),
}

impl Instruction {
    pub fn decode(word: u16) -> Option<Instruction> {
        use Instruction::*;
        let x = (word >> 8 & 0xf) as usize;
        let y = (word >> 4 & 0xf) as usize;
        let n = (word & 0xf) as usize;
        let nn = (word & 0xff) as u8;
        let nnn = word & 0xfff;
        match word >> 12 {
            0x0 => match word {
                0x00e0 => Some(ClearScreen),
                0x00ee => Some(Return),
                // 0NNN machine-language calls are not supported
                _ => None,
            },
            0x1 => Some(Jump(nnn)),
            0x2 => Some(Call(nnn)),
            0x3 => Some(SkipEqVal(x, nn)),
            0x4 => Some(SkipNeVal(x, nn)),
            0x5 if n == 0 => Some(SkipEqReg(x, y)),
            0x6 => Some(LoadVal(x, nn)),
            0x7 => Some(AddVal(x, nn)),
            0x8 => match word & 0xf {
                0x0 => Some(Copy(x, y)),
                0x1 => Some(Or(x, y)),
                0x2 => Some(And(x, y)),
                0x3 => Some(Xor(x, y)),
                0x4 => Some(AddReg(x, y)),
                0x5 => Some(SubXY(x, y)),
                0x6 => Some(ShiftRight(x, y)),
                0x7 => Some(SubYX(x, y)),
                0xe => Some(ShiftLeft(x, y)),
                _ => None,
            },
            0x9 if n == 0 => Some(SkipNeReg(x, y)),
            0xa => Some(SetIndex(nnn)),
            0xb => Some(JumpOffset(nnn)),
            0xc => Some(Random(x, nn)),
            0xd => Some(Draw(x, y, n)),
            0xe => match nn {
                0x9e => Some(SkipKeyDown(x)),
                0xa1 => Some(SkipKeyUp(x)),
                _ => None,
            },
            0xf => match nn {
                0x07 => Some(ReadDelay(x)),
                0x0a => Some(WaitKey(x)),
                0x15 => Some(WriteDelay(x)),
                0x18 => Some(WriteSound(x)),
                0x1e => Some(AddIndex(x)),
                0x29 => Some(FontChar(x)),
                0x33 => Some(BcdSplit(x)),
                0x55 => Some(StoreRegs(x)),
                0x65 => Some(LoadRegs(x)),
                _ => None,
            },
            _ => None,
        }
    }
}

/// RAM addresses are 12-bit; index arithmetic wraps into that space
const ADDR_MASK: usize = MEMORY_SIZE - 1;

pub struct Chip8Interpreter {
    quirks: Quirks,
    rng: StdRng,
}

impl Chip8Interpreter {
    pub fn new(quirks: Quirks) -> Self {
        Chip8Interpreter {
            quirks,
            rng: StdRng::from_entropy(),
        }
    }

    /// fixed RNG seed, for deterministic tests
    pub fn with_seed(quirks: Quirks, seed: u64) -> Self {
        Chip8Interpreter {
            quirks,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Run one tick. A halted machine ignores ticks. On a fatal condition
    /// the machine is halted first and the error returned, so callers can
    /// still inspect the state.
    pub fn tick(&mut self, m: &mut Machine) -> Result<(), ExecError> {
        if m.halted {
            return Ok(());
        }
        let addr = m.pc;
        if addr as usize + 1 >= MEMORY_SIZE {
            m.halted = true;
            return Err(ExecError::PcOutOfBounds { pc: addr });
        }
        let word =
            (u16::from(m.memory[addr as usize]) << 8) | u16::from(m.memory[addr as usize + 1]);
        m.pc += 2;
        match Instruction::decode(word) {
            Some(instruction) => {
                log::trace!("{:#06x}: {:04x} {:?}", addr, word, instruction);
                self.execute(m, addr, instruction)
            }
            None => {
                m.halted = true;
                Err(ExecError::UnknownOpcode { addr, word })
            }
        }
    }

    fn execute(
        &mut self,
        m: &mut Machine,
        addr: u16,
        instruction: Instruction,
    ) -> Result<(), ExecError> {
        use Instruction::*;
        match instruction {
            ClearScreen => {
                m.display = [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
                m.draw_flag = true;
            }
            Return => {
                if m.sp == 0 {
                    // quirk-tolerant: some ROMs return from nowhere
                    log::warn!("return with empty stack at {:#06x}; ignored", addr);
                } else {
                    m.sp -= 1;
                    m.pc = m.stack[m.sp as usize];
                }
            }
            Jump(nnn) => m.pc = nnn,
            Call(nnn) => {
                if m.sp as usize == STACK_SIZE {
                    m.halted = true;
                    return Err(ExecError::StackOverflow { addr });
                }
                m.stack[m.sp as usize] = m.pc;
                m.sp += 1;
                m.pc = nnn;
            }
            SkipEqVal(x, nn) => {
                if m.v[x] == nn {
                    m.pc += 2;
                }
            }
            SkipNeVal(x, nn) => {
                if m.v[x] != nn {
                    m.pc += 2;
                }
            }
            SkipEqReg(x, y) => {
                if m.v[x] == m.v[y] {
                    m.pc += 2;
                }
            }
            SkipNeReg(x, y) => {
                if m.v[x] != m.v[y] {
                    m.pc += 2;
                }
            }
            LoadVal(x, nn) => m.v[x] = nn,
            AddVal(x, nn) => m.v[x] = m.v[x].wrapping_add(nn),
            Copy(x, y) => m.v[x] = m.v[y],
            Or(x, y) => {
                m.v[x] |= m.v[y];
                if self.quirks.vf_reset {
                    m.v[0xf] = 0;
                }
            }
            And(x, y) => {
                m.v[x] &= m.v[y];
                if self.quirks.vf_reset {
                    m.v[0xf] = 0;
                }
            }
            Xor(x, y) => {
                m.v[x] ^= m.v[y];
                if self.quirks.vf_reset {
                    m.v[0xf] = 0;
                }
            }
            AddReg(x, y) => {
                let sum = u16::from(m.v[x]) + u16::from(m.v[y]);
                m.v[x] = sum as u8;
                m.v[0xf] = u8::from(sum > 0xff);
            }
            SubXY(x, y) => {
                // no borrow => 1
                let flag = u8::from(m.v[y] <= m.v[x]);
                m.v[x] = m.v[x].wrapping_sub(m.v[y]);
                m.v[0xf] = flag;
            }
            SubYX(x, y) => {
                let flag = u8::from(m.v[x] <= m.v[y]);
                m.v[x] = m.v[y].wrapping_sub(m.v[x]);
                m.v[0xf] = flag;
            }
            ShiftRight(x, y) => {
                if self.quirks.shift_swap {
                    m.v[x] = m.v[y];
                }
                let flag = m.v[x] & 1;
                m.v[x] >>= 1;
                m.v[0xf] = flag;
            }
            ShiftLeft(x, y) => {
                if self.quirks.shift_swap {
                    m.v[x] = m.v[y];
                }
                let flag = (m.v[x] & 0x80) >> 7;
                m.v[x] <<= 1;
                m.v[0xf] = flag;
            }
            SetIndex(nnn) => m.i = nnn,
            JumpOffset(nnn) => {
                if self.quirks.jump_x {
                    let x = (nnn >> 8) as usize;
                    m.pc = (nnn & 0xff) + u16::from(m.v[x]);
                } else {
                    m.pc = nnn + u16::from(m.v[0]);
                }
            }
            Random(x, nn) => m.v[x] = self.rng.gen::<u8>() & nn,
            Draw(x, y, n) => self.draw(m, x, y, n),
            SkipKeyDown(x) => {
                if m.keys[(m.v[x] & 0xf) as usize] {
                    m.pc += 2;
                }
            }
            SkipKeyUp(x) => {
                if !m.keys[(m.v[x] & 0xf) as usize] {
                    m.pc += 2;
                }
            }
            ReadDelay(x) => m.v[x] = m.delay_timer,
            WriteDelay(x) => m.delay_timer = m.v[x],
            WriteSound(x) => m.sound_timer = m.v[x],
            AddIndex(x) => m.i = m.i.wrapping_add(u16::from(m.v[x])),
            WaitKey(x) => {
                // lowest held key wins; otherwise rewind and re-fetch this
                // same instruction next tick (cooperative busy-wait)
                match (0..16).find(|&k| m.keys[k]) {
                    Some(k) => m.v[x] = k as u8,
                    None => m.pc -= 2,
                }
            }
            FontChar(x) => m.i = u16::from(m.v[x] & 0xf) * 5,
            BcdSplit(x) => {
                let i = m.i as usize;
                m.memory[i & ADDR_MASK] = m.v[x] / 100;
                m.memory[(i + 1) & ADDR_MASK] = (m.v[x] / 10) % 10;
                m.memory[(i + 2) & ADDR_MASK] = m.v[x] % 10;
            }
            StoreRegs(x) => {
                for k in 0..=x {
                    if self.quirks.memory_incr {
                        m.memory[m.i as usize & ADDR_MASK] = m.v[k];
                        m.i = m.i.wrapping_add(1);
                    } else {
                        m.memory[(m.i as usize + k) & ADDR_MASK] = m.v[k];
                    }
                }
            }
            LoadRegs(x) => {
                for k in 0..=x {
                    if self.quirks.memory_incr {
                        m.v[k] = m.memory[m.i as usize & ADDR_MASK];
                        m.i = m.i.wrapping_add(1);
                    } else {
                        m.v[k] = m.memory[(m.i as usize + k) & ADDR_MASK];
                    }
                }
            }
        }
        Ok(())
    }

    /// DXYN. Start coordinates wrap; rows and row bits clip at the edge.
    /// Lit sprite bits XOR into the grid, collisions set v[0xf], and the
    /// draw flag goes up even when no pixel changed.
    fn draw(&mut self, m: &mut Machine, x: usize, y: usize, n: usize) {
        let x0 = m.v[x] as usize % DISPLAY_WIDTH;
        let y0 = m.v[y] as usize % DISPLAY_HEIGHT;
        m.v[0xf] = 0;
        for j in 0..n {
            let row = y0 + j;
            if row >= DISPLAY_HEIGHT {
                break;
            }
            let sprite = m.memory[(m.i as usize + j) & ADDR_MASK];
            for b in 0..8 {
                let col = x0 + b;
                if col >= DISPLAY_WIDTH {
                    break;
                }
                if sprite & (0x80 >> b) != 0 {
                    if m.display[row][col] == 1 {
                        m.v[0xf] = 1;
                    }
                    m.display[row][col] ^= 1;
                }
            }
        }
        m.draw_flag = true;
    }
}

#[cfg(test)]
mod tests {
    use super::Instruction::*;
    use super::*;
    use crate::machine::Machine;

    fn machine() -> Machine {
        Machine::new(&[0x00, 0xe0]).unwrap()
    }

    fn interpreter() -> Chip8Interpreter {
        Chip8Interpreter::with_seed(Quirks::default(), 1)
    }

    fn quirky(quirks: Quirks) -> Chip8Interpreter {
        Chip8Interpreter::with_seed(quirks, 1)
    }

    /// poke `word` at the current pc and run one tick
    fn step(m: &mut Machine, cpu: &mut Chip8Interpreter, word: u16) -> Result<(), ExecError> {
        let pc = m.pc as usize;
        m.memory[pc] = (word >> 8) as u8;
        m.memory[pc + 1] = word as u8;
        cpu.tick(m)
    }

    #[test]
    fn test_decode_covers_every_family() {
        let cases = [
            (0x00e0, ClearScreen),
            (0x00ee, Return),
            (0x1234, Jump(0x234)),
            (0x2456, Call(0x456)),
            (0x342a, SkipEqVal(4, 0x2a)),
            (0x4a75, SkipNeVal(0xa, 0x75)),
            (0x5ae0, SkipEqReg(0xa, 0xe)),
            (0x9990, SkipNeReg(9, 9)),
            (0x63f5, LoadVal(3, 0xf5)),
            (0x7b12, AddVal(0xb, 0x12)),
            (0x8590, Copy(5, 9)),
            (0x8101, Or(1, 0)),
            (0x8642, And(6, 4)),
            (0x87f3, Xor(7, 0xf)),
            (0x8264, AddReg(2, 6)),
            (0x8c45, SubXY(0xc, 4)),
            (0x8136, ShiftRight(1, 3)),
            (0x86d7, SubYX(6, 0xd)),
            (0x8e2e, ShiftLeft(0xe, 2)),
            (0xa568, SetIndex(0x568)),
            (0xbabc, JumpOffset(0xabc)),
            (0xc5af, Random(5, 0xaf)),
            (0xd7b4, Draw(7, 0xb, 4)),
            (0xe49e, SkipKeyDown(4)),
            (0xeca1, SkipKeyUp(0xc)),
            (0xf907, ReadDelay(9)),
            (0xfd0a, WaitKey(0xd)),
            (0xf315, WriteDelay(3)),
            (0xf718, WriteSound(7)),
            (0xf91e, AddIndex(9)),
            (0xff29, FontChar(0xf)),
            (0xf533, BcdSplit(5)),
            (0xf655, StoreRegs(6)),
            (0xf865, LoadRegs(8)),
        ];
        for (word, instruction) in cases {
            assert_eq!(Instruction::decode(word), Some(instruction), "{:04x}", word);
        }
    }

    #[test]
    fn test_decode_rejects_junk() {
        for word in [
            0x0000, 0x0123, 0x00e1, 0x5ab1, 0x8ab8, 0x8abf, 0x9ab1, 0xe000, 0xe49f, 0xf000,
            0xf101, 0xff66, 0xffff,
        ] {
            assert_eq!(Instruction::decode(word), None, "{:04x}", word);
        }
    }

    #[test]
    fn test_unknown_opcode_halts_and_reports() {
        let mut m = machine();
        let mut cpu = interpreter();
        let err = step(&mut m, &mut cpu, 0xffff).unwrap_err();
        assert_eq!(
            err,
            ExecError::UnknownOpcode {
                addr: 0x200,
                word: 0xffff
            }
        );
        assert!(m.halted);
        // halted machines ignore further ticks
        assert!(cpu.tick(&mut m).is_ok());
        assert_eq!(m.pc, 0x202);
    }

    #[test]
    fn test_fetch_off_the_end_halts() {
        let mut m = machine();
        let mut cpu = interpreter();
        m.pc = 0x0fff;
        let err = cpu.tick(&mut m).unwrap_err();
        assert_eq!(err, ExecError::PcOutOfBounds { pc: 0x0fff });
        assert!(m.halted);
    }

    #[test]
    fn test_clear_screen() {
        let mut m = machine();
        let mut cpu = interpreter();
        m.display[5][20] = 1;
        m.display[31][63] = 1;
        step(&mut m, &mut cpu, 0x00e0).unwrap();
        assert!(m.display.iter().all(|row| row.iter().all(|&px| px == 0)));
        assert!(m.draw_flag);
    }

    #[test]
    fn test_call_then_return_round_trips() {
        let mut m = machine();
        let mut cpu = interpreter();
        step(&mut m, &mut cpu, 0x2400).unwrap();
        assert_eq!(m.pc, 0x400);
        assert_eq!(m.sp, 1);
        assert_eq!(m.stack[0], 0x202);
        step(&mut m, &mut cpu, 0x00ee).unwrap();
        assert_eq!(m.pc, 0x202);
        assert_eq!(m.sp, 0);
    }

    #[test]
    fn test_return_with_empty_stack_is_a_noop() {
        let mut m = machine();
        let mut cpu = interpreter();
        step(&mut m, &mut cpu, 0x00ee).unwrap();
        assert!(!m.halted);
        assert_eq!(m.pc, 0x202);
        assert_eq!(m.sp, 0);
    }

    #[test]
    fn test_seventeenth_nested_call_overflows() {
        let mut m = machine();
        let mut cpu = interpreter();
        // 0x200: call 0x200, forever
        for _ in 0..16 {
            m.pc = 0x200;
            step(&mut m, &mut cpu, 0x2200).unwrap();
        }
        assert_eq!(m.sp, 16);
        m.pc = 0x200;
        let err = step(&mut m, &mut cpu, 0x2200).unwrap_err();
        assert_eq!(err, ExecError::StackOverflow { addr: 0x200 });
        assert!(m.halted);
        assert_eq!(m.sp, 16);
    }

    #[test]
    fn test_skips() {
        let mut m = machine();
        let mut cpu = interpreter();
        m.v[4] = 0x2a;
        m.v[5] = 0x2a;
        m.v[6] = 0x2b;
        for (word, taken) in [
            (0x342au16, true),
            (0x342b, false),
            (0x442a, false),
            (0x442b, true),
            (0x5450, true),
            (0x5460, false),
            (0x9450, false),
            (0x9460, true),
        ] {
            m.pc = 0x200;
            step(&mut m, &mut cpu, word).unwrap();
            assert_eq!(m.pc, if taken { 0x204 } else { 0x202 }, "{:04x}", word);
        }
    }

    #[test]
    fn test_load_and_add_immediate() {
        let mut m = machine();
        let mut cpu = interpreter();
        step(&mut m, &mut cpu, 0x63f0).unwrap();
        assert_eq!(m.v[3], 0xf0);
        // wraps with no flag change
        m.v[0xf] = 7;
        step(&mut m, &mut cpu, 0x7320).unwrap();
        assert_eq!(m.v[3], 0x10);
        assert_eq!(m.v[0xf], 7);
    }

    #[test]
    fn test_add_regs_carry() {
        let mut m = machine();
        let mut cpu = interpreter();
        m.v[1] = 200;
        m.v[2] = 100;
        step(&mut m, &mut cpu, 0x8124).unwrap();
        assert_eq!(m.v[1], 44);
        assert_eq!(m.v[0xf], 1);

        m.pc = 0x200;
        m.v[1] = 200;
        m.v[2] = 55;
        step(&mut m, &mut cpu, 0x8124).unwrap();
        assert_eq!(m.v[1], 255);
        assert_eq!(m.v[0xf], 0);
    }

    #[test]
    fn test_sub_borrow() {
        let mut m = machine();
        let mut cpu = interpreter();
        m.v[1] = 10;
        m.v[2] = 20;
        step(&mut m, &mut cpu, 0x8125).unwrap();
        assert_eq!(m.v[1], 246);
        assert_eq!(m.v[0xf], 0);

        // no borrow => flag 1
        m.pc = 0x200;
        m.v[1] = 20;
        m.v[2] = 20;
        step(&mut m, &mut cpu, 0x8125).unwrap();
        assert_eq!(m.v[1], 0);
        assert_eq!(m.v[0xf], 1);
    }

    #[test]
    fn test_sub_reversed() {
        let mut m = machine();
        let mut cpu = interpreter();
        m.v[1] = 10;
        m.v[2] = 20;
        step(&mut m, &mut cpu, 0x8127).unwrap();
        assert_eq!(m.v[1], 10);
        assert_eq!(m.v[0xf], 1);

        m.pc = 0x200;
        m.v[1] = 20;
        m.v[2] = 10;
        step(&mut m, &mut cpu, 0x8127).unwrap();
        assert_eq!(m.v[1], 246);
        assert_eq!(m.v[0xf], 0);
    }

    #[test]
    fn test_logic_ops_leave_vf_alone_by_default() {
        let mut m = machine();
        let mut cpu = interpreter();
        m.v[0xf] = 1;
        m.v[1] = 0b1010;
        m.v[2] = 0b0110;
        step(&mut m, &mut cpu, 0x8121).unwrap();
        assert_eq!(m.v[1], 0b1110);
        assert_eq!(m.v[0xf], 1);
    }

    #[test]
    fn test_logic_ops_reset_vf_with_quirk() {
        let mut m = machine();
        let mut cpu = quirky(Quirks {
            vf_reset: true,
            ..Quirks::default()
        });
        for word in [0x8121u16, 0x8122, 0x8123] {
            m.pc = 0x200;
            m.v[0xf] = 1;
            step(&mut m, &mut cpu, word).unwrap();
            assert_eq!(m.v[0xf], 0, "{:04x}", word);
        }
    }

    #[test]
    fn test_shift_right() {
        let mut m = machine();
        let mut cpu = interpreter();
        m.v[1] = 0b0000_0101;
        m.v[2] = 0xff; // ignored without the quirk
        step(&mut m, &mut cpu, 0x8126).unwrap();
        assert_eq!(m.v[1], 0b0000_0010);
        assert_eq!(m.v[0xf], 1);
    }

    #[test]
    fn test_shift_left() {
        let mut m = machine();
        let mut cpu = interpreter();
        m.v[1] = 0b1100_0000;
        step(&mut m, &mut cpu, 0x812e).unwrap();
        assert_eq!(m.v[1], 0b1000_0000);
        assert_eq!(m.v[0xf], 1);
    }

    #[test]
    fn test_shift_swap_quirk_copies_vy_first() {
        let mut m = machine();
        let mut cpu = quirky(Quirks {
            shift_swap: true,
            ..Quirks::default()
        });
        m.v[1] = 0xff;
        m.v[2] = 0b0000_0100;
        step(&mut m, &mut cpu, 0x8126).unwrap();
        assert_eq!(m.v[1], 0b0000_0010);
        assert_eq!(m.v[0xf], 0);

        m.pc = 0x200;
        m.v[1] = 0;
        m.v[2] = 0b1000_0001;
        step(&mut m, &mut cpu, 0x812e).unwrap();
        assert_eq!(m.v[1], 0b0000_0010);
        assert_eq!(m.v[0xf], 1);
    }

    #[test]
    fn test_jump_and_set_index() {
        let mut m = machine();
        let mut cpu = interpreter();
        step(&mut m, &mut cpu, 0x1abc).unwrap();
        assert_eq!(m.pc, 0xabc);
        m.pc = 0x200;
        step(&mut m, &mut cpu, 0xa123).unwrap();
        assert_eq!(m.i, 0x123);
    }

    #[test]
    fn test_jump_offset_uses_v0_by_default() {
        let mut m = machine();
        let mut cpu = interpreter();
        m.v[0] = 0x10;
        m.v[2] = 0x99;
        step(&mut m, &mut cpu, 0xb234).unwrap();
        assert_eq!(m.pc, 0x244);
    }

    #[test]
    fn test_jump_offset_quirk_uses_vx() {
        let mut m = machine();
        let mut cpu = quirky(Quirks {
            jump_x: true,
            ..Quirks::default()
        });
        m.v[0] = 0x99;
        m.v[2] = 0x10;
        step(&mut m, &mut cpu, 0xb234).unwrap();
        assert_eq!(m.pc, 0x44);
    }

    #[test]
    fn test_random_is_masked() {
        let mut m = machine();
        let mut cpu = interpreter();
        step(&mut m, &mut cpu, 0xc100).unwrap();
        assert_eq!(m.v[1], 0);
        for _ in 0..32 {
            m.pc = 0x200;
            step(&mut m, &mut cpu, 0xc10f).unwrap();
            assert_eq!(m.v[1] & 0xf0, 0);
        }
    }

    #[test]
    fn test_random_is_deterministic_under_a_seed() {
        let mut m1 = machine();
        let mut m2 = machine();
        let mut a = Chip8Interpreter::with_seed(Quirks::default(), 42);
        let mut b = Chip8Interpreter::with_seed(Quirks::default(), 42);
        for _ in 0..8 {
            m1.pc = 0x200;
            m2.pc = 0x200;
            step(&mut m1, &mut a, 0xc1ff).unwrap();
            step(&mut m2, &mut b, 0xc1ff).unwrap();
            assert_eq!(m1.v[1], m2.v[1]);
        }
    }

    #[test]
    fn test_draw_sets_collision_on_second_pass() {
        let mut m = machine();
        let mut cpu = interpreter();
        m.i = 0x300;
        m.memory[0x300] = 0xff;
        m.v[0] = 8;
        m.v[1] = 4;
        step(&mut m, &mut cpu, 0xd011).unwrap();
        assert_eq!(m.v[0xf], 0);
        assert!(m.draw_flag);
        assert!(m.display[4][8..16].iter().all(|&px| px == 1));

        // same sprite again: everything toggles off, collision reported
        m.pc = 0x200;
        m.draw_flag = false;
        step(&mut m, &mut cpu, 0xd011).unwrap();
        assert_eq!(m.v[0xf], 1);
        assert!(m.draw_flag);
        assert!(m.display[4][8..16].iter().all(|&px| px == 0));
    }

    #[test]
    fn test_draw_clips_at_the_right_edge() {
        let mut m = machine();
        let mut cpu = interpreter();
        m.i = 0x300;
        m.memory[0x300] = 0xff;
        m.v[0] = 60;
        m.v[1] = 0;
        step(&mut m, &mut cpu, 0xd011).unwrap();
        assert!(m.display[0][60..64].iter().all(|&px| px == 1));
        // no wraparound onto the left edge
        assert!(m.display[0][0..4].iter().all(|&px| px == 0));
    }

    #[test]
    fn test_draw_clips_at_the_bottom() {
        let mut m = machine();
        let mut cpu = interpreter();
        m.i = 0x300;
        for j in 0..5 {
            m.memory[0x300 + j] = 0x80;
        }
        m.v[0] = 0;
        m.v[1] = 31;
        step(&mut m, &mut cpu, 0xd015).unwrap();
        assert_eq!(m.display[31][0], 1);
        // rows 32.. don't exist and don't wrap to the top
        assert!(m.display[0..4].iter().all(|row| row[0] == 0));
    }

    #[test]
    fn test_draw_start_coordinates_wrap() {
        let mut m = machine();
        let mut cpu = interpreter();
        m.i = 0x300;
        m.memory[0x300] = 0x80;
        m.v[0] = 64 + 3;
        m.v[1] = 32 + 2;
        step(&mut m, &mut cpu, 0xd011).unwrap();
        assert_eq!(m.display[2][3], 1);
    }

    #[test]
    fn test_draw_flag_rises_even_without_lit_bits() {
        let mut m = machine();
        let mut cpu = interpreter();
        m.i = 0x300; // all-zero sprite
        step(&mut m, &mut cpu, 0xd011).unwrap();
        assert!(m.draw_flag);
        assert_eq!(m.v[0xf], 0);
    }

    #[test]
    fn test_key_skips() {
        let mut m = machine();
        let mut cpu = interpreter();
        m.v[1] = 0xb;
        m.keys[0xb] = true;
        step(&mut m, &mut cpu, 0xe19e).unwrap();
        assert_eq!(m.pc, 0x204);

        m.pc = 0x200;
        step(&mut m, &mut cpu, 0xe1a1).unwrap();
        assert_eq!(m.pc, 0x202);

        m.keys[0xb] = false;
        m.pc = 0x200;
        step(&mut m, &mut cpu, 0xe1a1).unwrap();
        assert_eq!(m.pc, 0x204);
    }

    #[test]
    fn test_wait_key_rewinds_until_a_key_arrives() {
        let mut m = machine();
        let mut cpu = interpreter();
        step(&mut m, &mut cpu, 0xf30a).unwrap();
        // rolled back: same instruction refetches next tick
        assert_eq!(m.pc, 0x200);
        cpu.tick(&mut m).unwrap();
        assert_eq!(m.pc, 0x200);

        // lowest held key wins
        m.keys[7] = true;
        m.keys[3] = true;
        cpu.tick(&mut m).unwrap();
        assert_eq!(m.pc, 0x202);
        assert_eq!(m.v[3], 3);
    }

    #[test]
    fn test_timer_transfer() {
        let mut m = machine();
        let mut cpu = interpreter();
        m.v[1] = 42;
        step(&mut m, &mut cpu, 0xf115).unwrap();
        assert_eq!(m.delay_timer, 42);
        m.pc = 0x200;
        step(&mut m, &mut cpu, 0xf118).unwrap();
        assert_eq!(m.sound_timer, 42);
        m.pc = 0x200;
        m.delay_timer = 17;
        step(&mut m, &mut cpu, 0xf207).unwrap();
        assert_eq!(m.v[2], 17);
    }

    #[test]
    fn test_add_to_index() {
        let mut m = machine();
        let mut cpu = interpreter();
        m.i = 0xfff;
        m.v[1] = 2;
        step(&mut m, &mut cpu, 0xf11e).unwrap();
        assert_eq!(m.i, 0x1001);
    }

    #[test]
    fn test_font_char_addresses() {
        let mut m = machine();
        let mut cpu = interpreter();
        m.v[1] = 0x0a;
        step(&mut m, &mut cpu, 0xf129).unwrap();
        assert_eq!(m.i, 50);
        // only the low nibble counts
        m.pc = 0x200;
        m.v[1] = 0x1f;
        step(&mut m, &mut cpu, 0xf129).unwrap();
        assert_eq!(m.i, 75);
    }

    #[test]
    fn test_bcd_split() {
        let mut m = machine();
        let mut cpu = interpreter();
        m.v[1] = 157;
        m.i = 0x300;
        step(&mut m, &mut cpu, 0xf133).unwrap();
        assert_eq!(&m.memory[0x300..0x303], &[1, 5, 7]);
    }

    #[test]
    fn test_store_and_load_regs() {
        let mut m = machine();
        let mut cpu = interpreter();
        for k in 0..4 {
            m.v[k] = 10 + k as u8;
        }
        m.i = 0x300;
        step(&mut m, &mut cpu, 0xf355).unwrap();
        assert_eq!(&m.memory[0x300..0x304], &[10, 11, 12, 13]);
        assert_eq!(m.i, 0x300);

        m.pc = 0x200;
        m.v = [0; 16];
        step(&mut m, &mut cpu, 0xf365).unwrap();
        assert_eq!(&m.v[0..4], &[10, 11, 12, 13]);
        assert_eq!(m.i, 0x300);
    }

    #[test]
    fn test_store_regs_walks_index_with_quirk() {
        let mut m = machine();
        let mut cpu = quirky(Quirks {
            memory_incr: true,
            ..Quirks::default()
        });
        m.v[0] = 5;
        m.v[1] = 6;
        m.i = 0x300;
        step(&mut m, &mut cpu, 0xf155).unwrap();
        assert_eq!(&m.memory[0x300..0x302], &[5, 6]);
        assert_eq!(m.i, 0x302);

        m.pc = 0x200;
        m.i = 0x300;
        m.v = [0; 16];
        step(&mut m, &mut cpu, 0xf165).unwrap();
        assert_eq!(&m.v[0..2], &[5, 6]);
        assert_eq!(m.i, 0x302);
    }
}
