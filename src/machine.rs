use crate::error::LoadError;

// NB. addresses are u16 as per the chip-8; lengths are usize to stop endless casting

/// how much RAM we have
pub const MEMORY_SIZE: usize = 4096;

/// where programs are loaded, and everything below it belongs to the interpreter
pub const PROGRAM_ADDR: u16 = 0x0200;

/// the biggest ROM that fits between 0x200 and the end of RAM
pub const MAX_ROM_SIZE: usize = MEMORY_SIZE - PROGRAM_ADDR as usize;

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

/// call stack depth; the 17th nested call is an error
pub const STACK_SIZE: usize = 16;

/// the display grid, row-major, one byte per pixel holding 0 or 1
pub type FrameBuffer = [[u8; DISPLAY_WIDTH]; DISPLAY_HEIGHT];

/// one flag per hex key, true while held
pub type Keys = [bool; 16];

/// Whole state of a CHIP-8: RAM, display, registers, stack, timers and the
/// current key snapshot. Built once from a ROM image, mutated by the
/// interpreter one tick at a time, and left inspectable when halted.
pub struct Machine {
    pub memory: [u8; MEMORY_SIZE],
    pub display: FrameBuffer,
    /// general purpose registers; v[0xf] doubles as carry/borrow/collision
    pub v: [u8; 16],
    /// index register
    pub i: u16,
    /// program counter; always even, stepping by 2
    pub pc: u16,
    pub stack: [u16; STACK_SIZE],
    /// current stack depth, 0..=16
    pub sp: u8,
    pub delay_timer: u8,
    pub sound_timer: u8,
    /// key snapshot, refreshed by the outer loop; the interpreter only reads it
    pub keys: Keys,
    /// terminal; once set no further ticks execute
    pub halted: bool,
    /// edge-triggered "display changed"; the presentation side clears it
    pub draw_flag: bool,
}

impl Machine {
    /// Build a machine with the font glyphs at [0, 80), the ROM at 0x200 and
    /// the program counter pointing at its first instruction.
    pub fn new(rom: &[u8]) -> Result<Machine, LoadError> {
        if rom.is_empty() {
            return Err(LoadError::Empty);
        }
        if rom.len() > MAX_ROM_SIZE {
            return Err(LoadError::TooLarge {
                len: rom.len(),
                max: MAX_ROM_SIZE,
            });
        }

        let mut memory = [0u8; MEMORY_SIZE];
        memory[..FONT.len()].copy_from_slice(&FONT);
        let prog = PROGRAM_ADDR as usize;
        memory[prog..prog + rom.len()].copy_from_slice(rom);

        Ok(Machine {
            memory,
            display: [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
            v: [0; 16],
            i: 0,
            pc: PROGRAM_ADDR,
            stack: [0; STACK_SIZE],
            sp: 0,
            delay_timer: 0,
            sound_timer: 0,
            keys: [false; 16],
            halted: false,
            draw_flag: false,
        })
    }

    /// One 60Hz step: both timers count down independently and stop at 0.
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }
}

/// the standard 16-glyph hex font, 4x5 pixels, 5 bytes per glyph
pub const FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];
