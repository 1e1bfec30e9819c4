use crate::machine::Keys;
use crossterm::event::{poll, read, Event, KeyCode, KeyModifiers};
use crossterm::terminal;
use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};

/// the usual left-hand-of-qwerty layout:
///
///   1 2 3 4        1 2 3 C
///   q w e r   =>   4 5 6 D
///   a s d f        7 8 9 E
///   z x c v        A 0 B F
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('q', 0x04),
    ('w', 0x05),
    ('e', 0x06),
    ('a', 0x07),
    ('s', 0x08),
    ('d', 0x09),
    ('z', 0x0a),
    ('c', 0x0b),
    ('4', 0x0c),
    ('r', 0x0d),
    ('f', 0x0e),
    ('v', 0x0f),
];

/// terminals deliver presses, never releases, so a pressed key counts as
/// held for this long after its last event
const KEY_HOLD: Duration = Duration::from_millis(150);

/// Input is sampled by the run loop exactly once per iteration: an owned
/// 16-flag snapshot, plus a latched quit signal (Esc / ctrl-c).
pub trait Input {
    fn snapshot(&mut self) -> Result<Keys, io::Error>;

    fn quit_requested(&self) -> bool;
}

/// reads the terminal keyboard via crossterm events
pub struct TermInput {
    keymap: HashMap<char, u8>,
    held_until: [Option<Instant>; 16],
    quit: bool,
}

impl TermInput {
    pub fn new() -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(TermInput {
            keymap: HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
            held_until: [None; 16],
            quit: false,
        })
    }

    fn pump(&mut self) -> Result<(), io::Error> {
        while poll(Duration::from_millis(0))? {
            if let Event::Key(evt) = read()? {
                match evt.code {
                    KeyCode::Esc => self.quit = true,
                    KeyCode::Char('c') if evt.modifiers.contains(KeyModifiers::CONTROL) => {
                        self.quit = true;
                    }
                    KeyCode::Char(key) => match self.keymap.get(&key) {
                        Some(&mapped) => {
                            self.held_until[mapped as usize] = Some(Instant::now() + KEY_HOLD);
                        }
                        None => log::warn!("no CHIP-8 key bound to {:?}", key),
                    },
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

impl Drop for TermInput {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

impl Input for TermInput {
    fn snapshot(&mut self) -> Result<Keys, io::Error> {
        self.pump()?;
        let now = Instant::now();
        let mut keys = [false; 16];
        for (key, deadline) in self.held_until.iter().enumerate() {
            keys[key] = matches!(deadline, Some(d) if *d > now);
        }
        Ok(keys)
    }

    fn quit_requested(&self) -> bool {
        self.quit
    }
}

/// scripted Input for tests: a fixed set of held keys and an optional
/// quit after so many snapshots
pub struct DummyInput {
    keys: Keys,
    quit_after: usize,
    polls: usize,
}

impl DummyInput {
    pub fn new(held: &[u8]) -> Self {
        let mut keys = [false; 16];
        for &key in held {
            keys[key as usize] = true;
        }
        DummyInput {
            keys,
            quit_after: usize::MAX,
            polls: 0,
        }
    }

    pub fn quit_after(mut self, polls: usize) -> Self {
        self.quit_after = polls;
        self
    }
}

impl Input for DummyInput {
    fn snapshot(&mut self) -> Result<Keys, io::Error> {
        self.polls += 1;
        Ok(self.keys)
    }

    fn quit_requested(&self) -> bool {
        self.polls >= self.quit_after
    }
}
