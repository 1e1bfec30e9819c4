/// # scheduler
///
/// Paces the machine against wall-clock time. Two independent rates:
///
/// * instruction ticks at a configurable logical clock (default 10kHz)
/// * timer decay at a fixed 60Hz, however fast or slow the CPU runs
///
/// `Scheduler` holds no clock of its own; callers feed it elapsed time and
/// it answers "run this many cycles, decay the timers this many times".
/// `Runtime` is the cooperative outer loop that owns the machine and drives
/// everything: input snapshot, scheduler, interpreter, sound, presentation.
use crate::display::Display;
use crate::error::Chip8Error;
use crate::input::Input;
use crate::interpreter::Chip8Interpreter;
use crate::machine::Machine;
use crate::sound::Sound;
use std::time::{Duration, Instant};

/// observed sweet spot for most ROMs; configurable per runtime
pub const DEFAULT_CPU_HZ: u32 = 10_000;

/// both timers decay at this fixed rate
pub const TIMER_HZ: u32 = 60;

/// cap on banked elapsed time, so a long stall (debugger, suspended
/// terminal) doesn't turn into a catch-up burst
const MAX_LAG: Duration = Duration::from_secs(1);

/// how long the outer loop sleeps between iterations
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// what one advance() earned: instruction cycles and 60Hz timer steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Steps {
    pub cycles: u32,
    pub timer_ticks: u32,
}

pub struct Scheduler {
    cycle_period: Duration,
    timer_period: Duration,
    cycle_bank: Duration,
    timer_bank: Duration,
}

impl Scheduler {
    pub fn new(cpu_hz: u32) -> Self {
        Scheduler {
            cycle_period: Duration::from_secs(1) / cpu_hz.max(1),
            timer_period: Duration::from_secs(1) / TIMER_HZ,
            cycle_bank: Duration::ZERO,
            timer_bank: Duration::ZERO,
        }
    }

    /// Bank `elapsed` and pay out whole cycles and timer ticks.
    pub fn advance(&mut self, elapsed: Duration) -> Steps {
        self.cycle_bank = (self.cycle_bank + elapsed).min(MAX_LAG);
        self.timer_bank = (self.timer_bank + elapsed).min(MAX_LAG);
        Steps {
            cycles: Self::drain(&mut self.cycle_bank, self.cycle_period),
            timer_ticks: Self::drain(&mut self.timer_bank, self.timer_period),
        }
    }

    fn drain(bank: &mut Duration, period: Duration) -> u32 {
        let steps = (bank.as_nanos() / period.as_nanos()) as u32;
        *bank -= period * steps;
        steps
    }
}

/// The outer run loop. Owns the machine; borrows the presentation, input
/// and sound collaborators as trait objects so tests can plug in dummies.
///
/// State machine is Running -> Halted, one-directional: the loop ends on
/// the machine's halted flag, a fatal interpreter error, or the external
/// quit signal. The machine stays inspectable afterwards either way.
pub struct Runtime<'a> {
    machine: Machine,
    interpreter: Chip8Interpreter,
    scheduler: Scheduler,
    display: &'a mut dyn Display,
    input: &'a mut dyn Input,
    sound: &'a mut dyn Sound,
}

impl<'a> Runtime<'a> {
    pub fn new(
        machine: Machine,
        interpreter: Chip8Interpreter,
        cpu_hz: u32,
        display: &'a mut dyn Display,
        input: &'a mut dyn Input,
        sound: &'a mut dyn Sound,
    ) -> Runtime<'a> {
        Runtime {
            machine,
            interpreter,
            scheduler: Scheduler::new(cpu_hz),
            display,
            input,
            sound,
        }
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn run(&mut self) -> Result<(), Chip8Error> {
        let mut last = Instant::now();
        while !self.machine.halted {
            // the quit signal is checked once per iteration, so the FX0A
            // busy-wait stays cancellable
            if self.input.quit_requested() {
                log::info!("quit requested");
                break;
            }

            // one key snapshot per iteration; immutable for all of this
            // iteration's instructions
            self.machine.keys = self.input.snapshot()?;

            let now = Instant::now();
            let steps = self.scheduler.advance(now - last);
            last = now;

            for _ in 0..steps.timer_ticks {
                self.machine.tick_timers();
            }
            let buzz = if self.machine.sound_timer > 0 {
                self.sound.beep()
            } else {
                self.sound.stop()
            };
            if let Err(e) = buzz {
                log::warn!("sound device: {}", e);
            }

            for _ in 0..steps.cycles {
                if let Err(e) = self.interpreter.tick(&mut self.machine) {
                    log::error!("{}", e);
                    return Err(e.into());
                }
                if self.machine.halted {
                    break;
                }
            }

            if self.machine.draw_flag {
                self.display.draw(&self.machine.display)?;
                self.machine.draw_flag = false;
            }

            spin_sleep::sleep(POLL_INTERVAL);
        }
        Ok(())
    }
}
