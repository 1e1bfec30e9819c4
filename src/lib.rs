///
/// ## Design
///
/// * plain CHIP-8 only: no SUPER-CHIP or XO-CHIP opcodes, but the four
///   well-known behavioural quirks are startup configuration
/// * instruction throughput is decoupled from timer decay (fixed 60Hz) and
///   from frame presentation (only when the machine flags a redraw)
/// * abstract display/input/sound behind traits so alternatives can be
///   plugged in; shipping with a TUI in-console set
///
/// Pieces:
///
/// * machine state
///    - one mutable aggregate: RAM, display grid, registers, stack, timers,
///      key snapshot
///    - created once from a ROM image, mutated only by the interpreter,
///      inspectable after a halt
/// * interpreter
///    - pub .tick() -- one fetch/decode/execute cycle against the machine
///    - decode produces a closed Instruction enum; execution is a single
///      exhaustive match over it
///    - unknown encodings halt the machine and report the word, never skip
/// * scheduler
///    - converts elapsed wall-clock time into "run n cycles, decay timers
///      m times" with no clock of its own, so it unit-tests cleanly
/// * runtime
///    - owns machine + interpreter + scheduler; runs the main loop
///    - per iteration: sample quit/keys, advance the scheduler, decay
///      timers, execute cycles, present if the draw flag is up, sleep
/// * display, input and sound devices, each a trait with a terminal-backed
///   implementation and a dummy/mute one for tests
pub mod display;
pub mod error;
pub mod input;
pub mod interpreter;
pub mod machine;
pub mod scheduler;
pub mod sound;
