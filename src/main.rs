use std::env;
use std::error::Error;
use std::fs;

use chip8vm::display::MonoTermDisplay;
use chip8vm::error::LoadError;
use chip8vm::input::TermInput;
use chip8vm::interpreter::{Chip8Interpreter, Quirks};
use chip8vm::machine::Machine;
use chip8vm::scheduler::{Runtime, DEFAULT_CPU_HZ};
use chip8vm::sound::SimpleBeep;

const ROM_EXTENSION: &str = ".ch8";

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let path = rom_path_from_args(&env::args().skip(1).collect::<Vec<_>>())?;
    let rom = fs::read(&path).map_err(LoadError::Io)?;
    log::info!("read {} bytes from {}", rom.len(), path);

    let machine = Machine::new(&rom)?;
    let interpreter = Chip8Interpreter::new(Quirks::default());

    let mut display = MonoTermDisplay::new()?;
    let mut input = TermInput::new()?;
    let mut sound = SimpleBeep::new();
    let mut runtime = Runtime::new(
        machine,
        interpreter,
        DEFAULT_CPU_HZ,
        &mut display,
        &mut input,
        &mut sound,
    );

    let result = runtime.run();

    // shove some junk on stdout to stop the cli messing up the last frame
    for _ in 0..12 {
        println!();
    }
    result.map_err(Into::into)
}

/// exactly one ROM path; extra arguments only get a warning
fn rom_path_from_args(args: &[String]) -> Result<String, String> {
    let path = match args.first() {
        Some(p) => p.clone(),
        None => return Err(format!("usage: chip8vm <rom{}>", ROM_EXTENSION)),
    };
    if !path.ends_with(ROM_EXTENSION) {
        return Err(format!("{}: expected a {} file", path, ROM_EXTENSION));
    }
    if args.len() > 1 {
        log::warn!("ignoring {} extra argument(s)", args.len() - 1);
    }
    Ok(path)
}
