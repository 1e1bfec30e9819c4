use beep::beep;
use std::error::Error;

/// driven by the sound timer: beep while it's above zero, stop when it
/// hits the floor
pub trait Sound {
    fn beep(&mut self) -> Result<(), Box<dyn Error>>;
    fn stop(&mut self) -> Result<(), Box<dyn Error>>;
}

const SIMPLEBEEP_PITCH: u16 = 2093; // C

/// a single square-wave tone; tracks its own state so the run loop can
/// call it every iteration without hammering the device
pub struct SimpleBeep {
    is_beeping: bool,
}

impl SimpleBeep {
    pub fn new() -> Self {
        SimpleBeep { is_beeping: false }
    }
}

impl Default for SimpleBeep {
    fn default() -> Self {
        Self::new()
    }
}

impl Sound for SimpleBeep {
    fn beep(&mut self) -> Result<(), Box<dyn Error>> {
        if !self.is_beeping {
            beep(SIMPLEBEEP_PITCH)?;
            self.is_beeping = true;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        if self.is_beeping {
            beep(0)?;
            self.is_beeping = false;
        }
        Ok(())
    }
}

pub struct Mute {}

impl Mute {
    pub fn new() -> Self {
        Mute {}
    }
}

impl Sound for Mute {
    fn beep(&mut self) -> Result<(), Box<dyn Error>> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        Ok(())
    }
}
