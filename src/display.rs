use crate::machine::{FrameBuffer, DISPLAY_HEIGHT, DISPLAY_WIDTH};
use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

/// Display is the presentation sink the run loop hands the 64x32 grid to
/// whenever the machine flags a redraw. It should abstract the
/// implementation details, so a variety of kinds of screen would work.
pub trait Display {
    fn draw(&mut self, frame: &FrameBuffer) -> Result<(), io::Error>;
}

// the two fixed colours, same phosphor-green-on-olive as ever
const COLOR_ON: Color = Color::Rgb(0x77, 0xff, 0x33);
const COLOR_OFF: Color = Color::Rgb(0x22, 0x35, 0x00);

/// canvas coordinates for every cell in the grid holding `lit`
fn plane(frame: &FrameBuffer, lit: u8) -> Vec<(f64, f64)> {
    let mut coords = Vec::new();
    for (y, row) in frame.iter().enumerate() {
        for (x, &px) in row.iter().enumerate() {
            if px == lit {
                // canvas y grows upward, the grid grows downward
                coords.push((x as f64, -(y as f64)));
            }
        }
    }
    coords
}

/// monochrome display in a terminal, rendered with a TUI canvas
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl MonoTermDisplay {
    pub fn new() -> Result<MonoTermDisplay, io::Error> {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        Ok(MonoTermDisplay { terminal })
    }
}

impl Display for MonoTermDisplay {
    fn draw(&mut self, frame: &FrameBuffer) -> Result<(), io::Error> {
        let lit = plane(frame, 1);
        let unlit = plane(frame, 0);
        self.terminal.draw(|f| {
            // 2 extra cells each way for the border
            let size = Rect::new(0, 0, 2 + DISPLAY_WIDTH as u16, 2 + DISPLAY_HEIGHT as u16);
            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("CHIP-8")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds([0.0, (DISPLAY_WIDTH - 1) as f64])
                .y_bounds([-((DISPLAY_HEIGHT - 1) as f64), 0.0])
                .marker(Marker::Block)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &unlit,
                        color: COLOR_OFF,
                    });
                    ctx.draw(&Points {
                        coords: &lit,
                        color: COLOR_ON,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }
}

/// counts frames and throws them away; useful for testing the run loop
pub struct DummyDisplay {
    pub frames: usize,
}

impl DummyDisplay {
    pub fn new() -> DummyDisplay {
        DummyDisplay { frames: 0 }
    }
}

impl Default for DummyDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for DummyDisplay {
    fn draw(&mut self, _frame: &FrameBuffer) -> Result<(), io::Error> {
        self.frames += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_splits_lit_from_unlit() {
        let mut frame: FrameBuffer = [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
        frame[0][0] = 1;
        frame[31][63] = 1;
        let lit = plane(&frame, 1);
        assert_eq!(lit, vec![(0.0, 0.0), (63.0, -31.0)]);
        assert_eq!(plane(&frame, 0).len(), DISPLAY_WIDTH * DISPLAY_HEIGHT - 2);
    }

    #[test]
    fn test_dummy_counts_frames() {
        let frame: FrameBuffer = [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
        let mut d = DummyDisplay::new();
        d.draw(&frame).unwrap();
        d.draw(&frame).unwrap();
        assert_eq!(d.frames, 2);
    }
}
