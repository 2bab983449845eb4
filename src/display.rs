//! OLED status display
//!
//! Renders a single `<name>:    <rssi>` line on an SSD1306 128x64 panel over
//! I2C. The panel is a sink: if it fails to initialise the board keeps running
//! and rendering becomes a no-op.

use crate::{BoardError, config};
use core::fmt::Write;
use embedded_graphics::{
    mono_font::{MonoTextStyle, MonoTextStyleBuilder, ascii::FONT_6X10},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use heapless::String;
use log::{info, warn};
use ssd1306::{I2CDisplayInterface, Ssd1306, mode::BufferedGraphicsMode, prelude::*};

/// Longest rendered line: 32-byte name, separator, "-128"
pub const STATUS_LINE_LEN: usize = 48;

/// Text shown once the radio is up and no peer has spoken yet
pub const WAITING_TEXT: &str = "Waiting for communication...";

/// One display line, sanitised for the panel's ASCII font
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine(String<STATUS_LINE_LEN>);

impl StatusLine {
    pub fn new(name: &str, signal_strength: i8) -> Self {
        let mut line = String::new();
        for c in name.chars() {
            let c = if c.is_ascii_graphic() || c == ' ' { c } else { '?' };
            // Names are at most 32 chars; the buffer has room for all of them
            let _ = line.push(c);
        }
        let _ = write!(line, ":    {}", signal_strength);
        Self(line)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Minimal text surface: clear, draw, flush
pub trait TextPanel {
    fn init(&mut self) -> Result<(), BoardError>;
    fn clear(&mut self);
    fn draw_text(&mut self, text: &str, origin: Point) -> Result<(), BoardError>;
    fn flush(&mut self) -> Result<(), BoardError>;
}

type BufferedSsd1306<I2C> =
    Ssd1306<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

/// SSD1306 128x64 in buffered graphics mode
pub struct Ssd1306Panel<I2C> {
    display: BufferedSsd1306<I2C>,
    style: MonoTextStyle<'static, BinaryColor>,
}

impl<I2C> Ssd1306Panel<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    pub fn new(i2c: I2C) -> Self {
        let interface = I2CDisplayInterface::new_custom_address(i2c, config::DISPLAY_I2C_ADDRESS);
        let display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        let style = MonoTextStyleBuilder::new()
            .font(&FONT_6X10)
            .text_color(BinaryColor::On)
            .build();

        Self { display, style }
    }
}

impl<I2C> TextPanel for Ssd1306Panel<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    fn init(&mut self) -> Result<(), BoardError> {
        self.display.init().map_err(|_| BoardError::DisplayError)
    }

    fn clear(&mut self) {
        self.display.clear_buffer();
    }

    fn draw_text(&mut self, text: &str, origin: Point) -> Result<(), BoardError> {
        Text::with_baseline(text, origin, self.style, Baseline::Top)
            .draw(&mut self.display)
            .map(|_| ())
            .map_err(|_| BoardError::DisplayError)
    }

    fn flush(&mut self) -> Result<(), BoardError> {
        self.display.flush().map_err(|_| BoardError::DisplayError)
    }
}

/// Status display on top of any [`TextPanel`]
pub struct PeerDisplay<P> {
    panel: P,
    available: bool,
}

impl<P: TextPanel> PeerDisplay<P> {
    /// Initialise the panel and blank it. A failed init is logged and leaves
    /// the display disabled.
    pub fn start(mut panel: P) -> Self {
        let available = match panel.init() {
            Ok(()) => {
                info!("[DISPLAY] Display initialized");
                true
            }
            Err(e) => {
                warn!("[DISPLAY] Display allocation failed: {}", e);
                false
            }
        };

        let mut display = Self { panel, available };
        display.panel.clear();
        display
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Push the current buffer to the panel
    pub fn flush(&mut self) {
        if !self.available {
            return;
        }
        if let Err(e) = self.panel.flush() {
            warn!("[DISPLAY] Flush failed: {}", e);
        }
    }

    pub fn show_waiting(&mut self) {
        self.show_text(WAITING_TEXT);
    }

    /// Clear the panel and draw the peer's status line
    pub fn render(&mut self, line: &StatusLine) {
        self.show_text(line.as_str());
    }

    fn show_text(&mut self, text: &str) {
        if !self.available {
            return;
        }

        self.panel.clear();
        let (x, y) = config::TEXT_ORIGIN;
        if let Err(e) = self.panel.draw_text(text, Point::new(x, y)) {
            warn!("[DISPLAY] Draw failed: {}", e);
            return;
        }
        self.flush();
    }

    #[cfg(test)]
    fn panel(&self) -> &P {
        &self.panel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::String as StdString;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Op {
        Init,
        Clear,
        Draw(StdString, i32, i32),
        Flush,
    }

    #[derive(Default)]
    struct RecordingPanel {
        ops: Vec<Op>,
        fail_init: bool,
        fail_flush: bool,
    }

    impl TextPanel for RecordingPanel {
        fn init(&mut self) -> Result<(), BoardError> {
            self.ops.push(Op::Init);
            if self.fail_init {
                Err(BoardError::DisplayError)
            } else {
                Ok(())
            }
        }

        fn clear(&mut self) {
            self.ops.push(Op::Clear);
        }

        fn draw_text(&mut self, text: &str, origin: Point) -> Result<(), BoardError> {
            self.ops.push(Op::Draw(text.to_string(), origin.x, origin.y));
            Ok(())
        }

        fn flush(&mut self) -> Result<(), BoardError> {
            self.ops.push(Op::Flush);
            if self.fail_flush {
                Err(BoardError::DisplayError)
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn formats_name_and_signal() {
        assert_eq!(StatusLine::new("Alice", -47).as_str(), "Alice:    -47");
        assert_eq!(StatusLine::new("", 0).as_str(), ":    0");
        assert_eq!(StatusLine::new("x", -128).as_str(), "x:    -128");
    }

    #[test]
    fn longest_line_fits() {
        let name = "abcdefghijklmnopqrstuvwxyzABCDEF";
        assert_eq!(name.len(), 32);
        let line = StatusLine::new(name, i8::MIN);
        assert!(line.as_str().starts_with(name));
        assert!(line.as_str().ends_with(":    -128"));
    }

    #[test]
    fn replaces_characters_the_font_cannot_draw() {
        assert_eq!(StatusLine::new("Zoë\t\u{1b}", -3).as_str(), "Zo???:    -3");
    }

    #[test]
    fn render_clears_draws_at_origin_and_flushes() {
        let mut display = PeerDisplay::start(RecordingPanel::default());
        display.render(&StatusLine::new("Alice", -47));

        assert_eq!(
            display.panel().ops,
            [
                Op::Init,
                Op::Clear,
                Op::Clear,
                Op::Draw("Alice:    -47".to_string(), 0, 10),
                Op::Flush,
            ]
        );
    }

    #[test]
    fn waiting_message_is_drawn() {
        let mut display = PeerDisplay::start(RecordingPanel::default());
        display.show_waiting();
        assert!(display
            .panel()
            .ops
            .contains(&Op::Draw(WAITING_TEXT.to_string(), 0, 10)));
    }

    #[test]
    fn failed_init_disables_rendering() {
        let panel = RecordingPanel {
            fail_init: true,
            ..Default::default()
        };
        let mut display = PeerDisplay::start(panel);
        assert!(!display.is_available());

        display.render(&StatusLine::new("Alice", -47));
        display.flush();

        assert_eq!(display.panel().ops, [Op::Init, Op::Clear]);
    }

    #[test]
    fn flush_errors_do_not_disable_display() {
        let panel = RecordingPanel {
            fail_flush: true,
            ..Default::default()
        };
        let mut display = PeerDisplay::start(panel);
        display.render(&StatusLine::new("A", 1));
        display.render(&StatusLine::new("B", 2));

        assert!(display.is_available());
        let flushes = display.panel().ops.iter().filter(|op| **op == Op::Flush).count();
        assert_eq!(flushes, 2);
    }
}
