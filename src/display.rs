use log::{error, info};
use rppal::i2c::I2c;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use crate::error::Result;

pub const MATRIX_SIZE: usize = 5;

/// Status output on a 5x5 LED matrix.
///
/// Pixels outside the matrix are ignored.
pub trait Display {
    fn show_icon(&mut self, icon: Icon);
    fn show_string(&mut self, text: &str);
    fn plot(&mut self, x: u8, y: u8);
    fn unplot(&mut self, x: u8, y: u8);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    No,     // Idle, waiting for input
    Target, // Sticks centered
}

impl Icon {
    fn rows(&self) -> [&'static str; MATRIX_SIZE] {
        match self {
            Icon::No => ["#...#", ".#.#.", "..#..", ".#.#.", "#...#"],
            Icon::Target => ["..#..", ".###.", "##.##", ".###.", "..#.."],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedMatrix {
    leds: [[bool; MATRIX_SIZE]; MATRIX_SIZE], // [y][x]
}

impl LedMatrix {
    pub fn from_icon(icon: Icon) -> Self {
        let mut matrix = LedMatrix::default();
        for (y, row) in icon.rows().iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                matrix.leds[y][x] = c == '#';
            }
        }
        matrix
    }

    pub fn set(&mut self, x: u8, y: u8, on: bool) {
        let (x, y) = (x as usize, y as usize);
        if x >= MATRIX_SIZE || y >= MATRIX_SIZE {
            return;
        }
        self.leds[y][x] = on;
    }

    pub fn get(&self, x: u8, y: u8) -> bool {
        let (x, y) = (x as usize, y as usize);
        x < MATRIX_SIZE && y < MATRIX_SIZE && self.leds[y][x]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayCommand {
    Icon(Icon),
    Text(String),
    Plot(u8, u8),
    Unplot(u8, u8),
}

/// What the panel currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Screen {
    pub matrix: LedMatrix,
    pub caption: String,
}

impl Screen {
    /// Returns whether anything visible changed.
    pub fn apply(&mut self, command: DisplayCommand) -> bool {
        let before = (self.matrix, self.caption.len());
        match command {
            DisplayCommand::Icon(icon) => self.matrix = LedMatrix::from_icon(icon),
            DisplayCommand::Text(text) => {
                self.matrix = LedMatrix::default();
                if self.caption != text {
                    self.caption = text;
                    return true;
                }
            }
            DisplayCommand::Plot(x, y) => self.matrix.set(x, y, true),
            DisplayCommand::Unplot(x, y) => self.matrix.set(x, y, false),
        }
        before != (self.matrix, self.caption.len())
    }
}

/// Cloneable handle feeding `display_thread`.
#[derive(Clone)]
pub struct MatrixDisplay {
    tx: Sender<DisplayCommand>,
}

impl MatrixDisplay {
    pub fn new(tx: Sender<DisplayCommand>) -> Self {
        MatrixDisplay { tx }
    }

    fn send(&self, command: DisplayCommand) {
        // Receiver is gone when the panel failed to initialize
        let _ = self.tx.send(command);
    }
}

impl Display for MatrixDisplay {
    fn show_icon(&mut self, icon: Icon) {
        self.send(DisplayCommand::Icon(icon));
    }

    fn show_string(&mut self, text: &str) {
        self.send(DisplayCommand::Text(text.to_string()));
    }

    fn plot(&mut self, x: u8, y: u8) {
        self.send(DisplayCommand::Plot(x, y));
    }

    fn unplot(&mut self, x: u8, y: u8) {
        self.send(DisplayCommand::Unplot(x, y));
    }
}

pub fn matrix_display() -> (MatrixDisplay, Receiver<DisplayCommand>) {
    let (tx, rx) = mpsc::channel();
    (MatrixDisplay::new(tx), rx)
}

const WIDTH: usize = 128;
const HEIGHT: usize = 64;
const CELL: u8 = 12;
const LED: u8 = 10;
const MATRIX_TOP: u8 = 2;
const CAPTION_X: u8 = 66;
const CAPTION_Y: u8 = 28;
const CAPTION_CHARS: usize = 10;

pub struct DisplayBuffer {
    buffer: [u8; WIDTH * HEIGHT / 8],
}

impl DisplayBuffer {
    fn new() -> Self {
        DisplayBuffer {
            buffer: [0u8; WIDTH * HEIGHT / 8],
        }
    }

    fn clear(&mut self) {
        self.buffer.fill(0);
    }

    fn set_pixel(&mut self, x: u8, y: u8, on: bool) {
        if x as usize >= WIDTH || y as usize >= HEIGHT {
            return;
        }
        let byte_index = (y / 8) as usize * WIDTH + x as usize;
        let bit_index = y % 8;

        if on {
            self.buffer[byte_index] |= 1 << bit_index;
        } else {
            self.buffer[byte_index] &= !(1 << bit_index);
        }
    }

    #[cfg(test)]
    fn pixel(&self, x: u8, y: u8) -> bool {
        if x as usize >= WIDTH || y as usize >= HEIGHT {
            return false;
        }
        let byte_index = (y / 8) as usize * WIDTH + x as usize;
        self.buffer[byte_index] & (1 << (y % 8)) != 0
    }

    fn fill_rect(&mut self, x: u8, y: u8, w: u8, h: u8) {
        for dx in 0..w {
            for dy in 0..h {
                self.set_pixel(x.saturating_add(dx), y.saturating_add(dy), true);
            }
        }
    }

    fn draw_char(&mut self, x: u8, y: u8, c: char) {
        let font = get_font_data(c);
        for dx in 0..5u8 {
            let column = font[dx as usize];
            for dy in 0..8u8 {
                if (column >> dy) & 1 == 1 {
                    self.set_pixel(x.saturating_add(dx), y.saturating_add(dy), true);
                }
            }
        }
    }

    fn draw_text(&mut self, x: u8, y: u8, text: &str) {
        for (i, c) in text.to_uppercase().chars().take(CAPTION_CHARS).enumerate() {
            self.draw_char(x + (i as u8 * 6), y, c);
        }
    }

    /// Matrix on the left as 10 px squares, caption on the right.
    fn render(&mut self, screen: &Screen) {
        self.clear();
        for y in 0..MATRIX_SIZE as u8 {
            for x in 0..MATRIX_SIZE as u8 {
                if screen.matrix.get(x, y) {
                    self.fill_rect(x * CELL, MATRIX_TOP + y * CELL, LED, LED);
                }
            }
        }
        self.draw_text(CAPTION_X, CAPTION_Y, &screen.caption);
    }
}

pub struct SSD1306 {
    i2c: I2c,
}

impl SSD1306 {
    pub fn new(bus: u8, address: u16) -> Result<Self> {
        let mut i2c = I2c::with_bus(bus)?;
        i2c.set_slave_address(address)?;

        let mut display = SSD1306 { i2c };
        display.init()?;

        info!("SSD1306 OLED initialized on I2C bus {}, address 0x{:02X}", bus, address);
        Ok(display)
    }

    fn init(&mut self) -> Result<()> {
        let init_commands = [
            0xAE, 0xD5, 0x80, 0xA8, 0x3F, 0xD3, 0x00, 0x40,
            0x8D, 0x14, 0x20, 0x00, 0xA1, 0xC8, 0xDA, 0x12,
            0x81, 0xCF, 0xD9, 0xF1, 0xDB, 0x40, 0xA4, 0xA6, 0xAF,
        ];

        for &cmd in &init_commands {
            self.send_command(cmd)?;
        }

        Ok(())
    }

    fn send_command(&mut self, cmd: u8) -> Result<()> {
        self.i2c.write(&[0x00, cmd])?;
        Ok(())
    }

    fn display(&mut self, buffer: &DisplayBuffer) -> Result<()> {
        for cmd in [0x21, 0, (WIDTH - 1) as u8, 0x22, 0, (HEIGHT / 8 - 1) as u8] {
            self.send_command(cmd)?;
        }

        let mut data = [0u8; 17];
        data[0] = 0x40;
        for chunk in buffer.buffer.chunks(16) {
            data[1..].copy_from_slice(chunk);
            self.i2c.write(&data)?;
        }

        Ok(())
    }
}

fn get_font_data(c: char) -> [u8; 5] {
    match c {
        '0' => [0x3E, 0x51, 0x49, 0x45, 0x3E],
        '1' => [0x00, 0x42, 0x7F, 0x40, 0x00],
        '2' => [0x62, 0x51, 0x49, 0x49, 0x46],
        '3' => [0x22, 0x41, 0x49, 0x49, 0x36],
        '4' => [0x18, 0x14, 0x12, 0x7F, 0x10],
        '5' => [0x27, 0x45, 0x45, 0x45, 0x39],
        '6' => [0x3C, 0x4A, 0x49, 0x49, 0x30],
        '7' => [0x01, 0x71, 0x09, 0x05, 0x03],
        '8' => [0x36, 0x49, 0x49, 0x49, 0x36],
        '9' => [0x06, 0x49, 0x49, 0x29, 0x1E],
        'A' => [0x7C, 0x12, 0x11, 0x12, 0x7C],
        'B' => [0x7F, 0x49, 0x49, 0x49, 0x36],
        'C' => [0x3E, 0x41, 0x41, 0x41, 0x22],
        'D' => [0x7F, 0x41, 0x41, 0x41, 0x3E],
        'E' => [0x7F, 0x49, 0x49, 0x49, 0x41],
        'F' => [0x7F, 0x09, 0x09, 0x09, 0x01],
        'G' => [0x3E, 0x41, 0x49, 0x49, 0x3A],
        'H' => [0x7F, 0x04, 0x04, 0x04, 0x7F],
        'I' => [0x00, 0x41, 0x7F, 0x41, 0x00],
        'J' => [0x41, 0x41, 0x3F, 0x01, 0x01],
        'K' => [0x7F, 0x08, 0x14, 0x22, 0x41],
        'L' => [0x7F, 0x40, 0x40, 0x40, 0x40],
        'M' => [0x7F, 0x02, 0x0C, 0x02, 0x7F],
        'N' => [0x7F, 0x02, 0x04, 0x08, 0x7F],
        'O' => [0x3E, 0x41, 0x41, 0x41, 0x3E],
        'P' => [0x7F, 0x09, 0x09, 0x09, 0x06],
        'Q' => [0x3E, 0x41, 0x51, 0x61, 0x7E],
        'R' => [0x7F, 0x09, 0x19, 0x29, 0x46],
        'S' => [0x26, 0x49, 0x49, 0x49, 0x32],
        'T' => [0x01, 0x01, 0x7F, 0x01, 0x01],
        'U' => [0x3F, 0x40, 0x40, 0x40, 0x3F],
        'V' => [0x07, 0x18, 0x60, 0x18, 0x07],
        'W' => [0x7F, 0x80, 0x7C, 0x80, 0x7F],
        'X' => [0x63, 0x14, 0x08, 0x14, 0x63],
        'Y' => [0x03, 0x0C, 0x70, 0x0C, 0x03],
        'Z' => [0x61, 0x51, 0x49, 0x45, 0x43],
        ':' => [0x00, 0x36, 0x36, 0x00, 0x00],
        ' ' => [0x00, 0x00, 0x00, 0x00, 0x00],
        '-' => [0x08, 0x08, 0x08, 0x08, 0x08],
        _ => [0x7F, 0x41, 0x41, 0x41, 0x7F],
    }
}

/// Owns the panel. Drains pending commands, redraws when something
/// changed, exits when every `MatrixDisplay` handle is gone.
pub fn display_thread(rx: Receiver<DisplayCommand>, bus: u8, address: u16) {
    let mut display = match SSD1306::new(bus, address) {
        Ok(d) => d,
        Err(e) => {
            error!("Failed to initialize display: {}", e);
            return;
        }
    };

    let mut display_buffer = DisplayBuffer::new();
    let mut screen = Screen::default();

    loop {
        let mut dirty = false;
        loop {
            match rx.try_recv() {
                Ok(command) => {
                    dirty |= screen.apply(command);
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => return,
            }
        }

        if dirty {
            display_buffer.render(&screen);
            if let Err(e) = display.display(&display_buffer) {
                error!("Display error: {}", e);
            }
        }

        thread::sleep(Duration::from_millis(20));
    }
}
