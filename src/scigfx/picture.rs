//! Replays the SCI0 picture opcode stream.
//!
//! The interpreter only decodes: every drawing operation is handed to a
//! [`PictureCanvas`], and [`Planes`] is the canvas that rasterizes them.

use crate::error::Result;
use crate::scigfx::planes::Planes;
use crate::scires::stream::ByteCursor;

pub const SCREEN_WIDTH: i32 = 320;
pub const SCREEN_HEIGHT: i32 = 200;

pub const DRAW_ENABLE_VISUAL: u8 = 1;
pub const DRAW_ENABLE_PRIORITY: u8 = 2;
pub const DRAW_ENABLE_CONTROL: u8 = 4;

const PATTERN_FLAG_RECTANGLE: u8 = 0x10;
const PATTERN_FLAG_USE_PATTERN: u8 = 0x20;

const PIC_OP_SET_COLOR: u8 = 0xf0;
const PIC_OP_DISABLE_VISUAL: u8 = 0xf1;
const PIC_OP_SET_PRIORITY: u8 = 0xf2;
const PIC_OP_DISABLE_PRIORITY: u8 = 0xf3;
const PIC_OP_RELATIVE_PATTERNS: u8 = 0xf4;
const PIC_OP_RELATIVE_MEDIUM_LINES: u8 = 0xf5;
const PIC_OP_RELATIVE_LONG_LINES: u8 = 0xf6;
const PIC_OP_RELATIVE_SHORT_LINES: u8 = 0xf7;
const PIC_OP_FILL: u8 = 0xf8;
const PIC_OP_SET_PATTERN: u8 = 0xf9;
const PIC_OP_ABSOLUTE_PATTERNS: u8 = 0xfa;
const PIC_OP_SET_CONTROL: u8 = 0xfb;
const PIC_OP_DISABLE_CONTROL: u8 = 0xfc;
const PIC_OP_RELATIVE_MEDIUM_PATTERNS: u8 = 0xfd;
const PIC_OP_OPX: u8 = 0xfe;
const PIC_OP_END: u8 = 0xff;

const PIC_OPX_SET_PALETTE_ENTRIES: u8 = 0;
const PIC_OPX_SET_PALETTE: u8 = 1;
const PIC_OPX_MONO0: u8 = 2;
const PIC_OPX_MONO1: u8 = 3;
const PIC_OPX_MONO2: u8 = 4;
const PIC_OPX_MONO3: u8 = 5;
const PIC_OPX_MONO4: u8 = 6;
const PIC_OPX_EMBEDDED_VIEW: u8 = 7;
const PIC_OPX_SET_PRIORITY_TABLE: u8 = 8;

static OPCODE_NAMES: [&str; 16] = [
    "SET_COLOR",
    "DISABLE_VISUAL",
    "SET_PRIORITY",
    "DISABLE_PRIORITY",
    "RELATIVE_PATTERNS",
    "RELATIVE_MEDIUM_LINES",
    "RELATIVE_LONG_LINES",
    "RELATIVE_SHORT_LINES",
    "FILL",
    "SET_PATTERN",
    "ABSOLUTE_PATTERNS",
    "SET_CONTROL",
    "DISABLE_CONTROL",
    "RELATIVE_MEDIUM_PATTERNS",
    "OPX",
    "END",
];

static OPX_NAMES: [&str; 9] = [
    "SET_PALETTE_ENTRIES",
    "SET_PALETTE",
    "MONO0",
    "MONO1",
    "MONO2",
    "MONO3",
    "MONO4",
    "EMBEDDED_VIEW",
    "SET_PRIORITY_TABLE",
];

pub fn opcode_name(opcode: u8) -> Option<&'static str> {
    opcode.checked_sub(PIC_OP_SET_COLOR).map(|n| OPCODE_NAMES[n as usize])
}

pub fn opx_name(sub_opcode: u8) -> Option<&'static str> {
    OPX_NAMES.get(sub_opcode as usize).copied()
}

pub const PALETTE_SIZE: usize = 40;
pub const NUM_PALETTES: usize = 4;
pub const PRIORITY_TABLE_SIZE: usize = 14;

/// Palette entries pack two dither colours into one byte.
pub const DEFAULT_PALETTE: [u8; PALETTE_SIZE] = [
    0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x88,
    0x88, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x88, 0x88, 0xf9, 0xfa, 0xfb, 0xfc, 0xfd, 0xfe, 0xff,
    0x08, 0x91, 0x2a, 0x3b, 0x4c, 0x5d, 0x6e, 0x88,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// The pair of colours a dithered pen alternates between.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ColorPair {
    pub first: u8,
    pub second: u8,
}

impl ColorPair {
    pub fn from_packed(value: u8) -> Self {
        Self { first: value >> 4, second: value & 0xf }
    }
}

/// Pen state in effect for a drawing operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawState {
    pub enable: u8,
    pub colors: ColorPair,
    pub priority: u8,
    pub control: u8,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            enable: DRAW_ENABLE_VISUAL | DRAW_ENABLE_PRIORITY,
            colors: ColorPair::default(),
            priority: 0,
            control: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pattern {
    pub size: u8,
    pub rectangle: bool,
    /// Texture number when the pattern is sprayed rather than solid.
    pub texture: Option<u8>,
}

/// Receives the drawing operations of a picture.
pub trait PictureCanvas {
    fn draw_pattern(&mut self, center: Point, pattern: &Pattern, state: &DrawState);
    fn draw_line(&mut self, from: Point, to: Point, state: &DrawState);
    fn fill(&mut self, seed: Point, state: &DrawState);
}

/// Discards everything; used when only the opcode statistics are wanted.
pub struct NullCanvas;

impl PictureCanvas for NullCanvas {
    fn draw_pattern(&mut self, _center: Point, _pattern: &Pattern, _state: &DrawState) {}
    fn draw_line(&mut self, _from: Point, _to: Point, _state: &DrawState) {}
    fn fill(&mut self, _seed: Point, _state: &DrawState) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct OpcodeStats {
    pub unknown: usize,
    pub total: usize,
}

/// What a run leaves behind besides the drawing itself.
#[derive(Debug)]
pub struct RunResult {
    pub stats: OpcodeStats,
    pub palettes: [[u8; PALETTE_SIZE]; NUM_PALETTES],
    pub priority_table: Option<[u8; PRIORITY_TABLE_SIZE]>,
}

struct Interpreter<'a, 'c, C: PictureCanvas> {
    stream: ByteCursor<'a>,
    canvas: &'c mut C,
    state: DrawState,
    pattern_code: u8,
    pattern_nr: u8,
    palettes: [[u8; PALETTE_SIZE]; NUM_PALETTES],
    priority_table: Option<[u8; PRIORITY_TABLE_SIZE]>,
    stats: OpcodeStats,
}

impl<'a, 'c, C: PictureCanvas> Interpreter<'a, 'c, C> {
    fn new(data: &'a [u8], canvas: &'c mut C) -> Self {
        Self {
            stream: ByteCursor::new(data),
            canvas,
            state: DrawState::default(),
            pattern_code: 0,
            pattern_nr: 0,
            palettes: [DEFAULT_PALETTE; NUM_PALETTES],
            priority_table: None,
            stats: OpcodeStats::default(),
        }
    }

    fn more_arguments(&self) -> Result<bool> {
        Ok(self.stream.peek()? < PIC_OP_SET_COLOR)
    }

    fn get_abs_coordinates(&mut self) -> Result<Point> {
        let prefix = self.stream.get()? as i32;
        let x = self.stream.get()? as i32 | ((prefix & 0xf0) << 4);
        let y = self.stream.get()? as i32 | ((prefix & 0x0f) << 8);
        Ok(Point { x, y })
    }

    fn get_rel_short_coordinates(&mut self, from: Point) -> Result<Point> {
        let input = self.stream.get()? as i32;
        let mut p = from;
        if input & 0x80 != 0 {
            p.x -= input >> 4;
        } else {
            p.x += input >> 4;
        }
        if input & 0x08 != 0 {
            p.y -= input & 0x7;
        } else {
            p.y += input & 0x7;
        }
        Ok(p)
    }

    fn get_rel_medium_coordinates(&mut self, from: Point) -> Result<Point> {
        let mut p = from;
        let input = self.stream.get()? as i32;
        if input & 0x80 != 0 {
            p.y -= input & 0x7f;
        } else {
            p.y += input;
        }
        let input = self.stream.get()? as i32;
        if input & 0x80 != 0 {
            p.x -= 128 - (input & 0x7f);
        } else {
            p.x += input;
        }
        Ok(p)
    }

    fn pattern(&self) -> Pattern {
        Pattern {
            size: self.pattern_code & 0x7,
            rectangle: self.pattern_code & PATTERN_FLAG_RECTANGLE != 0,
            texture: (self.pattern_code & PATTERN_FLAG_USE_PATTERN != 0).then_some(self.pattern_nr),
        }
    }

    fn read_pattern_nr(&mut self) -> Result<()> {
        if self.pattern_code & PATTERN_FLAG_USE_PATTERN != 0 {
            self.pattern_nr = (self.stream.get()? >> 1) & 0x7f;
        }
        Ok(())
    }

    fn draw_pattern(&mut self, center: Point) {
        let pattern = self.pattern();
        self.canvas.draw_pattern(center, &pattern, &self.state);
    }

    fn draw_line(&mut self, from: Point, to: Point) {
        self.canvas.draw_line(from, to, &self.state);
    }

    fn set_color(&mut self, code: u8) {
        let bank = code as usize / PALETTE_SIZE;
        let index = code as usize % PALETTE_SIZE;
        let packed = match self.palettes.get(bank) {
            Some(palette) => palette[index],
            None => {
                log::warn!("picture: colour {} selects palette {}, using the default palette", code, bank);
                DEFAULT_PALETTE[index]
            }
        };
        self.state.colors = ColorPair::from_packed(packed);
        self.state.enable |= DRAW_ENABLE_VISUAL;
    }

    fn extended(&mut self) -> Result<()> {
        let sub_opcode = self.stream.get()?;
        log::trace!("  OPX {}", opx_name(sub_opcode).unwrap_or("unknown"));
        match sub_opcode {
            PIC_OPX_SET_PALETTE_ENTRIES => {
                while self.more_arguments()? {
                    let index = self.stream.get()? as usize;
                    let color = self.stream.get()?;
                    match self.palettes.get_mut(index / PALETTE_SIZE) {
                        Some(palette) => palette[index % PALETTE_SIZE] = color,
                        None => log::warn!("picture: palette entry {} out of range, ignored", index),
                    }
                }
            }
            PIC_OPX_SET_PALETTE => {
                let palette_number = self.stream.get()? as usize;
                let colors = self.stream.get_bytes(PALETTE_SIZE)?;
                match self.palettes.get_mut(palette_number) {
                    Some(palette) => palette.copy_from_slice(colors),
                    None => log::warn!("picture: palette {} out of range, ignored", palette_number),
                }
            }
            PIC_OPX_MONO0 => self.stream.skip(41)?,
            PIC_OPX_MONO1 | PIC_OPX_MONO3 => self.stream.skip(1)?,
            PIC_OPX_MONO2 | PIC_OPX_MONO4 | PIC_OPX_EMBEDDED_VIEW => {}
            PIC_OPX_SET_PRIORITY_TABLE => {
                let mut table = [0u8; PRIORITY_TABLE_SIZE];
                table.copy_from_slice(self.stream.get_bytes(PRIORITY_TABLE_SIZE)?);
                self.priority_table = Some(table);
            }
            _ => log::warn!("picture: unrecognized OPX sub-opcode 0x{:02x}, ignored", sub_opcode),
        }
        Ok(())
    }

    fn run(mut self) -> Result<RunResult> {
        loop {
            let position = self.stream.position();
            let opcode = self.stream.get()?;
            self.stats.total += 1;
            log::trace!("{:04x}: {}", position, opcode_name(opcode).unwrap_or("unknown"));
            match opcode {
                PIC_OP_SET_COLOR => {
                    let code = self.stream.get()?;
                    self.set_color(code);
                }
                PIC_OP_DISABLE_VISUAL => self.state.enable &= !DRAW_ENABLE_VISUAL,
                PIC_OP_SET_PRIORITY => {
                    self.state.priority = self.stream.get()? & 0xf;
                    self.state.enable |= DRAW_ENABLE_PRIORITY;
                }
                PIC_OP_DISABLE_PRIORITY => self.state.enable &= !DRAW_ENABLE_PRIORITY,
                PIC_OP_RELATIVE_PATTERNS => {
                    self.read_pattern_nr()?;
                    let mut p = self.get_abs_coordinates()?;
                    self.draw_pattern(p);
                    while self.more_arguments()? {
                        self.read_pattern_nr()?;
                        p = self.get_rel_short_coordinates(p)?;
                        self.draw_pattern(p);
                    }
                }
                PIC_OP_RELATIVE_MEDIUM_LINES => {
                    let mut old = self.get_abs_coordinates()?;
                    while self.more_arguments()? {
                        let p = self.get_rel_medium_coordinates(old)?;
                        self.draw_line(old, p);
                        old = p;
                    }
                }
                PIC_OP_RELATIVE_LONG_LINES => {
                    let mut old = self.get_abs_coordinates()?;
                    while self.more_arguments()? {
                        let p = self.get_abs_coordinates()?;
                        self.draw_line(old, p);
                        old = p;
                    }
                }
                PIC_OP_RELATIVE_SHORT_LINES => {
                    let mut old = self.get_abs_coordinates()?;
                    while self.more_arguments()? {
                        let p = self.get_rel_short_coordinates(old)?;
                        self.draw_line(old, p);
                        old = p;
                    }
                }
                PIC_OP_FILL => {
                    while self.more_arguments()? {
                        let p = self.get_abs_coordinates()?;
                        self.canvas.fill(p, &self.state);
                    }
                }
                PIC_OP_SET_PATTERN => {
                    self.pattern_code = self.stream.get()? & 0x37;
                }
                PIC_OP_ABSOLUTE_PATTERNS => {
                    while self.more_arguments()? {
                        self.read_pattern_nr()?;
                        let p = self.get_abs_coordinates()?;
                        self.draw_pattern(p);
                    }
                }
                PIC_OP_SET_CONTROL => {
                    self.state.control = self.stream.get()? & 0xf;
                    self.state.enable |= DRAW_ENABLE_CONTROL;
                }
                PIC_OP_DISABLE_CONTROL => self.state.enable &= !DRAW_ENABLE_CONTROL,
                PIC_OP_RELATIVE_MEDIUM_PATTERNS => {
                    self.read_pattern_nr()?;
                    let mut p = self.get_abs_coordinates()?;
                    self.draw_pattern(p);
                    while self.more_arguments()? {
                        self.read_pattern_nr()?;
                        p = self.get_rel_medium_coordinates(p)?;
                        self.draw_pattern(p);
                    }
                }
                PIC_OP_OPX => self.extended()?,
                PIC_OP_END => break,
                _ => {
                    log::debug!("picture: unknown opcode 0x{:02x} at {:04x}", opcode, position);
                    self.stats.unknown += 1;
                }
            }
        }

        Ok(RunResult { stats: self.stats, palettes: self.palettes, priority_table: self.priority_table })
    }
}

/// Runs a picture opcode stream against any canvas. Reaching the end of the
/// data before the END opcode is an error.
pub fn interpret<C: PictureCanvas>(data: &[u8], canvas: &mut C) -> Result<RunResult> {
    Interpreter::new(data, canvas).run()
}

/// Counts opcodes without drawing anything.
pub fn audit(data: &[u8]) -> Result<OpcodeStats> {
    Ok(interpret(data, &mut NullCanvas)?.stats)
}

/// A decoded picture: the four planes and what the run reported.
#[derive(Debug)]
pub struct Picture {
    pub planes: Planes,
    pub stats: OpcodeStats,
    pub priority_table: Option<[u8; PRIORITY_TABLE_SIZE]>,
}

impl Picture {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut planes = Planes::new();
        let result = interpret(data, &mut planes)?;
        log::debug!("picture: {} opcodes, {} unknown", result.stats.total, result.stats.unknown);
        Ok(Self { planes, stats: result.stats, priority_table: result.priority_table })
    }
}
