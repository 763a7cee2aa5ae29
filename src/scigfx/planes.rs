use std::fmt;

use crate::scigfx::picture::{
    DrawState, Pattern, PictureCanvas, Point, DRAW_ENABLE_CONTROL, DRAW_ENABLE_PRIORITY, DRAW_ENABLE_VISUAL,
    SCREEN_HEIGHT, SCREEN_WIDTH,
};

pub const PLANE_SIZE: usize = (SCREEN_WIDTH * SCREEN_HEIGHT) as usize;

const VISUAL_BACKGROUND: u8 = 0x0f;
const TEXTURE_TAPS: u8 = 0xb8;

/// The four 320x200 planes a picture draws into. `aux` records, per pixel,
/// which of the other planes have been drawn.
pub struct Planes {
    pub visual: Vec<u8>,
    pub priority: Vec<u8>,
    pub control: Vec<u8>,
    pub aux: Vec<u8>,
}

impl fmt::Debug for Planes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Planes({}x{})", SCREEN_WIDTH, SCREEN_HEIGHT)
    }
}

impl Default for Planes {
    fn default() -> Self {
        Self::new()
    }
}

fn index(x: i32, y: i32) -> Option<usize> {
    if x >= 0 && y >= 0 && x < SCREEN_WIDTH && y < SCREEN_HEIGHT {
        Some((y * SCREEN_WIDTH + x) as usize)
    } else {
        None
    }
}

impl Planes {
    pub fn new() -> Self {
        Self {
            visual: vec![VISUAL_BACKGROUND; PLANE_SIZE],
            priority: vec![0; PLANE_SIZE],
            control: vec![0; PLANE_SIZE],
            aux: vec![0; PLANE_SIZE],
        }
    }

    /// True while nothing has been drawn.
    pub fn is_blank(&self) -> bool {
        self.visual.iter().all(|&v| v == VISUAL_BACKGROUND)
            && self.priority.iter().all(|&v| v == 0)
            && self.control.iter().all(|&v| v == 0)
            && self.aux.iter().all(|&v| v == 0)
    }

    pub fn put_pixel(&mut self, x: i32, y: i32, state: &DrawState) {
        let Some(n) = index(x, y) else {
            return;
        };
        if state.enable & DRAW_ENABLE_VISUAL != 0 {
            self.visual[n] = if (x + y) & 1 == 0 { state.colors.first } else { state.colors.second };
        }
        if state.enable & DRAW_ENABLE_PRIORITY != 0 {
            self.priority[n] = state.priority;
        }
        if state.enable & DRAW_ENABLE_CONTROL != 0 {
            self.control[n] = state.control;
        }
        self.aux[n] |= state.enable & (DRAW_ENABLE_VISUAL | DRAW_ENABLE_PRIORITY | DRAW_ENABLE_CONTROL);
    }

    fn line(&mut self, from: Point, to: Point, state: &DrawState) {
        let dx = (to.x - from.x).abs();
        let dy = -(to.y - from.y).abs();
        let sx = if from.x < to.x { 1 } else { -1 };
        let sy = if from.y < to.y { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (from.x, from.y);
        loop {
            self.put_pixel(x, y, state);
            if x == to.x && y == to.y {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn pattern(&mut self, center: Point, pattern: &Pattern, state: &DrawState) {
        let size = pattern.size as i32;
        let extent = size * 2 + 1;
        // keep the whole pattern on screen
        let left = (center.x - size).clamp(0, SCREEN_WIDTH - extent);
        let top = (center.y - size).clamp(0, SCREEN_HEIGHT - extent);

        let mut lfsr = pattern.texture.map(|nr| nr | 0x80);
        for dy in -size..=size {
            for dx in -size..=size {
                if !pattern.rectangle && dx * dx + dy * dy > size * size + size {
                    continue;
                }
                if let Some(bits) = lfsr.as_mut() {
                    let bit = *bits & 1;
                    *bits >>= 1;
                    if bit == 0 {
                        continue;
                    }
                    *bits ^= TEXTURE_TAPS;
                }
                self.put_pixel(left + size + dx, top + size + dy, state);
            }
        }
    }

    fn flood_fill(&mut self, seed: Point, state: &DrawState) {
        // the first enabled plane decides where the fill stops
        let mask = [DRAW_ENABLE_VISUAL, DRAW_ENABLE_PRIORITY, DRAW_ENABLE_CONTROL]
            .into_iter()
            .find(|&bit| state.enable & bit != 0);
        let Some(mask) = mask else {
            return;
        };
        let fillable = |planes: &Planes, x: i32, y: i32| index(x, y).is_some_and(|n| planes.aux[n] & mask == 0);

        let mut pending = vec![seed];
        while let Some(p) = pending.pop() {
            if !fillable(self, p.x, p.y) {
                continue;
            }
            let mut left = p.x;
            while fillable(self, left - 1, p.y) {
                left -= 1;
            }
            let mut right = p.x;
            while fillable(self, right + 1, p.y) {
                right += 1;
            }
            for x in left..=right {
                self.put_pixel(x, p.y, state);
                for y in [p.y - 1, p.y + 1] {
                    if fillable(self, x, y) {
                        pending.push(Point { x, y });
                    }
                }
            }
        }
    }
}

impl PictureCanvas for Planes {
    fn draw_pattern(&mut self, center: Point, pattern: &Pattern, state: &DrawState) {
        self.pattern(center, pattern, state);
    }

    fn draw_line(&mut self, from: Point, to: Point, state: &DrawState) {
        self.line(from, to, state);
    }

    fn fill(&mut self, seed: Point, state: &DrawState) {
        self.flood_fill(seed, state);
    }
}
