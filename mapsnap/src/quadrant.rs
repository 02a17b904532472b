//! Diagnostic map engine.
//!
//! Draws four solid quadrants instead of a map, so the channel order and
//! orientation of the output can be checked by eye. In the PNG:
//!
//! ```text
//! +-------+-------+
//! | blue  | white |
//! +-------+-------+
//! |  red  | green |
//! +-------+-------+
//! ```
//!
//! A point of interest adds a magenta square in the center, a live location
//! a cyan square below it.

use glow::HasContext;
use mapsnap_common::{FrameSize, RenderRequest};
use mapsnap_renderer::MapEngine;
use tracing::{debug, info};

type Rgba = [f32; 4];

const RED: Rgba = [1.0, 0.0, 0.0, 1.0];
const GREEN: Rgba = [0.0, 1.0, 0.0, 1.0];
const BLUE: Rgba = [0.0, 0.0, 1.0, 1.0];
const WHITE: Rgba = [1.0, 1.0, 1.0, 1.0];
const MAGENTA: Rgba = [1.0, 0.0, 1.0, 1.0];
const CYAN: Rgba = [0.0, 1.0, 1.0, 1.0];

pub struct QuadrantEngine {
    gl: glow::Context,
    size: FrameSize,
    map_generation: u64,
    bookmark_generation: u64,
}

// SAFETY: the renderer calls the engine only under its lock and only while
// the EGL context is current on the calling thread, so the GL function table
// is never used from two threads at once.
unsafe impl Send for QuadrantEngine {}

impl QuadrantEngine {
    pub fn new(gl: glow::Context, size: FrameSize) -> Self {
        info!(%size, "diagnostic quadrant engine created");
        Self {
            gl,
            size,
            map_generation: 0,
            bookmark_generation: 0,
        }
    }

    /// Fill a rectangle in GL coordinates (origin bottom-left).
    fn fill(&self, x: i32, y: i32, width: i32, height: i32, color: Rgba) {
        unsafe {
            self.gl.scissor(x, y, width, height);
            self.gl.clear_color(color[0], color[1], color[2], color[3]);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }
}

impl MapEngine for QuadrantEngine {
    fn render_map(&mut self, request: &RenderRequest) -> bool {
        if !request.center.is_valid() {
            debug!(center = ?request.center, "refusing invalid center");
            return false;
        }

        let (width, height) = (self.size.width as i32, self.size.height as i32);
        let (half_w, half_h) = (width / 2, height / 2);
        let marker = (width.min(height) / 8).max(1);

        unsafe {
            self.gl.viewport(0, 0, width, height);
            self.gl.enable(glow::SCISSOR_TEST);
        }
        self.fill(0, 0, half_w, half_h, RED);
        self.fill(half_w, 0, width - half_w, half_h, GREEN);
        self.fill(0, half_h, half_w, height - half_h, BLUE);
        self.fill(half_w, half_h, width - half_w, height - half_h, WHITE);
        if request.poi.is_some() {
            self.fill(half_w - marker / 2, half_h - marker / 2, marker, marker, MAGENTA);
        }
        if request.my_location.is_some() {
            self.fill(half_w - marker / 2, half_h - 2 * marker, marker, marker, CYAN);
        }

        unsafe {
            self.gl.disable(glow::SCISSOR_TEST);
            self.gl.finish();
            let error = self.gl.get_error();
            if error != glow::NO_ERROR {
                debug!("GL error 0x{error:04X} while drawing");
                return false;
            }
        }
        true
    }

    fn invalidate_map_data(&mut self) {
        self.map_generation += 1;
        info!(generation = self.map_generation, "map data changed");
    }

    fn invalidate_bookmark_data(&mut self) {
        self.bookmark_generation += 1;
        info!(generation = self.bookmark_generation, "bookmark data changed");
    }
}
