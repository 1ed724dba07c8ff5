use macroquad::prelude::*;
#[cfg(target_arch = "wasm32")]
use macroquad::miniquad;
use quarterview_core::{
    Aabb, BakedChunk, CameraView, ChunkCache, ChunkCacheError, ChunkKey, DrainReport, DrawTarget,
    IsoDims, JobQueue, OverworldGenerator, Point, Projection, RenderConfig, Rgba, TileMap,
    TileMapError, Vertex,
};
use std::rc::Rc;
use thiserror::Error;

use crate::core_draw::draw_focus_marker;

mod core_draw;

const CONFIG_PATH: &str = "assets/quarterview.json";
const MAP_ID: &str = "overworld";
const MAP_WIDTH: i32 = 180;
const MAP_HEIGHT: i32 = 120;
const TILE_SIZE: i32 = 32;
const WORLD_SEED: u64 = 42;
// Center of the cross road, which world generation always leaves open.
const START_TILE: (f32, f32) = (MAP_WIDTH as f32 / 2.0 + 0.5, MAP_HEIGHT as f32 / 2.0 + 0.5);

const FIXED_STEP_SECONDS: f32 = 1.0 / 60.0;
const MAX_STEPS_PER_FRAME: u32 = 8;
const FOCUS_SPEED_TILES: f32 = 12.0;
const FOCUS_RADIUS_TILES: f32 = 0.3;
const BASE_ZOOM_AT_POWER_ZERO: f32 = 1f32;
const MIN_ZOOM_POWER: i32 = -12;
const MAX_ZOOM_POWER: i32 = 12;
const ZOOM_FACTOR: f32 = 1.1;
const FPS_INTERVAL_SECS: f64 = 1.0;

const BACKGROUND: Color = Color::from_rgba(28, 30, 34, 255);

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to build world map: {0}")]
    Map(#[from] TileMapError),
    #[error("failed to set up chunk cache: {0}")]
    Cache(#[from] ChunkCacheError),
}

/// Issues each chunk's triangles through macroquad's immediate-mode API.
struct MacroquadTarget;

impl DrawTarget for MacroquadTarget {
    fn draw_triangles(&mut self, _key: ChunkKey, vertices: &[Vertex]) {
        for triangle in vertices.chunks_exact(3) {
            draw_triangle(
                to_vec2(triangle[0].position),
                to_vec2(triangle[1].position),
                to_vec2(triangle[2].position),
                to_color(triangle[0].color),
            );
        }
    }
}

fn to_vec2(point: Point) -> Vec2 {
    vec2(point.x, point.y)
}

fn to_color(rgba: Rgba) -> Color {
    Color::from_rgba(rgba.r, rgba.g, rgba.b, rgba.a)
}

fn zoom_scale_from_power(power: i32) -> f32 {
    BASE_ZOOM_AT_POWER_ZERO * ZOOM_FACTOR.powi(power)
}

fn clamp_zoom_power(power: i32) -> i32 {
    power.clamp(MIN_ZOOM_POWER, MAX_ZOOM_POWER)
}

/// Keeps the view inside `bounds` on each axis, or centers it on an axis the
/// view is larger than.
fn clamp_camera_center(center: Point, half_extent: Point, bounds: Aabb) -> Point {
    let clamp_axis = |value: f32, half: f32, min: f32, size: f32| {
        if size <= half * 2.0 {
            min + size * 0.5
        } else {
            value.clamp(min + half, min + size - half)
        }
    };

    Point::new(
        clamp_axis(center.x, half_extent.x, bounds.x, bounds.w),
        clamp_axis(center.y, half_extent.y, bounds.y, bounds.h),
    )
}

/// Accumulates frame time and hands out whole simulation steps, at most
/// `max_steps` per frame. Time beyond that stays in the accumulator.
#[derive(Debug, Clone)]
struct FixedStep {
    step: f32,
    max_steps: u32,
    accumulator: f32,
}

impl FixedStep {
    fn new(step: f32, max_steps: u32) -> Self {
        Self {
            step,
            max_steps,
            accumulator: 0.0,
        }
    }

    fn advance(&mut self, frame_seconds: f32) -> u32 {
        self.accumulator += frame_seconds;
        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_steps {
            self.accumulator -= self.step;
            steps += 1;
        }
        steps
    }
}

pub struct GameState {
    map: Rc<TileMap>,
    chunks: ChunkCache,
    jobs: JobQueue<BakedChunk>,
    config: RenderConfig,
    iso_dims: IsoDims,
    focus: Point,
    view: CameraView,
    zoom: f32,
    zoom_power: i32,
    tick: u64,
    last_drain: DrainReport,
    fps: f32,
    fps_frame_count: u32,
    fps_last_update_time: f64,
}

impl GameState {
    pub fn new(config: RenderConfig) -> Result<Self, StartupError> {
        let map = OverworldGenerator::new(WORLD_SEED).generate(
            MAP_ID,
            MAP_WIDTH,
            MAP_HEIGHT,
            TILE_SIZE,
        )?;
        Self::with_map(Rc::new(map), config)
    }

    pub fn with_map(map: Rc<TileMap>, config: RenderConfig) -> Result<Self, StartupError> {
        let chunks = ChunkCache::from_config(Rc::clone(&map), &config)?;
        let iso_dims = match config.projection {
            Projection::Isometric(dims) => dims,
            Projection::Orthogonal => IsoDims::default(),
        };
        let initial_zoom_power = 0;

        log::info!(
            "world '{}' {}x{} tiles, {} walls, chunk size {}",
            map.id(),
            map.width(),
            map.height(),
            map.colliders().len(),
            config.chunk_tiles
        );

        Ok(Self {
            map,
            chunks,
            jobs: JobQueue::new(),
            config,
            iso_dims,
            focus: Point::new(START_TILE.0, START_TILE.1),
            view: CameraView::new(Point::default(), Point::default()),
            zoom: zoom_scale_from_power(initial_zoom_power),
            zoom_power: initial_zoom_power,
            tick: 0,
            last_drain: DrainReport::default(),
            fps: 0.0,
            fps_frame_count: 0,
            fps_last_update_time: 0.0,
        })
    }

    fn tile_size(&self) -> f32 {
        self.map.tile_size() as f32
    }

    /// Camera view for a screen of `screen` pixels, following the focus point.
    fn camera_view(&self, screen: Vec2) -> CameraView {
        let projection = self.chunks.projection();
        let tile_size = self.tile_size();
        let half_extent = Point::new(
            screen.x * 0.5 / self.zoom,
            screen.y * 0.5 / self.zoom,
        );
        let bounds = projection.world_bounds(self.map.width(), self.map.height(), tile_size);
        let target = projection.grid_to_projected(self.focus, tile_size);
        CameraView::new(clamp_camera_center(target, half_extent, bounds), half_extent)
    }

    /// World-space box around a focus position given in tiles.
    fn focus_box(&self, focus: Point) -> Aabb {
        let tile_size = self.tile_size();
        let radius = FOCUS_RADIUS_TILES * tile_size;
        Aabb::new(
            focus.x * tile_size - radius,
            focus.y * tile_size - radius,
            radius * 2.0,
            radius * 2.0,
        )
    }

    fn focus_blocked(&self, focus: Point) -> bool {
        self.map.overlaps_wall(&self.focus_box(focus))
    }

    /// Moves the focus, sliding along walls by undoing one axis of the move
    /// at a time before giving up on it entirely.
    fn move_focus(&mut self, direction: Vec2) {
        let prev = self.focus;
        let delta = direction.normalize_or_zero() * FOCUS_SPEED_TILES * FIXED_STEP_SECONDS;
        let next = Point::new(
            (prev.x + delta.x).clamp(0.0, self.map.width() as f32),
            (prev.y + delta.y).clamp(0.0, self.map.height() as f32),
        );
        if !self.focus_blocked(next) {
            self.focus = next;
            return;
        }

        let keep_y = Point::new(prev.x, next.y);
        let keep_x = Point::new(next.x, prev.y);
        self.focus = if !self.focus_blocked(keep_y) {
            keep_y
        } else if !self.focus_blocked(keep_x) {
            keep_x
        } else {
            prev
        };
    }

    /// One simulation step: move the focus, then schedule and bake visible chunks.
    fn fixed_update(&mut self, direction: Vec2, screen: Vec2) {
        self.tick += 1;
        self.move_focus(direction);

        self.view = self.camera_view(screen);
        self.chunks.append_visible_range(&self.view, &mut self.jobs);
        self.last_drain = self
            .chunks
            .process_jobs(&mut self.jobs, self.config.drain_budget());
    }

    fn toggle_projection(&mut self) {
        let next = match self.chunks.projection() {
            Projection::Orthogonal => Projection::Isometric(self.iso_dims),
            Projection::Isometric(_) => Projection::Orthogonal,
        };
        log_ui_action(if next.is_isometric() {
            "projection: isometric"
        } else {
            "projection: orthogonal"
        });
        self.chunks.set_projection(next);
    }

    fn apply_zoom_power(&mut self, next_zoom_power: i32) {
        let clamped = clamp_zoom_power(next_zoom_power);
        if clamped == self.zoom_power {
            return;
        }
        self.zoom_power = clamped;
        self.zoom = zoom_scale_from_power(clamped);
    }

    fn handle_keys(&mut self) {
        if is_key_pressed(KeyCode::Tab) {
            self.toggle_projection();
        }
    }

    fn handle_mouse_wheel_zoom(&mut self) {
        let (_, wheel_y) = mouse_wheel();
        if wheel_y > 0.0 {
            self.apply_zoom_power(self.zoom_power + 1);
        } else if wheel_y < 0.0 {
            self.apply_zoom_power(self.zoom_power - 1);
        }
    }

    fn update_fps_if_due(&mut self) {
        let now = get_time();
        self.fps_frame_count += 1;
        let elapsed = now - self.fps_last_update_time;
        if elapsed >= FPS_INTERVAL_SECS {
            self.fps = self.fps_frame_count as f32 / elapsed as f32;
            self.fps_frame_count = 0;
            self.fps_last_update_time = now;
        }
    }

    fn render(&mut self) {
        clear_background(BACKGROUND);

        let view = self.camera_view(vec2(screen_width(), screen_height()));
        let camera = Camera2D {
            target: to_vec2(view.center),
            zoom: vec2(1.0 / view.half_extent.x, 1.0 / view.half_extent.y),
            ..Default::default()
        };
        set_camera(&camera);

        let drawn = self.chunks.draw_visible(&mut MacroquadTarget, &view);

        let projection = self.chunks.projection();
        let marker = projection.grid_to_projected(self.focus, self.tile_size());
        draw_focus_marker(to_vec2(marker), self.tile_size());

        set_default_camera();
        self.render_hud(drawn);
    }

    fn render_hud(&self, drawn: usize) {
        let stats = self.chunks.stats();
        let lines = [
            format!("tick: {}", self.tick),
            format!(
                "projection: {}",
                if self.chunks.projection().is_isometric() {
                    "isometric"
                } else {
                    "orthogonal"
                }
            ),
            format!("bake queue: {}", self.jobs.pending()),
            format!(
                "chunks: {} cached, {} pending, {} drawn",
                self.chunks.cached_len(),
                self.chunks.pending_len(),
                drawn
            ),
            format!(
                "last drain: {} jobs in {:.3} ms",
                self.last_drain.executed,
                self.last_drain.elapsed.as_secs_f64() * 1000.0
            ),
            format!(
                "baked: {} discarded: {} evicted: {}",
                stats.baked, stats.discarded, stats.evicted
            ),
            format!(
                "focus: {:.1}, {:.1} (wall: {})",
                self.focus.x,
                self.focus.y,
                self.map
                    .is_wall(self.focus.x.floor() as i32, self.focus.y.floor() as i32)
            ),
            format!("zoom: {:.2}x", self.zoom),
            format!("fps: {:.1}", self.fps),
        ];

        for (i, line) in lines.iter().enumerate() {
            draw_text(line, 20.0, 40.0 + i as f32 * 24.0, 24.0, WHITE);
        }
    }
}

fn read_focus_direction() -> Vec2 {
    let mut direction = Vec2::ZERO;
    if is_key_down(KeyCode::A) || is_key_down(KeyCode::Left) {
        direction.x -= 1.0;
    }
    if is_key_down(KeyCode::D) || is_key_down(KeyCode::Right) {
        direction.x += 1.0;
    }
    if is_key_down(KeyCode::W) || is_key_down(KeyCode::Up) {
        direction.y -= 1.0;
    }
    if is_key_down(KeyCode::S) || is_key_down(KeyCode::Down) {
        direction.y += 1.0;
    }
    direction
}

fn log_ui_action(label: &str) {
    #[cfg(target_arch = "wasm32")]
    miniquad::info!("{}", label);
    #[cfg(not(target_arch = "wasm32"))]
    log::info!("{}", label);
}

async fn load_config() -> RenderConfig {
    match load_string(CONFIG_PATH).await {
        Ok(text) => RenderConfig::from_json_str(&text).unwrap_or_else(|err| {
            log::warn!("ignoring {CONFIG_PATH}: {err}");
            RenderConfig::default()
        }),
        Err(err) => {
            log::info!("no render config at {CONFIG_PATH} ({err}), using defaults");
            RenderConfig::default()
        }
    }
}

pub async fn run() {
    init_logging();
    install_panic_hook();

    let config = load_config().await;
    let mut game = match GameState::new(config) {
        Ok(game) => game,
        Err(err) => {
            log::error!("{err}");
            return;
        }
    };
    game.fps_last_update_time = get_time();
    let mut clock = FixedStep::new(FIXED_STEP_SECONDS, MAX_STEPS_PER_FRAME);

    loop {
        let steps = clock.advance(get_frame_time());
        let direction = read_focus_direction();
        let screen = vec2(screen_width(), screen_height());
        for _ in 0..steps {
            game.fixed_update(direction, screen);
        }

        game.handle_keys();
        game.handle_mouse_wheel_zoom();
        game.update_fps_if_due();

        game.render();

        next_frame().await;
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("info");
    // A second init (e.g. from a test harness) is harmless.
    let _ = env_logger::Builder::from_env(env).try_init();
}

#[cfg(target_arch = "wasm32")]
fn init_logging() {}

#[cfg(target_arch = "wasm32")]
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let msg = info.to_string();
        if let Some(location) = info.location() {
            miniquad::error!("panic at {}:{}: {}", location.file(), location.line(), msg);
        } else {
            miniquad::error!("panic: {}", msg);
        }
    }));
}

#[cfg(not(target_arch = "wasm32"))]
fn install_panic_hook() {}
