// --- Global Simulation Constants ---
pub const BACKGROUND_COLOR: wgpu::Color = wgpu::Color {
    r: 0.02,
    g: 0.02,
    b: 0.04,
    a: 1.0,
};

pub const WINDOW_WIDTH: u32 = 1024;
pub const WINDOW_HEIGHT: u32 = 768;

// Simulation ticks run on a fixed timestep; rendering is free-running.
pub const FIXED_TIMESTEP: f64 = 1.0 / 30.0;
pub const FPS_UPDATE_INTERVAL_SECS: f64 = 5.0;

// Genetic reach is bounded by this; the damage and eating formulas divide
// by it, so it must stay positive.
pub const MAX_REACH: f32 = 5.0;

// Per-gene chance that crossover perturbs the inherited value.
pub const GENE_MUTATION_CHANCE: f64 = 0.1;
// Mutation delta is at most this fraction of the gene's legal range.
pub const GENE_MUTATION_SPAN: f32 = 0.1;

// Hebbian updates clamp every weight to +/- this magnitude.
pub const WEIGHT_LIMIT: f32 = 10.0;

// Scale applied to the fight/mate drive outputs before the tanh squash
// that turns them into color channels.
pub const DRIVE_COLOR_SCALE: f32 = 50.0;

pub const EVENT_FLASH_FRAMES: u32 = 30;

pub const FIGHT_FLASH_COLOR: [f32; 3] = [1.0, 0.0, 0.0];
pub const MATE_FLASH_COLOR: [f32; 3] = [0.0, 0.0, 1.0];
pub const EAT_FLASH_COLOR: [f32; 3] = [1.0, 1.0, 0.0];
pub const FOOD_COLOR: [f32; 3] = [1.0, 1.0, 0.0];

// --- Camera ---
pub const CAMERA_MOVE_PER_SEC: f32 = 18.0;
pub const CAMERA_TURN_PER_SEC: f32 = 1.6;
pub const CAMERA_EYE_HEIGHT: f32 = 6.0;
