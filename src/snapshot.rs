//! Normalization of one framed intel_gpu_top JSON record into a typed
//! snapshot.
//!
//! intel_gpu_top renamed its per-engine keys across versions (legacy
//! builds emit an indexed `Video/0`, newer MTL/Xe builds a plain `Video`),
//! so every engine channel resolves through an ordered candidate-key list,
//! newest schema first. Missing groups, missing fields and non-numeric
//! values all normalize to 0.0; absence is not an error.

use serde_json::Value;

/// One of the four fixed GPU functional units tracked by the exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    Blitter,
    Render3D,
    Video,
    VideoEnhance,
}

impl Engine {
    pub const ALL: [Engine; 4] = [
        Engine::Blitter,
        Engine::Render3D,
        Engine::Video,
        Engine::VideoEnhance,
    ];

    /// Canonical channel name as intel_gpu_top spells it.
    pub fn canonical(&self) -> &'static str {
        match self {
            Engine::Blitter => "Blitter",
            Engine::Render3D => "Render/3D",
            Engine::Video => "Video",
            Engine::VideoEnhance => "VideoEnhance",
        }
    }

    /// JSON keys this channel may appear under, newest schema first.
    fn candidate_keys(&self) -> [&'static str; 2] {
        match self {
            Engine::Blitter => ["Blitter", "Blitter/0"],
            Engine::Render3D => ["Render/3D", "Render/3D/0"],
            Engine::Video => ["Video", "Video/0"],
            Engine::VideoEnhance => ["VideoEnhance", "VideoEnhance/0"],
        }
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.canonical())
    }
}

/// Utilisation percentages reported for one engine channel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineReading {
    pub busy: f64,
    pub sema: f64,
    pub wait: f64,
}

/// The full normalized sample extracted from one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub device_id: u64,
    pub blitter: EngineReading,
    pub render_3d: EngineReading,
    pub video: EngineReading,
    pub video_enhance: EngineReading,
    /// MHz.
    pub freq_actual: f64,
    /// MHz.
    pub freq_requested: f64,
    /// MiB/s.
    pub imc_reads: f64,
    /// MiB/s.
    pub imc_writes: f64,
    /// Interrupts per second.
    pub interrupts: f64,
    /// Sample period in milliseconds.
    pub period_ms: f64,
    /// Watts.
    pub power_gpu: f64,
    /// Watts.
    pub power_package: f64,
    /// RC6 deep-idle residency, 0-100.
    pub rc6: f64,
}

/// Top-level metric groups: output field is filled from `root[group][field]`
/// with a 0.0 default. Keeping the mapping in one table keeps the
/// get-with-default semantics uniform.
const GROUP_FIELDS: [(&str, &str); 9] = [
    ("frequency", "actual"),
    ("frequency", "requested"),
    ("imc-bandwidth", "reads"),
    ("imc-bandwidth", "writes"),
    ("interrupts", "count"),
    ("period", "duration"),
    ("power", "GPU"),
    ("power", "Package"),
    ("rc6", "value"),
];

impl Snapshot {
    /// Parse one framed record. Returns `None` when the frame is not valid
    /// JSON; the caller skips the record and keeps the loop running.
    pub fn from_frame(frame: &str, device_id: u64) -> Option<Snapshot> {
        let root: Value = serde_json::from_str(frame).ok()?;

        let [freq_actual, freq_requested, imc_reads, imc_writes, interrupts, period_ms, power_gpu, power_package, rc6] =
            GROUP_FIELDS.map(|(group, field)| group_field(&root, group, field));

        Some(Snapshot {
            device_id,
            blitter: engine_reading(&root, Engine::Blitter),
            render_3d: engine_reading(&root, Engine::Render3D),
            video: engine_reading(&root, Engine::Video),
            video_enhance: engine_reading(&root, Engine::VideoEnhance),
            freq_actual,
            freq_requested,
            imc_reads,
            imc_writes,
            interrupts,
            period_ms,
            power_gpu,
            power_package,
            rc6,
        })
    }

    pub fn engine(&self, engine: Engine) -> &EngineReading {
        match engine {
            Engine::Blitter => &self.blitter,
            Engine::Render3D => &self.render_3d,
            Engine::Video => &self.video,
            Engine::VideoEnhance => &self.video_enhance,
        }
    }

    pub fn engine_mut(&mut self, engine: Engine) -> &mut EngineReading {
        match engine {
            Engine::Blitter => &mut self.blitter,
            Engine::Render3D => &mut self.render_3d,
            Engine::Video => &mut self.video,
            Engine::VideoEnhance => &mut self.video_enhance,
        }
    }

    /// Maximum busy value across the four engine channels.
    pub fn busy_max(&self) -> f64 {
        Engine::ALL
            .iter()
            .map(|e| self.engine(*e).busy)
            .fold(0.0, f64::max)
    }
}

/// Accept both JSON numbers and numeric strings; some tool builds quote
/// their values.
fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn group_field(root: &Value, group: &str, field: &str) -> f64 {
    root.get(group)
        .and_then(|g| g.get(field))
        .and_then(to_f64)
        .unwrap_or(0.0)
}

/// Resolve one engine field through the candidate-key list: the first
/// present numeric value wins, non-numeric values count as absent.
fn engine_field(root: &Value, engine: Engine, field: &str) -> f64 {
    let engines = root.get("engines");
    engine
        .candidate_keys()
        .iter()
        .find_map(|key| {
            engines
                .and_then(|e| e.get(key))
                .and_then(|e| e.get(field))
                .and_then(to_f64)
        })
        .unwrap_or(0.0)
}

fn engine_reading(root: &Value, engine: Engine) -> EngineReading {
    EngineReading {
        busy: engine_field(root, engine, "busy"),
        sema: engine_field(root, engine, "sema"),
        wait: engine_field(root, engine, "wait"),
    }
}
