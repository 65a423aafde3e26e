//! Gauge store and Prometheus text rendering.
//!
//! One gauge per snapshot field plus the busy-max aggregate, declared in a
//! single descriptor table. The store is an explicit handle constructed
//! once at startup and shared between the sampler (writer) and the HTTP
//! endpoint (reader); each gauge is an `AtomicU64` holding f64 bits, so
//! individual writes are atomic while a concurrent scrape may observe a
//! partially updated snapshot.

pub mod server;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::snapshot::Snapshot;

struct GaugeDef {
    name: &'static str,
    help: &'static str,
    read: fn(&Snapshot) -> f64,
}

#[rustfmt::skip]
static GAUGES: [GaugeDef; 23] = [
    GaugeDef { name: "igpu_device_id", help: "Intel GPU device id", read: |s| s.device_id as f64 },
    GaugeDef { name: "igpu_engines_blitter_0_busy", help: "Blitter 0 busy utilisation %", read: |s| s.blitter.busy },
    GaugeDef { name: "igpu_engines_blitter_0_sema", help: "Blitter 0 sema utilisation %", read: |s| s.blitter.sema },
    GaugeDef { name: "igpu_engines_blitter_0_wait", help: "Blitter 0 wait utilisation %", read: |s| s.blitter.wait },
    GaugeDef { name: "igpu_engines_render_3d_0_busy", help: "Render 3D 0 busy utilisation %", read: |s| s.render_3d.busy },
    GaugeDef { name: "igpu_engines_render_3d_0_sema", help: "Render 3D 0 sema utilisation %", read: |s| s.render_3d.sema },
    GaugeDef { name: "igpu_engines_render_3d_0_wait", help: "Render 3D 0 wait utilisation %", read: |s| s.render_3d.wait },
    GaugeDef { name: "igpu_engines_video_0_busy", help: "Video 0 busy utilisation %", read: |s| s.video.busy },
    GaugeDef { name: "igpu_engines_video_0_sema", help: "Video 0 sema utilisation %", read: |s| s.video.sema },
    GaugeDef { name: "igpu_engines_video_0_wait", help: "Video 0 wait utilisation %", read: |s| s.video.wait },
    GaugeDef { name: "igpu_engines_video_enhance_0_busy", help: "Video Enhance 0 busy utilisation %", read: |s| s.video_enhance.busy },
    GaugeDef { name: "igpu_engines_video_enhance_0_sema", help: "Video Enhance 0 sema utilisation %", read: |s| s.video_enhance.sema },
    GaugeDef { name: "igpu_engines_video_enhance_0_wait", help: "Video Enhance 0 wait utilisation %", read: |s| s.video_enhance.wait },
    GaugeDef { name: "igpu_frequency_actual", help: "Frequency actual MHz", read: |s| s.freq_actual },
    GaugeDef { name: "igpu_frequency_requested", help: "Frequency requested MHz", read: |s| s.freq_requested },
    GaugeDef { name: "igpu_imc_bandwidth_reads", help: "IMC reads MiB/s", read: |s| s.imc_reads },
    GaugeDef { name: "igpu_imc_bandwidth_writes", help: "IMC writes MiB/s", read: |s| s.imc_writes },
    GaugeDef { name: "igpu_interrupts", help: "Interrupts/s", read: |s| s.interrupts },
    GaugeDef { name: "igpu_period", help: "Period ms", read: |s| s.period_ms },
    GaugeDef { name: "igpu_power_gpu", help: "GPU power W", read: |s| s.power_gpu },
    GaugeDef { name: "igpu_power_package", help: "Package power W", read: |s| s.power_package },
    GaugeDef { name: "igpu_rc6", help: "RC6 %", read: |s| s.rc6 },
    GaugeDef { name: "igpu_engines_busy_max", help: "Maximum busy utilisation % across all engines", read: Snapshot::busy_max },
];

/// Latest-value gauge registry backing the `/metrics` endpoint.
pub struct MetricStore {
    values: Vec<AtomicU64>,
}

impl MetricStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            values: GAUGES
                .iter()
                .map(|_| AtomicU64::new(0.0_f64.to_bits()))
                .collect(),
        })
    }

    /// Write the device id gauge ahead of the first published sample, so
    /// a scrape during the first sampling period already carries the id
    /// discovered at startup.
    pub fn set_device_id(&self, device_id: u64) {
        debug_assert_eq!(GAUGES[0].name, "igpu_device_id");
        self.values[0].store((device_id as f64).to_bits(), Ordering::Relaxed);
    }

    /// Write every snapshot field to its gauge. Total and idempotent: a
    /// 0.0 reading is written as 0.0, never skipped.
    pub fn publish(&self, snapshot: &Snapshot) {
        for (def, cell) in GAUGES.iter().zip(&self.values) {
            cell.store((def.read)(snapshot).to_bits(), Ordering::Relaxed);
        }
    }

    /// Render the whole registry in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(GAUGES.len() * 96);
        for (def, cell) in GAUGES.iter().zip(&self.values) {
            let value = f64::from_bits(cell.load(Ordering::Relaxed));
            out.push_str(&format!(
                "# HELP {name} {help}\n# TYPE {name} gauge\n{name} {value}\n",
                name = def.name,
                help = def.help,
            ));
        }
        out
    }

    #[cfg(test)]
    fn value(&self, name: &str) -> f64 {
        let idx = GAUGES
            .iter()
            .position(|d| d.name == name)
            .unwrap_or_else(|| panic!("no gauge named {name}"));
        f64::from_bits(self.values[idx].load(Ordering::Relaxed))
    }
}
