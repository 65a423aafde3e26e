use clap::Parser;

/// Accept the truthy/falsy tokens the container interface has always
/// used for boolean environment variables, not just `true`/`false`.
fn parse_truthy(s: &str) -> Result<bool, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!(
            "expected one of 1/true/yes/on or 0/false/no/off, got {other:?}"
        )),
    }
}

/// Exporter configuration. Every flag has an environment fallback so the
/// binary drops into a container without a wrapper script.
#[derive(Parser, Debug, Clone)]
#[command(about = "Prometheus exporter for intel_gpu_top telemetry", version)]
pub struct ExporterArgs {
    #[arg(
        long,
        env = "REFRESH_PERIOD_MS",
        default_value_t = 1000,
        help = "Sampling period in milliseconds passed to intel_gpu_top -s"
    )]
    pub refresh_period_ms: u64,

    #[arg(
        long,
        env = "DEBUG",
        default_value_t = false,
        value_parser = parse_truthy,
        action = clap::ArgAction::Set,
        help = "Default log level DEBUG instead of INFO (RUST_LOG still wins)"
    )]
    pub debug: bool,

    #[arg(
        long,
        env = "FALLBACK_FROM_RC6",
        default_value_t = false,
        value_parser = parse_truthy,
        action = clap::ArgAction::Set,
        help = "Derive busy % from RC6 residency for engines whose primary counter reads zero"
    )]
    pub fallback_from_rc6: bool,

    #[arg(
        long,
        env = "FALLBACK_TARGETS",
        default_value = "Video",
        help = "Comma-separated engine channels eligible for RC6 fallback \
                (Blitter, Render/3D, Video, VideoEnhance; Render is an alias for Render/3D)"
    )]
    pub fallback_targets: String,

    #[arg(
        long,
        env = "LISTEN_ADDR",
        default_value = "0.0.0.0:8080",
        help = "Metrics HTTP listen address"
    )]
    pub listen_addr: String,

    #[arg(
        long,
        env = "IGT_BIN",
        default_value = "intel_gpu_top",
        help = "Path to the intel_gpu_top binary"
    )]
    pub igt_bin: String,
}
