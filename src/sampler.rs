//! Subprocess lifecycle and the sampling loop.
//!
//! One supervised run of intel_gpu_top is the whole lifecycle: discover
//! the device id with a one-shot `-L` invocation, stream `-J` output
//! through framing → normalization → fallback → publish until the pipe
//! closes, then terminate the child and surface its stderr. There is no
//! restart on crash; an external supervisor restarts the exporter.

use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::config::ExporterArgs;
use crate::fallback::FallbackPolicy;
use crate::framing::FrameExtractor;
use crate::metrics::MetricStore;
use crate::snapshot::Snapshot;

const READ_BUF_LEN: usize = 4096;

pub struct Sampler {
    args: ExporterArgs,
    store: Arc<MetricStore>,
    policy: FallbackPolicy,
}

impl Sampler {
    pub fn new(args: ExporterArgs, store: Arc<MetricStore>, policy: FallbackPolicy) -> Self {
        Self {
            args,
            store,
            policy,
        }
    }

    /// Run `intel_gpu_top -L` once and extract the device id from its
    /// combined output. Any failure here is soft: the id defaults to 0.
    async fn discover_device_id(&self) -> u64 {
        let output = match Command::new(&self.args.igt_bin).arg("-L").output().await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("device listing failed: {e}");
                return 0;
            }
        };

        // The tool has printed the listing to stdout or stderr depending
        // on version; scan both. Exit code is ignored.
        let mut listing = String::from_utf8_lossy(&output.stdout).into_owned();
        listing.push_str(&String::from_utf8_lossy(&output.stderr));

        match parse_device_id(&listing) {
            Some(id) => id,
            None => {
                tracing::warn!("no device id found in listing, defaulting to 0");
                0
            }
        }
    }

    /// Drive the full sampling lifecycle. Returns once the subprocess
    /// closes its stdout.
    pub async fn run(&self) -> Result<()> {
        let device_id = self.discover_device_id().await;
        tracing::info!("device id {device_id:#x}");
        // Export the id right away; the first frame may be a full sampling
        // period out, and the tool may never emit one at all.
        self.store.set_device_id(device_id);

        let period = self.args.refresh_period_ms.to_string();
        let mut child = Command::new(&self.args.igt_bin)
            .args(["-J", "-s", &period])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to start {}", self.args.igt_bin))?;

        tracing::info!("started {} -J -s {}", self.args.igt_bin, period);

        let mut stdout = child
            .stdout
            .take()
            .context("child stdout was not captured")?;

        let mut extractor = FrameExtractor::new();
        let mut buf = [0u8; READ_BUF_LEN];
        loop {
            let n = stdout
                .read(&mut buf)
                .await
                .context("reading intel_gpu_top stdout failed")?;
            if n == 0 {
                break;
            }
            for frame in extractor.feed(&buf[..n]) {
                let Some(mut snapshot) = Snapshot::from_frame(&frame, device_id) else {
                    tracing::debug!("skipping unparseable record: {frame}");
                    continue;
                };
                self.policy.apply(&mut snapshot);
                self.store.publish(&snapshot);
                tracing::debug!(?snapshot, "published");
            }
        }

        // Stream closed: make sure the child is gone, then report any
        // error output it left behind.
        child.start_kill().ok();
        let output = child
            .wait_with_output()
            .await
            .context("waiting for intel_gpu_top failed")?;
        if !output.status.success() {
            tracing::error!(
                "intel_gpu_top exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            );
        }

        tracing::info!("finished");
        Ok(())
    }
}

/// Match the two known device-id forms in the listing output:
/// `device0=<hex>` / `device=<hex>`, or `pci:vendor=...,device=<hex>`.
fn parse_device_id(listing: &str) -> Option<u64> {
    hex_after(listing, "device0=")
        .or_else(|| hex_after(listing, "device="))
        .or_else(|| {
            let pci = &listing[listing.find("pci:vendor=")?..];
            hex_after(pci, "device=")
        })
}

/// Parse the hex token following the first occurrence of `marker`.
fn hex_after(text: &str, marker: &str) -> Option<u64> {
    let start = text.find(marker)? + marker.len();
    let token: &str = text[start..]
        .split(|c: char| !c.is_ascii_alphanumeric())
        .next()?;
    u64::from_str_radix(token, 16).ok()
}
