//! Opt-in substitution of per-engine busy readings from RC6 residency.
//!
//! Some hardware/driver combinations report a per-engine busy counter
//! that stays at zero while the GPU is demonstrably not idle (the RC6
//! residency keeps moving). When enabled, the complement of RC6 stands in
//! for the busy reading of the configured target engines.

use std::collections::HashSet;

use crate::snapshot::{Engine, Snapshot};

/// Process-wide fallback configuration, parsed once at startup and
/// immutable afterwards.
#[derive(Debug, Clone)]
pub struct FallbackPolicy {
    pub enabled: bool,
    pub targets: HashSet<Engine>,
}

impl FallbackPolicy {
    /// Build the policy from the enable flag and the comma-separated
    /// target list. Target tokens match the canonical channel names
    /// exactly, case-sensitive; `Render` is accepted as an alias for
    /// `Render/3D`. Unknown tokens are ignored with a warning.
    pub fn new(enabled: bool, target_list: &str) -> Self {
        let mut targets = HashSet::new();
        for token in target_list.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match token {
                "Blitter" => targets.insert(Engine::Blitter),
                "Render/3D" | "Render" => targets.insert(Engine::Render3D),
                "Video" => targets.insert(Engine::Video),
                "VideoEnhance" => targets.insert(Engine::VideoEnhance),
                other => {
                    tracing::warn!("ignoring unknown fallback target {other:?}");
                    continue;
                }
            };
        }
        Self { enabled, targets }
    }

    /// Overwrite each target engine's busy value with `max(0, 100 - rc6)`
    /// when the primary reading is non-positive. Engines outside the
    /// target set and engines with a positive reading are untouched.
    pub fn apply(&self, snapshot: &mut Snapshot) {
        if !self.enabled {
            return;
        }
        let active = (100.0 - snapshot.rc6).max(0.0);
        for engine in Engine::ALL {
            if self.targets.contains(&engine) && snapshot.engine(engine).busy <= 0.0 {
                snapshot.engine_mut(engine).busy = active;
            }
        }
    }
}

impl Default for FallbackPolicy {
    /// Disabled, targeting `Video` — the shipping defaults.
    fn default() -> Self {
        Self::new(false, "Video")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with(rc6: f64, video_busy: f64) -> Snapshot {
        let mut s = Snapshot::default();
        s.rc6 = rc6;
        s.video.busy = video_busy;
        s
    }

    #[test]
    fn zero_busy_target_gets_rc6_complement() {
        let policy = FallbackPolicy::new(true, "Video");
        let mut s = snapshot_with(30.0, 0.0);
        policy.apply(&mut s);
        assert_eq!(s.video.busy, 70.0, "active = 100 - rc6");
    }

    #[test]
    fn positive_busy_reading_is_left_alone() {
        let policy = FallbackPolicy::new(true, "Video");
        let mut s = snapshot_with(30.0, 5.0);
        policy.apply(&mut s);
        assert_eq!(s.video.busy, 5.0);
    }

    #[test]
    fn disabled_policy_never_substitutes() {
        let policy = FallbackPolicy::new(false, "Video");
        let mut s = snapshot_with(30.0, 0.0);
        policy.apply(&mut s);
        assert_eq!(s.video.busy, 0.0);
    }

    #[test]
    fn non_target_engines_are_untouched() {
        let policy = FallbackPolicy::new(true, "Video");
        let mut s = snapshot_with(10.0, 0.0);
        policy.apply(&mut s);
        assert_eq!(s.video.busy, 90.0);
        assert_eq!(s.blitter.busy, 0.0, "Blitter is not in the target set");
        assert_eq!(s.render_3d.busy, 0.0);
    }

    #[test]
    fn rc6_above_100_clamps_active_to_zero() {
        let policy = FallbackPolicy::new(true, "Video");
        let mut s = snapshot_with(120.0, 0.0);
        policy.apply(&mut s);
        assert_eq!(s.video.busy, 0.0, "active never goes negative");
    }

    #[test]
    fn render_alias_and_canonical_name_both_parse() {
        for list in ["Render", "Render/3D"] {
            let policy = FallbackPolicy::new(true, list);
            assert!(
                policy.targets.contains(&Engine::Render3D),
                "{list:?} should target the Render/3D channel"
            );
        }
    }

    #[test_log::test]
    fn target_list_parsing_is_exact_and_tolerant() {
        let policy = FallbackPolicy::new(true, " Video , VideoEnhance ,, bogus, video");
        assert!(policy.targets.contains(&Engine::Video));
        assert!(policy.targets.contains(&Engine::VideoEnhance));
        assert_eq!(
            policy.targets.len(),
            2,
            "lowercase and unknown tokens are dropped"
        );
    }
}
