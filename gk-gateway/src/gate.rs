//! Access gate: plate → allow/deny under a global cooldown
//!
//! After any allowed pass, every decision inside the cooldown window is
//! rejected, whatever the plate. The window is one scalar for the whole
//! gateway: it throttles the barrier, it does not deduplicate vehicles.
//!
//! `decide` holds one lock across the cooldown check, the whitelist lookup
//! and the timestamp update, so two concurrent allow-worthy requests can
//! never both pass inside the same window.

use crate::whitelist::{WhitelistResult, WhitelistStore};
use gk_common::api::Verdict;
use gk_common::PlateCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

/// Result of one gate decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateDecision {
    pub allowed: bool,
    pub verdict: Verdict,
}

impl From<Verdict> for GateDecision {
    fn from(verdict: Verdict) -> Self {
        Self {
            allowed: verdict.allowed(),
            verdict,
        }
    }
}

/// Time of the last allowed pass; only the gate can touch it
#[derive(Debug, Default)]
struct CooldownState {
    last_pass: Option<Instant>,
}

impl CooldownState {
    fn remaining(&self, window: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_pass?;
        let elapsed = now.saturating_duration_since(last);
        (elapsed < window).then(|| window - elapsed)
    }
}

pub struct AccessGate {
    whitelist: Arc<dyn WhitelistStore>,
    window: Duration,
    state: Mutex<CooldownState>,
}

impl AccessGate {
    pub fn new(whitelist: Arc<dyn WhitelistStore>, window: Duration) -> Self {
        Self {
            whitelist,
            window,
            state: Mutex::new(CooldownState::default()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// True while an earlier pass still suppresses new decisions
    pub async fn is_cooling_down(&self) -> bool {
        self.cooldown_remaining().await.is_some()
    }

    /// Time left in the current window, `None` when the gate is active
    pub async fn cooldown_remaining(&self) -> Option<Duration> {
        self.state.lock().await.remaining(self.window, Instant::now())
    }

    /// Decide whether `plate` may pass.
    ///
    /// `None` (no plate found) is always `NoPlate` and leaves the cooldown
    /// untouched. Whitelist errors propagate; the cooldown is not armed.
    pub async fn decide(&self, plate: Option<&PlateCode>) -> WhitelistResult<GateDecision> {
        let Some(plate) = plate else {
            return Ok(Verdict::NoPlate.into());
        };

        let mut state = self.state.lock().await;

        if let Some(remaining) = state.remaining(self.window, Instant::now()) {
            debug!(plate = %plate, ?remaining, "Rejected during cooldown");
            return Ok(Verdict::Cooldown.into());
        }

        if !self.whitelist.contains(plate).await? {
            info!(plate = %plate, "Plate not whitelisted");
            return Ok(Verdict::NotWhitelisted.into());
        }

        state.last_pass = Some(Instant::now());
        info!(plate = %plate, window = ?self.window, "Pass granted, cooldown armed");
        Ok(Verdict::Pass.into())
    }
}
