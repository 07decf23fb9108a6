//! Synthetic measurement stream sent to one UI client

use std::fmt;
use std::time::Duration;

use chrono::{Local, SecondsFormat};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use telemetry_broadcaster::Client;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::StreamConfig;
use crate::sessions::SessionRegistry;

const BASE_LAT: f64 = 59.930051;
const BASE_LON: f64 = 30.294510;

/// Jitter steps are drawn from `0..JITTER_STEPS`
const JITTER_STEPS: u32 = 10;

/// Counts and cadence of both phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamPlan {
    pub fast_count: u32,
    pub fast_interval: Duration,
    pub slow_count: u32,
    pub slow_interval: Duration,
}

impl Default for StreamPlan {
    fn default() -> Self {
        Self::from(&StreamConfig::default())
    }
}

impl From<&StreamConfig> for StreamPlan {
    fn from(config: &StreamConfig) -> Self {
        Self {
            fast_count: config.fast_count,
            fast_interval: Duration::from_millis(config.fast_interval_ms),
            slow_count: config.slow_count,
            slow_interval: Duration::from_millis(config.slow_interval_ms),
        }
    }
}

/// Source of the coordinate jitter
pub struct Jitter {
    rng: StdRng,
}

impl Jitter {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    fn step(&mut self) -> u32 {
        self.rng.gen_range(0..JITTER_STEPS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Back-filled readings sent in a quick burst
    Historical,
    /// Readings paced at the live cadence
    Live,
}

/// One `MEASUREMENT:` line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub phase: Phase,
    pub index: u32,
    pub lat_step: u32,
    pub lon_step: u32,
}

impl Reading {
    fn next(phase: Phase, index: u32, jitter: &mut Jitter) -> Self {
        Self {
            phase,
            index,
            lat_step: jitter.step(),
            lon_step: jitter.step(),
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lon = BASE_LON + f64::from(self.lon_step) / 10_000_000.0;
        match self.phase {
            Phase::Historical => write!(
                f,
                "MEASUREMENT: [2025-09-21 11:59:{:02}, -75, 6, 1, {:.8}, {:.8}]",
                50 + self.index,
                BASE_LAT + f64::from(self.lat_step) / 10_000_000.0,
                lon
            ),
            // Live readings carry one more decimal of latitude.
            Phase::Live => write!(
                f,
                "MEASUREMENT: [2025-09-22 12:00:{:02}, -70, 7, 0, {:.9}, {:.8}]",
                10 + self.index,
                BASE_LAT + f64::from(self.lat_step) / 100_000_000.0,
                lon
            ),
        }
    }
}

/// How a stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed,
    /// A write failed after `sent` readings
    Aborted { sent: u32 },
}

/// Background task bound to one client and one session
pub struct MeasurementStream {
    client: Client,
    session_id: String,
    sessions: SessionRegistry,
    plan: StreamPlan,
    jitter: Jitter,
}

impl MeasurementStream {
    pub fn new(
        client: Client,
        session_id: impl Into<String>,
        sessions: SessionRegistry,
        plan: StreamPlan,
        jitter: Jitter,
    ) -> Self {
        Self {
            client,
            session_id: session_id.into(),
            sessions,
            plan,
            jitter,
        }
    }

    pub fn spawn(self) -> JoinHandle<StreamOutcome> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) -> StreamOutcome {
        let mut sent = 0;

        for index in 0..self.plan.fast_count {
            let reading = Reading::next(Phase::Historical, index, &mut self.jitter);
            if let Err(e) = self.client.send_line(&reading.to_string()).await {
                debug!("Stream for {} to client {} stopped: {}", self.session_id, self.client.id(), e);
                return StreamOutcome::Aborted { sent };
            }
            sent += 1;
            tokio::time::sleep(self.plan.fast_interval).await;
        }

        for index in 0..self.plan.slow_count {
            tokio::time::sleep(self.plan.slow_interval).await;
            let reading = Reading::next(Phase::Live, index, &mut self.jitter);
            if let Err(e) = self.client.send_line(&reading.to_string()).await {
                debug!("Stream for {} to client {} stopped: {}", self.session_id, self.client.id(), e);
                return StreamOutcome::Aborted { sent };
            }
            sent += 1;
        }

        let finished_at = Local::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        self.sessions.touch_last_date(&self.session_id, &finished_at).await;
        info!("Stream for {} complete ({} readings)", self.session_id, sent);

        StreamOutcome::Completed
    }
}
