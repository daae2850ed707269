use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimingReport {
    /// open → close，包含所有 pacing 延遲
    pub total_seconds: f64,
    pub receive_seconds: f64,
}

/// 記錄一次 session 的各階段耗時
#[derive(Debug)]
pub struct SessionTimer {
    start_time: Instant,
    receive_start: Option<Instant>,
    receive_end: Option<Instant>,
    enabled: bool,
}

impl SessionTimer {
    pub fn new(enabled: bool) -> Self {
        Self {
            start_time: Instant::now(),
            receive_start: None,
            receive_end: None,
            enabled,
        }
    }

    pub fn mark_receive_start(&mut self) {
        self.receive_start = Some(Instant::now());
        self.receive_end = None;
    }

    pub fn mark_receive_end(&mut self) {
        if self.receive_start.is_some() {
            self.receive_end = Some(Instant::now());
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn receive_elapsed(&self) -> Duration {
        match (self.receive_start, self.receive_end) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    pub fn report(&self) -> TimingReport {
        TimingReport {
            total_seconds: self.elapsed().as_secs_f64(),
            receive_seconds: self.receive_elapsed().as_secs_f64(),
        }
    }

    pub fn log_stats(&self, phase: &str) {
        if self.enabled {
            tracing::info!("⏱️ {} - elapsed: {:?}", phase, self.elapsed());
        }
    }

    pub fn log_final_stats(&self) {
        if !self.enabled {
            return;
        }
        let report = self.report();
        println!();
        println!("--- Timing Report ---");
        println!(
            "Total time (send + receive + any delays): {:.4} seconds",
            report.total_seconds
        );
        println!("Receive phase time: {:.4} seconds", report.receive_seconds);
        println!("---------------------");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for SessionTimer {
    fn default() -> Self {
        Self::new(false)
    }
}
