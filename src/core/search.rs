//! Adaptive window search.
//!
//! Hill-climbs the window size with short trials, stops at the first trial
//! whose average bandwidth falls below the best seen so far, then runs one
//! full-length trial at the best window. The single-regression stopping rule
//! is deliberately simple and noise-sensitive.
//!
//! 自适应窗口搜索。
//!
//! 用短时试验逐步增大窗口，在第一次平均带宽低于已知最佳值时停止，然后以最佳窗口运行一次
//! 完整时长的试验。单次回退即停止的规则简单且对噪声敏感。

use crate::{
    config::ProbeConfig,
    core::{sender::TrialReport, stats::average_bandwidth},
    error::Result,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

/// Something that can run one bounded trial at a given window.
///
/// 能够以给定窗口运行一次有界试验的对象。
#[async_trait]
pub trait TrialRunner: Send {
    async fn run_trial(&mut self, window_packets: u32, duration: Duration) -> Result<TrialReport>;
}

/// One measured point of the search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchStep {
    pub window_packets: u32,
    pub average_bandwidth_bps: f64,
}

/// Result of the search phase.
///
/// 搜索阶段的结果。
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub best_window_packets: u32,
    pub best_bandwidth_bps: f64,
    /// Every trial that produced a measurement, in the order run.
    pub steps: Vec<SearchStep>,
}

/// Search parameters: windows `start, start + step, ...` below
/// `max_exclusive`, each tried for `trial_duration`.
#[derive(Debug, Clone)]
pub struct AdaptiveSearch {
    pub start: u32,
    pub step: u32,
    pub max_exclusive: u32,
    pub trial_duration: Duration,
}

impl AdaptiveSearch {
    pub fn from_config(probe: &ProbeConfig) -> Self {
        Self {
            start: 1,
            step: probe.search_step_packets.max(1),
            max_exclusive: probe.max_window_packets(),
            trial_duration: probe.search_trial_duration,
        }
    }

    /// Runs the search phase only.
    ///
    /// A trial that yields no bandwidth samples ends the search, as does the
    /// first average strictly below the best so far. Ties keep the smaller
    /// window. If no trial measured anything the start window is chosen.
    ///
    /// 仅运行搜索阶段。没有产生带宽样本的试验会结束搜索，第一次严格低于最佳值的平均带宽
    /// 同样会结束搜索。持平时保留较小的窗口。如果没有试验测得任何结果，则选择起始窗口。
    pub async fn search<R: TrialRunner + ?Sized>(&self, runner: &mut R) -> Result<SearchOutcome> {
        let mut outcome = SearchOutcome {
            best_window_packets: self.start,
            best_bandwidth_bps: 0.0,
            steps: Vec::new(),
        };

        let mut window = self.start;
        while window < self.max_exclusive {
            let report = runner.run_trial(window, self.trial_duration).await?;
            let Some(bandwidth) = average_bandwidth(&report.bandwidth_samples) else {
                info!(
                    window_packets = window,
                    "Trial produced no bandwidth samples, stopping search"
                );
                break;
            };
            info!(
                window_packets = window,
                kbits_per_sec = bandwidth / 1_000.0,
                "Search trial measured"
            );
            outcome.steps.push(SearchStep {
                window_packets: window,
                average_bandwidth_bps: bandwidth,
            });

            if outcome.best_bandwidth_bps != 0.0 && outcome.best_bandwidth_bps > bandwidth {
                break;
            }
            if bandwidth > outcome.best_bandwidth_bps {
                outcome.best_bandwidth_bps = bandwidth;
                outcome.best_window_packets = window;
            }
            window = window.saturating_add(self.step);
        }

        info!(
            best_window_packets = outcome.best_window_packets,
            best_kbits_per_sec = outcome.best_bandwidth_bps / 1_000.0,
            "Window search finished"
        );
        Ok(outcome)
    }

    /// Runs the search, then one trial of `final_duration` at the best window.
    pub async fn run<R: TrialRunner + ?Sized>(
        &self,
        runner: &mut R,
        final_duration: Duration,
    ) -> Result<(SearchOutcome, TrialReport)> {
        let outcome = self.search(runner).await?;
        let report = runner
            .run_trial(outcome.best_window_packets, final_duration)
            .await?;
        Ok((outcome, report))
    }
}
