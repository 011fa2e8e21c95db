//! Sliding-window trials over a loss-free in-memory link.

use crate::{
    config::Variant,
    core::{
        search::AdaptiveSearch,
        sender::{SenderShared, WindowController, spawn_ack_intake},
    },
    testing::{fast_config, init_tracing, spawn_receiver},
};
use std::{sync::Arc, time::Duration};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fixed_window_trial_delivers_and_samples() {
    init_tracing();
    let config = fast_config(Variant::SlidingWindow);
    let (sink, source, session) = spawn_receiver(config.receiver.receive_window_budget);

    let shared = Arc::new(SenderShared::new(&config.probe));
    let intake = spawn_ack_intake(source, shared.clone());
    let mut controller = WindowController::new(sink, shared.clone(), &config);

    let report = controller
        .run_trial(5, Duration::from_millis(500))
        .await
        .unwrap();

    assert_eq!(report.window_packets, 5);
    assert!(report.packets_sent > 5, "sent {}", report.packets_sent);
    assert!(!report.rtt_samples.is_empty());
    assert!(report.bandwidth_samples.len() >= 3);
    assert_eq!(report.retransmits.fast, 0);

    // Everything acknowledged was counted exactly once.
    let delivered = shared.delivered_bytes().await;
    assert_eq!(
        delivered,
        report.rtt_samples.len() as u64 * u64::from(config.probe.packet_size)
    );
    {
        let window = shared.window.lock().await;
        assert!(window.unacked_bytes() <= 5 * config.probe.packet_size);
    }

    controller.close().await.unwrap();
    let stats = session.await.unwrap().unwrap();
    assert_eq!(stats.frames_received, report.packets_sent);
    assert_eq!(stats.frames_buffered, 0);
    intake.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_consecutive_trials_continue_the_sequence() {
    init_tracing();
    let config = fast_config(Variant::SlidingWindow);
    let (sink, source, session) = spawn_receiver(config.receiver.receive_window_budget);

    let shared = Arc::new(SenderShared::new(&config.probe));
    let intake = spawn_ack_intake(source, shared.clone());
    let mut controller = WindowController::new(sink, shared.clone(), &config);

    let first = controller
        .run_trial(3, Duration::from_millis(200))
        .await
        .unwrap();
    let after_first = shared.max_ack().await;
    assert!(after_first > 1);

    let second = controller
        .run_trial(8, Duration::from_millis(200))
        .await
        .unwrap();
    assert!(!second.rtt_samples.is_empty());
    assert!(shared.max_ack().await > after_first);

    controller.close().await.unwrap();
    let stats = session.await.unwrap().unwrap();
    assert_eq!(
        stats.frames_received,
        first.packets_sent + second.packets_sent
    );
    intake.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_adaptive_search_over_live_link() {
    init_tracing();
    let config = fast_config(Variant::SlidingWindow);
    let (sink, source, _session) = spawn_receiver(config.receiver.receive_window_budget);

    let shared = Arc::new(SenderShared::new(&config.probe));
    let _intake = spawn_ack_intake(source, shared.clone());
    let mut controller = WindowController::new(sink, shared, &config);

    let search = AdaptiveSearch::from_config(&config.probe);
    assert_eq!(search.max_exclusive, 20);
    let (outcome, report) = search
        .run(&mut controller, Duration::from_millis(300))
        .await
        .unwrap();

    assert!(!outcome.steps.is_empty());
    assert!([1, 6, 11, 16].contains(&outcome.best_window_packets));
    assert_eq!(report.window_packets, outcome.best_window_packets);
    assert!(!report.rtt_samples.is_empty());
}
