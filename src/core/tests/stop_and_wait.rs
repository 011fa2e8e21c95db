//! Stop-and-wait runs against scripted and real receivers.

use crate::{
    config::Variant,
    core::sender::{SenderShared, StopAndWait, spawn_ack_intake},
    error::Error,
    packet::frame::Frame,
    testing::{fast_config, init_tracing, spawn_receiver},
    transport::{FrameSink, FrameSource, framed},
};
use std::{sync::Arc, time::Duration};
use tokio::io::duplex;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_echoed_ack_yields_one_sample() {
    init_tracing();
    let config = fast_config(Variant::StopAndWait);
    let (client, peer) = duplex(64 * 1024);
    let (sink, source) = framed(client);
    let (mut peer_sink, mut peer_source) = framed(peer);

    // Acknowledge the first packet with its own sequence number, late.
    let peer = tokio::spawn(async move {
        let frame = peer_source.recv_frame().await.unwrap().unwrap();
        let seq = frame.sequence_number().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        peer_sink.send_frame(&Frame::new_ack(seq)).await.unwrap();
        (seq, peer_sink, peer_source)
    });

    let shared = Arc::new(SenderShared::new(&config.probe));
    let _intake = spawn_ack_intake(source, shared.clone());
    let mut sender = StopAndWait::new(sink, shared.clone(), &config);
    let report = sender.run(Duration::from_millis(10)).await.unwrap();

    let (seq, _peer_sink, _peer_source) = peer.await.unwrap();
    assert_eq!(seq, 1);
    assert_eq!(report.packets_sent, 1);
    assert_eq!(report.rtt_samples.len(), 1);
    assert!(report.rtt_samples[0].value >= Duration::from_millis(20));
    assert_eq!(
        shared.delivered_bytes().await,
        u64::from(config.probe.packet_size)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_run_against_receiver_advances_one_by_one() {
    init_tracing();
    let config = fast_config(Variant::StopAndWait);
    let (sink, source, session) = spawn_receiver(config.receiver.receive_window_budget);

    let shared = Arc::new(SenderShared::new(&config.probe));
    let intake = spawn_ack_intake(source, shared.clone());
    let mut sender = StopAndWait::new(sink, shared.clone(), &config);
    let report = sender.run(Duration::from_millis(300)).await.unwrap();

    assert!(report.rtt_samples.len() > 1);
    assert_eq!(report.packets_sent, report.rtt_samples.len() as u64);
    assert_eq!(report.retransmits.timeout, 0);
    assert!(!report.bandwidth_samples.is_empty());
    // The receiver acks next-expected: one past the last delivered packet.
    assert_eq!(shared.max_ack().await, report.rtt_samples.len() as u32 + 1);

    sender.close().await.unwrap();
    let stats = session.await.unwrap().unwrap();
    assert_eq!(stats.frames_received, report.packets_sent);
    intake.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_gives_up_after_max_retries() {
    init_tracing();
    let mut config = fast_config(Variant::StopAndWait);
    config.reliability.rto = Duration::from_millis(20);
    config.reliability.stop_and_wait_max_retries = 3;

    let (client, peer) = duplex(64 * 1024);
    let (sink, source) = framed(client);
    // A peer that reads but never answers.
    let (_peer_sink, mut peer_source) = framed(peer);
    let silent = tokio::spawn(async move {
        let mut seen = 0;
        while let Ok(Some(_)) = peer_source.recv_frame().await {
            seen += 1;
        }
        seen
    });

    let shared = Arc::new(SenderShared::new(&config.probe));
    let _intake = spawn_ack_intake(source, shared.clone());
    let mut sender = StopAndWait::new(sink, shared, &config);
    let err = sender.run(Duration::from_secs(5)).await.unwrap_err();

    assert!(matches!(
        err,
        Error::RetriesExhausted {
            seq_num: 1,
            attempts: 3
        }
    ));
    sender.close().await.unwrap();
    assert_eq!(silent.await.unwrap(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_closed_connection_fails_the_run() {
    init_tracing();
    let config = fast_config(Variant::StopAndWait);
    let (client, peer) = duplex(64 * 1024);
    let (sink, source) = framed(client);
    drop(peer);

    let shared = Arc::new(SenderShared::new(&config.probe));
    let intake = spawn_ack_intake(source, shared.clone());
    intake.await.unwrap().unwrap();

    let mut sender = StopAndWait::new(sink, shared, &config);
    let err = sender.run(Duration::from_secs(1)).await.unwrap_err();
    assert!(err.is_fatal());
}
