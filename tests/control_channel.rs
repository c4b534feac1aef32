// Live round-trips over a real fifo on disk.

use std::io::Write;
use std::path::PathBuf;

use serial_test::serial;

use pacepipe::Control::codec::ControlMessage;
use pacepipe::Control::listener::ControlListener;
use pacepipe::Control::sender::{send_changes, ChangeSet};
use pacepipe::Core::fifo;
use pacepipe::Pacing::Structs::Engine_Structs::RateConfig;

fn temp_fifo_path() -> PathBuf {
    std::env::temp_dir().join(format!(
        "pacepipe-test-{}-{:016x}",
        std::process::id(),
        fastrand::u64(..)
    ))
}

#[test]
#[serial]
fn an_idle_channel_polls_empty_without_blocking() {
    let path = temp_fifo_path();
    let _guard = fifo::create(&path).unwrap();
    let mut listener = ControlListener::new(fifo::open_listener(&path).unwrap());

    let mut config = RateConfig::new(1000.0);
    let before = config.clone();

    // No sender ever connected: zero messages is the normal outcome.
    assert_eq!(listener.drain(&mut config), 0);
    assert_eq!(config, before);
}

#[test]
#[serial]
fn a_batch_is_applied_in_one_drain() {
    let path = temp_fifo_path();
    let _guard = fifo::create(&path).unwrap();
    let mut listener = ControlListener::new(fifo::open_listener(&path).unwrap());

    let changes = ChangeSet {
        verbose: Some(true),
        limit: Some(250_000.0),
        window: Some(30),
        ..ChangeSet::default()
    };
    {
        let mut channel = fifo::open_sender(&path).unwrap();
        send_changes(&mut channel, &changes).unwrap();
    }

    let mut config = RateConfig::new(1000.0);
    assert_eq!(listener.drain(&mut config), 3);

    // The verbosity change travels first in the batch, so the limit
    // and window land with verbose already enabled.
    assert!(config.verbose);
    assert_eq!(config.rate, 250_000.0);
    assert_eq!(config.window, 30);
}

#[test]
#[serial]
fn malformed_records_do_not_stop_the_batch() {
    let path = temp_fifo_path();
    let _guard = fifo::create(&path).unwrap();
    let mut listener = ControlListener::new(fifo::open_listener(&path).unwrap());

    {
        let mut channel = fifo::open_sender(&path).unwrap();
        // A garbage record (wrong magic) followed by a valid one.
        let mut garbage = ControlMessage::Window(999).encode();
        garbage[0] = b'!';
        channel.write_all(&garbage).unwrap();
        channel
            .write_all(&ControlMessage::Window(120).encode())
            .unwrap();
    }

    let mut config = RateConfig::new(1000.0);
    assert_eq!(listener.drain(&mut config), 1);

    // The garbage record changed nothing; the valid one landed.
    assert_eq!(config.window, 120);
}

#[test]
#[serial]
fn resending_the_same_value_is_a_no_op() {
    let path = temp_fifo_path();
    let _guard = fifo::create(&path).unwrap();
    let mut listener = ControlListener::new(fifo::open_listener(&path).unwrap());

    let changes = ChangeSet {
        window: Some(120),
        ..ChangeSet::default()
    };

    let mut config = RateConfig::new(1000.0);
    for expected_applied in [1, 0] {
        let mut channel = fifo::open_sender(&path).unwrap();
        send_changes(&mut channel, &changes).unwrap();
        drop(channel);
        assert_eq!(listener.drain(&mut config), expected_applied);
        assert_eq!(config.window, 120);
    }
}

#[test]
#[serial]
fn random_payload_sizes_round_trip_exactly() {
    let path = temp_fifo_path();
    let _guard = fifo::create(&path).unwrap();
    let mut listener = ControlListener::new(fifo::open_listener(&path).unwrap());

    let block_size = fastrand::u64(1..1_048_576);
    let window = fastrand::u64(1..86_400);
    {
        let mut channel = fifo::open_sender(&path).unwrap();
        send_changes(
            &mut channel,
            &ChangeSet {
                window: Some(window),
                block_size: Some(block_size),
                ..ChangeSet::default()
            },
        )
        .unwrap();
    }

    let mut config = RateConfig::new(1000.0);
    listener.drain(&mut config);
    assert_eq!(config.window, window);
    assert_eq!(config.block_size, block_size as usize);
}

#[test]
#[serial]
fn the_guard_tears_the_fifo_down() {
    let path = temp_fifo_path();
    let guard = fifo::create(&path).unwrap();
    assert!(path.exists());
    drop(guard);
    assert!(!path.exists());
}
