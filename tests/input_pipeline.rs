use arcadebox::backends::virtual_input::VirtualDevice;
use arcadebox::config::InputSettings;
use arcadebox::event::{Directions, InputEvent, InputKind, InputSource};
use arcadebox::multiplexer::{EventSource, InputMultiplexer};
use arcadebox::BindingProfile;
use pretty_assertions::assert_eq;
use std::thread;
use std::time::{Duration, Instant};

fn settings() -> InputSettings {
    InputSettings {
        debounce_ms: 20,
        repeat_delay_ms: 0,
        keypad_scan_ms: 1,
        gamepad_poll_ms: 1,
        reconnect_ms: 50,
        ..InputSettings::default()
    }
}

fn next_within(mux: &mut InputMultiplexer, timeout: Duration) -> Option<InputEvent> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Some(event) = mux.try_next() {
            return Some(event);
        }
        thread::sleep(Duration::from_millis(1));
    }
    None
}

fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

#[test]
fn both_devices_merge_earliest_first() {
    let mut mux = InputMultiplexer::new(settings());
    let (keypad, keys) = VirtualDevice::new("keypad", InputSource::Keypad);
    let (gamepad, pad) = VirtualDevice::new("gamepad", InputSource::Gamepad);
    mux.attach(Box::new(keypad), BindingProfile::keypad_default());
    mux.attach(Box::new(gamepad), BindingProfile::gamepad_default());

    keys.press_key('3');
    thread::sleep(Duration::from_millis(60));
    pad.press_button(0);
    thread::sleep(Duration::from_millis(100));

    let first = next_within(&mut mux, Duration::from_secs(1)).unwrap();
    let second = next_within(&mut mux, Duration::from_secs(1)).unwrap();
    assert_eq!(
        (first.kind, first.source, first.selection),
        (InputKind::Confirm, InputSource::Keypad, Some(3))
    );
    assert_eq!(
        (second.kind, second.source, second.selection),
        (InputKind::Confirm, InputSource::Gamepad, None)
    );
    assert!(first.at <= second.at);

    // Held keys do not produce more events.
    assert!(next_within(&mut mux, Duration::from_millis(100)).is_none());
}

#[test]
fn held_directions_follow_the_stick() {
    let mut mux = InputMultiplexer::new(settings());
    let (gamepad, pad) = VirtualDevice::new("gamepad", InputSource::Gamepad);
    mux.attach(Box::new(gamepad), BindingProfile::gamepad_default());

    pad.set_axis(0, 0.9);
    pad.set_axis(1, -0.8);
    assert!(wait_until(Duration::from_secs(1), || {
        mux.held() == Directions::RIGHT | Directions::UP
    }));

    pad.set_axis(0, 0.1);
    pad.set_axis(1, 0.0);
    assert!(wait_until(Duration::from_secs(1), || mux.held().is_empty()));
}

#[test]
fn unplugged_gamepad_leaves_keypad_working() {
    let mut mux = InputMultiplexer::new(settings());
    let (keypad, keys) = VirtualDevice::new("keypad", InputSource::Keypad);
    let (gamepad, pad) = VirtualDevice::new("gamepad", InputSource::Gamepad);
    pad.disconnect();
    mux.attach(Box::new(gamepad), BindingProfile::gamepad_default());
    mux.attach(Box::new(keypad), BindingProfile::keypad_default());

    keys.press_key('A');
    let event = next_within(&mut mux, Duration::from_secs(1)).unwrap();
    assert_eq!((event.kind, event.source), (InputKind::Start, InputSource::Keypad));

    pad.connect();
    pad.press_button(1);
    let event = next_within(&mut mux, Duration::from_secs(1)).unwrap();
    assert_eq!((event.kind, event.source), (InputKind::Back, InputSource::Gamepad));
}

#[test]
fn poll_blocks_until_input_arrives() {
    let mut mux = InputMultiplexer::new(settings());
    let (keypad, keys) = VirtualDevice::new("keypad", InputSource::Keypad);
    mux.attach(Box::new(keypad), BindingProfile::keypad_default());

    let presser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        keys.press_key('*');
    });
    let event = mux.poll().next().unwrap();
    assert_eq!(event.kind, InputKind::NavUp);
    presser.join().unwrap();
}
