use arcadebox::config::ConsoleSettings;
use arcadebox::console::{Console, ConsoleState, StateKind};
use arcadebox::display::Screen;
use arcadebox::event::{Directions, InputEvent, InputKind, InputSource};
use arcadebox::feedback::{Cue, CueSink};
use arcadebox::multiplexer::EventSource;
use arcadebox::queue::{drop_oldest, DropOldestSender};
use arcadebox::session::{Color, Frame, GameSession, Outcome, Tick, BLACK};
use arcadebox::watchdog::ShutdownSignal;
use arcadebox::{Catalog, GameFactory, GameId, LaunchError};
use pretty_assertions::assert_eq;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Clone, Debug, PartialEq)]
enum CueCall {
    Play(Cue),
    Cancel,
}

#[derive(Clone, Default)]
struct Cues(Arc<Mutex<Vec<CueCall>>>);

impl Cues {
    fn played(&self, cue: Cue) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|call| **call == CueCall::Play(cue))
            .count()
    }

    fn last(&self) -> Option<CueCall> {
        self.0.lock().unwrap().last().cloned()
    }
}

impl CueSink for Cues {
    fn play(&mut self, cue: Cue) {
        self.0.lock().unwrap().push(CueCall::Play(cue));
    }

    fn cancel(&mut self) {
        JOURNAL.lock().unwrap().push("cancel");
        self.0.lock().unwrap().push(CueCall::Cancel);
    }
}

/// Records each render, plus the top-left canvas pixel when a canvas is shown.
#[derive(Clone, Default)]
struct Screens {
    renders: Arc<Mutex<Vec<(StateKind, bool)>>>,
    corners: Arc<Mutex<Vec<(StateKind, Color)>>>,
}

impl Screens {
    fn last(&self) -> Option<(StateKind, bool)> {
        self.renders.lock().unwrap().last().copied()
    }

    fn corners_during(&self, kind: StateKind) -> Vec<Color> {
        self.corners
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, c)| *c)
            .collect()
    }
}

impl Screen for Screens {
    fn render(&mut self, state: &ConsoleState, canvas: Option<&Frame>) {
        self.renders.lock().unwrap().push((state.kind(), canvas.is_some()));
        if let Some(pixel) = canvas.and_then(|frame| frame.get(0, 0)) {
            self.corners.lock().unwrap().push((state.kind(), pixel));
        }
    }
}

#[derive(Default)]
struct Script {
    events: VecDeque<InputEvent>,
    held: Directions,
}

impl Script {
    fn push(&mut self, kind: InputKind) {
        self.events
            .push_back(InputEvent::new(kind, InputSource::Gamepad, Instant::now()));
    }

    fn digit(&mut self, n: u8) {
        self.events
            .push_back(InputEvent::select(n, InputSource::Keypad, Instant::now()));
    }
}

impl EventSource for Script {
    fn try_next(&mut self) -> Option<InputEvent> {
        self.events.pop_front()
    }

    fn held(&self) -> Directions {
        self.held
    }
}

static LAUNCHES: AtomicUsize = AtomicUsize::new(0);
static JOURNAL: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());
static INPUTS: Mutex<Vec<InputKind>> = Mutex::new(Vec::new());
static HELD: Mutex<Vec<Directions>> = Mutex::new(Vec::new());

/// Never finishes; counts its ticks as score.
struct Endless {
    ticks: u32,
}

impl GameSession for Endless {
    fn tick(&mut self, _: Option<&InputEvent>, _: Directions, _: Duration, _: &mut Frame) -> Tick {
        self.ticks += 1;
        Tick::running(self.ticks)
    }
}

fn endless(_: GameId) -> Result<Box<dyn GameSession>, LaunchError> {
    Ok(Box::new(Endless { ticks: 0 }))
}

fn counted(id: GameId) -> Result<Box<dyn GameSession>, LaunchError> {
    LAUNCHES.fetch_add(1, Ordering::SeqCst);
    endless(id)
}

/// Writes its teardown into the shared journal.
struct Journaled;

impl GameSession for Journaled {
    fn tick(&mut self, _: Option<&InputEvent>, _: Directions, _: Duration, _: &mut Frame) -> Tick {
        Tick::running(0)
    }

    fn teardown(&mut self) {
        JOURNAL.lock().unwrap().push("teardown");
    }
}

fn journaled(_: GameId) -> Result<Box<dyn GameSession>, LaunchError> {
    Ok(Box::new(Journaled))
}

/// Finishes on the first ACTION it receives.
struct OneShot;

impl GameSession for OneShot {
    fn tick(&mut self, input: Option<&InputEvent>, _: Directions, _: Duration, canvas: &mut Frame) -> Tick {
        canvas.set(0, 0, 0xFF_00_00);
        match input.map(|e| e.kind) {
            Some(InputKind::Action) => Tick::finished(Outcome::Win, 42),
            _ => Tick::running(7),
        }
    }
}

fn one_shot(_: GameId) -> Result<Box<dyn GameSession>, LaunchError> {
    Ok(Box::new(OneShot))
}

/// Records the inputs or the held directions it is given.
struct Recorder {
    inputs: Option<&'static Mutex<Vec<InputKind>>>,
    held: Option<&'static Mutex<Vec<Directions>>>,
}

impl GameSession for Recorder {
    fn tick(&mut self, input: Option<&InputEvent>, held: Directions, _: Duration, _: &mut Frame) -> Tick {
        if let (Some(inputs), Some(event)) = (self.inputs, input) {
            inputs.lock().unwrap().push(event.kind);
        }
        if let Some(log) = self.held {
            log.lock().unwrap().push(held);
        }
        Tick::running(0)
    }
}

fn input_recorder(_: GameId) -> Result<Box<dyn GameSession>, LaunchError> {
    Ok(Box::new(Recorder {
        inputs: Some(&INPUTS),
        held: None,
    }))
}

fn held_recorder(_: GameId) -> Result<Box<dyn GameSession>, LaunchError> {
    Ok(Box::new(Recorder {
        inputs: None,
        held: Some(&HELD),
    }))
}

fn broken(_: GameId) -> Result<Box<dyn GameSession>, LaunchError> {
    Err(LaunchError::new("assets missing"))
}

struct Rig {
    console: Console,
    cues: Cues,
    screens: Screens,
    script: Script,
    shutdown: DropOldestSender<ShutdownSignal>,
}

impl Rig {
    fn new(factories: [GameFactory; 9]) -> Self {
        let catalog = Arc::new(Catalog::standard(factories));
        let cues = Cues::default();
        let screens = Screens::default();
        let (shutdown, rx) = drop_oldest(1);
        let mut console = Console::new(
            catalog,
            ConsoleSettings::default(),
            Box::new(cues.clone()),
            Box::new(screens.clone()),
            rx,
        );
        console.start();
        let mut rig = Self {
            console,
            cues,
            screens,
            script: Script::default(),
            shutdown,
        };
        rig.frame(Duration::from_secs(1));
        assert_eq!(rig.console.kind(), StateKind::Menu);
        rig
    }

    fn frame(&mut self, dt: Duration) {
        self.console.run_frame(&mut self.script, dt);
    }

    fn frames(&mut self, n: usize) {
        for _ in 0..n {
            self.frame(Duration::from_millis(16));
        }
    }

    fn press(&mut self, kinds: &[InputKind]) {
        for &kind in kinds {
            self.script.push(kind);
        }
        self.frame(Duration::from_millis(16));
    }

    fn selected(&self) -> Option<usize> {
        match self.console.state() {
            ConsoleState::Menu { selected } => Some(*selected),
            _ => None,
        }
    }

    fn instructions_for(&self) -> Option<u8> {
        match self.console.state() {
            ConsoleState::Instructions { game, .. } => Some(game.get()),
            _ => None,
        }
    }

    /// From the menu, enter game `n` and wait out the countdown.
    fn play(&mut self, n: u8) {
        self.script.digit(n);
        self.press(&[InputKind::Start]);
        self.frame(Duration::from_secs(3));
    }
}

fn all(factory: GameFactory) -> [GameFactory; 9] {
    [factory; 9]
}

#[test]
fn boot_plays_cue_then_shows_menu() {
    let rig = Rig::new(all(endless));
    assert_eq!(rig.cues.0.lock().unwrap().first(), Some(&CueCall::Play(Cue::Boot)));
    assert_eq!(rig.screens.last(), Some((StateKind::Menu, false)));
    assert_eq!(rig.selected(), Some(0));
}

#[test]
fn navigating_down_twice_then_confirm_opens_game_three() {
    let mut rig = Rig::new(all(endless));
    rig.press(&[InputKind::NavDown, InputKind::NavDown, InputKind::Confirm]);
    assert_eq!(rig.instructions_for(), Some(3));
    assert_eq!(rig.cues.last(), Some(CueCall::Play(Cue::EnterInstructions)));
    assert_eq!(rig.screens.last(), Some((StateKind::Instructions, false)));
}

#[test]
fn menu_moves_click_unless_disabled() {
    let mut rig = Rig::new(all(endless));
    rig.press(&[InputKind::NavDown, InputKind::NavUp, InputKind::NavLeft]);
    assert_eq!(rig.cues.played(Cue::Click), 2);

    let (_tx, rx) = drop_oldest(1);
    let cues = Cues::default();
    let mut console = Console::new(
        Arc::new(Catalog::standard(all(endless))),
        ConsoleSettings {
            menu_clicks: false,
            ..ConsoleSettings::default()
        },
        Box::new(cues.clone()),
        Box::new(Screens::default()),
        rx,
    );
    let mut script = Script::default();
    console.start();
    console.run_frame(&mut script, Duration::from_secs(1));
    script.push(InputKind::NavDown);
    console.run_frame(&mut script, Duration::from_millis(16));
    assert!(matches!(console.state(), ConsoleState::Menu { selected: 1 }));
    assert_eq!(cues.played(Cue::Click), 0);
}

#[test]
fn digit_selects_regardless_of_cursor() {
    let mut rig = Rig::new(all(endless));
    rig.press(&[InputKind::NavUp, InputKind::NavUp]);
    assert_eq!(rig.selected(), Some(7));
    rig.script.digit(7);
    rig.frame(Duration::from_millis(16));
    assert_eq!(rig.instructions_for(), Some(7));
}

#[test]
fn invalid_digits_leave_menu_unchanged() {
    let mut rig = Rig::new(all(endless));
    rig.press(&[InputKind::NavDown]);
    for digit in [0, 10, 42] {
        rig.script.digit(digit);
        rig.frame(Duration::from_millis(16));
        assert_eq!(rig.selected(), Some(1));
    }
}

#[test]
fn back_from_instructions_restores_cursor() {
    let mut rig = Rig::new(all(endless));
    rig.press(&[InputKind::NavDown; 4]);
    rig.press(&[InputKind::Confirm]);
    assert_eq!(rig.instructions_for(), Some(5));
    rig.press(&[InputKind::Back]);
    assert_eq!(rig.selected(), Some(4));
    assert_eq!(rig.cues.last(), Some(CueCall::Play(Cue::ReturnToMenu)));

    // Digit selection does not move the cursor either.
    rig.script.digit(9);
    rig.press(&[InputKind::Back]);
    assert_eq!(rig.selected(), Some(4));
}

#[test]
fn launch_failure_returns_to_menu_with_one_cue() {
    let mut factories = all(endless);
    factories[4] = broken;
    let mut rig = Rig::new(factories);

    rig.script.digit(5);
    rig.press(&[InputKind::Start]);
    assert_eq!(rig.console.kind(), StateKind::Countdown);
    rig.frame(Duration::from_secs(3));
    assert_eq!(rig.console.kind(), StateKind::Menu);
    rig.frames(10);

    assert_eq!(rig.cues.played(Cue::LaunchFailed), 1);
    assert_eq!(rig.cues.played(Cue::Countdown), 1);
}

#[test]
fn countdown_launches_exactly_once() {
    let mut rig = Rig::new(all(counted));
    rig.script.digit(2);
    rig.press(&[InputKind::Start]);
    for _ in 0..200 {
        rig.frame(Duration::from_millis(16));
    }
    assert_eq!(rig.console.kind(), StateKind::Playing);
    assert_eq!(LAUNCHES.load(Ordering::SeqCst), 1);
    assert_eq!(rig.screens.last(), Some((StateKind::Playing, true)));
}

#[test]
fn playing_takes_one_event_per_frame_and_reports_score() {
    let mut rig = Rig::new(all(one_shot));
    rig.play(1);
    assert_eq!(rig.console.kind(), StateKind::Playing);

    rig.script.push(InputKind::NavLeft);
    rig.script.push(InputKind::Action);
    rig.frame(Duration::from_millis(16));
    assert!(matches!(rig.console.state(), ConsoleState::Playing { score: 7, .. }));

    rig.frame(Duration::from_millis(16));
    assert!(matches!(
        rig.console.state(),
        ConsoleState::GameOver { score: 42, .. }
    ));
    assert_eq!(rig.cues.played(Cue::GameOver), 1);
}

#[test]
fn game_over_times_out_or_confirms_to_menu() {
    let mut rig = Rig::new(all(one_shot));
    rig.press(&[InputKind::NavDown]);
    rig.play(2);
    rig.press(&[InputKind::Action]);
    rig.frame(Duration::from_millis(16));
    assert_eq!(rig.console.kind(), StateKind::GameOver);

    rig.frame(Duration::from_millis(2900));
    assert_eq!(rig.console.kind(), StateKind::GameOver);
    rig.frame(Duration::from_millis(200));
    assert_eq!(rig.selected(), Some(1));

    rig.play(2);
    rig.press(&[InputKind::Action]);
    rig.frame(Duration::from_millis(16));
    rig.press(&[InputKind::Confirm]);
    assert_eq!(rig.console.kind(), StateKind::Menu);
}

#[test]
fn pause_resume_and_quit() {
    let mut rig = Rig::new(all(endless));
    rig.play(3);
    rig.press(&[InputKind::Start]);
    assert_eq!(rig.console.kind(), StateKind::Paused);
    assert_eq!(rig.screens.last(), Some((StateKind::Paused, true)));

    let before = match rig.console.state() {
        ConsoleState::Paused { score, .. } => *score,
        _ => unreachable!(),
    };
    rig.frames(5);
    assert!(matches!(rig.console.state(), ConsoleState::Paused { score, .. } if *score == before));

    rig.press(&[InputKind::Start]);
    assert_eq!(rig.console.kind(), StateKind::Playing);
    rig.press(&[InputKind::Start]);
    rig.press(&[InputKind::Back]);
    assert_eq!(rig.selected(), Some(0));
}

#[test]
fn countdown_shows_a_cleared_canvas_after_a_previous_game() {
    let mut rig = Rig::new(all(one_shot));
    rig.play(1);
    rig.frame(Duration::from_millis(16));
    rig.press(&[InputKind::Action]);
    assert_eq!(rig.console.kind(), StateKind::GameOver);
    assert!(rig.screens.corners_during(StateKind::Playing).contains(&0xFF_00_00));

    rig.press(&[InputKind::Confirm]);
    rig.script.digit(2);
    rig.press(&[InputKind::Start]);
    rig.frame(Duration::from_millis(1500));
    assert_eq!(rig.console.kind(), StateKind::Countdown);

    let shown = rig.screens.corners_during(StateKind::Countdown);
    assert!(!shown.is_empty());
    assert!(shown.iter().all(|&pixel| pixel == BLACK), "{shown:x?}");
}

#[test]
fn events_queued_while_paused_reach_the_game_in_order() {
    let mut factories = all(endless);
    factories[5] = input_recorder;
    let mut rig = Rig::new(factories);
    rig.play(6);
    rig.press(&[InputKind::Start]);
    assert_eq!(rig.console.kind(), StateKind::Paused);
    INPUTS.lock().unwrap().clear();

    rig.script.push(InputKind::Start);
    rig.script.push(InputKind::NavLeft);
    rig.script.push(InputKind::Action);
    rig.frames(5);

    assert_eq!(rig.console.kind(), StateKind::Playing);
    assert_eq!(*INPUTS.lock().unwrap(), vec![InputKind::NavLeft, InputKind::Action]);
}

#[test]
fn held_directions_reach_the_game_only_while_playing() {
    let mut factories = all(endless);
    factories[6] = held_recorder;
    let mut rig = Rig::new(factories);
    rig.play(7);
    HELD.lock().unwrap().clear();

    rig.script.held = Directions::LEFT;
    rig.frame(Duration::from_millis(16));
    rig.script.held = Directions::LEFT | Directions::UP;
    rig.frame(Duration::from_millis(16));
    assert_eq!(
        *HELD.lock().unwrap(),
        vec![Directions::LEFT, Directions::LEFT | Directions::UP]
    );

    rig.press(&[InputKind::Start]);
    assert_eq!(rig.console.kind(), StateKind::Paused);
    HELD.lock().unwrap().clear();
    rig.script.held = Directions::RIGHT;
    rig.frames(5);
    assert!(HELD.lock().unwrap().is_empty());
}

#[test]
fn shutdown_tears_down_session_before_cancelling_cue() {
    let mut factories = all(endless);
    factories[8] = journaled;
    let mut rig = Rig::new(factories);
    rig.play(9);
    assert_eq!(rig.console.kind(), StateKind::Playing);
    JOURNAL.lock().unwrap().clear();

    rig.shutdown.push(ShutdownSignal);
    rig.script.push(InputKind::Start);
    rig.frame(Duration::from_millis(16));

    assert_eq!(rig.console.kind(), StateKind::ShuttingDown);
    assert_eq!(*JOURNAL.lock().unwrap(), vec!["teardown", "cancel"]);
    assert_eq!(rig.cues.last(), Some(CueCall::Cancel));
    assert_eq!(rig.screens.last(), Some((StateKind::ShuttingDown, false)));

    rig.frames(3);
    assert_eq!(rig.console.kind(), StateKind::ShuttingDown);
}

#[test]
fn arbitrary_input_never_escapes_the_state_set() {
    const KINDS: [InputKind; 8] = [
        InputKind::NavUp,
        InputKind::NavDown,
        InputKind::NavLeft,
        InputKind::NavRight,
        InputKind::Confirm,
        InputKind::Back,
        InputKind::Start,
        InputKind::Action,
    ];
    let mut factories = all(one_shot);
    factories[1] = broken;
    let mut rig = Rig::new(factories);

    let mut seed: u32 = 0x2545_F491;
    for _ in 0..2000 {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        if seed % 7 == 0 {
            rig.script.digit((seed >> 8) as u8 % 11);
        } else {
            rig.script.push(KINDS[seed as usize % KINDS.len()]);
        }
        rig.frame(Duration::from_millis(u64::from(seed % 700)));

        match rig.console.state() {
            ConsoleState::Menu { selected } => assert!(*selected < 9),
            ConsoleState::ShuttingDown | ConsoleState::Booting { .. } => {
                panic!("unexpected state {:?}", rig.console.kind())
            }
            _ => {}
        }
    }
}
