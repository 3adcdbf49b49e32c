use arcadebox::backends::virtual_input::VirtualDevice;
use arcadebox::config::{ConsoleSettings, InputSettings};
use arcadebox::display::{DisplayCoordinator, DrawCommand, FontFace, NullSink, SecondarySink};
use arcadebox::hal::{Disconnected, Indicator};
use arcadebox::queue::drop_oldest;
use arcadebox::session::{Frame, GameSession, Outcome, Tick};
use arcadebox::{
    logger, BindingProfile, Catalog, Console, ConsoleError, Directions, FeedbackSequencer,
    GameFactory, GameId, InputEvent, InputKind, InputMultiplexer, InputSource, LaunchError,
    ShutdownSignal,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Prints the text of every secondary-panel redraw.
struct Terminal;

impl SecondarySink for Terminal {
    fn draw(&mut self, commands: &[DrawCommand]) -> Result<(), ConsoleError> {
        let lines: Vec<&str> = commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        println!("[panel] {}", lines.join(" | "));
        Ok(())
    }
}

/// Scores a point per ACTION press, ends after five.
struct Tapper {
    score: u32,
}

impl GameSession for Tapper {
    fn tick(&mut self, input: Option<&InputEvent>, _: Directions, _: Duration, _: &mut Frame) -> Tick {
        if input.map(|e| e.kind) == Some(InputKind::Action) {
            self.score += 1;
        }
        if self.score >= 5 {
            Tick::finished(Outcome::Win, self.score)
        } else {
            Tick::running(self.score)
        }
    }
}

fn tapper(_: GameId) -> Result<Box<dyn GameSession>, LaunchError> {
    Ok(Box::new(Tapper { score: 0 }))
}

fn main() {
    logger::init();

    let catalog = Arc::new(Catalog::standard([tapper as GameFactory; 9]));

    let mut input = InputMultiplexer::new(InputSettings::default());
    let (keypad, keys) = VirtualDevice::new("virtual keypad", InputSource::Keypad);
    input.attach(Box::new(keypad), BindingProfile::keypad_default());

    let feedback = FeedbackSequencer::new(
        Indicator::new(Box::new(Disconnected), Box::new(Disconnected), Box::new(Disconnected)),
        Box::new(Disconnected),
    );
    let display = DisplayCoordinator::new(
        catalog.clone(),
        Box::new(NullSink),
        Box::new(Terminal),
        FontFace::BuiltIn,
    );
    let (power, shutdown) = drop_oldest(1);

    // Plays game 3 from the keypad, then "holds the power button".
    let script = thread::spawn(move || {
        let tap = |key: char| {
            keys.press_key(key);
            thread::sleep(Duration::from_millis(120));
            keys.release_key(key);
            thread::sleep(Duration::from_millis(120));
        };
        thread::sleep(Duration::from_secs(1));
        tap('#');
        tap('#');
        tap('B');
        tap('A');
        thread::sleep(Duration::from_millis(3200));
        for _ in 0..5 {
            tap('C');
        }
        thread::sleep(Duration::from_secs(1));
        power.push(ShutdownSignal);
    });

    let mut console = Console::new(
        catalog,
        ConsoleSettings::default(),
        Box::new(feedback),
        Box::new(display),
        shutdown,
    );
    console.run(&mut input);
    let _ = script.join();
}
