//! Brings the whole console up from a [`ConsoleConfig`] and runs it.

use crate::backends::{self, open_buzzer, open_indicator, open_power_button, open_primary};
use crate::catalog::Catalog;
use crate::config::ConsoleConfig;
use crate::console::Console;
use crate::display::{DisplayCoordinator, FontFace, SecondarySink};
use crate::error::ConsoleError;
use crate::event::InputSource;
use crate::feedback::FeedbackSequencer;
use crate::logger::Logged;
use crate::multiplexer::InputMultiplexer;
use crate::queue::drop_oldest;
use crate::watchdog::{PowerWatchdog, SystemShutdown};
use std::sync::Arc;

/// Runs the console until a shutdown is requested.
///
/// The secondary panel driver is board specific and is passed in; everything
/// else is opened from `config`. Peripherals that fail to open are replaced by
/// stand-ins, so the only hard error is failing to start the watchdog thread.
pub fn run(
    config: &ConsoleConfig,
    catalog: Catalog,
    secondary: Box<dyn SecondarySink>,
) -> Result<(), ConsoleError> {
    let catalog = Arc::new(catalog);

    let (notify, shutdown) = drop_oldest(1);
    let watchdog = PowerWatchdog::new(
        open_power_button(config),
        Box::new(SystemShutdown::new(config.watchdog.command.clone())),
        notify,
        &config.watchdog,
    )
    .spawn()?;

    let feedback = FeedbackSequencer::new(open_indicator(config), open_buzzer(config));
    let display = DisplayCoordinator::new(
        catalog.clone(),
        open_primary(config),
        secondary,
        FontFace::resolve(&config.display.fonts),
    );

    let mut input = InputMultiplexer::new(config.input.clone());
    for device in backends::probe_devices(config) {
        let profile = match device.source() {
            InputSource::Keypad => config.bindings.keypad_profile(),
            InputSource::Gamepad => config.bindings.gamepad_profile(),
        };
        input.attach(device, profile);
    }

    let mut console = Console::new(
        catalog,
        config.console.clone(),
        Box::new(feedback),
        Box::new(display),
        shutdown,
    );
    console.run(&mut Logged::new(input));

    // Console first: that stops the cue worker and releases the displays.
    drop(console);
    watchdog.stop();
    Ok(())
}
