// Keyboard stand-in for the app and the run button:
// W=forward, A=left, D=right, C=clear, SPACE=run button, Q=quit
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::Duration;
use tracing::info;

use diffbot_runtime::config::RobotConfig;
use diffbot_runtime::hal::SystemClock;
use diffbot_runtime::messages::MoveCommand;
use diffbot_runtime::runtime::{Runtime, spawn_wheel_simulator};
use diffbot_runtime::sim::SimBoard;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let config = RobotConfig::default();
    let board = SimBoard::new();
    let mut runtime = Runtime::new(
        SystemClock::new(),
        board.clone(),
        board.clone(),
        board.clone(),
        &config,
    );
    let simulator = spawn_wheel_simulator(&board, &runtime, &config);

    info!("Controls: W=forward, A=left, D=right, C=clear, SPACE=run, Q=quit");

    enable_raw_mode()?;
    let result = run_keyboard(&mut runtime, &board, config.button.pin);
    disable_raw_mode()?;

    runtime.halt();
    simulator.abort();
    result
}

fn run_keyboard(
    runtime: &mut Runtime<SystemClock, SimBoard, SimBoard>,
    board: &SimBoard,
    button_pin: u8,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut last_state = runtime.status().state;

    loop {
        // Button is only held for one tick
        board.set_input(button_pin, false);

        // Poll for key with 20ms timeout (50Hz control rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press;

                match code {
                    KeyCode::Char('w') if pressed => queue(runtime, MoveCommand::Forward),
                    KeyCode::Char('a') if pressed => queue(runtime, MoveCommand::Left),
                    KeyCode::Char('d') if pressed => queue(runtime, MoveCommand::Right),
                    KeyCode::Char('c') if pressed => {
                        runtime.clear_program();
                        info!("Program cleared");
                    }
                    KeyCode::Char(' ') if pressed => board.set_input(button_pin, true),

                    // Quit
                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => {}
                }
            }
        }

        runtime.step();

        let status = runtime.status();
        if status.state != last_state {
            info!(
                "{:?}: command {:?}, ticks {}/{}, factors {:.2}/{:.2}",
                status.state,
                status.command,
                status.left_count,
                status.right_count,
                status.left_throttle_factor,
                status.right_throttle_factor
            );
            last_state = status.state;
        }
    }

    Ok(())
}

fn queue(runtime: &mut Runtime<SystemClock, SimBoard, SimBoard>, command: MoveCommand) {
    runtime.on_command(command);
    info!("Program: {:?}", runtime.program());
}
