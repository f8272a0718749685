// Control loop: run button, command program, motor updates
//
// Commands are executed one at a time. The next command is only started after
// the motors report the previous movement finished, the same handshake the
// companion app uses when it streams commands to the robot.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::button::Button;
use crate::config::RobotConfig;
use crate::hal::{Clock, DigitalInput, PwmOutput, SystemClock};
use crate::messages::{MoveCommand, MovementPresets, RobotStatus};
use crate::motor::RobotMotors;
use crate::sim::{SimBoard, SimWheel};

pub struct Runtime<C: Clock + Clone, P: PwmOutput, I: DigitalInput> {
    clock: C,
    motors: RobotMotors<C, P>,
    button: Button<C, I>,
    presets: MovementPresets,
    program: Vec<MoveCommand>,
    pending: VecDeque<MoveCommand>,
    current: Option<MoveCommand>,
    finished_rx: UnboundedReceiver<()>,
    movements_completed: usize,
    program_complete: bool,
}

impl<C: Clock + Clone, P: PwmOutput, I: DigitalInput> Runtime<C, P, I> {
    pub fn new(clock: C, left_output: P, right_output: P, input: I, config: &RobotConfig) -> Self {
        let mut motors = RobotMotors::new(clock.clone(), left_output, right_output, &config.motors);
        motors.attach_left_motor(config.left_pins[0], config.left_pins[1]);
        motors.attach_right_motor(config.right_pins[0], config.right_pins[1]);

        let (finished_tx, finished_rx) = mpsc::unbounded_channel();
        motors.on_movement_finished(move || {
            // Receiver lives as long as the runtime, nothing to do if it's gone
            let _ = finished_tx.send(());
        });

        let button = Button::new(
            clock.clone(),
            input,
            config.button.pin,
            config.button.debounce_period_ms,
        );

        Self {
            clock,
            motors,
            button,
            presets: config.presets,
            program: Vec::new(),
            pending: VecDeque::new(),
            current: None,
            finished_rx,
            movements_completed: 0,
            program_complete: false,
        }
    }

    /// Append a command to the stored program
    pub fn on_command(&mut self, command: MoveCommand) {
        debug!("Queued command: {}", command);
        self.program.push(command);
    }

    /// Replace the stored program
    pub fn load_program(&mut self, commands: impl IntoIterator<Item = MoveCommand>) {
        self.program = commands.into_iter().collect();
        info!("Program loaded: {} commands", self.program.len());
    }

    pub fn clear_program(&mut self) {
        self.program.clear();
    }

    pub fn program(&self) -> &[MoveCommand] {
        &self.program
    }

    pub fn motors(&self) -> &RobotMotors<C, P> {
        &self.motors
    }

    /// True once every command of the last run has been executed
    pub fn program_complete(&self) -> bool {
        self.program_complete
    }

    /// A command is executing or queued, or the motors haven't settled yet
    pub fn is_busy(&self) -> bool {
        self.current.is_some() || !self.pending.is_empty() || !self.motors.is_waiting()
    }

    /// Start the stored program from the top. Ignored while busy.
    pub fn run_program(&mut self) -> bool {
        if self.is_busy() {
            debug!("Run ignored, program already running");
            return false;
        }
        if self.program.is_empty() {
            warn!("Run requested but no commands are queued");
            return false;
        }

        self.pending = self.program.iter().copied().collect();
        self.program_complete = false;
        info!("Running program of {} commands", self.pending.len());
        self.start_next();
        true
    }

    /// One control tick: button, completion handshake, motor update
    pub fn step(&mut self) {
        if self.button.is_pressed() {
            info!("Run button pressed");
            self.run_program();
        }

        while self.finished_rx.try_recv().is_ok() {
            if let Some(command) = self.current.take() {
                debug!("Finished {}", command);
            }
            self.movements_completed += 1;
            self.start_next();
        }

        self.motors.update_motors();
    }

    /// Stop the wheels and drop the rest of the program
    pub fn halt(&mut self) {
        self.pending.clear();
        self.current = None;
        self.motors.halt();
        // A completion posted before the halt belongs to the dropped program
        while self.finished_rx.try_recv().is_ok() {}
    }

    pub fn status(&self) -> RobotStatus {
        let (left_throttle_factor, right_throttle_factor) = self.motors.throttle_factors();
        RobotStatus {
            time_ms: self.clock.now_ms(),
            state: self.motors.state(),
            command: self.current,
            left_count: self.motors.left_motor().encoder_count(),
            right_count: self.motors.right_motor().encoder_count(),
            left_throttle_factor,
            right_throttle_factor,
            remaining: self.pending.len(),
            movements_completed: self.movements_completed,
        }
    }

    fn start_next(&mut self) {
        while let Some(command) = self.pending.pop_front() {
            let profile = *self.presets.profile(command);
            match self.motors.start_profile(&profile) {
                Ok(()) => {
                    info!("Executing {} ({} left)", command, self.pending.len());
                    self.current = Some(command);
                    return;
                }
                Err(e) => warn!("Skipping {}: {}", command, e),
            }
        }

        self.current = None;
        if !self.program_complete {
            self.program_complete = true;
            info!("Program complete");
        }
    }
}

/// Options for `run`, usually from the command line
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub program: Vec<MoveCommand>,
    pub auto_start: bool,
    pub json: bool,
    pub exit_when_done: bool,
}

/// Drive both simulated wheels from `board` in a background task
///
/// Ticks land on the encoder counters concurrently with the control loop, the
/// way encoder interrupts would on hardware.
pub fn spawn_wheel_simulator<C, P, I>(
    board: &SimBoard,
    runtime: &Runtime<C, P, I>,
    config: &RobotConfig,
) -> JoinHandle<()>
where
    C: Clock + Clone,
    P: PwmOutput,
    I: DigitalInput,
{
    let sim = config.sim;
    let wheels = [
        SimWheel::new(
            (config.left_pins[0], config.left_pins[1]),
            runtime.motors().left_encoder(),
            sim.max_counts_per_second,
            sim.left_gain,
        ),
        SimWheel::new(
            (config.right_pins[0], config.right_pins[1]),
            runtime.motors().right_encoder(),
            sim.max_counts_per_second,
            sim.right_gain,
        ),
    ];

    tokio::spawn(simulate_wheels(board.clone(), wheels, sim.step_ms))
}

async fn simulate_wheels(board: SimBoard, mut wheels: [SimWheel; 2], step_ms: u64) {
    let step_ms = step_ms.max(1);
    let mut tick = interval(Duration::from_millis(step_ms));
    loop {
        tick.tick().await;
        for wheel in wheels.iter_mut() {
            wheel.step(&board, step_ms);
        }
    }
}

pub async fn run(
    config: RobotConfig,
    options: RunOptions,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    config.validate()?;

    let board = SimBoard::new();
    let mut runtime = Runtime::new(
        SystemClock::new(),
        board.clone(),
        board.clone(),
        board.clone(),
        &config,
    );
    runtime.load_program(options.program.iter().copied());

    if options.exit_when_done && runtime.program().is_empty() {
        warn!("Nothing to run, exiting");
        return Ok(());
    }

    let simulator = spawn_wheel_simulator(&board, &runtime, &config);

    let period_ms = (1000 / config.loop_hz.max(1)).max(1);
    let mut tick = interval(Duration::from_millis(period_ms));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        "Runtime started: {}Hz loop, button on pin {}, {}ms debounce",
        config.loop_hz, config.button.pin, config.button.debounce_period_ms
    );

    if options.auto_start {
        runtime.run_program();
    }

    let mut last_state = None;
    loop {
        tokio::select! {
            _ = tick.tick() => {}
            _ = &mut shutdown => {
                info!("Shutdown requested, stopping motors");
                break;
            }
        }

        runtime.step();

        let status = runtime.status();
        if options.json {
            println!("{}", serde_json::to_string(&status)?);
        }
        if last_state != Some(status.state) {
            info!(
                "State {:?} (command {:?}, ticks {}/{})",
                status.state, status.command, status.left_count, status.right_count
            );
            last_state = Some(status.state);
        }

        if options.exit_when_done && runtime.program_complete() {
            break;
        }
    }

    runtime.halt();
    simulator.abort();

    let (left, right) = runtime.motors().throttle_factors();
    info!(
        "Learned throttle factors: left={:.2}, right={:.2}",
        left, right
    );
    Ok(())
}
