// Two-wheel orchestration: movement state machine and speed balancing
//
// Call `update_motors` once per control tick. While moving, each wheel follows
// its own `MotorMovement`; when both wheels have reached the goal the robot
// pauses briefly, returns to waiting and fires the completion callback.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::driver::Motor;
use super::encoder::EncoderCounter;
use super::movement::{MotionError, MotorMovement};
use crate::config::MotorsConfig;
use crate::hal::{Clock, PwmOutput};
use crate::math::clamp;
use crate::messages::MovementProfile;

/// Throttle factors are never raised above nominal
pub const MAX_THROTTLE_FACTOR: f32 = 1.0;
pub const MIN_THROTTLE_FACTOR: f32 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotMotorsState {
    Waiting,
    Moving,
    PauseAtEndOfMovement,
}

/// What the balancer compares between the two wheels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceMode {
    /// Scaled ticks counted during the sample window
    #[default]
    TickCount,
    /// Ticks per second from `Motor::measure_speed`
    MeasuredSpeed,
}

type MovementFinished = Box<dyn FnMut() + Send>;

pub struct RobotMotors<C: Clock, P: PwmOutput> {
    clock: C,
    left_motor: Motor<P>,
    right_motor: Motor<P>,
    left_movement: MotorMovement,
    right_movement: MotorMovement,
    state: RobotMotorsState,
    pause_time_ms: u64,
    speed_sample_period_ms: u64,
    balance_step: f32,
    balance_mode: BalanceMode,
    start_of_speed_sample_ms: u64,
    end_of_pause_ms: u64,
    started_measuring_speeds: bool,
    movement_finished: Option<MovementFinished>,
}

impl<C: Clock, P: PwmOutput> RobotMotors<C, P> {
    pub fn new(clock: C, left_output: P, right_output: P, config: &MotorsConfig) -> Self {
        let left_motor = Motor::new(left_output, config.min_throttle, config.speed_sample_period_ms)
            .with_encoder_factor(config.left_encoder_factor);
        let right_motor =
            Motor::new(right_output, config.min_throttle, config.speed_sample_period_ms)
                .with_encoder_factor(config.right_encoder_factor);

        Self {
            clock,
            left_motor,
            right_motor,
            left_movement: MotorMovement::default(),
            right_movement: MotorMovement::default(),
            state: RobotMotorsState::Waiting,
            pause_time_ms: config.pause_time_ms,
            speed_sample_period_ms: config.speed_sample_period_ms,
            balance_step: config.balance_step,
            balance_mode: config.balance_mode,
            start_of_speed_sample_ms: 0,
            end_of_pause_ms: 0,
            started_measuring_speeds: false,
            movement_finished: None,
        }
    }

    pub fn attach_left_motor(&mut self, pin_a: u8, pin_b: u8) {
        self.left_motor.attach(pin_a, pin_b);
    }

    pub fn attach_right_motor(&mut self, pin_a: u8, pin_b: u8) {
        self.right_motor.attach(pin_a, pin_b);
    }

    pub fn left_motor(&self) -> &Motor<P> {
        &self.left_motor
    }

    pub fn right_motor(&self) -> &Motor<P> {
        &self.right_motor
    }

    /// Tick counter for the left wheel's encoder interrupt
    pub fn left_encoder(&self) -> Arc<EncoderCounter> {
        self.left_motor.encoder()
    }

    /// Tick counter for the right wheel's encoder interrupt
    pub fn right_encoder(&self) -> Arc<EncoderCounter> {
        self.right_motor.encoder()
    }

    pub fn scaled_left_encoder_count(&self) -> f32 {
        self.left_motor.scaled_encoder_count()
    }

    pub fn scaled_right_encoder_count(&self) -> f32 {
        self.right_motor.scaled_encoder_count()
    }

    pub fn increment_left_encoder_count(&self) {
        self.left_motor.increment_encoder_count();
    }

    pub fn increment_right_encoder_count(&self) {
        self.right_motor.increment_encoder_count();
    }

    /// Current (left, right) calibration factors
    pub fn throttle_factors(&self) -> (f32, f32) {
        (
            self.left_motor.throttle_factor(),
            self.right_motor.throttle_factor(),
        )
    }

    pub fn set_throttle_factors(&mut self, left: f32, right: f32) {
        self.left_motor.set_throttle_factor(left);
        self.right_motor.set_throttle_factor(right);
    }

    /// Register the callback fired when a movement completes, replacing any previous one
    pub fn on_movement_finished<F>(&mut self, callback: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.movement_finished = Some(Box::new(callback));
    }

    pub fn state(&self) -> RobotMotorsState {
        self.state
    }

    pub fn is_waiting(&self) -> bool {
        self.state == RobotMotorsState::Waiting
    }

    /// Start a new movement, replacing whatever is in progress
    ///
    /// Both wheels share the start time, ramp-up time and tick thresholds; only
    /// throttles differ per side. An invalid profile leaves everything untouched.
    #[allow(clippy::too_many_arguments)]
    pub fn start_motors(
        &mut self,
        ramp_up_time_ms: u64,
        left_throttle: f32,
        right_throttle: f32,
        ramp_down_count: u32,
        count_goal: u32,
        left_end_throttle: f32,
        right_end_throttle: f32,
    ) -> Result<(), MotionError> {
        let now = self.clock.now_ms();

        let movements = MotorMovement::new(
            now,
            ramp_up_time_ms,
            left_throttle,
            ramp_down_count,
            count_goal,
            left_end_throttle,
        )
        .and_then(|left| {
            MotorMovement::new(
                now,
                ramp_up_time_ms,
                right_throttle,
                ramp_down_count,
                count_goal,
                right_end_throttle,
            )
            .map(|right| (left, right))
        });

        let (left, right) = match movements {
            Ok(pair) => pair,
            Err(e) => {
                warn!("Rejected movement: {}", e);
                return Err(e);
            }
        };

        self.left_motor.reset_encoder_count();
        self.right_motor.reset_encoder_count();
        self.started_measuring_speeds = false;
        self.left_movement = left;
        self.right_movement = right;

        if self.state != RobotMotorsState::Waiting {
            debug!("Restarting from {:?}", self.state);
        }
        self.state = RobotMotorsState::Moving;

        info!(
            "Movement started: throttle {}/{}, ramp up {}ms, ramp down at {}, goal {}",
            left_throttle, right_throttle, ramp_up_time_ms, ramp_down_count, count_goal
        );
        Ok(())
    }

    pub fn start_profile(&mut self, profile: &MovementProfile) -> Result<(), MotionError> {
        self.start_motors(
            profile.ramp_up_time_ms,
            profile.left_throttle,
            profile.right_throttle,
            profile.ramp_down_count,
            profile.count_goal,
            profile.left_end_throttle,
            profile.right_end_throttle,
        )
    }

    /// Advance the state machine; call once per control tick
    pub fn update_motors(&mut self) {
        match self.state {
            RobotMotorsState::Moving => {
                let now = self.clock.now_ms();

                let left_done = drive_wheel(&mut self.left_motor, &self.left_movement, now);
                let right_done = drive_wheel(&mut self.right_motor, &self.right_movement, now);

                self.balance_speeds(now);

                if left_done && right_done {
                    self.state = RobotMotorsState::PauseAtEndOfMovement;
                    self.end_of_pause_ms = now + self.pause_time_ms;
                    debug!(
                        "Goal reached at {}ms, pausing until {}ms",
                        now, self.end_of_pause_ms
                    );
                }
            }
            RobotMotorsState::PauseAtEndOfMovement => {
                if self.clock.now_ms() > self.end_of_pause_ms {
                    self.state = RobotMotorsState::Waiting;
                    info!("Movement finished");
                    if let Some(callback) = self.movement_finished.as_mut() {
                        callback();
                    }
                }
            }
            RobotMotorsState::Waiting => {}
        }
    }

    /// Stop both wheels and drop the current movement without notifying
    pub fn halt(&mut self) {
        self.left_motor.throttle(0.0);
        self.right_motor.throttle(0.0);
        if self.state != RobotMotorsState::Waiting {
            info!("Movement halted");
        }
        self.state = RobotMotorsState::Waiting;
    }

    // Nudge the calibration factors while both wheels cruise. The first tick at
    // full throttle opens a sample window; each elapsed window compares the
    // wheels and starts the next one.
    fn balance_speeds(&mut self, now: u64) {
        let left_count = self.left_motor.scaled_encoder_count();
        let right_count = self.right_motor.scaled_encoder_count();

        let cruising = self.left_movement.at_full_throttle(now, left_count)
            && self.right_movement.at_full_throttle(now, right_count);
        if !cruising {
            return;
        }

        if !self.started_measuring_speeds {
            self.started_measuring_speeds = true;
            self.restart_speed_sample(now);
            debug!("Started measuring speeds at {}ms", now);
            return;
        }

        if now < self.start_of_speed_sample_ms + self.speed_sample_period_ms {
            return;
        }

        let (left_speed, right_speed) = match self.balance_mode {
            BalanceMode::TickCount => (
                self.left_motor.take_speed_encoder_count(now),
                self.right_motor.take_speed_encoder_count(now),
            ),
            BalanceMode::MeasuredSpeed => (
                self.left_motor.measure_speed(now),
                self.right_motor.measure_speed(now),
            ),
        };

        if left_speed > right_speed {
            adjust_throttle_factors(&mut self.left_motor, &mut self.right_motor, self.balance_step);
        } else if right_speed > left_speed {
            adjust_throttle_factors(&mut self.right_motor, &mut self.left_motor, self.balance_step);
        }

        debug!(
            "Speed sample left={} right={} -> factors {:?}",
            left_speed,
            right_speed,
            self.throttle_factors()
        );

        // Both modes have already swapped the window counts to zero
        self.start_of_speed_sample_ms = now;
    }

    fn restart_speed_sample(&mut self, now: u64) {
        self.left_motor.reset_speed_encoder_count(now);
        self.right_motor.reset_speed_encoder_count(now);
        self.start_of_speed_sample_ms = now;
    }
}

impl<C: Clock, P: PwmOutput> Drop for RobotMotors<C, P> {
    fn drop(&mut self) {
        self.left_motor.throttle(0.0);
        self.right_motor.throttle(0.0);
    }
}

// Returns true when the wheel has reached its goal (and is now stopped)
fn drive_wheel<P: PwmOutput>(motor: &mut Motor<P>, movement: &MotorMovement, now: u64) -> bool {
    let count = motor.scaled_encoder_count();
    if movement.is_complete(count) {
        motor.throttle(0.0);
        true
    } else {
        motor.throttle(movement.get_throttle(now, count));
        false
    }
}

// Raise the slow wheel until it is at nominal, only then trim the fast one
fn adjust_throttle_factors<P: PwmOutput>(faster: &mut Motor<P>, slower: &mut Motor<P>, step: f32) {
    let slower_factor = slower.throttle_factor();
    if slower_factor < MAX_THROTTLE_FACTOR {
        slower.set_throttle_factor(clamp(
            slower_factor + step,
            MIN_THROTTLE_FACTOR,
            MAX_THROTTLE_FACTOR,
        ));
    } else {
        let faster_factor = faster.throttle_factor();
        faster.set_throttle_factor(clamp(
            faster_factor - step,
            MIN_THROTTLE_FACTOR,
            MAX_THROTTLE_FACTOR,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimBoard, SimClock};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const LEFT_PINS: (u8, u8) = (22, 23);
    const RIGHT_PINS: (u8, u8) = (19, 18);

    fn config() -> MotorsConfig {
        MotorsConfig {
            min_throttle: 0.0,
            pause_time_ms: 500,
            speed_sample_period_ms: 100,
            balance_step: 0.01,
            balance_mode: BalanceMode::TickCount,
            left_encoder_factor: 1.0,
            right_encoder_factor: 1.0,
        }
    }

    fn robot(
        clock: &SimClock,
        board: &SimBoard,
        config: &MotorsConfig,
    ) -> RobotMotors<SimClock, SimBoard> {
        let mut motors = RobotMotors::new(clock.clone(), board.clone(), board.clone(), config);
        motors.attach_left_motor(LEFT_PINS.0, LEFT_PINS.1);
        motors.attach_right_motor(RIGHT_PINS.0, RIGHT_PINS.1);
        motors
    }

    fn add_ticks(counter: &EncoderCounter, ticks: u32) {
        for _ in 0..ticks {
            counter.increment();
        }
    }

    #[test]
    fn test_starts_waiting() {
        let clock = SimClock::new(0);
        let board = SimBoard::new();
        let mut motors = robot(&clock, &board, &config());
        assert!(motors.is_waiting());

        // Waiting is a no-op
        motors.update_motors();
        assert_eq!(board.write_count(), 0);
    }

    #[test]
    fn test_start_motors_resets_encoders_and_moves() {
        let clock = SimClock::new(1000);
        let board = SimBoard::new();
        let mut motors = robot(&clock, &board, &config());

        add_ticks(&motors.left_encoder(), 42);
        add_ticks(&motors.right_encoder(), 7);

        motors.start_motors(200, 0.8, 0.6, 300, 400, 0.2, 0.1).unwrap();
        assert_eq!(motors.state(), RobotMotorsState::Moving);
        assert_eq!(motors.left_motor().encoder_count(), 0);
        assert_eq!(motors.right_motor().encoder_count(), 0);

        // Halfway through the ramp up
        clock.set(1100);
        motors.update_motors();
        assert!((board.applied_throttle(LEFT_PINS) - 0.4).abs() < 1e-4);
        assert!((board.applied_throttle(RIGHT_PINS) - 0.3).abs() < 1e-4);
    }

    #[test]
    fn test_invalid_profile_leaves_state_untouched() {
        let clock = SimClock::new(0);
        let board = SimBoard::new();
        let mut motors = robot(&clock, &board, &config());
        add_ticks(&motors.left_encoder(), 3);

        assert_eq!(
            motors.start_motors(0, 0.5, 0.5, 10, 20, 0.1, 0.1),
            Err(MotionError::ZeroRampUp)
        );
        assert!(motors.is_waiting());
        assert_eq!(motors.left_motor().encoder_count(), 3);

        assert!(motors.start_motors(100, 0.5, 0.5, 20, 20, 0.1, 0.1).is_err());
        assert!(motors.is_waiting());
    }

    #[test]
    fn test_wheel_stops_independently_at_goal() {
        let clock = SimClock::new(0);
        let board = SimBoard::new();
        let mut motors = robot(&clock, &board, &config());
        motors.start_motors(100, 0.5, 0.5, 50, 100, 0.25, 0.25).unwrap();

        clock.set(200);
        add_ticks(&motors.left_encoder(), 100);
        add_ticks(&motors.right_encoder(), 10);
        motors.update_motors();

        assert_eq!(board.applied_throttle(LEFT_PINS), 0.0);
        assert!((board.applied_throttle(RIGHT_PINS) - 0.5).abs() < 1e-4);
        assert_eq!(motors.state(), RobotMotorsState::Moving);
    }

    #[test]
    fn test_movement_completion_fires_callback_once() {
        let clock = SimClock::new(0);
        let board = SimBoard::new();
        let mut motors = robot(&clock, &board, &config());

        let finished = Arc::new(AtomicUsize::new(0));
        let counter = finished.clone();
        motors.on_movement_finished(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        motors.start_motors(100, 0.5, 0.5, 50, 100, 0.25, 0.25).unwrap();

        clock.set(300);
        add_ticks(&motors.left_encoder(), 100);
        add_ticks(&motors.right_encoder(), 100);
        motors.update_motors();
        assert_eq!(motors.state(), RobotMotorsState::PauseAtEndOfMovement);
        assert_eq!(board.applied_throttle(LEFT_PINS), 0.0);
        assert_eq!(board.applied_throttle(RIGHT_PINS), 0.0);

        // Exactly at the deadline is still pausing
        clock.set(800);
        let writes = board.write_count();
        motors.update_motors();
        assert_eq!(motors.state(), RobotMotorsState::PauseAtEndOfMovement);
        assert_eq!(board.write_count(), writes);
        assert_eq!(finished.load(Ordering::SeqCst), 0);

        clock.set(801);
        motors.update_motors();
        assert!(motors.is_waiting());
        assert_eq!(finished.load(Ordering::SeqCst), 1);

        clock.set(5000);
        motors.update_motors();
        motors.update_motors();
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_completion_without_callback() {
        let clock = SimClock::new(0);
        let board = SimBoard::new();
        let mut motors = robot(&clock, &board, &config());
        motors.start_motors(100, 0.5, 0.5, 5, 10, 0.25, 0.25).unwrap();
        add_ticks(&motors.left_encoder(), 10);
        add_ticks(&motors.right_encoder(), 10);
        motors.update_motors();
        clock.set(1000);
        motors.update_motors();
        assert!(motors.is_waiting());
    }

    #[test]
    fn test_restart_mid_movement_replaces_profile() {
        let clock = SimClock::new(0);
        let board = SimBoard::new();
        let mut motors = robot(&clock, &board, &config());
        motors.start_motors(100, 0.5, 0.5, 500, 1000, 0.25, 0.25).unwrap();
        clock.set(200);
        add_ticks(&motors.left_encoder(), 300);
        motors.update_motors();

        motors.start_motors(100, -0.5, 0.5, 50, 100, -0.25, 0.25).unwrap();
        assert_eq!(motors.left_motor().encoder_count(), 0);
        clock.set(250);
        motors.update_motors();
        assert!((board.applied_throttle(LEFT_PINS) + 0.25).abs() < 1e-4);
    }

    #[test]
    fn test_balancing_raises_slow_wheel_until_nominal() {
        let clock = SimClock::new(0);
        let board = SimBoard::new();
        let mut motors = robot(&clock, &board, &config());
        motors.set_throttle_factors(1.0, 0.97);
        motors.start_motors(100, 0.8, 0.8, 10_000, 20_000, 0.2, 0.2).unwrap();

        // Past the ramp up: first cruising tick opens the sample window
        clock.set(150);
        motors.update_motors();
        assert_eq!(motors.throttle_factors(), (1.0, 0.97));

        // Window not yet elapsed
        add_ticks(&motors.left_encoder(), 60);
        add_ticks(&motors.right_encoder(), 50);
        clock.set(249);
        motors.update_motors();
        assert_eq!(motors.throttle_factors(), (1.0, 0.97));

        // Left is faster: right gains a step
        clock.set(250);
        motors.update_motors();
        let (left, right) = motors.throttle_factors();
        assert_eq!(left, 1.0);
        assert!((right - 0.98).abs() < 1e-6);
        assert_eq!(motors.left_motor().speed_encoder_count(), 0);
        assert_eq!(motors.right_motor().speed_encoder_count(), 0);
    }

    #[test]
    fn test_balancing_trims_fast_wheel_once_slow_is_saturated() {
        let clock = SimClock::new(0);
        let board = SimBoard::new();
        let mut motors = robot(&clock, &board, &config());
        motors.start_motors(100, 0.8, 0.8, 10_000, 20_000, 0.2, 0.2).unwrap();

        clock.set(150);
        motors.update_motors();

        add_ticks(&motors.left_encoder(), 40);
        add_ticks(&motors.right_encoder(), 55);
        clock.set(250);
        motors.update_motors();

        // Left is slow but already at 1.0, so the right wheel is trimmed
        let (left, right) = motors.throttle_factors();
        assert_eq!(left, 1.0);
        assert!((right - 0.99).abs() < 1e-6);
    }

    #[test]
    fn test_equal_speeds_leave_factors_alone() {
        let clock = SimClock::new(0);
        let board = SimBoard::new();
        let mut motors = robot(&clock, &board, &config());
        motors.start_motors(100, 0.8, 0.8, 10_000, 20_000, 0.2, 0.2).unwrap();
        clock.set(150);
        motors.update_motors();
        add_ticks(&motors.left_encoder(), 30);
        add_ticks(&motors.right_encoder(), 30);
        clock.set(260);
        motors.update_motors();
        assert_eq!(motors.throttle_factors(), (1.0, 1.0));
    }

    #[test]
    fn test_no_balancing_during_ramp_up_or_ramp_down() {
        let clock = SimClock::new(0);
        let board = SimBoard::new();
        let mut motors = robot(&clock, &board, &config());
        motors.start_motors(1000, 0.8, 0.8, 100, 200, 0.2, 0.2).unwrap();

        // Ramp up: no sampling even with a big mismatch
        for t in (0..=1000).step_by(100) {
            clock.set(t);
            add_ticks(&motors.left_encoder(), 5);
            motors.update_motors();
        }
        assert_eq!(motors.throttle_factors(), (1.0, 1.0));

        // Left in ramp down, right cruising
        add_ticks(&motors.left_encoder(), 100);
        for t in (1100..2000).step_by(100) {
            clock.set(t);
            motors.update_motors();
        }
        assert_eq!(motors.throttle_factors(), (1.0, 1.0));
    }

    #[test]
    fn test_balancing_with_measured_speed() {
        let clock = SimClock::new(0);
        let board = SimBoard::new();
        let mut config = config();
        config.balance_mode = BalanceMode::MeasuredSpeed;
        let mut motors = robot(&clock, &board, &config);
        motors.set_throttle_factors(0.9, 1.0);
        motors.start_motors(100, 0.8, 0.8, 10_000, 20_000, 0.2, 0.2).unwrap();

        clock.set(150);
        motors.update_motors();
        add_ticks(&motors.left_encoder(), 20);
        add_ticks(&motors.right_encoder(), 30);
        clock.set(250);
        motors.update_motors();

        assert_eq!(motors.left_motor().encoder_counts_per_second(), 200.0);
        assert_eq!(motors.right_motor().encoder_counts_per_second(), 300.0);
        let (left, right) = motors.throttle_factors();
        assert!((left - 0.91).abs() < 1e-6);
        assert_eq!(right, 1.0);
    }

    #[test]
    fn test_scaled_progress_used_for_goal() {
        let clock = SimClock::new(0);
        let board = SimBoard::new();
        let mut config = config();
        config.left_encoder_factor = 2.0;
        let mut motors = robot(&clock, &board, &config);
        motors.start_motors(100, 0.5, 0.5, 50, 100, 0.25, 0.25).unwrap();

        clock.set(200);
        add_ticks(&motors.left_encoder(), 50);
        add_ticks(&motors.right_encoder(), 50);
        motors.update_motors();
        assert_eq!(motors.scaled_left_encoder_count(), 100.0);
        assert_eq!(board.applied_throttle(LEFT_PINS), 0.0);
        assert!(board.applied_throttle(RIGHT_PINS) > 0.0);
    }

    #[test]
    fn test_halt_stops_without_callback() {
        let clock = SimClock::new(0);
        let board = SimBoard::new();
        let mut motors = robot(&clock, &board, &config());
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = finished.clone();
        motors.on_movement_finished(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        motors.start_motors(100, 0.5, 0.5, 50, 100, 0.25, 0.25).unwrap();
        clock.set(50);
        motors.update_motors();
        motors.halt();
        assert!(motors.is_waiting());
        assert_eq!(board.applied_throttle(LEFT_PINS), 0.0);
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    // Fires an encoder tick whenever the balancer logs its sample, i.e. after
    // the window has been read and before the next one is under way
    struct TickOnSample {
        encoder: Arc<EncoderCounter>,
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for TickOnSample {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            struct Message(String);
            impl tracing::field::Visit for Message {
                fn record_debug(
                    &mut self,
                    field: &tracing::field::Field,
                    value: &dyn std::fmt::Debug,
                ) {
                    if field.name() == "message" {
                        self.0 = format!("{:?}", value);
                    }
                }
            }

            let mut message = Message(String::new());
            event.record(&mut message);
            if message.0.starts_with("Speed sample") {
                self.encoder.increment();
            }
        }
    }

    #[test]
    fn test_tick_during_sample_lands_in_next_window() {
        use tracing_subscriber::layer::SubscriberExt;

        let clock = SimClock::new(0);
        let board = SimBoard::new();
        let mut motors = robot(&clock, &board, &config());
        motors.start_motors(100, 0.8, 0.8, 10_000, 20_000, 0.2, 0.2).unwrap();

        let subscriber = tracing_subscriber::registry().with(TickOnSample {
            encoder: motors.left_encoder(),
        });
        tracing::subscriber::with_default(subscriber, || {
            clock.set(150);
            motors.update_motors();
            add_ticks(&motors.left_encoder(), 30);
            add_ticks(&motors.right_encoder(), 30);
            clock.set(250);
            motors.update_motors();
        });

        // The sampled window saw 30/30, the late tick is kept for the next one
        assert_eq!(motors.throttle_factors(), (1.0, 1.0));
        assert_eq!(motors.left_motor().encoder_count(), 31);
        assert_eq!(motors.left_motor().speed_encoder_count(), 1);
        assert_eq!(motors.right_motor().speed_encoder_count(), 0);
    }
}
