// 50 Hz link loops for the console and the robot
//
// Each tick: apply everything the peer sent since the last tick, run local
// logic (operator input on the console, the wheel model on the robot), then
// flush changed properties to the peer. Received payloads are only applied
// here, between ticks, so inbound writes never interleave with a flush.

use std::time::Instant;

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::config::{LinkConfig, PLOT_PERIOD, TICK};
use crate::control::{InputMapper, KeyAction, Keyboard};
use crate::domain::{Domain, EntityId, PropertyId, Role};
use crate::motor::SimBase;
use crate::transport::{ChannelTransport, spawn_publisher};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Console side: operator input in, wheel goals out, telemetry back
pub struct Console {
    domain: Domain,
    mapper: InputMapper,
    keyboard: Keyboard,
    last_plot: Instant,
}

impl Console {
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            domain: Domain::omnibot(Role::Console).with_capacity(config.packet_capacity),
            mapper: InputMapper::new(config.guidance.clone(), config.input.clone()),
            keyboard: Keyboard::new(),
            last_plot: Instant::now(),
        }
    }

    pub fn domain_mut(&mut self) -> &mut Domain {
        &mut self.domain
    }

    /// Process a payload from the robot
    fn on_payload(&mut self, payload: &[u8]) {
        // errors are already logged by the domain
        let _ = self.domain.apply(payload);
    }

    /// Apply one keyboard action. Returns false to quit.
    fn on_action(&mut self, action: KeyAction) -> bool {
        match action {
            KeyAction::Input(key, x, y) => {
                self.mapper
                    .on_input(key, x, y, &mut self.domain, &mut self.keyboard);
                true
            }
            KeyAction::Quit => false,
        }
    }

    fn flush(&mut self) {
        self.domain.flush(|entity, property, value| {
            debug!("{}.{} -> {}", entity, property, value);
        });
    }

    /// Teleplot-format dump of goals and RPMs
    fn plot(&mut self) {
        if self.last_plot.elapsed() < PLOT_PERIOD {
            return;
        }
        self.last_plot = Instant::now();
        for motor in EntityId::MOTORS {
            for property in [PropertyId::Goal, PropertyId::Rpm] {
                if let Some(value) = self.domain.get(motor, property) {
                    debug!(">{} {}:{}", motor, property, value);
                }
            }
        }
    }
}

/// Robot side: goals in, simulated wheels, telemetry out
pub struct Robot {
    domain: Domain,
    base: SimBase,
}

impl Robot {
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            domain: Domain::omnibot(Role::Robot).with_capacity(config.packet_capacity),
            base: SimBase::new(),
        }
    }

    pub fn domain_mut(&mut self) -> &mut Domain {
        &mut self.domain
    }

    fn on_payload(&mut self, payload: &[u8]) {
        if let Ok(applied) = self.domain.apply(payload) {
            debug!("Applied {} writes from console", applied);
        }
    }

    fn tick(&mut self) {
        self.base.step(&mut self.domain);
        self.domain.flush(|entity, property, value| {
            if property == PropertyId::Goal {
                info!("{} goal -> {}", entity, value);
            }
        });
    }

    fn stop(&mut self) {
        self.base.stop(&mut self.domain);
        self.tick();
    }
}

pub async fn run_console(config: LinkConfig) -> Result<(), BoxError> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publisher and subscriber...");
    let subscriber = session.declare_subscriber(config.topics.robot.clone()).await?;
    let publisher = session.declare_publisher(config.topics.console.clone()).await?;

    let (transport, outbox) = ChannelTransport::new();
    let publisher_task = spawn_publisher(publisher, outbox);

    let mut console = Console::new(&config);
    console.domain_mut().init(Box::new(transport));

    info!(
        "Console started: {}ms tick, mode {}",
        TICK.as_millis(),
        console.mapper.mode()
    );
    info!("Controls: WASD=move, Z/X=spin, arrows=head, Enter=mode, C=stop, Q=quit");

    enable_raw_mode()?;
    let mut tick = interval(TICK);
    let result = async {
        'run: loop {
            tick.tick().await;

            // 1. Drain all pending telemetry (non-blocking)
            while let Ok(Some(sample)) = subscriber.try_recv() {
                console.on_payload(&sample.payload().to_bytes());
            }

            // 2. Operator input
            for action in console.keyboard.poll()? {
                if !console.on_action(action) {
                    break 'run;
                }
            }

            // 3. Send what changed
            console.flush();
            console.plot();
        }
        Ok::<(), BoxError>(())
    }
    .await;
    disable_raw_mode()?;

    // stop the robot on the way out
    console
        .domain
        .write(EntityId::AllMotors, PropertyId::Goal, 0);
    console.flush();
    drop(console);
    if let Err(e) = publisher_task.await {
        warn!("Publisher task ended abnormally: {}", e);
    }

    result
}

pub async fn run_robot(config: LinkConfig) -> Result<(), BoxError> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publisher and subscriber...");
    let subscriber = session.declare_subscriber(config.topics.console.clone()).await?;
    let publisher = session.declare_publisher(config.topics.robot.clone()).await?;

    let (transport, outbox) = ChannelTransport::new();
    let publisher_task = spawn_publisher(publisher, outbox);

    let mut robot = Robot::new(&config);
    robot.domain_mut().init(Box::new(transport));

    let mut tick = interval(TICK);
    info!("Robot started: {}ms tick", TICK.as_millis());
    info!("Subscribed to: {}", config.topics.console);
    info!("Publishing to: {}", config.topics.robot);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                // 1. Drain all pending writes (non-blocking)
                while let Ok(Some(sample)) = subscriber.try_recv() {
                    robot.on_payload(&sample.payload().to_bytes());
                }
                // 2. Step the base and report telemetry
                robot.tick();
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                robot.stop();
                break;
            }
        }
    }

    drop(robot);
    if let Err(e) = publisher_task.await {
        warn!("Publisher task ended abnormally: {}", e);
    }
    Ok(())
}
