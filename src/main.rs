#[macro_use]
extern crate tracing;

use std::env;
use std::error::Error;

use calloop::signals::{Signal, Signals};
use calloop::timer::{TimeoutAction, Timer};
use calloop::{EventLoop, LoopSignal};
use clap::Parser;
use handwheel::backend::{Backend, Headless, Uinput};
use handwheel::cli::{Cli, Sub};
use handwheel::tracking::{replay, sample_hands, Replay, Tracking};
use handwheel::utils::{tick_period, version};
use handwheel::wheel::Engine;
use handwheel_config::ConfigPath;
use tracing_subscriber::EnvFilter;

struct State {
    engine: Engine,
    tracking: Replay,
    backend: Backend,
    edit: bool,
    ticks: u64,
    stop_signal: LoopSignal,
    result: anyhow::Result<()>,
}

impl State {
    fn tick(&mut self) {
        let _span = tracy_client::span!("State::tick");

        if self.tracking.is_waiting() {
            return;
        }

        if !self.tracking.advance() {
            if let Some(err) = self.tracking.take_error() {
                self.result = Err(err);
            }
            self.stop_signal.stop();
            return;
        }
        self.ticks += 1;

        if self.edit {
            let hands = sample_hands(&self.tracking);
            match self.engine.edit_step(&hands) {
                Ok(true) => trace!("moved the wheel to {:?}", self.engine.wheel().center),
                Ok(false) => (),
                Err(err) => debug!("not moving the wheel: {err}"),
            }
            return;
        }

        match self.engine.tick(&mut self.tracking, &mut self.backend) {
            Ok(frame) => trace!("steering axis: {:.4}", frame.axis),
            Err(err) => {
                warn!("error updating the joystick, stopping: {err:?}");
                self.result = Err(err.context("error updating the joystick"));
                self.stop_signal.stop();
            }
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env::set_var("RUST_BACKTRACE", "1");

    let directives = env::var("RUST_LOG").unwrap_or_else(|_| "handwheel=debug,info".to_owned());
    let env_filter = EnvFilter::builder().parse_lossy(directives);
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(env_filter)
        .init();

    let cli = Cli::parse();

    let _client = tracy_client::Client::start();

    if let Some(Sub::Validate { config }) = cli.subcommand {
        ConfigPath::new(config).load().map_err(|err| {
            warn!("{err:?}");
            err
        })?;
        info!("config is valid");
        return Ok(());
    }

    info!("starting version {}", &version());

    let config_path = ConfigPath::new(cli.config);
    let (created_at, config) = config_path.load_or_create();
    if let Some(path) = created_at {
        info!("created the default config at {path:?}");
    }
    let config = config.map_err(|err| {
        warn!("{err:?}");
        err
    })?;

    let engine = Engine::new(config.wheel)?;
    let script_lines = replay::open(&cli.replay)?;

    let backend = if cli.dry_run || cli.edit {
        Backend::Headless(Headless::new())
    } else {
        Backend::Uinput(Uinput::new(&config.device)?)
    };
    info!("using the {} backend", backend.name());

    let mut event_loop = EventLoop::<State>::try_new()?;
    let handle = event_loop.handle();

    let period = tick_period(config.tick_rate);
    handle
        .insert_source(Timer::from_duration(period), move |_, _, state| {
            state.tick();
            TimeoutAction::ToDuration(period)
        })
        .map_err(|err| err.error)?;

    handle
        .insert_source(script_lines, |event, _, state| {
            state.tracking.handle_event(event)
        })
        .map_err(|err| err.error)?;

    handle
        .insert_source(
            Signals::new(&[Signal::SIGINT, Signal::SIGTERM])?,
            |event, _, state| {
                info!("quitting due to receiving signal {:?}", event.signal());
                state.stop_signal.stop();
            },
        )
        .map_err(|err| err.error)?;

    let mut state = State {
        engine,
        tracking: Replay::new(),
        backend,
        edit: cli.edit,
        ticks: 0,
        stop_signal: event_loop.get_signal(),
        result: Ok(()),
    };

    if cli.edit {
        info!("edit mode: hold the right trigger to move the wheel");
    }

    event_loop.run(None, &mut state, |_| ())?;

    let State {
        engine,
        tracking,
        backend,
        ticks,
        result,
        ..
    } = state;

    // Remove the virtual joystick before closing the pose source.
    if let Some(headless) = backend.headless() {
        debug!("wrote {} headless frames", headless.frame_count());
    }
    drop(backend);
    drop(tracking);

    info!("stopped after {ticks} ticks");
    result?;

    if cli.edit {
        print!("{}", engine.wheel().to_kdl());
    }

    Ok(())
}
