use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use light_demo::{
    devices, drive_first_light, query_renderers, rendering_control, switch_power, LightCommand, VolumeReading,
};
use upnp_core::logging::{self, LoggingMode};
use upnp_core::{ActionInvocation, ActionResult, ChannelSink, EventSink, LoopHandle, MainLoop, Transport};
use upnp_proxy::{ControlPoint, ProxyConfig};
use upnp_service::{DeviceConfig, LoopbackTransport, ResourceRegistry, RootDevice};

/// Which half of the demo to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Role {
    /// Host the binary light and drive it through its actions
    Server,
    /// Host renderers and query their volumes through a control point
    Client,
    Both,
}

impl Role {
    fn hosts_light(self) -> bool {
        matches!(self, Role::Server | Role::Both)
    }

    fn queries_volume(self) -> bool {
        matches!(self, Role::Client | Role::Both)
    }
}

/// Control point modes beyond the default demo
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Switch the first discovered light through its SwitchPower proxy
    Light {
        #[arg(value_enum)]
        action: LightCommand,

        /// How many times to send the command
        #[arg(short = 'c', long, default_value = "1")]
        repeat: u32,

        /// Pause between repeated commands in milliseconds
        #[arg(long, default_value = "0")]
        repeat_delay_ms: u64,
    },
}

/// UPnP light and volume demo
///
/// Hosts a BinaryLight and a number of MediaRenderers on an in-process
/// transport and runs a control point that queries every renderer's volume.
/// The whole process stops when the deadline elapses.
#[derive(Parser, Debug)]
#[command(name = "light-demo")]
#[command(about = "UPnP dispatch demo - binary light server and volume client")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Part of the demo to run
    #[arg(short, long, value_enum, default_value = "both")]
    pub role: Role,

    /// Whole-process deadline in seconds
    #[arg(short, long, default_value = "10")]
    pub deadline: u64,

    /// Number of renderers to host
    #[arg(long, default_value = "2")]
    pub renderers: usize,

    /// Initial volume of every renderer channel
    #[arg(long, default_value = "30")]
    pub volume: u16,

    /// Simulated transport latency in milliseconds
    #[arg(long, default_value = "0")]
    pub latency_ms: u64,

    /// Stop as soon as every renderer has answered
    #[arg(long)]
    pub once: bool,

    /// Print volume readings as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Disable logging
    #[arg(short, long)]
    pub quiet: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate command line arguments
    pub fn validate(&self) -> Result<()> {
        if self.deadline == 0 {
            return Err(anyhow::anyhow!("Deadline must be positive"));
        }

        if let Some(Command::Light { repeat: 0, .. }) = self.command {
            return Err(anyhow::anyhow!("Repeat count must be positive"));
        }

        if self.command.is_none() && self.role.queries_volume() && self.renderers == 0 {
            return Err(anyhow::anyhow!("The client role needs at least one renderer"));
        }

        if self.volume > 100 {
            return Err(anyhow::anyhow!("Volume must be between 0 and 100, got {}", self.volume));
        }

        match self.log_level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            _ => {
                return Err(anyhow::anyhow!(
                    "Invalid log level '{}'. Valid levels: error, warn, info, debug, trace",
                    self.log_level
                ));
            }
        }

        Ok(())
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct Config {
    pub role: Role,
    pub light: Option<LightRun>,
    pub deadline: Duration,
    pub renderers: usize,
    pub volume: u16,
    pub latency: Option<Duration>,
    pub once: bool,
    pub json: bool,
    pub logging: Option<String>,
    pub quiet: bool,
}

/// One run of the light subcommand
#[derive(Debug, Clone, Copy)]
pub struct LightRun {
    pub action: LightCommand,
    pub repeat: u32,
    pub delay: Duration,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let light = args.command.map(|command| match command {
            Command::Light {
                action,
                repeat,
                repeat_delay_ms,
            } => LightRun {
                action,
                repeat,
                delay: Duration::from_millis(repeat_delay_ms),
            },
        });

        Self {
            role: args.role,
            light,
            deadline: Duration::from_secs(args.deadline),
            renderers: args.renderers,
            volume: args.volume,
            latency: (args.latency_ms > 0).then(|| Duration::from_millis(args.latency_ms)),
            once: args.once,
            json: args.json,
            logging: (!args.quiet).then(|| args.log_level.to_lowercase()),
            quiet: args.quiet,
        }
    }
}

fn init_logging(config: &Config) -> Result<()> {
    match &config.logging {
        Some(level) => logging::init_with_filter(level),
        None => logging::init_logging(LoggingMode::Silent),
    }
    .context("Failed to initialize logging")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    args.validate()?;
    let config = Config::from(args);
    init_logging(&config)?;

    info!(?config, "Starting light demo");
    run(config).await
}

async fn run(config: Config) -> Result<()> {
    let main_loop = MainLoop::new().with_deadline(config.deadline);
    let handle = main_loop.handle();

    let transport = match config.latency {
        Some(latency) => LoopbackTransport::new().with_latency(latency),
        None => LoopbackTransport::new(),
    };
    let registry = devices::registry(config.volume);
    let (sink, mut changes) = ChannelSink::new();
    let sink: Arc<dyn EventSink> = Arc::new(sink);

    handle.spawn(async move {
        while let Some(change) = changes.recv().await {
            info!(
                service = %change.service_type,
                variable = %change.variable,
                value = %change.value,
                "State variable changed"
            );
        }
    });

    if let Some(light_run) = config.light {
        drive_light(&config, light_run, &handle, &transport, &registry, sink)?;
        return finish(main_loop, handle).await;
    }

    // Phase 1: the light
    if config.role.hosts_light() {
        info!("Phase 1: Hosting binary light...");
        let light = devices::binary_light(&registry, sink.clone(), DeviceConfig::default())
            .context("Failed to host binary light")?;
        let light = Arc::new(light);
        transport.attach(light.clone());
        exercise_light(&light).context("Failed to drive binary light")?;
    }

    // Phase 2: renderers and the control point
    if config.role.queries_volume() {
        info!("Phase 2: Hosting {} renderer(s)...", config.renderers);
        for index in 1..=config.renderers {
            let udn = format!("uuid:renderer-{}", index);
            let renderer = devices::media_renderer(&udn, &registry, sink.clone(), DeviceConfig::default())
                .with_context(|| format!("Failed to host renderer {}", udn))?;
            transport.attach(Arc::new(renderer));
        }

        println!(
            "Looking for renderers and querying volumes for {}s",
            config.deadline.as_secs()
        );

        let shared: Arc<dyn Transport> = Arc::new(transport.clone());
        let (control_point, proxies) =
            ControlPoint::new(rendering_control::RENDERING_CONTROL, shared, ProxyConfig::interactive())
                .context("Failed to create control point")?;

        let (announce, announcements) = mpsc::channel(config.renderers.max(1));
        handle.spawn(control_point.run(announcements));
        let discovered = transport.announcements();
        handle.spawn(async move {
            for announcement in discovered {
                if announce.send(announcement).await.is_err() {
                    break;
                }
            }
        });

        let (readings_tx, mut readings) = mpsc::unbounded_channel();
        handle.spawn(query_renderers(handle.clone(), proxies, readings_tx));

        let quit = handle.clone();
        let expected = config.renderers;
        let (once, json) = (config.once, config.json);
        handle.spawn(async move {
            let mut answered = 0;
            while let Some(reading) = readings.recv().await {
                print_reading(&reading, json);
                answered += 1;
                if once && answered == expected {
                    info!("Every renderer answered");
                    quit.quit();
                }
            }
        });
    }

    finish(main_loop, handle).await
}

async fn finish(main_loop: MainLoop, handle: LoopHandle) -> Result<()> {
    let interrupt = handle.clone();
    handle.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted");
            interrupt.quit();
        }
    });

    let exit = main_loop.run().await;
    info!(?exit, "Light demo finished");
    Ok(())
}

/// Host a light and switch it through a control point, then quit
fn drive_light(
    config: &Config,
    light_run: LightRun,
    handle: &LoopHandle,
    transport: &LoopbackTransport,
    registry: &ResourceRegistry,
    sink: Arc<dyn EventSink>,
) -> Result<()> {
    let light = devices::binary_light(registry, sink, DeviceConfig::default()).context("Failed to host binary light")?;
    transport.attach(Arc::new(light));

    let shared: Arc<dyn Transport> = Arc::new(transport.clone());
    let (control_point, proxies) = ControlPoint::new(switch_power::SWITCH_POWER, shared, ProxyConfig::interactive())
        .context("Failed to create control point")?;

    let discovered = transport.announcements();
    let (announce, announcements) = mpsc::channel(discovered.len().max(1));
    handle.spawn(control_point.run(announcements));
    handle.spawn(async move {
        for announcement in discovered {
            if announce.send(announcement).await.is_err() {
                break;
            }
        }
    });

    let quit = handle.clone();
    let quiet = config.quiet;
    handle.spawn(async move {
        match drive_first_light(proxies, light_run.action, light_run.repeat, light_run.delay).await {
            Ok(targets) => {
                if !quiet {
                    for target in targets {
                        println!("Set switch to {}.", if target { "on" } else { "off" });
                    }
                }
            }
            Err(e) => error!(error = %e, "Failed to switch light"),
        }
        quit.quit();
    });
    Ok(())
}

/// Drive the light through each of its actions as a remote caller would
fn exercise_light(light: &RootDevice) -> Result<()> {
    let script = [
        ActionInvocation::new("SetTarget").argument("newTargetValue", true),
        ActionInvocation::new("GetTarget"),
        ActionInvocation::new("GetStatus"),
        ActionInvocation::new("SetTarget").argument("newTargetValue", true),
        ActionInvocation::new("Unsupported"),
    ];

    for invocation in script {
        let action = invocation.action_name().to_string();
        match light.dispatch(switch_power::SWITCH_POWER, invocation)? {
            ActionResult::Success(outputs) => info!(action = %action, ?outputs, "Action succeeded"),
            ActionResult::Fault(fault) => warn!(
                action = %action,
                code = fault.code,
                message = %fault.message,
                "Action faulted"
            ),
        }
    }

    let status = light.query(switch_power::SWITCH_POWER, "Status")?;
    info!(?status, "Light status");
    Ok(())
}

fn print_reading(reading: &VolumeReading, json: bool) {
    if json {
        match serde_json::to_string(reading) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!(error = %e, "Failed to encode reading"),
        }
        return;
    }

    println!("{} [{}]", reading.udn, reading.channel);
    for (name, value) in &reading.outputs {
        println!("  {} = {}", name, value);
    }
}
