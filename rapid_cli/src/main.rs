use clap::{Parser, Subcommand};
use rapid_core::*;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// How often `timer run` syncs its ticks into the shift file
const SYNC_PERIOD_MS: u64 = 1_000;

#[derive(Parser)]
#[command(name = "rrc")]
#[command(about = "Rapid Response Central emergency session tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show active emergencies, timers and alerts (default)
    Status,

    /// Activate a new emergency, even if one of the same kind is active
    Activate {
        /// Emergency kind (code-blue, code-stroke, code-white, rapid-response)
        kind: EmergencyKind,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        patient_name: Option<String>,

        #[arg(long)]
        mrn: Option<String>,

        #[arg(long)]
        age: Option<u8>,
    },

    /// Start CPR, or count another cycle if the CPR timer is running
    StartCpr {
        #[arg(long, default_value = "code-blue")]
        kind: EmergencyKind,
    },

    /// Mark a checklist action as done
    Complete {
        /// Action label, e.g. "Secure Airway"
        label: String,

        /// Route to the active emergency of this kind, creating it if needed
        #[arg(long, default_value = "code-blue", conflicts_with = "emergency")]
        kind: EmergencyKind,

        /// Record against a specific emergency instead
        #[arg(long)]
        emergency: Option<Uuid>,
    },

    /// Mark an emergency resolved
    Resolve { emergency: Uuid },

    /// Mark an emergency transferred
    Transfer { emergency: Uuid },

    /// Manage timers
    #[command(subcommand)]
    Timer(TimerCommand),

    /// Manage alerts
    #[command(subcommand)]
    Alert(AlertCommand),
}

#[derive(Subcommand)]
enum TimerCommand {
    /// Start (or restart from zero) a timer
    Start {
        /// Timer kind (code-blue, code-stroke, rapid-response, cpr, medication)
        kind: TimerKind,

        #[arg(long)]
        id: Option<String>,
    },
    Stop { id: String },
    Reset { id: String },
    /// Count a completed CPR cycle
    Cycle {
        /// Defaults to the running CPR timer
        id: Option<String>,
    },
    /// Tick a running timer and print it
    Run {
        id: String,

        /// How long to run for
        #[arg(long, default_value_t = 60)]
        seconds: u64,

        /// Apply ticks immediately instead of waiting in real time
        #[arg(long)]
        no_wait: bool,
    },
}

#[derive(Subcommand)]
enum AlertCommand {
    Add {
        message: String,

        #[arg(long, default_value = "warning")]
        severity: Severity,
    },
    Dismiss { id: Uuid },
    Clear,
}

fn main() -> Result<()> {
    // Initialize logging
    rapid_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let shift_path = data_dir.join("shift.json");
    let settings = config.timers;

    match cli.command.unwrap_or(Commands::Status) {
        Commands::Status => {
            let state = ShiftState::load(&shift_path)?;
            print_status(&Engine::with_state(state, settings));
        }
        Commands::Timer(TimerCommand::Run {
            id,
            seconds,
            no_wait,
        }) => run_timer(&shift_path, &settings, &id, seconds, no_wait)?,
        command => update_shift(&shift_path, &settings, |engine| apply(engine, command))?,
    }

    Ok(())
}

/// Run `f` against the shift inside one locked load-modify-save
fn update_shift<T>(
    shift_path: &Path,
    settings: &TimerSettings,
    f: impl FnOnce(&mut Engine) -> T,
) -> Result<T> {
    ShiftState::update(shift_path, |state| {
        let mut engine = Engine::with_state(std::mem::take(state), settings.clone());
        let out = f(&mut engine);
        *state = engine.into_state();
        Ok(out)
    })
}

fn apply(engine: &mut Engine, command: Commands) {
    match command {
        Commands::Status => print_status(engine),
        Commands::Activate {
            kind,
            location,
            patient_name,
            mrn,
            age,
        } => {
            let patient = (patient_name.is_some() || mrn.is_some() || age.is_some()).then(|| {
                PatientInfo {
                    name: patient_name,
                    mrn,
                    age,
                }
            });
            let request = ActivationRequest {
                location,
                patient,
                ..ActivationRequest::new(kind, protocol_for(kind).checklist())
            };
            let emergency = engine.activate(request);
            println!("✓ {} activated", protocol_for(kind).title);
            println!("  Emergency: {}", emergency.id);
        }
        Commands::StartCpr { kind } => {
            let outcome = engine.start_cpr(kind);
            if outcome.timer_started {
                println!("✓ CPR started");
            } else {
                println!("✓ CPR cycle {} recorded", outcome.cycles);
            }
            println!("  Emergency: {}", outcome.emergency_id);
            println!("  Timer: {}", outcome.timer_id);
        }
        Commands::Complete {
            label,
            kind,
            emergency,
        } => match emergency {
            Some(id) => {
                if engine.complete_action(id, &label) {
                    println!("✓ {}", label);
                } else {
                    println!("No change: unknown emergency or '{}' already done", label);
                }
            }
            None => {
                let emergency = engine.route_action(kind, &label);
                println!("✓ {}", label);
                println!("  Emergency: {}", emergency.id);
            }
        },
        Commands::Resolve { emergency } => {
            report(engine.resolve(emergency), "Emergency resolved", "No active emergency with that id");
        }
        Commands::Transfer { emergency } => {
            report(engine.transfer(emergency), "Emergency transferred", "No active emergency with that id");
        }
        Commands::Timer(cmd) => cmd_timer(engine, cmd),
        Commands::Alert(cmd) => cmd_alert(engine, cmd),
    }
}

fn report(changed: bool, done: &str, unchanged: &str) {
    if changed {
        println!("✓ {}", done);
    } else {
        println!("{}", unchanged);
    }
}

fn cmd_timer(engine: &mut Engine, cmd: TimerCommand) {
    match cmd {
        TimerCommand::Start { kind, id } => {
            let timer = engine.start_timer(kind, id.as_deref());
            println!("✓ {} timer started", kind);
            println!("  Timer: {}", timer.id);
        }
        TimerCommand::Stop { id } => {
            report(engine.stop_timer(&id), "Timer stopped", "No running timer with that id");
        }
        TimerCommand::Reset { id } => {
            report(engine.reset_timer(&id), "Timer reset", "No timer with that id");
        }
        TimerCommand::Cycle { id } => {
            let id = id.or_else(|| {
                engine
                    .state()
                    .timers
                    .find_running(TimerKind::Cpr)
                    .map(|t| t.id.clone())
            });
            let Some(id) = id else {
                println!("No running CPR timer");
                return;
            };
            if engine.increment_cycle(&id) {
                let cycles = engine
                    .state()
                    .timers
                    .get(&id)
                    .and_then(|t| t.cycles)
                    .unwrap_or(0);
                println!("✓ Cycle {} recorded", cycles);
                println!("  Timer: {}", id);
            } else {
                println!("No CPR timer with that id");
            }
        }
        // Spans many updates; main hands it to run_timer
        TimerCommand::Run { .. } => {}
    }
}

/// Drive one timer with the ticker until the duration runs out or it stops
///
/// Ticks are applied one second at a time to a freshly loaded shift under
/// the shift lock, so commands issued from other terminals while the timer
/// runs are kept.
fn run_timer(
    shift_path: &Path,
    settings: &TimerSettings,
    timer_id: &str,
    seconds: u64,
    no_wait: bool,
) -> Result<()> {
    if !ShiftState::load(shift_path)?.timers.is_running(timer_id) {
        println!("Timer {} is not running", timer_id);
        return Ok(());
    }

    let interval = settings.tick_interval();
    let show_centiseconds = settings.show_milliseconds;
    let duration_ms = seconds.saturating_mul(1000);

    let mut ticker = Ticker::new();
    let handle = ticker.schedule(timer_id, interval);

    while ticker.is_scheduled(handle.timer_id()) && ticker.clock_ms() < duration_ms {
        let period_ms = (duration_ms - ticker.clock_ms()).min(SYNC_PERIOD_MS);
        if !no_wait {
            std::thread::sleep(std::time::Duration::from_millis(period_ms));
        }

        let (timer, raised) = update_shift(shift_path, settings, |engine| {
            let alerts_before = engine.state().alerts.list().len();
            engine.run_ticks(&mut ticker, period_ms);
            let raised = engine.state().alerts.list()[alerts_before..].to_vec();
            (engine.state().timers.get(handle.timer_id()).cloned(), raised)
        })?;

        if let Some(timer) = timer.filter(|t| t.running) {
            println!("{}  {}", timer.id, format_elapsed(timer.elapsed_ms, show_centiseconds));
        }
        for alert in &raised {
            println!("!! [{:?}] {}", alert.severity, alert.message);
        }
    }

    ticker.cancel_all();
    tracing::info!("Finished driving timer {}", handle.timer_id());
    Ok(())
}

fn cmd_alert(engine: &mut Engine, cmd: AlertCommand) {
    match cmd {
        AlertCommand::Add { message, severity } => {
            let alert = engine.raise_alert(message, severity);
            println!("✓ Alert raised");
            println!("  Alert: {}", alert.id);
        }
        AlertCommand::Dismiss { id } => {
            report(engine.dismiss_alert(id), "Alert dismissed", "No alert with that id");
        }
        AlertCommand::Clear => {
            println!("✓ Cleared {} alerts", engine.clear_alerts());
        }
    }
}

fn print_status(engine: &Engine) {
    let state = engine.state();
    let show_centiseconds = engine.settings().show_milliseconds;

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  ACTIVE EMERGENCIES");
    println!("╰─────────────────────────────────────────╯");

    let active = state.sessions.list_active();
    if active.is_empty() {
        println!("  None");
    }
    for emergency in &active {
        println!();
        println!(
            "  {} ({})  started {}",
            protocol_for(emergency.kind).title,
            emergency.id,
            emergency
                .started_at
                .with_timezone(&chrono::Local)
                .format("%H:%M:%S")
        );
        if let Some(ref location) = emergency.location {
            println!("  Location: {}", location);
        }
        for action in &emergency.required_actions {
            let mark = if emergency.is_completed(action) { "x" } else { " " };
            println!("    [{}] {}", mark, action);
        }
        for extra in emergency
            .completed_actions
            .iter()
            .filter(|a| !emergency.required_actions.contains(a))
        {
            println!("    [x] {}", extra);
        }
    }

    let timers = state.timers.list();
    if !timers.is_empty() {
        println!();
        println!("  Timers:");
        for timer in &timers {
            let cycles = timer
                .cycles
                .map(|c| format!("  cycles: {}", c))
                .unwrap_or_default();
            println!(
                "  → {}  {}  {}  {}{}",
                timer.id,
                timer.kind,
                format_elapsed(timer.elapsed_ms, show_centiseconds),
                if timer.running { "running" } else { "stopped" },
                cycles
            );
        }
    }

    let alerts = state.alerts.list();
    if !alerts.is_empty() {
        println!();
        println!("  Alerts:");
        for alert in alerts {
            println!("  !! [{:?}] {} ({})", alert.severity, alert.message, alert.id);
        }
    }

    println!();
}
