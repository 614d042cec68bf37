use clap::{Parser, Subcommand};
use interval_core::input::parse_duration;
use interval_core::*;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "intervals")]
#[command(about = "Work/rest interval workout timer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use a specific config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pin the clock to this instant (epoch milliseconds)
    #[arg(long, global = true, hide = true)]
    now: Option<i64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new workout
    Start {
        /// Work phase length (e.g. 30, 45s, 1:30)
        #[arg(long)]
        work: Option<String>,

        /// Rest phase length
        #[arg(long)]
        rest: Option<String>,

        /// Number of work/rest sets
        #[arg(long)]
        sets: Option<u32>,

        /// Use a built-in preset (see `presets`)
        #[arg(long)]
        preset: Option<String>,
    },

    /// Show the current session (default)
    Status,

    /// Pause the running workout
    Pause,

    /// Resume a paused workout
    Resume,

    /// Abandon the workout and return to configuration
    Reset,

    /// Leave the session, recording partial progress
    Leave,

    /// Follow the running workout live until it finishes
    Watch {
        /// Stop after this many updates
        #[arg(long)]
        ticks: Option<u64>,
    },

    /// Change a setting: work, rest, sets or preset
    Set {
        field: String,
        value: String,
    },

    /// List built-in presets
    Presets,

    /// Show workout history
    History {
        /// Delete all history
        #[arg(long, conflicts_with = "export")]
        clear: bool,

        /// Write history to a CSV file
        #[arg(long)]
        export: Option<PathBuf>,
    },
}

/// Wall clock used by the CLI; pinned when `--now` is given
#[derive(Debug)]
enum AppClock {
    System(SystemClock),
    Pinned(ManualClock),
}

impl Clock for AppClock {
    fn now_ms(&self) -> i64 {
        match self {
            AppClock::System(clock) => clock.now_ms(),
            AppClock::Pinned(clock) => clock.now_ms(),
        }
    }
}

type AppWorkout = Workout<AppClock, FileStore>;

fn main() -> Result<()> {
    // Initialize logging
    interval_core::logging::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) if path.exists() => Config::load_from(path)?,
        Some(_) => Config::default(),
        None => Config::load()?,
    };
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    tracing::debug!("Using data directory {:?}", data_dir);

    let clock = match cli.now {
        Some(ms) => AppClock::Pinned(ManualClock::new(ms)),
        None => AppClock::System(SystemClock),
    };

    let (mut workout, caught_up) = Workout::load(
        clock,
        config.timing_config(),
        config.workout_config(),
        FileStore::new(&data_dir),
    );
    print_events(&caught_up);

    match cli.command.unwrap_or(Commands::Status) {
        Commands::Start {
            work,
            rest,
            sets,
            preset,
        } => cmd_start(&mut workout, work, rest, sets, preset),
        Commands::Status => {
            print_status(&workout);
            Ok(())
        }
        Commands::Pause => cmd_pause(&mut workout),
        Commands::Resume => cmd_resume(&mut workout),
        Commands::Reset => {
            print_events(&workout.reset());
            println!("Back to configuration.");
            Ok(())
        }
        Commands::Leave => cmd_leave(&mut workout),
        Commands::Watch { ticks } => cmd_watch(&mut workout, ticks, cli.now.is_none()),
        Commands::Set { field, value } => {
            cmd_set(&mut workout, &field, &value, config, cli.config.as_deref())
        }
        Commands::Presets => {
            cmd_presets();
            Ok(())
        }
        Commands::History { clear, export } => cmd_history(&mut workout, clear, export),
    }
}

fn cmd_start(
    workout: &mut AppWorkout,
    work: Option<String>,
    rest: Option<String>,
    sets: Option<u32>,
    preset: Option<String>,
) -> Result<()> {
    let mut config = workout.timer().config().clone();

    if let Some(id) = preset {
        let preset = find_preset(&id)
            .ok_or_else(|| Error::InvalidInput(format!("unknown preset '{}'", id)))?;
        config = WorkoutConfig {
            work_seconds: preset.work_seconds,
            rest_seconds: preset.rest_seconds,
            total_sets: preset.total_sets,
            preset_id: Some(preset.id.to_string()),
        };
    }
    if let Some(work) = work {
        config.work_seconds = parse_duration(&work)?;
        config.preset_id = None;
    }
    if let Some(rest) = rest {
        config.rest_seconds = parse_duration(&rest)?;
        config.preset_id = None;
    }
    if let Some(sets) = sets {
        config.total_sets = sets;
        config.preset_id = None;
    }

    let events = workout.start(config)?;
    print_events(&events);
    print_status(workout);
    Ok(())
}

fn cmd_pause(workout: &mut AppWorkout) -> Result<()> {
    if workout.status() != WorkoutStatus::Running {
        println!("Nothing is running.");
        return Ok(());
    }
    print_events(&workout.pause());
    print_status(workout);
    Ok(())
}

fn cmd_resume(workout: &mut AppWorkout) -> Result<()> {
    let events = workout.resume()?;
    print_events(&events);
    print_status(workout);
    Ok(())
}

fn cmd_leave(workout: &mut AppWorkout) -> Result<()> {
    let (_, entry) = workout.leave();
    println!("{}", leave_message(entry.as_ref()));
    Ok(())
}

/// Leaving inside the final rest window finishes the workout instead
fn leave_message(entry: Option<&HistoryEntry>) -> String {
    match entry {
        Some(entry) if entry.full => {
            format!("✓ Workout complete: {} sets", entry.completed_work)
        }
        Some(entry) => format!(
            "✓ Partial session saved: {} work, {} rest",
            entry.completed_work, entry.completed_rest
        ),
        None => "No completed phases; nothing saved.".to_string(),
    }
}

fn cmd_watch(workout: &mut AppWorkout, ticks: Option<u64>, follow: bool) -> Result<()> {
    if workout.status() != WorkoutStatus::Running {
        print_status(workout);
        return Ok(());
    }

    let mut updates = 0;
    while let Some(at) = workout.timer().next_wakeup_ms() {
        if ticks.is_some_and(|limit| updates >= limit) {
            break;
        }
        let now = workout.timer().now_ms();
        if follow && at > now {
            std::thread::sleep(Duration::from_millis((at - now) as u64));
        }

        let now = workout.timer().now_ms();
        let events = match workout.timer().pending() {
            Some(pending) if now >= pending.resolve_at_ms => {
                workout.complete_transition(pending.token)
            }
            _ => workout.tick(),
        };
        print_events(&events);
        updates += 1;

        // A pinned clock never moves
        if !follow {
            break;
        }
    }

    print_status(workout);
    Ok(())
}

fn cmd_set(
    workout: &mut AppWorkout,
    field: &str,
    value: &str,
    mut config: Config,
    config_path: Option<&Path>,
) -> Result<()> {
    if field.trim().eq_ignore_ascii_case("preset") {
        let preset = find_preset(value)
            .ok_or_else(|| Error::InvalidInput(format!("unknown preset '{}'", value)))?;
        workout.reconfigure(preset.as_change())?;
    } else {
        workout.reconfigure_input(field.parse()?, value)?;
    }

    let current = workout.timer().config().clone();
    println!(
        "✓ {} sets of {} work / {} rest",
        current.total_sets,
        format_duration(current.work_seconds),
        format_duration(current.rest_seconds)
    );

    // Outside a workout the edit becomes the new default
    if workout.status() != WorkoutStatus::Paused {
        config.set_workout_config(&current);
        match config_path {
            Some(path) => config.save_to(path)?,
            None => config.save()?,
        }
    }
    Ok(())
}

fn cmd_presets() {
    for preset in presets() {
        println!(
            "  {:<10} {:<14} {} × {} work / {} rest",
            preset.id,
            preset.label,
            preset.total_sets,
            format_duration(preset.work_seconds),
            format_duration(preset.rest_seconds)
        );
    }
}

fn cmd_history(workout: &mut AppWorkout, clear: bool, export: Option<PathBuf>) -> Result<()> {
    if clear {
        workout.clear_history();
        println!("✓ History cleared");
        return Ok(());
    }

    if let Some(path) = export {
        let count = workout.export_history(&path)?;
        println!("✓ Exported {} entries", count);
        println!("  CSV: {}", path.display());
        return Ok(());
    }

    let history = workout.history();
    if history.is_empty() {
        println!("No completions yet");
        return Ok(());
    }
    for entry in &history {
        println!("  {}", history_line(entry));
    }
    Ok(())
}

fn history_line(entry: &HistoryEntry) -> String {
    let summary = if entry.full {
        format!("{} sets", entry.completed_work)
    } else {
        format!("{} work, {} rest", entry.completed_work, entry.completed_rest)
    };
    let mut line = format!(
        "{} · {} work · {} rest · {}",
        summary,
        format_duration(entry.work_seconds),
        format_duration(entry.rest_seconds),
        entry
            .recorded_at
            .with_timezone(&chrono::Local)
            .format("%b %-d, %Y")
    );
    if let Some(label) = &entry.preset_label {
        line.push_str(&format!(" · {}", label));
    }
    line
}

fn print_status(workout: &AppWorkout) {
    let timer = workout.timer();
    let live = timer.live();
    let config = timer.config();

    println!();
    match timer.status() {
        WorkoutStatus::Idle => {
            println!("  Ready: {} sets", config.total_sets);
            println!(
                "  {} work / {} rest",
                format_duration(config.work_seconds),
                format_duration(config.rest_seconds)
            );
        }
        WorkoutStatus::Completed => {
            println!("  Done! All {} sets complete", config.total_sets);
        }
        status @ (WorkoutStatus::Running | WorkoutStatus::Paused) => {
            let label = if status == WorkoutStatus::Paused {
                "Paused"
            } else if timer.pending().is_some() {
                if live.phase == Phase::Work {
                    "Set complete"
                } else {
                    "Work!"
                }
            } else {
                live.phase.label()
            };
            println!(
                "  {}  {} / {}",
                label,
                format_time(live.remaining_seconds),
                format_time(timer.phase_total_seconds(live.phase))
            );
            println!(
                "  Set {} of {} · {} work, {} rest done",
                (config.total_sets.saturating_sub(live.sets_remaining) + 1).min(config.total_sets),
                config.total_sets,
                live.work_phases_completed,
                live.rest_phases_completed
            );
        }
    }
    if let Some(label) = config
        .preset_id
        .as_deref()
        .and_then(interval_core::presets::preset_label)
    {
        println!("  Preset: {}", label);
    }
    println!();
}

fn print_events(events: &[TimerEvent]) {
    for event in events {
        match event {
            TimerEvent::WorkoutStarted { total_sets, .. } => {
                println!("▶ Workout started ({} sets)", total_sets)
            }
            TimerEvent::PhaseChanged {
                phase,
                total_seconds,
                ..
            } => println!("→ {} ({})", phase.label(), format_time(*total_seconds)),
            TimerEvent::PhaseEnding { phase, .. } => match phase {
                Phase::Work => println!("✓ Set complete"),
                _ => println!("… Work!"),
            },
            TimerEvent::TickUpdated { remaining_seconds } => {
                println!("  {}", format_time(*remaining_seconds))
            }
            TimerEvent::Paused { remaining_seconds } => {
                println!("❚❚ Paused with {} left", format_time(*remaining_seconds))
            }
            TimerEvent::Resumed { remaining_seconds } => {
                println!("▶ Resumed with {} left", format_time(*remaining_seconds))
            }
            TimerEvent::WorkoutCompleted { summary } => {
                println!("✓ Workout complete: {} sets", summary.completed_work)
            }
            TimerEvent::WorkoutInterrupted { summary } => println!(
                "✓ Partial session saved: {} work, {} rest",
                summary.completed_work, summary.completed_rest
            ),
            TimerEvent::Reset => {}
        }
    }
}

/// Setting-style duration: `45s`, `2m`, `1:30`
fn format_duration(seconds: u32) -> String {
    if seconds < 60 {
        return format!("{}s", seconds);
    }
    let (m, s) = (seconds / 60, seconds % 60);
    if s == 0 {
        format!("{}m", m)
    } else {
        format!("{}:{:02}", m, s)
    }
}

/// Countdown display: `1:05` above a minute, bare seconds below
fn format_time(seconds: u32) -> String {
    let (m, s) = (seconds / 60, seconds % 60);
    if m > 0 {
        format!("{}:{:02}", m, s)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(60), "1m");
        assert_eq!(format_duration(90), "1:30");
    }

    fn entry(work: u32, rest: u32, full: bool) -> HistoryEntry {
        serde_json::from_value(serde_json::json!({
            "id": "0b6f1e4a-2d0c-4c55-9d3e-0f7c1a2b3c4d",
            "recorded_at": "2026-03-01T08:30:00Z",
            "work_seconds": 10,
            "rest_seconds": 5,
            "completed_work": work,
            "completed_rest": rest,
            "total_sets": 3,
            "full": full
        }))
        .unwrap()
    }

    #[test]
    fn test_leave_message_follows_entry() {
        assert_eq!(
            leave_message(Some(&entry(3, 3, true))),
            "✓ Workout complete: 3 sets"
        );
        assert_eq!(
            leave_message(Some(&entry(2, 1, false))),
            "✓ Partial session saved: 2 work, 1 rest"
        );
        assert!(leave_message(None).contains("nothing saved"));
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(5), "5");
        assert_eq!(format_time(65), "1:05");
        assert_eq!(format_time(600), "10:00");
    }
}
