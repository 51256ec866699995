use clap::{Parser, Subcommand};
use fasting_core::profile::BmiCategory;
use fasting_core::stats::{unlocked_achievements, Achievement};
use fasting_core::timefmt::{format_clock, format_datetime, format_hms, format_short, progress_bar};
use fasting_core::*;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "jejum")]
#[command(about = "Intermittent fasting tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Pretend the current time is this epoch-millisecond instant
    #[arg(long, global = true, hide = true, allow_negative_numbers = true)]
    at: Option<i64>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available fasting plans
    Plans,

    /// Select the plan for the next fast
    Plan {
        /// Plan id, e.g. 16-8
        id: String,
    },

    /// Start fasting with the selected plan
    Start,

    /// Pause the running fast
    Pause,

    /// Resume a paused fast
    Resume,

    /// End the current fast
    Stop {
        /// Mark the fast as completed
        #[arg(long)]
        completed: bool,
    },

    /// Show the current fast (default)
    Status,

    /// Follow the countdown, completing the fast when time is up
    Watch {
        /// Refresh interval in milliseconds (defaults to timer.tick_ms)
        #[arg(long)]
        tick_ms: Option<u64>,

        /// Stop watching after this many refreshes
        #[arg(long)]
        max_ticks: Option<u64>,
    },

    /// Show progress statistics and achievements
    Stats,

    /// List past fasts, newest first
    History,

    /// Track water intake
    Water {
        #[command(subcommand)]
        action: WaterAction,
    },

    /// Record today's weight in kg
    Weight { kg: f64 },

    /// Fill in the profile and pick a recommended plan
    Onboard {
        #[arg(long)]
        name: String,

        /// weightloss, maintenance, health or energy
        #[arg(long, value_parser = parse_goal)]
        goal: Goal,

        /// sedentary, light, moderate or intense
        #[arg(long, value_parser = parse_activity)]
        activity: Option<ActivityLevel>,

        /// male, female or other
        #[arg(long, value_parser = parse_gender)]
        gender: Option<Gender>,

        #[arg(long)]
        age: Option<u32>,

        /// Height in cm
        #[arg(long)]
        height: Option<u32>,

        /// Current weight in kg
        #[arg(long)]
        weight: Option<f64>,

        /// Target weight in kg
        #[arg(long)]
        target_weight: Option<f64>,
    },

    /// Delete all stored data
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum WaterAction {
    /// Add water drunk today, in ml
    Add { ml: u32 },

    /// Show today's intake and the last week
    Status,
}

type Tracker<'a> = FastingTracker<FileStore, &'a dyn Clock>;
type Book<'a> = ProfileBook<FileStore, &'a dyn Clock>;

fn main() -> Result<()> {
    // Initialize logging
    fasting_core::logging::init();

    let cli = Cli::parse();

    // Determine data directory
    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    tracing::debug!("Using data directory {:?}", data_dir);

    let clock: Box<dyn Clock> = match cli.at {
        Some(ms) => {
            tracing::debug!("Clock pinned to {}", ms);
            Box::new(FixedClock::from_millis(ms))
        }
        None => Box::new(SystemClock),
    };
    let clock: &dyn Clock = &*clock;

    match cli.command {
        Some(Commands::Plans) => cmd_plans(open_tracker(&data_dir, clock, &config)?),
        Some(Commands::Plan { id }) => cmd_plan(open_tracker(&data_dir, clock, &config)?, &id),
        Some(Commands::Start) => cmd_start(open_tracker(&data_dir, clock, &config)?),
        Some(Commands::Pause) => cmd_pause(open_tracker(&data_dir, clock, &config)?),
        Some(Commands::Resume) => cmd_resume(open_tracker(&data_dir, clock, &config)?),
        Some(Commands::Stop { completed }) => {
            cmd_stop(open_tracker(&data_dir, clock, &config)?, completed)
        }
        Some(Commands::Watch { tick_ms, max_ticks }) => {
            let interval = tick_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| config.timer.tick());
            cmd_watch(open_tracker(&data_dir, clock, &config)?, interval, max_ticks)
        }
        Some(Commands::Stats) => cmd_stats(
            open_tracker(&data_dir, clock, &config)?,
            open_book(&data_dir, clock, &config),
        ),
        Some(Commands::History) => cmd_history(open_tracker(&data_dir, clock, &config)?),
        Some(Commands::Water { action }) => {
            cmd_water(open_book(&data_dir, clock, &config), action)
        }
        Some(Commands::Weight { kg }) => cmd_weight(open_book(&data_dir, clock, &config), kg),
        Some(Commands::Onboard {
            name,
            goal,
            activity,
            gender,
            age,
            height,
            weight,
            target_weight,
        }) => {
            let profile = UserProfile {
                name,
                gender,
                age: age.unwrap_or(0),
                height: height.unwrap_or(0),
                weight: 0.0,
                target_weight: target_weight.unwrap_or(0.0),
                activity_level: activity,
                goal: Some(goal),
            };
            cmd_onboard(
                open_tracker(&data_dir, clock, &config)?,
                open_book(&data_dir, clock, &config),
                profile,
                weight,
            )
        }
        Some(Commands::Reset { yes }) => cmd_reset(open_tracker(&data_dir, clock, &config)?, yes),
        Some(Commands::Status) | None => cmd_status(open_tracker(&data_dir, clock, &config)?),
    }
}

fn open_tracker<'a>(data_dir: &Path, clock: &'a dyn Clock, config: &Config) -> Result<Tracker<'a>> {
    FastingTracker::open(FileStore::new(data_dir), clock, config.catalog()?)
}

fn open_book<'a>(data_dir: &Path, clock: &'a dyn Clock, config: &Config) -> Book<'a> {
    ProfileBook::open(FileStore::new(data_dir), clock, config.water.clone())
}

fn describe_plan(plan: &FastingPlan) -> String {
    format!(
        "{} ({}h fast, {}h eating)",
        plan.name, plan.fast_hours, plan.eat_hours
    )
}

fn explain_ignored(reason: Ignored) -> &'static str {
    match reason {
        Ignored::NoPlanSelected => "No plan selected. Pick one with `jejum plan <id>`.",
        Ignored::AlreadyActive => "A fast is already in progress.",
        Ignored::NotFasting => "No running fast to pause.",
        Ignored::NotPaused => "The fast is not paused.",
        Ignored::NotActive => "No fast in progress.",
    }
}

fn cmd_plans(tracker: Tracker) -> Result<()> {
    let current = tracker.current_plan().map(|p| p.id.clone());
    for plan in tracker.fasting_plans() {
        let marker = if current.as_deref() == Some(plan.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{} {:<6} {:<24} {}", marker, plan.id, describe_plan(plan), plan.description);
    }
    Ok(())
}

fn cmd_plan(mut tracker: Tracker, id: &str) -> Result<()> {
    let plan = tracker.select_plan(id)?;
    println!("✓ Selected {}", describe_plan(&plan));
    if tracker.status().is_active() {
        println!("  The running fast keeps its plan; this applies to the next one.");
    }
    Ok(())
}

fn cmd_start(mut tracker: Tracker) -> Result<()> {
    match tracker.start_fasting()? {
        Transition::Started { ends_at } => {
            println!("✓ Fasting started");
            println!("  Plan: {}", describe_plan(&tracker.session().plan));
            println!("  Ends at: {}", format_datetime(ends_at));
        }
        Transition::Ignored(reason) => println!("{}", explain_ignored(reason)),
        _ => {}
    }
    Ok(())
}

fn cmd_pause(mut tracker: Tracker) -> Result<()> {
    match tracker.pause_fasting()? {
        Transition::Paused { at } => {
            println!("✓ Fast paused at {}", format_clock(at));
            println!("  Elapsed: {}", format_hms(tracker.get_elapsed_time()));
        }
        Transition::Ignored(reason) => println!("{}", explain_ignored(reason)),
        _ => {}
    }
    Ok(())
}

fn cmd_resume(mut tracker: Tracker) -> Result<()> {
    match tracker.resume_fasting()? {
        Transition::Resumed {
            paused_for,
            ends_at,
        } => {
            println!("✓ Fast resumed after {}", format_short(paused_for.num_milliseconds()));
            println!("  Ends at: {}", format_datetime(ends_at));
        }
        Transition::Ignored(reason) => println!("{}", explain_ignored(reason)),
        _ => {}
    }
    Ok(())
}

fn cmd_stop(mut tracker: Tracker, completed: bool) -> Result<()> {
    match tracker.stop_fasting(completed)? {
        Transition::Stopped {
            duration_ms,
            archived,
        } => report_stopped(duration_ms, archived.as_ref()),
        Transition::Ignored(reason) => println!("{}", explain_ignored(reason)),
        _ => {}
    }
    Ok(())
}

fn report_stopped(duration_ms: i64, archived: Option<&HistoryEntry>) {
    println!("✓ Fast ended after {}", format_short(duration_ms));
    match archived {
        Some(entry) if entry.completed => println!("  Saved to history as completed."),
        Some(_) => println!("  Saved to history."),
        None => println!("  Under a minute, not saved to history."),
    }
}

fn cmd_status(tracker: Tracker) -> Result<()> {
    let session = tracker.session();
    match session.status {
        SessionStatus::Idle => {
            println!("Status: idle");
            match tracker.current_plan() {
                Some(plan) => println!("Plan: {}", describe_plan(plan)),
                None => println!("Plan: none selected"),
            }
        }
        status => {
            let label = match status {
                SessionStatus::Paused => "paused",
                SessionStatus::Completed => "completed",
                _ => "fasting",
            };
            let progress = tracker.get_progress();
            println!("Status: {}", label);
            println!("Plan: {}", describe_plan(&session.plan));
            println!("Elapsed: {}", format_hms(tracker.get_elapsed_time()));
            println!("Remaining: {}", format_hms(tracker.get_remaining_time()));
            println!("Progress: {} {:.0}%", progress_bar(progress, 20), progress);
            if let Some(end) = tracker.planned_end() {
                println!("Ends at: {}", format_datetime(end));
            }
        }
    }
    Ok(())
}

fn cmd_watch(mut tracker: Tracker, interval: Duration, max_ticks: Option<u64>) -> Result<()> {
    let poller = Poller::new(interval);
    let mut ticks = 0u64;

    let exit = poller.run(&mut tracker, |_, outcome| {
        ticks += 1;
        match outcome {
            TickOutcome::Running {
                remaining_ms,
                progress,
            } => println!(
                "{} remaining {} {:.0}%",
                format_hms(*remaining_ms),
                progress_bar(*progress, 20),
                progress
            ),
            TickOutcome::Paused { elapsed_ms } => {
                println!("Paused at {} elapsed", format_hms(*elapsed_ms))
            }
            TickOutcome::Completed { .. } | TickOutcome::Idle => {}
        }
        max_ticks.map_or(true, |max| ticks < max)
    })?;

    match exit {
        PollExit::Completed(archived) => {
            println!("✓ Fast complete!");
            if archived.is_some() {
                println!("  Saved to history as completed.");
            }
        }
        PollExit::NotActive => println!("{}", explain_ignored(Ignored::NotActive)),
        PollExit::Cancelled => {}
    }
    Ok(())
}

fn cmd_stats(tracker: Tracker, book: Book) -> Result<()> {
    let entries = tracker.fasting_history().entries();
    let stats = FastingStats::compute(entries, tracker.today());

    println!("Fasts: {}", stats.total);
    println!("Completed: {} ({}%)", stats.completed, stats.completion_rate);
    println!("Total fasting: {}", stats.total_duration);
    println!(
        "Current streak: {} {}",
        stats.current_streak,
        if stats.current_streak == 1 { "day" } else { "days" }
    );
    println!(
        "Level: {} ({})",
        stats.tier.label(),
        stats.tier.milestone(stats.total)
    );

    let unlocked = unlocked_achievements(&stats, book.profile(), book.weight_history());
    println!();
    println!("Achievements:");
    for achievement in Achievement::ALL {
        let mark = if unlocked.contains(&achievement) { "✓" } else { "·" };
        println!("  {} {}", mark, achievement.description());
    }
    Ok(())
}

fn cmd_history(tracker: Tracker) -> Result<()> {
    let ledger = tracker.fasting_history();
    if ledger.is_empty() {
        println!("No fasts recorded yet.");
        return Ok(());
    }

    for entry in ledger.sorted_by_date() {
        println!(
            "{}  {:<6} {:>9}  {}",
            entry.date,
            entry.plan_id,
            format_short(entry.duration),
            if entry.completed { "completed" } else { "ended early" }
        );
    }
    Ok(())
}

fn cmd_water(mut book: Book, action: WaterAction) -> Result<()> {
    if let WaterAction::Add { ml } = action {
        book.add_water_intake(ml)?;
    }

    println!(
        "Water today: {} / {} ml ({}%)",
        book.today_water_intake(),
        book.daily_water_goal(),
        book.water_progress()
    );

    if let WaterAction::Status = action {
        println!();
        for record in book.water_last_days(7) {
            println!("  {}  {:>5} ml", record.date, record.amount);
        }
    }
    Ok(())
}

fn cmd_weight(mut book: Book, kg: f64) -> Result<()> {
    book.add_weight_record(kg)?;
    println!("✓ Weight recorded: {:.1} kg", kg);
    print_bmi(&book);

    let recent = book.recent_weights(5);
    if recent.len() > 1 {
        println!();
        for record in recent {
            println!("  {}  {:.1} kg", record.date, record.weight);
        }
    }
    Ok(())
}

fn print_bmi(book: &Book) {
    if let Some(bmi) = book.bmi() {
        println!("  BMI: {:.1} ({})", bmi, BmiCategory::for_bmi(bmi).label());
    }
}

fn cmd_onboard(
    mut tracker: Tracker,
    mut book: Book,
    profile: UserProfile,
    weight: Option<f64>,
) -> Result<()> {
    let goal = profile.goal;
    let activity = profile.activity_level;
    book.update_profile(|p| {
        // Keep a weight recorded earlier unless a new one is given below
        let known_weight = p.weight;
        *p = profile;
        p.weight = known_weight;
    })?;
    if let Some(kg) = weight {
        book.add_weight_record(kg)?;
    }

    let plan = tracker.select_plan(catalog::recommend_plan_id(goal, activity))?;

    println!("✓ Welcome, {}!", book.profile().name);
    println!("  Recommended plan: {}", describe_plan(&plan));
    println!("  Daily water goal: {} ml", book.daily_water_goal());
    print_bmi(&book);
    Ok(())
}

fn cmd_reset(mut tracker: Tracker, yes: bool) -> Result<()> {
    if !yes {
        return Err(Error::Other(
            "Refusing to delete all data without --yes".into(),
        ));
    }
    tracker.reset_all()?;
    println!("✓ All data deleted");
    Ok(())
}

fn parse_goal(s: &str) -> std::result::Result<Goal, String> {
    match s.to_lowercase().as_str() {
        "weightloss" | "weight-loss" => Ok(Goal::WeightLoss),
        "maintenance" => Ok(Goal::Maintenance),
        "health" => Ok(Goal::Health),
        "energy" => Ok(Goal::Energy),
        other => Err(format!("unknown goal: {}", other)),
    }
}

fn parse_activity(s: &str) -> std::result::Result<ActivityLevel, String> {
    match s.to_lowercase().as_str() {
        "sedentary" => Ok(ActivityLevel::Sedentary),
        "light" => Ok(ActivityLevel::Light),
        "moderate" => Ok(ActivityLevel::Moderate),
        "intense" => Ok(ActivityLevel::Intense),
        other => Err(format!("unknown activity level: {}", other)),
    }
}

fn parse_gender(s: &str) -> std::result::Result<Gender, String> {
    match s.to_lowercase().as_str() {
        "male" => Ok(Gender::Male),
        "female" => Ok(Gender::Female),
        "other" => Ok(Gender::Other),
        other => Err(format!("unknown gender: {}", other)),
    }
}
