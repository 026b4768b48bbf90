mod commands;
mod config;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;

use crate::commands::{
    cmd_exercise_show, cmd_list_add, cmd_list_all, cmd_list_check, cmd_list_clear,
    cmd_list_delete, cmd_list_show, cmd_payment_add, cmd_payment_all, cmd_payment_delete,
    cmd_payment_month, cmd_payment_pay, cmd_payment_show, cmd_set_add, cmd_set_delete,
    cmd_set_edit, cmd_stat_add, cmd_stat_all, cmd_stat_delete, cmd_stat_delete_set,
    cmd_stat_edit_set, cmd_stat_log, cmd_stat_show, cmd_workout_all, cmd_workout_create,
    cmd_workout_day, cmd_workout_delete, cmd_workout_log, cmd_workout_show,
};
use crate::config::Config;
use tally_core::service::TallyService;

#[derive(Parser)]
#[command(
    name = "tally",
    version,
    about = "A personal tracker for lists, workouts, stats, and recurring payments"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage checklists
    List {
        #[command(subcommand)]
        command: ListCommands,
    },
    /// Manage workouts and logged sets
    Workout {
        #[command(subcommand)]
        command: WorkoutCommands,
    },
    /// Track arbitrary measurements over time
    Stat {
        #[command(subcommand)]
        command: StatCommands,
    },
    /// Track recurring payments
    Payment {
        #[command(subcommand)]
        command: PaymentCommands,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
enum ListCommands {
    /// Create a list
    Add {
        /// List name
        name: String,
        /// Optional subtitle
        #[arg(long)]
        title: Option<String>,
        /// Initial items (repeatable)
        #[arg(long = "item")]
        items: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one list with its items
    Show {
        /// List ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show all lists
    All {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle an item's checked state
    Check {
        /// Item ID
        item_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove every item from a list
    Clear {
        /// List ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a list and its items
    Delete {
        /// List ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum WorkoutCommands {
    /// Create a workout with optional initial exercises
    Create {
        /// Workout title
        title: String,
        /// Exercise titles (repeatable)
        #[arg(long = "exercise")]
        exercises: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show all workouts
    All {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one workout with exercises and sets
    Show {
        /// Workout ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show sets logged on a day across all workouts
    Day {
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log a set against a workout for one day
    Log {
        /// Workout ID
        id: i64,
        /// Exercise title (created if the workout doesn't have it yet)
        exercise: String,
        /// Reps
        rep: String,
        /// Weight
        weight: String,
        /// Date to log for (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a workout (exercises are kept, unlinked)
    Delete {
        /// Workout ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one exercise with its history and best weight
    Exercise {
        /// Exercise ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a single set to an exercise
    AddSet {
        /// Exercise ID
        exercise_id: i64,
        /// Reps
        rep: String,
        /// Weight
        weight: String,
        /// Date to log for (YYYY-MM-DD, default: now)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a set
    EditSet {
        /// Set ID
        id: i64,
        /// Reps
        rep: String,
        /// Weight
        weight: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a set
    DeleteSet {
        /// Set ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum StatCommands {
    /// Create a stat to track
    Add {
        /// Stat title
        title: String,
        /// Unit label (e.g. kg, km, hours)
        #[arg(long)]
        unit: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show all stats
    All {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one stat with its entries
    Show {
        /// Stat ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log a value against a stat
    Log {
        /// Stat ID
        stat_id: i64,
        /// Value to record
        value: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a logged value
    EditSet {
        /// Set ID
        id: i64,
        /// New value
        value: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a logged value
    DeleteSet {
        /// Set ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a stat and its entries
    Delete {
        /// Stat ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PaymentCommands {
    /// Create a recurring payment
    Add {
        /// Payment title
        title: String,
        /// Amount due
        amount: String,
        /// Due date (YYYY-MM-DD or today/yesterday/tomorrow)
        due: String,
        /// Category tag
        #[arg(long)]
        tag: Option<String>,
        /// Mark as already paid on this date
        #[arg(long)]
        paid_on: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show all payments
    All {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show payments due in a month
    Month {
        /// Any date in the month (YYYY-MM-DD, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one payment with its transactions
    Show {
        /// Payment ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a completing transaction
    Pay {
        /// Payment ID
        id: i64,
        /// Amount paid (default: the payment's amount)
        #[arg(long)]
        amount: Option<String>,
        /// Date paid (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a payment and its transactions
    Delete {
        /// Payment ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let svc = TallyService::new(&config.db_path.to_string_lossy())?;
    let owner = config.owner.clone();

    match cli.command {
        Commands::List { command } => match command {
            ListCommands::Add {
                name,
                title,
                items,
                json,
            } => cmd_list_add(&svc, &owner, &name, title, items, json),
            ListCommands::Show { id, json } => cmd_list_show(&svc, &owner, id, json),
            ListCommands::All { json } => cmd_list_all(&svc, &owner, json),
            ListCommands::Check { item_id, json } => cmd_list_check(&svc, &owner, item_id, json),
            ListCommands::Clear { id, json } => cmd_list_clear(&svc, &owner, id, json),
            ListCommands::Delete { id, json } => cmd_list_delete(&svc, &owner, id, json),
        },
        Commands::Workout { command } => match command {
            WorkoutCommands::Create {
                title,
                exercises,
                json,
            } => cmd_workout_create(&svc, &owner, &title, exercises, json),
            WorkoutCommands::All { json } => cmd_workout_all(&svc, &owner, json),
            WorkoutCommands::Show { id, json } => cmd_workout_show(&svc, &owner, id, json),
            WorkoutCommands::Day { date, json } => cmd_workout_day(&svc, &owner, date, json),
            WorkoutCommands::Log {
                id,
                exercise,
                rep,
                weight,
                date,
                json,
            } => cmd_workout_log(&svc, &owner, id, &exercise, &rep, &weight, date, json),
            WorkoutCommands::Delete { id, json } => cmd_workout_delete(&svc, &owner, id, json),
            WorkoutCommands::Exercise { id, json } => cmd_exercise_show(&svc, &owner, id, json),
            WorkoutCommands::AddSet {
                exercise_id,
                rep,
                weight,
                date,
                json,
            } => cmd_set_add(&svc, &owner, exercise_id, &rep, &weight, date, json),
            WorkoutCommands::EditSet {
                id,
                rep,
                weight,
                json,
            } => cmd_set_edit(&svc, &owner, id, &rep, &weight, json),
            WorkoutCommands::DeleteSet { id, json } => cmd_set_delete(&svc, &owner, id, json),
        },
        Commands::Stat { command } => match command {
            StatCommands::Add { title, unit, json } => {
                cmd_stat_add(&svc, &owner, &title, unit, json)
            }
            StatCommands::All { json } => cmd_stat_all(&svc, &owner, json),
            StatCommands::Show { id, json } => cmd_stat_show(&svc, &owner, id, json),
            StatCommands::Log {
                stat_id,
                value,
                json,
            } => cmd_stat_log(&svc, &owner, stat_id, &value, json),
            StatCommands::EditSet { id, value, json } => {
                cmd_stat_edit_set(&svc, &owner, id, &value, json)
            }
            StatCommands::DeleteSet { id, json } => cmd_stat_delete_set(&svc, &owner, id, json),
            StatCommands::Delete { id, json } => cmd_stat_delete(&svc, &owner, id, json),
        },
        Commands::Payment { command } => match command {
            PaymentCommands::Add {
                title,
                amount,
                due,
                tag,
                paid_on,
                json,
            } => cmd_payment_add(&svc, &owner, &title, &amount, &due, tag, paid_on, json),
            PaymentCommands::All { json } => cmd_payment_all(&svc, &owner, json),
            PaymentCommands::Month { date, json } => cmd_payment_month(&svc, &owner, date, json),
            PaymentCommands::Show { id, json } => cmd_payment_show(&svc, &owner, id, json),
            PaymentCommands::Pay {
                id,
                amount,
                date,
                json,
            } => cmd_payment_pay(&svc, &owner, id, amount, date, json),
            PaymentCommands::Delete { id, json } => cmd_payment_delete(&svc, &owner, id, json),
        },
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let api_key = if no_auth {
                None
            } else {
                let (key, _new) = config.load_or_create_api_key()?;
                Some(key)
            };
            server::start_server(svc, owner, port, &bind, api_key).await
        }
    }
}
