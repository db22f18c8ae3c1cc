use advisories::model::{AdvisoryStatus, AdvisoryType, DayOfWeek, Role, TimeOfDay};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "advisories")]
#[command(about = "Client for the university advisory scheduling service", long_about = None)]
pub struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Log in and store the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "ADVISORIES_PASSWORD", hide_env_values = true)]
        password: String,
        /// student, professor or director
        #[arg(long)]
        role: Role,
    },
    /// End the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// List the requests visible on your dashboard
    Requests {
        /// Only requests in this status
        #[arg(long)]
        status: Option<AdvisoryStatus>,
    },
    /// Request an advisory (students)
    Request {
        #[arg(long)]
        professor: i64,
        #[arg(long)]
        date: NaiveDate,
        /// "HH:MM - HH:MM"
        #[arg(long)]
        slot: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        topic: String,
        /// individual or grupal
        #[arg(long, default_value = "individual")]
        kind: AdvisoryType,
        #[arg(long)]
        description: Option<String>,
    },
    /// Accept a pending request
    Accept { id: i64 },
    /// Reject a pending request
    Reject {
        id: i64,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Cancel a scheduled advisory
    Cancel {
        id: i64,
        #[arg(long)]
        reason: String,
    },
    /// Mark a scheduled advisory as completed
    Complete {
        id: i64,
        #[arg(long)]
        observations: String,
    },
    /// Move a scheduled advisory to an open slot
    Reschedule {
        id: i64,
        #[arg(long)]
        date: NaiveDate,
        /// Slot id from `slots`; omit to list the slots for the date
        #[arg(long)]
        slot: Option<i64>,
        #[arg(long)]
        motive: Option<String>,
    },
    /// List your schedule windows
    Windows,
    /// Add a weekly schedule window
    AddWindow {
        #[arg(long)]
        day: DayOfWeek,
        #[arg(long)]
        start: TimeOfDay,
        #[arg(long)]
        end: TimeOfDay,
        /// Create the window paused
        #[arg(long)]
        paused: bool,
    },
    /// Delete a schedule window
    RemoveWindow {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Pause or resume a schedule window
    ToggleWindow { id: i64 },
    /// Open slots for a professor on a date
    Slots {
        #[arg(long)]
        professor: Option<i64>,
        #[arg(long)]
        date: NaiveDate,
    },
    /// Show the history table
    History {
        #[arg(long)]
        status: Option<AdvisoryStatus>,
        /// Search professor, student name or student code
        #[arg(long)]
        search: Option<String>,
    },
    /// Show dashboard statistics
    Stats {
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,
    },
    /// Download a PDF report (directors)
    Report {
        /// Report over every advisory on record
        #[arg(long, conflicts_with_all = ["from", "to", "professor"])]
        complete: bool,
        #[arg(long, required_unless_present = "complete")]
        from: Option<NaiveDate>,
        #[arg(long, required_unless_present = "complete")]
        to: Option<NaiveDate>,
        #[arg(long)]
        professor: Option<i64>,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Register an advisory that already took place (professors)
    RegisterManual {
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        start: TimeOfDay,
        #[arg(long)]
        end: TimeOfDay,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        topic: String,
        #[arg(long, default_value = "individual")]
        kind: AdvisoryType,
        #[arg(long)]
        student_name: String,
        #[arg(long, default_value = "")]
        student_email: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Write the history table as CSV
    ExportHistory {
        /// Output file; stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },
}
