mod cli;
mod logging;

use std::fs::File;
use std::io::{self, Write};

use advisories::advisory::ManualEntry;
use advisories::api::dto::NewAdvisory;
use advisories::availability::Confirmation;
use advisories::model::{AdvisoryRequest, AvailableSlot, NewWindow, ScheduleWindow};
use advisories::reports::{DateRange, HistoryFilter};
use advisories::session::SessionStore;
use advisories::views::{Dashboard, ProfessorView};
use advisories::{AppContext, ClientConfig, ClientError};
use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logger();

    let args = Cli::parse();
    let Some(command) = args.command else {
        let _ = Cli::command().print_long_help();
        return Ok(());
    };

    let config = ClientConfig::load(args.config.as_deref()).context("loading configuration")?;
    let session = SessionStore::open(&config.session_db_path)
        .with_context(|| format!("opening {}", config.session_db_path.display()))?;

    if let Commands::Login {
        email,
        password,
        role,
    } = &command
    {
        let ctx = AppContext::login(config, session, email, password, *role).await?;
        println!("Logged in as {} ({})", ctx.user().display_name(), ctx.role());
        return Ok(());
    }

    let Some(ctx) = AppContext::restore(config, session).await? else {
        bail!("no active session, run `advisories login` first");
    };

    if let Commands::Logout = command {
        ctx.logout().await?;
        println!("Logged out");
        return Ok(());
    }

    let result = run(&ctx, command).await;
    if let Err(e) = &result {
        if e
            .downcast_ref::<ClientError>()
            .is_some_and(ClientError::needs_reauth)
        {
            error!("Session is no longer valid, clearing it");
            ctx.invalidate()?;
        }
    }
    result
}

async fn run(ctx: &AppContext, command: Commands) -> Result<()> {
    if let Commands::Whoami = command {
        let user = ctx.user();
        println!("{} <{}> - {}", user.display_name(), user.email, user.role);
        return Ok(());
    }

    ctx.load().await?;
    let dashboard = ctx.dashboard()?;
    info!(dashboard = dashboard.title(), "Dashboard ready");

    match command {
        Commands::Login { .. } | Commands::Logout | Commands::Whoami => {
            bail!("session commands are handled before the dashboard loads")
        }
        Commands::Requests { status } => {
            let requests = match &dashboard {
                Dashboard::Student(view) => view.my_requests(),
                Dashboard::Professor(view) => {
                    let mut all = view.received();
                    all.extend(view.scheduled());
                    all.extend(view.history());
                    all
                }
                Dashboard::Director(view) => view.history(&HistoryFilter::default()),
            };
            let requests: Vec<AdvisoryRequest> = requests
                .into_iter()
                .filter(|r| status.map_or(true, |s| r.status == s))
                .collect();
            print_requests(&requests);
        }
        Commands::Request {
            professor,
            date,
            slot,
            subject,
            topic,
            kind,
            description,
        } => {
            let Dashboard::Student(view) = &dashboard else {
                bail!("only students can request advisories");
            };
            let payload = NewAdvisory {
                professor_id: professor,
                date,
                time_slot: slot,
                subject,
                topic,
                kind,
                description,
            };
            let created = view.request_advisory(&payload).await?;
            println!("Request {} created ({})", created.id, created.status);
        }
        Commands::Accept { id } => {
            let updated = professor_view(&dashboard)?.accept(id).await?;
            print_requests(&[updated]);
        }
        Commands::Reject { id, reason } => {
            let updated = professor_view(&dashboard)?.reject(id, reason).await?;
            print_requests(&[updated]);
        }
        Commands::Cancel { id, reason } => {
            let updated = professor_view(&dashboard)?.cancel(id, reason).await?;
            print_requests(&[updated]);
        }
        Commands::Complete { id, observations } => {
            let updated = professor_view(&dashboard)?
                .complete(id, observations)
                .await?;
            print_requests(&[updated]);
        }
        Commands::Reschedule {
            id,
            date,
            slot,
            motive,
        } => {
            let view = professor_view(&dashboard)?;
            let mut draft = view.start_reschedule(id)?;
            draft.set_date(date);
            view.refresh_slots(&mut draft).await?;

            let Some(slot) = slot else {
                if draft.candidates().is_empty() {
                    println!("No open slots on {date}");
                } else {
                    print_slots(draft.candidates());
                }
                return Ok(());
            };
            draft.select(slot)?;
            let updated = view.reschedule(&draft, motive).await?;
            print_requests(&[updated]);
        }
        Commands::Windows => {
            print_windows(&professor_view(&dashboard)?.windows());
        }
        Commands::AddWindow {
            day,
            start,
            end,
            paused,
        } => {
            let mut window = NewWindow::new(day, start, end);
            window.is_available = !paused;
            let created = professor_view(&dashboard)?.add_window(window).await?;
            print_windows(&[created]);
        }
        Commands::RemoveWindow { id, yes } => {
            let view = professor_view(&dashboard)?;
            let confirmation = if yes || prompt_confirm(&format!("Delete window {id}?"))? {
                Confirmation::Confirmed
            } else {
                Confirmation::Declined
            };
            if view.remove_window(id, confirmation).await? {
                println!("Window {id} deleted");
            }
        }
        Commands::ToggleWindow { id } => {
            match professor_view(&dashboard)?.toggle_window(id).await {
                Some(true) => println!("Window {id} is now available"),
                Some(false) => println!("Window {id} is now paused"),
                None => bail!("window {id} was not changed"),
            }
        }
        Commands::Slots { professor, date } => {
            let professor_id = match (professor, &dashboard) {
                (Some(id), _) => id,
                (None, Dashboard::Professor(view)) => view.professor_id(),
                (None, _) => bail!("--professor is required"),
            };
            let slots = ctx
                .availability()
                .available_slots_for(professor_id, date)
                .await?;
            print_slots(&slots);
        }
        Commands::History { status, search } => {
            let filter = HistoryFilter { status, search };
            let history = match &dashboard {
                Dashboard::Student(view) => view.history(),
                Dashboard::Professor(view) => view.history(),
                Dashboard::Director(view) => view.history(&filter),
            };
            let history: Vec<AdvisoryRequest> =
                history.into_iter().filter(|r| filter.matches(r)).collect();
            print_requests(&history);
        }
        Commands::Stats { from, to } => {
            let range = match (from, to) {
                (Some(from), Some(to)) => Some(DateRange::new(from, to)?),
                _ => None,
            };
            match &dashboard {
                Dashboard::Professor(view) => {
                    let stats = view.stats(range);
                    println!("Completed advisories: {}", stats.completed);
                    println!("Unique students:      {}", stats.unique_students);
                    println!("Subjects:             {}", stats.unique_subjects);
                    println!("Acceptance rate:      {}%", stats.acceptance_rate);
                    for (subject, count) in &stats.by_subject {
                        println!("  {subject}: {count}");
                    }
                    for (kind, count) in &stats.by_type {
                        println!("  {kind}: {count}");
                    }
                }
                Dashboard::Director(view) => {
                    let stats = view.stats();
                    println!("Total advisories: {}", stats.total);
                    println!("Completed:        {}", stats.completed);
                    println!("Accepted:         {}", stats.accepted);
                    println!("Professors:       {}", stats.professors);
                }
                Dashboard::Student(_) => bail!("statistics are not available to students"),
            }
        }
        Commands::Report {
            complete,
            from,
            to,
            professor,
            out_dir,
        } => {
            let Dashboard::Director(view) = &dashboard else {
                bail!("only directors can download reports");
            };
            let reports = view.reports();
            let path = if complete {
                reports
                    .download_complete(Utc::now().date_naive(), &out_dir)
                    .await?
            } else {
                let (Some(from), Some(to)) = (from, to) else {
                    bail!("--from and --to are required");
                };
                let professor = match professor {
                    Some(id) => Some(
                        ctx.store()
                            .professor(id)
                            .ok_or_else(|| anyhow!("unknown professor {id}"))?,
                    ),
                    None => None,
                };
                reports
                    .download_range(from, to, professor.as_ref(), &out_dir)
                    .await?
            };
            println!("Report written to {}", path.display());
        }
        Commands::RegisterManual {
            date,
            start,
            end,
            subject,
            topic,
            kind,
            student_name,
            student_email,
            description,
        } => {
            let entry = ManualEntry {
                date: Some(date),
                start: Some(start),
                end: Some(end),
                subject,
                topic,
                kind,
                description,
                student_name,
                student_email,
            };
            match professor_view(&dashboard)?.register_manual(&entry).await? {
                Some(created) => print_requests(&[created]),
                None => println!("Advisory registered"),
            }
        }
        Commands::ExportHistory { out } => {
            let writer: Box<dyn Write> = match &out {
                Some(path) => Box::new(
                    File::create(path).with_context(|| format!("creating {}", path.display()))?,
                ),
                None => Box::new(io::stdout().lock()),
            };
            let rows = match &dashboard {
                Dashboard::Professor(view) => view.export_history(writer)?,
                Dashboard::Director(view) => view.export_history(&HistoryFilter::default(), writer)?,
                Dashboard::Student(_) => bail!("history export is not available to students"),
            };
            info!(rows, "History exported");
        }
    }

    Ok(())
}

fn professor_view<'d, 'a>(dashboard: &'d Dashboard<'a>) -> Result<&'d ProfessorView<'a>> {
    match dashboard {
        Dashboard::Professor(view) => Ok(view),
        _ => bail!("this command is only available to professors"),
    }
}

fn prompt_confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn print_requests(requests: &[AdvisoryRequest]) {
    if requests.is_empty() {
        println!("No advisories");
        return;
    }
    for r in requests {
        println!(
            "{:>5}  {}  {:<13}  {:<11}  {:<24}  {:<24}  {} / {}",
            r.id,
            r.date,
            r.time_slot,
            r.status,
            r.student_name,
            r.professor_name,
            r.subject,
            r.topic
        );
        if !r.annotation.is_empty() {
            println!("       {}", r.annotation);
        }
    }
}

fn print_windows(windows: &[ScheduleWindow]) {
    if windows.is_empty() {
        println!("No schedule windows");
        return;
    }
    for w in windows {
        println!(
            "{:>5}  {:<9}  {}  {}",
            w.id,
            w.day,
            w.range(),
            if w.is_available { "available" } else { "paused" }
        );
    }
}

fn print_slots(slots: &[AvailableSlot]) {
    if slots.is_empty() {
        println!("No open slots");
        return;
    }
    for slot in slots {
        println!("{:>5}  {}", slot.id, slot.time_slot());
    }
}
