//! turmas - command-line client for the training portal.
//!
//! Logs in against the portal API, keeps the session between runs, shows a
//! learner's classes with locked/unlocked resources, and drives the admin
//! endpoints for trainings, classes and resources.

mod cli;

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Local;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Command, ResourceArgs, USAGE};
use turmas::api::{ApiClient, ApiError, ReqwestTransport, Transport};
use turmas::auth::{SessionManager, SessionStore};
use turmas::config::Config;
use turmas::models::{NewClass, NewResource, NewTraining, Registration, UserRecord};
use turmas::utils::{format_date, format_optional, format_period, truncate_string};
use turmas::visibility::{ResourceAccess, LOCKED_MESSAGE};

/// Log file name prefix in the cache directory
const LOG_FILE: &str = "turmas.log";

/// Maximum description width in listings
const DESCRIPTION_WIDTH: usize = 48;

/// Initialize the tracing subscriber for logging
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match config.cache_dir() {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let mut config = Config::load()?;
    let _log_guard = init_tracing(&config);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::parse(&args)?;
    if command == Command::Help {
        print!("{}", USAGE);
        return Ok(());
    }

    let base_url = config.api_base_url();
    info!(base_url = %base_url, "turmas starting");

    let transport: Arc<dyn Transport> =
        Arc::new(ReqwestTransport::new(&base_url, config.request_timeout())?);
    let store = Arc::new(SessionStore::open(config.session_storage()?));
    let session = Arc::new(SessionManager::new(transport.clone(), store));
    let api = ApiClient::authenticated(transport, session.clone());

    match run(command, &mut config, &session, &api).await {
        Err(e) if matches!(e.downcast_ref::<ApiError>(), Some(ApiError::SessionExpired)) => {
            bail!("Session expired. Please log in again with `turmas login`.")
        }
        Err(e) if e.downcast_ref::<ApiError>().is_some_and(ApiError::is_network_or_server) => {
            Err(e.context(format!("Request to the portal at {} failed", base_url)))
        }
        result => result,
    }
}

async fn run(command: Command, config: &mut Config, session: &SessionManager, api: &ApiClient) -> Result<()> {
    let user = session.current_user();
    if command.requires_login() && user.is_none() {
        bail!("Not logged in. Run `turmas login` first.");
    }
    if command.requires_admin() && !user.as_ref().map(|u| u.is_administrator).unwrap_or(false) {
        bail!("This command is only available to administrators.");
    }

    match command {
        Command::Help => print!("{}", USAGE),
        Command::Login { email } => {
            let email = match email.or_else(|| config.last_email.clone()) {
                Some(email) => email,
                None => prompt_line("Email: ")?,
            };
            let password = rpassword::prompt_password("Password: ")?;
            let user = session.login(&email, &password).await?;
            remember_email(config, &email);
            println!("Logged in as {}", user.display_name());
        }
        Command::Register { admin } => {
            let profile = Registration {
                name: prompt_line("Name: ")?,
                email: prompt_line("Email: ")?,
                phone: Some(prompt_line("Phone (optional): ")?).filter(|p| !p.is_empty()),
                password: rpassword::prompt_password("Password: ")?,
                is_administrator: admin,
            };
            let user = session.register(&profile).await?;
            remember_email(config, &profile.email);
            println!("Account created. Logged in as {}", user.display_name());
        }
        Command::Logout => {
            session.logout();
            println!("Logged out.");
        }
        Command::WhoAmI => {
            if let Some(user) = user {
                print_user(&user);
            }
        }
        Command::Dashboard => {
            let user = user.context("Not logged in")?;
            let now = Local::now().naive_local();
            let classes = api.fetch_dashboard(user.id, now).await?;
            if classes.is_empty() {
                println!("You are not enrolled in any class.");
            }
            for entry in classes {
                let training = entry.class.training.name().unwrap_or("Training");
                println!("{} - {}", training, entry.class.name);
                println!("  {}", format_period(entry.class.start_date, entry.class.completion_date));
                for access in &entry.resources {
                    match access {
                        ResourceAccess::Available(r) => println!(
                            "  [{}] {}  {}",
                            r.kind,
                            r.name,
                            r.location().unwrap_or("-")
                        ),
                        ResourceAccess::Locked(_) => println!("  [locked] {}", LOCKED_MESSAGE),
                    }
                }
                println!();
            }
        }
        Command::Class { id } => {
            let class = api.fetch_class_detail(id).await?;
            println!("{} (#{})", class.name, class.id);
            println!("Training: {}", class.training.name().map(String::from).unwrap_or_else(|| format!("#{}", class.training_id())));
            println!("Period:   {}", format_period(class.start_date, class.completion_date));
            if let Some(link) = class.access_link.as_deref() {
                println!("Access:   {}", link);
            }
            let is_creator = user.as_ref().is_some_and(|u| class.is_created_by(u));
            if is_creator {
                println!("Learners: {}", class.enrolled_learners.len());
                for learner in &class.enrolled_learners {
                    println!("  {}", learner.display_name());
                }
            } else if let Some(u) = user.as_ref().filter(|u| !class.is_enrolled(u)) {
                println!("{} is not enrolled in this class.", u.display_name());
            }
            println!("Resources:");
            if class.resources.is_empty() {
                println!("  No resources available.");
            }
            let now = Local::now().naive_local();
            for access in class.resource_access_for(user.as_ref(), now) {
                match access {
                    ResourceAccess::Available(r) => println!(
                        "  #{} [{}] {} - {}  {}",
                        r.id,
                        r.kind,
                        r.name,
                        truncate_string(&format_optional(&r.description, ""), DESCRIPTION_WIDTH),
                        r.location().unwrap_or("-")
                    ),
                    ResourceAccess::Locked(_) => println!("  [locked] {}", LOCKED_MESSAGE),
                }
            }
        }
        Command::Trainings => {
            for t in api.fetch_trainings().await? {
                println!(
                    "#{:<5} {}  {}",
                    t.id,
                    t.name,
                    truncate_string(&format_optional(&t.description, ""), DESCRIPTION_WIDTH)
                );
            }
        }
        Command::Classes => {
            for c in api.fetch_classes().await? {
                println!(
                    "#{:<5} {:<30} training #{:<5} starts {}",
                    c.id,
                    c.name,
                    c.training_id(),
                    format_date(c.start_date)
                );
            }
        }
        Command::Learners => {
            for learner in api.fetch_learners().await? {
                println!("#{:<5} {}", learner.id, learner.display_name());
            }
        }
        Command::Resources => {
            for r in api.fetch_resources().await? {
                println!(
                    "#{:<5} [{}] {}  class {}  prior access: {}  draft: {}",
                    r.id,
                    r.kind,
                    r.name,
                    r.class_id.map(|id| format!("#{}", id)).unwrap_or_else(|| "-".into()),
                    if r.prior_access_allowed { "yes" } else { "no" },
                    if r.is_draft { "yes" } else { "no" },
                );
            }
        }
        Command::Overview => {
            let overview = api.fetch_admin_overview().await?;
            println!(
                "{} trainings, {} classes, {} learners",
                overview.trainings.len(),
                overview.classes.len(),
                overview.learners.len()
            );
        }
        Command::AddTraining { name, description } => {
            api.create_training(&NewTraining { name, description }).await?;
            println!("Training created.");
        }
        Command::AddClass {
            training_id,
            name,
            start,
            end,
        } => {
            let class = NewClass {
                training_id,
                name,
                start_date: start,
                completion_date: end,
                access_link: None,
                learner_ids: Vec::new(),
            };
            api.create_class(&class).await?;
            println!("Class created.");
        }
        Command::Enroll {
            class_id,
            learner_ids,
        } => {
            api.enroll_learners(class_id, learner_ids).await?;
            println!("Learners enrolled.");
        }
        Command::AddResource(args) => {
            api.create_resource(&build_resource(args)?).await?;
            println!("Resource added.");
        }
    }
    Ok(())
}

fn build_resource(args: ResourceArgs) -> Result<NewResource> {
    let mut resource = NewResource::new(args.class_id, args.kind, args.name);
    resource.description = args.description;
    resource.url = args.url;
    resource.prior_access_allowed = args.prior_access;
    resource.is_draft = args.draft;
    if let Some(path) = args.file {
        resource.file = Some((file_name(&path), std::fs::read(&path).with_context(|| {
            format!("Failed to read {}", path.display())
        })?));
    }
    Ok(resource)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string())
}

fn remember_email(config: &mut Config, email: &str) {
    config.last_email = Some(email.to_string());
    if let Err(e) = config.save() {
        tracing::warn!(error = %e, "Failed to save config");
    }
}

fn print_user(user: &UserRecord) {
    println!("{}", user.display_name());
    println!("Phone: {}", format_optional(&user.phone, "-"));
    println!("Role:  {}", if user.is_administrator { "administrator" } else { "learner" });
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
