use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use bodywatch::activity::{run_activity, DEFAULT_TIMEOUT};
use bodywatch::data::duration::parse_duration;
use bodywatch::data::DEFAULT_USER_ID;
use bodywatch::events::{self, Command};
use bodywatch::{
    device_url, App, DeviceLink, HistoryStore, LocalStore, PersistQueue, PersistSink,
    RecordingSink, Reconciler, Settings, StreamLink, WebSocketLink,
};
use bodywatch_adapters::{BackendClient, Registration};
use bodywatch_types::Activity;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bodywatch")]
#[command(about = "Operator console for an ESP32 body-measurement rig")]
#[command(version)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory for local state (overrides storage.data_dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Measure live from the device
    Live {
        /// Device IP address or ws:// URL
        #[arg(long)]
        ip: Option<String>,

        /// Keep measurements local instead of saving them to the backend
        #[arg(long)]
        offline: bool,
    },

    /// Replay a capture of newline-delimited device frames
    Replay {
        file: PathBuf,

        /// Keep measurements local instead of saving them to the backend
        #[arg(long)]
        offline: bool,
    },

    /// Show recorded body measurements
    History {
        /// Fetch the logged-in user's history from the backend first
        #[arg(long)]
        remote: bool,
    },

    /// Delete every recorded body measurement
    ClearHistory,

    /// Export recorded body measurements to a JSON file and exit
    Export { path: PathBuf },

    /// Log in and remember the session
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Forget the session and athlete profile
    Logout,

    /// Create a backend account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        age: u32,
        #[arg(long)]
        weight: f64,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Show or update the athlete profile
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        age: Option<u32>,
        #[arg(long)]
        weight: Option<f64>,
    },

    /// Run a one-shot activity test
    Activity {
        /// Activity key or name (e.g. "sprint", "t_test"); omit to list them
        activity: Option<String>,

        /// Device IP address or ws:// URL
        #[arg(long)]
        ip: Option<String>,

        /// How long to wait for the result (e.g. "60s")
        #[arg(long, default_value = "60s")]
        timeout: String,
    },

    /// Show recorded activity tests
    Activities,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bodywatch=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(dir) = args.data_dir {
        settings.storage.data_dir = dir;
    }
    let store = LocalStore::new(&settings.storage.data_dir);

    match args.command {
        Cmd::Live { ip, offline } => run_live(&settings, &store, ip, offline).await,
        Cmd::Replay { file, offline } => run_replay(&settings, &store, &file, offline).await,
        Cmd::History { remote } => show_history(&settings, &store, remote).await,
        Cmd::ClearHistory => {
            store.history().clear()?;
            println!("History cleared.");
            Ok(())
        }
        Cmd::Export { path } => export_history(&store, &path),
        Cmd::Login { email, password } => login(&settings, &store, &email, &password).await,
        Cmd::Logout => {
            store.clear_session()?;
            println!("Logged out.");
            Ok(())
        }
        Cmd::Register {
            name,
            age,
            weight,
            email,
            password,
        } => {
            let registration = Registration {
                name,
                age,
                weight,
                email,
                password,
            };
            backend(&settings)?.register(&registration).await?;
            println!("Registered {}. You can now log in.", registration.email);
            Ok(())
        }
        Cmd::Profile { name, age, weight } => update_profile(&store, name, age, weight),
        Cmd::Activity {
            activity,
            ip,
            timeout,
        } => run_activity_test(&settings, &store, activity, ip, &timeout).await,
        Cmd::Activities => {
            let records = store.activities();
            if records.is_empty() {
                println!("No activity tests yet.");
            }
            for record in records {
                let results = record
                    .results
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join(" ");
                println!(
                    "{} {} {:<24} {}",
                    record.captured.date,
                    record.captured.time,
                    record.activity.label(),
                    results
                );
            }
            Ok(())
        }
    }
}

fn backend(settings: &Settings) -> Result<BackendClient> {
    BackendClient::builder()
        .base_url(&settings.backend.base_url)
        .timeout(settings.backend.timeout)
        .build()
        .context("building backend client")
}

/// Build the persistence sink: the backend queue, or an in-memory sink.
fn persistence(
    settings: &Settings,
    offline: bool,
) -> Result<(Box<dyn PersistSink>, Option<PersistQueue>)> {
    if offline {
        info!("offline mode: measurements stay local");
        return Ok((Box::new(RecordingSink::new()), None));
    }
    let client = Arc::new(backend(settings)?);
    let queue = PersistQueue::spawn(client, settings.retry_policy());
    Ok((Box::new(queue.handle()), Some(queue)))
}

fn reconciler(store: &LocalStore, sink: Box<dyn PersistSink>) -> Result<Reconciler> {
    let session = store.session();
    let profile = store
        .profile()
        .or_else(|| session.as_ref().map(|user| user.profile()))
        .unwrap_or_default();
    let user_id = session.map(|user| user.id).unwrap_or(DEFAULT_USER_ID);

    Ok(Reconciler::restore(sink, Box::new(store.history()))?
        .with_profile(profile)
        .with_user(user_id))
}

/// Resolve the device URL: flag, then config, then the last one used.
fn resolve_device(settings: &Settings, store: &LocalStore, ip: Option<String>) -> Option<String> {
    ip.or_else(|| settings.device.ip.clone())
        .map(|host| device_url(&host, settings.device.port))
        .or_else(|| store.device_url())
}

async fn run_live(
    settings: &Settings,
    store: &LocalStore,
    ip: Option<String>,
    offline: bool,
) -> Result<()> {
    let (sink, queue) = persistence(settings, offline)?;
    let reconciler = reconciler(store, sink)?;

    let link: Option<Box<dyn DeviceLink>> = match resolve_device(settings, store, ip) {
        Some(url) => {
            let client_id = store.client_id()?;
            let link = WebSocketLink::connect(&url, Some(client_id))
                .await
                .with_context(|| format!("could not connect to the device at {}", url))?;
            if let Err(e) = store.save_device_url(&url) {
                warn!(error = %e, "failed to remember device url");
            }
            println!("Connected to {}", url);
            Some(Box::new(link))
        }
        None => None,
    };

    let app = App::new(link, reconciler, settings.measuring_window());
    run_console(app, store).await;

    if let Some(queue) = queue {
        info!("waiting for pending saves");
        queue.close().await;
    }
    Ok(())
}

/// Console loop: stdin commands interleaved with link polling.
async fn run_console(mut app: App, store: &LocalStore) {
    println!("{}", events::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_millis(100));

    while app.running {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => match events::parse_command(&line) {
                    Ok(Some(command)) => {
                        if let Command::Profile(profile) = &command {
                            if let Err(e) = store.save_profile(profile) {
                                error!(error = %e, "failed to save profile");
                            }
                        }
                        if let Some(output) = events::handle_command(&mut app, command, Instant::now()) {
                            println!("{}", output);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => println!("{}", e),
                },
                Ok(None) => app.quit(),
                Err(e) => {
                    error!(error = %e, "reading stdin");
                    app.quit();
                }
            },
            _ = ticker.tick() => {
                app.pump();
                app.tick(Instant::now());
            }
        }

        for notification in app.drain_notifications() {
            println!("{}", notification);
        }
    }
}

async fn run_replay(
    settings: &Settings,
    store: &LocalStore,
    path: &std::path::Path,
    offline: bool,
) -> Result<()> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("opening {}", path.display()))?;
    let (sink, queue) = persistence(settings, offline)?;
    let mut reconciler = reconciler(store, sink)?;
    let mut link = StreamLink::spawn(file, &path.display().to_string());

    let mut finalized = 0;
    while !link.is_drained() {
        while let Some(frame) = link.poll() {
            if let bodywatch::Reconciled::Finalized(_) = reconciler.handle_frame(&frame) {
                finalized += 1;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    for record in reconciler.records() {
        println!("{}", events::format_record(&record));
    }
    println!("{} measurement(s) recorded from {}", finalized, path.display());

    drop(reconciler);
    if let Some(queue) = queue {
        queue.close().await;
    }
    Ok(())
}

async fn show_history(settings: &Settings, store: &LocalStore, remote: bool) -> Result<()> {
    let mut reconciler = reconciler(store, Box::new(RecordingSink::new()))?;

    if remote {
        let Some(user) = store.session() else {
            bail!("not logged in; run `bodywatch login` first");
        };
        let rows = backend(settings)?.fetch_measurements(user.id).await?;
        reconciler.replace_history(&rows);
    }

    if reconciler.history().is_empty() {
        println!("No measurements yet.");
    }
    for record in reconciler.records() {
        println!("{}", events::format_record(&record));
    }
    Ok(())
}

fn export_history(store: &LocalStore, path: &std::path::Path) -> Result<()> {
    let records = store.history().load()?;
    let json = serde_json::to_string_pretty(&records)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    println!("Exported {} measurement(s) to {}", records.len(), path.display());
    Ok(())
}

async fn login(settings: &Settings, store: &LocalStore, email: &str, password: &str) -> Result<()> {
    let user = backend(settings)?.login(email, password).await?;
    store.save_session(&user)?;
    let profile = user.profile();
    if profile.is_complete() {
        store.save_profile(&profile)?;
    }
    println!("Welcome back, {}!", profile.name.as_deref().unwrap_or(email));
    Ok(())
}

fn update_profile(
    store: &LocalStore,
    name: Option<String>,
    age: Option<u32>,
    weight: Option<f64>,
) -> Result<()> {
    let mut profile = store.profile().unwrap_or_default();
    let changed = name.is_some() || age.is_some() || weight.is_some();
    if let Some(name) = name {
        profile.name = Some(name);
    }
    if age.is_some() {
        profile.age = age;
    }
    if weight.is_some() {
        profile.weight = weight;
    }
    if changed {
        store.save_profile(&profile)?;
        println!("Profile saved.");
    }

    let show = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
    println!("Name:   {}", show(profile.name.clone()));
    println!("Age:    {}", show(profile.age.map(|a| a.to_string())));
    println!("Weight: {}", show(profile.weight.map(|w| format!("{} kg", w))));
    Ok(())
}

async fn run_activity_test(
    settings: &Settings,
    store: &LocalStore,
    activity: Option<String>,
    ip: Option<String>,
    timeout: &str,
) -> Result<()> {
    let Some(key) = activity else {
        println!("Activities:");
        for activity in Activity::ALL {
            println!("  {:<18} {}", activity.key(), activity.label());
        }
        return Ok(());
    };
    let activity = key.parse::<Activity>()?;
    let timeout = parse_duration(timeout).unwrap_or(DEFAULT_TIMEOUT);
    let Some(url) = resolve_device(settings, store, ip) else {
        bail!("no device configured; pass --ip or set device.ip");
    };

    let record = run_activity(&url, Some(activity), timeout).await?;
    println!("{} complete:", record.activity.label());
    for (key, value) in &record.results {
        println!("  {} = {}", key, value);
    }
    store.push_activity(record)?;
    Ok(())
}
