use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use rand::RngCore;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lyceum::auth::PasswordHasher;
use lyceum::config::{CONFIG_FILE_NAME, ServerConfig};
use lyceum::metrics::{MetricsLoop, ObserverRegistry, SystemSampler};
use lyceum::server::{AppState, create_router};
use lyceum::service::accounts::{MIN_PASSWORD_LEN, ProfileInput};
use lyceum::service::directory::ensure_all_role_groups;
use lyceum::service::users::{self, NewUser};
use lyceum::store::{SqliteStore, Store};

const DEFAULT_DATA_DIR: &str = "./data";

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "lyceum")]
#[command(about = "A school resource portal server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Config file (defaults to <data-dir>/lyceum.toml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Host to bind to, overrides the config file
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to, overrides the config file
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database and uploaded media
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (database, config file and first admin)
    Init {
        /// Data directory for the database and uploaded media
        #[arg(long, default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,

        /// Email of the first admin
        #[arg(long)]
        email: Option<String>,

        /// Password of the first admin
        #[arg(long)]
        password: Option<String>,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },
}

fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn prompt_credentials(
    email: Option<String>,
    password: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<(String, String)> {
    if let (Some(email), Some(password)) = (&email, &password) {
        return Ok((email.clone(), password.clone()));
    }
    if non_interactive {
        bail!("--email and --password are required with --non-interactive");
    }

    let email = match email {
        Some(email) => email,
        None => inquire::Text::new("Admin email:")
            .with_validator(|input: &str| {
                if input.contains('@') {
                    Ok(inquire::validator::Validation::Valid)
                } else {
                    Ok(inquire::validator::Validation::Invalid(
                        "Enter a valid email".into(),
                    ))
                }
            })
            .prompt()?,
    };
    let password = match password {
        Some(password) => password,
        None => inquire::Password::new("Admin password:")
            .with_validator(|input: &str| {
                if input.chars().count() >= MIN_PASSWORD_LEN {
                    Ok(inquire::validator::Validation::Valid)
                } else {
                    Ok(inquire::validator::Validation::Invalid(
                        format!("Use at least {MIN_PASSWORD_LEN} characters").into(),
                    ))
                }
            })
            .prompt()?,
    };
    Ok((email, password))
}

fn run_init(
    data_dir: PathBuf,
    email: Option<String>,
    password: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let config_file = data_dir.join(CONFIG_FILE_NAME);
    if config_file.exists() {
        bail!(
            "Server already initialized. Config exists at: {}",
            config_file.display()
        );
    }

    let (email, password) = prompt_credentials(email, password, non_interactive)?;

    fs::create_dir_all(&data_dir)?;
    let config = ServerConfig {
        data_dir: data_dir.clone(),
        jwt_secret: generate_secret(),
        ..ServerConfig::default()
    };
    fs::create_dir_all(config.media_dir())?;

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;
    ensure_all_role_groups(&store)?;

    let admin = users::create_user(
        &store,
        &PasswordHasher::new(),
        NewUser {
            email,
            password,
            status: None,
            roles: vec!["ADMIN".to_string()],
            profile: ProfileInput::default(),
        },
    )?;

    fs::write(&config_file, config.to_toml()?)?;

    #[cfg(unix)]
    set_restrictive_permissions(&config_file);

    println!();
    println!("========================================");
    println!("Created admin '{}'", admin.user.email);
    println!("Config written to: {}", config_file.display());
    println!("========================================");
    println!();

    Ok(())
}

fn load_config(
    config: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<ServerConfig> {
    let mut config = match config {
        Some(path) => {
            let mut config = ServerConfig::load(&path)?;
            if let Some(data_dir) = data_dir {
                config.data_dir = data_dir;
            }
            config
        }
        None => {
            let data_dir = data_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
            ServerConfig::load_from_data_dir(&data_dir)?
        }
    };
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    config
        .validate()
        .context("Server not initialized or misconfigured. Run 'lyceum admin init' first")?;
    Ok(config)
}

async fn run_serve(config: ServerConfig) -> anyhow::Result<()> {
    fs::create_dir_all(config.media_dir())?;

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;
    let store: Arc<dyn Store> = Arc::new(store);

    let role_groups = ensure_all_role_groups(store.as_ref())?;
    info!("Role groups ready: {}", role_groups.len());

    let observers = Arc::new(ObserverRegistry::new());
    let metrics = MetricsLoop::new(
        store.clone(),
        observers.clone(),
        Box::new(SystemSampler::new(config.metrics_disk_path())),
        Duration::from_secs(config.metrics_interval_seconds),
    );
    tokio::spawn(metrics.run());

    let addr = config.socket_addr()?;
    let state = Arc::new(AppState::new(store, observers, config));
    let app = create_router(state);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("lyceum=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                email,
                password,
                non_interactive,
            } => {
                run_init(data_dir, email, password, non_interactive)?;
            }
        },
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
        } => {
            let config = load_config(config, host, port, data_dir)?;
            run_serve(config).await?;
        }
    }

    Ok(())
}
