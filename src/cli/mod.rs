pub mod commands;

pub use commands::{Cli, Commands};

use anyhow::{anyhow, Context};
use console::style;
use dialoguer::{theme::ColorfulTheme, Password};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

use remote_code_launcher::models::{AuthMethod, ConnectionParameters};
use remote_code_launcher::services::bootstrap::BootstrapSequencer;
use remote_code_launcher::services::config_service::ConfigService;
use remote_code_launcher::services::session::{RemoteSession, SessionOrchestrator};
use remote_code_launcher::services::validation_service::ValidationService;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Exec {
            host,
            port,
            username,
            key,
            timeout,
            command,
        } => run_exec(host, port, username, key, timeout, command).await,
        Commands::Bootstrap {
            host,
            port,
            username,
            key,
            commit_id,
            arch,
            install_path,
            local_port,
        } => {
            run_bootstrap(
                host,
                port,
                username,
                key,
                commit_id,
                arch,
                install_path,
                local_port,
            )
            .await
        }
    }
}

async fn run_exec(
    host: String,
    port: u16,
    username: String,
    key: Option<PathBuf>,
    timeout: u64,
    command: String,
) -> anyhow::Result<()> {
    let mut session = connect(&host, port, &username, key).await?;

    let result = session
        .run(&command, Duration::from_secs(timeout))
        .await
        .map_err(|e| anyhow!(e.user_message()));

    // Tear the session down before surfacing any exec error.
    let result = match result {
        Ok(result) => result,
        Err(e) => {
            let _ = session.disconnect().await;
            return Err(e);
        }
    };

    print!("{}", result.stdout);
    if !result.stderr.is_empty() {
        eprint!("{}", result.stderr);
    }

    session
        .disconnect()
        .await
        .map_err(|e| anyhow!(e.user_message()))?;

    if let Some(reason) = result.failure {
        return Err(anyhow!(reason));
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_bootstrap(
    host: String,
    port: u16,
    username: String,
    key: Option<PathBuf>,
    commit_id: Option<String>,
    arch: Option<String>,
    install_path: Option<String>,
    local_port: Option<u16>,
) -> anyhow::Result<()> {
    // Defaults come from the settings file; CLI flags win.
    let settings = ConfigService::new()
        .and_then(|service| service.load_settings())
        .context("failed to load launcher settings")?;

    let mut config = settings.bootstrap;
    if let Some(commit_id) = commit_id {
        config = config.with_commit_id(commit_id);
    }
    if let Some(arch) = arch {
        config = config.with_arch(arch);
    }
    if let Some(install_path) = install_path {
        config = config.with_install_path(install_path);
    }
    if let Some(local_port) = local_port {
        config = config.with_local_port(local_port);
    }

    // Catch a taken forwarding port before the remote side does any work.
    ValidationService::new()
        .ensure_local_port_free("127.0.0.1", config.local_port)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;

    let mut session = connect(&host, port, &username, key).await?;

    let sequencer = BootstrapSequencer::new(config);
    println!(
        "Bootstrapping code-server from {}",
        style(sequencer.download_url()).dim()
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("Running bootstrap sequence...");

    let report = sequencer.bootstrap(&mut session).await;
    spinner.finish_and_clear();

    if !report.transcript.is_empty() {
        println!("{}", style(report.transcript.trim_end()).dim());
    }
    println!("Bootstrap phase: {}", report.phase.display_str());

    if report.succeeded() {
        let url = report.local_url.as_deref().unwrap_or_default();
        println!("{}", style(format!("code-server available at {}", url)).green());
        println!("Press Ctrl-C to disconnect");

        // The forward lives only as long as the session; hold it open until
        // the user interrupts.
        tokio::signal::ctrl_c().await?;

        session
            .disconnect()
            .await
            .map_err(|e| anyhow!(e.user_message()))?;
        Ok(())
    } else {
        let _ = session.disconnect().await;
        match report.failure {
            Some(reason) => Err(anyhow!(reason)),
            None => Err(anyhow!(
                "bootstrap stopped in phase: {}",
                report.phase.display_str()
            )),
        }
    }
}

async fn connect(
    host: &str,
    port: u16,
    username: &str,
    key: Option<PathBuf>,
) -> anyhow::Result<RemoteSession> {
    let validation = ValidationService::new();
    validation
        .validate_host(host)
        .map_err(|e| anyhow!(e.user_message()))?;
    validation
        .validate_port_range(port)
        .map_err(|e| anyhow!(e.user_message()))?;
    if let Some(path) = &key {
        validation
            .validate_ssh_key(path)
            .map_err(|e| anyhow!(e.user_message()))?;
    }

    let auth = prompt_auth(key)?;
    let params = ConnectionParameters::new(host, username, auth).with_port(port);

    println!("Connecting to {}...", style(params.display_name()).cyan());

    SessionOrchestrator::connect(&params, CONNECT_TIMEOUT)
        .await
        .map_err(|e| anyhow!(e.user_message()))
}

/// Prompt for the credential; it is held in memory only and never persisted.
fn prompt_auth(key: Option<PathBuf>) -> anyhow::Result<AuthMethod> {
    match key {
        Some(path) => {
            let passphrase = Password::with_theme(&ColorfulTheme::default())
                .with_prompt("Key passphrase (empty for none)")
                .allow_empty_password(true)
                .interact()?;
            let passphrase = (!passphrase.is_empty()).then_some(passphrase);
            Ok(AuthMethod::public_key(path, passphrase))
        }
        None => {
            let password = Password::with_theme(&ColorfulTheme::default())
                .with_prompt("Password")
                .interact()?;
            Ok(AuthMethod::password(password))
        }
    }
}
