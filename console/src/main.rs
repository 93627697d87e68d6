//! Buildzy Console - Entry Point
//!
//! Command line client for the Buildzy deployment platform.

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use colored::Colorize;
use secrecy::SecretString;

use buildzy::app::options::AppOptions;
use buildzy::app::run::{watch, WatchOutcome};
use buildzy::app::state::AppState;
use buildzy::authn::session::Credentials;
use buildzy::deploy::dispatcher::{DeploymentDispatcher, Notice};
use buildzy::deploy::domain::{check_subdomain, DomainStatus};
use buildzy::logs::{init_logging, LogOptions};
use buildzy::storage::layout::StorageLayout;
use buildzy::storage::settings::Settings;
use buildzy::tail::PollSession;
use buildzy::utils::{format_relative_date, version_info};
use buildzy_api::models::{
    CreateDeploymentRequest, CreateProjectRequest, Environment, RegisterRequest, ResourceId,
    UpdateProjectRequest,
};

use tracing::{error, info};

type CliArgs = HashMap<String, String>;

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: CliArgs = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => eprintln!("{}", e),
        }
        return;
    }

    if let Err(e) = run(&cli_args).await {
        error!("{:#}", e);
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli_args: &CliArgs) -> anyhow::Result<()> {
    let layout = StorageLayout::from_env();
    if let Err(e) = layout.setup().await {
        eprintln!("Unable to create {}: {}", layout.base_dir.display(), e);
    }

    // Retrieve the settings file
    let settings = Settings::load(&layout.settings_file())
        .await
        .context("Unable to read settings file")?
        .with_env_overrides(|key| env::var(key).ok());

    // Initialize logging; stderr only when asked for
    let log_options = LogOptions {
        log_level: settings.log_level,
        stderr: cli_args.contains_key("verbose"),
        log_dir: Some(layout.logs_dir().path().to_path_buf()),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let options = AppOptions::from_settings(&settings, layout);
    info!("Running {} console with options: {:?}", options.product.name, options);
    let state = Arc::new(AppState::init(&options).await?);

    if cli_args.contains_key("login") {
        let user = state
            .session
            .login(arg(cli_args, "email")?, arg(cli_args, "password")?)
            .await?;
        println!("Logged in as {}", user.email.as_deref().unwrap_or("unknown").bold());
    } else if cli_args.contains_key("register") {
        let request = RegisterRequest {
            first_name: arg(cli_args, "first-name")?.to_string(),
            last_name: arg(cli_args, "last-name")?.to_string(),
            email: arg(cli_args, "email")?.to_string(),
            password: arg(cli_args, "password")?.to_string(),
        };
        let user = state.session.register(&request).await?;
        println!("Welcome to {}, {}!", options.product.name, user.first_name.as_deref().unwrap_or("there"));
    } else if cli_args.contains_key("logout") {
        state.session.logout().await;
        println!("Logged out");
    } else if cli_args.contains_key("whoami") {
        match state.session.user().await {
            Some(user) => println!(
                "{} {} <{}>",
                user.first_name.unwrap_or_default(),
                user.last_name.unwrap_or_default(),
                user.email.unwrap_or_default()
            ),
            None => println!("Not logged in"),
        }
    } else if cli_args.contains_key("projects") {
        list_projects(&state, &options).await?;
    } else if cli_args.contains_key("create-project") {
        create_project(&state, cli_args).await?;
    } else if cli_args.contains_key("update-project") {
        update_project(&state, cli_args).await?;
    } else if cli_args.contains_key("delete-project") {
        let token = bearer(&state).await?;
        let project_id = resource(cli_args, "project")?;
        state.http_client.delete_project(&project_id, &token).await?;
        println!("Project {} deleted", project_id);
    } else if cli_args.contains_key("check-domain") {
        let token = bearer(&state).await?;
        let subdomain = arg(cli_args, "subdomain")?;
        let status = check_subdomain(state.http_client.as_ref(), subdomain, &token).await;
        print_domain_status(subdomain, status, &options.product.domain);
    } else if cli_args.contains_key("deployments") {
        let dispatcher = dispatcher(&state, cli_args).await?;
        print_project_view(&dispatcher).await;
    } else if cli_args.contains_key("create-deployment") {
        let dispatcher = dispatcher(&state, cli_args).await?;
        let request = CreateDeploymentRequest {
            git_commit_hash: opt(cli_args, "commit").unwrap_or_default().to_string(),
            git_branch: opt(cli_args, "branch").unwrap_or("main").to_string(),
            environment: environment(cli_args)?.unwrap_or(Environment::Staging),
        };
        finish_action(&dispatcher, dispatcher.create_deployment(request).await).await?;
    } else if cli_args.contains_key("deploy") {
        let dispatcher = dispatcher(&state, cli_args).await?;
        let env = environment(cli_args)?.ok_or_else(|| anyhow!("Missing --env"))?;
        let deployment_id = resource(cli_args, "deployment")?;
        finish_action(&dispatcher, dispatcher.deploy_to(env, deployment_id).await).await?;
    } else if cli_args.contains_key("promote") {
        let dispatcher = dispatcher(&state, cli_args).await?;
        let deployment_id = resource(cli_args, "deployment")?;
        finish_action(&dispatcher, dispatcher.promote(deployment_id).await).await?;
    } else if cli_args.contains_key("rollback") {
        let dispatcher = dispatcher(&state, cli_args).await?;
        let deployment_id = resource(cli_args, "deployment")?;
        let env = environment(cli_args)?;
        finish_action(&dispatcher, dispatcher.rollback(deployment_id, env).await).await?;
    } else if cli_args.contains_key("delete-deployment") {
        let dispatcher = dispatcher(&state, cli_args).await?;
        let deployment_id = resource(cli_args, "deployment")?;
        finish_action(&dispatcher, dispatcher.delete_deployment(deployment_id).await).await?;
    } else if cli_args.contains_key("watch") {
        let session = PollSession::from_parts(
            opt(cli_args, "project"),
            opt(cli_args, "deployment"),
        )
        .ok_or_else(|| anyhow!("--watch needs --project and --deployment"))?;
        match watch(state.clone(), &options, session, await_shutdown_signal()).await? {
            WatchOutcome::Succeeded(Some(url)) => {
                println!("{} {}", "Deployment is live:".green().bold(), url)
            }
            WatchOutcome::Succeeded(None) => println!("{}", "Deployment succeeded".green().bold()),
            WatchOutcome::Interrupted => println!("Stopped watching"),
        }
    } else {
        print_usage(&options.product.name);
    }

    Ok(())
}

// ================================== ARGUMENTS ==================================== //

fn opt<'a>(cli_args: &'a CliArgs, key: &str) -> Option<&'a str> {
    cli_args
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && *v != "true")
}

fn arg<'a>(cli_args: &'a CliArgs, key: &str) -> anyhow::Result<&'a str> {
    opt(cli_args, key).ok_or_else(|| anyhow!("Missing --{}=<value>", key))
}

fn resource(cli_args: &CliArgs, key: &str) -> anyhow::Result<ResourceId> {
    Ok(arg(cli_args, key)?.parse()?)
}

fn environment(cli_args: &CliArgs) -> anyhow::Result<Option<Environment>> {
    opt(cli_args, "env")
        .map(|env| env.parse::<Environment>().map_err(|e| anyhow!(e)))
        .transpose()
}

async fn bearer(state: &AppState) -> anyhow::Result<SecretString> {
    state
        .session
        .bearer()
        .await
        .ok_or_else(|| anyhow!("Not logged in. Run: buildzy --login --email=<email> --password=<password>"))
}

// ================================== PROJECTS ===================================== //

async fn list_projects(state: &AppState, options: &AppOptions) -> anyhow::Result<()> {
    let token = bearer(state).await?;
    let projects = state.http_client.list_projects(&token).await?;
    if projects.is_empty() {
        println!("No projects yet");
        return Ok(());
    }

    let now = chrono::Utc::now();
    for project in projects {
        let host = project
            .subdomain
            .as_deref()
            .map(|s| format!("{}.{}", s, options.product.domain))
            .unwrap_or_default();
        let created = project
            .created_at
            .as_deref()
            .map(|c| format_relative_date(c, now))
            .unwrap_or_default();
        println!(
            "{:>6}  {}  {}  {}",
            project.id.to_string().dimmed(),
            project.name.bold(),
            host.cyan(),
            created.dimmed()
        );
    }
    Ok(())
}

async fn create_project(state: &AppState, cli_args: &CliArgs) -> anyhow::Result<()> {
    let token = bearer(state).await?;
    let subdomain = arg(cli_args, "subdomain")?;
    let status = check_subdomain(state.http_client.as_ref(), subdomain, &token).await;
    if status != DomainStatus::Available {
        bail!("Subdomain {:?}: {}", subdomain, status.describe());
    }

    let auto_deploy_enabled = !cli_args.contains_key("no-auto-deploy");
    let auto_deploy_env = match opt(cli_args, "auto-deploy-env") {
        Some(env) => env.parse::<Environment>().map_err(|e| anyhow!(e))?,
        None => Environment::Staging,
    };
    let request = CreateProjectRequest {
        name: arg(cli_args, "name")?.to_string(),
        description: opt(cli_args, "description").unwrap_or_default().to_string(),
        git_url: arg(cli_args, "git-url")?.to_string(),
        git_branch: opt(cli_args, "git-branch").unwrap_or("main").to_string(),
        subdomain: subdomain.to_string(),
        auto_deploy_enabled,
        auto_deploy_env: auto_deploy_enabled.then_some(auto_deploy_env),
    };

    let created = state.http_client.create_project(&token, &request).await?;
    println!("Project {} created", created.id.to_string().bold());
    if let Some(deployment_id) = created.deployment_id {
        println!(
            "Initial deployment started. Follow it with:\n  buildzy --watch --project={} --deployment={}",
            created.id, deployment_id
        );
    }
    Ok(())
}

async fn update_project(state: &AppState, cli_args: &CliArgs) -> anyhow::Result<()> {
    let token = bearer(state).await?;
    let project_id = resource(cli_args, "project")?;
    let request = UpdateProjectRequest {
        name: arg(cli_args, "name")?.to_string(),
        description: opt(cli_args, "description").unwrap_or_default().to_string(),
        git_url: arg(cli_args, "git-url")?.to_string(),
        git_branch: opt(cli_args, "git-branch").unwrap_or("main").to_string(),
        subdomain: arg(cli_args, "subdomain")?.to_string(),
    };
    state
        .http_client
        .update_project(&project_id, &token, &request)
        .await?;
    println!("Project {} updated", project_id);
    Ok(())
}

fn print_domain_status(subdomain: &str, status: DomainStatus, domain: &str) {
    let host = format!("{}.{}", subdomain, domain);
    match status {
        DomainStatus::Available => println!("{} {}", host.bold(), status.describe().green()),
        _ => println!("{} {}", host.bold(), status.describe().red()),
    }
}

// ================================= DEPLOYMENTS =================================== //

async fn dispatcher(state: &AppState, cli_args: &CliArgs) -> anyhow::Result<DeploymentDispatcher> {
    bearer(state).await?;
    let dispatcher = state.dispatcher(resource(cli_args, "project")?);
    dispatcher.refresh().await;
    Ok(dispatcher)
}

async fn finish_action(
    dispatcher: &DeploymentDispatcher,
    result: Result<(), buildzy::errors::ConsoleError>,
) -> anyhow::Result<()> {
    let view = dispatcher.view().await;
    match (view.notice, result) {
        (Some(Notice::ActiveDeploymentBlocked(env)), _) => {
            let env = env.map(|e| format!(" in {}", e)).unwrap_or_default();
            bail!(
                "This deployment is active{}. Roll back or deploy another version before deleting it.",
                env
            );
        }
        (_, Err(e)) => bail!("{}", view.error.unwrap_or_else(|| e.user_message())),
        (Some(Notice::Success(message)), Ok(())) => println!("{}", message.green().bold()),
        (None, Ok(())) => println!("Done"),
    }
    print_project_view(dispatcher).await;
    Ok(())
}

async fn print_project_view(dispatcher: &DeploymentDispatcher) {
    let view = dispatcher.view().await;
    if let Some(error) = view.error.as_deref() {
        println!("{}", error.yellow());
    }
    let Some(deployments) = view.deployments else {
        return;
    };
    if deployments.is_empty() {
        println!("No deployments for project {}", dispatcher.project_id());
        return;
    }

    let active = view.active.unwrap_or_default();
    let now = chrono::Utc::now();
    for deployment in deployments {
        let live = active
            .environment_of(&deployment.id)
            .map(|env| format!("[live: {}]", env).green().to_string())
            .unwrap_or_default();
        let commit = deployment
            .git_commit_hash
            .as_deref()
            .map(|c| c.chars().take(7).collect::<String>())
            .unwrap_or_default();
        let created = deployment
            .created_at
            .as_deref()
            .map(|c| format_relative_date(c, now))
            .unwrap_or_default();
        println!(
            "{:>6}  {:<10}  {:<10}  {}@{}  {}  {}",
            deployment.id.to_string().dimmed(),
            deployment.status.to_string().bold(),
            deployment.environment.map(|e| e.to_string()).unwrap_or_default(),
            deployment.git_branch.as_deref().unwrap_or("-"),
            commit,
            created.dimmed(),
            live
        );
    }
}

fn print_usage(product: &str) {
    println!("{} console {}", product, version_info().version);
    println!();
    println!("  --login --email=<email> --password=<password>");
    println!("  --register --first-name= --last-name= --email= --password=");
    println!("  --logout | --whoami");
    println!("  --projects");
    println!("  --create-project --name= --git-url= --subdomain= [--git-branch=main] [--description=] [--no-auto-deploy] [--auto-deploy-env=STAGING]");
    println!("  --update-project --project= --name= --git-url= --subdomain= [--git-branch=main] [--description=]");
    println!("  --delete-project --project=");
    println!("  --check-domain --subdomain=");
    println!("  --deployments --project=");
    println!("  --create-deployment --project= [--commit=] [--branch=main] [--env=STAGING]");
    println!("  --deploy --project= --deployment= --env=<STAGING|PRODUCTION>");
    println!("  --promote --project= --deployment=");
    println!("  --rollback --project= --deployment= [--env=]");
    println!("  --delete-deployment --project= --deployment=");
    println!("  --watch --project= --deployment=");
    println!("  --verbose   log to stderr");
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Ctrl+C received, shutting down...");
    }
}
