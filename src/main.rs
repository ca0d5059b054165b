use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::Lazy;
use regex::Regex;

use modelconf::catalog::ProviderInfo;
use modelconf::client::{ConfigService, HttpConfigService};
use modelconf::config::CliConfig;
use modelconf::logging;
use modelconf::models::ModelRole;
use modelconf::settings::{SaveOutcome, SettingsSession};

static KEY_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").expect("Invalid key name regex"));

#[derive(Parser)]
#[command(name = "mconf")]
#[command(about = "Edit AI model provider configuration held by a remote service", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (defaults to ~/.modelconf/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the configuration currently held by the service
    Show,
    /// List providers available for each model role
    Providers,
    /// Select a provider and model for a role, then save
    SetModel {
        /// Role to change: chat, completion, or embedding
        role: ModelRole,
        /// Provider id, e.g. "openai"
        provider: String,
        /// Model name, e.g. "gpt-4o"
        model: String,
    },
    /// Clear a role's selection, then save
    ClearModel {
        /// Role to clear: chat, completion, or embedding
        role: ModelRole,
    },
    /// Set one field value for a role's selected model, then save
    SetField {
        /// Role whose model the field belongs to
        role: ModelRole,
        /// Field key from the provider's schema, e.g. "base_url"
        key: String,
        /// Value, parsed as JSON when possible, kept as a string otherwise
        value: String,
    },
    /// Store an API key on the service
    SetKey {
        /// Key name, environment style, e.g. OPENAI_API_KEY
        name: String,
        /// Secret value
        value: String,
    },
    /// Delete a stored API key
    DeleteKey {
        /// Name of the stored key
        name: String,
    },
    /// Choose whether chat input is sent with Shift+Enter
    SetSend {
        /// true sends with Shift+Enter, false sends with Enter
        enabled: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => CliConfig::default_path()?,
    };
    let config = CliConfig::from_file(&config_path)?;
    let service = Arc::new(HttpConfigService::new(
        &config.service.base_url,
        config.service.token.clone(),
        config.service.timeouts.as_service_timeouts(),
    )?);

    match cli.command {
        Commands::Show => show(service).await?,
        Commands::Providers => providers(service).await?,
        Commands::SetModel {
            role,
            provider,
            model,
        } => set_model(service, role, provider, model).await?,
        Commands::ClearModel { role } => clear_model(service, role).await?,
        Commands::SetField { role, key, value } => set_field(service, role, key, value).await?,
        Commands::SetKey { name, value } => set_key(service, name, value).await?,
        Commands::DeleteKey { name } => delete_key(service, name).await?,
        Commands::SetSend { enabled } => set_send(service, enabled).await?,
    }

    Ok(())
}

async fn open_session(service: Arc<dyn ConfigService>) -> Result<SettingsSession> {
    let mut session = SettingsSession::new(service);
    session
        .load()
        .await
        .context("Failed to load configuration from the service")?;
    Ok(session)
}

async fn show(service: Arc<dyn ConfigService>) -> Result<()> {
    let session = open_session(service.clone()).await?;
    let draft = session.draft().context("Configuration not loaded")?;

    println!("Model roles:");
    for role in ModelRole::ALL {
        match draft.global_id(role) {
            Some(id) => println!("  • {role}: {id}"),
            None => match draft.selection(role).provider_id() {
                Some(provider) => println!("  • {role}: {provider} (no model selected)"),
                None => println!("  • {role}: not configured"),
            },
        }
    }
    println!();
    println!(
        "Send with Shift+Enter: {}",
        if draft.send_with_shift_enter() { "yes" } else { "no" }
    );

    let config = session.server().context("Configuration not loaded")?;
    if config.api_keys.is_empty() {
        println!("Stored API keys: none");
    } else {
        println!("Stored API keys:");
        for name in config.api_keys.keys() {
            println!("  • {name}");
        }
    }
    if let Some(fetched) = config.last_read.as_datetime() {
        println!("As of: {}", fetched.format("%Y-%m-%d %H:%M:%S UTC"));
    }

    match service.fetch_catalog().await {
        Ok(catalog) if !catalog.is_empty() => {
            let missing = session.missing_api_keys(&catalog);
            if !missing.is_empty() {
                println!();
                println!("⚠️  Selected providers are missing API keys:");
                for name in missing {
                    println!("  • {name}");
                }
            }
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(error = %err, "provider catalog unavailable"),
    }

    Ok(())
}

async fn providers(service: Arc<dyn ConfigService>) -> Result<()> {
    let catalog = service
        .fetch_catalog()
        .await
        .context("Failed to fetch the provider catalog")?;
    if catalog.is_empty() {
        println!("The service reports no providers.");
        return Ok(());
    }
    print_provider_section(
        "Language model providers (chat + completion)",
        catalog.providers_for(ModelRole::Chat),
    );
    print_provider_section("Embedding providers", catalog.providers_for(ModelRole::Embedding));
    Ok(())
}

fn print_provider_section(title: &str, providers: &[ProviderInfo]) {
    println!("{title}:");
    if providers.is_empty() {
        println!("  (none)");
    }
    for provider in providers {
        match provider.api_key_name.as_deref() {
            Some(key) => println!("  • {} ({}, key: {key})", provider.name, provider.id),
            None => println!("  • {} ({})", provider.name, provider.id),
        }
        for model in &provider.models {
            println!("      - {model}");
        }
    }
    println!();
}

async fn set_model(
    service: Arc<dyn ConfigService>,
    role: ModelRole,
    provider: String,
    model: String,
) -> Result<()> {
    let provider = provider.trim().to_string();
    let model = model.trim().to_string();
    if provider.is_empty() {
        bail!("Provider id must not be empty; use clear-model to deselect");
    }
    if model.is_empty() {
        bail!("Model name must not be empty; use clear-model to deselect");
    }

    let mut session = open_session(service).await?;
    let draft = session.draft_mut().context("Configuration not loaded")?;
    draft.set_provider(role, Some(provider));
    draft.set_model_name(role, model);
    finish_save(&mut session).await
}

async fn clear_model(service: Arc<dyn ConfigService>, role: ModelRole) -> Result<()> {
    let mut session = open_session(service).await?;
    session
        .draft_mut()
        .context("Configuration not loaded")?
        .set_provider(role, None);
    finish_save(&mut session).await
}

async fn set_field(
    service: Arc<dyn ConfigService>,
    role: ModelRole,
    key: String,
    value: String,
) -> Result<()> {
    let parsed = match serde_json::from_str(&value) {
        Ok(json) => json,
        Err(_) => serde_json::Value::String(value),
    };

    let mut session = open_session(service).await?;
    let draft = session.draft_mut().context("Configuration not loaded")?;
    if !draft.set_field_value(role, key, parsed) {
        bail!("Select a provider and model for the {role} role before setting fields");
    }
    finish_save(&mut session).await
}

async fn set_key(service: Arc<dyn ConfigService>, name: String, value: String) -> Result<()> {
    if !KEY_NAME_PATTERN.is_match(&name) {
        bail!("API key names are environment style, e.g. OPENAI_API_KEY");
    }
    if value.trim().is_empty() {
        bail!("An empty value would be dropped at save time; use delete-key to remove a key");
    }

    let mut session = open_session(service).await?;
    session
        .draft_mut()
        .context("Configuration not loaded")?
        .set_api_key(name, value);
    finish_save(&mut session).await
}

async fn delete_key(service: Arc<dyn ConfigService>, name: String) -> Result<()> {
    let mut session = open_session(service).await?;
    if session.delete_api_key(&name).await {
        match session.api_key_alert() {
            Some(alert) => println!("✅ {}", alert.message()),
            None => println!("✅ API key {name} deleted"),
        }
        Ok(())
    } else {
        let message = session
            .api_key_alert()
            .map(|alert| alert.message().to_string())
            .unwrap_or_else(|| "Deletion failed".to_string());
        bail!("{message}")
    }
}

async fn set_send(service: Arc<dyn ConfigService>, enabled: bool) -> Result<()> {
    let mut session = open_session(service).await?;
    session
        .draft_mut()
        .context("Configuration not loaded")?
        .set_send_with_shift_enter(enabled);
    finish_save(&mut session).await
}

async fn finish_save(session: &mut SettingsSession) -> Result<()> {
    match session.save().await {
        SaveOutcome::Saved => {
            match session.alert() {
                Some(alert) if alert.is_error() => println!("⚠️  {}", alert.message()),
                Some(alert) => println!("✅ {}", alert.message()),
                None => println!("✅ Settings saved"),
            }
            Ok(())
        }
        SaveOutcome::Failed => {
            let message = session
                .alert()
                .map(|alert| alert.message().to_string())
                .unwrap_or_else(|| "Save failed".to_string());
            bail!("{message}")
        }
        SaveOutcome::NotLoaded => bail!("Configuration was never loaded"),
        SaveOutcome::InFlight => bail!("Another save is already in flight"),
    }
}
