//! Config command - configuration management.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde_json::json;

use kvsession_config::{self, KvsessionConfig};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: Option<ConfigCommand>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration (default)
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Write a config file populated with the defaults
    Init {
        /// Create project-local config (./kvsession.toml) instead of user config
        #[arg(long)]
        local: bool,
    },
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command.unwrap_or(ConfigCommand::Show) {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(ctx),
        ConfigCommand::Init { local } => cmd_init(local),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = &ctx.config;
    let config = &loaded.config;

    if ctx.json_output {
        let sources: Vec<_> = loaded
            .sources
            .iter()
            .map(|s| json!({ "path": s.path.display().to_string(), "loaded": s.loaded }))
            .collect();
        let output = json!({
            "client": config.client(),
            "cache": config.cache(),
            "metrics": config.metrics(),
            "sources": sources,
            "warnings": loaded.warnings,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("# kvsession Configuration\n");

    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("No config files loaded (using defaults)\n");
    } else {
        println!("Config files:");
        for source in &sources {
            println!("  {}", source.display());
        }
        println!();
    }

    let client = config.client();
    println!("Client:");
    println!("  backend:             {}", client.backend);
    println!("  server:              {}", client.server);
    println!("  timeout:             {}ms", client.timeout_ms);
    println!();

    let cache = config.cache();
    println!("Cache:");
    println!("  session ttl:         {}s", cache.session_ttl_secs);
    println!("  reconcile buffer:    {}ms", cache.reconcile_buffer_ms);
    println!("  reconcile workers:   {}", cache.reconcile_workers);
    println!("  key prefix:          {:?}", cache.key_prefix);
    println!("  key suffix:          {:?}", cache.key_suffix);
    println!();

    let metrics = config.metrics();
    println!("Metrics:");
    println!("  enabled:             {}", metrics.enabled);
    println!("  category:            {}", metrics.category);

    if ctx.verbose && !loaded.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &loaded.warnings {
            println!("  {}", warning);
        }
    }

    Ok(())
}

fn cmd_which(ctx: &Context) -> Result<()> {
    let loaded = &ctx.config;

    println!("Config file search order (later overrides earlier):\n");

    for source in &loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {}", status, source.path.display());
    }

    println!();
    let loaded_count = loaded.loaded_from().len();
    if loaded_count == 0 {
        println!("No config files found. Run 'kvsession config init' to create one.");
    } else {
        println!("{} config file(s) loaded.", loaded_count);
    }

    Ok(())
}

fn cmd_init(local: bool) -> Result<()> {
    let path = if local {
        std::path::PathBuf::from("kvsession.toml")
    } else {
        kvsession_config::user_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
    };

    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }

    let defaults = KvsessionConfig {
        client: Some(Default::default()),
        cache: Some(Default::default()),
        metrics: Some(Default::default()),
    };
    kvsession_config::save_config(&defaults, &path)?;

    println!("Created config file: {}", path.display());
    Ok(())
}
