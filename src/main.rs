use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vidscribe::{server, utils, Cli, Commands, Config};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = Config::load().await?;

    let command = cli.into_command().unwrap_or_else(|e| e.exit());

    match command {
        Commands::Serve(args) => {
            args.apply(&mut config);
            config.validate()?;

            // Missing ffmpeg is not fatal: the transcoder falls back to the raw download
            if config.transcode.enabled {
                for dep in utils::check_dependencies(&config.transcode.ffmpeg_path).await {
                    tracing::warn!(dependency = %dep, "Dependency check warning");
                }
            }

            server::serve(config).await?;
        }
        Commands::Config { show, init } => {
            if init {
                let path = config.save().await?;
                println!("Configuration written to: {}", path.display());
            }
            if show || !init {
                config.display();
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vidscribe=info,tower_http=info"));

    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_format {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
