use clap::{Args, FromArgMatches, Parser, Subcommand};

use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "vidscribe",
    about = "vidscribe - Transcribe Google Drive videos in the background and report results to a webhook",
    version,
    long_about = "An HTTP service that accepts transcription jobs, downloads the referenced Google Drive file, extracts its audio with ffmpeg, transcribes it with OpenAI Whisper and POSTs the result to a callback URL."
)]
pub struct Cli {
    /// Command to run (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP service
    Serve(ServeArgs),

    /// Inspect or create the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Write the default configuration file
        #[arg(long)]
        init: bool,
    },
}

impl Cli {
    /// The command to run. Without a subcommand this is `serve`, with its
    /// arguments resolved from the environment the same way.
    pub fn into_command(self) -> Result<Commands, clap::Error> {
        match self.command {
            Some(command) => Ok(command),
            None => {
                let matches = ServeArgs::augment_args(clap::Command::new("serve"))
                    .try_get_matches_from(["serve"])?;
                Ok(Commands::Serve(ServeArgs::from_arg_matches(&matches)?))
            }
        }
    }
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Interface to bind
    #[arg(long, value_name = "ADDR")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PORT", value_name = "PORT")]
    pub port: Option<u16>,

    /// Number of jobs processed concurrently
    #[arg(long, value_name = "COUNT")]
    pub concurrency: Option<usize>,

    /// Number of accepted jobs that may wait for a worker
    #[arg(long, value_name = "COUNT")]
    pub queue_capacity: Option<usize>,

    /// Skip ffmpeg and submit downloaded files as-is
    #[arg(long)]
    pub no_transcode: bool,
}

impl ServeArgs {
    /// Apply command line overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(concurrency) = self.concurrency {
            config.workers.concurrency = concurrency;
        }
        if let Some(capacity) = self.queue_capacity {
            config.workers.queue_capacity = capacity;
        }
        if self.no_transcode {
            config.transcode.enabled = false;
        }
    }
}
