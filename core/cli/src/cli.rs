use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::args::{Args, Command};
use crate::commands::{export, extract, tree};
use crate::config::Config;

pub struct Cli {
    args: Args,
}

impl Cli {
    pub fn new(args: Args) -> Self {
        Self { args }
    }

    pub async fn exec(self) -> Result<()> {
        self.setup();
        let config = Config::load(self.args.config.as_deref())?;
        match self.args.cmd {
            Command::Extract { path, car, output } => {
                extract::exec(config, &path, &car, output.as_deref()).await
            },
            Command::Tree { car } => tree::exec(&car).await,
            Command::Export { path, car, output } => {
                export::exec(config, &path, &car, output.as_deref()).await
            },
        }
    }

    fn setup(&self) {
        // Build the filter from cli args, or environment variable
        let env_filter = EnvFilter::builder()
            .with_default_directive(
                match self.args.verbose {
                    0 => LevelFilter::INFO,
                    1 => LevelFilter::DEBUG,
                    _2_or_more => LevelFilter::TRACE,
                }
                .into(),
            )
            .from_env_lossy();

        // Logs go to stderr, stdout may be carrying a CAR or file content.
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_file(true)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .init();
    }
}
