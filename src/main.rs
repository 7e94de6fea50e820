//! Command-line entry point for cloudinary-dump

use clap::{ArgAction, CommandFactory, Parser};
use cloudinary_dump::config::{DEFAULT_API_BASE_URL, DEFAULT_TEMPLATE};
use cloudinary_dump::{Config, Dumper, Error, cancel_on_signal};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Export every asset of a Cloudinary account into a local directory
#[derive(Debug, Parser)]
#[command(name = "cloudinary-dump", version, disable_help_flag = true)]
struct Cli {
    /// Print help
    #[arg(short = 'h', long = "help", action = ArgAction::SetTrue)]
    help: bool,

    /// Credentials URL, `cloudinary://<api_key>:<api_secret>@<cloud_name>`
    #[arg(short = 'u', long = "url", env = "CLOUDINARY_URL", hide_env_values = true)]
    url: Option<String>,

    /// Directory the assets are written to
    #[arg(short = 'd', long = "dir", default_value = "dump")]
    dir: PathBuf,

    /// File-name template, e.g. `{{.PublicID}}.{{.Format}}`
    #[arg(short = 't', long = "template", default_value = DEFAULT_TEMPLATE)]
    template: String,

    /// Number of concurrent downloads
    #[arg(short = 'c', long = "concurrency", default_value_t = 5)]
    concurrency: usize,

    #[arg(
        long = "api-base-url",
        env = "CLOUDINARY_API_BASE_URL",
        default_value = DEFAULT_API_BASE_URL,
        hide = true
    )]
    api_base_url: String,
}

impl Cli {
    fn into_config(self, cloudinary_url: String) -> Config {
        Config {
            cloudinary_url,
            target_dir: self.dir,
            file_name_template: self.template,
            concurrency: self.concurrency,
            api_base_url: self.api_base_url,
            ..Default::default()
        }
    }
}

/// The credentials URL to run with, or `None` when usage should be printed
///
/// Help and a missing URL are both usage errors.
fn credentials(cli: &mut Cli) -> Option<String> {
    if cli.help {
        return None;
    }
    cli.url.take()
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut cli = Cli::parse();
    let Some(url) = credentials(&mut cli) else {
        eprint!("{}", Cli::command().render_help());
        return ExitCode::FAILURE;
    };

    let dumper = match Dumper::new(cli.into_config(url)) {
        Ok(dumper) => dumper,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let signals = tokio::spawn(cancel_on_signal(dumper.cancellation_token()));
    let result = dumper.run().await;
    dumper.cancellation_token().cancel();
    let _ = signals.await;

    match result {
        Ok(_) => ExitCode::SUCCESS,
        // The failing worker already logged asset and cause
        Err(Error::Fetch { .. }) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
