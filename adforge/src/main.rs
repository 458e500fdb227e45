use std::path::PathBuf;
use std::process::ExitCode;

use adforge::{AppConfig, ClientProvider, Pipeline};
use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "adforge=info,adforge_cli=info";

/// Generate a product advertisement from a product photo and a text description.
#[derive(Parser, Debug)]
#[command(name = "adforge-cli")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Product photo to advertise
    #[arg(long, value_name = "PATH")]
    image: PathBuf,

    /// Product attributes, e.g. "waterproof, ultra-light, durable backpack"
    #[arg(long)]
    text: String,

    /// Where to write the generated image (default: current directory)
    #[arg(long, value_name = "PATH", conflicts_with = "keep")]
    output: Option<PathBuf>,

    /// Leave the image in its temporary directory and print that path
    #[arg(long)]
    keep: bool,

    /// Style reference image (gs://bucket/key or local path)
    #[arg(long, env = "ADFORGE_STYLE_REFERENCE", value_name = "LOCATOR")]
    style_reference: Option<String>,

    /// Model used to synthesize the image prompt
    #[arg(long, env = "ADFORGE_PROMPT_MODEL")]
    prompt_model: Option<String>,

    /// Model used to render the image
    #[arg(long, env = "ADFORGE_IMAGE_MODEL")]
    image_model: Option<String>,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(reference) = &self.style_reference {
            config.style_reference.clone_from(reference);
        }
        if let Some(model) = &self.prompt_model {
            config.prompt_model.clone_from(model);
        }
        if let Some(model) = &self.image_model {
            config.image_model.clone_from(model);
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    match run(&cli).await {
        Ok(path) => {
            println!("{}", path.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<PathBuf> {
    let mut config = AppConfig::from_env().context("failed to load configuration")?;
    cli.apply(&mut config);

    let client = ClientProvider::global()
        .init(&config)
        .await
        .context("failed to initialize cloud clients")?;
    let pipeline = Pipeline::new(&client, &config).context("invalid pipeline configuration")?;

    let image = pipeline.generate_detailed(&cli.image, &cli.text).await?;
    if cli.keep {
        return Ok(image.keep());
    }

    let destination = match &cli.output {
        Some(path) => path.clone(),
        None => PathBuf::from(
            image
                .path()
                .file_name()
                .context("generated image has no file name")?,
        ),
    };
    image
        .persist_to(&destination)
        .with_context(|| format!("failed to write {}", destination.display()))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
