// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use hfspaces_translate::app_config::{Config, LogLevel};
use hfspaces_translate::errors::AppError;
use hfspaces_translate::{BatchTranslationClient, BatchTranslator, ModelRegistry};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate text lines from a file or stdin, one translation per line on stdout
    Translate(TranslateArgs),

    /// List the models the engine knows about
    Models,

    /// Send a short probe to a model and print its reply
    Test {
        /// Model to probe (defaults to the configured model)
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// File with one text per line (stdin when omitted)
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Target language label (e.g. "French - FR")
    #[arg(short, long)]
    target_language: Option<String>,
}

/// hfspaces-translate - batch translation through Hugging Face models
#[derive(Parser, Debug)]
#[command(name = "hfspaces-translate")]
#[command(version)]
#[command(about = "Translate batches of texts with Hugging Face Spaces and inference models")]
#[command(long_about = "Translates batches of texts with hosted language models and maps each reply back onto the input, one translation per line.

EXAMPLES:
    hfspaces-translate translate lines.txt                         # Translate with the configured model
    hfspaces-translate translate -t \"French - FR\" lines.txt        # Choose the target language
    hfspaces-translate translate -m deepseek-ai/DeepSeek-V3 < in   # Use an inference model (needs HF_TOKEN)
    hfspaces-translate models                                      # List known models
    hfspaces-translate test -m Command-R+                          # Probe a model
    hfspaces-translate completions bash > hfspaces-translate.bash  # Generate bash completions

CONFIGURATION:
    Options are stored as JSON, by default in the user config directory. If the file
    does not exist a default one is created.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config_path: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    /// Hugging Face token for inference models
    #[arg(long, env = "HF_TOKEN", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Token for restricted Spaces
    #[arg(long, env = "HF_SPACES_KEY", hide_env_values = true, global = true)]
    spaces_key: Option<String>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level: LevelFilter::Trace }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and tag for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "ERROR"),
            Level::Warn => ("\x1B[1;33m", "WARN "),
            Level::Info => ("\x1B[1;32m", "INFO "),
            Level::Debug => ("\x1B[1;36m", "DEBUG"),
            Level::Trace => ("\x1B[1;35m", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, tag) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "{}{} {} {}\x1B[0m",
                color,
                now,
                tag,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the config says otherwise
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "hfspaces-translate", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli)?;
    log::set_max_level(config.log_level.to_level_filter());

    let result = match cli.command {
        Commands::Translate(args) => run_translate(config, args).await,
        Commands::Models => {
            list_models();
            Ok(())
        }
        Commands::Test { model } => run_test(config, model).await,
        Commands::Completions { .. } => Ok(()),
    };

    if let Err(e) = &result {
        error!("{}", e);
    }
    result.map_err(|e| anyhow!(e))
}

fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let path = cli.config_path.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::from_file(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

    if let Some(level) = cli.log_level.clone() {
        config.log_level = level.into();
    }
    if let Some(key) = &cli.api_key {
        config.update_option("api_key", key)?;
    }
    if let Some(key) = &cli.spaces_key {
        config.update_option("spaces_key", key)?;
    }
    Ok(config)
}

async fn run_translate(mut config: Config, args: TranslateArgs) -> Result<(), AppError> {
    if let Some(model) = &args.model {
        config.update_option("model_name", model)?;
    }
    if let Some(language) = &args.target_language {
        config.update_option("target_language", language)?;
    }
    config.validate()?;

    let input = match &args.input_path {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    let texts: Vec<String> = input.lines().map(str::to_string).collect();
    if texts.is_empty() {
        info!("Nothing to translate");
        return Ok(());
    }

    info!(
        "Translating {} lines with {} into {}",
        texts.len(),
        config.model_name,
        config.target_language
    );

    let client = Arc::new(BatchTranslationClient::new(config));
    let translator = BatchTranslator::new(client);

    let progress = ProgressBar::new(translator.batches(&texts).len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} batches")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let translations = translator
        .translate_all(&texts, None, |done, _| progress.set_position(done as u64))
        .await;
    progress.finish_and_clear();

    let mut stdout = std::io::stdout().lock();
    for line in translations? {
        // Keep one output line per input line
        writeln!(stdout, "{}", line.replace('\n', " "))?;
    }
    Ok(())
}

async fn run_test(config: Config, model: Option<String>) -> Result<(), AppError> {
    let client = BatchTranslationClient::new(config);
    let reply = client.test_connection(model.as_deref()).await?;
    println!("{}", reply);
    Ok(())
}

fn list_models() {
    let registry = ModelRegistry::builtin();
    for model_id in registry.model_ids() {
        if let Some(backend) = registry.get(model_id) {
            match backend {
                hfspaces_translate::translation::Backend::Space { space, restricted } => {
                    let note = if restricted { " (needs spaces key)" } else { "" };
                    println!("{:<36} space      {}{}", model_id, space, note);
                }
                hfspaces_translate::translation::Backend::Inference { provider } => {
                    println!("{:<36} inference  {}", model_id, provider);
                }
            }
        }
    }
}
