// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use xliffwai::app_config::{Config, LogLevel, TranslationProvider};
use xliffwai::app_controller::Controller;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Anthropic,
    OpenAI,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
        }
    }
}

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
    /// Translate an XLIFF file or every localized XLIFF file in a directory (default command)
    Translate(TranslateArgs),

    /// Check that the configured translation provider is reachable
    Check(CheckArgs),

    /// Generate shell completions for xliffwai
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone)]
struct TranslateOptions {
    /// Target language, as a name ("French") or ISO code ("fr", "pt-BR")
    #[arg(short, long)]
    language: Option<String>,

    /// Output file (defaults to translating the input in place)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// API key for the selected provider
    #[arg(short = 'k', long, env = "XLIFFWAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Number of units sent per request
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Pause between requests, in seconds
    #[arg(short, long)]
    delay: Option<f64>,

    /// Retranslate units that already have a translation
    #[arg(long)]
    no_skip: bool,

    /// Save progress every N batches
    #[arg(long, value_name = "N")]
    save_frequency: Option<usize>,

    /// Configuration file path
    #[arg(short, long = "config", default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Input XLIFF file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    #[command(flatten)]
    options: TranslateOptions,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Translation provider to check
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// API key for the selected provider
    #[arg(short = 'k', long, env = "XLIFFWAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Configuration file path
    #[arg(short, long = "config", default_value = "conf.json")]
    config_path: String,
}

/// XLIFFwAI - XLIFF translation with AI
///
/// Translates the pending units of XLIFF 1.2 and 2.x documents in batches
/// with an AI provider, saving progress as it goes.
#[derive(Parser, Debug)]
#[command(name = "xliffwai")]
#[command(version)]
#[command(about = "AI-powered XLIFF translation tool")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "XLIFFwAI translates XLIFF documents with AI providers.

EXAMPLES:
    xliffwai messages.xlf -l fr                     # Translate to French in place
    xliffwai messages.xlf -l de -o messages.de.xlf  # Write the result to another file
    xliffwai -p openai -m gpt-4o messages.xlf -l es # Use a specific provider and model
    xliffwai -b 20 -d 0.5 messages.xlf -l ja        # Larger batches, shorter pauses
    xliffwai --no-skip messages.fr.xlf -l fr        # Retranslate everything
    xliffwai src/locale/                            # Translate every messages.<lang>.xlf
    xliffwai check                                  # Test the provider connection
    xliffwai completions bash > xliffwai.bash       # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED PROVIDERS:
    anthropic - Anthropic Messages API (ANTHROPIC_API_KEY)
    openai    - OpenAI Chat Completions API (OPENAI_API_KEY)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input XLIFF file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    #[command(flatten)]
    options: TranslateOptions,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger::new(LevelFilter::Trace)))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and emoji for a log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "❌"),
            Level::Warn => ("\x1B[1;33m", "🚧"),
            Level::Info => ("\x1B[1;32m", " "),
            Level::Debug => ("\x1B[1;36m", "🔍"),
            Level::Trace => ("\x1B[1;35m", "📋"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S%.3f");
            let (color, emoji) = Self::style_for_level(record.level());
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", color, now, emoji, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the configuration says otherwise
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    let success = match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "xliffwai", &mut std::io::stdout());
            true
        }
        Some(Commands::Check(args)) => run_check(args).await?,
        Some(Commands::Translate(args)) => run_translate(args).await?,
        None => {
            let input_path = cli.input_path.ok_or_else(|| {
                anyhow!("INPUT_PATH is required when no subcommand is specified")
            })?;
            run_translate(TranslateArgs { input_path, options: cli.options }).await?
        }
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}

// @returns: Loaded configuration, writing the defaults when the file is missing
fn load_or_create_config(config_path: &str) -> Result<Config> {
    if Path::new(config_path).exists() {
        return Config::from_file(config_path);
    }

    warn!("Config file not found at '{}', creating default config.", config_path);
    let config = Config::default();
    config.save(config_path)?;
    Ok(config)
}

fn apply_overrides(config: &mut Config, options: &TranslateOptions) {
    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(model) = &options.model {
        config.translation.active_provider_config_mut().model = model.clone();
    }
    if let Some(api_key) = &options.api_key {
        config.translation.active_provider_config_mut().api_key = api_key.clone();
    }
    if let Some(language) = &options.language {
        config.target_language = language.clone();
    }
    if let Some(batch_size) = options.batch_size {
        config.batch.batch_size = batch_size;
    }
    if let Some(delay) = options.delay {
        config.batch.delay_secs = delay;
    }
    if options.no_skip {
        config.batch.skip_existing = false;
    }
    if let Some(save_frequency) = options.save_frequency {
        config.batch.save_frequency = save_frequency;
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
}

/// Cancel the returned token on the first Ctrl+C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, saving progress after the current step...");
            token.cancel();
        }
    });
    cancel
}

async fn run_check(args: CheckArgs) -> Result<bool> {
    let mut config = load_or_create_config(&args.config_path)?;
    if let Some(provider) = args.provider {
        config.translation.provider = provider.into();
    }
    if let Some(api_key) = args.api_key {
        config.translation.active_provider_config_mut().api_key = api_key;
    }
    log::set_max_level(config.log_level.to_level_filter());

    config.validate_provider().context("Configuration validation failed")?;
    let controller = Controller::with_config(config)?;
    controller.check_connection().await?;
    Ok(true)
}

// @returns: Whether every unit of every processed file got a translation
async fn run_translate(args: TranslateArgs) -> Result<bool> {
    let options = args.options;
    if let Some(cmd_log_level) = &options.log_level {
        let level: LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = load_or_create_config(&options.config_path)?;
    apply_overrides(&mut config, &options);
    log::set_max_level(config.log_level.to_level_filter());

    config.validate().context("Configuration validation failed")?;

    let controller = Controller::with_config(config)?;
    let cancel = cancel_on_ctrl_c();
    let input_path = args.input_path;

    if input_path.is_file() {
        let stats = controller.run(&input_path, options.output.as_deref(), cancel).await?;
        Ok(stats.errors == 0)
    } else if input_path.is_dir() {
        if options.output.is_some() {
            warn!("--output is ignored for directories; files are translated in place");
        }
        let summary = controller.run_folder(&input_path, cancel).await?;
        if summary.interrupted {
            info!("Folder run interrupted; rerun to continue");
        }
        Ok(!summary.has_errors())
    } else {
        Err(anyhow!("Input path does not exist: {:?}", input_path))
    }
}
