use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pika::command::Classifier;
use pika::config::{Config, RecognizerBackend, SpeechEngine};
use pika::desktop::SystemDesktop;
use pika::learning::matcher::predict;
use pika::learning::{JsonStore, LearningState, MemoryStore, ResponseStyle, StateStore};
use pika::listen::{CommandEars, ConsoleEars, Ears};
use pika::session::{learning_report, Session, SessionOptions};
use pika::voice::{ConsoleVoice, EspeakVoice, Voice};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pika", version, about = "Voice assistant for your text editor")]
struct Cli {
    /// Config file (default: ./pika.toml, then the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Learning state file, overriding the config
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Read typed commands from stdin instead of the configured recognizer
    #[arg(long)]
    text: bool,

    /// Print replies instead of speaking them
    #[arg(long)]
    mute: bool,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Listen for commands (default)
    Run,
    /// Show how an utterance would be handled, without executing or recording it
    Classify {
        #[arg(required = true)]
        utterance: Vec<String>,
    },
    /// Show what has been learned
    Stats,
    /// Forget learned commands, keeping preferences
    Forget,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(cli: &Cli, config: &Config) -> Box<dyn StateStore> {
    if !config.learning.persist {
        return Box::new(MemoryStore::new());
    }
    let path = cli
        .state
        .clone()
        .or_else(|| config.learning.state_path.as_ref().map(PathBuf::from))
        .unwrap_or_else(JsonStore::default_path);
    Box::new(JsonStore::new(path))
}

#[hotpath::main]
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;
    let mut store = open_store(&cli, &config);

    match &cli.command {
        None | Some(Command::Run) => run(&cli, &config, store.as_mut()),
        Some(Command::Classify { utterance }) => {
            classify(&config, &store.load(), &utterance.join(" "));
            Ok(())
        }
        Some(Command::Stats) => {
            stats(&store.load());
            Ok(())
        }
        Some(Command::Forget) => {
            let mut state = store.load();
            let forgotten = state.pattern_count();
            state.forget();
            store.save(&state).context("cannot save learning state")?;
            println!("Forgot {} remembered commands. Preferences kept.", forgotten);
            Ok(())
        }
    }
}

fn run(cli: &Cli, config: &Config, store: &mut dyn StateStore) -> Result<()> {
    // The in-flight turn is not saved on interrupt
    ctrlc::set_handler(|| {
        eprintln!();
        std::process::exit(130);
    })
    .context("cannot install Ctrl-C handler")?;

    let mut ears: Box<dyn Ears> = match config.recognizer.backend {
        RecognizerBackend::Command if !cli.text => Box::new(CommandEars::new(
            config.recognizer.program.clone(),
            config.recognizer.args.clone(),
            Duration::from_secs(config.recognizer.timeout_secs),
        )),
        _ => Box::new(ConsoleEars::stdin()),
    };

    let mut voice: Box<dyn Voice> = match config.speech.engine {
        SpeechEngine::Espeak if !cli.mute => Box::new(EspeakVoice::new(
            config.speech.program.clone(),
            config.speech.voice.clone(),
            Duration::from_secs(config.speech.timeout_secs),
        )),
        _ => Box::new(ConsoleVoice),
    };

    let mut desktop = SystemDesktop::new(
        config.editor.window_title(),
        config.typing.input_method,
    );

    let mut state = store.load();
    let options = SessionOptions::from_config(config);
    let turns = Session::new(options, ears.as_mut(), voice.as_mut(), &mut desktop, store)
        .run(&mut state);

    info!(turns, "session ended");
    Ok(())
}

fn classify(config: &Config, state: &LearningState, utterance: &str) {
    let classifier = Classifier::new(config.editor.aliases());
    let intent = classifier.classify(utterance);
    let prediction = predict(utterance, &state.command_patterns);

    println!("action:     {}", intent.action());
    println!("intent:     {:?}", intent);
    match prediction.action {
        Some(action) => println!("prediction: {} ({:.2})", action, prediction.confidence),
        None => println!("prediction: none"),
    }
}

fn stats(state: &LearningState) {
    println!(
        "{}",
        learning_report(state).render(ResponseStyle::Detailed)
    );
    println!("history:    {} recent commands", state.command_history.len());
    for (action, utterances) in state.command_patterns.iter() {
        println!("  {:<18} {}", action, utterances.len());
    }
    if let Some(hint) = state.suggest() {
        println!("{}", hint);
    }
}
