use clap::Parser;
use edem_core::{EdemConfig, Locale, Mode, Owner, SessionStore, Step, TurnInput, Voice};
use edem_dialogue::{DialogueEngine, TurnRequest, TurnResponse};
use edem_memory::{InMemoryStore, SqliteStore};
use std::io::{self, Write};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod input;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "edem.toml")]
    config: String,

    /// Path to the session database (overrides config)
    #[arg(short, long, env = "EDEM_DB_PATH")]
    db: Option<String>,

    /// Keep everything in memory; nothing is written to disk
    #[arg(long)]
    ephemeral: bool,

    /// Voice: soft, hard or therapist
    #[arg(long, value_parser = parse_voice)]
    voice: Option<Voice>,

    /// Subscription mode: demo or pro
    #[arg(long, value_parser = parse_mode)]
    mode: Option<Mode>,

    /// Locale: ru or en
    #[arg(long, value_parser = parse_locale)]
    locale: Option<Locale>,

    /// User id the sessions are stored under
    #[arg(short, long, default_value = "local")]
    user: String,

    /// Resume an existing session
    #[arg(long)]
    session: Option<Uuid>,

    /// Skip intake and open directly in the shadow stage
    #[arg(long)]
    direct: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_voice(s: &str) -> Result<Voice, String> {
    Voice::parse(s).ok_or_else(|| format!("unknown voice '{}'", s))
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    Mode::parse(s).ok_or_else(|| format!("unknown mode '{}'", s))
}

fn parse_locale(s: &str) -> Result<Locale, String> {
    Locale::parse(s).ok_or_else(|| format!("unknown locale '{}'", s))
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("info"),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(io::stderr)
        .init();
}

/// Where the conversation currently stands, from the client's side.
struct Conversation {
    session_id: Option<Uuid>,
    step: Step,
    last_practice: Option<Uuid>,
}

impl Conversation {
    fn absorb(&mut self, resp: &TurnResponse) {
        self.session_id = Some(resp.session_id);
        if !matches!(
            resp.next_step,
            Step::CrisisIntervention | Step::Error | Step::PracticeReport
        ) {
            self.step = resp.next_step;
        }
        if let Some(id) = resp
            .update
            .as_ref()
            .and_then(|u| u.get("practiceId"))
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
        {
            self.last_practice = Some(id);
        }
    }
}

fn render(resp: &TurnResponse) -> io::Result<()> {
    let mut out = io::stdout();
    writeln!(out, "{}", resp.utterance)?;
    if let Some(buttons) = &resp.buttons {
        for (i, label) in buttons.iter().enumerate() {
            writeln!(out, "  [{}] {}", i + 1, label)?;
        }
    }
    if resp.paywall {
        writeln!(out, "  (pro: restart with --mode pro to continue)")?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = EdemConfig::load_or_default(&args.config);
    if let Some(db) = &args.db {
        config.storage.db_path = db.clone();
    }
    let voice = args.voice.unwrap_or(config.dialogue.default_voice);
    let mode = args.mode.unwrap_or(config.dialogue.default_mode);
    let locale = args.locale.unwrap_or(config.dialogue.locale);

    let store: Arc<dyn SessionStore> = if args.ephemeral {
        info!("Using in-memory session store");
        Arc::new(InMemoryStore::new())
    } else {
        info!("Connecting to session store at {}...", config.storage.db_path);
        Arc::new(SqliteStore::new(&config.storage.db_path).await?)
    };
    let engine = DialogueEngine::new(&config, store);
    let owner = Owner::User(args.user.clone());

    let send = |conv: &Conversation, input: TurnInput| {
        let mut req = TurnRequest::new(owner.clone(), input)
            .with_voice(voice)
            .with_mode(mode)
            .with_locale(locale);
        if let Some(id) = conv.session_id {
            req = req.in_session(id);
        }
        req
    };

    let mut conv = Conversation {
        session_id: args.session,
        step: if args.direct { Step::Shadow } else { Step::Mask },
        last_practice: None,
    };

    println!("EDEM online. Type 'quit' to exit, '/report <0-10> [note]' to log a practice.");
    if !args.direct {
        let resp = engine
            .handle_turn(send(&conv, TurnInput::Mask { mask: None }))
            .await;
        conv.absorb(&resp);
        render(&resp)?;
    }
    print!("> ");
    io::stdout().flush()?;

    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let trimmed = line.trim();

        if trimmed == "quit" || trimmed == "exit" {
            break;
        }

        let is_free_text = conv.step.is_onboarding() || conv.step.stage().is_some();
        if trimmed.is_empty() && is_free_text {
            print!("> ");
            io::stdout().flush()?;
            continue;
        }

        let input = input::parse_line(conv.step, trimmed, conv.last_practice);
        let resp = engine.handle_turn(send(&conv, input)).await;
        conv.absorb(&resp);
        render(&resp)?;

        print!("> ");
        io::stdout().flush()?;
    }

    if let Some(id) = conv.session_id {
        println!("Session {}", id);
    }
    Ok(())
}
