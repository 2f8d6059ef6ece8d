use clap::{Parser, Subcommand};
use std::time::Duration;

use lib::backend::ChatClient;
use lib::lang::{self, Language};
use lib::session::{ChatSession, Message, Role, SendOutcome};
use lib::store::WidgetStore;
use lib::token::{GuestToken, StaticToken, TokenProvider};

#[derive(Parser)]
#[command(name = "charla")]
#[command(about = "Charla CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config file.
    Init {
        /// Config file path (default: CHARLA_CONFIG_PATH or ~/.charla/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Chat with the configured backend (interactive). `/reset`, `/lang es|en`, `/exit`.
    Chat {
        /// Config file path (default: CHARLA_CONFIG_PATH or ~/.charla/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Bearer token. When omitted, a guest token is requested for the
        /// configured shop domain.
        #[arg(long, value_name = "TOKEN")]
        token: Option<String>,
    },

    /// Discard the local conversation and notify the backend.
    Reset {
        /// Config file path (default: CHARLA_CONFIG_PATH or ~/.charla/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("charla {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Chat { config, token }) => {
            if let Err(e) = run_chat(config, token).await {
                log::error!("chat failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Reset { config }) => {
            if let Err(e) = run_reset(config).await {
                log::error!("reset failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

fn build_session(
    config_path: Option<std::path::PathBuf>,
    token: Option<String>,
) -> anyhow::Result<ChatSession<ChatClient>> {
    let (config, path) = lib::config::load_config(config_path)?;
    let api_key = lib::config::resolve_api_key(&config);
    let backend = ChatClient::new(
        config.backend.base_url.clone(),
        api_key,
        Duration::from_secs(config.backend.timeout_secs),
    )?;

    let tokens: Box<dyn TokenProvider> = match token {
        Some(t) => Box::new(StaticToken::new(Some(t))),
        None => match config.shop_domain.clone() {
            Some(shop) => Box::new(GuestToken::new(config.backend.base_url.clone(), shop)),
            None => Box::new(StaticToken::new(None)),
        },
    };

    let store = WidgetStore::new(lib::config::default_state_path(&path));
    Ok(ChatSession::new(backend, tokens, store, config.visual))
}

async fn run_chat(
    config_path: Option<std::path::PathBuf>,
    token: Option<String>,
) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let mut session = build_session(config_path, token)?;
    session.initialize().await?;

    for m in session.messages() {
        print_message(&session, m);
    }
    if let Some(url) = session.visual().privacy_policy_url.clone() {
        println!("{}", lang::privacy_notice(session.language(), &url));
    }
    print_quick_replies(&session);
    println!("({})", lang::input_placeholder(session.language()));

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("/exit") || input.eq_ignore_ascii_case("/quit") {
            break;
        }
        if input.eq_ignore_ascii_case("/reset") {
            session.reset_session().await?;
            print_transcript(&session);
            continue;
        }
        if input.eq_ignore_ascii_case("/lang") {
            eprintln!("usage: /lang es|en");
            continue;
        }
        if let Some(code) = input.strip_prefix("/lang ") {
            match code.trim().parse::<Language>() {
                Ok(l) => {
                    session.change_language(l).await?;
                    print_transcript(&session);
                    print_quick_replies(&session);
                }
                Err(e) => eprintln!("{}", e),
            }
            continue;
        }
        // "/1".."/3" pick a quick reply, like tapping one of the widget buttons.
        if let Some(n) = input
            .strip_prefix('/')
            .and_then(|d| d.parse::<usize>().ok())
        {
            let replies = lang::quick_replies(session.language(), &session.visual().bot_name);
            match replies.get(n.wrapping_sub(1)) {
                Some(reply) => session.set_input(reply.clone()),
                None => {
                    eprintln!("usage: /1../{}", replies.len());
                    continue;
                }
            }
        } else {
            session.set_input(input);
        }
        match session.send_input().await? {
            SendOutcome::Delivered | SendOutcome::Failed => {
                if let Some(reply) = session.messages().last() {
                    print_message(&session, reply);
                }
            }
            SendOutcome::NotAuthenticated => {
                eprintln!("{}", lang::login_required_notice(session.language()));
            }
            SendOutcome::Empty | SendOutcome::Busy => {}
        }
    }

    Ok(())
}

async fn run_reset(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let mut session = build_session(config_path, None)?;
    session.reset_session().await?;
    println!("conversation cleared");
    Ok(())
}

fn print_transcript(session: &ChatSession<ChatClient>) {
    for m in session.messages() {
        print_message(session, m);
    }
}

fn print_quick_replies(session: &ChatSession<ChatClient>) {
    let replies = lang::quick_replies(session.language(), &session.visual().bot_name);
    for (i, text) in replies.iter().enumerate() {
        println!("  /{} {}", i + 1, text);
    }
}

fn print_message(session: &ChatSession<ChatClient>, m: &Message) {
    let who = match m.role {
        Role::Assistant => session.visual().bot_name.as_str(),
        Role::User => match session.language() {
            Language::Es => "Yo",
            Language::En => "Me",
        },
    };
    println!("{}: {}", who, m.content);
    if let Some(ref url) = m.url {
        println!("  -> {}", url);
    }
}
