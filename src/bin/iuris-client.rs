use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use iurisbot::{
    auth::Plan,
    client::{ApiClient, ClientController, RegisterForm, Session, TokenStore, BOT_NAME},
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Parser)]
#[command(name = "iuris-client", about = "Terminal client for the IurisBot chat service")]
struct Cli {
    /// Base URL of the server.
    #[arg(long, env = "IURIS_SERVER", default_value = "http://localhost:3000")]
    server: String,

    /// Where the session token is kept between runs.
    #[arg(long, env = "IURIS_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account and start a session.
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value_t = Plan::Gratuito)]
        plan: Plan,
    },
    /// Start a session with existing credentials.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Show the current account.
    Me,
    /// Send one message, or start an interactive chat when none is given.
    Chat { message: Option<String> },
    /// Show past exchanges.
    History,
    /// Open a premium checkout session and print its URL.
    Subscribe,
    /// Forget the stored token.
    Logout,
    /// List every account.
    AdminUsers {
        #[arg(long, env = "ADMIN_API_KEY")]
        admin_key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let token_file = cli
        .token_file
        .or_else(TokenStore::default_location)
        .context("no config directory; pass --token-file")?;

    let api = ApiClient::new(&cli.server)?;
    let mut ctl = ClientController::new(api, TokenStore::new(token_file));

    match cli.command {
        Command::Register {
            name,
            email,
            password,
            plan,
        } => {
            let form = RegisterForm {
                name,
                email,
                password,
                plan,
            };
            ctl.register(form).await?;
            println!("{}", ctl.ui().status);
        }
        Command::Login { email, password } => {
            ctl.login(&email, &password).await?;
            println!("{}", ctl.ui().status);
        }
        Command::Me => {
            restore(&mut ctl).await?;
            println!("{}", ctl.ui().status);
        }
        Command::Chat { message: Some(message) } => {
            let session = restore(&mut ctl).await?;
            if let Some(reply) = ctl.send_message(&session, &message).await? {
                println!("{BOT_NAME}: {reply}");
            }
        }
        Command::Chat { message: None } => {
            let session = restore(&mut ctl).await?;
            interactive(&mut ctl, &session).await?;
        }
        Command::History => {
            let session = restore(&mut ctl).await?;
            for record in ctl.api().chat_history(&session.token).await? {
                println!("[{}] Tú: {}", record.created_at, record.user_message);
                println!("[{}] {BOT_NAME}: {}", record.created_at, record.bot_reply);
            }
        }
        Command::Subscribe => {
            let session = restore(&mut ctl).await?;
            let url = ctl.subscribe(&session).await?;
            println!("{url}");
        }
        Command::Logout => {
            ctl.logout()?;
            println!("Sesión cerrada");
        }
        Command::AdminUsers { admin_key } => {
            for user in ctl.api().admin_users(admin_key.as_deref()).await? {
                println!("{}\t{}\t{}\t{}", user.id, user.email, user.name, user.plan);
            }
        }
    }

    Ok(())
}

async fn restore(ctl: &mut ClientController) -> anyhow::Result<Session> {
    ctl.restore()
        .await?
        .ok_or_else(|| anyhow!("not logged in; run `iuris-client login` first"))
}

/// Reads lines from stdin until EOF or `/salir`.
async fn interactive(ctl: &mut ClientController, session: &Session) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", ctl.ui().status);
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim() == "/salir" {
            break;
        }

        match ctl.send_message(session, &line).await {
            Ok(Some(reply)) => println!("{BOT_NAME}: {reply}"),
            Ok(None) => {}
            Err(e) => eprintln!("Error: {e}"),
        }
    }
    Ok(())
}
