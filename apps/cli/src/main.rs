use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use webchat_config::load as load_config;
use webchat_protocol::{ChatEvent, Guest, QueueRef, QueueType, StartChatOptions};
use webchat_runtime::{build_client, shutdown_signal, telemetry};
use webchat_session::{ChatSession, Client, EventStream};

#[derive(Parser)]
#[command(name = "webchat")]
#[command(about = "Web chat client (interactive chat by default)")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a chat and relay stdin lines as messages
    Chat {
        #[command(flatten)]
        queue: QueueArgs,
        /// Display name of the guest
        #[arg(long, default_value = "Guest")]
        name: String,
        /// Email address used for the transcript
        #[arg(long)]
        email: Option<String>,
    },
    /// Show the status of a queue
    Queue {
        #[command(flatten)]
        queue: QueueArgs,
    },
    /// Show the capabilities of the server
    ServerConfig,
}

#[derive(Args)]
struct QueueArgs {
    /// Name of the target queue
    #[arg(long)]
    queue: String,
    /// workgroup, user or station
    #[arg(long, default_value = "workgroup")]
    queue_type: QueueType,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    telemetry::init_tracing().context("failed to initialise tracing")?;
    let config = load_config().context("failed to load configuration")?;
    let client = build_client(&config).context("failed to initialise web chat client")?;

    match cli.command {
        Commands::Chat { queue, name, email } => run_chat(&client, queue, name, email).await,
        Commands::Queue { queue } => show_queue(&client, queue).await,
        Commands::ServerConfig => show_server_configuration(&client).await,
    }
}

async fn show_queue(client: &Client, args: QueueArgs) -> anyhow::Result<()> {
    let queue = client
        .query_queue(&args.queue, args.queue_type)
        .await
        .with_context(|| format!("failed to query queue {}", args.queue))?;

    println!("{}", QueueRef::new(queue.name.clone(), queue.kind));
    println!("  agents available:    {}", queue.available_agents);
    println!("  estimated wait time: {}", queue.estimated_wait_time);
    println!("  poll suggestion:     {} ms", queue.poll_wait_suggestion);
    Ok(())
}

async fn show_server_configuration(client: &Client) -> anyhow::Result<()> {
    let configuration = client
        .server_configuration()
        .await
        .context("failed to fetch server configuration")?;

    println!("configuration version {}", configuration.version);
    let mut groups: Vec<_> = configuration.capabilities.iter().collect();
    groups.sort_by(|left, right| left.0.cmp(right.0));
    for (group, capabilities) in groups {
        println!("  {group}: {}", capabilities.join(", "));
    }
    Ok(())
}

async fn run_chat(
    client: &Client,
    args: QueueArgs,
    name: String,
    email: Option<String>,
) -> anyhow::Result<()> {
    let options = StartChatOptions {
        queue: QueueRef::new(args.queue, args.queue_type),
        guest: Guest::named(name),
        email_address: email,
        transcript_required: false,
        ..StartChatOptions::default()
    };

    let session = client
        .start_chat(options)
        .await
        .context("failed to start chat")?;
    let mut events = session.subscribe();

    println!("Connected to {} (chat {})", session.queue(), session.id());
    println!("Type a message and press enter, '/quit' to leave");
    println!("---");

    let mut lines = spawn_stdin_reader();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else { break };
                let text = line.trim();
                if matches!(text, "/quit" | "/exit" | "/q") {
                    break;
                }
                if text.is_empty() {
                    continue;
                }
                if let Err(error) = session.send_message(text, None).await {
                    warn!(%error, "message not sent");
                    println!("! {error}");
                }
            }
            event = events.next() => match event {
                Some(event) => {
                    if !print_event(&session, &event).await {
                        break;
                    }
                }
                None => break,
            },
            _ = &mut shutdown => break,
        }
    }

    leave(&session, &mut events).await
}

/// Forwards stdin lines until end of input.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (sender, receiver) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if sender.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(error) => {
                    warn!(%error, "failed to read stdin");
                    break;
                }
            }
        }
    });
    receiver
}

/// Prints one event; `false` once the chat is over.
async fn print_event(session: &ChatSession, event: &ChatEvent) -> bool {
    match event {
        ChatEvent::Stop(_) => {
            println!("* chat ended");
            false
        }
        ChatEvent::TypingIndicator(_) => true,
        ChatEvent::Text(_) | ChatEvent::File(_) | ChatEvent::Url(_) => {
            let author = match event.participant() {
                Some(participant) if participant.name.is_empty() => session
                    .participant(&participant.id)
                    .await
                    .map(|found| found.name)
                    .unwrap_or_else(|_| participant.id.clone()),
                Some(participant) => participant.name.clone(),
                None => String::new(),
            };
            println!("{author}: {event}");
            true
        }
        ChatEvent::Start(_) | ChatEvent::ParticipantStateChanged(_) => {
            println!("* {event}");
            true
        }
    }
}

async fn leave(session: &ChatSession, events: &mut EventStream) -> anyhow::Result<()> {
    session.stop().await.context("failed to leave chat")?;
    if events.dropped() > 0 {
        warn!(dropped = events.dropped(), "some chat events were not displayed");
    }
    info!("chat closed");
    Ok(())
}
