use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use flowchat_contracts::chat::{parse_command, ChatCommand, ChatTurn, CHAT_HELP_COMMANDS};
use flowchat_engine::image_encoder::check_upload_path;
use flowchat_engine::render::{render_session, render_turn, TerminalRenderer};
use flowchat_engine::{ConfigOverrides, FlowChat, FlowConfig};

#[derive(Debug, Parser)]
#[command(name = "flowchat", version, about = "Terminal chat for hosted flow run APIs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive chat session.
    Chat(ChatArgs),
    /// Send a single message and print the reply.
    Ask(AskArgs),
}

#[derive(Debug, Args)]
struct FlowArgs {
    #[arg(long)]
    api_base: Option<String>,
    #[arg(long)]
    flow_id: Option<String>,
    #[arg(long)]
    endpoint: Option<String>,
    /// Inline JSON object or path to a JSON file of component tweaks.
    #[arg(long)]
    tweaks: Option<String>,
    #[arg(long)]
    image_component: Option<String>,
    #[arg(long)]
    token: Option<String>,
    #[arg(long)]
    timeout_secs: Option<u64>,
    #[arg(long)]
    events: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct ChatArgs {
    #[command(flatten)]
    flow: FlowArgs,
    /// Image attached to every message until `/detach`.
    #[arg(long)]
    image: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct AskArgs {
    #[command(flatten)]
    flow: FlowArgs,
    #[arg(long)]
    message: String,
    #[arg(long)]
    image: Option<PathBuf>,
}

impl FlowArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_base: self.api_base.clone(),
            flow_id: self.flow_id.clone(),
            endpoint: self.endpoint.clone(),
            tweaks: self.tweaks.clone(),
            image_component: self.image_component.clone(),
            auth_token: self.token.clone(),
            timeout_secs: self.timeout_secs,
        }
    }

    fn open(&self) -> Result<FlowChat> {
        let config = FlowConfig::from_env(self.overrides())?;
        FlowChat::new(config, self.events.as_deref())
    }
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("flowchat error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Chat(args) => {
            run_chat(args)?;
            Ok(0)
        }
        Command::Ask(args) => run_ask(args),
    }
}

fn run_chat(args: ChatArgs) -> Result<()> {
    let mut chat = args.flow.open()?;
    let mut attachment: Option<PathBuf> = None;
    if let Some(path) = args.image.as_deref() {
        check_upload_path(path)?;
        attachment = Some(path.to_path_buf());
    }

    let stdin = io::stdin();
    let mut line = String::new();

    println!(
        "Flowchat started against {}. Type /help for commands.",
        chat.config().run_url()
    );
    if chat.config().auth_token.is_none() {
        println!("No application token configured; requests are unauthenticated.");
    }

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        match parse_command(line.trim_end_matches(['\n', '\r'])) {
            ChatCommand::Noop => continue,
            ChatCommand::Quit => break,
            ChatCommand::Help => {
                println!("Commands: {}", CHAT_HELP_COMMANDS.join(" "));
            }
            ChatCommand::History => {
                let mut renderer = TerminalRenderer::new(io::stdout().lock());
                render_session(chat.session(), &mut renderer)?;
            }
            ChatCommand::Detach => match attachment.take() {
                Some(path) => println!("Detached {}", path.display()),
                None => println!("No image attached"),
            },
            ChatCommand::Attach { path: None } => {
                println!("/image requires a path");
            }
            ChatCommand::Attach { path: Some(path) } => {
                let path = PathBuf::from(path);
                match check_upload_path(&path) {
                    Ok(()) => {
                        println!("Attached {}", path.display());
                        attachment = Some(path);
                    }
                    Err(err) => println!("{err:#}"),
                }
            }
            ChatCommand::Unknown(command) => {
                println!("Unknown command /{command}. Type /help for commands.");
            }
            ChatCommand::Prompt(prompt) => {
                if let Err(err) = submit_and_print(&mut chat, &prompt, attachment.as_deref()) {
                    eprintln!("flowchat error: {err:#}");
                }
            }
        }
    }

    if let Some(path) = chat.events_path() {
        println!("Session events written to {}", path.display());
    }
    Ok(())
}

fn run_ask(args: AskArgs) -> Result<i32> {
    let mut chat = args.flow.open()?;
    let reply = submit_and_print(&mut chat, &args.message, args.image.as_deref())
        .context("flow call could not be made")?;
    Ok(if reply.has_error() { 2 } else { 0 })
}

fn submit_and_print(
    chat: &mut FlowChat,
    prompt: &str,
    attachment: Option<&Path>,
) -> Result<ChatTurn> {
    if attachment.is_some() {
        println!("Processing your image...");
    } else {
        println!("Processing your message...");
    }
    let outcome = chat.submit(prompt, attachment)?;
    let mut renderer = TerminalRenderer::new(io::stdout().lock());
    render_turn(&outcome.reply, &mut renderer)?;
    if let Some(err) = outcome.log_error {
        eprintln!("flowchat warning: {err:#}");
    }
    Ok(outcome.reply)
}
