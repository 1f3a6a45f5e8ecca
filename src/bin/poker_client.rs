//! Line-oriented terminal client.
//!
//! ```text
//! poker-client <room>
//! name <text>   set display name
//! vote <n>      set estimate
//! reveal        reveal (asks first if votes are missing) or reset
//! reveal!       reveal without asking
//! quit
//! ```

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use planning_poker::client::{run_client, ClientConfig, ClientEvent, TableView, UserInput};
use planning_poker::types::{is_spectator_id, MAX_SEATS};

fn parse_command(line: &str) -> Option<UserInput> {
    let line = line.trim();
    let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
    match cmd {
        "name" => Some(UserInput::Name(rest.trim().to_string())),
        "vote" => rest.trim().parse().ok().map(UserInput::Vote),
        "reveal" => Some(UserInput::Reveal { confirmed: false }),
        "reveal!" => Some(UserInput::Reveal { confirmed: true }),
        "quit" | "exit" => Some(UserInput::Quit),
        _ => None,
    }
}

fn print_event(event: &ClientEvent) {
    match event {
        ClientEvent::Assigned(id) if is_spectator_id(*id) => {
            println!("room is full; you are spectator {id}")
        }
        ClientEvent::Assigned(id) => println!("you are seat {id}"),
        ClientEvent::Snapshot { state, local } => {
            println!("{}", TableView::build(state, MAX_SEATS, *local));
        }
        ClientEvent::Reassigned(notice) => println!("you moved to seat {}", notice.new_id),
        ClientEvent::ConfirmationRequired(prompt) => {
            println!("{prompt} (type `reveal!` to confirm)")
        }
        ClientEvent::Error(message) => eprintln!("error: {message}"),
        ClientEvent::Disconnected => println!("disconnected"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env(std::env::args().nth(1))?;

    let (input_tx, input_rx) = mpsc::channel(32);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let driver = tokio::spawn(run_client(config, input_rx, event_tx));

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = stdin.next_line() => {
                let Some(line) = line? else {
                    let _ = input_tx.send(UserInput::Quit).await;
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Some(input) => {
                        let quit = input == UserInput::Quit;
                        if input_tx.send(input).await.is_err() || quit {
                            break;
                        }
                    }
                    None => eprintln!("commands: name <text> | vote <n> | reveal | reveal! | quit"),
                }
            }
            event = event_rx.recv() => {
                let Some(event) = event else {
                    break;
                };
                print_event(&event);
                if event == ClientEvent::Disconnected {
                    break;
                }
            }
        }
    }

    drop(event_rx);
    driver.await?
}
