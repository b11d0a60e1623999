//! Console front-end: user intents in, session state out.

use std::fmt::Write as _;
use std::str::FromStr;

use pmoplayback::{PlaybackSession, SessionPhase, SessionSnapshot};
use tokio::sync::watch;

pub const HELP: &str = "\
Commands:
  next, n          next video
  previous, p      previous video
  toggle, t        play / pause
  select <N>, s    play video number N (1-based)
  list, l          show the playlist
  retry, r         reload the catalogue
  help, h          this help
  quit, q          exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    Toggle,
    Select(usize),
    List,
    Retry,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err("empty command".to_string());
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "next" | "n" => Command::Next,
            "previous" | "prev" | "p" => Command::Previous,
            "toggle" | "t" | "play" | "pause" => Command::Toggle,
            "list" | "l" => Command::List,
            "retry" | "r" => Command::Retry,
            "help" | "h" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            "select" | "s" => {
                let number = words
                    .next()
                    .ok_or_else(|| "select needs a video number".to_string())?;
                match number.parse::<usize>() {
                    Ok(n) if n >= 1 => Command::Select(n - 1),
                    _ => return Err(format!("invalid video number: {number}")),
                }
            }
            other => return Err(format!("unknown command: {other} (type 'help')")),
        };
        Ok(command)
    }
}

/// Applies `command` to the session. Returns false on quit.
///
/// Reloads run in the background so the console keeps reading input.
pub fn dispatch(session: &PlaybackSession, command: Command) -> bool {
    match command {
        Command::Next => session.go_next(),
        Command::Previous => session.go_previous(),
        Command::Toggle => session.play_pause(),
        Command::Select(index) => session.select_video(index, true),
        Command::List => println!("{}", list(&session.snapshot())),
        Command::Retry => {
            let session = session.clone();
            tokio::spawn(async move { session.retry().await });
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => return false,
    }
    true
}

/// Playlist, current video marked.
pub fn list(snapshot: &SessionSnapshot) -> String {
    if snapshot.playlist.is_empty() {
        return "(empty playlist)".to_string();
    }

    let mut out = String::new();
    for (i, video) in snapshot.playlist.iter().enumerate() {
        let marker = if i == snapshot.current_index { '>' } else { ' ' };
        let _ = writeln!(
            out,
            "{marker} {:>2}. {} ({}, {})",
            i + 1,
            video.title,
            video.author.name,
            video.published_at
        );
    }
    out.truncate(out.trim_end().len());
    out
}

/// Player screen for one snapshot.
pub fn describe(snapshot: &SessionSnapshot) -> String {
    let mut out = String::new();

    match snapshot.phase() {
        SessionPhase::Empty => out.push_str("No catalogue loaded, type 'retry'"),
        SessionPhase::Loading => out.push_str("⏳ Loading videos..."),
        SessionPhase::Error { reason } => {
            let _ = write!(out, "⚠️  {reason}\n\nType 'retry' to try again");
        }
        SessionPhase::Ready { index } => match snapshot.current_video() {
            Some(video) => {
                let icon = if snapshot.is_playing { "▶" } else { "⏸" };
                let _ = write!(
                    out,
                    "{icon} [{}/{}] {}\nBy {}\n{}",
                    index + 1,
                    snapshot.playlist.len(),
                    video.title,
                    video.author.name,
                    video.description
                );
                if let Some(error) = &snapshot.error_message {
                    let _ = write!(out, "\n⚠️  {error}");
                }
            }
            None => out.push_str("No video selected"),
        },
    }
    out
}

/// Prints the player screen whenever it changes.
pub async fn render(mut snapshots: watch::Receiver<SessionSnapshot>) {
    let mut last = String::new();
    loop {
        let screen = describe(&snapshots.borrow_and_update());
        if screen != last {
            println!("\n{screen}");
            last = screen;
        }
        if snapshots.changed().await.is_err() {
            break;
        }
    }
}
