//! Console command parsing.

use chorus_core::MusicCommand;

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Forwarded to the music service.
    Music(MusicCommand),
    /// Print the command list.
    Help,
    /// Print the session snapshot.
    Status,
    /// Prefixed, but not a known command.
    Unknown(String),
}

/// Parses one console line.
///
/// Returns `None` for lines that don't start with `prefix` (chatter).
pub fn parse(line: &str, prefix: &str) -> Option<ConsoleCommand> {
    let rest = line.trim().strip_prefix(prefix)?;
    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };
    if name.is_empty() {
        return None;
    }

    let command = match name.to_ascii_lowercase().as_str() {
        "play" | "p" => ConsoleCommand::Music(MusicCommand::Play(args.to_string())),
        "skip" | "s" | "next" => ConsoleCommand::Music(MusicCommand::Skip),
        "pause" => ConsoleCommand::Music(MusicCommand::Pause),
        "resume" | "unpause" => ConsoleCommand::Music(MusicCommand::Resume),
        "leave" | "stop" | "disconnect" => ConsoleCommand::Music(MusicCommand::Leave),
        "join" | "connect" => ConsoleCommand::Music(MusicCommand::Join),
        "help" | "commands" => ConsoleCommand::Help,
        "status" | "queue" | "np" => ConsoleCommand::Status,
        _ => ConsoleCommand::Unknown(name.to_string()),
    };
    Some(command)
}

/// Command listing for `help`.
pub fn help_text(prefix: &str) -> String {
    [
        ("play <query>", "Play a track, or queue it behind the current one"),
        ("skip", "Skip the current track"),
        ("pause", "Pause the current track"),
        ("resume", "Resume a paused track"),
        ("join", "Join your voice channel"),
        ("leave", "Stop playback, clear the queue and leave"),
        ("status", "Show the session state and queue"),
        ("help", "Show this list"),
    ]
    .iter()
    .map(|(usage, what)| format!("  {prefix}{usage:<14} {what}"))
    .collect::<Vec<_>>()
    .join("\n")
}
