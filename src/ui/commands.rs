//! Text command surface: `[<session>] <command> [args]` lines in, reply text out.

use crate::player::{CommandOutcome, ControlHandle, ControllerError, SessionCommand};
use crate::resolver::TrackResolver;
use crate::session::SessionKey;
use std::sync::Arc;
use tracing::{debug, instrument};

const UI_LOG_TARGET: &str = "r_jukebox::ui";

pub const HELP_TEXT: &str = "\
Commands (prefix with a session number to target another session):
  play <query>       resolve and queue a track (list:<query> queues every match)
  playnext <query>   queue at the front
  pause | resume | toggle
  skip               stop the current track and advance
  previous           replay the last track from history
  stop | leave       stop playback and clear the queue
  loop [on|off|song] set or toggle looping of the current track
  shuffle            shuffle the pending queue
  clearqueue         remove every pending track
  remove <position>  remove one pending track (1 is next up)
  queue              show the queue
  stats              queue size, pending duration, volume and history
  np                 show the current track
  volume <0-100> | vol+ | vol-
  quit";

/// A parsed command before resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    Play { query: String, at_front: bool },
    Session(SessionCommand),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    pub session: Option<SessionKey>,
    pub command: UserCommand,
}

/// Parses one input line. `volume_step` is the magnitude used by `vol+`/`vol-`.
/// Returns `Ok(None)` for a blank line.
pub fn parse_command(line: &str, volume_step: f32) -> Result<Option<ParsedLine>, ControllerError> {
    let mut tokens = line.split_whitespace().peekable();
    let session = match tokens.peek().and_then(|t| t.parse::<u64>().ok()) {
        Some(id) => {
            tokens.next();
            Some(SessionKey(id))
        }
        None => None,
    };

    let verb = match tokens.next() {
        Some(verb) => verb.to_lowercase(),
        None if session.is_some() => return Err(ControllerError::invalid("Missing command after session")),
        None => return Ok(None),
    };
    let rest: Vec<&str> = tokens.collect();
    let argument = rest.join(" ");

    let command = match verb.as_str() {
        "play" | "p" => UserCommand::Play { query: require(argument, "play")?, at_front: false },
        "playnext" | "pn" => UserCommand::Play { query: require(argument, "playnext")?, at_front: true },
        "pause" => UserCommand::Session(SessionCommand::Pause),
        "resume" => UserCommand::Session(SessionCommand::Resume),
        "toggle" => UserCommand::Session(SessionCommand::PlayPauseToggle),
        "skip" | "next" => UserCommand::Session(SessionCommand::Skip),
        "previous" | "prev" | "back" => UserCommand::Session(SessionCommand::Previous),
        "stop" | "leave" => UserCommand::Session(SessionCommand::Stop),
        "loop" => UserCommand::Session(parse_loop(&argument)?),
        "shuffle" => UserCommand::Session(SessionCommand::Shuffle),
        "clearqueue" | "clear" => UserCommand::Session(SessionCommand::ClearQueue),
        "remove" | "rm" => UserCommand::Session(parse_remove(&argument)?),
        "queue" | "q" => UserCommand::Session(SessionCommand::ShowQueue),
        "stats" => UserCommand::Session(SessionCommand::Stats),
        "np" | "nowplaying" => UserCommand::Session(SessionCommand::NowPlaying),
        "volume" | "vol" => UserCommand::Session(parse_volume(&argument)?),
        "vol+" => UserCommand::Session(SessionCommand::AdjustVolume(volume_step)),
        "vol-" => UserCommand::Session(SessionCommand::AdjustVolume(-volume_step)),
        "help" | "?" => UserCommand::Help,
        "quit" | "exit" => UserCommand::Quit,
        other => return Err(ControllerError::InvalidOperation(format!("Unknown command: {}", other))),
    };

    Ok(Some(ParsedLine { session, command }))
}

fn require(argument: String, verb: &str) -> Result<String, ControllerError> {
    if argument.is_empty() {
        return Err(ControllerError::InvalidOperation(format!("Usage: {} <query>", verb)));
    }
    Ok(argument)
}

fn parse_loop(argument: &str) -> Result<SessionCommand, ControllerError> {
    match argument.to_lowercase().as_str() {
        "" => Ok(SessionCommand::ToggleLooping),
        "on" | "song" => Ok(SessionCommand::SetLooping(true)),
        "off" => Ok(SessionCommand::SetLooping(false)),
        "queue" => Err(ControllerError::invalid("Looping the whole queue is not supported")),
        other => Err(ControllerError::InvalidOperation(format!("Unknown loop mode: {}", other))),
    }
}

fn parse_remove(argument: &str) -> Result<SessionCommand, ControllerError> {
    argument
        .parse::<usize>()
        .map(SessionCommand::Remove)
        .map_err(|_| ControllerError::invalid("Usage: remove <position>"))
}

fn parse_volume(argument: &str) -> Result<SessionCommand, ControllerError> {
    match argument.parse::<u32>() {
        Ok(percent) if percent <= 100 => Ok(SessionCommand::SetVolume(percent as f32 / 100.0)),
        _ => Err(ControllerError::invalid("Volume must be between 0 and 100")),
    }
}

/// What the caller should do with one processed line.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandReply {
    Text(String),
    Quit,
}

/// Resolves and forwards commands to a running control loop.
pub struct CommandSurface {
    control: ControlHandle,
    resolver: Arc<dyn TrackResolver>,
    default_session: SessionKey,
    volume_step: f32,
}

impl CommandSurface {
    pub fn new(control: ControlHandle, resolver: Arc<dyn TrackResolver>, default_session: SessionKey, volume_step: f32) -> Self {
        Self { control, resolver, default_session, volume_step }
    }

    /// Handles one line. Failures become reply text; nothing here is fatal.
    #[instrument(skip(self))]
    pub async fn handle_line(&self, line: &str) -> CommandReply {
        let parsed = match parse_command(line, self.volume_step) {
            Ok(Some(parsed)) => parsed,
            Ok(None) => return CommandReply::Text(String::new()),
            Err(e) => return CommandReply::Text(e.to_string()),
        };
        let key = parsed.session.unwrap_or(self.default_session);

        match parsed.command {
            UserCommand::Quit => CommandReply::Quit,
            UserCommand::Help => CommandReply::Text(HELP_TEXT.to_string()),
            command => match self.dispatch(key, command).await {
                Ok(outcome) => CommandReply::Text(outcome.to_string()),
                Err(e) => {
                    debug!(target: UI_LOG_TARGET, session = %key, "Command failed: {}", e);
                    CommandReply::Text(e.to_string())
                }
            },
        }
    }

    async fn dispatch(&self, key: SessionKey, command: UserCommand) -> Result<CommandOutcome, ControllerError> {
        let command = match command {
            UserCommand::Play { query, at_front } => {
                let tracks = self
                    .resolver
                    .resolve(&query)
                    .await
                    .map_err(|e| ControllerError::ResolutionFailed(e.to_string()))?;
                SessionCommand::Enqueue { tracks, at_front }
            }
            UserCommand::Session(command) => command,
            UserCommand::Help | UserCommand::Quit => return Err(ControllerError::invalid("Not a session command")),
        };
        self.control.execute(key, command).await
    }
}
