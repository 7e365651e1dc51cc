//! Text command protocol.
//!
//! A payload whose trimmed form starts with `/` is a command, matched
//! case-insensitively against a fixed vocabulary. Anything else is chat and is
//! broadcast to every session. Interpretation is pure: the caller supplies the
//! clock and the current session count and carries out the returned [`Action`].

use chrono::{DateTime, Local};

/// What the session layer should do with a payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send only to the originating session
    Reply(String),
    /// Send to every open session
    Broadcast(String),
}

/// Recognised commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping,
    Time,
    Clients,
    Help,
    Unknown(String),
}

impl Command {
    /// Parse a payload. Returns `None` for chat messages.
    pub fn parse(payload: &str) -> Option<Command> {
        let trimmed = payload.trim();
        if !trimmed.starts_with('/') {
            return None;
        }

        let command = match trimmed.to_lowercase().as_str() {
            "/ping" => Command::Ping,
            "/time" => Command::Time,
            "/clients" => Command::Clients,
            "/help" => Command::Help,
            _ => Command::Unknown(trimmed.to_string()),
        };
        Some(command)
    }
}

/// Inputs an interpretation depends on besides the payload itself
#[derive(Debug, Clone)]
pub struct CommandContext<'a> {
    pub sender: &'a str,
    pub now: DateTime<Local>,
    pub client_count: usize,
}

impl<'a> CommandContext<'a> {
    pub fn new(sender: &'a str, client_count: usize) -> Self {
        Self {
            sender,
            now: Local::now(),
            client_count,
        }
    }
}

pub const HELP_TEXT: &str = "Commandes disponibles:\n\
/ping - Test de connexion\n\
/time - Heure du serveur\n\
/clients - Nombre de clients\n\
/help - Cette aide";

/// Decide how to answer a payload
pub fn interpret(payload: &str, ctx: &CommandContext<'_>) -> Action {
    match Command::parse(payload) {
        Some(Command::Ping) => Action::Reply("pong".to_string()),
        Some(Command::Time) => Action::Reply(format!(
            "Heure serveur: {}",
            ctx.now.format("%d/%m/%Y %H:%M:%S")
        )),
        Some(Command::Clients) => Action::Reply(format!("Clients connectés: {}", ctx.client_count)),
        Some(Command::Help) => Action::Reply(HELP_TEXT.to_string()),
        Some(Command::Unknown(text)) => Action::Reply(format!("Commande inconnue: {}", text)),
        None => Action::Broadcast(format!(
            "[{}] User {}: {}",
            ctx.now.format("%H:%M:%S"),
            ctx.sender,
            payload
        )),
    }
}
