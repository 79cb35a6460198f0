//! Command service — classify submitted lines and apply them.
//!
//! DESIGN
//! ======
//! A submitted line is either chat text, rendered into an immutable record
//! and appended to the log, or a slash-command that mutates the log or the
//! chatter table. Parsing is pure (`Command::parse`); `dispatch` applies the
//! result. Name and color are baked into the rendered record, so renaming a
//! chatter never rewrites history.
//!
//! Malformed commands (`/nick` with no value, `/nickname`, `/wipe now`) are
//! treated like unknown commands: silently ignored.

use time::OffsetDateTime;
use time::macros::format_description;
use tracing::info;

use super::chatter::{Chatter, ChatterTable};
use super::message_log::MessageLog;
use crate::state::AppState;

const COMMAND_PREFIX: char = '/';

// =============================================================================
// PARSING
// =============================================================================

/// One submitted line, classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// Plain chat text, verbatim.
    Chat(&'a str),
    /// `/wipe` or `/clear`.
    Clear,
    /// `/nick <value>`.
    Nick(&'a str),
    /// `/color <value>`.
    Color(&'a str),
    /// Anything else starting with the command prefix.
    Unknown(&'a str),
}

impl<'a> Command<'a> {
    /// Classify `text`. Returns `None` for blank input.
    ///
    /// Only the first character decides between chat and command, so
    /// `" /wipe"` is chat. Chat text keeps its surrounding whitespace.
    #[must_use]
    pub fn parse(text: &'a str) -> Option<Self> {
        if text.trim().is_empty() {
            return None;
        }
        if !text.starts_with(COMMAND_PREFIX) {
            return Some(Self::Chat(text));
        }

        let (word, arg) = match text.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (text, ""),
        };

        let command = match word {
            "/wipe" | "/clear" if arg.is_empty() => Self::Clear,
            "/nick" if !arg.is_empty() => Self::Nick(arg),
            "/color" if !arg.is_empty() => Self::Color(arg),
            _ => Self::Unknown(word),
        };
        Some(command)
    }
}

// =============================================================================
// DISPATCH
// =============================================================================

/// What a dispatched line did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// A chat record was appended; carries the rendered record.
    Appended(String),
    Cleared,
    Renamed(String),
    Recolored(String),
    /// Blank input or an unrecognized command.
    Ignored,
}

/// Apply one submitted line on behalf of `chatter`.
pub fn dispatch(
    log: &MessageLog,
    chatters: &ChatterTable,
    chatter: &Chatter,
    text: &str,
    now: OffsetDateTime,
) -> Dispatched {
    let Some(command) = Command::parse(text) else {
        return Dispatched::Ignored;
    };

    match command {
        Command::Chat(body) => {
            let record = render_record(chatter, body, now);
            log.append(record.clone());
            Dispatched::Appended(record)
        }
        Command::Clear => {
            log.reset();
            info!(key = %chatter.key, "log cleared");
            Dispatched::Cleared
        }
        Command::Nick(value) => {
            let name = escape_html(value);
            chatters.set_name(&chatter.key, name.clone());
            info!(key = %chatter.key, %name, "chatter renamed");
            Dispatched::Renamed(name)
        }
        Command::Color(value) => {
            let color = escape_html(value);
            chatters.set_color(&chatter.key, color.clone());
            info!(key = %chatter.key, %color, "chatter recolored");
            Dispatched::Recolored(color)
        }
        Command::Unknown(word) => {
            tracing::debug!(key = %chatter.key, %word, "ignoring unknown command");
            Dispatched::Ignored
        }
    }
}

/// Cap `raw` to the configured length, resolve the caller's chatter, and
/// dispatch.
pub fn submit(state: &AppState, identity: &str, raw: &str) -> Dispatched {
    let text = truncate_chars(raw, state.config.max_message_len);
    info!(%identity, len = text.len(), "message received");
    let chatter = state.chatters.resolve(identity);
    dispatch(&state.log, &state.chatters, &chatter, text, OffsetDateTime::now_utc())
}

// =============================================================================
// RENDERING
// =============================================================================

/// Render one chat line. `chatter.name` and `chatter.color` are stored
/// escaped; `body` is escaped here.
#[must_use]
pub fn render_record(chatter: &Chatter, body: &str, now: OffsetDateTime) -> String {
    let timestamp = now
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .unwrap_or_else(|_| now.unix_timestamp().to_string());
    format!(
        r#"<p style="color: {};">[{}] {}: {}</p>"#,
        chatter.color,
        timestamp,
        chatter.name,
        escape_html(body)
    )
}

/// Escape the five HTML-significant characters.
#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Cut `raw` to at most `max` characters, on a char boundary.
#[must_use]
pub fn truncate_chars(raw: &str, max: usize) -> &str {
    match raw.char_indices().nth(max) {
        Some((idx, _)) => &raw[..idx],
        None => raw,
    }
}

#[cfg(test)]
#[path = "command_test.rs"]
mod tests;
