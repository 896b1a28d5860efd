use crate::api::Session;
use crate::chat::{EntryId, EntryStatus, MessageEntry, Sender};
use crate::error::ChatError;
use colored::Colorize;
use crossterm::terminal::{Clear, ClearType};
use crossterm::Command;
use std::io::{self, Write};

/// Message severity levels for consistent UI feedback
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MessageSeverity {
    /// Recoverable issues, non-critical problems
    Warning,
    /// Actual failures (network, IO, config)
    Error,
    Info,
    Success,
}

impl MessageSeverity {
    pub fn prefix(&self) -> colored::ColoredString {
        match self {
            Self::Warning => "Warning:".bright_yellow().bold(),
            Self::Error => "Error:".bright_red().bold(),
            Self::Info => "Info:".bright_cyan().bold(),
            Self::Success => "Success:".bright_green().bold(),
        }
    }
}

fn user_header() -> colored::ColoredString {
    "λ>".bright_green().bold()
}

fn bot_header() -> colored::ColoredString {
    "Concierge:".bright_blue().bold()
}

/// UI utilities for displaying messages and formatting
pub struct UI;

impl UI {
    pub fn print_message(severity: MessageSeverity, message: &str) {
        eprintln!("{} {}", severity.prefix(), message);
    }

    pub fn print_warning(message: &str) {
        Self::print_message(MessageSeverity::Warning, message);
    }

    pub fn print_error(message: &str) {
        Self::print_message(MessageSeverity::Error, message);
    }

    pub fn print_info(message: &str) {
        Self::print_message(MessageSeverity::Info, message);
    }

    pub fn print_success(message: &str) {
        Self::print_message(MessageSeverity::Success, message);
    }

    pub fn print_error_with_hint(error: &ChatError) {
        eprintln!("{} {}", MessageSeverity::Error.prefix(), error);
        if let Some(hint) = error.hint() {
            eprintln!("  {} {}", "Hint:".bright_cyan(), hint);
        }
    }

    pub fn print_welcome(session: Option<&Session>) {
        println!("{}", "Concierge - Hotel Assistant".bright_cyan().bold());
        if let Some(session) = session {
            println!(
                "{} {}",
                "Session:".bright_green(),
                session.display_title().dimmed()
            );
        }
        println!("{}", "Type your message or '/exit' to quit.".dimmed());
        println!("{}", "Type '/history' to list your chats.".dimmed());
        println!("{}", "Type '/open <n>' to switch to a listed chat.".dimmed());
        println!("{}", "Type '/new' to start a new chat.".dimmed());
        println!();
    }

    pub fn print_goodbye() {
        println!("{}", "Goodbye!".bright_cyan());
    }

    pub fn print_user_prompt(text: &str) {
        println!("{} {}", user_header(), text);
        println!();
    }

    pub fn display_history(session: &Session, entries: &[MessageEntry]) {
        if entries.is_empty() {
            println!("{}", "Note: No messages in this chat yet.".dimmed());
            println!();
            return;
        }

        println!("{}", "═".repeat(80).bright_cyan());
        println!(
            "{} {}",
            "Previous Conversation:".bright_cyan().bold(),
            session.display_title()
        );
        println!("{}", "═".repeat(80).bright_cyan());
        println!();

        for entry in entries {
            print!("{}", render_complete(entry));
        }

        println!("{}", "═".repeat(80).bright_cyan());
        println!();
    }
}

fn render_complete(entry: &MessageEntry) -> String {
    match (entry.sender, entry.status) {
        (Sender::User, _) => format!("{} {}\n\n", user_header(), entry.text),
        (Sender::Bot, EntryStatus::Error) => {
            format!("{}\n{}\n\n", bot_header(), entry.text.bright_red())
        }
        (Sender::Bot, _) => format!("{}\n{}\n\n", bot_header(), entry.text),
    }
}

fn clear_line(out: &mut String) {
    out.push('\r');
    let _ = Clear(ClearType::CurrentLine).write_ansi(out);
}

#[derive(Debug)]
enum OpenEntry {
    Placeholder { id: EntryId, text: String },
    Streaming { id: EntryId, printed: usize },
}

/// Turns successive timeline snapshots into terminal output.
///
/// Each call to [`render`](Self::render) returns only what changed since the
/// previous call. User entries are never echoed; the prompt already shows them.
#[derive(Debug, Default)]
pub struct TranscriptPrinter {
    done: usize,
    open: Option<OpenEntry>,
}

impl TranscriptPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treats the first `len` entries as already on screen.
    pub fn skip_to(&mut self, len: usize) {
        self.done = len;
        self.open = None;
    }

    pub fn render(&mut self, entries: &[MessageEntry]) -> String {
        let mut out = String::new();

        if entries.len() < self.done {
            self.skip_to(entries.len());
        }

        if let Some(OpenEntry::Placeholder { id, .. }) = &self.open {
            let still_pending = entries[self.done..]
                .iter()
                .any(|e| e.id == *id && e.status == EntryStatus::Pending);
            if !still_pending {
                clear_line(&mut out);
                self.open = None;
            }
        }

        for entry in &entries[self.done..] {
            match (entry.sender, entry.status) {
                (Sender::User, _) => {
                    self.done += 1;
                }
                (Sender::Bot, EntryStatus::Pending) => {
                    let unchanged = matches!(
                        &self.open,
                        Some(OpenEntry::Placeholder { id, text }) if *id == entry.id && *text == entry.text
                    );
                    if !unchanged {
                        clear_line(&mut out);
                        out.push_str(&entry.text.dimmed().to_string());
                        self.open = Some(OpenEntry::Placeholder {
                            id: entry.id,
                            text: entry.text.clone(),
                        });
                    }
                    break;
                }
                (Sender::Bot, EntryStatus::Streaming) => {
                    let printed = self.begin_reply(entry.id, &mut out);
                    let delta: String = entry.text.chars().skip(printed).collect();
                    out.push_str(&delta);
                    self.open = Some(OpenEntry::Streaming {
                        id: entry.id,
                        printed: printed + delta.chars().count(),
                    });
                    break;
                }
                (Sender::Bot, EntryStatus::Error) => {
                    if self.streaming_id() == Some(entry.id) {
                        out.push('\n');
                    }
                    self.begin_reply(entry.id, &mut out);
                    out.push_str(&entry.text.bright_red().to_string());
                    out.push_str("\n\n");
                    self.open = None;
                    self.done += 1;
                }
                (Sender::Bot, EntryStatus::Final) => {
                    let printed = self.begin_reply(entry.id, &mut out);
                    out.extend(entry.text.chars().skip(printed));
                    out.push_str("\n\n");
                    self.open = None;
                    self.done += 1;
                }
            }
        }

        out
    }

    fn streaming_id(&self) -> Option<EntryId> {
        match self.open {
            Some(OpenEntry::Streaming { id, .. }) => Some(id),
            _ => None,
        }
    }

    /// Writes the reply header unless `id` is already open; returns chars already shown.
    fn begin_reply(&mut self, id: EntryId, out: &mut String) -> usize {
        match self.open.take() {
            Some(OpenEntry::Streaming { id: open_id, printed }) if open_id == id => printed,
            open => {
                if matches!(open, Some(OpenEntry::Placeholder { .. })) {
                    clear_line(out);
                }
                out.push_str(&format!("{}\n", bot_header()));
                0
            }
        }
    }
}

pub fn flush_stdout() {
    let _ = io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bot(text: &str, status: EntryStatus) -> MessageEntry {
        MessageEntry::new(Sender::Bot, text, status)
    }

    fn with_status(entry: &MessageEntry, text: &str, status: EntryStatus) -> MessageEntry {
        let mut next = entry.clone();
        next.text = text.to_string();
        next.status = status;
        next
    }

    #[test]
    fn test_reveal_prints_only_deltas() {
        let mut printer = TranscriptPrinter::new();
        let user = MessageEntry::user("hey");
        let pending = bot("Thinking...", EntryStatus::Pending);

        let out = printer.render(&[user.clone(), pending.clone()]);
        assert!(out.contains("Thinking..."));
        assert!(!out.contains("hey"));

        let streaming = with_status(&pending, "Hel", EntryStatus::Streaming);
        let out = printer.render(&[user.clone(), streaming.clone()]);
        assert!(out.contains("Concierge:"));
        assert!(out.ends_with("Hel"));

        let streaming = with_status(&pending, "Hello th", EntryStatus::Streaming);
        let out = printer.render(&[user.clone(), streaming]);
        assert_eq!(out, "lo th");

        let done = with_status(&pending, "Hello there", EntryStatus::Final);
        let out = printer.render(&[user.clone(), done.clone()]);
        assert_eq!(out, "ere\n\n");

        assert_eq!(printer.render(&[user, done]), "");
    }

    #[test]
    fn test_placeholder_redrawn_only_on_change() {
        let mut printer = TranscriptPrinter::new();
        let pending = bot("Thinking", EntryStatus::Pending);

        assert!(!printer.render(&[pending.clone()]).is_empty());
        assert!(printer.render(&[pending.clone()]).is_empty());

        let dotted = with_status(&pending, "Thinking.", EntryStatus::Pending);
        assert!(printer.render(&[dotted]).contains("Thinking."));
    }

    #[test]
    fn test_error_replaces_placeholder() {
        let mut printer = TranscriptPrinter::new();
        let user = MessageEntry::user("hi");
        printer.render(&[user.clone(), bot("Thinking...", EntryStatus::Pending)]);

        let error = bot("Network error. Please check your connection.", EntryStatus::Error);
        let out = printer.render(&[user, error]);
        assert!(out.starts_with('\r'));
        assert!(out.contains("Network error"));
        assert!(!out.contains("Thinking"));
    }

    #[test]
    fn test_removed_placeholder_is_cleared() {
        let mut printer = TranscriptPrinter::new();
        let user = MessageEntry::user("hi");
        printer.render(&[user.clone(), bot("Thinking...", EntryStatus::Pending)]);

        let out = printer.render(&[user]);
        assert!(out.starts_with('\r'));
        assert_eq!(printer.render(&[]), "");
    }

    #[test]
    fn test_skip_to_ignores_history() {
        let mut printer = TranscriptPrinter::new();
        let history = vec![MessageEntry::user("old"), bot("old reply", EntryStatus::Final)];
        printer.skip_to(history.len());
        assert_eq!(printer.render(&history), "");

        let mut next = history.clone();
        next.push(bot("fresh", EntryStatus::Final));
        assert!(printer.render(&next).contains("fresh"));
    }
}
