use crate::api::{Session, SessionApi};
use crate::chat::{ChatController, ChatTimeline, SendOutcome, TimelineSignal};
use crate::config::ChatConfig;
use crate::error::{ChatError, Result};
use crate::error_ext::ResultExt;
use crate::session::{parse_selection, print_sessions, select_session};
use crate::ui::{flush_stdout, TranscriptPrinter, UI};
use colored::Colorize;
use std::future::Future;
use std::io::{self, BufRead, Write};
use tokio::runtime::Runtime;
use tokio::sync::watch;

/// Interactive front end over a [`ChatController`].
///
/// Runs everything on a current-thread runtime; timers and reveals only make
/// progress while a command is being driven by `block_on`.
pub struct Repl<A: SessionApi> {
    runtime: Runtime,
    controller: ChatController<A>,
    printer: TranscriptPrinter,
}

enum Command {
    Exit,
    History,
    Open(String),
    New,
    Message(String),
}

fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let command = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head.to_lowercase(), rest.trim()),
        None => (line.to_lowercase(), ""),
    };

    Some(match command {
        (head, _) if matches!(head.as_str(), "/exit" | "/quit" | "/q") => Command::Exit,
        (head, _) if head == "/history" => Command::History,
        (head, _) if head == "/new" => Command::New,
        (head, arg) if head == "/open" => Command::Open(arg.to_string()),
        _ => Command::Message(line.to_string()),
    })
}

impl<A: SessionApi> Repl<A> {
    pub fn new(api: A, config: &ChatConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create async runtime")?;

        Ok(Self {
            runtime,
            controller: ChatController::new(api, config),
            printer: TranscriptPrinter::new(),
        })
    }

    pub fn refresh_sessions(&mut self) -> Result<Vec<Session>> {
        self.runtime.block_on(self.controller.refresh_sessions())
    }

    pub fn run(&mut self) -> Result<()> {
        UI::print_welcome(self.controller.current_session().as_ref());

        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();

        loop {
            print!("{} ", "λ>".bright_green().bold());
            io::stdout().flush()?;

            let line = match lines.next() {
                Some(line) => line?,
                None => {
                    println!("\nExiting...");
                    break;
                }
            };

            match parse_command(&line) {
                None => continue,
                Some(Command::Exit) => break,
                Some(Command::History) => {
                    let current = self.controller.current_session();
                    print_sessions(&self.controller.sessions(), current.as_ref());
                }
                Some(Command::Open(arg)) => {
                    if let Err(e) = self.handle_open(&arg) {
                        UI::print_error_with_hint(&e);
                    }
                }
                Some(Command::New) => match self.controller.start_new_session() {
                    Ok(()) => {
                        self.printer.skip_to(0);
                        UI::print_success("Started a new chat. Your next message opens it.");
                    }
                    Err(e) => UI::print_error_with_hint(&e),
                },
                Some(Command::Message(text)) => {
                    self.process_message(&text);
                }
            }
            println!();
        }

        UI::print_goodbye();
        Ok(())
    }

    pub fn process_single_prompt(&mut self, prompt: &str) -> Result<()> {
        UI::print_user_prompt(prompt);
        if !self.process_message(prompt) {
            return Err(ChatError::Validation("message is empty".to_string()));
        }
        Ok(())
    }

    /// Lets the user pick one of the listed sessions and opens it.
    pub fn resume(&mut self) -> Result<()> {
        let sessions = self.controller.sessions();
        if let Some(session) = select_session(&sessions)? {
            self.open(session)?;
        }
        Ok(())
    }

    pub fn open_by_id(&mut self, id: u64) -> Result<()> {
        let session = self
            .controller
            .sessions()
            .into_iter()
            .find(|s| s.valid_id() == Some(id))
            .unwrap_or_else(|| Session::new(id, ""));
        self.open(session)
    }

    fn handle_open(&mut self, arg: &str) -> Result<()> {
        let sessions = self.controller.sessions();
        let index = parse_selection(arg, sessions.len()).ok_or_else(|| {
            ChatError::Validation(format!(
                "'{}' is not a listed chat; use /history to see the numbers",
                arg
            ))
        })?;
        self.open(sessions[index].clone())
    }

    fn open(&mut self, session: Session) -> Result<()> {
        let count = self
            .runtime
            .block_on(self.controller.open_session(session.clone()))
            .with_context(|| format!("Failed to open chat '{}'", session.display_title()))?;

        let entries = self.controller.timeline().snapshot();
        UI::display_history(&session, &entries);
        self.printer.skip_to(entries.len());
        UI::print_info(&format!("Loaded {} messages", count));
        Ok(())
    }

    /// Sends one message and prints the exchange as it unfolds.
    ///
    /// Returns false when the input was blank and nothing was sent.
    fn process_message(&mut self, text: &str) -> bool {
        let timeline = self.controller.timeline().clone();
        let mut signal = timeline.subscribe();
        let controller = &self.controller;
        let printer = &mut self.printer;

        self.runtime.block_on(async {
            let outcome =
                follow_timeline(&timeline, &mut signal, printer, controller.send(text)).await;

            match outcome {
                SendOutcome::Ignored => return false,
                SendOutcome::Busy => UI::print_warning("Still waiting for the previous reply."),
                SendOutcome::Failed(e) => {
                    tracing::debug!(error = %e, state = ?controller.state(), "Send failed");
                }
                SendOutcome::Delivered(handle) => {
                    let entry_id = handle.entry_id();
                    if !handle.is_finished() {
                        follow_timeline(&timeline, &mut signal, printer, handle.finished()).await;
                    }
                    tracing::trace!(entry_id = %entry_id, "Reveal printed");
                }
            }
            true
        })
    }
}

/// Advances `last` to the signal's scroll generation; true when content grew since.
fn content_grew(last: &mut u64, seen: TimelineSignal) -> bool {
    let grew = seen.scroll_generation != *last;
    *last = seen.scroll_generation;
    grew
}

/// Drives `work` to completion, printing timeline changes as they land.
///
/// Output is flushed only when content grew, which keeps the newest text in
/// view; in-place rewrites of the current line ride along with the next flush.
async fn follow_timeline<F: Future>(
    timeline: &ChatTimeline,
    signal: &mut watch::Receiver<TimelineSignal>,
    printer: &mut TranscriptPrinter,
    work: F,
) -> F::Output {
    tokio::pin!(work);
    let mut last_scroll = signal.borrow().scroll_generation;

    let output = loop {
        tokio::select! {
            output = &mut work => break output,
            Ok(()) = signal.changed() => {
                let seen = *signal.borrow_and_update();
                tracing::trace!(revision = seen.revision, "Timeline changed");
                print!("{}", printer.render(&timeline.snapshot()));
                if content_grew(&mut last_scroll, seen) {
                    flush_stdout();
                }
            }
        }
    };

    print!("{}", printer.render(&timeline.snapshot()));
    flush_stdout();
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert!(parse_command("   ").is_none());
        assert!(matches!(parse_command("/exit"), Some(Command::Exit)));
        assert!(matches!(parse_command("/QUIT"), Some(Command::Exit)));
        assert!(matches!(parse_command("/history"), Some(Command::History)));
        assert!(matches!(parse_command("/new"), Some(Command::New)));
        assert!(matches!(parse_command("/open 2"), Some(Command::Open(arg)) if arg == "2"));
        assert!(matches!(
            parse_command("  is the spa open?  "),
            Some(Command::Message(text)) if text == "is the spa open?"
        ));
    }

    #[test]
    fn test_flush_follows_scroll_generation() {
        let mut last = 0;
        let grown = TimelineSignal {
            revision: 1,
            scroll_generation: 1,
        };
        assert!(content_grew(&mut last, grown));
        assert_eq!(last, 1);

        let rewritten = TimelineSignal {
            revision: 2,
            scroll_generation: 1,
        };
        assert!(!content_grew(&mut last, rewritten));
    }

    #[test]
    fn test_unknown_slash_is_a_message() {
        assert!(matches!(
            parse_command("/checkout time"),
            Some(Command::Message(text)) if text == "/checkout time"
        ));
    }
}
