use crate::api::Session;
use crate::error::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use std::io::{self, Write};

pub fn print_sessions(sessions: &[Session], current: Option<&Session>) {
    if sessions.is_empty() {
        println!("{}", "No previous chats.".yellow());
        return;
    }

    println!("\n{}", "Chat History".bright_cyan().bold());
    println!();

    let now = Utc::now();
    for (i, session) in sessions.iter().enumerate() {
        let date = session
            .created_at
            .map(|created| format_timestamp(created, now))
            .unwrap_or_default();
        let marker = if current.is_some_and(|c| c.id == session.id) {
            "*".bright_green().bold()
        } else {
            " ".normal()
        };

        println!(
            " {}{} {} {}",
            marker,
            format!("[{}]", i + 1).bright_green().bold(),
            session.display_title().bright_white(),
            format!("({})", date).dimmed()
        );
    }
    println!();
}

pub fn select_session(sessions: &[Session]) -> Result<Option<Session>> {
    if sessions.is_empty() {
        println!("{}", "No previous chats.".yellow());
        return Ok(None);
    }

    print_sessions(sessions, None);
    print!("{} ", "Enter number (or 'q' to cancel):".dimmed());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    match parse_selection(&input, sessions.len()) {
        Some(index) => Ok(Some(sessions[index].clone())),
        None => {
            if !matches!(input.trim(), "" | "q" | "quit") {
                println!("{}", "Invalid selection".red());
            }
            Ok(None)
        }
    }
}

/// One-based selection to a list index.
pub(crate) fn parse_selection(input: &str, len: usize) -> Option<usize> {
    match input.trim().parse::<usize>() {
        Ok(num) if num > 0 && num <= len => Some(num - 1),
        _ => None,
    }
}

fn format_timestamp(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = (now - created).num_seconds().max(0);

    if diff < 60 {
        "just now".to_string()
    } else if diff < 3600 {
        let mins = diff / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if diff < 86400 {
        let hours = diff / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if diff < 604800 {
        let days = diff / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        created.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("1\n", 3), Some(0));
        assert_eq!(parse_selection(" 3 ", 3), Some(2));
        assert_eq!(parse_selection("0", 3), None);
        assert_eq!(parse_selection("4", 3), None);
        assert_eq!(parse_selection("q", 3), None);
    }

    #[test]
    fn test_format_timestamp() {
        let now = Utc.with_ymd_and_hms(2025, 8, 26, 12, 0, 0).unwrap();
        assert_eq!(format_timestamp(now - Duration::seconds(10), now), "just now");
        assert_eq!(format_timestamp(now - Duration::minutes(1), now), "1 min ago");
        assert_eq!(format_timestamp(now - Duration::hours(5), now), "5 hours ago");
        assert_eq!(format_timestamp(now - Duration::days(2), now), "2 days ago");
        assert_eq!(format_timestamp(now - Duration::days(30), now), "2025-07-27");
    }
}
