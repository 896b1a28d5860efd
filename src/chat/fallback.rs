//! Text shown in place of a reply when a send fails.

use crate::error::ChatError;

pub const GENERIC_APOLOGY: &str = "Sorry, there was a problem connecting to the assistant.";
pub const NETWORK_FAILURE: &str =
    "Network connection error. Please check your internet connection and try again.";
pub const ASSISTANT_UNAVAILABLE: &str =
    "The assistant is currently unavailable. Our team has been notified.";

struct Topic {
    matches: fn(&str) -> bool,
    answer: &'static str,
}

/// Canned answers for common guest questions, checked in order.
const TOPICS: &[Topic] = &[
    Topic {
        matches: |q| q.contains("safe") && (q.contains("room") || q.contains("suite")),
        answer: "Yes, all guest rooms and suites at Fairmont Tazi Palace are equipped with in-room safes for your valuables.",
    },
    Topic {
        matches: |q| q.contains("check in") || q.contains("checkin"),
        answer: "Check-in time begins at 3:00 PM. Early check-in may be available based on room availability.",
    },
    Topic {
        matches: |q| q.contains("check out") || q.contains("checkout"),
        answer: "Check-out time is at 12:00 PM (noon). Late check-out may be available upon request.",
    },
    Topic {
        matches: |q| q.contains("wifi") || q.contains("internet"),
        answer: "Complimentary high-speed WiFi is available throughout the hotel. The network name is 'Fairmont_Guest' and the password is provided during check-in.",
    },
    Topic {
        matches: |q| q.contains("spa") || q.contains("massage"),
        answer: "Our hotel features a luxurious spa with traditional hammam, massage services, and wellness treatments. The spa is open daily from 9:00 AM to 8:00 PM.",
    },
];

/// Answer for a reply that missed its deadline, picked from the guest's own question.
pub fn timeout_fallback(input: &str) -> String {
    let question = input.to_lowercase();
    TOPICS
        .iter()
        .find(|topic| (topic.matches)(&question))
        .map(|topic| topic.answer.to_string())
        .unwrap_or_else(|| {
            format!(
                "I'm sorry, the response is taking longer than expected. You asked about \"{}\". Please try again or contact the front desk for immediate assistance.",
                input
            )
        })
}

/// The single message that replaces the placeholder after a failed send.
pub fn failure_message(error: &ChatError, input: &str) -> String {
    match error {
        ChatError::Timeout(_) => timeout_fallback(input),
        ChatError::Network(_) => NETWORK_FAILURE.to_string(),
        ChatError::Http { status: 502, .. } => ASSISTANT_UNAVAILABLE.to_string(),
        ChatError::Http { status, .. } => format!(
            "Server error ({}). Please try again or contact support.",
            status
        ),
        ChatError::Context { source, .. } => failure_message(source, input),
        _ => GENERIC_APOLOGY.to_string(),
    }
}
