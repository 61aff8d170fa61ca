// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reaction-message builder.
//!
//! Composes the structured prompt sent back to a worker for `ci-failed`,
//! `changes-requested`, and `bugbot-comments`. Every sub-fetch is optional:
//! if anything errors, the plain configured message goes out instead. This
//! path never returns an error.

use ao_adapters::runtime::Runtime;
use ao_adapters::scm::{AutomatedComment, CheckStatus, CiCheck, ReviewComment, Scm};
use ao_core::reaction::ReactionEvent;
use ao_core::session::{PrRef, RuntimeHandle};

/// At most this many failing checks are listed.
const MAX_CHECKS: usize = 4;

/// At most this many unresolved comments are listed.
const MAX_COMMENTS: usize = 3;

/// Individual comments are cut to roughly this many characters.
const COMMENT_TRUNCATE: usize = 160;

/// The final message is cut to roughly this many characters.
const MESSAGE_TRUNCATE: usize = 2_400;

/// Terminal output capture size, and the tail kept from it.
const TAIL_CAPTURE_LINES: u32 = 80;
const TAIL_CHARS: usize = 320;

const TAIL_DIVIDER: &str = "--- recent terminal output ---";

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", cut)
}

fn tail_chars(s: &str, max: usize) -> String {
    let count = s.chars().count();
    if count <= max {
        return s.to_string();
    }
    s.chars().skip(count - max).collect()
}

/// Pure composition over already-fetched context.
pub fn compose_reaction_message(
    event: ReactionEvent,
    configured: &str,
    attempt: u32,
    failing_checks: &[CiCheck],
    comments: &[ReviewComment],
    findings: &[AutomatedComment],
    terminal_tail: Option<&str>,
) -> String {
    let mut out = String::new();

    // One-line summary; the attempt counter keeps successive sends distinct.
    out.push_str(&format!(
        "[{} | fix attempt {}] {}\n",
        event, attempt, configured
    ));

    if !failing_checks.is_empty() {
        out.push_str("\nFailing checks:\n");
        for check in failing_checks.iter().take(MAX_CHECKS) {
            match &check.summary {
                Some(summary) => out.push_str(&format!(
                    "- {}: {}\n",
                    check.name,
                    truncate_chars(summary, COMMENT_TRUNCATE)
                )),
                None => out.push_str(&format!("- {}\n", check.name)),
            }
        }
        if failing_checks.len() > MAX_CHECKS {
            out.push_str(&format!(
                "- ... and {} more\n",
                failing_checks.len() - MAX_CHECKS
            ));
        }
    }

    if !comments.is_empty() {
        out.push_str("\nUnresolved review comments:\n");
        for comment in comments.iter().take(MAX_COMMENTS) {
            let location = comment
                .path
                .as_deref()
                .map(|p| format!(" ({})", p))
                .unwrap_or_default();
            out.push_str(&format!(
                "- {}{}: {}\n",
                comment.author,
                location,
                truncate_chars(&comment.body, COMMENT_TRUNCATE)
            ));
        }
        if comments.len() > MAX_COMMENTS {
            out.push_str(&format!("- ... and {} more\n", comments.len() - MAX_COMMENTS));
        }
    }

    if !findings.is_empty() {
        out.push_str("\nAutomated findings (most severe first):\n");
        for finding in findings.iter().take(MAX_COMMENTS) {
            out.push_str(&format!(
                "- {}: {}\n",
                finding.author,
                truncate_chars(&finding.body, COMMENT_TRUNCATE)
            ));
        }
    }

    out.push_str("\nDo this:\n");
    out.push_str("1. Reproduce each failure locally before changing anything.\n");
    out.push_str("2. Fix the causes above and rerun the affected checks.\n");
    out.push_str("3. Push the fix to your branch and reply to the review comments.\n");

    if let Some(tail) = terminal_tail {
        let tail = tail_chars(tail.trim_end(), TAIL_CHARS);
        if !tail.is_empty() {
            out.push('\n');
            out.push_str(TAIL_DIVIDER);
            out.push('\n');
            out.push_str(&tail);
            out.push('\n');
        }
    }

    truncate_chars(&out, MESSAGE_TRUNCATE)
}

/// Fetch PR context and compose; falls back to the configured message on any
/// fetch error.
pub async fn build_reaction_message(
    scm: &dyn Scm,
    runtime: Option<(&dyn Runtime, &RuntimeHandle)>,
    pr: &PrRef,
    event: ReactionEvent,
    configured: &str,
    attempt: u32,
) -> String {
    let gathered: Result<(Vec<CiCheck>, Vec<ReviewComment>, Vec<AutomatedComment>), _> = async {
        let checks = scm.ci_checks(pr).await?;
        let failing: Vec<CiCheck> = checks
            .into_iter()
            .filter(|c| c.status == CheckStatus::Failing)
            .collect();
        let comments = scm.pending_comments(pr).await?;
        let findings = scm.automated_comments(pr).await?;
        Ok::<_, ao_adapters::scm::ScmError>((failing, comments, findings))
    }
    .await;

    let (failing, comments, findings) = match gathered {
        Ok(parts) => parts,
        Err(e) => {
            tracing::warn!(pr = pr.number, error = %e, "reaction context fetch failed; sending configured message");
            return configured.to_string();
        }
    };

    let tail = match runtime {
        Some((runtime, handle)) => runtime
            .get_output(handle, TAIL_CAPTURE_LINES)
            .await
            .ok()
            .filter(|s| !s.trim().is_empty()),
        None => None,
    };

    compose_reaction_message(
        event,
        configured,
        attempt,
        &failing,
        &comments,
        &findings,
        tail.as_deref(),
    )
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
