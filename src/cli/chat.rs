//! Console front-end: one-shot questions and an interactive loop.

use anyhow::Result;
use std::fmt::Write as _;
use std::future::Future;
use std::io::Write as _;
use tokio::io::{AsyncBufReadExt, BufReader};

use studymate::{StructuredResponse, StudyAssistant};

/// Ask a single question and print the answer.
pub async fn ask_once(
    assistant: &StudyAssistant,
    question: &str,
    session_id: &str,
    style: &str,
) -> Result<()> {
    let response = assistant.ask(question, session_id, style).await?;
    print!("{}", render_response(&response));
    Ok(())
}

/// Read questions from stdin until `exit`, EOF, or ctrl-c.
///
/// Errors from a single question are printed and the loop continues.
pub async fn interactive(assistant: &StudyAssistant, session_id: &str, style: &str) -> Result<()> {
    println!("Study Assistant (session: {session_id}, style: {style}). Type 'exit' to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nYou: ");
        std::io::stdout().flush()?;

        let line = match until_interrupted(lines.next_line(), ctrl_c()).await {
            Some(line) => line?,
            None => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }

        match until_interrupted(assistant.ask(question, session_id, style), ctrl_c()).await {
            Some(Ok(response)) => print!("\n{}", render_response(&response)),
            Some(Err(e)) => eprintln!("\nError ({}): {e}", e.kind()),
            None => {
                println!();
                break;
            }
        }
    }

    println!("Goodbye.");
    Ok(())
}

/// Resolves on ctrl-c. Never resolves if the signal handler can't be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

/// Run `work` unless `interrupt` resolves first. `None` means interrupted.
async fn until_interrupted<T>(
    work: impl Future<Output = T>,
    interrupt: impl Future<Output = ()>,
) -> Option<T> {
    tokio::select! {
        out = work => Some(out),
        () = interrupt => None,
    }
}

/// Answer first, then the non-empty list sections.
pub fn render_response(response: &StructuredResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Answer:\n{}", response.answer);

    let sections = [
        ("Key Points", &response.key_points),
        ("Suggested Questions", &response.suggested_questions),
        ("References", &response.references),
    ];
    for (title, items) in sections {
        if items.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{title}:");
        for item in items {
            let _ = writeln!(out, "- {item}");
        }
    }
    out
}
