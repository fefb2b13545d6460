//! Interactive attempt on stdin/stdout.

use std::io::Write as _;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use quiz_core::Countdown;
use quiz_core::model::Position;
use services::{AppServices, QuizSession, SessionError};

use crate::report::{self, Reveal};

/// One line typed at the question prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    /// 1-based option number.
    Choose(usize),
    Next,
    Back,
    Submit,
    Quit,
    Help,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    match line.to_ascii_lowercase().as_str() {
        "n" | "next" => Input::Next,
        "b" | "back" => Input::Back,
        "s" | "submit" => Input::Submit,
        "q" | "quit" => Input::Quit,
        "?" | "h" | "help" => Input::Help,
        other => match other.parse::<usize>() {
            Ok(n) if n > 0 => Input::Choose(n),
            _ => Input::Unknown(line.to_owned()),
        },
    }
}

enum Ending {
    Submitted,
    Expired,
    Quit,
}

const HELP: &str = "Type an option number to answer, `n` next, `b` back, `s` submit, `q` quit.";

/// Run the attempt until it is submitted, expires or the participant quits.
pub async fn take(
    services: &AppServices,
    session: Arc<QuizSession>,
    reveal: Reveal,
) -> anyhow::Result<()> {
    if session.is_finalized() {
        println!("This attempt is already finished. Run `retake` to start a new one.");
        return report::print_attempt(services, &session, reveal).await;
    }

    let timer = session.spawn_timer();
    let mut remaining = timer.remaining();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut position = session.resume_position().await;
    println!("{HELP}");

    let ending = loop {
        let left = *remaining.borrow();
        render(&session, position, left).await?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            // Also resolves if the timer task is gone, which only happens
            // once the attempt is finalized.
            _ = remaining.wait_for(Countdown::is_expired) => {
                println!();
                println!("Time is up.");
                break Ending::Expired;
            }
        };
        let Some(line) = line else {
            break Ending::Quit;
        };

        match parse_input(&line) {
            Input::Choose(n) => {
                let question = session.question(position)?;
                let Some(option) = question.options().get(n - 1) else {
                    println!("Pick 1-{}.", question.options().len());
                    continue;
                };
                match session.answer(position, option).await {
                    Ok(()) => {}
                    Err(SessionError::Finalized) => break Ending::Expired,
                    Err(e) => println!("{e}"),
                }
            }
            Input::Next => {
                if !session.can_advance(position).await {
                    println!("Answer this question first.");
                    continue;
                }
                match position.next().and_then(|p| p.within(session.total()).ok()) {
                    Some(next) => position = session.enter(next).await,
                    None => println!("This is the last question. Type `s` to submit."),
                }
            }
            Input::Back => {
                if let Some(previous) = position.previous() {
                    position = session.enter(previous).await;
                }
            }
            Input::Submit => {
                if !session.can_advance(position).await {
                    println!("Answer this question first.");
                    continue;
                }
                let outcome = session.submit().await;
                debug!(?outcome, "submit");
                break Ending::Submitted;
            }
            Input::Quit => break Ending::Quit,
            Input::Help => println!("{HELP}"),
            Input::Unknown(other) => println!("Unknown input {other:?}. {HELP}"),
        }
    };

    if let Ending::Quit = ending {
        timer.stop();
        println!("Progress saved. Run `take` again to continue; the clock keeps running.");
        return Ok(());
    }
    if let Ending::Submitted = ending {
        println!("Submitted.");
    }
    // The timer notices finalization on its next tick, or is finishing it.
    timer.finished().await;
    report::print_attempt(services, &session, reveal).await
}

async fn render(session: &QuizSession, position: Position, left: Countdown) -> anyhow::Result<()> {
    let question = session.question(position)?;
    let chosen = session.answer_at(position).await;

    println!();
    println!("Question {position} / {}    {left} left", session.total());
    println!("{}", question.prompt());
    if let Some(image) = question.image() {
        println!("[image: {image}]");
    }
    for (i, option) in question.options().iter().enumerate() {
        let mark = if !chosen.is_empty() && option.trim() == chosen.trim() {
            '*'
        } else {
            ' '
        };
        println!(" {mark} {}. {option}", i + 1);
    }
    print!("> ");
    std::io::stdout().flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_and_option_numbers_parse() {
        assert_eq!(parse_input(" 2 "), Input::Choose(2));
        assert_eq!(parse_input("N"), Input::Next);
        assert_eq!(parse_input("back"), Input::Back);
        assert_eq!(parse_input("s"), Input::Submit);
        assert_eq!(parse_input("q"), Input::Quit);
        assert_eq!(parse_input("?"), Input::Help);
    }

    #[test]
    fn zero_and_garbage_are_unknown() {
        assert_eq!(parse_input("0"), Input::Unknown("0".into()));
        assert_eq!(parse_input("maybe"), Input::Unknown("maybe".into()));
    }
}
