//! Result and shared-review printing.

use std::fmt::Write as _;
use std::time::Duration;
use tracing::warn;

use quiz_core::{ReviewLink, ScoreReport};
use services::{
    AppServices, DeliveryStatus, Identity, QuizSession, ResultsAccess, ReviewState, resolve_access,
};

/// How long the result view waits for background save and notification.
const DELIVERY_WAIT: Duration = Duration::from_secs(15);

/// What the per-item breakdown shows for a wrong answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reveal {
    /// Only the participant's own answer.
    #[default]
    Hidden,
    /// The participant's answer and the correct one.
    CorrectAnswers,
}

fn format_report(title: &str, report: &ScoreReport, threshold: u8, reveal: Reveal) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(
        out,
        "{title}: {} / {} ({}%) {}",
        report.correct,
        report.total,
        report.percentage,
        report.verdict(threshold)
    );
    for item in &report.items {
        let mark = if item.is_correct { '+' } else { '-' };
        let prompt = item
            .prompt
            .as_deref()
            .unwrap_or("(question no longer available)");
        let _ = writeln!(out, "{:>3}. [{mark}] {prompt}", item.position);
        if item.is_correct {
            continue;
        }
        let chosen = if item.chosen.is_empty() {
            "(no answer)"
        } else {
            item.chosen.as_str()
        };
        let _ = match reveal {
            Reveal::Hidden => writeln!(out, "       your answer: {chosen}"),
            Reveal::CorrectAnswers => writeln!(
                out,
                "       your answer: {chosen}   correct: {}",
                item.correct_answer.as_deref().unwrap_or("?")
            ),
        };
    }
    out
}

fn print_report(title: &str, report: &ScoreReport, threshold: u8, reveal: Reveal) {
    println!();
    print!("{}", format_report(title, report, threshold, reveal));
}

/// Print the finalized attempt of `session` with its delivery status.
pub async fn print_attempt(
    services: &AppServices,
    session: &QuizSession,
    reveal: Reveal,
) -> anyhow::Result<()> {
    let Some((result, report)) = session.result() else {
        anyhow::bail!("the attempt has no result yet");
    };
    print_report(
        session.config().quiz_name(),
        &report,
        session.config().pass_threshold(),
        reveal,
    );
    println!("Finished ({}) at {}", result.reason(), result.finalized_at().to_rfc3339());

    let mut deliveries = session.deliveries();
    let settled = tokio::time::timeout(DELIVERY_WAIT, deliveries.settled()).await;
    let (save, notify) = match settled {
        Ok(settled) => settled,
        Err(_) => {
            warn!("delivery still running at exit; abandoning it");
            (
                deliveries.save.borrow().clone(),
                deliveries.notify.borrow().clone(),
            )
        }
    };
    println!("Saved: {save}");
    println!("E-mail: {notify}");
    if !save.is_settled() || matches!(save, DeliveryStatus::Failed(_)) {
        println!("The result was not saved; it is sent again the next time you run `take`.");
    }

    if save == DeliveryStatus::Succeeded {
        let result_id = *deliveries.result_id.borrow();
        if let Some(result_id) = result_id {
            match ReviewLink::shared(result_id).to_url(services.notifier().app_base_url()) {
                Ok(url) => println!("Review link: {url}"),
                Err(e) => warn!(error = %e, "could not build review link"),
            }
        }
    }
    Ok(())
}

/// Show results the way the results page would: a review link wins and is
/// always read-only, otherwise this device's attempt for a signed-in
/// participant.
pub async fn review(
    services: &AppServices,
    reference: Option<&str>,
    identity: Option<Identity>,
    reveal: Reveal,
) -> anyhow::Result<()> {
    let quiz = services.quiz();
    let threshold = quiz.config().pass_threshold();

    if let Some(reference) = reference {
        match services.review().open_link(reference).await {
            ReviewState::Ready(review) => {
                let title = format!("{} (shared, read-only)", review.quiz_name);
                print_report(&title, &review.report, threshold, reveal);
                println!("Taken at {}", review.created_at.to_rfc3339());
            }
            ReviewState::Unavailable => println!("This result is unavailable."),
        }
        return Ok(());
    }

    match resolve_access(None, identity.as_ref()) {
        ResultsAccess::Local => {
            let state = quiz.local_state();
            let finalized = match state.load_run().await? {
                Some(run) => state.load_finalized(run.id()).await?,
                None => None,
            };
            match finalized {
                Some(result) => {
                    let report = result.report(&services.catalog());
                    print_report(quiz.config().quiz_name(), &report, threshold, reveal);
                }
                None => println!("No finished attempt on this device yet."),
            }
        }
        ResultsAccess::SignInRequired | ResultsAccess::Remote { .. } => {
            println!("Sign in with --user-id or pass a review link to see results.");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AnswersByPosition, Catalog, Position, QuestionDraft, QuestionId};
    use quiz_core::score;

    fn report() -> ScoreReport {
        let draft = |id: &str| QuestionDraft {
            id: id.into(),
            prompt: format!("Prompt {id}"),
            options: vec!["Paris".into(), "Rome".into()],
            answer: "Paris".into(),
            image: None,
        };
        let catalog = Catalog::from_drafts(vec![draft("Q1"), draft("Q2")]).unwrap();
        let ids = vec![QuestionId::new("Q1").unwrap(), QuestionId::new("Q2").unwrap()];
        let mut answers = AnswersByPosition::new();
        answers.set(Position::FIRST, "Paris");
        answers.set(Position::new(2).unwrap(), "Rome");
        score(&catalog, &ids, &answers)
    }

    #[test]
    fn wrong_items_hide_the_correct_answer_by_default() {
        let text = format_report("Quiz", &report(), 70, Reveal::default());
        assert!(text.starts_with("Quiz: 1 / 2 (50%) Review recommended"));
        assert!(text.contains("your answer: Rome"));
        assert!(!text.contains("correct:"));
    }

    #[test]
    fn correct_answers_are_shown_when_revealed() {
        let text = format_report("Quiz", &report(), 50, Reveal::CorrectAnswers);
        assert!(text.contains("Passed"));
        assert!(text.contains("your answer: Rome   correct: Paris"));
    }
}
