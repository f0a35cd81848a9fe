use std::error::Error;
use std::time::Duration;

use exam_core::model::{ExamConfig, ExamResult, OptionLabel, SubjectProfile};
use services::exam::{SessionEnd, SessionPhase};
use services::{ExamLoopService, ExamRun, ExamServices, SessionError, SessionEvent, SessionView};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Answer(OptionLabel),
    Continue,
    Finish,
    Abandon,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    match trimmed.to_lowercase().as_str() {
        "" => Input::Continue,
        ":fin" | ":terminar" => Input::Finish,
        ":salir" | ":q" => Input::Abandon,
        _ => OptionLabel::new(trimmed)
            .ok()
            .filter(|label| label.as_str().chars().count() == 1)
            .map_or_else(|| Input::Unknown(trimmed.to_string()), Input::Answer),
    }
}

fn events_for(input: Input, view: &SessionView) -> Vec<SessionEvent> {
    match input {
        Input::Answer(label) if view.can_select => vec![SessionEvent::Select(label), SessionEvent::Commit],
        Input::Answer(_) | Input::Continue if view.can_next => vec![SessionEvent::Next],
        Input::Answer(_) | Input::Continue => vec![SessionEvent::Commit],
        Input::Finish => vec![SessionEvent::Finish],
        Input::Abandon => vec![SessionEvent::Abandon],
        Input::Unknown(_) => Vec::new(),
    }
}

/// Apply `events` in order, stopping at the first one the session rejects.
///
/// Returns the messages to show for that rejection.
async fn dispatch(
    exam_loop: &ExamLoopService,
    run: &mut ExamRun,
    events: Vec<SessionEvent>,
) -> Result<Vec<String>, SessionError> {
    for event in events {
        let message = match exam_loop.handle(run, event).await {
            Ok(_) => continue,
            Err(SessionError::NoSelection) => "Elige una opción primero.".to_string(),
            Err(SessionError::UnknownOption(label)) => {
                format!("La opción {label} no existe en esta pregunta.")
            }
            Err(err @ (SessionError::NotAllowed(_) | SessionError::Finished)) => {
                tracing::debug!(error = %err, "ignored input");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };
        return Ok(vec![message]);
    }
    Ok(Vec::new())
}

fn render(view: &SessionView) {
    let progress = &view.progress;
    match &view.phase {
        SessionPhase::Presenting => {
            let Some(question) = &view.question else {
                return;
            };
            println!();
            print!("Pregunta {}/{}", progress.position, progress.target);
            if progress.loading {
                print!(" (cargadas {})", progress.available);
            }
            if let Some(secs) = view.remaining_secs {
                print!("  ⏱ {}:{:02}", secs / 60, secs % 60);
            }
            println!("  [{}]", question.competency());
            if let Some(context) = question.context() {
                println!("{context}");
            }
            println!("{}", question.prompt());
            for option in question.options() {
                println!("  {}) {}", option.label, option.text);
            }
            println!("Responde con la letra (:fin para terminar, :salir para abandonar)");
        }
        SessionPhase::Feedback => {
            if let Some(feedback) = &view.feedback {
                if feedback.is_correct {
                    println!("✔ Correcto");
                } else {
                    println!("✘ Incorrecto. La respuesta es {}", feedback.correct);
                }
                let reference = &feedback.reference;
                if !reference.source.is_empty() {
                    match &reference.article {
                        Some(article) => println!("  {} (art. {article})", reference.source),
                        None => println!("  {}", reference.source),
                    }
                }
                if !reference.explanation.is_empty() {
                    println!("  {}", reference.explanation);
                }
            }
            println!("Enter para continuar");
        }
        SessionPhase::AwaitingMore => {
            println!(
                "Cargando más preguntas ({}/{})... presiona Enter para continuar",
                progress.available, progress.target
            );
        }
        SessionPhase::Finished(end) => match end {
            SessionEnd::TimedOut { .. } => println!("Tiempo agotado."),
            SessionEnd::Abandoned => println!("Examen abandonado; no se guardó el resultado."),
            SessionEnd::Completed | SessionEnd::EndedByUser => println!("Examen terminado."),
        },
    }
}

fn print_result(id: i64, result: &ExamResult) {
    println!();
    println!(
        "Resultado #{id}: {}/{} correctas ({:.0}%), {} sin responder",
        result.correct(),
        result.total(),
        result.score_percent(),
        result.unanswered()
    );
    for score in result.competency_breakdown() {
        println!(
            "  {:<28} {}/{} ({:.0}%)",
            score.competency,
            score.correct,
            score.total,
            score.percent()
        );
    }
}

/// Run one interactive exam on stdin/stdout with a one-second countdown ticker.
///
/// # Errors
///
/// Returns an error if the exam cannot start, stdin fails, or the result cannot be stored.
pub async fn run_exam(
    services: &ExamServices,
    config: ExamConfig,
    profile: SubjectProfile,
) -> Result<(), Box<dyn Error>> {
    let exam_loop = services.exam_loop();
    let mut run = exam_loop.start_exam(config, profile).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.tick().await;

    render(&run.view());
    while !run.session().is_finished() {
        tokio::select! {
            _ = ticker.tick() => {
                let step = exam_loop.handle(&mut run, SessionEvent::Tick).await?;
                if step.state.is_finished() {
                    render(&run.view());
                } else if let Some(secs @ (60 | 30 | 10)) = run.session().remaining_secs() {
                    println!("Quedan {secs} s");
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    exam_loop.abandon(&mut run)?;
                    break;
                };
                let input = parse_input(&line);
                if let Input::Unknown(raw) = &input {
                    println!("Entrada no reconocida: {raw}");
                    continue;
                }
                let events = events_for(input, &run.view());
                for message in dispatch(&exam_loop, &mut run, events).await? {
                    println!("{message}");
                }
                render(&run.view());
            }
        }
    }

    if let Some(id) = exam_loop.finalize_result(&mut run).await? {
        let result = services.history().get_result(id).await?;
        print_result(id, &result);
    }
    Ok(())
}

/// Print recent results and per-competency totals for a profile.
///
/// # Errors
///
/// Returns an error if results cannot be loaded.
pub async fn print_history(
    services: &ExamServices,
    profile: &SubjectProfile,
    days: u32,
    limit: u32,
) -> Result<(), Box<dyn Error>> {
    let history = services.history();
    let items = history.list_recent(profile, days, limit).await?;
    if items.is_empty() {
        println!(
            "Sin resultados en los últimos {days} días para {} / {}.",
            profile.role(),
            profile.area()
        );
        return Ok(());
    }

    for item in &items {
        println!(
            "#{:<4} {}  {:<10} {:<12} {}/{} ({:.0}%)",
            item.id,
            item.completed_at.format("%Y-%m-%d %H:%M"),
            item.mode,
            item.reason.as_str(),
            item.correct,
            item.total,
            item.score_percent
        );
    }

    println!();
    println!("Por competencia:");
    for score in history.competency_trends(profile, days, limit).await? {
        println!(
            "  {:<28} {}/{} ({:.0}%)",
            score.competency,
            score.correct,
            score.total,
            score.percent()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use services::SessionState;

    #[tokio::test]
    async fn unknown_letter_is_reported_once_and_nothing_is_committed() {
        let services = ExamServices::in_memory(exam_core::time::fixed_clock());
        let profile = SubjectProfile::new("Docente de aula", "Primaria").unwrap();
        services
            .bank()
            .upsert_questions(&profile, &crate::seed::sample_questions().unwrap())
            .await
            .unwrap();
        let exam_loop = services.exam_loop();
        let config = ExamConfig::for_mode(exam_core::model::ExamMode::Practice)
            .with_target_count(3)
            .unwrap();
        let mut run = exam_loop.start_exam(config, profile).await.unwrap();

        let input = parse_input("e");
        let events = events_for(input, &run.view());
        assert_eq!(events.len(), 2);
        let messages = dispatch(&exam_loop, &mut run, events).await.unwrap();

        assert_eq!(messages, vec!["La opción E no existe en esta pregunta.".to_string()]);
        assert_eq!(run.session().state(), &SessionState::Presenting { index: 0 });
        assert!(run.session().records().is_empty());

        let events = events_for(parse_input("a"), &run.view());
        assert!(dispatch(&exam_loop, &mut run, events).await.unwrap().is_empty());
        assert_eq!(run.session().records().len(), 1);
    }

    #[test]
    fn parses_answers_and_commands() {
        assert_eq!(
            parse_input(" b \n"),
            Input::Answer(OptionLabel::new("B").unwrap())
        );
        assert_eq!(parse_input(""), Input::Continue);
        assert_eq!(parse_input(":FIN"), Input::Finish);
        assert_eq!(parse_input(":salir"), Input::Abandon);
        assert_eq!(parse_input("hola"), Input::Unknown("hola".into()));
    }
}
