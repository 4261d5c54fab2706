mod args;

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing_subscriber::EnvFilter;

use args::{Args, Command, print_usage};
use practice_core::model::{AnswerLetter, Exercise};
use practice_core::unlock::level_label;
use services::{
    AuthoringService, Clock, PracticeLoopService, PracticeSession, SessionAnswerResult,
    SessionPhase, SubjectOverviewService,
};
use storage::repository::Storage;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if matches!(argv.first().map(String::as_str), Some("--help" | "-h")) {
        print_usage();
        return Ok(());
    }

    let parsed = Args::parse(argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    tracing::debug!(api = %parsed.http.base_url, command = ?parsed.command, "starting");

    match &parsed.command {
        Command::Preview { file } => {
            let raw = tokio::fs::read_to_string(file).await?;
            let lines = AuthoringService::preview(&raw, parsed.title.as_deref());
            if lines.is_empty() {
                println!("No hay líneas válidas.");
            }
            for line in lines {
                println!("{line}");
            }
            Ok(())
        }
        Command::Import { file } => {
            let topic_id = parsed.require_topic()?;
            let raw = tokio::fs::read_to_string(file).await?;
            let storage = Storage::http(parsed.http.clone())?;
            let report = AuthoringService::new(Arc::clone(&storage.content))
                .import_text(topic_id, parsed.level, &raw, parsed.title.as_deref())
                .await?;
            println!("Ejercicios creados: {}", report.created);
            if report.rejected > 0 {
                println!("Líneas descartadas: {}", report.rejected);
            }
            Ok(())
        }
        Command::Overview => {
            let subject_id = parsed.require_subject()?;
            let storage = Storage::http(parsed.http.clone())?;
            let overview = SubjectOverviewService::new(Arc::clone(&storage.topics))
                .load(subject_id)
                .await;
            for level in overview.levels() {
                let state = if level.unlocked { "abierto" } else { "bloqueado" };
                println!(
                    "Nivel {} {} ({state}): {}% en {} temas",
                    level.level,
                    level.label,
                    level.progress,
                    level.topics.len()
                );
            }
            let (completed, total) = overview.completion();
            println!("Temas completados: {completed}/{total}");
            Ok(())
        }
        Command::Practice => practice(&parsed).await,
    }
}

async fn practice(parsed: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let topic_id = parsed.require_topic()?;
    let storage = Storage::http(parsed.http.clone())?;

    if let Some(subject_id) = parsed.subject_id {
        let overview = SubjectOverviewService::new(Arc::clone(&storage.topics))
            .load(subject_id)
            .await;
        if let Some(level) = overview.ensure_unlocked(topic_id)? {
            println!("Nivel {level} · {}", level_label(level));
        }
    }

    let svc = PracticeLoopService::from_storage(Clock::default(), &storage);
    let mut session = svc.open(topic_id).await;
    for warning in session.warnings() {
        println!("⚠ {warning}");
    }

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let result = drive(&svc, &mut session, &mut input).await;
    svc.close(&mut session);
    result
}

/// Read answers until the learner quits or the session can't continue.
///
/// A regeneration timer firing while waiting for input refreshes lives and
/// redraws the prompt.
async fn drive<R>(
    svc: &PracticeLoopService,
    session: &mut PracticeSession,
    input: &mut Lines<R>,
) -> Result<(), Box<dyn std::error::Error>>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        svc.poll_regeneration(session).await;
        render_status(session);

        match session.phase() {
            SessionPhase::InProgress => {
                let Some(exercise) = session.current_exercise() else {
                    println!("No hay ejercicios para practicar.");
                    return Ok(());
                };
                render_exercise(exercise);
            }
            SessionPhase::Completed | SessionPhase::OutOfLives => {
                if let Some(message) = session.completion_message() {
                    println!("{message}");
                }
                println!("[r] reiniciar · [q] salir");
            }
            SessionPhase::Loading => {
                println!("No se pudieron cargar los ejercicios.");
                return Ok(());
            }
        }

        let line = tokio::select! {
            line = input.next_line() => line?,
            () = session.regeneration_due() => {
                svc.refresh_lives(session).await;
                continue;
            }
        };
        let Some(line) = line else {
            return Ok(());
        };
        let line = line.trim();
        if line.eq_ignore_ascii_case("q") {
            return Ok(());
        }

        if session.phase().is_terminal() {
            if !line.eq_ignore_ascii_case("r") {
                continue;
            }
            if svc.restart(session).await.is_err() {
                println!("No se puede reiniciar ahora.");
            } else if session.phase().is_terminal() {
                if let Some(feedback) = session.feedback() {
                    println!("{}", feedback.message);
                }
            }
            continue;
        }

        let Some(choice) = AnswerLetter::parse(line).map(AnswerLetter::index) else {
            println!("Responde con A, B, C o D.");
            continue;
        };
        match svc.submit_answer(session, choice).await {
            SessionAnswerResult::Applied {
                feedback: Some(feedback),
                ..
            } => println!("{}", feedback.message),
            SessionAnswerResult::Applied { feedback: None, .. } => {}
            SessionAnswerResult::Ignored(reason) => println!("Respuesta no enviada ({reason:?})."),
        }
    }
}

fn render_status(session: &PracticeSession) {
    let progress = session.progress();
    let hearts: String = progress
        .hearts
        .iter()
        .map(|alive| if *alive { '♥' } else { '♡' })
        .collect();
    println!(
        "{hearts}  {}/{} · precisión {}% · racha {}",
        progress.answered, progress.total, progress.accuracy, progress.streak
    );
}

fn render_exercise(exercise: &Exercise) {
    println!();
    println!("{}", exercise.question());
    for (idx, option) in exercise.options().iter().enumerate() {
        let letter = AnswerLetter::from_index(idx).map_or('?', AnswerLetter::as_char);
        println!("  {letter}) {option}");
    }
}

#[tokio::main]
async fn main() {
    init_logging();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
