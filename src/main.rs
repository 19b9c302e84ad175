use chrono::Utc;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use times_tutor::config::{self, TutorConfig};
use times_tutor::content::strategies::{encouraging_message, hint_for_fact};
use times_tutor::db::{self, DbPool, LogOnError, ProgressSyncQueue};
use times_tutor::domain::{Attempt, Fact, InputMethod, MAX_FACTOR, MIN_FACTOR};
use times_tutor::session::{FocusTables, PracticeSession};
use times_tutor::{paths, profile_scope, profiling, snapshot, srs};
use times_tutor::{MasteryEvent, Progress, Result};

const USAGE: &str = "\
Usage: times-tutor [command]

Commands:
  practice            Answer questions until the session goal is reached (default)
  stats               Show progress and practice statistics
  focus <t> [t ...]   Practise only these tables
  focus off | clear   Turn the focus filter off, or forget the chosen tables
  goal <n>            Set the number of questions per session (3-20)
  export [path]       Write a JSON snapshot of all facts
  import [path]       Replace stored progress with a JSON snapshot
  reset               Forget all fact progress";

fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "times_tutor=info".into()),
    )
    .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
    .init();

  // Initialize profiling (no-op if feature disabled)
  profiling::init();

  let args: Vec<String> = std::env::args().skip(1).collect();
  let code = match run(&args) {
    Ok(()) => 0,
    Err(e) => {
      tracing::error!("{}", e);
      1
    }
  };

  profiling::shutdown();
  std::process::exit(code);
}

fn run(args: &[String]) -> Result<()> {
  let config = config::load_config();
  let pool = db::init_db(&config::database_path(&config))?;

  let progress = {
    let conn = db::try_lock(&pool)?;
    db::prune_attempts(&conn, config.sync.attempt_retention_days, Utc::now())
      .log_warn("Could not prune the attempt log");
    let report = profile_scope!("load_progress", { db::load_progress(&conn, &config.thresholds) })?;
    if !report.skipped.is_empty() {
      tracing::warn!("{} stored facts could not be read and were reset", report.skipped.len());
    }
    report.progress
  };

  let command = args.first().map(String::as_str).unwrap_or("practice");
  let rest = args.get(1..).unwrap_or_default();

  match command {
    "practice" => practice(&config, &pool, progress),
    "stats" => stats(&pool, &progress),
    "focus" => focus(&pool, rest),
    "goal" => goal(&config, &pool, rest),
    "export" => {
      let path = path_arg(rest);
      snapshot::write_file(&path, &progress)?;
      println!("Exported {} facts to {}", progress.facts().len(), path.display());
      Ok(())
    }
    "import" => import(&config, &pool, &path_arg(rest)),
    "reset" => {
      let conn = db::try_lock(&pool)?;
      let removed = db::clear_facts(&conn)?;
      println!("Cleared progress for {} facts", removed);
      Ok(())
    }
    "help" | "-h" | "--help" => {
      println!("{}", USAGE);
      Ok(())
    }
    other => {
      eprintln!("Unknown command '{}'\n\n{}", other, USAGE);
      Ok(())
    }
  }
}

fn path_arg(rest: &[String]) -> PathBuf {
  rest
    .first()
    .map(PathBuf::from)
    .unwrap_or_else(|| PathBuf::from(paths::snapshot_path()))
}

enum Answer {
  Value(u32),
  Quit,
}

/// Read until the learner types something usable. Choices are picked by
/// position (1-based).
fn read_answer(lines: &mut impl Iterator<Item = io::Result<String>>, choices: Option<&[u32]>) -> Result<Answer> {
  loop {
    print!("> ");
    io::stdout().flush()?;

    let Some(line) = lines.next() else {
      return Ok(Answer::Quit);
    };
    let line = line?;
    let input = line.trim();
    if input.eq_ignore_ascii_case("q") {
      return Ok(Answer::Quit);
    }

    let parsed: Option<u32> = input.parse().ok();
    let answer = match (choices, parsed) {
      (Some(choices), Some(n)) if (1..=choices.len()).contains(&(n as usize)) => {
        Some(choices[n as usize - 1])
      }
      (Some(_), _) => None,
      (None, parsed) => parsed,
    };

    match answer {
      Some(value) => return Ok(Answer::Value(value)),
      None => match choices {
        Some(choices) => println!("Pick a number from 1 to {}", choices.len()),
        None => println!("Type the answer as a number"),
      },
    }
  }
}

fn practice(config: &TutorConfig, pool: &DbPool, mut progress: Progress) -> Result<()> {
  let (focus, stored_goal) = {
    let conn = db::try_lock(pool)?;
    (db::get_focus_tables(&conn)?, db::get_session_goal(&conn)?)
  };

  let mut session = PracticeSession::new(&config.session, &config.scheduler);
  if let Some(goal) = stored_goal {
    session.set_goal(goal);
  }
  let mut queue = ProgressSyncQueue::new(config.sync.debounce_ms);
  let mut rng = rand::rng();
  let stdin = io::stdin();
  let mut lines = stdin.lock().lines();

  let active = focus.active();
  if active.is_empty() {
    println!("{} questions. Type q to stop.\n", session.goal());
  } else {
    let tables: Vec<String> = active.iter().map(u8::to_string).collect();
    println!(
      "{} questions from the {} tables. Type q to stop.\n",
      session.goal(),
      tables.join(", ")
    );
  }

  while !session.is_goal_complete() {
    let Some(fact) = session.next_fact(&progress, &focus, &config.scheduler, Utc::now(), &mut rng) else {
      println!("Nothing to practise with the current focus tables.");
      break;
    };

    let state = progress.get(fact);
    let method = srs::preferred_input_method(state, &config.thresholds);
    let preferred = state.preferred_strategy.clone();
    let choices = match method {
      InputMethod::MultipleChoice => Some(srs::generate_choices(fact, config.session.choice_count, &mut rng)),
      InputMethod::NumberPad => None,
    };

    println!("What is {}?", fact);
    if let Some(choices) = &choices {
      let options: Vec<String> = choices
        .iter()
        .enumerate()
        .map(|(i, c)| format!("[{}] {}", i + 1, c))
        .collect();
      println!("  {}", options.join("   "));
    }

    let started = Instant::now();
    let answer = match read_answer(&mut lines, choices.as_deref())? {
      Answer::Value(value) => value,
      Answer::Quit => break,
    };
    let elapsed = u32::try_from(started.elapsed().as_millis()).unwrap_or(u32::MAX);

    let correct = answer == fact.answer();
    let now = Utc::now();
    let outcome = progress.record_attempt_at(&fact.key(), correct, method, elapsed, now)?;
    session.record_answer(correct);

    if correct {
      println!("Yes! {} = {}", fact, fact.answer());
    } else {
      println!("{} {} = {}", encouraging_message(&mut rng), fact, fact.answer());
      if let Some(hint) = hint_for_fact(fact, preferred.as_deref()) {
        println!("  {}: {}", hint.name, hint.description);
        for step in &hint.steps {
          println!("    - {}", step);
        }
      }
    }

    for event in &outcome.events {
      match event {
        MasteryEvent::FactMastered { fact } => println!("  * You mastered {}!", fact),
        MasteryEvent::TableMastered { table } => {
          println!("  *** The {} times table is mastered! ***", table)
        }
      }
    }
    println!();

    log_attempt(pool, fact, Attempt::new(correct, method, elapsed, now), !correct);
    queue
      .queue_after_answer(pool, snapshot::to_persisted(progress.get(fact)), now)
      .log_warn("Progress sync failed");
  }

  queue.flush(pool, Utc::now()).log_warn("Could not save progress");

  println!(
    "Answered {} of {} (streak: {} in a row).",
    session.progress,
    session.goal(),
    session.streak
  );
  if let Ok(conn) = db::try_lock(pool) {
    if let Some(today) = db::get_today_stats(&conn, Utc::now()).log_warn("Could not read today's stats") {
      println!("Today: {} answered, {}% correct", today.attempts, today.accuracy);
    }
  }
  Ok(())
}

fn log_attempt(pool: &DbPool, fact: Fact, attempt: Attempt, hint_shown: bool) {
  if let Some(conn) = db::try_lock(pool).log_warn("Attempt log unavailable") {
    db::insert_attempt(&conn, fact, &attempt, hint_shown).log_warn("Could not log attempt");
  }
}

fn stats(pool: &DbPool, progress: &Progress) -> Result<()> {
  let summary = progress.summary();
  println!(
    "Facts: {} new, {} learning, {} confident, {} mastered (tier {})",
    summary.new, summary.learning, summary.confident, summary.mastered, summary.tier
  );

  println!("\nTables:");
  for table in MIN_FACTOR..=MAX_FACTOR {
    let (mastered, total) = srs::mastery::table_progress(progress.facts(), table);
    let mark = if summary.mastered_tables.contains(&table) { " *" } else { "" };
    println!("  {:>2}: {:>2}/{} mastered{}", table, mastered, total, mark);
  }

  let conn = db::try_lock(pool)?;
  let now = Utc::now();
  let today = db::get_today_stats(&conn, now)?;
  println!(
    "\nToday: {} answered, {} correct ({}%)",
    today.attempts, today.correct, today.accuracy
  );
  println!("Streak: {} days", db::get_streak_days(&conn, now)?);

  let days = db::get_daily_summaries(&conn, 7, now)?;
  if !days.is_empty() {
    println!("\nLast 7 days:");
    for day in days {
      println!(
        "  {}  {:>3} answered  {:>3} correct  {:>3} facts",
        day.date, day.attempt_count, day.correct_count, day.facts_attempted
      );
    }
  }
  Ok(())
}

fn focus(pool: &DbPool, rest: &[String]) -> Result<()> {
  let conn = db::try_lock(pool)?;
  let mut focus: FocusTables = db::get_focus_tables(&conn)?;

  match rest.first().map(String::as_str) {
    None => {}
    Some("off") => focus.set_enabled(false),
    Some("clear") => focus.clear(),
    Some(_) => {
      let tables: Vec<u8> = rest.iter().filter_map(|t| t.parse().ok()).collect();
      focus.set(tables);
      focus.set_enabled(true);
    }
  }
  db::set_focus_tables(&conn, &focus)?;

  let active = focus.active();
  if active.is_empty() {
    println!("Practising all tables");
  } else {
    let tables: Vec<String> = active.iter().map(u8::to_string).collect();
    println!("Practising tables: {}", tables.join(", "));
  }
  Ok(())
}

fn goal(config: &TutorConfig, pool: &DbPool, rest: &[String]) -> Result<()> {
  let Some(requested) = rest.first().and_then(|g| g.parse::<u32>().ok()) else {
    println!("Usage: times-tutor goal <n>");
    return Ok(());
  };

  let mut session = PracticeSession::new(&config.session, &config.scheduler);
  session.set_goal(requested);
  let conn = db::try_lock(pool)?;
  db::set_session_goal(&conn, session.goal())?;
  println!("Session goal set to {}", session.goal());
  Ok(())
}

fn import(config: &TutorConfig, pool: &DbPool, path: &std::path::Path) -> Result<()> {
  let now = Utc::now();
  let backup = PathBuf::from(paths::backup_dir()).join(format!("progress_{}.db", now.format("%Y%m%d_%H%M%S")));
  let conn = db::try_lock(pool)?;
  let summary = db::import_snapshot(&conn, path, &config.thresholds, &backup, now)?;
  println!(
    "Imported {} facts from {} ({} entries skipped). Previous progress saved to {}",
    summary.saved,
    path.display(),
    summary.skipped,
    backup.display()
  );
  Ok(())
}
