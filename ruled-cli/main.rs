use std::{
  fs,
  time::Instant,
};

use anyhow::{
  Context,
  Result,
};
use clap::Parser;
use log::LevelFilter;
use ruled_core::geometry::Point;
use ruled_lib::{
  animation::FixedStepClock,
  buffer::StyledText,
  config::EditorConfig,
  editor::{
    Collaborators,
    EditorSession,
  },
  persistence::FileStore,
  style::Detent,
};

use crate::cli::{
  Cli,
  Command,
};

mod cli;

fn main() -> Result<()> {
  let cli = Cli::parse();
  setup_logging(cli.verbosity);

  let config = match &cli.config_file {
    Some(path) => {
      EditorConfig::load(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?
    },
    None => EditorConfig::default(),
  };

  let mut store = FileStore::new(&cli.note);
  let mut session = EditorSession::load(config, &store, Collaborators::default());
  // headless: the viewport shows the whole note
  let height = session.document().geometry().content_height();
  session.set_viewport_height(height.max(1.0));
  log::debug!(
    "loaded {} with {} paragraphs",
    cli.note.display(),
    session.document().paragraphs().len()
  );

  run(&mut session, &cli.command)?;

  if cli.command.mutates() {
    session
      .save(&mut store)
      .with_context(|| format!("failed to save {}", cli.note.display()))?;
    log::info!("saved {}", cli.note.display());
  }
  Ok(())
}

fn setup_logging(verbosity: u8) {
  let level = match verbosity {
    0 => LevelFilter::Warn,
    1 => LevelFilter::Info,
    2 => LevelFilter::Debug,
    _ => LevelFilter::Trace,
  };
  env_logger::Builder::new()
    .filter_level(level)
    .parse_default_env()
    .init();
}

fn run(session: &mut EditorSession, command: &Command) -> Result<()> {
  match command {
    Command::Show => show(session),
    Command::Import { file } => {
      let text = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
      let style = session.document().buffer().typing_style();
      session.replace_buffer(&StyledText::plain(&text, style))?;
    },
    Command::Move { from, to } => session.move_paragraph(*from, *to)?,
    Command::Delete { index } => session.delete_paragraph(*index)?,
    Command::Reply { index, text } => {
      let new = session.reply_to(*index)?;
      if let Some(text) = text {
        let cursor = session.document().cursor();
        session.edit(cursor..cursor, text)?;
      }
      log::info!("opened paragraph {new}");
    },
    Command::Relate { index, unrelated } => {
      let detent = if *unrelated {
        Detent::Unrelated
      } else {
        Detent::Related
      };
      relate(session, *index, detent)?;
    },
  }
  Ok(())
}

/// Pinch paragraph `index` and the next one apart or together until the
/// spacing reaches `detent`, then let the settle animation run out.
fn relate(session: &mut EditorSession, index: usize, detent: Detent) -> Result<()> {
  let document = session.document();
  let (Some(upper), Some(lower)) = (
    document.geometry().bounds(index),
    document.geometry().bounds(index + 1),
  ) else {
    // nothing below to pinch against
    session.set_spacing(index, detent)?;
    return Ok(());
  };
  let offset = document.scroll().offset;
  let current = document.paragraph(index)?.spacing;
  let target = session.config().spacing.value(detent);

  let mut clock = FixedStepClock::new(Instant::now(), 60);
  let first = Point::new(10.0, upper.mid_y() - offset);
  let second = Point::new(10.0, lower.mid_y() - offset);
  session.pinch_began(first, second, clock.now())?;
  session.pinch_changed(first, second.offset(0.0, target - current));
  session.pinch_ended(clock.now());

  let mut frames = 0;
  while session.on_frame(clock.tick()) {
    frames += 1;
  }
  log::debug!("spacing settled after {frames} frames");
  Ok(())
}

fn show(session: &EditorSession) {
  let spacing = session.config().spacing;
  for (index, paragraph) in session.document().paragraphs().iter().enumerate() {
    let marker = match spacing.detent_of(paragraph.spacing) {
      Some(Detent::Related) => "~",
      Some(Detent::Unrelated) => "|",
      None => "?",
    };
    println!("{index:>3} {marker} {}", paragraph.body().text());
  }
}
