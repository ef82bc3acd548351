use std::time::{
  Duration,
  Instant,
};

use ruled_core::geometry::Point;
use ruled_lib::{
  animation::FixedStepClock,
  buffer::{
    StyledText,
    StyledTextBuffer,
  },
  config::EditorConfig,
  editor::{
    Collaborators,
    EditorError,
    EditorSession,
  },
  haptics::{
    HapticStrength,
    RecordedHaptics,
  },
  layout::FixedLineLayout,
  overlay::{
    Emphasis,
    RecordedOverlay,
  },
  spacing::SpacingPhase,
  style::StyleAttributes,
  swipe::SwipeOutcome,
};

struct Scenario {
  session: EditorSession,
  haptics: RecordedHaptics,
  overlay: RecordedOverlay,
  clock:   FixedStepClock,
}

impl Scenario {
  fn new(text: &str) -> Self {
    let haptics = RecordedHaptics::new();
    let overlay = RecordedOverlay::new();
    let session = EditorSession::new(
      EditorConfig::default(),
      StyledTextBuffer::plain(text, StyleAttributes::default()),
      Collaborators {
        layout:  Box::new(FixedLineLayout::default()),
        haptics: Box::new(haptics.clone()),
        overlay: Box::new(overlay.clone()),
      },
    );
    Self {
      session,
      haptics,
      overlay,
      clock: FixedStepClock::new(Instant::now(), 60),
    }
  }

  fn point_in(&self, index: usize) -> Point {
    let document = self.session.document();
    let bounds = document
      .geometry()
      .bounds(index)
      .unwrap_or_default();
    Point::new(10.0, bounds.mid_y() - document.scroll().offset)
  }

  /// Deliver frames until nothing is subscribed any more.
  fn run_frames(&mut self) -> usize {
    let mut frames = 0;
    while self.session.on_frame(self.clock.tick()) {
      frames += 1;
      assert!(frames < 600, "animations never settled");
    }
    frames
  }

  fn texts(&self) -> Vec<String> {
    self
      .session
      .document()
      .paragraphs()
      .iter()
      .map(|p| p.body().text().to_string())
      .collect()
  }

  fn spacing(&self, index: usize) -> f32 {
    self.session.document().paragraphs()[index].spacing
  }
}

const TOP: Point = Point { x: 10.0, y: 10.0 };
const BOTTOM: Point = Point { x: 10.0, y: 45.0 };

#[test]
fn wide_pinch_relates_nothing_and_settles_unrelated() {
  let mut s = Scenario::new("Hello\nWorld");
  let config = EditorConfig::default().spacing;
  assert_eq!(s.spacing(0), config.related);

  s.session.pinch_began(TOP, BOTTOM, s.clock.now()).unwrap();
  let live = s.session.pinch_changed(TOP, BOTTOM.offset(0.0, 500.0));
  assert_eq!(live, Some(config.unrelated));
  assert_eq!(s.session.spacing().phase(), SpacingPhase::Active);
  let frame = s.overlay.last().unwrap();
  assert_eq!(frame.highlights[0].emphasis, Emphasis::Spacing);

  s.session.pinch_ended(s.clock.now());
  assert_eq!(s.session.spacing().phase(), SpacingPhase::Committing);
  s.run_frames();

  assert_eq!(s.spacing(0), config.unrelated);
  assert_eq!(s.session.spacing().phase(), SpacingPhase::Idle);
  assert!(s.session.is_idle());
  assert_eq!(s.texts(), ["Hello", "World"]);
  assert_eq!(
    s.haptics.pulses(),
    [HapticStrength::Medium, HapticStrength::Soft, HapticStrength::Light]
  );
}

#[test]
fn short_pinch_reverts() {
  let mut s = Scenario::new("Hello\nWorld");
  let config = EditorConfig::default().spacing;

  s.session.pinch_began(TOP, BOTTOM, s.clock.now()).unwrap();
  assert_eq!(s.session.pinch_changed(TOP, BOTTOM.offset(0.0, 10.0)), Some(18.0));
  assert_eq!(s.session.spacing().phase(), SpacingPhase::Priming);
  s.session.pinch_ended(s.clock.now());
  assert_eq!(s.session.spacing().phase(), SpacingPhase::Reverting);
  s.run_frames();

  assert_eq!(s.spacing(0), config.related);
  assert_eq!(s.haptics.pulses(), [HapticStrength::Light]);
}

#[test]
fn deleting_the_only_paragraph_leaves_an_empty_note() {
  let mut s = Scenario::new("A");
  let start = s.point_in(0);

  s.session.swipe_began(start).unwrap();
  s.session
    .swipe_moved(start.offset(-120.0, 2.0), s.clock.now())
    .unwrap();
  s.run_frames();
  assert_eq!(s.haptics.count(HapticStrength::Heavy), 1);

  let outcome = s.session.swipe_ended(s.clock.now());
  assert_eq!(outcome, Some(SwipeOutcome::Deleted { index: 0 }));
  assert_eq!(s.session.text(), "");
  assert_eq!(s.session.document().paragraphs().len(), 1);
  assert_eq!(s.session.document().cursor(), 0);
  assert!(s.session.is_idle());
}

#[test]
fn releasing_a_delete_early_springs_back() {
  let mut s = Scenario::new("A\nB");
  let start = s.point_in(1);

  s.session.swipe_began(start).unwrap();
  s.session
    .swipe_moved(start.offset(-120.0, 0.0), s.clock.now())
    .unwrap();
  s.clock.advance(Duration::from_millis(200));
  s.session.on_frame(s.clock.now());

  assert_eq!(
    s.session.swipe_ended(s.clock.now()),
    Some(SwipeOutcome::SprungBack)
  );
  s.run_frames();
  assert_eq!(s.session.text(), "A\nB");
  assert_eq!(s.haptics.count(HapticStrength::Heavy), 0);
  assert!(s.session.is_idle());
}

#[test]
fn reply_swipe_opens_a_paragraph_below() {
  let mut s = Scenario::new("Hello\nWorld");
  let start = s.point_in(0);

  s.session.swipe_began(start).unwrap();
  s.session
    .swipe_moved(start.offset(100.0, 0.0), s.clock.now())
    .unwrap();
  let outcome = s.session.swipe_ended(s.clock.now());
  assert_eq!(outcome, Some(SwipeOutcome::Replied { index: 1 }));
  assert_eq!(s.texts(), ["Hello", "", "World"]);
  assert_eq!(s.session.document().cursor(), 6);
}

#[test]
fn dragging_the_first_paragraph_to_the_bottom() {
  let mut s = Scenario::new("X\nY\nZ");
  let id = s.session.reorder_began(s.point_in(0)).unwrap();
  let target = s.point_in(2);
  assert!(s.session.reorder_moved(target, s.clock.now()));

  let outcome = s.session.reorder_ended().unwrap();
  assert_eq!((outcome.id, outcome.from, outcome.to), (id, 0, 2));
  assert_eq!(s.texts(), ["Y", "Z", "X"]);
  assert_eq!(s.session.document().paragraphs()[2].id, id);
  assert_eq!(s.haptics.pulses(), [HapticStrength::Medium]);
  assert!(s.overlay.last().unwrap().ghost.is_none());
}

#[test]
fn external_replacement_is_refused_while_spacing_settles() {
  let mut s = Scenario::new("Hello\nWorld");
  s.session.pinch_began(TOP, BOTTOM, s.clock.now()).unwrap();
  s.session.pinch_changed(TOP, BOTTOM.offset(0.0, 500.0));
  s.session.pinch_ended(s.clock.now());
  s.session.on_frame(s.clock.tick());

  let replacement = StyledText::plain("Synced", StyleAttributes::default());
  assert!(matches!(
    s.session.replace_buffer(&replacement),
    Err(EditorError::GestureInProgress)
  ));
  assert!(s.session.reorder_began(s.point_in(0)).is_err());

  s.run_frames();
  s.session.replace_buffer(&replacement).unwrap();
  assert_eq!(s.texts(), ["Synced"]);
}

#[test]
fn typing_elsewhere_leaves_a_pinch_alone() {
  let mut s = Scenario::new("Hello\nWorld");
  let config = EditorConfig::default().spacing;
  s.session.pinch_began(TOP, BOTTOM, s.clock.now()).unwrap();
  s.session.edit(11..11, "!").unwrap();
  s.session.pinch_changed(TOP, BOTTOM.offset(0.0, 500.0));
  s.session.pinch_ended(s.clock.now());
  s.run_frames();

  assert_eq!(s.texts(), ["Hello", "World!"]);
  assert_eq!(s.spacing(0), config.unrelated);
  assert_eq!(s.spacing(1), config.related);
}

#[test]
fn typing_above_a_live_pinch_keeps_its_spacing() {
  let mut s = Scenario::new("A\nHello\nWorld");
  let config = EditorConfig::default().spacing;
  let (upper, lower) = (s.point_in(1), s.point_in(2));
  s.session.pinch_began(upper, lower, s.clock.now()).unwrap();
  let live = s
    .session
    .pinch_changed(upper, lower.offset(0.0, 10.0))
    .unwrap();
  assert!((live - 18.0).abs() < 0.01, "{live}");

  s.session.edit(0..0, "x").unwrap();
  assert_eq!(s.texts(), ["xA", "Hello", "World"]);
  assert_eq!(s.spacing(1), live);

  s.session.pinch_ended(s.clock.now());
  s.run_frames();
  assert_eq!(s.spacing(1), config.related);
  assert!(s.session.is_idle());
}

#[test]
fn typing_above_a_settling_pair_then_regrabbing_it() {
  let mut s = Scenario::new("A\nHello\nWorld");
  let (upper, lower) = (s.point_in(1), s.point_in(2));
  s.session.pinch_began(upper, lower, s.clock.now()).unwrap();
  s.session.pinch_changed(upper, lower.offset(0.0, 6.0));
  s.session.pinch_ended(s.clock.now());

  s.session.edit(0..0, "x").unwrap();
  let settling = s.spacing(1);
  assert!((settling - 14.0).abs() < 0.01, "{settling}");

  let (upper, lower) = (s.point_in(1), s.point_in(2));
  s.session.pinch_began(upper, lower, s.clock.now()).unwrap();
  let live = s
    .session
    .pinch_changed(upper, lower.offset(0.0, 3.0))
    .unwrap();
  assert!((live - 17.0).abs() < 0.01, "{live}");

  s.session.on_frame(s.clock.tick());
  assert!(!s.session.spacing().is_animating());
  assert_eq!(s.session.spacing().phase(), SpacingPhase::Priming);
  assert_eq!(s.spacing(1), live);
}
