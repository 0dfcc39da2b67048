//! Calibration session state machine.
//!
//! The session walks the operator through the stages
//! Transforming → Placement → Naming → Scanning ⇄ Fixing. Each input event
//! is handled by `Session::handle`, which mutates the session and returns an
//! `Outcome` telling the host whether to redraw, what notice to show, and
//! whether to keep going. The host never touches calibration state directly.

use anyhow::Result;
use image::RgbaImage;
use std::time::Duration;

use crate::calibration::coords::{CropRect, Rotation, ViewState, ViewTransform};
use crate::calibration::state::{distance, Calibration, PointId};
use crate::capture::FrameSource;
use crate::config::AppConfig;
use crate::scanner::{ScanResults, ScanStep, Scanner};

/// Calibration stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Cropping and rotating the view (initial)
    Transforming,
    /// Placing segment points
    Placement,
    /// Assigning segment roles digit by digit
    Naming,
    /// Decoding the timeline
    Scanning,
    /// Scan suspended while points are repositioned
    Fixing,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Transforming => write!(f, "Transforming"),
            Stage::Placement => write!(f, "Placement"),
            Stage::Naming => write!(f, "Naming"),
            Stage::Scanning => write!(f, "Scanning"),
            Stage::Fixing => write!(f, "Fixing"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
}

/// Keys the session reacts to; the host maps physical keys onto these.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Accept,
    Abort,
    Undo,
    Rotate,
    Fix,
    Up,
    Down,
    Left,
    Right,
    Other,
}

impl Key {
    /// On-screen unit direction of a nudge key.
    fn direction(self) -> Option<(i32, i32)> {
        match self {
            Key::Up => Some((0, -1)),
            Key::Down => Some((0, 1)),
            Key::Left => Some((-1, 0)),
            Key::Right => Some((1, 0)),
            _ => None,
        }
    }
}

/// Input delivered by the host. Positions are display-space pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    PointerDown { pos: (i32, i32), button: PointerButton },
    PointerUp { pos: (i32, i32), button: PointerButton },
    Key(Key),
    /// The scan delay has elapsed
    Tick,
}

/// What the host should do after an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    Continue,
    /// Close immediately without saving anything
    Abort,
    /// The scan reached the end of the source; results are final
    Finished,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub redraw: bool,
    /// Transient message for the window title
    pub notice: Option<String>,
    pub control: Control,
}

impl Outcome {
    fn idle() -> Self {
        Self {
            redraw: false,
            notice: None,
            control: Control::Continue,
        }
    }

    fn redraw() -> Self {
        Self {
            redraw: true,
            ..Self::idle()
        }
    }

    fn notice(message: &str) -> Self {
        crate::log(message);
        Self {
            notice: Some(message.to_string()),
            ..Self::idle()
        }
    }

    fn control(control: Control) -> Self {
        Self {
            control,
            ..Self::idle()
        }
    }
}

/// One calibration-and-scan session over a single frame source.
pub struct Session {
    config: AppConfig,
    /// Frame currently shown: the reference frame until scanning replaces it
    frame: RgbaImage,
    frame_size: (u32, u32),
    view: ViewState,
    calibration: Calibration,
    stage: Stage,
    /// Source-space corner where the current crop drag started
    drag_start: Option<(i32, i32)>,
    scanner: Option<Scanner>,
}

impl Session {
    /// Fails if the configured initial rotation is not a quadrant.
    pub fn new(reference: RgbaImage, config: AppConfig) -> Result<Self> {
        let frame_size = reference.dimensions();
        let mut view = ViewState::default();
        view.rotation = Rotation::from_quadrant(config.initial_rotation)?;
        crate::log(&format!(
            "Calibration session started on a {}x{} reference frame, rotation {}",
            frame_size.0,
            frame_size.1,
            view.rotation.quadrant()
        ));
        Ok(Self {
            config,
            frame: reference,
            frame_size,
            view,
            calibration: Calibration::default(),
            stage: Stage::Transforming,
            drag_start: None,
            scanner: None,
        })
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn frame(&self) -> &RgbaImage {
        &self.frame
    }

    #[cfg(test)]
    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn scanner(&self) -> Option<&Scanner> {
        self.scanner.as_ref()
    }

    pub fn results(&self) -> Option<&ScanResults> {
        self.scanner.as_ref().map(|s| s.results())
    }

    /// Current view pipeline for the shown frame.
    pub fn transform(&self) -> ViewTransform {
        ViewTransform::new(
            self.frame_size,
            &self.view,
            self.config.min_display_size,
            self.config.max_display_size,
        )
    }

    /// Delay before the next `Tick`, only while scanning.
    pub fn scan_delay(&self) -> Option<Duration> {
        match (&self.scanner, self.stage) {
            (Some(scanner), Stage::Scanning) => Some(scanner.delay()),
            _ => None,
        }
    }

    /// Window title describing the stage and what the operator should do.
    pub fn title(&self) -> String {
        let cal = &self.calibration;
        match self.stage {
            Stage::Transforming => format!(
                "{} - drag to crop, R rotates, Backspace undoes crop, Enter continues",
                self.stage
            ),
            Stage::Placement => format!(
                "{} - {} points in {} digits, Backspace undoes, Enter continues",
                self.stage,
                cal.point_count(),
                cal.digits().len()
            ),
            Stage::Naming => match cal.naming_digit() {
                Some(digit) => format!(
                    "{} - digit {}: click the {} segment",
                    self.stage,
                    digit.index() + 1,
                    cal.next_role().label()
                ),
                None => format!("{} - all points named, Enter starts the scan", self.stage),
            },
            Stage::Scanning => {
                let (second, progress) = self
                    .scanner
                    .as_ref()
                    .map(|s| (s.next_second(), s.progress()))
                    .unwrap_or((0, 0.0));
                let latest = self
                    .results()
                    .and_then(|r| r.latest())
                    .map(|(_, r)| r.formatted(self.config.decimal_places))
                    .unwrap_or_default();
                format!(
                    "{} - {}s ({:.0}%) {} - F to fix",
                    self.stage,
                    second,
                    progress * 100.0,
                    latest
                )
            }
            Stage::Fixing => format!(
                "{} - {} selected, arrows move, Enter resumes",
                self.stage,
                cal.selected_count()
            ),
        }
    }

    /// Handles one input event.
    ///
    /// Errors are contract violations (malformed crop, inconsistent digit
    /// roles) or frame source failures, and end the session.
    pub fn handle(&mut self, event: InputEvent, source: &mut dyn FrameSource) -> Result<Outcome> {
        if event == InputEvent::Key(Key::Abort) {
            crate::log(&format!("Session aborted during {}", self.stage));
            return Ok(Outcome::control(Control::Abort));
        }

        match self.stage {
            Stage::Transforming => self.handle_transforming(event),
            Stage::Placement => Ok(self.handle_placement(event)),
            Stage::Naming => self.handle_naming(event, source),
            Stage::Scanning => self.handle_scanning(event, source),
            Stage::Fixing => Ok(self.handle_fixing(event)),
        }
    }

    fn enter(&mut self, stage: Stage) {
        crate::log(&format!("Stage: {} -> {}", self.stage, stage));
        self.stage = stage;
    }

    /// Converts a display position to source space, ignoring clicks outside the view.
    fn source_position(&self, pos: (i32, i32)) -> Option<(i32, i32)> {
        let transform = self.transform();
        transform
            .contains_display(pos)
            .then(|| transform.to_source(pos))
    }

    fn handle_transforming(&mut self, event: InputEvent) -> Result<Outcome> {
        match event {
            InputEvent::PointerDown {
                pos,
                button: PointerButton::Primary,
            } => {
                self.drag_start = self.source_position(pos);
                Ok(Outcome::idle())
            }
            InputEvent::PointerUp {
                pos,
                button: PointerButton::Primary,
            } => {
                let Some(start) = self.drag_start.take() else {
                    return Ok(Outcome::idle());
                };
                let transform = self.transform();
                let (w, h) = transform.display_size();
                let clamped = (
                    pos.0.clamp(0, w as i32 - 1),
                    pos.1.clamp(0, h as i32 - 1),
                );
                let end = transform.to_source(clamped);

                let too_small = |width: i32, height: i32| {
                    Outcome::notice(&format!(
                        "Crop too small ({}x{}), needs at least {} px width + height",
                        width, height, self.config.min_crop_extent
                    ))
                };
                if start.0 == end.0 || start.1 == end.1 {
                    return Ok(too_small((start.0 - end.0).abs(), (start.1 - end.1).abs()));
                }

                let crop = CropRect::from_corners(start, end, self.frame_size)?;
                if crop.extent() < self.config.min_crop_extent {
                    return Ok(too_small(crop.width as i32, crop.height as i32));
                }
                self.view.push_crop(crop);
                crate::log(&format!(
                    "Crop: {}x{} at ({}, {}), view scale {:.2}",
                    crop.width,
                    crop.height,
                    crop.x,
                    crop.y,
                    self.transform().scale()
                ));
                Ok(Outcome::redraw())
            }
            InputEvent::Key(Key::Rotate) => {
                self.view.rotate();
                crate::log(&format!(
                    "Rotation: {} degrees",
                    self.view.rotation.quadrant() as u32 * 90
                ));
                Ok(Outcome::redraw())
            }
            InputEvent::Key(Key::Undo) => {
                if self.view.undo_crop() {
                    crate::log(&format!(
                        "Crop undone, {} left in history",
                        self.view.crop_history_len()
                    ));
                    Ok(Outcome::redraw())
                } else {
                    Ok(Outcome::notice("No crop to undo"))
                }
            }
            InputEvent::Key(Key::Accept) => {
                self.drag_start = None;
                self.enter(Stage::Placement);
                Ok(Outcome::redraw())
            }
            _ => Ok(Outcome::idle()),
        }
    }

    fn handle_placement(&mut self, event: InputEvent) -> Outcome {
        match event {
            InputEvent::PointerDown {
                pos,
                button: PointerButton::Primary,
            } => {
                let Some(position) = self.source_position(pos) else {
                    return Outcome::idle();
                };
                match self
                    .calibration
                    .place(position, self.config.min_point_distance)
                {
                    Some(_) => Outcome::redraw(),
                    None => {
                        crate::log(&format!(
                            "Point at ({}, {}) too close to an existing point, ignored",
                            position.0, position.1
                        ));
                        Outcome::idle()
                    }
                }
            }
            InputEvent::Key(Key::Undo) => match self.calibration.remove_last() {
                Some(_) => Outcome::redraw(),
                None => Outcome::idle(),
            },
            InputEvent::Key(Key::Accept) => {
                if !self.calibration.has_whole_digits() {
                    return Outcome::notice(&format!(
                        "{} points placed; place whole digits of 7 points before continuing",
                        self.calibration.point_count()
                    ));
                }
                self.calibration.start_naming();
                crate::log(&format!(
                    "{} digits placed",
                    self.calibration.digits().len()
                ));
                self.enter(Stage::Naming);
                Outcome::redraw()
            }
            _ => Outcome::idle(),
        }
    }

    fn handle_naming(&mut self, event: InputEvent, source: &mut dyn FrameSource) -> Result<Outcome> {
        match event {
            InputEvent::PointerDown {
                pos,
                button: PointerButton::Primary,
            } => {
                let Some(position) = self.source_position(pos) else {
                    return Ok(Outcome::idle());
                };
                match self.calibration.name_nearest(position) {
                    Some((id, role)) => {
                        let digit = self.calibration.point(id).digit;
                        crate::log(&format!(
                            "Digit {}: {} segment named",
                            digit.index() + 1,
                            role.label()
                        ));
                        Ok(Outcome::redraw())
                    }
                    None => Ok(Outcome::idle()),
                }
            }
            InputEvent::Key(Key::Undo) => match self.calibration.undo_naming() {
                Some(_) => Ok(Outcome::redraw()),
                None => Ok(Outcome::idle()),
            },
            InputEvent::Key(Key::Accept) => {
                if !self.calibration.all_named() {
                    return Ok(Outcome::notice(&format!(
                        "{} of {} points named; name every point before scanning",
                        self.calibration.named_count(),
                        self.calibration.point_count()
                    )));
                }
                self.calibration.sort()?;
                self.scanner = Some(Scanner::new(
                    &self.config,
                    source.frame_rate(),
                    source.total_frames(),
                ));
                self.enter(Stage::Scanning);
                Ok(Outcome::redraw())
            }
            _ => Ok(Outcome::idle()),
        }
    }

    fn handle_scanning(
        &mut self,
        event: InputEvent,
        source: &mut dyn FrameSource,
    ) -> Result<Outcome> {
        match event {
            InputEvent::Tick => {
                let Some(scanner) = self.scanner.as_mut() else {
                    return Ok(Outcome::idle());
                };
                match scanner.step(&mut self.calibration, source)? {
                    ScanStep::Sampled { frame, .. } => {
                        self.frame = frame;
                        Ok(Outcome::redraw())
                    }
                    ScanStep::Finished => Ok(Outcome::control(Control::Finished)),
                }
            }
            InputEvent::Key(Key::Fix) => {
                self.enter(Stage::Fixing);
                Ok(Outcome::redraw())
            }
            _ => Ok(Outcome::idle()),
        }
    }

    /// Point drawn closest to a display position, within the pick radius.
    fn pick_point(&self, pos: (i32, i32)) -> Option<PointId> {
        let transform = self.transform();
        self.calibration
            .points()
            .map(|(id, p)| (id, distance(transform.to_display(p.position), pos)))
            .filter(|(_, d)| *d <= self.config.pick_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    fn handle_fixing(&mut self, event: InputEvent) -> Outcome {
        match event {
            InputEvent::PointerDown {
                pos,
                button: PointerButton::Primary,
            } => {
                match self.pick_point(pos) {
                    Some(id) => self.calibration.select_only(id),
                    None => self.calibration.clear_selection(),
                }
                Outcome::redraw()
            }
            InputEvent::PointerDown {
                pos,
                button: PointerButton::Secondary,
            } => match self.pick_point(pos) {
                Some(id) if self.calibration.extend_selection(id) => Outcome::redraw(),
                _ => Outcome::idle(),
            },
            InputEvent::Key(Key::Rotate) => {
                self.view.rotate();
                Outcome::redraw()
            }
            InputEvent::Key(Key::Accept) => {
                self.calibration.clear_selection();
                self.enter(Stage::Scanning);
                Outcome::redraw()
            }
            InputEvent::Key(key) => {
                let Some((dx, dy)) = key.direction() else {
                    return Outcome::idle();
                };
                let step = self.config.nudge_step;
                let delta = self.transform().direction_to_source(dx * step, dy * step);
                if self.calibration.nudge_selected(delta, self.frame_size) > 0 {
                    Outcome::redraw()
                } else {
                    Outcome::idle()
                }
            }
            _ => Outcome::idle(),
        }
    }
}
