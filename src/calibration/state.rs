//! Calibration entities: segment points grouped into digits.
//!
//! Points live in one arena owned by `Calibration`, addressed by `PointId`.
//! The arena order is the placement history, so undoing a placement pops
//! the arena. Digits only hold ids, and the naming history and queue are
//! lists of ids as well.

use anyhow::{bail, Result};
use serde::Serialize;
use std::collections::VecDeque;

/// Number of segments in one seven-segment glyph.
pub const SEGMENTS_PER_DIGIT: usize = 7;

/// The seven fixed positions of a seven-segment glyph, in naming order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SegmentRole {
    Top,
    TopLeft,
    TopRight,
    Middle,
    BottomLeft,
    BottomRight,
    Bottom,
}

impl SegmentRole {
    pub const ALL: [SegmentRole; SEGMENTS_PER_DIGIT] = [
        SegmentRole::Top,
        SegmentRole::TopLeft,
        SegmentRole::TopRight,
        SegmentRole::Middle,
        SegmentRole::BottomLeft,
        SegmentRole::BottomRight,
        SegmentRole::Bottom,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Role handed out by the `n`-th naming click (cyclic).
    pub fn from_counter(n: usize) -> Self {
        Self::ALL[n % SEGMENTS_PER_DIGIT]
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::Middle => "middle",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
            Self::Bottom => "bottom",
        }
    }
}

/// Stable handle of a point in the calibration arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PointId(usize);

/// Handle of a digit; digits are numbered in placement order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DigitId(usize);

impl DigitId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A single calibration sample location.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentPoint {
    /// Position in source space (original, uncropped, unrotated frame)
    pub position: (i32, i32),
    /// Part of the batch-move selection while fixing
    pub selected: bool,
    /// Assigned role, `None` until named
    pub name: Option<SegmentRole>,
    /// Digit this point belongs to
    pub digit: DigitId,
}

/// One display digit: up to seven point ids, one per role once named.
#[derive(Clone, Debug, Default)]
pub struct Digit {
    points: Vec<PointId>,
    ordered: Option<[PointId; SEGMENTS_PER_DIGIT]>,
    /// Set when the most recent decode of this digit needed the fallback
    pub is_broken: bool,
}

impl Digit {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.points.len() >= SEGMENTS_PER_DIGIT
    }

    /// Point ids in role order; available after `Calibration::sort`.
    pub fn ordered_segments(&self) -> Option<&[PointId; SEGMENTS_PER_DIGIT]> {
        self.ordered.as_ref()
    }
}

/// All calibration points and digits plus their undo histories.
#[derive(Clone, Debug, Default)]
pub struct Calibration {
    /// Arena in placement order
    points: Vec<SegmentPoint>,
    digits: Vec<Digit>,
    /// Points in the order their names were assigned
    naming_history: Vec<PointId>,
    /// Digits still waiting to be named; the front one is being named
    naming_queue: VecDeque<DigitId>,
    /// Number of names handed out, indexes the cyclic role table
    role_counter: usize,
}

impl Calibration {
    pub fn point(&self, id: PointId) -> &SegmentPoint {
        &self.points[id.0]
    }

    #[cfg(test)]
    pub fn point_mut(&mut self, id: PointId) -> &mut SegmentPoint {
        &mut self.points[id.0]
    }

    pub fn points(&self) -> impl Iterator<Item = (PointId, &SegmentPoint)> {
        self.points.iter().enumerate().map(|(i, p)| (PointId(i), p))
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn digits(&self) -> &[Digit] {
        &self.digits
    }

    pub fn digit(&self, id: DigitId) -> &Digit {
        &self.digits[id.0]
    }

    pub fn digits_mut(&mut self) -> &mut [Digit] {
        &mut self.digits
    }

    /// Source positions of a sorted digit's segments, in role order.
    pub fn segment_positions(&self, index: usize) -> Option<[(i32, i32); SEGMENTS_PER_DIGIT]> {
        let ordered = self.digits.get(index)?.ordered_segments()?;
        Some(ordered.map(|id| self.points[id.0].position))
    }

    /// Returns true if another point lies closer than `min_distance`.
    pub fn is_too_close(&self, position: (i32, i32), min_distance: f64) -> bool {
        self.points
            .iter()
            .any(|p| distance(p.position, position) < min_distance)
    }

    // ---- Placement ----

    /// Appends a new unnamed point, rejecting it if it crowds an existing one.
    ///
    /// The point joins the first digit with fewer than seven points, or a
    /// new digit when every digit is full.
    pub fn place(&mut self, position: (i32, i32), min_distance: f64) -> Option<PointId> {
        if self.is_too_close(position, min_distance) {
            return None;
        }

        let digit = match self.digits.iter().position(|d| !d.is_full()) {
            Some(index) => DigitId(index),
            None => {
                self.digits.push(Digit::default());
                DigitId(self.digits.len() - 1)
            }
        };

        let id = PointId(self.points.len());
        self.points.push(SegmentPoint {
            position,
            selected: false,
            name: None,
            digit,
        });
        self.digits[digit.0].points.push(id);
        Some(id)
    }

    /// Removes the most recently placed point, and its digit if that empties it.
    pub fn remove_last(&mut self) -> Option<(i32, i32)> {
        let point = self.points.pop()?;
        let id = PointId(self.points.len());

        let digit = &mut self.digits[point.digit.0];
        digit.points.retain(|p| *p != id);
        // Digits fill in order, so an emptied digit is always the last one.
        if digit.is_empty() && point.digit.0 + 1 == self.digits.len() {
            self.digits.pop();
        }

        Some(point.position)
    }

    /// True when the placed points form only complete digits.
    pub fn has_whole_digits(&self) -> bool {
        !self.points.is_empty() && self.points.len() % SEGMENTS_PER_DIGIT == 0
    }

    // ---- Naming ----

    /// Queues every digit for naming, in placement order.
    pub fn start_naming(&mut self) {
        self.naming_queue = (0..self.digits.len())
            .map(DigitId)
            .filter(|id| !self.is_named(*id))
            .collect();
    }

    /// Digit currently being named, if any remain.
    pub fn naming_digit(&self) -> Option<DigitId> {
        self.naming_queue.front().copied()
    }

    /// Role the next naming click will assign.
    pub fn next_role(&self) -> SegmentRole {
        SegmentRole::from_counter(self.role_counter)
    }

    /// Names the unnamed point of the current digit closest to `position`.
    pub fn name_nearest(&mut self, position: (i32, i32)) -> Option<(PointId, SegmentRole)> {
        let digit_id = self.naming_digit()?;
        let target = self.digits[digit_id.0]
            .points
            .iter()
            .copied()
            .filter(|id| self.points[id.0].name.is_none())
            .min_by(|a, b| {
                let da = distance(self.points[a.0].position, position);
                let db = distance(self.points[b.0].position, position);
                da.total_cmp(&db)
            })?;

        let role = self.next_role();
        self.points[target.0].name = Some(role);
        self.naming_history.push(target);
        self.role_counter += 1;

        if self.is_named(digit_id) {
            self.naming_queue.pop_front();
        }

        Some((target, role))
    }

    /// Clears the most recently assigned name, reopening its digit if it was complete.
    pub fn undo_naming(&mut self) -> Option<PointId> {
        let id = self.naming_history.pop()?;
        let point = &mut self.points[id.0];
        point.name = None;
        let digit = point.digit;
        self.role_counter = self.role_counter.saturating_sub(1);

        if self.naming_queue.front() != Some(&digit) {
            self.naming_queue.push_front(digit);
        }

        Some(id)
    }

    /// True when the digit owns seven named points.
    pub fn is_named(&self, id: DigitId) -> bool {
        let digit = &self.digits[id.0];
        digit.len() == SEGMENTS_PER_DIGIT
            && digit
                .points
                .iter()
                .all(|p| self.points[p.0].name.is_some())
    }

    pub fn all_named(&self) -> bool {
        !self.points.is_empty() && self.points.iter().all(|p| p.name.is_some())
    }

    pub fn named_count(&self) -> usize {
        self.naming_history.len()
    }

    /// Orders every digit's points by role.
    ///
    /// Fails if a digit is missing a role or has one twice.
    pub fn sort(&mut self) -> Result<()> {
        for (index, digit) in self.digits.iter_mut().enumerate() {
            let mut slots: [Option<PointId>; SEGMENTS_PER_DIGIT] = [None; SEGMENTS_PER_DIGIT];

            for id in &digit.points {
                let Some(role) = self.points[id.0].name else {
                    bail!("Digit {} has an unnamed segment", index + 1);
                };
                if slots[role.index()].replace(*id).is_some() {
                    bail!("Digit {} has the {} segment twice", index + 1, role.label());
                }
            }

            let mut ordered = [PointId(0); SEGMENTS_PER_DIGIT];
            for (role, slot) in SegmentRole::ALL.iter().zip(slots) {
                match slot {
                    Some(id) => ordered[role.index()] = id,
                    None => bail!("Digit {} is missing the {} segment", index + 1, role.label()),
                }
            }
            digit.ordered = Some(ordered);
        }
        Ok(())
    }

    // ---- Fixing ----

    /// Selects only `id`, dropping any previous selection.
    pub fn select_only(&mut self, id: PointId) {
        for point in &mut self.points {
            point.selected = false;
        }
        self.points[id.0].selected = true;
    }

    /// Adds `id` to the selection. Returns false if it was already selected.
    pub fn extend_selection(&mut self, id: PointId) -> bool {
        let point = &mut self.points[id.0];
        if point.selected {
            return false;
        }
        point.selected = true;
        true
    }

    pub fn clear_selection(&mut self) {
        for point in &mut self.points {
            point.selected = false;
        }
    }

    pub fn selected_count(&self) -> usize {
        self.points.iter().filter(|p| p.selected).count()
    }

    /// Moves every selected point by `delta`, keeping it inside the frame.
    pub fn nudge_selected(&mut self, delta: (i32, i32), frame_size: (u32, u32)) -> usize {
        let max_x = frame_size.0.saturating_sub(1) as i32;
        let max_y = frame_size.1.saturating_sub(1) as i32;
        let mut moved = 0;
        for point in self.points.iter_mut().filter(|p| p.selected) {
            point.position = (
                (point.position.0 + delta.0).clamp(0, max_x),
                (point.position.1 + delta.1).clamp(0, max_y),
            );
            moved += 1;
        }
        moved
    }
}

/// Euclidean distance between two pixel positions.
pub fn distance(a: (i32, i32), b: (i32, i32)) -> f64 {
    let dx = (a.0 - b.0) as f64;
    let dy = (a.1 - b.1) as f64;
    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Grid positions far enough apart for the default minimum distance.
    pub(crate) fn grid_position(i: usize) -> (i32, i32) {
        (100 + (i % 7) as i32 * 150, 100 + (i / 7) as i32 * 150)
    }

    /// Sorted calibration of `digit_count` digits on the grid; point `i` gets role `i % 7`.
    pub(crate) fn named_calibration(digit_count: usize) -> Calibration {
        let mut cal = placed(digit_count * SEGMENTS_PER_DIGIT);
        cal.start_naming();
        for i in 0..digit_count * SEGMENTS_PER_DIGIT {
            cal.name_nearest(grid_position(i)).unwrap();
        }
        cal.sort().unwrap();
        cal
    }

    fn placed(count: usize) -> Calibration {
        let mut cal = Calibration::default();
        for i in 0..count {
            assert!(cal.place(grid_position(i), 100.0).is_some());
        }
        cal
    }

    #[test]
    fn test_fourteen_points_make_two_digits() {
        let cal = placed(14);
        assert_eq!(cal.digits().len(), 2);
        assert!(cal.digits().iter().all(|d| d.len() == 7));
        assert!(cal.has_whole_digits());
    }

    #[test]
    fn test_undo_placement_discards_emptied_digit() {
        let mut cal = placed(14);
        for _ in 0..7 {
            assert!(cal.remove_last().is_some());
        }
        assert_eq!(cal.digits().len(), 1);
        assert_eq!(cal.digits()[0].len(), 7);

        for _ in 0..7 {
            cal.remove_last();
        }
        assert!(cal.digits().is_empty());
        assert_eq!(cal.point_count(), 0);
        assert!(cal.remove_last().is_none());
    }

    #[test]
    fn test_place_rejects_close_point() {
        let mut cal = Calibration::default();
        assert!(cal.place((100, 100), 100.0).is_some());
        assert!(cal.place((150, 150), 100.0).is_none());
        assert!(cal.place((200, 100), 100.0).is_some());
        assert_eq!(cal.point_count(), 2);
    }

    #[test]
    fn test_partial_digits_are_not_whole() {
        let cal = placed(9);
        assert!(!cal.has_whole_digits());
        assert!(!Calibration::default().has_whole_digits());
    }

    #[test]
    fn test_naming_uses_cyclic_roles_and_nearest_point() {
        let mut cal = placed(7);
        cal.start_naming();

        // Click right next to the fourth point: it gets the first role.
        let (id, role) = cal.name_nearest((grid_position(3).0 + 5, 95)).unwrap();
        assert_eq!(id, PointId(3));
        assert_eq!(role, SegmentRole::Top);
        assert_eq!(cal.next_role(), SegmentRole::TopLeft);

        // Clicking the same place again picks the nearest still-unnamed point.
        let (id, _) = cal.name_nearest((grid_position(3).0, 100)).unwrap();
        assert_ne!(id, PointId(3));
    }

    #[test]
    fn test_digit_reports_named_after_seven_names() {
        let mut cal = placed(14);
        cal.start_naming();
        for i in 0..7 {
            cal.name_nearest(grid_position(i)).unwrap();
        }
        assert!(cal.is_named(DigitId(0)));
        assert!(!cal.is_named(DigitId(1)));
        assert_eq!(cal.naming_digit(), Some(DigitId(1)));
    }

    #[test]
    fn test_undo_naming_reopens_completed_digit() {
        let mut cal = placed(14);
        cal.start_naming();
        for i in 0..14 {
            cal.name_nearest(grid_position(i)).unwrap();
        }
        assert!(cal.all_named());
        assert_eq!(cal.naming_digit(), None);

        let undone = cal.undo_naming().unwrap();
        assert_eq!(undone, PointId(13));
        assert_eq!(cal.naming_digit(), Some(DigitId(1)));
        assert!(!cal.is_named(DigitId(1)));
        assert!(cal.is_named(DigitId(0)));
        assert_eq!(cal.next_role(), SegmentRole::Bottom);

        // Renaming the cleared point completes the digit again.
        let (id, role) = cal.name_nearest(grid_position(13)).unwrap();
        assert_eq!((id, role), (PointId(13), SegmentRole::Bottom));
        assert!(cal.all_named());
    }

    #[test]
    fn test_undo_naming_across_digit_boundary() {
        let mut cal = placed(14);
        cal.start_naming();
        for i in 0..8 {
            cal.name_nearest(grid_position(i)).unwrap();
        }
        cal.undo_naming();
        // Back to the second digit's first role, still naming digit two.
        assert_eq!(cal.naming_digit(), Some(DigitId(1)));
        cal.undo_naming();
        assert_eq!(cal.naming_digit(), Some(DigitId(0)));
        assert_eq!(cal.next_role(), SegmentRole::Bottom);
    }

    #[test]
    fn test_sort_orders_by_role() {
        let mut cal = placed(7);
        cal.start_naming();
        // Name in reverse placement order.
        for i in (0..7).rev() {
            cal.name_nearest(grid_position(i)).unwrap();
        }
        cal.sort().unwrap();

        let ordered = cal.digits()[0].ordered_segments().unwrap();
        assert_eq!(ordered[SegmentRole::Top.index()], PointId(6));
        assert_eq!(ordered[SegmentRole::Bottom.index()], PointId(0));
    }

    #[test]
    fn test_sort_rejects_duplicate_role() {
        let mut cal = placed(7);
        cal.start_naming();
        for i in 0..7 {
            cal.name_nearest(grid_position(i)).unwrap();
        }
        cal.point_mut(PointId(6)).name = Some(SegmentRole::Top);
        let err = cal.sort().unwrap_err();
        assert!(err.to_string().contains("twice"));
    }

    #[test]
    fn test_selection_and_nudge() {
        let mut cal = placed(3);
        cal.select_only(PointId(0));
        assert!(cal.extend_selection(PointId(2)));
        assert!(!cal.extend_selection(PointId(2)));
        assert_eq!(cal.selected_count(), 2);

        cal.select_only(PointId(1));
        assert_eq!(cal.selected_count(), 1);

        let before = cal.point(PointId(1)).position;
        assert_eq!(cal.nudge_selected((2, -2), (2000, 2000)), 1);
        assert_eq!(cal.point(PointId(1)).position, (before.0 + 2, before.1 - 2));

        // Clamped to the frame.
        cal.nudge_selected((-10_000, 0), (2000, 2000));
        assert_eq!(cal.point(PointId(1)).position.0, 0);
    }
}
