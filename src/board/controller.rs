//! Board state controller: the visual per-stage ordered lists and the drag
//! gesture state machine layered on top of them.
//!
//! ```text
//!            drag_start                 drag_end
//!   Idle ───────────────> Dragging ───────────────> Idle
//!                          │    ^
//!                          └────┘ drag_over
//! ```
//!
//! The controller is synchronous and owns no I/O. A completed cross-stage
//! gesture yields a [`MoveRequest`]; persisting it and reconciling the
//! result is the session's job.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use pipeline_common::{Deal, DealId, SortMode, StageId};

use super::filter::BoardSnapshot;
use super::metrics::days_in_stage;

/// The last hover applied during a gesture, recorded in its post-move form
/// so a repeated event for the same position is recognised and skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HoverKey {
    source_stage_id: StageId,
    target_stage_id: StageId,
    dragged_deal_id: DealId,
    over_id: Uuid,
}

/// Transient state of one drag gesture. Exists only while `Dragging`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gesture {
    pub dragged_deal_id: DealId,
    /// `None` when the dragged deal was not on the board at pick-up.
    pub origin_stage_id: Option<StageId>,
    pub hover_stage_id: Option<StageId>,
    pub hover_index: Option<usize>,
    /// Fallback target when the drop lands somewhere unresolvable.
    pub last_valid_hover_stage_id: Option<StageId>,
    last_hover: Option<HoverKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(Gesture),
}

/// A completed cross-stage move awaiting persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    pub deal_id: DealId,
    pub from_stage_id: StageId,
    pub to_stage_id: StageId,
    /// Position of the deal in the target column after the drop.
    pub index: usize,
    pub stage_changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    /// No gesture was active, or its origin was never resolved.
    Ignored,
    /// Neither the drop target nor any earlier hover resolved to a stage.
    Cancelled { deal_id: DealId },
    /// Dropped back into the origin stage. Nothing to persist.
    Unchanged { deal_id: DealId, stage_id: StageId },
    Moved(MoveRequest),
}

impl DragOutcome {
    pub fn move_request(&self) -> Option<&MoveRequest> {
        match self {
            Self::Moved(request) => Some(request),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Applied,
    /// A gesture is in progress; the snapshot is held until it ends.
    Deferred,
}

#[derive(Debug, Default)]
pub struct BoardController {
    stage_order: Vec<StageId>,
    columns: HashMap<StageId, Vec<DealId>>,
    deals: HashMap<DealId, Deal>,
    sort_mode: SortMode,
    state: DragState,
    pending_seed: Option<(BoardSnapshot, DateTime<Utc>)>,
}

impl BoardController {
    pub fn new(sort_mode: SortMode) -> Self {
        Self {
            sort_mode,
            ..Default::default()
        }
    }

    pub fn from_snapshot(snapshot: &BoardSnapshot, sort_mode: SortMode, now: DateTime<Utc>) -> Self {
        let mut controller = Self::new(sort_mode);
        controller.apply_seed(snapshot, now);
        controller
    }

    // ── Seeding & sorting ─────────────────────────────────────────────

    /// Rebuild the columns from an engine snapshot. During a gesture the
    /// snapshot is held back so it cannot clobber the optimistic layout.
    pub fn seed(&mut self, snapshot: &BoardSnapshot, now: DateTime<Utc>) -> SeedOutcome {
        if self.is_dragging() {
            debug!("Deferring board seed until the active gesture ends");
            self.pending_seed = Some((snapshot.clone(), now));
            return SeedOutcome::Deferred;
        }
        self.apply_seed(snapshot, now);
        SeedOutcome::Applied
    }

    fn apply_seed(&mut self, snapshot: &BoardSnapshot, now: DateTime<Utc>) {
        self.stage_order = snapshot.stage_order().collect();
        for stage_id in snapshot.by_stage.keys() {
            if !self.stage_order.contains(stage_id) {
                self.stage_order.push(*stage_id);
            }
        }
        self.columns = snapshot
            .by_stage
            .iter()
            .map(|(stage_id, deals)| (*stage_id, deals.iter().map(|d| d.id).collect()))
            .collect();
        self.deals = snapshot.deals().map(|d| (d.id, d.clone())).collect();
        self.resort(now);
    }

    /// Change the in-column ordering. While a gesture is active the new
    /// mode only takes effect on the next seed.
    pub fn set_sort_mode(&mut self, mode: SortMode, now: DateTime<Utc>) {
        self.sort_mode = mode;
        if !self.is_dragging() {
            self.resort(now);
        }
    }

    pub fn sort_mode(&self) -> SortMode {
        self.sort_mode
    }

    /// Auto-sort never fights a manual drag.
    pub fn is_sort_suspended(&self) -> bool {
        self.is_dragging() && self.sort_mode != SortMode::Manual
    }

    fn resort(&mut self, now: DateTime<Utc>) {
        let deals = &self.deals;
        for ids in self.columns.values_mut() {
            sort_column(ids, deals, self.sort_mode, now);
        }
    }

    // ── Read-outs ─────────────────────────────────────────────────────

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn gesture(&self) -> Option<&Gesture> {
        match &self.state {
            DragState::Dragging(gesture) => Some(gesture),
            DragState::Idle => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    pub fn stage_order(&self) -> &[StageId] {
        &self.stage_order
    }

    pub fn column(&self, stage_id: StageId) -> &[DealId] {
        self.columns
            .get(&stage_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Columns in catalog order.
    pub fn columns(&self) -> impl Iterator<Item = (StageId, &[DealId])> + '_ {
        self.stage_order.iter().map(|id| (*id, self.column(*id)))
    }

    /// The board's copy of a deal, including any optimistic stage change.
    pub fn deal(&self, deal_id: DealId) -> Option<&Deal> {
        self.deals.get(&deal_id)
    }

    pub fn deals_in(&self, stage_id: StageId) -> Vec<&Deal> {
        self.column(stage_id)
            .iter()
            .filter_map(|id| self.deals.get(id))
            .collect()
    }

    /// Stage whose list currently holds `deal_id`.
    pub fn stage_of(&self, deal_id: DealId) -> Option<StageId> {
        self.stage_order
            .iter()
            .copied()
            .find(|stage_id| self.column(*stage_id).contains(&deal_id))
    }

    /// Resolve a drop/hover target: a stage id is its own container, a deal
    /// id resolves to the stage holding it.
    pub fn find_container(&self, id: Uuid) -> Option<StageId> {
        if self.columns.contains_key(&id) {
            return Some(id);
        }
        self.stage_of(id)
    }

    fn index_in(&self, stage_id: StageId, id: Uuid) -> Option<usize> {
        self.column(stage_id).iter().position(|d| *d == id)
    }

    /// Every seeded deal sits in exactly one column and every listed id is
    /// a known deal.
    pub fn is_consistent(&self) -> bool {
        let mut seen: HashMap<DealId, usize> = HashMap::new();
        for ids in self.columns.values() {
            for id in ids {
                *seen.entry(*id).or_default() += 1;
            }
        }
        seen.len() == self.deals.len()
            && seen
                .iter()
                .all(|(id, count)| *count == 1 && self.deals.contains_key(id))
    }

    // ── Gesture events ────────────────────────────────────────────────

    /// Pick up a deal. An id that is not on the board still enters
    /// `Dragging`, with no origin, so the rest of the gesture is inert.
    pub fn drag_start(&mut self, deal_id: DealId) {
        if let Some(previous) = self.gesture() {
            debug!(
                previous = %previous.dragged_deal_id,
                "drag_start while dragging; abandoning previous gesture"
            );
        }
        let origin = self.stage_of(deal_id);
        let hover_index = origin.and_then(|stage_id| self.index_in(stage_id, deal_id));
        debug!(deal_id = %deal_id, origin = ?origin, "drag start");
        self.state = DragState::Dragging(Gesture {
            dragged_deal_id: deal_id,
            origin_stage_id: origin,
            hover_stage_id: origin,
            hover_index,
            last_valid_hover_stage_id: None,
            last_hover: None,
        });
    }

    /// Hover over a deal or a stage. Returns whether the layout changed.
    pub fn drag_over(&mut self, over_id: Uuid) -> bool {
        let (dragged, last_hover) = match &self.state {
            DragState::Dragging(g) if g.origin_stage_id.is_some() => {
                (g.dragged_deal_id, g.last_hover)
            }
            _ => return false,
        };
        let Some(target) = self.find_container(over_id) else {
            debug!(over = %over_id, "drag over unresolvable target");
            return false;
        };
        let Some(source) = self.stage_of(dragged) else {
            return false;
        };
        let incoming = HoverKey {
            source_stage_id: source,
            target_stage_id: target,
            dragged_deal_id: dragged,
            over_id,
        };
        if last_hover == Some(incoming) {
            return false;
        }

        let anchor = self.index_in(target, over_id);
        let index = self.place_at(dragged, target, anchor);

        if let DragState::Dragging(gesture) = &mut self.state {
            gesture.hover_stage_id = Some(target);
            gesture.hover_index = Some(index);
            gesture.last_valid_hover_stage_id = Some(target);
            gesture.last_hover = Some(HoverKey {
                source_stage_id: target,
                ..incoming
            });
        }
        debug!(deal_id = %dragged, target = %target, index, "drag over");
        true
    }

    /// Release the deal. Always returns to `Idle`.
    pub fn drag_end(&mut self, over_id: Option<Uuid>, now: DateTime<Utc>) -> DragOutcome {
        let gesture = match std::mem::take(&mut self.state) {
            DragState::Dragging(gesture) => gesture,
            DragState::Idle => return DragOutcome::Ignored,
        };
        let outcome = self.settle(&gesture, over_id, now);
        debug!(outcome = ?outcome, "drag end");

        match (&outcome, self.pending_seed.take()) {
            // The move's own completion re-seeds from the authoritative result.
            (DragOutcome::Moved(_), _) => {}
            (_, Some((snapshot, seeded_at))) => self.apply_seed(&snapshot, seeded_at),
            (_, None) => {}
        }
        outcome
    }

    /// A gesture abandoned by the input layer: resolves like a drop over
    /// nothing, falling back to the last valid hover.
    pub fn drag_cancel(&mut self, now: DateTime<Utc>) -> DragOutcome {
        self.drag_end(None, now)
    }

    fn settle(&mut self, gesture: &Gesture, over_id: Option<Uuid>, now: DateTime<Utc>) -> DragOutcome {
        let dragged = gesture.dragged_deal_id;
        let Some(origin) = gesture.origin_stage_id else {
            return DragOutcome::Ignored;
        };
        let target = over_id
            .and_then(|id| self.find_container(id))
            .or(gesture.last_valid_hover_stage_id);
        let Some(target) = target else {
            return DragOutcome::Cancelled { deal_id: dragged };
        };
        let anchor = over_id
            .filter(|id| *id != dragged)
            .and_then(|id| self.index_in(target, id));

        // Re-apply the placement even if hover events got lost on the way;
        // this also purges stray copies from every other column.
        let index = self.index_in(target, dragged).or(anchor).or_else(|| {
            (gesture.hover_stage_id == Some(target))
                .then_some(gesture.hover_index)
                .flatten()
        });
        let index = self.place_at(dragged, target, index);

        if target == origin {
            return DragOutcome::Unchanged {
                deal_id: dragged,
                stage_id: origin,
            };
        }

        if let Some(deal) = self.deals.get_mut(&dragged) {
            deal.stage_changed_at = now;
        }
        DragOutcome::Moved(MoveRequest {
            deal_id: dragged,
            from_stage_id: origin,
            to_stage_id: target,
            index,
            stage_changed_at: now,
        })
    }

    /// Remove `deal_id` from every column, insert it into `target` at
    /// `index` (clamped; append when `None`) and mirror the stage onto the
    /// board's copy of the deal.
    fn place_at(&mut self, deal_id: DealId, target: StageId, index: Option<usize>) -> usize {
        for ids in self.columns.values_mut() {
            ids.retain(|id| *id != deal_id);
        }
        let ids = self.columns.entry(target).or_default();
        let index = index.map_or(ids.len(), |i| i.min(ids.len()));
        ids.insert(index, deal_id);
        if let Some(deal) = self.deals.get_mut(&deal_id) {
            deal.stage_id = target;
        }
        index
    }
}

fn sort_column(ids: &mut [DealId], deals: &HashMap<DealId, Deal>, mode: SortMode, now: DateTime<Utc>) {
    match mode {
        SortMode::Manual => {}
        SortMode::ValueDesc => {
            ids.sort_by_key(|id| deals.get(id).map(|d| std::cmp::Reverse(d.value)))
        }
        SortMode::ValueAsc => ids.sort_by_key(|id| deals.get(id).map(|d| d.value)),
        SortMode::CloseDate => ids.sort_by_key(|id| {
            deals
                .get(id)
                .map(|d| (d.expected_close_date.is_none(), d.expected_close_date))
        }),
        SortMode::DaysInStage => ids.sort_by_key(|id| {
            deals
                .get(id)
                .map(|d| std::cmp::Reverse(days_in_stage(d, now)))
        }),
        SortMode::Name => ids.sort_by_key(|id| deals.get(id).map(|d| d.name.to_lowercase())),
    }
}
