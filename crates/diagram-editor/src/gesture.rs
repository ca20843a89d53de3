//! Gesture state machine: raw pointer/touch primitives → semantic actions.
//!
//! The machine is a pure classifier. It never sees the diagram; the caller
//! hands it positions (screen px), timestamps (ms) and the hit-test result of
//! the press. Whatever it returns is what the active tool gets to act on.
//!
//! ```text
//! Idle ──down──▶ MouseDown ──move > threshold──▶ Dragging ──up──▶ Idle (DragEnd)
//!                    └──────────up────────────▶ Idle (Click | DoubleClick |
//!                                                BackgroundClick | RightClick | MiddleClick)
//! Idle ──touch──▶ Touching ──move > threshold──▶ Dragging ──end──▶ Idle (DragEnd)
//!                    ├──────────end───────────▶ Idle (Tap | DoubleTap)
//!                    └──second touch──▶ MultiTouch ──all ended──▶ Idle
//! ```

use crate::config::GestureConfig;
use crate::input::{Modifiers, PointerButton};
use diagram_core::{Point, Vec2};
use diagram_render::Hit;
use smallvec::{SmallVec, smallvec};
use std::collections::VecDeque;

/// Interaction records kept for diagnostics.
pub const GESTURE_HISTORY_LIMIT: usize = 100;

/// Up to two actions can come out of one primitive (`DragStart` + `Drag`).
pub type Actions = SmallVec<[Action; 2]>;

// ─── Gesture data ────────────────────────────────────────────────────────

/// Captured at mouse-down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseDownData {
    pub position: Point,
    pub button: PointerButton,
    pub target: Option<Hit>,
    pub modifiers: Modifiers,
    pub timestamp: u64,
}

/// Running state of a drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragData {
    pub start: Point,
    pub current: Point,
    /// `current - start`, screen px.
    pub delta: Vec2,
    /// Straight-line length of `delta`.
    pub distance: f64,
    /// Hit target of the press that started the drag.
    pub target: Option<Hit>,
    pub button: PointerButton,
    pub modifiers: Modifiers,
    /// Milliseconds since the press.
    pub duration: u64,
}

/// A classified click or tap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickData {
    pub position: Point,
    pub button: PointerButton,
    pub target: Option<Hit>,
    pub modifiers: Modifiers,
    /// Milliseconds between press and release.
    pub duration: u64,
    pub double_click: bool,
}

/// Active touch gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchData {
    pub start: Point,
    pub target: Option<Hit>,
    /// Fingers currently down.
    pub touch_count: usize,
    /// Touch id that drives single-finger gestures.
    pub primary: u64,
    pub timestamp: u64,
}

/// Which device is driving a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragSource {
    Mouse,
    Touch(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    MouseDown(MouseDownData),
    Dragging {
        drag: DragData,
        source: DragSource,
        started_at: u64,
    },
    Touching(TouchData),
    MultiTouch(TouchData),
}

impl GestureState {
    pub fn name(&self) -> &'static str {
        match self {
            GestureState::Idle => "idle",
            GestureState::MouseDown(_) => "mouseDown",
            GestureState::Dragging { .. } => "dragging",
            GestureState::Touching(_) => "touching",
            GestureState::MultiTouch(_) => "multiTouch",
        }
    }
}

// ─── Actions ─────────────────────────────────────────────────────────────

/// A classified interaction. The set is closed; tools get one handler each.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Click(ClickData),
    DoubleClick(ClickData),
    BackgroundClick(ClickData),
    RightClick(ClickData),
    MiddleClick(ClickData),
    Tap(ClickData),
    DoubleTap(ClickData),
    DragStart(DragData),
    Drag(DragData),
    DragEnd(DragData),
    DragCancel(DragData),
    MultiTouchStart { touches: usize },
    MultiTouchEnd,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Click(_) => "click",
            Action::DoubleClick(_) => "doubleClick",
            Action::BackgroundClick(_) => "backgroundClick",
            Action::RightClick(_) => "rightClick",
            Action::MiddleClick(_) => "middleClick",
            Action::Tap(_) => "tap",
            Action::DoubleTap(_) => "doubleTap",
            Action::DragStart(_) => "dragStart",
            Action::Drag(_) => "drag",
            Action::DragEnd(_) => "dragEnd",
            Action::DragCancel(_) => "dragCancel",
            Action::MultiTouchStart { .. } => "multiTouchStart",
            Action::MultiTouchEnd => "multiTouchEnd",
        }
    }

    pub fn click(&self) -> Option<&ClickData> {
        match self {
            Action::Click(c)
            | Action::DoubleClick(c)
            | Action::BackgroundClick(c)
            | Action::RightClick(c)
            | Action::MiddleClick(c)
            | Action::Tap(c)
            | Action::DoubleTap(c) => Some(c),
            _ => None,
        }
    }

    pub fn drag(&self) -> Option<&DragData> {
        match self {
            Action::DragStart(d) | Action::Drag(d) | Action::DragEnd(d) | Action::DragCancel(d) => {
                Some(d)
            }
            _ => None,
        }
    }
}

// ─── Diagnostics ─────────────────────────────────────────────────────────

/// Cumulative counters for the session. Only ever increase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GestureStatistics {
    pub clicks: u64,
    pub double_clicks: u64,
    pub background_clicks: u64,
    pub right_clicks: u64,
    pub middle_clicks: u64,
    pub taps: u64,
    pub double_taps: u64,
    pub drags: u64,
    pub cancelled_drags: u64,
    pub multi_touches: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureRecord {
    pub timestamp: u64,
    pub action: Action,
}

/// The last left click (or tap), for double-click detection.
#[derive(Debug, Clone, Copy)]
struct LastClick {
    position: Point,
    timestamp: u64,
}

// ─── State machine ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GestureStateMachine {
    config: GestureConfig,
    state: GestureState,
    last_click: Option<LastClick>,
    last_tap: Option<LastClick>,
    stats: GestureStatistics,
    history: VecDeque<GestureRecord>,
}

impl Default for GestureStateMachine {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

impl GestureStateMachine {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            state: GestureState::Idle,
            last_click: None,
            last_tap: None,
            stats: GestureStatistics::default(),
            history: VecDeque::with_capacity(GESTURE_HISTORY_LIMIT),
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, GestureState::Idle)
    }

    pub fn statistics(&self) -> GestureStatistics {
        self.stats
    }

    /// Recent classified actions, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &GestureRecord> {
        self.history.iter()
    }

    // ── Mouse ──

    /// Start a press. Ignored unless idle: one gesture at a time.
    pub fn mouse_down(
        &mut self,
        position: Point,
        button: PointerButton,
        target: Option<Hit>,
        modifiers: Modifiers,
        timestamp: u64,
    ) -> Actions {
        if !self.is_idle() {
            log::trace!("mouse_down ignored in state {}", self.state.name());
            return Actions::new();
        }
        self.transition(GestureState::MouseDown(MouseDownData {
            position,
            button,
            target,
            modifiers,
            timestamp,
        }));
        Actions::new()
    }

    pub fn mouse_move(&mut self, position: Point, modifiers: Modifiers, timestamp: u64) -> Actions {
        match self.state {
            GestureState::MouseDown(down) => {
                if (position - down.position).hypot() <= self.config.drag_threshold {
                    // Still a pending click.
                    return Actions::new();
                }
                let drag = DragData {
                    start: down.position,
                    current: position,
                    delta: position - down.position,
                    distance: (position - down.position).hypot(),
                    target: down.target,
                    button: down.button,
                    modifiers,
                    duration: timestamp.saturating_sub(down.timestamp),
                };
                self.transition(GestureState::Dragging {
                    drag,
                    source: DragSource::Mouse,
                    started_at: down.timestamp,
                });
                self.stats.drags += 1;
                let actions: Actions = smallvec![Action::DragStart(drag), Action::Drag(drag)];
                self.record_all(&actions, timestamp);
                actions
            }
            GestureState::Dragging {
                source: DragSource::Mouse,
                ..
            } => self.continue_drag(position, Some(modifiers), timestamp),
            _ => Actions::new(),
        }
    }

    pub fn mouse_up(
        &mut self,
        position: Point,
        modifiers: Modifiers,
        timestamp: u64,
    ) -> Actions {
        match self.state {
            GestureState::MouseDown(down) => {
                self.transition(GestureState::Idle);
                let action = self.classify_click(down, modifiers, timestamp);
                self.record(action, timestamp);
                smallvec![action]
            }
            GestureState::Dragging {
                source: DragSource::Mouse,
                ..
            } => {
                let mut actions = self.continue_drag(position, Some(modifiers), timestamp);
                actions.clear();
                let action = self.finish_drag(timestamp);
                actions.extend(action);
                actions
            }
            _ => Actions::new(),
        }
    }

    // ── Touch ──

    pub fn touch_start(
        &mut self,
        id: u64,
        position: Point,
        target: Option<Hit>,
        timestamp: u64,
    ) -> Actions {
        match self.state {
            GestureState::Idle => {
                self.transition(GestureState::Touching(TouchData {
                    start: position,
                    target,
                    touch_count: 1,
                    primary: id,
                    timestamp,
                }));
                Actions::new()
            }
            GestureState::Touching(touch) => self.enter_multi_touch(touch, None, timestamp),
            GestureState::Dragging {
                drag,
                source: DragSource::Touch(primary),
                started_at,
            } => {
                let touch = TouchData {
                    start: drag.start,
                    target: drag.target,
                    touch_count: 1,
                    primary,
                    timestamp: started_at,
                };
                let ended = self.finish_drag(timestamp);
                self.enter_multi_touch(touch, ended, timestamp)
            }
            GestureState::MultiTouch(mut touch) => {
                touch.touch_count += 1;
                self.state = GestureState::MultiTouch(touch);
                Actions::new()
            }
            GestureState::MouseDown(_) | GestureState::Dragging { .. } => Actions::new(),
        }
    }

    pub fn touch_move(&mut self, id: u64, position: Point, timestamp: u64) -> Actions {
        match self.state {
            GestureState::Touching(touch) if touch.primary == id => {
                if (position - touch.start).hypot() <= self.config.drag_threshold {
                    return Actions::new();
                }
                let drag = DragData {
                    start: touch.start,
                    current: position,
                    delta: position - touch.start,
                    distance: (position - touch.start).hypot(),
                    target: touch.target,
                    button: PointerButton::Primary,
                    modifiers: Modifiers::NONE,
                    duration: timestamp.saturating_sub(touch.timestamp),
                };
                self.transition(GestureState::Dragging {
                    drag,
                    source: DragSource::Touch(id),
                    started_at: touch.timestamp,
                });
                self.stats.drags += 1;
                let actions: Actions = smallvec![Action::DragStart(drag), Action::Drag(drag)];
                self.record_all(&actions, timestamp);
                actions
            }
            GestureState::Dragging {
                source: DragSource::Touch(primary),
                ..
            } if primary == id => self.continue_drag(position, None, timestamp),
            _ => Actions::new(),
        }
    }

    pub fn touch_end(&mut self, id: u64, position: Point, timestamp: u64) -> Actions {
        match self.state {
            GestureState::Touching(touch) if touch.primary == id => {
                self.transition(GestureState::Idle);
                let action = self.classify_tap(touch, position, timestamp);
                self.record(action, timestamp);
                smallvec![action]
            }
            GestureState::Dragging {
                source: DragSource::Touch(primary),
                ..
            } if primary == id => {
                self.continue_drag(position, None, timestamp);
                self.finish_drag(timestamp).into_iter().collect()
            }
            GestureState::MultiTouch(mut touch) => {
                touch.touch_count = touch.touch_count.saturating_sub(1);
                if touch.touch_count > 0 {
                    self.state = GestureState::MultiTouch(touch);
                    return Actions::new();
                }
                self.transition(GestureState::Idle);
                self.record(Action::MultiTouchEnd, timestamp);
                smallvec![Action::MultiTouchEnd]
            }
            _ => Actions::new(),
        }
    }

    // ── Cancellation ──

    /// Abandon the current gesture (Escape, pointer capture lost).
    /// A drag in progress ends with `DragCancel`; anything else just resets.
    pub fn cancel(&mut self, timestamp: u64) -> Actions {
        let previous = std::mem::take(&mut self.state);
        log::trace!("gesture cancelled in state {}", previous.name());
        match previous {
            GestureState::Dragging { drag, .. } => {
                self.stats.cancelled_drags += 1;
                let action = Action::DragCancel(drag);
                self.record(action, timestamp);
                smallvec![action]
            }
            _ => Actions::new(),
        }
    }

    // ── Internals ──

    fn transition(&mut self, next: GestureState) {
        log::trace!("gesture {} → {}", self.state.name(), next.name());
        self.state = next;
    }

    fn continue_drag(
        &mut self,
        position: Point,
        modifiers: Option<Modifiers>,
        timestamp: u64,
    ) -> Actions {
        let GestureState::Dragging {
            mut drag,
            source,
            started_at,
        } = self.state
        else {
            return Actions::new();
        };
        drag.current = position;
        drag.delta = position - drag.start;
        drag.distance = drag.delta.hypot();
        drag.duration = timestamp.saturating_sub(started_at);
        if let Some(modifiers) = modifiers {
            drag.modifiers = modifiers;
        }
        self.state = GestureState::Dragging {
            drag,
            source,
            started_at,
        };
        let action = Action::Drag(drag);
        self.record(action, timestamp);
        smallvec![action]
    }

    fn finish_drag(&mut self, timestamp: u64) -> Option<Action> {
        let GestureState::Dragging { drag, .. } = self.state else {
            return None;
        };
        self.transition(GestureState::Idle);
        let action = Action::DragEnd(drag);
        self.record(action, timestamp);
        Some(action)
    }

    fn enter_multi_touch(
        &mut self,
        mut touch: TouchData,
        ended_drag: Option<Action>,
        timestamp: u64,
    ) -> Actions {
        touch.touch_count += 1;
        self.transition(GestureState::MultiTouch(touch));
        self.stats.multi_touches += 1;
        let start = Action::MultiTouchStart {
            touches: touch.touch_count,
        };
        self.record(start, timestamp);
        let mut actions: Actions = ended_drag.into_iter().collect();
        actions.push(start);
        actions
    }

    fn is_repeat(&self, last: Option<LastClick>, position: Point, timestamp: u64) -> bool {
        last.is_some_and(|last| {
            timestamp.saturating_sub(last.timestamp) <= self.config.double_click_threshold
                && (position - last.position).hypot() <= self.config.drag_threshold
        })
    }

    /// Classify a release under the drag threshold. The press target wins
    /// over wherever the pointer happens to be on release.
    fn classify_click(&mut self, down: MouseDownData, modifiers: Modifiers, timestamp: u64) -> Action {
        let mut click = ClickData {
            position: down.position,
            button: down.button,
            target: down.target,
            modifiers,
            duration: timestamp.saturating_sub(down.timestamp),
            double_click: false,
        };
        match down.button {
            PointerButton::Secondary => {
                self.stats.right_clicks += 1;
                Action::RightClick(click)
            }
            PointerButton::Middle => {
                self.stats.middle_clicks += 1;
                Action::MiddleClick(click)
            }
            PointerButton::Primary if down.target.is_none() => {
                self.last_click = None;
                self.stats.background_clicks += 1;
                Action::BackgroundClick(click)
            }
            PointerButton::Primary => {
                self.stats.clicks += 1;
                if self.is_repeat(self.last_click, down.position, timestamp) {
                    self.last_click = None;
                    self.stats.double_clicks += 1;
                    click.double_click = true;
                    Action::DoubleClick(click)
                } else {
                    self.last_click = Some(LastClick {
                        position: down.position,
                        timestamp,
                    });
                    Action::Click(click)
                }
            }
        }
    }

    fn classify_tap(&mut self, touch: TouchData, position: Point, timestamp: u64) -> Action {
        let mut tap = ClickData {
            position: touch.start,
            button: PointerButton::Primary,
            target: touch.target,
            modifiers: Modifiers::NONE,
            duration: timestamp.saturating_sub(touch.timestamp),
            double_click: false,
        };
        self.stats.taps += 1;
        if self.is_repeat(self.last_tap, position, timestamp) {
            self.last_tap = None;
            self.stats.double_taps += 1;
            tap.double_click = true;
            Action::DoubleTap(tap)
        } else {
            self.last_tap = Some(LastClick {
                position,
                timestamp,
            });
            Action::Tap(tap)
        }
    }

    fn record(&mut self, action: Action, timestamp: u64) {
        if self.history.len() == GESTURE_HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(GestureRecord { timestamp, action });
    }

    fn record_all(&mut self, actions: &[Action], timestamp: u64) {
        for action in actions {
            self.record(*action, timestamp);
        }
    }
}
