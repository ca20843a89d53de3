//! Bounded undo/redo history.
//!
//! `commands[..cursor]` is the undo stack, `commands[cursor..]` the redo
//! stack. Executing a new command drops the redo tail. When the history
//! outgrows `max_size` the oldest entry is evicted.

use crate::commands::{Command, CommandError};
use crate::config::HistoryConfig;
use crate::events::{ListenerId, Listeners};
use diagram_core::DiagramModel;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HistoryError {
    #[error("command rejected: {0}")]
    Rejected(String),

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    #[error(transparent)]
    Command(#[from] CommandError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryEventKind {
    Executed,
    /// The newest entry absorbed the incoming command.
    Merged,
    Undone,
    Redone,
    Cleared,
}

/// Sent to history listeners after every successful change.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEvent {
    pub kind: HistoryEventKind,
    pub can_undo: bool,
    pub can_redo: bool,
    pub len: usize,
    /// Description of the command involved, if any.
    pub description: Option<String>,
}

#[derive(Debug)]
pub struct CommandHistory {
    commands: Vec<Command>,
    cursor: usize,
    config: HistoryConfig,
    listeners: Listeners<HistoryEvent>,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl CommandHistory {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            commands: Vec::with_capacity(config.max_size.min(256)),
            cursor: 0,
            config,
            listeners: Listeners::new(),
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Execute `command` and record it. Returns `false` (and logs why) if
    /// it was rejected or failed; the history is then unchanged.
    pub fn execute(&mut self, command: Command, model: &mut dyn DiagramModel) -> bool {
        self.try_execute(command, model)
            .inspect_err(|e| log::warn!("history: {e}"))
            .is_ok()
    }

    pub fn try_execute(
        &mut self,
        mut command: Command,
        model: &mut dyn DiagramModel,
    ) -> Result<HistoryEventKind, HistoryError> {
        if !command.validate(model) {
            return Err(HistoryError::Rejected(command.description()));
        }

        if self.config.merge_enabled
            && self.cursor == self.commands.len()
            && let Some(last) = self.commands.last_mut()
            && let Some(mut merged) = last.try_merge(&command, self.config.merge_window)
        {
            last.undo(model)?;
            if !merged.validate(model) {
                // Moved back to where it started: nothing left to record.
                log::debug!("history: dropped {}", last.description());
                self.commands.pop();
                self.cursor -= 1;
                self.notify(HistoryEventKind::Merged);
                return Ok(HistoryEventKind::Merged);
            }
            if let Err(e) = merged.execute(model) {
                if let Err(restore) = last.execute(model) {
                    log::warn!("history: could not restore {}: {restore}", last.description());
                }
                return Err(e.into());
            }
            log::debug!("history: merged {}", merged.description());
            *last = merged;
            self.notify(HistoryEventKind::Merged);
            return Ok(HistoryEventKind::Merged);
        }

        command.execute(model)?;
        log::debug!("history: executed {}", command.description());

        self.commands.truncate(self.cursor);
        self.commands.push(command);
        self.cursor += 1;
        if self.commands.len() > self.config.max_size {
            let evicted = self.commands.remove(0);
            self.cursor -= 1;
            log::debug!("history: evicted {}", evicted.description());
        }
        self.notify(HistoryEventKind::Executed);
        Ok(HistoryEventKind::Executed)
    }

    pub fn undo(&mut self, model: &mut dyn DiagramModel) -> bool {
        self.try_undo(model)
            .inspect_err(|e| log::warn!("history: undo failed: {e}"))
            .is_ok()
    }

    pub fn try_undo(&mut self, model: &mut dyn DiagramModel) -> Result<(), HistoryError> {
        if self.cursor == 0 {
            return Err(HistoryError::NothingToUndo);
        }
        self.commands[self.cursor - 1].undo(model)?;
        self.cursor -= 1;
        log::debug!("history: undid {}", self.commands[self.cursor].description());
        self.notify(HistoryEventKind::Undone);
        Ok(())
    }

    pub fn redo(&mut self, model: &mut dyn DiagramModel) -> bool {
        self.try_redo(model)
            .inspect_err(|e| log::warn!("history: redo failed: {e}"))
            .is_ok()
    }

    pub fn try_redo(&mut self, model: &mut dyn DiagramModel) -> Result<(), HistoryError> {
        if self.cursor == self.commands.len() {
            return Err(HistoryError::NothingToRedo);
        }
        self.commands[self.cursor].execute(model)?;
        self.cursor += 1;
        log::debug!("history: redid {}", self.commands[self.cursor - 1].description());
        self.notify(HistoryEventKind::Redone);
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.commands.len()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of applied commands. `cursor() - 1` is the newest applied entry.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn entries(&self) -> &[Command] {
        &self.commands
    }

    pub fn undo_description(&self) -> Option<String> {
        self.cursor
            .checked_sub(1)
            .map(|i| self.commands[i].description())
    }

    pub fn redo_description(&self) -> Option<String> {
        self.commands.get(self.cursor).map(Command::description)
    }

    /// Forget every entry. The model is left as it is.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.cursor = 0;
        self.notify(HistoryEventKind::Cleared);
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&HistoryEvent) + 'static) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn notify(&mut self, kind: HistoryEventKind) {
        let description = match kind {
            HistoryEventKind::Undone => self.redo_description(),
            HistoryEventKind::Cleared => None,
            _ => self.undo_description(),
        };
        let event = HistoryEvent {
            kind,
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            len: self.commands.len(),
            description,
        };
        self.listeners.emit(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandKind;
    use diagram_core::{DiagramGraph, DiagramNode, NodeId, Point};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    fn n(id: &str) -> NodeId {
        NodeId::intern(id)
    }

    fn add(id: &str, x: f64, y: f64) -> Command {
        Command::new(CommandKind::add_node(DiagramNode::new(n(id), Point::new(x, y))))
    }

    fn history(max_size: usize) -> CommandHistory {
        CommandHistory::new(HistoryConfig {
            max_size,
            ..HistoryConfig::default()
        })
    }

    #[test]
    fn incremental_moves_merge_into_one_entry() {
        let mut g = DiagramGraph::new();
        let mut h = CommandHistory::default();
        assert!(h.execute(add("h_n1", 10.0, 10.0), &mut g));

        let t0 = Instant::now();
        for step in 1..=5u64 {
            let p = 10.0 + 8.0 * step as f64;
            let cmd = Command::at(
                CommandKind::move_node(n("h_n1"), Point::new(p, p)),
                t0 + Duration::from_millis(step * 50),
            );
            assert!(h.execute(cmd, &mut g));
        }
        assert_eq!(g.node(n("h_n1")).unwrap().position, Point::new(50.0, 50.0));
        assert_eq!(h.len(), 2);

        assert!(h.undo(&mut g));
        assert_eq!(g.node(n("h_n1")).unwrap().position, Point::new(10.0, 10.0));
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn moving_back_to_the_start_drops_the_entry() {
        let mut g = DiagramGraph::new();
        let mut h = CommandHistory::default();
        h.execute(add("h_back", 0.0, 0.0), &mut g);
        let t0 = Instant::now();
        let kinds: Vec<HistoryEventKind> = [(30.0, 0), (0.0, 50)]
            .into_iter()
            .map(|(x, ms)| {
                let cmd = Command::at(
                    CommandKind::move_node(n("h_back"), Point::new(x, 0.0)),
                    t0 + Duration::from_millis(ms),
                );
                h.try_execute(cmd, &mut g).unwrap()
            })
            .collect();

        assert_eq!(kinds, vec![HistoryEventKind::Executed, HistoryEventKind::Merged]);
        assert_eq!(g.node(n("h_back")).unwrap().position, Point::ZERO);
        assert_eq!(h.len(), 1);
        assert_eq!(h.cursor(), 1);
        assert!(!h.can_redo());

        // A later move starts a fresh entry.
        assert!(h.execute(
            Command::at(CommandKind::move_node(n("h_back"), Point::new(5.0, 0.0)), t0),
            &mut g,
        ));
        assert_eq!(h.len(), 2);
        assert!(h.undo(&mut g));
        assert!(h.undo(&mut g));
        assert!(!g.contains_node(n("h_back")));
    }

    #[test]
    fn moves_outside_window_stay_separate() {
        let mut g = DiagramGraph::new();
        let mut h = CommandHistory::default();
        h.execute(add("h_sep", 0.0, 0.0), &mut g);
        let t0 = Instant::now();
        h.execute(
            Command::at(CommandKind::move_node(n("h_sep"), Point::new(1.0, 0.0)), t0),
            &mut g,
        );
        h.execute(
            Command::at(
                CommandKind::move_node(n("h_sep"), Point::new(2.0, 0.0)),
                t0 + Duration::from_secs(2),
            ),
            &mut g,
        );
        assert_eq!(h.len(), 3);
    }

    #[test]
    fn merging_can_be_disabled() {
        let mut g = DiagramGraph::new();
        let mut h = CommandHistory::new(HistoryConfig {
            merge_enabled: false,
            ..HistoryConfig::default()
        });
        h.execute(add("h_nomerge", 0.0, 0.0), &mut g);
        for x in 1..=3 {
            h.execute(
                Command::new(CommandKind::move_node(n("h_nomerge"), Point::new(f64::from(x), 0.0))),
                &mut g,
            );
        }
        assert_eq!(h.len(), 4);
    }

    #[test]
    fn oldest_entries_are_evicted() {
        let mut g = DiagramGraph::new();
        let mut h = history(3);
        for i in 0..5 {
            assert!(h.execute(add(&format!("h_ev{i}"), 0.0, 0.0), &mut g));
        }
        assert_eq!(h.len(), 3);
        assert_eq!(h.cursor(), 3);

        while h.undo(&mut g) {}
        // State after the 2nd command: the first two adds survive.
        assert!(g.contains_node(n("h_ev0")));
        assert!(g.contains_node(n("h_ev1")));
        assert!(!g.contains_node(n("h_ev2")));
    }

    #[test]
    fn new_command_discards_redo_tail() {
        let mut g = DiagramGraph::new();
        let mut h = CommandHistory::default();
        h.execute(add("h_t1", 0.0, 0.0), &mut g);
        h.execute(add("h_t2", 0.0, 0.0), &mut g);
        h.undo(&mut g);
        assert!(h.can_redo());
        assert_eq!(h.redo_description().as_deref(), Some("Add h_t2"));

        h.execute(add("h_t3", 0.0, 0.0), &mut g);
        assert!(!h.can_redo());
        assert_eq!(h.len(), 2);
        assert!(!h.redo(&mut g));
    }

    #[test]
    fn rejected_command_leaves_history_untouched() {
        let mut g = DiagramGraph::new();
        let mut h = CommandHistory::default();
        h.execute(add("h_dup", 0.0, 0.0), &mut g);
        assert!(!h.execute(add("h_dup", 5.0, 5.0), &mut g));
        assert_eq!(
            h.try_execute(add("h_dup", 5.0, 5.0), &mut g),
            Err(HistoryError::Rejected("Add h_dup".into()))
        );
        assert_eq!(h.len(), 1);
        assert_eq!(h.cursor(), 1);
        assert_eq!(h.try_redo(&mut g), Err(HistoryError::NothingToRedo));
    }

    #[test]
    fn undo_redo_round_trip() {
        let mut g = DiagramGraph::new();
        let mut h = CommandHistory::default();
        h.execute(add("h_rt", 3.0, 4.0), &mut g);
        assert!(h.undo(&mut g));
        assert!(!g.contains_node(n("h_rt")));
        assert!(!h.undo(&mut g));
        assert!(h.redo(&mut g));
        assert_eq!(g.node(n("h_rt")).unwrap().position, Point::new(3.0, 4.0));
    }

    #[test]
    fn listeners_see_every_change() {
        let mut g = DiagramGraph::new();
        let mut h = CommandHistory::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = h.subscribe(move |e: &HistoryEvent| sink.borrow_mut().push((e.kind, e.can_undo, e.can_redo)));

        h.execute(add("h_l", 0.0, 0.0), &mut g);
        h.undo(&mut g);
        h.redo(&mut g);
        h.clear();
        assert!(h.unsubscribe(id));
        h.execute(add("h_l2", 0.0, 0.0), &mut g);

        assert_eq!(
            *seen.borrow(),
            vec![
                (HistoryEventKind::Executed, true, false),
                (HistoryEventKind::Undone, false, true),
                (HistoryEventKind::Redone, true, false),
                (HistoryEventKind::Cleared, false, false),
            ]
        );
    }
}
