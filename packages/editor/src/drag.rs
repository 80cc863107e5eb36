//! # Drag and drop
//!
//! One [`DragController`] per editor. A drag moves through
//! `Idle -> Dragging -> Hovering -> (drop | cancel) -> Idle`; hovering can
//! fall back to dragging when the pointer leaves a target.
//!
//! The insertion index comes from the pointer's y position: it is the
//! number of sibling midpoints above the pointer. For a handle drag the
//! dragged block is still among those siblings, so a drop in its own
//! container is shifted down by one past the source.

use blockpress_model::{BlockId, Container, Location, COLUMNS_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{EditorError, EditorResult};
use crate::session::EditorSession;

/// What is being dragged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DragSource {
    /// A palette item; dropping it creates a block
    Palette { block_type: String },
    /// An existing block's drag handle; dropping it moves the block
    Block { block_id: BlockId },
}

/// A gap in a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropTarget {
    pub container: Container,
    pub index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging {
        source: DragSource,
    },
    Hovering {
        source: DragSource,
        target: DropTarget,
    },
}

/// Geometry of a container under the pointer, as measured by the host
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerLayout {
    pub container: Container,
    /// Vertical midpoint of each child, top to bottom
    pub sibling_midpoints: Vec<f64>,
}

impl ContainerLayout {
    pub fn new(container: Container, sibling_midpoints: Vec<f64>) -> Self {
        Self {
            container,
            sibling_midpoints,
        }
    }

    /// Gap index for a pointer at `y`
    pub fn index_at(&self, y: f64) -> usize {
        self.sibling_midpoints
            .iter()
            .filter(|midpoint| **midpoint < y)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    Inserted(BlockId),
    Moved { block_id: BlockId, location: Location },
    /// Nothing changed: no target, or the block was dropped where it was
    Cancelled,
}

#[derive(Debug, Default)]
pub struct DragController {
    phase: DragPhase,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &DragPhase {
        &self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase != DragPhase::Idle
    }

    pub fn target(&self) -> Option<&DropTarget> {
        match &self.phase {
            DragPhase::Hovering { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Begin a drag, replacing any drag still in progress
    pub fn start(&mut self, source: DragSource) {
        debug!(?source, "drag started");
        self.phase = DragPhase::Dragging { source };
    }

    /// Pointer moved over a container. Targets the source cannot be dropped
    /// into (a missing container, or a column for a columns block) are
    /// ignored and leave the drag without a target.
    pub fn hover(
        &mut self,
        session: &EditorSession,
        layout: &ContainerLayout,
        y: f64,
    ) -> Option<&DropTarget> {
        let previous = self.target().cloned();
        let source = match std::mem::take(&mut self.phase) {
            DragPhase::Idle => return None,
            DragPhase::Dragging { source } | DragPhase::Hovering { source, .. } => source,
        };

        if !accepts(session, &source, &layout.container) {
            debug!(container = %layout.container, "drop target rejected");
            self.phase = DragPhase::Dragging { source };
            return None;
        }

        let target = DropTarget {
            container: layout.container.clone(),
            index: layout.index_at(y),
        };
        if previous.as_ref() != Some(&target) {
            debug!(container = %target.container, index = target.index, "drag hovering");
        }
        self.phase = DragPhase::Hovering { source, target };
        self.target()
    }

    /// Pointer left every container
    pub fn leave(&mut self) {
        if let DragPhase::Hovering { source, .. } = std::mem::take(&mut self.phase) {
            debug!("drag left target");
            self.phase = DragPhase::Dragging { source };
        }
    }

    pub fn cancel(&mut self) {
        if self.is_active() {
            debug!("drag cancelled");
        }
        self.phase = DragPhase::Idle;
    }

    /// Finish the drag. Without a target nothing happens.
    pub fn drop(&mut self, session: &mut EditorSession) -> EditorResult<DropOutcome> {
        let (source, target) = match std::mem::take(&mut self.phase) {
            DragPhase::Hovering { source, target } => (source, target),
            _ => {
                debug!("drag dropped outside any target");
                return Ok(DropOutcome::Cancelled);
            }
        };

        let outcome = match source {
            DragSource::Palette { block_type } => {
                let id = match &target.container {
                    Container::Root => session.add_at(&block_type, target.index)?,
                    Container::Column { parent, column } => session.insert_into_column(
                        &block_type,
                        parent,
                        *column,
                        Some(target.index),
                    )?,
                };
                DropOutcome::Inserted(id)
            }
            DragSource::Block { block_id } => {
                let from = session.tree().locate(&block_id).map_err(EditorError::from);
                let from = session.guard(from)?;
                let mut index = target.index;
                if from.container == target.container && index > from.index {
                    index -= 1;
                }
                if from.container == target.container && index == from.index {
                    DropOutcome::Cancelled
                } else {
                    let location = session.move_block(&block_id, &target.container, index)?;
                    DropOutcome::Moved { block_id, location }
                }
            }
        };

        debug!(?outcome, "drag dropped");
        Ok(outcome)
    }
}

fn accepts(session: &EditorSession, source: &DragSource, container: &Container) -> bool {
    if session.tree().validate_container(container).is_err() {
        return false;
    }
    let Container::Column { parent, .. } = container else {
        return true;
    };
    match source {
        DragSource::Palette { block_type } => block_type != COLUMNS_TYPE,
        DragSource::Block { block_id } => {
            block_id != parent && session.tree().columns_block(block_id).is_none()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::pipeline::RenderPatch;
    use blockpress_model::{BlockRegistry, BlockTree};

    fn session() -> EditorSession {
        EditorSession::new(
            "5",
            BlockTree::new(),
            BlockRegistry::builtin(),
            EditorConfig::default(),
        )
    }

    fn root_layout(count: usize) -> ContainerLayout {
        let midpoints = (0..count).map(|i| i as f64 * 100.0 + 50.0).collect();
        ContainerLayout::new(Container::Root, midpoints)
    }

    #[test]
    fn test_index_from_midpoints() {
        let layout = root_layout(3);
        assert_eq!(layout.index_at(0.0), 0);
        assert_eq!(layout.index_at(60.0), 1);
        assert_eq!(layout.index_at(149.0), 1);
        assert_eq!(layout.index_at(999.0), 3);
    }

    #[test]
    fn test_palette_drop_inserts_at_gap() {
        let mut session = session();
        let a = session.add("paragraph", None).unwrap();
        let b = session.add("paragraph", None).unwrap();
        let mut drag = DragController::new();

        drag.start(DragSource::Palette { block_type: "image".to_string() });
        drag.hover(&session, &root_layout(2), 75.0);
        let outcome = drag.drop(&mut session).unwrap();

        let DropOutcome::Inserted(image) = outcome else {
            panic!("expected an insert, got {:?}", outcome);
        };
        assert_eq!(
            session.tree().container_ids(&Container::Root).unwrap(),
            vec![a, image, b]
        );
        assert_eq!(drag.phase(), &DragPhase::Idle);
    }

    #[test]
    fn test_handle_drop_moves_down() {
        let mut session = session();
        let a = session.add("paragraph", None).unwrap();
        let b = session.add("paragraph", None).unwrap();
        let c = session.add("paragraph", None).unwrap();
        let mut drag = DragController::new();

        drag.start(DragSource::Block { block_id: a.clone() });
        drag.hover(&session, &root_layout(3), 200.0);
        let outcome = drag.drop(&mut session).unwrap();

        assert!(matches!(outcome, DropOutcome::Moved { ref block_id, .. } if block_id == &a));
        assert_eq!(
            session.tree().container_ids(&Container::Root).unwrap(),
            vec![b, a, c]
        );
    }

    #[test]
    fn test_drop_of_deleted_block_forces_full_render() {
        let mut session = session();
        let a = session.add("paragraph", None).unwrap();
        session.add("paragraph", None).unwrap();
        let mut drag = DragController::new();

        drag.start(DragSource::Block { block_id: a.clone() });
        drag.hover(&session, &root_layout(2), 200.0);
        session.delete(&a).unwrap();
        session.render();

        let err = drag.drop(&mut session).unwrap_err();

        assert!(err.is_block_not_found());
        assert_eq!(drag.phase(), &DragPhase::Idle);
        assert!(matches!(session.render().as_slice(), [RenderPatch::Full(_)]));
    }

    #[test]
    fn test_drop_in_place_is_cancelled() {
        let mut session = session();
        session.add("paragraph", None).unwrap();
        let b = session.add("paragraph", None).unwrap();
        let levels = session.undo_stack().undo_levels();
        let mut drag = DragController::new();

        drag.start(DragSource::Block { block_id: b });
        drag.hover(&session, &root_layout(2), 120.0);
        assert_eq!(drag.drop(&mut session).unwrap(), DropOutcome::Cancelled);
        assert_eq!(session.undo_stack().undo_levels(), levels);
    }

    #[test]
    fn test_drop_without_target_is_noop() {
        let mut session = session();
        let a = session.add("paragraph", None).unwrap();
        let mut drag = DragController::new();

        drag.start(DragSource::Block { block_id: a.clone() });
        drag.hover(&session, &root_layout(1), 0.0);
        drag.leave();
        assert!(drag.target().is_none());

        assert_eq!(drag.drop(&mut session).unwrap(), DropOutcome::Cancelled);
        assert_eq!(session.tree().container_ids(&Container::Root).unwrap(), vec![a]);
    }

    #[test]
    fn test_columns_cannot_target_columns() {
        let mut session = session();
        let cols = session.add("columns", None).unwrap();
        let layout = ContainerLayout::new(Container::column(cols.clone(), 0), vec![]);
        let mut drag = DragController::new();

        drag.start(DragSource::Block { block_id: cols.clone() });
        assert!(drag.hover(&session, &layout, 10.0).is_none());

        drag.start(DragSource::Palette { block_type: "columns".to_string() });
        assert!(drag.hover(&session, &layout, 10.0).is_none());

        drag.start(DragSource::Palette { block_type: "paragraph".to_string() });
        assert!(drag.hover(&session, &layout, 10.0).is_some());
        let DropOutcome::Inserted(id) = drag.drop(&mut session).unwrap() else {
            panic!("expected an insert");
        };
        assert_eq!(
            session.tree().locate(&id).unwrap().container,
            Container::column(cols, 0)
        );
    }

    #[test]
    fn test_cross_container_move() {
        let mut session = session();
        let cols = session.add("columns", None).unwrap();
        let p = session.add("paragraph", None).unwrap();
        let mut drag = DragController::new();

        drag.start(DragSource::Block { block_id: p.clone() });
        drag.hover(
            &session,
            &ContainerLayout::new(Container::column(cols.clone(), 1), vec![]),
            5.0,
        );
        drag.drop(&mut session).unwrap();

        assert_eq!(session.tree().len(), 1);
        assert_eq!(
            session.tree().locate(&p).unwrap().container,
            Container::column(cols, 1)
        );
    }
}
