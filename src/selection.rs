use log::debug;

use crate::model::{Connection, ConnectionId, Network, Neuron, NeuronId};
use crate::mutation;

/// What the user has picked. At most one thing at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Neuron(NeuronId),
    Connection(ConnectionId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKind {
    Neuron,
    Connection,
}

/// A finished editor value waiting to be written back.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    Neuron(Neuron),
    Connection(Connection),
}

impl Edit {
    pub fn kind(&self) -> EditorKind {
        match self {
            Edit::Neuron(_) => EditorKind::Neuron,
            Edit::Connection(_) => EditorKind::Connection,
        }
    }
}

/// Session-scoped selection and edit-mode state.
///
/// Holds `active_editor.is_some()` only while edit mode is on and the
/// selection is of the editor's kind. Transitions that would break this are
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionState {
    selection: Selection,
    edit_mode: bool,
    active_editor: Option<EditorKind>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn active_editor(&self) -> Option<EditorKind> {
        self.active_editor
    }

    pub fn selected_neuron<'a>(&self, network: &'a Network) -> Option<&'a Neuron> {
        match self.selection {
            Selection::Neuron(id) => network.find_neuron(id),
            _ => None,
        }
    }

    pub fn selected_connection<'a>(&self, network: &'a Network) -> Option<&'a Connection> {
        match &self.selection {
            Selection::Connection(id) => network.find_connection(id),
            _ => None,
        }
    }

    /// Picks a neuron, or clears the selection if it was already picked.
    pub fn select_neuron(&mut self, id: NeuronId) {
        let next = if self.selection == Selection::Neuron(id) {
            Selection::None
        } else {
            Selection::Neuron(id)
        };
        self.set_selection(next);
    }

    /// Picks a connection, or clears the selection if it was already picked.
    pub fn select_connection(&mut self, id: &str) {
        let next = match &self.selection {
            Selection::Connection(current) if current == id => Selection::None,
            _ => Selection::Connection(id.to_string()),
        };
        self.set_selection(next);
    }

    pub fn clear_selection(&mut self) {
        self.set_selection(Selection::None);
    }

    fn set_selection(&mut self, next: Selection) {
        if next != self.selection {
            // an open editor belongs to the old selection
            self.active_editor = None;
        }
        debug!("selection {:?} -> {:?}", self.selection, next);
        self.selection = next;
    }

    /// Flips edit mode. Turning it off closes any open editor.
    pub fn toggle_edit_mode(&mut self) {
        self.edit_mode = !self.edit_mode;
        if !self.edit_mode {
            self.active_editor = None;
        }
        debug!("edit mode {}", if self.edit_mode { "on" } else { "off" });
    }

    /// Opens the editor for `kind`. Returns `false` and changes nothing when
    /// edit mode is off or the selection is of another kind.
    pub fn start_edit(&mut self, kind: EditorKind) -> bool {
        let matches = matches!(
            (kind, &self.selection),
            (EditorKind::Neuron, Selection::Neuron(_))
                | (EditorKind::Connection, Selection::Connection(_))
        );
        if !self.edit_mode || !matches {
            debug!("ignoring start_edit({kind:?}) with {:?}", self.selection);
            return false;
        }
        self.active_editor = Some(kind);
        true
    }

    pub fn cancel_edit(&mut self) {
        self.active_editor = None;
    }

    /// Writes `edit` into `network` and closes the editor.
    ///
    /// Returns `None`, leaving the state alone, when no editor of the edit's
    /// kind is open for the edited id.
    pub fn save_edit(&mut self, network: &Network, edit: &Edit) -> Option<Network> {
        if self.active_editor != Some(edit.kind()) {
            return None;
        }
        let next = match (edit, &self.selection) {
            (Edit::Neuron(neuron), Selection::Neuron(id)) if neuron.id == *id => {
                mutation::apply_neuron_edit(network, neuron)
            }
            (Edit::Connection(connection), Selection::Connection(id)) if connection.id == *id => {
                mutation::apply_connection_edit(network, connection)
            }
            _ => return None,
        };
        self.active_editor = None;
        Some(next)
    }

    /// Drops a selection that points at something `network` no longer has.
    pub fn reconcile(&mut self, network: &Network) {
        let stale = match &self.selection {
            Selection::None => false,
            Selection::Neuron(id) => network.find_neuron(*id).is_none(),
            Selection::Connection(id) => network.find_connection(id).is_none(),
        };
        if stale {
            self.clear_selection();
        }
    }
}
