//! Keyboard commands for the viewer

use std::collections::HashMap;

/// Command identifier constants used in keybinding configuration
pub struct CommandId;

impl CommandId {
    pub const NAV_NEXT_ITEM: &'static str = "nav.next_item";
    pub const NAV_PREV_ITEM: &'static str = "nav.prev_item";
    pub const VIEWER_CLOSE: &'static str = "viewer.close";
    pub const VIEW_ZOOM_IN: &'static str = "view.zoom_in";
    pub const VIEW_ZOOM_OUT: &'static str = "view.zoom_out";
    pub const VIEW_ZOOM_RESET: &'static str = "view.zoom_reset";
}

/// Viewer action resolved from a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerCommand {
    Next,
    Prev,
    Close,
    ZoomIn,
    ZoomOut,
    ZoomReset,
}

impl ViewerCommand {
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            CommandId::NAV_NEXT_ITEM => Some(ViewerCommand::Next),
            CommandId::NAV_PREV_ITEM => Some(ViewerCommand::Prev),
            CommandId::VIEWER_CLOSE => Some(ViewerCommand::Close),
            CommandId::VIEW_ZOOM_IN => Some(ViewerCommand::ZoomIn),
            CommandId::VIEW_ZOOM_OUT => Some(ViewerCommand::ZoomOut),
            CommandId::VIEW_ZOOM_RESET => Some(ViewerCommand::ZoomReset),
            _ => None,
        }
    }
}

/// Key name -> command lookup
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    bindings: HashMap<String, ViewerCommand>,
}

impl KeyMap {
    /// Create from config bindings (command id -> key names)
    pub fn new(bindings: &HashMap<String, Vec<String>>) -> Self {
        // Invert the bindings map: command -> keys becomes key -> command
        let mut key_to_command = HashMap::new();

        for (id, keys) in bindings {
            let Some(command) = ViewerCommand::from_id(id) else {
                tracing::warn!("Unknown command in keybindings: {}", id);
                continue;
            };
            for key in keys {
                key_to_command.insert(key.to_lowercase(), command);
            }
        }

        Self {
            bindings: key_to_command,
        }
    }

    /// Resolve a key name
    pub fn resolve(&self, key: &str) -> Option<ViewerCommand> {
        let command = self.bindings.get(&key.to_lowercase()).copied();
        tracing::debug!("Key pressed: {} -> {:?}", key, command);
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FolioConfig;

    #[test]
    fn test_default_bindings() {
        let keymap = KeyMap::new(&FolioConfig::default().keybindings);
        assert_eq!(keymap.resolve("Escape"), Some(ViewerCommand::Close));
        assert_eq!(keymap.resolve("right"), Some(ViewerCommand::Next));
        assert_eq!(keymap.resolve("Left"), Some(ViewerCommand::Prev));
        assert_eq!(keymap.resolve("0"), Some(ViewerCommand::ZoomReset));
        assert_eq!(keymap.resolve("F12"), None);
    }

    #[test]
    fn test_unknown_command_ignored() {
        let mut bindings = HashMap::new();
        bindings.insert("app.quit".to_string(), vec!["q".to_string()]);
        let keymap = KeyMap::new(&bindings);
        assert_eq!(keymap.resolve("q"), None);
    }
}
