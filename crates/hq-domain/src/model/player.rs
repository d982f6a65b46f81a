//! Player - A registered participant of one mission

/// A human player, unique by name within a mission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    name: String,
    inventory: Vec<String>,
    notes: Option<String>,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inventory: Vec::new(),
            notes: None,
        }
    }

    /// Builder: set the inventory
    pub fn with_inventory(mut self, inventory: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.inventory = inventory.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: set notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    // ========== Getters ==========

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inventory(&self) -> &[String] {
        &self.inventory
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}
