use crate::conversation::ConversationKey;

/// Which paper, if any, the user is currently talking about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    paper: Option<String>,
}

impl Selection {
    pub fn paper(&self) -> Option<&str> {
        self.paper.as_deref()
    }

    pub fn key(&self) -> ConversationKey {
        ConversationKey::for_paper(self.paper())
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.paper() == Some(name)
    }

    /// Selects `name`, or deselects it when it is already selected.
    /// Returns whether a paper is selected afterwards.
    pub fn toggle(&mut self, name: &str) -> bool {
        if self.is_selected(name) {
            self.paper = None;
            false
        } else {
            self.paper = Some(name.to_string());
            true
        }
    }

    pub fn select(&mut self, name: &str) {
        self.paper = Some(name.to_string());
    }

    pub fn clear(&mut self) {
        self.paper = None;
    }
}
