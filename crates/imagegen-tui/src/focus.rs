//! FocusRing: keyboard focus cycling between form fields and buttons.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldId {
    Prompt,
    Steps,
    GuidanceScale,
    Width,
    Height,
    Seed,
    OptimizeSpeed,
    OptimizeMemory,
    GenerateButton,
    SaveButton,
}

impl FieldId {
    pub fn is_button(self) -> bool {
        matches!(self, FieldId::GenerateButton | FieldId::SaveButton)
    }
}

pub struct FocusRing {
    items: Vec<FieldId>,
    current: usize,
}

impl FocusRing {
    pub fn new(items: Vec<FieldId>) -> Self {
        Self { items, current: 0 }
    }

    pub fn current(&self) -> Option<FieldId> {
        self.items.get(self.current).copied()
    }

    pub fn next(&mut self) -> Option<FieldId> {
        if self.items.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.items.len();
        self.current()
    }

    pub fn prev(&mut self) -> Option<FieldId> {
        if self.items.is_empty() {
            return None;
        }
        self.current = if self.current == 0 {
            self.items.len() - 1
        } else {
            self.current - 1
        };
        self.current()
    }

    pub fn is_focused(&self, id: FieldId) -> bool {
        self.current() == Some(id)
    }

    /// Replace the ring contents, keeping the focused id when it survives.
    /// Otherwise focus falls back to the first item.
    pub fn set_items(&mut self, items: Vec<FieldId>) {
        let old = self.current();
        self.items = items;
        self.current = old
            .and_then(|id| self.items.iter().position(|&x| x == id))
            .unwrap_or(0);
    }
}

impl Default for FocusRing {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycles_both_ways() {
        let mut ring = FocusRing::new(vec![
            FieldId::Prompt,
            FieldId::GenerateButton,
            FieldId::SaveButton,
        ]);
        assert_eq!(ring.next(), Some(FieldId::GenerateButton));
        assert_eq!(ring.next(), Some(FieldId::SaveButton));
        assert_eq!(ring.next(), Some(FieldId::Prompt));
        assert_eq!(ring.prev(), Some(FieldId::SaveButton));
    }

    #[test]
    fn test_set_items_keeps_or_resets_focus() {
        let mut ring = FocusRing::new(vec![FieldId::Prompt, FieldId::Steps, FieldId::SaveButton]);
        ring.next();
        ring.next();
        ring.set_items(vec![FieldId::Prompt, FieldId::SaveButton]);
        assert!(ring.is_focused(FieldId::SaveButton));

        ring.set_items(vec![FieldId::Prompt, FieldId::Steps]);
        assert!(ring.is_focused(FieldId::Prompt));
    }

    #[test]
    fn test_empty_ring() {
        let mut ring = FocusRing::default();
        assert_eq!(ring.next(), None);
        assert_eq!(ring.current(), None);
    }
}
