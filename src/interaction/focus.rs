//! Ordered focus list with a single current element

/// Tracks which of a set of elements (usually render windows) has focus
#[derive(Debug, Clone)]
pub struct FocusManager<E> {
    elements: Vec<E>,
    current: Option<usize>,
    looping: bool,
}

impl<E: PartialEq> Default for FocusManager<E> {
    fn default() -> Self {
        Self::new(true)
    }
}

impl<E: PartialEq> FocusManager<E> {
    pub fn new(looping: bool) -> Self {
        Self {
            elements: Vec::new(),
            current: None,
            looping,
        }
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Append an element; the first one added receives focus
    pub fn add_element(&mut self, element: E) -> bool {
        if self.elements.contains(&element) {
            return false;
        }
        self.elements.push(element);
        if self.current.is_none() {
            self.current = Some(0);
        }
        true
    }

    /// Remove an element. Focus on it moves to the following element, or
    /// the preceding one when it was last.
    pub fn remove_element(&mut self, element: &E) -> bool {
        let Some(position) = self.elements.iter().position(|e| e == element) else {
            return false;
        };
        self.elements.remove(position);
        self.current = match self.current {
            _ if self.elements.is_empty() => None,
            Some(current) if current > position => Some(current - 1),
            Some(current) if current == position => Some(position.min(self.elements.len() - 1)),
            other => other,
        };
        true
    }

    pub fn set_focused(&mut self, element: &E) -> bool {
        match self.elements.iter().position(|e| e == element) {
            Some(position) => {
                self.current = Some(position);
                true
            }
            None => false,
        }
    }

    pub fn focused(&self) -> Option<&E> {
        self.current.and_then(|i| self.elements.get(i))
    }

    /// Advance focus; at the end it wraps when looping, else stays put
    pub fn go_to_next(&mut self) -> Option<&E> {
        if let Some(current) = self.current {
            if current + 1 < self.elements.len() {
                self.current = Some(current + 1);
            } else if self.looping {
                self.current = Some(0);
            }
        }
        self.focused()
    }

    pub fn first(&self) -> Option<&E> {
        self.elements.first()
    }

    pub fn last(&self) -> Option<&E> {
        self.elements.last()
    }

    pub fn is_last(&self) -> bool {
        self.current
            .is_some_and(|current| current + 1 == self.elements.len())
    }

    pub fn elements(&self) -> &[E] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn views(looping: bool) -> FocusManager<&'static str> {
        let mut focus = FocusManager::new(looping);
        for name in ["axial", "sagittal", "coronal"] {
            focus.add_element(name);
        }
        focus
    }

    #[test]
    fn test_first_element_gets_focus() {
        let mut focus = views(true);
        assert_eq!(focus.focused(), Some(&"axial"));
        assert!(!focus.add_element("axial"));
        assert_eq!(focus.len(), 3);
    }

    #[test]
    fn test_looping_traversal() {
        let mut focus = views(true);
        assert_eq!(focus.go_to_next(), Some(&"sagittal"));
        assert_eq!(focus.go_to_next(), Some(&"coronal"));
        assert!(focus.is_last());
        assert_eq!(focus.go_to_next(), Some(&"axial"));
    }

    #[test]
    fn test_non_looping_stops_at_last() {
        let mut focus = views(false);
        focus.set_focused(&"coronal");
        assert_eq!(focus.go_to_next(), Some(&"coronal"));
    }

    #[test]
    fn test_removing_focused_moves_to_neighbour() {
        let mut focus = views(true);
        focus.set_focused(&"coronal");
        assert!(focus.remove_element(&"coronal"));
        assert_eq!(focus.focused(), Some(&"sagittal"));

        assert!(focus.remove_element(&"axial"));
        assert_eq!(focus.focused(), Some(&"sagittal"));

        assert!(focus.remove_element(&"sagittal"));
        assert_eq!(focus.focused(), None);
        assert!(!focus.remove_element(&"sagittal"));
    }

    #[test]
    fn test_first_and_last() {
        let focus = views(true);
        assert_eq!(focus.first(), Some(&"axial"));
        assert_eq!(focus.last(), Some(&"coronal"));
        assert!(!FocusManager::<u8>::default().is_last());
    }
}
