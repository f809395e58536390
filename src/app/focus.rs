use std::collections::HashSet;

/// Tracks the focused node and the margin set pushed aside for it.
#[derive(Clone, Debug, Default)]
pub(super) struct FocusController {
    focused: Option<usize>,
    margin: Option<HashSet<usize>>,
    margin_for: Option<usize>,
}

impl FocusController {
    pub(super) fn focused(&self) -> Option<usize> {
        self.focused
    }

    /// Returns true when the focus target changed.
    pub(super) fn set_focus(&mut self, target: Option<usize>) -> bool {
        if self.focused == target {
            return false;
        }

        match target {
            Some(index) => log::debug!("focus moved to node {index}"),
            None => log::debug!("focus cleared"),
        }
        self.focused = target;
        if target.is_none() {
            self.margin = None;
            self.margin_for = None;
        }
        true
    }

    pub(super) fn clear(&mut self) {
        self.set_focus(None);
    }

    /// Focused node plus its direct neighbours. `None` without focus.
    pub(super) fn lens_mask(&self, adjacency: &[Vec<usize>]) -> Option<Vec<bool>> {
        let focused = self.focused.filter(|&index| index < adjacency.len())?;
        let mut mask = vec![false; adjacency.len()];
        mask[focused] = true;
        for &neighbour in &adjacency[focused] {
            if let Some(entry) = mask.get_mut(neighbour) {
                *entry = true;
            }
        }
        Some(mask)
    }

    /// Computes the margin once per focus target: every node the frame shows
    /// that lies outside the lens.
    pub(super) fn refresh_margin<F>(&mut self, lens: Option<&[bool]>, node_count: usize, shown: F)
    where
        F: Fn(usize) -> bool,
    {
        let Some(lens) = lens else {
            self.margin = None;
            self.margin_for = None;
            return;
        };
        if self.focused.is_none() || self.margin_for == self.focused {
            return;
        }

        let margin = (0..node_count)
            .filter(|&index| !lens.get(index).copied().unwrap_or(false) && shown(index))
            .collect::<HashSet<_>>();
        log::debug!("focus margin holds {} nodes", margin.len());
        self.margin = Some(margin);
        self.margin_for = self.focused;
    }

    pub(super) fn margin(&self) -> Option<&HashSet<usize>> {
        self.margin.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn star() -> Vec<Vec<usize>> {
        vec![vec![1, 2], vec![0], vec![0], vec![4], vec![3]]
    }

    #[test]
    fn lens_covers_focus_and_neighbours() {
        let mut focus = FocusController::default();
        assert_eq!(focus.lens_mask(&star()), None);

        assert!(focus.set_focus(Some(0)));
        assert!(!focus.set_focus(Some(0)));
        assert_eq!(
            focus.lens_mask(&star()),
            Some(vec![true, true, true, false, false])
        );

        focus.set_focus(Some(9));
        assert_eq!(focus.lens_mask(&star()), None);
    }

    #[test]
    fn margin_is_taken_once_per_target() {
        let adjacency = star();
        let mut focus = FocusController::default();
        focus.set_focus(Some(0));
        let lens = focus.lens_mask(&adjacency);

        focus.refresh_margin(lens.as_deref(), 5, |index| index != 4);
        let expected = HashSet::from([3]);
        assert_eq!(focus.margin(), Some(&expected));

        focus.refresh_margin(lens.as_deref(), 5, |_| true);
        assert_eq!(focus.margin(), Some(&expected));

        focus.set_focus(Some(3));
        let lens = focus.lens_mask(&adjacency);
        focus.refresh_margin(lens.as_deref(), 5, |_| true);
        assert_eq!(focus.margin(), Some(&HashSet::from([0, 1, 2])));
    }

    #[test]
    fn clearing_focus_drops_the_margin() {
        let adjacency = star();
        let mut focus = FocusController::default();
        focus.set_focus(Some(1));
        let lens = focus.lens_mask(&adjacency);
        focus.refresh_margin(lens.as_deref(), 5, |_| true);
        assert!(focus.margin().is_some());

        focus.clear();
        assert_eq!(focus.focused(), None);
        assert_eq!(focus.margin(), None);
    }
}
