//! Context menu placement.

use flipshelf_core::{BookId, FolderId};

/// Screen rectangle in cell (or pixel) units, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Bounds {
    pub fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> u16 {
        self.y.saturating_add(self.height)
    }

    pub fn right(&self) -> u16 {
        self.x.saturating_add(self.width)
    }

    pub fn contains(&self, column: u16, row: u16) -> bool {
        column >= self.x && column < self.right() && row >= self.y && row < self.bottom()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuPlacement {
    pub dropup: bool,
    pub left: u16,
    pub top: u16,
}

/// Opens upward when the space below the trigger is smaller than the menu.
pub fn place_menu(trigger: Bounds, viewport_height: u16, menu_height: u16) -> MenuPlacement {
    let space_below = viewport_height.saturating_sub(trigger.bottom());
    let dropup = space_below < menu_height;
    let top = if dropup {
        trigger.y.saturating_sub(menu_height)
    } else {
        trigger.bottom()
    };
    MenuPlacement {
        dropup,
        left: trigger.x,
        top,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Rename,
    Duplicate,
    Move,
    Delete,
}

impl MenuItem {
    pub fn label(&self) -> &'static str {
        match self {
            MenuItem::Rename => "Rename",
            MenuItem::Duplicate => "Duplicate",
            MenuItem::Move => "Move to folder",
            MenuItem::Delete => "Delete",
        }
    }
}

const BOOK_ITEMS: &[MenuItem] = &[
    MenuItem::Rename,
    MenuItem::Duplicate,
    MenuItem::Move,
    MenuItem::Delete,
];
const FOLDER_ITEMS: &[MenuItem] = &[MenuItem::Rename, MenuItem::Duplicate, MenuItem::Delete];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuTarget {
    Book(BookId),
    Folder(FolderId),
}

impl MenuTarget {
    pub fn items(&self) -> &'static [MenuItem] {
        match self {
            MenuTarget::Book(_) => BOOK_ITEMS,
            MenuTarget::Folder(_) => FOLDER_ITEMS,
        }
    }
}

/// An open context menu. Placement is computed on open and never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextMenu {
    pub target: MenuTarget,
    pub placement: MenuPlacement,
    pub cursor: usize,
}

impl ContextMenu {
    /// Rows the menu needs, including a one-row border on each side.
    pub fn height_for(target: &MenuTarget) -> u16 {
        target.items().len() as u16 + 2
    }

    pub fn open(target: MenuTarget, trigger: Bounds, viewport_height: u16) -> Self {
        let placement = place_menu(trigger, viewport_height, Self::height_for(&target));
        Self {
            target,
            placement,
            cursor: 0,
        }
    }

    pub fn items(&self) -> &'static [MenuItem] {
        self.target.items()
    }

    pub fn bounds(&self, width: u16) -> Bounds {
        Bounds::new(
            self.placement.left,
            self.placement.top,
            width,
            Self::height_for(&self.target),
        )
    }

    pub fn next(&mut self) {
        let len = self.items().len();
        self.cursor = (self.cursor + 1) % len;
    }

    pub fn prev(&mut self) {
        let len = self.items().len();
        self.cursor = (self.cursor + len - 1) % len;
    }

    pub fn selected_item(&self) -> MenuItem {
        self.items()[self.cursor.min(self.items().len() - 1)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_upward_near_viewport_bottom() {
        let viewport_height = 800;
        let trigger = Bounds::new(100, 700, 24, 50);
        assert_eq!(trigger.bottom(), viewport_height - 50);
        let placement = place_menu(trigger, viewport_height, 160);
        assert!(placement.dropup);
        assert_eq!(placement.top, 540);
    }

    #[test]
    fn opens_downward_with_room_below() {
        let placement = place_menu(Bounds::new(10, 100, 24, 30), 800, 160);
        assert!(!placement.dropup);
        assert_eq!(placement.top, 130);
        assert_eq!(placement.left, 10);
    }

    #[test]
    fn exact_fit_opens_downward() {
        let placement = place_menu(Bounds::new(0, 0, 10, 40), 200, 160);
        assert!(!placement.dropup);
    }

    #[test]
    fn dropup_clamps_at_top_edge() {
        let placement = place_menu(Bounds::new(0, 2, 10, 1), 5, 6);
        assert!(placement.dropup);
        assert_eq!(placement.top, 0);
    }

    #[test]
    fn placement_recomputed_per_open() {
        let book = MenuTarget::Book(BookId("a".to_string()));
        let low = ContextMenu::open(book.clone(), Bounds::new(0, 20, 30, 1), 24);
        let high = ContextMenu::open(book, Bounds::new(0, 3, 30, 1), 24);
        assert!(low.placement.dropup);
        assert!(!high.placement.dropup);
        assert_eq!(low.bounds(20).bottom(), 20);
    }

    #[test]
    fn cursor_wraps() {
        let mut menu = ContextMenu::open(
            MenuTarget::Folder(FolderId::default_folder()),
            Bounds::new(0, 0, 10, 1),
            40,
        );
        assert_eq!(menu.selected_item(), MenuItem::Rename);
        menu.prev();
        assert_eq!(menu.selected_item(), MenuItem::Delete);
        menu.next();
        assert_eq!(menu.selected_item(), MenuItem::Rename);
    }

    #[test]
    fn bounds_contains_is_half_open() {
        let bounds = Bounds::new(2, 2, 3, 3);
        assert!(bounds.contains(2, 2));
        assert!(bounds.contains(4, 4));
        assert!(!bounds.contains(5, 4));
        assert!(!bounds.contains(1, 3));
    }
}
