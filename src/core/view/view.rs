use crate::core::handle::Handle;
use crate::util::geometry::Geometry;

bitflags::bitflags! {
    /// Toggleable view state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ViewState: u32 {
        const MAXIMIZED  = 1 << 0;
        const FULLSCREEN = 1 << 1;
        const RESIZING   = 1 << 2;
        const MOVING     = 1 << 3;
        const ACTIVATED  = 1 << 4;
    }
}

bitflags::bitflags! {
    /// Client-declared view type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ViewType: u32 {
        /// Override-redirect (X11)
        const OVERRIDE_REDIRECT = 1 << 0;
        /// Tooltips, DnD icons (X11)
        const UNMANAGED         = 1 << 1;
        const SPLASH            = 1 << 2;
        const MODAL             = 1 << 3;
        const POPUP             = 1 << 4;
    }
}

/// A client window placed on an output.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub handle: Handle,
    /// The output this view lives on; always a live output.
    pub output: Handle,
    pub geometry: Geometry,
    pub state: ViewState,
    pub view_type: ViewType,
    pub focused: bool,
    /// Visibility bitmask, see [`Output::mask`](crate::core::output::Output::mask)
    pub mask: u32,
    pub title: String,
    pub app_id: String,
    pub parent: Option<Handle>,
}

impl View {
    pub fn new(handle: Handle, output: Handle, geometry: Geometry, mask: u32) -> Self {
        Self {
            handle,
            output,
            geometry,
            state: ViewState::empty(),
            view_type: ViewType::empty(),
            focused: false,
            mask,
            title: String::new(),
            app_id: String::new(),
            parent: None,
        }
    }

    /// Views the window manager is expected to lay out.
    pub fn is_managed(&self) -> bool {
        !self
            .view_type
            .intersects(ViewType::OVERRIDE_REDIRECT | ViewType::UNMANAGED)
    }

    pub fn is_fullscreen(&self) -> bool {
        self.state.contains(ViewState::FULLSCREEN)
    }
}
