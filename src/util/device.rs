//! Device classification for layout branches.
//!
//! TRADE-OFFS
//! ==========
//! Only the product-detail stickiness depends on the device, so the width is
//! read once at mount. SSR renders as desktop.

#[cfg(test)]
#[path = "device_test.rs"]
mod device_test;

pub const DESKTOP_MIN_WIDTH_PX: f64 = 1024.0;
pub const TABLET_MIN_WIDTH_PX: f64 = 768.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeviceKind {
    #[default]
    Desktop,
    Tablet,
    Mobile,
}

impl DeviceKind {
    /// Classify a viewport by its CSS pixel width.
    #[must_use]
    pub fn from_width(width_px: f64) -> Self {
        if width_px >= DESKTOP_MIN_WIDTH_PX {
            Self::Desktop
        } else if width_px >= TABLET_MIN_WIDTH_PX {
            Self::Tablet
        } else {
            Self::Mobile
        }
    }

    /// The product detail block sticks beside the list on desktop only.
    #[must_use]
    pub fn sticky_detail(self) -> bool {
        matches!(self, Self::Desktop)
    }
}

/// Device kind of the current browser window.
pub fn current() -> DeviceKind {
    #[cfg(feature = "hydrate")]
    {
        web_sys::window()
            .and_then(|w| w.inner_width().ok())
            .and_then(|width| width.as_f64())
            .map_or(DeviceKind::Desktop, DeviceKind::from_width)
    }
    #[cfg(not(feature = "hydrate"))]
    {
        DeviceKind::Desktop
    }
}
