/// Lowest Hounsfield value a window bound may take (air).
pub const HU_MIN: i32 = -1024;
/// Highest Hounsfield value a window bound may take.
pub const HU_MAX: i32 = 1024;

/// Linear HU window, given as center (`length`) and `width`.
///
/// The default is the lung window `(-600, 1500)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowSpec {
    pub length: i32,
    pub width: i32,
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self {
            length: -600,
            width: 1500,
        }
    }
}

/// Clamped HU range a window maps onto `0..=255`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowBounds {
    pub min: i32,
    pub max: i32,
}

impl WindowSpec {
    pub fn new(length: i32, width: i32) -> Self {
        Self { length, width }
    }

    /// `length -/+ floor(width / 2)`, each bound clamped to `[HU_MIN, HU_MAX]`.
    ///
    /// A negative width yields `min > max`; such bounds report themselves as
    /// degenerate.
    pub fn bounds(&self) -> WindowBounds {
        let half = self.width.div_euclid(2);
        WindowBounds {
            min: self.length.saturating_sub(half).clamp(HU_MIN, HU_MAX),
            max: self.length.saturating_add(half).clamp(HU_MIN, HU_MAX),
        }
    }
}

impl WindowBounds {
    /// True when the range has no extent and the quantization step is undefined.
    pub fn is_degenerate(&self) -> bool {
        self.min >= self.max
    }

    #[inline]
    pub(crate) fn span(&self) -> f64 {
        f64::from(self.max) - f64::from(self.min)
    }
}
