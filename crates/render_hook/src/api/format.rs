//! Unified pixel formats
//!
//! Values follow the DXGI numbering so D3D backends can pass them through
//! unchanged; other backends convert (see `backend::vulkan`).

use serde::{Serialize, Deserialize};

/// Pixel format of a resource or view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum Format {
    /// No format / unknown
    #[default]
    Unknown = 0,
    /// 4x32-bit float
    R32G32B32A32Float = 2,
    /// 4x16-bit typeless
    R16G16B16A16Typeless = 9,
    /// 4x16-bit float
    R16G16B16A16Float = 10,
    /// 10:10:10:2 typeless
    R10G10B10A2Typeless = 23,
    /// 10:10:10:2 unsigned normalized
    R10G10B10A2Unorm = 24,
    /// RGBA 8-bit typeless
    R8G8B8A8Typeless = 27,
    /// RGBA 8-bit unsigned normalized
    R8G8B8A8Unorm = 28,
    /// RGBA 8-bit unsigned normalized, sRGB encoded
    R8G8B8A8UnormSrgb = 29,
    /// 32-bit typeless (depth or color)
    R32Typeless = 39,
    /// 32-bit float depth
    D32Float = 40,
    /// 32-bit float color
    R32Float = 41,
    /// 24:8 typeless (depth stencil)
    R24G8Typeless = 44,
    /// 24-bit depth, 8-bit stencil
    D24UnormS8Uint = 45,
    /// 8-bit single channel unsigned normalized
    R8Unorm = 61,
    /// BGRA 8-bit unsigned normalized
    B8G8R8A8Unorm = 87,
    /// BGRX 8-bit unsigned normalized
    B8G8R8X8Unorm = 88,
    /// BGRA 8-bit typeless
    B8G8R8A8Typeless = 90,
    /// BGRA 8-bit unsigned normalized, sRGB encoded
    B8G8R8A8UnormSrgb = 91,
    /// BGRX 8-bit typeless
    B8G8R8X8Typeless = 92,
    /// BGRX 8-bit unsigned normalized, sRGB encoded
    B8G8R8X8UnormSrgb = 93,
}

/// Which color encoding [`format_to_default_typed`] should pick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SrgbVariant {
    /// Keep the encoding of the input (typeless inputs become linear)
    Keep,
    /// Linear (non-sRGB) variant
    Linear,
    /// sRGB variant, when the format family has one
    Srgb,
}

/// Typeless member of the format family, or the format itself if it has none
pub fn format_to_typeless(format: Format) -> Format {
    use Format::*;
    match format {
        R16G16B16A16Float => R16G16B16A16Typeless,
        R10G10B10A2Unorm => R10G10B10A2Typeless,
        R8G8B8A8Unorm | R8G8B8A8UnormSrgb => R8G8B8A8Typeless,
        D32Float | R32Float => R32Typeless,
        D24UnormS8Uint => R24G8Typeless,
        B8G8R8A8Unorm | B8G8R8A8UnormSrgb => B8G8R8A8Typeless,
        B8G8R8X8Unorm | B8G8R8X8UnormSrgb => B8G8R8X8Typeless,
        other => other,
    }
}

/// Default color-typed member of the format family
///
/// Used whenever a concrete format is needed for a view or a resolve of a
/// buffer the host created typeless, and to build the list of view formats a
/// swapchain image must support.
pub fn format_to_default_typed(format: Format, variant: SrgbVariant) -> Format {
    use Format::*;
    let srgb = match variant {
        SrgbVariant::Keep => is_srgb(format),
        SrgbVariant::Linear => false,
        SrgbVariant::Srgb => true,
    };

    match (format, srgb) {
        (R16G16B16A16Typeless, _) => R16G16B16A16Float,
        (R10G10B10A2Typeless, _) => R10G10B10A2Unorm,
        (R8G8B8A8Typeless | R8G8B8A8Unorm | R8G8B8A8UnormSrgb, false) => R8G8B8A8Unorm,
        (R8G8B8A8Typeless | R8G8B8A8Unorm | R8G8B8A8UnormSrgb, true) => R8G8B8A8UnormSrgb,
        (B8G8R8A8Typeless | B8G8R8A8Unorm | B8G8R8A8UnormSrgb, false) => B8G8R8A8Unorm,
        (B8G8R8A8Typeless | B8G8R8A8Unorm | B8G8R8A8UnormSrgb, true) => B8G8R8A8UnormSrgb,
        (B8G8R8X8Typeless | B8G8R8X8Unorm | B8G8R8X8UnormSrgb, false) => B8G8R8X8Unorm,
        (B8G8R8X8Typeless | B8G8R8X8Unorm | B8G8R8X8UnormSrgb, true) => B8G8R8X8UnormSrgb,
        (R32Typeless, _) => R32Float,
        (R24G8Typeless, _) => D24UnormS8Uint,
        (other, _) => other,
    }
}

/// Whether the format stores sRGB encoded color
pub fn is_srgb(format: Format) -> bool {
    matches!(
        format,
        Format::R8G8B8A8UnormSrgb | Format::B8G8R8A8UnormSrgb | Format::B8G8R8X8UnormSrgb
    )
}

/// Whether the format is a depth or depth stencil format
pub fn is_depth_stencil(format: Format) -> bool {
    matches!(format, Format::D32Float | Format::D24UnormS8Uint)
}

/// Whether the format is a typeless family format
pub fn is_typeless(format: Format) -> bool {
    format != Format::Unknown && format_to_typeless(format) == format
        && format != format_to_default_typed(format, SrgbVariant::Keep)
}
