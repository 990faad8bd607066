//! Vulkan interop helpers
//!
//! Conversions between the unified model and `ash::vk` types, plus the
//! create-info patching a Vulkan backend applies to the host's device and
//! swapchain creation so the layer can run on them. [`create_swapchain`]
//! ties the pieces together for a host's `vkCreateSwapchainKHR`.

use ash::vk;

use super::{BackendError, BackendResult, NativeSwapchain};
use crate::api::desc::{SwapchainDesc, ResourceUsage};
use crate::api::device::{Device, DeviceError};
use crate::api::swapchain::Swapchain;
use crate::api::format::{format_to_default_typed, Format, SrgbVariant};
use crate::api::handle::WindowHandle;
use crate::config::LayerConfig;

/// Swapchain support, without which the layer cannot present
pub const SWAPCHAIN_EXTENSION: &str = "VK_KHR_swapchain";
/// Needed to create views with a different format than the image
pub const IMAGE_FORMAT_LIST_EXTENSION: &str = "VK_KHR_image_format_list";
/// Needed to create sRGB and linear views of swapchain images
pub const SWAPCHAIN_MUTABLE_FORMAT_EXTENSION: &str = "VK_KHR_swapchain_mutable_format";
/// Used for descriptor updates when available
pub const PUSH_DESCRIPTOR_EXTENSION: &str = "VK_KHR_push_descriptor";

/// Vulkan format of a unified format
pub fn convert_format(format: Format) -> vk::Format {
    match format {
        Format::Unknown => vk::Format::UNDEFINED,
        Format::R32G32B32A32Float => vk::Format::R32G32B32A32_SFLOAT,
        Format::R16G16B16A16Typeless | Format::R16G16B16A16Float => vk::Format::R16G16B16A16_SFLOAT,
        Format::R10G10B10A2Typeless | Format::R10G10B10A2Unorm => vk::Format::A2B10G10R10_UNORM_PACK32,
        Format::R8G8B8A8Typeless | Format::R8G8B8A8Unorm => vk::Format::R8G8B8A8_UNORM,
        Format::R8G8B8A8UnormSrgb => vk::Format::R8G8B8A8_SRGB,
        Format::R32Typeless | Format::R32Float => vk::Format::R32_SFLOAT,
        Format::D32Float => vk::Format::D32_SFLOAT,
        Format::R24G8Typeless | Format::D24UnormS8Uint => vk::Format::D24_UNORM_S8_UINT,
        Format::R8Unorm => vk::Format::R8_UNORM,
        Format::B8G8R8A8Typeless
        | Format::B8G8R8A8Unorm
        | Format::B8G8R8X8Typeless
        | Format::B8G8R8X8Unorm => vk::Format::B8G8R8A8_UNORM,
        Format::B8G8R8A8UnormSrgb | Format::B8G8R8X8UnormSrgb => vk::Format::B8G8R8A8_SRGB,
    }
}

/// Unified format of a Vulkan format, `Unknown` when there is no counterpart
pub fn convert_vk_format(format: vk::Format) -> Format {
    match format {
        vk::Format::R32G32B32A32_SFLOAT => Format::R32G32B32A32Float,
        vk::Format::R16G16B16A16_SFLOAT => Format::R16G16B16A16Float,
        vk::Format::A2B10G10R10_UNORM_PACK32 => Format::R10G10B10A2Unorm,
        vk::Format::R8G8B8A8_UNORM => Format::R8G8B8A8Unorm,
        vk::Format::R8G8B8A8_SRGB => Format::R8G8B8A8UnormSrgb,
        vk::Format::R32_SFLOAT => Format::R32Float,
        vk::Format::D32_SFLOAT => Format::D32Float,
        vk::Format::D24_UNORM_S8_UINT => Format::D24UnormS8Uint,
        vk::Format::R8_UNORM => Format::R8Unorm,
        vk::Format::B8G8R8A8_UNORM => Format::B8G8R8A8Unorm,
        vk::Format::B8G8R8A8_SRGB => Format::B8G8R8A8UnormSrgb,
        _ => Format::Unknown,
    }
}

/// Vulkan sample count flag of a sample count (rounded down to a power of two)
pub fn convert_sample_count(samples: u16) -> vk::SampleCountFlags {
    match samples {
        0 | 1 => vk::SampleCountFlags::TYPE_1,
        2..=3 => vk::SampleCountFlags::TYPE_2,
        4..=7 => vk::SampleCountFlags::TYPE_4,
        8..=15 => vk::SampleCountFlags::TYPE_8,
        16..=31 => vk::SampleCountFlags::TYPE_16,
        32..=63 => vk::SampleCountFlags::TYPE_32,
        _ => vk::SampleCountFlags::TYPE_64,
    }
}

/// Sample count of a Vulkan sample count flag
pub fn convert_vk_sample_count(samples: vk::SampleCountFlags) -> u16 {
    match samples {
        vk::SampleCountFlags::TYPE_2 => 2,
        vk::SampleCountFlags::TYPE_4 => 4,
        vk::SampleCountFlags::TYPE_8 => 8,
        vk::SampleCountFlags::TYPE_16 => 16,
        vk::SampleCountFlags::TYPE_32 => 32,
        vk::SampleCountFlags::TYPE_64 => 64,
        _ => 1,
    }
}

/// Backend error of a failed Vulkan result
pub fn result_to_error(result: vk::Result) -> BackendError {
    match result {
        vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => BackendError::OutOfMemory,
        vk::Result::ERROR_DEVICE_LOST | vk::Result::ERROR_SURFACE_LOST_KHR => BackendError::DeviceLost,
        vk::Result::ERROR_FEATURE_NOT_PRESENT
        | vk::Result::ERROR_EXTENSION_NOT_PRESENT
        | vk::Result::ERROR_FORMAT_NOT_SUPPORTED => BackendError::Unsupported(format!("{:?}", result)),
        vk::Result::ERROR_VALIDATION_FAILED_EXT => BackendError::InvalidArgument(format!("{:?}", result)),
        other => BackendError::Native(other.as_raw()),
    }
}

/// `Ok` for non-negative results, the mapped error otherwise
pub fn check(result: vk::Result) -> Result<(), BackendError> {
    if result.as_raw() >= 0 {
        Ok(())
    } else {
        Err(result_to_error(result))
    }
}

/// One queue create info of the host's device creation
#[derive(Debug, Clone, PartialEq)]
pub struct QueueRequest {
    /// Queue family index
    pub family_index: u32,
    /// Priority per requested queue
    pub priorities: Vec<f32>,
}

/// First requested queue family that supports graphics and has a queue
///
/// Warns when the chosen queue has a low priority, since effects then
/// compete with the host's other work.
pub fn find_graphics_queue_family(
    families: &[vk::QueueFamilyProperties],
    requests: &[QueueRequest],
) -> Option<u32> {
    requests.iter().find_map(|request| {
        let family = families.get(request.family_index as usize)?;
        if request.priorities.is_empty() || !family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
            return None;
        }
        if request.priorities[0] < 1.0 {
            log::warn!(
                "Vulkan queue used for rendering has a low priority ({}).",
                request.priorities[0]
            );
        }
        Some(request.family_index)
    })
}

/// Outcome of patching the host's device creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevicePlan {
    /// Queue family the layer renders on, `None` when the layer stays off
    pub graphics_queue_family: Option<u32>,
    /// Extensions the device must be created with
    pub enabled_extensions: Vec<String>,
    /// Whether push descriptors are available
    pub push_descriptors: bool,
}

impl DevicePlan {
    /// Whether the layer runs on this device
    pub fn is_enabled(&self) -> bool {
        self.graphics_queue_family.is_some()
    }
}

/// Decide whether the layer runs on a device and which extensions to add
///
/// `requested` are the host's enabled extensions, `available` those the
/// physical device supports.
pub fn plan_device_extensions(
    requested: &[&str],
    available: &[&str],
    graphics_queue_family: Option<u32>,
    config: &LayerConfig,
) -> DevicePlan {
    let mut plan = DevicePlan {
        graphics_queue_family,
        enabled_extensions: requested.iter().map(|name| (*name).to_string()).collect(),
        push_descriptors: false,
    };

    if !requested.contains(&SWAPCHAIN_EXTENSION) && config.skip_devices_without_swapchain {
        log::warn!("Skipping device because it is not created with the \"{}\" extension.", SWAPCHAIN_EXTENSION);
        plan.graphics_queue_family = None;
        return plan;
    }
    if plan.graphics_queue_family.is_none() {
        log::warn!("Skipping device because it is not created with a graphics queue.");
        return plan;
    }

    let mut add_extension = |name: &str, required: bool| -> bool {
        if available.contains(&name) {
            if !plan.enabled_extensions.iter().any(|enabled| enabled == name) {
                plan.enabled_extensions.push(name.to_string());
            }
            return true;
        }
        if required {
            log::error!("Required extension \"{}\" is not supported on this device. Initialization failed.", name);
            plan.graphics_queue_family = None;
        } else {
            log::warn!("Optional extension \"{}\" is not supported on this device.", name);
        }
        false
    };

    let push_descriptors = add_extension(PUSH_DESCRIPTOR_EXTENSION, false);
    add_extension(IMAGE_FORMAT_LIST_EXTENSION, true);
    add_extension(SWAPCHAIN_MUTABLE_FORMAT_EXTENSION, true);
    plan.push_descriptors = push_descriptors;

    log::info!("> Dumping enabled device extensions:");
    for name in &plan.enabled_extensions {
        log::info!("  {}", name);
    }

    plan
}

/// The parts of `VkSwapchainCreateInfoKHR` the layer reads or patches
#[derive(Debug, Clone, PartialEq)]
pub struct SwapchainCreateInfo {
    /// Creation flags
    pub flags: vk::SwapchainCreateFlagsKHR,
    /// Minimum number of images
    pub min_image_count: u32,
    /// Image format
    pub image_format: vk::Format,
    /// Image color space
    pub image_color_space: vk::ColorSpaceKHR,
    /// Image extent
    pub image_extent: vk::Extent2D,
    /// Image usage
    pub image_usage: vk::ImageUsageFlags,
    /// Sharing mode
    pub image_sharing_mode: vk::SharingMode,
    /// Queue families sharing the images (concurrent mode)
    pub queue_family_indices: Vec<u32>,
    /// Chained `VkImageFormatListCreateInfoKHR` view formats, if any
    pub view_formats: Option<Vec<vk::Format>>,
    /// Presentation mode
    pub present_mode: vk::PresentModeKHR,
    /// Whether a previous swapchain is being replaced
    pub old_swapchain: vk::SwapchainKHR,
}

/// Patch the host's swapchain creation for a device the layer runs on
///
/// - adds transfer source usage so the back buffer can be copied from
/// - adds the linear and sRGB view formats of the image format, setting the
///   mutable format flag when they differ and merging with (and
///   deduplicating) a format list the host already chained
/// - puts the graphics queue family first for concurrent sharing
pub fn patch_swapchain_create_info(info: &mut SwapchainCreateInfo, graphics_queue_family: Option<u32>) {
    let Some(graphics_queue_family) = graphics_queue_family else {
        return;
    };

    info.image_usage |= vk::ImageUsageFlags::TRANSFER_SRC;

    let format = convert_vk_format(info.image_format);
    let linear = convert_format(format_to_default_typed(format, SrgbVariant::Linear));
    let srgb = convert_format(format_to_default_typed(format, SrgbVariant::Srgb));
    if linear != srgb {
        info.flags |= vk::SwapchainCreateFlagsKHR::MUTABLE_FORMAT;
    }

    match &mut info.view_formats {
        Some(view_formats) => {
            view_formats.push(linear);
            view_formats.push(srgb);
            view_formats.sort_by_key(|format| format.as_raw());
            view_formats.dedup();
        }
        None if linear != srgb => info.view_formats = Some(vec![linear, srgb]),
        None => {}
    }

    if info.image_sharing_mode == vk::SharingMode::CONCURRENT {
        let mut families = vec![graphics_queue_family];
        families.extend(
            info.queue_family_indices
                .iter()
                .copied()
                .filter(|family| *family != graphics_queue_family),
        );
        info.queue_family_indices = families;
    }
}

/// Unified description of a Vulkan swapchain
pub fn swapchain_desc_from_create_info(info: &SwapchainCreateInfo, window: WindowHandle) -> SwapchainDesc {
    let mut usage = ResourceUsage::PRESENT;
    if info.image_usage.contains(vk::ImageUsageFlags::COLOR_ATTACHMENT) {
        usage |= ResourceUsage::RENDER_TARGET;
    }
    if info.image_usage.contains(vk::ImageUsageFlags::TRANSFER_SRC) {
        usage |= ResourceUsage::COPY_SOURCE;
    }
    if info.image_usage.contains(vk::ImageUsageFlags::TRANSFER_DST) {
        usage |= ResourceUsage::COPY_DEST;
    }

    SwapchainDesc {
        width: info.image_extent.width,
        height: info.image_extent.height,
        format: convert_vk_format(info.image_format),
        sample_count: 1,
        buffer_count: info.min_image_count,
        usage,
        window,
        fullscreen: false,
        sync_interval: u32::from(info.present_mode == vk::PresentModeKHR::FIFO),
    }
}

/// Whether the host replaces an existing swapchain (a resize)
pub fn is_swapchain_recreation(info: &SwapchainCreateInfo) -> bool {
    info.old_swapchain != vk::SwapchainKHR::null()
}

/// Route a host's swapchain creation through the layer
///
/// The unified description goes through [`Device::create_swapchain`], so
/// `CreateSwapchain` observers may edit it. Edited fields are written back
/// into `info`, which is then patched for the device plan and handed to
/// `create_native`.
pub fn create_swapchain(
    device: &Device,
    info: &mut SwapchainCreateInfo,
    window: WindowHandle,
    plan: &DevicePlan,
    create_native: impl FnOnce(&SwapchainCreateInfo) -> BackendResult<Box<dyn NativeSwapchain>>,
) -> Result<Swapchain, DeviceError> {
    if is_swapchain_recreation(info) {
        log::debug!("Host replaces swapchain {:#x}", vk::Handle::as_raw(info.old_swapchain));
    }

    let requested = swapchain_desc_from_create_info(info, window);
    device.create_swapchain(&requested, |desc| {
        if desc.format != requested.format {
            info.image_format = convert_format(desc.format);
        }
        if (desc.width, desc.height) != (requested.width, requested.height) {
            info.image_extent = vk::Extent2D { width: desc.width, height: desc.height };
        }
        info.min_image_count = desc.buffer_count;

        patch_swapchain_create_info(info, plan.graphics_queue_family);
        create_native(info)
    })
}
