//! Object descriptions shared by every backend
//!
//! These are the values observers see (and may edit) in create-time events,
//! and what the native backend traits receive.

use bitflags::bitflags;

use super::format::Format;
use super::handle::WindowHandle;

/// Underlying native graphics API of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceApi {
    /// Direct3D 9
    D3D9,
    /// Direct3D 10
    D3D10,
    /// Direct3D 11
    D3D11,
    /// Direct3D 12
    D3D12,
    /// OpenGL
    OpenGL,
    /// Vulkan
    Vulkan,
}

/// Optional device features observers can query before relying on them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Compute shaders and dispatch
    ComputeShader,
    /// Geometry shaders
    GeometryShader,
    /// Hull and domain shaders
    HullAndDomainShader,
    /// Dual source blending
    DualSourceBlend,
    /// Independent blend state per render target
    IndependentBlend,
    /// More than one viewport bound at once
    MultiViewport,
    /// Multisample resolve on the command list
    ResolveResource,
    /// Sampler comparison functions
    SamplerCompare,
}

bitflags! {
    /// How a resource is used, or the state it is in
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResourceUsage: u32 {
        /// Index buffer binding
        const INDEX_BUFFER = 0x2;
        /// Vertex buffer binding
        const VERTEX_BUFFER = 0x1;
        /// Constant buffer binding
        const CONSTANT_BUFFER = 0x8000;
        /// Shader resource view
        const SHADER_RESOURCE = 0xc0;
        /// Unordered access view
        const UNORDERED_ACCESS = 0x8;
        /// Render target view
        const RENDER_TARGET = 0x4;
        /// Depth stencil view
        const DEPTH_STENCIL = 0x30;
        /// Copy source
        const COPY_SOURCE = 0x800;
        /// Copy destination
        const COPY_DEST = 0x400;
        /// Multisample resolve source
        const RESOLVE_SOURCE = 0x2000;
        /// Multisample resolve destination
        const RESOLVE_DEST = 0x1000;
        /// Swapchain presentation
        const PRESENT = 0x8000_0000 | 0x800;
        /// Mapped for CPU access
        const CPU_ACCESS = 0x0001_0000;
    }
}

bitflags! {
    /// Kinds of work a command queue accepts
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct QueueType: u32 {
        /// Graphics (draw) work
        const GRAPHICS = 0x1;
        /// Compute (dispatch) work
        const COMPUTE = 0x2;
        /// Copy work
        const COPY = 0x4;
    }
}

/// Dimensionality of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceType {
    /// Unknown resource type
    #[default]
    Unknown,
    /// Linear buffer
    Buffer,
    /// 1D texture
    Texture1D,
    /// 2D texture
    Texture2D,
    /// 3D texture
    Texture3D,
}

/// Memory heap a resource is allocated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemoryHeap {
    /// Let the backend decide
    #[default]
    Unknown,
    /// Device local memory
    GpuOnly,
    /// Upload memory
    CpuToGpu,
    /// Readback memory
    GpuToCpu,
}

/// Description of a buffer or texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ResourceDesc {
    /// Resource dimensionality
    pub ty: ResourceType,
    /// Width in texels, or size in bytes for buffers
    pub width: u64,
    /// Height in texels
    pub height: u32,
    /// Depth (3D) or array layer count
    pub depth_or_layers: u16,
    /// Mip level count
    pub levels: u16,
    /// Texel format
    pub format: Format,
    /// Samples per texel
    pub samples: u16,
    /// Memory heap
    pub heap: MemoryHeap,
    /// Allowed usage
    pub usage: ResourceUsage,
}

impl ResourceDesc {
    /// Single level, single layer 2D texture
    pub fn texture_2d(width: u32, height: u32, format: Format, samples: u16, usage: ResourceUsage) -> Self {
        Self {
            ty: ResourceType::Texture2D,
            width: u64::from(width),
            height,
            depth_or_layers: 1,
            levels: 1,
            format,
            samples: samples.max(1),
            heap: MemoryHeap::GpuOnly,
            usage,
        }
    }

    /// Linear buffer of `size` bytes
    pub fn buffer(size: u64, usage: ResourceUsage) -> Self {
        Self {
            ty: ResourceType::Buffer,
            width: size,
            height: 1,
            depth_or_layers: 1,
            levels: 1,
            format: Format::Unknown,
            samples: 1,
            heap: MemoryHeap::GpuOnly,
            usage,
        }
    }
}

/// Initial contents of a subresource
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubresourceData {
    /// Raw bytes
    pub data: Vec<u8>,
    /// Bytes between rows
    pub row_pitch: u32,
    /// Bytes between depth slices
    pub slice_pitch: u32,
}

/// Dimensionality of a resource view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceViewType {
    /// Unknown view type
    #[default]
    Unknown,
    /// Buffer view
    Buffer,
    /// 1D texture view
    Texture1D,
    /// 2D texture view
    Texture2D,
    /// Multisampled 2D texture view
    Texture2DMultisample,
    /// 3D texture view
    Texture3D,
    /// Cube texture view
    TextureCube,
}

/// Description of a resource view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ResourceViewDesc {
    /// View dimensionality
    pub ty: ResourceViewType,
    /// View format (may differ from a typeless resource format)
    pub format: Format,
    /// First mip level
    pub first_level: u32,
    /// Mip level count
    pub levels: u32,
    /// First array layer
    pub first_layer: u32,
    /// Array layer count
    pub layers: u32,
}

impl ResourceViewDesc {
    /// View of the first level and layer of a 2D texture
    pub fn texture_2d(format: Format, multisampled: bool) -> Self {
        Self {
            ty: if multisampled {
                ResourceViewType::Texture2DMultisample
            } else {
                ResourceViewType::Texture2D
            },
            format,
            first_level: 0,
            levels: 1,
            first_layer: 0,
            layers: 1,
        }
    }
}

/// Texture filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// Point sampling for minification, magnification and mips
    #[default]
    MinMagMipPoint,
    /// Linear sampling for minification, magnification and mips
    MinMagMipLinear,
    /// Anisotropic filtering
    Anisotropic,
}

/// Texture coordinate addressing outside [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureAddressMode {
    /// Repeat
    Wrap,
    /// Mirrored repeat
    Mirror,
    /// Clamp to edge
    #[default]
    Clamp,
    /// Clamp to border color
    Border,
}

/// Description of a sampler
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SamplerDesc {
    /// Filtering
    pub filter: FilterMode,
    /// U addressing
    pub address_u: TextureAddressMode,
    /// V addressing
    pub address_v: TextureAddressMode,
    /// W addressing
    pub address_w: TextureAddressMode,
    /// Mip LOD bias
    pub mip_lod_bias: f32,
    /// Maximum anisotropy
    pub max_anisotropy: f32,
    /// Minimum LOD
    pub min_lod: f32,
    /// Maximum LOD
    pub max_lod: f32,
}

impl SamplerDesc {
    /// Clamped sampler with the given filter
    pub fn clamped(filter: FilterMode) -> Self {
        Self {
            filter,
            max_anisotropy: 1.0,
            max_lod: f32::MAX,
            ..Self::default()
        }
    }
}

/// Pipeline kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PipelineKind {
    /// Graphics pipeline
    #[default]
    Graphics,
    /// Compute pipeline
    Compute,
}

/// Primitive topology for graphics pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Not set
    #[default]
    Undefined,
    /// Point list
    PointList,
    /// Line list
    LineList,
    /// Line strip
    LineStrip,
    /// Triangle list
    TriangleList,
    /// Triangle strip
    TriangleStrip,
}

/// Face culling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    /// No culling
    None,
    /// Cull front faces
    Front,
    /// Cull back faces
    #[default]
    Back,
}

/// Shader stage code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ShaderDesc {
    /// Backend specific code (bytecode, SPIR-V or source text)
    pub code: Vec<u8>,
    /// Entry point name
    pub entry_point: String,
}

impl ShaderDesc {
    /// Shader from code and entry point
    pub fn new(code: impl Into<Vec<u8>>, entry_point: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            entry_point: entry_point.into(),
        }
    }
}

/// One vertex input element
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputElement {
    /// Semantic name
    pub semantic: String,
    /// Semantic index
    pub semantic_index: u32,
    /// Element format
    pub format: Format,
    /// Vertex buffer binding slot
    pub buffer_binding: u32,
    /// Byte offset in the vertex
    pub offset: u32,
}

/// Description of a pipeline state object
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineDesc {
    /// Graphics or compute
    pub kind: PipelineKind,
    /// Vertex shader
    pub vertex_shader: Option<ShaderDesc>,
    /// Pixel shader
    pub pixel_shader: Option<ShaderDesc>,
    /// Compute shader
    pub compute_shader: Option<ShaderDesc>,
    /// Vertex input layout (empty when vertices are generated in the shader)
    pub input_layout: Vec<InputElement>,
    /// Primitive topology
    pub topology: PrimitiveTopology,
    /// Blending enabled on render target 0
    pub blend_enable: bool,
    /// Depth testing enabled
    pub depth_enable: bool,
    /// Depth writes enabled
    pub depth_write: bool,
    /// Face culling
    pub cull_mode: CullMode,
    /// Render target formats
    pub render_target_formats: Vec<Format>,
    /// Sample count of the render targets
    pub sample_count: u16,
}

impl PipelineDesc {
    /// Full-screen triangle pipeline: no input layout, no blending, no depth,
    /// no culling, vertices generated from the vertex index
    pub fn fullscreen_triangle(vertex_shader: ShaderDesc, pixel_shader: ShaderDesc) -> Self {
        Self {
            kind: PipelineKind::Graphics,
            vertex_shader: Some(vertex_shader),
            pixel_shader: Some(pixel_shader),
            compute_shader: None,
            input_layout: Vec::new(),
            topology: PrimitiveTopology::TriangleList,
            blend_enable: false,
            depth_enable: false,
            depth_write: false,
            cull_mode: CullMode::None,
            render_target_formats: Vec::new(),
            sample_count: 1,
        }
    }

    /// Compute pipeline
    pub fn compute(compute_shader: ShaderDesc) -> Self {
        Self {
            kind: PipelineKind::Compute,
            compute_shader: Some(compute_shader),
            ..Self::default()
        }
    }
}

/// Description of a swapchain as the host requested it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SwapchainDesc {
    /// Back buffer width
    pub width: u32,
    /// Back buffer height
    pub height: u32,
    /// Back buffer format
    pub format: Format,
    /// Samples per pixel of the back buffer
    pub sample_count: u16,
    /// Number of back buffers
    pub buffer_count: u32,
    /// Back buffer usage
    pub usage: ResourceUsage,
    /// Output window
    pub window: WindowHandle,
    /// Exclusive fullscreen
    pub fullscreen: bool,
    /// Vertical sync interval
    pub sync_interval: u32,
}

impl SwapchainDesc {
    /// Whether back buffers are multisampled
    pub fn is_multisampled(&self) -> bool {
        self.sample_count > 1
    }
}

/// Viewport rectangle and depth range
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
    /// Minimum depth
    pub min_depth: f32,
    /// Maximum depth
    pub max_depth: f32,
}

impl Viewport {
    /// Viewport covering `width` x `height` pixels with the full depth range
    #[allow(clippy::cast_precision_loss)]
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Integer rectangle (scissor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge
    pub left: i32,
    /// Top edge
    pub top: i32,
    /// Right edge (exclusive)
    pub right: i32,
    /// Bottom edge (exclusive)
    pub bottom: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_desc_clamps_samples() {
        let desc = ResourceDesc::texture_2d(64, 32, Format::R8G8B8A8Unorm, 0, ResourceUsage::RENDER_TARGET);
        assert_eq!(desc.samples, 1);
        assert_eq!(desc.width, 64);
        assert_eq!(desc.ty, ResourceType::Texture2D);
    }

    #[test]
    fn test_fullscreen_pipeline_overrides_fixed_state() {
        let desc = PipelineDesc::fullscreen_triangle(
            ShaderDesc::new(b"vs".to_vec(), "main"),
            ShaderDesc::new(b"ps".to_vec(), "main"),
        );
        assert!(desc.input_layout.is_empty());
        assert!(!desc.blend_enable);
        assert!(!desc.depth_enable);
        assert_eq!(desc.topology, PrimitiveTopology::TriangleList);
    }

    #[test]
    fn test_viewport_full() {
        let viewport = Viewport::full(1920, 1080);
        assert_eq!(viewport.width, 1920.0);
        assert_eq!(viewport.height, 1080.0);
        assert_eq!(viewport.max_depth, 1.0);
    }

    #[test]
    fn test_swapchain_multisample_detection() {
        let mut desc = SwapchainDesc { sample_count: 1, ..SwapchainDesc::default() };
        assert!(!desc.is_multisampled());
        desc.sample_count = 4;
        assert!(desc.is_multisampled());
    }
}
