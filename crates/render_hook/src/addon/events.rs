//! Event kinds and their callback signatures
//!
//! Every event kind is an uninhabited marker type. The marker carries the
//! [`AddonEvent`] tag used to key the registry and the exact callback type
//! observers register for it, so a callback can never be invoked with the
//! wrong arguments.
//!
//! Lifecycle events notify; their callbacks return nothing. Intercept events
//! let observers take over an operation: returning `true` from a command
//! event skips the native command, returning `true` from a create event makes
//! the (possibly edited) description authoritative.

use crate::api::command::{CommandList, CommandQueue};
use crate::api::desc::{
    PipelineDesc, ResourceDesc, ResourceUsage, ResourceViewDesc, SamplerDesc, SwapchainDesc,
    Viewport,
};
use crate::api::device::Device;
use crate::api::format::Format;
use crate::api::handle::{Pipeline, Resource, ResourceView};
use crate::api::swapchain::Swapchain;
use crate::runtime::EffectRuntime;

/// An event kind bound to one callback signature
pub trait EventKind: 'static {
    /// Registry key of this kind
    const EVENT: AddonEvent;

    /// Callback type observers register (`dyn Fn(...) + Send + Sync`)
    type Callback: ?Sized + Send + Sync + 'static;
}

/// Event kinds whose callbacks return nothing
pub trait LifecycleEvent: EventKind {}

/// Event kinds whose callbacks return `true` to take over the operation
pub trait InterceptEvent: EventKind {}

macro_rules! define_events {
    (
        lifecycle {
            $( $(#[$ldoc:meta])* $lname:ident => ($($larg:ty),*); )*
        }
        intercept {
            $( $(#[$idoc:meta])* $iname:ident => ($($iarg:ty),*); )*
        }
    ) => {
        /// Tag identifying an event kind at runtime
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum AddonEvent {
            $( $(#[$ldoc])* $lname, )*
            $( $(#[$idoc])* $iname, )*
        }

        impl AddonEvent {
            /// Every event kind, lifecycle kinds first
            pub const ALL: &'static [AddonEvent] = &[
                $( AddonEvent::$lname, )*
                $( AddonEvent::$iname, )*
            ];

            /// Whether callbacks of this kind can take over the operation
            pub fn is_intercept(self) -> bool {
                match self {
                    $( AddonEvent::$lname => false, )*
                    $( AddonEvent::$iname => true, )*
                }
            }
        }

        $(
            $(#[$ldoc])*
            #[derive(Debug)]
            pub enum $lname {}

            impl EventKind for $lname {
                const EVENT: AddonEvent = AddonEvent::$lname;
                type Callback = dyn Fn($($larg),*) + Send + Sync;
            }

            impl LifecycleEvent for $lname {}
        )*

        $(
            $(#[$idoc])*
            #[derive(Debug)]
            pub enum $iname {}

            impl EventKind for $iname {
                const EVENT: AddonEvent = AddonEvent::$iname;
                type Callback = dyn Fn($($iarg),*) -> bool + Send + Sync;
            }

            impl InterceptEvent for $iname {}
        )*
    };
}

define_events! {
    lifecycle {
        /// A device was created
        InitDevice => (&Device);
        /// A device is about to be destroyed
        DestroyDevice => (&Device);
        /// A command list was created
        InitCommandList => (&CommandList);
        /// A command list is about to be destroyed
        DestroyCommandList => (&CommandList);
        /// A command queue was created
        InitCommandQueue => (&CommandQueue);
        /// A command queue is about to be destroyed
        DestroyCommandQueue => (&CommandQueue);
        /// A swapchain finished initialization (back buffer available)
        InitSwapchain => (&Swapchain);
        /// A swapchain is being reset or destroyed
        DestroySwapchain => (&Swapchain);
        /// An effect runtime was initialized
        InitEffectRuntime => (&EffectRuntime);
        /// An effect runtime is being reset
        DestroyEffectRuntime => (&EffectRuntime);
        /// A swapchain is about to be resized to the given width and height
        Resize => (&Swapchain, u32, u32);
        /// A frame is about to be presented
        Present => (&CommandQueue, &Swapchain);
        /// The effect runtime renders on the given command list
        PresentEffectRuntime => (&EffectRuntime, &mut CommandList);
        /// A command list is about to be submitted to a queue
        ExecuteCommandList => (&CommandQueue, &CommandList);
    }
    intercept {
        /// A swapchain is about to be created
        CreateSwapchain => (&mut SwapchainDesc);
        /// A resource is about to be created in the given initial state
        CreateResource => (&Device, &mut ResourceDesc, ResourceUsage);
        /// A view onto a resource is about to be created
        CreateResourceView => (&Device, Resource, &mut ResourceViewDesc);
        /// A sampler is about to be created
        CreateSampler => (&Device, &mut SamplerDesc);
        /// A pipeline is about to be created
        CreatePipeline => (&Device, &mut PipelineDesc);
        /// Vertex count, instance count, first vertex, first instance
        Draw => (&CommandList, u32, u32, u32, u32);
        /// Index count, instance count, first index, vertex offset, first instance
        DrawIndexed => (&CommandList, u32, u32, u32, i32, u32);
        /// Thread group counts in x, y and z
        Dispatch => (&CommandList, u32, u32, u32);
        /// Source, destination
        CopyResource => (&CommandList, Resource, Resource);
        /// Source, destination, resolve format
        ResolveResource => (&CommandList, Resource, Resource, Format);
        /// Render target view, clear color
        ClearRenderTargetView => (&CommandList, ResourceView, &[f32; 4]);
        /// A pipeline is about to be bound
        BindPipeline => (&CommandList, Pipeline);
        /// Viewports are about to be bound; edits are what the driver receives
        BindViewports => (&CommandList, &mut Vec<Viewport>);
    }
}
