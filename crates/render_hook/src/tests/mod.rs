//! Cross-module scenarios: device, queue, swapchain and runtime together
