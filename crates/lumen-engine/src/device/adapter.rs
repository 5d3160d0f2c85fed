use anyhow::Context;

use super::GpuInit;

/// Raises the compute limits in `base` so a square workgroup of `invocations`
/// threads fits, without exceeding what the adapter supports.
pub fn compute_limits(base: wgpu::Limits, supported: &wgpu::Limits, invocations: u32) -> wgpu::Limits {
    let side = (invocations as f64).sqrt() as u32;
    let invocations = invocations.min(supported.max_compute_invocations_per_workgroup);
    let side_x = side.min(supported.max_compute_workgroup_size_x);
    let side_y = side.min(supported.max_compute_workgroup_size_y);

    wgpu::Limits {
        max_compute_invocations_per_workgroup: base.max_compute_invocations_per_workgroup.max(invocations),
        max_compute_workgroup_size_x: base.max_compute_workgroup_size_x.max(side_x),
        max_compute_workgroup_size_y: base.max_compute_workgroup_size_y.max(side_y),
        ..base
    }
}

/// Largest sample count `<= requested` that every format in `formats`
/// supports as a render attachment. Never below 1.
///
/// Counts other than 1 and 4 need adapter-specific format features on the
/// device; without them the request is capped at 4.
pub fn max_sample_count(
    adapter: &wgpu::Adapter,
    device: &wgpu::Device,
    formats: &[wgpu::TextureFormat],
    requested: u32,
) -> u32 {
    let requested = if device
        .features()
        .contains(wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES)
    {
        requested
    } else {
        requested.min(4)
    };

    let mut count = requested.max(1).next_power_of_two();
    if count > requested.max(1) {
        count /= 2;
    }

    while count > 1 {
        let supported = formats.iter().all(|format| {
            adapter
                .get_texture_format_features(*format)
                .flags
                .sample_count_supported(count)
        });
        if supported {
            break;
        }
        count /= 2;
    }

    count
}

/// Window-less device for tests and offline tools.
///
/// Returns `None` when no adapter is available (CI without a GPU); callers
/// skip their work in that case.
pub fn headless() -> Option<(wgpu::Device, wgpu::Queue)> {
    match pollster::block_on(request_headless()) {
        Ok(pair) => Some(pair),
        Err(e) => {
            log::warn!("no headless GPU available: {e:#}");
            None
        }
    }
}

async fn request_headless() -> anyhow::Result<(wgpu::Device, wgpu::Queue)> {
    let instance = new_instance();
    let adapter = request_adapter(&instance, None).await?;
    open_device(&adapter, &GpuInit::default(), "lumen headless device").await
}

pub(crate) fn new_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    })
}

pub(crate) async fn request_adapter(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'_>>,
) -> anyhow::Result<wgpu::Adapter> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: surface,
            force_fallback_adapter: false,
        })
        .await
        .context("failed to find a suitable GPU adapter")?;

    let info = adapter.get_info();
    log::info!("GPU adapter: {} ({:?})", info.name, info.backend);
    Ok(adapter)
}

/// Opens the device with the features and limits `init` asks for: required
/// features, whichever optional features the adapter has, and compute limits
/// raised for the environment passes.
pub(crate) async fn open_device(
    adapter: &wgpu::Adapter,
    init: &GpuInit,
    label: &str,
) -> anyhow::Result<(wgpu::Device, wgpu::Queue)> {
    let required_limits = compute_limits(init.required_limits.clone(), &adapter.limits(), init.compute_invocations);
    let required_features = init.required_features | (init.optional_features & adapter.features());

    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some(label),
            required_features,
            required_limits,
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        })
        .await
        .context("failed to create wgpu device/queue")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_limits_raise_to_request() {
        let supported = wgpu::Limits {
            max_compute_invocations_per_workgroup: 1024,
            max_compute_workgroup_size_x: 1024,
            max_compute_workgroup_size_y: 1024,
            ..wgpu::Limits::default()
        };
        let limits = compute_limits(wgpu::Limits::default(), &supported, 1024);
        assert_eq!(limits.max_compute_invocations_per_workgroup, 1024);
        assert!(limits.max_compute_workgroup_size_x >= 32);
        assert!(limits.max_compute_workgroup_size_y >= 32);
    }

    #[test]
    fn compute_limits_never_exceed_adapter() {
        let supported = wgpu::Limits {
            max_compute_invocations_per_workgroup: 512,
            ..wgpu::Limits::default()
        };
        let limits = compute_limits(wgpu::Limits::default(), &supported, 1024);
        assert_eq!(limits.max_compute_invocations_per_workgroup, 512);
    }

    #[test]
    fn compute_limits_keep_higher_baseline() {
        let base = wgpu::Limits::default();
        let limits = compute_limits(base.clone(), &base, 64);
        assert_eq!(
            limits.max_compute_invocations_per_workgroup,
            base.max_compute_invocations_per_workgroup
        );
    }
}
