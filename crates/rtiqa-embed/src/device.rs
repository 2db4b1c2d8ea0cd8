use candle_core::Device;
use tracing::info;

/// CPU unless built with `metal` and a Metal device is present.
pub fn select_device() -> Device {
    #[cfg(feature = "metal")]
    match Device::new_metal(0) {
        Ok(dev) => {
            info!(device = "metal", "embedding device selected");
            return dev;
        }
        Err(e) => tracing::warn!(error = %e, "metal unavailable, using cpu"),
    }
    info!(device = "cpu", "embedding device selected");
    Device::Cpu
}
