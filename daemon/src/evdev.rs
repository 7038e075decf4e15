//! Force-feedback device binding
//!
//! Locates the haptics actuator among the Linux input devices and wraps it
//! behind the [`HapticDevice`] trait the playback engine drives.
//!
//! ## Device Detection
//! Scans `<input_dir>/event*` and picks the first device whose kernel name
//! matches the configured driver name exactly and which advertises
//! `FF_CONSTANT` or `FF_PERIODIC`.
//!
//! ## Effect Slots
//! Uploads go through the raw `EVIOCSFF` ioctl (see [`crate::ff`]) and
//! return the kernel slot id. Playing a slot writes an `EV_FF` event with
//! value 1; erasing releases the slot with `EVIOCRMFF`.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::firmware::WaveformBlob;

/// Kernel name of the haptics driver's input device
pub const DEFAULT_DRIVER_NAME: &str = "qcom-hv-haptics";

/// Directory holding the input event nodes
pub const DEFAULT_INPUT_DIR: &str = "/dev/input";

/// One effect ready to be uploaded into a kernel slot
#[derive(Debug, Clone, PartialEq)]
pub enum EffectFrame {
    /// Constant force at `level` for `length_ms`
    Constant { level: i16, length_ms: u16 },
    /// Firmware waveform streamed by the driver, scaled by `magnitude`
    Custom {
        magnitude: i16,
        waveform: Arc<WaveformBlob>,
    },
}

/// A device that can hold and play force-feedback effects
pub trait HapticDevice: Send {
    /// Upload a frame into a new slot, returning its id
    fn upload(&mut self, frame: &EffectFrame) -> io::Result<i16>;

    /// Start the effect in `slot`
    fn play(&mut self, slot: i16) -> io::Result<()>;

    /// Release `slot`
    fn erase(&mut self, slot: i16) -> io::Result<()>;
}

/// Information about a detected input device
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Path to the event device (e.g., /dev/input/event5)
    pub path: PathBuf,
    /// Device name as reported by the kernel
    pub name: String,
    /// Whether FF_CONSTANT is advertised
    pub supports_constant: bool,
    /// Whether FF_PERIODIC is advertised
    pub supports_periodic: bool,
    /// Every force-feedback capability, by kernel name
    pub ff_capabilities: Vec<String>,
}

impl DeviceInfo {
    /// Whether the engine can drive this device
    pub fn is_haptic(&self) -> bool {
        self.supports_constant || self.supports_periodic
    }
}

/// The bound haptics actuator
pub struct ForceFeedbackDevice {
    info: DeviceInfo,
    device: evdev::Device,
}

impl std::fmt::Debug for ForceFeedbackDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForceFeedbackDevice")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl ForceFeedbackDevice {
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn path(&self) -> &Path {
        &self.info.path
    }
}

impl HapticDevice for ForceFeedbackDevice {
    fn upload(&mut self, frame: &EffectFrame) -> io::Result<i16> {
        use crate::ff::{self, CustomWaveformHeader, FfEffect, NEW_EFFECT_ID};
        use std::os::fd::AsRawFd;

        let fd = self.device.as_raw_fd();
        match frame {
            EffectFrame::Constant { level, length_ms } => {
                let mut effect = FfEffect::constant(NEW_EFFECT_ID, *level, *length_ms);
                ff::upload(fd, &mut effect)
            }
            EffectFrame::Custom {
                magnitude,
                waveform,
            } => {
                // Header and samples must stay alive until the ioctl returns
                let mut header = CustomWaveformHeader::for_blob(waveform);
                let mut effect = FfEffect::custom(NEW_EFFECT_ID, *magnitude, &mut header);
                ff::upload(fd, &mut effect)
            }
        }
    }

    fn play(&mut self, slot: i16) -> io::Result<()> {
        use evdev::{EventType, InputEvent};

        let event = InputEvent::new(EventType::FORCEFEEDBACK.0, slot as u16, 1);
        self.device.send_events(&[event])
    }

    fn erase(&mut self, slot: i16) -> io::Result<()> {
        use std::os::fd::AsRawFd;

        crate::ff::erase(self.device.as_raw_fd(), slot)
    }
}

/// Find and open the haptics device named `driver_name` under `input_dir`
pub fn discover(input_dir: &Path, driver_name: &str) -> Result<ForceFeedbackDevice, DeviceError> {
    #[cfg(not(target_os = "linux"))]
    {
        let _ = (input_dir, driver_name);
        tracing::warn!("Force feedback is only available on Linux");
        return Err(DeviceError::DeviceNotFound);
    }

    #[cfg(target_os = "linux")]
    {
        scan_linux_devices(input_dir, driver_name)
    }
}

#[cfg(target_os = "linux")]
fn scan_linux_devices(
    input_dir: &Path,
    driver_name: &str,
) -> Result<ForceFeedbackDevice, DeviceError> {
    if !input_dir.exists() {
        tracing::error!("Input directory does not exist: {:?}", input_dir);
        return Err(DeviceError::DeviceNotFound);
    }

    let mut permission_denied = false;
    for path in event_nodes(input_dir)? {
        match open_device(&path) {
            Ok((info, device)) => {
                if info.name != driver_name {
                    continue;
                }
                if !info.is_haptic() {
                    tracing::warn!(
                        path = %path.display(),
                        "Device matches driver name but has no usable force feedback"
                    );
                    continue;
                }
                tracing::info!(
                    path = %path.display(),
                    name = %info.name,
                    constant = info.supports_constant,
                    periodic = info.supports_periodic,
                    "Haptics device bound"
                );
                return Ok(ForceFeedbackDevice { info, device });
            }
            Err(DeviceError::PermissionDenied) => {
                tracing::debug!("Permission denied opening {:?}", path);
                permission_denied = true;
            }
            Err(e) => {
                tracing::debug!("Could not check device {:?}: {}", path, e);
            }
        }
    }

    if permission_denied {
        tracing::warn!(driver = driver_name, "Haptics device not found; some nodes were unreadable");
    } else {
        tracing::warn!(driver = driver_name, "Haptics device not found");
    }
    Err(DeviceError::DeviceNotFound)
}

/// `event*` nodes of `input_dir`, in name order
fn event_nodes(input_dir: &Path) -> Result<Vec<PathBuf>, DeviceError> {
    let entries = std::fs::read_dir(input_dir).map_err(DeviceError::IoError)?;

    let mut nodes: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("event"))
        })
        .collect();
    nodes.sort();
    Ok(nodes)
}

#[cfg(target_os = "linux")]
fn open_error(e: io::Error) -> DeviceError {
    if e.kind() == io::ErrorKind::PermissionDenied {
        DeviceError::PermissionDenied
    } else {
        DeviceError::IoError(e)
    }
}

/// Open an event node for reading and writing.
///
/// Effects are played by writing events, so a node that only opens
/// read-only is as good as absent.
#[cfg(target_os = "linux")]
fn open_node(path: &Path) -> Result<std::fs::File, DeviceError> {
    use std::os::unix::fs::OpenOptionsExt;

    std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
        .map_err(open_error)
}

/// Open a node the engine can drive
#[cfg(target_os = "linux")]
fn open_device(path: &Path) -> Result<(DeviceInfo, evdev::Device), DeviceError> {
    let file = open_node(path)?;
    let device = evdev::Device::from_fd(file.into()).map_err(DeviceError::IoError)?;
    Ok((describe(path, &device), device))
}

#[cfg(target_os = "linux")]
fn describe(path: &Path, device: &evdev::Device) -> DeviceInfo {
    use evdev::FFEffectCode;

    let name = device.name().unwrap_or("Unknown").to_string();
    let (supports_constant, supports_periodic, ff_capabilities) = match device.supported_ff() {
        Some(ff) => (
            ff.contains(FFEffectCode::FF_CONSTANT),
            ff.contains(FFEffectCode::FF_PERIODIC),
            ff.iter().map(|code| format!("{:?}", code)).collect(),
        ),
        None => (false, false, Vec::new()),
    };

    DeviceInfo {
        path: path.to_path_buf(),
        name,
        supports_constant,
        supports_periodic,
        ff_capabilities,
    }
}

/// Every readable input device under `input_dir`.
///
/// Listing only needs the capability bits, so read-only nodes are included.
pub fn list_devices(input_dir: &Path) -> Vec<DeviceInfo> {
    #[cfg(not(target_os = "linux"))]
    {
        let _ = input_dir;
        Vec::new()
    }

    #[cfg(target_os = "linux")]
    {
        let Ok(nodes) = event_nodes(input_dir) else {
            return Vec::new();
        };
        nodes
            .iter()
            .filter_map(|path| {
                evdev::Device::open(path)
                    .ok()
                    .map(|device| describe(path, &device))
            })
            .collect()
    }
}

/// Device binding error type
#[derive(Debug)]
pub enum DeviceError {
    /// No input device matched the driver name
    DeviceNotFound,
    /// Permission denied accessing device
    PermissionDenied,
    /// I/O error
    IoError(io::Error),
}

impl std::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceError::DeviceNotFound => write!(f, "Haptics device not found"),
            DeviceError::PermissionDenied => write!(
                f,
                "Permission denied. Ensure the daemon can open the input event nodes."
            ),
            DeviceError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for DeviceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeviceError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for DeviceError {
    fn from(e: io::Error) -> Self {
        DeviceError::IoError(e)
    }
}
