//! Kernel force-feedback ABI
//!
//! Mirrors the `struct ff_effect` family from `linux/input.h` closely enough
//! to upload constant-force and custom periodic effects through `EVIOCSFF`.
//! The `evdev` crate covers device discovery and event writes but cannot
//! express `FF_CUSTOM` waveforms, so uploads and erases go through these
//! definitions.

use std::io;
use std::mem::size_of;
use std::os::fd::RawFd;

use crate::firmware::WaveformBlob;

/// Effect type: constant force
pub const FF_CONSTANT: u16 = 0x52;
/// Effect type: periodic waveform
pub const FF_PERIODIC: u16 = 0x51;
/// Periodic waveform: driver-defined custom data
pub const FF_CUSTOM: u16 = 0x5d;

/// Effect id the kernel treats as "allocate a new slot"
pub const NEW_EFFECT_ID: i16 = -1;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FfTrigger {
    pub button: u16,
    pub interval: u16,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FfReplay {
    pub length: u16,
    pub delay: u16,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FfEnvelope {
    pub attack_length: u16,
    pub attack_level: u16,
    pub fade_length: u16,
    pub fade_level: u16,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FfConstantEffect {
    pub level: i16,
    pub envelope: FfEnvelope,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FfConditionEffect {
    pub right_saturation: u16,
    pub left_saturation: u16,
    pub right_coeff: i16,
    pub left_coeff: i16,
    pub deadband: u16,
    pub center: i16,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FfPeriodicEffect {
    pub waveform: u16,
    pub period: u16,
    pub magnitude: i16,
    pub offset: i16,
    pub phase: u16,
    pub envelope: FfEnvelope,
    pub custom_len: u32,
    pub custom_data: *mut i16,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union FfEffectParams {
    pub constant: FfConstantEffect,
    pub periodic: FfPeriodicEffect,
    // Never written; sizes the union like the kernel's on every pointer width
    _condition: [FfConditionEffect; 2],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct FfEffect {
    pub kind: u16,
    pub id: i16,
    pub direction: u16,
    pub trigger: FfTrigger,
    pub replay: FfReplay,
    pub u: FfEffectParams,
}

#[cfg(target_pointer_width = "64")]
const _: () = assert!(size_of::<FfEffect>() == 48);

#[cfg(target_pointer_width = "32")]
const _: () = assert!(size_of::<FfEffect>() == 44);

/// Header the haptics driver reads through `custom_data`.
///
/// The driver copies this struct from user space and then streams `length`
/// bytes from `data` into its FIFO at `play_rate_hz`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CustomWaveformHeader {
    pub effect_id: u32,
    pub length: u32,
    pub play_rate_hz: u32,
    pub data: *const i8,
}

impl CustomWaveformHeader {
    /// Borrow a header for `blob`; valid only while `blob` is alive
    pub fn for_blob(blob: &WaveformBlob) -> Self {
        Self {
            effect_id: blob.effect_id,
            length: blob.len() as u32,
            play_rate_hz: blob.play_rate_hz,
            data: blob.samples().as_ptr(),
        }
    }
}

impl FfEffect {
    /// Constant-force effect of `length_ms` at `level`
    pub fn constant(id: i16, level: i16, length_ms: u16) -> Self {
        Self {
            kind: FF_CONSTANT,
            id,
            direction: 0,
            trigger: FfTrigger::default(),
            replay: FfReplay { length: length_ms, delay: 0 },
            u: FfEffectParams {
                constant: FfConstantEffect { level, envelope: FfEnvelope::default() },
            },
        }
    }

    /// Custom periodic effect whose samples are described by `header`
    pub fn custom(id: i16, magnitude: i16, header: &mut CustomWaveformHeader) -> Self {
        Self {
            kind: FF_PERIODIC,
            id,
            direction: 0,
            trigger: FfTrigger::default(),
            replay: FfReplay::default(),
            u: FfEffectParams {
                periodic: FfPeriodicEffect {
                    waveform: FF_CUSTOM,
                    period: 0,
                    magnitude,
                    offset: 0,
                    phase: 0,
                    envelope: FfEnvelope::default(),
                    custom_len: size_of::<CustomWaveformHeader>() as u32,
                    custom_data: header as *mut CustomWaveformHeader as *mut i16,
                },
            },
        }
    }
}

// ============================================================================
// ioctl request codes
// ============================================================================

const IOC_WRITE: u64 = 1;
const IOC_NRSHIFT: u64 = 0;
const IOC_TYPESHIFT: u64 = 8;
const IOC_SIZESHIFT: u64 = 16;
const IOC_DIRSHIFT: u64 = 30;

const fn iow(kind: u8, nr: u8, size: usize) -> u64 {
    (IOC_WRITE << IOC_DIRSHIFT)
        | ((kind as u64) << IOC_TYPESHIFT)
        | ((nr as u64) << IOC_NRSHIFT)
        | ((size as u64) << IOC_SIZESHIFT)
}

/// Upload (or update) an effect
pub const EVIOCSFF: u64 = iow(b'E', 0x80, size_of::<FfEffect>());

/// Erase an uploaded effect
pub const EVIOCRMFF: u64 = iow(b'E', 0x81, size_of::<libc::c_int>());

/// Upload `effect`, returning the slot id assigned by the kernel
pub fn upload(fd: RawFd, effect: &mut FfEffect) -> io::Result<i16> {
    loop {
        // SAFETY: `effect` is a valid, exclusively borrowed ff_effect and any
        // custom_data pointer it carries outlives this call.
        let ret = unsafe { libc::ioctl(fd, EVIOCSFF as _, effect as *mut FfEffect) };
        if ret >= 0 {
            return Ok(effect.id);
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// Erase the effect in `slot`
pub fn erase(fd: RawFd, slot: i16) -> io::Result<()> {
    loop {
        // SAFETY: EVIOCRMFF takes the effect id by value.
        let ret = unsafe { libc::ioctl(fd, EVIOCRMFF as _, slot as libc::c_int) };
        if ret >= 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}
