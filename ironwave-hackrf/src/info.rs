//! Identity information for an open device.
//!
//! Accessed through [`Device::info`], which borrows the device for the
//! duration of the queries:
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! let device = ironwave_hackrf::open_first()?;
//! let info = device.info();
//!
//! println!("board:    {}", info.board_id()?);
//! println!("firmware: {}", info.version_string()?);
//! println!("USB API:  {:#06x}", info.usb_api_version()?);
//! println!("serial:   {}", info.serial()?);
//! # Ok(())
//! # }
//! ```

use std::fmt;

use crate::device::Device;
use crate::error::{Error, check};
use crate::ffi;

/// The MCU part id and device unique id.
///
/// The part id identifies the exact LPC43xx part that was populated; the
/// unique id is what the rest of this crate calls the serial number, and
/// usually only the last two words are nonzero.
#[derive(Clone, Copy, Debug)]
#[allow(missing_docs)]
pub struct SerialNumber {
    pub part_id: [u32; 2],
    pub serial_no: [u32; 4],
}

impl SerialNumber {
    fn from_raw(raw: ffi::read_partid_serialno_t) -> Self {
        SerialNumber {
            part_id: raw.part_id,
            serial_no: raw.serial_no,
        }
    }

    /// The unique id rendered the way the board advertises it over USB: the
    /// four words concatenated as 32 lowercase hex digits.
    pub fn serial_string(&self) -> String {
        let [a, b, c, d] = self.serial_no;
        format!("{a:08x}{b:08x}{c:08x}{d:08x}")
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serial_string())
    }
}

/// The physical board's identifier, as reported by the firmware.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum BoardId {
    Jellybean,
    Jawbreaker,
    HackRf1Og,
    Rad1o,
    HackRf1R9,
    Unknown(u8),
}

impl BoardId {
    fn from_u8(v: u8) -> Self {
        use BoardId::*;
        match v {
            0 => Jellybean,
            1 => Jawbreaker,
            2 => HackRf1Og,
            3 => Rad1o,
            4 => HackRf1R9,
            v => Unknown(v),
        }
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jellybean => f.write_str("Jellybean"),
            Self::Jawbreaker => f.write_str("Jawbreaker"),
            Self::HackRf1Og => f.write_str("HackRF One"),
            Self::Rad1o => f.write_str("rad1o"),
            Self::HackRf1R9 => f.write_str("HackRF One Rev9"),
            Self::Unknown(v) => write!(f, "unknown (0x{v:x})"),
        }
    }
}

/// Info-gathering operations for an open device.
///
/// Borrows the device while doing operations.
pub struct Info<'a> {
    device: &'a Device,
}

impl Device {
    /// Access the identity queries for this device.
    pub fn info(&self) -> Info<'_> {
        Info { device: self }
    }
}

impl Info<'_> {
    /// Read the [board hardware id][BoardId].
    pub fn board_id(&self) -> Result<BoardId, Error> {
        self.device.call_native("hackrf_board_id_read", |handle| {
            let mut id = 0u8;
            let code = unsafe { ffi::hackrf_board_id_read(handle, &mut id) };
            (code, BoardId::from_u8(id))
        })
    }

    /// Read the firmware version as a string.
    pub fn version_string(&self) -> Result<String, Error> {
        self.device
            .call_native("hackrf_version_string_read", |handle| {
                let mut buf = [0u8; 32];
                let code = unsafe {
                    ffi::hackrf_version_string_read(
                        handle,
                        buf.as_mut_ptr().cast(),
                        (buf.len() - 1) as u8,
                    )
                };
                let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
                (code, String::from_utf8_lossy(&buf[..end]).into_owned())
            })
    }

    /// Read the USB API version implemented by the firmware, as a
    /// binary-coded decimal value.
    pub fn usb_api_version(&self) -> Result<u16, Error> {
        self.device
            .call_native("hackrf_usb_api_version_read", |handle| {
                let mut version = 0u16;
                let code = unsafe { ffi::hackrf_usb_api_version_read(handle, &mut version) };
                (code, version)
            })
    }

    /// Read the MCU's [part id and unique id][SerialNumber].
    pub fn serial(&self) -> Result<SerialNumber, Error> {
        self.device
            .call_native("hackrf_board_partid_serialno_read", |handle| {
                let mut raw = ffi::read_partid_serialno_t {
                    part_id: [0; 2],
                    serial_no: [0; 4],
                };
                let code = unsafe { ffi::hackrf_board_partid_serialno_read(handle, &mut raw) };
                (code, SerialNumber::from_raw(raw))
            })
    }
}

// Used while opening, before a `Device` exists to lock.
pub(crate) fn read_serial_string(handle: *mut ffi::hackrf_device) -> Result<String, Error> {
    let mut raw = ffi::read_partid_serialno_t {
        part_id: [0; 2],
        serial_no: [0; 4],
    };
    let code = unsafe { ffi::hackrf_board_partid_serialno_read(handle, &mut raw) };
    check(code, "hackrf_board_partid_serialno_read")?;
    Ok(SerialNumber::from_raw(raw).serial_string())
}
