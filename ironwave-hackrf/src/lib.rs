/*!

Safe control and streaming layer for the [HackRF][hackrf], built over the
native [`libhackrf`][libhackrf] driver library.

[hackrf]: https://greatscottgadgets.com/hackrf/one/
[libhackrf]: https://github.com/greatscottgadgets/hackrf/tree/master/host

The standard entry point is [`open_first()`], which initializes the driver if
needed and opens the first available device. Individual boards can instead be
picked out of [`list_devices()`] and opened by serial number through
[`DeviceInfo::open`].

A [`Device`] caches its last-applied configuration and serializes every
hardware write through one exclusive lock, so it can be shared freely between
threads. Streaming hands each hardware buffer to the callback as a borrowed
[`Transfer`] view — no copies, and no way to keep the buffer past the
callback's return.

Here's a receive session that tunes to 433 MHz and counts what arrives:

```no_run
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ironwave_hackrf::StreamControl;

fn main() -> anyhow::Result<()> {
    let device = ironwave_hackrf::open_first()?;

    device.set_sample_rate(10e6)?;
    device.set_filter_bandwidth(10_000_000)?;
    device.set_lna_gain(32)?;
    device.set_frequency(433_000_000)?;

    let received = Arc::new(AtomicUsize::new(0));
    let counter = received.clone();
    device.start_rx(move |transfer| {
        counter.fetch_add(transfer.rx_bytes().len(), Ordering::Relaxed);
        StreamControl::Continue
    })?;

    std::thread::sleep(std::time::Duration::from_secs(1));

    device.stop_rx()?;
    device.close()?;
    println!("received {} bytes", received.load(Ordering::Relaxed));
    Ok(())
}
```

The driver library itself is initialized at most once per process and torn
down at most once — either through an explicit [`shutdown()`] or at process
exit. Once torn down it stays down; this kind of native library is not safely
re-initializable.

*/

#![warn(missing_docs)]

pub mod debug;
mod device;
mod error;
pub mod ffi;
pub mod info;
mod sweep;
mod transfer;

use core::ffi::CStr;
use std::ffi::CString;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use tracing::info;

pub use crate::device::{Device, RfPathFilter, StreamControl, TransceiverMode};
pub use crate::error::{Error, Status};
pub use crate::sweep::{SweepParams, SweepStyle};
pub use crate::transfer::Transfer;

use crate::error::check;

/// Complex 8-bit signed data, as produced and consumed by the hardware.
pub type ComplexI8 = num_complex::Complex<i8>;

/// Samples delivered per transfer block by the native driver.
pub const SAMPLES_PER_BLOCK: usize = 8192;

// Process-wide init/teardown state for the native driver. Double-checked:
// the atomics keep the common path lock-free after first use.
struct Lifecycle {
    initialized: AtomicBool,
    finalized: AtomicBool,
    lock: Mutex<()>,
}

impl Lifecycle {
    const fn new() -> Self {
        Lifecycle {
            initialized: AtomicBool::new(false),
            finalized: AtomicBool::new(false),
            lock: Mutex::new(()),
        }
    }

    // Ok(true) when this call performed the native initialization.
    fn init(&self) -> Result<bool, Error> {
        if self.finalized.load(Ordering::Acquire) {
            return Err(Error::Finalized);
        }
        if self.initialized.load(Ordering::Acquire) {
            return Ok(false);
        }

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.finalized.load(Ordering::Acquire) {
            return Err(Error::Finalized);
        }
        if self.initialized.load(Ordering::Acquire) {
            return Ok(false);
        }

        let started = Instant::now();
        check(unsafe { ffi::hackrf_init() }, "hackrf_init")?;
        self.initialized.store(true, Ordering::Release);
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "driver initialized"
        );
        Ok(true)
    }

    fn shutdown(&self) -> Result<(), Error> {
        if self.finalized.load(Ordering::Acquire) {
            return Ok(());
        }

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.finalized.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        // Flag flipped first: concurrent init() calls now fail fast, and a
        // failed native exit still leaves the guard finalized.
        if !self.initialized.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        let started = Instant::now();
        check(unsafe { ffi::hackrf_exit() }, "hackrf_exit")?;
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "driver shut down"
        );
        Ok(())
    }
}

static DRIVER: Lifecycle = Lifecycle::new();

/// Initialize the native driver library.
///
/// Safe to call any number of times from any number of threads; the first
/// successful call performs the native initialization and registers a
/// process-exit teardown hook. Fails with [`Error::Finalized`] after
/// [`shutdown()`]: the native library cannot be re-initialized.
///
/// [`open_first`], [`DeviceInfo::open`], and [`list_devices`] call this
/// themselves, so an explicit call is only needed to control *when* the
/// driver comes up.
pub fn init() -> Result<(), Error> {
    if DRIVER.init()? {
        // Teardown mirror for callers that never reach shutdown() on their
        // own; the hook swallows errors since the process is going away.
        unsafe { libc::atexit(exit_hook) };
    }
    Ok(())
}

/// Tear down the native driver library.
///
/// Idempotent; the native teardown runs exactly once. After this, any
/// further [`init()`] fails.
pub fn shutdown() -> Result<(), Error> {
    DRIVER.shutdown()
}

extern "C" fn exit_hook() {
    let _ = DRIVER.shutdown();
}

/// Which board variant is attached, keyed by USB product id.
///
/// Always looked up against the closed set of known products; anything else
/// is [`Invalid`][BoardType::Invalid], never inferred.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum BoardType {
    Jawbreaker,
    HackRfOne,
    Rad1o,
    Invalid,
}

impl BoardType {
    /// Look up a USB product id.
    pub fn from_id(id: u32) -> Self {
        match id {
            0x604B => BoardType::Jawbreaker,
            0x6089 => BoardType::HackRfOne,
            0xCC15 => BoardType::Rad1o,
            _ => BoardType::Invalid,
        }
    }
}

impl fmt::Display for BoardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jawbreaker => f.write_str("Jawbreaker"),
            Self::HackRfOne => f.write_str("HackRF One"),
            Self::Rad1o => f.write_str("rad1o"),
            Self::Invalid => f.write_str("invalid"),
        }
    }
}

/// One enumerated device: its serial number and board type.
///
/// Produced by [`list_devices`]; [`open`][DeviceInfo::open] turns it into a
/// [`Device`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Serial number, as advertised over USB. Empty when the device did not
    /// report one.
    pub serial: String,
    /// Board variant.
    pub board: BoardType,
}

impl DeviceInfo {
    /// Whether this entry refers to a real device: true iff the serial
    /// number is non-empty.
    pub fn exists(&self) -> bool {
        !self.serial.is_empty()
    }

    /// Open this device by serial number.
    pub fn open(&self) -> Result<Device, Error> {
        init()?;
        let serial = CString::new(self.serial.as_str())
            .map_err(|_| Error::InvalidParameter("serial number contains a NUL byte"))?;
        let mut handle = core::ptr::null_mut();
        check(
            unsafe { ffi::hackrf_open_by_serial(serial.as_ptr(), &mut handle) },
            "hackrf_open_by_serial",
        )?;
        info!(serial = %self.serial, handle = ?handle, "device opened");
        Ok(Device::from_raw(handle, self.serial.clone()))
    }
}

// Releases the native device list on every path out of list_devices.
struct ListGuard(*mut ffi::hackrf_device_list_t);

impl Drop for ListGuard {
    fn drop(&mut self) {
        unsafe { ffi::hackrf_device_list_free(self.0) };
    }
}

/// List all attached devices.
///
/// Zero attached devices yields an empty list, not an error.
pub fn list_devices() -> Result<Vec<DeviceInfo>, Error> {
    init()?;
    let raw = unsafe { ffi::hackrf_device_list() };
    if raw.is_null() {
        return Err(Error::Call {
            op: "hackrf_device_list",
            status: Status::NoMem,
        });
    }
    let list = ListGuard(raw);

    let count = unsafe { (*list.0).devicecount }.max(0) as usize;
    let mut devices = Vec::with_capacity(count);
    for i in 0..count {
        let serial_ptr = unsafe { *(*list.0).serial_numbers.add(i) };
        let serial = if serial_ptr.is_null() {
            String::new()
        } else {
            unsafe { CStr::from_ptr(serial_ptr) }
                .to_string_lossy()
                .into_owned()
        };
        let board = BoardType::from_id(unsafe { *(*list.0).usb_board_ids.add(i) } as u32);
        devices.push(DeviceInfo { serial, board });
    }
    Ok(devices)
}

/// List attached devices of one board type. Exact matches only.
pub fn list_devices_of(board: BoardType) -> Result<Vec<DeviceInfo>, Error> {
    Ok(list_devices()?
        .into_iter()
        .filter(|d| d.board == board)
        .collect())
}

/// Open the first available device and read back its serial number.
pub fn open_first() -> Result<Device, Error> {
    init()?;
    let mut handle = core::ptr::null_mut();
    check(unsafe { ffi::hackrf_open(&mut handle) }, "hackrf_open")?;

    let serial = match info::read_serial_string(handle) {
        Ok(serial) => serial,
        Err(err) => {
            // Don't leak a handle we can't identify.
            unsafe { ffi::hackrf_close(handle) };
            return Err(err);
        }
    };

    info!(%serial, handle = ?handle, "device opened");
    Ok(Device::from_raw(handle, serial))
}
