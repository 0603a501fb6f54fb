//! In-process stand-in for the native driver, used by unit tests.
//!
//! Exposes the same function names and signatures as the real catalogue, all
//! backed by a thread-local [`MockDriver`]. Tests run on their own threads,
//! so each test gets an isolated driver: it can preload a device list, script
//! a failure status for any entry point, count the calls an operation
//! actually issued, and synchronously drive the registered streaming
//! callback with fabricated transfers.

use core::ffi::{c_char, c_int, c_void};
use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::CString;
use std::ptr::NonNull;

use super::{
    hackrf_device, hackrf_device_list_t, hackrf_transfer, read_partid_serialno_t,
    sample_block_cb_fn,
};

const SUCCESS: c_int = 0;
const TRUE: c_int = 1;
const NOT_FOUND: c_int = -5;
const STREAMING_STOPPED: c_int = -1003;

/// Mutable state of the mock driver for the current test thread.
pub struct MockDriver {
    /// Ordered log of every entry point invoked.
    pub calls: Vec<&'static str>,
    /// Status code to return instead of success, per entry point.
    pub failures: HashMap<&'static str, c_int>,
    /// Devices reported by `hackrf_device_list`, as `(serial, usb board id)`.
    pub devices: Vec<(CString, u32)>,
    /// Value written by `hackrf_board_partid_serialno_read`.
    pub serialno: read_partid_serialno_t,
    /// Value written by `hackrf_board_id_read`.
    pub board_id: u8,
    list: Option<ListStorage>,
    rx_stream: Option<(sample_block_cb_fn, *mut c_void)>,
    tx_stream: Option<(sample_block_cb_fn, *mut c_void)>,
}

impl MockDriver {
    fn new() -> Self {
        MockDriver {
            calls: Vec::new(),
            failures: HashMap::new(),
            devices: Vec::new(),
            serialno: read_partid_serialno_t {
                part_id: [0xa000_cb3c, 0x004f_4552],
                serial_no: [0, 0, 0x4563_88c3, 0x2d3b_41dc],
            },
            board_id: 2,
            list: None,
            rx_stream: None,
            tx_stream: None,
        }
    }
}

// Keeps the parallel arrays behind a returned device list alive until the
// matching free call.
struct ListStorage {
    _serials: Vec<CString>,
    _ptrs: Vec<*const c_char>,
    _ids: Vec<c_int>,
    _indexes: Vec<c_int>,
    raw: *mut hackrf_device_list_t,
}

thread_local! {
    static MOCK: RefCell<MockDriver> = RefCell::new(MockDriver::new());
}

/// Run `f` against this thread's mock driver state.
///
/// Falls back to `default` if thread-local storage is already gone, which
/// happens when the atexit teardown hook fires during process shutdown.
pub fn with<R>(default: R, f: impl FnOnce(&mut MockDriver) -> R) -> R {
    MOCK.try_with(|m| f(&mut m.borrow_mut())).unwrap_or(default)
}

/// Reset this thread's mock driver to a pristine state.
pub fn reset() {
    MOCK.with(|m| *m.borrow_mut() = MockDriver::new());
}

/// Number of times `op` was invoked on this thread.
pub fn calls(op: &'static str) -> usize {
    with(0, |m| m.calls.iter().filter(|c| **c == op).count())
}

/// Make `op` return `code` until cleared.
pub fn fail(op: &'static str, code: c_int) {
    with((), |m| {
        m.failures.insert(op, code);
    });
}

/// Let `op` succeed again.
pub fn clear_failure(op: &'static str) {
    with((), |m| {
        m.failures.remove(&op);
    });
}

/// Preload a device for enumeration.
pub fn add_device(serial: &str, board_id: u32) {
    let serial = CString::new(serial).expect("serial with NUL");
    with((), |m| m.devices.push((serial, board_id)));
}

/// The sentinel handle handed out by the mock open calls. Opaque to the safe
/// layer and never dereferenced.
pub fn fake_handle() -> *mut hackrf_device {
    NonNull::<hackrf_device>::dangling().as_ptr()
}

/// Invoke the registered RX (or sweep) callback up to `count` times with a
/// fabricated transfer of `buffer_len` bytes, `valid_len` of them populated.
/// Stops early if the callback requests it. Returns the number of
/// invocations actually performed.
pub fn drive_rx(count: usize, buffer_len: usize, valid_len: usize) -> usize {
    let Some((cb, ctx)) = with(None, |m| m.rx_stream) else {
        return 0;
    };
    let mut buf = vec![0u8; buffer_len];
    for (i, b) in buf.iter_mut().enumerate() {
        *b = i as u8;
    }
    let mut done = 0;
    for _ in 0..count {
        let mut transfer = hackrf_transfer {
            device: fake_handle(),
            buffer: buf.as_mut_ptr(),
            buffer_length: buffer_len as c_int,
            valid_length: valid_len as c_int,
            rx_ctx: ctx,
            tx_ctx: core::ptr::null_mut(),
        };
        done += 1;
        if unsafe { cb(&mut transfer) } != 0 {
            break;
        }
    }
    done
}

/// Invoke the registered TX callback up to `count` times with an empty
/// scratch buffer of `buffer_len` bytes. Returns the buffers as filled by the
/// callback, one per invocation performed.
pub fn drive_tx(count: usize, buffer_len: usize) -> Vec<Vec<u8>> {
    let Some((cb, ctx)) = with(None, |m| m.tx_stream) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for _ in 0..count {
        let mut buf = vec![0u8; buffer_len];
        let mut transfer = hackrf_transfer {
            device: fake_handle(),
            buffer: buf.as_mut_ptr(),
            buffer_length: buffer_len as c_int,
            valid_length: buffer_len as c_int,
            rx_ctx: core::ptr::null_mut(),
            tx_ctx: ctx,
        };
        let stop = unsafe { cb(&mut transfer) } != 0;
        out.push(buf);
        if stop {
            break;
        }
    }
    out
}

fn status_of(op: &'static str) -> c_int {
    with(SUCCESS, |m| {
        m.calls.push(op);
        m.failures.get(&op).copied().unwrap_or(SUCCESS)
    })
}

// --- lifecycle -------------------------------------------------------------

pub unsafe fn hackrf_init() -> c_int {
    status_of("hackrf_init")
}

pub unsafe fn hackrf_exit() -> c_int {
    status_of("hackrf_exit")
}

// --- enumeration -----------------------------------------------------------

pub unsafe fn hackrf_device_list() -> *mut hackrf_device_list_t {
    if status_of("hackrf_device_list") != SUCCESS {
        return core::ptr::null_mut();
    }
    with(core::ptr::null_mut(), |m| {
        let serials: Vec<CString> = m.devices.iter().map(|(s, _)| s.clone()).collect();
        let mut ptrs: Vec<*const c_char> = serials.iter().map(|s| s.as_ptr()).collect();
        let mut ids: Vec<c_int> = m.devices.iter().map(|(_, id)| *id as c_int).collect();
        let mut indexes: Vec<c_int> = (0..m.devices.len() as c_int).collect();
        let raw = Box::into_raw(Box::new(hackrf_device_list_t {
            serial_numbers: ptrs.as_mut_ptr(),
            usb_board_ids: ids.as_mut_ptr(),
            usb_device_index: indexes.as_mut_ptr(),
            devicecount: m.devices.len() as c_int,
            usb_devices: core::ptr::null_mut(),
            usb_devicecount: m.devices.len() as c_int,
        }));
        m.list = Some(ListStorage {
            _serials: serials,
            _ptrs: ptrs,
            _ids: ids,
            _indexes: indexes,
            raw,
        });
        raw
    })
}

pub unsafe fn hackrf_device_list_free(list: *mut hackrf_device_list_t) {
    with((), |m| {
        m.calls.push("hackrf_device_list_free");
        if let Some(storage) = m.list.take() {
            assert_eq!(storage.raw, list, "freed a list that was never handed out");
            drop(unsafe { Box::from_raw(storage.raw) });
        }
    });
}

pub unsafe fn hackrf_open(device: *mut *mut hackrf_device) -> c_int {
    let code = status_of("hackrf_open");
    if code == SUCCESS {
        unsafe { *device = fake_handle() };
    }
    code
}

pub unsafe fn hackrf_open_by_serial(
    desired_serial_number: *const c_char,
    device: *mut *mut hackrf_device,
) -> c_int {
    let code = status_of("hackrf_open_by_serial");
    if code != SUCCESS {
        return code;
    }
    let wanted = unsafe { core::ffi::CStr::from_ptr(desired_serial_number) };
    let known = with(true, |m| {
        m.devices.is_empty() || m.devices.iter().any(|(s, _)| s.as_c_str() == wanted)
    });
    if !known {
        return NOT_FOUND;
    }
    unsafe { *device = fake_handle() };
    SUCCESS
}

pub unsafe fn hackrf_close(_device: *mut hackrf_device) -> c_int {
    status_of("hackrf_close")
}

// --- identity --------------------------------------------------------------

pub unsafe fn hackrf_board_id_read(_device: *mut hackrf_device, value: *mut u8) -> c_int {
    let code = status_of("hackrf_board_id_read");
    if code == SUCCESS {
        unsafe { *value = with(0, |m| m.board_id) };
    }
    code
}

pub unsafe fn hackrf_version_string_read(
    _device: *mut hackrf_device,
    version: *mut c_char,
    length: u8,
) -> c_int {
    let code = status_of("hackrf_version_string_read");
    if code == SUCCESS {
        let text = b"2024.02.1-mock\0";
        let n = text.len().min(length as usize);
        for (i, b) in text[..n].iter().enumerate() {
            unsafe { *version.add(i) = *b as c_char };
        }
    }
    code
}

pub unsafe fn hackrf_usb_api_version_read(_device: *mut hackrf_device, version: *mut u16) -> c_int {
    let code = status_of("hackrf_usb_api_version_read");
    if code == SUCCESS {
        unsafe { *version = 0x0107 };
    }
    code
}

pub unsafe fn hackrf_board_partid_serialno_read(
    _device: *mut hackrf_device,
    read_partid_serialno: *mut read_partid_serialno_t,
) -> c_int {
    let code = status_of("hackrf_board_partid_serialno_read");
    if code == SUCCESS {
        unsafe { *read_partid_serialno = with(MockDriver::new().serialno, |m| m.serialno) };
    }
    code
}

// --- configuration ---------------------------------------------------------

pub unsafe fn hackrf_set_freq(_device: *mut hackrf_device, _freq_hz: u64) -> c_int {
    status_of("hackrf_set_freq")
}

pub unsafe fn hackrf_set_freq_explicit(
    _device: *mut hackrf_device,
    _if_freq_hz: u64,
    _lo_freq_hz: u64,
    _path: u32,
) -> c_int {
    status_of("hackrf_set_freq_explicit")
}

pub unsafe fn hackrf_set_sample_rate(_device: *mut hackrf_device, _freq_hz: f64) -> c_int {
    status_of("hackrf_set_sample_rate")
}

pub unsafe fn hackrf_set_sample_rate_manual(
    _device: *mut hackrf_device,
    _freq_hz: u32,
    _divider: u32,
) -> c_int {
    status_of("hackrf_set_sample_rate_manual")
}

pub unsafe fn hackrf_set_baseband_filter_bandwidth(
    _device: *mut hackrf_device,
    _bandwidth_hz: u32,
) -> c_int {
    status_of("hackrf_set_baseband_filter_bandwidth")
}

pub unsafe fn hackrf_set_lna_gain(_device: *mut hackrf_device, _value: u32) -> c_int {
    status_of("hackrf_set_lna_gain")
}

pub unsafe fn hackrf_set_vga_gain(_device: *mut hackrf_device, _value: u32) -> c_int {
    status_of("hackrf_set_vga_gain")
}

pub unsafe fn hackrf_set_txvga_gain(_device: *mut hackrf_device, _value: u32) -> c_int {
    status_of("hackrf_set_txvga_gain")
}

pub unsafe fn hackrf_set_amp_enable(_device: *mut hackrf_device, _value: u8) -> c_int {
    status_of("hackrf_set_amp_enable")
}

pub unsafe fn hackrf_set_antenna_enable(_device: *mut hackrf_device, _value: u8) -> c_int {
    status_of("hackrf_set_antenna_enable")
}

pub unsafe fn hackrf_set_clkout_enable(_device: *mut hackrf_device, _value: u8) -> c_int {
    status_of("hackrf_set_clkout_enable")
}

pub unsafe fn hackrf_set_hw_sync_mode(_device: *mut hackrf_device, _value: u8) -> c_int {
    status_of("hackrf_set_hw_sync_mode")
}

// --- streaming -------------------------------------------------------------

pub unsafe fn hackrf_start_rx(
    _device: *mut hackrf_device,
    callback: sample_block_cb_fn,
    rx_ctx: *mut c_void,
) -> c_int {
    let code = status_of("hackrf_start_rx");
    if code == SUCCESS {
        with((), |m| m.rx_stream = Some((callback, rx_ctx)));
    }
    code
}

pub unsafe fn hackrf_stop_rx(_device: *mut hackrf_device) -> c_int {
    let code = status_of("hackrf_stop_rx");
    with((), |m| m.rx_stream = None);
    code
}

pub unsafe fn hackrf_start_tx(
    _device: *mut hackrf_device,
    callback: sample_block_cb_fn,
    tx_ctx: *mut c_void,
) -> c_int {
    let code = status_of("hackrf_start_tx");
    if code == SUCCESS {
        with((), |m| m.tx_stream = Some((callback, tx_ctx)));
    }
    code
}

pub unsafe fn hackrf_stop_tx(_device: *mut hackrf_device) -> c_int {
    let code = status_of("hackrf_stop_tx");
    with((), |m| m.tx_stream = None);
    code
}

pub unsafe fn hackrf_is_streaming(_device: *mut hackrf_device) -> c_int {
    let scripted = status_of("hackrf_is_streaming");
    if scripted != SUCCESS {
        return scripted;
    }
    with(STREAMING_STOPPED, |m| {
        if m.rx_stream.is_some() || m.tx_stream.is_some() {
            TRUE
        } else {
            STREAMING_STOPPED
        }
    })
}

pub unsafe fn hackrf_init_sweep(
    _device: *mut hackrf_device,
    _frequency_list: *const u16,
    _num_ranges: u32,
    _num_bytes: u32,
    _step_width: u32,
    _offset: u32,
    _style: u32,
) -> c_int {
    status_of("hackrf_init_sweep")
}

pub unsafe fn hackrf_start_rx_sweep(
    _device: *mut hackrf_device,
    callback: sample_block_cb_fn,
    rx_ctx: *mut c_void,
) -> c_int {
    let code = status_of("hackrf_start_rx_sweep");
    if code == SUCCESS {
        with((), |m| m.rx_stream = Some((callback, rx_ctx)));
    }
    code
}

// --- low-level maintenance -------------------------------------------------

pub unsafe fn hackrf_max2837_read(
    _device: *mut hackrf_device,
    _register_number: u8,
    value: *mut u16,
) -> c_int {
    let code = status_of("hackrf_max2837_read");
    if code == SUCCESS {
        unsafe { *value = 0 };
    }
    code
}

pub unsafe fn hackrf_max2837_write(
    _device: *mut hackrf_device,
    _register_number: u8,
    _value: u16,
) -> c_int {
    status_of("hackrf_max2837_write")
}

pub unsafe fn hackrf_si5351c_read(
    _device: *mut hackrf_device,
    _register_number: u16,
    value: *mut u16,
) -> c_int {
    let code = status_of("hackrf_si5351c_read");
    if code == SUCCESS {
        unsafe { *value = 0 };
    }
    code
}

pub unsafe fn hackrf_si5351c_write(
    _device: *mut hackrf_device,
    _register_number: u16,
    _value: u16,
) -> c_int {
    status_of("hackrf_si5351c_write")
}

pub unsafe fn hackrf_rffc5071_read(
    _device: *mut hackrf_device,
    _register_number: u8,
    value: *mut u16,
) -> c_int {
    let code = status_of("hackrf_rffc5071_read");
    if code == SUCCESS {
        unsafe { *value = 0 };
    }
    code
}

pub unsafe fn hackrf_rffc5071_write(
    _device: *mut hackrf_device,
    _register_number: u8,
    _value: u16,
) -> c_int {
    status_of("hackrf_rffc5071_write")
}

pub unsafe fn hackrf_spiflash_erase(_device: *mut hackrf_device) -> c_int {
    status_of("hackrf_spiflash_erase")
}

pub unsafe fn hackrf_spiflash_read(
    _device: *mut hackrf_device,
    _address: u32,
    length: u16,
    data: *mut u8,
) -> c_int {
    let code = status_of("hackrf_spiflash_read");
    if code == SUCCESS {
        for i in 0..length as usize {
            unsafe { *data.add(i) = 0xff };
        }
    }
    code
}

pub unsafe fn hackrf_spiflash_write(
    _device: *mut hackrf_device,
    _address: u32,
    _length: u16,
    _data: *const u8,
) -> c_int {
    status_of("hackrf_spiflash_write")
}

pub unsafe fn hackrf_spiflash_status(_device: *mut hackrf_device, data: *mut u8) -> c_int {
    let code = status_of("hackrf_spiflash_status");
    if code == SUCCESS {
        unsafe { *data = 0 };
    }
    code
}

pub unsafe fn hackrf_spiflash_clear_status(_device: *mut hackrf_device) -> c_int {
    status_of("hackrf_spiflash_clear_status")
}

pub unsafe fn hackrf_cpld_write(
    _device: *mut hackrf_device,
    _data: *const u8,
    _total_length: u32,
) -> c_int {
    status_of("hackrf_cpld_write")
}

pub unsafe fn hackrf_reset(_device: *mut hackrf_device) -> c_int {
    status_of("hackrf_reset")
}
