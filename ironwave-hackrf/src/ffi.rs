//! Raw declarations for the native `libhackrf` driver library.
//!
//! Everything here mirrors the C API one-to-one: opaque handles, `#[repr(C)]`
//! structs, and a flat catalogue of entry points that all return a status
//! code (`0` is success). The safe layer above never hands these types to
//! users directly, with the exception of the opaque device handle pointer.
//!
//! During `cfg(test)` the whole catalogue is swapped for the [`mock`] driver,
//! so unit tests neither link `libhackrf` nor require hardware.

#![allow(non_camel_case_types)]
#![allow(missing_docs)]

use core::ffi::{c_char, c_int, c_void};

#[cfg(test)]
pub mod mock;
#[cfg(test)]
pub use mock::*;

/// Opaque device handle owned by the native library.
#[repr(C)]
pub struct hackrf_device {
    _private: [u8; 0],
}

/// Per-invocation transfer descriptor passed to streaming callbacks.
///
/// Owned by the native driver; valid only for the duration of one callback
/// invocation.
#[repr(C)]
pub struct hackrf_transfer {
    pub device: *mut hackrf_device,
    pub buffer: *mut u8,
    pub buffer_length: c_int,
    pub valid_length: c_int,
    pub rx_ctx: *mut c_void,
    pub tx_ctx: *mut c_void,
}

/// Device list as laid out by `hackrf_device_list`: parallel arrays of
/// serial-number strings and USB board identifiers, `devicecount` entries
/// each.
#[repr(C)]
pub struct hackrf_device_list_t {
    pub serial_numbers: *mut *const c_char,
    pub usb_board_ids: *mut c_int,
    pub usb_device_index: *mut c_int,
    pub devicecount: c_int,
    pub usb_devices: *mut *mut c_void,
    pub usb_devicecount: c_int,
}

/// MCU part id and device unique id, as returned by
/// `hackrf_board_partid_serialno_read`.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Zeroable, bytemuck::Pod)]
pub struct read_partid_serialno_t {
    pub part_id: [u32; 2],
    pub serial_no: [u32; 4],
}

/// Streaming callback signature. A non-zero return tells the driver to stop
/// streaming.
pub type sample_block_cb_fn = unsafe extern "C" fn(*mut hackrf_transfer) -> c_int;

#[cfg(not(test))]
mod native {
    use super::*;

    #[link(name = "hackrf")]
    unsafe extern "C" {
        // lifecycle
        pub fn hackrf_init() -> c_int;
        pub fn hackrf_exit() -> c_int;

        // enumeration
        pub fn hackrf_device_list() -> *mut hackrf_device_list_t;
        pub fn hackrf_device_list_free(list: *mut hackrf_device_list_t);
        pub fn hackrf_device_list_open(
            list: *mut hackrf_device_list_t,
            idx: c_int,
            device: *mut *mut hackrf_device,
        ) -> c_int;
        pub fn hackrf_open(device: *mut *mut hackrf_device) -> c_int;
        pub fn hackrf_open_by_serial(
            desired_serial_number: *const c_char,
            device: *mut *mut hackrf_device,
        ) -> c_int;
        pub fn hackrf_close(device: *mut hackrf_device) -> c_int;

        // identity
        pub fn hackrf_board_id_read(device: *mut hackrf_device, value: *mut u8) -> c_int;
        pub fn hackrf_version_string_read(
            device: *mut hackrf_device,
            version: *mut c_char,
            length: u8,
        ) -> c_int;
        pub fn hackrf_usb_api_version_read(device: *mut hackrf_device, version: *mut u16)
        -> c_int;
        pub fn hackrf_board_partid_serialno_read(
            device: *mut hackrf_device,
            read_partid_serialno: *mut read_partid_serialno_t,
        ) -> c_int;

        // configuration
        pub fn hackrf_set_freq(device: *mut hackrf_device, freq_hz: u64) -> c_int;
        pub fn hackrf_set_freq_explicit(
            device: *mut hackrf_device,
            if_freq_hz: u64,
            lo_freq_hz: u64,
            path: u32,
        ) -> c_int;
        pub fn hackrf_set_sample_rate(device: *mut hackrf_device, freq_hz: f64) -> c_int;
        pub fn hackrf_set_sample_rate_manual(
            device: *mut hackrf_device,
            freq_hz: u32,
            divider: u32,
        ) -> c_int;
        pub fn hackrf_set_baseband_filter_bandwidth(
            device: *mut hackrf_device,
            bandwidth_hz: u32,
        ) -> c_int;
        pub fn hackrf_set_lna_gain(device: *mut hackrf_device, value: u32) -> c_int;
        pub fn hackrf_set_vga_gain(device: *mut hackrf_device, value: u32) -> c_int;
        pub fn hackrf_set_txvga_gain(device: *mut hackrf_device, value: u32) -> c_int;
        pub fn hackrf_set_amp_enable(device: *mut hackrf_device, value: u8) -> c_int;
        pub fn hackrf_set_antenna_enable(device: *mut hackrf_device, value: u8) -> c_int;
        pub fn hackrf_set_clkout_enable(device: *mut hackrf_device, value: u8) -> c_int;
        pub fn hackrf_set_hw_sync_mode(device: *mut hackrf_device, value: u8) -> c_int;

        // streaming
        pub fn hackrf_start_rx(
            device: *mut hackrf_device,
            callback: sample_block_cb_fn,
            rx_ctx: *mut c_void,
        ) -> c_int;
        pub fn hackrf_stop_rx(device: *mut hackrf_device) -> c_int;
        pub fn hackrf_start_tx(
            device: *mut hackrf_device,
            callback: sample_block_cb_fn,
            tx_ctx: *mut c_void,
        ) -> c_int;
        pub fn hackrf_stop_tx(device: *mut hackrf_device) -> c_int;
        pub fn hackrf_is_streaming(device: *mut hackrf_device) -> c_int;
        pub fn hackrf_init_sweep(
            device: *mut hackrf_device,
            frequency_list: *const u16,
            num_ranges: u32,
            num_bytes: u32,
            step_width: u32,
            offset: u32,
            style: u32,
        ) -> c_int;
        pub fn hackrf_start_rx_sweep(
            device: *mut hackrf_device,
            callback: sample_block_cb_fn,
            rx_ctx: *mut c_void,
        ) -> c_int;

        // low-level maintenance
        pub fn hackrf_max2837_read(
            device: *mut hackrf_device,
            register_number: u8,
            value: *mut u16,
        ) -> c_int;
        pub fn hackrf_max2837_write(
            device: *mut hackrf_device,
            register_number: u8,
            value: u16,
        ) -> c_int;
        pub fn hackrf_si5351c_read(
            device: *mut hackrf_device,
            register_number: u16,
            value: *mut u16,
        ) -> c_int;
        pub fn hackrf_si5351c_write(
            device: *mut hackrf_device,
            register_number: u16,
            value: u16,
        ) -> c_int;
        pub fn hackrf_rffc5071_read(
            device: *mut hackrf_device,
            register_number: u8,
            value: *mut u16,
        ) -> c_int;
        pub fn hackrf_rffc5071_write(
            device: *mut hackrf_device,
            register_number: u8,
            value: u16,
        ) -> c_int;
        pub fn hackrf_spiflash_erase(device: *mut hackrf_device) -> c_int;
        pub fn hackrf_spiflash_read(
            device: *mut hackrf_device,
            address: u32,
            length: u16,
            data: *mut u8,
        ) -> c_int;
        pub fn hackrf_spiflash_write(
            device: *mut hackrf_device,
            address: u32,
            length: u16,
            data: *const u8,
        ) -> c_int;
        pub fn hackrf_spiflash_status(device: *mut hackrf_device, data: *mut u8) -> c_int;
        pub fn hackrf_spiflash_clear_status(device: *mut hackrf_device) -> c_int;
        pub fn hackrf_cpld_write(
            device: *mut hackrf_device,
            data: *const u8,
            total_length: u32,
        ) -> c_int;
        pub fn hackrf_reset(device: *mut hackrf_device) -> c_int;
    }
}

#[cfg(not(test))]
pub use native::*;
