use core::ffi::{c_int, c_void};
use std::fmt;
use std::ops::Range;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{error, info, warn};

use crate::error::{Error, Status, check};
use crate::ffi;
use crate::sweep::SweepParams;
use crate::transfer::Transfer;

/// Operating mode of a device: off, receiving, or transmitting.
///
/// RX and TX are mutually exclusive; there is no direct RX→TX transition.
/// Stop one mode before starting the other.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransceiverMode {
    /// Idle.
    Off,
    /// Receiving (including a receive sweep).
    Rx,
    /// Transmitting.
    Tx,
}

impl TransceiverMode {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => TransceiverMode::Rx,
            2 => TransceiverMode::Tx,
            _ => TransceiverMode::Off,
        }
    }
}

impl fmt::Display for TransceiverMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransceiverMode::Off => f.write_str("off"),
            TransceiverMode::Rx => f.write_str("RX"),
            TransceiverMode::Tx => f.write_str("TX"),
        }
    }
}

/// What a streaming callback wants the driver to do next.
///
/// [`Stop`][StreamControl::Stop] is the only cancellation channel available
/// from inside the callback; it maps to the non-zero return status the
/// native driver interprets as a stop request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum StreamControl {
    Continue,
    Stop,
}

/// RF path filter selection for [`Device::set_freq_explicit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RfPathFilter {
    /// No filter selected - mixer bypassed.
    Bypass = 0,
    /// Low pass filter, `f_c = f_IF - f_LO`
    LowPass = 1,
    /// High pass filter, `f_c = f_IF + f_LO`
    HighPass = 2,
}

impl fmt::Display for RfPathFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bypass => f.write_str("mixer bypass"),
            Self::LowPass => f.write_str("low pass filter"),
            Self::HighPass => f.write_str("high pass filter"),
        }
    }
}

type BoxedCallback = Box<dyn FnMut(&mut Transfer<'_>) -> StreamControl + Send>;

// Last-applied configuration, mirrored so reads never need a native
// round-trip and repeated equal writes can be suppressed.
#[derive(Clone, Copy)]
struct Config {
    frequency_hz: u64,
    sample_rate_hz: f64,
    filter_bandwidth_hz: u32,
    lna_gain_db: u32,
    vga_gain_db: u32,
    txvga_gain_db: u32,
    antenna_power: bool,
    lna_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        // Gain defaults match the power-up state of the board.
        Config {
            frequency_hz: 0,
            sample_rate_hz: 0.0,
            filter_bandwidth_hz: 0,
            lna_gain_db: 16,
            vga_gain_db: 20,
            txvga_gain_db: 0,
            antenna_power: false,
            lna_enabled: false,
        }
    }
}

struct State {
    config: Config,
    // Callback boxes handed to the native driver through the context
    // pointer. Alive from a successful start until the matching stop or
    // close returns.
    rx_callback: Option<*mut BoxedCallback>,
    tx_callback: Option<*mut BoxedCallback>,
}

/// One open HackRF device.
///
/// Owns exactly one native handle. Every configuration write and mode
/// transition is serialized through an internal exclusive lock, held across
/// the native call; the native library does not guard against concurrent
/// configuration itself. Native calls are synchronous and bounded in
/// latency, so holding the lock across them is deliberate.
///
/// Closing is idempotent and happens automatically on drop; prefer calling
/// [`close`][Device::close] explicitly so a failure is observable.
pub struct Device {
    handle: *mut ffi::hackrf_device,
    serial: String,
    disposed: AtomicBool,
    mode: AtomicU8,
    state: Mutex<State>,
}

// SAFETY: the native handle is only ever passed back to the driver, never
// dereferenced here, and every native call on it is serialized by `state`.
// The callback boxes are touched under the lock or by the driver's streaming
// thread between start and stop, never both at once.
unsafe impl Send for Device {}
unsafe impl Sync for Device {}

impl Device {
    pub(crate) fn from_raw(handle: *mut ffi::hackrf_device, serial: String) -> Self {
        Device {
            handle,
            serial,
            disposed: AtomicBool::new(false),
            mode: AtomicU8::new(TransceiverMode::Off as u8),
            state: Mutex::new(State {
                config: Config::default(),
                rx_callback: None,
                tx_callback: None,
            }),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        // The cache only commits after a successful native call, so state
        // behind a poisoned lock is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_open(&self) -> Result<(), Error> {
        if self.disposed.load(Ordering::Acquire) {
            Err(Error::Disposed {
                serial: self.serial.clone(),
            })
        } else {
            Ok(())
        }
    }

    fn set_mode(&self, mode: TransceiverMode) {
        self.mode.store(mode as u8, Ordering::Release);
    }

    /// Serial number of the board, as read when the device was opened.
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Current transceiver mode. Lock-free; safe to poll from any thread.
    pub fn mode(&self) -> TransceiverMode {
        TransceiverMode::from_u8(self.mode.load(Ordering::Acquire))
    }

    // Shared plumbing for the identity/maintenance accessors: one native
    // call under the lock, after the disposed check.
    pub(crate) fn call_native<R>(
        &self,
        op: &'static str,
        f: impl FnOnce(*mut ffi::hackrf_device) -> (c_int, R),
    ) -> Result<R, Error> {
        let _state = self.lock_state();
        self.ensure_open()?;
        let (code, value) = f(self.handle);
        check(code, op)?;
        Ok(value)
    }

    // --- cached configuration ----------------------------------------------

    /// Set the center frequency, in Hz.
    ///
    /// Preferred range is 1 MHz to 6 GHz; 0 Hz to 7.25 GHz is accepted.
    pub fn set_frequency(&self, freq_hz: u64) -> Result<(), Error> {
        let mut state = self.lock_state();
        if state.config.frequency_hz == freq_hz {
            return Ok(());
        }
        self.ensure_open()?;
        let code = unsafe { ffi::hackrf_set_freq(self.handle, freq_hz) };
        config_check("frequency", freq_hz, code)?;
        state.config.frequency_hz = freq_hz;
        Ok(())
    }

    /// The last applied center frequency, in Hz.
    pub fn frequency(&self) -> u64 {
        self.lock_state().config.frequency_hz
    }

    /// Set the sample rate, in Hz. Should be between 2 MHz and 20 MHz.
    pub fn set_sample_rate(&self, freq_hz: f64) -> Result<(), Error> {
        let mut state = self.lock_state();
        if state.config.sample_rate_hz == freq_hz {
            return Ok(());
        }
        self.ensure_open()?;
        let code = unsafe { ffi::hackrf_set_sample_rate(self.handle, freq_hz) };
        config_check("sample rate", freq_hz, code)?;
        state.config.sample_rate_hz = freq_hz;
        Ok(())
    }

    /// The last applied sample rate, in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.lock_state().config.sample_rate_hz
    }

    /// Set the baseband filter bandwidth, in Hz.
    ///
    /// The hardware supports 1.75, 2.5, 3.5, 5, 5.5, 6, 7, 8, 9, 10, 12, 14,
    /// 15, 20, 24, and 28 MHz; the native library rounds unsupported values
    /// to the nearest setting.
    pub fn set_filter_bandwidth(&self, bandwidth_hz: u32) -> Result<(), Error> {
        let mut state = self.lock_state();
        if state.config.filter_bandwidth_hz == bandwidth_hz {
            return Ok(());
        }
        self.ensure_open()?;
        let code = unsafe { ffi::hackrf_set_baseband_filter_bandwidth(self.handle, bandwidth_hz) };
        config_check("filter bandwidth", bandwidth_hz, code)?;
        state.config.filter_bandwidth_hz = bandwidth_hz;
        Ok(())
    }

    /// The last applied baseband filter bandwidth, in Hz.
    pub fn filter_bandwidth(&self) -> u32 {
        self.lock_state().config.filter_bandwidth_hz
    }

    /// Set the RX LNA (IF) gain: 0-40 dB in 8 dB steps. Defaults to 16 dB.
    pub fn set_lna_gain(&self, gain_db: u32) -> Result<(), Error> {
        let mut state = self.lock_state();
        if state.config.lna_gain_db == gain_db {
            return Ok(());
        }
        self.ensure_open()?;
        let code = unsafe { ffi::hackrf_set_lna_gain(self.handle, gain_db) };
        config_check("LNA gain", gain_db, code)?;
        state.config.lna_gain_db = gain_db;
        Ok(())
    }

    /// The last applied LNA gain, in dB.
    pub fn lna_gain(&self) -> u32 {
        self.lock_state().config.lna_gain_db
    }

    /// Set the RX VGA (baseband) gain: 0-62 dB in 2 dB steps. Defaults to
    /// 20 dB.
    pub fn set_vga_gain(&self, gain_db: u32) -> Result<(), Error> {
        let mut state = self.lock_state();
        if state.config.vga_gain_db == gain_db {
            return Ok(());
        }
        self.ensure_open()?;
        let code = unsafe { ffi::hackrf_set_vga_gain(self.handle, gain_db) };
        config_check("VGA gain", gain_db, code)?;
        state.config.vga_gain_db = gain_db;
        Ok(())
    }

    /// The last applied VGA gain, in dB.
    pub fn vga_gain(&self) -> u32 {
        self.lock_state().config.vga_gain_db
    }

    /// Set the TX VGA (IF) gain: 0-47 dB in 1 dB steps.
    ///
    /// Validated here before the native layer is touched; the native
    /// library's own failure for this register is uninformative.
    pub fn set_txvga_gain(&self, gain_db: u32) -> Result<(), Error> {
        if gain_db > 47 {
            return Err(Error::ValueRange {
                range: Range { start: 0, end: 48 },
                val: gain_db,
            });
        }
        let mut state = self.lock_state();
        if state.config.txvga_gain_db == gain_db {
            return Ok(());
        }
        self.ensure_open()?;
        let code = unsafe { ffi::hackrf_set_txvga_gain(self.handle, gain_db) };
        config_check("TX VGA gain", gain_db, code)?;
        state.config.txvga_gain_db = gain_db;
        Ok(())
    }

    /// The last applied TX VGA gain, in dB.
    pub fn txvga_gain(&self) -> u32 {
        self.lock_state().config.txvga_gain_db
    }

    /// Enable or disable the antenna port power (bias tee, 3.3 V max 50 mA).
    pub fn set_antenna_power(&self, enable: bool) -> Result<(), Error> {
        let mut state = self.lock_state();
        if state.config.antenna_power == enable {
            return Ok(());
        }
        self.ensure_open()?;
        let code = unsafe { ffi::hackrf_set_antenna_enable(self.handle, enable as u8) };
        config_check("antenna power", enable, code)?;
        state.config.antenna_power = enable;
        Ok(())
    }

    /// Whether antenna port power was last enabled.
    pub fn antenna_power(&self) -> bool {
        self.lock_state().config.antenna_power
    }

    /// Enable or disable the front-end RF amplifier (14 dB).
    pub fn set_lna_enabled(&self, enable: bool) -> Result<(), Error> {
        let mut state = self.lock_state();
        if state.config.lna_enabled == enable {
            return Ok(());
        }
        self.ensure_open()?;
        let code = unsafe { ffi::hackrf_set_amp_enable(self.handle, enable as u8) };
        config_check("LNA enable", enable, code)?;
        state.config.lna_enabled = enable;
        Ok(())
    }

    /// Whether the front-end RF amplifier was last enabled.
    pub fn lna_enabled(&self) -> bool {
        self.lock_state().config.lna_enabled
    }

    // --- uncached configuration --------------------------------------------

    /// Set the IF and LO tuning frequencies and the RF path filter
    /// explicitly.
    ///
    /// You may be looking for [`set_frequency`][Self::set_frequency]
    /// instead, which lets the board's own tuning code pick these.
    pub fn set_freq_explicit(
        &self,
        if_freq_hz: u64,
        lo_freq_hz: u64,
        path: RfPathFilter,
    ) -> Result<(), Error> {
        let _state = self.lock_state();
        self.ensure_open()?;
        let code =
            unsafe { ffi::hackrf_set_freq_explicit(self.handle, if_freq_hz, lo_freq_hz, path as u32) };
        check(code, "hackrf_set_freq_explicit")
    }

    /// Set the sample rate from a clock frequency and a divider in 1-31.
    ///
    /// The resulting rate is `freq_hz / divider`.
    pub fn set_sample_rate_manual(&self, freq_hz: u32, divider: u32) -> Result<(), Error> {
        if !(1..32).contains(&divider) {
            return Err(Error::ValueRange {
                range: Range { start: 1, end: 32 },
                val: divider,
            });
        }
        let _state = self.lock_state();
        self.ensure_open()?;
        let code = unsafe { ffi::hackrf_set_sample_rate_manual(self.handle, freq_hz, divider) };
        check(code, "hackrf_set_sample_rate_manual")
    }

    /// Turn the CLKOUT port on or off.
    pub fn set_clkout_enabled(&self, enable: bool) -> Result<(), Error> {
        let _state = self.lock_state();
        self.ensure_open()?;
        let code = unsafe { ffi::hackrf_set_clkout_enable(self.handle, enable as u8) };
        check(code, "hackrf_set_clkout_enable")
    }

    /// Set hardware sync mode. When enabled, the next operating mode will
    /// not start until the external hardware trigger occurs.
    pub fn set_hw_sync_mode(&self, enable: bool) -> Result<(), Error> {
        let _state = self.lock_state();
        self.ensure_open()?;
        let code = unsafe { ffi::hackrf_set_hw_sync_mode(self.handle, enable as u8) };
        check(code, "hackrf_set_hw_sync_mode")
    }

    /// Reset the board.
    pub fn reset(&self) -> Result<(), Error> {
        let _state = self.lock_state();
        self.ensure_open()?;
        let code = unsafe { ffi::hackrf_reset(self.handle) };
        check(code, "hackrf_reset")
    }

    /// Ask the native driver whether a stream is currently running.
    ///
    /// The streaming-stopped family of statuses decodes to `Ok(false)`;
    /// anything else besides the affirmative answer is an error.
    pub fn is_streaming(&self) -> Result<bool, Error> {
        let _state = self.lock_state();
        self.ensure_open()?;
        let status = Status::from_code(unsafe { ffi::hackrf_is_streaming(self.handle) });
        match status {
            Status::True => Ok(true),
            Status::Success
            | Status::StreamingStopped
            | Status::StreamingExitCalled
            | Status::StreamingThreadErr => Ok(false),
            status => Err(Error::Call {
                op: "hackrf_is_streaming",
                status,
            }),
        }
    }

    // --- mode transitions --------------------------------------------------

    /// Start receiving. The callback runs on the driver's streaming thread
    /// once per transfer and must return promptly; returning
    /// [`StreamControl::Stop`] is the only way to cancel from inside the
    /// callback. See [`Transfer`] for the lifetime rules of the buffer view.
    ///
    /// Fails with [`Error::AlreadyInMode`] if the device is already
    /// receiving.
    pub fn start_rx<F>(&self, callback: F) -> Result<(), Error>
    where
        F: FnMut(&mut Transfer<'_>) -> StreamControl + Send + 'static,
    {
        let mut state = self.lock_state();
        self.ensure_open()?;
        if self.mode() == TransceiverMode::Rx {
            return Err(Error::AlreadyInMode(TransceiverMode::Rx));
        }

        // Publish the target mode before the native call so a concurrent
        // reader never sees OFF while the start is in flight. Rolled back on
        // failure.
        self.set_mode(TransceiverMode::Rx);

        let ctx = Box::into_raw(Box::new(Box::new(callback) as BoxedCallback));
        let code = unsafe { ffi::hackrf_start_rx(self.handle, rx_trampoline, ctx.cast()) };
        let status = Status::from_code(code);
        if !status.is_success() {
            self.set_mode(TransceiverMode::Off);
            drop(unsafe { Box::from_raw(ctx) });
            return Err(Error::Call {
                op: "hackrf_start_rx",
                status,
            });
        }

        debug_assert!(state.rx_callback.is_none());
        state.rx_callback = Some(ctx);
        info!(serial = %self.serial, "receive started");
        Ok(())
    }

    /// Stop receiving. Stopping a device that is not receiving is a no-op.
    ///
    /// If the native stop fails, the mode is still forced to off before the
    /// error propagates: past a failed stop the driver's streaming thread
    /// cannot be trusted to still be alive.
    pub fn stop_rx(&self) -> Result<(), Error> {
        let mut state = self.lock_state();
        self.ensure_open()?;
        if self.mode() != TransceiverMode::Rx {
            return Ok(());
        }

        let code = unsafe { ffi::hackrf_stop_rx(self.handle) };
        // Past the stop call the driver is done with the callback either
        // way, so the context can go.
        if let Some(ctx) = state.rx_callback.take() {
            drop(unsafe { Box::from_raw(ctx) });
        }
        self.set_mode(TransceiverMode::Off);
        check(code, "hackrf_stop_rx")?;
        info!(serial = %self.serial, "receive stopped");
        Ok(())
    }

    /// Start transmitting. The callback runs on the driver's streaming
    /// thread once per transfer; fill the [`Transfer`] scratch buffer with
    /// the samples to send.
    ///
    /// Fails with [`Error::AlreadyInMode`] if the device is already
    /// transmitting.
    pub fn start_tx<F>(&self, callback: F) -> Result<(), Error>
    where
        F: FnMut(&mut Transfer<'_>) -> StreamControl + Send + 'static,
    {
        let mut state = self.lock_state();
        self.ensure_open()?;
        if self.mode() == TransceiverMode::Tx {
            return Err(Error::AlreadyInMode(TransceiverMode::Tx));
        }

        self.set_mode(TransceiverMode::Tx);

        let ctx = Box::into_raw(Box::new(Box::new(callback) as BoxedCallback));
        let code = unsafe { ffi::hackrf_start_tx(self.handle, tx_trampoline, ctx.cast()) };
        let status = Status::from_code(code);
        if !status.is_success() {
            self.set_mode(TransceiverMode::Off);
            drop(unsafe { Box::from_raw(ctx) });
            return Err(Error::Call {
                op: "hackrf_start_tx",
                status,
            });
        }

        debug_assert!(state.tx_callback.is_none());
        state.tx_callback = Some(ctx);
        info!(serial = %self.serial, "transmit started");
        Ok(())
    }

    /// Stop transmitting. Stopping a device that is not transmitting is a
    /// no-op. On failure the mode is still forced to off, as with
    /// [`stop_rx`][Self::stop_rx].
    pub fn stop_tx(&self) -> Result<(), Error> {
        let mut state = self.lock_state();
        self.ensure_open()?;
        if self.mode() != TransceiverMode::Tx {
            return Ok(());
        }

        let code = unsafe { ffi::hackrf_stop_tx(self.handle) };
        if let Some(ctx) = state.tx_callback.take() {
            drop(unsafe { Box::from_raw(ctx) });
        }
        self.set_mode(TransceiverMode::Off);
        check(code, "hackrf_stop_tx")?;
        info!(serial = %self.serial, "transmit stopped");
        Ok(())
    }

    /// Start a receive sweep across the configured frequency ranges.
    ///
    /// A sweep occupies the receive slot of the mode machine: it conflicts
    /// with [`start_rx`][Self::start_rx] and is stopped with
    /// [`stop_rx`][Self::stop_rx].
    pub fn start_rx_sweep<F>(&self, params: &SweepParams, callback: F) -> Result<(), Error>
    where
        F: FnMut(&mut Transfer<'_>) -> StreamControl + Send + 'static,
    {
        params.validate()?;
        let freq_list = params.flattened();

        let mut state = self.lock_state();
        self.ensure_open()?;
        if self.mode() == TransceiverMode::Rx {
            return Err(Error::AlreadyInMode(TransceiverMode::Rx));
        }

        let code = unsafe {
            ffi::hackrf_init_sweep(
                self.handle,
                freq_list.as_ptr(),
                params.freq_mhz.len() as u32,
                params.bytes_per_step,
                params.step_width_hz,
                params.offset_hz,
                params.style as u32,
            )
        };
        check(code, "hackrf_init_sweep")?;

        self.set_mode(TransceiverMode::Rx);

        let ctx = Box::into_raw(Box::new(Box::new(callback) as BoxedCallback));
        let code = unsafe { ffi::hackrf_start_rx_sweep(self.handle, rx_trampoline, ctx.cast()) };
        let status = Status::from_code(code);
        if !status.is_success() {
            self.set_mode(TransceiverMode::Off);
            drop(unsafe { Box::from_raw(ctx) });
            return Err(Error::Call {
                op: "hackrf_start_rx_sweep",
                status,
            });
        }

        debug_assert!(state.rx_callback.is_none());
        state.rx_callback = Some(ctx);
        info!(serial = %self.serial, "receive sweep started");
        Ok(())
    }

    // --- disposal ----------------------------------------------------------

    /// Close the device. Safe to call any number of times from any number of
    /// threads; the native handle is closed exactly once.
    ///
    /// On a native close failure the handle is still marked fully closed and
    /// will never be used again; the failure carries the status, handle, and
    /// serial for diagnostics.
    pub fn close(&self) -> Result<(), Error> {
        // Fast unsynchronized short-circuit for repeat calls.
        if self.disposed.load(Ordering::Acquire) {
            return Ok(());
        }

        let mut state = self.lock_state();
        // Re-check under the lock, flipping the flag first so re-entrant or
        // concurrent calls observe it immediately.
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let code = unsafe { ffi::hackrf_close(self.handle) };
        // The native close stops any active stream before returning, so the
        // callback contexts can be freed regardless of the status.
        if let Some(ctx) = state.rx_callback.take() {
            drop(unsafe { Box::from_raw(ctx) });
        }
        if let Some(ctx) = state.tx_callback.take() {
            drop(unsafe { Box::from_raw(ctx) });
        }
        self.set_mode(TransceiverMode::Off);

        let status = Status::from_code(code);
        if !status.is_success() {
            return Err(Error::Close {
                status,
                handle: self.handle as usize,
                serial: self.serial.clone(),
            });
        }
        info!(serial = %self.serial, handle = ?self.handle, "device closed");
        Ok(())
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        // Safety net only; the drop path must never panic during process
        // teardown, so a close failure is reduced to a trace.
        if let Err(err) = self.close() {
            warn!(error = %err, "closing device during drop failed");
        }
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("serial", &self.serial)
            .field("mode", &self.mode())
            .field("closed", &self.disposed.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

fn config_check(param: &'static str, value: impl ToString, code: c_int) -> Result<(), Error> {
    let status = Status::from_code(code);
    if status.is_success() {
        Ok(())
    } else {
        Err(Error::Config {
            param,
            value: value.to_string(),
            status,
        })
    }
}

unsafe extern "C" fn rx_trampoline(raw: *mut ffi::hackrf_transfer) -> c_int {
    unsafe { dispatch(raw, |t| unsafe { (*t).rx_ctx }) }
}

unsafe extern "C" fn tx_trampoline(raw: *mut ffi::hackrf_transfer) -> c_int {
    unsafe { dispatch(raw, |t| unsafe { (*t).tx_ctx }) }
}

// Runs on the driver's streaming thread. Must not unwind across the FFI
// boundary; a panicking callback turns into a stop request.
unsafe fn dispatch(
    raw: *mut ffi::hackrf_transfer,
    ctx_of: impl FnOnce(*mut ffi::hackrf_transfer) -> *mut c_void,
) -> c_int {
    if raw.is_null() {
        return -1;
    }
    let ctx = ctx_of(raw) as *mut BoxedCallback;
    if ctx.is_null() {
        return -1;
    }
    let result = catch_unwind(AssertUnwindSafe(|| {
        let callback = unsafe { &mut *ctx };
        let mut transfer = Transfer::new(unsafe { &mut *raw });
        callback(&mut transfer)
    }));
    match result {
        Ok(StreamControl::Continue) => 0,
        Ok(StreamControl::Stop) => -1,
        Err(_) => {
            error!("stream callback panicked; requesting stop");
            -1
        }
    }
}
