use bytemuck::AnyBitPattern;

use crate::ComplexI8;
use crate::ffi;

/// A borrowed view of one streaming transfer.
///
/// The native driver constructs the underlying descriptor immediately before
/// each callback invocation; this view, and every slice derived from it, is
/// valid strictly for the duration of that invocation. The borrow makes it
/// impossible to retain the view past the callback's return, but the memory
/// behind raw copies taken out of it is recycled by the driver's streaming
/// thread — don't stash pointers into it.
///
/// A null buffer pointer yields empty views, regardless of what the length
/// fields claim.
pub struct Transfer<'a> {
    raw: &'a mut ffi::hackrf_transfer,
}

impl<'a> Transfer<'a> {
    pub(crate) fn new(raw: &'a mut ffi::hackrf_transfer) -> Self {
        Self { raw }
    }

    /// The native device handle this transfer belongs to.
    pub fn device_ptr(&self) -> *mut ffi::hackrf_device {
        self.raw.device
    }

    /// Total capacity of the transfer buffer, in bytes.
    pub fn capacity(&self) -> usize {
        self.raw.buffer_length.max(0) as usize
    }

    /// Number of bytes actually populated for this invocation.
    ///
    /// Never exceeds [`capacity`][Self::capacity].
    pub fn valid_length(&self) -> usize {
        (self.raw.valid_length.max(0) as usize).min(self.capacity())
    }

    /// The received (or ready-to-send) bytes: exactly
    /// [`valid_length`][Self::valid_length] of them.
    pub fn rx_bytes(&self) -> &[u8] {
        let len = self.valid_length();
        if self.raw.buffer.is_null() || len == 0 {
            return &[];
        }
        // SAFETY: the driver guarantees `buffer` points at `buffer_length`
        // bytes for the duration of this callback, and `valid_length()` is
        // clamped to that.
        unsafe { core::slice::from_raw_parts(self.raw.buffer, len) }
    }

    /// The received bytes as interleaved 8-bit IQ samples.
    ///
    /// Truncates to whole sample pairs.
    pub fn rx_samples(&self) -> &[ComplexI8] {
        let bytes = self.rx_bytes();
        // SAFETY: `ComplexI8` is two i8s with alignment 1, so any byte
        // sequence is a valid sample sequence once truncated to pairs.
        unsafe {
            core::slice::from_raw_parts(bytes.as_ptr() as *const ComplexI8, bytes.len() / 2)
        }
    }

    /// The full buffer capacity, regardless of how much of it is populated.
    pub fn buffer(&self) -> &[u8] {
        if self.raw.buffer.is_null() || self.capacity() == 0 {
            return &[];
        }
        // SAFETY: see `rx_bytes`.
        unsafe { core::slice::from_raw_parts(self.raw.buffer, self.capacity()) }
    }

    /// The full buffer capacity, mutably. This is the scratch space to fill
    /// when producing transmit data.
    pub fn buffer_mut(&mut self) -> &mut [u8] {
        if self.raw.buffer.is_null() || self.capacity() == 0 {
            return &mut [];
        }
        // SAFETY: see `rx_bytes`; the driver does not touch the buffer while
        // the callback runs, and `&mut self` prevents aliased views.
        unsafe { core::slice::from_raw_parts_mut(self.raw.buffer, self.capacity()) }
    }

    /// Read a fixed-size value out of the receive context pointer, or a
    /// zeroed value if the pointer is null.
    pub fn rx_context<T: AnyBitPattern>(&self) -> T {
        // SAFETY: `AnyBitPattern` admits every bit pattern, and the read is
        // unaligned; the caller vouches that the context registered at start
        // time really is a `T`.
        if self.raw.rx_ctx.is_null() {
            T::zeroed()
        } else {
            unsafe { (self.raw.rx_ctx as *const T).read_unaligned() }
        }
    }

    /// Read a fixed-size value out of the transmit context pointer, or a
    /// zeroed value if the pointer is null.
    pub fn tx_context<T: AnyBitPattern>(&self) -> T {
        if self.raw.tx_ctx.is_null() {
            T::zeroed()
        } else {
            unsafe { (self.raw.tx_ctx as *const T).read_unaligned() }
        }
    }

    /// Copy `dest.len()` bytes out of the buffer, starting `offset` bytes in.
    ///
    /// # Panics
    /// - If `offset + dest.len()` exceeds the buffer capacity.
    pub fn copy_to(&self, offset: usize, dest: &mut [u8]) {
        dest.copy_from_slice(&self.buffer()[offset..offset + dest.len()]);
    }

    /// Copy `src` into the buffer, starting `offset` bytes in.
    ///
    /// # Panics
    /// - If `offset + src.len()` exceeds the buffer capacity.
    pub fn copy_from(&mut self, offset: usize, src: &[u8]) {
        self.buffer_mut()[offset..offset + src.len()].copy_from_slice(src);
    }
}
