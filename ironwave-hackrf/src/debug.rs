/*!
Low-level maintenance operations.

The board exposes direct read and write access to most of its peripheral ICs
through the [`Debug`][struct@Debug] accessor, which is also how it can be
reprogrammed without entering DFU mode:

```no_run
# fn main() -> anyhow::Result<()> {
let device = ironwave_hackrf::open_first()?;
let debug = device.debug();

// Dump the transceiver IC's registers.
for register in 0..32 {
    println!("MAX2837[{register}] = {:#06x}", debug.max2837_read(register)?);
}
# Ok(())
# }
```
 */

use std::ops::Range;

use crate::device::Device;
use crate::error::Error;
use crate::ffi;

/// Maintenance operations, including programming operations.
///
/// Borrows the device while doing operations.
pub struct Debug<'a> {
    device: &'a Device,
}

impl Device {
    /// Access the maintenance operations for this device.
    pub fn debug(&self) -> Debug<'_> {
        Debug { device: self }
    }
}

impl Debug<'_> {
    /// Read a register from the MAX2837 transceiver IC.
    pub fn max2837_read(&self, register: u8) -> Result<u16, Error> {
        if register >= 32 {
            return Err(Error::AddressRange {
                range: Range { start: 0, end: 32 },
                addr: register as u32,
            });
        }
        self.device.call_native("hackrf_max2837_read", |handle| {
            let mut value = 0u16;
            let code = unsafe { ffi::hackrf_max2837_read(handle, register, &mut value) };
            (code, value)
        })
    }

    /// Write a register to the MAX2837 transceiver IC. Register values are
    /// 10 bits wide.
    pub fn max2837_write(&self, register: u8, value: u16) -> Result<(), Error> {
        if register >= 32 {
            return Err(Error::AddressRange {
                range: Range { start: 0, end: 32 },
                addr: register as u32,
            });
        }
        if value >= 0x400 {
            return Err(Error::ValueRange {
                range: Range {
                    start: 0,
                    end: 0x400,
                },
                val: value as u32,
            });
        }
        self.device.call_native("hackrf_max2837_write", |handle| {
            (unsafe { ffi::hackrf_max2837_write(handle, register, value) }, ())
        })
    }

    /// Read a register from the SI5351C clock generator.
    pub fn si5351c_read(&self, register: u16) -> Result<u16, Error> {
        self.device.call_native("hackrf_si5351c_read", |handle| {
            let mut value = 0u16;
            let code = unsafe { ffi::hackrf_si5351c_read(handle, register, &mut value) };
            (code, value)
        })
    }

    /// Write a register to the SI5351C clock generator.
    pub fn si5351c_write(&self, register: u16, value: u16) -> Result<(), Error> {
        self.device.call_native("hackrf_si5351c_write", |handle| {
            (unsafe { ffi::hackrf_si5351c_write(handle, register, value) }, ())
        })
    }

    /// Read a register from the RFFC5071 mixer/synthesizer.
    pub fn rffc5071_read(&self, register: u8) -> Result<u16, Error> {
        if register >= 31 {
            return Err(Error::AddressRange {
                range: Range { start: 0, end: 31 },
                addr: register as u32,
            });
        }
        self.device.call_native("hackrf_rffc5071_read", |handle| {
            let mut value = 0u16;
            let code = unsafe { ffi::hackrf_rffc5071_read(handle, register, &mut value) };
            (code, value)
        })
    }

    /// Write a register to the RFFC5071 mixer/synthesizer.
    pub fn rffc5071_write(&self, register: u8, value: u16) -> Result<(), Error> {
        if register >= 31 {
            return Err(Error::AddressRange {
                range: Range { start: 0, end: 31 },
                addr: register as u32,
            });
        }
        self.device.call_native("hackrf_rffc5071_write", |handle| {
            (unsafe { ffi::hackrf_rffc5071_write(handle, register, value) }, ())
        })
    }

    /// Access the attached SPI flash.
    ///
    /// See [`SpiFlash`] for what to do with it.
    pub fn spi_flash(&self) -> SpiFlash<'_> {
        SpiFlash {
            device: self.device,
        }
    }

    /// Load a new bitstream into the XC2C64A CPLD.
    pub fn cpld_write(&self, data: &[u8]) -> Result<(), Error> {
        self.device.call_native("hackrf_cpld_write", |handle| {
            (
                unsafe { ffi::hackrf_cpld_write(handle, data.as_ptr(), data.len() as u32) },
                (),
            )
        })
    }
}

// The W25Q80BV holds 1 MiB, written in 256-byte pages.
const FLASH_END: u32 = 0x10_0000;
const FLASH_PAGE: usize = 0x100;

/// Accessor for the W25Q80BV SPI flash on the board.
///
/// ⚠️ This manipulates the flash directly, which is a great way to brick the
/// board and require recovering through DFU mode. The general write
/// procedure is erase, write everything from address 0, then read back to
/// verify.
pub struct SpiFlash<'a> {
    device: &'a Device,
}

impl SpiFlash<'_> {
    /// Erase the entire flash memory.
    ///
    /// Should be immediately followed by writing a new image, or the board
    /// is soft-bricked (recoverable by DFU).
    pub fn erase(&self) -> Result<(), Error> {
        self.device.call_native("hackrf_spiflash_erase", |handle| {
            (unsafe { ffi::hackrf_spiflash_erase(handle) }, ())
        })
    }

    /// Write firmware to the flash memory, splitting the data into 256-byte
    /// pages. Needs to be preceded by [`erase`][Self::erase].
    pub fn write(&self, addr: u32, data: &[u8]) -> Result<(), Error> {
        check_flash_span(addr, data.len())?;
        let mut addr = addr;
        let mut data = data;
        while !data.is_empty() {
            // Keep every write within one page.
            let len = (FLASH_PAGE - (addr as usize & (FLASH_PAGE - 1))).min(data.len());
            let (chunk, rest) = data.split_at(len);
            self.device.call_native("hackrf_spiflash_write", |handle| {
                (
                    unsafe {
                        ffi::hackrf_spiflash_write(handle, addr, len as u16, chunk.as_ptr())
                    },
                    (),
                )
            })?;
            addr += len as u32;
            data = rest;
        }
        Ok(())
    }

    /// Read from the flash memory, one 256-byte page at a time. This should
    /// only be used for firmware verification.
    pub fn read(&self, addr: u32, len: usize) -> Result<Vec<u8>, Error> {
        check_flash_span(addr, len)?;
        let mut addr = addr;
        let mut out = Vec::with_capacity(len);
        while out.len() < len {
            let block = (FLASH_PAGE - (addr as usize & (FLASH_PAGE - 1))).min(len - out.len());
            let mut page = vec![0u8; block];
            self.device.call_native("hackrf_spiflash_read", |handle| {
                (
                    unsafe {
                        ffi::hackrf_spiflash_read(handle, addr, block as u16, page.as_mut_ptr())
                    },
                    (),
                )
            })?;
            out.extend_from_slice(&page);
            addr += block as u32;
        }
        Ok(out)
    }

    /// Read the flash status register.
    pub fn status(&self) -> Result<u8, Error> {
        self.device
            .call_native("hackrf_spiflash_status", |handle| {
                let mut value = 0u8;
                let code = unsafe { ffi::hackrf_spiflash_status(handle, &mut value) };
                (code, value)
            })
    }

    /// Clear the flash status register.
    pub fn clear_status(&self) -> Result<(), Error> {
        self.device
            .call_native("hackrf_spiflash_clear_status", |handle| {
                (unsafe { ffi::hackrf_spiflash_clear_status(handle) }, ())
            })
    }
}

fn check_flash_span(addr: u32, len: usize) -> Result<(), Error> {
    if addr >= FLASH_END {
        return Err(Error::AddressRange {
            range: Range {
                start: 0,
                end: FLASH_END,
            },
            addr,
        });
    }
    if len + addr as usize > FLASH_END as usize {
        return Err(Error::ValueRange {
            range: Range {
                start: 0,
                end: FLASH_END - addr,
            },
            val: len as u32,
        });
    }
    Ok(())
}
