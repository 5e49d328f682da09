//! Embedded-hal driver for chains of TI TLC5957 48-channel 16bit PWM LED
//! drivers.
//!
//! The chips hang off one serial shift-register bus. Pixel data and
//! configuration travel the same clock and data lines; which operation a
//! chip performs is selected by when the latch line rises inside a 16-bit
//! command window. Bulk payload goes out through the spi device, the
//! latch-framed windows are bit-banged on the raw lines.

pub mod bitfield;
pub mod buffer;
pub mod color;
pub mod error;
pub mod registers;

pub use crate::buffer::{ChainBuffer, FcTable};
pub use crate::color::ChannelValue;
pub use crate::error::{Error, Result};
pub use crate::registers::{Field, FunctionCommand};

use crate::registers::{CHIP_BUFFER_BYTE_COUNT, COMMAND_BYTE_COUNT, PIXEL_PER_CHIP};
use bitvec::prelude::{AsBits, Msb0};
use embedded_hal::blocking::spi::Write;
use embedded_hal::digital::v2::OutputPin;

fn window_at(bytes: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([bytes[at], bytes[at + 1]])
}

/// Driver for a chain of TLC5957 chips.
///
/// Owns the pixel and function-control buffers plus the bus handles.
/// Buffer mutation is local and cheap; nothing reaches the chips until
/// [`push_grayscale`](Tlc5957::push_grayscale) or
/// [`push_function_control`](Tlc5957::push_function_control) runs. Both
/// block for the whole transfer.
pub struct Tlc5957<SPI, SCK, MOSI, LAT> {
    spi: SPI,
    sclk: SCK,
    mosi: MOSI,
    latch: LAT,
    buffer: ChainBuffer,
}

impl<SPI, SCK, MOSI, LAT> Tlc5957<SPI, SCK, MOSI, LAT>
where
    SPI: Write<u8>,
    SCK: OutputPin,
    MOSI: OutputPin,
    LAT: OutputPin,
{
    /// Returns a driver for a chain covering `pixel_count` pixels.
    ///
    /// The chain length is derived from the pixel count; every chip's
    /// function-control register starts at its default value. A zero pixel
    /// count fails with [`Error::Config`].
    ///
    /// # Arguments
    ///
    /// * `spi` The embedded-hal spi device used for bulk transfers; the host configures it to mode 0, 8 bits per word, at up to [`registers::SPI_CLOCK_HZ_MAX`]
    /// * `sclk` The serial clock line, driven directly during command windows
    /// * `mosi` The serial data line, driven directly during command windows
    /// * `latch` The latch line framing every command window
    /// * `pixel_count` Pixels on the chain
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// // Embedded-hal device setup
    /// let mut tlc = Tlc5957::new(spi, sclk, mosi, latch, 16)?;
    /// tlc.set_pixel(0, (1.0, 0.5, 0.0))?;
    /// tlc.push_grayscale()?;
    /// ```
    pub fn new(
        spi: SPI,
        sclk: SCK,
        mosi: MOSI,
        latch: LAT,
        pixel_count: usize,
    ) -> Result<Tlc5957<SPI, SCK, MOSI, LAT>> {
        Ok(Tlc5957 {
            spi,
            sclk,
            mosi,
            latch,
            buffer: ChainBuffer::new(pixel_count)?,
        })
    }

    /// Pixels addressable through the checked setters.
    pub fn pixel_count(&self) -> usize {
        self.buffer.pixel_count()
    }

    /// Chips on the chain.
    pub fn chip_count(&self) -> usize {
        self.buffer.chip_count()
    }

    /// The chain's pixel and register storage.
    pub fn buffer(&self) -> &ChainBuffer {
        &self.buffer
    }

    /// Mutable access to the chain's pixel and register storage.
    pub fn buffer_mut(&mut self) -> &mut ChainBuffer {
        &mut self.buffer
    }

    /// Sets one pixel from logical RGB components, raw 16-bit values or
    /// normalized floats in any mix. See [`ChainBuffer::set_pixel`].
    pub fn set_pixel<R, G, B>(&mut self, pixel_index: usize, rgb: (R, G, B)) -> Result<()>
    where
        R: Into<ChannelValue>,
        G: Into<ChannelValue>,
        B: Into<ChannelValue>,
    {
        self.buffer.set_pixel(pixel_index, rgb)
    }

    /// Sets one named field of one chip's function-control register.
    pub fn set_field(&mut self, chip_index: usize, field: Field, value: u16) -> Result<()> {
        self.buffer.set_field(chip_index, field, value)
    }

    /// Reads one named field of one chip's function-control register.
    pub fn get_field(&self, chip_index: usize, field: Field) -> Result<u16> {
        self.buffer.get_field(chip_index, field)
    }

    /// Table view of the function-control buffer for debugging.
    pub fn fc_table(&self) -> FcTable<'_> {
        self.buffer.fc_table()
    }

    /// Writes the grayscale buffer out to the chain and latches it.
    ///
    /// The buffer travels as 16 row transfers, one 48-bit register per chip
    /// and row: the row's first `6 * chips - 2` bytes go out over the spi
    /// device, the final 16 bits inside a latch-framed command window.
    /// Every window carries WRTGS except the last of the pass, which
    /// carries LATGS and copies the shifted data into the active grayscale
    /// latch. One LATGS per pass, independent of the chain length.
    pub fn push_grayscale(&mut self) -> Result<()> {
        let row_bytes = CHIP_BUFFER_BYTE_COUNT * self.buffer.chip_count();
        let bulk_bytes = row_bytes - COMMAND_BYTE_COUNT;
        let mut start = 0;
        for row in 0..PIXEL_PER_CHIP {
            self.spi
                .write(&self.buffer.gs_bytes()[start..start + bulk_bytes])
                .map_err(|_| Error::Spi)?;
            let window = window_at(self.buffer.gs_bytes(), start + bulk_bytes);
            let command = if row == PIXEL_PER_CHIP - 1 {
                FunctionCommand::Latgs
            } else {
                FunctionCommand::Wrtgs
            };
            self.write_command_window(command, window)?;
            start += row_bytes;
        }
        Ok(())
    }

    /// Writes the function-control buffer out to the chain and commits it.
    ///
    /// A FCWRTEN window arms the chips first; its payload bits fall off the
    /// far end of the chain before the commit. The buffer itself follows,
    /// all but the last two bytes over the spi device and the final 16 bits
    /// inside the committing WRTFC window, so exactly 48 bits per chip
    /// arrive between arm and commit.
    pub fn push_function_control(&mut self) -> Result<()> {
        let fc_bytes = self.buffer.fc_bytes().len();
        let head = window_at(self.buffer.fc_bytes(), 0);
        self.write_command_window(FunctionCommand::Fcwrten, head)?;
        self.spi
            .write(&self.buffer.fc_bytes()[..fc_bytes - COMMAND_BYTE_COUNT])
            .map_err(|_| Error::Spi)?;
        let tail = window_at(self.buffer.fc_bytes(), fc_bytes - COMMAND_BYTE_COUNT);
        self.write_command_window(FunctionCommand::Wrtfc, tail)?;
        Ok(())
    }

    /// Shifts one 16-bit window out on the bit-bang lines.
    ///
    /// The window value goes out MSB first. The latch line rises
    /// `16 - opcode` bits in and stays high until the window ends; the
    /// chip decodes the command from that timing alone.
    fn write_command_window(&mut self, command: FunctionCommand, window: u16) -> Result<()> {
        let latch_index = command.latch_bit_index();
        let bits = window.bits::<Msb0>();
        for (index, bit) in bits.iter().enumerate() {
            self.sclk.set_low().map_err(|_| Error::Sclk)?;
            if *bit {
                self.mosi.set_high().map_err(|_| Error::Mosi)?;
            } else {
                self.mosi.set_low().map_err(|_| Error::Mosi)?;
            }
            if index == latch_index {
                self.latch.set_high().map_err(|_| Error::Lat)?;
            }
            self.sclk.set_high().map_err(|_| Error::Sclk)?;
            self.sclk.set_low().map_err(|_| Error::Sclk)?;
        }
        self.latch.set_low().map_err(|_| Error::Lat)?;
        Ok(())
    }

    /// Destroys the driver, returning the bus handles.
    pub fn destroy(self) -> (SPI, SCK, MOSI, LAT) {
        (self.spi, self.sclk, self.mosi, self.latch)
    }
}
