//! In-memory model of the grayscale and function-control registers of a
//! chip chain.

use crate::bitfield;
use crate::color::{ChannelValue, BLUE_WIRE_SLOT, GREEN_WIRE_SLOT, RED_WIRE_SLOT};
use crate::error::{Error, Result};
use crate::registers::{
    fc_default_word, Field, BUFFER_BYTES_PER_COLOR, CHANNEL_PER_CHIP, CHIP_BUFFER_BYTE_COUNT,
    CHIP_GS_BUFFER_BYTE_COUNT, COLORS_PER_PIXEL, PIXEL_PER_CHIP,
};
use std::fmt;

/// Pixel and register storage for a chain of chips.
///
/// Both buffers are sized for the whole chain at construction and keep that
/// size for their lifetime. The checked setters validate indices and value
/// domains; the `_raw` paths skip validation for bulk updates and panic on
/// an out-of-range index instead of returning an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainBuffer {
    pixel_count: usize,
    chip_count: usize,
    gs: Vec<u8>,
    fc: Vec<u8>,
}

impl ChainBuffer {
    /// Returns a buffer for `pixel_count` pixels with every chip's
    /// function-control register at its default value.
    ///
    /// The chain length is the smallest chip count covering `pixel_count`;
    /// an empty chain fails with [`Error::Config`].
    pub fn new(pixel_count: usize) -> Result<ChainBuffer> {
        if pixel_count == 0 {
            return Err(Error::Config);
        }
        let chip_count = (pixel_count + PIXEL_PER_CHIP - 1) / PIXEL_PER_CHIP;
        let mut buffer = ChainBuffer {
            pixel_count,
            chip_count,
            gs: vec![0; CHIP_GS_BUFFER_BYTE_COUNT * chip_count],
            fc: vec![0; CHIP_BUFFER_BYTE_COUNT * chip_count],
        };
        buffer.init_defaults();
        Ok(buffer)
    }

    /// Pixels addressable through the checked setters.
    pub fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    /// Chips on the chain.
    pub fn chip_count(&self) -> usize {
        self.chip_count
    }

    /// Wire channels on the chain, including the slack pixels of the last
    /// chip.
    pub fn channel_count(&self) -> usize {
        CHANNEL_PER_CHIP * self.chip_count
    }

    /// Grayscale buffer contents, in wire order.
    pub fn gs_bytes(&self) -> &[u8] {
        &self.gs
    }

    /// Function-control buffer contents, in wire order.
    pub fn fc_bytes(&self) -> &[u8] {
        &self.fc
    }

    /// Writes every field's default into every chip's register.
    pub fn init_defaults(&mut self) {
        let word = fc_default_word();
        for chip_index in 0..self.chip_count {
            self.set_fc_word(chip_index, word);
        }
    }

    fn fc_word(&self, chip_index: usize) -> u64 {
        let base = chip_index * CHIP_BUFFER_BYTE_COUNT;
        self.fc[base..base + CHIP_BUFFER_BYTE_COUNT]
            .iter()
            .fold(0, |word, &byte| (word << 8) | u64::from(byte))
    }

    fn set_fc_word(&mut self, chip_index: usize, word: u64) {
        let base = chip_index * CHIP_BUFFER_BYTE_COUNT;
        for (index, byte) in self.fc[base..base + CHIP_BUFFER_BYTE_COUNT]
            .iter_mut()
            .enumerate()
        {
            *byte = (word >> (8 * (CHIP_BUFFER_BYTE_COUNT - 1 - index))) as u8;
        }
    }

    /// Sets one named field of one chip's function-control register.
    ///
    /// Fails with [`Error::Index`] when `chip_index` is outside the chain
    /// and with [`Error::Range`] when `value` does not fit the field; the
    /// register keeps its previous contents in both cases. Bits outside the
    /// field are never disturbed.
    pub fn set_field(&mut self, chip_index: usize, field: Field, value: u16) -> Result<()> {
        if chip_index >= self.chip_count {
            return Err(Error::Index);
        }
        let descriptor = field.descriptor();
        let word = bitfield::pack(
            self.fc_word(chip_index),
            descriptor.offset,
            descriptor.mask,
            u64::from(value),
        )?;
        self.set_fc_word(chip_index, word);
        Ok(())
    }

    /// Reads one named field of one chip's function-control register.
    pub fn get_field(&self, chip_index: usize, field: Field) -> Result<u16> {
        if chip_index >= self.chip_count {
            return Err(Error::Index);
        }
        let descriptor = field.descriptor();
        Ok(bitfield::unpack(self.fc_word(chip_index), descriptor.offset, descriptor.mask) as u16)
    }

    /// Writes one 16-bit value at its wire channel position, big-endian.
    ///
    /// `channel_index` counts wire channels (blue, green, red per pixel)
    /// and must be below [`channel_count`](ChainBuffer::channel_count).
    /// The index is not validated; this is the hot path under the bulk
    /// setters and an out-of-range index panics.
    pub fn set_channel_raw(&mut self, channel_index: usize, value: u16) {
        let at = channel_index * BUFFER_BYTES_PER_COLOR;
        self.gs[at..at + BUFFER_BYTES_PER_COLOR].copy_from_slice(&value.to_be_bytes());
    }

    /// Reads one 16-bit value from its wire channel position. Unchecked
    /// like [`set_channel_raw`](ChainBuffer::set_channel_raw).
    pub fn get_channel_raw(&self, channel_index: usize) -> u16 {
        let at = channel_index * BUFFER_BYTES_PER_COLOR;
        u16::from_be_bytes([self.gs[at], self.gs[at + 1]])
    }

    /// Writes all three channels of a pixel in wire order, unchecked.
    pub fn set_pixel_raw(&mut self, pixel_index: usize, red: u16, green: u16, blue: u16) {
        let base = pixel_index * COLORS_PER_PIXEL;
        self.set_channel_raw(base + BLUE_WIRE_SLOT, blue);
        self.set_channel_raw(base + GREEN_WIRE_SLOT, green);
        self.set_channel_raw(base + RED_WIRE_SLOT, red);
    }

    /// Reads all three channels of a pixel as logical `(red, green, blue)`,
    /// unchecked.
    pub fn get_pixel_raw(&self, pixel_index: usize) -> (u16, u16, u16) {
        let base = pixel_index * COLORS_PER_PIXEL;
        (
            self.get_channel_raw(base + RED_WIRE_SLOT),
            self.get_channel_raw(base + GREEN_WIRE_SLOT),
            self.get_channel_raw(base + BLUE_WIRE_SLOT),
        )
    }

    /// Sets one pixel from logical RGB components.
    ///
    /// Each component is either a raw 16-bit value or a normalized float in
    /// `[0.0, 1.0]`, and the two kinds can be mixed within one call. All
    /// three components are validated before anything is written, so a
    /// failed call leaves the buffer untouched.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// buffer.set_pixel(0, (1.0, 0.5, 0.0))?;      // orange, floats
    /// buffer.set_pixel(1, (0u16, 32000, 65535))?; // sky blue, raw values
    /// ```
    pub fn set_pixel<R, G, B>(&mut self, pixel_index: usize, rgb: (R, G, B)) -> Result<()>
    where
        R: Into<ChannelValue>,
        G: Into<ChannelValue>,
        B: Into<ChannelValue>,
    {
        if pixel_index >= self.pixel_count {
            return Err(Error::Index);
        }
        let red = rgb.0.into().to_raw()?;
        let green = rgb.1.into().to_raw()?;
        let blue = rgb.2.into().to_raw()?;
        self.set_pixel_raw(pixel_index, red, green, blue);
        Ok(())
    }

    /// Sets every pixel slot of the chain to the same raw channel values,
    /// including the slack slots of the last chip.
    pub fn set_all_pixels_raw(&mut self, red: u16, green: u16, blue: u16) {
        for pixel_index in 0..self.chip_count * PIXEL_PER_CHIP {
            self.set_pixel_raw(pixel_index, red, green, blue);
        }
    }

    /// Table view of every field's default and per-chip current value.
    /// Debugging aid, not part of the wire protocol.
    pub fn fc_table(&self) -> FcTable<'_> {
        FcTable { buffer: self }
    }
}

/// Formatted view of the function-control buffer: one row per field, one
/// column per chip.
pub struct FcTable<'a> {
    buffer: &'a ChainBuffer,
}

impl fmt::Display for FcTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:<15} {:>7}", "field", "default")?;
        for chip_index in 0..self.buffer.chip_count {
            write!(f, " {:>6}", format!("chip{}", chip_index))?;
        }
        writeln!(f)?;
        for field in Field::ALL.iter() {
            let descriptor = field.descriptor();
            write!(f, "{:<15} {:>7}", descriptor.name, descriptor.default)?;
            for chip_index in 0..self.buffer.chip_count {
                let value = bitfield::unpack(
                    self.buffer.fc_word(chip_index),
                    descriptor.offset,
                    descriptor.mask,
                );
                write!(f, " {:>6}", value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::distributions::{Distribution, Uniform};
    use rand::thread_rng;

    #[test]
    fn chain_sizing() {
        let buffer = ChainBuffer::new(16).unwrap();
        assert_eq!(buffer.chip_count(), 1);
        assert_eq!(buffer.gs_bytes().len(), 96);
        assert_eq!(buffer.fc_bytes().len(), 6);

        let buffer = ChainBuffer::new(17).unwrap();
        assert_eq!(buffer.pixel_count(), 17);
        assert_eq!(buffer.chip_count(), 2);
        assert_eq!(buffer.channel_count(), 96);
        assert_eq!(buffer.gs_bytes().len(), 192);
        assert_eq!(buffer.fc_bytes().len(), 12);
    }

    #[test]
    fn empty_chain_is_rejected() {
        assert_eq!(ChainBuffer::new(0).err(), Some(Error::Config));
    }

    #[test]
    fn fresh_chain_holds_defaults_on_every_chip() {
        let buffer = ChainBuffer::new(33).unwrap();
        for chip_index in 0..buffer.chip_count() {
            for &field in Field::ALL.iter() {
                assert_eq!(
                    buffer.get_field(chip_index, field).unwrap(),
                    field.descriptor().default,
                    "chip {} {}",
                    chip_index,
                    field.descriptor().name
                );
            }
        }
    }

    #[test]
    fn field_roundtrip_keeps_siblings() {
        let mut rng = thread_rng();
        let mut buffer = ChainBuffer::new(32).unwrap();
        for &field in Field::ALL.iter() {
            let uniform = Uniform::from(0..=field.descriptor().mask);
            for chip_index in 0..buffer.chip_count() {
                let before: Vec<u16> = Field::ALL
                    .iter()
                    .map(|&sibling| buffer.get_field(chip_index, sibling).unwrap())
                    .collect();
                let value = uniform.sample(&mut rng) as u16;
                buffer.set_field(chip_index, field, value).unwrap();
                assert_eq!(buffer.get_field(chip_index, field).unwrap(), value);
                for (index, &sibling) in Field::ALL.iter().enumerate() {
                    if sibling != field {
                        assert_eq!(
                            buffer.get_field(chip_index, sibling).unwrap(),
                            before[index],
                            "{} disturbed by {}",
                            sibling.descriptor().name,
                            field.descriptor().name
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn field_write_is_chip_local() {
        let mut buffer = ChainBuffer::new(48).unwrap();
        buffer.set_field(1, Field::Bc, 0b111).unwrap();
        assert_eq!(buffer.get_field(0, Field::Bc).unwrap(), 0b100);
        assert_eq!(buffer.get_field(1, Field::Bc).unwrap(), 0b111);
        assert_eq!(buffer.get_field(2, Field::Bc).unwrap(), 0b100);
    }

    #[test]
    fn oversized_field_value_leaves_register_alone() {
        let mut buffer = ChainBuffer::new(16).unwrap();
        let before = buffer.clone();
        assert_eq!(buffer.set_field(0, Field::Bc, 0b1000), Err(Error::Range));
        assert_eq!(buffer, before);
    }

    #[test]
    fn out_of_range_chip_index() {
        let mut buffer = ChainBuffer::new(16).unwrap();
        let before = buffer.clone();
        assert_eq!(buffer.set_field(1, Field::Bc, 0), Err(Error::Index));
        assert_eq!(buffer.get_field(1, Field::Bc), Err(Error::Index));
        assert_eq!(buffer, before);
    }

    #[test]
    fn channel_values_are_big_endian() {
        let mut buffer = ChainBuffer::new(16).unwrap();
        buffer.set_channel_raw(1, 0x1234);
        assert_eq!(&buffer.gs_bytes()[2..4], &[0x12, 0x34]);
        assert_eq!(buffer.get_channel_raw(1), 0x1234);
    }

    #[test]
    fn integer_pixel_lands_in_wire_order() {
        let mut buffer = ChainBuffer::new(16).unwrap();
        buffer.set_pixel(0, (100u16, 0u16, 0u16)).unwrap();
        // wire order is blue, green, red: red lands at byte offset 4
        assert_eq!(&buffer.gs_bytes()[..6], &[0, 0, 0, 0, 0, 100]);
        assert_eq!(buffer.get_pixel_raw(0), (100, 0, 0));
    }

    #[test]
    fn float_pixel_scales_and_truncates() {
        let mut buffer = ChainBuffer::new(16).unwrap();
        buffer.set_pixel(1, (0.0f32, 0.0f32, 0.00002f32)).unwrap();
        // blue lands at byte offset 0 of the second pixel slot
        assert_eq!(&buffer.gs_bytes()[6..12], &[0, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn mixed_pixel_components() {
        let mut buffer = ChainBuffer::new(16).unwrap();
        buffer.set_pixel(2, (1.0f32, 32000u16, 65535u16)).unwrap();
        assert_eq!(buffer.get_pixel_raw(2), (65535, 32000, 65535));
        assert_eq!(&buffer.gs_bytes()[12..14], &[0xff, 0xff]);
        assert_eq!(&buffer.gs_bytes()[14..16], &[0x7d, 0x00]);
        assert_eq!(&buffer.gs_bytes()[16..18], &[0xff, 0xff]);
    }

    #[test]
    fn rejected_pixel_leaves_buffers_untouched() {
        let mut buffer = ChainBuffer::new(16).unwrap();
        let before = buffer.clone();

        assert_eq!(buffer.set_pixel(16, (0u16, 0u16, 0u16)), Err(Error::Index));
        assert_eq!(buffer, before);

        assert_eq!(
            buffer.set_pixel(0, (0u16, 1.5f32, 0u16)),
            Err(Error::Range)
        );
        assert_eq!(buffer, before);
    }

    #[test]
    fn fill_covers_the_slack_slots() {
        let mut buffer = ChainBuffer::new(17).unwrap();
        buffer.set_all_pixels_raw(1, 2, 3);
        for pixel_index in 0..32 {
            assert_eq!(buffer.get_pixel_raw(pixel_index), (1, 2, 3));
        }
    }

    #[test]
    fn reinit_restores_defaults() {
        let mut buffer = ChainBuffer::new(16).unwrap();
        buffer.set_field(0, Field::Espwm, 0).unwrap();
        buffer.set_field(0, Field::Ccg, 0x055).unwrap();
        buffer.init_defaults();
        assert_eq!(ChainBuffer::new(16).unwrap().fc_bytes(), buffer.fc_bytes());
    }

    #[test]
    fn fc_table_lists_fields_and_chips() {
        let mut buffer = ChainBuffer::new(32).unwrap();
        buffer.set_field(1, Field::Bc, 0b111).unwrap();
        let table = buffer.fc_table().to_string();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 1 + Field::ALL.len());
        assert!(lines[0].contains("chip0") && lines[0].contains("chip1"));
        let bc_row = lines.iter().find(|line| line.starts_with("BC")).unwrap();
        assert!(bc_row.contains('4') && bc_row.contains('7'));
    }
}
