//! Register layout of the TLC5957: chip geometry, the function-control
//! field table and the function command set.

use crate::bitfield::FieldDescriptor;
use crate::error::{Error, Result};

/// Pixels driven by one chip.
pub const PIXEL_PER_CHIP: usize = 16;
/// Color channels per pixel.
pub const COLORS_PER_PIXEL: usize = 3;
/// PWM channels per chip.
pub const CHANNEL_PER_CHIP: usize = PIXEL_PER_CHIP * COLORS_PER_PIXEL;
/// Bytes holding one 16-bit channel value in the grayscale buffer.
pub const BUFFER_BYTES_PER_COLOR: usize = 2;
/// Bytes holding one pixel (three channels) in the grayscale buffer.
pub const BUFFER_BYTES_PER_PIXEL: usize = COLORS_PER_PIXEL * BUFFER_BYTES_PER_COLOR;

/// Width of the common shift register of one chip.
pub const CHIP_BUFFER_BIT_COUNT: usize = 48;
/// [`CHIP_BUFFER_BIT_COUNT`] in bytes.
pub const CHIP_BUFFER_BYTE_COUNT: usize = CHIP_BUFFER_BIT_COUNT / 8;
/// Grayscale bytes held per chip: one 48-bit register per pixel slot.
pub const CHIP_GS_BUFFER_BYTE_COUNT: usize = CHIP_BUFFER_BYTE_COUNT * PIXEL_PER_CHIP;

/// Width of one latch-framed command window.
pub const COMMAND_BIT_COUNT: usize = 16;
/// [`COMMAND_BIT_COUNT`] in bytes.
pub const COMMAND_BYTE_COUNT: usize = COMMAND_BIT_COUNT / 8;

/// Serial clock rate the driver is designed around. The host configures the
/// spi device; embedded-hal 0.2 gives the driver no way to set it.
pub const SPI_CLOCK_HZ_DEFAULT: u32 = 10_000_000;
/// Maximum serial clock rate the chip tolerates.
pub const SPI_CLOCK_HZ_MAX: u32 = 33_000_000;

/// Named fields of the 48-bit function-control register.
///
/// Bit 10 and all bits not covered by a field are reserved and stay zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// LED-open-detection voltage threshold
    Lodvth,
    /// TD0 select, output turn-on delay
    SelTd0,
    /// Group delay select
    SelGdly,
    /// Auto data refresh mode
    Xrefresh,
    /// GCLK edge select
    SelGckEdge,
    /// Pre-charge FET select
    SelPchg,
    /// Enhanced spectrum PWM
    Espwm,
    /// Compensation for the blue LED
    Lgse3,
    /// Low grayscale enhancement
    Lgse1,
    /// Color current trim, blue
    Ccb,
    /// Color current trim, green
    Ccg,
    /// Color current trim, red
    Ccr,
    /// Global brightness control
    Bc,
    /// Poker transfer mode
    PokerTransMode,
    /// First-line grayscale enhancement
    Lgse2,
}

impl Field {
    /// All fields, ordered by bit offset.
    pub const ALL: [Field; 15] = [
        Field::Lodvth,
        Field::SelTd0,
        Field::SelGdly,
        Field::Xrefresh,
        Field::SelGckEdge,
        Field::SelPchg,
        Field::Espwm,
        Field::Lgse3,
        Field::Lgse1,
        Field::Ccb,
        Field::Ccg,
        Field::Ccr,
        Field::Bc,
        Field::PokerTransMode,
        Field::Lgse2,
    ];

    /// Static layout record of this field.
    pub fn descriptor(self) -> &'static FieldDescriptor {
        &FC_FIELDS[self as usize]
    }
}

/// Function-control register layout, ordered by bit offset. Indexed by
/// [`Field`] discriminants.
pub static FC_FIELDS: [FieldDescriptor; 15] = [
    FieldDescriptor { name: "LODVTH", offset: 0, width: 2, mask: 0b11, default: 0b01 },
    FieldDescriptor { name: "SEL_TD0", offset: 2, width: 2, mask: 0b11, default: 0b01 },
    FieldDescriptor { name: "SEL_GDLY", offset: 4, width: 1, mask: 0b1, default: 0b1 },
    FieldDescriptor { name: "XREFRESH", offset: 5, width: 1, mask: 0b1, default: 0b0 },
    FieldDescriptor { name: "SEL_GCK_EDGE", offset: 6, width: 1, mask: 0b1, default: 0b0 },
    FieldDescriptor { name: "SEL_PCHG", offset: 7, width: 1, mask: 0b1, default: 0b0 },
    FieldDescriptor { name: "ESPWM", offset: 8, width: 1, mask: 0b1, default: 0b1 },
    FieldDescriptor { name: "LGSE3", offset: 9, width: 1, mask: 0b1, default: 0b0 },
    FieldDescriptor { name: "LGSE1", offset: 11, width: 3, mask: 0b111, default: 0b000 },
    FieldDescriptor { name: "CCB", offset: 14, width: 9, mask: 0x1ff, default: 0x100 },
    FieldDescriptor { name: "CCG", offset: 23, width: 9, mask: 0x1ff, default: 0x100 },
    FieldDescriptor { name: "CCR", offset: 32, width: 9, mask: 0x1ff, default: 0x100 },
    FieldDescriptor { name: "BC", offset: 41, width: 3, mask: 0b111, default: 0b100 },
    FieldDescriptor { name: "PokerTransMode", offset: 44, width: 1, mask: 0b1, default: 0b0 },
    FieldDescriptor { name: "LGSE2", offset: 45, width: 3, mask: 0b111, default: 0b000 },
];

/// Function-control register word with every field at its default value.
pub fn fc_default_word() -> u64 {
    FC_FIELDS.iter().fold(0, |word, field| {
        word | ((u64::from(field.default) & field.mask) << field.offset)
    })
}

/// Function commands of the serial interface.
///
/// A command is conveyed through latch timing alone: the latch line rises
/// `16 - opcode` bits into a 16-bit command window and stays high until the
/// window ends. The window bits themselves are ordinary payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionCommand {
    /// Shift the window into the common register as grayscale data
    Wrtgs = 1,
    /// Grayscale write plus copy into the active grayscale latch
    Latgs = 3,
    /// Shift the window into the function-control registers
    Wrtfc = 5,
    /// Reset the grayscale line counter
    Linereset = 7,
    /// Read the function-control register back onto the output
    Readfc = 11,
    /// Reset the grayscale timing counters
    Tmgrst = 13,
    /// Arm the next function-control write
    Fcwrten = 15,
}

impl FunctionCommand {
    /// The raw opcode of this command.
    pub fn opcode(self) -> u8 {
        self as u8
    }

    /// Bit index inside the command window at which the latch line rises
    /// for this command.
    pub fn latch_bit_index(self) -> usize {
        COMMAND_BIT_COUNT - self as usize
    }

    /// Looks up the command for a raw opcode value.
    ///
    /// Latch timing for opcodes outside the documented set is undefined on
    /// the chip, so anything else fails with [`Error::Config`].
    pub fn from_opcode(opcode: u8) -> Result<FunctionCommand> {
        match opcode {
            1 => Ok(FunctionCommand::Wrtgs),
            3 => Ok(FunctionCommand::Latgs),
            5 => Ok(FunctionCommand::Wrtfc),
            7 => Ok(FunctionCommand::Linereset),
            11 => Ok(FunctionCommand::Readfc),
            13 => Ok(FunctionCommand::Tmgrst),
            15 => Ok(FunctionCommand::Fcwrten),
            _ => Err(Error::Config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitfield::unpack;

    #[test]
    fn latch_rises_at_window_end_minus_opcode() {
        assert_eq!(FunctionCommand::Wrtgs.latch_bit_index(), 15);
        assert_eq!(FunctionCommand::Latgs.latch_bit_index(), 13);
        assert_eq!(FunctionCommand::Wrtfc.latch_bit_index(), 11);
        assert_eq!(FunctionCommand::Linereset.latch_bit_index(), 9);
        assert_eq!(FunctionCommand::Readfc.latch_bit_index(), 5);
        assert_eq!(FunctionCommand::Tmgrst.latch_bit_index(), 3);
        assert_eq!(FunctionCommand::Fcwrten.latch_bit_index(), 1);
    }

    #[test]
    fn opcode_lookup_roundtrips() {
        for &command in &[
            FunctionCommand::Wrtgs,
            FunctionCommand::Latgs,
            FunctionCommand::Wrtfc,
            FunctionCommand::Linereset,
            FunctionCommand::Readfc,
            FunctionCommand::Tmgrst,
            FunctionCommand::Fcwrten,
        ] {
            assert_eq!(FunctionCommand::from_opcode(command.opcode()), Ok(command));
        }
    }

    #[test]
    fn undocumented_opcodes_are_rejected() {
        for opcode in &[0u8, 2, 4, 6, 8, 9, 10, 12, 14, 16, 255] {
            assert_eq!(FunctionCommand::from_opcode(*opcode), Err(Error::Config));
        }
    }

    #[test]
    fn descriptors_match_enum_order() {
        assert_eq!(Field::Lodvth.descriptor().name, "LODVTH");
        assert_eq!(Field::Ccr.descriptor().name, "CCR");
        assert_eq!(Field::Ccr.descriptor().offset, 32);
        assert_eq!(Field::Lgse2.descriptor().name, "LGSE2");
        for (index, &field) in Field::ALL.iter().enumerate() {
            assert_eq!(field.descriptor().name, FC_FIELDS[index].name);
        }
    }

    #[test]
    fn fields_fit_the_register_without_overlap() {
        let mut occupied = 0u64;
        for field in &FC_FIELDS {
            assert_eq!(field.mask, (1u64 << field.width) - 1, "{}", field.name);
            assert!(field.offset + field.width <= CHIP_BUFFER_BIT_COUNT as u32, "{}", field.name);
            let range = field.mask << field.offset;
            assert_eq!(occupied & range, 0, "{} overlaps a neighbour", field.name);
            occupied |= range;
        }
        // bit 10 stays reserved
        assert_eq!(occupied & (1u64 << 10), 0);
    }

    #[test]
    fn default_word_unpacks_to_the_table() {
        let word = fc_default_word();
        for field in &FC_FIELDS {
            assert_eq!(
                unpack(word, field.offset, field.mask),
                u64::from(field.default),
                "{}",
                field.name
            );
        }
    }
}
