/*
 * This is free software, distributed under the MIT license.  A copy of the
 * license can be found in the LICENSE file in the project root, or at
 * https://opensource.org/licenses/MIT.
 */

//! Instructions, opcodes and addresses.
//!
//! The central type here is `Instruction`, the decoded form of a 16-bit
//! opcode word.  Decoding happens exactly once, in `Instruction::from_opcode`;
//! after that point the interpreter dispatches on an exhaustive `match` over
//! the variants and never has to pick bit fields apart again.  Invalid words
//! are rejected here, so an `Instruction` value is always executable.

use std::fmt;
use std::ops::Add;

use failure::Error;
use num::FromPrimitive;

use MEM_SIZE;

/// An error resulting from an out-of-bounds address.
#[derive(Debug, Fail, PartialEq, Eq)]
#[fail(display = "address out of bounds: {:#05X}", _0)]
pub struct AddressOutOfBoundsError(pub usize);

/// An error resulting from an opcode word that matches no instruction.
#[derive(Debug, Fail, PartialEq, Eq)]
#[fail(display = "invalid opcode: {}", _0)]
pub struct InvalidOpcodeError(pub Opcode);

enum_from_primitive! {
/// A general-purpose register.
///
/// `VF` doubles as the flag output of the arithmetic, shift and draw
/// instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    V0 = 0,
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
    V7,
    V8,
    V9,
    VA,
    VB,
    VC,
    VD,
    VE,
    VF,
}
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", *self)
    }
}

/// A raw 16-bit opcode word.
///
/// Having this as a wrapper around an ordinary `u16` allows the operand
/// views (`addr`, `nibble`, `byte`, `vx`, `vy`) to live in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode(pub u16);

impl Opcode {
    /// Combines a high and a low byte into an opcode word.
    pub fn from_bytes(high: u8, low: u8) -> Self {
        Opcode((high as u16) << 8 | low as u16)
    }

    /// Returns the `Vx` register field (bits 8-11).
    fn vx(&self) -> Register {
        Register::from_u16((self.0 & 0x0F00) >> 8).unwrap()
    }

    /// Returns the `Vy` register field (bits 4-7).
    fn vy(&self) -> Register {
        Register::from_u16((self.0 & 0x00F0) >> 4).unwrap()
    }

    /// Returns the low 4-bit immediate.
    fn nibble(&self) -> u8 {
        self.0 as u8 & 0xF
    }

    /// Returns the low 8-bit immediate.
    fn byte(&self) -> u8 {
        self.0 as u8
    }

    /// Returns the low 12-bit address field.
    ///
    /// A 12-bit value is always a valid address, so this cannot fail.
    fn addr(&self) -> Address {
        Address((self.0 & 0xFFF) as usize)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{:04X}", self.0)
    }
}

/// An address pointing to a memory location.
///
/// Any instance of this type is guaranteed to lie within the addressable
/// range, so the interpreter can index memory with it without further
/// checks.
///
/// # Examples
///
/// ```
/// use chip8_vm::Address;
///
/// let addr = Address::from_u16(0x204).unwrap();
/// assert_eq!(addr.addr(), 0x204);
/// assert!(Address::from_usize(0x1000).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address(usize);

impl Address {
    /// Verifies whether the given `u16` address value is valid, returning the
    /// corresponding `Address` if it is.
    pub fn from_u16(addr: u16) -> Result<Self, AddressOutOfBoundsError> {
        Address::from_usize(addr as usize)
    }

    /// Verifies whether the given `usize` address is valid, returning the
    /// corresponding `Address` if it is.
    pub fn from_usize(addr: usize) -> Result<Self, AddressOutOfBoundsError> {
        if addr >= MEM_SIZE {
            Err(AddressOutOfBoundsError(addr))
        } else {
            Ok(Address(addr))
        }
    }

    /// Returns the value of the address.
    pub fn addr(&self) -> usize {
        self.0
    }
}

impl Add<usize> for Address {
    type Output = Result<Self, AddressOutOfBoundsError>;

    fn add(self, rhs: usize) -> Self::Output {
        Address::from_usize(self.0 + rhs)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#05X}", self.0)
    }
}

/// A decoded instruction.
///
/// The variant names follow the conventional CHIP-8 assembly mnemonics.
/// Address operands are carried as already-validated `Address` values, so
/// execution never has to re-check the 12-bit field.
///
/// # Examples
///
/// ```
/// use chip8_vm::{Instruction, Opcode, Register};
///
/// let instr = Instruction::from_opcode(Opcode(0x7510)).unwrap();
/// assert_eq!(instr, Instruction::AddByte(Register::V5, 0x10));
/// assert!(Instruction::from_opcode(Opcode(0x5121)).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// `CLS` (`00E0`).
    Cls,
    /// `RET` (`00EE`).
    Ret,
    /// `JP addr` (`1nnn`).
    Jp(Address),
    /// `CALL addr` (`2nnn`).
    Call(Address),
    /// `SE Vx, byte` (`3xkk`).
    SeByte(Register, u8),
    /// `SNE Vx, byte` (`4xkk`).
    SneByte(Register, u8),
    /// `SE Vx, Vy` (`5xy0`).
    SeReg(Register, Register),
    /// `LD Vx, byte` (`6xkk`).
    LdByte(Register, u8),
    /// `ADD Vx, byte` (`7xkk`).
    AddByte(Register, u8),
    /// `LD Vx, Vy` (`8xy0`).
    LdReg(Register, Register),
    /// `OR Vx, Vy` (`8xy1`).
    Or(Register, Register),
    /// `AND Vx, Vy` (`8xy2`).
    And(Register, Register),
    /// `XOR Vx, Vy` (`8xy3`).
    Xor(Register, Register),
    /// `ADD Vx, Vy` (`8xy4`).
    AddReg(Register, Register),
    /// `SUB Vx, Vy` (`8xy5`).
    Sub(Register, Register),
    /// `SHR Vx` (`8xy6`; the `y` field is ignored).
    Shr(Register),
    /// `SUBN Vx, Vy` (`8xy7`).
    Subn(Register, Register),
    /// `SHL Vx` (`8xyE`; the `y` field is ignored).
    Shl(Register),
    /// `SNE Vx, Vy` (`9xy0`).
    SneReg(Register, Register),
    /// `LD I, addr` (`Annn`).
    LdI(Address),
    /// `JP V0, addr` (`Bnnn`).
    JpV0(Address),
    /// `RND Vx, byte` (`Cxkk`).
    Rnd(Register, u8),
    /// `DRW Vx, Vy, nibble` (`Dxyn`).
    Drw(Register, Register, u8),
    /// `SKP Vx` (`Ex9E`).
    Skp(Register),
    /// `SKNP Vx` (`ExA1`).
    Sknp(Register),
    /// `LD Vx, DT` (`Fx07`).
    LdRegDt(Register),
    /// `LD Vx, K` (`Fx0A`).
    LdKey(Register),
    /// `LD DT, Vx` (`Fx15`).
    LdDtReg(Register),
    /// `LD ST, Vx` (`Fx18`).
    LdSt(Register),
    /// `ADD I, Vx` (`Fx1E`).
    AddI(Register),
    /// `LD F, Vx` (`Fx29`).
    LdF(Register),
    /// `LD B, Vx` (`Fx33`).
    LdB(Register),
    /// `LD [I], Vx` (`Fx55`).
    LdDerefIReg(Register),
    /// `LD Vx, [I]` (`Fx65`).
    LdRegDerefI(Register),
}

impl Instruction {
    /// Returns the instruction corresponding to the given opcode word.
    ///
    /// Decoding is total: exactly one variant matches, or the word is
    /// rejected with an `InvalidOpcodeError` carrying it.
    pub fn from_opcode(opcode: Opcode) -> Result<Self, Error> {
        use self::Instruction::*;

        Ok(match (opcode.0 & 0xF000) >> 12 {
            0x0 => match opcode.0 & 0xFF {
                0xE0 => Cls,
                0xEE => Ret,
                _ => Err(InvalidOpcodeError(opcode))?,
            },
            0x1 => Jp(opcode.addr()),
            0x2 => Call(opcode.addr()),
            0x3 => SeByte(opcode.vx(), opcode.byte()),
            0x4 => SneByte(opcode.vx(), opcode.byte()),
            0x5 => if opcode.0 & 0xF == 0 {
                SeReg(opcode.vx(), opcode.vy())
            } else {
                Err(InvalidOpcodeError(opcode))?
            },
            0x6 => LdByte(opcode.vx(), opcode.byte()),
            0x7 => AddByte(opcode.vx(), opcode.byte()),
            0x8 => match opcode.0 & 0xF {
                0x0 => LdReg(opcode.vx(), opcode.vy()),
                0x1 => Or(opcode.vx(), opcode.vy()),
                0x2 => And(opcode.vx(), opcode.vy()),
                0x3 => Xor(opcode.vx(), opcode.vy()),
                0x4 => AddReg(opcode.vx(), opcode.vy()),
                0x5 => Sub(opcode.vx(), opcode.vy()),
                0x6 => Shr(opcode.vx()),
                0x7 => Subn(opcode.vx(), opcode.vy()),
                0xE => Shl(opcode.vx()),
                _ => Err(InvalidOpcodeError(opcode))?,
            },
            0x9 => if opcode.0 & 0xF == 0 {
                SneReg(opcode.vx(), opcode.vy())
            } else {
                Err(InvalidOpcodeError(opcode))?
            },
            0xA => LdI(opcode.addr()),
            0xB => JpV0(opcode.addr()),
            0xC => Rnd(opcode.vx(), opcode.byte()),
            0xD => Drw(opcode.vx(), opcode.vy(), opcode.nibble()),
            0xE => match opcode.0 & 0xFF {
                0x9E => Skp(opcode.vx()),
                0xA1 => Sknp(opcode.vx()),
                _ => Err(InvalidOpcodeError(opcode))?,
            },
            0xF => match opcode.0 & 0xFF {
                0x07 => LdRegDt(opcode.vx()),
                0x0A => LdKey(opcode.vx()),
                0x15 => LdDtReg(opcode.vx()),
                0x18 => LdSt(opcode.vx()),
                0x1E => AddI(opcode.vx()),
                0x29 => LdF(opcode.vx()),
                0x33 => LdB(opcode.vx()),
                0x55 => LdDerefIReg(opcode.vx()),
                0x65 => LdRegDerefI(opcode.vx()),
                _ => Err(InvalidOpcodeError(opcode))?,
            },
            _ => unreachable!("4-bit quantity didn't match 0-15"),
        })
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::Instruction::*;

        match *self {
            Cls => write!(f, "CLS"),
            Ret => write!(f, "RET"),
            Jp(addr) => write!(f, "JP {}", addr),
            Call(addr) => write!(f, "CALL {}", addr),
            SeByte(reg, b) => write!(f, "SE {}, #{:02X}", reg, b),
            SneByte(reg, b) => write!(f, "SNE {}, #{:02X}", reg, b),
            SeReg(reg1, reg2) => write!(f, "SE {}, {}", reg1, reg2),
            LdByte(reg, b) => write!(f, "LD {}, #{:02X}", reg, b),
            AddByte(reg, b) => write!(f, "ADD {}, #{:02X}", reg, b),
            LdReg(reg1, reg2) => write!(f, "LD {}, {}", reg1, reg2),
            Or(reg1, reg2) => write!(f, "OR {}, {}", reg1, reg2),
            And(reg1, reg2) => write!(f, "AND {}, {}", reg1, reg2),
            Xor(reg1, reg2) => write!(f, "XOR {}, {}", reg1, reg2),
            AddReg(reg1, reg2) => write!(f, "ADD {}, {}", reg1, reg2),
            Sub(reg1, reg2) => write!(f, "SUB {}, {}", reg1, reg2),
            Shr(reg) => write!(f, "SHR {}", reg),
            Subn(reg1, reg2) => write!(f, "SUBN {}, {}", reg1, reg2),
            Shl(reg) => write!(f, "SHL {}", reg),
            SneReg(reg1, reg2) => write!(f, "SNE {}, {}", reg1, reg2),
            LdI(addr) => write!(f, "LD I, {}", addr),
            JpV0(addr) => write!(f, "JP V0, {}", addr),
            Rnd(reg, b) => write!(f, "RND {}, #{:02X}", reg, b),
            Drw(reg1, reg2, n) => write!(f, "DRW {}, {}, {}", reg1, reg2, n),
            Skp(reg) => write!(f, "SKP {}", reg),
            Sknp(reg) => write!(f, "SKNP {}", reg),
            LdRegDt(reg) => write!(f, "LD {}, DT", reg),
            LdKey(reg) => write!(f, "LD {}, K", reg),
            LdDtReg(reg) => write!(f, "LD DT, {}", reg),
            LdSt(reg) => write!(f, "LD ST, {}", reg),
            AddI(reg) => write!(f, "ADD I, {}", reg),
            LdF(reg) => write!(f, "LD F, {}", reg),
            LdB(reg) => write!(f, "LD B, {}", reg),
            LdDerefIReg(reg) => write!(f, "LD [I], {}", reg),
            LdRegDerefI(reg) => write!(f, "LD {}, [I]", reg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Address, Instruction, Opcode};

    /// Tests that opcode words decode to the expected instructions.
    #[test]
    fn decode() {
        use super::Instruction::*;
        use Register::*;

        // Test cases, in the format (word, instruction).
        let cases = [
            (0x00E0, Cls),
            (0x00EE, Ret),
            (0x1234, Jp(Address::from_u16(0x234).unwrap())),
            (0x2ABC, Call(Address::from_u16(0xABC).unwrap())),
            (0x3744, SeByte(V7, 0x44)),
            (0x4801, SneByte(V8, 0x01)),
            (0x5120, SeReg(V1, V2)),
            (0x6EFF, LdByte(VE, 0xFF)),
            (0x70FF, AddByte(V0, 0xFF)),
            (0x8120, LdReg(V1, V2)),
            (0x8341, Or(V3, V4)),
            (0x8562, And(V5, V6)),
            (0x8783, Xor(V7, V8)),
            (0x89A4, AddReg(V9, VA)),
            (0x8BC5, Sub(VB, VC)),
            (0x8D06, Shr(VD)),
            (0x8EF7, Subn(VE, VF)),
            (0x810E, Shl(V1)),
            (0x9230, SneReg(V2, V3)),
            (0xA500, LdI(Address::from_u16(0x500).unwrap())),
            (0xB321, JpV0(Address::from_u16(0x321).unwrap())),
            (0xC2FE, Rnd(V2, 0xFE)),
            (0xD125, Drw(V1, V2, 5)),
            (0xE19E, Skp(V1)),
            (0xE2A1, Sknp(V2)),
            (0xF307, LdRegDt(V3)),
            (0xF40A, LdKey(V4)),
            (0xF515, LdDtReg(V5)),
            (0xF618, LdSt(V6)),
            (0xF71E, AddI(V7)),
            (0xF829, LdF(V8)),
            (0xF933, LdB(V9)),
            (0xFA55, LdDerefIReg(VA)),
            (0xFB65, LdRegDerefI(VB)),
        ];

        for &(word, ref instr) in cases.iter() {
            let decoded = Instruction::from_opcode(Opcode(word)).unwrap();
            assert_eq!(decoded, *instr, "word {:#06X}", word);
        }
    }

    /// Tests that unrecognized words are rejected rather than treated as
    /// no-ops.
    #[test]
    fn decode_invalid() {
        let words = [0x0000, 0x00FF, 0x5121, 0x8ABB, 0x9231, 0xE1FF, 0xF0FF];

        for &word in words.iter() {
            assert!(
                Instruction::from_opcode(Opcode(word)).is_err(),
                "word {:#06X} should not decode",
                word
            );
        }
    }

    /// Tests that the high/low byte pair is combined in the right order.
    #[test]
    fn opcode_from_bytes() {
        assert_eq!(Opcode::from_bytes(0xA2, 0x00), Opcode(0xA200));
        assert_eq!(Opcode::from_bytes(0x00, 0xE0), Opcode(0x00E0));
    }
}
