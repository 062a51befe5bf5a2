/*
 * This is free software, distributed under the MIT license.  A copy of the
 * license can be found in the LICENSE file in the project root, or at
 * https://opensource.org/licenses/MIT.
 */

//! A CHIP-8 virtual machine core.
//!
//! This crate implements only the machine itself: memory, registers, the
//! fetch/decode/execute cycle, the display buffer and the countdown timers.
//! It performs no I/O and never reads a clock; a host drives it by calling
//! `step` and `tick_timers` at whatever cadence it likes and by feeding the
//! keypad latches, which makes execution fully deterministic and easy to
//! test.

#[macro_use]
extern crate enum_primitive;
extern crate failure;
#[macro_use]
extern crate failure_derive;
#[macro_use]
extern crate log;
extern crate num;
extern crate rand;

/// The size of the machine's memory, in bytes.
pub const MEM_SIZE: usize = 0x1000;
/// The address where programs are loaded and where execution begins.
pub const PROG_START: usize = 0x200;
/// The maximum size of a program, in bytes.
pub const PROG_SIZE: usize = MEM_SIZE - PROG_START;
/// The address where the built-in hex glyph font is installed.
pub const FONT_START: usize = 0x0;

pub mod display;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod timer;

pub use input::Key;
pub use instruction::{Address, AddressOutOfBoundsError, Instruction, InvalidOpcodeError, Opcode,
                      Register};
pub use interpreter::{CallStackOverflowError, Interpreter, NotInSubroutineError,
                      PcOutOfBoundsError, ProgramTooLargeError};
