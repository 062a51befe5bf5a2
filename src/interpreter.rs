/*
 * This is free software, distributed under the MIT license.  A copy of the
 * license can be found in the LICENSE file in the project root, or at
 * https://opensource.org/licenses/MIT.
 */

//! The machine itself.
//!
//! The main focus of this module is the `Interpreter` struct, which contains
//! the entire state of the virtual machine and the public surface a host
//! drives: `reset`, `load_program`, `step`, `tick_timers`, the display
//! snapshot and the keypad latches.  `step` executes exactly one instruction
//! per call and never blocks or sleeps; pacing is entirely the host's job.
//!
//! Errors out of `step` mean the loaded program did something unrecoverable
//! (ran its program counter off the end of memory, overflowed the call
//! stack, returned with nothing to return to) or hit a word that decodes to
//! no instruction.  The machine state is left as it was before the failing
//! operation, and the host decides whether to halt, reset or carry on.

use std::default::Default;
use std::io::Read;
use std::num::Wrapping;
use std::u8;

use failure::{Error, Fail, ResultExt};
use rand::{weak_rng, Rng};

use display;
use display::{FONT_HEIGHT, FONT_SPRITES};
use input::{self, Key};
use instruction::{Address, AddressOutOfBoundsError, Instruction, Opcode, Register};
use timer::Timers;
use FONT_START;
use MEM_SIZE;
use PROG_SIZE;
use PROG_START;

/// The maximum number of frames on the call stack.
pub const CALL_STACK_SIZE: usize = 16;

/// An error resulting from a bad `RET` instruction.
#[derive(Debug, Fail)]
#[fail(display = "no subroutine to return from")]
pub struct NotInSubroutineError;

/// An error resulting from a `CALL` instruction nested too deep.
#[derive(Debug, Fail)]
#[fail(display = "call stack overflow (more than {} nested calls)", _0)]
pub struct CallStackOverflowError(pub usize);

/// An error resulting from an input program being too large.
#[derive(Debug, Fail)]
#[fail(display = "input program is too large")]
pub struct ProgramTooLargeError;

/// An error resulting from a program counter that cannot hold a whole
/// instruction, which means the program has run off its bounds.
#[derive(Debug, Fail)]
#[fail(display = "program counter out of bounds on fetch: {:#05X}", _0)]
pub struct PcOutOfBoundsError(pub usize);

/// A CHIP-8 virtual machine.
///
/// This struct contains the entire machine state and provides the methods a
/// host composes into a run loop.  Nothing here does I/O or reads a clock,
/// so driving `step` and `tick_timers` directly gives reproducible runs;
/// the only nondeterminism is the random-byte source, which can be injected
/// through `with_rng` for deterministic replay.
pub struct Interpreter {
    /// The internal memory.
    mem: [u8; MEM_SIZE],
    /// The display buffer.
    display: display::Buffer,
    /// The keypad state.
    input: input::State,
    /// The general-purpose registers `V0`-`VF`.
    regs: [Wrapping<u8>; 16],
    /// The index register `I`.
    reg_i: Address,
    /// The delay and sound timers.
    timers: Timers,
    /// The program counter.
    pc: usize,
    /// The call stack (return addresses, newest last).
    call_stack: Vec<usize>,
    /// The source of random bytes for the `RND` instruction.
    rng: Box<dyn Rng>,
}

impl Interpreter {
    /// Returns a new machine with an OS-seeded random source.
    pub fn new() -> Self {
        Interpreter::with_rng(Box::new(weak_rng()))
    }

    /// Returns a new machine drawing random bytes from the given source.
    pub fn with_rng(rng: Box<dyn Rng>) -> Self {
        let mut interpreter = Interpreter {
            mem: [0; MEM_SIZE],
            display: display::Buffer::new(),
            input: input::State::new(),
            regs: [Wrapping(0); 16],
            reg_i: Address::from_usize(0).unwrap(),
            timers: Timers::new(),
            pc: PROG_START,
            call_stack: Vec::with_capacity(CALL_STACK_SIZE),
            rng,
        };
        interpreter.install_font();
        interpreter
    }

    /// Resets the machine to its power-on state.
    ///
    /// All memory, registers, timers, keypad latches and the display are
    /// zeroed, the font is reinstalled, the program counter returns to the
    /// program start and the redraw flag is raised.  The random source is
    /// kept.
    pub fn reset(&mut self) {
        self.mem = [0; MEM_SIZE];
        self.display.clear();
        self.display.force_redraw();
        self.input = input::State::new();
        self.regs = [Wrapping(0); 16];
        self.reg_i = Address::from_usize(0).unwrap();
        self.timers = Timers::new();
        self.pc = PROG_START;
        self.call_stack.clear();
        self.install_font();
    }

    /// Loads program data from the specified source.
    ///
    /// The program is placed at the conventional start address.  A source
    /// holding more bytes than fit there is rejected before any of it is
    /// written to memory.
    pub fn load_program<R: Read>(&mut self, input: &mut R) -> Result<(), Error> {
        let mut program = Vec::new();
        input.read_to_end(&mut program)?;
        if program.len() > PROG_SIZE {
            return Err(ProgramTooLargeError.into());
        }
        self.mem[PROG_START..PROG_START + program.len()].copy_from_slice(&program);
        debug!("loaded {} byte program", program.len());
        Ok(())
    }

    /// Performs a single fetch/decode/execute step.
    pub fn step(&mut self) -> Result<(), Error> {
        let at = self.pc;
        let opcode = self.fetch()?;
        let instr = Instruction::from_opcode(opcode)
            .with_context(|_| format!("could not decode word at {:#05X}", at))?;
        trace!("{:#05X}: {}", at, instr);
        self.execute(instr)
    }

    /// Decrements each countdown timer that is above zero.
    ///
    /// The host calls this at its chosen cadence (conventionally 60 Hz),
    /// independently of the instruction rate.
    pub fn tick_timers(&mut self) {
        self.timers.tick();
    }

    /// Returns an owned copy of the pixel grid.
    pub fn snapshot_display(&self) -> [[bool; display::WIDTH]; display::HEIGHT] {
        self.display.snapshot()
    }

    /// Returns whether the display has changed since the redraw flag was
    /// last cleared.
    pub fn redraw_needed(&self) -> bool {
        self.display.redraw_needed()
    }

    /// Clears the redraw flag; to be called by the host once it has
    /// consumed a frame.
    pub fn clear_redraw(&mut self) {
        self.display.clear_redraw();
    }

    /// Presses or releases the given keypad key.
    pub fn set_key(&mut self, key: Key, pressed: bool) {
        self.input.set_pressed(key, pressed);
    }

    /// Returns whether the given keypad key is pressed.
    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.input.is_pressed(key)
    }

    /// Returns a reference to the display buffer.
    pub fn display(&self) -> &display::Buffer {
        &self.display
    }

    /// Returns a mutable reference to the display buffer.
    pub fn display_mut(&mut self) -> &mut display::Buffer {
        &mut self.display
    }

    /// Returns a reference to the keypad state.
    pub fn input(&self) -> &input::State {
        &self.input
    }

    /// Returns a mutable reference to the keypad state.
    pub fn input_mut(&mut self) -> &mut input::State {
        &mut self.input
    }

    /// Returns a reference to the internal memory.
    pub fn mem(&self) -> &[u8; MEM_SIZE] {
        &self.mem
    }

    /// Returns a mutable reference to the internal memory.
    pub fn mem_mut(&mut self) -> &mut [u8; MEM_SIZE] {
        &mut self.mem
    }

    /// Returns the value of register `I`.
    pub fn i(&self) -> Address {
        self.reg_i
    }

    /// Sets the value of register `I`.
    pub fn set_i(&mut self, val: Address) {
        self.reg_i = val;
    }

    /// Returns the value of the delay timer.
    pub fn dt(&self) -> u8 {
        self.timers.delay()
    }

    /// Sets the value of the delay timer.
    pub fn set_dt(&mut self, val: u8) {
        self.timers.set_delay(val);
    }

    /// Returns the value of the sound timer.
    pub fn st(&self) -> u8 {
        self.timers.sound()
    }

    /// Sets the value of the sound timer.
    pub fn set_st(&mut self, val: u8) {
        self.timers.set_sound(val);
    }

    /// Returns the value in the given register.
    pub fn register(&self, reg: Register) -> u8 {
        self.regs[reg as usize].0
    }

    /// Sets the given register to the given value.
    pub fn set_register(&mut self, reg: Register, val: u8) {
        self.regs[reg as usize].0 = val
    }

    /// Returns the value of the program counter.
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Fetches the opcode word at the program counter and advances past it.
    ///
    /// The bounds precondition is checked before anything is mutated, so a
    /// runaway program counter surfaces with the machine state intact.
    fn fetch(&mut self) -> Result<Opcode, Error> {
        if self.pc > MEM_SIZE - 2 {
            return Err(PcOutOfBoundsError(self.pc).into());
        }
        let opcode = Opcode::from_bytes(self.mem[self.pc], self.mem[self.pc + 1]);
        self.pc += 2;
        Ok(opcode)
    }

    /// Executes the given instruction in the current machine context.
    ///
    /// The program counter is taken to point just past the instruction, as
    /// it does after a fetch; skip instructions step over the following
    /// word, and `LD Vx, K` with no key down backs up onto itself.
    pub fn execute(&mut self, ins: Instruction) -> Result<(), Error> {
        use self::Instruction::*;

        match ins {
            Cls => self.display.clear(),
            Ret => {
                self.pc = self.call_stack
                    .pop()
                    .ok_or(NotInSubroutineError)
                    .with_context(|_| format!("error executing {}", ins))?;
            }
            Jp(addr) => self.pc = addr.addr(),
            Call(addr) => {
                if self.call_stack.len() == CALL_STACK_SIZE {
                    let err = CallStackOverflowError(CALL_STACK_SIZE);
                    return Err(err.context(format!("error executing {}", ins)).into());
                }
                self.call_stack.push(self.pc);
                self.pc = addr.addr();
            }
            SeByte(reg, b) => if self.register(reg) == b {
                self.pc += 2;
            },
            SneByte(reg, b) => if self.register(reg) != b {
                self.pc += 2;
            },
            SeReg(reg1, reg2) => if self.register(reg1) == self.register(reg2) {
                self.pc += 2;
            },
            LdByte(reg, b) => self.set_register(reg, b),
            AddByte(reg, b) => {
                // No carry flag for the immediate form.
                let r = self.register(reg);
                self.set_register(reg, r.wrapping_add(b));
            }
            LdReg(reg1, reg2) => {
                let r2 = self.register(reg2);
                self.set_register(reg1, r2);
            }
            Or(reg1, reg2) => {
                let r1 = self.register(reg1);
                let r2 = self.register(reg2);
                self.set_register(reg1, r1 | r2);
            }
            And(reg1, reg2) => {
                let r1 = self.register(reg1);
                let r2 = self.register(reg2);
                self.set_register(reg1, r1 & r2);
            }
            Xor(reg1, reg2) => {
                let r1 = self.register(reg1);
                let r2 = self.register(reg2);
                self.set_register(reg1, r1 ^ r2);
            }
            AddReg(reg1, reg2) => {
                let r2 = self.register(reg2);
                self.add(reg1, r2);
            }
            Sub(reg1, reg2) => {
                let r2 = self.register(reg2);
                self.sub(reg1, r2);
            }
            Shr(reg) => self.shr(reg),
            Subn(reg1, reg2) => {
                let r2 = self.register(reg2);
                self.subn(reg1, r2);
            }
            Shl(reg) => self.shl(reg),
            SneReg(reg1, reg2) => if self.register(reg1) != self.register(reg2) {
                self.pc += 2;
            },
            LdI(addr) => self.reg_i = addr,
            JpV0(addr) => self.pc = addr.addr() + self.register(Register::V0) as usize,
            Rnd(reg, b) => {
                let random = self.rng.gen::<u8>();
                self.set_register(reg, random & b);
            }
            Drw(reg1, reg2, n) => self.drw(reg1, reg2, n)
                .with_context(|_| format!("error executing {}", ins))?,
            Skp(reg) => if self.input.is_pressed(Key::from_byte(self.register(reg))) {
                self.pc += 2;
            },
            Sknp(reg) => if !self.input.is_pressed(Key::from_byte(self.register(reg))) {
                self.pc += 2;
            },
            LdRegDt(reg) => {
                let dt = self.dt();
                self.set_register(reg, dt);
            }
            LdKey(reg) => match self.input.first_pressed() {
                Some(key) => self.set_register(reg, key as u8),
                // Re-execute this instruction on the next step.
                None => self.pc -= 2,
            },
            LdDtReg(reg) => {
                let r = self.register(reg);
                self.set_dt(r);
            }
            LdSt(reg) => {
                let r = self.register(reg);
                self.set_st(r);
            }
            AddI(reg) => {
                let new_i = (self.reg_i + self.register(reg) as usize)
                    .with_context(|_| format!("error executing {}", ins))?;
                self.reg_i = new_i;
            }
            LdF(reg) => {
                let digit = (self.register(reg) & 0xF) as usize;
                self.reg_i = Address::from_usize(FONT_START + FONT_HEIGHT * digit).unwrap();
            }
            LdB(reg) => self.ld_b(reg)
                .with_context(|_| format!("error executing {}", ins))?,
            LdDerefIReg(reg) => self.store_regs(reg)
                .with_context(|_| format!("error executing {}", ins))?,
            LdRegDerefI(reg) => self.load_regs(reg)
                .with_context(|_| format!("error executing {}", ins))?,
        }

        Ok(())
    }

    /// Copies the font sprites into low memory.
    fn install_font(&mut self) {
        for (i, sprite) in FONT_SPRITES.iter().enumerate() {
            let start = FONT_START + i * FONT_HEIGHT;
            self.mem[start..start + sprite.len()].copy_from_slice(sprite);
        }
    }

    /// Adds the given byte to the given register, setting `VF` to 1 on carry
    /// or 0 otherwise.
    fn add(&mut self, reg: Register, val: u8) {
        let carry = val > u8::MAX - self.register(reg);
        self.regs[reg as usize] += Wrapping(val);
        self.set_register(Register::VF, carry as u8);
    }

    /// Sets `reg` to `reg - val`, with `VF` as the no-borrow flag.
    ///
    /// The flag lands before the difference, so `SUB VF, Vy` leaves the
    /// difference in `VF`; both derive from the pre-instruction operands.
    fn sub(&mut self, reg: Register, val: u8) {
        let no_borrow = self.register(reg) >= val;
        let result = self.register(reg).wrapping_sub(val);
        self.set_register(Register::VF, no_borrow as u8);
        self.set_register(reg, result);
    }

    /// Sets `reg` to `val - reg`, with `VF` as the no-borrow flag.
    fn subn(&mut self, reg: Register, val: u8) {
        let no_borrow = val >= self.register(reg);
        let result = val.wrapping_sub(self.register(reg));
        self.set_register(Register::VF, no_borrow as u8);
        self.set_register(reg, result);
    }

    /// Shifts `reg` right by one, setting `VF` to the old lowest bit.
    ///
    /// The flag is written last, so `SHR VF` leaves the flag (not the
    /// shifted value) in `VF`.
    fn shr(&mut self, reg: Register) {
        let old = self.register(reg) & 1;
        let r = self.register(reg);
        self.set_register(reg, r >> 1);
        self.set_register(Register::VF, old);
    }

    /// Shifts `reg` left by one, setting `VF` to the old highest bit.
    fn shl(&mut self, reg: Register) {
        let old = self.register(reg) >> 7;
        let r = self.register(reg);
        self.set_register(reg, r << 1);
        self.set_register(Register::VF, old);
    }

    /// Implements the `DRW` operation.
    ///
    /// `VF` reports whether any pixel was toggled off.
    fn drw(&mut self, reg1: Register, reg2: Register, n: u8) -> Result<(), Error> {
        let start = self.reg_i.addr();
        let end = start + n as usize;
        if end > MEM_SIZE {
            Err(AddressOutOfBoundsError(end - 1))?
        }

        let x = self.register(reg1) as usize;
        let y = self.register(reg2) as usize;
        let collision = self.display.draw_sprite(&self.mem[start..end], x, y);
        self.set_register(Register::VF, collision as u8);
        Ok(())
    }

    /// Implements the `LD B, Vx` operation.
    fn ld_b(&mut self, reg: Register) -> Result<(), Error> {
        let val = self.register(reg);
        let addr = self.reg_i.addr();

        if addr + 2 >= MEM_SIZE {
            Err(AddressOutOfBoundsError(addr + 2))?
        }
        self.mem[addr] = val / 100;
        self.mem[addr + 1] = val % 100 / 10;
        self.mem[addr + 2] = val % 10;
        Ok(())
    }

    /// Implements the `LD [I], Vx` operation: copies `V0` through `Vx`
    /// inclusive into memory starting at `I`.
    fn store_regs(&mut self, reg: Register) -> Result<(), Error> {
        let count = reg as usize + 1;
        let start = self.reg_i.addr();

        if start + count > MEM_SIZE {
            Err(AddressOutOfBoundsError(start + count - 1))?
        }
        for (dest, src) in self.mem[start..start + count]
            .iter_mut()
            .zip(self.regs[..count].iter())
        {
            *dest = src.0;
        }
        Ok(())
    }

    /// Implements the `LD Vx, [I]` operation: fills `V0` through `Vx`
    /// inclusive from memory starting at `I`.
    fn load_regs(&mut self, reg: Register) -> Result<(), Error> {
        let count = reg as usize + 1;
        let start = self.reg_i.addr();

        if start + count > MEM_SIZE {
            Err(AddressOutOfBoundsError(start + count - 1))?
        }
        for (dest, src) in self.regs[..count]
            .iter_mut()
            .zip(self.mem[start..start + count].iter())
        {
            *dest = Wrapping(*src);
        }
        Ok(())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}
