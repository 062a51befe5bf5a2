/*
 * This is free software, distributed under the MIT license.  A copy of the
 * license can be found in the LICENSE file in the project root, or at
 * https://opensource.org/licenses/MIT.
 */

//! The delay and sound countdown timers.
//!
//! The machine never reads a clock; the host calls `tick` at whatever
//! cadence it wants (conventionally 60 Hz), independently of the
//! instruction rate.

/// The two countdown timers.
///
/// Each value counts down toward zero and stops there.  The sound timer is
/// only a counter from the machine's point of view; a host that wants audio
/// samples `sound() > 0` and emits a tone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timers {
    /// The delay timer, polled by programs via `LD Vx, DT`.
    delay: u8,
    /// The sound timer.
    sound: u8,
}

impl Timers {
    /// Returns a new pair of timers, both at zero.
    pub fn new() -> Self {
        Timers::default()
    }

    /// Decrements each timer that is above zero by one.
    pub fn tick(&mut self) {
        if self.delay > 0 {
            self.delay -= 1;
        }
        if self.sound > 0 {
            self.sound -= 1;
        }
    }

    /// Returns the value of the delay timer.
    pub fn delay(&self) -> u8 {
        self.delay
    }

    /// Sets the delay timer.
    pub fn set_delay(&mut self, val: u8) {
        self.delay = val;
    }

    /// Returns the value of the sound timer.
    pub fn sound(&self) -> u8 {
        self.sound
    }

    /// Sets the sound timer.
    pub fn set_sound(&mut self, val: u8) {
        self.sound = val;
    }
}
