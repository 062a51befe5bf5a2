/*
 * This is free software, distributed under the MIT license.  A copy of the
 * license can be found in the LICENSE file in the project root, or at
 * https://opensource.org/licenses/MIT.
 */

//! Keypad state.
//!
//! The machine sees sixteen boolean latches.  The host owns them: it maps
//! whatever physical input it has onto key indices and calls `set_pressed`;
//! the interpreter only ever reads them.

use std::default::Default;

use num::traits::FromPrimitive;

/// The number of keys on the keypad.
const N_KEYS: usize = 16;

enum_from_primitive! {
/// The keys on the keypad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    K0 = 0,
    K1,
    K2,
    K3,
    K4,
    K5,
    K6,
    K7,
    K8,
    K9,
    KA,
    KB,
    KC,
    KD,
    KE,
    KF,
}
}

impl Key {
    /// Returns the key corresponding to the lowest four bits of the given
    /// byte.
    pub fn from_byte(b: u8) -> Key {
        Key::from_u8(b % N_KEYS as u8).unwrap()
    }
}

/// The state of the keypad latches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct State {
    /// The key states (`true` means "pressed").
    keys: [bool; N_KEYS],
}

impl State {
    /// Returns a new keypad state with all keys released.
    pub fn new() -> Self {
        State::default()
    }

    /// Returns the lowest-numbered key that is currently pressed, if any.
    ///
    /// The latch is left untouched; releasing it is the host's business.
    pub fn first_pressed(&self) -> Option<Key> {
        self.keys
            .iter()
            .position(|&pressed| pressed)
            .map(|i| Key::from_usize(i).unwrap())
    }

    /// Returns whether the given key is pressed.
    pub fn is_pressed(&self, key: Key) -> bool {
        self.keys[key as usize]
    }

    /// Presses or releases the given key.
    pub fn set_pressed(&mut self, key: Key, pressed: bool) {
        self.keys[key as usize] = pressed;
    }
}
