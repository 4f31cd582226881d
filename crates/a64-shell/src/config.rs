//! Session-wide constants fixed at startup.

use crate::errors::ShellError;

/// Default load address of the memory window.
pub const DEFAULT_BASE: u64 = 0x1000;
/// Default size of the memory window in bytes.
pub const DEFAULT_WINDOW: usize = 128;

const WORD_BYTES: usize = 4;
const ROW_BYTES: usize = 16;
const MIN_WINDOW: usize = 32;
const MAX_WINDOW: usize = 4096;

/// Validated memory window placement.
///
/// The instruction slot is the first word of the window. The emulator backs
/// the window with `window * window` bytes so writes just past it succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellConfig {
    base: u64,
    window: usize,
    backing: u64,
}

impl ShellConfig {
    /// Validates a window placement.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Config`] when `base` is not word aligned, the
    /// window is outside 32..=4096 bytes or not a multiple of 16, or the
    /// backing region would run past the end of the address space.
    pub fn new(base: u64, window: usize) -> Result<Self, ShellError> {
        if base % WORD_BYTES as u64 != 0 {
            return Err(ShellError::Config("base address must be word aligned"));
        }
        if !(MIN_WINDOW..=MAX_WINDOW).contains(&window) || window % ROW_BYTES != 0 {
            return Err(ShellError::Config(
                "window must be a multiple of 16 bytes between 32 and 4096",
            ));
        }
        let backing = u64::try_from(window)
            .ok()
            .and_then(|w| w.checked_mul(w))
            .filter(|size| base.checked_add(*size).is_some())
            .ok_or(ShellError::Config("memory window does not fit the address space"))?;

        Ok(Self {
            base,
            window,
            backing,
        })
    }

    /// Address of the window and of the instruction slot.
    #[must_use]
    pub const fn base(&self) -> u64 {
        self.base
    }

    /// Window size in bytes.
    #[must_use]
    pub const fn window(&self) -> usize {
        self.window
    }

    /// Size of the region mapped behind the window.
    #[must_use]
    pub const fn backing_size(&self) -> u64 {
        self.backing
    }

    /// Address `PC` holds at session start, one word past the slot.
    #[must_use]
    pub const fn initial_pc(&self) -> u64 {
        self.base + WORD_BYTES as u64
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE,
            window: DEFAULT_WINDOW,
            backing: (DEFAULT_WINDOW * DEFAULT_WINDOW) as u64,
        }
    }
}
