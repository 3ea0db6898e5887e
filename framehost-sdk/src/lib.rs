#![cfg_attr(not(feature = "std"), no_std)]

//! framehost-sdk (handwritten)
//!
//! This crate is used by **guest** WASM modules hosted by `framehost`.
//!
//! ABI model:
//! - Host calls the guest's exports `init(width, height)`, `cls(color)`, `update()`, `draw()`.
//! - Guest may export `alloc(len) -> ptr` and `load(ptr, len)` to receive resources.
//! - Guest imports `console_log` and `gamepad_pressed` from module `env`.
//!
//! Strings cross the boundary as `(ptr, len)` pairs of UTF-8 bytes in linear memory.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Global allocator for guests built with the `wee_alloc` feature.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Virtual gamepad buttons, in host ABI order.
#[repr(i32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Button {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
    A = 4,
    B = 5,
    X = 6,
    Y = 7,
}

/// Low-level raw ABI imports.
pub mod sys {
    unsafe extern "C" {
        /// Log `len` UTF-8 bytes starting at `ptr`.
        pub fn console_log(ptr: i32, len: i32);

        /// 1 if the button is held, 0 otherwise (including unknown ids).
        pub fn gamepad_pressed(button: i32) -> i32;
    }
}

/// System API.
pub mod system {
    use super::sys;

    /// Log a line to the host console.
    pub fn log(message: &str) {
        unsafe { sys::console_log(message.as_ptr() as i32, message.len() as i32) }
    }
}

/// Input API.
pub mod input {
    use super::{Button, sys};

    pub fn is_pressed(button: Button) -> bool {
        unsafe { sys::gamepad_pressed(button as i32) != 0 }
    }
}

/// Fixed-size bump buffer for answering the host's `alloc` calls.
///
/// Resources are copied in by the host and never freed; `reset` starts over once the
/// guest is done with everything it loaded.
pub struct BumpBuffer<const N: usize> {
    bytes: UnsafeCell<[u8; N]>,
    next: AtomicUsize,
}

// Guests are single-threaded; the atomic cursor hands out disjoint ranges.
unsafe impl<const N: usize> Sync for BumpBuffer<N> {}

impl<const N: usize> Default for BumpBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> BumpBuffer<N> {
    pub const fn new() -> Self {
        Self {
            bytes: UnsafeCell::new([0; N]),
            next: AtomicUsize::new(0),
        }
    }

    /// Reserve `len` bytes. `None` when the buffer is exhausted or `len` is negative.
    pub fn alloc(&self, len: i32) -> Option<*mut u8> {
        let len = usize::try_from(len).ok()?;
        let start = self
            .next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |next| {
                next.checked_add(len).filter(|end| *end <= N)
            })
            .ok()?;
        // SAFETY: `start + len <= N`, checked above.
        Some(unsafe { self.bytes.get().cast::<u8>().add(start) })
    }

    pub fn used(&self) -> usize {
        self.next.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.next.store(0, Ordering::Release);
    }
}

/// Borrow a resource the host placed at `(ptr, len)`.
///
/// # Safety
/// `ptr` must be a pointer previously returned by this guest's `alloc`, and `len` must
/// not exceed the size requested there.
pub unsafe fn resource_bytes<'a>(ptr: i32, len: i32) -> &'a [u8] {
    if len <= 0 {
        return &[];
    }
    unsafe { core::slice::from_raw_parts(ptr as usize as *const u8, len as usize) }
}

/// Convenience prelude for guest modules.
pub mod prelude {
    pub use crate::BumpBuffer;
    pub use crate::Button;
    pub use crate::input;
    pub use crate::resource_bytes;
    pub use crate::system;
}
