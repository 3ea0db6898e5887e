#![cfg_attr(not(feature = "std"), no_std)]

// Minimal framehost guest.
//
// Build with `cargo build -p rust_guest --target wasm32-unknown-unknown --release` and
// run the resulting `.wasm` with `framehost`.
//
// The host calls:
// - `init(width, height)` once, then `cls(color)`.
// - `update()` then `draw()` once per frame.
// - `alloc(len)` and `load(ptr, len)` when it hands over a resource.

use core::sync::atomic::{AtomicI32, AtomicU32, Ordering};
use framehost_sdk::prelude::*;

const PLAYER_SIZE: i32 = 8;

static WIDTH: AtomicI32 = AtomicI32::new(0);
static HEIGHT: AtomicI32 = AtomicI32::new(0);
static CLEAR_COLOR: AtomicI32 = AtomicI32::new(0);
static PLAYER_X: AtomicI32 = AtomicI32::new(0);
static PLAYER_Y: AtomicI32 = AtomicI32::new(0);
static FRAMES: AtomicU32 = AtomicU32::new(0);

static RESOURCES: BumpBuffer<{ 64 * 1024 }> = BumpBuffer::new();

#[unsafe(no_mangle)]
pub extern "C" fn init(width: i32, height: i32) {
    WIDTH.store(width, Ordering::Relaxed);
    HEIGHT.store(height, Ordering::Relaxed);
    PLAYER_X.store(width / 2, Ordering::Relaxed);
    PLAYER_Y.store(height / 2, Ordering::Relaxed);
    system::log("rust guest initialized");
}

#[unsafe(no_mangle)]
pub extern "C" fn cls(color: i32) {
    CLEAR_COLOR.store(color, Ordering::Relaxed);
}

#[unsafe(no_mangle)]
pub extern "C" fn update() {
    let step = |neg: Button, pos: Button| input::is_pressed(pos) as i32 - input::is_pressed(neg) as i32;

    let max_x = WIDTH.load(Ordering::Relaxed) - PLAYER_SIZE;
    let max_y = HEIGHT.load(Ordering::Relaxed) - PLAYER_SIZE;
    let x = PLAYER_X.load(Ordering::Relaxed) + step(Button::Left, Button::Right);
    let y = PLAYER_Y.load(Ordering::Relaxed) + step(Button::Up, Button::Down);
    PLAYER_X.store(x.clamp(0, max_x.max(0)), Ordering::Relaxed);
    PLAYER_Y.store(y.clamp(0, max_y.max(0)), Ordering::Relaxed);

    if input::is_pressed(Button::A) {
        system::log("jump");
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn draw() {
    let frame = FRAMES.fetch_add(1, Ordering::Relaxed) + 1;
    if frame % 30 == 0 {
        system::log("tick");
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn alloc(len: i32) -> i32 {
    RESOURCES.alloc(len).map_or(0, |ptr| ptr as i32)
}

#[unsafe(no_mangle)]
pub extern "C" fn load(ptr: i32, len: i32) {
    if ptr == 0 {
        system::log("resource dropped: out of guest memory");
        return;
    }
    let bytes = unsafe { resource_bytes(ptr, len) };
    match core::str::from_utf8(bytes) {
        Ok(text) => system::log(text),
        Err(_) => system::log("binary resource loaded"),
    }
}

#[cfg(all(target_arch = "wasm32", not(feature = "std")))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    core::arch::wasm32::unreachable()
}
