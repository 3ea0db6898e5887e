#![allow(dead_code)]

use framehost_core::{Bridge, HostConfig, ModuleSource, RecordingHooks};
use std::sync::Arc;

/// Exports its own memory, logs from its start function and from every tick.
pub const TICKING_GUEST: &str = r#"
(module
  (import "env" "console_log" (func $log (param i32 i32)))
  (import "env" "gamepad_pressed" (func $pressed (param i32) (result i32)))
  (memory (export "memory") 1)
  (data (i32.const 16) "booted")
  (data (i32.const 32) "update")
  (data (i32.const 48) "draw")
  (data (i32.const 64) "A")
  (data (i32.const 80) "init")
  (data (i32.const 96) "cls")
  (func $boot (call $log (i32.const 16) (i32.const 6)))
  (start $boot)
  (func (export "init") (param i32 i32) (call $log (i32.const 80) (i32.const 4)))
  (func (export "cls") (param i32) (call $log (i32.const 96) (i32.const 3)))
  (func (export "update")
    (call $log (i32.const 32) (i32.const 6))
    (if (call $pressed (i32.const 4))
      (then (call $log (i32.const 64) (i32.const 1)))))
  (func (export "draw") (call $log (i32.const 48) (i32.const 4)))
)
"#;

/// Imports `env.memory` instead of exporting one.
pub const PROVIDED_MEMORY_GUEST: &str = r#"
(module
  (import "env" "memory" (memory 1))
  (import "env" "console_log" (func $log (param i32 i32)))
  (data (i32.const 0) "hi from provided memory")
  (func (export "init") (param i32 i32) (call $log (i32.const 0) (i32.const 23)))
  (func (export "cls") (param i32))
  (func (export "update"))
  (func (export "draw"))
)
"#;

/// `update` logs a range past the end of memory; `draw` logs invalid UTF-8.
pub const BAD_LOG_GUEST: &str = r#"
(module
  (import "env" "console_log" (func $log (param i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "\ff\fe\fd")
  (func (export "init") (param i32 i32))
  (func (export "cls") (param i32))
  (func (export "update") (call $log (i32.const 65530) (i32.const 10)))
  (func (export "draw") (call $log (i32.const 0) (i32.const 3)))
)
"#;

/// Bump allocator plus a `load` that logs whatever it was handed.
pub const RESOURCE_GUEST: &str = r#"
(module
  (import "env" "console_log" (func $log (param i32 i32)))
  (memory (export "memory") 1)
  (global $next (mut i32) (i32.const 1024))
  (func (export "alloc") (param $len i32) (result i32)
    (local $ptr i32)
    (local.set $ptr (global.get $next))
    (global.set $next (i32.add (global.get $next) (local.get $len)))
    (local.get $ptr))
  (func (export "load") (param $ptr i32) (param $len i32)
    (call $log (local.get $ptr) (local.get $len)))
  (func (export "init") (param i32 i32))
  (func (export "cls") (param i32))
  (func (export "update"))
  (func (export "draw"))
)
"#;

pub const TRAPPING_INIT_GUEST: &str = r#"
(module
  (memory (export "memory") 1)
  (func (export "init") (param i32 i32) unreachable)
  (func (export "cls") (param i32))
  (func (export "update"))
  (func (export "draw"))
)
"#;

pub const MISSING_DRAW_GUEST: &str = r#"
(module
  (memory (export "memory") 1)
  (func (export "init") (param i32 i32))
  (func (export "cls") (param i32))
  (func (export "update"))
)
"#;

pub const NO_MEMORY_GUEST: &str = r#"
(module
  (func (export "init") (param i32 i32))
  (func (export "cls") (param i32))
  (func (export "update"))
  (func (export "draw"))
)
"#;

pub fn bridge(wat: &str, config: HostConfig) -> (Bridge, Arc<RecordingHooks>) {
    let hooks = Arc::new(RecordingHooks::new());
    let bridge = Bridge::new(ModuleSource::Bytes(wat.as_bytes().to_vec()), config)
        .with_hooks(hooks.clone());
    (bridge, hooks)
}

/// Imports memory capped at two pages.
pub const CAPPED_MEMORY_GUEST: &str = r#"
(module
  (import "env" "memory" (memory 1 2))
  (import "env" "console_log" (func $log (param i32 i32)))
  (data (i32.const 0) "capped")
  (func (export "init") (param i32 i32) (call $log (i32.const 0) (i32.const 6)))
  (func (export "cls") (param i32))
  (func (export "update"))
  (func (export "draw"))
)
"#;

/// Imports more memory than the host will ever allow.
pub const OVERSIZED_MEMORY_GUEST: &str = r#"
(module
  (import "env" "memory" (memory 600))
  (func (export "init") (param i32 i32))
  (func (export "cls") (param i32))
  (func (export "update"))
  (func (export "draw"))
)
"#;

/// Exports unbounded memory. `update` tries a large and then a one-page `memory.grow`;
/// `draw` logs the bytes written before growing.
pub const GROWING_GUEST: &str = r#"
(module
  (import "env" "console_log" (func $log (param i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "intact")
  (data (i32.const 16) "refused")
  (data (i32.const 32) "grew one")
  (func (export "init") (param i32 i32))
  (func (export "cls") (param i32))
  (func (export "update")
    (if (i32.eq (memory.grow (i32.const 600)) (i32.const -1))
      (then (call $log (i32.const 16) (i32.const 7))))
    (if (i32.ne (memory.grow (i32.const 1)) (i32.const -1))
      (then (call $log (i32.const 32) (i32.const 8)))))
  (func (export "draw") (call $log (i32.const 0) (i32.const 6)))
)
"#;
