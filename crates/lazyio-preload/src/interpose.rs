//! Linux LD_PRELOAD symbol exports.
//!
//! LD_PRELOAD works by symbol interposition: exporting functions with the
//! same names as libc's puts them ahead of libc in the lookup order.
//! Applications reach `open(2)` through different names depending on how they
//! were compiled (`_FILE_OFFSET_BITS=64` maps to `open64`) and libc-internal
//! callers use the `__` aliases, so all four are covered.
//!
//! The C prototype is variadic (`int open(const char *, int, ...)`). On the
//! supported ABIs an integer variadic argument travels in the same register or
//! stack slot as a fixed one, so the mode is taken as a plain third parameter
//! and only trusted when the flags request creation.

use libc::{c_char, c_int, mode_t};

use crate::reals::{REAL_OPEN, REAL_OPEN64, REAL___OPEN, REAL___OPEN64};
use crate::syscalls::open::open_impl;

#[no_mangle]
pub unsafe extern "C" fn open(path: *const c_char, flags: c_int, mode: mode_t) -> c_int {
    open_impl("open", &REAL_OPEN, path, flags, mode)
}

#[no_mangle]
pub unsafe extern "C" fn open64(path: *const c_char, flags: c_int, mode: mode_t) -> c_int {
    open_impl("open64", &REAL_OPEN64, path, flags, mode)
}

#[no_mangle]
pub unsafe extern "C" fn __open(path: *const c_char, flags: c_int, mode: mode_t) -> c_int {
    open_impl("__open", &REAL___OPEN, path, flags, mode)
}

#[no_mangle]
pub unsafe extern "C" fn __open64(path: *const c_char, flags: c_int, mode: mode_t) -> c_int {
    open_impl("__open64", &REAL___OPEN64, path, flags, mode)
}
