//! Real Symbol Storage
//!
//! Each interposed entry point owns one slot holding the address of the next
//! definition of the same name in the link chain (`dlsym(RTLD_NEXT, ..)`), so
//! the lookup never lands back in this library. Slots are filled on first use
//! and never change afterwards.
//!
//! Two threads racing on the first call both resolve the same address, so a
//! last-writer-wins store is harmless. `AtomicPtr` keeps that store untorn.

use libc::{c_char, c_int, c_void};
use std::sync::atomic::{AtomicPtr, Ordering};

/// C signature of the open family: `int open(const char *, int, ...)`.
pub type OpenFn = unsafe extern "C" fn(*const c_char, c_int, ...) -> c_int;

/// Storage for the authentic libc function behind an interposed symbol
pub struct RealSymbol {
    ptr: AtomicPtr<c_void>,
    name: &'static str,
}

impl RealSymbol {
    pub const fn new(name: &'static str) -> Self {
        Self {
            ptr: AtomicPtr::new(std::ptr::null_mut()),
            name,
        }
    }

    /// Symbol name without the trailing NUL.
    pub fn name(&self) -> &'static str {
        self.name.trim_end_matches('\0')
    }

    /// Raw address, resolving on first use. Null if the lookup failed.
    pub unsafe fn get(&self) -> *mut c_void {
        let p = self.ptr.load(Ordering::Acquire);
        if !p.is_null() {
            return p;
        }
        let f = libc::dlsym(libc::RTLD_NEXT, self.name.as_ptr() as *const c_char);
        self.ptr.store(f, Ordering::Release);
        f
    }

    /// The authentic open-family function.
    ///
    /// There is no fallback open implementation: without the real call no file
    /// I/O can happen at all, so a failed lookup aborts the process.
    pub unsafe fn open_fn(&self) -> OpenFn {
        let p = self.get();
        if p.is_null() {
            preload_stderr!("lazyio: cannot resolve real `{}`, aborting", self.name());
            libc::abort();
        }
        std::mem::transmute::<*mut c_void, OpenFn>(p)
    }
}

pub static REAL_OPEN: RealSymbol = RealSymbol::new("open\0");
pub static REAL_OPEN64: RealSymbol = RealSymbol::new("open64\0");
pub static REAL___OPEN: RealSymbol = RealSymbol::new("__open\0");
pub static REAL___OPEN64: RealSymbol = RealSymbol::new("__open64\0");
