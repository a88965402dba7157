//! Native Reference Model Binding.
//!
//! Resolves the five difftest entry points from a symbol table and wraps them as a
//! [`RefModel`]. It provides:
//! 1. **Symbol Tables:** The `SymbolTable` lookup seam, implemented for loaded libraries.
//! 2. **Resolution:** `RefApi::resolve`, which yields either all five entry points or a
//!    `BindError` naming the first one missing. There is no partially bound state.
//! 3. **Ownership:** `NativeRef` keeps the symbol owner (the loaded library) alive for as
//!    long as its entry points can be called.

use std::ffi::c_void;
use std::fmt;
use std::mem;
use std::path::Path;
use std::ptr;

use libloading::Library;
use tracing::info;

use crate::common::error::BindError;
use crate::common::reg::RegFile;
use crate::difftest::abi::{self, ExecFn, InitFn, MemcpyFn, RaiseIntrFn, RegcpyFn};
use crate::difftest::reference::{Direction, RefModel};

/// Name-to-address lookup over an exporter of C symbols.
pub trait SymbolTable {
    /// Returns the address of `name`, or `None` if it is not exported.
    fn lookup(&self, name: &'static str) -> Option<*const c_void>;
}

impl SymbolTable for Library {
    fn lookup(&self, name: &'static str) -> Option<*const c_void> {
        // SAFETY: the symbol is read as an untyped address; nothing is called here.
        let sym = unsafe { self.get::<*const c_void>(name.as_bytes()) }.ok()?;
        Some(*sym)
    }
}

/// The five resolved entry points.
#[derive(Clone, Copy)]
pub struct RefApi {
    init: InitFn,
    memcpy: MemcpyFn,
    regcpy: RegcpyFn,
    exec: ExecFn,
    raise_intr: RaiseIntrFn,
}

impl fmt::Debug for RefApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefApi")
            .field(abi::SYM_INIT, &(self.init as *const c_void))
            .field(abi::SYM_MEMCPY, &(self.memcpy as *const c_void))
            .field(abi::SYM_REGCPY, &(self.regcpy as *const c_void))
            .field(abi::SYM_EXEC, &(self.exec as *const c_void))
            .field(abi::SYM_RAISE_INTR, &(self.raise_intr as *const c_void))
            .finish()
    }
}

/// Looks up one required symbol, rejecting absent and null entries.
fn require<T: SymbolTable + ?Sized>(
    table: &T,
    name: &'static str,
) -> Result<*const c_void, BindError> {
    let addr = table.lookup(name).ok_or(BindError::MissingSymbol(name))?;
    if addr.is_null() {
        return Err(BindError::NullSymbol(name));
    }
    Ok(addr)
}

impl RefApi {
    /// Resolves every entry point in [`abi::REQUIRED_SYMBOLS`] order.
    ///
    /// # Errors
    ///
    /// [`BindError::MissingSymbol`] or [`BindError::NullSymbol`] for the first entry point
    /// that cannot be used.
    ///
    /// # Safety
    ///
    /// Every address the table returns for a difftest symbol must be a function with the
    /// matching signature from [`abi`], and must stay valid while the returned value is used.
    pub unsafe fn resolve<T: SymbolTable + ?Sized>(table: &T) -> Result<Self, BindError> {
        let mut addrs = [ptr::null(); abi::REQUIRED_SYMBOLS.len()];
        for (slot, name) in addrs.iter_mut().zip(abi::REQUIRED_SYMBOLS) {
            *slot = require(table, name)?;
        }
        // Same order as `REQUIRED_SYMBOLS`.
        let [memcpy, regcpy, exec, raise_intr, init] = addrs;

        // SAFETY: non-null addresses of functions with these signatures (caller contract).
        unsafe {
            Ok(Self {
                init: mem::transmute::<*const c_void, InitFn>(init),
                memcpy: mem::transmute::<*const c_void, MemcpyFn>(memcpy),
                regcpy: mem::transmute::<*const c_void, RegcpyFn>(regcpy),
                exec: mem::transmute::<*const c_void, ExecFn>(exec),
                raise_intr: mem::transmute::<*const c_void, RaiseIntrFn>(raise_intr),
            })
        }
    }
}

/// A reference model reached through resolved C entry points.
///
/// `L` owns the code behind the entry points (a [`Library`] for shared objects).
pub struct NativeRef<L> {
    api: RefApi,
    _owner: L,
}

/// A reference model loaded from a shared object.
pub type DylibRef = NativeRef<Library>;

impl<L> fmt::Debug for NativeRef<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeRef").field("api", &self.api).finish()
    }
}

impl<L: SymbolTable> NativeRef<L> {
    /// Binds all five entry points from `table` and takes ownership of it.
    ///
    /// # Errors
    ///
    /// See [`RefApi::resolve`].
    ///
    /// # Safety
    ///
    /// Same contract as [`RefApi::resolve`], for as long as `table` is alive.
    pub unsafe fn from_table(table: L) -> Result<Self, BindError> {
        // SAFETY: forwarded caller contract; `table` is kept alive in `_owner`.
        let api = unsafe { RefApi::resolve(&table)? };
        Ok(Self { api, _owner: table })
    }
}

impl DylibRef {
    /// Loads the reference shared object at `path` and binds its entry points.
    ///
    /// # Errors
    ///
    /// * [`BindError::EmptyPath`] if `path` is empty.
    /// * [`BindError::Load`] if the dynamic loader rejects the file.
    /// * [`BindError::MissingSymbol`] / [`BindError::NullSymbol`] for an unusable entry point.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self, BindError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(BindError::EmptyPath);
        }
        // SAFETY: loading runs the module's initializers; a reference model is trusted code
        // supplied by the user for exactly this purpose.
        let lib = unsafe { Library::new(path) }.map_err(|source| BindError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        // SAFETY: a difftest reference model exports these symbols with the ABI signatures.
        let bound = unsafe { Self::from_table(lib)? };
        info!(path = %path.display(), "reference model bound");
        Ok(bound)
    }
}

impl<L> RefModel for NativeRef<L> {
    fn init(&mut self) {
        // SAFETY: resolved entry point; the owner keeps it mapped.
        unsafe { (self.api.init)() }
    }

    fn memcpy_to_ref(&mut self, addr: u64, buf: &[u8]) {
        // SAFETY: `buf` is valid for `buf.len()` bytes. In the to-reference direction the
        // reference only reads through the pointer, so the shared borrow is not written.
        unsafe {
            (self.api.memcpy)(
                addr,
                buf.as_ptr().cast_mut().cast::<c_void>(),
                buf.len(),
                Direction::ToRef.as_abi(),
            );
        }
    }

    fn memcpy_to_dut(&mut self, addr: u64, buf: &mut [u8]) {
        // SAFETY: `buf` is valid and exclusively borrowed for `buf.len()` bytes.
        unsafe {
            (self.api.memcpy)(
                addr,
                buf.as_mut_ptr().cast::<c_void>(),
                buf.len(),
                Direction::ToDut.as_abi(),
            );
        }
    }

    fn regcpy(&mut self, regs: &mut RegFile, direction: Direction) {
        // SAFETY: `RegFile` is `#[repr(C)]` with the layout the ABI copies.
        unsafe { (self.api.regcpy)((regs as *mut RegFile).cast::<c_void>(), direction.as_abi()) }
    }

    fn exec(&mut self, n: u64) {
        // SAFETY: resolved entry point; the owner keeps it mapped.
        unsafe { (self.api.exec)(n) }
    }

    fn raise_intr(&mut self, no: u64) {
        // SAFETY: resolved entry point; the owner keeps it mapped.
        unsafe { (self.api.raise_intr)(no) }
    }
}
