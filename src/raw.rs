//! Cache-line-aligned backing storage shared by every table variant.

use alloc::alloc::alloc;
use alloc::alloc::dealloc;
use alloc::alloc::handle_alloc_error;
use core::alloc::Layout;
use core::marker::PhantomData;
use core::ops::Deref;
use core::ops::DerefMut;
use core::ptr::NonNull;
use core::slice;

/// Alignment for slot arrays so a slot (or a probe group of four) straddles
/// as few cache lines as possible.
pub(crate) const CACHE_LINE: usize = 64;

/// Hints an upcoming non-temporal read of `ptr`.
#[inline(always)]
pub(crate) fn prefetch_read<T>(ptr: *const T) {
    #[cfg(all(target_arch = "x86_64", target_feature = "sse2"))]
    unsafe {
        use core::arch::x86_64::*;
        _mm_prefetch(ptr as *const i8, _MM_HINT_NTA);
    }
    #[cfg(not(all(target_arch = "x86_64", target_feature = "sse2")))]
    let _ = ptr;
}

/// Types that are validly initialized by repeating a single byte.
///
/// # Safety
///
/// Implementors must guarantee that a value whose every byte is `INIT` is a
/// valid instance of `Self`. Slot types keyed by the all-ones sentinel use
/// `0xFF`; nullable chain heads use `0x00` via the null-pointer optimization.
pub(crate) unsafe trait ByteInit {
    /// The byte repeated over the allocation at construction and reset.
    const INIT: u8;
}

// SAFETY: all-ones is EMPTY_KEY for both halves of a key/value word.
unsafe impl ByteInit for u64 {
    const INIT: u8 = 0xFF;
}

// SAFETY: `Option<Box<T>>` is guaranteed to represent `None` as the null
// pointer, i.e. all-zero bytes.
unsafe impl<T> ByteInit for Option<alloc::boxed::Box<T>> {
    const INIT: u8 = 0x00;
}

/// An exclusively-owned, cache-line-aligned heap array of slots.
///
/// The buffer never drops its elements; tables holding heap-owning slots
/// (chaining) tear their contents down before the buffer is reset or dropped.
/// Growth is expressed as "build a new `SlotBuf`, reinsert, drop the old".
pub(crate) struct SlotBuf<T: ByteInit> {
    ptr: NonNull<T>,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T: ByteInit> SlotBuf<T> {
    fn layout(len: usize) -> Layout {
        Layout::array::<T>(len)
            .and_then(|l| l.align_to(CACHE_LINE))
            .expect("allocation size overflow")
    }

    /// Allocates `len` slots, every byte set to `T::INIT`.
    pub(crate) fn new(len: usize) -> Self {
        assert!(len > 0, "slot buffer cannot be empty");
        let layout = Self::layout(len);
        // SAFETY: `layout` has non-zero size since `len > 0` and `T` is a
        // real slot type.
        let raw = unsafe { alloc(layout) };
        let Some(ptr) = NonNull::new(raw as *mut T) else {
            handle_alloc_error(layout);
        };
        let mut buf = SlotBuf {
            ptr,
            len,
            _marker: PhantomData,
        };
        buf.reset();
        buf
    }

    /// Rewrites every slot back to the `T::INIT` byte pattern.
    #[inline]
    pub(crate) fn reset(&mut self) {
        // SAFETY: `ptr` is valid for `len` elements, and `ByteInit`
        // guarantees the repeated byte forms a valid `T`.
        unsafe {
            core::ptr::write_bytes(self.ptr.as_ptr(), T::INIT, self.len);
        }
    }

    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Size in bytes of the backing allocation.
    #[inline]
    pub(crate) fn allocated_bytes(&self) -> usize {
        Self::layout(self.len).size()
    }

    /// Raw base pointer, for prefetch hints and vector loads.
    #[inline(always)]
    pub(crate) fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }
}

impl<T: ByteInit> Deref for SlotBuf<T> {
    type Target = [T];

    #[inline(always)]
    fn deref(&self) -> &[T] {
        // SAFETY: `ptr` is valid for `len` initialized elements for the
        // lifetime of the buffer.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: ByteInit> DerefMut for SlotBuf<T> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut [T] {
        // SAFETY: as above, plus we hold `&mut self`.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: ByteInit> Drop for SlotBuf<T> {
    fn drop(&mut self) {
        // SAFETY: allocated in `new` with the same layout computation.
        unsafe {
            dealloc(self.ptr.as_ptr() as *mut u8, Self::layout(self.len));
        }
    }
}
