//! Physical memory layout: paging setup inherited from the boot loader, and
//! the `phys_to_virt` bridge that lets the rest of the kernel treat the
//! fixed addresses named throughout this crate (FAT staging buffers,
//! process stacks) as real, dereferenceable pointers.

use bootloader::bootinfo::{MemoryMap, MemoryRegionType};
use spin::Once;
use x86_64::{
    structures::paging::{
        FrameAllocator, OffsetPageTable, PageTable, PhysFrame, Size4KiB,
    },
    PhysAddr, VirtAddr,
};

static PHYS_MEM_OFFSET: Once<u64> = Once::new();

/// Record the bootloader-chosen physical-memory offset. Must be called
/// exactly once, early in `init`.
pub fn set_physical_memory_offset(offset: VirtAddr) {
    PHYS_MEM_OFFSET.call_once(|| offset.as_u64());
}

/// Translate a fixed physical address (as named throughout this crate's
/// data model) into a virtual pointer valid for the lifetime of the kernel.
pub fn phys_to_virt(addr: u64) -> *mut u8 {
    let offset = *PHYS_MEM_OFFSET
        .get()
        .expect("phys_to_virt used before set_physical_memory_offset");
    (offset + addr) as *mut u8
}

unsafe fn active_level_4_table(physical_memory_offset: VirtAddr) -> &'static mut PageTable {
    use x86_64::registers::control::Cr3;

    let (level_4_table_frame, _) = Cr3::read();
    let phys = level_4_table_frame.start_address();
    let virt = physical_memory_offset + phys.as_u64();
    let page_table_ptr: *mut PageTable = virt.as_mut_ptr();

    &mut *page_table_ptr
}

/// Build an `OffsetPageTable` over the active level-4 table, using the
/// bootloader's physical-memory mapping as the translation base.
///
/// # Safety
/// The complete physical memory must actually be mapped at
/// `physical_memory_offset`, and this must be called only once to avoid
/// aliased `&mut` references to the page table.
pub unsafe fn init(physical_memory_offset: VirtAddr) -> OffsetPageTable<'static> {
    let level_4_table = active_level_4_table(physical_memory_offset);
    OffsetPageTable::new(level_4_table, physical_memory_offset)
}

/// A `FrameAllocator` that returns usable frames from the boot info's
/// memory map.
pub struct BootInfoFrameAllocator {
    memory_map: &'static MemoryMap,
    next: usize,
}

impl BootInfoFrameAllocator {
    /// # Safety
    /// The passed memory map must be valid; all frames marked `Usable`
    /// must actually be unused.
    pub unsafe fn init(memory_map: &'static MemoryMap) -> Self {
        BootInfoFrameAllocator {
            memory_map,
            next: 0,
        }
    }

    fn usable_frames(&self) -> impl Iterator<Item = PhysFrame> {
        let regions = self.memory_map.iter();
        let usable_regions = regions.filter(|r| r.region_type == MemoryRegionType::Usable);
        let addr_ranges = usable_regions.map(|r| r.range.start_addr()..r.range.end_addr());
        let frame_addresses = addr_ranges.flat_map(|r| r.step_by(4096));
        frame_addresses.map(|addr| PhysFrame::containing_address(PhysAddr::new(addr)))
    }
}

unsafe impl FrameAllocator<Size4KiB> for BootInfoFrameAllocator {
    fn allocate_frame(&mut self) -> Option<PhysFrame> {
        let frame = self.usable_frames().nth(self.next);
        self.next += 1;
        frame
    }
}
