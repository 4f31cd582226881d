//! Mapped memory regions and address lookup.

use crate::MachineError;

/// One contiguous, zero-initialised block of guest memory.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MappedRegion {
    base: u64,
    bytes: Vec<u8>,
}

impl MappedRegion {
    /// First address covered by the region.
    #[must_use]
    pub const fn base(&self) -> u64 {
        self.base
    }

    /// Region length in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Returns `true` for a zero-length region.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// One past the last address covered by the region.
    #[must_use]
    pub fn end(&self) -> u64 {
        self.base + self.len()
    }

    /// Byte offset of `[address, address + len)` inside this region, if it fits.
    fn offset_of(&self, address: u64, len: usize) -> Option<usize> {
        let offset = address.checked_sub(self.base)?;
        let last = offset.checked_add(len as u64)?;
        if last <= self.len() {
            usize::try_from(offset).ok()
        } else {
            None
        }
    }
}

/// Sparse guest address space made of non-overlapping regions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct AddressSpace {
    regions: Vec<MappedRegion>,
}

impl AddressSpace {
    /// Creates an address space with nothing mapped.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            regions: Vec::new(),
        }
    }

    /// Maps `size` zeroed bytes at `base`.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::InvalidRegion`] for an empty region, one that
    /// wraps the address space or one the host cannot allocate, and [`MachineError::MapOverlap`] when it
    /// intersects an existing mapping.
    pub fn map(&mut self, base: u64, size: u64) -> Result<(), MachineError> {
        let len = usize::try_from(size).map_err(|_| MachineError::InvalidRegion { base, size })?;
        let end = base
            .checked_add(size)
            .filter(|_| size > 0)
            .ok_or(MachineError::InvalidRegion { base, size })?;

        if self
            .regions
            .iter()
            .any(|region| base < region.end() && region.base() < end)
        {
            return Err(MachineError::MapOverlap { base, size });
        }

        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(len)
            .map_err(|_| MachineError::InvalidRegion { base, size })?;
        bytes.resize(len, 0);

        self.regions.push(MappedRegion { base, bytes });
        self.regions.sort_by_key(MappedRegion::base);
        Ok(())
    }

    /// Mapped regions in ascending address order.
    #[must_use]
    pub fn regions(&self) -> &[MappedRegion] {
        &self.regions
    }

    /// Copies `buf.len()` bytes starting at `address` into `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::Unmapped`] unless one region covers the whole range.
    pub fn read_into(&self, address: u64, buf: &mut [u8]) -> Result<(), MachineError> {
        let (region, offset) = self.locate(address, buf.len())?;
        buf.copy_from_slice(&region.bytes[offset..offset + buf.len()]);
        Ok(())
    }

    /// Reads `len` bytes starting at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::Unmapped`] unless one region covers the whole range.
    pub fn read(&self, address: u64, len: usize) -> Result<Vec<u8>, MachineError> {
        let mut buf = vec![0; len];
        self.read_into(address, &mut buf)?;
        Ok(buf)
    }

    /// Writes `bytes` starting at `address`. Nothing is written on error.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::Unmapped`] unless one region covers the whole range.
    pub fn write(&mut self, address: u64, bytes: &[u8]) -> Result<(), MachineError> {
        let (index, offset) = self.locate_index(address, bytes.len())?;
        self.regions[index].bytes[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn locate(&self, address: u64, len: usize) -> Result<(&MappedRegion, usize), MachineError> {
        let (index, offset) = self.locate_index(address, len)?;
        Ok((&self.regions[index], offset))
    }

    fn locate_index(&self, address: u64, len: usize) -> Result<(usize, usize), MachineError> {
        self.regions
            .iter()
            .enumerate()
            .find_map(|(index, region)| region.offset_of(address, len).map(|off| (index, off)))
            .ok_or(MachineError::Unmapped { address, len })
    }
}

#[cfg(test)]
mod tests {
    use super::AddressSpace;
    use crate::MachineError;

    #[test]
    fn mapped_region_starts_zeroed() {
        let mut space = AddressSpace::new();
        space.map(0x1000, 0x80).expect("map window");
        assert_eq!(space.read(0x1000, 0x80).expect("read"), vec![0; 0x80]);
    }

    #[test]
    fn write_then_read_round_trips_inside_region() {
        let mut space = AddressSpace::new();
        space.map(0x1000, 0x80).expect("map window");
        space.write(0x1010, &[0xDE, 0xAD]).expect("write");
        assert_eq!(space.read(0x100F, 4).expect("read"), vec![0, 0xDE, 0xAD, 0]);
    }

    #[test]
    fn access_straddling_the_end_is_rejected_whole() {
        let mut space = AddressSpace::new();
        space.map(0x1000, 0x10).expect("map window");

        let err = space.write(0x100E, &[1, 2, 3, 4]).expect_err("straddles end");
        assert_eq!(
            err,
            MachineError::Unmapped {
                address: 0x100E,
                len: 4
            }
        );
        assert_eq!(space.read(0x100E, 2).expect("read"), vec![0, 0]);
    }

    #[test]
    fn unmapped_read_reports_address() {
        let space = AddressSpace::new();
        assert_eq!(
            space.read(0x40, 1),
            Err(MachineError::Unmapped {
                address: 0x40,
                len: 1
            })
        );
    }

    #[test]
    fn overlapping_and_empty_maps_are_rejected() {
        let mut space = AddressSpace::new();
        space.map(0x1000, 0x100).expect("map window");

        assert!(matches!(
            space.map(0x10F0, 0x20),
            Err(MachineError::MapOverlap { .. })
        ));
        assert!(matches!(
            space.map(0x2000, 0),
            Err(MachineError::InvalidRegion { .. })
        ));
        assert!(matches!(
            space.map(u64::MAX, 2),
            Err(MachineError::InvalidRegion { .. })
        ));
    }

    #[test]
    fn unallocatable_region_is_rejected() {
        let mut space = AddressSpace::new();
        assert_eq!(
            space.map(0, 1 << 63),
            Err(MachineError::InvalidRegion {
                base: 0,
                size: 1 << 63
            })
        );
        assert!(space.regions().is_empty());
    }

    #[test]
    fn regions_are_kept_in_address_order() {
        let mut space = AddressSpace::new();
        space.map(0x3000, 0x10).expect("map high");
        space.map(0x1000, 0x10).expect("map low");
        let bases: Vec<u64> = space.regions().iter().map(|r| r.base()).collect();
        assert_eq!(bases, vec![0x1000, 0x3000]);
    }

    #[test]
    fn zero_length_access_inside_region_is_allowed() {
        let mut space = AddressSpace::new();
        space.map(0x1000, 0x10).expect("map window");
        space.write(0x1004, &[]).expect("empty write");
    }
}
